//! Model catalog and hardware tier selection

mod hardware;
mod models;
mod naming;

pub use hardware::{recommend, tier_blurb, GpuType, HardwareProfile, Recommendation};
pub use models::{
    strip_model_extension, CatalogEntry, CatalogView, ModelCatalog, Tier, MODEL_EXTENSION,
};
pub use naming::derive_display_name;
