//! Inference engine process and its HTTP address

mod endpoint;
mod health;
mod supervisor;

pub use endpoint::{EngineEndpoint, DEFAULT_ENGINE_PORT};
pub use health::{HealthProbe, HEALTH_PATH, HEALTH_TIMEOUT};
pub use supervisor::{ActiveModel, EngineState, EngineSupervisor};
