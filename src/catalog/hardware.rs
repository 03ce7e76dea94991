//! Tier selection from a host hardware profile
//!
//! Hardware detection itself belongs to the caller; this module only reads
//! the profile it is handed.

use super::models::{CatalogEntry, ModelCatalog, Tier};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Accelerator family reported by the hardware inventory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuType {
    Nvidia,
    Amd,
    /// Unified memory: the GPU shares system RAM
    AppleSilicon,
    IntelArc,
    #[default]
    None,
}

impl GpuType {
    pub fn has_unified_memory(&self) -> bool {
        matches!(self, GpuType::AppleSilicon)
    }
}

impl fmt::Display for GpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GpuType::Nvidia => "nvidia",
            GpuType::Amd => "amd",
            GpuType::AppleSilicon => "apple_silicon",
            GpuType::IntelArc => "intel_arc",
            GpuType::None => "none",
        };
        f.write_str(label)
    }
}

/// Host inventory consumed by the tier selector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareProfile {
    pub os: String,
    pub arch: String,
    pub cpu_model: String,
    pub cpu_cores: u32,
    pub ram_total_mb: u64,
    pub disk_total_gb: u64,
    pub disk_free_gb: u64,
    pub gpu_type: GpuType,
    pub gpu_name: String,
    pub gpu_memory_mb: u64,
}

impl HardwareProfile {
    /// Memory available to the accelerator, in megabytes.
    ///
    /// Unified-memory machines report total system RAM; the dedicated
    /// figure is only used when RAM is unknown.
    pub fn accelerator_memory_mb(&self) -> u64 {
        if self.gpu_type.has_unified_memory() && self.ram_total_mb > 0 {
            self.ram_total_mb
        } else {
            self.gpu_memory_mb
        }
    }

    /// Capability tier for this host
    pub fn tier(&self) -> Tier {
        if self.gpu_type == GpuType::None {
            return Tier::Cpu;
        }
        Tier::for_memory_gb(self.accelerator_memory_mb() / 1024)
    }

    /// One-line summary for status output
    pub fn summary(&self) -> String {
        let gpu = if self.gpu_type == GpuType::None {
            "no GPU".to_string()
        } else if self.gpu_name.is_empty() {
            format!("{} ({} MB)", self.gpu_type, self.accelerator_memory_mb())
        } else {
            format!("{} ({} MB)", self.gpu_name, self.accelerator_memory_mb())
        };
        format!(
            "{} cores, {:.1} GB RAM, {}",
            self.cpu_cores,
            self.ram_total_mb as f64 / 1024.0,
            gpu
        )
    }
}

/// Static blurb describing what a tier's recommended model is good for
pub fn tier_blurb(tier: Tier) -> &'static str {
    match tier {
        Tier::Apex => "Flagship model - runs the biggest open models with room to spare",
        Tier::Ultra => "Large model - excellent for coding, analysis, and complex reasoning",
        Tier::High => "Strong model - great for most tasks including code and writing",
        Tier::Mid => "Medium model - solid for general use, chat, and basic coding",
        Tier::Basic => "Compact model - good for chat and simple tasks",
        Tier::Cpu => "Lightweight model - runs on CPU, good for basic Q&A and chat",
    }
}

/// The selector's pick for a host
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// Tier computed from the hardware profile
    pub tier: Tier,
    pub entry: CatalogEntry,
    pub description: String,
}

/// Picks a catalog entry for the given hardware.
///
/// Only entries with a download URL are considered. The first one in
/// declaration order whose tier equals the host tier wins. If there is none
/// at that tier, the search walks down to the nearest lower tier that has
/// one, and the description uses that tier's blurb. Returns `None` only
/// when nothing downloadable exists at or below the host tier.
pub fn recommend(catalog: &ModelCatalog, profile: &HardwareProfile) -> Option<Recommendation> {
    let tier = profile.tier();

    let entry = Tier::ALL
        .iter()
        .rev()
        .filter(|t| **t <= tier)
        .find_map(|t| {
            catalog
                .entries()
                .iter()
                .find(|e| e.tier == *t && e.url.is_some())
        })?;

    if entry.tier != tier {
        debug!(
            tier = %tier,
            fallback_tier = %entry.tier,
            "No catalog entry at host tier, using lower tier"
        );
    }

    Some(Recommendation {
        tier,
        description: format!("{} - {}", entry.name, tier_blurb(entry.tier)),
        entry: entry.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu(gpu_type: GpuType, gpu_memory_mb: u64) -> HardwareProfile {
        HardwareProfile {
            gpu_type,
            gpu_memory_mb,
            ..Default::default()
        }
    }

    #[test]
    fn test_tier_thresholds() {
        let cases = [
            (GpuType::None, 0, Tier::Cpu),
            (GpuType::None, 32768, Tier::Cpu),
            (GpuType::Nvidia, 2048, Tier::Cpu),
            (GpuType::Nvidia, 4096, Tier::Basic),
            (GpuType::Nvidia, 6144, Tier::Basic),
            (GpuType::Nvidia, 8192, Tier::Mid),
            (GpuType::Amd, 12288, Tier::Mid),
            (GpuType::Nvidia, 16384, Tier::High),
            (GpuType::Nvidia, 24576, Tier::Ultra),
            (GpuType::Nvidia, 49152, Tier::Ultra),
            (GpuType::IntelArc, 65536, Tier::Apex),
        ];

        for (gpu_type, mb, expected) in cases {
            assert_eq!(gpu(gpu_type, mb).tier(), expected, "{} {} MB", gpu_type, mb);
        }
    }

    #[test]
    fn test_unified_memory_uses_ram_total() {
        let profile = HardwareProfile {
            gpu_type: GpuType::AppleSilicon,
            gpu_memory_mb: 0,
            ram_total_mb: 16384,
            ..Default::default()
        };
        assert_eq!(profile.accelerator_memory_mb(), 16384);
        assert_eq!(profile.tier(), Tier::High);

        let big = HardwareProfile {
            ram_total_mb: 131072,
            ..profile.clone()
        };
        assert_eq!(big.tier(), Tier::Apex);

        // RAM unknown: fall back to the reported GPU figure
        assert_eq!(gpu(GpuType::AppleSilicon, 8192).tier(), Tier::Mid);
    }

    #[test]
    fn test_recommend_exact_tier_first_in_declaration_order() {
        let catalog = ModelCatalog::builtin();

        let rec = recommend(&catalog, &gpu(GpuType::Nvidia, 8192)).unwrap();
        assert_eq!(rec.tier, Tier::Mid);
        assert_eq!(rec.entry.name, "qwen2.5-7b");
        assert_eq!(
            rec.description,
            format!("qwen2.5-7b - {}", tier_blurb(Tier::Mid))
        );

        let rec = recommend(&catalog, &HardwareProfile::default()).unwrap();
        assert_eq!(rec.entry.name, "qwen2.5-0.5b");
    }

    #[test]
    fn test_recommend_falls_back_to_lower_tier() {
        let catalog = ModelCatalog::builtin();
        let only_cpu_and_mid = ModelCatalog::new(
            catalog
                .entries()
                .iter()
                .filter(|e| e.tier == Tier::Cpu || e.tier == Tier::Mid)
                .cloned()
                .collect(),
        );

        let rec = recommend(&only_cpu_and_mid, &gpu(GpuType::Nvidia, 24576)).unwrap();
        assert_eq!(rec.tier, Tier::Ultra);
        assert_eq!(rec.entry.tier, Tier::Mid);
        assert_eq!(
            rec.description,
            format!("{} - {}", rec.entry.name, tier_blurb(Tier::Mid))
        );
    }

    #[test]
    fn test_recommendation_is_downloadable_for_every_tier() {
        let catalog = ModelCatalog::builtin();
        let memory_gb = [0, 4, 8, 16, 24, 64];

        for (tier, gb) in Tier::ALL.iter().zip(memory_gb) {
            let profile = gpu(GpuType::Nvidia, gb * 1024);
            assert_eq!(profile.tier(), *tier);
            let rec = recommend(&catalog, &profile).unwrap();
            assert!(
                rec.entry.url.is_some(),
                "{} recommends {} without a download URL",
                tier,
                rec.entry.name
            );
        }
    }

    #[test]
    fn test_apex_skips_manual_install_entry() {
        let profile = HardwareProfile {
            gpu_type: GpuType::AppleSilicon,
            ram_total_mb: 131072,
            ..Default::default()
        };
        let rec = recommend(&ModelCatalog::builtin(), &profile).unwrap();
        assert_eq!(rec.tier, Tier::Apex);
        assert_eq!(rec.entry.name, "qwen2.5-32b");
        assert_eq!(rec.entry.tier, Tier::Ultra);
    }

    #[test]
    fn test_recommend_empty_catalog() {
        assert!(recommend(&ModelCatalog::new(Vec::new()), &HardwareProfile::default()).is_none());
    }

    #[test]
    fn test_profile_deserializes_from_inventory_yaml() {
        let yaml = "os: darwin\narch: arm64\ncpu_cores: 10\nram_total_mb: 32768\ngpu_type: apple_silicon\ngpu_name: Apple M2 Pro\n";
        let profile: HardwareProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.gpu_type, GpuType::AppleSilicon);
        assert_eq!(profile.tier(), Tier::Ultra);
        assert!(profile.summary().contains("Apple M2 Pro"));
    }
}
