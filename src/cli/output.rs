//! Output formatting for listing commands
//!
//! Every formatter renders either pretty JSON (machine-readable) or aligned
//! human-readable text.

use crate::catalog::{CatalogView, HardwareProfile, Recommendation};
use crate::gateway::{EngineModelInfo, GatewayStatus};
use crate::storage::InstalledModel;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Human,
}

/// Renders command results in the selected format
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_status(
        &self,
        status: &GatewayStatus,
        loaded: Option<&EngineModelInfo>,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "status": status,
                "loaded_model": loaded,
            })),
            OutputFormat::Human => {
                let mut out = String::new();
                let running = if status.running { "running" } else { "not running" };
                writeln!(out, "Engine:      {} ({}) at {}", status.engine, running, status.host)?;
                writeln!(out, "Protocol:    {}", status.protocol)?;
                writeln!(out, "State:       {}", status.engine_state)?;
                if let Some(info) = loaded {
                    writeln!(out, "Loaded:      {} [{}]", info.display_name, info.id)?;
                    if info.n_params > 0 {
                        writeln!(
                            out,
                            "             {} params, context {}, {}",
                            format_count(info.n_params),
                            info.n_ctx_train,
                            format_bytes(info.size_bytes)
                        )?;
                    }
                }
                writeln!(out, "Tier:        {}", status.tier)?;
                if let Some(name) = &status.recommended {
                    writeln!(out, "Recommended: {}", name)?;
                }
                write!(
                    out,
                    "Models:      {} installed in {}",
                    status.installed_count,
                    status.models_dir.display()
                )?;
                Ok(out)
            }
        }
    }

    pub fn format_catalog(&self, views: &[CatalogView]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&views),
            OutputFormat::Human => {
                if views.is_empty() {
                    return Ok("No models in catalog".to_string());
                }
                let width = name_width(views.iter().map(|v| v.entry.name.as_str()));
                let mut out = String::new();
                writeln!(
                    out,
                    "  {:<width$}  {:<6}  {:>8}  DESCRIPTION",
                    "NAME",
                    "TIER",
                    "SIZE",
                    width = width
                )?;
                for view in views {
                    let marker = if view.installed { "*" } else { " " };
                    let source = if view.entry.url.is_some() { "" } else { " (manual install)" };
                    writeln!(
                        out,
                        "{} {:<width$}  {:<6}  {:>6.1}GB  {}{}",
                        marker,
                        view.entry.name,
                        view.entry.tier,
                        view.entry.size_gb,
                        view.entry.description,
                        source,
                        width = width
                    )?;
                }
                write!(out, "\n* installed")?;
                Ok(out)
            }
        }
    }

    pub fn format_models(&self, models: &[InstalledModel]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&models),
            OutputFormat::Human => {
                if models.is_empty() {
                    return Ok("No models installed".to_string());
                }
                let width = name_width(models.iter().map(|m| m.name.as_str()));
                let mut out = String::new();
                for model in models {
                    let marker = if model.active { "*" } else { " " };
                    writeln!(
                        out,
                        "{} {:<width$}  {:>10}  {}",
                        marker,
                        model.name,
                        format_bytes(model.size_bytes),
                        model.modified.format("%Y-%m-%d %H:%M"),
                        width = width
                    )?;
                }
                Ok(out.trim_end().to_string())
            }
        }
    }

    pub fn format_recommendation(
        &self,
        recommendation: Option<&Recommendation>,
        profile: &HardwareProfile,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "hardware": profile,
                "tier": profile.tier(),
                "recommendation": recommendation,
            })),
            OutputFormat::Human => {
                let mut out = String::new();
                writeln!(out, "Hardware: {}", profile.summary())?;
                writeln!(out, "Tier:     {}", profile.tier())?;
                match recommendation {
                    Some(rec) => write!(out, "Model:    {}", rec.description)?,
                    None => write!(out, "Model:    none available for this tier")?,
                }
                Ok(out)
            }
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output to JSON")
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(str::len).max().unwrap_or(0).max(4)
}

/// Formats a byte count with binary units (`4.7 GB`)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Formats a parameter count (`1.5B`, `360M`)
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.1}B", n as f64 / 1e9)
    } else if n >= 1_000_000 {
        format!("{}M", n / 1_000_000)
    } else {
        n.to_string()
    }
}
