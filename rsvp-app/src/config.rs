use anyhow::{Context, Result};
use rsvp_experiment::TrialConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Host-side configuration: the trial parameters plus everything the shell
/// needs (stimulus list, font, file locations). Loaded from an optional JSON
/// file; missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub trial: TrialConfig,
    /// One trial per sentence, presented in order.
    pub sentences: Vec<String>,
    /// TTF/OTF to rasterize with; when absent a few common system locations
    /// are searched.
    pub font_path: Option<PathBuf>,
    pub results_path: PathBuf,
    pub session_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            trial: TrialConfig::default(),
            sentences: vec![
                "Health inspection that found rat infestation forces busy supermarket in Surrey to shut".into(),
                "Storm closes coastal road for second day as engineers assess damage".into(),
                "Library extends opening hours after record demand from evening readers".into(),
            ],
            font_path: None,
            results_path: PathBuf::from("rsvp-results.json"),
            session_path: std::env::temp_dir().join("rsvp-session.json"),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.trial.validate()?;
        Ok(config)
    }
}
