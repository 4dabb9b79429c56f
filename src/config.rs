use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chart::POINT_BUDGET;
use crate::data::RaggedRowPolicy;
use crate::error::{EngineError, Result};
use crate::graph::MAX_RENDER_SIDE;
use crate::selection::DRAG_THRESHOLD_PX;
use crate::RenderOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub delimiter: char,
    pub ragged_rows: RaggedRowPolicy,
    pub point_budget: usize,
    pub drag_threshold_px: f64,
    pub log_level: String,
    pub render: RenderOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            ragged_rows: RaggedRowPolicy::Pad,
            point_budget: POINT_BUDGET,
            drag_threshold_px: DRAG_THRESHOLD_PX,
            log_level: "warn".to_string(),
            render: RenderOptions::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// The delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.delimiter as u8
    }

    fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(EngineError::Config(format!(
                "delimiter '{}' must be a single ASCII character",
                self.delimiter
            )));
        }
        if self.point_budget == 0 {
            return Err(EngineError::Config("point_budget must be at least 1".into()));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(EngineError::Config("render size must be non-zero".into()));
        }
        if self.render.width > MAX_RENDER_SIDE || self.render.height > MAX_RENDER_SIDE {
            return Err(EngineError::Config(format!(
                "render size {}x{} exceeds {} pixels per side",
                self.render.width, self.render.height, MAX_RENDER_SIDE
            )));
        }
        Ok(())
    }
}
