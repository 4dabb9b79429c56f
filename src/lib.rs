// Library exports for rowlens

pub mod analysis;
pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod filter;
pub mod graph;
pub mod ingest;
pub mod numeric;
pub mod parser;
pub mod runtime;
pub mod scale;
pub mod selection;
pub mod session;
pub mod table;
pub mod view;

pub use error::{EngineError, Result};
pub use session::AnalysisSession;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: OutputFormat::Png,
        }
    }
}
