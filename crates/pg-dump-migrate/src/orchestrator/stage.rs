//! Pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ToolCheck,
    SourceCheck,
    TargetCheck,
    Export,
    Reset,
    Import,
    Cleanup,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::ToolCheck,
        Stage::SourceCheck,
        Stage::TargetCheck,
        Stage::Export,
        Stage::Reset,
        Stage::Import,
        Stage::Cleanup,
    ];

    /// 1-based position in the pipeline.
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::ToolCheck => "tool check",
            Stage::SourceCheck => "source check",
            Stage::TargetCheck => "target check",
            Stage::Export => "export",
            Stage::Reset => "reset",
            Stage::Import => "import",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.number(), self.name())
    }
}
