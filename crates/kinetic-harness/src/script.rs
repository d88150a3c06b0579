#![forbid(unsafe_code)]

//! Scripted input steps.
//!
//! Scripts are JSON arrays, one object per step, tagged by `step`:
//!
//! ```json
//! [
//!   {"step":"skip_loader"},
//!   {"step":"wheel","delta":600},
//!   {"step":"wait","ms":1500},
//!   {"step":"navigate","section":"contact"},
//!   {"step":"hidden","ms":30000},
//!   {"step":"wait","ms":500}
//! ]
//! ```

use kinetic_core::scroll::ScrollKey;
use serde::{Deserialize, Serialize};

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Run frames for `ms` milliseconds.
    Wait { ms: f64 },
    Wheel { delta: f64 },
    Touch { delta: f64 },
    Key { key: ScrollKey },
    PointerMove { x: f64, y: f64 },
    PointerDown,
    PointerUp,
    HoverEnter {
        #[serde(default)]
        label: Option<String>,
    },
    HoverLeave,
    Resize {
        width: f64,
        height: f64,
        #[serde(default = "unit_ratio")]
        pixel_ratio: f64,
    },
    /// Navigation click on a section link.
    Navigate { section: String },
    /// Page hidden for `ms` milliseconds; no frames run meanwhile.
    Hidden { ms: f64 },
    SkipLoader,
}

fn unit_ratio() -> f64 {
    1.0
}

/// Parse a JSON script.
pub fn parse_script(json: &str) -> Result<Vec<Step>, serde_json::Error> {
    serde_json::from_str(json)
}
