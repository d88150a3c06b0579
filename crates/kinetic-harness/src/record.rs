#![forbid(unsafe_code)]

//! Per-frame output captured from a headless stage.

use std::collections::BTreeMap;

use kinetic_core::cursor::CursorState;
use kinetic_core::loader::LoaderStatus;
use kinetic_core::nav::ChromeStyle;
use kinetic_core::particles::{FieldAssets, FieldFrame, FieldRenderer};
use kinetic_core::reveal::StyleSink;
use kinetic_core::{ComputedStyle, ScrollState, StageEvent, Viewport};
use serde::{Deserialize, Serialize};

/// Everything observable after one frame. Serialized as one JSONL line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub time_ms: f64,
    pub scroll: ScrollState,
    pub loader: LoaderStatus,
    pub ready: bool,
    pub active_section: Option<String>,
    pub chrome: ChromeStyle,
    pub cursor: Option<CursorState>,
    /// Style writes made during this frame, keyed by element.
    pub writes: BTreeMap<String, ComputedStyle>,
    /// Scroll-linked styles after this frame.
    pub mapped: BTreeMap<String, ComputedStyle>,
    pub events: Vec<StageEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_rotation: Option<[f64; 3]>,
}

/// Style sink that remembers the latest value per element and the writes
/// since the last [`RecordingSink::take_writes`].
#[derive(Debug, Default)]
pub struct RecordingSink {
    current: BTreeMap<String, ComputedStyle>,
    pending: BTreeMap<String, ComputedStyle>,
    total_writes: u64,
}

impl RecordingSink {
    /// Latest style written to `target`.
    pub fn style_of(&self, target: &str) -> Option<ComputedStyle> {
        self.current.get(target).copied()
    }

    pub fn take_writes(&mut self) -> BTreeMap<String, ComputedStyle> {
        std::mem::take(&mut self.pending)
    }

    pub fn total_writes(&self) -> u64 {
        self.total_writes
    }
}

impl StyleSink for RecordingSink {
    fn apply(&mut self, target: &str, style: &ComputedStyle) {
        self.total_writes += 1;
        self.current.insert(target.to_string(), *style);
        self.pending.insert(target.to_string(), *style);
    }
}

/// Renderer with no surface. Keeps the last frame for inspection.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    uploaded: usize,
    last: Option<FieldFrame>,
    frames: u64,
}

impl HeadlessRenderer {
    pub fn last_frame(&self) -> Option<&FieldFrame> {
        self.last.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Particles received at upload.
    pub fn uploaded(&self) -> usize {
        self.uploaded
    }
}

impl FieldRenderer for HeadlessRenderer {
    fn upload(&mut self, assets: &FieldAssets<'_>) {
        self.uploaded = assets.particle_count;
    }

    fn submit(&mut self, frame: &FieldFrame) {
        self.frames += 1;
        self.last = Some(*frame);
    }

    fn resize(&mut self, _viewport: Viewport, _pixel_ratio: f64) {}

    fn release(&mut self) {
        self.uploaded = 0;
        self.last = None;
    }
}
