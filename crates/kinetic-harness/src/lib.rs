#![forbid(unsafe_code)]

//! Headless, deterministic replay of a [`Stage`].
//!
//! A [`Harness`] owns a frame clock with a virtual time base, a static
//! [`PageLayout`] and a [`RecordingSink`]. Scripted [`Step`]s drive input;
//! every frame produces one [`FrameRecord`]. The same script always yields
//! the same records, which makes the JSONL output suitable for golden
//! comparisons.

pub mod demo;
pub mod layout;
pub mod record;
pub mod script;

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use kinetic_core::cursor::PointerKind;
use kinetic_core::stage::{SectionSpec, StageHost};
use kinetic_core::{ComputedStyle, ConfigError, FrameClock, MotionConfig, Stage, Viewport};

pub use layout::PageLayout;
pub use record::{FrameRecord, HeadlessRenderer, RecordingSink};
pub use script::{Step, parse_script};

/// Default frame interval (60 Hz).
pub const FRAME_MS: f64 = 1000.0 / 60.0;

/// Harness failure.
#[derive(Debug)]
pub enum HarnessError {
    /// The motion configuration was rejected.
    Config(ConfigError),
    /// The script could not be parsed.
    Script(serde_json::Error),
    Io(io::Error),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Script(e) => write!(f, "invalid script: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Script(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<ConfigError> for HarnessError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(e: serde_json::Error) -> Self {
        Self::Script(e)
    }
}

impl From<io::Error> for HarnessError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Scripted driver around one stage.
#[derive(Debug)]
pub struct Harness {
    clock: FrameClock,
    stage: Stage,
    sink: Rc<RefCell<RecordingSink>>,
    now: f64,
    frame_ms: f64,
    frame: u64,
    records: Vec<FrameRecord>,
}

impl Harness {
    pub fn new(
        config: MotionConfig,
        viewport: Viewport,
        layout: PageLayout,
        pointer: PointerKind,
    ) -> Result<Self, HarnessError> {
        let clock = FrameClock::new(config.clock);
        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        let host = StageHost {
            viewport,
            pointer,
            layout: Rc::new(layout),
            sink: sink.clone(),
        };
        let stage = Stage::new(&clock, config, host)?;
        Ok(Self {
            clock,
            stage,
            sink,
            now: 0.0,
            frame_ms: FRAME_MS,
            frame: 0,
            records: Vec::new(),
        })
    }

    /// The demo page at `viewport` with default configuration, every
    /// section mounted and the particle field running.
    pub fn demo(viewport: Viewport, pointer: PointerKind) -> Result<Self, HarnessError> {
        let mut harness = Self::new(
            MotionConfig::default(),
            viewport,
            demo::demo_layout(viewport.width),
            pointer,
        )?;
        harness.mount(demo::demo_sections());
        harness.mount_field(1.0, 42);
        Ok(harness)
    }

    /// Drive frames at `hz` instead of 60 Hz.
    #[must_use]
    pub fn with_rate(mut self, hz: f64) -> Self {
        if hz.is_finite() && hz > 0.0 {
            self.frame_ms = 1000.0 / hz;
        }
        self
    }

    /// Declare and mount `sections`.
    pub fn mount(&mut self, sections: Vec<SectionSpec>) {
        self.stage
            .declare_sections(sections.iter().map(|s| s.id.clone()));
        for section in sections {
            self.stage.mount_section(section);
        }
    }

    pub fn mount_field(&mut self, device_pixel_ratio: f64, seed: u64) {
        self.stage
            .mount_field(Box::new(HeadlessRenderer::default()), device_pixel_ratio, seed);
    }

    /// Apply one scripted step.
    pub fn apply(&mut self, step: &Step) {
        kinetic_core::debug!(?step, time_ms = self.now, "step");
        match step {
            Step::Wait { ms } => self.run(*ms),
            Step::Wheel { delta } => {
                self.stage.wheel(*delta);
            }
            Step::Touch { delta } => {
                self.stage.touch(*delta);
            }
            Step::Key { key } => {
                self.stage.key(*key);
            }
            Step::PointerMove { x, y } => self.stage.pointer_move(*x, *y),
            Step::PointerDown => self.stage.pointer_down(),
            Step::PointerUp => self.stage.pointer_up(),
            Step::HoverEnter { label } => self.stage.hover_enter(label.as_deref()),
            Step::HoverLeave => self.stage.hover_leave(),
            Step::Resize {
                width,
                height,
                pixel_ratio,
            } => self
                .stage
                .resize(Viewport::new(*width, *height), *pixel_ratio),
            Step::Navigate { section } => {
                self.stage.navigate_to(section);
            }
            Step::Hidden { ms } => {
                self.stage.visibility_changed(false);
                if ms.is_finite() && *ms > 0.0 {
                    self.now += ms;
                }
                self.stage.visibility_changed(true);
            }
            Step::SkipLoader => self.stage.skip_loader(),
        }
    }

    /// Apply every step in order.
    pub fn run_script(&mut self, steps: &[Step]) {
        for step in steps {
            self.apply(step);
        }
    }

    /// Run frames covering `ms` of virtual time.
    pub fn run(&mut self, ms: f64) {
        if !ms.is_finite() || ms <= 0.0 {
            return;
        }
        let frames = (ms / self.frame_ms).round().max(1.0) as u64;
        for _ in 0..frames {
            self.advance();
        }
    }

    /// Run one frame and record it.
    pub fn advance(&mut self) -> &FrameRecord {
        self.now += self.frame_ms;
        self.clock.tick(self.now);
        self.frame += 1;
        let writes = self.sink.borrow_mut().take_writes();
        let record = FrameRecord {
            frame: self.frame,
            time_ms: self.now,
            scroll: self.stage.scroll_state(),
            loader: self.stage.loader(),
            ready: self.stage.is_ready(),
            active_section: self.stage.active_section(),
            chrome: self.stage.nav_chrome(),
            cursor: self.stage.cursor(),
            writes,
            mapped: self.stage.styles().into_iter().collect(),
            events: self.stage.drain_events(),
            field_rotation: self.stage.field().map(|f| f.borrow().rotation()),
        };
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&FrameRecord> {
        self.records.last()
    }

    /// Current style of `target`: the scroll-linked value if it is mapped,
    /// otherwise the latest reveal write.
    pub fn style_of(&self, target: &str) -> Option<ComputedStyle> {
        self.stage
            .style(target)
            .or_else(|| self.sink.borrow().style_of(target))
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    /// Virtual time in milliseconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Write every record as one JSON object per line.
    pub fn write_jsonl<W: Write>(&self, out: &mut W) -> Result<(), HarnessError> {
        for record in &self.records {
            serde_json::to_writer(&mut *out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}
