#![forbid(unsafe_code)]

//! Rotating point cloud and floating wireframe solids.
//!
//! The particle set is generated once at mount: positions uniform in a
//! cube, colors drawn from three hue buckets, count picked from the
//! viewport width. It is uploaded to the host renderer as raw bytes and
//! never changes afterwards; per frame only the container rotation and the
//! two solids' transforms are submitted.
//!
//! The container spins at a constant rate on two axes. The pointer adds an
//! offset that eases toward `pointer * influence` with per-frame
//! exponential smoothing, scaled so the feel is the same at any refresh
//! rate. Nothing here reads scroll state.

pub mod solids;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use bytemuck::{Pod, Zeroable};

use crate::clock::{ClockTick, FrameClock, Phase, Subscription};
use crate::config::{ConfigError, check_non_negative, check_ordered, check_positive, check_range};
use crate::geometry::Viewport;

pub use solids::{WireframeMesh, icosahedron, octahedron};

/// One particle as laid out in the GPU vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Particle colors: green, cyan, violet.
pub const HUE_BUCKETS: [[f32; 3]; 3] = [[0.0, 1.0, 0.53], [0.0, 0.8, 1.0], [0.66, 0.33, 0.97]];

/// How overlapping fragments combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendMode {
    Normal,
    /// Overlaps brighten instead of occluding.
    Additive,
}

/// Render state for the point cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointMaterial {
    pub size: f32,
    pub size_attenuation: bool,
    pub depth_write: bool,
    pub transparent: bool,
    pub vertex_colors: bool,
    pub blending: BlendMode,
}

impl PointMaterial {
    /// Additive, transparent, no depth writes.
    pub fn glow(size: f32) -> Self {
        Self {
            size,
            size_attenuation: true,
            depth_write: false,
            transparent: true,
            vertex_colors: true,
            blending: BlendMode::Additive,
        }
    }
}

/// Perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Camera {
    pub position: [f32; 3],
    pub fov_degrees: f32,
}

/// Particle field configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldConfig {
    /// Widths below this use `narrow_count`.
    /// Default: 768
    pub narrow_breakpoint: f64,
    /// Default: 1800
    pub narrow_count: usize,
    /// Default: 3800
    pub wide_count: usize,
    /// Used when the viewport width is unknown.
    /// Default: 4000
    pub fallback_count: usize,
    /// Edge length of the cube particles are spread over.
    /// Default: 20
    pub extent: f32,
    /// Container spin in rad/s around x and y.
    /// Default: (0.02, 0.03)
    pub spin: [f64; 2],
    /// Radians of rotation at full pointer deflection.
    /// Default: 0.5
    pub pointer_influence: f64,
    /// Fraction of the remaining pointer offset closed per 60 Hz frame.
    /// Default: 0.01
    pub pointer_smoothing: f64,
    /// Default: 0.03
    pub point_size: f32,
    pub camera: Camera,
    /// Device pixel ratio clamp.
    /// Default: [1, 1.75]
    pub pixel_ratio: [f64; 2],
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            narrow_breakpoint: 768.0,
            narrow_count: 1800,
            wide_count: 3800,
            fallback_count: 4000,
            extent: 20.0,
            spin: [0.02, 0.03],
            pointer_influence: 0.5,
            pointer_smoothing: 0.01,
            point_size: 0.03,
            camera: Camera {
                position: [0.0, 0.0, 6.0],
                fov_degrees: 60.0,
            },
            pixel_ratio: [1.0, 1.75],
        }
    }
}

impl FieldConfig {
    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("field.narrow_breakpoint", self.narrow_breakpoint)?;
        for (field, count) in [
            ("field.narrow_count", self.narrow_count),
            ("field.wide_count", self.wide_count),
            ("field.fallback_count", self.fallback_count),
        ] {
            if count == 0 {
                return Err(ConfigError::ZeroCount { field });
            }
        }
        check_positive("field.extent", f64::from(self.extent))?;
        check_range("field.pointer_smoothing", self.pointer_smoothing, 0.0, 1.0)?;
        check_non_negative("field.pointer_influence", self.pointer_influence)?;
        check_positive("field.point_size", f64::from(self.point_size))?;
        check_positive("field.pixel_ratio", self.pixel_ratio[0])?;
        check_ordered("field.pixel_ratio", self.pixel_ratio[0], self.pixel_ratio[1])
    }

    /// Particle count for a viewport of `width` CSS pixels.
    pub fn particle_count(&self, width: Option<f64>) -> usize {
        match width {
            Some(w) if w.is_finite() => {
                if w < self.narrow_breakpoint {
                    self.narrow_count
                } else {
                    self.wide_count
                }
            }
            _ => self.fallback_count,
        }
    }

    /// Clamp a device pixel ratio into the configured range.
    pub fn clamp_pixel_ratio(&self, dpr: f64) -> f64 {
        let [lo, hi] = self.pixel_ratio;
        if dpr.is_nan() { lo } else { dpr.clamp(lo, hi.max(lo)) }
    }
}

// xorshift64
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed.wrapping_add(0x9E37_79B9_7F4A_7C15) | 1)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in [0, 1).
    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

/// Generate `count` particles uniform in a cube of edge `extent` centered
/// on the origin. Deterministic for a given seed.
pub fn generate_particles(count: usize, extent: f32, seed: u64) -> Vec<ParticleVertex> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|_| {
            let position = [0; 3].map(|_: u8| (rng.next_f32() - 0.5) * extent);
            let t = rng.next_f32();
            let bucket = if t < 0.33 {
                0
            } else if t < 0.66 {
                1
            } else {
                2
            };
            ParticleVertex {
                position,
                color: HUE_BUCKETS[bucket],
            }
        })
        .collect()
}

/// Periodic vertical offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bob {
    pub amplitude: f64,
    /// Angular frequency in rad/s.
    pub frequency: f64,
}

/// A decorative wireframe solid animated purely by time.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatingSolid {
    pub mesh: WireframeMesh,
    pub position: [f64; 3],
    /// Rotation rate in rad/s around x and y.
    pub spin: [f64; 2],
    /// Replaces the resting y position when set.
    pub bob: Option<Bob>,
    pub color: [f32; 3],
    pub opacity: f32,
}

impl FloatingSolid {
    /// The green geodesic sphere on the right.
    pub fn icosahedron() -> Self {
        Self {
            mesh: icosahedron(1.5, 1),
            position: [3.0, 0.0, -2.0],
            spin: [0.1, 0.15],
            bob: Some(Bob {
                amplitude: 0.3,
                frequency: 0.5,
            }),
            color: [0.0, 1.0, 0.533],
            opacity: 0.1,
        }
    }

    /// The cyan octahedron on the left, spinning the other way.
    pub fn octahedron() -> Self {
        Self {
            mesh: octahedron(1.2, 0),
            position: [-4.0, 1.0, -3.0],
            spin: [-0.08, -0.12],
            bob: None,
            color: [0.0, 0.8, 1.0],
            opacity: 0.08,
        }
    }

    /// Transform at `t` seconds after mount.
    pub fn frame(&self, t: f64) -> SolidFrame {
        let y = match self.bob {
            Some(bob) => (t * bob.frequency).sin() * bob.amplitude,
            None => self.position[1],
        };
        SolidFrame {
            position: [self.position[0] as f32, y as f32, self.position[2] as f32],
            rotation: [(t * self.spin[0]) as f32, (t * self.spin[1]) as f32, 0.0],
            color: self.color,
            opacity: self.opacity,
        }
    }
}

/// Per-frame transform of one solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidFrame {
    pub position: [f32; 3],
    /// Euler angles in radians.
    pub rotation: [f32; 3],
    pub color: [f32; 3],
    pub opacity: f32,
}

/// One frame's render submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldFrame {
    /// Seconds since mount.
    pub time: f64,
    /// Container Euler angles in radians.
    pub rotation: [f32; 3],
    pub material: PointMaterial,
    pub camera: Camera,
    pub pixel_ratio: f32,
    pub solids: [SolidFrame; 2],
}

/// GPU-side resources handed over once at mount.
#[derive(Debug, Clone, Copy)]
pub struct FieldAssets<'a> {
    /// Tightly packed [`ParticleVertex`] data.
    pub vertex_bytes: &'a [u8],
    pub particle_count: usize,
    pub solids: [&'a WireframeMesh; 2],
}

/// Host-side renderer the field submits to.
pub trait FieldRenderer {
    /// Upload the immutable buffers.
    fn upload(&mut self, assets: &FieldAssets<'_>);

    /// Draw one frame.
    fn submit(&mut self, frame: &FieldFrame);

    /// The drawing surface changed size.
    fn resize(&mut self, _viewport: Viewport, _pixel_ratio: f64) {}

    /// Free everything uploaded.
    fn release(&mut self);
}

/// The particle field of one mount.
pub struct ParticleField {
    config: FieldConfig,
    particles: Vec<ParticleVertex>,
    solids: [FloatingSolid; 2],
    renderer: Box<dyn FieldRenderer>,
    time: f64,
    pointer: (f64, f64),
    offset: (f64, f64),
    pixel_ratio: f64,
    torn_down: bool,
}

impl std::fmt::Debug for ParticleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleField")
            .field("particles", &self.particles.len())
            .field("time", &self.time)
            .field("pointer", &self.pointer)
            .field("offset", &self.offset)
            .field("pixel_ratio", &self.pixel_ratio)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl ParticleField {
    /// Generate the particle set for a viewport `width` wide (`None` when
    /// unknown) and upload it.
    pub fn mount(
        config: FieldConfig,
        width: Option<f64>,
        device_pixel_ratio: f64,
        seed: u64,
        mut renderer: Box<dyn FieldRenderer>,
    ) -> Self {
        let count = config.particle_count(width);
        let particles = generate_particles(count, config.extent, seed);
        let solids = [FloatingSolid::icosahedron(), FloatingSolid::octahedron()];
        renderer.upload(&FieldAssets {
            vertex_bytes: bytemuck::cast_slice(&particles),
            particle_count: particles.len(),
            solids: [&solids[0].mesh, &solids[1].mesh],
        });
        let pixel_ratio = config.clamp_pixel_ratio(device_pixel_ratio);
        crate::info!(count, width = ?width, pixel_ratio, "particle field mounted");
        Self {
            config,
            particles,
            solids,
            renderer,
            time: 0.0,
            pointer: (0.0, 0.0),
            offset: (0.0, 0.0),
            pixel_ratio,
            torn_down: false,
        }
    }

    /// Drive a shared field from `clock` in [`Phase::Particles`]: update,
    /// then submit.
    pub fn attach(field: &Rc<RefCell<Self>>, clock: &FrameClock) -> Subscription {
        let weak: Weak<RefCell<Self>> = Rc::downgrade(field);
        clock.subscribe_in(Phase::Particles, move |tick| {
            if let Some(field) = weak.upgrade() {
                let mut field = field.borrow_mut();
                field.tick(tick);
                field.render();
            }
        })
    }

    /// Particle count chosen at mount.
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// The immutable particle set.
    pub fn particles(&self) -> &[ParticleVertex] {
        &self.particles
    }

    /// The particle set as bytes for GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.particles)
    }

    pub fn solids(&self) -> &[FloatingSolid; 2] {
        &self.solids
    }

    /// Clamped device pixel ratio.
    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Seconds since mount.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Set the pointer in normalized device coordinates.
    pub fn set_pointer(&mut self, x: f64, y: f64) {
        if x.is_finite() && y.is_finite() {
            self.pointer = (x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0));
        }
    }

    /// Set the pointer from client coordinates.
    pub fn set_pointer_client(&mut self, viewport: &Viewport, x: f64, y: f64) {
        let (nx, ny) = viewport.normalize_pointer(x, y);
        self.set_pointer(nx, ny);
    }

    /// Smoothing factor for a frame of `dt` seconds.
    pub fn smoothing_factor(&self, dt: f64) -> f64 {
        let s = self.config.pointer_smoothing.clamp(0.0, 1.0);
        if !(dt > 0.0) || !dt.is_finite() {
            return 0.0;
        }
        1.0 - (1.0 - s).powf(dt * 60.0)
    }

    /// Advance time and pointer smoothing.
    pub fn tick(&mut self, tick: &ClockTick) {
        if self.torn_down {
            return;
        }
        let dt = tick.delta_secs();
        if !(dt > 0.0) {
            return;
        }
        self.time += dt;
        let k = self.smoothing_factor(dt);
        let influence = self.config.pointer_influence;
        // Rotation about x follows vertical pointer motion and vice versa.
        let target = (self.pointer.1 * influence, self.pointer.0 * influence);
        self.offset.0 += (target.0 - self.offset.0) * k;
        self.offset.1 += (target.1 - self.offset.1) * k;
    }

    /// Container rotation: constant spin plus the smoothed pointer offset.
    pub fn rotation(&self) -> [f64; 3] {
        [
            self.time * self.config.spin[0] + self.offset.0,
            self.time * self.config.spin[1] + self.offset.1,
            0.0,
        ]
    }

    /// Build the current frame without submitting it.
    pub fn frame(&self) -> FieldFrame {
        FieldFrame {
            time: self.time,
            rotation: self.rotation().map(|r| r as f32),
            material: PointMaterial::glow(self.config.point_size),
            camera: self.config.camera,
            pixel_ratio: self.pixel_ratio as f32,
            solids: [self.solids[0].frame(self.time), self.solids[1].frame(self.time)],
        }
    }

    /// Submit the current frame to the renderer.
    pub fn render(&mut self) {
        if self.torn_down {
            return;
        }
        let frame = self.frame();
        self.renderer.submit(&frame);
    }

    /// React to a viewport change. The particle count stays as mounted.
    pub fn resize(&mut self, viewport: Viewport, device_pixel_ratio: f64) {
        if self.torn_down {
            return;
        }
        self.pixel_ratio = self.config.clamp_pixel_ratio(device_pixel_ratio);
        self.renderer.resize(viewport, self.pixel_ratio);
    }

    /// Release renderer resources. Idempotent.
    pub fn teardown(&mut self) {
        if std::mem::replace(&mut self.torn_down, true) {
            return;
        }
        self.renderer.release();
        crate::debug!("particle field torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl Drop for ParticleField {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        uploads: Vec<(usize, usize)>,
        frames: Vec<FieldFrame>,
        releases: u32,
    }

    struct Recorder(Rc<RefCell<Log>>);

    impl FieldRenderer for Recorder {
        fn upload(&mut self, assets: &FieldAssets<'_>) {
            self.0
                .borrow_mut()
                .uploads
                .push((assets.vertex_bytes.len(), assets.particle_count));
        }

        fn submit(&mut self, frame: &FieldFrame) {
            self.0.borrow_mut().frames.push(*frame);
        }

        fn release(&mut self) {
            self.0.borrow_mut().releases += 1;
        }
    }

    fn mount(width: Option<f64>) -> (ParticleField, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let field = ParticleField::mount(
            FieldConfig::default(),
            width,
            2.0,
            7,
            Box::new(Recorder(log.clone())),
        );
        (field, log)
    }

    #[test]
    fn count_follows_width_buckets() {
        let config = FieldConfig::default();
        assert_eq!(config.particle_count(Some(500.0)), 1800);
        assert_eq!(config.particle_count(Some(767.9)), 1800);
        assert_eq!(config.particle_count(Some(768.0)), 3800);
        assert_eq!(config.particle_count(Some(1920.0)), 3800);
        assert_eq!(config.particle_count(None), 4000);
        assert_eq!(config.particle_count(Some(f64::NAN)), 4000);
    }

    #[test]
    fn particles_fill_cube_with_bucket_colors() {
        let particles = generate_particles(2000, 20.0, 1);
        assert_eq!(particles.len(), 2000);
        for p in &particles {
            assert!(p.position.iter().all(|c| (-10.0..10.0).contains(c)));
            assert!(HUE_BUCKETS.contains(&p.color));
        }
        for bucket in HUE_BUCKETS {
            assert!(particles.iter().any(|p| p.color == bucket));
        }
        assert_eq!(particles, generate_particles(2000, 20.0, 1));
        assert_ne!(particles, generate_particles(2000, 20.0, 2));
    }

    #[test]
    fn mount_uploads_packed_bytes() {
        let (field, log) = mount(Some(500.0));
        assert_eq!(field.particle_count(), 1800);
        assert_eq!(log.borrow().uploads, vec![(1800 * 24, 1800)]);
        assert_eq!(field.vertex_bytes().len(), 1800 * 24);
        assert_eq!(field.pixel_ratio(), 1.75);
    }

    #[test]
    fn rotation_spins_with_time() {
        let (mut field, _log) = mount(None);
        for i in 0..60 {
            field.tick(&ClockTick::new(i as f64 * 1000.0, 1000.0 / 10.0));
        }
        // 60 ticks of 100ms = 6s.
        let [rx, ry, _] = field.rotation();
        assert!((rx - 0.12).abs() < 1e-9);
        assert!((ry - 0.18).abs() < 1e-9);
    }

    #[test]
    fn pointer_offset_eases_toward_target() {
        let (mut field, _log) = mount(None);
        field.set_pointer(1.0, -1.0);
        field.tick(&ClockTick::new(16.0, 1000.0 / 60.0));
        let first = field.offset;
        assert!((first.1 - 0.005).abs() < 1e-9, "{first:?}");
        assert!((first.0 + 0.005).abs() < 1e-9);
        for i in 0..6000 {
            field.tick(&ClockTick::new(i as f64, 1000.0 / 60.0));
        }
        assert!((field.offset.1 - 0.5).abs() < 1e-3);
        assert!((field.offset.0 + 0.5).abs() < 1e-3);
    }

    #[test]
    fn smoothing_is_refresh_rate_independent() {
        let (field, _log) = mount(None);
        let one = field.smoothing_factor(2.0 / 60.0);
        let two = 1.0 - (1.0 - field.smoothing_factor(1.0 / 60.0)).powi(2);
        assert!((one - two).abs() < 1e-12);
    }

    #[test]
    fn solids_animate_independently() {
        let ico = FloatingSolid::icosahedron();
        let frame = ico.frame(std::f64::consts::PI);
        assert!((frame.position[1] - 0.3).abs() < 1e-6);
        assert!((frame.rotation[0] - 0.1 * std::f32::consts::PI).abs() < 1e-5);
        let octa = FloatingSolid::octahedron().frame(10.0);
        assert_eq!(octa.position, [-4.0, 1.0, -3.0]);
        assert!((octa.rotation[1] + 1.2).abs() < 1e-6);
    }

    #[test]
    fn render_submits_additive_frame() {
        let (mut field, log) = mount(Some(1920.0));
        field.tick(&ClockTick::new(16.0, 16.0));
        field.render();
        let log = log.borrow();
        let frame = log.frames.last().unwrap();
        assert_eq!(frame.material.blending, BlendMode::Additive);
        assert!(!frame.material.depth_write);
        assert_eq!(frame.camera.fov_degrees, 60.0);
    }

    #[test]
    fn teardown_releases_once() {
        let (mut field, log) = mount(None);
        field.teardown();
        field.teardown();
        field.render();
        drop(field);
        assert_eq!(log.borrow().releases, 1);
        assert!(log.borrow().frames.is_empty());
    }

    #[test]
    fn attach_renders_each_tick() {
        let clock = FrameClock::default();
        let (field, log) = mount(None);
        let field = Rc::new(RefCell::new(field));
        let _sub = ParticleField::attach(&field, &clock);
        clock.tick(0.0);
        clock.tick(16.0);
        assert_eq!(log.borrow().frames.len(), 2);
    }

    #[test]
    fn validate_rejects_zero_counts() {
        let config = FieldConfig {
            narrow_count: 0,
            ..FieldConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroCount {
                field: "field.narrow_count"
            })
        );
        assert!(FieldConfig::default().validate().is_ok());
    }
}
