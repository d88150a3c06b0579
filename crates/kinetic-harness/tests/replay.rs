#![forbid(unsafe_code)]

//! Scripted replay tests against the demo page.
//!
//! # Running Tests
//!
//! ```sh
//! cargo test -p kinetic-harness --test replay
//! ```

use kinetic_core::Viewport;
use kinetic_core::cursor::PointerKind;
use kinetic_core::loader::LoaderPhase;
use kinetic_core::{Channel, ComputedStyle, ProgressMapping, StageEvent};
use kinetic_harness::demo::{SKILL_LEVELS, skill_bars};
use kinetic_harness::{FrameRecord, Harness, Step, parse_script};
use proptest::prelude::*;

const VIEW: Viewport = Viewport::new(1440.0, 900.0);
const LIMIT: f64 = 7700.0 - 900.0;

const TOUR: &str = r#"[
    {"step":"wait","ms":4000},
    {"step":"pointer_move","x":700,"y":400},
    {"step":"wheel","delta":600},
    {"step":"wait","ms":1500},
    {"step":"hover_enter","label":"View"},
    {"step":"wait","ms":300},
    {"step":"hover_leave"},
    {"step":"navigate","section":"contact"},
    {"step":"wait","ms":3000},
    {"step":"hidden","ms":20000},
    {"step":"key","key":"Home"},
    {"step":"wait","ms":3000}
]"#;

fn replay(script: &str) -> Vec<FrameRecord> {
    let steps = parse_script(script).unwrap();
    let mut harness = Harness::demo(VIEW, PointerKind::Fine).unwrap();
    harness.run_script(&steps);
    harness.records().to_vec()
}

fn ready() -> Harness {
    let mut harness = Harness::demo(VIEW, PointerKind::Fine).unwrap();
    harness.apply(&Step::SkipLoader);
    harness.run(100.0);
    harness
}

fn go_to(harness: &mut Harness, section: &str, ms: f64) {
    harness.apply(&Step::Navigate {
        section: section.into(),
    });
    harness.run(ms);
}

/// Time of the first frame in which `target` was written with `channel`
/// away from `from`.
fn first_move(records: &[FrameRecord], target: &str, channel: Channel, from: f64) -> Option<f64> {
    records
        .iter()
        .find(|r| r.writes.get(target).is_some_and(|s| s.get(channel) != from))
        .map(|r| r.time_ms)
}

fn events(records: &[FrameRecord]) -> Vec<StageEvent> {
    records.iter().flat_map(|r| r.events.iter().cloned()).collect()
}

// ── Determinism ─────────────────────────────────────────────────────────

#[test]
fn replay_is_deterministic() {
    assert_eq!(replay(TOUR), replay(TOUR));
}

// ── Full tour ───────────────────────────────────────────────────────────

#[test]
fn tour_runs_loader_then_ready() {
    let records = replay(TOUR);
    let events = events(&records);
    let phases: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StageEvent::LoaderPhaseChanged(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![LoaderPhase::Holding, LoaderPhase::Exiting, LoaderPhase::Done]
    );
    assert_eq!(events.iter().filter(|e| **e == StageEvent::Ready).count(), 1);

    // Scrolling is held until the page is ready.
    let first_ready = records.iter().position(|r| r.ready).unwrap();
    assert!(records[..first_ready].iter().all(|r| r.scroll.virtual_offset == 0.0));
}

#[test]
fn tour_visits_contact_and_returns_home() {
    let records = replay(TOUR);
    let reached_contact = records
        .iter()
        .any(|r| r.active_section.as_deref() == Some("contact"));
    assert!(reached_contact);
    let last = records.last().unwrap();
    assert_eq!(last.scroll.virtual_offset, 0.0);
    assert_eq!(last.active_section.as_deref(), Some("hero"));
    assert_eq!(last.chrome.background_alpha, 0.0);
}

#[test]
fn hero_fades_as_it_leaves() {
    let mut harness = Harness::demo(VIEW, PointerKind::Fine).unwrap();
    harness.apply(&Step::SkipLoader);
    harness.run(100.0);
    harness.apply(&Step::Wheel { delta: 900.0 });
    harness.run(3000.0);
    let hero = harness.style_of("hero-content").unwrap();
    assert!(hero.get(Channel::Opacity) < 0.05, "{hero:?}");
    assert!(hero.get(Channel::TranslateY) > 0.0);
}

#[test]
fn hero_translate_lags_behind_scroll() {
    let mut harness = ready();
    let start = harness.records().len();
    harness.apply(&Step::Wheel { delta: 600.0 });
    harness.run(5000.0);

    // hero-content spans 200..700; it leaves over that stretch.
    let translate = ProgressMapping::new([0.0, 1.0], [0.0, 300.0]);
    let scale = ProgressMapping::new([0.0, 0.5], [1.0, 0.9]);
    let mut lagged = false;
    for record in &harness.records()[start..] {
        let progress = (record.scroll.virtual_offset - 200.0) / 500.0;
        let style = record.mapped["hero-content"];
        assert!((style.get(Channel::Scale) - scale.map(progress)).abs() < 1e-9);
        lagged |= style.get(Channel::TranslateY) < translate.map(progress) - 1.0;
    }
    assert!(lagged, "translateY tracked the offset without smoothing");

    let last = harness.last().unwrap();
    let progress = (last.scroll.virtual_offset - 200.0) / 500.0;
    let settled = last.mapped["hero-content"].get(Channel::TranslateY);
    assert!((settled - translate.map(progress)).abs() < 0.5, "{settled}");
}

#[test]
fn hero_copy_enters_after_the_title() {
    let mut harness = Harness::demo(VIEW, PointerKind::Fine).unwrap();
    harness.run(4000.0);
    let records = harness.records();
    let subtitle = first_move(records, "hero-subtitle", Channel::Opacity, 0.0).unwrap();
    let cta = first_move(records, "hero-cta", Channel::Opacity, 0.0).unwrap();
    let status = first_move(records, "hero-status", Channel::Opacity, 0.0).unwrap();
    let indicator = first_move(records, "hero-scroll-indicator", Channel::Opacity, 0.0).unwrap();
    let frame = 1000.0 / 60.0;
    for (at, gap) in [(cta, 300.0), (status, 600.0), (indicator, 800.0)] {
        assert!(((at - subtitle) - gap).abs() <= frame + 1e-6, "{at} {subtitle}");
    }
    for target in ["hero-subtitle", "hero-cta", "hero-status", "hero-scroll-indicator"] {
        assert_eq!(harness.style_of(target), Some(ComputedStyle::IDENTITY), "{target}");
    }
    let status_from = records
        .iter()
        .find_map(|r| r.writes.get("hero-status"))
        .unwrap();
    assert_eq!(status_from.get(Channel::TranslateX), -30.0);
}

#[test]
fn experience_line_fills_over_first_half() {
    let mut harness = ready();
    assert_eq!(harness.last().unwrap().mapped["experience-line"].get(Channel::Scale), 0.0);

    // The line (5060..5900) is on screen from 4160 to 5900.
    go_to(&mut harness, "experience", 3000.0);
    let last = harness.last().unwrap();
    let fill = last.mapped["experience-line"].get(Channel::Scale);
    let expected = ((last.scroll.virtual_offset - 4160.0) / 1740.0 * 2.0).clamp(0.0, 1.0);
    assert!((fill - expected).abs() < 1e-9, "{fill} vs {expected}");
    assert!(fill > 0.0 && fill < 1.0);

    go_to(&mut harness, "contact", 3000.0);
    assert_eq!(harness.last().unwrap().mapped["experience-line"].get(Channel::Scale), 1.0);
}

#[test]
fn education_card_tilts_through_keyframes() {
    let mut harness = ready();
    go_to(&mut harness, "education", 3000.0);
    let card = harness.last().unwrap().mapped["education-card"];
    assert!((0.0..10.0).contains(&card.get(Channel::Rotate)), "{card:?}");
    assert!((0.95..=1.0).contains(&card.get(Channel::Scale)), "{card:?}");

    go_to(&mut harness, "contact", 3000.0);
    let card = harness.last().unwrap().mapped["education-card"];
    assert_eq!(card.get(Channel::Rotate), -10.0);
    assert_eq!(card.get(Channel::Scale), 0.95);
}

#[test]
fn skill_bars_spring_to_their_level() {
    let mut harness = ready();
    let start = harness.records().len();
    go_to(&mut harness, "skills", 8000.0);
    let records = &harness.records()[start..];

    let spec = skill_bars();
    let first = first_move(records, "skills-bar-0", Channel::Scale, 0.0).unwrap();
    for (i, level) in SKILL_LEVELS.iter().enumerate() {
        let bar = format!("skills-bar-{i}");
        let moved = first_move(records, &bar, Channel::Scale, 0.0).unwrap();
        let gap = 100.0 * i as f64;
        assert!(((moved - first) - gap).abs() <= 2.0 * 1000.0 / 60.0 + 1e-6, "{bar}");
        let style = harness.style_of(&bar).unwrap();
        assert_eq!(spec.readout(&style), *level as i64, "{bar}");
    }
}

#[test]
fn project_cards_reveal_once() {
    let mut harness = Harness::demo(VIEW, PointerKind::Fine).unwrap();
    harness.apply(&Step::SkipLoader);
    harness.apply(&Step::Navigate {
        section: "projects".into(),
    });
    harness.run(4000.0);
    let card = harness.style_of("projects-item-7").unwrap();
    assert_eq!(card.get(Channel::Opacity), 1.0);
    assert_eq!(card.get(Channel::TranslateY), 0.0);

    // Going back up and down again does not replay the batch.
    harness.apply(&Step::Key {
        key: kinetic_core::scroll::ScrollKey::Home,
    });
    harness.run(3000.0);
    harness.apply(&Step::Navigate {
        section: "projects".into(),
    });
    let before = harness.records().len();
    harness.run(3000.0);
    let rewritten = harness.records()[before..]
        .iter()
        .any(|r| r.writes.contains_key("projects-item-7"));
    assert!(!rewritten);
}

#[test]
fn coarse_pointer_records_no_cursor() {
    let mut harness = Harness::demo(VIEW, PointerKind::Coarse).unwrap();
    harness.apply(&Step::PointerMove { x: 10.0, y: 10.0 });
    harness.run(200.0);
    assert!(harness.records().iter().all(|r| r.cursor.is_none()));
}

#[test]
fn particle_field_rotates_every_frame() {
    let mut harness = Harness::demo(VIEW, PointerKind::Fine).unwrap();
    harness.run(500.0);
    let rotations: Vec<_> = harness
        .records()
        .iter()
        .filter_map(|r| r.field_rotation)
        .collect();
    assert_eq!(rotations.len(), harness.records().len());
    assert!(rotations.windows(2).all(|w| w[0] != w[1]));
}

// ═════════════════════════════════════════════════════════════════════════
// Random scripts
// ═════════════════════════════════════════════════════════════════════════

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0.0f64..500.0).prop_map(|ms| Step::Wait { ms }),
        (-3000.0f64..3000.0).prop_map(|delta| Step::Wheel { delta }),
        (-1000.0f64..1000.0).prop_map(|delta| Step::Touch { delta }),
        (0.0f64..1440.0, 0.0f64..900.0).prop_map(|(x, y)| Step::PointerMove { x, y }),
        prop::sample::select(vec!["hero", "skills", "contact", "nowhere"])
            .prop_map(|s| Step::Navigate { section: s.into() }),
        (0.0f64..10_000.0).prop_map(|ms| Step::Hidden { ms }),
        Just(Step::SkipLoader),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn random_scripts_stay_in_bounds(steps in prop::collection::vec(step(), 1..20)) {
        let mut harness = Harness::demo(VIEW, PointerKind::Fine).unwrap();
        harness.run_script(&steps);
        harness.run(100.0);
        for record in harness.records() {
            let scroll = record.scroll;
            prop_assert!((0.0..=LIMIT).contains(&scroll.raw_offset));
            prop_assert!((0.0..=LIMIT).contains(&scroll.virtual_offset));
            prop_assert!(scroll.velocity.is_finite());
            prop_assert!(record.loader.progress <= 100);
            prop_assert!((0.0..=1.0).contains(&record.loader.overlay_opacity));
        }
    }
}
