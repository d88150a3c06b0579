#![forbid(unsafe_code)]

//! The portfolio page used when no page is supplied.

use kinetic_core::animation::Curve;
use kinetic_core::mapper::{MappedElement, ScrollSource};
use kinetic_core::reveal::{RevealSpec, SpringRevealSpec};
use kinetic_core::stage::SectionSpec;
use kinetic_core::{Channel, ComputedStyle, ProgressMapping, SpringConfig};

use crate::layout::PageLayout;

/// Section ids, top to bottom.
pub const SECTIONS: [&str; 7] = [
    "hero",
    "about",
    "projects",
    "skills",
    "experience",
    "education",
    "contact",
];

const HEIGHTS: [f64; 7] = [900.0, 1100.0, 1800.0, 1000.0, 1200.0, 800.0, 900.0];

/// Proficiency of each skill bar, in percent.
pub const SKILL_LEVELS: [f64; 6] = [95.0, 90.0, 75.0, 90.0, 85.0, 88.0];

/// Skill bar fill: spring-driven scale from 0 to `level / 100`.
pub fn skill_bars() -> SpringRevealSpec {
    SpringRevealSpec::new(
        Channel::Scale,
        0.0,
        SKILL_LEVELS
            .iter()
            .enumerate()
            .map(|(i, level)| (format!("skills-bar-{i}"), *level)),
    )
    .spring(SpringConfig::new(50.0, 20.0, 1.0))
    .unit(0.01)
    .stagger_ms(100.0)
}

/// Geometry of the demo page at `width`.
pub fn demo_layout(width: f64) -> PageLayout {
    let mut page = PageLayout::stacked(width, SECTIONS.into_iter().zip(HEIGHTS));
    page = page
        .with_child("hero", "hero-content", 200.0, 500.0)
        .with_child("about", "about-heading", 120.0, 80.0)
        .with_child("about", "about-image", 260.0, 600.0)
        .with_child("experience", "experience-line", 260.0, 840.0)
        .with_child("education", "education-card", 240.0, 440.0);
    for (i, id) in SECTIONS.iter().enumerate().skip(2) {
        page = page.with_child(id, format!("{id}-heading"), 120.0, 80.0);
        page = page.with_child(id, format!("{id}-list"), 260.0, HEIGHTS[i] - 360.0);
    }
    page
}

fn cards(id: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{id}-item-{i}")).collect()
}

/// Sections with their reveals and scroll-linked elements.
pub fn demo_sections() -> Vec<SectionSpec> {
    let hero_letters = RevealSpec::new(
        (0..8).map(|i| format!("hero-letter-{i}")),
        ComputedStyle::IDENTITY
            .with(Channel::Opacity, 0.0)
            .with(Channel::TranslateY, 120.0)
            .with(Channel::Rotate, -40.0),
        ComputedStyle::IDENTITY,
    )
    .stagger_ms(150.0)
    .duration_ms(1200.0)
    .delay_ms(500.0)
    .curve(Curve::EaseOutQuart);

    let hero_parallax = MappedElement::new("hero-content", ScrollSource::LEAVING)
        .bind_smoothed(
            Channel::TranslateY,
            ProgressMapping::new([0.0, 1.0], [0.0, 300.0]),
            SpringConfig::SOFT,
        )
        .bind(Channel::Scale, ProgressMapping::new([0.0, 0.5], [1.0, 0.9]))
        .bind_smoothed(
            Channel::Opacity,
            ProgressMapping::new([0.0, 0.5], [1.0, 0.0]),
            SpringConfig::SOFT,
        );

    let hero_copy = |target: &str, from: ComputedStyle, delay: f64, duration: f64| {
        RevealSpec::new([target], from, ComputedStyle::IDENTITY)
            .duration_ms(duration)
            .delay_ms(delay)
            .curve(Curve::EaseOutCubic)
    };
    let faded = ComputedStyle::IDENTITY.with(Channel::Opacity, 0.0);

    let hero = SectionSpec::new("hero")
        .reveal(hero_letters)
        .reveal(hero_copy(
            "hero-subtitle",
            faded.with(Channel::TranslateY, 40.0),
            1200.0,
            1000.0,
        ))
        .reveal(hero_copy(
            "hero-cta",
            faded.with(Channel::TranslateY, 30.0),
            1500.0,
            800.0,
        ))
        .reveal(hero_copy(
            "hero-status",
            faded.with(Channel::TranslateX, -30.0),
            1800.0,
            800.0,
        ))
        .reveal(hero_copy(
            "hero-scroll-indicator",
            faded.with(Channel::TranslateY, 20.0),
            2000.0,
            800.0,
        ))
        .mapping(hero_parallax);

    let about = SectionSpec::new("about")
        .reveal_on(
            "about-heading",
            RevealSpec::fade_up(["about-heading"], 60.0).curve(Curve::EaseOutCubic),
        )
        .reveal_on(
            "about-image",
            RevealSpec::fade_up(cards("about", 4), 40.0)
                .stagger_ms(150.0)
                .delay_ms(400.0)
                .curve(Curve::EaseOutCubic),
        )
        .mapping(
            MappedElement::new("about-image", ScrollSource::ON_SCREEN)
                .bind(Channel::TranslateY, ProgressMapping::new([0.0, 1.0], [100.0, -100.0])),
        );

    let mut sections = vec![hero, about];
    for (id, count) in [
        ("projects", 8),
        ("skills", 6),
        ("experience", 4),
        ("education", 3),
        ("contact", 3),
    ] {
        let heading = format!("{id}-heading");
        let list = format!("{id}-list");
        let mut section = SectionSpec::new(id)
            .reveal_on(
                heading.clone(),
                RevealSpec::fade_up([heading], 60.0).curve(Curve::EaseOutCubic),
            )
            .reveal_on(
                list.clone(),
                RevealSpec::fade_up(cards(id, count), 60.0)
                    .stagger_ms(100.0)
                    .curve(Curve::EaseOutCubic),
            );
        section = match id {
            "skills" => section.spring_reveal_on(list, skill_bars()),
            // Timeline fill grows over the first half of the pass.
            "experience" => section.mapping(
                MappedElement::new("experience-line", ScrollSource::ON_SCREEN)
                    .bind(Channel::Scale, ProgressMapping::new([0.0, 0.5], [0.0, 1.0])),
            ),
            "education" => section.mapping(
                MappedElement::new("education-card", ScrollSource::ON_SCREEN)
                    .bind(
                        Channel::Rotate,
                        ProgressMapping::keyframes(&[(0.0, 10.0), (0.5, 0.0), (1.0, -10.0)]),
                    )
                    .bind(
                        Channel::Scale,
                        ProgressMapping::keyframes(&[(0.0, 0.95), (0.5, 1.0), (1.0, 0.95)]),
                    ),
            ),
            _ => section,
        };
        sections.push(section);
    }
    sections
}
