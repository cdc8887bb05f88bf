// Host-side tests for insight parsing and the meters it drives.

use nexus_core::insight::*;
use nexus_core::{Intensity, PowerLevel};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn insight_parses_camel_case_reply() {
    let text = r#"
        {"insight": "Focus compounds.", "actionItems": ["rest", "build"], "powerLevel": 73}
    "#;
    let i = Insight::from_json(text).expect("parse");
    assert_eq!(i.insight, "Focus compounds.");
    assert_eq!(i.action_items, vec!["rest", "build"]);
    assert_eq!(i.power().value(), 73.0);
}

#[test]
fn insight_without_power_is_an_error() {
    assert!(Insight::from_json(r#"{"insight":"x"}"#).is_err());
    assert!(Insight::from_json("").is_err());
}

#[test]
fn capability_boost_is_capped() {
    let p = PowerLevel::new(80.0);
    assert!((boost_capability(10.0, p, 0.0) - 18.0).abs() < 1e-5);
    assert!((boost_capability(10.0, p, 0.5) - 25.5).abs() < 1e-5);
    assert_eq!(boost_capability(95.0, p, 0.9), 100.0);
}

#[test]
fn chart_mind_follows_will_only_rises() {
    let mut chart = PotentialChart::default();
    chart.apply(PowerLevel::new(40.0));
    assert_eq!(chart.mind, 40.0);
    assert_eq!(chart.will, 92.0);
    chart.apply(PowerLevel::new(97.0));
    assert_eq!(chart.mind, 97.0);
    assert_eq!(chart.will, 97.0);
    assert_eq!(chart.creativity, 78.0);
    assert_eq!(chart.focus, 65.0);
}

#[test]
fn activity_drives_intensity() {
    assert_eq!(Intensity::for_activity(false, false), Intensity::Normal);
    assert_eq!(Intensity::for_activity(true, false), Intensity::High);
    assert_eq!(Intensity::for_activity(false, true), Intensity::High);
    assert_eq!(Intensity::High.particle_count(), 150);
    assert_eq!(Intensity::Normal.ribbon_count(), 2);
}

#[test]
fn malformed_reply_ends_loading() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut state = InsightState::default();
    state.loading = true;
    assert_eq!(state.intensity(), Intensity::High);

    assert!(Insight::from_json("{\"insight\": oops").is_err());
    assert!(state.ingest("{\"insight\": oops", &mut rng).is_err());
    assert!(!state.loading);
    assert!(state.insight().is_none());
    assert_eq!(state.intensity(), Intensity::for_activity(false, false));
    assert_eq!(state.intensity(), Intensity::Normal);
    // Meters are untouched by a rejected reply
    assert_eq!(state.capabilities.levels, CAPABILITY_SEEDS);
    assert_eq!(state.chart, PotentialChart::default());
}

#[test]
fn accepted_reply_moves_every_meter() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut state = InsightState::default();
    state.loading = true;
    let power = state
        .ingest(r#"{"insight":"go","actionItems":[],"powerLevel":60}"#, &mut rng)
        .expect("ingest");
    assert_eq!(power.value(), 60.0);
    assert!(!state.loading);
    assert_eq!(state.intensity(), Intensity::High);
    assert_eq!(state.chart.mind, 60.0);
    for (level, seed) in state.capabilities.levels.iter().zip(CAPABILITY_SEEDS) {
        assert!(*level >= seed + 6.0 && *level <= seed + 21.0);
    }
    state.clear();
    assert_eq!(state.intensity(), Intensity::Normal);
}

#[test]
fn capabilities_start_at_seeds_and_cap_at_100() {
    let caps = Capabilities::default();
    assert_eq!(caps.levels, [45.0, 55.0, 40.0, 35.0]);

    let mut caps = Capabilities::default();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..20 {
        caps.boost(PowerLevel::new(100.0), &mut rng);
    }
    assert_eq!(caps.levels, [100.0; 4]);
}

#[test]
fn capabilities_jitter_independently() {
    let mut caps = Capabilities {
        levels: [0.0; 4],
    };
    let mut rng = StdRng::seed_from_u64(4);
    caps.boost(PowerLevel::ZERO, &mut rng);
    let first = caps.levels[0];
    assert!(caps.levels.iter().any(|l| *l != first));
}
