// Host-side tests for front-end presentation constants.
// The main crate is wasm-only, so we include the pure-Rust module directly.

#![allow(dead_code)]
mod constants {
    include!("../src/constants.rs");
}

use constants::*;
use nexus_core::constants as core_consts;

#[test]
fn canvas_style_tracks_intensity_and_power() {
    assert_eq!(canvas_style(false, 0.0), "opacity:0.3;filter:none");
    assert_eq!(canvas_style(true, 50.0), "opacity:0.7;filter:none");
    assert_eq!(canvas_style(true, 95.0), "opacity:0.7;filter:none");
    assert_eq!(canvas_style(false, 96.0), "opacity:0.3;filter:saturate(1.5)");
}

#[test]
fn voice_labels_switch_with_state() {
    assert_eq!(voice_labels(false), (VOICE_LABEL_IDLE, VOICE_STATUS_IDLE));
    assert_eq!(voice_labels(true), (VOICE_LABEL_ACTIVE, VOICE_STATUS_ACTIVE));
    assert_ne!(VOICE_LABEL_IDLE, VOICE_LABEL_ACTIVE);
}

#[test]
fn element_ids_are_distinct() {
    let ids = [
        CANVAS_ID,
        AUDIO_BUTTON_ID,
        VOICE_BUTTON_ID,
        VOICE_STATUS_ID,
        TRANSCRIPT_ID,
    ];
    for (i, a) in ids.iter().enumerate() {
        assert!(!a.is_empty());
        for b in &ids[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert!(ENDPOINT_ATTR.starts_with("data-"));
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn core_constants_are_consistent() {
    // Bus levels are attenuations
    for level in [
        core_consts::MASTER_LEVEL,
        core_consts::HUM_BUS_LEVEL,
        core_consts::RESONANCE_BUS_LEVEL,
        core_consts::CHIME_BUS_LEVEL,
    ] {
        assert!(level > 0.0 && level <= 1.0);
    }
    assert!(core_consts::CHIME_INTERVAL_FLOOR_MS > 0.0);
    assert!(core_consts::CHIME_INTERVAL_FLOOR_MS < core_consts::CHIME_INTERVAL_BASE_MS);
    assert!(core_consts::CHIME_DECAY_FLOOR > 0.0);
    assert!(core_consts::PARTICLES_HIGH > core_consts::PARTICLES_NORMAL);
    assert!(core_consts::RIBBONS_HIGH > core_consts::RIBBONS_NORMAL);
    assert!(core_consts::PLAYBACK_SAMPLE_RATE > core_consts::CAPTURE_SAMPLE_RATE);
    assert!(core_consts::CHIME_BASE_FREQS.windows(2).all(|w| w[0] < w[1]));
}
