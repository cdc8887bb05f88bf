// DOM contract and presentation constants for the browser front-end.
// Pure values only: host tests pull this file in with `include!`.

// Element ids the host page provides
pub const CANVAS_ID: &str = "fx-canvas";
pub const AUDIO_BUTTON_ID: &str = "enable-audio";
pub const VOICE_BUTTON_ID: &str = "voice-toggle";
pub const VOICE_STATUS_ID: &str = "voice-status";
pub const TRANSCRIPT_ID: &str = "voice-transcript";

// Attribute on the voice button carrying the socket URL
pub const ENDPOINT_ATTR: &str = "data-endpoint";

pub const HIDDEN_CLASS: &str = "hidden";

// Canvas presentation
pub const CANVAS_OPACITY_NORMAL: f32 = 0.3;
pub const CANVAS_OPACITY_HIGH: f32 = 0.7;
pub const SATURATE_THRESHOLD: f32 = 95.0;
pub const SATURATE_AMOUNT: f32 = 1.5;

// Voice toggle labels
pub const VOICE_LABEL_IDLE: &str = "🎙️";
pub const VOICE_LABEL_ACTIVE: &str = "⏹️";
pub const VOICE_STATUS_IDLE: &str = "شروع ارتباط عصبی";
pub const VOICE_STATUS_ACTIVE: &str = "در حال دریافت فرکانس...";

/// Inline style for the background canvas.
pub fn canvas_style(high_intensity: bool, power_level: f32) -> String {
    let opacity = if high_intensity {
        CANVAS_OPACITY_HIGH
    } else {
        CANVAS_OPACITY_NORMAL
    };
    let filter = if power_level > SATURATE_THRESHOLD {
        format!("saturate({})", SATURATE_AMOUNT)
    } else {
        "none".to_string()
    };
    format!("opacity:{};filter:{}", opacity, filter)
}

/// Button glyph and status line for the voice toggle.
pub fn voice_labels(active: bool) -> (&'static str, &'static str) {
    if active {
        (VOICE_LABEL_ACTIVE, VOICE_STATUS_ACTIVE)
    } else {
        (VOICE_LABEL_IDLE, VOICE_STATUS_IDLE)
    }
}
