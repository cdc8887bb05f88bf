// Shared audio/visual tuning constants for the soundscape, the particle field
// and the voice bridge.

// ---------------- Ambient audio ----------------
pub const MASTER_LEVEL: f32 = 0.15; // global listening level
pub const HUM_BUS_LEVEL: f32 = 0.4;
pub const RESONANCE_BUS_LEVEL: f32 = 0.1;
pub const CHIME_BUS_LEVEL: f32 = 0.2;

pub const HUM_BASE_HZ: f32 = 55.0; // A1
pub const HUM_DETUNE_HZ: f32 = 0.5; // slow beating between the two hum sines
pub const RESONANCE_BASE_HZ: f32 = 110.0;
pub const RESONANCE_FILTER_Q: f32 = 10.0;

pub const RAMP_HORIZON_SEC: f64 = 0.5;

pub const CHIME_INTERVAL_BASE_MS: f64 = 2500.0;
pub const CHIME_INTERVAL_PER_LEVEL_MS: f64 = 10.0;
pub const CHIME_INTERVAL_FLOOR_MS: f64 = 50.0;
pub const CHIME_CHANCE_BASE: f32 = 0.2;
pub const CHIME_CHANCE_DIVISOR: f32 = 150.0;

/// C5 to C6 pentatonic.
pub const CHIME_BASE_FREQS: [f32; 6] = [523.25, 587.33, 659.25, 783.99, 880.00, 1046.50];
pub const CHIME_FIFTH_RATIO: f32 = 1.5;
pub const CHIME_DECAY_FLOOR: f32 = 0.001; // exponential ramps cannot reach 0
pub const CHIME_STOP_PAD_SEC: f64 = 0.1;
pub const CHIME_MAX_HZ: f32 = 20_000.0;
pub const CHIME_MAX_PEAK: f32 = 0.5;
pub const CHIME_MAX_DECAY_SEC: f64 = 12.0;

// ---------------- Particle field ----------------
pub const PARTICLES_NORMAL: usize = 60;
pub const PARTICLES_HIGH: usize = 150;
pub const RIBBONS_NORMAL: usize = 2;
pub const RIBBONS_HIGH: usize = 6;
pub const RIBBON_POINTS: usize = 5;

pub const RIBBON_DRIFT_PX: f32 = 0.3;
pub const ATTRACT_RADIUS_PX: f32 = 250.0;
pub const ATTRACT_COEFF: f32 = 0.005;
pub const LINK_BASE_DISTANCE_PX: f32 = 150.0;
pub const LINK_MAX_ALPHA: f32 = 0.1;
pub const LINK_LINE_WIDTH: f32 = 0.2;

pub const WASH_THRESHOLD: f32 = 60.0;
pub const WASH_ALPHA_DIVISOR: f32 = 2000.0;
pub const RIBBON_ACCENT_THRESHOLD: f32 = 80.0;
pub const RING_PERIOD_MS: f64 = 800.0;

// ---------------- Voice bridge ----------------
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;
pub const CAPTURE_BLOCK_FRAMES: u32 = 4096;
pub const PCM_SCALE: f32 = 32768.0;
