use crate::constants::*;
use crate::power::PowerLevel;
use rand::prelude::*;
use std::fmt::Debug;
use std::time::Duration;

/// Basic oscillator shape used by the soundscape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
}

/// Stable names for every node of the continuous soundscape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeId {
    Master,
    HumBus,
    ResonanceBus,
    ChimeBus,
    Hum1,
    Hum2,
    Resonance,
    ResonanceFilter,
    Destination,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    Gain { level: f32 },
    Oscillator { waveform: Waveform, frequency_hz: f32 },
    BandPass { center_hz: f32, q: f32 },
    Destination,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientNode {
    pub id: NodeId,
    pub kind: NodeKind,
}

/// Static levels for the mixer at construction time.
///
/// - `master`: output level after the three buses are summed
/// - `hum_bus`, `resonance_bus`, `chime_bus`: initial bus gains
/// - `ramp_horizon_sec`: how long a power-level change takes to glide in
#[derive(Clone, Debug)]
pub struct AmbientParams {
    pub master: f32,
    pub hum_bus: f32,
    pub resonance_bus: f32,
    pub chime_bus: f32,
    pub ramp_horizon_sec: f64,
}

impl Default for AmbientParams {
    fn default() -> Self {
        Self {
            master: MASTER_LEVEL,
            hum_bus: HUM_BUS_LEVEL,
            resonance_bus: RESONANCE_BUS_LEVEL,
            chime_bus: CHIME_BUS_LEVEL,
            ramp_horizon_sec: RAMP_HORIZON_SEC,
        }
    }
}

/// Topology of the continuous soundscape as plain data.
///
/// Three buses (hum, resonance, chimes) sum into a master gain that feeds the
/// destination. Two detuned sines feed the hum bus; a triangle runs through a
/// narrow band-pass into the resonance bus. The chime bus has no permanent
/// sources: chime voices attach to it transiently.
#[derive(Clone, Debug)]
pub struct AmbientGraph {
    pub nodes: Vec<AmbientNode>,
    pub edges: Vec<(NodeId, NodeId)>,
}

impl AmbientGraph {
    pub fn build(params: &AmbientParams) -> Self {
        use NodeId::*;
        let gain = |id, level| AmbientNode {
            id,
            kind: NodeKind::Gain { level },
        };
        let osc = |id, waveform, frequency_hz| AmbientNode {
            id,
            kind: NodeKind::Oscillator {
                waveform,
                frequency_hz,
            },
        };
        let nodes = vec![
            AmbientNode {
                id: Destination,
                kind: NodeKind::Destination,
            },
            gain(Master, params.master),
            gain(HumBus, params.hum_bus),
            gain(ResonanceBus, params.resonance_bus),
            gain(ChimeBus, params.chime_bus),
            osc(Hum1, Waveform::Sine, HUM_BASE_HZ),
            osc(Hum2, Waveform::Sine, HUM_BASE_HZ + HUM_DETUNE_HZ),
            osc(Resonance, Waveform::Triangle, RESONANCE_BASE_HZ),
            AmbientNode {
                id: ResonanceFilter,
                // Center left at the WebAudio default; the Q does the shaping
                kind: NodeKind::BandPass {
                    center_hz: 350.0,
                    q: RESONANCE_FILTER_Q,
                },
            },
        ];
        let edges = vec![
            (HumBus, Master),
            (ResonanceBus, Master),
            (ChimeBus, Master),
            (Master, Destination),
            (Hum1, HumBus),
            (Hum2, HumBus),
            (Resonance, ResonanceFilter),
            (ResonanceFilter, ResonanceBus),
        ];
        Self { nodes, edges }
    }

    pub fn node(&self, id: NodeId) -> Option<&AmbientNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn inputs_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |(_, to)| *to == id)
            .map(|(from, _)| *from)
    }

    pub fn outputs_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |(from, _)| *from == id)
            .map(|(_, to)| *to)
    }

    /// Oscillators that run for the whole lifetime of the engine.
    pub fn continuous_sources(&self) -> impl Iterator<Item = &AmbientNode> + '_ {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Oscillator { .. }))
    }

    /// True if a path exists from `id` to the destination.
    pub fn reaches_destination(&self, id: NodeId) -> bool {
        let mut cursor = vec![id];
        let mut seen = Vec::new();
        while let Some(n) = cursor.pop() {
            if n == NodeId::Destination {
                return true;
            }
            if seen.contains(&n) {
                continue;
            }
            seen.push(n);
            cursor.extend(self.outputs_of(n));
        }
        false
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamTarget {
    Frequency(NodeId),
    Gain(NodeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RampCurve {
    Linear,
    Exponential,
}

/// A time-stamped automation step: glide `target` to `value`, arriving at
/// `end_time_sec` (audio clock).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamChange {
    pub target: ParamTarget,
    pub curve: RampCurve,
    pub value: f32,
    pub end_time_sec: f64,
}

/// Where the continuous voices settle for a given power level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModulationTargets {
    pub hum1_hz: f32,
    pub hum2_hz: f32,
    pub resonance_hz: f32,
    pub hum_gain: f32,
    pub resonance_gain: f32,
}

impl ModulationTargets {
    pub fn for_level(level: PowerLevel) -> Self {
        let p = level.value();
        Self {
            hum1_hz: HUM_BASE_HZ + p / 10.0,
            hum2_hz: HUM_BASE_HZ + HUM_DETUNE_HZ + p / 10.0,
            resonance_hz: (RESONANCE_BASE_HZ + p * 2.0).min(CHIME_MAX_HZ),
            hum_gain: 0.3 + p / 300.0,
            resonance_gain: 0.05 + p / 500.0,
        }
    }

    /// Frequencies glide exponentially, bus gains linearly.
    pub fn ramps(&self, now_sec: f64, horizon_sec: f64) -> [ParamChange; 5] {
        use NodeId::*;
        let end_time_sec = now_sec + horizon_sec;
        let step = |target, curve, value| ParamChange {
            target,
            curve,
            value,
            end_time_sec,
        };
        [
            step(ParamTarget::Frequency(Hum1), RampCurve::Exponential, self.hum1_hz),
            step(ParamTarget::Frequency(Hum2), RampCurve::Exponential, self.hum2_hz),
            step(
                ParamTarget::Frequency(Resonance),
                RampCurve::Exponential,
                self.resonance_hz,
            ),
            step(ParamTarget::Gain(HumBus), RampCurve::Linear, self.hum_gain),
            step(
                ParamTarget::Gain(ResonanceBus),
                RampCurve::Linear,
                self.resonance_gain,
            ),
        ]
    }
}

/// Delay before the chime timer fires again; shrinks with power but stays
/// positive.
pub fn chime_interval(level: PowerLevel) -> Duration {
    let ms = CHIME_INTERVAL_BASE_MS - CHIME_INTERVAL_PER_LEVEL_MS * level.value() as f64;
    Duration::from_secs_f64(ms.max(CHIME_INTERVAL_FLOOR_MS) / 1000.0)
}

/// Probability that a timer tick produces a chime.
pub fn chime_spawn_chance(level: PowerLevel) -> f32 {
    (CHIME_CHANCE_BASE + level.value() / CHIME_CHANCE_DIVISOR).clamp(0.0, 1.0)
}

/// Attack/decay envelope, times relative to the chime start.
///
/// The gain ramps linearly from 0 to `peak` at `attack_sec`, then decays
/// exponentially to [`CHIME_DECAY_FLOOR`] at `decay_sec`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub attack_sec: f64,
    pub peak: f32,
    pub decay_sec: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChimeVoice {
    pub waveform: Waveform,
    pub frequency_hz: f32,
    pub detune_cents: f32,
    pub envelope: Envelope,
}

/// One two-voice chime: a main tone plus a companion a fifth above.
/// Both oscillators stop at `stop_after_sec` relative to the start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChimeEvent {
    pub main: ChimeVoice,
    pub companion: ChimeVoice,
    pub stop_after_sec: f64,
}

/// Random chime generator. Owns its RNG so a seed fully determines the
/// sequence of chimes.
pub struct ChimeScheduler {
    rng: StdRng,
}

impl ChimeScheduler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Roll the spawn gate; on success compose a chime for `level`.
    pub fn poll(&mut self, level: PowerLevel) -> Option<ChimeEvent> {
        if self.rng.gen::<f32>() < chime_spawn_chance(level) {
            Some(self.compose(level))
        } else {
            None
        }
    }

    pub fn compose(&mut self, level: PowerLevel) -> ChimeEvent {
        let p = level.value();
        let waveform = self.pick_waveform(p);
        let base = *CHIME_BASE_FREQS
            .choose(&mut self.rng)
            .unwrap_or(&CHIME_BASE_FREQS[0]);
        let shift = self.octave_shift(p);
        let frequency_hz =
            (base * 2.0_f32.powi(shift) * (1.0 + p / 400.0)).min(CHIME_MAX_HZ);
        let detune_cents = (self.rng.gen::<f32>() - 0.5) * (p / 5.0);

        let attack_sec = 0.05 + self.rng.gen::<f64>() * 0.1;
        let decay_sec = (2.0 + p as f64 / 40.0).min(CHIME_MAX_DECAY_SEC);

        ChimeEvent {
            main: ChimeVoice {
                waveform,
                frequency_hz,
                detune_cents: 0.0,
                envelope: Envelope {
                    attack_sec,
                    peak: (0.08 + p / 1000.0).min(CHIME_MAX_PEAK),
                    decay_sec,
                },
            },
            companion: ChimeVoice {
                waveform: Waveform::Sine,
                frequency_hz: (frequency_hz * CHIME_FIFTH_RATIO).min(CHIME_MAX_HZ),
                detune_cents,
                envelope: Envelope {
                    attack_sec: attack_sec * 2.0,
                    peak: (0.02 + p / 2000.0).min(CHIME_MAX_PEAK),
                    decay_sec: decay_sec * 0.8,
                },
            },
            stop_after_sec: decay_sec + CHIME_STOP_PAD_SEC,
        }
    }

    fn pick_waveform(&mut self, p: f32) -> Waveform {
        if p < 30.0 {
            Waveform::Sine
        } else if p < 70.0 {
            if self.rng.gen::<f32>() > 0.4 {
                Waveform::Sine
            } else {
                Waveform::Triangle
            }
        } else {
            let r = self.rng.gen::<f32>();
            if r > 0.6 {
                Waveform::Sine
            } else if r > 0.2 {
                Waveform::Triangle
            } else {
                Waveform::Sawtooth
            }
        }
    }

    fn octave_shift(&mut self, p: f32) -> i32 {
        if p > 80.0 {
            if self.rng.gen::<f32>() > 0.5 {
                2
            } else {
                1
            }
        } else if p > 40.0 {
            1
        } else {
            0
        }
    }
}

/// Platform seam between the engine and a real audio graph.
///
/// The browser front-end implements this on top of WebAudio; tests implement
/// it with a recorder.
pub trait AudioBackend {
    /// Current time of the backend's audio clock, in seconds.
    fn now(&self) -> f64;
    fn apply(&mut self, change: &ParamChange);
    fn play_chime(&mut self, chime: &ChimeEvent, start_sec: f64);
    fn shutdown(&mut self);
}

/// Owns the continuous soundscape and chime generation for one session.
///
/// Typical usage:
/// - Construct with `AmbientEngine::new(params, seed)`
/// - Call `init_with` from a user gesture; it is idempotent
/// - Call `set_power_level` whenever the level changes
/// - Call `on_chime_timer` every `chime_interval()`
pub struct AmbientEngine<B: AudioBackend> {
    pub params: AmbientParams,
    backend: Option<B>,
    level: PowerLevel,
    chimes: ChimeScheduler,
}

impl<B: AudioBackend> AmbientEngine<B> {
    pub fn new(params: AmbientParams, seed: u64) -> Self {
        Self {
            params,
            backend: None,
            level: PowerLevel::ZERO,
            chimes: ChimeScheduler::new(seed),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    pub fn level(&self) -> PowerLevel {
        self.level
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    /// Build the graph with `make`. Returns true only when this call created
    /// the backend; a second call is a no-op and a failing `make` leaves the
    /// engine uninitialized.
    pub fn init_with<E, F>(&mut self, make: F) -> bool
    where
        E: Debug,
        F: FnOnce(&AmbientGraph) -> Result<B, E>,
    {
        if self.backend.is_some() {
            return false;
        }
        let graph = AmbientGraph::build(&self.params);
        match make(&graph) {
            Ok(backend) => {
                self.backend = Some(backend);
                log::info!("[audio] soundscape started");
                self.apply_level();
                true
            }
            Err(e) => {
                log::warn!("[audio] soundscape unavailable: {:?}", e);
                false
            }
        }
    }

    /// Returns false, and leaves ramps untouched, when `level` is already
    /// current.
    pub fn set_power_level(&mut self, level: PowerLevel) -> bool {
        if level == self.level {
            return false;
        }
        self.level = level;
        self.apply_level();
        true
    }

    fn apply_level(&mut self) {
        let horizon = self.params.ramp_horizon_sec;
        let level = self.level;
        if let Some(b) = self.backend.as_mut() {
            for change in ModulationTargets::for_level(level).ramps(b.now(), horizon) {
                b.apply(&change);
            }
        }
    }

    pub fn chime_interval(&self) -> Duration {
        chime_interval(self.level)
    }

    /// Timer callback. Returns the chime that was played, if any.
    pub fn on_chime_timer(&mut self) -> Option<ChimeEvent> {
        let b = self.backend.as_mut()?;
        let chime = self.chimes.poll(self.level)?;
        let now = b.now();
        b.play_chime(&chime, now);
        Some(chime)
    }

    pub fn shutdown(&mut self) {
        if let Some(mut b) = self.backend.take() {
            b.shutdown();
            log::info!("[audio] soundscape stopped");
        }
    }
}
