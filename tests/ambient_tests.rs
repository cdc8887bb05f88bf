// Host-side tests for the ambient soundscape engine.
// The WebAudio backend is wasm-only, so a recording backend stands in for it.

use nexus_core::ambient::*;
use nexus_core::constants::*;
use nexus_core::PowerLevel;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
struct Log {
    builds: usize,
    changes: Vec<ParamChange>,
    chimes: Vec<(ChimeEvent, f64)>,
    shutdowns: usize,
}

struct Recorder {
    log: Rc<RefCell<Log>>,
    clock: f64,
}

impl AudioBackend for Recorder {
    fn now(&self) -> f64 {
        self.clock
    }
    fn apply(&mut self, change: &ParamChange) {
        self.log.borrow_mut().changes.push(*change);
    }
    fn play_chime(&mut self, chime: &ChimeEvent, start_sec: f64) {
        self.log.borrow_mut().chimes.push((*chime, start_sec));
    }
    fn shutdown(&mut self) {
        self.log.borrow_mut().shutdowns += 1;
    }
}

fn recorder(log: &Rc<RefCell<Log>>, clock: f64) -> impl FnOnce(&AmbientGraph) -> Result<Recorder, ()> {
    let log = log.clone();
    move |_graph| {
        log.borrow_mut().builds += 1;
        Ok(Recorder { log, clock })
    }
}

fn targets(p: f32) -> ModulationTargets {
    ModulationTargets::for_level(PowerLevel::new(p))
}

#[test]
fn modulation_matches_formulas() {
    let t = targets(0.0);
    assert!((t.hum1_hz - 55.0).abs() < 1e-4);
    assert!((t.hum2_hz - 55.5).abs() < 1e-4);
    assert!((t.resonance_hz - 110.0).abs() < 1e-4);
    assert!((t.hum_gain - 0.3).abs() < 1e-6);
    assert!((t.resonance_gain - 0.05).abs() < 1e-6);

    let t = targets(100.0);
    assert!((t.hum1_hz - 65.0).abs() < 1e-4);
    assert!((t.hum2_hz - 65.5).abs() < 1e-4);
    assert!((t.resonance_hz - 310.0).abs() < 1e-3);
    assert!((t.resonance_gain - 0.25).abs() < 1e-6);
}

#[test]
fn modulation_is_monotonic_in_power() {
    let mut prev = targets(0.0);
    for i in 1..=300 {
        let t = targets(i as f32 * 0.5);
        assert!(t.hum1_hz >= prev.hum1_hz);
        assert!(t.hum2_hz >= prev.hum2_hz);
        assert!(t.resonance_hz >= prev.resonance_hz);
        assert!(t.hum_gain >= prev.hum_gain);
        assert!(t.resonance_gain >= prev.resonance_gain);
        prev = t;
    }
}

#[test]
fn modulation_stays_finite_for_extreme_levels() {
    for p in [f32::NAN, -50.0, 0.0, 100.0, 1e6, f32::INFINITY] {
        let t = targets(p);
        for v in [t.hum1_hz, t.hum2_hz, t.resonance_hz, t.hum_gain, t.resonance_gain] {
            assert!(v.is_finite() && v > 0.0, "level {} gave {}", p, v);
        }
        assert!(t.resonance_hz <= CHIME_MAX_HZ);
    }
}

#[test]
fn ramps_use_exponential_frequency_and_linear_gain() {
    let ramps = targets(40.0).ramps(3.0, 0.5);
    for r in &ramps {
        assert!((r.end_time_sec - 3.5).abs() < 1e-9);
        match r.target {
            ParamTarget::Frequency(_) => assert_eq!(r.curve, RampCurve::Exponential),
            ParamTarget::Gain(_) => assert_eq!(r.curve, RampCurve::Linear),
        }
    }
    let freq = ramps
        .iter()
        .filter(|r| matches!(r.target, ParamTarget::Frequency(_)))
        .count();
    assert_eq!(freq, 3);
}

#[test]
fn rising_power_scenario() {
    let levels = [0.0, 45.0, 92.0];
    let hum = [0.3, 0.45, 0.606_67];
    let chance = [0.2, 0.5, 1.0];
    let mut prev_interval = Duration::MAX;
    for ((p, h), c) in levels.iter().zip(hum).zip(chance) {
        let level = PowerLevel::new(*p);
        assert!((ModulationTargets::for_level(level).hum_gain - h).abs() < 1e-4);
        assert!((chime_spawn_chance(level) - c).abs() < 1e-4);
        let interval = chime_interval(level);
        assert!(interval > Duration::ZERO);
        assert!(interval < prev_interval);
        prev_interval = interval;
    }
}

#[test]
fn chime_interval_has_a_floor() {
    assert_eq!(chime_interval(PowerLevel::new(100.0)), Duration::from_millis(1500));
    assert_eq!(
        chime_interval(PowerLevel::new(1e9)),
        Duration::from_millis(CHIME_INTERVAL_FLOOR_MS as u64)
    );
}

#[test]
fn graph_topology_routes_everything_to_destination() {
    let graph = AmbientGraph::build(&AmbientParams::default());
    for node in &graph.nodes {
        assert!(graph.reaches_destination(node.id), "{:?} is orphaned", node.id);
    }
    let mut hum_inputs: Vec<NodeId> = graph.inputs_of(NodeId::HumBus).collect();
    hum_inputs.sort_by_key(|id| format!("{:?}", id));
    assert_eq!(hum_inputs, vec![NodeId::Hum1, NodeId::Hum2]);
    assert_eq!(
        graph.outputs_of(NodeId::Resonance).collect::<Vec<_>>(),
        vec![NodeId::ResonanceFilter]
    );
    assert_eq!(graph.inputs_of(NodeId::ChimeBus).count(), 0);
    assert_eq!(graph.continuous_sources().count(), 3);

    match graph.node(NodeId::ResonanceFilter).map(|n| n.kind) {
        Some(NodeKind::BandPass { q, .. }) => assert_eq!(q, 10.0),
        other => panic!("unexpected filter {:?}", other),
    }
    match graph.node(NodeId::Master).map(|n| n.kind) {
        Some(NodeKind::Gain { level }) => assert!((level - 0.15).abs() < 1e-6),
        other => panic!("unexpected master {:?}", other),
    }
}

#[test]
fn init_is_idempotent() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut engine: AmbientEngine<Recorder> = AmbientEngine::new(AmbientParams::default(), 7);
    assert!(engine.init_with(recorder(&log, 1.0)));
    let applied = log.borrow().changes.len();
    assert!(!engine.init_with(recorder(&log, 1.0)));
    assert_eq!(log.borrow().builds, 1);
    assert_eq!(log.borrow().changes.len(), applied);
    assert!(engine.is_initialized());
}

#[test]
fn failed_init_leaves_engine_uninitialized() {
    let mut engine: AmbientEngine<Recorder> = AmbientEngine::new(AmbientParams::default(), 7);
    assert!(!engine.init_with(|_| Err("no audio api")));
    assert!(!engine.is_initialized());
    assert!(engine.on_chime_timer().is_none());
}

#[test]
fn power_changes_before_init_are_remembered() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut engine: AmbientEngine<Recorder> = AmbientEngine::new(AmbientParams::default(), 7);
    engine.set_power_level(PowerLevel::new(60.0));
    assert!(engine.on_chime_timer().is_none());
    assert!(log.borrow().changes.is_empty());

    engine.init_with(recorder(&log, 2.0));
    let changes = log.borrow().changes.clone();
    assert_eq!(changes.len(), 5);
    let hum1 = changes
        .iter()
        .find(|c| c.target == ParamTarget::Frequency(NodeId::Hum1))
        .expect("hum1 ramp");
    assert!((hum1.value - 61.0).abs() < 1e-4);
    assert!((hum1.end_time_sec - 2.5).abs() < 1e-9);
}

#[test]
fn repeated_level_leaves_ramps_alone() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut engine: AmbientEngine<Recorder> = AmbientEngine::new(AmbientParams::default(), 7);
    engine.init_with(recorder(&log, 0.0));
    assert!(engine.set_power_level(PowerLevel::new(45.0)));
    let applied = log.borrow().changes.len();
    for _ in 0..10 {
        assert!(!engine.set_power_level(PowerLevel::new(45.0)));
    }
    assert_eq!(log.borrow().changes.len(), applied);
    assert!(engine.set_power_level(PowerLevel::new(46.0)));
    assert_eq!(log.borrow().changes.len(), applied + 5);
    assert!((engine.chime_interval().as_secs_f64() - 2.04).abs() < 1e-6);
}

#[test]
fn chimes_fire_on_the_backend_clock() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut engine: AmbientEngine<Recorder> = AmbientEngine::new(AmbientParams::default(), 3);
    engine.init_with(recorder(&log, 4.25));
    // Chance is 1.0 above 120
    engine.set_power_level(PowerLevel::new(150.0));
    for _ in 0..10 {
        assert!(engine.on_chime_timer().is_some());
    }
    let log = log.borrow();
    assert_eq!(log.chimes.len(), 10);
    assert!(log.chimes.iter().all(|(_, start)| *start == 4.25));
}

#[test]
fn shutdown_releases_backend_once() {
    let log = Rc::new(RefCell::new(Log::default()));
    let mut engine: AmbientEngine<Recorder> = AmbientEngine::new(AmbientParams::default(), 1);
    engine.init_with(recorder(&log, 0.0));
    engine.shutdown();
    engine.shutdown();
    assert_eq!(log.borrow().shutdowns, 1);
    assert!(!engine.is_initialized());
}

#[test]
fn chimes_stay_valid_beyond_full_power() {
    let mut sched = ChimeScheduler::new(99);
    for p in [0.0, 35.0, 75.0, 100.0, 250.0, 10_000.0] {
        for _ in 0..50 {
            let c = sched.compose(PowerLevel::new(p));
            for v in [c.main, c.companion] {
                assert!(v.frequency_hz.is_finite() && v.frequency_hz > 0.0);
                assert!(v.frequency_hz <= CHIME_MAX_HZ);
                assert!(v.detune_cents.is_finite());
                assert!(v.envelope.peak > 0.0 && v.envelope.peak <= CHIME_MAX_PEAK);
                assert!(v.envelope.attack_sec > 0.0);
                assert!(v.envelope.decay_sec > v.envelope.attack_sec);
                assert!(v.envelope.decay_sec <= c.stop_after_sec);
            }
            assert!(c.stop_after_sec <= CHIME_MAX_DECAY_SEC + CHIME_STOP_PAD_SEC + 1e-9);
        }
    }
}

#[test]
fn chime_tiers_follow_power() {
    let mut sched = ChimeScheduler::new(5);
    for _ in 0..100 {
        let c = sched.compose(PowerLevel::new(10.0));
        assert_eq!(c.main.waveform, Waveform::Sine);
        assert_eq!(c.companion.waveform, Waveform::Sine);
        assert!((c.companion.frequency_hz / c.main.frequency_hz - 1.5).abs() < 1e-4);
    }
    let mut saw = false;
    for _ in 0..200 {
        let c = sched.compose(PowerLevel::new(90.0));
        saw |= c.main.waveform == Waveform::Sawtooth;
        // Octave shift of one or two above the base set
        assert!(c.main.frequency_hz > 1000.0);
    }
    assert!(saw);
}

#[test]
fn same_seed_same_chimes() {
    let mut a = ChimeScheduler::new(11);
    let mut b = ChimeScheduler::new(11);
    for _ in 0..20 {
        assert_eq!(
            a.poll(PowerLevel::new(50.0)),
            b.poll(PowerLevel::new(50.0))
        );
    }
}
