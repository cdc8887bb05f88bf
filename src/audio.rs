use nexus_core::ambient::{
    AmbientEngine, AmbientGraph, AmbientParams, AudioBackend, ChimeEvent, ChimeVoice, NodeId,
    NodeKind, ParamChange, ParamTarget, RampCurve, Waveform,
};
use nexus_core::constants::CHIME_DECAY_FLOOR;
use nexus_core::PowerLevel;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

fn create_gain(
    audio_ctx: &web::AudioContext,
    value: f32,
    label: &str,
) -> anyhow::Result<web::GainNode> {
    match web::GainNode::new(audio_ctx) {
        Ok(g) => {
            g.gain().set_value(value);
            Ok(g)
        }
        Err(e) => {
            log::error!("{} GainNode error: {:?}", label, e);
            Err(anyhow::anyhow!("{:?}", e))
        }
    }
}

fn oscillator_type(waveform: Waveform) -> web::OscillatorType {
    match waveform {
        Waveform::Sine => web::OscillatorType::Sine,
        Waveform::Triangle => web::OscillatorType::Triangle,
        Waveform::Sawtooth => web::OscillatorType::Sawtooth,
    }
}

/// WebAudio realization of the ambient graph. Owns its context exclusively.
pub struct WebAudioBackend {
    ctx: web::AudioContext,
    gains: Vec<(NodeId, web::GainNode)>,
    oscillators: Vec<(NodeId, web::OscillatorNode)>,
    chime_bus: web::GainNode,
}

impl WebAudioBackend {
    /// Instantiate every node of `graph`, wire its edges and start the
    /// continuous oscillators.
    pub fn build(graph: &AmbientGraph) -> anyhow::Result<Self> {
        let ctx = web::AudioContext::new().map_err(|e| anyhow::anyhow!("{:?}", e))?;
        _ = ctx.resume();

        let mut nodes: Vec<(NodeId, web::AudioNode)> = Vec::with_capacity(graph.nodes.len());
        let mut gains = Vec::new();
        let mut oscillators = Vec::new();
        for node in &graph.nodes {
            let audio_node: web::AudioNode = match node.kind {
                NodeKind::Destination => ctx.destination().into(),
                NodeKind::Gain { level } => {
                    let g = create_gain(&ctx, level, &format!("{:?}", node.id))?;
                    gains.push((node.id, g.clone()));
                    g.into()
                }
                NodeKind::Oscillator {
                    waveform,
                    frequency_hz,
                } => {
                    let osc = web::OscillatorNode::new(&ctx)
                        .map_err(|e| anyhow::anyhow!("OscillatorNode error: {:?}", e))?;
                    osc.set_type(oscillator_type(waveform));
                    osc.frequency().set_value(frequency_hz);
                    oscillators.push((node.id, osc.clone()));
                    osc.into()
                }
                NodeKind::BandPass { center_hz, q } => {
                    let filter = web::BiquadFilterNode::new(&ctx)
                        .map_err(|e| anyhow::anyhow!("BiquadFilterNode error: {:?}", e))?;
                    filter.set_type(web::BiquadFilterType::Bandpass);
                    filter.frequency().set_value(center_hz);
                    filter.q().set_value(q);
                    filter.into()
                }
            };
            nodes.push((node.id, audio_node));
        }

        let lookup = |id: NodeId| {
            nodes
                .iter()
                .find(|(n, _)| *n == id)
                .map(|(_, node)| node)
                .ok_or_else(|| anyhow::anyhow!("graph edge references missing node {:?}", id))
        };
        for (from, to) in &graph.edges {
            lookup(*from)?
                .connect_with_audio_node(lookup(*to)?)
                .map_err(|e| anyhow::anyhow!("connect {:?} -> {:?}: {:?}", from, to, e))?;
        }

        for (id, osc) in &oscillators {
            osc.start()
                .map_err(|e| anyhow::anyhow!("start {:?}: {:?}", id, e))?;
        }

        let chime_bus = gains
            .iter()
            .find(|(id, _)| *id == NodeId::ChimeBus)
            .map(|(_, g)| g.clone())
            .ok_or_else(|| anyhow::anyhow!("graph has no chime bus"))?;

        log::info!(
            "[audio] graph built: {} nodes, {} edges, {} oscillators",
            graph.nodes.len(),
            graph.edges.len(),
            oscillators.len()
        );
        Ok(Self {
            ctx,
            gains,
            oscillators,
            chime_bus,
        })
    }

    fn param(&self, target: ParamTarget) -> Option<web::AudioParam> {
        match target {
            ParamTarget::Frequency(id) => self
                .oscillators
                .iter()
                .find(|(n, _)| *n == id)
                .map(|(_, o)| o.frequency()),
            ParamTarget::Gain(id) => self
                .gains
                .iter()
                .find(|(n, _)| *n == id)
                .map(|(_, g)| g.gain()),
        }
    }

    fn play_voice(&self, voice: &ChimeVoice, start: f64, stop_after: f64) -> Result<(), JsValue> {
        let osc = web::OscillatorNode::new(&self.ctx)?;
        osc.set_type(oscillator_type(voice.waveform));
        osc.frequency().set_value_at_time(voice.frequency_hz, start)?;
        osc.detune().set_value_at_time(voice.detune_cents, start)?;

        let env = web::GainNode::new(&self.ctx)?;
        let gain = env.gain();
        let e = voice.envelope;
        gain.set_value_at_time(0.0, start)?;
        gain.linear_ramp_to_value_at_time(e.peak, start + e.attack_sec)?;
        gain.exponential_ramp_to_value_at_time(CHIME_DECAY_FLOOR, start + e.decay_sec)?;

        osc.connect_with_audio_node(&env)?;
        env.connect_with_audio_node(&self.chime_bus)?;
        osc.start_with_when(start)?;
        if let Err(err) = osc.stop_with_when(start + stop_after) {
            // Never leave a started voice running
            _ = osc.stop();
            return Err(err);
        }
        Ok(())
    }
}

impl AudioBackend for WebAudioBackend {
    fn now(&self) -> f64 {
        self.ctx.current_time()
    }

    fn apply(&mut self, change: &ParamChange) {
        let Some(param) = self.param(change.target) else {
            log::warn!("[audio] no parameter for {:?}", change.target);
            return;
        };
        let now = self.ctx.current_time();
        // Restart the glide from wherever the parameter is right now
        _ = param.cancel_scheduled_values(now);
        _ = param.set_value_at_time(param.value(), now);
        let res = match change.curve {
            RampCurve::Linear => param.linear_ramp_to_value_at_time(change.value, change.end_time_sec),
            RampCurve::Exponential => {
                param.exponential_ramp_to_value_at_time(change.value, change.end_time_sec)
            }
        };
        if let Err(e) = res {
            log::warn!("[audio] ramp {:?} failed: {:?}", change.target, e);
        }
    }

    fn play_chime(&mut self, chime: &ChimeEvent, start_sec: f64) {
        for voice in [&chime.main, &chime.companion] {
            if let Err(e) = self.play_voice(voice, start_sec, chime.stop_after_sec) {
                log::warn!("[audio] chime voice error: {:?}", e);
            }
        }
    }

    fn shutdown(&mut self) {
        for (_, osc) in self.oscillators.drain(..) {
            _ = osc.stop();
            _ = osc.disconnect();
        }
        for (_, g) in self.gains.drain(..) {
            _ = g.disconnect();
        }
        _ = self.ctx.close();
    }
}

type TimerCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Ambient soundscape plus its self re-arming chime timer.
pub struct AmbientAudio {
    engine: Rc<RefCell<AmbientEngine<WebAudioBackend>>>,
    timer: Rc<RefCell<Option<i32>>>,
    tick: TimerCallback,
}

impl AmbientAudio {
    pub fn new(params: AmbientParams, seed: u64) -> Self {
        Self {
            engine: Rc::new(RefCell::new(AmbientEngine::new(params, seed))),
            timer: Rc::new(RefCell::new(None)),
            tick: Rc::new(RefCell::new(None)),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.borrow().is_initialized()
    }

    /// Start the soundscape. Must run inside a user gesture. Idempotent; a
    /// missing audio API leaves the engine uninitialized.
    pub fn init(&self) -> bool {
        let created = self.engine.borrow_mut().init_with(WebAudioBackend::build);
        if created {
            self.install_tick();
            self.arm();
        }
        created
    }

    /// Re-arms the chime timer only when the level changed.
    pub fn set_power_level(&self, level: PowerLevel) {
        let changed = self.engine.borrow_mut().set_power_level(level);
        if changed && self.is_initialized() {
            self.arm();
        }
    }

    fn install_tick(&self) {
        let engine = self.engine.clone();
        let timer = self.timer.clone();
        let tick = self.tick.clone();
        *self.tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            timer.borrow_mut().take();
            let interval = {
                let mut eng = engine.borrow_mut();
                if let Some(chime) = eng.on_chime_timer() {
                    log::debug!(
                        "[audio] chime {:?} {:.1}Hz",
                        chime.main.waveform,
                        chime.main.frequency_hz
                    );
                }
                eng.is_initialized().then(|| eng.chime_interval())
            };
            if let Some(interval) = interval {
                schedule(&tick, &timer, interval.as_millis() as i32);
            }
        }) as Box<dyn FnMut()>));
    }

    /// (Re)arm the chime timer at the current interval.
    fn arm(&self) {
        clear(&self.timer);
        let ms = self.engine.borrow().chime_interval().as_millis() as i32;
        schedule(&self.tick, &self.timer, ms);
    }

    pub fn shutdown(&self) {
        clear(&self.timer);
        // Drops the closure and with it the engine/timer references it holds
        self.tick.borrow_mut().take();
        self.engine.borrow_mut().shutdown();
    }
}

impl Drop for AmbientAudio {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn schedule(tick: &TimerCallback, timer: &Rc<RefCell<Option<i32>>>, ms: i32) {
    let Some(w) = web::window() else { return };
    if let Some(cb) = tick.borrow().as_ref() {
        match w.set_timeout_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            ms,
        ) {
            Ok(handle) => *timer.borrow_mut() = Some(handle),
            Err(e) => log::warn!("[audio] chime timer error: {:?}", e),
        }
    }
}

fn clear(timer: &Rc<RefCell<Option<i32>>>) {
    if let Some(handle) = timer.borrow_mut().take() {
        if let Some(w) = web::window() {
            w.clear_timeout_with_handle(handle);
        }
    }
}
