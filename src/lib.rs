#![cfg(target_arch = "wasm32")]
use nexus_core::ambient::AmbientParams;
use nexus_core::field::FieldParams;
use nexus_core::insight::InsightState;
use nexus_core::voice::VoiceConfig;
use nexus_core::PowerLevel;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys as web;

mod audio;
mod constants;
mod dom;
mod events;
mod frame;
mod live;
mod overlay;
mod render;

use audio::AmbientAudio;
use constants::{AUDIO_BUTTON_ID, CANVAS_ID, ENDPOINT_ATTR, VOICE_BUTTON_ID};
use frame::FieldView;
use live::VoiceBridge;

/// Handle the host page drives: background field, ambient audio and the
/// voice bridge, all following one power level.
#[wasm_bindgen]
pub struct NexusFx {
    view: Option<FieldView>,
    audio: AmbientAudio,
    voice: VoiceBridge,
    level: PowerLevel,
    activity: InsightState,
}

#[wasm_bindgen]
impl NexusFx {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<NexusFx, JsValue> {
        let document = dom::window_document().ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas: web::HtmlCanvasElement = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("missing #{}", canvas_id)))?
            .dyn_into()
            .map_err(|_| JsValue::from_str(&format!("#{} is not a canvas", canvas_id)))?;

        let view = FieldView::mount(canvas, FieldParams::default(), rand::random());
        if view.is_none() {
            log::warn!("[fx] no 2d context on #{}; background disabled", canvas_id);
        }

        let voice = VoiceBridge::new(VoiceConfig::default());
        let renderer = view.as_ref().map(|v| v.renderer.clone());
        voice.set_hook(move |state, transcript| {
            if let Some(doc) = dom::window_document() {
                overlay::update_voice(&doc, state.is_active());
                overlay::render_transcript(&doc, transcript.lines());
            }
            if let Some(r) = &renderer {
                if let Ok(mut r) = r.try_borrow_mut() {
                    r.set_voice_active(state.is_active());
                }
            }
        });

        log::info!("[fx] ready on #{}", canvas_id);
        Ok(NexusFx {
            view,
            audio: AmbientAudio::new(AmbientParams::default(), rand::random()),
            voice,
            level: PowerLevel::ZERO,
            activity: InsightState::default(),
        })
    }

    /// Start the ambient soundscape. Call from a user gesture.
    pub fn enable_audio(&mut self) -> bool {
        self.audio.init();
        self.audio.is_initialized()
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio.is_initialized()
    }

    /// True while the background animation loop is scheduled.
    pub fn animating(&self) -> bool {
        self.view.as_ref().is_some_and(FieldView::is_running)
    }

    pub fn set_power_level(&mut self, level: Option<f64>) {
        self.level = PowerLevel::from_option(level);
        self.refresh();
    }

    pub fn power_level(&self) -> f32 {
        self.level.value()
    }

    pub fn set_intensity_high(&mut self, high: bool) {
        self.activity.forced_high = high;
        self.refresh();
    }

    /// A request for a new insight is in flight.
    pub fn set_loading(&mut self, loading: bool) {
        self.activity.loading = loading;
        self.refresh();
    }

    /// Ingest an insight reply; its power level drives everything else.
    /// Returns the clamped power level. Loading ends either way.
    pub fn apply_insight(&mut self, json: &str) -> Result<f64, JsValue> {
        let result = self.activity.ingest(json, &mut rand::thread_rng());
        match result {
            Ok(power) => {
                if let Some(insight) = self.activity.insight() {
                    log::info!(
                        "[fx] insight power={} actions={}",
                        insight.power_level,
                        insight.action_items.len()
                    );
                }
                self.level = power;
                self.refresh();
                Ok(self.level.value() as f64)
            }
            Err(e) => {
                log::warn!("[fx] insight rejected: {}", e);
                self.refresh();
                Err(JsValue::from_str(&e.to_string()))
            }
        }
    }

    pub fn clear_insight(&mut self) {
        self.activity.clear();
        self.refresh();
    }

    /// Potential chart bars: mind, will, creativity, focus.
    pub fn potential(&self) -> Vec<f32> {
        let c = self.activity.chart;
        vec![c.mind, c.will, c.creativity, c.focus]
    }

    /// Capability meters: strategic insight, adaptability, focus, creativity.
    pub fn capabilities(&self) -> Vec<f32> {
        self.activity.capabilities.levels.to_vec()
    }

    pub fn set_interacting(&mut self, interacting: bool) {
        if let Some(view) = &self.view {
            view.renderer
                .borrow_mut()
                .set_host_interacting(interacting);
        }
    }

    /// Start a voice session against `endpoint`, or stop the running one.
    pub fn toggle_voice(&mut self, endpoint: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) {
            self.voice.set_endpoint(endpoint);
        }
        self.voice.toggle();
    }

    pub fn voice_active(&self) -> bool {
        self.voice.state().is_active()
    }

    pub fn transcript(&self) -> js_sys::Array {
        self.voice
            .transcript_lines()
            .into_iter()
            .map(JsValue::from)
            .collect()
    }

    /// Tear everything down: animation loop, listeners, audio and voice.
    pub fn dispose(&mut self) {
        self.voice.stop();
        self.audio.shutdown();
        if let Some(view) = self.view.take() {
            view.unmount();
        }
        log::info!("[fx] disposed");
    }
}

impl NexusFx {
    fn refresh(&mut self) {
        let intensity = self.activity.intensity();
        if let Some(view) = &self.view {
            view.renderer.borrow_mut().configure(intensity, self.level);
        }
        self.audio.set_power_level(self.level);
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("nexus-web starting");

    if let Err(e) = wire_default_page() {
        log::error!("init error: {:?}", e);
    }
    Ok(())
}

/// Pages carrying the default element ids get a ready-made instance with
/// its buttons wired. Other hosts construct `NexusFx` themselves.
fn wire_default_page() -> anyhow::Result<()> {
    let document = dom::window_document().ok_or_else(|| anyhow::anyhow!("no document"))?;
    if document.get_element_by_id(CANVAS_ID).is_none() {
        log::debug!("no #{} on the page; waiting for the host", CANVAS_ID);
        return Ok(());
    }
    let fx = NexusFx::new(CANVAS_ID).map_err(|e| anyhow::anyhow!("{:?}", e))?;
    let fx = Rc::new(RefCell::new(fx));
    overlay::update_voice(&document, false);
    // Offer audio only while the soundscape is not running
    overlay::show(&document, AUDIO_BUTTON_ID);

    let fx_audio = fx.clone();
    let doc_audio = document.clone();
    dom::add_click_listener(&document, AUDIO_BUTTON_ID, move || {
        if fx_audio.borrow_mut().enable_audio() {
            overlay::hide(&doc_audio, AUDIO_BUTTON_ID);
        }
    });

    let fx_voice = fx.clone();
    let doc_voice = document.clone();
    dom::add_click_listener(&document, VOICE_BUTTON_ID, move || {
        let endpoint = dom::element_attr(&doc_voice, VOICE_BUTTON_ID, ENDPOINT_ATTR);
        if endpoint.is_none() && !fx_voice.borrow().voice_active() {
            log::warn!("[voice] #{} has no {}", VOICE_BUTTON_ID, ENDPOINT_ATTR);
        }
        fx_voice.borrow_mut().toggle_voice(endpoint);
    });
    Ok(())
}
