use nexus_core::pcm;
use nexus_core::playback::PlaybackCursor;
use nexus_core::voice::{
    parse_server_message, ClientMessage, SessionAction, SessionEvent, SessionState, Transcript,
    VoiceConfig,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys as web;

type StateHook = Box<dyn Fn(SessionState, &Transcript)>;

/// Everything a live session acquires. Dropping it releases all of it:
/// socket, microphone tracks, capture nodes and both audio contexts.
#[derive(Default)]
struct SessionResources {
    stream: Option<web::MediaStream>,
    capture_ctx: Option<web::AudioContext>,
    playback_ctx: Option<web::AudioContext>,
    socket: Option<web::WebSocket>,
    source: Option<web::MediaStreamAudioSourceNode>,
    processor: Option<web::ScriptProcessorNode>,
    on_open: Option<Closure<dyn FnMut()>>,
    on_message: Option<Closure<dyn FnMut(web::MessageEvent)>>,
    on_close: Option<Closure<dyn FnMut(web::CloseEvent)>>,
    on_error: Option<Closure<dyn FnMut(web::Event)>>,
    on_audio: Option<Closure<dyn FnMut(web::AudioProcessingEvent)>>,
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        if let Some(p) = self.processor.take() {
            p.set_onaudioprocess(None);
            _ = p.disconnect();
        }
        if let Some(s) = self.source.take() {
            _ = s.disconnect();
        }
        if let Some(ws) = self.socket.take() {
            ws.set_onopen(None);
            ws.set_onmessage(None);
            ws.set_onclose(None);
            ws.set_onerror(None);
            _ = ws.close();
        }
        if let Some(stream) = self.stream.take() {
            for track in stream.get_tracks().iter() {
                if let Ok(t) = track.dyn_into::<web::MediaStreamTrack>() {
                    t.stop();
                }
            }
        }
        for ctx in [self.capture_ctx.take(), self.playback_ctx.take()]
            .into_iter()
            .flatten()
        {
            _ = ctx.close();
        }
    }
}

struct BridgeInner {
    config: VoiceConfig,
    state: SessionState,
    transcript: Transcript,
    cursor: PlaybackCursor,
    session: Option<SessionResources>,
    generation: u32,
    hook: Option<StateHook>,
}

impl BridgeInner {
    fn notify(&self) {
        if let Some(hook) = &self.hook {
            hook(self.state, &self.transcript);
        }
    }
}

/// Duplex voice session with a remote conversational endpoint.
///
/// Idle → Connecting on start; Connecting → Active once the socket is open
/// and the microphone is wired; any stop, close or error → Idle with every
/// resource released.
#[derive(Clone)]
pub struct VoiceBridge {
    inner: Rc<RefCell<BridgeInner>>,
}

impl VoiceBridge {
    pub fn new(config: VoiceConfig) -> Self {
        let max_backlog = config.max_backlog_sec;
        Self {
            inner: Rc::new(RefCell::new(BridgeInner {
                config,
                state: SessionState::Idle,
                transcript: Transcript::default(),
                cursor: PlaybackCursor::new(max_backlog),
                session: None,
                generation: 0,
                hook: None,
            })),
        }
    }

    pub fn set_hook(&self, hook: impl Fn(SessionState, &Transcript) + 'static) {
        self.inner.borrow_mut().hook = Some(Box::new(hook));
    }

    pub fn set_endpoint(&self, endpoint: String) {
        self.inner.borrow_mut().config.endpoint = endpoint;
    }

    pub fn state(&self) -> SessionState {
        self.inner.borrow().state
    }

    pub fn transcript_lines(&self) -> Vec<String> {
        self.inner.borrow().transcript.lines().to_vec()
    }

    pub fn toggle(&self) {
        if self.state() == SessionState::Idle {
            self.start();
        } else {
            self.stop();
        }
    }

    pub fn start(&self) {
        if dispatch(&self.inner, SessionEvent::StartRequested) != SessionAction::Connect {
            return;
        }
        let (generation, config) = {
            let mut inner = self.inner.borrow_mut();
            inner.generation = inner.generation.wrapping_add(1);
            (inner.generation, inner.config.clone())
        };
        // Contexts are created inside the user gesture, before any await
        let res = match open_contexts(&config) {
            Ok(res) => res,
            Err(e) => {
                log::warn!("[voice] audio contexts unavailable: {:?}", e);
                dispatch(&self.inner, SessionEvent::CaptureFailed);
                return;
            }
        };
        let inner = self.inner.clone();
        spawn_local(async move {
            if let Err(e) = connect(inner.clone(), generation, config, res).await {
                log::warn!("[voice] session failed to start: {:?}", e);
                if current(&inner, generation) {
                    dispatch(&inner, SessionEvent::CaptureFailed);
                }
            }
        });
    }

    pub fn stop(&self) {
        dispatch(&self.inner, SessionEvent::StopRequested);
    }
}

fn current(inner: &Rc<RefCell<BridgeInner>>, generation: u32) -> bool {
    let i = inner.borrow();
    i.generation == generation && i.state == SessionState::Connecting
}

fn dispatch(inner: &Rc<RefCell<BridgeInner>>, event: SessionEvent) -> SessionAction {
    let (action, released) = {
        let mut i = inner.borrow_mut();
        let (next, action) = i.state.on(event);
        if next != i.state {
            log::info!("[voice] {:?} -> {:?} on {:?}", i.state, next, event);
        }
        i.state = next;
        let released = if action == SessionAction::Teardown {
            i.cursor.reset();
            i.session.take()
        } else {
            None
        };
        (action, released)
    };
    // Release outside the borrow; closing handles must not re-enter the bridge
    drop(released);
    if action != SessionAction::None {
        inner.borrow().notify();
    }
    action
}

fn new_context(rate: u32) -> Result<web::AudioContext, JsValue> {
    let opts = web::AudioContextOptions::new();
    opts.set_sample_rate(rate as f32);
    let ctx = web::AudioContext::new_with_context_options(&opts)?;
    _ = ctx.resume();
    Ok(ctx)
}

fn open_contexts(config: &VoiceConfig) -> Result<SessionResources, JsValue> {
    let mut res = SessionResources::default();
    res.capture_ctx = Some(new_context(config.capture_rate)?);
    res.playback_ctx = Some(new_context(config.playback_rate)?);
    Ok(res)
}

async fn connect(
    inner: Rc<RefCell<BridgeInner>>,
    generation: u32,
    config: VoiceConfig,
    mut res: SessionResources,
) -> anyhow::Result<()> {
    if config.endpoint.is_empty() {
        anyhow::bail!("no voice endpoint configured");
    }
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let devices = window
        .navigator()
        .media_devices()
        .map_err(|e| anyhow::anyhow!("no media devices: {:?}", e))?;
    let constraints = web::MediaStreamConstraints::new();
    constraints.set_audio(&JsValue::TRUE);
    let promise = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|e| anyhow::anyhow!("getUserMedia: {:?}", e))?;
    let stream: web::MediaStream = JsFuture::from(promise)
        .await
        .map_err(|e| anyhow::anyhow!("microphone denied: {:?}", e))?
        .dyn_into()
        .map_err(|e| anyhow::anyhow!("not a MediaStream: {:?}", e))?;

    // Own the stream immediately so every exit path releases it
    res.stream = Some(stream.clone());
    if !current(&inner, generation) {
        log::info!("[voice] stopped while waiting for the microphone");
        return Ok(());
    }

    let capture_ctx = res
        .capture_ctx
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no capture context"))?;

    let ws = web::WebSocket::new(&config.endpoint)
        .map_err(|e| anyhow::anyhow!("socket: {:?}", e))?;
    ws.set_binary_type(web::BinaryType::Arraybuffer);
    res.socket = Some(ws.clone());

    let source = capture_ctx
        .create_media_stream_source(&stream)
        .map_err(|e| anyhow::anyhow!("media source: {:?}", e))?;
    #[allow(deprecated)]
    let processor = capture_ctx
        .create_script_processor_with_buffer_size_and_number_of_input_channels_and_number_of_output_channels(
            config.capture_block,
            1,
            1,
        )
        .map_err(|e| anyhow::anyhow!("script processor: {:?}", e))?;
    res.source = Some(source.clone());
    res.processor = Some(processor.clone());

    // Capture path: cheap encode and fire-and-forget send, no shared state
    let ws_out = ws.clone();
    let rate = config.capture_rate;
    let on_audio = Closure::wrap(Box::new(move |ev: web::AudioProcessingEvent| {
        if ws_out.ready_state() != web::WebSocket::OPEN {
            return;
        }
        let Ok(samples) = ev.input_buffer().and_then(|b| b.get_channel_data(0)) else {
            return;
        };
        match ClientMessage::audio(&samples, rate).to_json() {
            Ok(json) => {
                _ = ws_out.send_with_str(&json);
            }
            Err(e) => log::warn!("[voice] encode error: {}", e),
        }
    }) as Box<dyn FnMut(web::AudioProcessingEvent)>);

    let open_inner = inner.clone();
    let ws_open = ws.clone();
    let setup = ClientMessage::setup(&config).to_json()?;
    let capture_dst = capture_ctx.destination();
    let audio_cb = on_audio.as_ref().unchecked_ref::<js_sys::Function>().clone();
    let on_open = Closure::wrap(Box::new(move || {
        if let Err(e) = ws_open.send_with_str(&setup) {
            log::warn!("[voice] setup send failed: {:?}", e);
            dispatch(&open_inner, SessionEvent::RemoteError);
            return;
        }
        processor.set_onaudioprocess(Some(&audio_cb));
        let wired = source
            .connect_with_audio_node(&processor)
            .and_then(|_| processor.connect_with_audio_node(&capture_dst));
        match wired {
            Ok(_) => {
                dispatch(&open_inner, SessionEvent::Opened);
            }
            Err(e) => {
                log::warn!("[voice] capture wiring failed: {:?}", e);
                dispatch(&open_inner, SessionEvent::CaptureFailed);
            }
        }
    }) as Box<dyn FnMut()>);

    let msg_inner = inner.clone();
    let on_message = Closure::wrap(Box::new(move |ev: web::MessageEvent| {
        if let Some(text) = message_text(&ev.data()) {
            handle_message(&msg_inner, &text);
        }
    }) as Box<dyn FnMut(web::MessageEvent)>);

    let close_inner = inner.clone();
    let on_close = Closure::wrap(Box::new(move |ev: web::CloseEvent| {
        log::info!("[voice] remote closed ({}) {}", ev.code(), ev.reason());
        dispatch(&close_inner, SessionEvent::RemoteClosed);
    }) as Box<dyn FnMut(web::CloseEvent)>);

    let err_inner = inner.clone();
    let on_error = Closure::wrap(Box::new(move |_ev: web::Event| {
        log::warn!("[voice] socket error");
        dispatch(&err_inner, SessionEvent::RemoteError);
    }) as Box<dyn FnMut(web::Event)>);

    ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
    ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
    ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));
    ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    res.on_audio = Some(on_audio);
    res.on_open = Some(on_open);
    res.on_message = Some(on_message);
    res.on_close = Some(on_close);
    res.on_error = Some(on_error);

    let mut i = inner.borrow_mut();
    if i.generation == generation && i.state == SessionState::Connecting {
        i.session = Some(res);
    }
    // Otherwise `res` drops here and releases everything it acquired
    Ok(())
}

fn message_text(data: &JsValue) -> Option<String> {
    if let Some(s) = data.as_string() {
        return Some(s);
    }
    let buf = data.dyn_ref::<js_sys::ArrayBuffer>()?;
    String::from_utf8(js_sys::Uint8Array::new(buf).to_vec()).ok()
}

fn handle_message(inner: &Rc<RefCell<BridgeInner>>, text: &str) {
    let frame = match parse_server_message(text) {
        Ok(f) => f,
        Err(e) => {
            log::warn!("[voice] skipping message: {}", e);
            return;
        }
    };
    if frame.setup_complete {
        log::info!("[voice] setup complete");
    }
    let mut i = inner.borrow_mut();
    if let Some(samples) = frame.audio {
        if let Err(e) = play_chunk(&mut i, samples) {
            log::warn!("[voice] playback error: {:?}", e);
        }
    }
    if let Some(text) = frame.transcript {
        i.transcript.push_fragment(&text);
        drop(i);
        inner.borrow().notify();
    }
}

/// Queue one inbound chunk right after the previous one on the playback
/// clock.
fn play_chunk(inner: &mut BridgeInner, mut samples: Vec<f32>) -> Result<(), JsValue> {
    if samples.is_empty() {
        return Ok(());
    }
    let Some(ctx) = inner.session.as_ref().and_then(|s| s.playback_ctx.as_ref()) else {
        return Ok(());
    };
    let rate = inner.config.playback_rate;
    let buffer = ctx.create_buffer(1, samples.len() as u32, rate as f32)?;
    buffer.copy_to_channel(&mut samples, 0)?;
    let duration = pcm::duration_sec(samples.len(), rate);
    let Some(start) = inner.cursor.try_schedule(ctx.current_time(), duration) else {
        return Ok(());
    };
    let src = ctx.create_buffer_source()?;
    src.set_buffer(Some(&buffer));
    src.connect_with_audio_node(&ctx.destination())?;
    src.start_with_when(start)?;
    Ok(())
}
