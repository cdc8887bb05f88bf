use crate::dom;
use crate::events::{client_pos, Listener};
use crate::overlay;
use crate::render::CanvasPainter;
use nexus_core::field::{DrawCmd, FieldParams, Interaction, ParticleField};
use nexus_core::{Intensity, PowerLevel};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

/// Background canvas: the particle field and the painter that draws it.
pub struct FieldRenderer {
    canvas: web::HtmlCanvasElement,
    painter: CanvasPainter,
    field: ParticleField,
    cmds: Vec<DrawCmd>,
    interaction: Interaction,
}

impl FieldRenderer {
    /// Returns `None` when the canvas refuses a 2D context.
    pub fn new(canvas: web::HtmlCanvasElement, params: FieldParams, seed: u64) -> Option<Self> {
        let ctx = match canvas.get_context("2d") {
            Ok(Some(obj)) => obj.dyn_into::<web::CanvasRenderingContext2d>().ok()?,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("[field] 2d context unavailable: {:?}", e);
                return None;
            }
        };
        let (w, h) = dom::sync_canvas_to_viewport(&canvas);
        let field = ParticleField::new(params, seed, w as f32, h as f32);
        overlay::style_canvas(&canvas, false, 0.0);
        Some(Self {
            canvas,
            painter: CanvasPainter::new(ctx),
            field,
            cmds: Vec::with_capacity(1024),
            interaction: Interaction::default(),
        })
    }

    pub fn frame(&mut self, time_ms: f64) {
        self.field.step(time_ms, &mut self.cmds);
        self.painter.paint(&self.cmds);
    }

    pub fn resize_to_viewport(&mut self) {
        let (w, h) = dom::sync_canvas_to_viewport(&self.canvas);
        if let Err(e) = self.field.resize(w as f32, h as f32) {
            log::debug!("[field] resize skipped: {}", e);
        }
    }

    pub fn configure(&mut self, intensity: Intensity, level: PowerLevel) {
        self.field.configure(intensity, level);
        overlay::style_canvas(&self.canvas, intensity == Intensity::High, level.value());
    }

    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.field.set_pointer(x, y);
    }

    pub fn set_pointer_down(&mut self, down: bool) {
        self.interaction.pointer_down = down;
        self.sync_interacting();
    }

    pub fn set_host_interacting(&mut self, interacting: bool) {
        self.interaction.host = interacting;
        self.sync_interacting();
    }

    pub fn set_voice_active(&mut self, active: bool) {
        self.interaction.voice = active;
        self.sync_interacting();
    }

    fn sync_interacting(&mut self) {
        self.field.set_interacting(self.interaction.active());
    }
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// requestAnimationFrame loop. At most one frame request is pending at a
/// time; `stop` cancels it and releases the callback.
pub struct AnimationLoop {
    handle: Rc<RefCell<Option<i32>>>,
    tick: FrameCallback,
}

impl AnimationLoop {
    pub fn start(renderer: Rc<RefCell<FieldRenderer>>) -> Self {
        let handle: Rc<RefCell<Option<i32>>> = Rc::new(RefCell::new(None));
        let tick: FrameCallback = Rc::new(RefCell::new(None));
        let tick_clone = tick.clone();
        let handle_clone = handle.clone();
        *tick.borrow_mut() = Some(Closure::wrap(Box::new(move |time_ms: f64| {
            handle_clone.borrow_mut().take();
            renderer.borrow_mut().frame(time_ms);
            request(&tick_clone, &handle_clone);
        }) as Box<dyn FnMut(f64)>));
        request(&tick, &handle);
        Self { handle, tick }
    }

    pub fn is_running(&self) -> bool {
        self.handle.borrow().is_some()
    }

    pub fn stop(&self) {
        if let Some(id) = self.handle.borrow_mut().take() {
            if let Some(w) = web::window() {
                _ = w.cancel_animation_frame(id);
            }
        }
        // Break the closure's self-reference
        self.tick.borrow_mut().take();
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn request(tick: &FrameCallback, handle: &Rc<RefCell<Option<i32>>>) {
    let Some(w) = web::window() else { return };
    if let Some(cb) = tick.borrow().as_ref() {
        match w.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => *handle.borrow_mut() = Some(id),
            Err(e) => log::error!("[field] requestAnimationFrame error: {:?}", e),
        }
    }
}

/// A mounted background: renderer, its animation loop and its listeners.
/// Dropping it unmounts everything.
pub struct FieldView {
    pub renderer: Rc<RefCell<FieldRenderer>>,
    frame_loop: AnimationLoop,
    _listeners: Vec<Listener>,
}

impl FieldView {
    pub fn mount(canvas: web::HtmlCanvasElement, params: FieldParams, seed: u64) -> Option<Self> {
        let renderer = Rc::new(RefCell::new(FieldRenderer::new(canvas, params, seed)?));
        let window = web::window()?;
        let target: &web::EventTarget = window.as_ref();

        let mut listeners = Vec::new();
        let r = renderer.clone();
        listeners.extend(Listener::new(target, "resize", move |_| {
            r.borrow_mut().resize_to_viewport();
        }));
        let r = renderer.clone();
        listeners.extend(Listener::new(target, "pointermove", move |ev| {
            if let Some((x, y)) = client_pos(&ev) {
                r.borrow_mut().set_pointer(x, y);
            }
        }));
        let r = renderer.clone();
        listeners.extend(Listener::new(target, "pointerdown", move |ev| {
            let mut rr = r.borrow_mut();
            if let Some((x, y)) = client_pos(&ev) {
                rr.set_pointer(x, y);
            }
            rr.set_pointer_down(true);
        }));
        for kind in ["pointerup", "pointercancel"] {
            let r = renderer.clone();
            listeners.extend(Listener::new(target, kind, move |_| {
                r.borrow_mut().set_pointer_down(false);
            }));
        }

        let frame_loop = AnimationLoop::start(renderer.clone());
        log::info!("[field] mounted");
        Some(Self {
            renderer,
            frame_loop,
            _listeners: listeners,
        })
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn unmount(self) {
        self.frame_loop.stop();
        log::info!("[field] unmounted");
    }
}
