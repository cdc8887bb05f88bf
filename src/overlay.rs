use crate::constants::{
    canvas_style, voice_labels, HIDDEN_CLASS, TRANSCRIPT_ID, VOICE_BUTTON_ID, VOICE_STATUS_ID,
};
use web_sys as web;

#[inline]
pub fn show(document: &web::Document, element_id: &str) {
    if let Some(el) = document.get_element_by_id(element_id) {
        _ = el.class_list().remove_1(HIDDEN_CLASS);
        // fallback for pages without the CSS class
        _ = el.set_attribute("style", "");
    }
}

#[inline]
pub fn hide(document: &web::Document, element_id: &str) {
    if let Some(el) = document.get_element_by_id(element_id) {
        _ = el.class_list().add_1(HIDDEN_CLASS);
        _ = el.set_attribute("style", "display:none");
    }
}

pub fn style_canvas(canvas: &web::HtmlCanvasElement, high_intensity: bool, power_level: f32) {
    _ = canvas.set_attribute("style", &canvas_style(high_intensity, power_level));
}

/// Reflect the voice session state on the toggle and its status line.
pub fn update_voice(document: &web::Document, active: bool) {
    let (label, status) = voice_labels(active);
    if let Some(el) = document.get_element_by_id(VOICE_BUTTON_ID) {
        el.set_text_content(Some(label));
        _ = el.set_attribute("aria-pressed", if active { "true" } else { "false" });
    }
    if let Some(el) = document.get_element_by_id(VOICE_STATUS_ID) {
        el.set_text_content(Some(status));
    }
}

/// Rebuild the transcript list. Lines come from the remote service, so they
/// are inserted as text, never as markup.
pub fn render_transcript(document: &web::Document, lines: &[String]) {
    let Some(list) = document.get_element_by_id(TRANSCRIPT_ID) else {
        return;
    };
    list.set_text_content(None);
    for line in lines {
        if let Ok(p) = document.create_element("p") {
            p.set_text_content(Some(line));
            _ = list.append_child(&p);
        }
    }
}
