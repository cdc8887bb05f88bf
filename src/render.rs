use nexus_core::field::DrawCmd;
use std::f64::consts::TAU;
use web_sys as web;

/// Replays field draw lists onto a 2D canvas context it owns exclusively.
pub struct CanvasPainter {
    ctx: web::CanvasRenderingContext2d,
}

impl CanvasPainter {
    pub fn new(ctx: web::CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }

    pub fn paint(&self, cmds: &[DrawCmd]) {
        let ctx = &self.ctx;
        for cmd in cmds {
            match cmd {
                DrawCmd::Clear { size } => {
                    ctx.clear_rect(0.0, 0.0, size.x as f64, size.y as f64);
                }
                DrawCmd::FillRect { size, color } => {
                    ctx.set_fill_style_str(&color.to_string());
                    ctx.fill_rect(0.0, 0.0, size.x as f64, size.y as f64);
                }
                DrawCmd::Line {
                    from,
                    to,
                    width,
                    color,
                } => {
                    ctx.set_line_width(*width as f64);
                    ctx.set_stroke_style_str(&color.to_string());
                    ctx.begin_path();
                    ctx.move_to(from.x as f64, from.y as f64);
                    ctx.line_to(to.x as f64, to.y as f64);
                    ctx.stroke();
                }
                DrawCmd::Curve {
                    start,
                    segments,
                    width,
                    color,
                } => {
                    ctx.set_line_width(*width as f64);
                    ctx.set_stroke_style_str(&color.to_string());
                    ctx.begin_path();
                    ctx.move_to(start.x as f64, start.y as f64);
                    for seg in segments {
                        ctx.quadratic_curve_to(
                            seg.control.x as f64,
                            seg.control.y as f64,
                            seg.end.x as f64,
                            seg.end.y as f64,
                        );
                    }
                    ctx.stroke();
                }
                DrawCmd::Dot {
                    center,
                    radius,
                    color,
                } => {
                    ctx.set_fill_style_str(&color.to_string());
                    ctx.begin_path();
                    if ctx
                        .arc(center.x as f64, center.y as f64, *radius as f64, 0.0, TAU)
                        .is_ok()
                    {
                        ctx.fill();
                    }
                }
                DrawCmd::Ring {
                    center,
                    radius,
                    width,
                    color,
                } => {
                    ctx.set_line_width(*width as f64);
                    ctx.set_stroke_style_str(&color.to_string());
                    ctx.begin_path();
                    if ctx
                        .arc(center.x as f64, center.y as f64, *radius as f64, 0.0, TAU)
                        .is_ok()
                    {
                        ctx.stroke();
                    }
                }
            }
        }
    }
}
