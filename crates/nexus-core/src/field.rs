//! Particle and ribbon simulation for the animated background.
//!
//! The field keeps its population as flat vectors and advances it once per
//! animation frame. Each frame yields a list of [`DrawCmd`]s that the browser
//! front-end replays onto a 2D canvas, so the whole simulation runs and is
//! tested without a canvas.
//!
//! Connective links are computed with an all-pairs pass. That is O(n²) per
//! frame and only acceptable because the population is capped at
//! [`PARTICLES_HIGH`]; grow the population materially and this needs spatial
//! partitioning.

use crate::constants::*;
use crate::error::{CoreError, Result};
use crate::power::{Intensity, PowerLevel};
use glam::Vec2;
use rand::prelude::*;
use smallvec::SmallVec;
use std::fmt;

/// Straight-alpha color with a CSS representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

pub const CYAN: Rgba = Rgba::new(103, 232, 249, 1.0);
pub const VIOLET: Rgba = Rgba::new(139, 92, 246, 1.0);
pub const RIBBON_CYAN: Rgba = Rgba::new(6, 182, 212, 0.03);
pub const RIBBON_VIOLET: Rgba = Rgba::new(139, 92, 246, 0.03);
pub const RIBBON_PINK: Rgba = Rgba::new(236, 72, 153, 0.04);
pub const LINK_WHITE: Rgba = Rgba::new(255, 255, 255, 1.0);
pub const RING_CYAN: Rgba = Rgba::new(6, 182, 212, 0.05);

/// Tunables for the field. Defaults match the shipped look.
#[derive(Clone, Debug)]
pub struct FieldParams {
    pub attract_radius: f32,
    pub attract_coeff: f32,
    pub link_base_distance: f32,
    pub ribbon_drift: f32,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            attract_radius: ATTRACT_RADIUS_PX,
            attract_coeff: ATTRACT_COEFF,
            link_base_distance: LINK_BASE_DISTANCE_PX,
            ribbon_drift: RIBBON_DRIFT_PX,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub color: Rgba,
    pub alpha: f32,
}

impl Particle {
    fn spawn(rng: &mut StdRng, size: Vec2, level: PowerLevel) -> Self {
        let speed_scale = 0.1 + (level.value() / 100.0) * 0.8;
        Self {
            pos: Vec2::new(rng.gen::<f32>() * size.x, rng.gen::<f32>() * size.y),
            vel: Vec2::new(
                (rng.gen::<f32>() - 0.5) * speed_scale,
                (rng.gen::<f32>() - 0.5) * speed_scale,
            ),
            radius: rng.gen::<f32>() * 1.5 + 0.2,
            color: if rng.gen::<f32>() > 0.7 { CYAN } else { VIOLET },
            alpha: rng.gen::<f32>() * 0.3 + 0.05,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ribbon {
    pub points: [Vec2; RIBBON_POINTS],
    pub color: Rgba,
    pub offset: f32,
    pub speed: f32,
}

impl Ribbon {
    fn spawn(rng: &mut StdRng, size: Vec2, level: PowerLevel) -> Self {
        let mut points = [Vec2::ZERO; RIBBON_POINTS];
        for p in points.iter_mut() {
            *p = Vec2::new(rng.gen::<f32>() * size.x, rng.gen::<f32>() * size.y);
        }
        let mut color = if rng.gen::<f32>() > 0.5 {
            RIBBON_CYAN
        } else {
            RIBBON_VIOLET
        };
        if level.value() > RIBBON_ACCENT_THRESHOLD {
            color = RIBBON_PINK;
        }
        Self {
            points,
            color,
            offset: rng.gen::<f32>() * 1000.0,
            speed: 0.0005 + level.value() / 20000.0,
        }
    }

    /// Drift every control point along a per-point sinusoid.
    pub fn advance(&mut self, time_ms: f64, drift: f32) {
        for (i, p) in self.points.iter_mut().enumerate() {
            let phase = (time_ms * self.speed as f64) as f32 + i as f32 + self.offset;
            p.x += phase.sin() * drift;
            p.y += phase.cos() * drift;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadSeg {
    pub control: Vec2,
    pub end: Vec2,
}

/// Smoothed open path through `points`: start at the first point, then one
/// quadratic segment per inner point ending at the midpoint to its successor.
pub fn ribbon_path(points: &[Vec2]) -> Option<(Vec2, SmallVec<[QuadSeg; 4]>)> {
    if points.len() < 2 {
        return None;
    }
    let segs = points
        .windows(2)
        .skip(1)
        .map(|w| QuadSeg {
            control: w[0],
            end: (w[0] + w[1]) * 0.5,
        })
        .collect();
    Some((points[0], segs))
}

/// One drawing instruction for a 2D canvas.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCmd {
    Clear {
        size: Vec2,
    },
    FillRect {
        size: Vec2,
        color: Rgba,
    },
    Line {
        from: Vec2,
        to: Vec2,
        width: f32,
        color: Rgba,
    },
    Curve {
        start: Vec2,
        segments: SmallVec<[QuadSeg; 4]>,
        width: f32,
        color: Rgba,
    },
    Dot {
        center: Vec2,
        radius: f32,
        color: Rgba,
    },
    Ring {
        center: Vec2,
        radius: f32,
        width: f32,
        color: Rgba,
    },
}

/// Sources that can hold the field in its interacting state. Each source
/// owns its flag so one ending does not cancel another.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Interaction {
    pub pointer_down: bool,
    pub host: bool,
    pub voice: bool,
}

impl Interaction {
    pub fn active(&self) -> bool {
        self.pointer_down || self.host || self.voice
    }
}

/// Link between two particles, by index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Link {
    pub a: usize,
    pub b: usize,
    pub alpha: f32,
}

#[inline]
pub fn link_distance(level: PowerLevel) -> f32 {
    LINK_BASE_DISTANCE_PX + level.value() / 4.0
}

/// Linear falloff from [`LINK_MAX_ALPHA`] at distance 0 to nothing at
/// `max_distance`.
#[inline]
pub fn link_alpha(distance: f32, max_distance: f32) -> Option<f32> {
    (distance < max_distance).then(|| (1.0 - distance / max_distance) * LINK_MAX_ALPHA)
}

#[inline]
pub fn wash_alpha(level: PowerLevel) -> Option<f32> {
    let p = level.value();
    (p > WASH_THRESHOLD).then(|| ((p - WASH_THRESHOLD) / WASH_ALPHA_DIVISOR).min(1.0))
}

#[inline]
pub fn ribbon_width(level: PowerLevel) -> f32 {
    0.5 + level.value() / 40.0
}

#[inline]
pub fn ring_radius(time_ms: f64) -> f32 {
    (time_ms.rem_euclid(RING_PERIOD_MS) / 4.0) as f32
}

/// Toroidal wrap: leaving one edge re-enters at the opposite one.
#[inline]
pub fn wrap(mut pos: Vec2, size: Vec2) -> Vec2 {
    if pos.x > size.x {
        pos.x = 0.0;
    } else if pos.x < 0.0 {
        pos.x = size.x;
    }
    if pos.y > size.y {
        pos.y = 0.0;
    } else if pos.y < 0.0 {
        pos.y = size.y;
    }
    pos
}

/// Pull toward the pointer inside the attraction radius, stronger when
/// closer.
#[inline]
pub fn attract(pos: Vec2, pointer: Vec2, radius: f32, coeff: f32) -> Vec2 {
    let d = pointer - pos;
    let dist = d.length();
    if dist < radius {
        let force = (radius - dist) / radius;
        pos + d * force * coeff
    } else {
        pos
    }
}

/// The live background simulation for one canvas.
pub struct ParticleField {
    pub params: FieldParams,
    pub particles: Vec<Particle>,
    pub ribbons: Vec<Ribbon>,
    rng: StdRng,
    size: Vec2,
    intensity: Intensity,
    level: PowerLevel,
    pointer: Vec2,
    interacting: bool,
}

impl ParticleField {
    pub fn new(params: FieldParams, seed: u64, width: f32, height: f32) -> Self {
        let size = Vec2::new(width.max(0.0), height.max(0.0));
        let mut field = Self {
            params,
            particles: Vec::new(),
            ribbons: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            size,
            intensity: Intensity::Normal,
            level: PowerLevel::ZERO,
            pointer: size * 0.5,
            interacting: false,
        };
        field.regenerate();
        field
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    pub fn level(&self) -> PowerLevel {
        self.level
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Resize and fully regenerate the population. A zero-area size is
    /// rejected and leaves the field untouched.
    pub fn resize(&mut self, width: f32, height: f32) -> Result<()> {
        if !(width > 0.0 && height > 0.0) {
            return Err(CoreError::EmptyCanvas { width, height });
        }
        self.size = Vec2::new(width, height);
        self.regenerate();
        Ok(())
    }

    /// Apply new drive inputs; any change regenerates the population so
    /// speeds, colors and counts match the new tier.
    pub fn configure(&mut self, intensity: Intensity, level: PowerLevel) {
        if intensity != self.intensity || level != self.level {
            self.intensity = intensity;
            self.level = level;
            self.regenerate();
        }
    }

    pub fn set_pointer(&mut self, x: f32, y: f32) {
        if x.is_finite() && y.is_finite() {
            self.pointer = Vec2::new(x, y);
        }
    }

    pub fn set_interacting(&mut self, interacting: bool) {
        self.interacting = interacting;
    }

    pub fn regenerate(&mut self) {
        let (size, level) = (self.size, self.level);
        let rng = &mut self.rng;
        self.particles = (0..self.intensity.particle_count())
            .map(|_| Particle::spawn(rng, size, level))
            .collect();
        self.ribbons = (0..self.intensity.ribbon_count())
            .map(|_| Ribbon::spawn(rng, size, level))
            .collect();
        log::debug!(
            "[field] regenerated {} particles, {} ribbons at {:.0}x{:.0}",
            self.particles.len(),
            self.ribbons.len(),
            size.x,
            size.y
        );
    }

    /// All particle pairs closer than the current link distance.
    pub fn links(&self) -> Vec<Link> {
        let max = link_distance(self.level);
        let n = self.particles.len();
        let mut out = Vec::new();
        for a in 0..n {
            for b in (a + 1)..n {
                let d = self.particles[a].pos.distance(self.particles[b].pos);
                if let Some(alpha) = link_alpha(d, max) {
                    out.push(Link { a, b, alpha });
                }
            }
        }
        out
    }

    /// Advance one particle by velocity, attraction and wrap.
    fn advance_particle(&mut self, i: usize) {
        let (radius, coeff, pointer, size) = (
            self.params.attract_radius,
            self.params.attract_coeff,
            self.pointer,
            self.size,
        );
        let p = &mut self.particles[i];
        let moved = p.pos + p.vel;
        p.pos = wrap(attract(moved, pointer, radius, coeff), size);
    }

    /// Advance one frame at animation time `time_ms` and emit its draw list.
    pub fn step(&mut self, time_ms: f64, out: &mut Vec<DrawCmd>) {
        out.clear();
        out.push(DrawCmd::Clear { size: self.size });

        if let Some(alpha) = wash_alpha(self.level) {
            out.push(DrawCmd::FillRect {
                size: self.size,
                color: VIOLET.with_alpha(alpha),
            });
        }

        // Links use positions from before this frame's update
        for link in self.links() {
            out.push(DrawCmd::Line {
                from: self.particles[link.a].pos,
                to: self.particles[link.b].pos,
                width: LINK_LINE_WIDTH,
                color: LINK_WHITE.with_alpha(link.alpha),
            });
        }

        let width = ribbon_width(self.level);
        let drift = self.params.ribbon_drift;
        for r in self.ribbons.iter_mut() {
            r.advance(time_ms, drift);
            if let Some((start, segments)) = ribbon_path(&r.points) {
                out.push(DrawCmd::Curve {
                    start,
                    segments,
                    width,
                    color: r.color,
                });
            }
        }

        for i in 0..self.particles.len() {
            self.advance_particle(i);
            let p = &self.particles[i];
            out.push(DrawCmd::Dot {
                center: p.pos,
                radius: p.radius,
                color: p.color.with_alpha(p.alpha),
            });
        }

        if self.interacting {
            out.push(DrawCmd::Ring {
                center: self.pointer,
                radius: ring_radius(time_ms),
                width,
                color: RING_CYAN,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_formats_as_css() {
        assert_eq!(RIBBON_PINK.to_string(), "rgba(236, 72, 153, 0.04)");
    }

    #[test]
    fn path_through_five_points_has_three_segments() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(20.0, 10.0),
            Vec2::new(30.0, 10.0),
            Vec2::new(40.0, 0.0),
        ];
        let (start, segs) = ribbon_path(&pts).expect("path");
        assert_eq!(start, pts[0]);
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].control, pts[1]);
        assert_eq!(segs[0].end, Vec2::new(15.0, 5.0));
        assert_eq!(segs[2].end, Vec2::new(35.0, 5.0));
        assert!(ribbon_path(&pts[..1]).is_none());
    }
}
