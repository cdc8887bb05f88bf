use crate::constants::{PARTICLES_HIGH, PARTICLES_NORMAL, RIBBONS_HIGH, RIBBONS_NORMAL};

/// Current "intensity" the UI is reacting to, nominally 0..=100.
///
/// Absent, negative and NaN inputs collapse to 0. Values above 100 are kept
/// as-is; every formula downstream must tolerate them.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct PowerLevel(f32);

impl PowerLevel {
    pub const ZERO: PowerLevel = PowerLevel(0.0);

    pub fn new(value: f32) -> Self {
        if value.is_finite() && value > 0.0 {
            Self(value)
        } else {
            Self::ZERO
        }
    }

    pub fn from_option(value: Option<f64>) -> Self {
        value.map(|v| Self::new(v as f32)).unwrap_or_default()
    }

    #[inline]
    pub fn value(self) -> f32 {
        self.0
    }
}

impl From<f32> for PowerLevel {
    fn from(v: f32) -> Self {
        Self::new(v)
    }
}

/// Population tier for the background field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Intensity {
    #[default]
    Normal,
    High,
}

impl Intensity {
    /// High while a request is in flight or an insight is on screen.
    pub fn for_activity(loading: bool, has_insight: bool) -> Self {
        if loading || has_insight {
            Intensity::High
        } else {
            Intensity::Normal
        }
    }

    pub fn particle_count(self) -> usize {
        match self {
            Intensity::Normal => PARTICLES_NORMAL,
            Intensity::High => PARTICLES_HIGH,
        }
    }

    pub fn ribbon_count(self) -> usize {
        match self {
            Intensity::Normal => RIBBONS_NORMAL,
            Intensity::High => RIBBONS_HIGH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_invalid_levels_are_zero() {
        assert_eq!(PowerLevel::from_option(None).value(), 0.0);
        assert_eq!(PowerLevel::new(f32::NAN).value(), 0.0);
        assert_eq!(PowerLevel::new(-5.0).value(), 0.0);
        assert_eq!(PowerLevel::new(140.0).value(), 140.0);
    }

    #[test]
    fn intensity_tiers() {
        assert_eq!(Intensity::for_activity(false, false), Intensity::Normal);
        assert_eq!(Intensity::for_activity(true, false), Intensity::High);
        assert_eq!(Intensity::High.particle_count(), 150);
        assert_eq!(Intensity::Normal.ribbon_count(), 2);
    }
}
