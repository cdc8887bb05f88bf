//! Insight responses: the upstream source of the power level.

use crate::error::Result;
use crate::power::{Intensity, PowerLevel};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Starting levels of the four capability meters.
pub const CAPABILITY_SEEDS: [f32; 4] = [45.0, 55.0, 40.0, 35.0];

/// Structured reply of the insight endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub insight: String,
    #[serde(default)]
    pub action_items: Vec<String>,
    pub power_level: i64,
}

impl Insight {
    /// Parse the endpoint's JSON text, clamping the power level to 1..=100.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut insight: Insight = serde_json::from_str(text.trim())?;
        insight.power_level = insight.power_level.clamp(1, 100);
        Ok(insight)
    }

    pub fn power(&self) -> PowerLevel {
        PowerLevel::new(self.power_level as f32)
    }
}

/// Raise a capability meter after an insight; `jitter` is uniform in [0, 1).
pub fn boost_capability(level: f32, power: PowerLevel, jitter: f32) -> f32 {
    (level + power.value() / 10.0 + jitter * 15.0).min(100.0)
}

/// Bars of the potential chart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PotentialChart {
    pub mind: f32,
    pub will: f32,
    pub creativity: f32,
    pub focus: f32,
}

impl Default for PotentialChart {
    fn default() -> Self {
        Self {
            mind: 85.0,
            will: 92.0,
            creativity: 78.0,
            focus: 65.0,
        }
    }
}

impl PotentialChart {
    /// Mind tracks the power level; will only ever rises toward it.
    pub fn apply(&mut self, power: PowerLevel) {
        let p = power.value();
        self.mind = p;
        self.will = self.will.max(p).min(100.0);
    }
}

/// Capability meters: strategic insight, adaptability, focus, creativity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Capabilities {
    pub levels: [f32; 4],
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            levels: CAPABILITY_SEEDS,
        }
    }
}

impl Capabilities {
    /// Boost every meter with its own jitter draw.
    pub fn boost<R: Rng + ?Sized>(&mut self, power: PowerLevel, rng: &mut R) {
        for level in self.levels.iter_mut() {
            *level = boost_capability(*level, power, rng.gen::<f32>());
        }
    }
}

/// Host-side request state around insights. Decides the field's tier and
/// owns the meters an insight moves.
#[derive(Clone, Debug, Default)]
pub struct InsightState {
    pub loading: bool,
    pub forced_high: bool,
    insight: Option<Insight>,
    pub chart: PotentialChart,
    pub capabilities: Capabilities,
}

impl InsightState {
    pub fn insight(&self) -> Option<&Insight> {
        self.insight.as_ref()
    }

    pub fn intensity(&self) -> Intensity {
        if self.forced_high {
            Intensity::High
        } else {
            Intensity::for_activity(self.loading, self.insight.is_some())
        }
    }

    /// Finish the in-flight request with the endpoint's reply. Loading ends
    /// whether or not the reply parses; a bad reply keeps the previous
    /// insight and meters.
    pub fn ingest<R: Rng + ?Sized>(&mut self, text: &str, rng: &mut R) -> Result<PowerLevel> {
        self.loading = false;
        let insight = Insight::from_json(text)?;
        let power = insight.power();
        self.chart.apply(power);
        self.capabilities.boost(power, rng);
        self.insight = Some(insight);
        Ok(power)
    }

    pub fn clear(&mut self) {
        self.insight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_power_is_clamped() {
        let i = Insight::from_json(r#"{"insight":"x","actionItems":[],"powerLevel":250}"#)
            .expect("parse");
        assert_eq!(i.power_level, 100);
        let i = Insight::from_json(r#"{"insight":"x","powerLevel":-3}"#).expect("parse");
        assert_eq!(i.power_level, 1);
        assert!(i.action_items.is_empty());
    }
}
