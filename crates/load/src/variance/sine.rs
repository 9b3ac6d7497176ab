//! Sine variance algorithm: single-worker steps along a quarter sine wave.
//!
//! The concave shape front-loads its changes: the activation curve follows
//! `sin` from 0 to 90 degrees, so steps come quickly at first and slow as
//! the curve flattens. The convex shape is its mirror, starting slowly and
//! finishing fast. Event times solve the curve for each whole-worker
//! crossing: concave offsets are `2T·arcsin(i/n)/π`, convex offsets are
//! `T − 2T·arcsin((n−i)/n)/π`.

use super::{Adjustment, VarianceAlgorithm, VarianceEvent};
use crate::error::{LoadError, LoadResult};
use std::f64::consts::PI;
use std::str::FromStr;

/// Which half of the sine curve the activation follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SineShape {
    #[default]
    Concave,
    Convex,
}

impl FromStr for SineShape {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "concave" => Ok(SineShape::Concave),
            "convex" => Ok(SineShape::Convex),
            other => Err(LoadError::invalid_argument(
                other,
                "expected 'concave' or 'convex'",
            )),
        }
    }
}

/// Spreads its adjustment along a sine curve.
pub struct SineVarianceAlgorithm {
    shape: SineShape,
    adjustment: Adjustment,
}

impl SineVarianceAlgorithm {
    pub fn new() -> Self {
        Self {
            shape: SineShape::Concave,
            adjustment: Adjustment::Delta(0),
        }
    }
}

impl Default for SineVarianceAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl VarianceAlgorithm for SineVarianceAlgorithm {
    fn algorithm_name(&self) -> &'static str {
        "sine"
    }

    fn configure(&mut self, arguments: &[&str]) -> LoadResult<()> {
        if arguments.len() != 2 {
            return Err(LoadError::ArgumentCount {
                name: "sine".to_string(),
                expected: 2,
                actual: arguments.len(),
            });
        }
        self.shape = arguments[0].parse()?;
        self.adjustment = Adjustment::parse(arguments[1])?;
        Ok(())
    }

    fn calculate(
        &self,
        duration_secs: u64,
        total_workers: usize,
        active_workers: usize,
    ) -> Vec<VarianceEvent> {
        let delta = self.adjustment.resolve(total_workers, active_workers);
        if delta == 0 {
            return Vec::new();
        }

        let duration_ms = duration_secs * 1000;
        if duration_ms == 0 {
            return vec![VarianceEvent::new(0, delta)];
        }

        let number = delta.unsigned_abs();
        let step = delta.signum();
        (1..=number)
            .map(|i| {
                let offset = match self.shape {
                    SineShape::Concave => curve_offset(duration_ms, i, number),
                    SineShape::Convex => {
                        duration_ms - curve_offset(duration_ms, number - i, number)
                    }
                };
                VarianceEvent::new(offset, step)
            })
            .collect()
    }
}

/// The time at which the quarter sine wave reaches `i` of `number` units.
fn curve_offset(duration_ms: u64, i: u64, number: u64) -> u64 {
    let fraction = i as f64 / number as f64;
    (2.0 * duration_ms as f64 * fraction.asin() / PI).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variance::tests::assert_event_invariants;

    fn configured(shape: &str, argument: &str) -> SineVarianceAlgorithm {
        let mut algorithm = SineVarianceAlgorithm::new();
        algorithm.configure(&[shape, argument]).unwrap();
        algorithm
    }

    #[test]
    fn test_concave_offsets() {
        let events = configured("concave", "+4").calculate(10, 100, 0);
        assert_eq!(
            events,
            vec![
                VarianceEvent::new(1608, 1),
                VarianceEvent::new(3333, 1),
                VarianceEvent::new(5398, 1),
                VarianceEvent::new(10000, 1),
            ]
        );
        assert_event_invariants(&events, 100, 0);
    }

    #[test]
    fn test_convex_offsets_mirror_concave() {
        let events = configured("convex", "+4").calculate(10, 100, 0);
        assert_eq!(
            events,
            vec![
                VarianceEvent::new(4602, 1),
                VarianceEvent::new(6667, 1),
                VarianceEvent::new(8392, 1),
                VarianceEvent::new(10000, 1),
            ]
        );
        assert_event_invariants(&events, 100, 0);
    }

    #[test]
    fn test_concave_gaps_widen() {
        let events = configured("concave", "+8").calculate(20, 100, 0);
        let offsets: Vec<u64> = events.iter().map(|event| event.offset_ms).collect();
        for window in offsets.windows(3) {
            assert!(window[1] - window[0] <= window[2] - window[1]);
        }
    }

    #[test]
    fn test_ramp_down_along_curve() {
        let events = configured("concave", "-6").calculate(12, 30, 20);
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|event| event.delta == -1));
        assert_event_invariants(&events, 30, 20);
    }

    #[test]
    fn test_shape_argument_validated() {
        let mut algorithm = SineVarianceAlgorithm::new();
        assert!(algorithm.configure(&["wavy", "+4"]).is_err());
        assert!(algorithm.configure(&["concave"]).is_err());
    }

    #[test]
    fn test_zero_duration_collapses() {
        let events = configured("concave", "+4").calculate(0, 100, 0);
        assert_eq!(events, vec![VarianceEvent::new(0, 4)]);
    }
}
