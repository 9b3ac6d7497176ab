//! Linear variance algorithm: evenly spaced single-worker steps.

use super::{Adjustment, VarianceAlgorithm, VarianceEvent};
use crate::error::{LoadError, LoadResult};

/// Spreads its adjustment across the duration as single-unit events at
/// equal intervals.
pub struct LinearVarianceAlgorithm {
    adjustment: Adjustment,
}

impl LinearVarianceAlgorithm {
    pub fn new() -> Self {
        Self {
            adjustment: Adjustment::Delta(0),
        }
    }
}

impl Default for LinearVarianceAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl VarianceAlgorithm for LinearVarianceAlgorithm {
    fn algorithm_name(&self) -> &'static str {
        "linear"
    }

    fn configure(&mut self, arguments: &[&str]) -> LoadResult<()> {
        if arguments.len() != 1 {
            return Err(LoadError::ArgumentCount {
                name: "linear".to_string(),
                expected: 1,
                actual: arguments.len(),
            });
        }
        self.adjustment = Adjustment::parse(arguments[0])?;
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
            // No time to spread over: collapse to one full-size step.
            return vec![VarianceEvent::new(0, delta)];
        }

        let number = delta.unsigned_abs();
        let step = delta.signum();
        (0..number)
            .map(|i| VarianceEvent::new((i + 1) * duration_ms / number, step))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variance::tests::assert_event_invariants;

    fn configured(argument: &str) -> LinearVarianceAlgorithm {
        let mut algorithm = LinearVarianceAlgorithm::new();
        algorithm.configure(&[argument]).unwrap();
        algorithm
    }

    #[test]
    fn test_ramp_up_ten_over_ten_seconds() {
        let events = configured("+10").calculate(10, 100, 0);
        let expected: Vec<VarianceEvent> = (1..=10)
            .map(|i| VarianceEvent::new(i * 1000, 1))
            .collect();
        assert_eq!(events, expected);
        assert_event_invariants(&events, 100, 0);
    }

    #[test]
    fn test_ramp_down() {
        let events = configured("-4").calculate(8, 10, 10);
        assert_eq!(
            events,
            vec![
                VarianceEvent::new(2000, -1),
                VarianceEvent::new(4000, -1),
                VarianceEvent::new(6000, -1),
                VarianceEvent::new(8000, -1),
            ]
        );
        assert_event_invariants(&events, 10, 10);
    }

    #[test]
    fn test_zero_duration_collapses() {
        let events = configured("+10").calculate(0, 100, 0);
        assert_eq!(events, vec![VarianceEvent::new(0, 10)]);
    }

    #[test]
    fn test_net_sum_matches_resolved_delta() {
        let events = configured("=75%").calculate(30, 40, 5);
        let sum: i64 = events.iter().map(|event| event.delta).sum();
        // 75% of 40 is 30; from 5 active, the net change is +25.
        assert_eq!(sum, 25);
        assert_eq!(events.len(), 25);
        assert_event_invariants(&events, 40, 5);
    }

    #[test]
    fn test_zero_change_is_empty() {
        assert!(configured("+0%").calculate(10, 100, 50).is_empty());
    }
}
