//! Stair-step variance algorithm: one immediate jump to the adjusted count.

use super::{Adjustment, VarianceAlgorithm, VarianceEvent};
use crate::error::{LoadError, LoadResult};

/// Applies its whole adjustment in a single event at offset zero.
pub struct StairStepVarianceAlgorithm {
    adjustment: Adjustment,
}

impl StairStepVarianceAlgorithm {
    pub fn new() -> Self {
        Self {
            adjustment: Adjustment::Delta(0),
        }
    }
}

impl Default for StairStepVarianceAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl VarianceAlgorithm for StairStepVarianceAlgorithm {
    fn algorithm_name(&self) -> &'static str {
        "stairstep"
    }

    fn configure(&mut self, arguments: &[&str]) -> LoadResult<()> {
        if arguments.len() != 1 {
            return Err(LoadError::ArgumentCount {
                name: "stairstep".to_string(),
                expected: 1,
                actual: arguments.len(),
            });
        }
        self.adjustment = Adjustment::parse(arguments[0])?;
        Ok(())
    }

    fn calculate(
        &self,
        _duration_secs: u64,
        total_workers: usize,
        active_workers: usize,
    ) -> Vec<VarianceEvent> {
        let delta = self.adjustment.resolve(total_workers, active_workers);
        if delta == 0 {
            return Vec::new();
        }
        vec![VarianceEvent::new(0, delta)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variance::tests::assert_event_invariants;

    fn configured(argument: &str) -> StairStepVarianceAlgorithm {
        let mut algorithm = StairStepVarianceAlgorithm::new();
        algorithm.configure(&[argument]).unwrap();
        algorithm
    }

    #[test]
    fn test_single_event_at_zero() {
        let events = configured("+8").calculate(60, 20, 0);
        assert_eq!(events, vec![VarianceEvent::new(0, 8)]);
        assert_event_invariants(&events, 20, 0);
    }

    #[test]
    fn test_target_percent() {
        // Total 50, active 10, target 30%: up by 5.
        let events = configured("=30%").calculate(10, 50, 10);
        assert_eq!(events, vec![VarianceEvent::new(0, 5)]);
    }

    #[test]
    fn test_no_change_is_empty() {
        assert!(configured("=10").calculate(10, 50, 10).is_empty());
        assert!(configured("+0").calculate(10, 50, 10).is_empty());
    }

    #[test]
    fn test_argument_count_enforced() {
        let mut algorithm = StairStepVarianceAlgorithm::new();
        assert!(algorithm.configure(&[]).is_err());
        assert!(algorithm.configure(&["+1", "+2"]).is_err());
    }
}
