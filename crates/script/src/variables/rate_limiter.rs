//! Rate-limiter variable type.
//!
//! Holds a worker's iteration rate at or below a configured ceiling by
//! sleeping in `waitfornext` whenever the loop runs ahead of schedule.

use super::{
    assign_type_error, invalid_invocation, MethodSignature, Variable, VariableValue,
    TYPE_INTEGER,
};
use crate::error::ScriptResult;
use std::time::{Duration, Instant};

/// A script value that paces the loop calling it.
#[derive(Debug)]
pub struct RateLimiterVariable {
    /// Maximum number of iterations per window.
    rate: i64,
    /// Window length in seconds.
    duration_secs: i64,
    last_iteration: Option<Instant>,
}

impl Default for RateLimiterVariable {
    fn default() -> Self {
        Self {
            rate: 1,
            duration_secs: 1,
            last_iteration: None,
        }
    }
}

impl RateLimiterVariable {
    /// The minimum interval between iterations implied by the configured
    /// rate and window.
    fn interval(&self) -> Duration {
        if self.rate <= 0 || self.duration_secs <= 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.duration_secs as f64 / self.rate as f64)
    }
}

const METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "setrate",
        argument_types: &[TYPE_INTEGER],
        return_type: None,
    },
    MethodSignature {
        name: "setduration",
        argument_types: &[TYPE_INTEGER],
        return_type: None,
    },
    MethodSignature {
        name: "waitfornext",
        argument_types: &[],
        return_type: None,
    },
];

const SET_RATE: usize = 0;
const SET_DURATION: usize = 1;
const WAIT_FOR_NEXT: usize = 2;

impl Variable for RateLimiterVariable {
    fn type_name(&self) -> &'static str {
        "ratelimiter"
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        Err(assign_type_error("ratelimiter", value))
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        match method_index {
            SET_RATE => {
                self.rate = arguments[0].expect_integer(0)?;
                self.last_iteration = None;
            }
            SET_DURATION => {
                self.duration_secs = arguments[0].expect_integer(0)?;
                self.last_iteration = None;
            }
            WAIT_FOR_NEXT => {
                let now = Instant::now();
                if let Some(last) = self.last_iteration {
                    let interval = self.interval();
                    let elapsed = now.duration_since(last);
                    if elapsed < interval {
                        std::thread::sleep(interval - elapsed);
                    }
                }
                self.last_iteration = Some(Instant::now());
            }
            other => return Err(invalid_invocation("ratelimiter", other)),
        }
        Ok(VariableValue::Null)
    }

    fn value_string(&self) -> String {
        format!("{} per {}s", self.rate, self.duration_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_enforces_interval() {
        let mut limiter = RateLimiterVariable::default();
        limiter
            .invoke(SET_RATE, &[VariableValue::Integer(20)])
            .unwrap();
        limiter
            .invoke(SET_DURATION, &[VariableValue::Integer(1)])
            .unwrap();

        let start = Instant::now();
        for _ in 0..3 {
            limiter.invoke(WAIT_FOR_NEXT, &[]).unwrap();
        }
        // Three iterations at 20/s: the second and third each wait ~50ms.
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn test_nonpositive_rate_never_sleeps() {
        let mut limiter = RateLimiterVariable::default();
        limiter
            .invoke(SET_RATE, &[VariableValue::Integer(0)])
            .unwrap();
        let start = Instant::now();
        for _ in 0..5 {
            limiter.invoke(WAIT_FOR_NEXT, &[]).unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
