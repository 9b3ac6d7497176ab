//! Variance argument tokens.
//!
//! Every algorithm takes one adjustment token: a leading `+`, `-`, or `=`
//! followed by a non-negative integer, optionally suffixed with `%`.
//! `+N`/`-N` change the active count by N workers, `+N%`/`-N%` by a
//! percentage of the total, and `=N`/`=N%` set an absolute target. Percent
//! values must lie in `[0, 100]`.

use crate::error::{LoadError, LoadResult};

/// A parsed adjustment token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Signed worker-count change.
    Delta(i64),
    /// Signed change as a percentage of the total worker count.
    DeltaPercent(i64),
    /// Absolute target worker count.
    Target(i64),
    /// Absolute target as a percentage of the total worker count.
    TargetPercent(i64),
}

impl Adjustment {
    /// Parses one adjustment token.
    pub fn parse(token: &str) -> LoadResult<Self> {
        let mut chars = token.chars();
        let sign = chars.next().ok_or_else(|| {
            LoadError::invalid_argument(token, "empty argument")
        })?;
        if !matches!(sign, '+' | '-' | '=') {
            return Err(LoadError::invalid_argument(
                token,
                "must begin with '+', '-', or '='",
            ));
        }

        let rest = chars.as_str();
        let (digits, percent) = match rest.strip_suffix('%') {
            Some(digits) => (digits, true),
            None => (rest, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LoadError::invalid_argument(
                token,
                "expected a non-negative integer",
            ));
        }
        let magnitude: i64 = digits.parse().map_err(|_| {
            LoadError::invalid_argument(token, "integer out of range")
        })?;
        if percent && magnitude > 100 {
            return Err(LoadError::invalid_argument(
                token,
                "percentage must lie in [0, 100]",
            ));
        }

        Ok(match (sign, percent) {
            ('+', false) => Adjustment::Delta(magnitude),
            ('-', false) => Adjustment::Delta(-magnitude),
            ('+', true) => Adjustment::DeltaPercent(magnitude),
            ('-', true) => Adjustment::DeltaPercent(-magnitude),
            ('=', false) => Adjustment::Target(magnitude),
            ('=', true) => Adjustment::TargetPercent(magnitude),
            _ => unreachable!("sign is checked above"),
        })
    }

    /// Resolves the token to a signed delta against the current counts,
    /// clamped so the resulting active count stays in `[0, total]`.
    pub fn resolve(&self, total_workers: usize, active_workers: usize) -> i64 {
        let total = total_workers as i64;
        let active = active_workers as i64;
        let raw = match self {
            Adjustment::Delta(delta) => *delta,
            Adjustment::DeltaPercent(percent) => total * percent / 100,
            Adjustment::Target(target) => target.min(&total) - active,
            Adjustment::TargetPercent(percent) => total * percent / 100 - active,
        };
        raw.clamp(-active, total - active)
    }
}
