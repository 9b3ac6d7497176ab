//! Value-pattern variable type.
//!
//! Generates strings from a literal pattern with bracketed numeric ranges:
//! `[min-max]` substitutes a sequential counter that wraps from max back to
//! min, and `[min:max]` substitutes a uniformly random value. Everything
//! else is copied through verbatim.

use super::{
    assign_type_error, invalid_invocation, MethodSignature, Variable, VariableValue,
    TYPE_BOOLEAN, TYPE_STRING,
};
use crate::error::ScriptResult;
use rand::Rng;
use tracing::warn;

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Sequential { min: i64, max: i64, next: i64 },
    Random { min: i64, max: i64 },
}

/// A script value producing patterned strings.
#[derive(Debug, Default)]
pub struct ValuePatternVariable {
    pattern: String,
    segments: Vec<Segment>,
}

impl ValuePatternVariable {
    /// Parses a pattern into segments. Returns false on malformed range
    /// syntax, leaving the previous pattern in place.
    fn set_pattern(&mut self, pattern: &str) -> bool {
        match parse_segments(pattern) {
            Some(segments) => {
                self.pattern = pattern.to_string();
                self.segments = segments;
                true
            }
            None => {
                warn!(pattern, "malformed value pattern");
                false
            }
        }
    }

    /// Renders the next value, advancing sequential counters.
    fn next_value(&mut self) -> String {
        let mut out = String::new();
        for segment in &mut self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Sequential { min, max, next } => {
                    out.push_str(&next.to_string());
                    *next = if *next >= *max { *min } else { *next + 1 };
                }
                Segment::Random { min, max } => {
                    let value = rand::thread_rng().gen_range(*min..=*max);
                    out.push_str(&value.to_string());
                }
            }
        }
        out
    }
}

fn parse_segments(pattern: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '[' {
            literal.push(c);
            continue;
        }

        let mut body = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == ']' {
                closed = true;
                break;
            }
            body.push(c);
        }
        if !closed {
            return None;
        }

        let (separator, random) = if body.contains(':') {
            (':', true)
        } else {
            ('-', false)
        };
        // The bounds may themselves be negative, so probe each candidate
        // separator position until both sides parse.
        let mut bounds = None;
        for (i, ch) in body.char_indices() {
            if ch != separator || i == 0 {
                continue;
            }
            if let (Ok(min), Ok(max)) =
                (body[..i].parse::<i64>(), body[i + 1..].parse::<i64>())
            {
                bounds = Some((min, max));
                break;
            }
        }
        let (min, max) = bounds?;
        if min > max {
            return None;
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(if random {
            Segment::Random { min, max }
        } else {
            Segment::Sequential {
                min,
                max,
                next: min,
            }
        });
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Some(segments)
}

const METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "setpattern",
        argument_types: &[TYPE_STRING],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "nextvalue",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
];

const SET_PATTERN: usize = 0;
const NEXT_VALUE: usize = 1;

impl Variable for ValuePatternVariable {
    fn type_name(&self) -> &'static str {
        "valuepattern"
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        Err(assign_type_error("valuepattern", value))
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        let result = match method_index {
            SET_PATTERN => {
                VariableValue::Boolean(self.set_pattern(&arguments[0].display_string()))
            }
            NEXT_VALUE => VariableValue::Text(self.next_value()),
            other => return Err(invalid_invocation("valuepattern", other)),
        };
        Ok(result)
    }

    fn value_string(&self) -> String {
        self.pattern.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_range_wraps() {
        let mut variable = ValuePatternVariable::default();
        assert_eq!(
            variable
                .invoke(SET_PATTERN, &[VariableValue::Text("user[1-3]".into())])
                .unwrap(),
            VariableValue::Boolean(true)
        );
        let mut seen = Vec::new();
        for _ in 0..4 {
            let VariableValue::Text(value) = variable.invoke(NEXT_VALUE, &[]).unwrap() else {
                panic!("nextvalue did not return text");
            };
            seen.push(value);
        }
        assert_eq!(seen, vec!["user1", "user2", "user3", "user1"]);
    }

    #[test]
    fn test_random_range_stays_in_bounds() {
        let mut variable = ValuePatternVariable::default();
        variable
            .invoke(
                SET_PATTERN,
                &[VariableValue::Text("id-[10:12]-x".into())],
            )
            .unwrap();
        for _ in 0..20 {
            let VariableValue::Text(value) = variable.invoke(NEXT_VALUE, &[]).unwrap() else {
                panic!("nextvalue did not return text");
            };
            assert!(["id-10-x", "id-11-x", "id-12-x"].contains(&value.as_str()));
        }
    }

    #[test]
    fn test_negative_bounds() {
        let mut variable = ValuePatternVariable::default();
        assert_eq!(
            variable
                .invoke(SET_PATTERN, &[VariableValue::Text("[-2--1]".into())])
                .unwrap(),
            VariableValue::Boolean(true)
        );
        let VariableValue::Text(first) = variable.invoke(NEXT_VALUE, &[]).unwrap() else {
            panic!("nextvalue did not return text");
        };
        assert_eq!(first, "-2");
    }

    #[test]
    fn test_malformed_pattern_reports_false() {
        let mut variable = ValuePatternVariable::default();
        for bad in ["[1-", "[3-1]", "[a-b]", "[5]"] {
            assert_eq!(
                variable
                    .invoke(SET_PATTERN, &[VariableValue::Text(bad.into())])
                    .unwrap(),
                VariableValue::Boolean(false),
                "pattern {} should be rejected",
                bad
            );
        }
    }
}
