//! String variable type.

use super::{
    assign_type_error, invalid_invocation, MethodSignature, Variable, VariableValue,
    TYPE_BOOLEAN, TYPE_INTEGER, TYPE_STRING,
};
use crate::error::ScriptResult;

/// A text script value.
#[derive(Debug, Default, Clone)]
pub struct StringVariable {
    value: String,
}

impl StringVariable {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

const METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "append",
        argument_types: &[TYPE_STRING],
        return_type: None,
    },
    MethodSignature {
        name: "append",
        argument_types: &[TYPE_INTEGER],
        return_type: None,
    },
    MethodSignature {
        name: "contains",
        argument_types: &[TYPE_STRING],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "equals",
        argument_types: &[TYPE_STRING],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "equalsignorecase",
        argument_types: &[TYPE_STRING],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "length",
        argument_types: &[],
        return_type: Some(TYPE_INTEGER),
    },
    MethodSignature {
        name: "substring",
        argument_types: &[TYPE_INTEGER, TYPE_INTEGER],
        return_type: Some(TYPE_STRING),
    },
    MethodSignature {
        name: "tolowercase",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
    MethodSignature {
        name: "touppercase",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
];

const APPEND_STRING: usize = 0;
const APPEND_INTEGER: usize = 1;
const CONTAINS: usize = 2;
const EQUALS: usize = 3;
const EQUALS_IGNORE_CASE: usize = 4;
const LENGTH: usize = 5;
const SUBSTRING: usize = 6;
const TO_LOWER_CASE: usize = 7;
const TO_UPPER_CASE: usize = 8;

impl Variable for StringVariable {
    fn type_name(&self) -> &'static str {
        TYPE_STRING
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        match value {
            VariableValue::Text(value) => {
                self.value = value.clone();
                Ok(())
            }
            other => Err(assign_type_error(TYPE_STRING, other)),
        }
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        let result = match method_index {
            APPEND_STRING | APPEND_INTEGER => {
                self.value.push_str(&arguments[0].display_string());
                VariableValue::Null
            }
            CONTAINS => {
                VariableValue::Boolean(self.value.contains(&arguments[0].display_string()))
            }
            EQUALS => VariableValue::Boolean(self.value == arguments[0].display_string()),
            EQUALS_IGNORE_CASE => VariableValue::Boolean(
                self.value.to_lowercase() == arguments[0].display_string().to_lowercase(),
            ),
            LENGTH => VariableValue::Integer(self.value.chars().count() as i64),
            SUBSTRING => {
                let start = arguments[0].expect_integer(0)?.max(0) as usize;
                let end = arguments[1].expect_integer(0)?.max(0) as usize;
                let chars: Vec<char> = self.value.chars().collect();
                let start = start.min(chars.len());
                let end = end.clamp(start, chars.len());
                VariableValue::Text(chars[start..end].iter().collect())
            }
            TO_LOWER_CASE => VariableValue::Text(self.value.to_lowercase()),
            TO_UPPER_CASE => VariableValue::Text(self.value.to_uppercase()),
            other => return Err(invalid_invocation(TYPE_STRING, other)),
        };
        Ok(result)
    }

    fn as_value(&self) -> VariableValue {
        VariableValue::Text(self.value.clone())
    }

    fn value_string(&self) -> String {
        self.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_both_overloads() {
        let mut variable = StringVariable::new("run-");
        variable
            .invoke(APPEND_STRING, &[VariableValue::Text("batch".into())])
            .unwrap();
        variable
            .invoke(APPEND_INTEGER, &[VariableValue::Integer(7)])
            .unwrap();
        assert_eq!(variable.value(), "run-batch7");
    }

    #[test]
    fn test_substring_clamps_bounds() {
        let mut variable = StringVariable::new("abcdef");
        assert_eq!(
            variable
                .invoke(
                    SUBSTRING,
                    &[VariableValue::Integer(2), VariableValue::Integer(4)]
                )
                .unwrap(),
            VariableValue::Text("cd".into())
        );
        assert_eq!(
            variable
                .invoke(
                    SUBSTRING,
                    &[VariableValue::Integer(4), VariableValue::Integer(100)]
                )
                .unwrap(),
            VariableValue::Text("ef".into())
        );
        assert_eq!(
            variable
                .invoke(
                    SUBSTRING,
                    &[VariableValue::Integer(5), VariableValue::Integer(2)]
                )
                .unwrap(),
            VariableValue::Text("".into())
        );
    }

    #[test]
    fn test_case_insensitive_equality() {
        let mut variable = StringVariable::new("Hello");
        assert_eq!(
            variable
                .invoke(EQUALS, &[VariableValue::Text("hello".into())])
                .unwrap(),
            VariableValue::Boolean(false)
        );
        assert_eq!(
            variable
                .invoke(
                    EQUALS_IGNORE_CASE,
                    &[VariableValue::Text("hello".into())]
                )
                .unwrap(),
            VariableValue::Boolean(true)
        );
    }
}
