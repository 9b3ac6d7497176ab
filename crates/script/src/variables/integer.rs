//! Integer variable type.

use super::{
    assign_type_error, invalid_invocation, MethodSignature, Variable, VariableValue,
    TYPE_BOOLEAN, TYPE_INTEGER, TYPE_STRING,
};
use crate::error::ScriptResult;
use rand::Rng;
use tracing::warn;

/// A signed 64-bit integer script value.
#[derive(Debug, Default, Clone)]
pub struct IntegerVariable {
    value: i64,
}

impl IntegerVariable {
    pub fn new(value: i64) -> Self {
        Self { value }
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

const METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "add",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_INTEGER),
    },
    MethodSignature {
        name: "subtract",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_INTEGER),
    },
    MethodSignature {
        name: "multiply",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_INTEGER),
    },
    MethodSignature {
        name: "divide",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_INTEGER),
    },
    MethodSignature {
        name: "remainder",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_INTEGER),
    },
    MethodSignature {
        name: "increment",
        argument_types: &[],
        return_type: None,
    },
    MethodSignature {
        name: "decrement",
        argument_types: &[],
        return_type: None,
    },
    MethodSignature {
        name: "equals",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "notequal",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "greaterthan",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "greaterorequal",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "lessthan",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "lessorequal",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "random",
        argument_types: &[TYPE_INTEGER, TYPE_INTEGER],
        return_type: Some(TYPE_INTEGER),
    },
    MethodSignature {
        name: "tostring",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
];

const ADD: usize = 0;
const SUBTRACT: usize = 1;
const MULTIPLY: usize = 2;
const DIVIDE: usize = 3;
const REMAINDER: usize = 4;
const INCREMENT: usize = 5;
const DECREMENT: usize = 6;
const EQUALS: usize = 7;
const NOT_EQUAL: usize = 8;
const GREATER_THAN: usize = 9;
const GREATER_OR_EQUAL: usize = 10;
const LESS_THAN: usize = 11;
const LESS_OR_EQUAL: usize = 12;
const RANDOM: usize = 13;
const TO_STRING: usize = 14;

impl Variable for IntegerVariable {
    fn type_name(&self) -> &'static str {
        TYPE_INTEGER
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        match value {
            VariableValue::Integer(value) => {
                self.value = *value;
                Ok(())
            }
            other => Err(assign_type_error(TYPE_INTEGER, other)),
        }
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        let result = match method_index {
            ADD => VariableValue::Integer(
                self.value.wrapping_add(arguments[0].expect_integer(0)?),
            ),
            SUBTRACT => VariableValue::Integer(
                self.value.wrapping_sub(arguments[0].expect_integer(0)?),
            ),
            MULTIPLY => VariableValue::Integer(
                self.value.wrapping_mul(arguments[0].expect_integer(0)?),
            ),
            DIVIDE => {
                let divisor = arguments[0].expect_integer(0)?;
                if divisor == 0 {
                    // Non-fatal by contract: the failure value is zero.
                    warn!("integer division by zero, returning 0");
                    VariableValue::Integer(0)
                } else {
                    VariableValue::Integer(self.value.wrapping_div(divisor))
                }
            }
            REMAINDER => {
                let divisor = arguments[0].expect_integer(0)?;
                if divisor == 0 {
                    warn!("integer remainder by zero, returning 0");
                    VariableValue::Integer(0)
                } else {
                    VariableValue::Integer(self.value.wrapping_rem(divisor))
                }
            }
            INCREMENT => {
                self.value = self.value.wrapping_add(1);
                VariableValue::Null
            }
            DECREMENT => {
                self.value = self.value.wrapping_sub(1);
                VariableValue::Null
            }
            EQUALS => VariableValue::Boolean(self.value == arguments[0].expect_integer(0)?),
            NOT_EQUAL => VariableValue::Boolean(self.value != arguments[0].expect_integer(0)?),
            GREATER_THAN => {
                VariableValue::Boolean(self.value > arguments[0].expect_integer(0)?)
            }
            GREATER_OR_EQUAL => {
                VariableValue::Boolean(self.value >= arguments[0].expect_integer(0)?)
            }
            LESS_THAN => VariableValue::Boolean(self.value < arguments[0].expect_integer(0)?),
            LESS_OR_EQUAL => {
                VariableValue::Boolean(self.value <= arguments[0].expect_integer(0)?)
            }
            RANDOM => {
                let lower = arguments[0].expect_integer(0)?;
                let upper = arguments[1].expect_integer(0)?;
                let (low, high) = if lower <= upper {
                    (lower, upper)
                } else {
                    (upper, lower)
                };
                VariableValue::Integer(rand::thread_rng().gen_range(low..=high))
            }
            TO_STRING => VariableValue::Text(self.value.to_string()),
            other => return Err(invalid_invocation(TYPE_INTEGER, other)),
        };
        Ok(result)
    }

    fn as_value(&self) -> VariableValue {
        VariableValue::Integer(self.value)
    }

    fn value_string(&self) -> String {
        self.value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let mut variable = IntegerVariable::new(10);
        assert_eq!(
            variable.invoke(ADD, &[VariableValue::Integer(5)]).unwrap(),
            VariableValue::Integer(15)
        );
        assert_eq!(
            variable
                .invoke(SUBTRACT, &[VariableValue::Integer(3)])
                .unwrap(),
            VariableValue::Integer(7)
        );
        assert_eq!(
            variable
                .invoke(REMAINDER, &[VariableValue::Integer(3)])
                .unwrap(),
            VariableValue::Integer(1)
        );
    }

    #[test]
    fn test_division_by_zero_is_not_fatal() {
        let mut variable = IntegerVariable::new(10);
        assert_eq!(
            variable.invoke(DIVIDE, &[VariableValue::Integer(0)]).unwrap(),
            VariableValue::Integer(0)
        );
        assert_eq!(
            variable
                .invoke(REMAINDER, &[VariableValue::Integer(0)])
                .unwrap(),
            VariableValue::Integer(0)
        );
    }

    #[test]
    fn test_increment_mutates_in_place() {
        let mut variable = IntegerVariable::new(0);
        variable.invoke(INCREMENT, &[]).unwrap();
        variable.invoke(INCREMENT, &[]).unwrap();
        variable.invoke(DECREMENT, &[]).unwrap();
        assert_eq!(variable.value(), 1);
    }

    #[test]
    fn test_comparisons() {
        let mut variable = IntegerVariable::new(5);
        assert_eq!(
            variable
                .invoke(LESS_THAN, &[VariableValue::Integer(6)])
                .unwrap(),
            VariableValue::Boolean(true)
        );
        assert_eq!(
            variable
                .invoke(GREATER_OR_EQUAL, &[VariableValue::Integer(5)])
                .unwrap(),
            VariableValue::Boolean(true)
        );
        assert_eq!(
            variable
                .invoke(NOT_EQUAL, &[VariableValue::Integer(5)])
                .unwrap(),
            VariableValue::Boolean(false)
        );
    }

    #[test]
    fn test_random_stays_in_range() {
        let mut variable = IntegerVariable::default();
        for _ in 0..50 {
            let result = variable
                .invoke(
                    RANDOM,
                    &[VariableValue::Integer(3), VariableValue::Integer(7)],
                )
                .unwrap();
            let VariableValue::Integer(value) = result else {
                panic!("random did not return an integer");
            };
            assert!((3..=7).contains(&value));
        }
    }
}
