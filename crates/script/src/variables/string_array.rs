//! String-array variable type.

use super::{
    assign_type_error, invalid_invocation, MethodSignature, Variable, VariableValue,
    TYPE_BOOLEAN, TYPE_INTEGER, TYPE_STRING, TYPE_STRING_ARRAY,
};
use crate::error::ScriptResult;
use rand::Rng;

/// An ordered list of text values.
#[derive(Debug, Default, Clone)]
pub struct StringArrayVariable {
    values: Vec<String>,
}

impl StringArrayVariable {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

const METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "addvalue",
        argument_types: &[TYPE_STRING],
        return_type: None,
    },
    MethodSignature {
        name: "clear",
        argument_types: &[],
        return_type: None,
    },
    MethodSignature {
        name: "getvalue",
        argument_types: &[TYPE_INTEGER],
        return_type: Some(TYPE_STRING),
    },
    MethodSignature {
        name: "size",
        argument_types: &[],
        return_type: Some(TYPE_INTEGER),
    },
    MethodSignature {
        name: "randomvalue",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
    MethodSignature {
        name: "contains",
        argument_types: &[TYPE_STRING],
        return_type: Some(TYPE_BOOLEAN),
    },
];

const ADD_VALUE: usize = 0;
const CLEAR: usize = 1;
const GET_VALUE: usize = 2;
const SIZE: usize = 3;
const RANDOM_VALUE: usize = 4;
const CONTAINS: usize = 5;

impl Variable for StringArrayVariable {
    fn type_name(&self) -> &'static str {
        TYPE_STRING_ARRAY
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        match value {
            VariableValue::TextArray(values) => {
                self.values = values.clone();
                Ok(())
            }
            other => Err(assign_type_error(TYPE_STRING_ARRAY, other)),
        }
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        let result = match method_index {
            ADD_VALUE => {
                self.values.push(arguments[0].display_string());
                VariableValue::Null
            }
            CLEAR => {
                self.values.clear();
                VariableValue::Null
            }
            GET_VALUE => {
                let index = arguments[0].expect_integer(0)?;
                let value = if index >= 0 {
                    self.values.get(index as usize).cloned().unwrap_or_default()
                } else {
                    String::new()
                };
                VariableValue::Text(value)
            }
            SIZE => VariableValue::Integer(self.values.len() as i64),
            RANDOM_VALUE => {
                let value = if self.values.is_empty() {
                    String::new()
                } else {
                    let index = rand::thread_rng().gen_range(0..self.values.len());
                    self.values[index].clone()
                };
                VariableValue::Text(value)
            }
            CONTAINS => VariableValue::Boolean(
                self.values.contains(&arguments[0].display_string()),
            ),
            other => return Err(invalid_invocation(TYPE_STRING_ARRAY, other)),
        };
        Ok(result)
    }

    fn as_value(&self) -> VariableValue {
        VariableValue::TextArray(self.values.clone())
    }

    fn value_string(&self) -> String {
        format!("[{}]", self.values.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_get_size() {
        let mut variable = StringArrayVariable::default();
        variable
            .invoke(ADD_VALUE, &[VariableValue::Text("alpha".into())])
            .unwrap();
        variable
            .invoke(ADD_VALUE, &[VariableValue::Text("beta".into())])
            .unwrap();
        assert_eq!(
            variable.invoke(SIZE, &[]).unwrap(),
            VariableValue::Integer(2)
        );
        assert_eq!(
            variable
                .invoke(GET_VALUE, &[VariableValue::Integer(1)])
                .unwrap(),
            VariableValue::Text("beta".into())
        );
    }

    #[test]
    fn test_out_of_range_get_is_empty() {
        let mut variable = StringArrayVariable::new(vec!["only".into()]);
        assert_eq!(
            variable
                .invoke(GET_VALUE, &[VariableValue::Integer(5)])
                .unwrap(),
            VariableValue::Text("".into())
        );
        assert_eq!(
            variable
                .invoke(GET_VALUE, &[VariableValue::Integer(-1)])
                .unwrap(),
            VariableValue::Text("".into())
        );
    }

    #[test]
    fn test_random_value_from_members() {
        let mut variable =
            StringArrayVariable::new(vec!["a".into(), "b".into(), "c".into()]);
        for _ in 0..20 {
            let result = variable.invoke(RANDOM_VALUE, &[]).unwrap();
            let VariableValue::Text(value) = result else {
                panic!("randomvalue did not return text");
            };
            assert!(["a", "b", "c"].contains(&value.as_str()));
        }
    }

    #[test]
    fn test_clear_and_contains() {
        let mut variable = StringArrayVariable::new(vec!["x".into()]);
        assert_eq!(
            variable
                .invoke(CONTAINS, &[VariableValue::Text("x".into())])
                .unwrap(),
            VariableValue::Boolean(true)
        );
        variable.invoke(CLEAR, &[]).unwrap();
        assert_eq!(
            variable.invoke(SIZE, &[]).unwrap(),
            VariableValue::Integer(0)
        );
    }
}
