//! Boolean variable type.

use super::{
    assign_type_error, invalid_invocation, MethodSignature, Variable, VariableValue,
    TYPE_BOOLEAN, TYPE_STRING,
};
use crate::error::ScriptResult;

/// A true/false script value.
#[derive(Debug, Default, Clone)]
pub struct BooleanVariable {
    value: bool,
}

impl BooleanVariable {
    pub fn new(value: bool) -> Self {
        Self { value }
    }

    pub fn value(&self) -> bool {
        self.value
    }
}

const METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "and",
        argument_types: &[TYPE_BOOLEAN],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "or",
        argument_types: &[TYPE_BOOLEAN],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "xor",
        argument_types: &[TYPE_BOOLEAN],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "not",
        argument_types: &[],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "equals",
        argument_types: &[TYPE_BOOLEAN],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "tostring",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
];

const AND: usize = 0;
const OR: usize = 1;
const XOR: usize = 2;
const NOT: usize = 3;
const EQUALS: usize = 4;
const TO_STRING: usize = 5;

impl Variable for BooleanVariable {
    fn type_name(&self) -> &'static str {
        TYPE_BOOLEAN
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        match value {
            VariableValue::Boolean(value) => {
                self.value = *value;
                Ok(())
            }
            other => Err(assign_type_error(TYPE_BOOLEAN, other)),
        }
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        let result = match method_index {
            AND => VariableValue::Boolean(self.value && arguments[0].expect_boolean(0)?),
            OR => VariableValue::Boolean(self.value || arguments[0].expect_boolean(0)?),
            XOR => VariableValue::Boolean(self.value ^ arguments[0].expect_boolean(0)?),
            NOT => VariableValue::Boolean(!self.value),
            EQUALS => VariableValue::Boolean(self.value == arguments[0].expect_boolean(0)?),
            TO_STRING => VariableValue::Text(self.value.to_string()),
            other => return Err(invalid_invocation(TYPE_BOOLEAN, other)),
        };
        Ok(result)
    }

    fn as_value(&self) -> VariableValue {
        VariableValue::Boolean(self.value)
    }

    fn value_string(&self) -> String {
        self.value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logic_methods() {
        let mut variable = BooleanVariable::new(true);
        assert_eq!(
            variable.invoke(AND, &[VariableValue::Boolean(false)]).unwrap(),
            VariableValue::Boolean(false)
        );
        assert_eq!(
            variable.invoke(OR, &[VariableValue::Boolean(false)]).unwrap(),
            VariableValue::Boolean(true)
        );
        assert_eq!(
            variable.invoke(XOR, &[VariableValue::Boolean(true)]).unwrap(),
            VariableValue::Boolean(false)
        );
        assert_eq!(
            variable.invoke(NOT, &[]).unwrap(),
            VariableValue::Boolean(false)
        );
    }

    #[test]
    fn test_assign_type_check() {
        let mut variable = BooleanVariable::default();
        assert!(variable.assign(&VariableValue::Boolean(true)).is_ok());
        assert!(variable.value());
        assert!(variable.assign(&VariableValue::Integer(1)).is_err());
    }
}
