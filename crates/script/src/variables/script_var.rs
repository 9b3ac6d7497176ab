//! Nested-script variable type.
//!
//! Lets a workload compose scripts: a script value parses source text once
//! and executes it on demand, with its own variable table.

use super::{
    assign_type_error, invalid_invocation, MethodSignature, StatContext, Variable,
    VariableValue, TYPE_BOOLEAN, TYPE_STRING,
};
use crate::error::ScriptResult;
use crate::interpreter::{ExecutionControl, Interpreter};
use crate::parser::{parse_script, ParsedScript};
use tracing::warn;

/// A script value holding another parsed script.
#[derive(Default)]
pub struct ScriptVariable {
    parsed: Option<ParsedScript>,
}

const METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "parse",
        argument_types: &[TYPE_STRING],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "execute",
        argument_types: &[],
        return_type: Some(TYPE_BOOLEAN),
    },
];

const PARSE: usize = 0;
const EXECUTE: usize = 1;

impl Variable for ScriptVariable {
    fn type_name(&self) -> &'static str {
        "script"
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        Err(assign_type_error("script", value))
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        let result = match method_index {
            PARSE => match parse_script(&arguments[0].display_string()) {
                Ok(parsed) => {
                    self.parsed = Some(parsed);
                    VariableValue::Boolean(true)
                }
                Err(e) => {
                    warn!(error = %e, "nested script failed to parse");
                    self.parsed = None;
                    VariableValue::Boolean(false)
                }
            },
            EXECUTE => match self.parsed.as_mut() {
                Some(parsed) => {
                    let control = ExecutionControl::new();
                    match Interpreter::run(parsed, &control, &StatContext::default()) {
                        Ok(()) => VariableValue::Boolean(true),
                        Err(e) => {
                            warn!(error = %e, "nested script failed");
                            VariableValue::Boolean(false)
                        }
                    }
                }
                None => VariableValue::Boolean(false),
            },
            other => return Err(invalid_invocation("script", other)),
        };
        Ok(result)
    }

    fn value_string(&self) -> String {
        match &self.parsed {
            Some(parsed) => format!("script ({} instructions)", parsed.instructions.len()),
            None => "script (not parsed)".to_string(),
        }
    }
}
