//! Script arguments.
//!
//! An argument is anything that may stand where a value is expected: a
//! literal, a reference to a declared variable, or a method call that
//! produces a value. Every argument knows its static type at parse time and
//! can evaluate itself against a variable table. A method call used as an
//! argument re-evaluates on every access.

use crate::error::ScriptResult;
use crate::variables::{VariableTable, VariableValue, TYPE_BOOLEAN, TYPE_INTEGER, TYPE_STRING};
use std::fmt;

/// A value-producing expression in a script.
#[derive(Debug, Clone)]
pub enum Argument {
    BooleanLiteral(bool),
    IntegerLiteral(i64),
    StringLiteral(String),
    /// A reference to a declared variable.
    Variable {
        name: String,
        slot: usize,
        type_name: String,
    },
    /// A method call producing a value.
    MethodCall(Box<MethodCallArgument>),
}

/// A resolved method call appearing in argument position.
#[derive(Debug, Clone)]
pub struct MethodCallArgument {
    pub variable_name: String,
    pub slot: usize,
    pub method_name: String,
    pub method_index: usize,
    pub arguments: Vec<Argument>,
    pub return_type: String,
    pub line: usize,
}

impl Argument {
    /// The type this argument produces, known statically at parse time.
    pub fn static_type(&self) -> &str {
        match self {
            Argument::BooleanLiteral(_) => TYPE_BOOLEAN,
            Argument::IntegerLiteral(_) => TYPE_INTEGER,
            Argument::StringLiteral(_) => TYPE_STRING,
            Argument::Variable { type_name, .. } => type_name,
            Argument::MethodCall(call) => &call.return_type,
        }
    }

    /// Produces this argument's value. Literals copy, variable references
    /// snapshot the variable's current state, and method calls run the
    /// method.
    pub fn evaluate(&self, table: &mut VariableTable) -> ScriptResult<VariableValue> {
        match self {
            Argument::BooleanLiteral(value) => Ok(VariableValue::Boolean(*value)),
            Argument::IntegerLiteral(value) => Ok(VariableValue::Integer(*value)),
            Argument::StringLiteral(value) => Ok(VariableValue::Text(value.clone())),
            Argument::Variable { slot, .. } => Ok(table.value_of(*slot)),
            Argument::MethodCall(call) => call.evaluate(table),
        }
    }
}

impl MethodCallArgument {
    /// Evaluates the call's arguments left to right, then invokes the
    /// method.
    pub fn evaluate(&self, table: &mut VariableTable) -> ScriptResult<VariableValue> {
        let mut values = Vec::with_capacity(self.arguments.len());
        for argument in &self.arguments {
            values.push(argument.evaluate(table)?);
        }
        table.invoke(self.slot, self.method_index, &values)
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::BooleanLiteral(value) => write!(f, "{}", value),
            Argument::IntegerLiteral(value) => write!(f, "{}", value),
            Argument::StringLiteral(value) => write!(f, "\"{}\"", escape_string(value)),
            Argument::Variable { name, .. } => write!(f, "{}", name),
            Argument::MethodCall(call) => write!(f, "{}", call),
        }
    }
}

impl fmt::Display for MethodCallArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.variable_name, self.method_name)?;
        for (i, argument) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", argument)?;
        }
        write!(f, ")")
    }
}

/// Escapes a string literal for canonical script rendering.
pub(crate) fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}
