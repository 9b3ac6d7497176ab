//! Variable and value system for the scripting engine.
//!
//! Every script value is a named, typed container with an ordered method
//! table. Method lookup resolves `(name, argument types)` to a stable
//! integer index; invocation receives already-evaluated argument values and
//! dispatches on that index.

pub mod boolean;
pub mod file_url;
pub mod html;
pub mod http;
pub mod integer;
pub mod rate_limiter;
pub mod registry;
pub mod script_var;
pub mod string_array;
pub mod string_var;
pub mod table;
pub mod trackers;
pub mod value_pattern;

pub use registry::{register_variable_type, resolve_class, resolve_type};
pub use table::VariableTable;
pub use trackers::{StatContext, StatTracker, TrackerKind};

use crate::error::{ScriptError, ScriptResult};
use http::{HttpRequestState, HttpResponseState};

/// Type name of the boolean built-in.
pub const TYPE_BOOLEAN: &str = "boolean";
/// Type name of the integer built-in.
pub const TYPE_INTEGER: &str = "integer";
/// Type name of the string built-in.
pub const TYPE_STRING: &str = "string";
/// Type name of the string-array built-in.
pub const TYPE_STRING_ARRAY: &str = "stringarray";

/// An evaluated value, as passed between instructions, method arguments,
/// and assignments.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Boolean(bool),
    Integer(i64),
    Text(String),
    TextArray(Vec<String>),
    HttpRequest(HttpRequestState),
    HttpResponse(HttpResponseState),
    /// The result of a statement-only method.
    Null,
}

impl VariableValue {
    /// The type name this value would have as a declared variable.
    pub fn type_name(&self) -> &'static str {
        match self {
            VariableValue::Boolean(_) => TYPE_BOOLEAN,
            VariableValue::Integer(_) => TYPE_INTEGER,
            VariableValue::Text(_) => TYPE_STRING,
            VariableValue::TextArray(_) => TYPE_STRING_ARRAY,
            VariableValue::HttpRequest(_) => "httprequest",
            VariableValue::HttpResponse(_) => "httpresponse",
            VariableValue::Null => "null",
        }
    }

    /// Extracts a boolean, or fails with a runtime type error.
    pub fn expect_boolean(&self, line: usize) -> ScriptResult<bool> {
        match self {
            VariableValue::Boolean(value) => Ok(*value),
            other => Err(ScriptError::runtime(
                line,
                format!("expected a boolean value, found {}", other.type_name()),
            )),
        }
    }

    /// Extracts an integer, or fails with a runtime type error.
    pub fn expect_integer(&self, line: usize) -> ScriptResult<i64> {
        match self {
            VariableValue::Integer(value) => Ok(*value),
            other => Err(ScriptError::runtime(
                line,
                format!("expected an integer value, found {}", other.type_name()),
            )),
        }
    }

    /// Renders the value for debug traces.
    pub fn display_string(&self) -> String {
        match self {
            VariableValue::Boolean(value) => value.to_string(),
            VariableValue::Integer(value) => value.to_string(),
            VariableValue::Text(value) => value.clone(),
            VariableValue::TextArray(values) => format!("[{}]", values.join(", ")),
            VariableValue::HttpRequest(state) => format!("{} {}", state.method, state.url),
            VariableValue::HttpResponse(state) => format!("status {}", state.status_code),
            VariableValue::Null => "null".to_string(),
        }
    }
}

/// One entry of a variable type's ordered method table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSignature {
    /// Lowercased method name.
    pub name: &'static str,
    /// Exact argument type names, matched element for element.
    pub argument_types: &'static [&'static str],
    /// Return type name; `None` for statement-only methods.
    pub return_type: Option<&'static str>,
}

impl MethodSignature {
    /// True when this signature matches the given call shape exactly. No
    /// widening is performed.
    pub fn matches(&self, name: &str, argument_types: &[&str]) -> bool {
        self.name == name
            && self.argument_types.len() == argument_types.len()
            && self
                .argument_types
                .iter()
                .zip(argument_types)
                .all(|(a, b)| a == b)
    }
}

/// Resolves `(name, argument types)` to a method index in the given table.
/// The returned index is the table position, so it is stable for the life
/// of the process.
pub fn method_number(
    table: &[MethodSignature],
    name: &str,
    argument_types: &[&str],
) -> Option<usize> {
    table
        .iter()
        .position(|signature| signature.matches(name, argument_types))
}

/// True when the table has any method with the given name.
pub fn has_method(table: &[MethodSignature], name: &str) -> bool {
    table.iter().any(|signature| signature.name == name)
}

/// A named, typed script value with an extensible method set.
pub trait Variable: Send {
    /// The registered type name, lowercase.
    fn type_name(&self) -> &'static str;

    /// The ordered method table for this type.
    fn method_table(&self) -> &'static [MethodSignature];

    /// Replaces this variable's state from a value of the same type.
    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()>;

    /// Invokes the method at the given table index with already-evaluated
    /// arguments. Statement-only methods return `VariableValue::Null`.
    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue>;

    /// A snapshot of this variable's state as a value, used when the
    /// variable appears as an argument or assignment source. Types whose
    /// state cannot be snapshotted return `VariableValue::Null`.
    fn as_value(&self) -> VariableValue {
        VariableValue::Null
    }

    /// Renders the current state for debug traces.
    fn value_string(&self) -> String;

    /// Starts this variable's stat trackers, if it owns any.
    fn start_stat_trackers(&mut self, _context: &StatContext) {}

    /// Stops this variable's stat trackers, if it owns any.
    fn stop_stat_trackers(&mut self) {}

    /// Returns this variable's stat trackers for collection at job end.
    fn stat_trackers(&self) -> Vec<StatTracker> {
        Vec::new()
    }
}

/// Builds the runtime error for an out-of-range or mismatched invocation.
/// Reaching it means a call site resolved an index against a different
/// table, which a correct parser never does.
pub(crate) fn invalid_invocation(type_name: &str, method_index: usize) -> ScriptError {
    ScriptError::runtime(
        0,
        format!(
            "no method with index {} is defined for type {}",
            method_index, type_name
        ),
    )
}

/// Builds the error for an assignment whose source value does not match
/// the target's type.
pub(crate) fn assign_type_error(expected: &str, value: &VariableValue) -> ScriptError {
    ScriptError::runtime(
        0,
        format!(
            "cannot assign a value of type {} to a variable of type {}",
            value.type_name(),
            expected
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[MethodSignature] = &[
        MethodSignature {
            name: "add",
            argument_types: &[TYPE_INTEGER],
            return_type: Some(TYPE_INTEGER),
        },
        MethodSignature {
            name: "add",
            argument_types: &[TYPE_INTEGER, TYPE_INTEGER],
            return_type: Some(TYPE_INTEGER),
        },
        MethodSignature {
            name: "clear",
            argument_types: &[],
            return_type: None,
        },
    ];

    #[test]
    fn test_method_number_exact_match() {
        assert_eq!(method_number(TABLE, "add", &[TYPE_INTEGER]), Some(0));
        assert_eq!(
            method_number(TABLE, "add", &[TYPE_INTEGER, TYPE_INTEGER]),
            Some(1)
        );
        assert_eq!(method_number(TABLE, "clear", &[]), Some(2));
    }

    #[test]
    fn test_method_number_no_widening() {
        assert_eq!(method_number(TABLE, "add", &[TYPE_BOOLEAN]), None);
        assert_eq!(method_number(TABLE, "add", &[]), None);
        assert_eq!(method_number(TABLE, "missing", &[]), None);
    }

    #[test]
    fn test_has_method_matches_lookup() {
        // has_method(name) and a matching signature imply a valid index.
        assert!(has_method(TABLE, "add"));
        assert!(has_method(TABLE, "clear"));
        assert!(!has_method(TABLE, "drain"));
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(VariableValue::Boolean(true).type_name(), TYPE_BOOLEAN);
        assert_eq!(VariableValue::Integer(0).type_name(), TYPE_INTEGER);
        assert_eq!(
            VariableValue::Text(String::new()).type_name(),
            TYPE_STRING
        );
        assert_eq!(
            VariableValue::TextArray(Vec::new()).type_name(),
            TYPE_STRING_ARRAY
        );
        assert_eq!(VariableValue::Null.type_name(), "null");
    }
}
