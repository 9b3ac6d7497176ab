//! Variable type registry.
//!
//! Types are registered by lowercased name and resolved either by that name
//! (for `variable` declarations) or by their qualified class name (for `use`
//! declarations). Built-in types are pre-registered; registering the same
//! name again with a different class is a configuration error.

use super::{
    boolean::BooleanVariable, file_url::FileUrlVariable, html::HtmlDocumentVariable,
    http::HttpClientVariable, http::HttpRequestVariable, http::HttpResponseVariable,
    integer::IntegerVariable, rate_limiter::RateLimiterVariable, script_var::ScriptVariable,
    string_array::StringArrayVariable, string_var::StringVariable,
    trackers::CategoricalTrackerVariable, trackers::IncrementalTrackerVariable,
    trackers::IntegerValueTrackerVariable, trackers::TimeTrackerVariable,
    value_pattern::ValuePatternVariable, Variable,
};
use crate::error::{ScriptError, ScriptResult};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Constructor for a registered variable type.
pub type VariableFactory = fn() -> Box<dyn Variable>;

#[derive(Clone)]
struct Registration {
    class_name: String,
    factory: VariableFactory,
}

static REGISTRY: Lazy<RwLock<HashMap<String, Registration>>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (type_name, class_name, factory) in BUILTIN_TYPES {
        map.insert(
            type_name.to_string(),
            Registration {
                class_name: class_name.to_string(),
                factory: *factory,
            },
        );
    }
    RwLock::new(map)
});

/// Pre-registered built-in types.
const BUILTIN_TYPES: &[(&str, &str, VariableFactory)] = &[
    ("boolean", "stampede.variables.booleanvariable", || {
        Box::new(BooleanVariable::default())
    }),
    ("integer", "stampede.variables.integervariable", || {
        Box::new(IntegerVariable::default())
    }),
    ("string", "stampede.variables.stringvariable", || {
        Box::new(StringVariable::default())
    }),
    ("stringarray", "stampede.variables.stringarrayvariable", || {
        Box::new(StringArrayVariable::default())
    }),
    ("fileurl", "stampede.variables.fileurlvariable", || {
        Box::new(FileUrlVariable::default())
    }),
    ("ratelimiter", "stampede.variables.ratelimitervariable", || {
        Box::new(RateLimiterVariable::default())
    }),
    (
        "valuepattern",
        "stampede.variables.valuepatternvariable",
        || Box::new(ValuePatternVariable::default()),
    ),
    ("script", "stampede.variables.scriptvariable", || {
        Box::new(ScriptVariable::default())
    }),
    (
        "incrementaltracker",
        "stampede.variables.incrementaltrackervariable",
        || Box::new(IncrementalTrackerVariable::default()),
    ),
    (
        "categoricaltracker",
        "stampede.variables.categoricaltrackervariable",
        || Box::new(CategoricalTrackerVariable::default()),
    ),
    (
        "integervaluetracker",
        "stampede.variables.integervaluetrackervariable",
        || Box::new(IntegerValueTrackerVariable::default()),
    ),
    (
        "timetracker",
        "stampede.variables.timetrackervariable",
        || Box::new(TimeTrackerVariable::default()),
    ),
    ("httpclient", "stampede.variables.httpclientvariable", || {
        Box::new(HttpClientVariable::default())
    }),
    (
        "httprequest",
        "stampede.variables.httprequestvariable",
        || Box::new(HttpRequestVariable::default()),
    ),
    (
        "httpresponse",
        "stampede.variables.httpresponsevariable",
        || Box::new(HttpResponseVariable::default()),
    ),
    (
        "htmldocument",
        "stampede.variables.htmldocumentvariable",
        || Box::new(HtmlDocumentVariable::default()),
    ),
];

/// Registers a variable type under a lowercased name. Registering an
/// already-known name with a different implementing class is an error.
pub fn register_variable_type(
    type_name: &str,
    class_name: &str,
    factory: VariableFactory,
) -> ScriptResult<()> {
    let type_name = type_name.to_lowercase();
    let class_name = class_name.to_lowercase();
    let mut registry = REGISTRY.write();
    if let Some(existing) = registry.get(&type_name) {
        if existing.class_name != class_name {
            return Err(ScriptError::config(format!(
                "variable type '{}' is already registered by class {}",
                type_name, existing.class_name
            )));
        }
        return Ok(());
    }
    registry.insert(
        type_name,
        Registration {
            class_name,
            factory,
        },
    );
    Ok(())
}

/// Resolves a type name to its constructor.
pub fn resolve_type(type_name: &str) -> Option<VariableFactory> {
    let registry = REGISTRY.read();
    registry
        .get(&type_name.to_lowercase())
        .map(|registration| registration.factory)
}

/// Resolves a qualified class name, as given to `use`, to its type name and
/// constructor.
pub fn resolve_class(class_name: &str) -> Option<(String, VariableFactory)> {
    let class_name = class_name.to_lowercase();
    let registry = REGISTRY.read();
    registry
        .iter()
        .find(|(_, registration)| registration.class_name == class_name)
        .map(|(type_name, registration)| (type_name.clone(), registration.factory))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_resolve() {
        for name in [
            "boolean",
            "integer",
            "string",
            "stringarray",
            "fileurl",
            "ratelimiter",
            "valuepattern",
            "script",
            "incrementaltracker",
            "categoricaltracker",
            "integervaluetracker",
            "timetracker",
            "httpclient",
            "httprequest",
            "httpresponse",
            "htmldocument",
        ] {
            let factory = resolve_type(name).unwrap_or_else(|| panic!("missing {}", name));
            assert_eq!(factory().type_name(), name);
        }
    }

    #[test]
    fn test_resolution_is_case_insensitive() {
        assert!(resolve_type("Integer").is_some());
        assert!(resolve_class("stampede.variables.IntegerVariable").is_some());
    }

    #[test]
    fn test_duplicate_registration_conflict() {
        // Same name, same class: idempotent.
        register_variable_type(
            "integer",
            "stampede.variables.integervariable",
            || Box::new(IntegerVariable::default()),
        )
        .unwrap();

        // Same name, different class: rejected.
        let result = register_variable_type("integer", "elsewhere.fancyinteger", || {
            Box::new(IntegerVariable::default())
        });
        assert!(matches!(result, Err(ScriptError::Config { .. })));
    }

    #[test]
    fn test_resolve_class_yields_type_name() {
        let (type_name, _) = resolve_class("stampede.variables.httpclientvariable").unwrap();
        assert_eq!(type_name, "httpclient");
    }
}
