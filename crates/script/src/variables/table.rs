//! Variable table: the ordered set of declared variables for one script.

use super::{StatContext, StatTracker, Variable, VariableValue};
use crate::error::{ScriptError, ScriptResult};
use std::collections::HashMap;

/// The variables declared by one script, in declaration order. Each worker
/// owns its own table; nothing here is shared between workers.
pub struct VariableTable {
    names: Vec<String>,
    type_names: Vec<String>,
    variables: Vec<Box<dyn Variable>>,
    index: HashMap<String, usize>,
}

impl VariableTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            type_names: Vec::new(),
            variables: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Declares a new variable, returning its slot. Redeclaring a name is
    /// rejected.
    pub fn declare(
        &mut self,
        name: &str,
        type_name: &str,
        variable: Box<dyn Variable>,
    ) -> ScriptResult<usize> {
        if self.index.contains_key(name) {
            return Err(ScriptError::config(format!(
                "variable '{}' is already defined",
                name
            )));
        }
        let slot = self.variables.len();
        self.names.push(name.to_string());
        self.type_names.push(type_name.to_string());
        self.variables.push(variable);
        self.index.insert(name.to_string(), slot);
        Ok(slot)
    }

    /// Looks up a declared variable's slot by name.
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// The declared type name of a slot.
    pub fn type_name(&self, slot: usize) -> &str {
        &self.type_names[slot]
    }

    /// The declared name of a slot.
    pub fn name(&self, slot: usize) -> &str {
        &self.names[slot]
    }

    /// Number of declared variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// True when no variables are declared.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Immutable access to a declared variable.
    pub fn get(&self, slot: usize) -> &dyn Variable {
        self.variables[slot].as_ref()
    }

    /// Snapshot of a variable's state as a value.
    pub fn value_of(&self, slot: usize) -> VariableValue {
        self.variables[slot].as_value()
    }

    /// Assigns a value to the variable at the given slot.
    pub fn assign(&mut self, slot: usize, value: &VariableValue) -> ScriptResult<()> {
        self.variables[slot].assign(value)
    }

    /// Invokes a method on the variable at the given slot.
    pub fn invoke(
        &mut self,
        slot: usize,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        self.variables[slot].invoke(method_index, arguments)
    }

    /// Starts stat trackers on every declared variable.
    pub fn start_stat_trackers(&mut self, context: &StatContext) {
        for variable in &mut self.variables {
            variable.start_stat_trackers(context);
        }
    }

    /// Stops stat trackers on every declared variable.
    pub fn stop_stat_trackers(&mut self) {
        for variable in &mut self.variables {
            variable.stop_stat_trackers();
        }
    }

    /// Collects every variable's stat trackers.
    pub fn collect_stat_trackers(&self) -> Vec<StatTracker> {
        self.variables
            .iter()
            .flat_map(|variable| variable.stat_trackers())
            .collect()
    }
}

impl Default for VariableTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::integer::IntegerVariable;

    #[test]
    fn test_declare_and_lookup() {
        let mut table = VariableTable::new();
        let slot = table
            .declare("count", "integer", Box::new(IntegerVariable::default()))
            .unwrap();
        assert_eq!(table.slot("count"), Some(slot));
        assert_eq!(table.type_name(slot), "integer");
        assert_eq!(table.name(slot), "count");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_redeclaration_rejected() {
        let mut table = VariableTable::new();
        table
            .declare("count", "integer", Box::new(IntegerVariable::default()))
            .unwrap();
        let result = table.declare("count", "integer", Box::new(IntegerVariable::default()));
        assert!(result.is_err());
    }

    #[test]
    fn test_assign_and_snapshot() {
        let mut table = VariableTable::new();
        let slot = table
            .declare("count", "integer", Box::new(IntegerVariable::default()))
            .unwrap();
        table.assign(slot, &VariableValue::Integer(41)).unwrap();
        assert_eq!(table.value_of(slot), VariableValue::Integer(41));
    }
}
