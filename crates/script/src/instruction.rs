//! Script instruction tree.
//!
//! Instructions execute against a variable table and return a flow signal.
//! `Break`, `Continue`, and `Stop` are ordinary return values, not
//! exceptions: a loop consumes `Break` and `Continue`, and `Stop` unwinds
//! every layer until the driver sees it.

use crate::argument::Argument;
use crate::error::{ScriptError, ScriptResult};
use crate::interpreter::ExecutionControl;
use crate::variables::VariableTable;
use std::fmt;
use tracing::debug;

/// The result of executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the next instruction.
    Normal,
    /// Exit the innermost enclosing loop.
    Break,
    /// Restart the innermost enclosing loop.
    Continue,
    /// Unwind the whole script; the driver consumes this.
    Stop,
}

/// One node of the instruction tree. Every variant carries the 1-based
/// source line it started on.
#[derive(Debug, Clone)]
pub enum Instruction {
    Assignment {
        line: usize,
        target_name: String,
        target_slot: usize,
        source: Argument,
    },
    MethodCall {
        line: usize,
        variable_name: String,
        slot: usize,
        method_name: String,
        method_index: usize,
        arguments: Vec<Argument>,
    },
    If {
        line: usize,
        condition: Argument,
        then_branch: Box<Instruction>,
        else_branch: Option<Box<Instruction>>,
    },
    IfNot {
        line: usize,
        condition: Argument,
        then_branch: Box<Instruction>,
        else_branch: Option<Box<Instruction>>,
    },
    While {
        line: usize,
        condition: Argument,
        body: Box<Instruction>,
    },
    WhileNot {
        line: usize,
        condition: Argument,
        body: Box<Instruction>,
    },
    Loop {
        line: usize,
        count: Argument,
        body: Box<Instruction>,
    },
    Block {
        line: usize,
        instructions: Vec<Instruction>,
    },
    Break {
        line: usize,
    },
    Continue {
        line: usize,
    },
}

impl Instruction {
    /// The 1-based source line this instruction started on.
    pub fn line(&self) -> usize {
        match self {
            Instruction::Assignment { line, .. }
            | Instruction::MethodCall { line, .. }
            | Instruction::If { line, .. }
            | Instruction::IfNot { line, .. }
            | Instruction::While { line, .. }
            | Instruction::WhileNot { line, .. }
            | Instruction::Loop { line, .. }
            | Instruction::Block { line, .. }
            | Instruction::Break { line }
            | Instruction::Continue { line } => *line,
        }
    }

    /// Executes this instruction.
    pub fn execute(
        &self,
        table: &mut VariableTable,
        control: &ExecutionControl,
    ) -> ScriptResult<Flow> {
        self.execute_inner(table, control, false)
    }

    /// Executes this instruction with a per-line trace.
    pub fn debug_execute(
        &self,
        table: &mut VariableTable,
        control: &ExecutionControl,
    ) -> ScriptResult<Flow> {
        self.execute_inner(table, control, true)
    }

    fn execute_inner(
        &self,
        table: &mut VariableTable,
        control: &ExecutionControl,
        trace: bool,
    ) -> ScriptResult<Flow> {
        if trace {
            debug!(line = self.line(), "executing {}", self.describe());
        }

        match self {
            Instruction::Assignment {
                line,
                target_slot,
                target_name,
                source,
            } => {
                let value = source.evaluate(table)?;
                table.assign(*target_slot, &value).map_err(|e| {
                    ScriptError::runtime(
                        *line,
                        format!("assignment to '{}' failed: {}", target_name, e),
                    )
                })?;
                if trace {
                    debug!(
                        line = *line,
                        "{} is now {}",
                        target_name,
                        table.get(*target_slot).value_string()
                    );
                }
                Ok(Flow::Normal)
            }

            Instruction::MethodCall {
                slot,
                method_index,
                arguments,
                ..
            } => {
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(argument.evaluate(table)?);
                }
                table.invoke(*slot, *method_index, &values)?;
                Ok(Flow::Normal)
            }

            Instruction::If {
                line,
                condition,
                then_branch,
                else_branch,
            } => {
                let value = condition.evaluate(table)?.expect_boolean(*line)?;
                if value {
                    then_branch.execute_inner(table, control, trace)
                } else if let Some(else_branch) = else_branch {
                    else_branch.execute_inner(table, control, trace)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Instruction::IfNot {
                line,
                condition,
                then_branch,
                else_branch,
            } => {
                let value = condition.evaluate(table)?.expect_boolean(*line)?;
                if !value {
                    then_branch.execute_inner(table, control, trace)
                } else if let Some(else_branch) = else_branch {
                    else_branch.execute_inner(table, control, trace)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Instruction::While {
                line,
                condition,
                body,
            } => self.run_loop(table, control, trace, |table| {
                condition.evaluate(table)?.expect_boolean(*line)
            }, body),

            Instruction::WhileNot {
                line,
                condition,
                body,
            } => self.run_loop(table, control, trace, |table| {
                Ok(!condition.evaluate(table)?.expect_boolean(*line)?)
            }, body),

            Instruction::Loop { line, count, body } => {
                let total = count.evaluate(table)?.expect_integer(*line)?;
                let mut remaining = total.max(0);
                self.run_loop(table, control, trace, move |_table| {
                    if remaining > 0 {
                        remaining -= 1;
                        Ok(true)
                    } else {
                        Ok(false)
                    }
                }, body)
            }

            Instruction::Block { instructions, .. } => {
                for instruction in instructions {
                    match instruction.execute_inner(table, control, trace)? {
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }

            Instruction::Break { .. } => Ok(Flow::Break),
            Instruction::Continue { .. } => Ok(Flow::Continue),
        }
    }

    /// Shared driving loop for `while`, `whilenot`, and `loop`. Checks the
    /// stop flag every iteration and consumes one level of break/continue.
    fn run_loop<F>(
        &self,
        table: &mut VariableTable,
        control: &ExecutionControl,
        trace: bool,
        mut should_iterate: F,
        body: &Instruction,
    ) -> ScriptResult<Flow>
    where
        F: FnMut(&mut VariableTable) -> ScriptResult<bool>,
    {
        loop {
            if control.should_stop() {
                return Ok(Flow::Stop);
            }
            if !should_iterate(table)? {
                return Ok(Flow::Normal);
            }
            match body.execute_inner(table, control, trace)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => return Ok(Flow::Normal),
                Flow::Stop => return Ok(Flow::Stop),
            }
        }
    }

    /// A one-line description for debug traces.
    fn describe(&self) -> String {
        match self {
            Instruction::Assignment {
                target_name,
                source,
                ..
            } => format!("{} = {}", target_name, source),
            Instruction::MethodCall {
                variable_name,
                method_name,
                arguments,
                ..
            } => format!(
                "{}.{}({} arguments)",
                variable_name,
                method_name,
                arguments.len()
            ),
            Instruction::If { condition, .. } => format!("if {}", condition),
            Instruction::IfNot { condition, .. } => format!("ifnot {}", condition),
            Instruction::While { condition, .. } => format!("while {}", condition),
            Instruction::WhileNot { condition, .. } => format!("whilenot {}", condition),
            Instruction::Loop { count, .. } => format!("loop {}", count),
            Instruction::Block { instructions, .. } => {
                format!("begin ({} instructions)", instructions.len())
            }
            Instruction::Break { .. } => "break".to_string(),
            Instruction::Continue { .. } => "continue".to_string(),
        }
    }

    /// Renders this instruction as canonical script text at the given
    /// indentation depth.
    pub(crate) fn write_script(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match self {
            Instruction::Assignment {
                target_name,
                source,
                ..
            } => {
                out.push_str(&format!("{}{} = {};\n", indent, target_name, source));
            }
            Instruction::MethodCall {
                variable_name,
                method_name,
                arguments,
                ..
            } => {
                let rendered: Vec<String> =
                    arguments.iter().map(|argument| argument.to_string()).collect();
                out.push_str(&format!(
                    "{}{}.{}({});\n",
                    indent,
                    variable_name,
                    method_name,
                    rendered.join(", ")
                ));
            }
            Instruction::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                out.push_str(&format!("{}if {}\n", indent, condition));
                then_branch.write_script(out, depth + 1);
                if let Some(else_branch) = else_branch {
                    out.push_str(&format!("{}else\n", indent));
                    else_branch.write_script(out, depth + 1);
                }
            }
            Instruction::IfNot {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                out.push_str(&format!("{}ifnot {}\n", indent, condition));
                then_branch.write_script(out, depth + 1);
                if let Some(else_branch) = else_branch {
                    out.push_str(&format!("{}else\n", indent));
                    else_branch.write_script(out, depth + 1);
                }
            }
            Instruction::While {
                condition, body, ..
            } => {
                out.push_str(&format!("{}while {}\n", indent, condition));
                body.write_script(out, depth + 1);
            }
            Instruction::WhileNot {
                condition, body, ..
            } => {
                out.push_str(&format!("{}whilenot {}\n", indent, condition));
                body.write_script(out, depth + 1);
            }
            Instruction::Loop { count, body, .. } => {
                out.push_str(&format!("{}loop {}\n", indent, count));
                body.write_script(out, depth + 1);
            }
            Instruction::Block { instructions, .. } => {
                // A block renders one level out so its contents line up with
                // the keyword that introduced it.
                let block_indent = "  ".repeat(depth.saturating_sub(1));
                out.push_str(&format!("{}begin\n", block_indent));
                for instruction in instructions {
                    instruction.write_script(out, depth);
                }
                out.push_str(&format!("{}end;\n", block_indent));
            }
            Instruction::Break { .. } => {
                out.push_str(&format!("{}break;\n", indent));
            }
            Instruction::Continue { .. } => {
                out.push_str(&format!("{}continue;\n", indent));
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_script(&mut out, 0);
        write!(f, "{}", out)
    }
}
