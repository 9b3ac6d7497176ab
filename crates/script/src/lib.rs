//! # Stampede Scripting Engine
//!
//! The embedded workload language for the stampede load engine. A workload
//! author writes a small script that drives whatever protocol is being
//! benchmarked; every worker thread parses and runs its own copy against a
//! private variable table.
//!
//! The engine is organized into a few core pieces:
//!
//! - **Lexer / Parser**: tokenizes source text and builds the instruction
//!   tree, performing all semantic checks at parse time
//! - **Variables**: strongly typed values with ordered method tables and
//!   uniform index-based dispatch
//! - **Interpreter**: a tree walker with signal-based control flow and stat
//!   tracker lifecycle hooks
//!
//! ## Example
//!
//! ```rust
//! use stampede_script::{parse_script, ExecutionControl, Interpreter, StatContext};
//!
//! # fn example() -> Result<(), stampede_script::ScriptError> {
//! let mut script = parse_script(
//!     "variable integer count;\n\
//!      loop 10\n\
//!      begin\n\
//!        count.increment();\n\
//!      end;\n",
//! )?;
//!
//! Interpreter::run(&mut script, &ExecutionControl::new(), &StatContext::default())?;
//! # Ok(())
//! # }
//! ```

pub mod argument;
pub mod error;
pub mod instruction;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod variables;

pub use argument::{Argument, MethodCallArgument};
pub use error::{ScriptError, ScriptResult};
pub use instruction::{Flow, Instruction};
pub use interpreter::{ExecutionControl, Interpreter};
pub use lexer::Lexer;
pub use parser::{parse_script, ParsedScript};
pub use token::{Token, TokenKind};
pub use variables::{
    method_number, register_variable_type, resolve_type, MethodSignature, StatContext,
    StatTracker, TrackerKind, Variable, VariableTable, VariableValue,
};
