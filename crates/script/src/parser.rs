//! Script parser.
//!
//! A recursive-descent parser over the lexer's token stream. All semantic
//! checks happen here: names must be legal and unreserved, declarations
//! must precede instructions, assignment sources must match their target's
//! type, conditions must be boolean, loop counts must be integer, and
//! every method call must resolve to an exact-signature match. Each error
//! carries the 1-based line and character of the offending token.

use crate::argument::{Argument, MethodCallArgument};
use crate::error::{ScriptError, ScriptResult};
use crate::instruction::Instruction;
use crate::lexer::Lexer;
use crate::token::{is_reserved_word, Token, TokenKind};
use crate::variables::{method_number, resolve_class, resolve_type, VariableTable};

/// The output of a successful parse: declarations, the instantiated
/// variable table, and the instruction tree.
pub struct ParsedScript {
    pub use_declarations: Vec<String>,
    pub variables: VariableTable,
    pub instructions: Vec<Instruction>,
}

impl ParsedScript {
    /// Renders the canonical form of this script: identifiers lowercased,
    /// whitespace normalized. Parsing the result reproduces an equivalent
    /// tree.
    pub fn to_script_string(&self) -> String {
        let mut out = String::new();
        for class_name in &self.use_declarations {
            out.push_str(&format!("use {};\n", class_name));
        }
        for slot in 0..self.variables.len() {
            out.push_str(&format!(
                "variable {} {};\n",
                self.variables.type_name(slot),
                self.variables.name(slot)
            ));
        }
        for instruction in &self.instructions {
            instruction.write_script(&mut out, 0);
        }
        out
    }
}

/// Parses script source text.
pub fn parse_script(source: &str) -> ScriptResult<ParsedScript> {
    Parser::new(source).parse()
}

#[derive(PartialEq, PartialOrd)]
enum Phase {
    Uses,
    Variables,
    Instructions,
}

struct Parser {
    lexer: Lexer,
    variables: VariableTable,
    use_declarations: Vec<String>,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            lexer: Lexer::new(source),
            variables: VariableTable::new(),
            use_declarations: Vec::new(),
        }
    }

    fn parse(mut self) -> ScriptResult<ParsedScript> {
        let mut instructions = Vec::new();
        let mut phase = Phase::Uses;

        loop {
            let Some(token) = self.peek_clone()? else {
                break;
            };

            if token.is_word("use") {
                if phase > Phase::Uses {
                    return Err(ScriptError::parse(
                        token.line,
                        token.column,
                        "'use' declarations may appear only before the first instruction",
                    ));
                }
                self.parse_use()?;
            } else if token.is_word("variable") {
                if phase > Phase::Variables {
                    return Err(ScriptError::parse(
                        token.line,
                        token.column,
                        "'variable' declarations may appear only before the first instruction",
                    ));
                }
                phase = Phase::Variables;
                self.parse_variable_declaration()?;
            } else {
                phase = Phase::Instructions;
                instructions.push(self.parse_instruction()?);
            }
        }

        Ok(ParsedScript {
            use_declarations: self.use_declarations,
            variables: self.variables,
            instructions,
        })
    }

    fn parse_use(&mut self) -> ScriptResult<()> {
        self.lexer.next()?; // 'use'
        let class = self.lexer.next_class_name()?;
        self.expect_kind(TokenKind::Semicolon, "';'")?;
        if resolve_class(&class.text).is_none() {
            return Err(ScriptError::parse(
                class.line,
                class.column,
                format!("unable to load variable class {}", class.text),
            ));
        }
        self.use_declarations.push(class.text);
        Ok(())
    }

    fn parse_variable_declaration(&mut self) -> ScriptResult<()> {
        self.lexer.next()?; // 'variable'
        let type_token = self.expect_identifier("a variable type")?;
        let Some(factory) = resolve_type(&type_token.text) else {
            return Err(ScriptError::parse(
                type_token.line,
                type_token.column,
                format!("undefined variable type '{}'", type_token.text),
            ));
        };

        let name_token = self.expect_identifier("a variable name")?;
        if is_reserved_word(&name_token.text) {
            return Err(ScriptError::parse(
                name_token.line,
                name_token.column,
                format!(
                    "'{}' is a reserved word and may not be used as a variable name",
                    name_token.text
                ),
            ));
        }
        if self.variables.slot(&name_token.text).is_some() {
            return Err(ScriptError::parse(
                name_token.line,
                name_token.column,
                format!("variable '{}' is already defined", name_token.text),
            ));
        }

        self.expect_kind(TokenKind::Semicolon, "';'")?;
        self.variables
            .declare(&name_token.text, &type_token.text, factory())
            .map_err(|e| {
                ScriptError::parse(name_token.line, name_token.column, e.to_string())
            })?;
        Ok(())
    }

    fn parse_instruction(&mut self) -> ScriptResult<Instruction> {
        let token = self.expect_peek("an instruction")?;

        if token.kind != TokenKind::Identifier {
            return Err(ScriptError::parse(
                token.line,
                token.column,
                format!("unexpected token '{}'", token.text),
            ));
        }

        match token.text.as_str() {
            "begin" => self.parse_block(),
            "if" => self.parse_conditional(false),
            "ifnot" => self.parse_conditional(true),
            "while" => self.parse_while(false),
            "whilenot" => self.parse_while(true),
            "loop" => self.parse_loop(),
            "break" => {
                self.lexer.next()?;
                self.expect_kind(TokenKind::Semicolon, "';'")?;
                Ok(Instruction::Break { line: token.line })
            }
            "continue" => {
                self.lexer.next()?;
                self.expect_kind(TokenKind::Semicolon, "';'")?;
                Ok(Instruction::Continue { line: token.line })
            }
            word if is_reserved_word(word) => Err(ScriptError::parse(
                token.line,
                token.column,
                format!("unexpected reserved word '{}'", word),
            )),
            _ => self.parse_assignment_or_call(),
        }
    }

    fn parse_block(&mut self) -> ScriptResult<Instruction> {
        let begin = self.lexer.expect_next("'begin'")?;
        let mut instructions = Vec::new();
        loop {
            let Some(token) = self.peek_clone()? else {
                let (line, column) = self.lexer.position();
                return Err(ScriptError::parse(
                    line,
                    column,
                    "unexpected end of script, expected 'end'",
                ));
            };
            if token.is_word("end") {
                self.lexer.next()?;
                self.expect_kind(TokenKind::Semicolon, "';'")?;
                return Ok(Instruction::Block {
                    line: begin.line,
                    instructions,
                });
            }
            instructions.push(self.parse_instruction()?);
        }
    }

    fn parse_conditional(&mut self, negated: bool) -> ScriptResult<Instruction> {
        let keyword = self.lexer.expect_next("'if' or 'ifnot'")?;
        let condition = self.parse_boolean_condition(&keyword)?;
        let then_branch = Box::new(self.parse_instruction()?);

        let else_branch = match self.peek_clone()? {
            Some(token) if token.is_word("else") => {
                self.lexer.next()?;
                Some(Box::new(self.parse_instruction()?))
            }
            _ => None,
        };

        Ok(if negated {
            Instruction::IfNot {
                line: keyword.line,
                condition,
                then_branch,
                else_branch,
            }
        } else {
            Instruction::If {
                line: keyword.line,
                condition,
                then_branch,
                else_branch,
            }
        })
    }

    fn parse_while(&mut self, negated: bool) -> ScriptResult<Instruction> {
        let keyword = self.lexer.expect_next("'while' or 'whilenot'")?;
        let condition = self.parse_boolean_condition(&keyword)?;
        let body = Box::new(self.parse_instruction()?);

        Ok(if negated {
            Instruction::WhileNot {
                line: keyword.line,
                condition,
                body,
            }
        } else {
            Instruction::While {
                line: keyword.line,
                condition,
                body,
            }
        })
    }

    fn parse_boolean_condition(&mut self, keyword: &Token) -> ScriptResult<Argument> {
        let position = self.expect_peek("a condition")?;
        let condition = self.parse_argument()?;
        if condition.static_type() != "boolean" {
            return Err(ScriptError::parse(
                position.line,
                position.column,
                format!(
                    "the condition for a {} statement must be a boolean value",
                    keyword.text
                ),
            ));
        }
        Ok(condition)
    }

    fn parse_loop(&mut self) -> ScriptResult<Instruction> {
        let keyword = self.lexer.expect_next("'loop'")?;
        let position = self.expect_peek("a loop count")?;
        let count = self.parse_argument()?;
        if count.static_type() != "integer" {
            return Err(ScriptError::parse(
                position.line,
                position.column,
                "the count for a loop statement must be an integer value",
            ));
        }
        let body = Box::new(self.parse_instruction()?);
        Ok(Instruction::Loop {
            line: keyword.line,
            count,
            body,
        })
    }

    fn parse_assignment_or_call(&mut self) -> ScriptResult<Instruction> {
        let name = self.lexer.expect_next("a variable name")?;
        let next = self.expect_peek("'=' or '.'")?;

        match next.kind {
            TokenKind::Equals => {
                let slot = self.resolve_variable(&name)?;
                self.lexer.next()?; // '='
                let source = self.parse_argument()?;
                let target_type = self.variables.type_name(slot).to_string();
                if source.static_type() != target_type {
                    return Err(ScriptError::parse(
                        name.line,
                        name.column,
                        format!(
                            "cannot assign a value of type {} to variable '{}' of type {}",
                            source.static_type(),
                            name.text,
                            target_type
                        ),
                    ));
                }
                self.expect_kind(TokenKind::Semicolon, "';'")?;
                Ok(Instruction::Assignment {
                    line: name.line,
                    target_name: name.text,
                    target_slot: slot,
                    source,
                })
            }
            TokenKind::Period => {
                let call = self.parse_method_call(&name, false)?;
                self.expect_kind(TokenKind::Semicolon, "';'")?;
                Ok(Instruction::MethodCall {
                    line: name.line,
                    variable_name: call.variable_name,
                    slot: call.slot,
                    method_name: call.method_name,
                    method_index: call.method_index,
                    arguments: call.arguments,
                })
            }
            _ => Err(ScriptError::parse(
                next.line,
                next.column,
                format!("expected '=' or '.' after '{}'", name.text),
            )),
        }
    }

    /// Parses `.method(args)` after an already-consumed variable name. When
    /// `as_argument` is set, the method must produce a value.
    fn parse_method_call(
        &mut self,
        name: &Token,
        as_argument: bool,
    ) -> ScriptResult<MethodCallArgument> {
        let slot = self.resolve_variable(name)?;
        self.lexer.next()?; // '.'
        let method = self.expect_identifier("a method name")?;
        self.expect_kind(TokenKind::OpenParen, "'('")?;
        let arguments = self.parse_argument_list()?;

        let argument_types: Vec<&str> = arguments
            .iter()
            .map(|argument| argument.static_type())
            .collect();
        let table = self.variables.get(slot).method_table();
        let Some(method_index) = method_number(table, &method.text, &argument_types) else {
            return Err(ScriptError::parse(
                method.line,
                method.column,
                format!(
                    "no method '{}({})' is defined for variable '{}' of type {}",
                    method.text,
                    argument_types.join(", "),
                    name.text,
                    self.variables.type_name(slot)
                ),
            ));
        };

        let return_type = match table[method_index].return_type {
            Some(return_type) => return_type.to_string(),
            None => {
                if as_argument {
                    return Err(ScriptError::parse(
                        method.line,
                        method.column,
                        format!("method '{}' does not return a value", method.text),
                    ));
                }
                String::new()
            }
        };

        Ok(MethodCallArgument {
            variable_name: name.text.clone(),
            slot,
            method_name: method.text,
            method_index,
            arguments,
            return_type,
            line: name.line,
        })
    }

    fn parse_argument_list(&mut self) -> ScriptResult<Vec<Argument>> {
        let mut arguments = Vec::new();
        if let Some(token) = self.peek_clone()? {
            if token.kind == TokenKind::CloseParen {
                self.lexer.next()?;
                return Ok(arguments);
            }
        }
        loop {
            arguments.push(self.parse_argument()?);
            let token = self.lexer.expect_next("',' or ')'")?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::CloseParen => return Ok(arguments),
                _ => {
                    return Err(ScriptError::parse(
                        token.line,
                        token.column,
                        format!("expected ',' or ')', found '{}'", token.text),
                    ))
                }
            }
        }
    }

    fn parse_argument(&mut self) -> ScriptResult<Argument> {
        let token = self.lexer.expect_next("an argument")?;
        match token.kind {
            TokenKind::QuotedString => Ok(Argument::StringLiteral(token.text)),
            TokenKind::Integer => token.text.parse::<i64>().map(Argument::IntegerLiteral).map_err(
                |_| {
                    ScriptError::parse(
                        token.line,
                        token.column,
                        format!("integer literal '{}' is out of range", token.text),
                    )
                },
            ),
            TokenKind::Identifier => {
                if token.text == "true" {
                    return Ok(Argument::BooleanLiteral(true));
                }
                if token.text == "false" {
                    return Ok(Argument::BooleanLiteral(false));
                }
                if is_reserved_word(&token.text) {
                    return Err(ScriptError::parse(
                        token.line,
                        token.column,
                        format!("unexpected reserved word '{}'", token.text),
                    ));
                }

                let followed_by_period = matches!(
                    self.peek_clone()?,
                    Some(next) if next.kind == TokenKind::Period
                );
                if followed_by_period {
                    let call = self.parse_method_call(&token, true)?;
                    Ok(Argument::MethodCall(Box::new(call)))
                } else {
                    let slot = self.resolve_variable(&token)?;
                    Ok(Argument::Variable {
                        name: token.text,
                        slot,
                        type_name: self.variables.type_name(slot).to_string(),
                    })
                }
            }
            _ => Err(ScriptError::parse(
                token.line,
                token.column,
                format!("unexpected token '{}'", token.text),
            )),
        }
    }

    fn resolve_variable(&self, token: &Token) -> ScriptResult<usize> {
        self.variables.slot(&token.text).ok_or_else(|| {
            ScriptError::parse(
                token.line,
                token.column,
                format!("'{}' is not a defined variable name.", token.text),
            )
        })
    }

    fn expect_identifier(&mut self, description: &str) -> ScriptResult<Token> {
        let token = self.lexer.expect_next(description)?;
        if token.kind != TokenKind::Identifier {
            return Err(ScriptError::parse(
                token.line,
                token.column,
                format!("expected {}, found '{}'", description, token.text),
            ));
        }
        Ok(token)
    }

    fn expect_kind(&mut self, kind: TokenKind, description: &str) -> ScriptResult<Token> {
        let token = self.lexer.expect_next(description)?;
        if token.kind != kind {
            return Err(ScriptError::parse(
                token.line,
                token.column,
                format!("expected {}, found '{}'", description, token.text),
            ));
        }
        Ok(token)
    }

    fn expect_peek(&mut self, description: &str) -> ScriptResult<Token> {
        match self.lexer.peek()? {
            Some(token) => Ok(token.clone()),
            None => {
                let (line, column) = self.lexer.position();
                Err(ScriptError::parse(
                    line,
                    column,
                    format!("unexpected end of script, expected {}", description),
                ))
            }
        }
    }

    fn peek_clone(&mut self) -> ScriptResult<Option<Token>> {
        Ok(self.lexer.peek()?.cloned())
    }
}
