//! A small text template evaluator used by prefix annotations.
//!
//! The syntax is a subset of Go-style text templates:
//!
//! - `{{.key}}` looks a key up in the bindings
//! - `{{"text"}}` is a string literal
//! - `{{quote .key}}` and `{{join .a .b ", "}}` call the built-in functions
//! - `{{join (quote .a) .b "/"}}` groups a nested call
//!
//! Built-in functions:
//!
//! - `join`: all arguments but the last are joined with the last as separator
//! - `quote`: renders its argument as a double-quoted, escaped string literal
//!
//! [`render`] never fails. When the template cannot be parsed, or fails
//! part-way through execution, the error text is written into the output
//! as `[[<error>]]` so the caller always gets a message back.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Variables available to a template, by name
pub type Bindings = BTreeMap<String, String>;

/// Deepest nesting of parenthesized calls a template may use
pub const MAX_DEPTH: usize = 100;

// =============================================================================
// Errors
// =============================================================================

/// Line and column (both 1-based) of a template error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl Pos {
    fn locate(src: &str, offset: usize) -> Self {
        let before = &src[..offset.min(src.len())];
        let line = before.matches('\n').count() + 1;
        let col = match before.rfind('\n') {
            Some(nl) => before[nl + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        Pos { line, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Why a template failed to parse or execute
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    // Parse errors
    #[error("template: {pos}: unclosed action")]
    UnclosedAction { pos: Pos },

    #[error("template: {pos}: unterminated quoted string")]
    UnterminatedString { pos: Pos },

    #[error("template: {pos}: invalid escape sequence \\{escape} in quoted string")]
    InvalidEscape { pos: Pos, escape: char },

    #[error("template: {pos}: function {name:?} not defined")]
    UndefinedFunction { pos: Pos, name: String },

    #[error("template: {pos}: undefined variable \"${name}\"")]
    UndefinedVariable { pos: Pos, name: String },

    #[error("template: {pos}: {keyword:?} is not supported")]
    UnsupportedKeyword { pos: Pos, keyword: String },

    #[error("template: {pos}: unexpected {found} in {context}")]
    Unexpected {
        pos: Pos,
        found: String,
        context: &'static str,
    },

    #[error("template: {pos}: missing value for command")]
    EmptyCommand { pos: Pos },

    #[error("template: {pos}: max expression depth exceeded")]
    TooDeep { pos: Pos },

    // Execution errors
    /// A field names a key that isn't bound.
    ///
    /// Go's `text/template` prints a missing map key as `<no value>` and
    /// carries on. Here it stops execution, so a misspelled key shows up as
    /// an `[[...]]` marker in the message instead of silently reading
    /// `<no value>`.
    #[error("template: {pos}: map has no entry for key {key:?}")]
    MissingKey { pos: Pos, key: String },

    #[error("template: {pos}: wrong number of args for {name}: want {want}, got {got}")]
    ArgCount {
        pos: Pos,
        name: &'static str,
        want: &'static str,
        got: usize,
    },

    #[error("template: {pos}: can't give argument to non-function {operand}")]
    NotAFunction { pos: Pos, operand: String },

    #[error("template: {pos}: can't print the binding set itself, use a field like .key")]
    BareDot { pos: Pos },
}

impl TemplateError {
    /// Check whether this error was raised while parsing (as opposed to
    /// while executing)
    pub fn is_parse(&self) -> bool {
        !matches!(
            self,
            TemplateError::MissingKey { .. }
                | TemplateError::ArgCount { .. }
                | TemplateError::NotAFunction { .. }
                | TemplateError::BareDot { .. }
        )
    }
}

// =============================================================================
// Syntax tree
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Join,
    Quote,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "join" => Some(Func::Join),
            "quote" => Some(Func::Quote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Operand {
    Dot(usize),
    Field(String, usize),
    Str(String),
    Func(Func, usize),
    Nested(Command),
}

impl Operand {
    fn describe(&self) -> String {
        match self {
            Operand::Dot(_) => ".".to_string(),
            Operand::Field(name, _) => format!(".{}", name),
            Operand::Str(s) => format!("{:?}", s),
            Operand::Func(Func::Join, _) => "join".to_string(),
            Operand::Func(Func::Quote, _) => "quote".to_string(),
            Operand::Nested(_) => "(...)".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Command {
    operands: Vec<Operand>,
    offset: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Action(Command),
}

// =============================================================================
// Lexer
// =============================================================================

const KEYWORDS: &[&str] = &[
    "if", "else", "end", "range", "with", "define", "template", "block", "break", "continue",
    "nil", "true", "false",
];

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Dot,
    Field(String),
    Ident(String),
    Var(String),
    Str(String),
    LParen,
    RParen,
    Close,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Dot => "\".\"".to_string(),
            Tok::Field(name) => format!("field .{}", name),
            Tok::Ident(name) => format!("identifier {:?}", name),
            Tok::Var(name) => format!("variable ${}", name),
            Tok::Str(s) => format!("string {:?}", s),
            Tok::LParen => "\"(\"".to_string(),
            Tok::RParen => "\")\"".to_string(),
            Tok::Close => "\"}}\"".to_string(),
        }
    }
}

#[derive(Debug)]
struct Token {
    tok: Tok,
    offset: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenizes the inside of a single action, up to and including its `}}`
struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    action_start: usize,
}

impl<'a> Lexer<'a> {
    fn err_pos(&self, offset: usize) -> Pos {
        Pos::locate(self.src, offset)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn ident(&mut self) -> String {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|(_, c)| !is_ident_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_string()
    }

    fn next(&mut self) -> Result<Token, TemplateError> {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
        let offset = self.pos;
        let rest = self.rest();

        let Some(c) = rest.chars().next() else {
            return Err(TemplateError::UnclosedAction {
                pos: self.err_pos(self.action_start),
            });
        };

        if rest.starts_with("}}") {
            self.pos += 2;
            return Ok(Token { tok: Tok::Close, offset });
        }

        let tok = match c {
            '.' => {
                self.pos += 1;
                let name = self.ident();
                if name.is_empty() {
                    Tok::Dot
                } else {
                    Tok::Field(name)
                }
            }
            '$' => {
                self.pos += 1;
                Tok::Var(self.ident())
            }
            '"' => Tok::Str(self.quoted(offset)?),
            '(' => {
                self.pos += 1;
                Tok::LParen
            }
            ')' => {
                self.pos += 1;
                Tok::RParen
            }
            c if c.is_alphabetic() || c == '_' => Tok::Ident(self.ident()),
            c => {
                return Err(TemplateError::Unexpected {
                    pos: self.err_pos(offset),
                    found: format!("{:?}", c),
                    context: "action",
                })
            }
        };

        Ok(Token { tok, offset })
    }

    fn quoted(&mut self, start: usize) -> Result<String, TemplateError> {
        let mut out = String::new();
        let mut chars = self.rest().char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(out);
                }
                '\n' => break,
                '\\' => {
                    let Some((j, esc)) = chars.next() else { break };
                    let decoded = match esc {
                        '\\' => '\\',
                        '"' => '"',
                        'n' => '\n',
                        't' => '\t',
                        other => {
                            return Err(TemplateError::InvalidEscape {
                                pos: self.err_pos(self.pos + j - 1),
                                escape: other,
                            })
                        }
                    };
                    out.push(decoded);
                }
                c => out.push(c),
            }
        }
        Err(TemplateError::UnterminatedString {
            pos: self.err_pos(start),
        })
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&mut self) -> Result<&Token, TemplateError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn bump(&mut self) -> Result<Token, TemplateError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lexer.next(),
        }
    }

    fn unexpected(&self, token: &Token, context: &'static str) -> TemplateError {
        TemplateError::Unexpected {
            pos: self.lexer.err_pos(token.offset),
            found: token.tok.describe(),
            context,
        }
    }

    /// Parse a whole action after its opening `{{`
    fn action(&mut self) -> Result<Command, TemplateError> {
        let command = self.command()?;
        let token = self.bump()?;
        match token.tok {
            Tok::Close => Ok(command),
            _ => Err(self.unexpected(&token, "action")),
        }
    }

    fn command(&mut self) -> Result<Command, TemplateError> {
        let offset = self.peek()?.offset;
        let mut operands = Vec::new();
        loop {
            match self.peek()?.tok {
                Tok::RParen | Tok::Close => break,
                _ => operands.push(self.operand()?),
            }
        }
        if operands.is_empty() {
            return Err(TemplateError::EmptyCommand {
                pos: self.lexer.err_pos(offset),
            });
        }
        Ok(Command { operands, offset })
    }

    fn operand(&mut self) -> Result<Operand, TemplateError> {
        let token = self.bump()?;
        let pos = self.lexer.err_pos(token.offset);
        match token.tok {
            Tok::Dot => Ok(Operand::Dot(token.offset)),
            Tok::Field(name) => Ok(Operand::Field(name, token.offset)),
            Tok::Str(s) => Ok(Operand::Str(s)),
            Tok::Ident(name) => {
                if let Some(func) = Func::lookup(&name) {
                    Ok(Operand::Func(func, token.offset))
                } else if KEYWORDS.contains(&name.as_str()) {
                    Err(TemplateError::UnsupportedKeyword { pos, keyword: name })
                } else {
                    Err(TemplateError::UndefinedFunction { pos, name })
                }
            }
            Tok::Var(name) => Err(TemplateError::UndefinedVariable { pos, name }),
            Tok::LParen => {
                if self.depth >= MAX_DEPTH {
                    return Err(TemplateError::TooDeep { pos });
                }
                self.depth += 1;
                let inner = self.command()?;
                self.depth -= 1;

                let close = self.bump()?;
                match close.tok {
                    Tok::RParen => Ok(Operand::Nested(inner)),
                    _ => Err(self.unexpected(&close, "parenthesized call")),
                }
            }
            _ => Err(self.unexpected(&token, "command")),
        }
    }
}

// =============================================================================
// Template
// =============================================================================

/// A parsed template, ready to execute against any number of binding sets
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse a template
    pub fn parse(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        let nodes = parse_nodes(&source)?;
        Ok(Template { source, nodes })
    }

    /// Execute the template into a fresh string
    pub fn execute(&self, bindings: &Bindings) -> Result<String, TemplateError> {
        let mut out = String::new();
        self.execute_into(&mut out, bindings)?;
        Ok(out)
    }

    /// On error, `out` keeps whatever was rendered before the failing action
    fn execute_into(&self, out: &mut String, bindings: &Bindings) -> Result<(), TemplateError> {
        let exec = Exec {
            source: &self.source,
            bindings,
        };
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(command) => out.push_str(&exec.command(command)?),
            }
        }
        Ok(())
    }
}

fn parse_nodes(src: &str) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();
    let mut i = 0;

    while let Some(found) = src[i..].find("{{") {
        let open = i + found;
        if open > i {
            nodes.push(Node::Text(src[i..open].to_string()));
        }

        let mut parser = Parser {
            lexer: Lexer {
                src,
                pos: open + 2,
                action_start: open,
            },
            peeked: None,
            depth: 0,
        };
        nodes.push(Node::Action(parser.action()?));
        i = parser.lexer.pos;
    }

    if i < src.len() {
        nodes.push(Node::Text(src[i..].to_string()));
    }
    Ok(nodes)
}

// =============================================================================
// Execution
// =============================================================================

struct Exec<'a> {
    source: &'a str,
    bindings: &'a Bindings,
}

impl<'a> Exec<'a> {
    fn pos(&self, offset: usize) -> Pos {
        Pos::locate(self.source, offset)
    }

    fn command(&self, command: &Command) -> Result<String, TemplateError> {
        let (first, rest) = match command.operands.split_first() {
            Some(split) => split,
            None => {
                return Err(TemplateError::EmptyCommand {
                    pos: self.pos(command.offset),
                })
            }
        };

        if let Operand::Func(func, offset) = first {
            let args = rest
                .iter()
                .map(|op| self.operand(op))
                .collect::<Result<Vec<_>, _>>()?;
            return self.call(*func, *offset, args);
        }

        if !rest.is_empty() {
            return Err(TemplateError::NotAFunction {
                pos: self.pos(command.offset),
                operand: first.describe(),
            });
        }
        self.operand(first)
    }

    fn operand(&self, operand: &Operand) -> Result<String, TemplateError> {
        match operand {
            Operand::Dot(offset) => Err(TemplateError::BareDot {
                pos: self.pos(*offset),
            }),
            Operand::Field(key, offset) => {
                self.bindings
                    .get(key)
                    .cloned()
                    .ok_or_else(|| TemplateError::MissingKey {
                        pos: self.pos(*offset),
                        key: key.clone(),
                    })
            }
            Operand::Str(s) => Ok(s.clone()),
            // A function in argument position is called with no arguments
            Operand::Func(func, offset) => self.call(*func, *offset, Vec::new()),
            Operand::Nested(command) => self.command(command),
        }
    }

    fn call(&self, func: Func, offset: usize, args: Vec<String>) -> Result<String, TemplateError> {
        match func {
            Func::Join => match args.split_last() {
                Some((sep, elems)) if !elems.is_empty() => Ok(elems.join(sep)),
                _ => Err(TemplateError::ArgCount {
                    pos: self.pos(offset),
                    name: "join",
                    want: "at least 2",
                    got: args.len(),
                }),
            },
            Func::Quote => match args.as_slice() {
                [value] => Ok(format!("{:?}", value)),
                _ => Err(TemplateError::ArgCount {
                    pos: self.pos(offset),
                    name: "quote",
                    want: "1",
                    got: args.len(),
                }),
            },
        }
    }
}

// =============================================================================
// Rendering with inline error markers
// =============================================================================

/// Render a template, never failing.
///
/// If the template fails to parse, the output is just the error marker
/// `[[<error>]]`. If execution fails, the output is everything rendered up
/// to the failing action followed by the marker.
pub fn render(source: &str, bindings: &Bindings) -> String {
    let mut out = String::new();
    let result =
        Template::parse(source).and_then(|template| template.execute_into(&mut out, bindings));
    if let Err(err) = result {
        tracing::debug!(template = source, error = %err, "template failed, rendering inline marker");
        out.push_str(&format!("[[{}]]", err));
    }
    out
}
