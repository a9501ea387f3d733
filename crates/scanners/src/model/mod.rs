//! Normalized view of one Solidity source file.
//!
//! The model is built once per file by [`SourceModelBuilder`] and then only
//! read. It keeps just enough structure for pattern matching: declarations,
//! a flattened statement list per function, and per-function facts derived
//! from it (call sites, state writes, arithmetic, authorization guards).
//!
//! Every fact carries a `statement_index` into the owning function's
//! `body_statements`. Indices increase in source order, nested statements
//! included, so "happens after" questions reduce to comparing integers.

pub mod builder;

pub use builder::SourceModelBuilder;

use crate::analysis::SolidityVersion;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct SourceUnit {
    pub path: String,
    #[serde(skip)]
    pub raw_text: String,
    pub version: Option<SolidityVersion>,
    pub imports: Vec<String>,
    pub contracts: Vec<ContractDef>,
}

impl SourceUnit {
    pub fn contract(&self, name: &str) -> Option<&ContractDef> {
        self.contracts.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    Contract,
    Abstract,
    Library,
    Interface,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractDef {
    pub name: String,
    pub kind: ContractKind,
    pub inherited_names: BTreeSet<String>,
    pub state_variables: Vec<StateVariable>,
    pub functions: Vec<FunctionDef>,
    /// Names of modifiers declared in this contract.
    pub modifiers: BTreeSet<String>,
    /// Bodies of the declared modifiers, modeled like functions.
    pub modifier_defs: Vec<FunctionDef>,
    pub line: usize,
    pub end_line: usize,
}

impl ContractDef {
    pub fn state_variable(&self, name: &str) -> Option<&StateVariable> {
        self.state_variables.iter().find(|v| v.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn is_array_state(&self, name: &str) -> bool {
        self.state_variable(name)
            .map(|v| v.type_name.trim_end().ends_with(']'))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateVariable {
    pub name: String,
    pub type_name: String,
    pub visibility: Visibility,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

impl Visibility {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "public" => Some(Self::Public),
            "external" => Some(Self::External),
            "internal" => Some(Self::Internal),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Payable,
    View,
    Pure,
    NonPayable,
}

impl Mutability {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "payable" => Some(Self::Payable),
            "view" | "constant" => Some(Self::View),
            "pure" => Some(Self::Pure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Function,
    Constructor,
    Fallback,
    Receive,
    Modifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDef {
    pub name: String,
    pub kind: FunctionKind,
    pub visibility: Visibility,
    pub mutability: Mutability,
    pub applied_modifiers: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub body_statements: Vec<Statement>,
    pub external_call_sites: Vec<CallSite>,
    pub state_writes: Vec<StateWrite>,
    pub arithmetic_ops: Vec<ArithmeticOp>,
    pub auth_guards: Vec<AuthGuard>,
    pub line: usize,
    pub end_line: usize,
}

impl FunctionDef {
    /// Reachable from outside the contract.
    pub fn is_entry_point(&self) -> bool {
        matches!(self.kind, FunctionKind::Function | FunctionKind::Fallback | FunctionKind::Receive)
            && matches!(self.visibility, Visibility::Public | Visibility::External)
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.mutability, Mutability::View | Mutability::Pure)
    }

    pub fn statement(&self, index: usize) -> Option<&Statement> {
        self.body_statements.get(index)
    }

    /// Text of the statement at `index`, empty for opaque or missing statements.
    pub fn statement_text(&self, index: usize) -> &str {
        match self.statement(index) {
            Some(Statement::Recognized { text, .. }) => text,
            _ => "",
        }
    }

    pub fn recognized_statements(&self) -> impl Iterator<Item = (usize, StatementKind, &str, usize)> {
        self.body_statements.iter().filter_map(|s| match s {
            Statement::Recognized {
                index,
                kind,
                text,
                line,
                ..
            } => Some((*index, *kind, text.as_str(), *line)),
            Statement::Opaque { .. } => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Expression,
    VariableDeclaration,
    If,
    For,
    While,
    DoWhile,
    Return,
    Emit,
    Revert,
    Block,
    Unchecked,
    Assembly,
    Other,
}

impl StatementKind {
    pub fn is_loop(&self) -> bool {
        matches!(self, Self::For | Self::While | Self::DoWhile)
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::If | Self::For | Self::While | Self::DoWhile)
    }
}

/// One statement of a function body.
///
/// Compound statements record only their header (`if (...)`, `for (...)`);
/// their children follow as separate entries. Statements the parser could
/// not make sense of are kept as `Opaque` so indices stay aligned with the
/// source and detectors can skip them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    Recognized {
        index: usize,
        kind: StatementKind,
        text: String,
        line: usize,
        unchecked: bool,
    },
    Opaque {
        index: usize,
        raw: String,
        line: usize,
    },
}

impl Statement {
    pub fn index(&self) -> usize {
        match self {
            Self::Recognized { index, .. } | Self::Opaque { index, .. } => *index,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::Recognized { line, .. } | Self::Opaque { line, .. } => *line,
        }
    }
}

/// How the first return value of a call is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnUse {
    /// Consumed directly by require/assert, a condition, or a return.
    Checked,
    /// Stored in a variable; whether it is checked later is up to the reader.
    Bound(String),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    pub statement_index: usize,
    pub line: usize,
    /// `call`, `delegatecall`, `staticcall`, `send`, `transfer` or `transferFrom`.
    pub method: String,
    pub target: String,
    pub transfers_value: bool,
    pub argument_count: usize,
    pub return_use: ReturnUse,
}

impl CallSite {
    pub fn is_low_level(&self) -> bool {
        matches!(self.method.as_str(), "call" | "delegatecall" | "staticcall" | "send")
    }

    /// Token-style `transfer(to, amount)` / `transferFrom(...)`, which return a bool.
    pub fn is_token_call(&self) -> bool {
        (self.method == "transfer" && self.argument_count == 2) || self.method == "transferFrom"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateWrite {
    pub variable_name: String,
    pub statement_index: usize,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArithmeticOperator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl ArithmeticOperator {
    pub fn parse(op: &str) -> Option<Self> {
        match op.trim() {
            "+" | "+=" | "++" => Some(Self::Add),
            "-" | "-=" | "--" => Some(Self::Sub),
            "*" | "*=" => Some(Self::Mul),
            "/" | "/=" => Some(Self::Div),
            _ => None,
        }
    }
}

impl fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArithmeticOp {
    pub operator: ArithmeticOperator,
    pub operands_text: String,
    pub statement_index: usize,
    pub line: usize,
    pub within_unchecked_block: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthGuardKind {
    MsgSenderCheck,
    TxOriginCheck,
    Modifier(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthGuard {
    pub kind: AuthGuardKind,
    /// `None` for guards contributed by an applied modifier.
    pub statement_index: Option<usize>,
    pub line: usize,
}
