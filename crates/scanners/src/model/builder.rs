//! Builds a [`SourceUnit`] from Solidity text using tree-sitter.
//!
//! Declarations are read from the syntax tree. Function bodies are flattened
//! into statements in source order, and every statement is scanned for the
//! facts detectors need. Only the statement's own part is scanned: the
//! condition of an `if`, the header of a `for`, or the whole of a simple
//! statement. Nested bodies are scanned when their own statements come up.
//!
//! Syntax errors are tolerated. A broken statement becomes
//! [`Statement::Opaque`] and the rest of the function is still modeled. Only a
//! file with no recoverable contract declaration at all fails with a
//! [`ParseError`].

use crate::analysis::{parse_solidity_version, patterns};
use crate::core::ParseError;
use crate::model::{
    ArithmeticOp, ArithmeticOperator, AuthGuard, AuthGuardKind, CallSite, ContractDef,
    ContractKind, FunctionDef, FunctionKind, Mutability, Parameter, ReturnUse, SourceUnit,
    StateVariable, StateWrite, Statement, StatementKind, Visibility,
};
use anyhow::Result;
use std::collections::{BTreeSet, HashMap, HashSet};
use streaming_iterator::StreamingIterator;
use tracing::debug;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

const CALL_QUERY: &str = r#"
(call_expression) @call
"#;

const EXTERNAL_METHODS: &[&str] = &[
    "call",
    "delegatecall",
    "staticcall",
    "send",
    "transfer",
    "transferFrom",
];

const BUILTIN_ROOTS: &[&str] = &["msg", "block", "tx", "this", "super", "abi", "type"];

const ROLE_CHECKS: &[&str] = &[
    "hasRole(",
    "_checkRole(",
    "_checkOwner(",
    "isOwner(",
    "_onlyOwner(",
];

pub struct SourceModelBuilder {
    language: Language,
    call_query: Query,
}

impl SourceModelBuilder {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_solidity::LANGUAGE.into();
        let call_query = Query::new(&language, CALL_QUERY)?;
        Ok(Self {
            language,
            call_query,
        })
    }

    pub fn build(&self, path: &str, source: &str) -> Result<SourceUnit, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| parse_error(path, 1, 1, format!("grammar could not be loaded: {}", e)))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| parse_error(path, 1, 1, "parser produced no syntax tree"))?;
        let root = tree.root_node();

        let mut declarations = Vec::new();
        collect_declarations(root, &mut declarations);

        if declarations.is_empty() && root.has_error() {
            return Err(first_syntax_error(path, source, root));
        }

        let imports = {
            let mut cursor = root.walk();
            root.named_children(&mut cursor)
                .filter(|n| n.kind() == "import_directive")
                .map(|n| source[n.byte_range()].trim().to_string())
                .collect()
        };

        let mut contracts: Vec<ContractDef> = declarations
            .into_iter()
            .map(|decl| self.contract_def(source, decl))
            .collect();

        attach_modifier_guards(&mut contracts);

        debug!(
            "Built source model for {}: {} contract(s), syntax errors: {}",
            path,
            contracts.len(),
            root.has_error()
        );

        Ok(SourceUnit {
            path: path.to_string(),
            raw_text: source.to_string(),
            version: parse_solidity_version(source),
            imports,
            contracts,
        })
    }

    fn contract_def(&self, source: &str, node: Node) -> ContractDef {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(source, n).to_string())
            .unwrap_or_else(|| "<anonymous>".to_string());

        let kind = match node.kind() {
            "library_declaration" => ContractKind::Library,
            "interface_declaration" => ContractKind::Interface,
            _ if node_text(source, node).trim_start().starts_with("abstract") => {
                ContractKind::Abstract
            }
            _ => ContractKind::Contract,
        };

        let mut inherited_names = BTreeSet::new();
        let mut body = node.child_by_field_name("body");
        {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "inheritance_specifier" => {
                        let ancestor = child
                            .child_by_field_name("ancestor")
                            .map(|n| node_text(source, n))
                            .unwrap_or_else(|| node_text(source, child));
                        let base = ancestor.split('(').next().unwrap_or(ancestor).trim();
                        if !base.is_empty() {
                            inherited_names.insert(base.to_string());
                        }
                    }
                    "contract_body" if body.is_none() => body = Some(child),
                    _ => {}
                }
            }
        }

        let mut contract = ContractDef {
            name,
            kind,
            inherited_names,
            state_variables: Vec::new(),
            functions: Vec::new(),
            modifiers: BTreeSet::new(),
            modifier_defs: Vec::new(),
            line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
        };

        let Some(body) = body else {
            return contract;
        };

        let members: Vec<Node> = {
            let mut cursor = body.walk();
            body.named_children(&mut cursor).collect()
        };

        for member in &members {
            if member.kind() == "state_variable_declaration" {
                if let Some(var) = state_variable(source, *member) {
                    contract.state_variables.push(var);
                }
            }
        }

        let state_names: HashSet<String> = contract
            .state_variables
            .iter()
            .map(|v| v.name.clone())
            .collect();
        let scope = ContractScope {
            state_names: &state_names,
            has_bases: !contract.inherited_names.is_empty(),
        };

        for member in &members {
            match member.kind() {
                "modifier_definition" => {
                    let def = self.function_def(source, *member, &scope);
                    contract.modifiers.insert(def.name.clone());
                    contract.modifier_defs.push(def);
                }
                "function_definition" | "constructor_definition" | "fallback_receive_definition" => {
                    contract
                        .functions
                        .push(self.function_def(source, *member, &scope));
                }
                _ => {}
            }
        }

        contract
    }

    fn function_def(&self, source: &str, node: Node, scope: &ContractScope) -> FunctionDef {
        let declared_name = node
            .child_by_field_name("name")
            .map(|n| node_text(source, n).to_string());

        let kind = match node.kind() {
            "constructor_definition" => FunctionKind::Constructor,
            "modifier_definition" => FunctionKind::Modifier,
            "fallback_receive_definition" => {
                if node_text(source, node).trim_start().starts_with("receive") {
                    FunctionKind::Receive
                } else {
                    FunctionKind::Fallback
                }
            }
            _ if declared_name.is_none() => FunctionKind::Fallback,
            _ => FunctionKind::Function,
        };

        let name = match kind {
            FunctionKind::Constructor => "constructor".to_string(),
            FunctionKind::Fallback => "fallback".to_string(),
            FunctionKind::Receive => "receive".to_string(),
            _ => declared_name.unwrap_or_default(),
        };

        let mut visibility = None;
        let mut mutability = None;
        let mut applied_modifiers = Vec::new();
        let mut parameters = Vec::new();
        let mut body = node.child_by_field_name("body");

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "visibility" | "public" | "external" | "internal" | "private" => {
                    visibility =
                        visibility.or_else(|| Visibility::parse(node_text(source, child)));
                }
                "state_mutability" | "pure" | "view" | "payable" | "constant" => {
                    mutability =
                        mutability.or_else(|| Mutability::parse(node_text(source, child)));
                }
                "modifier_invocation" => {
                    if let Some(m) = modifier_name(source, child) {
                        applied_modifiers.push(m);
                    }
                }
                "parameter" => parameters.push(parameter(source, child)),
                "parameter_list" => {
                    let mut inner = child.walk();
                    for p in child.named_children(&mut inner) {
                        if p.kind() == "parameter" {
                            parameters.push(parameter(source, p));
                        }
                    }
                }
                "function_body" | "block_statement" if body.is_none() => body = Some(child),
                _ => {}
            }
        }

        let visibility = visibility.unwrap_or(match kind {
            FunctionKind::Modifier => Visibility::Internal,
            FunctionKind::Fallback | FunctionKind::Receive => Visibility::External,
            // Before 0.5 an unmarked function was public.
            FunctionKind::Function | FunctionKind::Constructor => Visibility::Public,
        });
        let mutability = mutability.unwrap_or(match kind {
            FunctionKind::Receive => Mutability::Payable,
            _ => Mutability::NonPayable,
        });

        let mut locals: HashSet<String> = parameters
            .iter()
            .filter(|p| !p.name.is_empty())
            .map(|p| p.name.clone())
            .collect();
        let mut storage_aliases = HashMap::new();
        collect_locals(source, node, &mut locals, &mut storage_aliases);

        let mut walker = BodyWalker {
            source,
            call_query: &self.call_query,
            scope,
            locals,
            storage_aliases,
            statements: Vec::new(),
            calls: Vec::new(),
            writes: Vec::new(),
            ops: Vec::new(),
            guards: Vec::new(),
        };
        if let Some(body) = body {
            walker.walk_block(body, false);
        }

        FunctionDef {
            name,
            kind,
            visibility,
            mutability,
            applied_modifiers,
            parameters,
            body_statements: walker.statements,
            external_call_sites: walker.calls,
            state_writes: walker.writes,
            arithmetic_ops: walker.ops,
            auth_guards: walker.guards,
            line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
        }
    }
}

struct ContractScope<'s> {
    state_names: &'s HashSet<String>,
    has_bases: bool,
}

struct BodyWalker<'a, 's> {
    source: &'a str,
    call_query: &'a Query,
    scope: &'a ContractScope<'s>,
    locals: HashSet<String>,
    /// `Foo storage f = foos[id]` maps `f` to `foos`.
    storage_aliases: HashMap<String, String>,
    statements: Vec<Statement>,
    calls: Vec<CallSite>,
    writes: Vec<StateWrite>,
    ops: Vec<ArithmeticOp>,
    guards: Vec<AuthGuard>,
}

impl<'a, 's> BodyWalker<'a, 's> {
    fn text(&self, node: Node) -> &'a str {
        &self.source[node.byte_range()]
    }

    fn walk_block(&mut self, block: Node, unchecked: bool) {
        let children: Vec<Node> = {
            let mut cursor = block.walk();
            block.named_children(&mut cursor).collect()
        };
        for child in children {
            self.walk_statement(child, unchecked);
        }
    }

    /// Walks the body of a control structure without indexing the braces themselves.
    fn walk_body(&mut self, node: Node, unchecked: bool) {
        let node = unwrap_statement(node);
        if node.kind() == "block_statement" && !has_unchecked_keyword(node) && !node.is_error() {
            self.walk_block(node, unchecked);
        } else {
            self.walk_statement(node, unchecked);
        }
    }

    fn walk_statement(&mut self, node: Node, unchecked: bool) {
        let node = unwrap_statement(node);
        if matches!(node.kind(), "comment" | "unchecked") {
            return;
        }

        let index = self.statements.len();
        let line = node.start_position().row + 1;

        let kind = statement_kind(node);
        let compound = matches!(
            kind,
            StatementKind::If
                | StatementKind::For
                | StatementKind::While
                | StatementKind::DoWhile
                | StatementKind::Block
                | StatementKind::Unchecked
        ) || node.kind() == "try_statement";

        if node.is_error() || node.is_missing() || (!compound && node.has_error()) {
            self.statements.push(Statement::Opaque {
                index,
                raw: self.text(node).trim().to_string(),
                line,
            });
            return;
        }

        let body = node.child_by_field_name("body");
        let (header, segment, nested): (String, Vec<Node>, Vec<Node>) = match kind {
            StatementKind::If => {
                let header = self.header_text(node, body);
                let segment = node.child_by_field_name("condition").into_iter().collect();
                let nested = body
                    .into_iter()
                    .chain(node.child_by_field_name("else"))
                    .collect();
                (header, segment, nested)
            }
            StatementKind::For | StatementKind::While => {
                let header = self.header_text(node, body);
                let mut cursor = node.walk();
                let segment = node
                    .named_children(&mut cursor)
                    .filter(|c| Some(c.id()) != body.map(|b| b.id()) && c.kind() != "comment")
                    .collect();
                (header, segment, body.into_iter().collect())
            }
            StatementKind::DoWhile => {
                let condition = node.child_by_field_name("condition");
                let header = format!(
                    "do while ({})",
                    condition.map(|c| self.text(c).trim()).unwrap_or("")
                );
                (header, condition.into_iter().collect(), body.into_iter().collect())
            }
            StatementKind::Block | StatementKind::Unchecked => {
                let header = if kind == StatementKind::Unchecked {
                    "unchecked {".to_string()
                } else {
                    "{".to_string()
                };
                (header, Vec::new(), Vec::new())
            }
            StatementKind::Assembly => (self.text(node).trim().to_string(), Vec::new(), Vec::new()),
            _ if node.kind() == "try_statement" => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                let first_block = children
                    .iter()
                    .find(|c| matches!(c.kind(), "block_statement" | "catch_clause"))
                    .copied();
                let header = self.header_text(node, first_block);
                let segment = children
                    .iter()
                    .filter(|c| !matches!(c.kind(), "block_statement" | "catch_clause" | "comment"))
                    .copied()
                    .collect();
                let nested = children
                    .iter()
                    .filter(|c| matches!(c.kind(), "block_statement" | "catch_clause"))
                    .copied()
                    .collect();
                (header, segment, nested)
            }
            _ => (self.text(node).trim().to_string(), vec![node], Vec::new()),
        };

        let inner_unchecked = unchecked || kind == StatementKind::Unchecked;
        self.statements.push(Statement::Recognized {
            index,
            kind,
            text: header,
            line,
            unchecked,
        });

        self.scan_segment(index, kind, node, &segment, unchecked);

        match kind {
            StatementKind::Block | StatementKind::Unchecked => self.walk_block(node, inner_unchecked),
            _ => {
                for child in nested {
                    if child.kind() == "catch_clause" {
                        if let Some(block) = child.child_by_field_name("body").or_else(|| {
                            let mut cursor = child.walk();
                            let found = child
                                .named_children(&mut cursor)
                                .find(|c| c.kind() == "block_statement");
                            found
                        }) {
                            self.walk_body(block, inner_unchecked);
                        }
                    } else {
                        self.walk_body(child, inner_unchecked);
                    }
                }
            }
        }
    }

    fn header_text(&self, node: Node, body: Option<Node>) -> String {
        let end = body.map(|b| b.start_byte()).unwrap_or(node.end_byte());
        self.source[node.start_byte()..end].trim().to_string()
    }

    fn scan_segment(
        &mut self,
        index: usize,
        kind: StatementKind,
        statement: Node,
        segment: &[Node],
        unchecked: bool,
    ) {
        if segment.is_empty() {
            return;
        }
        let line = statement.start_position().row + 1;

        for part in segment {
            self.scan_calls(index, kind, statement, *part);
            self.scan_effects(index, kind, *part, unchecked);
        }

        let text: String = segment
            .iter()
            .map(|n| self.text(*n))
            .collect::<Vec<_>>()
            .join(" ");
        self.scan_guards(index, kind, &text, line);
    }

    fn scan_calls(&mut self, index: usize, kind: StatementKind, statement: Node, part: Node) {
        let mut call_nodes = Vec::new();
        {
            let mut cursor = QueryCursor::new();
            let mut matches = cursor.matches(self.call_query, part, self.source.as_bytes());
            matches.advance();
            while let Some(m) = matches.get() {
                for capture in m.captures {
                    call_nodes.push(capture.node);
                }
                matches.advance();
            }
        }
        call_nodes.sort_by_key(|n| n.start_byte());
        call_nodes.dedup_by_key(|n| n.id());

        for call in call_nodes {
            let Some(function) = call.child_by_field_name("function") else {
                continue;
            };
            let Some(mut method) = method_name(self.source, function) else {
                continue;
            };
            let callee = self.text(function);

            let legacy_value = method == "value" && callee.contains(".call.value");
            if legacy_value {
                method = "call".to_string();
            }
            if !EXTERNAL_METHODS.contains(&method.as_str()) {
                continue;
            }

            let argument_count = count_call_arguments(call);
            let transfers_value = legacy_value
                || method == "send"
                || (method == "transfer" && argument_count == 1)
                || (method == "call" && callee.contains("value:"));

            let stripped = patterns::strip_call_options(callee);
            let target = stripped
                .rsplit_once('.')
                .map(|(left, _)| left)
                .unwrap_or(stripped.as_str())
                .trim_end_matches(".call")
                .trim()
                .to_string();

            let return_use = self.return_use(call, statement, kind);

            self.calls.push(CallSite {
                statement_index: index,
                line: call.start_position().row + 1,
                method,
                target,
                transfers_value,
                argument_count,
                return_use,
            });
        }
    }

    fn return_use(&self, call: Node, statement: Node, kind: StatementKind) -> ReturnUse {
        let mut current = call.parent();
        while let Some(parent) = current {
            if parent.id() == statement.id() {
                break;
            }
            if parent.kind() == "call_expression" {
                if let Some(f) = parent.child_by_field_name("function") {
                    if matches!(self.text(f).trim(), "require" | "assert") {
                        return ReturnUse::Checked;
                    }
                }
            }
            current = parent.parent();
        }

        if kind.is_conditional() || kind == StatementKind::Return {
            return ReturnUse::Checked;
        }

        let statement_text = self.text(statement);
        let offset = call.start_byte().saturating_sub(statement.start_byte());
        match patterns::assignment_position(statement_text) {
            Some(eq) if eq < offset => patterns::bound_variable(&statement_text[..eq])
                .map(ReturnUse::Bound)
                .unwrap_or(ReturnUse::Ignored),
            _ => ReturnUse::Ignored,
        }
    }

    /// State writes and arithmetic inside one statement segment.
    fn scan_effects(&mut self, index: usize, kind: StatementKind, node: Node, unchecked: bool) {
        let line = node.start_position().row + 1;
        match node.kind() {
            "assignment_expression" | "augmented_assignment_expression" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.record_write(self.text(left), index, line);
                }
                if node.kind() == "augmented_assignment_expression" {
                    if let Some(op) = self.operator_between(node) {
                        self.record_op(op, node, index, unchecked);
                    }
                }
            }
            "binary_expression" => {
                if let Some(op) = self.operator_between(node) {
                    self.record_op(op, node, index, unchecked);
                }
            }
            "update_expression" => {
                let text = self.text(node);
                let operand = text.trim().trim_matches(|c: char| c == '+' || c == '-');
                self.record_write(operand, index, line);
                // Loop counters in a `for` header are not interesting arithmetic.
                if kind != StatementKind::For {
                    let op = if text.contains("++") { "++" } else { "--" };
                    self.record_op(op, node, index, unchecked);
                }
            }
            "unary_expression" => {
                let text = self.text(node).trim_start();
                if let Some(operand) = text.strip_prefix("delete") {
                    self.record_write(operand, index, line);
                }
            }
            "call_expression" => {
                if let Some(function) = node.child_by_field_name("function") {
                    if matches!(
                        method_name(self.source, function).as_deref(),
                        Some("push") | Some("pop")
                    ) {
                        let callee = self.text(function);
                        if let Some((target, _)) = callee.rsplit_once('.') {
                            self.record_write(target, index, line);
                        }
                    }
                }
            }
            _ => {}
        }

        let children: Vec<Node> = {
            let mut cursor = node.walk();
            node.named_children(&mut cursor).collect()
        };
        for child in children {
            self.scan_effects(index, kind, child, unchecked);
        }
    }

    /// Operator text between the `left` and `right` operands.
    fn operator_between(&self, node: Node) -> Option<&'a str> {
        let left = node.child_by_field_name("left")?;
        let right = node.child_by_field_name("right")?;
        if left.end_byte() > right.start_byte() {
            return None;
        }
        Some(self.source[left.end_byte()..right.start_byte()].trim())
    }

    fn record_op(&mut self, op: &str, node: Node, index: usize, unchecked: bool) {
        if let Some(operator) = ArithmeticOperator::parse(op) {
            self.ops.push(ArithmeticOp {
                operator,
                operands_text: self.text(node).trim().to_string(),
                statement_index: index,
                line: node.start_position().row + 1,
                within_unchecked_block: unchecked,
            });
        }
    }

    fn record_write(&mut self, lhs: &str, index: usize, line: usize) {
        let lhs = lhs.trim();
        // `(a, b) = ...` writes every component.
        if lhs.starts_with('(') && lhs.contains(',') {
            for part in lhs.trim_matches(|c: char| c == '(' || c == ')').split(',') {
                self.record_write(part, index, line);
            }
            return;
        }

        let Some(root) = patterns::root_identifier(lhs) else {
            return;
        };
        if BUILTIN_ROOTS.contains(&root) {
            return;
        }

        let variable = if let Some(alias) = self.storage_aliases.get(root) {
            alias.clone()
        } else if self.locals.contains(root) {
            return;
        } else if self.scope.state_names.contains(root) || self.scope.has_bases {
            root.to_string()
        } else {
            return;
        };

        self.writes.push(StateWrite {
            variable_name: variable,
            statement_index: index,
            line,
        });
    }

    fn scan_guards(&mut self, index: usize, kind: StatementKind, text: &str, line: usize) {
        let guard_context = kind.is_conditional() || patterns::is_guard_text(text);

        if text.contains("tx.origin") && patterns::is_comparison(text) {
            self.guards.push(AuthGuard {
                kind: AuthGuardKind::TxOriginCheck,
                statement_index: Some(index),
                line,
            });
        }

        let sender_compared = text.contains("msg.sender") && patterns::is_comparison(text);
        let sender_keyed = text.contains("[msg.sender]") && !text.contains('<') && !text.contains('>');
        let role_check = ROLE_CHECKS.iter().any(|r| text.contains(r));

        if (guard_context && (sender_compared || sender_keyed)) || role_check {
            self.guards.push(AuthGuard {
                kind: AuthGuardKind::MsgSenderCheck,
                statement_index: Some(index),
                line,
            });
        }
    }
}

fn node_text<'s>(source: &'s str, node: Node) -> &'s str {
    &source[node.byte_range()]
}

fn parse_error(path: &str, line: usize, column: usize, message: impl Into<String>) -> ParseError {
    ParseError {
        path: path.to_string(),
        line,
        column,
        message: message.into(),
    }
}

fn first_syntax_error(path: &str, source: &str, root: Node) -> ParseError {
    fn find<'t>(node: Node<'t>) -> Option<Node<'t>> {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
        children.into_iter().find_map(find)
    }

    match find(root) {
        Some(node) => {
            let pos = node.start_position();
            let message = if node.is_missing() {
                format!("missing '{}'", node.kind())
            } else {
                let snippet: String = source[node.byte_range()].chars().take(40).collect();
                format!("no contract declaration could be recovered near '{}'", snippet.trim())
            };
            parse_error(path, pos.row + 1, pos.column + 1, message)
        }
        None => parse_error(path, 1, 1, "no contract declaration could be recovered"),
    }
}

fn collect_declarations<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    if matches!(
        node.kind(),
        "contract_declaration" | "library_declaration" | "interface_declaration"
    ) {
        out.push(node);
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_declarations(child, out);
    }
}

/// Adds a `Modifier` guard for every applied modifier that authorizes the caller.
///
/// A modifier counts when it follows the `only*` naming convention or when its
/// definition anywhere in the unit checks `msg.sender` or `tx.origin`.
fn attach_modifier_guards(contracts: &mut [ContractDef]) {
    let authorizing: HashSet<String> = contracts
        .iter()
        .flat_map(|c| c.modifier_defs.iter())
        .filter(|m| {
            m.auth_guards.iter().any(|g| {
                matches!(g.kind, AuthGuardKind::MsgSenderCheck | AuthGuardKind::TxOriginCheck)
            })
        })
        .map(|m| m.name.clone())
        .collect();

    for contract in contracts.iter_mut() {
        for function in contract.functions.iter_mut() {
            let modifier_guards: Vec<AuthGuard> = function
                .applied_modifiers
                .iter()
                .filter(|m| m.starts_with("only") || authorizing.contains(*m))
                .map(|m| AuthGuard {
                    kind: AuthGuardKind::Modifier(m.clone()),
                    statement_index: None,
                    line: function.line,
                })
                .collect();
            if !modifier_guards.is_empty() {
                function.auth_guards.splice(0..0, modifier_guards);
            }
        }
    }
}

fn state_variable(source: &str, node: Node) -> Option<StateVariable> {
    let name = node.child_by_field_name("name")?;
    let type_name = node
        .child_by_field_name("type")
        .map(|n| source[n.byte_range()].trim().to_string())
        .unwrap_or_default();

    let mut visibility = Visibility::Internal;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if matches!(
            child.kind(),
            "visibility" | "public" | "private" | "internal" | "external"
        ) {
            if let Some(v) = Visibility::parse(&source[child.byte_range()]) {
                visibility = v;
            }
        }
    }

    Some(StateVariable {
        name: source[name.byte_range()].to_string(),
        type_name,
        visibility,
        line: node.start_position().row + 1,
    })
}

fn parameter(source: &str, node: Node) -> Parameter {
    let type_name = node
        .child_by_field_name("type")
        .map(|n| source[n.byte_range()].trim().to_string())
        .unwrap_or_default();
    let name = node
        .child_by_field_name("name")
        .map(|n| source[n.byte_range()].to_string())
        .unwrap_or_default();
    Parameter { name, type_name }
}

fn modifier_name(source: &str, invocation: Node) -> Option<String> {
    let mut cursor = invocation.walk();
    let found = invocation
        .children(&mut cursor)
        .find(|c| c.kind() == "identifier" && c.is_named())
        .map(|c| source[c.byte_range()].to_string());
    found.or_else(|| {
        let text = &source[invocation.byte_range()];
        let name = text.split('(').next().unwrap_or(text).trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Names declared inside the function (including named returns) and storage aliases.
fn collect_locals(
    source: &str,
    node: Node,
    locals: &mut HashSet<String>,
    aliases: &mut HashMap<String, String>,
) {
    match node.kind() {
        "variable_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                locals.insert(source[name.byte_range()].to_string());
            }
        }
        "return_type_definition" => {
            let mut cursor = node.walk();
            let params: Vec<Node> = node.named_children(&mut cursor).collect();
            for p in params {
                collect_return_names(source, p, locals);
            }
            return;
        }
        "variable_declaration_statement" => {
            let text = &source[node.byte_range()];
            if let Some(eq) = patterns::assignment_position(text) {
                let (decl, value) = text.split_at(eq);
                if decl.contains(" storage ") {
                    if let (Some(name), Some(root)) = (
                        decl.split_whitespace().last(),
                        patterns::root_identifier(&value[1..]),
                    ) {
                        aliases.insert(name.to_string(), root.to_string());
                    }
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    for child in children {
        collect_locals(source, child, locals, aliases);
    }
}

fn collect_return_names(source: &str, node: Node, locals: &mut HashSet<String>) {
    if node.kind() == "parameter" {
        if let Some(name) = node.child_by_field_name("name") {
            locals.insert(source[name.byte_range()].to_string());
        }
        return;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    for child in children {
        collect_return_names(source, child, locals);
    }
}

fn unwrap_statement(node: Node) -> Node {
    if node.kind() == "statement" {
        let mut cursor = node.walk();
        let inner = node
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment");
        if let Some(inner) = inner {
            return inner;
        }
    }
    node
}

fn has_unchecked_keyword(block: Node) -> bool {
    let mut cursor = block.walk();
    let found = block.children(&mut cursor).any(|c| c.kind() == "unchecked");
    found
}

fn statement_kind(node: Node) -> StatementKind {
    match node.kind() {
        "expression_statement" => StatementKind::Expression,
        "variable_declaration_statement" => StatementKind::VariableDeclaration,
        "if_statement" => StatementKind::If,
        "for_statement" => StatementKind::For,
        "while_statement" => StatementKind::While,
        "do_while_statement" => StatementKind::DoWhile,
        "return_statement" => StatementKind::Return,
        "emit_statement" => StatementKind::Emit,
        "revert_statement" => StatementKind::Revert,
        "block_statement" if has_unchecked_keyword(node) => StatementKind::Unchecked,
        "block_statement" => StatementKind::Block,
        "assembly_statement" => StatementKind::Assembly,
        _ => StatementKind::Other,
    }
}

fn count_call_arguments(call: Node) -> usize {
    let mut cursor = call.walk();
    let count = call
        .children(&mut cursor)
        .filter(|c| c.kind() == "call_argument")
        .count();
    count
}

fn method_name(source: &str, function: Node) -> Option<String> {
    match function.kind() {
        "member_expression" => function
            .child_by_field_name("property")
            .map(|p| source[p.byte_range()].to_string()),
        "expression" => function.child(0).and_then(|inner| method_name(source, inner)),
        "struct_expression" => function
            .child_by_field_name("type")
            .and_then(|t| method_name(source, t)),
        _ => None,
    }
}
