//! ORQL parser.
//!
//! Recursive descent over the token stream produced by [`crate::lexer`],
//! resolving every identifier against the schema registry as it goes.
//!
//! # Grammar
//!
//! ```text
//! orql    := root EOF
//! root    := NAME where? (':' '{' items '}')?
//! items   := item (',' item)*
//! item    := '!'? NAME | '*' | NAME where? (':' '{' items '}')?
//! where   := '(' exp ')' | exp
//! exp     := term ('||' exp)?
//! term    := factor ('&&' term)?
//! factor  := '(' exp ')' | NAME op (NAME | PARAM | literal)
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use strsim::levenshtein;

use crate::ast::{ExpOp, Literal, OrqlExp, OrqlItem, OrqlNode, OrqlOperand, OrqlRefItem};
use crate::error::{OrqlError, OrqlResult};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::schema::{ColumnInfo, SchemaInfo, SchemaRegistry};

/// Parse an ORQL string against a registry without caching.
pub fn parse(orql: &str, registry: &SchemaRegistry) -> OrqlResult<OrqlNode> {
    let tokens = tokenize(orql)?;
    Parser::new(tokens, registry).parse_orql()
}

/// Caching parser.
///
/// Parsed trees are shared through `Arc`, so the same string always yields
/// the same tree instance. Failed parses are not cached.
#[derive(Debug)]
pub struct OrqlParser {
    registry: Arc<SchemaRegistry>,
    cache: DashMap<String, Arc<OrqlNode>>,
}

impl OrqlParser {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            cache: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn parse(&self, orql: &str) -> OrqlResult<Arc<OrqlNode>> {
        if let Some(node) = self.cache.get(orql) {
            return Ok(Arc::clone(node.value()));
        }
        let entry = self
            .cache
            .entry(orql.to_string())
            .or_try_insert_with(|| {
                tracing::debug!(orql, "Parsing ORQL");
                parse(orql, &self.registry).map(Arc::new)
            })?;
        Ok(Arc::clone(entry.value()))
    }

    /// Number of cached trees.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    index: usize,
    registry: &'a SchemaRegistry,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, registry: &'a SchemaRegistry) -> Self {
        Self {
            tokens,
            index: 0,
            registry,
        }
    }

    fn current(&self) -> &Token {
        // tokenize() always ends the stream with Eof
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn is(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.index += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> OrqlResult<Token> {
        if self.is(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.to_string()))
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> OrqlError {
        let token = self.current();
        OrqlError::syntax(token.position, expected, token.describe())
    }

    fn parse_orql(&mut self) -> OrqlResult<OrqlNode> {
        let root = self.parse_root()?;
        self.expect(TokenKind::Eof)?;
        Ok(OrqlNode::new(root))
    }

    fn parse_root(&mut self) -> OrqlResult<OrqlRefItem> {
        let name = self.expect(TokenKind::Name)?.value;
        let registry = self.registry;
        let schema = registry
            .schema(&name)
            .ok_or_else(|| OrqlError::UnknownSchema(name.clone()))?;
        let filter = self.parse_where(schema)?;
        let children = self.parse_item_block(schema)?;
        Ok(OrqlRefItem {
            name,
            schema: schema.id(),
            association: None,
            filter,
            children,
        })
    }

    /// `: { items }`, or nothing.
    fn parse_item_block(&mut self, schema: &SchemaInfo) -> OrqlResult<Vec<OrqlItem>> {
        if !self.is(TokenKind::Colon) {
            return Ok(Vec::new());
        }
        self.advance();
        self.expect(TokenKind::OpenCurly)?;
        let mut items = Vec::new();
        loop {
            items.push(self.parse_item(schema)?);
            if self.is(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::CloseCurly)?;
        Ok(items)
    }

    fn parse_item(&mut self, schema: &SchemaInfo) -> OrqlResult<OrqlItem> {
        if self.is(TokenKind::All) {
            self.advance();
            return Ok(OrqlItem::All);
        }

        let ignore = self.is(TokenKind::Not);
        if ignore {
            self.advance();
        }
        if !self.is(TokenKind::Name) {
            return Err(self.unexpected(if ignore { "column name" } else { "item" }));
        }
        let token = self.advance();

        if let Some(column) = schema.column(&token.value) {
            return Ok(if ignore {
                OrqlItem::Ignore(column.clone())
            } else {
                OrqlItem::Column(column.clone())
            });
        }

        let Some(association) = schema.association(&token.value) else {
            return Err(unknown_identifier(schema, &token.value));
        };
        if ignore {
            return Err(OrqlError::syntax(
                token.position,
                "column name",
                format!("association '{}'", token.value),
            ));
        }

        let registry = self.registry;
        let target = registry.get(association.target);
        let filter = self.parse_where(target)?;
        let children = self.parse_item_block(target)?;
        Ok(OrqlItem::Ref(OrqlRefItem {
            name: token.value,
            schema: target.id(),
            association: Some(association.clone()),
            filter,
            children,
        }))
    }

    fn parse_where(&mut self, schema: &SchemaInfo) -> OrqlResult<Option<OrqlExp>> {
        if !(self.is(TokenKind::OpenParen) || self.is(TokenKind::Name)) {
            return Ok(None);
        }
        let exp = match self.parse_exp(schema)? {
            OrqlExp::Nest(inner) => *inner,
            exp => exp,
        };
        Ok(Some(exp))
    }

    fn parse_exp(&mut self, schema: &SchemaInfo) -> OrqlResult<OrqlExp> {
        let term = self.parse_term(schema)?;
        if self.is(TokenKind::Or) {
            self.advance();
            let rest = self.parse_exp(schema)?;
            return Ok(OrqlExp::Or(Box::new(term), Box::new(rest)));
        }
        Ok(term)
    }

    fn parse_term(&mut self, schema: &SchemaInfo) -> OrqlResult<OrqlExp> {
        let factor = self.parse_factor(schema)?;
        if self.is(TokenKind::And) {
            self.advance();
            let rest = self.parse_term(schema)?;
            return Ok(OrqlExp::And(Box::new(factor), Box::new(rest)));
        }
        Ok(factor)
    }

    fn parse_factor(&mut self, schema: &SchemaInfo) -> OrqlResult<OrqlExp> {
        if self.is(TokenKind::OpenParen) {
            self.advance();
            let exp = self.parse_exp(schema)?;
            self.expect(TokenKind::CloseParen)?;
            return Ok(OrqlExp::Nest(Box::new(exp)));
        }

        let left = self.parse_column(schema)?;
        let op = self.parse_op()?;
        let right = match self.current().kind {
            TokenKind::Name => OrqlOperand::Column(self.parse_column(schema)?),
            TokenKind::Param => OrqlOperand::Param(self.advance().value),
            TokenKind::Int => {
                let token = self.advance();
                let n = token.value.parse::<i64>().map_err(|_| {
                    OrqlError::syntax(token.position, "integer in range", token.describe())
                })?;
                OrqlOperand::Value(Literal::Int(n))
            }
            TokenKind::Float => {
                let token = self.advance();
                let n = token.value.parse::<f64>().map_err(|_| {
                    OrqlError::syntax(token.position, "float", token.describe())
                })?;
                OrqlOperand::Value(Literal::Float(n))
            }
            TokenKind::Bool => OrqlOperand::Value(Literal::Bool(self.advance().value == "true")),
            TokenKind::String => OrqlOperand::Value(Literal::String(self.advance().value)),
            TokenKind::Null => {
                self.advance();
                OrqlOperand::Value(Literal::Null)
            }
            _ => return Err(self.unexpected("column, parameter or value")),
        };
        Ok(OrqlExp::Compare { left, op, right })
    }

    fn parse_column(&mut self, schema: &SchemaInfo) -> OrqlResult<ColumnInfo> {
        let token = self.expect(TokenKind::Name)?;
        schema
            .column(&token.value)
            .cloned()
            .ok_or_else(|| unknown_identifier(schema, &token.value))
    }

    fn parse_op(&mut self) -> OrqlResult<ExpOp> {
        let op = match self.current().kind {
            TokenKind::Eq => ExpOp::Eq,
            TokenKind::Gt => ExpOp::Gt,
            TokenKind::Ge => ExpOp::Ge,
            TokenKind::Lt => ExpOp::Lt,
            TokenKind::Le => ExpOp::Le,
            TokenKind::Ne => ExpOp::Ne,
            TokenKind::Like => ExpOp::Like,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.advance();
        Ok(op)
    }
}

fn unknown_identifier(schema: &SchemaInfo, name: &str) -> OrqlError {
    OrqlError::UnknownIdentifier {
        schema: schema.name().to_string(),
        name: name.to_string(),
        suggestion: did_you_mean(name, schema.identifiers()),
    }
}

/// Closest candidate within a length-dependent edit distance.
fn did_you_mean<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    let threshold = match input.len() {
        0..=2 => 0,
        3..=5 => 2,
        _ => 3,
    };
    let mut best: Option<(usize, &str)> = None;
    for candidate in candidates {
        let dist = levenshtein(input, candidate);
        if dist <= threshold && best.is_none_or(|(min, _)| dist < min) {
            best = Some((dist, candidate));
        }
    }
    best.map(|(_, candidate)| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnInfo, DataType, SchemaInfo};

    fn registry() -> SchemaRegistry {
        let mut builder = SchemaRegistry::builder();
        let user = builder
            .add_schema(
                SchemaInfo::builder("user")
                    .column(ColumnInfo::builder("id", DataType::Int).generated_key())
                    .column(ColumnInfo::builder("name", DataType::String))
                    .column(ColumnInfo::builder("password", DataType::String)),
            )
            .unwrap();
        let role = builder
            .add_schema(
                SchemaInfo::builder("role")
                    .column(ColumnInfo::builder("id", DataType::Int).generated_key())
                    .column(ColumnInfo::builder("name", DataType::String)),
            )
            .unwrap();
        builder.belongs_to(user, "role", role).build().unwrap();
        builder.build()
    }

    fn column_names(items: &[OrqlItem]) -> Vec<String> {
        items
            .iter()
            .map(|item| match item {
                OrqlItem::Column(c) => c.name.clone(),
                OrqlItem::Ignore(c) => format!("!{}", c.name),
                OrqlItem::All => "*".to_string(),
                OrqlItem::Ref(r) => format!("{}:", r.name),
            })
            .collect()
    }

    #[test]
    fn test_bare_root() {
        let registry = registry();
        let node = parse("user", &registry).unwrap();
        assert_eq!(node.root().name, "user");
        assert!(node.root().filter.is_none());
        assert!(node.root().children.is_empty());
        assert!(node.root().association.is_none());
    }

    #[test]
    fn test_items() {
        let registry = registry();
        let node = parse("user: {*, !password, role: {name}}", &registry).unwrap();
        let root = node.root();
        assert_eq!(column_names(&root.children), vec!["*", "!password", "role:"]);
        match &root.children[2] {
            OrqlItem::Ref(role) => {
                assert_eq!(role.schema, registry.schema("role").unwrap().id());
                assert_eq!(role.association.as_ref().unwrap().name, "role");
                assert_eq!(column_names(&role.children), vec!["name"]);
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn test_where_without_parens() {
        let registry = registry();
        let node = parse("user id = $id: {name}", &registry).unwrap();
        match node.root().filter.as_ref().unwrap() {
            OrqlExp::Compare { left, op, right } => {
                assert_eq!(left.name, "id");
                assert_eq!(*op, ExpOp::Eq);
                assert_eq!(*right, OrqlOperand::Param("id".to_string()));
            }
            other => panic!("unexpected exp: {other:?}"),
        }
    }

    #[test]
    fn test_outer_parens_are_unwrapped() {
        let registry = registry();
        let node = parse("user(id = 1)", &registry).unwrap();
        assert!(matches!(node.root().filter, Some(OrqlExp::Compare { .. })));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let registry = registry();
        let node = parse("user(id = 1 || name = 'a' && password = $p)", &registry).unwrap();
        match node.root().filter.as_ref().unwrap() {
            OrqlExp::Or(left, right) => {
                assert!(matches!(**left, OrqlExp::Compare { .. }));
                assert!(matches!(**right, OrqlExp::And(_, _)));
            }
            other => panic!("unexpected exp: {other:?}"),
        }
    }

    #[test]
    fn test_nested_group() {
        let registry = registry();
        let node = parse("user((id = 1 || id = 2) && name like 'a%')", &registry).unwrap();
        match node.root().filter.as_ref().unwrap() {
            OrqlExp::And(left, right) => {
                assert!(matches!(**left, OrqlExp::Nest(_)));
                assert!(matches!(
                    **right,
                    OrqlExp::Compare {
                        op: ExpOp::Like,
                        right: OrqlOperand::Value(Literal::String(_)),
                        ..
                    }
                ));
            }
            other => panic!("unexpected exp: {other:?}"),
        }
    }

    #[test]
    fn test_column_to_column_and_literals() {
        let registry = registry();
        let node = parse("user(name != password && id >= -2 && name = null)", &registry).unwrap();
        let OrqlExp::And(first, rest) = node.root().filter.clone().unwrap() else {
            panic!("expected and");
        };
        assert!(matches!(
            *first,
            OrqlExp::Compare { op: ExpOp::Ne, right: OrqlOperand::Column(_), .. }
        ));
        let OrqlExp::And(second, third) = *rest else {
            panic!("expected and");
        };
        assert!(matches!(
            *second,
            OrqlExp::Compare { op: ExpOp::Ge, right: OrqlOperand::Value(Literal::Int(-2)), .. }
        ));
        assert!(matches!(
            *third,
            OrqlExp::Compare { right: OrqlOperand::Value(Literal::Null), .. }
        ));
    }

    #[test]
    fn test_unknown_schema() {
        let registry = registry();
        let err = parse("account: {id}", &registry).unwrap_err();
        assert!(matches!(err, OrqlError::UnknownSchema(name) if name == "account"));
    }

    #[test]
    fn test_unknown_identifier_suggests() {
        let registry = registry();
        let err = parse("user: {nmae}", &registry).unwrap_err();
        match err {
            OrqlError::UnknownIdentifier { schema, name, suggestion } => {
                assert_eq!(schema, "user");
                assert_eq!(name, "nmae");
                assert_eq!(suggestion.as_deref(), Some("name"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_column_in_where() {
        let registry = registry();
        let err = parse("user(age > 1): {id}", &registry).unwrap_err();
        assert!(matches!(err, OrqlError::UnknownIdentifier { name, .. } if name == "age"));
    }

    #[test]
    fn test_ignore_association_is_rejected() {
        let registry = registry();
        let err = parse("user: {*, !role}", &registry).unwrap_err();
        assert!(matches!(err, OrqlError::Syntax { position: 11, .. }));
    }

    #[test]
    fn test_syntax_errors() {
        let registry = registry();
        assert!(matches!(
            parse("user: {id", &registry),
            Err(OrqlError::Syntax { .. })
        ));
        assert!(matches!(
            parse("user: id", &registry),
            Err(OrqlError::Syntax { position: 6, .. })
        ));
        assert!(matches!(
            parse("user(id = )", &registry),
            Err(OrqlError::Syntax { .. })
        ));
        assert!(matches!(
            parse("user: {id} extra", &registry),
            Err(OrqlError::Syntax { .. })
        ));
    }

    #[test]
    fn test_cache_returns_same_tree() {
        let parser = OrqlParser::new(Arc::new(registry()));
        let first = parser.parse("user: {id, name}").unwrap();
        let second = parser.parse("user: {id, name}").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(parser.parse("user: {bogus}").is_err());
        assert_eq!(parser.cached(), 1);
    }
}
