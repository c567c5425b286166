//! Parsed ORQL tree.
//!
//! Every name in the tree is already resolved against the schema registry:
//! columns carry their [`ColumnInfo`], nested items carry the association
//! they were reached through.

use std::fmt;

use crate::schema::{AssociationInfo, ColumnInfo, SchemaId};

/// A parsed ORQL statement.
#[derive(Debug, Clone, PartialEq)]
pub struct OrqlNode {
    root: OrqlRefItem,
}

impl OrqlNode {
    pub fn new(root: OrqlRefItem) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &OrqlRefItem {
        &self.root
    }
}

/// A schema reference with its optional filter and item list.
///
/// The root item has no association; every nested item does.
#[derive(Debug, Clone, PartialEq)]
pub struct OrqlRefItem {
    pub name: String,
    pub schema: SchemaId,
    pub association: Option<AssociationInfo>,
    pub filter: Option<OrqlExp>,
    pub children: Vec<OrqlItem>,
}

impl OrqlRefItem {
    /// Whether this item fans out into many rows per owner.
    pub fn is_array(&self) -> bool {
        self.association.as_ref().is_some_and(AssociationInfo::is_array)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrqlItem {
    Column(ColumnInfo),
    /// `!name`, removes a column from a preceding `*`.
    Ignore(ColumnInfo),
    /// `*`
    All,
    Ref(OrqlRefItem),
}

/// Filter expression. `&&` binds tighter than `||`.
#[derive(Debug, Clone, PartialEq)]
pub enum OrqlExp {
    Compare {
        left: ColumnInfo,
        op: ExpOp,
        right: OrqlOperand,
    },
    And(Box<OrqlExp>, Box<OrqlExp>),
    Or(Box<OrqlExp>, Box<OrqlExp>),
    /// A parenthesized expression.
    Nest(Box<OrqlExp>),
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum OrqlOperand {
    /// Another column of the same schema.
    Column(ColumnInfo),
    /// `$name`
    Param(String),
    Value(Literal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Ne,
    Like,
}

impl ExpOp {
    /// SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ExpOp::Eq => "=",
            ExpOp::Gt => ">",
            ExpOp::Ge => ">=",
            ExpOp::Lt => "<",
            ExpOp::Le => "<=",
            ExpOp::Ne => "<>",
            ExpOp::Like => "like",
        }
    }
}

impl fmt::Display for ExpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{:?}", n),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Null => f.write_str("null"),
        }
    }
}
