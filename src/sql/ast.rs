//! SQL statement tree produced by the compiler.

use crate::ast::{ExpOp, Literal};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlStatement {
    Query(SqlQuery),
    Insert(SqlInsert),
    Update(SqlUpdate),
    Delete(SqlDelete),
}

/// A column reference, optionally qualified and aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlColumn {
    pub name: String,
    pub qualifier: Option<String>,
    pub alias: Option<String>,
}

impl SqlColumn {
    /// Unqualified column, as used by insert, update and delete.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifier: None,
            alias: None,
        }
    }

    pub fn qualified(name: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifier: Some(qualifier.into()),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlSelect {
    Column(SqlColumn),
    Count(SqlColumn),
    /// `*`
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlFrom {
    Table {
        name: String,
        alias: Option<String>,
    },
    Subquery {
        query: Box<SqlQuery>,
        alias: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlJoin {
    pub kind: JoinKind,
    pub table: String,
    pub alias: String,
    pub on: SqlExp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExp {
    Compare {
        left: SqlColumn,
        op: ExpOp,
        right: SqlOperand,
    },
    And(Box<SqlExp>, Box<SqlExp>),
    Or(Box<SqlExp>, Box<SqlExp>),
    Nest(Box<SqlExp>),
}

impl SqlExp {
    /// `left = right` between two columns.
    pub fn column_eq(left: SqlColumn, right: SqlColumn) -> Self {
        SqlExp::Compare {
            left,
            op: ExpOp::Eq,
            right: SqlOperand::Column(right),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlOperand {
    Column(SqlColumn),
    Param(String),
    Value(Literal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Sort {
    #[default]
    Asc,
    Desc,
}

impl Sort {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Sort::Asc => "asc",
            Sort::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlOrder {
    pub columns: Vec<SqlColumn>,
    pub sort: Sort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub select: Vec<SqlSelect>,
    pub from: SqlFrom,
    pub joins: Vec<SqlJoin>,
    /// Conjuncts of the where clause.
    pub filters: Vec<SqlExp>,
    pub orders: Vec<SqlOrder>,
    /// Append `limit $offset, $limit`.
    pub page: bool,
    /// Append `limit 1`.
    pub limit_one: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlInsert {
    pub table: String,
    pub columns: Vec<String>,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlAssignment {
    pub column: String,
    pub param: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlUpdate {
    pub table: String,
    pub set: Vec<SqlAssignment>,
    pub filter: Option<SqlExp>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlDelete {
    pub table: String,
    pub filter: Option<SqlExp>,
}
