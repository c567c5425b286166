//! # ORQL
//!
//! Declarative entity queries compiled to parameterized SQL.
//!
//! An ORQL string names a root schema, an optional filter and the columns and
//! associations to read or write. The compiler resolves it against a
//! [`SchemaRegistry`](schema::SchemaRegistry) and emits SQL with `$name`
//! placeholders.
//!
//! ## Quick Example
//!
//! ```
//! use orql::prelude::*;
//!
//! let mut builder = SchemaRegistry::builder();
//! let user = builder
//!     .add_schema(
//!         SchemaInfo::builder("user")
//!             .column(ColumnInfo::builder("id", DataType::Int).generated_key())
//!             .column(ColumnInfo::builder("name", DataType::String)),
//!     )
//!     .unwrap();
//! let role = builder
//!     .add_schema(
//!         SchemaInfo::builder("role")
//!             .column(ColumnInfo::builder("id", DataType::Int).generated_key())
//!             .column(ColumnInfo::builder("name", DataType::String)),
//!     )
//!     .unwrap();
//! builder
//!     .belongs_to(user, "role", role)
//!     .ref_key("role_id")
//!     .required(false)
//!     .build()
//!     .unwrap();
//!
//! let orql = Orql::new(builder.build());
//! let sql = orql
//!     .to_query(QueryOp::QueryOne, "user(id = $id): {name, role: {id, name}}", false, &[])
//!     .unwrap();
//! assert_eq!(
//!     sql,
//!     "select user.name as name, role.id as role_id, role.name as role_name \
//!      from user as user left join role as role on role.id = user.role_id \
//!      where user.id = $id limit 1"
//! );
//! ```
//!
//! ## Syntax
//!
//! | Form              | Meaning                                   |
//! |-------------------|-------------------------------------------|
//! | `user`            | Root schema                               |
//! | `user(id = $id)`  | Filter, parentheses optional              |
//! | `: {a, b}`        | Item list                                 |
//! | `*` / `!a`        | All columns / all but `a`                 |
//! | `role: {name}`    | Nested association                        |
//!
//! Filters combine comparisons with `&&` and `||`; `&&` binds tighter.

pub mod ast;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod mapper;
pub mod parser;
pub mod schema;
pub mod sql;

use std::sync::Arc;

use compiler::{OrqlToSql, QueryOp, QueryOrder};
use error::OrqlResult;
use mapper::ResultRoot;
use parser::OrqlParser;
use schema::SchemaRegistry;
use sql::SqlGenerator;

pub mod prelude {
    pub use crate::Orql;
    pub use crate::ast::*;
    pub use crate::compiler::{OrqlToSql, QueryOp, QueryOrder};
    pub use crate::error::*;
    pub use crate::mapper::{ResultColumn, ResultItem, ResultRef, ResultRoot};
    pub use crate::parser::OrqlParser;
    pub use crate::schema::{
        AssociationKind, AssociationType, Cascade, ColumnInfo, DataType, SchemaInfo,
        SchemaRegistry,
    };
    pub use crate::sql::{Sort, SqlGenerator, ToSql};
}

/// Parser, compiler and registry bundled together.
///
/// Parsed trees and rendered SQL are cached, so repeated calls with the same
/// ORQL string are cheap. An `Orql` is `Send + Sync` and meant to be shared.
#[derive(Debug)]
pub struct Orql {
    parser: OrqlParser,
    compiler: OrqlToSql,
}

impl Orql {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self::with_generator(registry, SqlGenerator::default())
    }

    pub fn with_generator(registry: SchemaRegistry, generator: SqlGenerator) -> Self {
        let registry = Arc::new(registry);
        Self {
            parser: OrqlParser::new(Arc::clone(&registry)),
            compiler: OrqlToSql::with_generator(registry, generator),
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        self.parser.registry()
    }

    pub fn parse(&self, orql: &str) -> OrqlResult<Arc<ast::OrqlNode>> {
        self.parser.parse(orql)
    }

    pub fn to_add(&self, orql: &str) -> OrqlResult<String> {
        self.compiler.compile_insert(&self.parse(orql)?)
    }

    pub fn to_update(&self, orql: &str) -> OrqlResult<String> {
        self.compiler.compile_update(&self.parse(orql)?)
    }

    pub fn to_delete(&self, orql: &str) -> OrqlResult<String> {
        self.compiler.compile_delete(&self.parse(orql)?)
    }

    pub fn to_query(
        &self,
        op: QueryOp,
        orql: &str,
        page: bool,
        orders: &[QueryOrder],
    ) -> OrqlResult<String> {
        self.compiler.compile_query(op, &self.parse(orql)?, page, orders)
    }

    pub fn to_count(&self, orql: &str) -> OrqlResult<String> {
        self.to_query(QueryOp::Count, orql, false, &[])
    }

    /// Column layout of the rows `to_query` produces for `orql`.
    pub fn result_root(&self, orql: &str) -> OrqlResult<ResultRoot> {
        let node = self.parse(orql)?;
        ResultRoot::build(self.registry(), &node)
    }
}
