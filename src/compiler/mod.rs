//! ORQL to SQL compiler.
//!
//! [`OrqlToSql`] lowers a parsed [`OrqlNode`] into a [`SqlStatement`] and
//! renders it. Rendered SQL is cached per tree instance and compile options.

mod filter;
mod mutation;
mod query;

use std::fmt;
use std::sync::Arc;

use by_address::ByAddress;
use dashmap::DashMap;

use crate::ast::{OrqlNode, OrqlRefItem};
use crate::error::{OrqlError, OrqlResult};
use crate::schema::SchemaRegistry;
use crate::sql::{Sort, SqlGenerator, SqlStatement};

/// Shape of the result requested from a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOp {
    /// A single entity.
    QueryOne,
    /// A list of entities.
    QueryAll,
    /// The number of matching root entities.
    Count,
}

/// An `order by` entry.
///
/// Each column is a dotted path from the root schema: `name` orders by a
/// root column, `role.name` by a column of the `role` association.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryOrder {
    pub columns: Vec<String>,
    pub sort: Sort,
}

impl QueryOrder {
    pub fn new<I, S>(sort: Sort, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            sort,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(Sort::Asc, [column])
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(Sort::Desc, [column])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CompileKey {
    Insert,
    Update,
    Delete,
    Query {
        op: QueryOp,
        page: bool,
        orders: Vec<QueryOrder>,
    },
}

type CacheKey = (ByAddress<Arc<OrqlNode>>, CompileKey);

/// Compiles parsed ORQL into SQL text.
pub struct OrqlToSql {
    registry: Arc<SchemaRegistry>,
    generator: SqlGenerator,
    cache: DashMap<CacheKey, String>,
}

impl fmt::Debug for OrqlToSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrqlToSql")
            .field("schemas", &self.registry.len())
            .field("generator", &self.generator)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl OrqlToSql {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_generator(registry, SqlGenerator::default())
    }

    pub fn with_generator(registry: Arc<SchemaRegistry>, generator: SqlGenerator) -> Self {
        Self {
            registry,
            generator,
            cache: DashMap::new(),
        }
    }

    pub fn generator(&self) -> &SqlGenerator {
        &self.generator
    }

    /// `insert into <table> (<fields>) values (<params>)`.
    pub fn compile_insert(&self, node: &Arc<OrqlNode>) -> OrqlResult<String> {
        self.compile_cached(node, CompileKey::Insert, |root| {
            mutation::build_insert(&self.registry, root).map(SqlStatement::Insert)
        })
    }

    /// `update <table> set <field> = <param>, ... [where ...]`.
    pub fn compile_update(&self, node: &Arc<OrqlNode>) -> OrqlResult<String> {
        self.compile_cached(node, CompileKey::Update, |root| {
            mutation::build_update(&self.registry, root).map(SqlStatement::Update)
        })
    }

    /// `delete from <table> [where ...]`.
    pub fn compile_delete(&self, node: &Arc<OrqlNode>) -> OrqlResult<String> {
        self.compile_cached(node, CompileKey::Delete, |root| {
            Ok(SqlStatement::Delete(mutation::build_delete(
                &self.registry,
                root,
            )))
        })
    }

    /// Compile a select. `page` adds `$offset`/`$limit` paging, `orders` may be empty.
    pub fn compile_query(
        &self,
        op: QueryOp,
        node: &Arc<OrqlNode>,
        page: bool,
        orders: &[QueryOrder],
    ) -> OrqlResult<String> {
        let key = CompileKey::Query {
            op,
            page,
            orders: orders.to_vec(),
        };
        self.compile_cached(node, key, |root| {
            query::build_query(&self.registry, op, root, page, orders).map(SqlStatement::Query)
        })
    }

    /// Lower a tree without rendering or caching.
    pub fn lower_query(
        &self,
        op: QueryOp,
        node: &OrqlNode,
        page: bool,
        orders: &[QueryOrder],
    ) -> OrqlResult<SqlStatement> {
        query::build_query(&self.registry, op, node.root(), page, orders).map(SqlStatement::Query)
    }

    /// Number of cached statements.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn compile_cached<F>(&self, node: &Arc<OrqlNode>, key: CompileKey, build: F) -> OrqlResult<String>
    where
        F: FnOnce(&OrqlRefItem) -> OrqlResult<SqlStatement>,
    {
        let key = (ByAddress(Arc::clone(node)), key);
        if let Some(sql) = self.cache.get(&key) {
            return Ok(sql.value().clone());
        }
        let entry = self.cache.entry(key).or_try_insert_with(|| {
            let statement = build(node.root())?;
            let sql = self.generator.generate(&statement);
            tracing::debug!(root = %node.root().name, "SQL cache miss");
            tracing::trace!(%sql, "Generated SQL");
            Ok::<_, OrqlError>(sql)
        })?;
        Ok(entry.value().clone())
    }
}

/// Column alias inside a query: the field for root columns,
/// `<path>_<field>` for columns reached through associations.
pub(crate) fn column_alias(prefix: Option<&str>, field: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}_{}", prefix, field),
        None => field.to_string(),
    }
}
