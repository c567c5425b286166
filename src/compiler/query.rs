//! Select lowering.
//!
//! The item tree is walked depth first in declaration order. Every nested
//! item contributes its joins, its filter and its columns, aliased by the
//! association path that reached it (`posts_tags_name`). The final shape is
//! picked afterwards:
//!
//! - count: `select count(<root>.<id>)`, no paging or ordering
//! - to-many fan-out with paging: the root is paged inside a subquery so
//!   `limit` counts root rows, not joined rows
//! - single row without fan-out: `limit 1`
//! - anything else: paging, if requested, applies to the whole select

use super::filter::compile_exp;
use super::{QueryOp, QueryOrder, column_alias};
use crate::ast::{OrqlItem, OrqlRefItem};
use crate::error::{OrqlError, OrqlResult};
use crate::schema::{AssociationInfo, AssociationKind, SchemaInfo, SchemaRegistry};
use crate::sql::{JoinKind, SqlColumn, SqlExp, SqlFrom, SqlJoin, SqlOrder, SqlQuery, SqlSelect};

pub(crate) fn build_query(
    registry: &SchemaRegistry,
    op: QueryOp,
    root: &OrqlRefItem,
    page: bool,
    orders: &[QueryOrder],
) -> OrqlResult<SqlQuery> {
    let root_schema = registry.get(root.schema);
    let table = root_schema.table().to_string();

    let mut walk = Walk::new(registry, op);
    walk.run(root)?;

    if op == QueryOp::Count {
        let id = root_schema.require_id()?;
        return Ok(SqlQuery {
            select: vec![SqlSelect::Count(SqlColumn::qualified(&id.field, &table))],
            from: SqlFrom::Table {
                name: table.clone(),
                alias: Some(table),
            },
            joins: walk.joins,
            filters: walk.root_filter.into_iter().chain(walk.filters).collect(),
            orders: Vec::new(),
            page: false,
            limit_one: false,
        });
    }

    let mut root_orders = Vec::new();
    let mut sql_orders = Vec::with_capacity(orders.len());
    for order in orders {
        let mut columns = Vec::with_capacity(order.columns.len());
        let mut root_level = true;
        for path in &order.columns {
            root_level &= !path.contains('.');
            columns.push(resolve_order_column(registry, root, &table, path)?);
        }
        let order = SqlOrder {
            columns,
            sort: order.sort,
        };
        if root_level {
            root_orders.push(order.clone());
        }
        sql_orders.push(order);
    }

    if walk.has_array_ref && page {
        walk.require_ids()?;
        // Page root rows first, then join the fan-out onto the page.
        let inner = SqlQuery {
            select: vec![SqlSelect::All],
            from: SqlFrom::Table {
                name: table.clone(),
                alias: None,
            },
            joins: Vec::new(),
            filters: walk.root_filter.into_iter().collect(),
            orders: root_orders,
            page: true,
            limit_one: false,
        };
        let query = SqlQuery {
            select: walk.select,
            from: SqlFrom::Subquery {
                query: Box::new(inner),
                alias: table,
            },
            joins: walk.joins,
            filters: walk.filters,
            orders: sql_orders,
            page: false,
            limit_one: false,
        };
        return non_empty(query, root);
    }

    let limit_one = op == QueryOp::QueryOne && !page && !walk.has_array_ref;
    if limit_one {
        // A single row needs no ids to group by.
        for index in walk.injected.iter().rev() {
            walk.select.remove(*index);
        }
    } else {
        walk.require_ids()?;
    }

    let query = SqlQuery {
        select: walk.select,
        from: SqlFrom::Table {
            name: table.clone(),
            alias: Some(table),
        },
        joins: walk.joins,
        filters: walk.root_filter.into_iter().chain(walk.filters).collect(),
        orders: sql_orders,
        page: page && !limit_one,
        limit_one,
    };
    non_empty(query, root)
}

fn non_empty(query: SqlQuery, root: &OrqlRefItem) -> OrqlResult<SqlQuery> {
    if query.select.is_empty() {
        return Err(OrqlError::compile(format!(
            "query on '{}' selects no columns",
            root.name
        )));
    }
    Ok(query)
}

struct Walk<'a> {
    registry: &'a SchemaRegistry,
    op: QueryOp,
    select: Vec<SqlSelect>,
    /// Positions in `select` of ids added only for row grouping.
    injected: Vec<usize>,
    joins: Vec<SqlJoin>,
    root_filter: Option<SqlExp>,
    filters: Vec<SqlExp>,
    has_array_ref: bool,
    /// First schema that needed an id but declares none.
    missing_id: Option<String>,
}

impl<'a> Walk<'a> {
    fn new(registry: &'a SchemaRegistry, op: QueryOp) -> Self {
        Self {
            registry,
            op,
            select: Vec::new(),
            injected: Vec::new(),
            joins: Vec::new(),
            root_filter: None,
            filters: Vec::new(),
            has_array_ref: false,
            missing_id: None,
        }
    }

    fn run(&mut self, root: &OrqlRefItem) -> OrqlResult<()> {
        let registry = self.registry;
        let mut stack: Vec<(&OrqlRefItem, Option<String>)> = vec![(root, None)];

        while let Some((item, prefix)) = stack.pop() {
            let schema = registry.get(item.schema);
            let qualifier = prefix
                .clone()
                .unwrap_or_else(|| schema.table().to_string());

            if let Some(exp) = &item.filter {
                let exp = compile_exp(exp, Some(&qualifier));
                if prefix.is_none() {
                    self.root_filter = Some(exp);
                } else {
                    self.filters.push(exp);
                }
            }

            let mut has_id = false;
            let mut explicit: Vec<&str> = Vec::new();
            let mut ignores: Option<Vec<&str>> = None;
            let mut nested = Vec::new();

            for child in &item.children {
                match child {
                    OrqlItem::All => {
                        ignores.get_or_insert_with(Vec::new);
                    }
                    OrqlItem::Ignore(column) => match ignores.as_mut() {
                        Some(ignores) => ignores.push(column.name.as_str()),
                        None => {
                            return Err(OrqlError::compile(format!(
                                "'!{}' in '{}' must follow '*'",
                                column.name, item.name
                            )));
                        }
                    },
                    OrqlItem::Column(column) => {
                        has_id |= column.primary_key;
                        explicit.push(column.name.as_str());
                        self.push_column(&column.field, &qualifier, prefix.as_deref());
                    }
                    OrqlItem::Ref(child) => {
                        let association = child.association.as_ref().ok_or_else(|| {
                            OrqlError::compile(format!(
                                "'{}' is not reached through an association",
                                child.name
                            ))
                        })?;
                        if association.is_array() && !child.children.is_empty() {
                            self.has_array_ref = true;
                        }
                        let child_prefix = column_alias(prefix.as_deref(), &child.name);
                        self.join(
                            association,
                            schema,
                            &qualifier,
                            registry.get(child.schema),
                            &child_prefix,
                        )?;
                        nested.push((child, Some(child_prefix)));
                    }
                }
            }

            if let Some(ignores) = ignores {
                for column in schema.columns() {
                    if column.ref_key
                        || ignores.contains(&column.name.as_str())
                        || explicit.contains(&column.name.as_str())
                    {
                        continue;
                    }
                    has_id |= column.primary_key;
                    self.push_column(&column.field, &qualifier, prefix.as_deref());
                }
            }

            // Rows are grouped back into entities by id.
            if !has_id && !item.children.is_empty() && self.op != QueryOp::Count {
                match schema.id_column() {
                    Some(id) => {
                        self.injected.push(self.select.len());
                        self.push_column(&id.field, &qualifier, prefix.as_deref());
                    }
                    None => {
                        self.missing_id
                            .get_or_insert_with(|| schema.name().to_string());
                    }
                }
            }

            stack.extend(nested.into_iter().rev());
        }
        Ok(())
    }

    fn push_column(&mut self, field: &str, qualifier: &str, prefix: Option<&str>) {
        if self.op == QueryOp::Count {
            return;
        }
        self.select.push(SqlSelect::Column(
            SqlColumn::qualified(field, qualifier).with_alias(column_alias(prefix, field)),
        ));
    }

    fn join(
        &mut self,
        association: &AssociationInfo,
        current: &SchemaInfo,
        current_alias: &str,
        target: &SchemaInfo,
        target_alias: &str,
    ) -> OrqlResult<()> {
        let kind = if association.required {
            JoinKind::Inner
        } else {
            JoinKind::Left
        };

        match &association.kind {
            AssociationKind::HasOne { ref_key } | AssociationKind::HasMany { ref_key } => {
                let id = current.require_id()?;
                self.joins.push(SqlJoin {
                    kind,
                    table: target.table().to_string(),
                    alias: target_alias.to_string(),
                    on: SqlExp::column_eq(
                        SqlColumn::qualified(field_of(target, ref_key), target_alias),
                        SqlColumn::qualified(&id.field, current_alias),
                    ),
                });
            }
            AssociationKind::BelongsTo { ref_key } => {
                let id = target.require_id()?;
                self.joins.push(SqlJoin {
                    kind,
                    table: target.table().to_string(),
                    alias: target_alias.to_string(),
                    on: SqlExp::column_eq(
                        SqlColumn::qualified(&id.field, target_alias),
                        SqlColumn::qualified(field_of(current, ref_key), current_alias),
                    ),
                });
            }
            AssociationKind::BelongsToMany { middle } => {
                let current_id = current.require_id()?;
                let target_id = target.require_id()?;
                let middle_alias = format!("{}_{}", target_alias, middle.table);
                self.joins.push(SqlJoin {
                    kind,
                    table: middle.table.clone(),
                    alias: middle_alias.clone(),
                    on: SqlExp::column_eq(
                        SqlColumn::qualified(&middle.key, &middle_alias),
                        SqlColumn::qualified(&current_id.field, current_alias),
                    ),
                });
                self.joins.push(SqlJoin {
                    kind,
                    table: target.table().to_string(),
                    alias: target_alias.to_string(),
                    on: SqlExp::column_eq(
                        SqlColumn::qualified(&target_id.field, target_alias),
                        SqlColumn::qualified(&middle.ref_key, &middle_alias),
                    ),
                });
            }
        }
        Ok(())
    }

    fn require_ids(&self) -> OrqlResult<()> {
        match &self.missing_id {
            Some(name) => Err(OrqlError::MissingPrimaryKey(name.clone())),
            None => Ok(()),
        }
    }
}

/// Physical name of a foreign key column.
fn field_of<'s>(schema: &'s SchemaInfo, ref_key: &'s str) -> &'s str {
    schema.column(ref_key).map_or(ref_key, |c| c.field.as_str())
}

/// Resolve a dotted order path through the nested items of the query.
fn resolve_order_column(
    registry: &SchemaRegistry,
    root: &OrqlRefItem,
    table: &str,
    path: &str,
) -> OrqlResult<SqlColumn> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let column_name = segments.pop().unwrap_or_default();

    let mut item = root;
    let mut prefix: Option<String> = None;
    for segment in segments {
        item = item
            .children
            .iter()
            .find_map(|child| match child {
                OrqlItem::Ref(child) if child.name == segment => Some(child),
                _ => None,
            })
            .ok_or_else(|| {
                let schema = registry.get(item.schema);
                if schema.contains_association(segment) {
                    OrqlError::compile(format!("order path '{}' is not part of the query", path))
                } else {
                    OrqlError::UnknownIdentifier {
                        schema: schema.name().to_string(),
                        name: segment.to_string(),
                        suggestion: None,
                    }
                }
            })?;
        prefix = Some(column_alias(prefix.as_deref(), segment));
    }

    let schema = registry.get(item.schema);
    let column = schema
        .column(column_name)
        .ok_or_else(|| OrqlError::UnknownIdentifier {
            schema: schema.name().to_string(),
            name: column_name.to_string(),
            suggestion: None,
        })?;
    Ok(SqlColumn::qualified(
        &column.field,
        prefix.unwrap_or_else(|| table.to_string()),
    ))
}
