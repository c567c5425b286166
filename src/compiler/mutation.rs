//! Insert, update and delete lowering.

use super::filter::compile_exp;
use crate::ast::{OrqlItem, OrqlRefItem};
use crate::error::{OrqlError, OrqlResult};
use crate::schema::{AssociationKind, SchemaRegistry};
use crate::sql::{SqlAssignment, SqlDelete, SqlInsert, SqlUpdate};

pub(crate) fn build_insert(registry: &SchemaRegistry, root: &OrqlRefItem) -> OrqlResult<SqlInsert> {
    let table = registry.get(root.schema).table().to_string();
    let columns = column_set(registry, root)?;
    if columns.is_empty() {
        return Err(OrqlError::compile(format!(
            "insert into '{}' names no columns",
            root.name
        )));
    }
    let (columns, params) = columns.into_iter().unzip();
    Ok(SqlInsert {
        table,
        columns,
        params,
    })
}

pub(crate) fn build_update(registry: &SchemaRegistry, root: &OrqlRefItem) -> OrqlResult<SqlUpdate> {
    let table = registry.get(root.schema).table().to_string();
    let set: Vec<SqlAssignment> = column_set(registry, root)?
        .into_iter()
        .map(|(column, param)| SqlAssignment { column, param })
        .collect();
    if set.is_empty() {
        return Err(OrqlError::compile(format!(
            "update of '{}' names no columns",
            root.name
        )));
    }
    Ok(SqlUpdate {
        table,
        set,
        filter: root.filter.as_ref().map(|exp| compile_exp(exp, None)),
    })
}

pub(crate) fn build_delete(registry: &SchemaRegistry, root: &OrqlRefItem) -> SqlDelete {
    SqlDelete {
        table: registry.get(root.schema).table().to_string(),
        filter: root.filter.as_ref().map(|exp| compile_exp(exp, None)),
    }
}

/// `(field, param)` pairs written by an insert or update.
///
/// Explicit columns and belongs-to foreign keys come first, in item order.
/// A `*` adds every remaining non foreign-key column, minus the ignored
/// ones, at the end.
fn column_set(registry: &SchemaRegistry, root: &OrqlRefItem) -> OrqlResult<Vec<(String, String)>> {
    let schema = registry.get(root.schema);
    let mut columns: Vec<(String, String)> = Vec::new();
    let mut ignores: Option<Vec<&str>> = None;

    for item in &root.children {
        match item {
            OrqlItem::All => {
                ignores.get_or_insert_with(Vec::new);
            }
            OrqlItem::Ignore(column) => match ignores.as_mut() {
                Some(ignores) => ignores.push(column.name.as_str()),
                None => {
                    return Err(OrqlError::compile(format!(
                        "'!{}' in '{}' must follow '*'",
                        column.name, root.name
                    )));
                }
            },
            OrqlItem::Column(column) => columns.push((column.field.clone(), column.name.clone())),
            OrqlItem::Ref(item) => {
                // Only belongs-to owns a foreign key on this table.
                if let Some(association) = &item.association
                    && let AssociationKind::BelongsTo { ref_key } = &association.kind
                {
                    let target_id = registry.get(item.schema).require_id()?;
                    let field = schema
                        .column(ref_key)
                        .map_or_else(|| ref_key.clone(), |c| c.field.clone());
                    columns.push((field, format!("{}.{}", item.name, target_id.name)));
                }
            }
        }
    }

    if let Some(ignores) = ignores {
        for column in schema.columns() {
            if column.ref_key
                || ignores.contains(&column.name.as_str())
                || columns.iter().any(|(field, _)| *field == column.field)
            {
                continue;
            }
            columns.push((column.field.clone(), column.name.clone()));
        }
    }

    Ok(columns)
}
