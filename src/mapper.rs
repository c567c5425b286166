//! Result layout for turning flat query rows back into entity trees.
//!
//! A [`ResultRoot`] mirrors the item tree of a query and names, for every
//! property, the column alias the compiler gave it. An executor groups rows
//! by the `id` alias of each level and nests `ResultRef`s accordingly.

use serde::Serialize;

use crate::ast::{OrqlItem, OrqlNode, OrqlRefItem};
use crate::compiler::column_alias;
use crate::error::{OrqlError, OrqlResult};
use crate::schema::SchemaRegistry;

/// A property read from one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultColumn {
    pub property: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultItem {
    Column(ResultColumn),
    Ref(ResultRef),
}

/// A nested entity, or a list of them when `is_array` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRef {
    pub property: String,
    pub is_array: bool,
    pub root: ResultRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRoot {
    /// Alias of the id column. Single-row queries may not select it, and an
    /// association listed without braces never does.
    pub id: Option<ResultColumn>,
    pub items: Vec<ResultItem>,
}

impl ResultRoot {
    /// Build the layout of a parsed query.
    pub fn build(registry: &SchemaRegistry, node: &OrqlNode) -> OrqlResult<Self> {
        build_root(registry, node.root(), None)
    }

    pub fn columns(&self) -> impl Iterator<Item = &ResultColumn> {
        self.items.iter().filter_map(|item| match item {
            ResultItem::Column(column) => Some(column),
            ResultItem::Ref(_) => None,
        })
    }

    pub fn refs(&self) -> impl Iterator<Item = &ResultRef> {
        self.items.iter().filter_map(|item| match item {
            ResultItem::Ref(r) => Some(r),
            ResultItem::Column(_) => None,
        })
    }

    /// Every column alias in this layout, nested levels included.
    pub fn all_aliases(&self) -> Vec<&str> {
        let mut aliases = Vec::new();
        self.collect_aliases(&mut aliases);
        aliases
    }

    fn collect_aliases<'a>(&'a self, aliases: &mut Vec<&'a str>) {
        for item in &self.items {
            match item {
                ResultItem::Column(column) => aliases.push(&column.alias),
                ResultItem::Ref(r) => r.root.collect_aliases(aliases),
            }
        }
    }
}

fn build_root(
    registry: &SchemaRegistry,
    item: &OrqlRefItem,
    prefix: Option<&str>,
) -> OrqlResult<ResultRoot> {
    let schema = registry.get(item.schema);
    let column = |property: &str, field: &str| ResultColumn {
        property: property.to_string(),
        alias: column_alias(prefix, field),
    };

    let mut items = Vec::new();
    let mut explicit: Vec<&str> = Vec::new();
    let mut ignores: Option<Vec<&str>> = None;

    for child in &item.children {
        match child {
            OrqlItem::All => {
                ignores.get_or_insert_with(Vec::new);
            }
            OrqlItem::Ignore(c) => match ignores.as_mut() {
                Some(ignores) => ignores.push(c.name.as_str()),
                None => {
                    return Err(OrqlError::compile(format!(
                        "'!{}' in '{}' must follow '*'",
                        c.name, item.name
                    )));
                }
            },
            OrqlItem::Column(c) => {
                explicit.push(c.name.as_str());
                items.push(ResultItem::Column(column(&c.name, &c.field)));
            }
            OrqlItem::Ref(child) => {
                let child_prefix = column_alias(prefix, &child.name);
                items.push(ResultItem::Ref(ResultRef {
                    property: child.name.clone(),
                    is_array: child.is_array(),
                    root: build_root(registry, child, Some(&child_prefix))?,
                }));
            }
        }
    }

    if let Some(ignores) = ignores {
        for c in schema.columns() {
            if c.ref_key
                || ignores.contains(&c.name.as_str())
                || explicit.contains(&c.name.as_str())
            {
                continue;
            }
            items.push(ResultItem::Column(column(&c.name, &c.field)));
        }
    }

    // A bare association selects nothing, not even its id.
    let id = if item.children.is_empty() {
        None
    } else {
        schema.id_column().map(|id| column(&id.name, &id.field))
    };
    Ok(ResultRoot { id, items })
}
