use indexmap::IndexMap;
use serde::Serialize;

use super::{AssociationInfo, ColumnInfo, SchemaId};
use crate::error::{OrqlError, OrqlResult};

/// An entity and the table it is stored in.
///
/// Columns and associations keep declaration order. Column names and
/// association names share one namespace.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaInfo {
    id: SchemaId,
    name: String,
    table: String,
    columns: IndexMap<String, ColumnInfo>,
    associations: IndexMap<String, AssociationInfo>,
    /// Index of the primary key in `columns`.
    primary_key: Option<usize>,
}

impl SchemaInfo {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.values()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.get(name)
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn associations(&self) -> impl Iterator<Item = &AssociationInfo> {
        self.associations.values()
    }

    pub fn association(&self, name: &str) -> Option<&AssociationInfo> {
        self.associations.get(name)
    }

    pub fn contains_association(&self, name: &str) -> bool {
        self.associations.contains_key(name)
    }

    /// The single-key association whose foreign key is `ref_key`.
    pub fn association_by_ref_key(&self, ref_key: &str) -> Option<&AssociationInfo> {
        self.associations
            .values()
            .find(|association| association.ref_key() == Some(ref_key))
    }

    /// The primary key column, if one is declared.
    pub fn id_column(&self) -> Option<&ColumnInfo> {
        self.primary_key
            .and_then(|index| self.columns.get_index(index))
            .map(|(_, column)| column)
    }

    /// The primary key column, or [`OrqlError::MissingPrimaryKey`].
    pub fn require_id(&self) -> OrqlResult<&ColumnInfo> {
        self.id_column()
            .ok_or_else(|| OrqlError::MissingPrimaryKey(self.name.clone()))
    }

    /// Every name resolvable inside this schema, columns first.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.columns
            .keys()
            .chain(self.associations.keys())
            .map(String::as_str)
    }

    /// Whether an injected foreign key column is already present.
    pub(crate) fn check_ref_column(&self, column: &ColumnInfo) -> OrqlResult<bool> {
        if self.associations.contains_key(&column.name) {
            return Err(OrqlError::schema(format!(
                "foreign key '{}.{}' collides with an association",
                self.name, column.name
            )));
        }
        Ok(self.columns.contains_key(&column.name))
    }

    /// Whether the identical association is already present.
    pub(crate) fn check_association(&self, association: &AssociationInfo) -> OrqlResult<bool> {
        if self.columns.contains_key(&association.name) {
            return Err(OrqlError::schema(format!(
                "association '{}.{}' collides with a column",
                self.name, association.name
            )));
        }
        match self.associations.get(&association.name) {
            Some(existing) if existing == association => Ok(true),
            Some(_) => Err(OrqlError::schema(format!(
                "association '{}.{}' is already declared differently",
                self.name, association.name
            ))),
            None => Ok(false),
        }
    }

    pub(crate) fn insert_column(&mut self, column: ColumnInfo) {
        self.columns.insert(column.name.clone(), column);
    }

    pub(crate) fn insert_association(&mut self, association: AssociationInfo) {
        self.associations
            .insert(association.name.clone(), association);
    }
}

/// Builder for [`SchemaInfo`]. The table defaults to the schema name.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    table: Option<String>,
    columns: Vec<ColumnInfo>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            columns: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn column(mut self, column: impl Into<ColumnInfo>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn build(self, id: SchemaId) -> OrqlResult<SchemaInfo> {
        let mut columns = IndexMap::with_capacity(self.columns.len());
        let mut primary_key = None;

        for column in self.columns {
            if column.primary_key {
                if primary_key.is_some() {
                    return Err(OrqlError::schema(format!(
                        "schema '{}' declares more than one primary key",
                        self.name
                    )));
                }
                primary_key = Some(columns.len());
            }
            if columns.contains_key(&column.name) {
                return Err(OrqlError::schema(format!(
                    "duplicate column '{}.{}'",
                    self.name, column.name
                )));
            }
            columns.insert(column.name.clone(), column);
        }

        Ok(SchemaInfo {
            id,
            table: self.table.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            columns,
            associations: IndexMap::new(),
            primary_key,
        })
    }
}
