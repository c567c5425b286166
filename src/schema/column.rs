use serde::Serialize;

use super::{Cascade, DataType, SchemaId};

/// A column of a schema.
///
/// `name` is the property name used in ORQL and as the parameter name in
/// generated SQL. `field` is the physical column in the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub field: String,
    pub data_type: DataType,
    pub length: Option<u32>,
    pub required: bool,
    pub primary_key: bool,
    pub generated_key: bool,
    /// Set on foreign-key columns injected by associations.
    pub ref_key: bool,
    pub references: Option<SchemaId>,
    pub on_delete: Option<Cascade>,
    pub on_update: Option<Cascade>,
}

impl ColumnInfo {
    pub fn builder(name: impl Into<String>, data_type: DataType) -> ColumnBuilder {
        ColumnBuilder::new(name, data_type)
    }

    /// Foreign-key column pointing at `references`. Name and field are equal.
    pub(crate) fn foreign_key(name: &str, data_type: DataType, references: SchemaId) -> Self {
        Self {
            name: name.to_string(),
            field: name.to_string(),
            data_type,
            length: None,
            required: true,
            primary_key: false,
            generated_key: false,
            ref_key: true,
            references: Some(references),
            on_delete: None,
            on_update: None,
        }
    }
}

/// Builder for [`ColumnInfo`]. Columns are required unless stated otherwise.
#[derive(Debug, Clone)]
pub struct ColumnBuilder {
    column: ColumnInfo,
}

impl ColumnBuilder {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            column: ColumnInfo {
                field: name.clone(),
                name,
                data_type,
                length: None,
                required: true,
                primary_key: false,
                generated_key: false,
                ref_key: false,
                references: None,
                on_delete: None,
                on_update: None,
            },
        }
    }

    /// Physical column name, when it differs from the property name.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.column.field = field.into();
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.column.length = Some(length);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.column.required = required;
        self
    }

    pub fn not_required(self) -> Self {
        self.required(false)
    }

    pub fn primary_key(mut self) -> Self {
        self.column.primary_key = true;
        self
    }

    /// Primary key whose value is generated by the database.
    pub fn generated_key(mut self) -> Self {
        self.column.primary_key = true;
        self.column.generated_key = true;
        self
    }

    pub fn build(self) -> ColumnInfo {
        self.column
    }
}

impl From<ColumnBuilder> for ColumnInfo {
    fn from(builder: ColumnBuilder) -> Self {
        builder.build()
    }
}
