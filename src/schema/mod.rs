//! Schema model: entities, columns and the associations between them.
//!
//! A [`SchemaRegistry`] is assembled once through a [`RegistryBuilder`] (or
//! from a [`config::RegistryConfig`]) and is read-only afterwards. Parsing and
//! compiling only ever borrow it.
//!
//! ```
//! use orql::schema::{ColumnInfo, DataType, SchemaInfo, SchemaRegistry};
//!
//! let mut builder = SchemaRegistry::builder();
//! let role = builder
//!     .add_schema(
//!         SchemaInfo::builder("role")
//!             .column(ColumnInfo::builder("id", DataType::Int).primary_key())
//!             .column(ColumnInfo::builder("name", DataType::String)),
//!     )
//!     .unwrap();
//! let user = builder
//!     .add_schema(
//!         SchemaInfo::builder("user")
//!             .column(ColumnInfo::builder("id", DataType::Int).primary_key())
//!             .column(ColumnInfo::builder("name", DataType::String)),
//!     )
//!     .unwrap();
//! builder.belongs_to(user, "role", role).build().unwrap();
//!
//! let registry = builder.build();
//! assert!(registry.schema("user").unwrap().contains_column("roleId"));
//! ```

mod association;
mod column;
pub mod config;
mod entity;
mod registry;

use serde::{Deserialize, Serialize};

pub use association::{
    AssociationBuilder, AssociationInfo, AssociationKind, AssociationType, MiddleTable,
};
pub use column::{ColumnBuilder, ColumnInfo};
pub use entity::{SchemaBuilder, SchemaInfo};
pub use registry::{RegistryBuilder, SchemaRegistry};

/// Index of a schema inside its [`SchemaRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SchemaId(pub usize);

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Long,
    Float,
    Double,
    Bool,
    String,
    Date,
    Enum,
}

impl DataType {
    /// Map a type name as written in configuration onto a data type.
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "int" | "integer" | "i32" => DataType::Int,
            "long" | "bigint" | "i64" => DataType::Long,
            "float" | "real" | "f32" => DataType::Float,
            "double" | "f64" => DataType::Double,
            "bool" | "boolean" => DataType::Bool,
            "string" | "text" | "varchar" => DataType::String,
            "date" | "datetime" | "timestamp" => DataType::Date,
            "enum" => DataType::Enum,
            _ => return None,
        };
        Some(ty)
    }
}

/// Referential action recorded on foreign keys for the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cascade {
    Restrict,
    NoAction,
    Cascade,
    SetNull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_names() {
        assert_eq!(DataType::from_name("int"), Some(DataType::Int));
        assert_eq!(DataType::from_name("BIGINT"), Some(DataType::Long));
        assert_eq!(DataType::from_name("varchar"), Some(DataType::String));
        assert_eq!(DataType::from_name("timestamp"), Some(DataType::Date));
        assert_eq!(DataType::from_name("uuid"), None);
    }
}
