//! Declarative schema configuration.
//!
//! A registry can be described in TOML or JSON instead of being assembled by
//! hand:
//!
//! ```toml
//! [naming]
//! table_underscore = true
//!
//! [[schema]]
//! name = "user"
//! columns = [
//!     { name = "id", type = "long", generated_key = true },
//!     { name = "name", type = "string", length = 64 },
//! ]
//! associations = [
//!     { name = "role", kind = "belongs_to", target = "role", required = false },
//! ]
//!
//! [[schema]]
//! name = "role"
//! columns = [{ name = "id", type = "long", primary_key = true }]
//! ```
//!
//! All schemas and columns are registered before any association, so
//! associations may point at schemas declared later in the file.

use std::path::Path;

use serde::Deserialize;

use super::{
    AssociationType, Cascade, ColumnInfo, DataType, RegistryBuilder, SchemaBuilder, SchemaId,
    SchemaInfo, SchemaRegistry,
};
use crate::error::{OrqlError, OrqlResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default, rename = "schema", alias = "schemas")]
    pub schemas: Vec<SchemaConfig>,
}

/// camelCase to snake_case conversion of unset table and field names.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NamingConfig {
    #[serde(default)]
    pub table_underscore: bool,
    #[serde(default)]
    pub field_underscore: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    pub name: String,
    pub table: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub associations: Vec<AssociationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    pub field: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
    pub length: Option<u32>,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub generated_key: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociationConfig {
    pub name: String,
    pub kind: AssociationType,
    pub target: String,
    pub ref_key: Option<String>,
    #[serde(default = "default_true")]
    pub required: bool,
    /// Join table of `belongs_to_many`, either a table name or a schema name.
    pub middle: Option<String>,
    pub middle_key: Option<String>,
    pub ref_middle_key: Option<String>,
    pub on_delete: Option<Cascade>,
    pub on_update: Option<Cascade>,
}

fn default_true() -> bool {
    true
}

impl RegistryConfig {
    pub fn from_toml(source: &str) -> OrqlResult<Self> {
        toml::from_str(source).map_err(|e| OrqlError::Config(e.to_string()))
    }

    pub fn from_json(source: &str) -> OrqlResult<Self> {
        serde_json::from_str(source).map_err(|e| OrqlError::Config(e.to_string()))
    }

    /// Load a config file. `.json` files are read as JSON, anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> OrqlResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content)?,
            _ => Self::from_toml(&content)?,
        };
        tracing::info!(
            path = %path.display(),
            schemas = config.schemas.len(),
            "Loaded schema config"
        );
        Ok(config)
    }

    /// Build a registry from this config.
    pub fn build(&self) -> OrqlResult<SchemaRegistry> {
        let mut builder = RegistryBuilder::new();

        for schema in &self.schemas {
            builder.add_schema(self.schema_builder(schema)?)?;
        }

        for schema in &self.schemas {
            let current = builder
                .schema_id(&schema.name)
                .ok_or_else(|| OrqlError::Config(format!("schema '{}' vanished", schema.name)))?;
            for association in &schema.associations {
                self.add_association(&mut builder, schema, current, association)?;
            }
        }

        let registry = builder.build();
        tracing::info!(schemas = registry.len(), "Schema registry ready");
        Ok(registry)
    }

    fn schema_builder(&self, schema: &SchemaConfig) -> OrqlResult<SchemaBuilder> {
        let mut builder = SchemaInfo::builder(&schema.name);
        match &schema.table {
            Some(table) => builder = builder.table(table),
            None if self.naming.table_underscore => {
                builder = builder.table(camel_case_to_underscore(&schema.name))
            }
            None => {}
        }

        for column in &schema.columns {
            let data_type =
                DataType::from_name(&column.ty).ok_or_else(|| OrqlError::TypeNotSupported {
                    schema: schema.name.clone(),
                    column: column.name.clone(),
                    ty: column.ty.clone(),
                })?;
            let mut info = ColumnInfo::builder(&column.name, data_type).required(column.required);
            match &column.field {
                Some(field) => info = info.field(field),
                None if self.naming.field_underscore => {
                    info = info.field(camel_case_to_underscore(&column.name))
                }
                None => {}
            }
            if let Some(length) = column.length {
                info = info.length(length);
            }
            if column.generated_key {
                info = info.generated_key();
            } else if column.primary_key {
                info = info.primary_key();
            }
            builder = builder.column(info);
        }
        Ok(builder)
    }

    fn add_association(
        &self,
        builder: &mut RegistryBuilder,
        schema: &SchemaConfig,
        current: SchemaId,
        association: &AssociationConfig,
    ) -> OrqlResult<()> {
        let target = builder.schema_id(&association.target).ok_or_else(|| {
            OrqlError::Config(format!(
                "association '{}.{}' targets unknown schema '{}'",
                schema.name, association.name, association.target
            ))
        })?;

        let mut declaration = match association.kind {
            AssociationType::BelongsTo => builder.belongs_to(current, &association.name, target),
            AssociationType::HasOne => builder.has_one(current, &association.name, target),
            AssociationType::HasMany => builder.has_many(current, &association.name, target),
            AssociationType::BelongsToMany => {
                let middle = association.middle.as_deref().ok_or_else(|| {
                    OrqlError::Config(format!(
                        "association '{}.{}' needs a middle table",
                        schema.name, association.name
                    ))
                })?;
                // A registered schema name stands for its table.
                let table = builder
                    .schema(middle)
                    .map(|s| s.table().to_string())
                    .unwrap_or_else(|| middle.to_string());
                builder.belongs_to_many(current, &association.name, target, table)
            }
        };

        declaration = declaration.required(association.required);
        if let Some(ref_key) = &association.ref_key {
            declaration = declaration.ref_key(ref_key);
        }
        if let Some(key) = &association.middle_key {
            declaration = declaration.middle_key(key);
        }
        if let Some(key) = &association.ref_middle_key {
            declaration = declaration.ref_middle_key(key);
        }
        if let Some(cascade) = association.on_delete {
            declaration = declaration.on_delete(cascade);
        }
        if let Some(cascade) = association.on_update {
            declaration = declaration.on_update(cascade);
        }
        declaration.build()
    }
}

/// `sysUser` and `SysUser` both become `sys_user`.
pub fn camel_case_to_underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_to_underscore() {
        assert_eq!(camel_case_to_underscore("sysUser"), "sys_user");
        assert_eq!(camel_case_to_underscore("SysUser"), "sys_user");
        assert_eq!(camel_case_to_underscore("user"), "user");
        assert_eq!(camel_case_to_underscore("createdAt"), "created_at");
    }

    #[test]
    fn test_unsupported_type() {
        let config = RegistryConfig::from_toml(
            r#"
[[schema]]
name = "user"
columns = [{ name = "avatar", type = "blob" }]
"#,
        )
        .unwrap();
        let err = config.build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type 'blob' of column 'user.avatar' is not supported"
        );
    }

    #[test]
    fn test_unknown_target() {
        let config = RegistryConfig::from_json(
            r#"{
                "schema": [{
                    "name": "user",
                    "columns": [{ "name": "id", "type": "int", "primary_key": true }],
                    "associations": [{ "name": "role", "kind": "belongs_to", "target": "role" }]
                }]
            }"#,
        )
        .unwrap();
        assert!(matches!(config.build(), Err(OrqlError::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            RegistryConfig::from_toml("[[schema]\nname ="),
            Err(OrqlError::Config(_))
        ));
    }
}
