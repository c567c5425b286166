use serde::{Deserialize, Serialize};

use super::{Cascade, ColumnInfo, RegistryBuilder, SchemaId};
use crate::error::{OrqlError, OrqlResult};

/// The four association shapes, without their join keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationType {
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
}

impl AssociationType {
    pub fn is_array(&self) -> bool {
        matches!(self, AssociationType::HasMany | AssociationType::BelongsToMany)
    }
}

/// Join table of a many-to-many association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MiddleTable {
    pub table: String,
    /// Middle column pointing at the owning schema.
    pub key: String,
    /// Middle column pointing at the target schema.
    pub ref_key: String,
}

/// An association together with the keys used to join it.
///
/// For `BelongsTo` the foreign key lives on the owning schema, for `HasOne`
/// and `HasMany` it lives on the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum AssociationKind {
    BelongsTo { ref_key: String },
    HasOne { ref_key: String },
    HasMany { ref_key: String },
    BelongsToMany { middle: MiddleTable },
}

impl AssociationKind {
    pub fn association_type(&self) -> AssociationType {
        match self {
            AssociationKind::BelongsTo { .. } => AssociationType::BelongsTo,
            AssociationKind::HasOne { .. } => AssociationType::HasOne,
            AssociationKind::HasMany { .. } => AssociationType::HasMany,
            AssociationKind::BelongsToMany { .. } => AssociationType::BelongsToMany,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationInfo {
    pub name: String,
    pub current: SchemaId,
    pub target: SchemaId,
    pub kind: AssociationKind,
    /// Required associations are joined with `inner join`, optional ones with `left join`.
    pub required: bool,
    pub on_delete: Option<Cascade>,
    pub on_update: Option<Cascade>,
}

impl AssociationInfo {
    /// Whether the association yields many target rows per owner.
    pub fn is_array(&self) -> bool {
        self.kind.association_type().is_array()
    }

    /// Foreign-key column name for the single-key association shapes.
    pub fn ref_key(&self) -> Option<&str> {
        match &self.kind {
            AssociationKind::BelongsTo { ref_key }
            | AssociationKind::HasOne { ref_key }
            | AssociationKind::HasMany { ref_key } => Some(ref_key),
            AssociationKind::BelongsToMany { .. } => None,
        }
    }

    pub fn middle(&self) -> Option<&MiddleTable> {
        match &self.kind {
            AssociationKind::BelongsToMany { middle } => Some(middle),
            _ => None,
        }
    }
}

/// Declares an association on a [`RegistryBuilder`].
///
/// Unset keys fall back to naming defaults: `<target>Id` for `belongs_to`,
/// `<owner>Id` for `has_one` and `has_many`, and `<owner>Id` / `<target>Id`
/// as the middle keys of `belongs_to_many`.
#[must_use = "associations are only registered by calling build()"]
pub struct AssociationBuilder<'a> {
    registry: &'a mut RegistryBuilder,
    name: String,
    ty: AssociationType,
    current: SchemaId,
    target: SchemaId,
    ref_key: Option<String>,
    required: bool,
    middle_table: Option<String>,
    middle_key: Option<String>,
    ref_middle_key: Option<String>,
    on_delete: Option<Cascade>,
    on_update: Option<Cascade>,
}

impl<'a> AssociationBuilder<'a> {
    pub(crate) fn new(
        registry: &'a mut RegistryBuilder,
        ty: AssociationType,
        current: SchemaId,
        name: impl Into<String>,
        target: SchemaId,
    ) -> Self {
        Self {
            registry,
            name: name.into(),
            ty,
            current,
            target,
            ref_key: None,
            required: true,
            middle_table: None,
            middle_key: None,
            ref_middle_key: None,
            on_delete: None,
            on_update: None,
        }
    }

    pub(crate) fn middle_table(mut self, table: impl Into<String>) -> Self {
        self.middle_table = Some(table.into());
        self
    }

    /// Foreign-key column name.
    pub fn ref_key(mut self, ref_key: impl Into<String>) -> Self {
        self.ref_key = Some(ref_key.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Middle column pointing at the owning schema.
    pub fn middle_key(mut self, key: impl Into<String>) -> Self {
        self.middle_key = Some(key.into());
        self
    }

    /// Middle column pointing at the target schema.
    pub fn ref_middle_key(mut self, key: impl Into<String>) -> Self {
        self.ref_middle_key = Some(key.into());
        self
    }

    pub fn on_delete(mut self, cascade: Cascade) -> Self {
        self.on_delete = Some(cascade);
        self
    }

    pub fn on_update(mut self, cascade: Cascade) -> Self {
        self.on_update = Some(cascade);
        self
    }

    /// Register the association and inject its foreign-key column.
    pub fn build(self) -> OrqlResult<()> {
        let registry = self.registry;
        let current_name = registry.get(self.current).name().to_string();
        let target_name = registry.get(self.target).name().to_string();

        let kind = match self.ty {
            AssociationType::BelongsTo => AssociationKind::BelongsTo {
                ref_key: self.ref_key.unwrap_or_else(|| format!("{}Id", target_name)),
            },
            AssociationType::HasOne => AssociationKind::HasOne {
                ref_key: self.ref_key.unwrap_or_else(|| format!("{}Id", current_name)),
            },
            AssociationType::HasMany => AssociationKind::HasMany {
                ref_key: self.ref_key.unwrap_or_else(|| format!("{}Id", current_name)),
            },
            AssociationType::BelongsToMany => AssociationKind::BelongsToMany {
                middle: MiddleTable {
                    table: self
                        .middle_table
                        .unwrap_or_else(|| format!("{}_{}", current_name, target_name)),
                    key: self
                        .middle_key
                        .unwrap_or_else(|| format!("{}Id", current_name)),
                    ref_key: self
                        .ref_middle_key
                        .unwrap_or_else(|| format!("{}Id", target_name)),
                },
            },
        };

        // The foreign key column type follows the primary key it points at.
        let foreign_key = match &kind {
            AssociationKind::BelongsTo { ref_key } => {
                let id = registry.get(self.target).require_id()?;
                let mut column = ColumnInfo::foreign_key(ref_key, id.data_type, self.target);
                column.required = self.required;
                Some((self.current, column))
            }
            AssociationKind::HasOne { ref_key } | AssociationKind::HasMany { ref_key } => {
                let id = registry.get(self.current).require_id()?;
                let mut column = ColumnInfo::foreign_key(ref_key, id.data_type, self.current);
                column.on_delete = self.on_delete;
                column.on_update = self.on_update;
                Some((self.target, column))
            }
            AssociationKind::BelongsToMany { .. } => None,
        };

        let association = AssociationInfo {
            name: self.name,
            current: self.current,
            target: self.target,
            kind,
            required: self.required,
            on_delete: self.on_delete,
            on_update: self.on_update,
        };

        if let Some((owner, column)) = &foreign_key {
            if *owner == self.current && column.name == association.name {
                return Err(OrqlError::schema(format!(
                    "association '{}.{}' uses its own name as foreign key",
                    current_name, association.name
                )));
            }
        }

        let exists = registry.get(self.current).check_association(&association)?;
        let fk_exists = match &foreign_key {
            Some((owner, column)) => registry.get(*owner).check_ref_column(column)?,
            None => false,
        };

        if let Some((owner, column)) = foreign_key {
            if fk_exists {
                tracing::debug!(
                    schema = %registry.get(owner).name(),
                    column = %column.name,
                    "Foreign key column already present"
                );
            } else {
                tracing::debug!(
                    schema = %registry.get(owner).name(),
                    column = %column.name,
                    "Injecting foreign key column"
                );
                registry.get_mut(owner).insert_column(column);
            }
        }
        if exists {
            tracing::debug!(
                schema = %current_name,
                association = %association.name,
                "Association already registered"
            );
        } else {
            registry.get_mut(self.current).insert_association(association);
        }
        Ok(())
    }
}
