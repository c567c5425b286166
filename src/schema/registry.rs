use indexmap::IndexMap;

use super::{AssociationBuilder, AssociationType, SchemaBuilder, SchemaId, SchemaInfo};
use crate::error::{OrqlError, OrqlResult};

/// All schemas known to a compiler, indexed by name and by [`SchemaId`].
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, SchemaInfo>,
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaInfo> {
        self.schemas.get(name)
    }

    pub fn contains_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Look up a schema by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this registry's builder.
    pub fn get(&self, id: SchemaId) -> &SchemaInfo {
        &self.schemas[id.0]
    }

    pub fn schema_by_id(&self, id: SchemaId) -> Option<&SchemaInfo> {
        self.schemas.get_index(id.0).map(|(_, schema)| schema)
    }

    /// Schemas in registration order.
    pub fn schemas(&self) -> impl Iterator<Item = &SchemaInfo> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Mutable registry used while schemas and associations are declared.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    schemas: IndexMap<String, SchemaInfo>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema and return its id.
    pub fn add_schema(&mut self, schema: SchemaBuilder) -> OrqlResult<SchemaId> {
        if self.schemas.contains_key(schema.name()) {
            return Err(OrqlError::schema(format!(
                "schema '{}' is already registered",
                schema.name()
            )));
        }
        let id = SchemaId(self.schemas.len());
        let schema = schema.build(id)?;
        tracing::debug!(schema = %schema.name(), table = %schema.table(), "Registered schema");
        self.schemas.insert(schema.name().to_string(), schema);
        Ok(id)
    }

    pub fn schema_id(&self, name: &str) -> Option<SchemaId> {
        self.schemas.get_index_of(name).map(SchemaId)
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaInfo> {
        self.schemas.get(name)
    }

    pub(crate) fn get(&self, id: SchemaId) -> &SchemaInfo {
        &self.schemas[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: SchemaId) -> &mut SchemaInfo {
        &mut self.schemas[id.0]
    }

    /// `current` holds a foreign key to `target`.
    pub fn belongs_to(
        &mut self,
        current: SchemaId,
        name: impl Into<String>,
        target: SchemaId,
    ) -> AssociationBuilder<'_> {
        AssociationBuilder::new(self, AssociationType::BelongsTo, current, name, target)
    }

    /// `target` holds a foreign key to `current`, at most one row per owner.
    pub fn has_one(
        &mut self,
        current: SchemaId,
        name: impl Into<String>,
        target: SchemaId,
    ) -> AssociationBuilder<'_> {
        AssociationBuilder::new(self, AssociationType::HasOne, current, name, target)
    }

    /// `target` holds a foreign key to `current`.
    pub fn has_many(
        &mut self,
        current: SchemaId,
        name: impl Into<String>,
        target: SchemaId,
    ) -> AssociationBuilder<'_> {
        AssociationBuilder::new(self, AssociationType::HasMany, current, name, target)
    }

    /// `current` and `target` are linked through the `middle` join table.
    pub fn belongs_to_many(
        &mut self,
        current: SchemaId,
        name: impl Into<String>,
        target: SchemaId,
        middle: impl Into<String>,
    ) -> AssociationBuilder<'_> {
        AssociationBuilder::new(self, AssociationType::BelongsToMany, current, name, target)
            .middle_table(middle)
    }

    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            schemas: self.schemas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AssociationKind, Cascade, ColumnInfo, DataType};

    fn entity(name: &str) -> SchemaBuilder {
        SchemaInfo::builder(name)
            .column(ColumnInfo::builder("id", DataType::Long).generated_key())
            .column(ColumnInfo::builder("name", DataType::String))
    }

    #[test]
    fn test_belongs_to_injects_foreign_key() {
        let mut builder = SchemaRegistry::builder();
        let user = builder.add_schema(entity("user")).unwrap();
        let role = builder.add_schema(entity("role")).unwrap();
        builder.belongs_to(user, "role", role).required(false).build().unwrap();
        let registry = builder.build();

        let user = registry.schema("user").unwrap();
        let fk = user.column("roleId").unwrap();
        assert!(fk.ref_key);
        assert!(!fk.required);
        assert_eq!(fk.field, "roleId");
        assert_eq!(fk.data_type, DataType::Long);
        assert_eq!(fk.references, Some(role));

        let association = user.association("role").unwrap();
        assert_eq!(association.ref_key(), Some("roleId"));
        assert!(!association.required);
        assert!(!association.is_array());
    }

    #[test]
    fn test_belongs_to_default_key_follows_target() {
        let mut builder = SchemaRegistry::builder();
        let user = builder.add_schema(entity("user")).unwrap();
        let post = builder.add_schema(entity("post")).unwrap();
        builder.belongs_to(post, "author", user).build().unwrap();
        let registry = builder.build();

        let post = registry.schema("post").unwrap();
        let names: Vec<&str> = post.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "userId"]);
        assert!(!post.contains_column("authorId"));
        assert_eq!(post.association("author").unwrap().ref_key(), Some("userId"));
    }

    #[test]
    fn test_has_many_registered_twice() {
        let mut builder = SchemaRegistry::builder();
        let user = builder.add_schema(entity("user")).unwrap();
        let post = builder.add_schema(entity("post")).unwrap();
        builder.has_many(user, "posts", post).build().unwrap();
        builder.has_many(user, "posts", post).build().unwrap();
        let registry = builder.build();

        let post = registry.schema("post").unwrap();
        let names: Vec<&str> = post.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "userId"]);
        assert_eq!(registry.schema("user").unwrap().associations().count(), 1);
    }

    #[test]
    fn test_has_many_injects_on_target() {
        let mut builder = SchemaRegistry::builder();
        let user = builder.add_schema(entity("user")).unwrap();
        let post = builder.add_schema(entity("post")).unwrap();
        builder
            .has_many(user, "posts", post)
            .on_delete(Cascade::Cascade)
            .build()
            .unwrap();
        let registry = builder.build();

        assert!(!registry.schema("user").unwrap().contains_column("userId"));
        let fk = registry.schema("post").unwrap().column("userId").unwrap();
        assert_eq!(fk.references, Some(user));
        assert_eq!(fk.on_delete, Some(Cascade::Cascade));
        assert!(registry.schema("user").unwrap().association("posts").unwrap().is_array());
    }

    #[test]
    fn test_belongs_to_many_defaults() {
        let mut builder = SchemaRegistry::builder();
        let post = builder.add_schema(entity("post")).unwrap();
        let tag = builder.add_schema(entity("tag")).unwrap();
        builder.belongs_to_many(post, "tags", tag, "post_tag").build().unwrap();
        let registry = builder.build();

        let association = registry.schema("post").unwrap().association("tags").unwrap();
        match &association.kind {
            AssociationKind::BelongsToMany { middle } => {
                assert_eq!(middle.table, "post_tag");
                assert_eq!(middle.key, "postId");
                assert_eq!(middle.ref_key, "tagId");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        assert_eq!(registry.schema("post").unwrap().columns().count(), 2);
        assert_eq!(registry.schema("tag").unwrap().columns().count(), 2);
    }

    #[test]
    fn test_shared_foreign_key_is_injected_once() {
        let mut builder = SchemaRegistry::builder();
        let user = builder.add_schema(entity("user")).unwrap();
        let post = builder.add_schema(entity("post")).unwrap();
        builder.has_many(user, "posts", post).ref_key("authorId").build().unwrap();
        builder.belongs_to(post, "author", user).ref_key("authorId").build().unwrap();
        builder.belongs_to(post, "author", user).ref_key("authorId").build().unwrap();
        let registry = builder.build();

        let post = registry.schema("post").unwrap();
        let names: Vec<&str> = post.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "authorId"]);
        assert_eq!(post.associations().count(), 1);
        assert_eq!(
            post.association_by_ref_key("authorId").map(|a| a.name.as_str()),
            Some("author")
        );
        assert!(post.association_by_ref_key("name").is_none());
    }

    #[test]
    fn test_conflicting_association() {
        let mut builder = SchemaRegistry::builder();
        let user = builder.add_schema(entity("user")).unwrap();
        let role = builder.add_schema(entity("role")).unwrap();
        builder.belongs_to(user, "role", role).build().unwrap();
        let err = builder
            .belongs_to(user, "role", role)
            .required(false)
            .build()
            .unwrap_err();
        assert!(matches!(err, OrqlError::Schema(_)));
    }

    #[test]
    fn test_association_name_collides_with_column() {
        let mut builder = SchemaRegistry::builder();
        let user = builder.add_schema(entity("user")).unwrap();
        let role = builder.add_schema(entity("role")).unwrap();
        let err = builder.belongs_to(user, "name", role).build().unwrap_err();
        assert!(matches!(err, OrqlError::Schema(_)));
        assert!(builder.schema("user").unwrap().association("name").is_none());
    }

    #[test]
    fn test_target_without_primary_key() {
        let mut builder = SchemaRegistry::builder();
        let user = builder.add_schema(entity("user")).unwrap();
        let log = builder
            .add_schema(
                SchemaInfo::builder("log").column(ColumnInfo::builder("line", DataType::String)),
            )
            .unwrap();
        let err = builder.belongs_to(user, "log", log).build().unwrap_err();
        assert!(matches!(err, OrqlError::MissingPrimaryKey(name) if name == "log"));
        assert!(!builder.schema("user").unwrap().contains_column("logId"));
    }

    #[test]
    fn test_duplicate_schema() {
        let mut builder = SchemaRegistry::builder();
        builder.add_schema(entity("user")).unwrap();
        assert!(builder.add_schema(entity("user")).is_err());
    }

    #[test]
    fn test_lookup_by_id() {
        let mut builder = SchemaRegistry::builder();
        builder.add_schema(entity("user")).unwrap();
        let role = builder.add_schema(entity("role")).unwrap();
        assert_eq!(builder.schema_id("role"), Some(role));
        let registry = builder.build();
        assert_eq!(registry.get(role).name(), "role");
        assert_eq!(registry.schema_by_id(role).map(|s| s.name()), Some("role"));
        assert!(registry.schema_by_id(SchemaId(7)).is_none());
        assert_eq!(registry.len(), 2);
    }
}
