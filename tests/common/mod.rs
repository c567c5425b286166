#![allow(dead_code)]

use orql::prelude::*;

/// user, role, userInfo, post and tag, wired the way a small blog would be.
pub fn registry() -> SchemaRegistry {
    let mut builder = SchemaRegistry::builder();
    let user = builder
        .add_schema(
            SchemaInfo::builder("user")
                .column(ColumnInfo::builder("id", DataType::Int).generated_key())
                .column(ColumnInfo::builder("name", DataType::String))
                .column(ColumnInfo::builder("password", DataType::String)),
        )
        .expect("user schema");
    let role = builder
        .add_schema(
            SchemaInfo::builder("role")
                .column(ColumnInfo::builder("id", DataType::Int).generated_key())
                .column(ColumnInfo::builder("name", DataType::String)),
        )
        .expect("role schema");
    let user_info = builder
        .add_schema(
            SchemaInfo::builder("userInfo")
                .table("user_info")
                .column(ColumnInfo::builder("id", DataType::Long).generated_key())
                .column(ColumnInfo::builder("no", DataType::String)),
        )
        .expect("userInfo schema");
    let post = builder
        .add_schema(
            SchemaInfo::builder("post")
                .column(ColumnInfo::builder("id", DataType::Int).generated_key())
                .column(ColumnInfo::builder("title", DataType::String)),
        )
        .expect("post schema");
    let tag = builder
        .add_schema(
            SchemaInfo::builder("tag")
                .column(ColumnInfo::builder("id", DataType::Int).generated_key())
                .column(ColumnInfo::builder("name", DataType::String)),
        )
        .expect("tag schema");

    builder
        .belongs_to(user, "role", role)
        .ref_key("role_id")
        .required(false)
        .build()
        .expect("user.role");
    builder.has_one(user, "info", user_info).build().expect("user.info");
    builder
        .has_many(user, "posts", post)
        .ref_key("authorId")
        .on_delete(Cascade::Cascade)
        .build()
        .expect("user.posts");
    builder
        .belongs_to(user_info, "user", user)
        .build()
        .expect("userInfo.user");
    builder
        .belongs_to(post, "author", user)
        .ref_key("authorId")
        .build()
        .expect("post.author");
    builder
        .belongs_to_many(post, "tags", tag, "post_tag")
        .build()
        .expect("post.tags");

    builder.build()
}

pub fn orql() -> Orql {
    init_tracing();
    Orql::new(registry())
}

/// Log to the test writer, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The same schemas as [`registry`], as a TOML config.
pub const REGISTRY_TOML: &str = r#"
[[schema]]
name = "user"
columns = [
    { name = "id", type = "int", generated_key = true },
    { name = "name", type = "string" },
    { name = "password", type = "string" },
]
associations = [
    { name = "role", kind = "belongs_to", target = "role", ref_key = "role_id", required = false },
    { name = "info", kind = "has_one", target = "userInfo" },
    { name = "posts", kind = "has_many", target = "post", ref_key = "authorId", on_delete = "cascade" },
]

[[schema]]
name = "role"
columns = [
    { name = "id", type = "int", generated_key = true },
    { name = "name", type = "string" },
]

[[schema]]
name = "userInfo"
table = "user_info"
columns = [
    { name = "id", type = "long", generated_key = true },
    { name = "no", type = "string" },
]
associations = [
    { name = "user", kind = "belongs_to", target = "user" },
]

[[schema]]
name = "post"
columns = [
    { name = "id", type = "int", generated_key = true },
    { name = "title", type = "string" },
]
associations = [
    { name = "author", kind = "belongs_to", target = "user", ref_key = "authorId" },
    { name = "tags", kind = "belongs_to_many", target = "tag", middle = "post_tag" },
]

[[schema]]
name = "tag"
columns = [
    { name = "id", type = "int", generated_key = true },
    { name = "name", type = "string" },
]
"#;
