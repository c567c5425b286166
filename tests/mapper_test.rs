mod common;

use orql::prelude::*;
use pretty_assertions::assert_eq;

fn column(property: &str, alias: &str) -> ResultColumn {
    ResultColumn {
        property: property.to_string(),
        alias: alias.to_string(),
    }
}

#[test]
fn test_result_root_nested() {
    let root = common::orql()
        .result_root("user(id = $id): {name, role: {id, name}}")
        .unwrap();

    assert_eq!(
        root,
        ResultRoot {
            id: Some(column("id", "id")),
            items: vec![
                ResultItem::Column(column("name", "name")),
                ResultItem::Ref(ResultRef {
                    property: "role".to_string(),
                    is_array: false,
                    root: ResultRoot {
                        id: Some(column("id", "role_id")),
                        items: vec![
                            ResultItem::Column(column("id", "role_id")),
                            ResultItem::Column(column("name", "role_name")),
                        ],
                    },
                }),
            ],
        }
    );
}

#[test]
fn test_result_root_arrays() {
    let root = common::orql()
        .result_root("user: {*, !password, posts: {title, tags: {name}}}")
        .unwrap();

    let posts = root.refs().next().expect("posts ref");
    assert!(posts.is_array);
    assert_eq!(posts.root.id, Some(column("id", "posts_id")));
    let tags = posts.root.refs().next().expect("tags ref");
    assert!(tags.is_array);
    assert_eq!(tags.root.id, Some(column("id", "posts_tags_id")));

    let names: Vec<&str> = root.columns().map(|c| c.property.as_str()).collect();
    assert_eq!(names, vec!["id", "name"]);
    assert_eq!(
        root.all_aliases(),
        vec!["posts_title", "posts_tags_name", "id", "name"]
    );
}

#[test]
fn test_bare_association_has_no_id() {
    let orql = common::orql();
    let query = "user: {name, role}";
    let root = orql.result_root(query).unwrap();
    let role = root.refs().next().expect("role ref");
    assert_eq!(role.root.id, None);
    assert!(role.root.items.is_empty());

    let sql = orql.to_query(QueryOp::QueryAll, query, false, &[]).unwrap();
    assert!(!sql.contains("role_id"), "{sql}");
    assert_eq!(root.id, Some(column("id", "id")));
    assert!(sql.contains(" as id"), "{sql}");
}

#[test]
fn test_aliases_match_compiled_select() {
    let orql = common::orql();
    let query = "user: {id, name, posts: {id, title}}";
    let sql = orql.to_query(QueryOp::QueryAll, query, true, &[]).unwrap();
    let root = orql.result_root(query).unwrap();
    for alias in root.all_aliases() {
        assert!(sql.contains(&format!(" as {}", alias)), "{alias} missing from {sql}");
    }
}

#[test]
fn test_result_root_serializes() {
    let root = common::orql().result_root("role: {name}").unwrap();
    let json = serde_json::to_value(&root).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "id": { "property": "id", "alias": "id" },
            "items": [
                { "type": "column", "property": "name", "alias": "name" }
            ]
        })
    );
}
