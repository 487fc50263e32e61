use engine_jit::{FieldError, SchemaBuilder};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{compile, execute, schema};

const SDL: &str = r#"
    interface Node { id: ID! }
    type User implements Node { id: ID! name: String }
    type Post implements Node { id: ID! title: String }
    type Query { node: Node nodes: [Node] }
"#;

#[test]
fn value_without_runtime_type_cannot_be_completed() {
    let schema = schema(SchemaBuilder::from_sdl(SDL).resolver("Query", "node", |_, _, _, _| Ok(json!({"id": "1"}).into())));
    let query = compile(&schema, "{ node { id } }").unwrap();

    let response = execute(&query, json!({}));
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "node": null
      },
      "errors": [
        {
          "message": "Abstract type Node must resolve to an Object type at runtime for field Query.node. Either the Node type should provide a \"resolveType\" function or each possible types should provide an \"isTypeOf\" function.",
          "locations": [
            {
              "line": 1,
              "column": 3
            }
          ],
          "path": [
            "node"
          ]
        }
      ]
    }
    "#);
}

#[test]
fn typename_property_selects_the_branch() {
    let schema = schema(SchemaBuilder::from_sdl(SDL).resolver("Query", "nodes", |_, _, _, _| {
        Ok(json!([
            {"__typename": "User", "id": "1", "name": "Ada"},
            {"__typename": "Post", "id": "2", "title": "Notes"}
        ])
        .into())
    }));
    let query = compile(
        &schema,
        "{ nodes { __typename id ... on User { name } ... on Post { title } } }",
    )
    .unwrap();

    let response = execute(&query, json!({}));
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "nodes": [
          {
            "__typename": "User",
            "id": "1",
            "name": "Ada"
          },
          {
            "__typename": "Post",
            "id": "2",
            "title": "Notes"
          }
        ]
      }
    }
    "#);
}

#[test]
fn is_type_of_sweep_resolves_the_type() {
    let schema = schema(
        SchemaBuilder::from_sdl(SDL)
            .resolver("Query", "node", |_, _, _, _| Ok(json!({"id": "2", "title": "Notes"}).into()))
            .is_type_of("User", |value, _| value.get("name").is_some())
            .is_type_of("Post", |value, _| value.get("title").is_some()),
    );
    let query = compile(&schema, "{ node { __typename ... on Post { title } } }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response, json!({"data": {"node": {"__typename": "Post", "title": "Notes"}}}));
}

#[test]
fn custom_type_resolver() {
    let schema = schema(
        SchemaBuilder::from_sdl(SDL)
            .resolver("Query", "nodes", |_, _, _, _| Ok(json!([{"id": "u1"}, {"id": "x1"}, {"id": "e1"}]).into()))
            .type_resolver("Node", |value, _, info| {
                assert_eq!(info.field_name, "Node");
                match value["id"].as_str() {
                    Some(id) if id.starts_with('u') => Ok(Some("User".to_string())),
                    Some(id) if id.starts_with('x') => Ok(Some("Unknown".to_string())),
                    _ => Err(FieldError::new("cannot tell")),
                }
            }),
    );
    let query = compile(&schema, "{ nodes { __typename } }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response["data"], json!({"nodes": [{"__typename": "User"}, null, null]}));
    insta::assert_json_snapshot!(response["errors"], @r#"
    [
      {
        "message": "Runtime Object type \"Unknown\" is not a possible type for \"Node\".",
        "locations": [
          {
            "line": 1,
            "column": 3
          }
        ],
        "path": [
          "nodes",
          1
        ]
      },
      {
        "message": "cannot tell",
        "locations": [
          {
            "line": 1,
            "column": 3
          }
        ],
        "path": [
          "nodes",
          2
        ]
      }
    ]
    "#);
}

#[test]
fn failed_is_type_of_check() {
    let schema = schema(
        SchemaBuilder::from_sdl("type User { id: ID } type Query { user: User }")
            .resolver("Query", "user", |_, _, _, _| Ok(json!({"id": 1}).into()))
            .is_type_of("User", |value, _| value.get("kind").is_some()),
    );
    let query = compile(&schema, "{ user { id } }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response["data"], json!({"user": null}));
    assert_eq!(
        response["errors"][0]["message"],
        json!("Expected value of type \"User\" but got: { id: 1 }.")
    );
}
