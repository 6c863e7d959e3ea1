//! Plain JSON projection of a subtree, in the shape protobuf.js emits from
//! `toJSON()`.
//!
//! The projection is a copy: it carries neither node identity, assigned ids
//! nor dotted names. Children live under `nested`, keyed by local name.

use pb_core::{FxHashMap, fx_hash_map};
use serde_json::{Map, Value, json};

use crate::ast::{Options, Reserved};
use crate::tree::{NodeBody, NodeIndex, SchemaTree};

impl SchemaTree {
    /// Serializes the subtree rooted at `ix`.
    ///
    /// Empty collections are omitted, so an empty namespace serializes to
    /// `{}`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use pb_schema::SchemaTree;
    ///
    /// let mut tree = SchemaTree::default();
    /// tree.merge_source("package app; enum Kind { A = 0; }", Utf8Path::new("k.proto"))?;
    ///
    /// let json = tree.to_serializable(SchemaTree::ROOT);
    /// assert_eq!(json["nested"]["app"]["nested"]["Kind"]["values"]["A"], 0);
    /// # Ok::<(), pb_schema::SchemaError>(())
    /// ```
    #[must_use]
    pub fn to_serializable(&self, ix: NodeIndex) -> Value {
        // Breadth-first listing, built in reverse so every child is finished
        // before its parent. Depth costs heap, not stack.
        let mut order = vec![ix];
        let mut cursor = 0;
        while let Some(&next) = order.get(cursor) {
            order.extend_from_slice(self.children(next));
            cursor += 1;
        }

        let mut built: FxHashMap<NodeIndex, Value> = fx_hash_map();
        for &current in order.iter().rev() {
            let mut out = self.shallow_json(current);
            let children = self.children(current);
            if !children.is_empty() {
                let nested: Map<String, Value> = children
                    .iter()
                    .map(|child| {
                        let value = built.remove(child).unwrap_or_default();
                        (self.node(*child).name().to_owned(), value)
                    })
                    .collect();
                out.insert("nested".to_owned(), Value::Object(nested));
            }
            built.insert(current, Value::Object(out));
        }
        built.remove(&ix).unwrap_or_default()
    }

    /// A node's own members, without `nested`.
    fn shallow_json(&self, ix: NodeIndex) -> Map<String, Value> {
        let node = self.node(ix);
        let mut out = Map::new();

        if !node.options().is_empty() {
            out.insert("options".to_owned(), options_json(node.options()));
        }

        match node.body() {
            NodeBody::Root | NodeBody::Namespace => {}
            NodeBody::Message(message) => {
                let mut fields = Map::new();
                for field in &message.fields {
                    let mut entry = Map::new();
                    if let Some(rule) = field.rule {
                        entry.insert("rule".to_owned(), json!(rule.as_str()));
                    }
                    if let Some(key_type) = &field.key_type {
                        entry.insert("keyType".to_owned(), json!(key_type));
                    }
                    entry.insert("type".to_owned(), json!(field.type_name));
                    entry.insert("id".to_owned(), json!(field.number));
                    if !field.options.is_empty() {
                        entry.insert("options".to_owned(), options_json(&field.options));
                    }
                    fields.insert(field.name.clone(), Value::Object(entry));
                }
                out.insert("fields".to_owned(), Value::Object(fields));

                if !message.oneofs.is_empty() {
                    let oneofs: Map<String, Value> = message
                        .oneofs
                        .iter()
                        .map(|oneof| {
                            let mut entry = Map::new();
                            entry.insert("oneof".to_owned(), json!(oneof.fields));
                            if !oneof.options.is_empty() {
                                entry.insert("options".to_owned(), options_json(&oneof.options));
                            }
                            (oneof.name.clone(), Value::Object(entry))
                        })
                        .collect();
                    out.insert("oneofs".to_owned(), Value::Object(oneofs));
                }
                if !message.extensions.is_empty() {
                    let ranges: Vec<Value> = message
                        .extensions
                        .iter()
                        .map(|(start, end)| json!([start, end]))
                        .collect();
                    out.insert("extensions".to_owned(), Value::Array(ranges));
                }
                if !message.reserved.is_empty() {
                    out.insert("reserved".to_owned(), reserved_json(&message.reserved));
                }
            }
            NodeBody::Enum(body) => {
                let values: Map<String, Value> = body
                    .values
                    .iter()
                    .map(|value| (value.name.clone(), json!(value.number)))
                    .collect();
                out.insert("values".to_owned(), Value::Object(values));
                if !body.reserved.is_empty() {
                    out.insert("reserved".to_owned(), reserved_json(&body.reserved));
                }
            }
            NodeBody::Service(service) => {
                let methods: Map<String, Value> = service
                    .methods
                    .iter()
                    .map(|method| {
                        let mut entry = Map::new();
                        entry.insert("requestType".to_owned(), json!(method.request_type));
                        if method.request_stream {
                            entry.insert("requestStream".to_owned(), Value::Bool(true));
                        }
                        entry.insert("responseType".to_owned(), json!(method.response_type));
                        if method.response_stream {
                            entry.insert("responseStream".to_owned(), Value::Bool(true));
                        }
                        if !method.options.is_empty() {
                            entry.insert("options".to_owned(), options_json(&method.options));
                        }
                        (method.name.clone(), Value::Object(entry))
                    })
                    .collect();
                out.insert("methods".to_owned(), Value::Object(methods));
            }
        }

        out
    }
}

fn options_json(options: &Options) -> Value {
    Value::Object(
        options
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect(),
    )
}

fn reserved_json(reserved: &[Reserved]) -> Value {
    Value::Array(
        reserved
            .iter()
            .map(|entry| match entry {
                Reserved::Range(start, end) => json!([start, end]),
                Reserved::Name(name) => json!(name),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;

    use super::*;

    #[test]
    fn test_serialize_message_tree() {
        let mut tree = SchemaTree::default();
        tree.merge_source(
            r#"
            package app.User;
            message Profile {
                string name = 1;
                repeated string tags = 2 [packed = false];
                map<string, int32> counts = 3;
                oneof contact { string email = 4; }
                reserved 9 to 11;
                reserved "old";
            }
            service Users {
                rpc Watch (stream Profile) returns (Profile);
            }
            "#,
            Utf8Path::new("user.proto"),
        )
        .unwrap();

        insta::assert_json_snapshot!(tree.to_serializable(SchemaTree::ROOT), @r#"
        {
          "nested": {
            "app": {
              "nested": {
                "User": {
                  "nested": {
                    "Profile": {
                      "fields": {
                        "counts": {
                          "id": 3,
                          "keyType": "string",
                          "type": "int32"
                        },
                        "email": {
                          "id": 4,
                          "type": "string"
                        },
                        "name": {
                          "id": 1,
                          "type": "string"
                        },
                        "tags": {
                          "id": 2,
                          "options": {
                            "packed": false
                          },
                          "rule": "repeated",
                          "type": "string"
                        }
                      },
                      "oneofs": {
                        "contact": {
                          "oneof": [
                            "email"
                          ]
                        }
                      },
                      "reserved": [
                        [
                          9,
                          11
                        ],
                        "old"
                      ]
                    },
                    "Users": {
                      "methods": {
                        "Watch": {
                          "requestStream": true,
                          "requestType": "Profile",
                          "responseType": "Profile"
                        }
                      }
                    }
                  }
                }
              }
            }
          }
        }
        "#);
    }

    #[test]
    fn test_serialize_carries_no_identity() {
        let mut tree = SchemaTree::default();
        let added = tree
            .merge_source("package app; message A {}", Utf8Path::new("a.proto"))
            .unwrap();
        tree.node_mut(added[0]).set_assigned_id(Some(pb_core::SchemaId::new(7)));

        let json = tree.to_serializable(SchemaTree::ROOT);
        let text = json.to_string();
        assert!(!text.contains("_id"));
        assert!(!text.contains("a.proto"));
        assert_eq!(json["nested"]["app"]["nested"]["A"]["fields"], json!({}));
    }

    #[test]
    fn test_serialize_deep_chain() {
        let mut tree = SchemaTree::default();
        let dotted = (0..1000).map(|level| format!("n{level}")).collect::<Vec<_>>().join(".");
        tree.define(SchemaTree::ROOT, &dotted).unwrap();

        let json = tree.to_serializable(SchemaTree::ROOT);
        let mut cursor = &json;
        for level in 0..1000 {
            cursor = &cursor["nested"][format!("n{level}").as_str()];
        }
        assert_eq!(cursor, &json!({}));
    }

    #[test]
    fn test_empty_root_serializes_to_empty_object() {
        let tree = SchemaTree::default();
        assert_eq!(tree.to_serializable(SchemaTree::ROOT), json!({}));
    }
}
