//! JSON export with id annotations.
//!
//! The serializable projection of the tree is a copy without identity, so
//! ids are re-attached in a second pass: the copy is walked alongside the
//! dotted-name chain, and every object whose name is in the [`IdIndex`]
//! gets `_id` and `_name` fields. The walk uses an explicit stack, so the
//! nesting depth isn't limited by the call stack.

use pb_schema::{NodeIndex, SchemaTree};
use serde_json::{Value, json};
use tracing::warn;

use crate::indexer::IdIndex;
use crate::lookup::{LookupKey, resolve};

/// Field holding the numeric id on annotated objects.
pub const ID_FIELD: &str = "_id";

/// Field holding the dotted name on annotated objects.
pub const NAME_FIELD: &str = "_name";

/// Exports the subtree named by `key`. `None` or an empty name exports the
/// whole tree.
///
/// Returns `None`, after logging a warning, if the key doesn't resolve.
#[must_use]
pub fn export(tree: &SchemaTree, index: &IdIndex, key: Option<&LookupKey>) -> Option<Value> {
    let subject = match key {
        None => SchemaTree::ROOT,
        Some(LookupKey::Name(name)) if name.is_empty() => SchemaTree::ROOT,
        Some(key) => {
            let Some(ix) = resolve(tree, index, key) else {
                warn!("Namespace [{key}] does not exist");
                return None;
            };
            ix
        }
    };
    Some(export_node(tree, index, subject))
}

/// Exports the subtree rooted at `ix`.
#[must_use]
pub fn export_node(tree: &SchemaTree, index: &IdIndex, ix: NodeIndex) -> Value {
    let mut value = tree.to_serializable(ix);
    annotate(&mut value, &tree.full_name(ix), index);
    value
}

/// Stamps `_id` and `_name` onto `value` and every object below its
/// `nested` maps whose dotted name is indexed. `name` is the dotted name of
/// `value` itself.
pub fn annotate(value: &mut Value, name: &str, index: &IdIndex) {
    let mut stack: Vec<(&mut Value, String)> = vec![(value, name.to_owned())];

    while let Some((value, name)) = stack.pop() {
        let Value::Object(object) = value else {
            continue;
        };
        if let Some(id) = index.id_of(&name) {
            object.insert(ID_FIELD.to_owned(), json!(id.get()));
            object.insert(NAME_FIELD.to_owned(), json!(name));
        }
        if let Some(Value::Object(nested)) = object.get_mut("nested") {
            for (child, child_value) in nested.iter_mut() {
                let child_name = if name.is_empty() {
                    child.clone()
                } else {
                    format!("{name}.{child}")
                };
                stack.push((child_value, child_name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;
    use pb_core::IdPolicy;
    use serde_json::Map;

    use super::*;
    use crate::indexer::IdIndexer;

    fn fixture(policy: IdPolicy, files: &[(&str, &str)]) -> (SchemaTree, IdIndexer) {
        let mut tree = SchemaTree::default();
        for (path, text) in files {
            tree.merge_source(text, Utf8Path::new(path)).unwrap();
        }
        let mut indexer = IdIndexer::new(policy);
        indexer.assign(&mut tree);
        (tree, indexer)
    }

    const FILES: &[(&str, &str)] = &[
        ("user.proto", "package app.User; message Profile { string name = 1; }"),
        ("order.proto", "package app.Order;"),
    ];

    #[test]
    fn test_export_whole_tree() {
        let (tree, indexer) = fixture(IdPolicy::Auto, FILES);
        let json = export(&tree, indexer.index(), None).unwrap();

        insta::assert_json_snapshot!(json, @r#"
        {
          "_id": 0,
          "_name": "",
          "nested": {
            "app": {
              "_id": 1,
              "_name": "app",
              "nested": {
                "Order": {
                  "_id": 2,
                  "_name": "app.Order"
                },
                "User": {
                  "_id": 3,
                  "_name": "app.User",
                  "nested": {
                    "Profile": {
                      "_id": 4,
                      "_name": "app.User.Profile",
                      "fields": {
                        "name": {
                          "id": 1,
                          "type": "string"
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
    fn test_export_subtree_by_name_and_id() {
        let (tree, indexer) = fixture(IdPolicy::Auto, FILES);
        let index = indexer.index();

        let by_name = export(&tree, index, Some(&"app.User".into())).unwrap();
        assert_eq!(by_name["_name"], "app.User");
        assert_eq!(by_name["nested"]["Profile"]["_name"], "app.User.Profile");

        let id = index.id_of("app.User").unwrap();
        let by_id = export(&tree, index, Some(&id.into())).unwrap();
        assert_eq!(by_id, by_name);
    }

    #[test]
    fn test_export_missing_namespace() {
        let (tree, indexer) = fixture(IdPolicy::Auto, FILES);
        assert!(export(&tree, indexer.index(), Some(&"app.Nope".into())).is_none());
    }

    #[test]
    fn test_export_empty_name_is_whole_tree() {
        let (tree, indexer) = fixture(IdPolicy::Auto, FILES);
        let index = indexer.index();
        let whole = export(&tree, index, None).unwrap();
        assert_eq!(export(&tree, index, Some(&"".into())), Some(whole.clone()));
        assert_eq!(export(&tree, index, Some(&0u32.into())), Some(whole));
    }

    #[test]
    fn test_export_is_idempotent() {
        let (tree, indexer) = fixture(IdPolicy::Auto, FILES);
        let first = serde_json::to_string(&export(&tree, indexer.index(), None)).unwrap();
        let second = serde_json::to_string(&export(&tree, indexer.index(), None)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unindexed_nodes_stay_plain() {
        let (tree, indexer) = fixture(
            IdPolicy::File,
            &[("5-user.proto", "package app; message User { message Inner {} }")],
        );
        let json = export(&tree, indexer.index(), None).unwrap();

        assert!(json.get(ID_FIELD).is_none());
        let app = &json["nested"]["app"];
        assert!(app.get(ID_FIELD).is_none());
        assert_eq!(app["nested"]["User"][ID_FIELD], 5);
        assert!(app["nested"]["User"]["nested"]["Inner"].get(ID_FIELD).is_none());
    }

    const DEPTH: usize = 1_000;

    /// A `n0.n1...` namespace chain `DEPTH` levels deep, with its deepest
    /// dotted name.
    fn deep_chain() -> (SchemaTree, IdIndexer, String) {
        let dotted = (0..DEPTH).map(|level| format!("n{level}")).collect::<Vec<_>>().join(".");
        let mut tree = SchemaTree::default();
        tree.define(SchemaTree::ROOT, &dotted).unwrap();
        let mut indexer = IdIndexer::new(IdPolicy::Auto);
        indexer.assign(&mut tree);
        (tree, indexer, dotted)
    }

    fn deepest(value: &Value) -> &Value {
        let mut cursor = value;
        for level in 0..DEPTH {
            cursor = &cursor["nested"][format!("n{level}").as_str()];
        }
        cursor
    }

    #[test]
    fn test_annotate_deep_nesting() {
        let (_tree, indexer, name) = deep_chain();

        let mut value = Value::Object(Map::new());
        for level in (0..DEPTH).rev() {
            let mut nested = Map::new();
            nested.insert(format!("n{level}"), value);
            let mut object = Map::new();
            object.insert("nested".to_owned(), Value::Object(nested));
            value = Value::Object(object);
        }
        annotate(&mut value, "", indexer.index());

        let leaf = deepest(&value);
        assert_eq!(leaf[NAME_FIELD], name.as_str());
        assert_eq!(leaf[ID_FIELD], DEPTH);
    }

    #[test]
    fn test_export_deep_chain() {
        let (tree, indexer, name) = deep_chain();

        let value = export(&tree, indexer.index(), None).unwrap();
        assert_eq!(value[ID_FIELD], 0);

        let leaf = deepest(&value);
        assert_eq!(leaf[NAME_FIELD], name.as_str());
        assert_eq!(leaf[ID_FIELD], DEPTH);
    }
}
