//! Wire-level document and traversal types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form document attributes.
pub type Attributes = Map<String, Value>;

/// Whether an attribute name is reserved by the store (`_id`, `_rev`, ...).
pub fn is_system_attribute(name: &str) -> bool {
    name.starts_with('_')
}

/// Split a document identifier into `(collection, key)`.
pub fn split_id(id: &str) -> Option<(&str, &str)> {
    id.split_once('/')
}

/// A stored document or edge.
///
/// Serializes to the flat shape `{_id, _key, _rev, _from?, _to?, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_rev")]
    pub rev: String,
    #[serde(rename = "_from", default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(rename = "_to", default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Document {
    /// Collection part of the identifier.
    pub fn collection(&self) -> &str {
        split_id(&self.id).map_or("", |(collection, _)| collection)
    }

    /// The full document as a flat attribute map, system attributes included.
    pub fn to_data(&self) -> Attributes {
        let mut data = self.attributes.clone();
        data.insert("_id".into(), Value::String(self.id.clone()));
        data.insert("_key".into(), Value::String(self.key.clone()));
        data.insert("_rev".into(), Value::String(self.rev.clone()));
        if let Some(from) = &self.from {
            data.insert("_from".into(), Value::String(from.clone()));
        }
        if let Some(to) = &self.to {
            data.insert("_to".into(), Value::String(to.clone()));
        }
        data
    }
}

/// What a collection holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Vertex documents.
    Document,
    /// Edges with `_from` and `_to`.
    Edge,
}

/// A named collection of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CollectionKind,
}

impl Collection {
    pub fn new(name: impl Into<String>, kind: CollectionKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Which edges a traversal follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Outbound,
    Inbound,
    Any,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
            Direction::Any => "any",
        }
    }
}

/// Result of a one-step traversal: the root, the edges followed, and the
/// documents they lead to (`vertices[i]` is the far end of `edges[i]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood {
    pub root: Document,
    pub edges: Vec<Document>,
    pub vertices: Vec<Document>,
}

impl Neighborhood {
    /// Iterate over `(edge, far_end)` pairs.
    pub fn steps(&self) -> impl Iterator<Item = (&Document, &Document)> {
        self.edges.iter().zip(self.vertices.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_wire_shape() {
        let doc: Document = serde_json::from_value(json!({
            "_id": "knows/7",
            "_key": "7",
            "_rev": "12",
            "_from": "people/1",
            "_to": "people/2",
            "since": 2011
        }))
        .unwrap();

        assert_eq!(doc.collection(), "knows");
        assert_eq!(doc.attributes.get("since"), Some(&json!(2011)));

        let data = doc.to_data();
        assert_eq!(data.get("_from"), Some(&json!("people/1")));
        assert_eq!(serde_json::to_value(&doc).unwrap(), Value::Object(data));
    }

    #[test]
    fn test_vertex_omits_endpoints() {
        let doc: Document =
            serde_json::from_value(json!({"_id": "people/1", "_key": "1", "_rev": "1", "name": "Alice"}))
                .unwrap();
        assert!(doc.from.is_none() && doc.to.is_none());
        let wire = serde_json::to_value(&doc).unwrap();
        assert!(wire.get("_from").is_none());
        assert_eq!(wire.get("name"), Some(&json!("Alice")));
    }

    #[test]
    fn test_direction_names() {
        assert_eq!(Direction::default(), Direction::Outbound);
        assert_eq!(serde_json::to_value(Direction::Any).unwrap(), json!("any"));
        assert_eq!(Direction::Inbound.as_str(), "inbound");
    }

    #[test]
    fn test_collection_wire_shape() {
        let collection = Collection::new("knows", CollectionKind::Edge);
        assert_eq!(
            serde_json::to_value(&collection).unwrap(),
            json!({"name": "knows", "type": "edge"})
        );
    }
}
