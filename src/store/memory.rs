//! In-process graph store backed by petgraph.
//!
//! `MemoryStore` stores vertex documents as graph nodes and edge documents
//! as graph edges of a `StableGraph`, so indices stay valid across removals.
//! Every write is applied before its future resolves. Handles are cheap to
//! clone and share one database.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Directed;
use serde_json::Value;
use tracing::{debug, trace};

use super::{
    is_system_attribute, Attributes, Collection, CollectionKind, Direction, Document,
    GraphStore, Neighborhood, Result,
};
use crate::error::StoreError;

/// A document plus its insertion sequence number.
#[derive(Debug, Clone)]
struct Stored {
    seq: u64,
    doc: Document,
}

#[derive(Default)]
struct Database {
    graph: StableGraph<Stored, Stored, Directed>,

    /// Map from `_id` to petgraph NodeIndex
    vertex_index: HashMap<String, NodeIndex>,

    /// Map from `_id` to petgraph EdgeIndex
    edge_index: HashMap<String, EdgeIndex>,

    /// Collections in creation order.
    collections: Vec<Collection>,

    next_seq: u64,
    next_rev: u64,

    /// Outcome of the next operations, in order. `None` lets one pass.
    faults: VecDeque<Option<StoreError>>,
}

impl Database {
    fn take_fault(&mut self) -> Result<()> {
        match self.faults.pop_front() {
            Some(Some(err)) => Err(err),
            _ => Ok(()),
        }
    }

    fn add_collection(&mut self, name: &str, kind: CollectionKind) {
        if !self.collections.iter().any(|c| c.name == name) {
            self.collections.push(Collection::new(name, kind));
        }
    }

    fn next_rev(&mut self) -> String {
        self.next_rev += 1;
        self.next_rev.to_string()
    }

    fn require(&self, collection: &str, kind: CollectionKind) -> Result<()> {
        match self.collections.iter().find(|c| c.name == collection) {
            None => Err(StoreError::UnknownCollection(collection.to_string())),
            Some(found) if found.kind != kind => Err(StoreError::Conflict(format!(
                "{collection} is not a {} collection",
                match kind {
                    CollectionKind::Document => "document",
                    CollectionKind::Edge => "edge",
                }
            ))),
            Some(_) => Ok(()),
        }
    }

    fn new_document(&mut self, collection: &str, attributes: Attributes) -> (u64, Document) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let key = seq.to_string();
        let doc = Document {
            id: format!("{collection}/{key}"),
            key,
            rev: self.next_rev(),
            from: None,
            to: None,
            attributes: without_system_attributes(attributes),
        };
        (seq, doc)
    }

    fn vertex(&self, id: &str) -> Result<NodeIndex> {
        self.vertex_index
            .get(id)
            .copied()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn edge(&self, id: &str) -> Result<EdgeIndex> {
        self.edge_index
            .get(id)
            .copied()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Edges of `edge_collection` touching `index`, oldest first, with the far end.
    fn adjacent(
        &self,
        index: NodeIndex,
        edge_collection: &str,
        direction: Direction,
    ) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut found: Vec<(u64, EdgeIndex, NodeIndex)> = Vec::new();
        if matches!(direction, Direction::Outbound | Direction::Any) {
            for edge in self.graph.edges_directed(index, petgraph::Direction::Outgoing) {
                found.push((edge.weight().seq, edge.id(), edge.target()));
            }
        }
        if matches!(direction, Direction::Inbound | Direction::Any) {
            for edge in self.graph.edges_directed(index, petgraph::Direction::Incoming) {
                // A self-loop was already collected as outgoing.
                if direction == Direction::Any && edge.source() == edge.target() {
                    continue;
                }
                found.push((edge.weight().seq, edge.id(), edge.source()));
            }
        }
        found.retain(|(_, edge, _)| self.graph[*edge].doc.collection() == edge_collection);
        found.sort_by_key(|(seq, _, _)| *seq);
        found.into_iter().map(|(_, edge, far)| (edge, far)).collect()
    }

    fn vertices_of(&self, collection: &str) -> Vec<&Stored> {
        let mut docs: Vec<&Stored> = self
            .graph
            .node_weights()
            .filter(|stored| stored.doc.collection() == collection)
            .collect();
        docs.sort_by_key(|stored| stored.seq);
        docs
    }
}

fn without_system_attributes(mut attributes: Attributes) -> Attributes {
    attributes.retain(|name, _| !is_system_attribute(name));
    attributes
}

fn merge(doc: &mut Document, patch: Attributes) {
    for (name, value) in without_system_attributes(patch) {
        doc.attributes.insert(name, value);
    }
}

/// An in-memory [`GraphStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    db: Rc<RefCell<Database>>,
}

impl MemoryStore {
    /// Create an empty store without collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with one document and one edge collection.
    pub fn with_collections(node_collection: &str, edge_collection: &str) -> Self {
        let store = Self::new();
        store.create_collection(node_collection);
        store.create_edge_collection(edge_collection);
        store
    }

    /// Register a document collection. Existing collections are kept.
    pub fn create_collection(&self, name: &str) {
        self.db
            .borrow_mut()
            .add_collection(name, CollectionKind::Document);
    }

    /// Register an edge collection. Existing collections are kept.
    pub fn create_edge_collection(&self, name: &str) {
        self.db.borrow_mut().add_collection(name, CollectionKind::Edge);
    }

    /// Make the next operation fail with `err`. Queued faults fire in order.
    pub fn fail_next(&self, err: StoreError) {
        self.db.borrow_mut().faults.push_back(Some(err));
    }

    /// Let `skip` further operations through, then fail the one after with `err`.
    pub fn fail_after(&self, skip: usize, err: StoreError) {
        let mut db = self.db.borrow_mut();
        db.faults.extend(std::iter::repeat_n(None, skip));
        db.faults.push_back(Some(err));
    }

    /// Number of stored vertex documents.
    pub fn document_count(&self) -> usize {
        self.db.borrow().graph.node_count()
    }

    /// Number of stored edges.
    pub fn edge_count(&self) -> usize {
        self.db.borrow().graph.edge_count()
    }

    /// Whether a document or edge with this identifier exists.
    pub fn contains(&self, id: &str) -> bool {
        let db = self.db.borrow();
        db.vertex_index.contains_key(id) || db.edge_index.contains_key(id)
    }
}

#[async_trait(?Send)]
impl GraphStore for MemoryStore {
    async fn collections(&self) -> Result<Vec<Collection>> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        Ok(db.collections.clone())
    }

    async fn create_document(&self, collection: &str, attributes: Attributes) -> Result<Document> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        db.require(collection, CollectionKind::Document)?;

        let (seq, doc) = db.new_document(collection, attributes);
        let index = db.graph.add_node(Stored {
            seq,
            doc: doc.clone(),
        });
        db.vertex_index.insert(doc.id.clone(), index);
        debug!(id = %doc.id, "document created");
        Ok(doc)
    }

    async fn read_document(&self, id: &str) -> Result<Document> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        let index = db.vertex(id)?;
        Ok(db.graph[index].doc.clone())
    }

    async fn patch_document(&self, id: &str, patch: Attributes) -> Result<Document> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        let index = db.vertex(id)?;
        let rev = db.next_rev();
        let doc = &mut db.graph[index].doc;
        merge(doc, patch);
        doc.rev = rev;
        Ok(doc.clone())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        let index = db.vertex(id)?;
        let attached = db
            .graph
            .edges_directed(index, petgraph::Direction::Outgoing)
            .chain(db.graph.edges_directed(index, petgraph::Direction::Incoming))
            .count();
        if attached > 0 {
            return Err(StoreError::Conflict(format!(
                "{id} is still referenced by {attached} edge(s)"
            )));
        }
        db.graph.remove_node(index);
        db.vertex_index.remove(id);
        debug!(id, "document deleted");
        Ok(())
    }

    async fn create_edge(
        &self,
        collection: &str,
        from: &str,
        to: &str,
        attributes: Attributes,
    ) -> Result<Document> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        db.require(collection, CollectionKind::Edge)?;
        let source = db.vertex(from)?;
        let target = db.vertex(to)?;

        let (seq, mut doc) = db.new_document(collection, attributes);
        doc.from = Some(from.to_string());
        doc.to = Some(to.to_string());
        let index = db.graph.add_edge(
            source,
            target,
            Stored {
                seq,
                doc: doc.clone(),
            },
        );
        db.edge_index.insert(doc.id.clone(), index);
        debug!(id = %doc.id, from, to, "edge created");
        Ok(doc)
    }

    async fn read_edge(&self, id: &str) -> Result<Document> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        let index = db.edge(id)?;
        Ok(db.graph[index].doc.clone())
    }

    async fn patch_edge(&self, id: &str, patch: Attributes) -> Result<Document> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        let index = db.edge(id)?;
        let rev = db.next_rev();
        let doc = &mut db.graph[index].doc;
        merge(doc, patch);
        doc.rev = rev;
        Ok(doc.clone())
    }

    async fn delete_edge(&self, id: &str) -> Result<()> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        let index = db.edge(id)?;
        db.graph.remove_edge(index);
        db.edge_index.remove(id);
        debug!(id, "edge deleted");
        Ok(())
    }

    async fn neighborhood(
        &self,
        root: &str,
        edge_collection: &str,
        direction: Direction,
    ) -> Result<Neighborhood> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        db.require(edge_collection, CollectionKind::Edge)?;
        let index = db.vertex(root)?;

        let steps = db.adjacent(index, edge_collection, direction);
        let mut edges = Vec::with_capacity(steps.len());
        let mut vertices = Vec::with_capacity(steps.len());
        for (edge, far) in steps {
            edges.push(db.graph[edge].doc.clone());
            vertices.push(db.graph[far].doc.clone());
        }
        trace!(root, direction = direction.as_str(), edges = edges.len(), "neighborhood");
        Ok(Neighborhood {
            root: db.graph[index].doc.clone(),
            edges,
            vertices,
        })
    }

    async fn edges_of(
        &self,
        id: &str,
        edge_collection: &str,
        direction: Direction,
    ) -> Result<Vec<Document>> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        db.require(edge_collection, CollectionKind::Edge)?;
        let index = db.vertex(id)?;
        Ok(db
            .adjacent(index, edge_collection, direction)
            .into_iter()
            .map(|(edge, _)| db.graph[edge].doc.clone())
            .collect())
    }

    async fn count_children(
        &self,
        id: &str,
        edge_collection: &str,
        direction: Direction,
    ) -> Result<usize> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        db.require(edge_collection, CollectionKind::Edge)?;
        let index = db.vertex(id)?;
        Ok(db.adjacent(index, edge_collection, direction).len())
    }

    async fn find_by_attribute(
        &self,
        collection: &str,
        attribute: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        db.require(collection, CollectionKind::Document)?;
        Ok(db
            .vertices_of(collection)
            .into_iter()
            .filter(|stored| stored.doc.attributes.get(attribute) == Some(value))
            .map(|stored| stored.doc.clone())
            .collect())
    }

    async fn sample(&self, collection: &str, limit: usize) -> Result<Vec<Document>> {
        let mut db = self.db.borrow_mut();
        db.take_fault()?;
        db.require(collection, CollectionKind::Document)?;
        Ok(db
            .vertices_of(collection)
            .into_iter()
            .take(limit)
            .map(|stored| stored.doc.clone())
            .collect())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let db = self.db.borrow();
        f.debug_struct("MemoryStore")
            .field("documents", &db.graph.node_count())
            .field("edges", &db.graph.edge_count())
            .field("collections", &db.collections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => Attributes::new(),
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::with_collections("people", "knows")
    }

    #[test]
    fn test_create_and_read_document() {
        let store = store();
        let doc = block_on(store.create_document("people", attrs(json!({"name": "Alice"})))).unwrap();

        assert_eq!(doc.collection(), "people");
        assert_eq!(doc.id, format!("people/{}", doc.key));
        let read = block_on(store.read_document(&doc.id)).unwrap();
        assert_eq!(read, doc);
    }

    #[test]
    fn test_system_attributes_are_ignored_on_write() {
        let store = store();
        let doc = block_on(store.create_document(
            "people",
            attrs(json!({"_id": "people/forged", "_rev": "x", "name": "Bob"})),
        ))
        .unwrap();
        assert_ne!(doc.id, "people/forged");
        assert!(doc.attributes.get("_rev").is_none());
    }

    #[test]
    fn test_unknown_collection() {
        let store = store();
        let err = block_on(store.create_document("nope", Attributes::new())).unwrap_err();
        assert_eq!(err, StoreError::UnknownCollection("nope".into()));
        assert_eq!(err.code(), 404);

        let err = block_on(store.create_document("knows", Attributes::new())).unwrap_err();
        assert_eq!(err.code(), 409);
    }

    #[test]
    fn test_patch_bumps_revision() {
        let store = store();
        let doc = block_on(store.create_document("people", attrs(json!({"age": 30})))).unwrap();
        let patched =
            block_on(store.patch_document(&doc.id, attrs(json!({"age": 31, "city": "Köln"})))).unwrap();

        assert_ne!(patched.rev, doc.rev);
        assert_eq!(patched.attributes.get("age"), Some(&json!(31)));
        let read = block_on(store.read_document(&doc.id)).unwrap();
        assert_eq!(read.attributes.get("city"), Some(&json!("Köln")));
    }

    #[test]
    fn test_edges_and_neighborhood() {
        let store = store();
        let a = block_on(store.create_document("people", Attributes::new())).unwrap();
        let b = block_on(store.create_document("people", Attributes::new())).unwrap();
        let c = block_on(store.create_document("people", Attributes::new())).unwrap();
        let ab = block_on(store.create_edge("knows", &a.id, &b.id, Attributes::new())).unwrap();
        let ac = block_on(store.create_edge("knows", &a.id, &c.id, Attributes::new())).unwrap();
        let ca = block_on(store.create_edge("knows", &c.id, &a.id, Attributes::new())).unwrap();

        let out = block_on(store.neighborhood(&a.id, "knows", Direction::Outbound)).unwrap();
        assert_eq!(out.root.id, a.id);
        let ids: Vec<_> = out.edges.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec![ab.id.clone(), ac.id.clone()]);
        let far: Vec<_> = out.vertices.iter().map(|v| v.id.clone()).collect();
        assert_eq!(far, vec![b.id.clone(), c.id.clone()]);

        let inbound = block_on(store.neighborhood(&a.id, "knows", Direction::Inbound)).unwrap();
        assert_eq!(inbound.edges.len(), 1);
        assert_eq!(inbound.vertices[0].id, c.id);

        assert_eq!(block_on(store.count_children(&a.id, "knows", Direction::Any)).unwrap(), 3);
        let all = block_on(store.edges_of(&a.id, "knows", Direction::Any)).unwrap();
        assert_eq!(all.last().map(|e| e.id.clone()), Some(ca.id));
    }

    #[test]
    fn test_edge_requires_endpoints() {
        let store = store();
        let a = block_on(store.create_document("people", Attributes::new())).unwrap();
        let err = block_on(store.create_edge("knows", &a.id, "people/404", Attributes::new()))
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound("people/404".into()));
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn test_referenced_document_cannot_be_deleted() {
        let store = store();
        let a = block_on(store.create_document("people", Attributes::new())).unwrap();
        let b = block_on(store.create_document("people", Attributes::new())).unwrap();
        let ab = block_on(store.create_edge("knows", &a.id, &b.id, Attributes::new())).unwrap();

        let err = block_on(store.delete_document(&b.id)).unwrap_err();
        assert_eq!(err.code(), 409);

        block_on(store.delete_edge(&ab.id)).unwrap();
        block_on(store.delete_document(&b.id)).unwrap();
        assert!(!store.contains(&b.id));
        assert!(!store.contains(&ab.id));
        assert_eq!(
            block_on(store.read_document(&b.id)).unwrap_err(),
            StoreError::NotFound(b.id.clone())
        );
    }

    #[test]
    fn test_find_and_sample() {
        let store = store();
        for name in ["Alice", "Bob", "Alice"] {
            block_on(store.create_document("people", attrs(json!({"name": name})))).unwrap();
        }

        let alices = block_on(store.find_by_attribute("people", "name", &json!("Alice"))).unwrap();
        assert_eq!(alices.len(), 2);
        assert!(alices[0].key.parse::<u64>().unwrap() < alices[1].key.parse::<u64>().unwrap());

        let sample = block_on(store.sample("people", 2)).unwrap();
        assert_eq!(sample.len(), 2);
        assert_eq!(sample[0].id, alices[0].id);
    }

    #[test]
    fn test_fail_next_fires_once() {
        let store = store();
        store.fail_next(StoreError::Transport("connection reset".into()));

        let err = block_on(store.create_document("people", Attributes::new())).unwrap_err();
        assert_eq!(err.code(), 500);
        assert_eq!(store.document_count(), 0);

        assert!(block_on(store.create_document("people", Attributes::new())).is_ok());
    }

    #[test]
    fn test_fail_after_skips_operations() {
        let store = store();
        store.fail_after(2, StoreError::Transport("connection reset".into()));

        assert!(block_on(store.create_document("people", Attributes::new())).is_ok());
        assert!(block_on(store.create_document("people", Attributes::new())).is_ok());
        assert!(block_on(store.create_document("people", Attributes::new())).is_err());
        assert!(block_on(store.create_document("people", Attributes::new())).is_ok());
        assert_eq!(store.document_count(), 3);
    }

    #[test]
    fn test_collections_in_creation_order() {
        let store = store();
        store.create_edge_collection("likes");
        store.create_collection("people");

        let collections = block_on(store.collections()).unwrap();
        assert_eq!(
            collections,
            vec![
                Collection::new("people", CollectionKind::Document),
                Collection::new("knows", CollectionKind::Edge),
                Collection::new("likes", CollectionKind::Edge),
            ]
        );
    }

    #[test]
    fn test_clones_share_state() {
        let store = store();
        let handle = store.clone();
        let doc = block_on(store.create_document("people", Attributes::new())).unwrap();
        assert!(handle.contains(&doc.id));
    }
}
