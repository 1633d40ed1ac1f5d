//! The remote graph store the adapter mirrors.
//!
//! The adapter depends only on the [`GraphStore`] trait: document CRUD,
//! edge CRUD, and one-step traversals. Transport, wire format and retries
//! belong to the implementation. Every write must be durable (visible to an
//! independent read) by the time its future resolves.

mod document;
mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub use document::{
    is_system_attribute, split_id, Attributes, Collection, CollectionKind, Direction, Document,
    Neighborhood,
};
pub use memory::MemoryStore;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Asynchronous access to a remote document/graph store.
///
/// Futures are not `Send`: the viewer runs on a single-threaded event loop.
#[async_trait(?Send)]
pub trait GraphStore {
    /// Every collection of the graph, in creation order.
    async fn collections(&self) -> Result<Vec<Collection>>;

    /// Create a document in `collection`; returns it with its new identifier.
    async fn create_document(&self, collection: &str, attributes: Attributes) -> Result<Document>;

    /// Read a document by identifier.
    async fn read_document(&self, id: &str) -> Result<Document>;

    /// Merge `patch` into a document.
    async fn patch_document(&self, id: &str, patch: Attributes) -> Result<Document>;

    /// Delete a document.
    async fn delete_document(&self, id: &str) -> Result<()>;

    /// Create an edge from `from` to `to` in `collection`.
    async fn create_edge(
        &self,
        collection: &str,
        from: &str,
        to: &str,
        attributes: Attributes,
    ) -> Result<Document>;

    /// Read an edge by identifier.
    async fn read_edge(&self, id: &str) -> Result<Document>;

    /// Merge `patch` into an edge.
    async fn patch_edge(&self, id: &str, patch: Attributes) -> Result<Document>;

    /// Delete an edge.
    async fn delete_edge(&self, id: &str) -> Result<()>;

    /// The root and its immediate neighbours along `edge_collection`.
    async fn neighborhood(
        &self,
        root: &str,
        edge_collection: &str,
        direction: Direction,
    ) -> Result<Neighborhood>;

    /// Edges of `edge_collection` adjacent to `id` in `direction`.
    async fn edges_of(
        &self,
        id: &str,
        edge_collection: &str,
        direction: Direction,
    ) -> Result<Vec<Document>>;

    /// Number of edges of `edge_collection` adjacent to `id` in `direction`.
    async fn count_children(
        &self,
        id: &str,
        edge_collection: &str,
        direction: Direction,
    ) -> Result<usize>;

    /// Documents of `collection` whose `attribute` equals `value`.
    async fn find_by_attribute(
        &self,
        collection: &str,
        attribute: &str,
        value: &Value,
    ) -> Result<Vec<Document>>;

    /// Up to `limit` documents of `collection`.
    async fn sample(&self, collection: &str, limit: usize) -> Result<Vec<Document>>;
}
