//! GraphDataAdapter - keeps the shared mirror in step with a remote store.
//!
//! Every operation first completes its remote round-trips and only then
//! mutates the mirror, in one synchronous step. A failed round-trip leaves
//! the mirror as it was, except for a node deletion that fails part-way:
//! the edges already deleted remotely are dropped from the mirror too. No
//! `RefCell` borrow is held across an `.await`.

use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;

use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, warn};

use super::community::{buckets, Communities, EdgeRecord, Member, Mirror};
use super::AdapterConfig;
use crate::error::{AdapterError, StoreError};
use crate::graph::{
    remove_node_cascade, unlink, EdgeKey, Node, NodeKey, NodeList, SharedEdges, SharedNodes,
};
use crate::layout::seed::spiral_point;
use crate::store::{
    self, is_system_attribute, Attributes, CollectionKind, Direction, Document, GraphStore,
    Neighborhood,
};

/// Number of remote documents inspected by [`GraphDataAdapter::get_attribute_examples`].
const ATTRIBUTE_SAMPLE_SIZE: usize = 100;

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Log a failed remote call and pass the result through.
fn remote<T>(operation: &'static str, id: &str, result: store::Result<T>) -> store::Result<T> {
    if let Err(err) = &result {
        warn!(operation, id, code = err.code(), error = %err, "remote operation failed");
    }
    result
}

/// Synchronizes the shared node/edge mirror with a [`GraphStore`].
pub struct GraphDataAdapter<S: GraphStore> {
    store: S,
    nodes: SharedNodes,
    edges: SharedEdges,
    communities: RefCell<Communities>,
    config: AdapterConfig,
}

impl<S: GraphStore> GraphDataAdapter<S> {
    /// Create an adapter over the shared arrays. Both collection names must be set.
    pub fn new(
        store: S,
        nodes: SharedNodes,
        edges: SharedEdges,
        config: AdapterConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            nodes,
            edges,
            communities: RefCell::new(Communities::new()),
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn nodes(&self) -> &SharedNodes {
        &self.nodes
    }

    pub fn edges(&self) -> &SharedEdges {
        &self.edges
    }

    /// The communities currently shown by community nodes.
    pub fn communities(&self) -> Ref<'_, Communities> {
        self.communities.borrow()
    }

    /// Run `update` on the mirror and the communities in one synchronous step.
    fn with_mirror<T>(&self, update: impl FnOnce(&mut Mirror<'_>) -> T) -> T {
        let mut nodes = self.nodes.borrow_mut();
        let mut edges = self.edges.borrow_mut();
        let mut communities = self.communities.borrow_mut();
        update(&mut Mirror {
            nodes: &mut nodes,
            edges: &mut edges,
            communities: &mut communities,
        })
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Limit the number of nodes one expansion adds. `None` lifts the limit.
    pub fn set_child_limit(&mut self, limit: Option<usize>) {
        self.config.child_limit = limit;
    }

    /// Limit the number of mirrored nodes and collapse the mirror down to it.
    ///
    /// Returns the community created by the reduction, if any.
    pub fn set_node_limit(&mut self, limit: Option<usize>) -> Option<NodeKey> {
        self.config.node_limit = limit;
        let center = self.config.center();
        let community = self.with_mirror(|mirror| mirror.reduce(limit?, &[], center));
        debug!(?limit, reduced = community.is_some(), "node limit changed");
        community
    }

    /// Point the adapter at another pair of collections.
    ///
    /// With `undirected` set, expansions follow edges in both directions.
    /// The mirror is left as it is.
    pub fn change_to_collections(
        &mut self,
        node_collection: &str,
        edge_collection: &str,
        undirected: bool,
    ) -> Result<()> {
        let config = AdapterConfig {
            node_collection: node_collection.to_string(),
            edge_collection: edge_collection.to_string(),
            direction: if undirected {
                Direction::Any
            } else {
                Direction::Outbound
            },
            ..self.config.clone()
        };
        config.validate()?;
        debug!(node_collection, edge_collection, undirected, "collections changed");
        self.config = config;
        Ok(())
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Names of the vertex collections of the graph.
    pub async fn get_node_collections(&self) -> Result<Vec<String>> {
        self.collection_names(CollectionKind::Document).await
    }

    /// Names of the edge collections of the graph.
    pub async fn get_edge_collections(&self) -> Result<Vec<String>> {
        self.collection_names(CollectionKind::Edge).await
    }

    /// Create new nodes in `name` from now on.
    pub async fn use_node_collection(&mut self, name: &str) -> Result<()> {
        self.require_collection(name, CollectionKind::Document).await?;
        debug!(name, "node collection selected");
        self.config.node_collection = name.to_string();
        Ok(())
    }

    /// Create new edges in `name` and expand along it from now on.
    pub async fn use_edge_collection(&mut self, name: &str) -> Result<()> {
        self.require_collection(name, CollectionKind::Edge).await?;
        debug!(name, "edge collection selected");
        self.config.edge_collection = name.to_string();
        Ok(())
    }

    async fn collection_names(&self, kind: CollectionKind) -> Result<Vec<String>> {
        let result = self.store.collections().await;
        Ok(remote("collections", "", result)?
            .into_iter()
            .filter(|collection| collection.kind == kind)
            .map(|collection| collection.name)
            .collect())
    }

    async fn require_collection(&self, name: &str, kind: CollectionKind) -> Result<()> {
        if self.collection_names(kind).await?.iter().any(|known| known == name) {
            Ok(())
        } else {
            Err(AdapterError::UnavailableCollection(name.to_string()))
        }
    }

    // =========================================================================
    // Expansion
    // =========================================================================

    /// Fetch `id` and its immediate neighbours and merge them into the mirror.
    ///
    /// Already-mirrored nodes and edges are never duplicated. A root hidden
    /// in a community is revealed first. Returns the handle of the root.
    pub async fn load_node_from_tree_by_id(&self, id: &str) -> Result<NodeKey> {
        let result = self
            .store
            .neighborhood(id, &self.config.edge_collection, self.config.direction)
            .await;
        let neighborhood = remote("neighborhood", id, result).map_err(|err| match err {
            StoreError::NotFound(_) => AdapterError::NotFound(id.to_string()),
            other => other.into(),
        })?;
        Ok(self.with_mirror(|mirror| self.merge(mirror, neighborhood)))
    }

    /// Alias of [`load_node_from_tree_by_id`](Self::load_node_from_tree_by_id).
    pub async fn load_node(&self, id: &str) -> Result<NodeKey> {
        self.load_node_from_tree_by_id(id).await
    }

    /// Expand from the first node-collection document whose `attribute` equals `value`.
    pub async fn load_node_from_tree_by_attribute_value(
        &self,
        attribute: &str,
        value: &Value,
    ) -> Result<NodeKey> {
        let result = self
            .store
            .find_by_attribute(&self.config.node_collection, attribute, value)
            .await;
        let found = remote("find_by_attribute", attribute, result)?;
        let root = found
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::NotFound(format!("{attribute} = {value}")))?;
        self.load_node_from_tree_by_id(&root.id).await
    }

    /// Number of children `id` has in the remote store.
    pub async fn request_centrality_children(&self, id: &str) -> Result<usize> {
        let result = self
            .store
            .count_children(id, &self.config.edge_collection, self.config.direction)
            .await;
        remote("count_children", id, result).map_err(|err| match err {
            StoreError::NotFound(_) => AdapterError::NotFound(id.to_string()),
            other => other.into(),
        })
    }

    /// Sorted, de-duplicated attribute names seen on remote and mirrored nodes.
    pub async fn get_attribute_examples(&self) -> Result<Vec<String>> {
        let collection = &self.config.node_collection;
        let result = self.store.sample(collection, ATTRIBUTE_SAMPLE_SIZE).await;
        let sample = remote("sample", collection, result)?;

        let mut names: BTreeSet<String> = sample
            .into_iter()
            .flat_map(|doc| doc.attributes.into_iter().map(|(name, _)| name))
            .collect();
        for (_, node) in self.nodes.borrow().iter() {
            names.extend(node.data.keys().cloned());
        }
        Ok(names
            .into_iter()
            .filter(|name| !is_system_attribute(name))
            .collect())
    }

    /// Reveal the members of a community node around its position.
    ///
    /// With a node limit set, other nodes are collapsed to make room; the
    /// revealed ones are kept. Returns the handles of the revealed nodes.
    pub fn expand_community(&self, key: NodeKey) -> Result<Vec<NodeKey>> {
        let center = self.config.center();
        self.with_mirror(|mirror| {
            let revealed = mirror
                .expand(key)
                .ok_or_else(|| AdapterError::NotMirrored(format!("community {key:?}")))?;
            if let Some(limit) = self.config.node_limit {
                mirror.reduce(limit, &revealed, center);
            }
            Ok(revealed)
        })
    }

    fn merge(&self, mirror: &mut Mirror<'_>, neighborhood: Neighborhood) -> NodeKey {
        let center = self.config.center();
        let root_id = &neighborhood.root.id;
        if let Some(community) = mirror.community_of(root_id) {
            mirror.expand(community);
        }

        let placed = mirror.nodes.len();
        let (root, inserted) = mirror.nodes.insert_or_get(Node::new(root_id.clone()));
        let (rx, ry) = match mirror.nodes.get_mut(root) {
            Some(node) => {
                if inserted || !node.is_positioned() {
                    let (x, y) = spiral_point(center.0, center.1, placed);
                    node.place(x, y);
                }
                node.data = neighborhood.root.to_data();
                node.state.set_expanded(true);
                (node.x, node.y)
            }
            None => center,
        };

        let mut fresh: Vec<&Document> = Vec::new();
        for vertex in &neighborhood.vertices {
            if mirror.resolve(&vertex.id).is_none() && !fresh.iter().any(|v| v.id == vertex.id) {
                fresh.push(vertex);
            }
        }
        let new_children = fresh.len();
        let groups = match self.config.child_limit {
            Some(limit) if fresh.len() > limit => buckets(fresh, limit),
            _ => fresh.into_iter().map(|vertex| vec![vertex]).collect(),
        };

        let mut kept = Vec::with_capacity(groups.len() + 1);
        kept.push(root);
        let mut new_communities = 0;
        for (slot, group) in groups.into_iter().enumerate() {
            let (x, y) = spiral_point(rx, ry, slot + 1);
            let key = match group.as_slice() {
                [vertex] => {
                    let node = Node::at(vertex.id.clone(), x, y).with_data(vertex.to_data());
                    mirror.nodes.insert_or_get(node).0
                }
                _ => {
                    new_communities += 1;
                    let members = group
                        .iter()
                        .map(|vertex| Member {
                            id: vertex.id.clone(),
                            data: vertex.to_data(),
                        })
                        .collect();
                    mirror.insert_community(members, x, y)
                }
            };
            kept.push(key);
        }

        let mut new_edges = 0;
        for edge in &neighborhood.edges {
            match EdgeRecord::from_document(edge) {
                Some(record) => new_edges += usize::from(mirror.attach(record)),
                None => warn!(id = %edge.id, "edge without endpoints skipped"),
            }
        }
        if let Some(limit) = self.config.node_limit {
            mirror.reduce(limit, &kept, center);
        }

        debug!(
            root = %root_id,
            new_children,
            new_communities,
            new_edges,
            nodes = mirror.nodes.len(),
            edges = mirror.edges.len(),
            "neighborhood merged"
        );
        root
    }

    // =========================================================================
    // Create / Patch / Delete
    // =========================================================================

    /// Create a document in the node collection and mirror it.
    pub async fn create_node(&self, data: Attributes) -> Result<NodeKey> {
        let collection = &self.config.node_collection;
        let result = self.store.create_document(collection, data).await;
        let doc = remote("create_document", collection, result)?;

        let center = self.config.center();
        let key = self.with_mirror(|mirror| {
            let (x, y) = spiral_point(center.0, center.1, mirror.nodes.len());
            let node = Node::at(doc.id.clone(), x, y).with_data(doc.to_data());
            let (key, _) = mirror.nodes.insert_or_get(node);
            if let Some(limit) = self.config.node_limit {
                mirror.reduce(limit, &[key], center);
            }
            key
        });
        debug!(id = %doc.id, "node created");
        Ok(key)
    }

    /// Create an edge between two mirrored nodes and mirror it.
    pub async fn create_edge(
        &self,
        source: NodeKey,
        target: NodeKey,
        data: Attributes,
    ) -> Result<EdgeKey> {
        let (from, to) = {
            let nodes = self.nodes.borrow();
            (self.node_id(&nodes, source)?, self.node_id(&nodes, target)?)
        };
        let collection = &self.config.edge_collection;
        let result = self.store.create_edge(collection, &from, &to, data).await;
        let doc = remote("create_edge", collection, result)?;

        let key = self.with_mirror(|mirror| {
            let record = EdgeRecord::from_document(&doc)?;
            mirror.attach(record);
            mirror.edges.key_of(&doc.id)
        });
        let key = key.ok_or_else(|| AdapterError::NotMirrored(format!("{from} -> {to}")))?;
        debug!(id = %doc.id, from = %from, to = %to, "edge created");
        Ok(key)
    }

    /// Merge `patch` into the remote document and the mirrored node.
    pub async fn patch_node(&self, key: NodeKey, patch: Attributes) -> Result<()> {
        let id = self.node_id(&self.nodes.borrow(), key)?;
        let result = self.store.patch_document(&id, patch).await;
        let doc = remote("patch_document", &id, result)?;

        if let Some(node) = self.nodes.borrow_mut().get_mut(key) {
            node.data = doc.to_data();
        }
        debug!(id = %id, rev = %doc.rev, "node patched");
        Ok(())
    }

    /// Merge `patch` into the remote edge and the mirrored edge.
    pub async fn patch_edge(&self, key: EdgeKey, patch: Attributes) -> Result<()> {
        let id = self.edge_id(key)?;
        let result = self.store.patch_edge(&id, patch).await;
        let doc = remote("patch_edge", &id, result)?;

        if let Some(edge) = self.edges.borrow_mut().get_mut(key) {
            edge.data = doc.to_data();
        }
        if let Some(record) = EdgeRecord::from_document(&doc) {
            self.communities.borrow_mut().refresh(&record);
        }
        debug!(id = %id, rev = %doc.rev, "edge patched");
        Ok(())
    }

    /// Delete a node, remotely and locally, together with every adjacent edge.
    ///
    /// Edges of every edge collection are removed in both directions,
    /// whether mirrored or not. If the cascade fails part-way the node
    /// stays, and the edges already deleted remotely leave the mirror.
    pub async fn delete_node(&self, key: NodeKey) -> Result<()> {
        let owned_id = self.node_id(&self.nodes.borrow(), key)?;
        let id = owned_id.as_str();

        let result = self.store.collections().await;
        let collections = remote("collections", id, result)?;
        let lookups = collections
            .iter()
            .filter(|collection| collection.kind == CollectionKind::Edge)
            .map(|collection| async move {
                let result = self.store.edges_of(id, &collection.name, Direction::Any).await;
                remote("edges_of", id, result)
            });
        let adjacent: Vec<Document> = try_join_all(lookups).await?.into_iter().flatten().collect();

        let mut deleted: Vec<&str> = Vec::with_capacity(adjacent.len());
        let mut failure = None;
        for edge in &adjacent {
            let result = self.store.delete_edge(&edge.id).await;
            match remote("delete_edge", &edge.id, result) {
                Ok(()) | Err(StoreError::NotFound(_)) => deleted.push(&edge.id),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        if failure.is_none() {
            let result = self.store.delete_document(id).await;
            failure = remote("delete_document", id, result).err();
        }

        let removed = self.with_mirror(|mirror| {
            for edge_id in &deleted {
                if let Some(edge_key) = mirror.edges.key_of(edge_id) {
                    unlink(mirror.nodes, mirror.edges, edge_key);
                }
                mirror.communities.forget_edge(edge_id);
            }
            if failure.is_some() {
                return None;
            }
            remove_node_cascade(mirror.nodes, mirror.edges, key)
                .map(|(_, removed_edges)| removed_edges.len())
        });
        if let Some(err) = failure {
            debug!(id, deleted_edges = deleted.len(), "node deletion stopped part-way");
            return Err(err.into());
        }
        debug!(id, remote_edges = adjacent.len(), removed_edges = removed.unwrap_or(0), "node deleted");
        Ok(())
    }

    /// Delete one edge, remotely and locally.
    ///
    /// An edge the store no longer has is dropped from the mirror as well.
    pub async fn delete_edge(&self, key: EdgeKey) -> Result<()> {
        let id = self.edge_id(key)?;
        let result = self.store.delete_edge(&id).await;
        match remote("delete_edge", &id, result) {
            Ok(()) => debug!(id = %id, "edge deleted"),
            Err(StoreError::NotFound(_)) => debug!(id = %id, "edge already gone remotely"),
            Err(err) => return Err(err.into()),
        }

        self.with_mirror(|mirror| {
            unlink(mirror.nodes, mirror.edges, key);
            mirror.communities.forget_edge(&id);
        });
        Ok(())
    }

    /// Remote id of a mirrored document node.
    fn node_id(&self, nodes: &NodeList, key: NodeKey) -> Result<String> {
        match nodes.get(key) {
            Some(node) if node.state.is_community() => Err(AdapterError::Community(node.id.clone())),
            Some(node) => Ok(node.id.clone()),
            None => Err(AdapterError::NotMirrored(format!("{key:?}"))),
        }
    }

    fn edge_id(&self, key: EdgeKey) -> Result<String> {
        self.edges
            .borrow()
            .get(key)
            .map(|edge| edge.id.clone())
            .ok_or_else(|| AdapterError::NotMirrored(format!("{key:?}")))
    }
}
