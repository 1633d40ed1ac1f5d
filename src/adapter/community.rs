//! Community nodes.
//!
//! A community is one mirrored node standing in for several documents.
//! Its members and every edge touching them are kept here while it is
//! collapsed, so expanding it restores exactly what it hides. Edges
//! between a member and a visible node stay mirrored, re-attached to the
//! community node.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::debug;

use crate::graph::{link, remove_node_cascade, Edge, EdgeList, Node, NodeKey, NodeList};
use crate::layout::seed::spiral_point;
use crate::store::{Attributes, Document};

/// Prefix of the identifiers given to community nodes.
pub const COMMUNITY_PREFIX: &str = "*community_";

/// A document hidden inside a community.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: String,
    pub data: Attributes,
}

/// An edge together with the documents it connects.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub id: String,
    pub from: String,
    pub to: String,
    pub data: Attributes,
}

impl EdgeRecord {
    /// Record of a remote edge. `None` if an endpoint is missing.
    pub fn from_document(doc: &Document) -> Option<Self> {
        Some(Self {
            id: doc.id.clone(),
            from: doc.from.clone()?,
            to: doc.to.clone()?,
            data: doc.to_data(),
        })
    }

    /// Record of a mirrored edge. Endpoints come from `_from`/`_to`, falling
    /// back to the ids of the mirrored nodes.
    fn from_mirror(edge: &Edge, nodes: &NodeList) -> Option<Self> {
        let endpoint = |attribute: &str, key: NodeKey| {
            edge.data
                .get(attribute)
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| nodes.get(key).map(|node| node.id.clone()))
        };
        Some(Self {
            id: edge.id.clone(),
            from: endpoint("_from", edge.source)?,
            to: endpoint("_to", edge.target)?,
            data: edge.data.clone(),
        })
    }
}

/// One collapsed group of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Community {
    /// Identifier of the community node, starting with [`COMMUNITY_PREFIX`].
    pub id: String,
    pub members: Vec<Member>,
    /// Every known edge with at least one endpoint among the members.
    pub edges: Vec<EdgeRecord>,
}

impl Community {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the document `id` is hidden here.
    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|member| member.id == id)
    }
}

/// The communities of one adapter, with a reverse index from member to community.
#[derive(Debug, Default)]
pub struct Communities {
    by_id: BTreeMap<String, Community>,
    owner: HashMap<String, String>,
    next: u64,
}

impl Communities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Community> {
        self.by_id.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Community> {
        self.by_id.values()
    }

    /// Identifier of the community hiding the document `id`.
    pub fn owner_of(&self, id: &str) -> Option<&str> {
        self.owner.get(id).map(String::as_str)
    }

    fn insert(&mut self, members: Vec<Member>) -> String {
        self.next += 1;
        let id = format!("{COMMUNITY_PREFIX}{}", self.next);
        for member in &members {
            self.owner.insert(member.id.clone(), id.clone());
        }
        self.by_id.insert(
            id.clone(),
            Community {
                id: id.clone(),
                members,
                edges: Vec::new(),
            },
        );
        id
    }

    fn remove(&mut self, id: &str) -> Option<Community> {
        let community = self.by_id.remove(id)?;
        for member in &community.members {
            self.owner.remove(&member.id);
        }
        Some(community)
    }

    /// Keep `edge` with every community holding one of its endpoints.
    fn record(&mut self, edge: &EdgeRecord) {
        let owners = [self.owner.get(&edge.from), self.owner.get(&edge.to)];
        for owner in owners.into_iter().flatten() {
            let Some(community) = self.by_id.get_mut(owner) else {
                continue;
            };
            match community.edges.iter_mut().find(|known| known.id == edge.id) {
                Some(known) => *known = edge.clone(),
                None => community.edges.push(edge.clone()),
            }
        }
    }

    /// Replace the stored copies of `edge`, if any.
    pub(crate) fn refresh(&mut self, edge: &EdgeRecord) {
        for community in self.by_id.values_mut() {
            for known in community.edges.iter_mut().filter(|known| known.id == edge.id) {
                *known = edge.clone();
            }
        }
    }

    /// Drop every stored copy of the edge `id`.
    pub(crate) fn forget_edge(&mut self, id: &str) {
        for community in self.by_id.values_mut() {
            community.edges.retain(|known| known.id != id);
        }
    }
}

/// Split `items` into at most `count` contiguous groups whose sizes differ by at most one.
pub(crate) fn buckets<T>(items: Vec<T>, count: usize) -> Vec<Vec<T>> {
    let count = count.clamp(1, items.len().max(1));
    let (size, extra) = (items.len() / count, items.len() % count);
    let mut rest = items.into_iter();
    (0..count)
        .map(|i| rest.by_ref().take(size + usize::from(i < extra)).collect::<Vec<_>>())
        .filter(|group| !group.is_empty())
        .collect()
}

/// The mirror arenas and the communities, borrowed for one synchronous update.
pub(crate) struct Mirror<'a> {
    pub nodes: &'a mut NodeList,
    pub edges: &'a mut EdgeList,
    pub communities: &'a mut Communities,
}

impl Mirror<'_> {
    /// Community node hiding the document `id`.
    pub fn community_of(&self, id: &str) -> Option<NodeKey> {
        self.communities
            .owner_of(id)
            .and_then(|community| self.nodes.key_of(community))
    }

    /// Node showing the document `id`: its own node or its community.
    pub fn resolve(&self, id: &str) -> Option<NodeKey> {
        self.nodes.key_of(id).or_else(|| self.community_of(id))
    }

    /// Mirror `edge` between the nodes showing its endpoints.
    ///
    /// Edges touching a member are also recorded with its community; an
    /// edge with both ends inside one community is only recorded. Returns
    /// whether a new mirrored edge was inserted.
    pub fn attach(&mut self, edge: EdgeRecord) -> bool {
        let from_owner = self.communities.owner_of(&edge.from).map(str::to_string);
        let to_owner = self.communities.owner_of(&edge.to).map(str::to_string);
        if from_owner.is_some() || to_owner.is_some() {
            self.communities.record(&edge);
        }
        if from_owner.is_some() && from_owner == to_owner {
            return false;
        }
        let (Some(source), Some(target)) = (self.resolve(&edge.from), self.resolve(&edge.to)) else {
            return false;
        };
        let mirrored = Edge::new(edge.id, source, target).with_data(edge.data);
        matches!(link(self.nodes, self.edges, mirrored), Some((_, true)))
    }

    /// Insert a community node for `members` at `(x, y)`.
    pub fn insert_community(&mut self, members: Vec<Member>, x: f64, y: f64) -> NodeKey {
        let size = members.len();
        let id = self.communities.insert(members);
        let mut data = Attributes::new();
        data.insert("_id".into(), Value::String(id.clone()));
        data.insert("_size".into(), Value::from(size));
        let mut node = Node::at(id, x, y).with_data(data);
        node.state.set_community(true);
        self.nodes.insert_or_get(node).0
    }

    /// Replace the nodes `keys` by one community node at their centroid.
    ///
    /// `fallback` places the community when none of the nodes had a position.
    pub fn collapse(&mut self, keys: &[NodeKey], fallback: (f64, f64)) -> Option<NodeKey> {
        let mut members = Vec::with_capacity(keys.len());
        let mut records: Vec<EdgeRecord> = Vec::new();
        let (mut sum_x, mut sum_y, mut placed) = (0.0, 0.0, 0usize);

        for &key in keys {
            for edge_key in self.edges.incident(key) {
                let Some(record) = self
                    .edges
                    .get(edge_key)
                    .and_then(|edge| EdgeRecord::from_mirror(edge, self.nodes))
                else {
                    continue;
                };
                if !records.iter().any(|known| known.id == record.id) {
                    records.push(record);
                }
            }
            let Some((node, _)) = remove_node_cascade(self.nodes, self.edges, key) else {
                continue;
            };
            if node.is_positioned() {
                sum_x += node.x;
                sum_y += node.y;
                placed += 1;
            }
            members.push(Member {
                id: node.id,
                data: node.data,
            });
        }
        if members.is_empty() {
            return None;
        }

        let (x, y) = if placed > 0 {
            (sum_x / placed as f64, sum_y / placed as f64)
        } else {
            fallback
        };
        let size = members.len();
        let key = self.insert_community(members, x, y);
        let edges = records.len();
        for record in records {
            self.attach(record);
        }
        debug!(size, edges, "nodes collapsed into a community");
        Some(key)
    }

    /// Dissolve the community shown by `key` and mirror its members around
    /// its position. Returns the handles of the revealed nodes.
    pub fn expand(&mut self, key: NodeKey) -> Option<Vec<NodeKey>> {
        let node = self.nodes.get(key).filter(|node| node.state.is_community())?;
        let (id, x, y) = (node.id.clone(), node.x, node.y);
        let community = self.communities.remove(&id)?;
        remove_node_cascade(self.nodes, self.edges, key);

        let revealed: Vec<NodeKey> = community
            .members
            .into_iter()
            .enumerate()
            .map(|(i, member)| {
                let (mx, my) = spiral_point(x, y, i + 1);
                let node = Node::at(member.id, mx, my).with_data(member.data);
                self.nodes.insert_or_get(node).0
            })
            .collect();
        for record in community.edges {
            self.attach(record);
        }
        debug!(id = %id, revealed = revealed.len(), "community expanded");
        Some(revealed)
    }

    /// Collapse nodes until at most `limit` are mirrored.
    ///
    /// Nodes in `keep`, pinned nodes and communities are never collapsed.
    /// Expanded nodes go first. Returns the new community, if one was needed
    /// and enough nodes were eligible.
    pub fn reduce(&mut self, limit: usize, keep: &[NodeKey], fallback: (f64, f64)) -> Option<NodeKey> {
        let limit = limit.max(1);
        let count = self.nodes.len();
        if count <= limit {
            return None;
        }
        let mut candidates: Vec<(NodeKey, bool)> = self
            .nodes
            .iter()
            .filter(|(key, node)| {
                !node.state.is_community() && !node.state.is_pinned() && !keep.contains(key)
            })
            .map(|(key, node)| (key, node.state.is_expanded()))
            .collect();
        candidates.sort_by_key(|(_, expanded)| !expanded);

        let take = (count - limit + 1).min(candidates.len());
        if take < 2 {
            return None;
        }
        let keys: Vec<NodeKey> = candidates.into_iter().take(take).map(|(key, _)| key).collect();
        self.collapse(&keys, fallback)
    }
}
