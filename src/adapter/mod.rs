//! Mirror synchronization with a remote graph store.
//!
//! [`GraphDataAdapter`] expands the remote graph tree-style into the shared
//! node/edge arrays and applies create, patch and delete operations to both
//! sides. Expansions past the configured limits are folded into community
//! nodes (see [`community`]).

pub mod community;
mod config;
mod graph_data;

pub use community::{Communities, Community, EdgeRecord, Member, COMMUNITY_PREFIX};
pub use config::AdapterConfig;
pub use graph_data::{GraphDataAdapter, Result};
