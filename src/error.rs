//! Error types for the layout engine, the remote store and the adapter.

use thiserror::Error;

/// Construction-time failures of the layout engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// The configuration carries no node list.
    #[error("no nodes defined")]
    NoNodes,
    /// The configuration carries no link list.
    #[error("no links defined")]
    NoLinks,
    /// Width or height is not a positive number large enough for the border offset.
    #[error("invalid canvas {width}x{height} for border offset {offset}")]
    InvalidCanvas { width: f64, height: f64, offset: f64 },
}

/// Failures reported by a [`GraphStore`](crate::store::GraphStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No document or edge with this identifier exists.
    #[error("document not found: {0}")]
    NotFound(String),
    /// The collection referenced by an operation does not exist.
    #[error("collection not found: {0}")]
    UnknownCollection(String),
    /// The write conflicts with the current state (e.g. an edge endpoint is missing).
    #[error("conflict: {0}")]
    Conflict(String),
    /// The store answered with something that could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The round-trip itself failed.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl StoreError {
    /// HTTP-style status code associated with the failure.
    pub fn code(&self) -> u16 {
        match self {
            StoreError::NotFound(_) | StoreError::UnknownCollection(_) => 404,
            StoreError::Conflict(_) => 409,
            StoreError::Malformed(_) => 502,
            StoreError::Transport(_) => 500,
        }
    }
}

/// Failures surfaced by [`GraphDataAdapter`](crate::adapter::GraphDataAdapter).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// A mandatory collection name was empty.
    #[error("the {0} has to be given")]
    MissingCollection(&'static str),
    /// The requested root could not be found in the remote store.
    #[error("no results found for {0}")]
    NotFound(String),
    /// The entity handed in is not (or no longer) part of the mirror.
    #[error("not part of the mirror: {0}")]
    NotMirrored(String),
    /// The node stands for a community, not for a remote document.
    #[error("{0} is a community node")]
    Community(String),
    /// The collection does not exist in the graph or has the wrong kind.
    #[error("collection {0} is not available in the graph")]
    UnavailableCollection(String),
    /// The remote store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdapterError {
    /// Error code forwarded to the UI layer.
    pub fn code(&self) -> u16 {
        match self {
            AdapterError::MissingCollection(_)
            | AdapterError::Community(_)
            | AdapterError::UnavailableCollection(_) => 400,
            AdapterError::NotFound(_) => 404,
            AdapterError::NotMirrored(_) => 410,
            AdapterError::Store(err) => err.code(),
        }
    }
}
