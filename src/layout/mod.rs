//! Force-directed layout for the graph viewer.
//!
//! The engine owns only simulation state (temperature, run budget, drag
//! target). Node positions live in the shared node arena so the renderer
//! and the adapter see every move without copying.

mod clock;
mod config;
mod force;
pub mod seed;
mod shaper;

pub use config::LayoutConfig;
pub use force::{LayoutEngine, StopHandle, StopReason, TickOutcome};
pub use shaper::{EdgeShaper, NodeShaper};
