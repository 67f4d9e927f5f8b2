//! HRTF engine adapter and source-slot pool
//!
//! - api: engine-facing types and the `HrtfEngine` trait seam
//! - panner: built-in constant-power reference engine
//! - system: aligned per-slot scratch, descriptors, render, pool bookkeeping
//! - source: owning slot handle and the process-wide shared system

mod api;
mod panner;
mod source;
mod system;

pub use api::*;
pub use panner::*;
pub use source::*;
pub use system::*;
