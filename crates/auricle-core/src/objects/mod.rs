//! Object-based render backend
//!
//! Instead of mixing into the host bus, each source feeds an OS-managed
//! spatial audio object through a per-source ring. A 10 ms pump drains the
//! rings on its own thread, decoupled from the host callback cadence.
//!
//! - stream: traits over the OS spatial-audio client/stream/object
//! - source: per-source pair (host-side writer handle, pump-side state)
//! - adapter: activation, device change, worker pass, stop detection
//! - pump: the ticker-driven worker thread
//! - effect: the per-source host effect for this backend

mod adapter;
mod effect;
mod pump;
mod source;
mod stream;

pub use adapter::*;
pub use effect::*;
pub use pump::*;
pub use source::*;
pub use stream::*;
