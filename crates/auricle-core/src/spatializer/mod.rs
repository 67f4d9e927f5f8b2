//! Per-source spatializer effect, shared mixer effect and the parameter
//! translation between host state and the engine's acoustic record

mod effect;
mod mixer;
mod params;
mod translator;

pub use effect::*;
pub use mixer::*;
pub use params::*;
pub use translator::*;
