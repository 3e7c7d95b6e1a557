//! Pure building blocks of the tile resolution pipeline: Web Mercator math, the TileJSON
//! document model, tile URL templates, per-collection rule tables and tile URL diagnostics.
//!
//! Nothing in this crate performs I/O; the network side lives in the `tilelink` crate.

pub mod assets;
pub mod mercator;
pub mod quality;
pub mod rules;
pub mod template;
pub mod tilejson;
pub mod types;

pub use types::*;
