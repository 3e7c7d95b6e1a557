//! Contains geographic and tile coordinate types.

mod geo_bbox;
pub use geo_bbox::*;

mod tile_coord;
pub use tile_coord::*;

mod tile_range;
pub use tile_range::*;
