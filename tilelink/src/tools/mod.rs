pub mod analyze;
pub mod plan;
pub mod resolve;
pub mod tiles;
