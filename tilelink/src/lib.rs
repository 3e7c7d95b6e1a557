//! Resolves STAC result sets into signed `{z}/{x}/{y}` tile templates for web maps.
//!
//! [`plan::RenderPlanBuilder`] is the entry point: it classifies a result set, resolves the
//! TileJSON of each item through [`resolver::TileJsonResolver`] and signs provider URLs with
//! [`auth::UrlAuthenticator`]. The offline building blocks live in `tilelink_core`.

pub mod auth;
pub mod config;
pub mod http;
pub mod plan;
pub mod resolver;

pub use tilelink_core as core;
