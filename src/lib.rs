//! GeoEngineer - declared infrastructure nodes, cross-node references and
//! reconciliation against remote inventory.
//!
//! A library for resolving node references and projecting declared resources
//! into Terraform JSON, state and import blocks.

pub mod cache;
pub mod definitions;
pub mod generation;
pub mod gps;
pub mod output;
pub mod providers;
pub mod resource;
pub mod terraform;

mod error;

pub use cache::RemoteInventory;
pub use error::GeoError;
pub use generation::{Generation, GenerationError};
pub use gps::{Context, Finder, GpsError, Node, NodeId, Reference};
pub use providers::cloudflare::{CloudflareClient, CloudflareError, CloudflareProvider, ZoneInfo};
pub use resource::{Resource, ResourceError, ResourceType};
