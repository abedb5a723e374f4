pub mod client;
pub mod models;

pub use client::{ApiError, CatalogSource, PortalClient};
pub use models::SyncConfig;
