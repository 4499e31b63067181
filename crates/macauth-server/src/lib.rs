//! MAC-address RADIUS authorization server
//!
//! Grants or denies network access to devices identified solely by
//! MAC address. A MAC-auth capable switch sends Access-Request with
//! `User-Name` = device MAC; the server answers Access-Accept with
//! VLAN tunnel attributes from the registry, Access-Accept onto a
//! fallback VLAN for unregistered devices, or Access-Reject for
//! devices flagged with the denied-sentinel VLAN. Every processed
//! request writes exactly one audit row; untrusted or malformed
//! requests are dropped silently and the NAS retransmits.
//!
//! # Example
//!
//! ```rust,no_run
//! use macauth_server::{MemoryBackend, RadiusServer, ServerContext, TrustResolver};
//! use macauth_server::config::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let backend = Arc::new(MemoryBackend::new());
//!     backend.register("AABBCCDDEEFF", "30");
//!
//!     let backend: Arc<dyn macauth_server::AuthzBackend> = backend;
//!     let context = ServerContext {
//!         resolver: TrustResolver::from_config(&config),
//!         backend,
//!         policy: config.policy(),
//!     };
//!
//!     let server = RadiusServer::bind(([0, 0, 0, 0], config.radius_port).into(), context).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod clients;
pub mod config;
pub mod engine;
pub mod health;
pub mod server;
pub mod store;

pub use clients::TrustResolver;
pub use config::{ClientSpec, Config, ConfigError};
pub use engine::{normalize_mac, Decision, VlanPolicy};
pub use health::{health_router, serve_health};
pub use server::{RadiusServer, ServerContext, ServerError};
pub use store::{AuditRow, AuthzBackend, MemoryBackend, MySqlBackend, StoreError};
