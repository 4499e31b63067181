//! Backing-store abstraction
//!
//! The registry (`users`) is read-only from this process and the audit
//! table (`auth_logs`) is append-only; both are owned by the external
//! admin console for everything else. A backend performs one
//! authorization as a single transaction: registry lookup, decision,
//! audit insert, commit. The trait seam keeps the listener testable
//! without a database.
//!
//! Implementations:
//!
//! - [`MySqlBackend`]: the production store
//! - [`MemoryBackend`]: in-memory registry for tests and local runs

pub mod memory;
pub mod mysql;

pub use memory::MemoryBackend;
pub use mysql::MySqlBackend;

use crate::engine::{Decision, VlanPolicy};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection acquisition exhausted its retry budget; the request
    /// is dropped and the next request retries the store fresh
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// A query or insert failed after a connection was acquired; the
    /// transaction is rolled back
    #[error("Store query failed: {0}")]
    Query(String),
}

/// One row of the `auth_logs` table as the core writes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub mac_address: String,
    pub reply: String,
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRow {
    pub fn from_decision(mac: &str, decision: &Decision, timestamp: DateTime<Utc>) -> Self {
        AuditRow {
            mac_address: mac.to_string(),
            reply: decision.reply_label().to_string(),
            result: decision.result_text(),
            timestamp,
        }
    }
}

/// Authorization backend: registry lookup plus audit write, atomically
#[async_trait]
pub trait AuthzBackend: Send + Sync {
    /// Decide the VLAN for `mac` and record exactly one audit row.
    ///
    /// On error nothing is persisted and the caller must drop the
    /// request without a reply.
    async fn authorize(&self, mac: &str, policy: &VlanPolicy) -> Result<Decision, StoreError>;

    /// Cheap reachability probe for the health endpoint
    async fn health_check(&self) -> Result<(), StoreError>;
}
