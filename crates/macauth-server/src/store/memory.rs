//! In-memory authorization backend
//!
//! Mirrors the MySQL backend's semantics (one audit row per processed
//! request, typed unavailability errors) without a database. Used by
//! the integration tests and handy for local experiments.

use super::{AuditRow, AuthzBackend, StoreError};
use crate::engine::{Decision, VlanPolicy};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory registry and audit log
#[derive(Default)]
pub struct MemoryBackend {
    registry: Mutex<HashMap<String, String>>,
    audit: Mutex<Vec<AuditRow>>,
    unavailable: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a MAC with a VLAN, as the admin console would
    pub fn register(&self, mac: impl Into<String>, vlan: impl Into<String>) {
        self.registry
            .lock()
            .expect("registry lock poisoned")
            .insert(mac.into(), vlan.into());
    }

    /// Simulate a store outage (tests)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of the audit log (tests)
    pub fn audit_rows(&self) -> Vec<AuditRow> {
        self.audit.lock().expect("audit lock poisoned").clone()
    }
}

#[async_trait]
impl AuthzBackend for MemoryBackend {
    async fn authorize(&self, mac: &str, policy: &VlanPolicy) -> Result<Decision, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory backend marked unavailable".to_string(),
            ));
        }

        let lookup = self
            .registry
            .lock()
            .expect("registry lock poisoned")
            .get(mac)
            .cloned();
        let decision = Decision::evaluate(lookup, policy);

        self.audit
            .lock()
            .expect("audit lock poisoned")
            .push(AuditRow::from_decision(mac, &decision, Utc::now()));

        Ok(decision)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory backend marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}
