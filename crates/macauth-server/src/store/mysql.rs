//! MySQL authorization backend
//!
//! A bounded `sqlx` pool with liveness-checked acquisition. Startup
//! waits for the database (container orchestration starts the store
//! and the server together); per-request acquisition retries with
//! exponential backoff and fails the single request, never the
//! listener.

use super::{AuthzBackend, StoreError};
use crate::config::Config;
use crate::engine::{Decision, VlanPolicy};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Delay between startup connection attempts
const STARTUP_RETRY_INTERVAL: Duration = Duration::from_secs(2);
/// First per-request acquisition retry delay; doubles per attempt
const ACQUIRE_BASE_DELAY: Duration = Duration::from_secs(1);

pub struct MySqlBackend {
    pool: MySqlPool,
    acquire_retries: u32,
}

impl MySqlBackend {
    /// Connect to the store, waiting up to `DB_STARTUP_TIMEOUT` for it
    /// to come up
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let options = MySqlConnectOptions::new()
            .host(&config.db_host)
            .port(config.db_port)
            .username(&config.db_user)
            .password(&config.db_password)
            .database(&config.db_name);

        let deadline = Instant::now() + config.startup_timeout();
        let pool = loop {
            let attempt = MySqlPoolOptions::new()
                .max_connections(config.db_pool_size)
                .acquire_timeout(config.connect_timeout())
                .test_before_acquire(true)
                .connect_with(options.clone())
                .await;

            match attempt {
                Ok(pool) => break pool,
                Err(e) if Instant::now() + STARTUP_RETRY_INTERVAL < deadline => {
                    warn!(
                        host = %config.db_host,
                        port = config.db_port,
                        error = %e,
                        "Store not ready yet, retrying"
                    );
                    tokio::time::sleep(STARTUP_RETRY_INTERVAL).await;
                }
                Err(e) => {
                    return Err(StoreError::Unavailable(format!(
                        "store did not come up within {}s: {e}",
                        config.db_startup_timeout
                    )));
                }
            }
        };

        info!(
            host = %config.db_host,
            database = %config.db_name,
            pool_size = config.db_pool_size,
            "Store connection pool created"
        );

        Ok(MySqlBackend {
            pool,
            acquire_retries: config.db_acquire_retries.max(1),
        })
    }

    /// Begin a transaction, retrying transient acquisition failures
    ///
    /// Explicit attempt counter with doubling delay; exhaustion
    /// surfaces `StoreError::Unavailable` so the caller drops the one
    /// in-flight request.
    async fn begin_with_retry(&self) -> Result<sqlx::Transaction<'static, sqlx::MySql>, StoreError> {
        let mut delay = ACQUIRE_BASE_DELAY;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.pool.begin().await {
                Ok(tx) => return Ok(tx),
                Err(e) if attempt < self.acquire_retries => {
                    warn!(
                        attempt,
                        max_attempts = self.acquire_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Store acquisition failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    return Err(StoreError::Unavailable(format!(
                        "acquisition exhausted {} attempts: {e}",
                        self.acquire_retries
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl AuthzBackend for MySqlBackend {
    async fn authorize(&self, mac: &str, policy: &VlanPolicy) -> Result<Decision, StoreError> {
        let mut tx = self.begin_with_retry().await?;

        let row: Option<(String,)> =
            sqlx::query_as("SELECT vlan_id FROM users WHERE mac_address = ?")
                .bind(mac)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StoreError::Query(format!("registry lookup: {e}")))?;

        let decision = Decision::evaluate(row.map(|(vlan,)| vlan), policy);
        debug!(mac, reply = decision.reply_label(), "Registry decision");

        // Audit insert and registry read commit together; a failed
        // insert rolls the whole request back (transaction drop guard)
        // and the request is dropped without a reply.
        sqlx::query(
            "INSERT INTO auth_logs (mac_address, reply, result, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(mac)
        .bind(decision.reply_label())
        .bind(decision.result_text())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Query(format!("audit insert: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Query(format!("commit: {e}")))?;

        Ok(decision)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
