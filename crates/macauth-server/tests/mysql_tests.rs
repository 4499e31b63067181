//! MySQL backend tests
//!
//! The transactional decision path is exercised end to end against a
//! real MySQL server. These tests are ignored by default; run them
//! with `cargo test -- --ignored` against a database that has the
//! `users` and `auth_logs` tables and the usual `DB_*` environment
//! variables set.

use macauth_server::config::Config;
use macauth_server::{AuthzBackend, Decision, MySqlBackend};

fn db_config() -> Config {
    let mut config = Config::from_env().expect("valid environment");
    config.db_startup_timeout = 10;
    config
}

#[tokio::test]
#[ignore] // Requires MySQL server
async fn test_connect_and_health_check() {
    let backend = MySqlBackend::connect(&db_config()).await.expect("connect");
    backend.health_check().await.expect("store reachable");
}

#[tokio::test]
#[ignore] // Requires MySQL server
async fn test_unknown_mac_authorizes_to_fallback() {
    let config = db_config();
    let backend = MySqlBackend::connect(&config).await.expect("connect");

    // A MAC that is certainly not registered
    let decision = backend
        .authorize("0000DEADBEEF", &config.policy())
        .await
        .expect("authorize");

    assert_eq!(
        decision,
        Decision::AcceptFallback {
            vlan: config.default_vlan.clone()
        }
    );
}

#[tokio::test]
#[ignore] // Requires MySQL server
async fn test_audit_row_is_written() {
    let config = db_config();
    let backend = MySqlBackend::connect(&config).await.expect("connect");

    backend
        .authorize("0000DEADBEEF", &config.policy())
        .await
        .expect("authorize");

    // The fallback decision above must appear in auth_logs; reporting
    // views read this table, so column values matter.
    let url = format!(
        "mysql://{}:{}@{}:{}/{}",
        config.db_user, config.db_password, config.db_host, config.db_port, config.db_name
    );
    let pool = sqlx::mysql::MySqlPool::connect(&url).await.expect("pool");
    let (reply, result): (String, String) = sqlx::query_as(
        "SELECT reply, result FROM auth_logs WHERE mac_address = ? ORDER BY id DESC LIMIT 1",
    )
    .bind("0000DEADBEEF")
    .fetch_one(&pool)
    .await
    .expect("audit row present");

    assert_eq!(reply, "Accept-Fallback");
    assert_eq!(
        result,
        format!("Assigned to fallback VLAN {}", config.default_vlan)
    );
}
