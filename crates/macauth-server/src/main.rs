use clap::Parser;
use macauth_server::config::{ClientSpec, Config};
use macauth_server::{serve_health, MySqlBackend, RadiusServer, ServerContext, TrustResolver};
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// MAC-auth RADIUS server - assigns VLANs by device MAC address
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "macauthd")]
struct Cli {
    /// Validate configuration and exit (doesn't start the server)
    #[arg(long)]
    validate: bool,

    /// Override RADIUS_PORT
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration comes from the environment; errors are reported
    // before tracing is configured, so use a plain default subscriber.
    let mut config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing_subscriber::registry()
                .with(EnvFilter::new("info"))
                .with(tracing_subscriber::fmt::layer())
                .init();
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    if let Some(port) = cli.port {
        config.radius_port = port;
    }

    if cli.validate {
        println!("Configuration validated successfully");
        println!();
        println!("  RADIUS port:      {}", config.radius_port);
        println!("  Health port:      {}", config.health_port);
        println!(
            "  Store:            {}@{}:{}/{}",
            config.db_user, config.db_host, config.db_port, config.db_name
        );
        println!("  Pool size:        {}", config.db_pool_size);
        println!("  Default VLAN:     {}", config.default_vlan);
        println!("  Denied VLAN:      {}", config.denied_vlan);
        println!("  Local subnets:    {}", config.allow_local_subnet);
        println!("  Client entries:   {}", config.allowed_clients.len());
        for spec in &config.allowed_clients {
            match spec {
                ClientSpec::Exact { addr, .. } => println!("    host {addr}"),
                ClientSpec::Network { network, .. } => println!("    cidr {network}"),
                ClientSpec::Hostname { name, .. } => println!("    name {name} (lazy)"),
                ClientSpec::Wildcard { .. } => println!("    * (wildcard)"),
            }
        }
        process::exit(0);
    }

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("macauthd v{}", env!("CARGO_PKG_VERSION"));
    info!(
        default_vlan = %config.default_vlan,
        denied_vlan = %config.denied_vlan,
        "VLAN policy loaded"
    );

    if config.allowed_clients.is_empty() && !config.allow_local_subnet {
        warn!("No client entries and local-subnet trust disabled; every request will be dropped");
    }

    // Initial pool construction is the second fatal startup condition
    // besides binding the socket.
    let backend = match MySqlBackend::connect(&config).await {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            error!("Failed to connect to store: {}", e);
            process::exit(1);
        }
    };

    let authz: Arc<dyn macauth_server::AuthzBackend> = backend.clone();
    let context = ServerContext {
        resolver: TrustResolver::from_config(&config),
        backend: authz,
        policy: config.policy(),
    };

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.radius_port));
    let server = match RadiusServer::bind(bind_addr, context).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind listener: {}", e);
            process::exit(1);
        }
    };

    // Health comes up only once the listener is bound, so readiness
    // implies both the socket and the store.
    let health_addr = SocketAddr::from(([0, 0, 0, 0], config.health_port));
    tokio::spawn(async move {
        if let Err(e) = serve_health(backend, health_addr).await {
            error!("Health endpoint failed: {}", e);
        }
    });

    info!("Listening for RADIUS requests");
    if let Err(e) = server.run().await {
        error!("Listener error: {}", e);
        process::exit(1);
    }
}
