//! Example demonstrating file watching with ordered change notification.
//!
//! This example shows how to:
//! - Track which fields changed between reloads
//! - Register consumers that only react to the parts they care about
//! - Abort the application when a consumer rejects a change
//!
//! Run with: cargo run --example hot_reload
//!
//! While running, edit demos/config/hot_reload.yaml. Setting `server.port`
//! below 1024 is rejected and shuts the example down.

use hotswap_control::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize, Serialize, Clone)]
struct AppConfig {
    server: ServerConfig,
    database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
struct ServerConfig {
    port: u16,
    host: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
struct DatabaseConfig {
    url: String,
    max_connections: u32,
}

impl Configuration for AppConfig {}

fn server(_: &CancellationToken, control: &Control<AppConfig>) -> Result<()> {
    if !control.is_changed("server.*") {
        return Ok(());
    }
    let cfg = control.snapshot();
    if cfg.server.port < 1024 {
        return Err(ConfigError::rejected(format!(
            "refusing privileged port {}",
            cfg.server.port
        )));
    }
    println!("[server] listening on {}:{}", cfg.server.host, cfg.server.port);
    Ok(())
}

fn database(_: &CancellationToken, control: &Control<AppConfig>) -> Result<()> {
    if control.is_changed("database.max_connections") {
        println!(
            "[database] pool resized to {}",
            control.snapshot().database.max_connections
        );
    }
    if control.is_changed("database.url") {
        println!("[database] reconnecting to {}", control.snapshot().database.url);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hotswap_control=debug")),
        )
        .init();

    let config_path = "demos/config/hot_reload.yaml";
    if !std::path::Path::new(config_path).exists() {
        std::fs::create_dir_all("demos/config")?;
        std::fs::write(
            config_path,
            r#"server:
  port: 8080
  host: localhost

database:
  url: postgres://localhost/mydb
  max_connections: 10
"#,
        )?;
        println!("Created {}", config_path);
    }

    let token = CancellationToken::new();
    let control = Arc::new(Control::<AppConfig>::builder().with_file(config_path).build()?);
    let notifier = Notifier::new(token.clone(), Arc::clone(&control));

    notifier.register_consumer(server)?;
    notifier.register_consumer(database)?;

    let shutdown = token.clone();
    notifier.register_aborter(move |err: &ConfigError| {
        eprintln!("[abort] {err}");
        shutdown.cancel();
    });

    notifier.notify()?;
    notifier.watch()?;

    println!("\n===> Try editing {} to see change notifications! <===", config_path);
    println!("Press Ctrl+C to exit\n");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => token.cancel(),
        _ = token.cancelled() => {}
    }

    println!("Last changes: {:?}", control.changes().iter().collect::<Vec<_>>());
    Ok(())
}
