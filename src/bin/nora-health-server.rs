// ABOUTME: Nora Health API server binary
// ABOUTME: Loads configuration from the environment, opens the database and serves HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! # Nora Health API Server Binary
//!
//! Starts the REST API with Farcaster sign-in, social publishing and health
//! records on a single HTTP port.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use nora_health_server::{
    config::environment::{DatabaseUrl, ServerConfig},
    database::Database,
    logging,
    resources::ServerResources,
    server::NoraHealthServer,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "nora-health-server")]
#[command(about = "Nora Health API - social posting and health coaching backend")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Before configuration so missing-secret warnings are visible
    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(url) = args.database_url.as_deref() {
        config.database.url = DatabaseUrl::parse_url(url);
    }

    info!("Starting Nora Health API");
    info!("{}", config.summary());

    let database_url = config.database.url.to_connection_string();
    let database = Database::new(&database_url).await?;
    info!("Database URL: {database_url}");

    let port = config.http_port;
    let resources = Arc::new(ServerResources::new(database, config));
    let server = NoraHealthServer::new(resources);

    if let Err(e) = server.run(port).await {
        error!("Server error: {e}");
        return Err(e.into());
    }
    Ok(())
}
