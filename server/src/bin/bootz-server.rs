// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Bootz server reference implementation: a file-backed bootstrap service for
//! network devices. Extend it by providing your own entity manager.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bootz_proto::bootz::bootstrap_server::BootstrapServer;
use bootz_server::inventory::Inventory;
use bootz_server::{BootzService, EntityManager, SecurityArtifacts};
use clap::Parser;
use log::info;
use tokio::signal::unix::{signal, SignalKind};
use tonic::transport::{Server, ServerTlsConfig};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// The [ip:]port to listen on. When no ip is given the server listens on
    /// localhost.
    #[arg(long)]
    address: String,

    /// Directory holding the security artifacts (oc/pdc/vendorca keypairs and
    /// ov_<serial>.txt voucher blobs).
    #[arg(long = "artifact_dir", default_value = "./testdata")]
    artifact_dir: PathBuf,

    /// Optional TOML chassis inventory. When absent the inventory is derived
    /// from the ownership voucher set.
    #[arg(long)]
    inventory: Option<PathBuf>,
}

/// A bare port is interpreted as localhost:<port>.
fn convert_address(addr: &str) -> String {
    if addr.contains(':') {
        addr.to_string()
    } else {
        format!("localhost:{addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    let artifacts = Arc::new(
        SecurityArtifacts::load(&cli.artifact_dir).context("loading security artifacts")?,
    );
    let tls_identity = artifacts.tls_identity();

    let manager = EntityManager::new(artifacts.clone());
    let inventory = match &cli.inventory {
        Some(path) => Inventory::load(path).context("loading inventory")?,
        None => Inventory::default_from_artifacts(&artifacts),
    };
    inventory.apply(&manager).context("registering inventory")?;
    info!("Entity registry holds {} chassis", manager.chassis_count());

    let listen_addr = convert_address(&cli.address);
    let socket_addr = tokio::net::lookup_host(&listen_addr)
        .await
        .context("resolving listen address")?
        .next()
        .ok_or_else(|| anyhow!("listen address {listen_addr} did not resolve"))?;

    let service = BootzService::new(Arc::new(manager));
    info!("Bootz server listening on {socket_addr}");

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let server = Server::builder()
        .tls_config(ServerTlsConfig::new().identity(tls_identity))
        .context("configuring TLS")?
        .add_service(BootstrapServer::new(service))
        .serve(socket_addr);

    tokio::select! {
        _ = interrupt.recv() => info!("SIGINT received, shutting down."),
        _ = terminate.recv() => info!("SIGTERM received, shutting down."),
        result = server => result.context("serving gRPC")?,
    }

    Ok(())
}
