// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Bootz client emulator: plays the role of a freshly racked chassis asking
//! the bootstrap server for its identity, configuration, and boot image.

use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bootz_client::{tls, validate_artifacts};
use bootz_proto::bootz::bootstrap_client::BootstrapClient;
use bootz_proto::control_card_state::Status;
use bootz_proto::report_status_request::BootstrapStatus;
use bootz_proto::{
    ChassisDescriptor, ControlCard, ControlCardState, GetBootstrapDataRequest, ReportStatusRequest,
};
use clap::Parser;
use log::info;
use openssl::nid::Nid;
use openssl::x509::X509;

/// Represents a 128 bit nonce.
const NONCE_LENGTH: usize = 16;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// The [ip:]port of the bootz server. When no ip is given the client
    /// connects to localhost.
    #[arg(long, default_value = "8008")]
    address: String,

    /// PEM encoded certificate of the manufacturer CA, the sole trust anchor
    /// for ownership vouchers.
    #[arg(long = "root_ca_cert_path", default_value = "./testdata/vendorca_pub.pem")]
    root_ca_cert_path: PathBuf,

    /// Boot in non-secure mode: the server omits ownership artifacts and the
    /// client performs no cryptographic checks.
    #[arg(long = "insecure_boot", default_value_t = false, action = clap::ArgAction::Set)]
    insecure_boot: bool,

    /// Whether to verify the TLS certificate presented by the bootz server.
    /// If false, all TLS connections are implicitly trusted.
    #[arg(long = "verify_tls_cert", default_value_t = false, action = clap::ArgAction::Set)]
    verify_tls_cert: bool,

    /// Manufacturer of the emulated chassis.
    #[arg(long, default_value = "Cisco")]
    manufacturer: String,

    /// Serial number of the emulated chassis. Control cards are derived as
    /// <serial>A and <serial>B.
    #[arg(long = "serial_number", default_value = "123")]
    serial_number: String,
}

/// A bare port is interpreted as localhost:<port>.
fn convert_address(addr: &str) -> String {
    if addr.contains(':') {
        addr.to_string()
    } else {
        format!("localhost:{addr}")
    }
}

fn generate_nonce() -> Result<String> {
    let mut buf = [0u8; NONCE_LENGTH];
    openssl::rand::rand_bytes(&mut buf).context("generating nonce")?;
    Ok(STANDARD.encode(buf))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    let root_ca_pem = std::fs::read(&cli.root_ca_cert_path)
        .with_context(|| format!("reading root CA {}", cli.root_ca_cert_path.display()))?;
    let root_ca = X509::from_pem(&root_ca_pem).context("parsing root CA certificate")?;
    if let Some(cn) = root_ca
        .subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
    {
        info!("Loaded root CA certificate: {}", cn.data().as_utf8()?);
    }

    let chassis = ChassisDescriptor {
        manufacturer: cli.manufacturer.clone(),
        serial_number: cli.serial_number.clone(),
        control_cards: vec![
            ControlCard {
                serial_number: format!("{}A", cli.serial_number),
                slot: 1,
                part_number: format!("{}A", cli.serial_number),
            },
            ControlCard {
                serial_number: format!("{}B", cli.serial_number),
                slot: 2,
                part_number: format!("{}B", cli.serial_number),
            },
        ],
    };
    info!(
        "{} chassis {} starting with SecureOnly = {}",
        chassis.manufacturer, chassis.serial_number, !cli.insecure_boot
    );

    // The active control card makes the request; a fresh nonce binds the
    // signed response to it in secure mode.
    let active_card = chassis.control_cards[0].clone();
    let nonce = if cli.insecure_boot {
        String::new()
    } else {
        generate_nonce()?
    };

    let address = convert_address(&cli.address);
    info!("Connecting to bootz server at {address}");
    let channel = tls::connect(&address, &root_ca_pem, cli.verify_tls_cert).await?;
    let mut client = BootstrapClient::new(channel);

    let request = GetBootstrapDataRequest {
        chassis_descriptor: Some(chassis.clone()),
        control_card_state: Some(ControlCardState {
            serial_number: active_card.serial_number.clone(),
            status: Status::NotInitialized as i32,
        }),
        nonce: nonce.clone(),
    };
    info!("Requesting bootstrap data");
    let response = client
        .get_bootstrap_data(request)
        .await
        .context("calling GetBootstrapData")?
        .into_inner();

    // Only check OV, OC and response signature in secure mode.
    if !cli.insecure_boot {
        validate_artifacts(&cli.serial_number, &nonce, &response, &root_ca_pem)
            .context("validating signed bootstrap data")?;
        info!("Bootstrap response validated");
    }

    let signed = response.signed_response.unwrap_or_default();
    for data in &signed.responses {
        info!("Received config for control card {}", data.serial_num);
        if let Some(image) = &data.intended_image {
            info!(
                "Intended image {} ({}) at {}",
                image.name, image.version, image.url
            );
        }
        if let Some(config) = &data.boot_config {
            info!("Boot config of {} byte(s)", config.vendor_config.len());
        }
    }

    info!("Sending status report");
    let status_report = ReportStatusRequest {
        status: BootstrapStatus::Success as i32,
        status_message: "Bootstrap Success".to_string(),
        states: chassis
            .control_cards
            .iter()
            .map(|card| ControlCardState {
                serial_number: card.serial_number.clone(),
                status: Status::Initialized as i32,
            })
            .collect(),
    };
    client
        .report_status(status_report)
        .await
        .context("calling ReportStatus")?;
    info!("Status report sent");

    Ok(())
}
