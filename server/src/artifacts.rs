// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Startup loader for the long-lived security artifacts: the ownership
//! certificate, the pinned domain certificate, the vendor CA, and the set of
//! ownership vouchers. Everything is parsed and cross-checked once at startup
//! and the store is immutable afterwards.

use std::collections::HashMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info};
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use thiserror::Error;

const OV_PREFIX: &str = "ov_";
const OV_SUFFIX: &str = ".txt";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {name} from artifact directory: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {name}: {source}")]
    Unparseable {
        name: String,
        #[source]
        source: openssl::error::ErrorStack,
    },

    #[error("certificate and private key of {0} do not match")]
    KeyMismatch(String),

    #[error("ownership voucher {name} is not valid base64: {source}")]
    OvNotBase64 {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("no ownership vouchers (ov_<serial>.txt) found in artifact directory")]
    EmptyOvSet,
}

/// A PEM keypair held in memory, pre-validated at load time.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

/// In-memory holder of the server's long-lived keys and certificates.
#[derive(Debug)]
pub struct SecurityArtifacts {
    pub oc: KeyPair,
    pub pdc: KeyPair,
    pub vendor_ca: KeyPair,
    /// Base64 CMS voucher blobs indexed by chassis serial.
    pub ovs: HashMap<String, String>,
}

impl SecurityArtifacts {
    /// Load every artifact from `dir` using the fixed naming scheme
    /// (`oc_pub.pem`, `oc_priv.pem`, ..., `ov_<serial>.txt`). Any missing or
    /// malformed artifact is a startup error.
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        let oc = load_keypair(dir, "oc")?;
        let pdc = load_keypair(dir, "pdc")?;
        let vendor_ca = load_keypair(dir, "vendorca")?;
        let ovs = load_ov_set(dir)?;

        info!(
            "Loaded security artifacts from {}: {} ownership voucher(s)",
            dir.display(),
            ovs.len()
        );

        Ok(Self {
            oc,
            pdc,
            vendor_ca,
            ovs,
        })
    }

    /// The TLS identity the server presents, derived from the PDC keypair.
    pub fn tls_identity(&self) -> tonic::transport::Identity {
        tonic::transport::Identity::from_pem(&self.pdc.cert_pem, &self.pdc.key_pem)
    }
}

fn read_artifact(dir: &Path, name: &str) -> Result<Vec<u8>, ArtifactError> {
    std::fs::read(dir.join(name)).map_err(|source| ArtifactError::Unreadable {
        name: name.to_string(),
        source,
    })
}

/// Load `<stem>_pub.pem` / `<stem>_priv.pem` and check that the certificate
/// actually belongs to the private key.
fn load_keypair(dir: &Path, stem: &str) -> Result<KeyPair, ArtifactError> {
    let cert_name = format!("{stem}_pub.pem");
    let key_name = format!("{stem}_priv.pem");

    let cert_pem = read_artifact(dir, &cert_name)?;
    let key_pem = read_artifact(dir, &key_name)?;

    let cert = X509::from_pem(&cert_pem).map_err(|source| ArtifactError::Unparseable {
        name: cert_name.clone(),
        source,
    })?;
    let key: PKey<Private> =
        PKey::private_key_from_pem(&key_pem).map_err(|source| ArtifactError::Unparseable {
            name: key_name,
            source,
        })?;

    let cert_key = cert
        .public_key()
        .map_err(|source| ArtifactError::Unparseable {
            name: cert_name,
            source,
        })?;
    if !cert_key.public_eq(&key) {
        return Err(ArtifactError::KeyMismatch(stem.to_string()));
    }

    debug!("Loaded {stem} keypair");
    Ok(KeyPair { cert_pem, key_pem })
}

/// Discover every `ov_<serial>.txt` in `dir`, sanity-decode the base64 body,
/// and index the blobs by the serial extracted from the file name.
fn load_ov_set(dir: &Path) -> Result<HashMap<String, String>, ArtifactError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ArtifactError::Unreadable {
        name: dir.display().to_string(),
        source,
    })?;

    let mut ovs = HashMap::new();
    for entry in entries {
        let entry = entry.map_err(|source| ArtifactError::Unreadable {
            name: dir.display().to_string(),
            source,
        })?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(serial) = file_name
            .strip_prefix(OV_PREFIX)
            .and_then(|rest| rest.strip_suffix(OV_SUFFIX))
        else {
            continue;
        };

        let blob = read_artifact(dir, &file_name)?;
        let blob = String::from_utf8_lossy(&blob).trim().to_string();
        STANDARD
            .decode(&blob)
            .map_err(|source| ArtifactError::OvNotBase64 {
                name: file_name.clone(),
                source,
            })?;

        debug!("Loaded ownership voucher for serial {serial}");
        ovs.insert(serial.to_string(), blob);
    }

    if ovs.is_empty() {
        return Err(ArtifactError::EmptyOvSet);
    }
    Ok(ovs)
}
