// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Chassis inventory configuration. The registry is populated either from a
//! TOML file given with `--inventory`, or, when none is given, derived from
//! the loaded ownership voucher set the way the reference implementation's
//! fixed test inventory does.

use std::path::Path;

use bootz_proto::{BootConfig, Credentials, SoftwareImage};
use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::artifacts::SecurityArtifacts;
use crate::entity::{BootMode, EntityError, EntityManager};

const DEFAULT_MANUFACTURER: &str = "Cisco";
const DEFAULT_OSTYPE: &str = "bootz-os";

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read inventory file: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("failed to parse inventory file: {0}")]
    Unparseable(#[from] toml::de::Error),

    #[error(transparent)]
    Entity(#[from] EntityError),
}

#[derive(Debug, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub chassis: Vec<ChassisConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ChassisConfig {
    pub manufacturer: String,
    pub serial_number: String,
    #[serde(default)]
    pub insecure_boot: bool,
    pub control_cards: Vec<String>,
    #[serde(default)]
    pub software_image: Option<ImageConfig>,
    #[serde(default)]
    pub boot_config: Option<BootConfigEntry>,
    #[serde(default)]
    pub boot_password_hash: Option<String>,
    #[serde(default)]
    pub ostype: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageConfig {
    pub name: String,
    pub version: String,
    pub url: String,
    pub os_image_hash: String,
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BootConfigEntry {
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub vendor_config: String,
}

fn default_hash_algorithm() -> String {
    "SHA256".to_string()
}

impl Inventory {
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// One secure-mode chassis per voucher serial, with `<serial>A` and
    /// `<serial>B` control cards. Matches the reference test inventory.
    pub fn default_from_artifacts(artifacts: &SecurityArtifacts) -> Self {
        let mut serials: Vec<&String> = artifacts.ovs.keys().collect();
        serials.sort();
        Self {
            chassis: serials
                .into_iter()
                .map(|serial| ChassisConfig {
                    manufacturer: DEFAULT_MANUFACTURER.to_string(),
                    serial_number: serial.clone(),
                    insecure_boot: false,
                    control_cards: vec![format!("{serial}A"), format!("{serial}B")],
                    software_image: None,
                    boot_config: None,
                    boot_password_hash: None,
                    ostype: None,
                })
                .collect(),
        }
    }

    /// Register every configured chassis into the manager.
    pub fn apply(&self, manager: &EntityManager) -> Result<(), InventoryError> {
        for chassis in &self.chassis {
            let boot_mode = if chassis.insecure_boot {
                BootMode::Insecure
            } else {
                BootMode::Secure
            };

            let image = match &chassis.software_image {
                Some(image) => SoftwareImage {
                    name: image.name.clone(),
                    version: image.version.clone(),
                    url: image.url.clone(),
                    os_image_hash: image.os_image_hash.clone(),
                    hash_algorithm: image.hash_algorithm.clone(),
                },
                None => SoftwareImage {
                    name: "bootz-os.img".to_string(),
                    version: "1.0.0".to_string(),
                    url: "https://localhost:3000/bootz-os.img".to_string(),
                    os_image_hash: String::new(),
                    hash_algorithm: default_hash_algorithm(),
                },
            };

            let boot_config = chassis
                .boot_config
                .as_ref()
                .map(|config| BootConfig {
                    metadata: config.metadata.clone().into_bytes(),
                    vendor_config: config.vendor_config.clone().into_bytes(),
                })
                .unwrap_or_default();

            let credentials = Credentials {
                boot_password_hash: chassis.boot_password_hash.clone().unwrap_or_default(),
                failsafe_boot_password_hash: String::new(),
            };

            let mut builder = manager
                .add_chassis(boot_mode, &chassis.manufacturer, &chassis.serial_number)
                .software_image(image)
                .boot_config(boot_config)
                .credentials(credentials)
                .ostype(chassis.ostype.clone().unwrap_or_else(|| DEFAULT_OSTYPE.to_string()));
            for card in &chassis.control_cards {
                builder = builder.add_control_card(card);
            }
            builder.register()?;
        }

        info!("Registered {} chassis from inventory", self.chassis.len());
        Ok(())
    }
}
