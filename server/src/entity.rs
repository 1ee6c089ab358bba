// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! The chassis registry. Maps `(manufacturer, serial_number)` to the entity
//! describing boot mode, control cards, and the bootstrap data template, and
//! binds each chassis to its ownership voucher.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bootz_proto::control_card_state::Status;
use bootz_proto::report_status_request::BootstrapStatus;
use bootz_proto::{BootConfig, ChassisDescriptor, ControlCardState, Credentials, SoftwareImage};
use log::{debug, info};
use thiserror::Error;

use crate::artifacts::{KeyPair, SecurityArtifacts};

pub type OcKeyPair = KeyPair;

#[derive(Debug, Error)]
pub enum EntityError {
    #[error("chassis {manufacturer}/{serial_number} not found in registry")]
    NotFound {
        manufacturer: String,
        serial_number: String,
    },

    #[error("control card {0} is not known for this chassis")]
    UnknownControlCard(String),

    #[error("no ownership voucher for chassis serial {0}")]
    NoOvForChassis(String),

    #[error("registry misconfigured: {0}")]
    Misconfigured(String),
}

/// Primary key of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChassisKey {
    pub manufacturer: String,
    pub serial_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    Insecure,
    Secure,
}

/// A control card slot within a registered chassis, together with the status
/// most recently reported for it.
#[derive(Debug, Clone)]
pub struct ControlCardEntry {
    pub serial_number: String,
    pub slot: u32,
    pub part_number: String,
    pub status: Status,
}

/// Everything the server knows about one chassis.
#[derive(Clone)]
pub struct ChassisEntity {
    pub boot_mode: BootMode,
    pub control_cards: Vec<ControlCardEntry>,
    pub software_image: SoftwareImage,
    pub boot_config: BootConfig,
    pub credentials: Credentials,
    pub pathz_policy: Vec<u8>,
    pub authz_policy: Vec<u8>,
    pub ostype: String,
}

/// The capability the bootstrap service consumes. `EntityManager` is the one
/// concrete implementation; tests substitute their own.
pub trait EntityResolver: Send + Sync + 'static {
    /// Exact-match lookup on `(manufacturer, serial_number)`. Every control
    /// card listed in the descriptor must be present in the stored entity.
    fn resolve(&self, descriptor: &ChassisDescriptor) -> Result<ChassisEntity, EntityError>;

    /// The base64 CMS voucher blob bound to this chassis serial.
    fn ov_for(&self, chassis_serial: &str) -> Result<String, EntityError>;

    /// The ownership certificate keypair used to sign bootstrap responses.
    fn oc_keypair(&self) -> Result<OcKeyPair, EntityError>;

    /// Record a status report against each listed control card. Repeated
    /// reports overwrite, last writer wins per card.
    fn record_status(
        &self,
        status: BootstrapStatus,
        status_message: &str,
        states: &[ControlCardState],
    ) -> Result<(), EntityError>;
}

pub struct EntityManager {
    artifacts: Arc<SecurityArtifacts>,
    chassis: RwLock<HashMap<ChassisKey, ChassisEntity>>,
}

impl EntityManager {
    /// Construct an empty registry backed by the loaded security artifacts.
    pub fn new(artifacts: Arc<SecurityArtifacts>) -> Self {
        Self {
            artifacts,
            chassis: RwLock::new(HashMap::new()),
        }
    }

    /// Admin surface: start registering a chassis. The returned builder is
    /// committed with [`ChassisBuilder::register`].
    pub fn add_chassis(
        &self,
        boot_mode: BootMode,
        manufacturer: impl Into<String>,
        serial_number: impl Into<String>,
    ) -> ChassisBuilder<'_> {
        ChassisBuilder {
            manager: self,
            key: ChassisKey {
                manufacturer: manufacturer.into(),
                serial_number: serial_number.into(),
            },
            entity: ChassisEntity {
                boot_mode,
                control_cards: Vec::new(),
                software_image: SoftwareImage::default(),
                boot_config: BootConfig::default(),
                credentials: Credentials::default(),
                pathz_policy: Vec::new(),
                authz_policy: Vec::new(),
                ostype: String::new(),
            },
        }
    }

    pub fn chassis_count(&self) -> usize {
        self.read_lock().len()
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ChassisKey, ChassisEntity>> {
        self.chassis.read().expect("chassis registry lock poisoned")
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<ChassisKey, ChassisEntity>> {
        self.chassis
            .write()
            .expect("chassis registry lock poisoned")
    }
}

impl EntityResolver for EntityManager {
    fn resolve(&self, descriptor: &ChassisDescriptor) -> Result<ChassisEntity, EntityError> {
        let key = ChassisKey {
            manufacturer: descriptor.manufacturer.clone(),
            serial_number: descriptor.serial_number.clone(),
        };
        let chassis = self.read_lock();
        let entity = chassis.get(&key).ok_or_else(|| EntityError::NotFound {
            manufacturer: key.manufacturer.clone(),
            serial_number: key.serial_number.clone(),
        })?;

        for card in &descriptor.control_cards {
            if !entity
                .control_cards
                .iter()
                .any(|known| known.serial_number == card.serial_number)
            {
                return Err(EntityError::UnknownControlCard(card.serial_number.clone()));
            }
        }

        Ok(entity.clone())
    }

    fn ov_for(&self, chassis_serial: &str) -> Result<String, EntityError> {
        self.artifacts
            .ovs
            .get(chassis_serial)
            .cloned()
            .ok_or_else(|| EntityError::NoOvForChassis(chassis_serial.to_string()))
    }

    fn oc_keypair(&self) -> Result<OcKeyPair, EntityError> {
        Ok(self.artifacts.oc.clone())
    }

    fn record_status(
        &self,
        status: BootstrapStatus,
        status_message: &str,
        states: &[ControlCardState],
    ) -> Result<(), EntityError> {
        let mut chassis = self.write_lock();
        for state in states {
            let card = chassis
                .values_mut()
                .flat_map(|entity| entity.control_cards.iter_mut())
                .find(|card| card.serial_number == state.serial_number)
                .ok_or_else(|| EntityError::UnknownControlCard(state.serial_number.clone()))?;
            card.status = state.status();
            debug!(
                "Recorded status {} for control card {}",
                state.status().as_str_name(),
                state.serial_number
            );
        }
        info!(
            "Status report {}: {status_message}",
            status.as_str_name()
        );
        Ok(())
    }
}

pub struct ChassisBuilder<'a> {
    manager: &'a EntityManager,
    key: ChassisKey,
    entity: ChassisEntity,
}

impl ChassisBuilder<'_> {
    /// Add a control card. Slots are assigned in insertion order starting at 1.
    pub fn add_control_card(mut self, serial_number: impl Into<String>) -> Self {
        let serial_number = serial_number.into();
        let slot = self.entity.control_cards.len() as u32 + 1;
        self.entity.control_cards.push(ControlCardEntry {
            part_number: serial_number.clone(),
            serial_number,
            slot,
            status: Status::Unspecified,
        });
        self
    }

    pub fn software_image(mut self, image: SoftwareImage) -> Self {
        self.entity.software_image = image;
        self
    }

    pub fn boot_config(mut self, config: BootConfig) -> Self {
        self.entity.boot_config = config;
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.entity.credentials = credentials;
        self
    }

    pub fn policies(mut self, pathz: Vec<u8>, authz: Vec<u8>) -> Self {
        self.entity.pathz_policy = pathz;
        self.entity.authz_policy = authz;
        self
    }

    pub fn ostype(mut self, ostype: impl Into<String>) -> Self {
        self.entity.ostype = ostype.into();
        self
    }

    /// Commit the chassis into the registry. A chassis must have at least one
    /// control card; re-registering a key replaces the previous entity.
    pub fn register(self) -> Result<(), EntityError> {
        if self.entity.control_cards.is_empty() {
            return Err(EntityError::Misconfigured(format!(
                "chassis {} has no control cards",
                self.key.serial_number
            )));
        }
        debug!(
            "Registered {} chassis {} with {} control card(s)",
            self.key.manufacturer,
            self.key.serial_number,
            self.entity.control_cards.len()
        );
        self.manager.write_lock().insert(self.key, self.entity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootz_proto::ControlCard;
    use std::collections::HashMap;

    fn empty_artifacts() -> Arc<SecurityArtifacts> {
        let dummy = KeyPair {
            cert_pem: Vec::new(),
            key_pem: Vec::new(),
        };
        let mut ovs = HashMap::new();
        ovs.insert("123".to_string(), "b2JibGU=".to_string());
        Arc::new(SecurityArtifacts {
            oc: dummy.clone(),
            pdc: dummy.clone(),
            vendor_ca: dummy,
            ovs,
        })
    }

    fn manager_with_chassis() -> EntityManager {
        let manager = EntityManager::new(empty_artifacts());
        manager
            .add_chassis(BootMode::Secure, "Cisco", "123")
            .add_control_card("123A")
            .add_control_card("123B")
            .register()
            .unwrap();
        manager
    }

    fn descriptor(cards: &[&str]) -> ChassisDescriptor {
        ChassisDescriptor {
            manufacturer: "Cisco".to_string(),
            serial_number: "123".to_string(),
            control_cards: cards
                .iter()
                .enumerate()
                .map(|(i, serial)| ControlCard {
                    serial_number: serial.to_string(),
                    slot: i as u32 + 1,
                    part_number: serial.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn resolve_known_chassis() {
        let manager = manager_with_chassis();
        let entity = manager.resolve(&descriptor(&["123A", "123B"])).unwrap();
        assert_eq!(entity.boot_mode, BootMode::Secure);
        assert_eq!(entity.control_cards.len(), 2);
        assert_eq!(entity.control_cards[0].slot, 1);
        assert_eq!(entity.control_cards[1].slot, 2);
    }

    #[test]
    fn resolve_unknown_chassis() {
        let manager = manager_with_chassis();
        let mut desc = descriptor(&[]);
        desc.serial_number = "999".to_string();
        assert!(matches!(
            manager.resolve(&desc),
            Err(EntityError::NotFound { .. })
        ));
    }

    #[test]
    fn resolve_unknown_control_card() {
        let manager = manager_with_chassis();
        assert!(matches!(
            manager.resolve(&descriptor(&["123A", "999Z"])),
            Err(EntityError::UnknownControlCard(serial)) if serial == "999Z"
        ));
    }

    #[test]
    fn ov_lookup() {
        let manager = manager_with_chassis();
        assert_eq!(manager.ov_for("123").unwrap(), "b2JibGU=");
        assert!(matches!(
            manager.ov_for("456"),
            Err(EntityError::NoOvForChassis(serial)) if serial == "456"
        ));
    }

    #[test]
    fn chassis_without_cards_is_rejected() {
        let manager = EntityManager::new(empty_artifacts());
        let err = manager
            .add_chassis(BootMode::Secure, "Cisco", "123")
            .register()
            .unwrap_err();
        assert!(matches!(err, EntityError::Misconfigured(_)));
    }

    fn state(serial: &str, status: Status) -> ControlCardState {
        ControlCardState {
            serial_number: serial.to_string(),
            status: status as i32,
        }
    }

    #[test]
    fn record_status_is_idempotent() {
        let manager = manager_with_chassis();
        let states = vec![
            state("123A", Status::Initialized),
            state("123B", Status::Initialized),
        ];
        manager
            .record_status(BootstrapStatus::Success, "ok", &states)
            .unwrap();
        manager
            .record_status(BootstrapStatus::Success, "ok", &states)
            .unwrap();

        let entity = manager.resolve(&descriptor(&[])).unwrap();
        assert!(entity
            .control_cards
            .iter()
            .all(|card| card.status == Status::Initialized));
    }

    #[test]
    fn record_status_last_writer_wins() {
        let manager = manager_with_chassis();
        manager
            .record_status(
                BootstrapStatus::Success,
                "ok",
                &[state("123A", Status::Initialized)],
            )
            .unwrap();
        manager
            .record_status(
                BootstrapStatus::Failure,
                "rollback",
                &[state("123A", Status::NotInitialized)],
            )
            .unwrap();

        let entity = manager.resolve(&descriptor(&[])).unwrap();
        assert_eq!(entity.control_cards[0].status, Status::NotInitialized);
    }

    #[test]
    fn record_status_unknown_card() {
        let manager = manager_with_chassis();
        let err = manager
            .record_status(
                BootstrapStatus::Success,
                "ok",
                &[state("999Z", Status::Initialized)],
            )
            .unwrap_err();
        assert!(matches!(err, EntityError::UnknownControlCard(_)));
    }
}
