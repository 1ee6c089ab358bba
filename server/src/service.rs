// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! The `bootz.Bootstrap` request handlers.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bootz_proto::bootz::bootstrap_server::Bootstrap;
use bootz_proto::{
    BootstrapDataResponse, BootstrapDataSigned, EmptyResponse, GetBootstrapDataRequest,
    GetBootstrapDataResponse, ReportStatusRequest,
};
use log::{error, info};
use openssl::hash::MessageDigest;
use openssl::pkey::{Id, PKey};
use openssl::sign::Signer;
use prost::Message;
use thiserror::Error;
use tonic::{Request, Response, Status};

use crate::entity::{BootMode, ChassisEntity, EntityError, EntityResolver};

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("ownership certificate key is not an RSA key")]
    UnsupportedKey,

    #[error("signing failed: {0}")]
    Openssl(#[from] openssl::error::ErrorStack),
}

/// RSA-PKCS#1-v1.5 over the SHA-256 digest of `payload`, base64 encoded.
fn sign_response(payload: &[u8], key_pem: &[u8]) -> Result<String, SigningError> {
    let key = PKey::private_key_from_pem(key_pem)?;
    if key.id() != Id::RSA {
        return Err(SigningError::UnsupportedKey);
    }
    let mut signer = Signer::new(MessageDigest::sha256(), &key)?;
    let signature = signer.sign_oneshot_to_vec(payload)?;
    Ok(STANDARD.encode(signature))
}

impl From<EntityError> for Status {
    fn from(err: EntityError) -> Self {
        Status::failed_precondition(err.to_string())
    }
}

pub struct BootzService<E> {
    entities: Arc<E>,
}

impl<E: EntityResolver> BootzService<E> {
    pub fn new(entities: Arc<E>) -> Self {
        Self { entities }
    }

    fn assemble_records(entity: &ChassisEntity) -> Vec<BootstrapDataResponse> {
        entity
            .control_cards
            .iter()
            .map(|card| BootstrapDataResponse {
                serial_num: card.serial_number.clone(),
                intended_image: Some(entity.software_image.clone()),
                boot_config: Some(entity.boot_config.clone()),
                credentials: Some(entity.credentials.clone()),
                pathz_policy: entity.pathz_policy.clone(),
                authz_policy: entity.authz_policy.clone(),
            })
            .collect()
    }
}

#[tonic::async_trait]
impl<E: EntityResolver> Bootstrap for BootzService<E> {
    async fn get_bootstrap_data(
        &self,
        request: Request<GetBootstrapDataRequest>,
    ) -> Result<Response<GetBootstrapDataResponse>, Status> {
        let request = request.into_inner();
        let descriptor = request
            .chassis_descriptor
            .ok_or_else(|| Status::invalid_argument("request carries no chassis descriptor"))?;
        info!(
            "Bootstrap request from {} chassis {} ({} control card(s) listed)",
            descriptor.manufacturer,
            descriptor.serial_number,
            descriptor.control_cards.len()
        );

        let entity = self.entities.resolve(&descriptor)?;
        let mode = entity.boot_mode;
        if mode == BootMode::Secure && request.nonce.is_empty() {
            return Err(Status::invalid_argument(
                "secure-mode bootstrap requires a nonce",
            ));
        }

        let signed = BootstrapDataSigned {
            responses: Self::assemble_records(&entity),
            nonce: request.nonce.clone(),
            ostype: entity.ostype.clone(),
            serial_num: descriptor.serial_number.clone(),
        };

        let mut response = GetBootstrapDataResponse {
            signed_response: Some(signed.clone()),
            ..Default::default()
        };

        if mode == BootMode::Secure {
            let oc = self.entities.oc_keypair()?;
            let payload = signed.encode_to_vec();
            response.response_signature =
                sign_response(&payload, &oc.key_pem).map_err(|err| {
                    error!("Failed to sign bootstrap response: {err}");
                    Status::internal("failed to sign bootstrap response")
                })?;
            response.ownership_certificate = oc.cert_pem;
            response.ownership_voucher = self
                .entities
                .ov_for(&descriptor.serial_number)?
                .into_bytes();
        }

        info!(
            "Returning bootstrap data for chassis {} in {:?} mode",
            descriptor.serial_number, mode
        );
        Ok(Response::new(response))
    }

    async fn report_status(
        &self,
        request: Request<ReportStatusRequest>,
    ) -> Result<Response<EmptyResponse>, Status> {
        let request = request.into_inner();
        self.entities
            .record_status(request.status(), &request.status_message, &request.states)?;
        Ok(Response::new(EmptyResponse {}))
    }
}
