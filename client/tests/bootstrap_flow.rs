// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! End-to-end bootstrap flow: artifact directory on disk, server-side entity
//! registry and request handler, client-side artifact validation, and the
//! closing status report.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bootz_client::{validate_artifacts, ValidationError};
use bootz_proto::bootz::bootstrap_server::Bootstrap;
use bootz_proto::control_card_state::Status;
use bootz_proto::report_status_request::BootstrapStatus;
use bootz_proto::{
    ChassisDescriptor, ControlCard, ControlCardState, GetBootstrapDataRequest, ReportStatusRequest,
};
use bootz_server::inventory::Inventory;
use bootz_server::{BootzService, EntityManager, SecurityArtifacts};
use bootz_test_utils::TestPki;
use tonic::Request;

fn nonce() -> String {
    let mut buf = [0u8; 16];
    openssl::rand::rand_bytes(&mut buf).unwrap();
    STANDARD.encode(buf)
}

fn bootstrap_request(serial: &str, nonce: &str) -> GetBootstrapDataRequest {
    GetBootstrapDataRequest {
        chassis_descriptor: Some(ChassisDescriptor {
            manufacturer: "Cisco".to_string(),
            serial_number: serial.to_string(),
            control_cards: vec![
                ControlCard {
                    serial_number: format!("{serial}A"),
                    slot: 1,
                    part_number: format!("{serial}A"),
                },
                ControlCard {
                    serial_number: format!("{serial}B"),
                    slot: 2,
                    part_number: format!("{serial}B"),
                },
            ],
        }),
        control_card_state: Some(ControlCardState {
            serial_number: format!("{serial}A"),
            status: Status::NotInitialized as i32,
        }),
        nonce: nonce.to_string(),
    }
}

fn service_from_dir(dir: &std::path::Path) -> BootzService<EntityManager> {
    let artifacts = Arc::new(SecurityArtifacts::load(dir).unwrap());
    let manager = EntityManager::new(artifacts.clone());
    Inventory::default_from_artifacts(&artifacts)
        .apply(&manager)
        .unwrap();
    BootzService::new(Arc::new(manager))
}

#[tokio::test]
async fn secure_bootstrap_round_trip() {
    let pki = TestPki::generate();
    let dir = tempfile::tempdir().unwrap();
    pki.write_artifact_dir(dir.path(), &["123"]);
    let service = service_from_dir(dir.path());

    let request_nonce = nonce();
    let response = service
        .get_bootstrap_data(Request::new(bootstrap_request("123", &request_nonce)))
        .await
        .unwrap()
        .into_inner();

    // The device accepts the response only after the full chain of checks.
    validate_artifacts(
        "123",
        &request_nonce,
        &response,
        &pki.vendor_ca_cert_pem(),
    )
    .unwrap();

    let signed = response.signed_response.unwrap();
    assert_eq!(signed.nonce, request_nonce);
    assert_eq!(signed.responses.len(), 2);

    // Device installs and reports back.
    let report = ReportStatusRequest {
        status: BootstrapStatus::Success as i32,
        status_message: "Bootstrap Success".to_string(),
        states: vec![
            ControlCardState {
                serial_number: "123A".to_string(),
                status: Status::Initialized as i32,
            },
            ControlCardState {
                serial_number: "123B".to_string(),
                status: Status::Initialized as i32,
            },
        ],
    };
    service.report_status(Request::new(report)).await.unwrap();
}

#[tokio::test]
async fn two_overlapping_requests_both_validate() {
    let pki = TestPki::generate();
    let dir = tempfile::tempdir().unwrap();
    pki.write_artifact_dir(dir.path(), &["123"]);
    let service = Arc::new(service_from_dir(dir.path()));

    let nonce_a = nonce();
    let nonce_b = nonce();
    let (first, second) = tokio::join!(
        {
            let service = Arc::clone(&service);
            let nonce_a = nonce_a.clone();
            async move {
                service
                    .get_bootstrap_data(Request::new(bootstrap_request("123", &nonce_a)))
                    .await
            }
        },
        {
            let service = Arc::clone(&service);
            let nonce_b = nonce_b.clone();
            async move {
                service
                    .get_bootstrap_data(Request::new(bootstrap_request("123", &nonce_b)))
                    .await
            }
        }
    );

    let first = first.unwrap().into_inner();
    let second = second.unwrap().into_inner();
    validate_artifacts("123", &nonce_a, &first, &pki.vendor_ca_cert_pem()).unwrap();
    validate_artifacts("123", &nonce_b, &second, &pki.vendor_ca_cert_pem()).unwrap();
    assert_ne!(
        first.signed_response.unwrap().nonce,
        second.signed_response.unwrap().nonce
    );
}

#[tokio::test]
async fn response_bytes_must_survive_transit_unchanged() {
    let pki = TestPki::generate();
    let dir = tempfile::tempdir().unwrap();
    pki.write_artifact_dir(dir.path(), &["123"]);
    let service = service_from_dir(dir.path());

    let request_nonce = nonce();
    let mut response = service
        .get_bootstrap_data(Request::new(bootstrap_request("123", &request_nonce)))
        .await
        .unwrap()
        .into_inner();

    // Any in-transit change to the signed payload must invalidate it.
    response
        .signed_response
        .as_mut()
        .unwrap()
        .responses[0]
        .serial_num = "123X".to_string();
    let err = validate_artifacts(
        "123",
        &request_nonce,
        &response,
        &pki.vendor_ca_cert_pem(),
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::SignatureInvalid));
}

#[tokio::test]
async fn vendor_ca_mismatch_rejects_the_voucher() {
    let pki = TestPki::generate();
    let other_vendor = TestPki::generate();
    let dir = tempfile::tempdir().unwrap();
    pki.write_artifact_dir(dir.path(), &["123"]);
    let service = service_from_dir(dir.path());

    let request_nonce = nonce();
    let response = service
        .get_bootstrap_data(Request::new(bootstrap_request("123", &request_nonce)))
        .await
        .unwrap()
        .into_inner();

    let err = validate_artifacts(
        "123",
        &request_nonce,
        &response,
        &other_vendor.vendor_ca_cert_pem(),
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::OvUntrusted));
}
