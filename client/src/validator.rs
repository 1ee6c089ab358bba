// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Verification of the signed artifacts in a bootstrap response.
//!
//! The device trusts exactly one thing out of the box: the manufacturer CA
//! burned in at build time. Everything else is established here, in order:
//! the ownership voucher must be CMS-signed by that CA and bound to this
//! chassis serial, the ownership certificate must chain to the domain cert
//! the vendor pinned into the voucher, and the response itself must carry a
//! valid signature from the ownership certificate's key. Validation stops at
//! the first failure and never attempts to repair an artifact.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bootz_proto::GetBootstrapDataResponse;
use chrono::{DateTime, Utc};
use log::{debug, info};
use openssl::hash::MessageDigest;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::Id;
use openssl::sign::Verifier;
use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::{X509StoreContext, X509};
use prost::Message;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bootstrap response is missing the {0}")]
    MissingArtifact(&'static str),

    #[error("ownership voucher is malformed: {0}")]
    OvMalformed(String),

    #[error("ownership voucher payload is malformed: {0}")]
    OvPayloadMalformed(String),

    #[error("ownership voucher does not chain to the vendor CA")]
    OvUntrusted,

    #[error("ownership voucher is issued for serial {found}, not chassis serial {expected}")]
    SerialMismatch { expected: String, found: String },

    #[error("ownership voucher validity window does not cover the current time")]
    OvExpired,

    #[error("ownership certificate does not chain to the pinned domain cert")]
    OcUntrusted,

    #[error("unsupported ownership certificate key type {0}; only RSA is supported")]
    UnsupportedKey(String),

    #[error("response signature did not verify against the signed response")]
    SignatureInvalid,

    #[error("nonce in the signed response does not match the request nonce")]
    NonceMismatch,

    #[error("internal crypto failure: {0}")]
    Internal(#[from] openssl::error::ErrorStack),
}

/// An RFC 8366 ownership voucher, as carried in the CMS content payload.
#[derive(Debug, Deserialize)]
pub struct OwnershipVoucher {
    #[serde(rename = "ietf-voucher:voucher")]
    pub voucher: VoucherInner,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VoucherInner {
    pub created_on: String,
    pub expires_on: String,
    pub serial_number: String,
    #[serde(default)]
    pub assertion: String,
    /// Base64 DER certificate body, without PEM armor.
    pub pinned_domain_cert: String,
    #[serde(default)]
    pub domain_cert_revocation_checks: bool,
}

fn single_cert_store(cert: X509) -> Result<X509Store, openssl::error::ErrorStack> {
    let mut builder = X509StoreBuilder::new()?;
    builder.add_cert(cert)?;
    Ok(builder.build())
}

/// Check the signed artifacts in a `GetBootstrapDataResponse`:
///
/// - the ownership voucher is CMS-signed by the manufacturer CA;
/// - the voucher's serial matches the chassis serial of the request;
/// - the ownership certificate chains to the voucher's pinned domain cert;
/// - the response signature verifies with the ownership certificate's key;
/// - the signed response echoes the request nonce bit-identically.
///
/// Returns at the first failing check. Callers in insecure boot mode skip
/// this entirely.
pub fn validate_artifacts(
    chassis_serial: &str,
    nonce: &str,
    response: &GetBootstrapDataResponse,
    vendor_ca_pem: &[u8],
) -> Result<(), ValidationError> {
    if response.ownership_voucher.is_empty() {
        return Err(ValidationError::MissingArtifact("ownership voucher"));
    }
    if response.ownership_certificate.is_empty() {
        return Err(ValidationError::MissingArtifact("ownership certificate"));
    }
    if response.response_signature.is_empty() {
        return Err(ValidationError::MissingArtifact("response signature"));
    }
    let signed = response
        .signed_response
        .as_ref()
        .ok_or(ValidationError::MissingArtifact("signed response"))?;

    // Decode the voucher and parse the CMS envelope.
    let ov_der = STANDARD
        .decode(&response.ownership_voucher)
        .map_err(|err| ValidationError::OvMalformed(err.to_string()))?;
    let cms = Pkcs7::from_der(&ov_der)
        .map_err(|err| ValidationError::OvMalformed(err.to_string()))?;

    // Pull the content payload out without trusting anything yet.
    let no_signers = Stack::new()?;
    let empty_store = X509StoreBuilder::new()?.build();
    let mut payload = Vec::new();
    cms.verify(
        &no_signers,
        &empty_store,
        None,
        Some(&mut payload),
        Pkcs7Flags::NOVERIFY | Pkcs7Flags::NOSIGS,
    )
    .map_err(|err| ValidationError::OvMalformed(err.to_string()))?;
    let ov: OwnershipVoucher = serde_json::from_slice(&payload)
        .map_err(|err| ValidationError::OvPayloadMalformed(err.to_string()))?;
    debug!("Parsed ownership voucher for serial {}", ov.voucher.serial_number);

    // The voucher must be signed by the manufacturer: verify the CMS signer
    // against a pool containing only the vendor CA.
    let vendor_ca = X509::from_pem(vendor_ca_pem)?;
    let vendor_store = single_cert_store(vendor_ca)?;
    cms.verify(&no_signers, &vendor_store, None, None, Pkcs7Flags::empty())
        .map_err(|_| ValidationError::OvUntrusted)?;
    info!("Validated ownership voucher signed by vendor");

    if ov.voucher.serial_number != chassis_serial {
        return Err(ValidationError::SerialMismatch {
            expected: chassis_serial.to_string(),
            found: ov.voucher.serial_number,
        });
    }

    let created_on = DateTime::parse_from_rfc3339(&ov.voucher.created_on)
        .map_err(|err| ValidationError::OvPayloadMalformed(err.to_string()))?
        .with_timezone(&Utc);
    let expires_on = DateTime::parse_from_rfc3339(&ov.voucher.expires_on)
        .map_err(|err| ValidationError::OvPayloadMalformed(err.to_string()))?
        .with_timezone(&Utc);
    let now = Utc::now();
    if now < created_on || now > expires_on {
        return Err(ValidationError::OvExpired);
    }

    // The pinned domain cert travels as a bare base64 DER body.
    let pdc_der = STANDARD
        .decode(
            ov.voucher
                .pinned_domain_cert
                .split_whitespace()
                .collect::<String>(),
        )
        .map_err(|err| ValidationError::OvPayloadMalformed(err.to_string()))?;
    let pdc = X509::from_der(&pdc_der)
        .map_err(|err| ValidationError::OvPayloadMalformed(err.to_string()))?;

    // The ownership certificate must chain to the PDC, and nothing else.
    let oc = X509::from_pem(&response.ownership_certificate)
        .map_err(|_| ValidationError::OcUntrusted)?;
    let pdc_store = single_cert_store(pdc)?;
    let intermediates = Stack::new()?;
    let mut ctx = X509StoreContext::new()?;
    let oc_trusted = ctx.init(&pdc_store, &oc, &intermediates, |c| c.verify_cert())?;
    if !oc_trusted {
        return Err(ValidationError::OcUntrusted);
    }
    info!("Validated ownership certificate with OV PDC");

    // Verify the response signature with the OC public key. Only RSA
    // (PKCS#1 v1.5 over SHA-256) is supported.
    let oc_key = oc.public_key()?;
    if oc_key.id() != Id::RSA {
        return Err(ValidationError::UnsupportedKey(format!("{:?}", oc_key.id())));
    }
    let signed_bytes = signed.encode_to_vec();
    let signature = STANDARD
        .decode(&response.response_signature)
        .map_err(|_| ValidationError::SignatureInvalid)?;
    let mut verifier = Verifier::new(MessageDigest::sha256(), &oc_key)?;
    if !verifier
        .verify_oneshot(&signature, &signed_bytes)
        .unwrap_or(false)
    {
        return Err(ValidationError::SignatureInvalid);
    }
    info!("Verified signed response signature");

    if signed.nonce != nonce {
        return Err(ValidationError::NonceMismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootz_proto::{
        BootConfig, BootstrapDataResponse, BootstrapDataSigned, Credentials, SoftwareImage,
    };
    use bootz_test_utils::{make_cert, make_ec_key, make_rsa_key, TestPki};
    use chrono::Duration;
    use openssl::pkey::{PKeyRef, Private};
    use openssl::sign::Signer;

    const NONCE: &str = "dGhpc2lzYW5vbmNlMTY=";

    fn record(serial: &str) -> BootstrapDataResponse {
        BootstrapDataResponse {
            serial_num: serial.to_string(),
            intended_image: Some(SoftwareImage {
                name: "bootz-os.img".to_string(),
                version: "1.0.0".to_string(),
                url: "https://localhost:3000/bootz-os.img".to_string(),
                os_image_hash: "feedc0de".to_string(),
                hash_algorithm: "SHA256".to_string(),
            }),
            boot_config: Some(BootConfig {
                metadata: b"meta".to_vec(),
                vendor_config: b"interface Loopback0".to_vec(),
            }),
            credentials: Some(Credentials::default()),
            pathz_policy: Vec::new(),
            authz_policy: Vec::new(),
        }
    }

    fn sign_with(key: &PKeyRef<Private>, payload: &[u8]) -> String {
        let mut signer = Signer::new(MessageDigest::sha256(), key).unwrap();
        STANDARD.encode(signer.sign_oneshot_to_vec(payload).unwrap())
    }

    fn secure_response(pki: &TestPki, serial: &str, nonce: &str) -> GetBootstrapDataResponse {
        let signed = BootstrapDataSigned {
            responses: vec![record(&format!("{serial}A")), record(&format!("{serial}B"))],
            nonce: nonce.to_string(),
            ostype: "bootz-os".to_string(),
            serial_num: serial.to_string(),
        };
        let signature = sign_with(pki.oc().1, &signed.encode_to_vec());
        GetBootstrapDataResponse {
            signed_response: Some(signed),
            ownership_certificate: pki.oc_cert_pem(),
            ownership_voucher: pki.ownership_voucher(serial).into_bytes(),
            response_signature: signature,
        }
    }

    #[test]
    fn happy_path() {
        let pki = TestPki::generate();
        let response = secure_response(&pki, "123", NONCE);
        validate_artifacts("123", NONCE, &response, &pki.vendor_ca_cert_pem()).unwrap();
    }

    #[test]
    fn missing_artifacts_are_rejected() {
        let pki = TestPki::generate();
        let vendor_ca = pki.vendor_ca_cert_pem();

        let mut response = secure_response(&pki, "123", NONCE);
        response.ownership_voucher.clear();
        assert!(matches!(
            validate_artifacts("123", NONCE, &response, &vendor_ca),
            Err(ValidationError::MissingArtifact("ownership voucher"))
        ));

        let mut response = secure_response(&pki, "123", NONCE);
        response.ownership_certificate.clear();
        assert!(matches!(
            validate_artifacts("123", NONCE, &response, &vendor_ca),
            Err(ValidationError::MissingArtifact("ownership certificate"))
        ));

        let mut response = secure_response(&pki, "123", NONCE);
        response.response_signature.clear();
        assert!(matches!(
            validate_artifacts("123", NONCE, &response, &vendor_ca),
            Err(ValidationError::MissingArtifact("response signature"))
        ));
    }

    #[test]
    fn voucher_serial_must_match_chassis() {
        let pki = TestPki::generate();
        let mut response = secure_response(&pki, "123", NONCE);
        response.ownership_voucher = pki.ownership_voucher("999").into_bytes();

        assert!(matches!(
            validate_artifacts("123", NONCE, &response, &pki.vendor_ca_cert_pem()),
            Err(ValidationError::SerialMismatch { expected, found })
                if expected == "123" && found == "999"
        ));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let pki = TestPki::generate();
        let mut response = secure_response(&pki, "123", NONCE);
        // Flip one bit in the decoded signature and re-encode it.
        let mut raw = STANDARD.decode(&response.response_signature).unwrap();
        raw[0] ^= 0x01;
        response.response_signature = STANDARD.encode(raw);

        assert!(matches!(
            validate_artifacts("123", NONCE, &response, &pki.vendor_ca_cert_pem()),
            Err(ValidationError::SignatureInvalid)
        ));
    }

    #[test]
    fn tampered_signed_response_is_rejected() {
        let pki = TestPki::generate();
        let mut response = secure_response(&pki, "123", NONCE);
        response.signed_response.as_mut().unwrap().ostype = "other-os".to_string();

        assert!(matches!(
            validate_artifacts("123", NONCE, &response, &pki.vendor_ca_cert_pem()),
            Err(ValidationError::SignatureInvalid)
        ));
    }

    #[test]
    fn stale_nonce_is_rejected() {
        let pki = TestPki::generate();
        // Server echoes a nonce from a previous run.
        let response = secure_response(&pki, "123", "c3RhbGUtbm9uY2U=");

        assert!(matches!(
            validate_artifacts("123", NONCE, &response, &pki.vendor_ca_cert_pem()),
            Err(ValidationError::NonceMismatch)
        ));
    }

    #[test]
    fn voucher_from_wrong_vendor_is_rejected() {
        let pki = TestPki::generate();
        let rogue_key = make_rsa_key();
        let rogue_ca = make_cert("Rogue Vendor CA", true, &rogue_key, None);
        let mut response = secure_response(&pki, "123", NONCE);
        response.ownership_voucher = pki
            .voucher_signed_by("123", &rogue_ca, &rogue_key)
            .into_bytes();

        assert!(matches!(
            validate_artifacts("123", NONCE, &response, &pki.vendor_ca_cert_pem()),
            Err(ValidationError::OvUntrusted)
        ));
    }

    #[test]
    fn corrupted_voucher_is_rejected() {
        let pki = TestPki::generate();
        let mut response = secure_response(&pki, "123", NONCE);
        let mut der = STANDARD.decode(&response.ownership_voucher).unwrap();
        let mid = der.len() / 2;
        der[mid] ^= 0xff;
        response.ownership_voucher = STANDARD.encode(der).into_bytes();

        let err =
            validate_artifacts("123", NONCE, &response, &pki.vendor_ca_cert_pem()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OvMalformed(_)
                | ValidationError::OvPayloadMalformed(_)
                | ValidationError::OvUntrusted
        ));
    }

    #[test]
    fn expired_voucher_is_rejected() {
        let pki = TestPki::generate();
        let created = (Utc::now() - Duration::days(730)).to_rfc3339();
        let expired = (Utc::now() - Duration::days(365)).to_rfc3339();
        let mut response = secure_response(&pki, "123", NONCE);
        response.ownership_voucher = pki
            .ownership_voucher_with_window("123", &created, &expired)
            .into_bytes();

        assert!(matches!(
            validate_artifacts("123", NONCE, &response, &pki.vendor_ca_cert_pem()),
            Err(ValidationError::OvExpired)
        ));
    }

    #[test]
    fn oc_not_chaining_to_pdc_is_rejected() {
        let pki = TestPki::generate();
        // An OC issued by the vendor CA instead of the PDC must be refused.
        let (vendor_cert, vendor_key) = pki.vendor_ca();
        let stray_key = make_rsa_key();
        let stray_oc = make_cert(
            "Stray Ownership Certificate",
            false,
            &stray_key,
            Some((vendor_cert, vendor_key)),
        );
        let mut response = secure_response(&pki, "123", NONCE);
        response.ownership_certificate = stray_oc.to_pem().unwrap();
        let signed = response.signed_response.as_ref().unwrap().clone();
        response.response_signature = sign_with(&stray_key, &signed.encode_to_vec());

        assert!(matches!(
            validate_artifacts("123", NONCE, &response, &pki.vendor_ca_cert_pem()),
            Err(ValidationError::OcUntrusted)
        ));
    }

    #[test]
    fn non_rsa_oc_key_is_refused() {
        let pki = TestPki::generate();
        let (pdc_cert, pdc_key) = pki.pdc();
        let ec_key = make_ec_key();
        let ec_oc = make_cert(
            "EC Ownership Certificate",
            false,
            &ec_key,
            Some((pdc_cert, pdc_key)),
        );
        let mut response = secure_response(&pki, "123", NONCE);
        response.ownership_certificate = ec_oc.to_pem().unwrap();

        assert!(matches!(
            validate_artifacts("123", NONCE, &response, &pki.vendor_ca_cert_pem()),
            Err(ValidationError::UnsupportedKey(_))
        ));
    }

    #[test]
    fn error_text_names_the_kind() {
        let err = ValidationError::NonceMismatch;
        assert_eq!(
            err.to_string(),
            "nonce in the signed response does not match the request nonce"
        );
    }
}
