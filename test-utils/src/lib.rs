// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Test-only PKI: generates the vendor CA, pinned domain cert, ownership
//! certificate, and CMS-wrapped ownership vouchers the bootstrap protocol
//! revolves around, and can lay them out as a server artifact directory.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, SecondsFormat, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::extension::BasicConstraints;
use openssl::x509::{X509NameBuilder, X509Ref, X509};

pub struct TestPki {
    vendor_ca_cert: X509,
    vendor_ca_key: PKey<Private>,
    pdc_cert: X509,
    pdc_key: PKey<Private>,
    oc_cert: X509,
    oc_key: PKey<Private>,
}

/// Build a CA or leaf certificate. `issuer` of `None` means self-signed.
pub fn make_cert(
    common_name: &str,
    is_ca: bool,
    key: &PKeyRef<Private>,
    issuer: Option<(&X509Ref, &PKeyRef<Private>)>,
) -> X509 {
    let mut name = X509NameBuilder::new().expect("name builder");
    name.append_entry_by_nid(Nid::COMMONNAME, common_name)
        .expect("append CN");
    let name = name.build();

    let mut builder = X509::builder().expect("cert builder");
    builder.set_version(2).expect("set version");
    let serial = {
        let mut bn = BigNum::new().expect("bignum");
        bn.rand(159, MsbOption::MAYBE_ZERO, false).expect("rand serial");
        bn.to_asn1_integer().expect("asn1 serial")
    };
    builder.set_serial_number(&serial).expect("set serial");
    builder.set_subject_name(&name).expect("set subject");
    match issuer {
        Some((issuer_cert, _)) => builder
            .set_issuer_name(issuer_cert.subject_name())
            .expect("set issuer"),
        None => builder.set_issuer_name(&name).expect("set issuer"),
    }
    builder.set_pubkey(key).expect("set pubkey");
    builder
        .set_not_before(&Asn1Time::days_from_now(0).expect("not before"))
        .expect("set not before");
    builder
        .set_not_after(&Asn1Time::days_from_now(365).expect("not after"))
        .expect("set not after");
    let mut constraints = BasicConstraints::new();
    if is_ca {
        constraints.critical().ca();
    }
    builder
        .append_extension(constraints.build().expect("basic constraints"))
        .expect("append extension");
    let signing_key = issuer.map(|(_, key)| key).unwrap_or(key);
    builder
        .sign(signing_key, MessageDigest::sha256())
        .expect("sign cert");
    builder.build()
}

pub fn make_rsa_key() -> PKey<Private> {
    let rsa = Rsa::generate(2048).expect("generate RSA key");
    PKey::from_rsa(rsa).expect("wrap RSA key")
}

pub fn make_ec_key() -> PKey<Private> {
    let group =
        openssl::ec::EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).expect("EC group");
    let ec = openssl::ec::EcKey::generate(&group).expect("generate EC key");
    PKey::from_ec_key(ec).expect("wrap EC key")
}

impl TestPki {
    /// A fresh three-party PKI: self-signed vendor CA, self-signed PDC, and
    /// an OC issued by the PDC.
    pub fn generate() -> Self {
        let vendor_ca_key = make_rsa_key();
        let vendor_ca_cert = make_cert("bootz Vendor CA", true, &vendor_ca_key, None);

        let pdc_key = make_rsa_key();
        let pdc_cert = make_cert("bootz Pinned Domain Cert", true, &pdc_key, None);

        let oc_key = make_rsa_key();
        let oc_cert = make_cert(
            "bootz Ownership Certificate",
            false,
            &oc_key,
            Some((&pdc_cert, &pdc_key)),
        );

        Self {
            vendor_ca_cert,
            vendor_ca_key,
            pdc_cert,
            pdc_key,
            oc_cert,
            oc_key,
        }
    }

    pub fn vendor_ca_cert_pem(&self) -> Vec<u8> {
        self.vendor_ca_cert.to_pem().expect("vendor CA PEM")
    }

    pub fn vendor_ca_key_pem(&self) -> Vec<u8> {
        self.vendor_ca_key
            .private_key_to_pem_pkcs8()
            .expect("vendor CA key PEM")
    }

    pub fn pdc_cert_pem(&self) -> Vec<u8> {
        self.pdc_cert.to_pem().expect("PDC PEM")
    }

    pub fn pdc_key_pem(&self) -> Vec<u8> {
        self.pdc_key.private_key_to_pem_pkcs8().expect("PDC key PEM")
    }

    pub fn oc_cert_pem(&self) -> Vec<u8> {
        self.oc_cert.to_pem().expect("OC PEM")
    }

    pub fn oc_key_pem(&self) -> Vec<u8> {
        self.oc_key.private_key_to_pem_pkcs8().expect("OC key PEM")
    }

    /// RFC 8366 voucher payload for `serial`, pinning this PKI's PDC.
    pub fn voucher_payload(&self, serial: &str) -> Vec<u8> {
        self.voucher_payload_with_window(
            serial,
            &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            &(Utc::now() + Duration::days(365)).to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }

    pub fn voucher_payload_with_window(
        &self,
        serial: &str,
        created_on: &str,
        expires_on: &str,
    ) -> Vec<u8> {
        let pdc_der = self.pdc_cert.to_der().expect("PDC DER");
        let payload = serde_json::json!({
            "ietf-voucher:voucher": {
                "created-on": created_on,
                "expires-on": expires_on,
                "serial-number": serial,
                "assertion": "verified",
                "pinned-domain-cert": STANDARD.encode(pdc_der),
                "domain-cert-revocation-checks": false,
            }
        });
        serde_json::to_vec(&payload).expect("voucher JSON")
    }

    /// A base64 CMS voucher for `serial`, signed by the vendor CA.
    pub fn ownership_voucher(&self, serial: &str) -> String {
        self.sign_voucher(&self.voucher_payload(serial), &self.vendor_ca_cert, &self.vendor_ca_key)
    }

    /// A voucher whose CMS envelope is signed by an arbitrary key, for
    /// untrusted-vendor scenarios.
    pub fn voucher_signed_by(
        &self,
        serial: &str,
        cert: &X509Ref,
        key: &PKeyRef<Private>,
    ) -> String {
        self.sign_voucher(&self.voucher_payload(serial), cert, key)
    }

    /// A vendor-signed voucher with an explicit validity window.
    pub fn ownership_voucher_with_window(
        &self,
        serial: &str,
        created_on: &str,
        expires_on: &str,
    ) -> String {
        self.sign_voucher(
            &self.voucher_payload_with_window(serial, created_on, expires_on),
            &self.vendor_ca_cert,
            &self.vendor_ca_key,
        )
    }

    pub fn vendor_ca(&self) -> (&X509Ref, &PKeyRef<Private>) {
        (&self.vendor_ca_cert, &self.vendor_ca_key)
    }

    pub fn pdc(&self) -> (&X509Ref, &PKeyRef<Private>) {
        (&self.pdc_cert, &self.pdc_key)
    }

    pub fn oc(&self) -> (&X509Ref, &PKeyRef<Private>) {
        (&self.oc_cert, &self.oc_key)
    }

    fn sign_voucher(&self, payload: &[u8], cert: &X509Ref, key: &PKeyRef<Private>) -> String {
        let extra_certs = Stack::new().expect("cert stack");
        let cms = Pkcs7::sign(cert, key, &extra_certs, payload, Pkcs7Flags::empty())
            .expect("CMS sign");
        STANDARD.encode(cms.to_der().expect("CMS DER"))
    }

    /// Lay the PKI out as a server artifact directory, one voucher per serial.
    pub fn write_artifact_dir(&self, dir: &Path, serials: &[&str]) {
        std::fs::write(dir.join("oc_pub.pem"), self.oc_cert_pem()).expect("write oc_pub");
        std::fs::write(dir.join("oc_priv.pem"), self.oc_key_pem()).expect("write oc_priv");
        std::fs::write(dir.join("pdc_pub.pem"), self.pdc_cert_pem()).expect("write pdc_pub");
        std::fs::write(dir.join("pdc_priv.pem"), self.pdc_key_pem()).expect("write pdc_priv");
        std::fs::write(dir.join("vendorca_pub.pem"), self.vendor_ca_cert_pem())
            .expect("write vendorca_pub");
        std::fs::write(dir.join("vendorca_priv.pem"), self.vendor_ca_key_pem())
            .expect("write vendorca_priv");
        for serial in serials {
            std::fs::write(
                dir.join(format!("ov_{serial}.txt")),
                self.ownership_voucher(serial),
            )
            .expect("write voucher");
        }
    }
}
