// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TLS key and certificate material.
//!
//! Both PEM files are read whole into memory at startup and wiped, together
//! with their paths, when the material is dropped. [`TlsMaterial::server_config`]
//! turns them into a rustls server configuration for `axum-server`.

use std::sync::Arc;

use rustls::pki_types::{
    CertificateDer, PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer, PrivateSec1KeyDer,
};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Not enough security files provided")]
    MissingFile,
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid PEM data: {0}")]
    Pem(#[from] pem::PemError),
    #[error("no CERTIFICATE block found in certificate file")]
    NoCertificate,
    #[error("no private key block found in private key file")]
    NoPrivateKey,
    #[error("TLS configuration rejected: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Private key and certificate file contents.
pub struct TlsMaterial {
    private_key_path: Zeroizing<String>,
    certificate_path: Zeroizing<String>,
    private_key: Zeroizing<Vec<u8>>,
    certificate: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("private_key_path", &*self.private_key_path)
            .field("certificate_path", &*self.certificate_path)
            .field("private_key", &format_args!("<{} bytes>", self.private_key.len()))
            .field("certificate", &format_args!("<{} bytes>", self.certificate.len()))
            .finish()
    }
}

impl Zeroize for TlsMaterial {
    fn zeroize(&mut self) {
        self.private_key_path.zeroize();
        self.certificate_path.zeroize();
        self.private_key.zeroize();
        self.certificate.zeroize();
    }
}

// Every field is `Zeroizing`, so dropping the material wipes it.
impl ZeroizeOnDrop for TlsMaterial {}

impl TlsMaterial {
    /// Read both files. Either path being absent or unreadable is an error.
    pub fn load(private_key: Option<&str>, certificate: Option<&str>) -> Result<Self, TlsError> {
        let (Some(private_key_path), Some(certificate_path)) = (private_key, certificate) else {
            return Err(TlsError::MissingFile);
        };

        let material = Self {
            private_key: read(private_key_path)?,
            certificate: read(certificate_path)?,
            private_key_path: Zeroizing::new(private_key_path.to_string()),
            certificate_path: Zeroizing::new(certificate_path.to_string()),
        };

        tracing::debug!(
            private_key = %private_key_path,
            certificate = %certificate_path,
            "TLS material loaded"
        );
        Ok(material)
    }

    /// Load material when both paths are set, or `None` when neither is.
    pub fn from_paths(
        private_key: Option<&str>,
        certificate: Option<&str>,
    ) -> Result<Option<Self>, TlsError> {
        match (private_key, certificate) {
            (None, None) => Ok(None),
            (Some(_), Some(_)) => Self::load(private_key, certificate).map(Some),
            _ => Err(TlsError::MissingFile),
        }
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    pub fn private_key_path(&self) -> &str {
        &self.private_key_path
    }

    pub fn certificate_path(&self) -> &str {
        &self.certificate_path
    }

    /// Build a rustls server configuration from the PEM contents.
    pub fn server_config(&self) -> Result<rustls::ServerConfig, TlsError> {
        let certs = certificate_chain(&self.certificate)?;
        let key = private_key(&self.private_key)?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;
        Ok(config)
    }
}

fn read(path: &str) -> Result<Zeroizing<Vec<u8>>, TlsError> {
    std::fs::read(path)
        .map(Zeroizing::new)
        .map_err(|source| TlsError::Io {
            path: path.to_string(),
            source,
        })
}

fn certificate_chain(pem_bytes: &[u8]) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs: Vec<_> = pem::parse_many(pem_bytes)?
        .into_iter()
        .filter(|block| block.tag() == "CERTIFICATE")
        .map(|block| CertificateDer::from(block.into_contents()))
        .collect();

    if certs.is_empty() {
        return Err(TlsError::NoCertificate);
    }
    Ok(certs)
}

/// First private key in the file. Every decoded block is wiped once
/// inspected, except the DER handed over to rustls.
fn private_key(pem_bytes: &[u8]) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut key = None;

    for block in pem::parse_many(pem_bytes)? {
        let tag = block.tag().to_string();
        let mut der = Zeroizing::new(block.into_contents());
        if key.is_some() {
            continue;
        }
        key = match tag.as_str() {
            "PRIVATE KEY" => Some(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
                std::mem::take(&mut *der),
            ))),
            "RSA PRIVATE KEY" => Some(PrivateKeyDer::Pkcs1(PrivatePkcs1KeyDer::from(
                std::mem::take(&mut *der),
            ))),
            "EC PRIVATE KEY" => Some(PrivateKeyDer::Sec1(PrivateSec1KeyDer::from(
                std::mem::take(&mut *der),
            ))),
            _ => None,
        };
    }

    key.ok_or(TlsError::NoPrivateKey)
}
