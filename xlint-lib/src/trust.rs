//! Trusted root certificates.
//!
//! The linter is told which roots to trust: either a PEM bundle supplied by
//! the caller or the system trust store. System store discovery follows
//! OpenSSL's lookup behavior via `openssl-probe` and environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use x509_parser::prelude::*;

use crate::XlintError;

/// Well-known CA bundle file paths, in order of preference.
const KNOWN_CA_BUNDLE_PATHS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
    "/etc/pki/tls/certs/ca-bundle.crt",   // RHEL/CentOS/Fedora
    "/etc/ssl/ca-bundle.pem",             // openSUSE
    "/etc/ssl/cert.pem",                  // macOS, Alpine
];

/// A set of trusted root certificates, indexed by raw subject DN.
pub struct TrustStore {
    certs_by_subject: HashMap<Vec<u8>, Vec<Vec<u8>>>,
    count: usize,
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStore")
            .field("count", &self.count)
            .finish()
    }
}

impl TrustStore {
    /// Create an empty trust store.
    pub fn new() -> Self {
        TrustStore {
            certs_by_subject: HashMap::new(),
            count: 0,
        }
    }

    /// Load the system trust store.
    ///
    /// Checks, in order: the `SSL_CERT_FILE` environment variable, the path
    /// discovered by `openssl-probe`, and the well-known bundle paths.
    pub fn system() -> Result<Self, XlintError> {
        let bundle = find_system_ca_bundle().ok_or_else(|| {
            XlintError::VerifyError("no system trust store found".into())
        })?;
        Self::from_pem_file(&bundle)
    }

    /// Create a trust store from a PEM bundle.
    pub fn from_pem(pem_data: &[u8]) -> Result<Self, XlintError> {
        let mut store = TrustStore::new();
        store.add_pem_bundle(pem_data)?;
        Ok(store)
    }

    /// Create a trust store from a PEM file path.
    pub fn from_pem_file(path: &Path) -> Result<Self, XlintError> {
        let data = std::fs::read(path).map_err(|e| {
            XlintError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Self::from_pem(&data)
    }

    /// Add a DER-encoded certificate to the trust store.
    pub fn add_der(&mut self, der: &[u8]) -> Result<(), XlintError> {
        let (_, x509) =
            X509Certificate::from_der(der).map_err(|e| XlintError::DerError(format!("{}", e)))?;

        let subject_raw = x509.subject().as_raw().to_vec();
        self.certs_by_subject
            .entry(subject_raw)
            .or_default()
            .push(der.to_vec());
        self.count += 1;

        Ok(())
    }

    /// Add all certificates from a PEM bundle, skipping entries that fail to
    /// parse (some bundles carry non-certificate blocks). Returns the number
    /// of certificates added.
    pub fn add_pem_bundle(&mut self, pem_data: &[u8]) -> Result<usize, XlintError> {
        let mut added = 0;
        for pem_result in Pem::iter_from_buffer(pem_data) {
            let pem = match pem_result {
                Ok(pem) => pem,
                Err(e) => {
                    if added > 0 {
                        break; // trailing garbage after valid certs
                    }
                    return Err(XlintError::PemError(format!("failed to parse PEM: {}", e)));
                }
            };
            if pem.label != "CERTIFICATE" && pem.label != "TRUSTED CERTIFICATE" {
                continue;
            }
            if self.add_der(&pem.contents).is_ok() {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Find trusted certificates whose subject matches the given issuer name.
    pub(crate) fn find_by_subject_raw(&self, subject_raw: &[u8]) -> Option<&Vec<Vec<u8>>> {
        self.certs_by_subject.get(subject_raw)
    }

    /// Check if a DER-encoded certificate is in the trust store.
    pub fn contains(&self, der: &[u8]) -> bool {
        if let Ok((_, x509)) = X509Certificate::from_der(der) {
            if let Some(certs) = self.find_by_subject_raw(x509.subject().as_raw()) {
                return certs.iter().any(|c| c == der);
            }
        }
        false
    }

    /// Number of certificates in the store.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for TrustStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the system CA bundle path (same location OpenSSL uses).
pub fn find_system_ca_bundle() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SSL_CERT_FILE") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Some(p);
        }
    }

    let probe = openssl_probe::probe();
    if let Some(file) = probe.cert_file {
        if file.exists() {
            return Some(file);
        }
    }

    for candidate in KNOWN_CA_BUNDLE_PATHS {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Some(p);
        }
    }
    None
}
