//! Revocation status lookup.
//!
//! The report writer only needs a narrow interface: "is this certificate
//! revoked, and did the lookup work". The default implementation downloads
//! the certificate's CRL distribution points; OCSP is intentionally left to
//! external tooling.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;
use x509_parser::prelude::*;

use crate::certdata::CertData;
use crate::XlintError;

/// Answers revocation queries for the report writer.
///
/// Returns `(is_revoked, ok)`: `ok` is false when no answer could be
/// obtained, and the writer records the literal string "failed".
pub trait RevocationCheck: Send + Sync {
    fn verify(&self, cert: &CertData) -> (bool, bool);
}

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// CRL-based revocation checking over HTTP.
pub struct CrlRevocationClient {
    http: reqwest::blocking::Client,
}

impl CrlRevocationClient {
    pub fn new() -> Result<Self, XlintError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("xlint/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| XlintError::Http(e.to_string()))?;
        Ok(CrlRevocationClient { http })
    }

    fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let response = self.http.get(url).send().ok()?;
        if response.status().as_u16() > 399 {
            return None;
        }
        let body = response.bytes().ok()?.to_vec();

        // CRLs are served as DER or PEM ("X509 CRL" label).
        if crate::util::is_pem(&body) {
            let (_, pem) = x509_parser::pem::parse_x509_pem(&body).ok()?;
            return Some(pem.contents);
        }
        Some(body)
    }
}

impl RevocationCheck for CrlRevocationClient {
    fn verify(&self, cert: &CertData) -> (bool, bool) {
        if cert.cert.crl_urls.is_empty() {
            return (false, false);
        }

        let now_ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        for url in &cert.cert.crl_urls {
            let body = match self.fetch(url) {
                Some(body) => body,
                None => continue,
            };
            let (_, crl) = match x509_parser::revocation_list::CertificateRevocationList::from_der(
                &body,
            ) {
                Ok(parsed) => parsed,
                Err(_) => continue,
            };

            // The CRL must come from the certificate's own issuer.
            if crl.issuer().as_raw() != cert.cert.raw_issuer.as_slice() {
                continue;
            }

            // RFC 5280 6.3.3: only use CRLs within their validity window.
            if crl.last_update().timestamp() > now_ts {
                continue;
            }
            if let Some(next_update) = crl.next_update() {
                if next_update.timestamp() < now_ts {
                    continue;
                }
            }

            debug!(url = %url, "checking CRL");
            let revoked = crl
                .iter_revoked_certificates()
                .any(|entry| entry.raw_serial() == cert.cert.serial.as_slice());
            return (revoked, true);
        }

        (false, false)
    }
}
