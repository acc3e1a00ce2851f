//! Chain resolution: fetching issuer certificates and verifying trust.
//!
//! The resolver walks upward from a certificate through its AIA caIssuers
//! URLs, downloading each issuer, verifying that the download actually signs
//! the certificate below it, and accumulating an intermediate pool. Trust is
//! then decided by depth-first path building from the certificate through
//! the pool to a root in the [`TrustStore`].

use std::time::{Duration, Instant};

use tracing::debug;
use x509_parser::prelude::*;

use crate::certdata::CertInfo;
use crate::findings::FindingSet;
use crate::trust::TrustStore;
use crate::XlintError;

/// Maximum number of issuers fetched for one certificate. Bounds traversal
/// of hostile or cyclic AIA chains.
pub const MAX_CHAIN_DEPTH: usize = 10;

/// Timeout applied to each issuer download.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Wall-clock budget for resolving one certificate's whole chain.
const CHAIN_BUDGET: Duration = Duration::from_secs(30);

/// Downloads issuer certificates referenced through AIA.
pub struct Resolver {
    http: reqwest::blocking::Client,
}

/// Outcome of walking a certificate's AIA chain.
pub struct ResolvedChain {
    /// The direct issuer of the certificate the walk started from.
    pub issuer: Option<CertInfo>,
    /// DER of every downloaded certificate, in download order.
    pub pool: Vec<Vec<u8>>,
    /// Download and signature problems encountered along the way.
    pub findings: FindingSet,
}

impl Resolver {
    pub fn new() -> Result<Self, XlintError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("xlint/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| XlintError::Http(e.to_string()))?;
        Ok(Resolver { http })
    }

    /// Walk upward from `cert` (whose DER is `der`), fetching issuers until
    /// a certificate without AIA is reached or a bound trips.
    pub fn issuer_pool(&self, der: &[u8], cert: &CertInfo) -> ResolvedChain {
        let mut findings = FindingSet::new();
        let mut pool: Vec<Vec<u8>> = Vec::new();
        let mut issuer: Option<CertInfo> = None;

        let started = Instant::now();
        let mut current_der = der.to_vec();
        let mut current_urls = cert.aia_issuer_urls.clone();

        for depth in 0..MAX_CHAIN_DEPTH {
            if current_urls.is_empty() {
                break;
            }
            if started.elapsed() > CHAIN_BUDGET {
                findings.warning("Chain resolution exceeded its time budget");
                break;
            }

            let downloaded = match self.fetch_first(&current_urls, &mut findings) {
                Some(der) => der,
                None => break,
            };

            // The downloaded certificate must actually sign the one below it.
            if !signed_by(&current_der, &downloaded) {
                findings.err("Signature not from downloaded issuer certificate");
                break;
            }

            let info = match CertInfo::parse(&downloaded) {
                Ok(info) => info,
                Err(e) => {
                    findings.warning(format!("Failed to parse downloaded issuer: {}", e));
                    break;
                }
            };

            pool.push(downloaded.clone());
            if depth == 0 {
                issuer = Some(info.clone());
            }

            current_urls = info.aia_issuer_urls;
            current_der = downloaded;
        }

        ResolvedChain {
            issuer,
            pool,
            findings,
        }
    }

    /// Try each URL in order, returning the first successfully downloaded
    /// and decoded certificate. Failed URLs produce one Warning each.
    fn fetch_first(&self, urls: &[String], findings: &mut FindingSet) -> Option<Vec<u8>> {
        for url in urls {
            match self.fetch_certificate(url) {
                Ok(der) => return Some(der),
                Err(e) => {
                    findings.warning(format!(
                        "Failed to download issuer certificate from '{}': {}",
                        url, e
                    ));
                }
            }
        }
        None
    }

    /// GET one certificate. The body is treated as PEM when a BEGIN marker
    /// appears within the first kilobyte, otherwise as DER.
    fn fetch_certificate(&self, url: &str) -> Result<Vec<u8>, XlintError> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| XlintError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if status > 399 {
            return Err(XlintError::Http(format!("unexpected response status {}", status)));
        }

        let body: Vec<u8> = response
            .bytes()
            .map_err(|e| XlintError::Http(e.to_string()))?
            .to_vec();

        let head = &body[..body.len().min(1024)];
        let der = if head.windows(10).any(|w| w == b"-----BEGIN") {
            crate::pem::decode_block(&body)
                .ok_or_else(|| XlintError::PemError("invalid PEM body".into()))?
        } else {
            body
        };

        // Validate before handing back.
        X509Certificate::from_der(&der)
            .map_err(|e| XlintError::DerError(format!("{}", e)))?;

        debug!(url = %url, bytes = der.len(), "downloaded issuer certificate");
        Ok(der)
    }
}

/// Whether `child_der`'s signature verifies with the public key of
/// `issuer_der`.
pub fn signed_by(child_der: &[u8], issuer_der: &[u8]) -> bool {
    let child = match X509Certificate::from_der(child_der) {
        Ok((_, cert)) => cert,
        Err(_) => return false,
    };
    let issuer = match X509Certificate::from_der(issuer_der) {
        Ok((_, cert)) => cert,
        Err(_) => return false,
    };
    child.verify_signature(Some(issuer.public_key())).is_ok()
}

/// Whether the certificate verifies against the trust store through the
/// given intermediate pool.
///
/// Depth-first path building with backtracking handles cross-signed and
/// duplicate intermediates.
pub fn verify_trusted(leaf_der: &[u8], pool: &[Vec<u8>], trust: &TrustStore) -> bool {
    if trust.is_empty() {
        return false;
    }
    let leaf = match X509Certificate::from_der(leaf_der) {
        Ok((_, cert)) => cert,
        Err(_) => return false,
    };

    let intermediates: Vec<(&[u8], X509Certificate)> = pool
        .iter()
        .filter_map(|der| {
            X509Certificate::from_der(der)
                .ok()
                .map(|(_, cert)| (der.as_slice(), cert))
        })
        .collect();

    let mut used = vec![false; intermediates.len()];
    dfs_to_anchor(&leaf, leaf_der, &mut used, &intermediates, trust, 0)
}

fn dfs_to_anchor(
    current: &X509Certificate,
    current_der: &[u8],
    used: &mut [bool],
    intermediates: &[(&[u8], X509Certificate)],
    trust: &TrustStore,
    depth: usize,
) -> bool {
    // The certificate itself may be a trust anchor.
    if trust.contains(current_der) {
        return true;
    }

    // Chain terminates when a store root signs the current certificate.
    let issuer_raw = current.issuer().as_raw();
    if let Some(candidates) = trust.find_by_subject_raw(issuer_raw) {
        for root_der in candidates {
            if let Ok((_, root)) = X509Certificate::from_der(root_der) {
                if current.verify_signature(Some(root.public_key())).is_ok() {
                    return true;
                }
            }
        }
    }

    if depth >= MAX_CHAIN_DEPTH {
        return false;
    }

    for (idx, (der, candidate)) in intermediates.iter().enumerate() {
        if used[idx] {
            continue;
        }
        if candidate.subject().as_raw() != issuer_raw {
            continue;
        }
        if current.verify_signature(Some(candidate.public_key())).is_err() {
            continue;
        }

        used[idx] = true;
        if dfs_to_anchor(candidate, der, used, intermediates, trust, depth + 1) {
            return true;
        }
        used[idx] = false;
    }

    false
}
