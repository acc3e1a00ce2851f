//! The lint engine.
//!
//! One [`Linter`] is shared by all workers; it owns the check registry, the
//! trust store, and the AIA resolver. Per-certificate mutable state (the
//! issuer cache) stays with the caller so workers never contend.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::asn1;
use crate::cache::{chain_key, IssuerCache, IssuerCacheEntry};
use crate::certdata::{CertData, CertInfo};
use crate::chain::{verify_trusted, Resolver};
use crate::checks::Registry;
use crate::classify::CertType;
use crate::findings::{FindingSet, Severity};
use crate::trust::TrustStore;
use crate::XlintError;

/// Options shared by single-certificate and bulk linting.
#[derive(Default)]
pub struct LintOptions {
    /// Also run checks on certificates that have already expired. When off,
    /// expired certificates are classified but not checked further.
    pub check_expired: bool,
    /// DER of a known issuer certificate. Skips AIA resolution.
    pub issuer_der: Option<Vec<u8>>,
}

/// What the engine produced for one DER input.
pub struct LintOutcome {
    /// Parsed certificate; `None` when X.509 parsing failed.
    pub cert: Option<CertData>,
    pub findings: FindingSet,
    /// True when the type tag or the expiry gate stopped the run before the
    /// checks; bulk mode emits nothing for these.
    pub skipped: bool,
}

/// The lint engine.
pub struct Linter {
    registry: Registry,
    trust: Arc<TrustStore>,
    resolver: Resolver,
    options: LintOptions,
}

impl Linter {
    pub fn new(
        registry: Registry,
        trust: Arc<TrustStore>,
        options: LintOptions,
    ) -> Result<Self, XlintError> {
        Ok(Linter {
            registry,
            trust,
            resolver: Resolver::new()?,
            options,
        })
    }

    /// Lint one DER-encoded certificate.
    ///
    /// `append_acceptable` adds the default "This Certificate is acceptable"
    /// Info finding when nothing at Notice or above was found; single-cert
    /// mode wants it, bulk mode suppresses it so clean certificates produce
    /// no report rows.
    pub fn lint(
        &self,
        der: &[u8],
        cache: &mut IssuerCache,
        append_acceptable: bool,
    ) -> LintOutcome {
        let mut findings = asn1::lint_der(der);

        let mut data = match CertData::load(der) {
            Ok(data) => data,
            Err(e) => {
                findings.err(e.to_string());
                return LintOutcome {
                    cert: None,
                    findings,
                    skipped: false,
                };
            }
        };

        // Excluded types carry no further checks by contract.
        if data.cert_type == CertType::Excluded {
            return LintOutcome {
                cert: Some(data),
                findings,
                skipped: true,
            };
        }

        if !self.options.check_expired && data.cert.is_expired_at(now_ts()) {
            return LintOutcome {
                cert: Some(data),
                findings,
                skipped: true,
            };
        }

        self.resolve_issuer(der, &mut data, cache, &mut findings);

        if !data.trusted {
            findings.err(format!(
                "Failed to verify chain for {}",
                data.cert.issuer.common_name().unwrap_or("unknown issuer")
            ));
        }
        if data.issuer.is_none() {
            debug!(
                issuer = %data.cert.issuer,
                subject = %data.cert.subject,
                "incomplete chain"
            );
        }

        findings.append(self.registry.check_certificate(&data));
        findings.append(self.registry.check_extensions(&data));

        if append_acceptable && findings.list_min(Severity::Notice).next().is_none() {
            findings.info("This Certificate is acceptable");
        }

        LintOutcome {
            cert: Some(data),
            findings,
            skipped: false,
        }
    }

    /// Resolve the issuer chain: from the configured issuer file, the
    /// worker's cache, or the network.
    fn resolve_issuer(
        &self,
        der: &[u8],
        data: &mut CertData,
        cache: &mut IssuerCache,
        findings: &mut FindingSet,
    ) {
        if let Some(issuer_der) = &self.options.issuer_der {
            match CertInfo::parse(issuer_der) {
                Ok(info) => {
                    data.set_issuer(info);
                    data.trusted =
                        verify_trusted(der, std::slice::from_ref(issuer_der), &self.trust);
                }
                Err(e) => {
                    findings.warning(format!("Failed to parse provided issuer: {}", e));
                }
            }
            return;
        }

        let key = chain_key(&data.cert);
        if let Some(entry) = cache.get(&key) {
            data.trusted = entry.trusted;
            data.issuer = entry.issuer.clone();
            return;
        }

        let resolved = self.resolver.issuer_pool(der, &data.cert);
        findings.append(resolved.findings);

        data.trusted = verify_trusted(der, &resolved.pool, &self.trust);
        data.issuer = resolved.issuer;

        // A certificate signed directly by a root has an empty pool but a
        // real issuer; keep the trusted-implies-issuer invariant intact.
        if data.trusted && data.issuer.is_none() {
            data.issuer = self.root_issuer_info(&data.cert);
        }

        cache.put(
            key,
            IssuerCacheEntry {
                trusted: data.trusted,
                issuer: data.issuer.clone(),
                pool: resolved.pool,
            },
        );
    }

    /// Parse the trust store root whose subject matches the certificate's
    /// issuer DN.
    fn root_issuer_info(&self, cert: &CertInfo) -> Option<CertInfo> {
        let candidates = self.trust.find_by_subject_raw(&cert.raw_issuer)?;
        candidates
            .iter()
            .find_map(|der| CertInfo::parse(der).ok())
    }
}

fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
