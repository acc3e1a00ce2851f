//! xlint-lib: Lint engine for X.509 certificates.
//!
//! Checks issued certificates against RFC 5280 and the CA/Browser Forum
//! Baseline Requirements: structural DER linting, a registry of
//! certificate-level and extension-level rules, AIA chain resolution with a
//! per-worker issuer cache, and a parallel bulk pipeline that streams PEM
//! archives into a CSV report.

pub mod asn1;
mod cache;
mod certdata;
mod chain;
pub mod checks;
mod classify;
mod engine;
mod findings;
pub mod oid;
pub mod pem;
mod pipeline;
mod report;
mod revocation;
mod trust;
pub mod util;

pub use cache::{chain_key, ChainKey, IssuerCache, IssuerCacheEntry, DEFAULT_CACHE_CAPACITY};
pub use certdata::{
    BasicConstraints, CertData, CertInfo, DistinguishedName, Extension, KeyUsage, PublicKeyInfo,
    SanEntry,
};
pub use chain::{signed_by, verify_trusted, ResolvedChain, Resolver, MAX_CHAIN_DEPTH};
pub use checks::Registry;
pub use classify::{classify, CertType};
pub use engine::{LintOptions, LintOutcome, Linter};
pub use findings::{Finding, FindingSet, Severity};
pub use pipeline::{run_bulk, BulkOptions, BulkSummary, CancelToken, LintResult};
pub use report::ReportOptions;
pub use revocation::{CrlRevocationClient, RevocationCheck};
pub use trust::{find_system_ca_bundle, TrustStore};

/// Errors returned by xlint-lib.
#[derive(Debug, thiserror::Error)]
pub enum XlintError {
    #[error("Failed to parse certificate: {0}")]
    ParseError(String),

    #[error("Invalid PEM format: {0}")]
    PemError(String),

    #[error("Invalid DER format: {0}")]
    DerError(String),

    #[error("Verification error: {0}")]
    VerifyError(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
