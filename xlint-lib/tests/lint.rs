#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests over the public lint API.
//!
//! The corpus tests read real certificates from `testdata/certs/` at the
//! workspace root (any collection of `.pem` files will do, e.g. a CA bundle
//! split into files). They skip gracefully when the directory is absent so
//! the suite runs without fixtures.

use std::path::{Path, PathBuf};

use xlint_lib::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn testdata_dir() -> PathBuf {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.pop(); // up from xlint-lib to the workspace root
    p.push("testdata");
    p.push("certs");
    p
}

fn collect_pem_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "pem") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

/// Skip macro: return early when the testdata directory is not present.
macro_rules! require_testdata {
    ($dir:expr) => {
        if !$dir.exists() {
            eprintln!(
                "Skipping corpus tests: put PEM certificates under testdata/certs/ to enable."
            );
            return;
        }
    };
}

fn synthetic_data(cert_type: CertType) -> CertData {
    let mut cert = CertInfo::default();
    cert.version = 3;
    cert.serial = vec![0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
    cert.signature_algorithm = oid::SHA256_WITH_RSA.to_string();
    cert.subject = DistinguishedName {
        components: vec![("CN".into(), "www.example.com".into())],
    };
    cert.san = vec![SanEntry::Dns("www.example.com".into())];
    CertData {
        der: Vec::new(),
        cert,
        cert_type,
        issuer: None,
        trusted: false,
    }
}

// ===========================================================================
// Registry behavior over the public API
// ===========================================================================

#[test]
fn default_registry_is_deterministic() {
    let registry = Registry::with_defaults();
    let data = synthetic_data(CertType::Dv);

    let first = registry.check_certificate(&data);
    let second = registry.check_certificate(&data);

    let msgs = |fs: &FindingSet| -> Vec<String> {
        fs.list().iter().map(|f| f.message.clone()).collect()
    };
    assert_eq!(msgs(&first), msgs(&second));
    assert!(!first.is_empty(), "a bare synthetic DV cert should have findings");
}

#[test]
fn findings_severity_composes_across_registries() {
    let registry = Registry::with_defaults();
    let data = synthetic_data(CertType::Dv);

    let mut combined = registry.check_certificate(&data);
    let cert_highest = combined.highest();
    let ext = registry.check_extensions(&data);
    let ext_highest = ext.highest();

    let expected = cert_highest.max(ext_highest);
    combined.append(ext);
    assert_eq!(combined.highest(), expected);
}

#[test]
fn subset_registry_runs_only_registered_rules() {
    fn version_only(d: &CertData) -> FindingSet {
        let mut fs = FindingSet::new();
        if d.cert.version != 3 {
            fs.err("not v3");
        }
        fs
    }

    let mut registry = Registry::new();
    registry.register_certificate("Version Only", None, version_only);

    let mut data = synthetic_data(CertType::Dv);
    data.cert.version = 1;
    let findings = registry.check_certificate(&data);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings.highest(), Some(Severity::Error));
}

// ===========================================================================
// Structural linter on the raw DER layer
// ===========================================================================

#[test]
fn structural_linter_survives_arbitrary_bytes() {
    // Not valid X.509, not even close; the linter must not panic and must
    // produce at least one finding for each.
    let samples: &[&[u8]] = &[
        &[],
        &[0x00],
        &[0x30],
        &[0x30, 0x80],
        &[0xff; 64],
        b"not der at all",
    ];
    for der in samples {
        let findings = asn1::lint_der(der);
        assert!(findings.highest().is_some(), "{:02x?}", &der[..der.len().min(8)]);
    }
}

// ===========================================================================
// Corpus tests (skipped without testdata)
// ===========================================================================

#[test]
fn corpus_parses_and_lints_without_panicking() {
    let dir = testdata_dir();
    require_testdata!(dir);

    let files = collect_pem_files(&dir);
    assert!(!files.is_empty(), "no PEM files under {}", dir.display());

    let registry = Registry::with_defaults();
    let mut parsed = 0;
    let mut failed = 0;

    for path in &files {
        let data = std::fs::read(path).unwrap();
        let der = match pem::certificate_der(&data) {
            Ok(der) => der,
            Err(_) => {
                failed += 1;
                continue;
            }
        };

        // The structural linter accepts anything.
        let _ = asn1::lint_der(&der);

        match CertData::load(&der) {
            Ok(cert_data) => {
                parsed += 1;
                let findings = registry.check_certificate(&cert_data);
                let ext_findings = registry.check_extensions(&cert_data);
                // Severity ordering is total over everything produced.
                for f in findings.list().iter().chain(ext_findings.list()) {
                    assert!(f.severity >= Severity::Info);
                }
            }
            Err(_) => failed += 1,
        }
    }

    eprintln!(
        "corpus: {} files, {} parsed, {} failed",
        files.len(),
        parsed,
        failed
    );
    assert!(parsed > 0, "no certificate in the corpus parsed");
}

#[test]
fn corpus_classification_is_stable() {
    let dir = testdata_dir();
    require_testdata!(dir);

    for path in collect_pem_files(&dir) {
        let data = std::fs::read(&path).unwrap();
        let Ok(der) = pem::certificate_der(&data) else {
            continue;
        };
        let Ok(first) = CertData::load(&der) else {
            continue;
        };
        let second = CertData::load(&der).unwrap();
        assert_eq!(
            first.cert_type, second.cert_type,
            "classification changed between loads for {}",
            path.display()
        );
    }
}
