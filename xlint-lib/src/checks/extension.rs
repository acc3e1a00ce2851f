//! Extension-level checks, dispatched by extension OID.
//!
//! Most of these enforce the criticality rules of RFC 5280 Section 4.2;
//! marking the wrong extensions critical breaks interoperability with
//! clients that reject unrecognized critical content.

use crate::certdata::{CertData, Extension};
use crate::checks::Registry;
use crate::classify::CertType;
use crate::findings::FindingSet;
use crate::oid;

/// Register the default extension-level corpus.
pub fn register_defaults(registry: &mut Registry) {
    registry.register_extension(
        "AuthorityInfoAccess Extension Check",
        oid::EXT_AUTHORITY_INFO_ACCESS,
        check_authority_info_access,
    );
    registry.register_extension(
        "AuthorityKeyId Extension Check",
        oid::EXT_AUTHORITY_KEY_ID,
        check_authority_key_id,
    );
    registry.register_extension(
        "BasicConstraints Extension Check",
        oid::EXT_BASIC_CONSTRAINTS,
        check_basic_constraints,
    );
    registry.register_extension(
        "CRLDistributionPoints Extension Check",
        oid::EXT_CRL_DISTRIBUTION_POINTS,
        check_crl_distribution_points,
    );
    registry.register_extension(
        "CT Poison Extension Check",
        oid::EXT_CT_POISON,
        check_ct_poison,
    );
    registry.register_extension("CT SCT List Extension Check", oid::EXT_SCT_LIST, check_sct_list);
    registry.register_extension(
        "CertificatePolicies Extension Check",
        oid::EXT_CERTIFICATE_POLICIES,
        check_certificate_policies,
    );
    registry.register_extension(
        "ExtKeyUsage Extension Check",
        oid::EXT_EXTENDED_KEY_USAGE,
        check_ext_key_usage,
    );
    registry.register_extension("KeyUsage Extension Check", oid::EXT_KEY_USAGE, check_key_usage);
    registry.register_extension(
        "NameConstraints Extension Check",
        oid::EXT_NAME_CONSTRAINTS,
        check_name_constraints,
    );
    registry.register_extension(
        "SubjectAltName Extension Check",
        oid::EXT_SUBJECT_ALT_NAME,
        check_subject_alt_name,
    );
    registry.register_extension(
        "SubjectKeyId Extension Check",
        oid::EXT_SUBJECT_KEY_ID,
        check_subject_key_id,
    );
}

/// RFC 5280 4.2.2.1: AIA MUST be non-critical.
fn check_authority_info_access(ex: &Extension, _d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    if ex.critical {
        e.err("AuthorityInfoAccess extension set critical");
    }
    e
}

/// RFC 5280 4.2.1.1: AKI MUST be non-critical and carry a keyIdentifier.
fn check_authority_key_id(ex: &Extension, d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    if ex.critical {
        e.err("AuthorityKeyId extension set critical");
    }
    if d.cert.authority_key_id.is_none() {
        e.warning("AuthorityKeyId extension is missing the keyIdentifier field");
    }
    e
}

/// RFC 5280 4.2.1.9: CA certificates must mark BasicConstraints critical.
fn check_basic_constraints(ex: &Extension, d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    let is_ca = d.cert.basic_constraints.map(|bc| bc.ca).unwrap_or(false);
    if is_ca && !ex.critical {
        e.err("BasicConstraints extension of a CA certificate not set critical");
    }
    e
}

/// RFC 5280 4.2.1.13: the CRLDistributionPoints SHOULD be non-critical.
fn check_crl_distribution_points(ex: &Extension, _d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    if ex.critical {
        e.err("CRLDistributionPoints extension set critical");
    }
    e
}

/// RFC 6962: the poison extension belongs in precertificates only; an
/// issued certificate carrying it is unusable.
fn check_ct_poison(_ex: &Extension, _d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    e.err("Certificate contains the Certificate Transparency poison extension");
    e
}

fn check_sct_list(ex: &Extension, _d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    if ex.critical {
        e.err("SignedCertificateTimestampList extension set critical");
    }
    // The extnValue wraps an OCTET STRING; a 2-byte header with nothing
    // behind it means no SCTs were embedded.
    if ex.value.len() <= 2 {
        e.warning("SignedCertificateTimestampList extension contains no timestamps");
    }
    e
}

fn check_certificate_policies(_ex: &Extension, d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    if d.cert.policies.is_empty() {
        e.err("CertificatePolicies extension contains no policy identifiers");
    }
    if d.cert_type != CertType::Ca && d.cert.policies.iter().any(|p| p == oid::ANY_POLICY) {
        e.warning("Certificate asserts anyPolicy in its CertificatePolicies extension");
    }
    e
}

fn check_ext_key_usage(_ex: &Extension, d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    if d.cert.ext_key_usage.is_empty() {
        e.err("ExtKeyUsage extension contains no key usages");
    }
    if d.cert.ext_key_usage.iter().any(|ku| ku == oid::EKU_ANY) {
        e.warning("ExtKeyUsage extension asserts anyExtendedKeyUsage");
    }
    e
}

/// RFC 5280 4.2.1.3: conforming CAs SHOULD mark KeyUsage critical, and an
/// asserted extension with no bits set is meaningless.
fn check_key_usage(ex: &Extension, d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    if !ex.critical {
        e.warning("KeyUsage extension not set critical");
    }
    if d.cert.key_usage.map(|ku| ku.flags == 0).unwrap_or(false) {
        e.err("KeyUsage extension asserts no key usages");
    }
    e
}

/// RFC 5280 4.2.1.10: name constraints appear only in CA certificates and
/// MUST be marked critical.
fn check_name_constraints(ex: &Extension, d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    let is_ca = d.cert.basic_constraints.map(|bc| bc.ca).unwrap_or(false);
    if !is_ca {
        e.err("NameConstraints extension present in a non-CA certificate");
    }
    if !ex.critical {
        e.warning("NameConstraints extension not set critical");
    }
    e
}

fn check_subject_alt_name(ex: &Extension, d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    if ex.critical && !d.cert.subject.is_empty() {
        e.err("SubjectAltName extension set critical");
    }
    e
}

/// RFC 5280 4.2.1.2: SKI MUST be non-critical.
fn check_subject_key_id(ex: &Extension, _d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    if ex.critical {
        e.err("SubjectKeyId extension set critical");
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certdata::CertInfo;
    use crate::findings::Severity;

    fn ext(oid: &str, critical: bool) -> Extension {
        Extension {
            oid: oid.into(),
            critical,
            value: vec![0u8; 16],
        }
    }

    fn data(cert: CertInfo) -> CertData {
        CertData {
            der: Vec::new(),
            cert,
            cert_type: CertType::Dv,
            issuer: None,
            trusted: false,
        }
    }

    #[test]
    fn criticality_bans() {
        let d = data(CertInfo::default());
        let cases = [
            (oid::EXT_AUTHORITY_INFO_ACCESS, check_authority_info_access as crate::checks::ExtCheckFn),
            (oid::EXT_CRL_DISTRIBUTION_POINTS, check_crl_distribution_points),
            (oid::EXT_SUBJECT_KEY_ID, check_subject_key_id),
        ];
        for (oid, check) in cases {
            assert_eq!(
                check(&ext(oid, true), &d).highest(),
                Some(Severity::Error),
                "{oid} critical should be an error"
            );
            assert!(
                check(&ext(oid, false), &d).is_empty(),
                "{oid} non-critical should pass"
            );
        }
    }

    #[test]
    fn san_critical_only_matters_with_a_subject() {
        let mut cert = CertInfo::default();
        cert.subject = crate::certdata::DistinguishedName {
            components: vec![("CN".into(), "example.com".into())],
        };
        let d = data(cert);
        assert_eq!(
            check_subject_alt_name(&ext(oid::EXT_SUBJECT_ALT_NAME, true), &d).highest(),
            Some(Severity::Error)
        );

        // Empty subject: critical SAN is the sanctioned layout.
        let empty = data(CertInfo::default());
        assert!(check_subject_alt_name(&ext(oid::EXT_SUBJECT_ALT_NAME, true), &empty).is_empty());
    }

    #[test]
    fn non_critical_key_usage_warns() {
        let d = data(CertInfo::default());
        let e = check_key_usage(&ext(oid::EXT_KEY_USAGE, false), &d);
        assert_eq!(e.highest(), Some(Severity::Warning));
    }

    #[test]
    fn name_constraints_on_leaf_is_an_error() {
        let d = data(CertInfo::default());
        let e = check_name_constraints(&ext(oid::EXT_NAME_CONSTRAINTS, true), &d);
        assert_eq!(e.highest(), Some(Severity::Error));
    }

    #[test]
    fn ct_poison_is_always_an_error() {
        let d = data(CertInfo::default());
        let e = check_ct_poison(&ext(oid::EXT_CT_POISON, true), &d);
        assert_eq!(e.highest(), Some(Severity::Error));
    }

    #[test]
    fn empty_sct_list_warns() {
        let d = data(CertInfo::default());
        let mut sct = ext(oid::EXT_SCT_LIST, false);
        sct.value = vec![0x04, 0x00];
        let e = check_sct_list(&sct, &d);
        assert_eq!(e.highest(), Some(Severity::Warning));
    }
}
