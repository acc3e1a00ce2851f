//! Certificate type classification.
//!
//! The tag drives which checks run and which per-type limits apply. The
//! mapping is an ordered decision table: the first predicate that accepts
//! the certificate wins.

use serde::Serialize;

use crate::certdata::CertInfo;
use crate::oid;

/// Classification tag for a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CertType {
    /// Domain-validated TLS certificate.
    Dv,
    /// Organization-validated TLS certificate.
    Ov,
    /// Extended-validation TLS certificate.
    Ev,
    /// Personal S/MIME certificate.
    Ps,
    /// Code-signing certificate.
    Cs,
    /// Certificate authority (root or intermediate).
    Ca,
    /// Out of scope: do not lint.
    Excluded,
}

impl CertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertType::Dv => "DV",
            CertType::Ov => "OV",
            CertType::Ev => "EV",
            CertType::Ps => "PS",
            CertType::Cs => "CS",
            CertType::Ca => "CA",
            CertType::Excluded => "-",
        }
    }

    /// The TLS server certificate classes (subject to CABF BR rules).
    pub fn is_tls(&self) -> bool {
        matches!(self, CertType::Dv | CertType::Ov | CertType::Ev)
    }
}

impl std::fmt::Display for CertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type Predicate = fn(&CertInfo) -> bool;

/// Ordered decision table; first match wins. The trailing catch-all makes
/// the fallback explicit: no policy OID and no organization means DV.
const DECISION_TABLE: &[(Predicate, CertType)] = &[
    (is_technically_constrained_ca, CertType::Excluded),
    (is_ca, CertType::Ca),
    (is_non_tls_infrastructure, CertType::Excluded),
    (has_email_protection_eku, CertType::Ps),
    (has_code_signing_eku, CertType::Cs),
    (has_ev_policy, CertType::Ev),
    (has_ov_policy, CertType::Ov),
    (has_dv_policy, CertType::Dv),
    (has_organization, CertType::Ov),
    (|_| true, CertType::Dv),
];

/// Classify a parsed certificate into its type tag.
pub fn classify(cert: &CertInfo) -> CertType {
    for (predicate, tag) in DECISION_TABLE {
        if predicate(cert) {
            return *tag;
        }
    }
    CertType::Dv
}

fn is_ca(cert: &CertInfo) -> bool {
    cert.basic_constraints.map(|bc| bc.ca).unwrap_or(false)
}

/// A sub-CA whose scope is limited by name constraints is technically
/// constrained (CABF BR 7.1.5) and outside the lint scope.
fn is_technically_constrained_ca(cert: &CertInfo) -> bool {
    is_ca(cert) && cert.has_name_constraints
}

/// Pure infrastructure certificates (timestamping, OCSP responders) are not
/// subscriber certificates and are not linted.
fn is_non_tls_infrastructure(cert: &CertInfo) -> bool {
    !cert.ext_key_usage.is_empty()
        && cert
            .ext_key_usage
            .iter()
            .all(|ku| ku == oid::EKU_TIME_STAMPING || ku == oid::EKU_OCSP_SIGNING)
}

fn has_email_protection_eku(cert: &CertInfo) -> bool {
    cert.ext_key_usage.iter().any(|ku| ku == oid::EKU_EMAIL_PROTECTION)
}

fn has_code_signing_eku(cert: &CertInfo) -> bool {
    cert.ext_key_usage.iter().any(|ku| ku == oid::EKU_CODE_SIGNING)
}

fn has_ev_policy(cert: &CertInfo) -> bool {
    cert.policies
        .iter()
        .any(|p| p == oid::CABF_POLICY_EV || oid::EV_POLICY_OIDS.contains(&p.as_str()))
}

fn has_ov_policy(cert: &CertInfo) -> bool {
    cert.policies.iter().any(|p| p == oid::CABF_POLICY_OV)
}

fn has_dv_policy(cert: &CertInfo) -> bool {
    cert.policies
        .iter()
        .any(|p| p == oid::CABF_POLICY_DV || p == oid::CABF_POLICY_IV)
}

fn has_organization(cert: &CertInfo) -> bool {
    cert.subject.organization().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certdata::{BasicConstraints, DistinguishedName};

    fn leaf() -> CertInfo {
        CertInfo::default()
    }

    #[test]
    fn ca_flag_wins_over_policies() {
        let mut cert = leaf();
        cert.basic_constraints = Some(BasicConstraints {
            ca: true,
            path_len: None,
            critical: true,
        });
        cert.policies = vec![oid::CABF_POLICY_EV.into()];
        assert_eq!(classify(&cert), CertType::Ca);
    }

    #[test]
    fn name_constrained_ca_is_excluded() {
        let mut cert = leaf();
        cert.basic_constraints = Some(BasicConstraints {
            ca: true,
            path_len: Some(0),
            critical: true,
        });
        cert.has_name_constraints = true;
        assert_eq!(classify(&cert), CertType::Excluded);
    }

    #[test]
    fn email_protection_beats_policy_fallbacks() {
        let mut cert = leaf();
        cert.ext_key_usage = vec![oid::EKU_CLIENT_AUTH.into(), oid::EKU_EMAIL_PROTECTION.into()];
        assert_eq!(classify(&cert), CertType::Ps);
    }

    #[test]
    fn code_signing_classifies_cs() {
        let mut cert = leaf();
        cert.ext_key_usage = vec![oid::EKU_CODE_SIGNING.into()];
        assert_eq!(classify(&cert), CertType::Cs);
    }

    #[test]
    fn ev_policy_oid_classifies_ev() {
        let mut cert = leaf();
        cert.ext_key_usage = vec![oid::EKU_SERVER_AUTH.into()];
        cert.policies = vec!["2.16.840.1.114412.2.1".into()];
        assert_eq!(classify(&cert), CertType::Ev);
    }

    #[test]
    fn cabf_dv_policy_classifies_dv_even_with_org() {
        let mut cert = leaf();
        cert.policies = vec![oid::CABF_POLICY_DV.into()];
        cert.subject = DistinguishedName {
            components: vec![("O".into(), "Acme".into())],
        };
        assert_eq!(classify(&cert), CertType::Dv);
    }

    #[test]
    fn no_policy_falls_back_on_subject() {
        let mut cert = leaf();
        cert.subject = DistinguishedName {
            components: vec![("O".into(), "Acme".into()), ("CN".into(), "acme.test".into())],
        };
        assert_eq!(classify(&cert), CertType::Ov);

        assert_eq!(classify(&leaf()), CertType::Dv);
    }

    #[test]
    fn tls_covers_exactly_the_server_types() {
        for t in [CertType::Dv, CertType::Ov, CertType::Ev] {
            assert!(t.is_tls(), "{t}");
        }
        for t in [CertType::Ps, CertType::Cs, CertType::Ca, CertType::Excluded] {
            assert!(!t.is_tls(), "{t}");
        }
    }

    #[test]
    fn timestamping_only_is_excluded() {
        let mut cert = leaf();
        cert.ext_key_usage = vec![oid::EKU_TIME_STAMPING.into()];
        assert_eq!(classify(&cert), CertType::Excluded);
    }
}
