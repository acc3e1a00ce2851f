//! Certificate-level checks.
//!
//! Rule sources: RFC 5280 and the CA/Browser Forum Baseline Requirements.
//! Each check produces findings phrased to stand alone in a report row;
//! structural context (type tag, subject) is carried by the other columns.

use std::collections::HashSet;

use url::Url;

use crate::certdata::{CertData, SanEntry};
use crate::checks::{goodkey, Registry};
use crate::classify::CertType;
use crate::findings::FindingSet;
use crate::oid;
use crate::util;

const LEAF_TYPES: &[CertType] = &[
    CertType::Dv,
    CertType::Ov,
    CertType::Ev,
    CertType::Ps,
    CertType::Cs,
];

const TLS_TYPES: &[CertType] = &[CertType::Dv, CertType::Ov, CertType::Ev];

/// Register the default certificate-level corpus.
pub fn register_defaults(registry: &mut Registry) {
    registry.register_certificate("Authority Info Access Issuers Check", None, check_aia_issuers);
    registry.register_certificate("Basic Constraints Check", None, check_basic_constraints);
    registry.register_certificate("Duplicate Extensions Check", None, check_duplicate_extensions);
    registry.register_certificate(
        "Extended Key Usage Check",
        Some(LEAF_TYPES),
        check_ext_key_usage,
    );
    registry.register_certificate("Internal Names Check", Some(TLS_TYPES), check_internal_names);
    registry.register_certificate("Issuer DN Check", None, check_issuer_dn);
    registry.register_certificate("Key Usage Check", None, check_key_usage);
    registry.register_certificate("Public Key Check", None, check_public_key);
    registry.register_certificate(
        "Public Suffix Wildcard Check",
        Some(TLS_TYPES),
        check_public_suffix,
    );
    registry.register_certificate("Required Extensions Check", None, check_required_extensions);
    registry.register_certificate("Revocation Info Check", None, check_revocation_info);
    registry.register_certificate("Serial Number Check", Some(LEAF_TYPES), check_serial_number);
    registry.register_certificate(
        "Signature Algorithm Check",
        Some(TLS_TYPES),
        check_signature_algorithm,
    );
    registry.register_certificate("Subject Check", Some(LEAF_TYPES), check_subject);
    registry.register_certificate(
        "Subject Alternative Name Check",
        Some(TLS_TYPES),
        check_subject_alt_name,
    );
    registry.register_certificate("Validity Check", Some(LEAF_TYPES), check_validity);
    registry.register_certificate("Version Check", None, check_version);
    registry.register_certificate("Wildcard Check", Some(TLS_TYPES), check_wildcard);
}

/// AIA caIssuers must be present and carry well-formed http URLs.
fn check_aia_issuers(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    if d.cert.aia_issuer_urls.is_empty() {
        e.err("Certificate contains no Authority Info Access Issuers");
        return e;
    }

    for icu in &d.cert.aia_issuer_urls {
        match Url::parse(icu) {
            Err(_) => e.err(format!(
                "Certificate contains an invalid Authority Info Access Issuer URL ({})",
                icu
            )),
            Ok(url) if url.scheme() != "http" => e.warning(format!(
                "Certificate contains an Authority Info Access Issuer with a non-preferred scheme ({})",
                url.scheme()
            )),
            Ok(_) => {}
        }
    }

    e
}

fn check_basic_constraints(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    match d.cert_type {
        CertType::Ca => {
            if d.cert.basic_constraints.is_none() {
                e.err("CA certificate is missing the BasicConstraints extension");
            }
        }
        _ => {
            if let Some(bc) = d.cert.basic_constraints {
                if bc.ca {
                    e.err("Certificate asserts BasicConstraints CA:TRUE but is not a CA");
                } else if bc.path_len.is_some() {
                    e.warning(
                        "Certificate carries a pathLenConstraint without the CA flag",
                    );
                }
            }
        }
    }

    e
}

/// RFC 5280 4.2: a certificate MUST NOT include more than one instance of a
/// particular extension, and unrecognized critical extensions must be
/// surfaced.
fn check_duplicate_extensions(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    let mut seen = HashSet::new();

    for ext in &d.cert.extensions {
        if !seen.insert(ext.oid.as_str()) {
            e.err(format!("Certificate contains a duplicate {} extension", ext.oid));
        }
        if ext.critical && !is_known_extension(&ext.oid) {
            e.warning(format!(
                "Certificate contains an unrecognized critical extension ({})",
                ext.oid
            ));
        }
    }

    e
}

/// Extended key usages must be compatible with the certificate type:
/// DV/OV/EV allow server/client authentication and server-gated crypto,
/// PS allows client authentication and email protection, CS allows code
/// signing only. Unknown EKU OIDs are warned about.
fn check_ext_key_usage(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    for ku in &d.cert.ext_key_usage {
        let known = is_known_eku(ku);

        if known {
            match d.cert_type {
                t if t.is_tls() => {
                    if !matches!(
                        ku.as_str(),
                        oid::EKU_SERVER_AUTH
                            | oid::EKU_CLIENT_AUTH
                            | oid::EKU_MS_SERVER_GATED_CRYPTO
                            | oid::EKU_NS_SERVER_GATED_CRYPTO
                    ) {
                        e.err("Certificate contains an extended key usage different from ServerAuth, ClientAuth or ServerGatedCrypto");
                        return e;
                    }
                }
                CertType::Ps => {
                    if !matches!(ku.as_str(), oid::EKU_CLIENT_AUTH | oid::EKU_EMAIL_PROTECTION) {
                        e.err("Certificate contains an extended key usage different from ClientAuth or EmailProtection");
                        return e;
                    }
                }
                CertType::Cs => {
                    if ku != oid::EKU_CODE_SIGNING {
                        e.err(
                            "Certificate contains an extended key usage different from CodeSigning",
                        );
                        return e;
                    }
                }
                _ => {}
            }
        } else {
            e.warning(format!(
                "Certificate contains an unknown extended key usage ({})",
                ku
            ));
        }
    }

    e
}

/// Reserved IP addresses and non-resolvable internal names must not appear
/// in the subjectAltName of a publicly-trusted certificate.
fn check_internal_names(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    for entry in &d.cert.san {
        match entry {
            SanEntry::Ip(addr) if util::is_reserved_ip(addr) => {
                e.err(format!(
                    "Certificate contains a reserved IP address in its subjectAltName ({})",
                    addr
                ));
            }
            SanEntry::IpInvalid(bytes) => {
                e.err(format!(
                    "Certificate contains a malformed IP address in its subjectAltName ({} bytes)",
                    bytes.len()
                ));
            }
            SanEntry::Dns(name) if util::is_internal_name(name) => {
                e.err(format!(
                    "Certificate contains an internal name in its subjectAltName ({})",
                    name
                ));
            }
            _ => {}
        }
    }

    e
}

fn check_issuer_dn(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    if let Some(issuer) = &d.issuer {
        if d.cert.raw_issuer != issuer.raw_subject {
            e.err("Certificate Issuer Distinguished Name field MUST match the Subject DN of the Issuing CA");
        }
    }

    e
}

fn check_key_usage(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    let ku = match d.cert.key_usage {
        Some(ku) => ku,
        None => return e, // absence handled by the required-extensions check
    };

    match d.cert_type {
        CertType::Ca => {
            if !ku.key_cert_sign() {
                e.err("CA certificate does not assert the KeyCertSign key usage");
            }
        }
        t if t.is_tls() => {
            if ku.key_cert_sign() || ku.crl_sign() {
                e.err("Certificate asserts a CA key usage but is not a CA");
            }
            if !ku.digital_signature() && !ku.key_encipherment() && !ku.key_agreement() {
                e.err("Certificate asserts none of the key usages required for TLS");
            }
        }
        CertType::Cs => {
            if !ku.digital_signature() {
                e.err("Code signing certificate does not assert the DigitalSignature key usage");
            }
        }
        _ => {}
    }

    e
}

fn check_public_key(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    if let Some(reason) = goodkey::check(d.cert.public_key.as_ref()) {
        e.err(format!("Certificate {}", reason));
    }

    e
}

/// A wildcard must never cover an entire public suffix (`*.co.uk` would
/// match every domain registered under .co.uk).
fn check_public_suffix(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    for name in wildcard_candidates(d) {
        if let Some(base) = name.strip_prefix("*.") {
            if util::is_public_suffix(base) {
                e.err(format!(
                    "Certificate contains a wildcard covering the public suffix ({})",
                    name
                ));
            }
        } else if name == "*" {
            e.err("Certificate contains a bare wildcard name");
        }
    }

    e
}

fn check_required_extensions(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    let require = |e: &mut FindingSet, oid: &str, name: &str| {
        if !d.cert.has_extension(oid) {
            e.err(format!(
                "Certificate of type {} is missing the required {} extension",
                d.cert_type, name
            ));
        }
    };

    match d.cert_type {
        CertType::Dv | CertType::Ov | CertType::Ev => {
            require(&mut e, oid::EXT_SUBJECT_ALT_NAME, "SubjectAltName");
            require(&mut e, oid::EXT_AUTHORITY_KEY_ID, "AuthorityKeyId");
            require(&mut e, oid::EXT_EXTENDED_KEY_USAGE, "ExtKeyUsage");
            require(&mut e, oid::EXT_CERTIFICATE_POLICIES, "CertificatePolicies");
            if !d.cert.has_extension(oid::EXT_KEY_USAGE) {
                e.warning("Certificate is missing the KeyUsage extension");
            }
        }
        CertType::Ps | CertType::Cs => {
            require(&mut e, oid::EXT_AUTHORITY_KEY_ID, "AuthorityKeyId");
            require(&mut e, oid::EXT_EXTENDED_KEY_USAGE, "ExtKeyUsage");
        }
        CertType::Ca => {
            require(&mut e, oid::EXT_BASIC_CONSTRAINTS, "BasicConstraints");
            require(&mut e, oid::EXT_KEY_USAGE, "KeyUsage");
            // RFC 5280 4.2.1.2: CAs MUST carry a subject key identifier.
            if d.cert.subject_key_id.is_none() {
                e.err("CA certificate is missing the SubjectKeyId extension");
            }
        }
        CertType::Excluded => {}
    }

    e
}

/// Relying parties need a revocation source: a CRL distribution point or an
/// OCSP responder, reachable over plain http.
fn check_revocation_info(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    if d.cert.crl_urls.is_empty() && d.cert.ocsp_urls.is_empty() {
        e.err("Certificate contains no CRL or OCSP server");
        return e;
    }

    for crl in &d.cert.crl_urls {
        match Url::parse(crl) {
            Err(_) => e.err(format!("Certificate contains an invalid CRL URL ({})", crl)),
            Ok(url) if url.scheme() != "http" => e.err(format!(
                "Certificate contains a CRL with a non-preferred scheme ({})",
                url.scheme()
            )),
            Ok(_) => {}
        }
    }

    for server in &d.cert.ocsp_urls {
        match Url::parse(server) {
            Err(_) => e.err(format!(
                "Certificate contains an invalid OCSP server ({})",
                server
            )),
            Ok(url) if url.scheme() != "http" => e.err(format!(
                "Certificate contains an OCSP server with a non-preferred scheme ({})",
                url.scheme()
            )),
            Ok(_) => {}
        }
    }

    e
}

/// CABF BR 7.1: serials must be positive and contain at least 64 bits of
/// CSPRNG output.
fn check_serial_number(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    let serial = &d.cert.serial;
    if serial.is_empty() {
        e.err("Certificate serial number is empty");
        return e;
    }
    if serial[0] & 0x80 != 0 {
        e.err("Certificate serial number is negative");
        return e;
    }

    let stripped: &[u8] = match serial.iter().position(|&b| b != 0) {
        Some(pos) => &serial[pos..],
        None => {
            e.err("Certificate serial number is zero");
            return e;
        }
    };

    if stripped.len() < 8 {
        e.err("Certificate serial number has less than 64 bits of entropy");
    }

    e
}

fn check_signature_algorithm(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    match d.cert.signature_algorithm.as_str() {
        oid::SHA256_WITH_RSA
        | oid::SHA384_WITH_RSA
        | oid::SHA512_WITH_RSA
        | oid::RSA_PSS
        | oid::ECDSA_WITH_SHA256
        | oid::ECDSA_WITH_SHA384
        | oid::ECDSA_WITH_SHA512
        | oid::ED25519 => {}
        oid::MD2_WITH_RSA
        | oid::MD5_WITH_RSA
        | oid::SHA1_WITH_RSA
        | oid::DSA_WITH_SHA1
        | oid::ECDSA_WITH_SHA1 => {
            e.err(format!(
                "Certificate is signed with the weak signature algorithm {}",
                d.cert.signature_algorithm_name()
            ));
        }
        other => {
            e.warning(format!(
                "Certificate is signed with an unknown signature algorithm ({})",
                other
            ));
        }
    }

    e
}

/// Subject attribute requirements per type (CABF BR 7.1.4.2.2, EV
/// Guidelines 9.2).
fn check_subject(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();
    let subject = &d.cert.subject;

    match d.cert_type {
        CertType::Ev => {
            if subject.organization().is_none() {
                e.err("EV certificate is missing the organizationName subject attribute");
            }
            if subject.country().is_none() {
                e.err("EV certificate is missing the countryName subject attribute");
            }
            if subject.first("serialNumber").is_none() {
                e.warning("EV certificate is missing the serialNumber subject attribute");
            }
        }
        CertType::Ov => {
            if subject.organization().is_none() {
                e.err("OV certificate is missing the organizationName subject attribute");
            }
        }
        CertType::Dv => {
            if subject.organization().is_some() {
                e.warning("DV certificate contains an organizationName subject attribute");
            }
            if subject.first("OU").is_some() {
                e.warning("DV certificate contains an organizationalUnitName subject attribute");
            }
        }
        CertType::Ps => {
            if subject.common_name().is_none() && subject.first("emailAddress").is_none() {
                e.err("Personal certificate is missing both commonName and emailAddress subject attributes");
            }
        }
        CertType::Cs => {
            if subject.organization().is_none() {
                e.err("Code signing certificate is missing the organizationName subject attribute");
            }
        }
        _ => {}
    }

    if let Some(country) = subject.country() {
        if country.len() != 2 || !country.bytes().all(|b| b.is_ascii_alphabetic()) {
            e.err(format!(
                "Certificate contains an invalid country code ({})",
                country
            ));
        }
    }

    e
}

fn check_subject_alt_name(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    if d.cert.san.is_empty() {
        e.err("Certificate contains no subjectAltName");
        return e;
    }

    for name in d.cert.san_dns() {
        if !util::valid_dns_name(name) {
            e.err(format!(
                "Certificate contains an invalid DNS name in its subjectAltName ({})",
                name
            ));
        }
    }

    // CABF BR 7.1.4.3: a commonName must repeat a value from the SAN.
    if let Some(cn) = d.cert.subject.common_name() {
        let cn_lower = cn.to_ascii_lowercase();
        let covered = d.cert.san.iter().any(|entry| match entry {
            SanEntry::Dns(name) => util::hostname_matches(name, &cn_lower),
            SanEntry::Ip(addr) => cn.parse::<std::net::IpAddr>().map_or(false, |ip| ip == *addr),
            _ => false,
        });
        if !covered {
            e.warning(format!(
                "Certificate commonName ({}) is not present in the subjectAltName",
                cn
            ));
        }
    }

    e
}

/// Maximum validity in days for EV certificates.
const EV_MAX_VALIDITY_DAYS: i64 = 825;
/// Maximum validity in days for the other leaf types (39 months).
const LEAF_MAX_VALIDITY_DAYS: i64 = 1187;

fn check_validity(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    if d.cert.not_before > d.cert.not_after {
        e.err("Certificate notBefore is after notAfter");
        return e;
    }

    let days = (d.cert.not_after - d.cert.not_before) / 86_400;
    let max = match d.cert_type {
        CertType::Ev => EV_MAX_VALIDITY_DAYS,
        _ => LEAF_MAX_VALIDITY_DAYS,
    };
    if days > max {
        e.err(format!(
            "Certificate validity of {} days exceeds the {} day maximum for type {}",
            days, max, d.cert_type
        ));
    }

    e
}

fn check_version(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    if d.cert.version != 3 {
        e.err(format!(
            "Certificate is version {}, only version 3 is allowed",
            d.cert.version
        ));
    }

    e
}

/// A wildcard may only occupy the entire left-most label.
fn check_wildcard(d: &CertData) -> FindingSet {
    let mut e = FindingSet::new();

    for name in wildcard_candidates(d) {
        if name.contains('*') {
            let well_placed = name.starts_with("*.") && name.matches('*').count() == 1;
            if !well_placed && name != "*" {
                e.err(format!(
                    "Certificate contains a wildcard outside the left-most label ({})",
                    name
                ));
            }
        }
    }

    e
}

/// Names a wildcard rule must consider: SAN DNS entries plus a DNS-shaped
/// commonName.
fn wildcard_candidates(d: &CertData) -> Vec<&str> {
    let mut names: Vec<&str> = d.cert.san_dns().collect();
    if let Some(cn) = d.cert.subject.common_name() {
        if !cn.contains(' ') && !names.contains(&cn) {
            names.push(cn);
        }
    }
    names
}

fn is_known_eku(eku: &str) -> bool {
    matches!(
        eku,
        oid::EKU_SERVER_AUTH
            | oid::EKU_CLIENT_AUTH
            | oid::EKU_CODE_SIGNING
            | oid::EKU_EMAIL_PROTECTION
            | oid::EKU_TIME_STAMPING
            | oid::EKU_OCSP_SIGNING
            | oid::EKU_ANY
            | oid::EKU_MS_SERVER_GATED_CRYPTO
            | oid::EKU_NS_SERVER_GATED_CRYPTO
    )
}

/// Extension OIDs this linter understands. Used to flag unrecognized
/// critical extensions per RFC 5280 Section 4.2.
fn is_known_extension(oid: &str) -> bool {
    matches!(
        oid,
        oid::EXT_SUBJECT_KEY_ID
            | oid::EXT_KEY_USAGE
            | oid::EXT_SUBJECT_ALT_NAME
            | oid::EXT_BASIC_CONSTRAINTS
            | oid::EXT_NAME_CONSTRAINTS
            | oid::EXT_CRL_DISTRIBUTION_POINTS
            | oid::EXT_CERTIFICATE_POLICIES
            | oid::EXT_AUTHORITY_KEY_ID
            | oid::EXT_EXTENDED_KEY_USAGE
            | oid::EXT_AUTHORITY_INFO_ACCESS
            | oid::EXT_SCT_LIST
            | oid::EXT_CT_POISON
    )
}
