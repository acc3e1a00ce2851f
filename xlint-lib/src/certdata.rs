//! The canonical parsed form of one certificate.
//!
//! [`CertData`] bundles the raw DER, an owned [`CertInfo`] extracted with
//! `x509-parser`, the classification tag, and the resolved issuer state.
//! Everything is owned so the model can cross thread boundaries; code that
//! needs to redo cryptographic operations re-parses the retained DER.

use std::net::IpAddr;

use serde::Serialize;
use x509_parser::prelude::*;

use crate::classify::{classify, CertType};
use crate::oid;
use crate::XlintError;

/// Distinguished name with ordered components.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DistinguishedName {
    /// Ordered list of (attribute_type, value) pairs.
    /// Attribute types use short names where known (e.g., "CN", "O", "C").
    pub components: Vec<(String, String)>,
}

impl DistinguishedName {
    /// Format as a comma-separated one-line string matching OpenSSL's default
    /// format. Example: "C = US, O = Org, CN = example.com"
    pub fn to_oneline(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.components.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            result.push_str(k);
            result.push_str(" = ");
            for ch in v.chars() {
                match ch {
                    '\\' => result.push_str("\\\\"),
                    ',' => result.push_str("\\,"),
                    '=' => result.push_str("\\="),
                    _ => result.push(ch),
                }
            }
        }
        result
    }

    /// First value of the given short attribute name.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values of the given short attribute name, in order.
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.components
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn common_name(&self) -> Option<&str> {
        self.first("CN")
    }

    pub fn organization(&self) -> Option<&str> {
        self.first("O")
    }

    pub fn country(&self) -> Option<&str> {
        self.first("C")
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_oneline())
    }
}

/// Public key information extracted from the SubjectPublicKeyInfo.
#[derive(Debug, Clone, Serialize)]
pub struct PublicKeyInfo {
    /// Algorithm name: "RSA", "EC", "Ed25519", or the raw OID if unknown.
    pub algorithm: String,
    /// Key size in bits (modulus size for RSA, field size for EC).
    pub bits: Option<u32>,
    /// Named curve for EC keys ("P-256", "P-384", "P-521", or the OID).
    pub curve: Option<String>,
    /// RSA modulus bytes, big-endian, without the DER sign padding byte.
    pub modulus: Option<Vec<u8>>,
    /// RSA public exponent (typically 65537).
    pub exponent: Option<u64>,
}

/// A certificate extension, kept with its raw value so extension-level
/// checks can inspect encodings the typed model does not carry.
#[derive(Debug, Clone, Serialize)]
pub struct Extension {
    /// OID as a dotted-decimal string.
    pub oid: String,
    /// Whether this extension is marked critical.
    pub critical: bool,
    /// Raw extnValue contents.
    pub value: Vec<u8>,
}

/// Subject Alternative Name entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SanEntry {
    Dns(String),
    Email(String),
    Ip(IpAddr),
    /// An iPAddress with a length that is neither 4 nor 16 octets.
    IpInvalid(Vec<u8>),
    Uri(String),
    Other(String),
}

/// Key usage bits (RFC 5280 Section 4.2.1.3).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KeyUsage {
    pub flags: u16,
    pub critical: bool,
}

impl KeyUsage {
    pub fn digital_signature(&self) -> bool {
        self.flags & 1 != 0
    }
    pub fn key_encipherment(&self) -> bool {
        self.flags & (1 << 2) != 0
    }
    pub fn key_agreement(&self) -> bool {
        self.flags & (1 << 4) != 0
    }
    pub fn key_cert_sign(&self) -> bool {
        self.flags & (1 << 5) != 0
    }
    pub fn crl_sign(&self) -> bool {
        self.flags & (1 << 6) != 0
    }
}

/// Basic constraints (RFC 5280 Section 4.2.1.9).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BasicConstraints {
    pub ca: bool,
    pub path_len: Option<u32>,
    pub critical: bool,
}

/// Owned, lint-oriented view of a parsed X.509 certificate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CertInfo {
    /// Certificate version (1, 2, or 3).
    pub version: u32,
    /// Serial number content octets as encoded, big-endian.
    pub serial: Vec<u8>,
    /// Signature algorithm OID (dotted-decimal).
    pub signature_algorithm: String,
    pub subject: DistinguishedName,
    pub issuer: DistinguishedName,
    /// Raw DER of the subject Name, for byte-exact comparisons.
    pub raw_subject: Vec<u8>,
    /// Raw DER of the issuer Name.
    pub raw_issuer: Vec<u8>,
    /// Validity start, Unix timestamp.
    pub not_before: i64,
    /// Validity end, Unix timestamp.
    pub not_after: i64,
    pub public_key: Option<PublicKeyInfo>,
    /// All extensions in certificate order.
    pub extensions: Vec<Extension>,
    pub san: Vec<SanEntry>,
    pub key_usage: Option<KeyUsage>,
    /// Extended key usage OIDs, known and unknown alike.
    pub ext_key_usage: Vec<String>,
    /// Certificate policy OIDs.
    pub policies: Vec<String>,
    pub basic_constraints: Option<BasicConstraints>,
    pub has_name_constraints: bool,
    /// caIssuers URLs from the Authority Information Access extension.
    pub aia_issuer_urls: Vec<String>,
    /// OCSP responder URLs from the AIA extension.
    pub ocsp_urls: Vec<String>,
    /// CRL distribution point URLs.
    pub crl_urls: Vec<String>,
    pub authority_key_id: Option<Vec<u8>>,
    pub subject_key_id: Option<Vec<u8>>,
}

impl CertInfo {
    /// Parse DER bytes into an owned `CertInfo`.
    pub fn parse(der: &[u8]) -> Result<CertInfo, XlintError> {
        let (_, x509) =
            X509Certificate::from_der(der).map_err(|e| XlintError::DerError(format!("{}", e)))?;
        Ok(build_cert_info(&x509))
    }

    /// Human-readable name for the signature algorithm, for finding messages.
    pub fn signature_algorithm_name(&self) -> &str {
        match self.signature_algorithm.as_str() {
            oid::MD2_WITH_RSA => "md2WithRSAEncryption",
            oid::MD5_WITH_RSA => "md5WithRSAEncryption",
            oid::SHA1_WITH_RSA => "sha1WithRSAEncryption",
            oid::SHA256_WITH_RSA => "sha256WithRSAEncryption",
            oid::SHA384_WITH_RSA => "sha384WithRSAEncryption",
            oid::SHA512_WITH_RSA => "sha512WithRSAEncryption",
            oid::RSA_PSS => "rsassaPss",
            oid::DSA_WITH_SHA1 => "dsaWithSHA1",
            oid::ECDSA_WITH_SHA1 => "ecdsa-with-SHA1",
            oid::ECDSA_WITH_SHA256 => "ecdsa-with-SHA256",
            oid::ECDSA_WITH_SHA384 => "ecdsa-with-SHA384",
            oid::ECDSA_WITH_SHA512 => "ecdsa-with-SHA512",
            oid::ED25519 => "Ed25519",
            other => other,
        }
    }

    pub fn extension(&self, oid: &str) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.oid == oid)
    }

    pub fn has_extension(&self, oid: &str) -> bool {
        self.extension(oid).is_some()
    }

    /// DNS names from the SAN extension.
    pub fn san_dns(&self) -> impl Iterator<Item = &str> {
        self.san.iter().filter_map(|e| match e {
            SanEntry::Dns(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn is_expired_at(&self, now_ts: i64) -> bool {
        self.not_after < now_ts
    }
}

/// The canonical parsed, classified representation of one certificate.
#[derive(Debug, Clone)]
pub struct CertData {
    /// Raw DER bytes of the certificate.
    pub der: Vec<u8>,
    /// The structurally decoded certificate. Always present; construction
    /// fails when parsing fails.
    pub cert: CertInfo,
    /// Classification tag. `CertType::Excluded` means "do not lint".
    pub cert_type: CertType,
    /// Parsed issuing certificate, when the chain could be resolved.
    pub issuer: Option<CertInfo>,
    /// Whether the certificate verifies against the configured roots with
    /// the resolved intermediates. `true` implies `issuer` is set.
    pub trusted: bool,
}

impl CertData {
    /// Parse and classify a certificate from DER bytes.
    pub fn load(der: &[u8]) -> Result<CertData, XlintError> {
        let cert = CertInfo::parse(der)?;
        let cert_type = classify(&cert);
        Ok(CertData {
            der: der.to_vec(),
            cert,
            cert_type,
            issuer: None,
            trusted: false,
        })
    }

    /// Install a known issuer (from `--issuer` or the chain resolver).
    pub fn set_issuer(&mut self, issuer: CertInfo) {
        self.issuer = Some(issuer);
    }
}

fn build_cert_info(x509: &X509Certificate) -> CertInfo {
    let tbs = &x509.tbs_certificate;

    let mut info = CertInfo {
        version: tbs.version.0 + 1,
        serial: tbs.raw_serial().to_vec(),
        signature_algorithm: x509.signature_algorithm.algorithm.to_id_string(),
        subject: build_dn(&tbs.subject),
        issuer: build_dn(&tbs.issuer),
        raw_subject: tbs.subject.as_raw().to_vec(),
        raw_issuer: tbs.issuer.as_raw().to_vec(),
        not_before: tbs.validity.not_before.timestamp(),
        not_after: tbs.validity.not_after.timestamp(),
        public_key: build_public_key_info(&tbs.subject_pki),
        ..CertInfo::default()
    };

    for ext in tbs.extensions() {
        info.extensions.push(Extension {
            oid: ext.oid.to_id_string(),
            critical: ext.critical,
            value: ext.value.to_vec(),
        });

        match ext.parsed_extension() {
            ParsedExtension::BasicConstraints(bc) => {
                info.basic_constraints = Some(BasicConstraints {
                    ca: bc.ca,
                    path_len: bc.path_len_constraint,
                    critical: ext.critical,
                });
            }
            ParsedExtension::KeyUsage(ku) => {
                info.key_usage = Some(KeyUsage {
                    flags: ku.flags,
                    critical: ext.critical,
                });
            }
            ParsedExtension::ExtendedKeyUsage(eku) => {
                collect_ekus(eku, &mut info.ext_key_usage);
            }
            ParsedExtension::SubjectAlternativeName(san) => {
                for gn in &san.general_names {
                    info.san.push(general_name_to_san_entry(gn));
                }
            }
            ParsedExtension::CertificatePolicies(policies) => {
                for policy in policies.iter() {
                    info.policies.push(policy.policy_id.to_id_string());
                }
            }
            ParsedExtension::AuthorityInfoAccess(aia) => {
                for desc in &aia.accessdescs {
                    if let GeneralName::URI(uri) = &desc.access_location {
                        match desc.access_method.to_id_string().as_str() {
                            oid::ACCESS_CA_ISSUERS => {
                                info.aia_issuer_urls.push(uri.to_string());
                            }
                            oid::ACCESS_OCSP => info.ocsp_urls.push(uri.to_string()),
                            _ => {}
                        }
                    }
                }
            }
            ParsedExtension::CRLDistributionPoints(cdp) => {
                for point in &cdp.points {
                    if let Some(x509_parser::extensions::DistributionPointName::FullName(names)) =
                        &point.distribution_point
                    {
                        for gn in names {
                            if let GeneralName::URI(uri) = gn {
                                info.crl_urls.push(uri.to_string());
                            }
                        }
                    }
                }
            }
            ParsedExtension::AuthorityKeyIdentifier(aki) => {
                info.authority_key_id = aki.key_identifier.as_ref().map(|ki| ki.0.to_vec());
            }
            ParsedExtension::SubjectKeyIdentifier(ski) => {
                info.subject_key_id = Some(ski.0.to_vec());
            }
            ParsedExtension::NameConstraints(_) => {
                info.has_name_constraints = true;
            }
            _ => {}
        }
    }

    info
}

pub(crate) fn build_dn(name: &X509Name) -> DistinguishedName {
    let mut components = Vec::new();
    for rdn in name.iter() {
        for attr in rdn.iter() {
            let key = attr_short_name(&attr.attr_type().to_id_string());
            let value = attr.as_str().unwrap_or("<binary>").to_string();
            components.push((key, value));
        }
    }
    DistinguishedName { components }
}

/// Map common DN attribute OIDs to their short name equivalents.
fn attr_short_name(oid_str: &str) -> String {
    match oid_str {
        oid::COMMON_NAME => "CN".into(),
        oid::SERIAL_NUMBER => "serialNumber".into(),
        oid::COUNTRY => "C".into(),
        oid::LOCALITY => "L".into(),
        oid::STATE_OR_PROVINCE => "ST".into(),
        oid::STREET_ADDRESS => "street".into(),
        oid::ORGANIZATION => "O".into(),
        oid::ORGANIZATIONAL_UNIT => "OU".into(),
        oid::BUSINESS_CATEGORY => "businessCategory".into(),
        oid::POSTAL_CODE => "postalCode".into(),
        oid::EMAIL_ADDRESS => "emailAddress".into(),
        oid::DOMAIN_COMPONENT => "DC".into(),
        other => other.to_string(),
    }
}

fn collect_ekus(eku: &ExtendedKeyUsage, out: &mut Vec<String>) {
    if eku.any {
        out.push(oid::EKU_ANY.to_string());
    }
    if eku.server_auth {
        out.push(oid::EKU_SERVER_AUTH.to_string());
    }
    if eku.client_auth {
        out.push(oid::EKU_CLIENT_AUTH.to_string());
    }
    if eku.code_signing {
        out.push(oid::EKU_CODE_SIGNING.to_string());
    }
    if eku.email_protection {
        out.push(oid::EKU_EMAIL_PROTECTION.to_string());
    }
    if eku.time_stamping {
        out.push(oid::EKU_TIME_STAMPING.to_string());
    }
    if eku.ocsp_signing {
        out.push(oid::EKU_OCSP_SIGNING.to_string());
    }
    for other in &eku.other {
        out.push(other.to_id_string());
    }
}

fn build_public_key_info(spki: &SubjectPublicKeyInfo) -> Option<PublicKeyInfo> {
    let oid_str = spki.algorithm.algorithm.to_id_string();

    match oid_str.as_str() {
        oid::RSA_ENCRYPTION => {
            let (modulus, bits, exponent) = match extract_rsa_params(&spki.subject_public_key.data)
            {
                Some((m, b, e)) => (Some(m), Some(b), Some(e)),
                None => (None, None, None),
            };
            Some(PublicKeyInfo {
                algorithm: "RSA".into(),
                bits,
                curve: None,
                modulus,
                exponent,
            })
        }
        oid::EC_PUBLIC_KEY => {
            let curve = extract_ec_curve(&spki.algorithm);
            let bits = match curve.as_str() {
                "P-256" => Some(256),
                "P-384" => Some(384),
                "P-521" => Some(521),
                _ => None,
            };
            Some(PublicKeyInfo {
                algorithm: "EC".into(),
                bits,
                curve: Some(curve),
                modulus: None,
                exponent: None,
            })
        }
        oid::ED25519 => Some(PublicKeyInfo {
            algorithm: "Ed25519".into(),
            bits: Some(256),
            curve: None,
            modulus: None,
            exponent: None,
        }),
        other => Some(PublicKeyInfo {
            algorithm: other.to_string(),
            bits: None,
            curve: None,
            modulus: None,
            exponent: None,
        }),
    }
}

/// Extract RSA modulus and exponent from raw public key DER.
///
/// Returns `None` if the DER structure cannot be parsed, rather than
/// silently returning incorrect fallback values.
fn extract_rsa_params(data: &[u8]) -> Option<(Vec<u8>, u32, u64)> {
    let (_, parsed) = x509_parser::der_parser::parse_der(data).ok()?;
    let seq = parsed.as_sequence().ok()?;
    let bigint = seq.first().and_then(|m| m.as_bigint().ok())?;
    let bytes = bigint.to_bytes_be().1;
    // Skip leading zero byte used for DER positive integer encoding
    let significant = match bytes.split_first() {
        Some((&0, rest)) if !rest.is_empty() => rest.to_vec(),
        _ => bytes,
    };
    let bits = (significant.len() as u32) * 8;
    let exponent = seq.get(1).and_then(|e| e.as_u64().ok())?;
    Some((significant, bits, exponent))
}

fn extract_ec_curve(algo: &AlgorithmIdentifier) -> String {
    if let Some(params) = &algo.parameters {
        if let Ok(curve_oid) = params.as_oid() {
            return match curve_oid.to_id_string().as_str() {
                oid::CURVE_P256 => "P-256".into(),
                oid::CURVE_P384 => "P-384".into(),
                oid::CURVE_P521 => "P-521".into(),
                other => other.to_string(),
            };
        }
    }
    "unknown".into()
}

fn general_name_to_san_entry(gn: &GeneralName) -> SanEntry {
    match gn {
        GeneralName::DNSName(name) => SanEntry::Dns(name.to_string()),
        GeneralName::RFC822Name(email) => SanEntry::Email(email.to_string()),
        GeneralName::IPAddress(ip_bytes) => {
            if let Ok(octets) = <[u8; 4]>::try_from(*ip_bytes) {
                SanEntry::Ip(IpAddr::from(octets))
            } else if let Ok(octets) = <[u8; 16]>::try_from(*ip_bytes) {
                SanEntry::Ip(IpAddr::from(octets))
            } else {
                SanEntry::IpInvalid(ip_bytes.to_vec())
            }
        }
        GeneralName::URI(uri) => SanEntry::Uri(uri.to_string()),
        other => SanEntry::Other(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dn_oneline_escapes_separators() {
        let dn = DistinguishedName {
            components: vec![
                ("C".into(), "US".into()),
                ("O".into(), "Acme, Inc".into()),
                ("CN".into(), "example.com".into()),
            ],
        };
        assert_eq!(dn.to_oneline(), "C = US, O = Acme\\, Inc, CN = example.com");
        assert_eq!(dn.common_name(), Some("example.com"));
        assert_eq!(dn.organization(), Some("Acme, Inc"));
    }

    #[test]
    fn key_usage_bits() {
        // digitalSignature | keyEncipherment
        let ku = KeyUsage {
            flags: 0b101,
            critical: true,
        };
        assert!(ku.digital_signature());
        assert!(ku.key_encipherment());
        assert!(!ku.key_cert_sign());
        assert!(!ku.crl_sign());
    }

    #[test]
    fn san_dns_filters_entries() {
        let info = CertInfo {
            san: vec![
                SanEntry::Dns("example.com".into()),
                SanEntry::Ip("10.0.0.1".parse().unwrap()),
                SanEntry::Dns("www.example.com".into()),
            ],
            ..CertInfo::default()
        };
        let dns: Vec<_> = info.san_dns().collect();
        assert_eq!(dns, vec!["example.com", "www.example.com"]);
    }
}
