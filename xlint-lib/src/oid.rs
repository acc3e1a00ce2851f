//! Centralized OID string constants used throughout xlint-lib.
//!
//! Object Identifiers (OIDs) are defined by ITU-T X.660 and referenced
//! extensively in RFC 5280 (X.509), RFC 3279 (algorithms), RFC 5480 (ECC),
//! RFC 8410 (EdDSA), and the CA/Browser Forum Baseline Requirements.
//! Grouping them here avoids magic strings scattered across modules and
//! gives each OID a readable name.

// ── X.509 Distinguished Name attributes (RFC 4519 / X.520) ──────────────

pub const COMMON_NAME: &str = "2.5.4.3";
pub const SERIAL_NUMBER: &str = "2.5.4.5";
pub const COUNTRY: &str = "2.5.4.6";
pub const LOCALITY: &str = "2.5.4.7";
pub const STATE_OR_PROVINCE: &str = "2.5.4.8";
pub const STREET_ADDRESS: &str = "2.5.4.9";
pub const ORGANIZATION: &str = "2.5.4.10";
pub const ORGANIZATIONAL_UNIT: &str = "2.5.4.11";
pub const BUSINESS_CATEGORY: &str = "2.5.4.15";
pub const POSTAL_CODE: &str = "2.5.4.17";
pub const EMAIL_ADDRESS: &str = "1.2.840.113549.1.9.1"; // PKCS#9
pub const DOMAIN_COMPONENT: &str = "0.9.2342.19200300.100.1.25";

// ── Signature algorithms ─────────────────────────────────────────────────

pub const MD2_WITH_RSA: &str = "1.2.840.113549.1.1.2";
pub const MD5_WITH_RSA: &str = "1.2.840.113549.1.1.4";
pub const SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
pub const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
pub const SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";
pub const SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";
pub const RSA_PSS: &str = "1.2.840.113549.1.1.10";
pub const DSA_WITH_SHA1: &str = "1.2.840.10040.4.3";
pub const ECDSA_WITH_SHA1: &str = "1.2.840.10045.4.1";
pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
pub const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
pub const ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";
pub const ED25519: &str = "1.3.101.112";

// ── Public key types ─────────────────────────────────────────────────────

pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
pub const DSA: &str = "1.2.840.10040.4.1";

// ── Named elliptic curves ────────────────────────────────────────────────

pub const CURVE_P256: &str = "1.2.840.10045.3.1.7";
pub const CURVE_P384: &str = "1.3.132.0.34";
pub const CURVE_P521: &str = "1.3.132.0.35";

// ── X.509v3 extensions (RFC 5280 Section 4.2) ───────────────────────────

pub const EXT_SUBJECT_KEY_ID: &str = "2.5.29.14";
pub const EXT_KEY_USAGE: &str = "2.5.29.15";
pub const EXT_SUBJECT_ALT_NAME: &str = "2.5.29.17";
pub const EXT_BASIC_CONSTRAINTS: &str = "2.5.29.19";
pub const EXT_NAME_CONSTRAINTS: &str = "2.5.29.30";
pub const EXT_CRL_DISTRIBUTION_POINTS: &str = "2.5.29.31";
pub const EXT_CERTIFICATE_POLICIES: &str = "2.5.29.32";
pub const EXT_AUTHORITY_KEY_ID: &str = "2.5.29.35";
pub const EXT_EXTENDED_KEY_USAGE: &str = "2.5.29.37";

// ── PKIX Authority Information Access (RFC 5280 Section 4.2.2) ──────────

pub const EXT_AUTHORITY_INFO_ACCESS: &str = "1.3.6.1.5.5.7.1.1";
pub const ACCESS_OCSP: &str = "1.3.6.1.5.5.7.48.1";
pub const ACCESS_CA_ISSUERS: &str = "1.3.6.1.5.5.7.48.2";

// ── Extended Key Usage values (RFC 5280 Section 4.2.1.12) ────────────────

pub const EKU_SERVER_AUTH: &str = "1.3.6.1.5.5.7.3.1";
pub const EKU_CLIENT_AUTH: &str = "1.3.6.1.5.5.7.3.2";
pub const EKU_CODE_SIGNING: &str = "1.3.6.1.5.5.7.3.3";
pub const EKU_EMAIL_PROTECTION: &str = "1.3.6.1.5.5.7.3.4";
pub const EKU_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";
pub const EKU_OCSP_SIGNING: &str = "1.3.6.1.5.5.7.3.9";
pub const EKU_ANY: &str = "2.5.29.37.0";
pub const EKU_MS_SERVER_GATED_CRYPTO: &str = "1.3.6.1.4.1.311.10.3.3";
pub const EKU_NS_SERVER_GATED_CRYPTO: &str = "2.16.840.1.113730.4.1";

// ── Certificate Transparency (RFC 6962) ──────────────────────────────────

pub const EXT_SCT_LIST: &str = "1.3.6.1.4.1.11129.2.4.2";
pub const EXT_CT_POISON: &str = "1.3.6.1.4.1.11129.2.4.3";

// ── CA/Browser Forum certificate policy OIDs ─────────────────────────────

pub const CABF_POLICY_EV: &str = "2.23.140.1.1";
pub const CABF_POLICY_DV: &str = "2.23.140.1.2.1";
pub const CABF_POLICY_OV: &str = "2.23.140.1.2.2";
pub const CABF_POLICY_IV: &str = "2.23.140.1.2.3";
pub const ANY_POLICY: &str = "2.5.29.32.0";

/// CA-specific Extended Validation policy OIDs as published in the root
/// programs. The CABF EV anchor OID is matched separately.
pub const EV_POLICY_OIDS: &[&str] = &[
    "1.3.6.1.4.1.14370.1.6",        // GeoTrust
    "1.3.6.1.4.1.14777.6.1.1",      // Izenpe
    "1.3.6.1.4.1.22234.2.5.2.3.1",  // Keynectis
    "1.3.6.1.4.1.23223.1.1.1",      // StartCom
    "1.3.6.1.4.1.34697.2.1",        // AffirmTrust
    "1.3.6.1.4.1.4146.1.1",         // GlobalSign
    "1.3.6.1.4.1.6449.1.2.1.5.1",   // Comodo
    "1.3.6.1.4.1.782.1.2.1.8.1",    // Network Solutions
    "1.3.6.1.4.1.7879.13.24.1",     // T-Systems
    "1.3.6.1.4.1.8024.0.2.100.1.2", // QuoVadis
    "2.16.578.1.26.1.3.3",          // Buypass
    "2.16.756.1.89.1.2.1.1",        // SwissSign
    "2.16.840.1.113733.1.7.23.6",   // Symantec / VeriSign
    "2.16.840.1.113733.1.7.48.1",   // Thawte
    "2.16.840.1.114028.10.1.2",     // Entrust
    "2.16.840.1.114404.1.1.2.4.1",  // Trustwave
    "2.16.840.1.114412.2.1",        // DigiCert
    "2.16.840.1.114413.1.7.23.3",   // GoDaddy
    "2.16.840.1.114414.1.7.23.3",   // Starfield
];
