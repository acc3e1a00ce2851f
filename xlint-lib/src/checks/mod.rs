//! The check registries: certificate-level and extension-level rules.
//!
//! Checks are registered into a [`Registry`] value owned by the caller; the
//! application composes one explicitly (usually via
//! [`Registry::with_defaults`]) instead of relying on process-wide state,
//! which keeps tests of rule subsets trivial. Execution order is sorted by
//! check name so output is reproducible across runs. Check functions are
//! plain `fn` pointers over `&CertData`, so dispatch is safe from parallel
//! workers.

mod certificate;
mod extension;
pub mod goodkey;

use crate::certdata::{CertData, Extension};
use crate::classify::CertType;
use crate::findings::FindingSet;

/// A certificate-level check function.
pub type CertCheckFn = fn(&CertData) -> FindingSet;

/// An extension-level check function.
pub type ExtCheckFn = fn(&Extension, &CertData) -> FindingSet;

/// A registered certificate-level rule.
pub struct CertificateCheck {
    pub name: &'static str,
    /// Types this check applies to; `None` means all types.
    pub filter: Option<&'static [CertType]>,
    pub func: CertCheckFn,
}

/// A registered extension-level rule, dispatched by extension OID.
pub struct ExtensionCheck {
    pub name: &'static str,
    pub oid: &'static str,
    pub func: ExtCheckFn,
}

/// Holds the registered rules and dispatches them.
#[derive(Default)]
pub struct Registry {
    certificate: Vec<CertificateCheck>,
    extension: Vec<ExtensionCheck>,
}

impl Registry {
    /// An empty registry. Useful for testing individual rules.
    pub fn new() -> Self {
        Registry::default()
    }

    /// A registry with the complete default rule corpus.
    pub fn with_defaults() -> Self {
        let mut registry = Registry::new();
        certificate::register_defaults(&mut registry);
        extension::register_defaults(&mut registry);
        registry
    }

    /// Register a certificate-level check. `filter` restricts the check to
    /// the listed types.
    pub fn register_certificate(
        &mut self,
        name: &'static str,
        filter: Option<&'static [CertType]>,
        func: CertCheckFn,
    ) {
        self.certificate.push(CertificateCheck { name, filter, func });
        self.certificate.sort_by_key(|c| c.name);
    }

    /// Register an extension-level check under the given extension OID.
    pub fn register_extension(&mut self, name: &'static str, oid: &'static str, func: ExtCheckFn) {
        self.extension.push(ExtensionCheck { name, oid, func });
        self.extension.sort_by_key(|c| c.name);
    }

    /// Run every certificate-level check whose filter accepts the
    /// certificate's type, accumulating findings in name order.
    pub fn check_certificate(&self, data: &CertData) -> FindingSet {
        let mut findings = FindingSet::new();
        for check in &self.certificate {
            if let Some(types) = check.filter {
                if !types.contains(&data.cert_type) {
                    continue;
                }
            }
            findings.append((check.func)(data));
        }
        findings
    }

    /// Run every extension-level check registered for the extension's OID.
    pub fn check_extension(&self, ext: &Extension, data: &CertData) -> FindingSet {
        let mut findings = FindingSet::new();
        for check in &self.extension {
            if check.oid == ext.oid {
                findings.append((check.func)(ext, data));
            }
        }
        findings
    }

    /// Dispatch every extension of the certificate through the extension
    /// registry.
    pub fn check_extensions(&self, data: &CertData) -> FindingSet {
        let mut findings = FindingSet::new();
        for ext in &data.cert.extensions {
            findings.append(self.check_extension(ext, data));
        }
        findings
    }

    pub fn certificate_check_count(&self) -> usize {
        self.certificate.len()
    }

    pub fn extension_check_count(&self) -> usize {
        self.extension.len()
    }
}
