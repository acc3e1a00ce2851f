//! Per-worker issuer chain cache.
//!
//! Chains are cached under a 20-byte fingerprint so repeated certificates
//! from the same issuer skip both the AIA downloads and the trust
//! verification. Each worker owns a private cache; nothing here is shared
//! across threads.

use std::collections::HashMap;
use std::collections::VecDeque;

use digest::Digest;
use sha1::Sha1;

use crate::certdata::CertInfo;

/// Cache key: 20 bytes identifying the issuing chain of a certificate.
pub type ChainKey = [u8; 20];

/// A resolved issuer chain.
#[derive(Debug, Clone)]
pub struct IssuerCacheEntry {
    /// Whether the certificate verified against the configured roots.
    pub trusted: bool,
    /// The end-entity's direct issuer, when resolved.
    pub issuer: Option<CertInfo>,
    /// DER of every downloaded intermediate, in download order.
    pub pool: Vec<Vec<u8>>,
}

/// Derive the chain fingerprint for a certificate.
///
/// Preference order: a hash of the AIA issuer URLs (the same issuer can be
/// reached through multiple cross-certification URLs, so the URL set is the
/// most specific identity), then the Authority Key Identifier, then a hash
/// of the raw issuer DN.
pub fn chain_key(cert: &CertInfo) -> ChainKey {
    if !cert.aia_issuer_urls.is_empty() {
        let mut hasher = Sha1::new();
        for url in &cert.aia_issuer_urls {
            hasher.update(url.as_bytes());
            hasher.update([0]);
        }
        return hasher.finalize().into();
    }

    if let Some(aki) = &cert.authority_key_id {
        if let Ok(key) = <ChainKey>::try_from(aki.as_slice()) {
            return key;
        }
        return Sha1::digest(aki).into();
    }

    Sha1::digest(&cert.raw_issuer).into()
}

/// A capacity-bounded least-recently-used map from [`ChainKey`] to
/// [`IssuerCacheEntry`].
///
/// Touch cost is linear in the occupancy, which is fine at the default
/// capacity of 200.
#[derive(Debug)]
pub struct IssuerCache {
    map: HashMap<ChainKey, IssuerCacheEntry>,
    order: VecDeque<ChainKey>,
    capacity: usize,
}

/// Default number of chains each worker keeps.
pub const DEFAULT_CACHE_CAPACITY: usize = 200;

impl IssuerCache {
    pub fn new(capacity: usize) -> Self {
        IssuerCache {
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Look up a chain, marking it most recently used.
    pub fn get(&mut self, key: &ChainKey) -> Option<&IssuerCacheEntry> {
        if !self.map.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.map.get(key)
    }

    /// Insert a resolved chain, evicting the least recently used entry when
    /// at capacity.
    pub fn put(&mut self, key: ChainKey, entry: IssuerCacheEntry) {
        if self.map.insert(key, entry).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        if self.map.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.map.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn touch(&mut self, key: &ChainKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
            self.order.push_back(*key);
        }
    }
}

impl Default for IssuerCache {
    fn default() -> Self {
        IssuerCache::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(trusted: bool) -> IssuerCacheEntry {
        IssuerCacheEntry {
            trusted,
            issuer: None,
            pool: Vec::new(),
        }
    }

    fn key(n: u8) -> ChainKey {
        [n; 20]
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = IssuerCache::new(2);
        cache.put(key(1), entry(true));
        cache.put(key(2), entry(true));
        // Touch key 1 so key 2 becomes the eviction candidate.
        assert!(cache.get(&key(1)).is_some());
        cache.put(key(3), entry(false));

        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(2)).is_none());
        assert!(cache.get(&key(3)).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reinsert_replaces_without_eviction() {
        let mut cache = IssuerCache::new(2);
        cache.put(key(1), entry(true));
        cache.put(key(1), entry(false));
        assert_eq!(cache.len(), 1);
        assert!(!cache.get(&key(1)).unwrap().trusted);
    }

    #[test]
    fn key_prefers_aia_urls() {
        let mut a = CertInfo::default();
        a.aia_issuer_urls = vec!["http://ca.example/issuer.crt".into()];
        a.authority_key_id = Some(vec![1; 20]);

        let mut b = a.clone();
        b.authority_key_id = Some(vec![2; 20]);

        // Same URLs, different AKI: the URL hash dominates.
        assert_eq!(chain_key(&a), chain_key(&b));

        let mut c = a.clone();
        c.aia_issuer_urls = vec!["http://other.example/issuer.crt".into()];
        assert_ne!(chain_key(&a), chain_key(&c));
    }

    #[test]
    fn key_uses_aki_when_no_urls() {
        let mut a = CertInfo::default();
        a.authority_key_id = Some((0..20).collect());
        assert_eq!(chain_key(&a), <ChainKey>::try_from(&(0..20).collect::<Vec<u8>>()[..]).unwrap());

        // Non-20-byte AKI is hashed down to 20 bytes.
        let mut b = CertInfo::default();
        b.authority_key_id = Some(vec![7; 8]);
        assert_eq!(chain_key(&b).len(), 20);
    }

    #[test]
    fn key_is_deterministic() {
        let mut cert = CertInfo::default();
        cert.raw_issuer = b"CN=Some CA".to_vec();
        assert_eq!(chain_key(&cert), chain_key(&cert.clone()));
    }
}
