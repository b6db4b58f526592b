//! Record normalization and change fingerprints
//!
//! A poll is reduced to a sorted list of [`ComparisonKey`]s and then hashed.
//! Only fields that represent a meaningful change take part: TTLs count
//! down between polls of an unchanged zone, and resolvers shuffle answers,
//! so neither may produce a fingerprint change.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::records::{Record, RecordSet};

/// Separator between the fields of one comparison key
const FIELD_SEPARATOR: char = '|';

/// Terminator appended after every key before hashing
const KEY_TERMINATOR: u8 = b'\n';

/// Canonical, order-independent form of one record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComparisonKey(String);

impl ComparisonKey {
    fn address(owner: &str, address: &str) -> Self {
        Self(format!("{owner}{FIELD_SEPARATOR}{address}"))
    }

    fn service(owner: &str, target: &str, priority: u16) -> Self {
        Self(format!(
            "{owner}{FIELD_SEPARATOR}{target}{FIELD_SEPARATOR}{priority}"
        ))
    }

    /// The canonical key text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComparisonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-size digest of a normalized record set
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First eight hex digits, for compact display
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

/// Lower-case a DNS name and strip surrounding whitespace and the root dot
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim().to_lowercase();
    match trimmed.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => trimmed,
    }
}

/// Reduce a record set to its sorted, de-duplicated comparison keys
///
/// A records key on (owner, address), SRV records on (owner, target,
/// priority). Repeated entries collapse to one key. An empty answer
/// normalizes to an empty list.
pub fn normalize(records: &RecordSet) -> Vec<ComparisonKey> {
    let mut keys: Vec<ComparisonKey> = records
        .iter()
        .map(|record| match record {
            Record::A(a) => {
                ComparisonKey::address(&normalize_name(&a.owner), &a.address.to_string())
            }
            Record::Srv(srv) => ComparisonKey::service(
                &normalize_name(&srv.owner),
                &normalize_name(&srv.target),
                srv.priority,
            ),
        })
        .collect();

    keys.sort();
    keys.dedup();
    keys
}

/// Hash a normalized key list
///
/// Deterministic across runs and platforms: the digest covers only the key
/// bytes in the given order.
pub fn fingerprint(keys: &[ComparisonKey]) -> Fingerprint {
    let mut hasher = Sha256::new();
    for key in keys {
        hasher.update(key.as_str().as_bytes());
        hasher.update([KEY_TERMINATOR]);
    }
    Fingerprint(hasher.finalize().into())
}

/// Normalize and hash in one step
pub fn fingerprint_records(records: &RecordSet) -> Fingerprint {
    fingerprint(&normalize(records))
}

/// Whether a poll differs from the baseline
///
/// Without a baseline nothing can have changed yet.
pub fn compare(previous: Option<&Fingerprint>, current: &Fingerprint) -> bool {
    match previous {
        Some(previous) => previous != current,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn a(owner: &str, last_octet: u8, ttl: u32) -> Record {
        Record::a(owner, Ipv4Addr::new(192, 0, 2, last_octet), ttl)
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Example.COM."), "example.com");
        assert_eq!(normalize_name("  www.example.com "), "www.example.com");
        assert_eq!(normalize_name("example.com"), "example.com");
    }

    #[test]
    fn test_normalize_sorts_keys() {
        let set: RecordSet = vec![a("example.com", 2, 60), a("EXAMPLE.com.", 1, 60)].into();
        let keys = normalize(&set);

        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].as_str(), "example.com|192.0.2.1");
        assert_eq!(keys[1].as_str(), "example.com|192.0.2.2");
    }

    #[test]
    fn test_duplicate_entries_collapse() {
        let once: RecordSet = vec![a("example.com", 1, 300)].into();
        let twice: RecordSet = vec![a("example.com", 1, 300), a("example.com.", 1, 250)].into();

        assert_eq!(normalize(&twice).len(), 1);
        assert_eq!(fingerprint_records(&once), fingerprint_records(&twice));
        assert!(!compare(Some(&fingerprint_records(&once)), &fingerprint_records(&twice)));
    }

    #[test]
    fn test_srv_key_includes_target_and_priority() {
        let set: RecordSet =
            vec![Record::srv("_sip._udp.Example.com.", "SIP1.example.com.", 10, 60)].into();
        let keys = normalize(&set);
        assert_eq!(keys[0].as_str(), "_sip._udp.example.com|sip1.example.com|10");
    }

    #[test]
    fn test_fingerprint_order_invariant() {
        let forward: RecordSet = vec![a("example.com", 1, 60), a("example.com", 2, 60), a("example.com", 3, 60)].into();
        let reversed: RecordSet = vec![a("example.com", 3, 60), a("example.com", 1, 60), a("example.com", 2, 60)].into();

        assert_eq!(fingerprint_records(&forward), fingerprint_records(&reversed));
    }

    #[test]
    fn test_fingerprint_ignores_ttl() {
        let before: RecordSet = vec![a("example.com", 1, 300)].into();
        let after: RecordSet = vec![a("example.com.", 1, 250)].into();

        assert_eq!(fingerprint_records(&before), fingerprint_records(&after));
    }

    #[test]
    fn test_fingerprint_detects_relevant_fields() {
        let base = fingerprint_records(&vec![a("example.com", 1, 60)].into());

        let other_address = fingerprint_records(&vec![a("example.com", 2, 60)].into());
        let other_owner = fingerprint_records(&vec![a("www.example.com", 1, 60)].into());
        assert_ne!(base, other_address);
        assert_ne!(base, other_owner);

        let srv = fingerprint_records(&vec![Record::srv("_x._tcp.example.com", "a.example.com", 10, 60)].into());
        let srv_priority = fingerprint_records(&vec![Record::srv("_x._tcp.example.com", "a.example.com", 20, 60)].into());
        let srv_target = fingerprint_records(&vec![Record::srv("_x._tcp.example.com", "b.example.com", 10, 60)].into());
        assert_ne!(srv, srv_priority);
        assert_ne!(srv, srv_target);
    }

    #[test]
    fn test_empty_answer_is_comparable() {
        let empty = fingerprint_records(&RecordSet::new());
        assert_eq!(empty, fingerprint(&[]));

        let populated = fingerprint_records(&vec![a("example.com", 1, 60)].into());
        assert!(compare(Some(&populated), &empty));
    }

    #[test]
    fn test_fingerprint_is_stable_across_runs() {
        // SHA-256 of the empty string
        assert_eq!(
            fingerprint(&[]).to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_compare_without_baseline() {
        let fp = fingerprint_records(&vec![a("example.com", 1, 60)].into());
        assert!(!compare(None, &fp));
        assert!(!compare(Some(&fp), &fp));
    }
}
