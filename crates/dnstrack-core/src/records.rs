//! Resolved record types
//!
//! A [`RecordSet`] is the raw answer of one lookup, in wire order. It is not
//! keyed: duplicates and reordering between polls are expected and are
//! handled by the normalizer, not here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// DNS record types the tracker can follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// Service locator record
    Srv,
}

impl RecordType {
    /// Canonical upper-case mnemonic
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Srv => "SRV",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "SRV" => Ok(RecordType::Srv),
            _ => Err(crate::Error::unsupported_type(s)),
        }
    }
}

/// One A record from an answer section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ARecord {
    /// Owner name as returned on the wire
    pub owner: String,
    /// IPv4 address
    pub address: Ipv4Addr,
    /// Time-to-live in seconds
    pub ttl: u32,
}

/// One SRV record from an answer section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvRecord {
    /// Owner name as returned on the wire
    pub owner: String,
    /// Target host name
    pub target: String,
    /// Priority (lower is preferred)
    pub priority: u16,
    /// Weight among equal priorities, display only
    pub weight: u16,
    /// Service port, display only
    pub port: u16,
    /// Time-to-live in seconds
    pub ttl: u32,
}

/// A single resolved entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    /// IPv4 address record
    A(ARecord),
    /// Service locator record
    Srv(SrvRecord),
}

impl Record {
    /// Build an A record
    pub fn a(owner: impl Into<String>, address: Ipv4Addr, ttl: u32) -> Self {
        Record::A(ARecord {
            owner: owner.into(),
            address,
            ttl,
        })
    }

    /// Build an SRV record with zero weight and port
    pub fn srv(owner: impl Into<String>, target: impl Into<String>, priority: u16, ttl: u32) -> Self {
        Record::Srv(SrvRecord {
            owner: owner.into(),
            target: target.into(),
            priority,
            weight: 0,
            port: 0,
            ttl,
        })
    }

    /// Owner name as returned on the wire
    pub fn owner(&self) -> &str {
        match self {
            Record::A(a) => &a.owner,
            Record::Srv(srv) => &srv.owner,
        }
    }

    /// Time-to-live in seconds
    pub fn ttl(&self) -> u32 {
        match self {
            Record::A(a) => a.ttl,
            Record::Srv(srv) => srv.ttl,
        }
    }

    /// Type of this record
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::A(_) => RecordType::A,
            Record::Srv(_) => RecordType::Srv,
        }
    }

    /// Value column used by the display: the address or the target
    pub fn value(&self) -> String {
        match self {
            Record::A(a) => a.address.to_string(),
            Record::Srv(srv) => srv.target.clone(),
        }
    }
}

/// Ordered sequence of resolved entries, as received
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Create an empty record set (a valid answer, e.g. NXDOMAIN)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Records in wire order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Iterate over the records in wire order
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the answer was empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_parsing() {
        assert_eq!("a".parse::<RecordType>().unwrap(), RecordType::A);
        assert_eq!("Srv".parse::<RecordType>().unwrap(), RecordType::Srv);
        assert_eq!(RecordType::Srv.to_string(), "SRV");

        let err = "NAPTR".parse::<RecordType>().unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedType(ref t) if t == "NAPTR"));
    }

    #[test]
    fn test_record_accessors() {
        let a = Record::a("example.com.", Ipv4Addr::new(192, 0, 2, 1), 300);
        assert_eq!(a.owner(), "example.com.");
        assert_eq!(a.value(), "192.0.2.1");
        assert_eq!(a.ttl(), 300);
        assert_eq!(a.record_type(), RecordType::A);

        let srv = Record::srv("_sip._udp.example.com.", "sip1.example.com.", 10, 60);
        assert_eq!(srv.value(), "sip1.example.com.");
        assert_eq!(srv.record_type(), RecordType::Srv);
    }

    #[test]
    fn test_record_set_preserves_wire_order() {
        let set: RecordSet = vec![
            Record::a("b.example.com", Ipv4Addr::new(192, 0, 2, 2), 60),
            Record::a("a.example.com", Ipv4Addr::new(192, 0, 2, 1), 60),
        ]
        .into();

        assert_eq!(set.len(), 2);
        assert_eq!(set.records()[0].owner(), "b.example.com");
        assert!(RecordSet::new().is_empty());
    }
}
