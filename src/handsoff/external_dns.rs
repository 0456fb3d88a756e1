// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Detection of records owned by Kubernetes external-dns.
//!
//! external-dns writes a TXT ownership record next to every record it manages.
//! The TXT label encodes the managed label, optionally with the configured
//! `--txt-prefix` and a type prefix (`a-`, `cname.`, ...). Older releases
//! wrote no type prefix; those are matched against every common type.

use std::collections::BTreeSet;

use crate::constants::{
    APEX_LABEL, EXTERNAL_DNS_HERITAGE, EXTERNAL_DNS_LEGACY_TYPES, EXTERNAL_DNS_TYPE_PREFIXES,
};
use crate::models::{make_fqdn, Rdata, Record, RecordKey};

/// Label and types an ownership TXT claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipClaim {
    /// Short label of the managed records
    pub label: String,
    /// Uppercase types claimed at that label
    pub rtypes: Vec<String>,
}

/// True if the record is an external-dns ownership TXT.
#[must_use]
pub fn is_ownership_txt(record: &Record) -> bool {
    match &record.rdata {
        Rdata::Txt(segments) => segments.concat().contains(EXTERNAL_DNS_HERITAGE),
        _ => false,
    }
}

/// Decode the managed label and types from an ownership TXT's own label.
#[must_use]
pub fn parse_ownership_label(txt_label: &str, prefix: &str) -> OwnershipClaim {
    let label = if txt_label == APEX_LABEL { "" } else { txt_label };
    let residue = if prefix.is_empty() {
        label
    } else {
        label.strip_prefix(prefix).unwrap_or(label)
    };
    let residue = residue.trim_start_matches('.');

    for type_prefix in EXTERNAL_DNS_TYPE_PREFIXES {
        if residue == *type_prefix {
            return OwnershipClaim {
                label: APEX_LABEL.to_string(),
                rtypes: vec![type_prefix.to_ascii_uppercase()],
            };
        }
        let stripped = residue
            .strip_prefix(&format!("{type_prefix}-"))
            .or_else(|| residue.strip_prefix(&format!("{type_prefix}.")));
        if let Some(rest) = stripped {
            return OwnershipClaim {
                label: apex_if_empty(rest),
                rtypes: vec![type_prefix.to_ascii_uppercase()],
            };
        }
    }

    OwnershipClaim {
        label: apex_if_empty(residue),
        rtypes: EXTERNAL_DNS_LEGACY_TYPES
            .iter()
            .map(|t| (*t).to_string())
            .collect(),
    }
}

fn apex_if_empty(label: &str) -> String {
    if label.is_empty() {
        APEX_LABEL.to_string()
    } else {
        label.to_string()
    }
}

/// Existing records owned by external-dns, ownership TXTs included.
#[must_use]
pub fn find_managed<'a>(existing: &'a [Record], zone: &str, prefix: &str) -> Vec<&'a Record> {
    let mut keys: BTreeSet<RecordKey> = BTreeSet::new();
    let mut txts: Vec<&Record> = Vec::new();

    for record in existing.iter().filter(|r| is_ownership_txt(r)) {
        let claim = parse_ownership_label(&record.label, prefix);
        let name = make_fqdn(&claim.label, zone);
        for rtype in claim.rtypes {
            keys.insert(RecordKey::new(name.clone(), rtype));
        }
        txts.push(record);
    }

    existing
        .iter()
        .filter(|r| keys.contains(&r.key()) || txts.iter().any(|t| std::ptr::eq(*t, *r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txt(label: &str, value: &str) -> Record {
        Record::new(label, "example.com", 300, Rdata::Txt(vec![value.to_string()]))
    }

    const OWNER: &str = "heritage=external-dns,external-dns/owner=default";

    #[test]
    fn test_parse_hyphen_and_dot_prefixes() {
        assert_eq!(
            parse_ownership_label("a-myapp", ""),
            OwnershipClaim {
                label: "myapp".into(),
                rtypes: vec!["A".into()]
            }
        );
        assert_eq!(
            parse_ownership_label("cname.www.app", ""),
            OwnershipClaim {
                label: "www.app".into(),
                rtypes: vec!["CNAME".into()]
            }
        );
        assert_eq!(parse_ownership_label("aaaa-v6", "").rtypes, vec!["AAAA"]);
    }

    #[test]
    fn test_parse_bare_mnemonic_is_apex() {
        let claim = parse_ownership_label("a", "");
        assert_eq!(claim.label, "@");
        assert_eq!(claim.rtypes, vec!["A"]);

        let with_prefix = parse_ownership_label("extdns-cname", "extdns-");
        assert_eq!(with_prefix.label, "@");
        assert_eq!(with_prefix.rtypes, vec!["CNAME"]);
    }

    #[test]
    fn test_parse_with_user_prefix() {
        let claim = parse_ownership_label("extdns-a-api", "extdns-");
        assert_eq!(claim.label, "api");
        assert_eq!(claim.rtypes, vec!["A"]);
    }

    #[test]
    fn test_parse_legacy_over_matches() {
        let claim = parse_ownership_label("legacyapp", "");
        assert_eq!(claim.label, "legacyapp");
        assert_eq!(claim.rtypes.len(), 6);
        assert!(claim.rtypes.contains(&"SRV".to_string()));
    }

    #[test]
    fn test_find_managed() {
        let existing = vec![
            txt("a-myapp", OWNER),
            Record::new("myapp", "example.com", 300, Rdata::A("10.0.0.1".parse().unwrap())),
            Record::new("myapp", "example.com", 300, Rdata::Aaaa("::1".parse().unwrap())),
            Record::new("other", "example.com", 300, Rdata::A("10.0.0.2".parse().unwrap())),
            txt("plain", "v=spf1 -all"),
        ];
        let managed = find_managed(&existing, "example.com", "");
        let described: Vec<String> = managed.iter().map(|r| r.to_string()).collect();
        assert_eq!(managed.len(), 2, "{described:?}");
        assert!(managed.iter().any(|r| r.rtype() == "TXT"));
        assert!(managed.iter().any(|r| r.rtype() == "A" && r.label == "myapp"));
    }

    #[test]
    fn test_find_managed_legacy() {
        let existing = vec![
            txt("legacy", OWNER),
            Record::new("legacy", "example.com", 300, Rdata::A("10.0.0.1".parse().unwrap())),
            Record::new(
                "legacy",
                "example.com",
                300,
                Rdata::Mx {
                    preference: 10,
                    exchange: "mx.example.com.".into(),
                },
            ),
        ];
        assert_eq!(find_managed(&existing, "example.com", "").len(), 3);
    }
}
