// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `IMPORT_TRANSFORM` expansion and per-record `transform` metadata.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use super::ip_transform::TransformTable;
use crate::constants::META_TRANSFORM;
use crate::errors::ValidationError;
use crate::models::{normalize_zone, Rdata, Record};

/// An `IMPORT_TRANSFORM` declaration waiting for its source zone to be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImport {
    /// Zone the records are copied from
    pub source_zone: String,
    /// Transform table text
    pub table: String,
    /// TTL applied to every imported record
    pub ttl: u32,
}

/// Copy `A` and `CNAME` records from `source` into `zone`.
///
/// Imported owners are the source owner re-rooted under `zone`; CNAME targets are
/// re-rooted the same way. Records whose `(type, owner)` already exists in `existing`
/// are skipped.
///
/// # Errors
///
/// Returns a validation error if the table is malformed or a transform overflows.
pub fn expand_import(
    zone: &str,
    import: &PendingImport,
    source: &[Record],
    existing: &[Record],
) -> Result<Vec<Record>, ValidationError> {
    let table: TransformTable =
        import
            .table
            .parse()
            .map_err(|reason| ValidationError::InvalidTransform {
                zone: zone.to_string(),
                table: import.table.clone(),
                reason,
            })?;

    let mut present: BTreeSet<(String, String)> = existing
        .iter()
        .map(|r| (r.rtype().to_string(), r.name_fqdn.clone()))
        .collect();

    let mut imported = Vec::new();
    for record in source {
        let rdatas = match &record.rdata {
            Rdata::A(ip) => apply_table(zone, &import.table, &table, *ip)?
                .into_iter()
                .map(Rdata::A)
                .collect::<Vec<_>>(),
            Rdata::Cname(target) => vec![Rdata::Cname(reroot_target(target, zone))],
            _ => continue,
        };

        let label = record.name_fqdn.clone();
        let owner = format!("{label}.{}", normalize_zone(zone));
        if !present.insert((record.rtype().to_string(), owner)) {
            continue;
        }

        for rdata in rdatas {
            let mut copy = Record::new(&label, zone, import.ttl, rdata);
            copy.metadata = record.metadata.clone();
            copy.metadata.remove(META_TRANSFORM);
            imported.push(copy);
        }
    }
    Ok(imported)
}

/// Apply `metadata.transform` on `A` records; extra addresses become clones.
///
/// # Errors
///
/// Returns every malformed table or overflow encountered.
pub fn apply_record_transforms(
    zone: &str,
    records: Vec<Record>,
) -> Result<Vec<Record>, Vec<ValidationError>> {
    let mut tables: BTreeMap<String, Result<TransformTable, String>> = BTreeMap::new();
    let mut out = Vec::with_capacity(records.len());
    let mut errors = Vec::new();

    for record in records {
        let transform = match (&record.rdata, record.metadata.get(META_TRANSFORM)) {
            (Rdata::A(ip), Some(text)) => Some((*ip, text.clone())),
            _ => None,
        };
        let Some((ip, text)) = transform else {
            out.push(record);
            continue;
        };
        let table = tables
            .entry(text.clone())
            .or_insert_with(|| text.parse::<TransformTable>());

        let table = match table {
            Ok(t) => t,
            Err(reason) => {
                errors.push(ValidationError::InvalidTransform {
                    zone: zone.to_string(),
                    table: text,
                    reason: reason.clone(),
                });
                continue;
            }
        };

        match apply_table(zone, &text, table, ip) {
            Ok(ips) => {
                for new_ip in ips {
                    let mut clone = record.clone();
                    clone.rdata = Rdata::A(new_ip);
                    out.push(clone);
                }
            }
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}

fn apply_table(
    zone: &str,
    text: &str,
    table: &TransformTable,
    ip: Ipv4Addr,
) -> Result<Vec<Ipv4Addr>, ValidationError> {
    table
        .apply(ip)
        .map_err(|reason| ValidationError::InvalidTransform {
            zone: zone.to_string(),
            table: text.to_string(),
            reason,
        })
}

fn reroot_target(target: &str, zone: &str) -> String {
    format!("{}.{}.", target.trim_end_matches('.'), normalize_zone(zone))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(label: &str, zone: &str, ip: &str) -> Record {
        Record::new(label, zone, 300, Rdata::A(ip.parse().unwrap()))
    }

    fn import(table: &str) -> PendingImport {
        PendingImport {
            source_zone: "example.com".to_string(),
            table: table.to_string(),
            ttl: 60,
        }
    }

    #[test]
    fn test_import_rewrites_a_and_cname() {
        let source = vec![
            a("www", "example.com", "10.0.0.5"),
            Record::new(
                "blog",
                "example.com",
                300,
                Rdata::Cname("www.example.com.".to_string()),
            ),
            Record::new(
                "@",
                "example.com",
                300,
                Rdata::Mx {
                    preference: 10,
                    exchange: "mx.example.com.".to_string(),
                },
            ),
        ];

        let imported = expand_import(
            "internal.net",
            &import("10.0.0.0~10.0.0.255~192.168.0.0~"),
            &source,
            &[],
        )
        .unwrap();

        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0].name_fqdn, "www.example.com.internal.net");
        assert_eq!(imported[0].rdata, Rdata::A("192.168.0.5".parse().unwrap()));
        assert_eq!(imported[0].ttl, 60);
        assert_eq!(
            imported[1].rdata,
            Rdata::Cname("www.example.com.internal.net.".to_string())
        );
    }

    #[test]
    fn test_import_skips_present_records() {
        let source = vec![a("www", "example.com", "10.0.0.5")];
        let existing = vec![a("www.example.com", "internal.net", "1.1.1.1")];
        let imported = expand_import(
            "internal.net",
            &import("10.0.0.0~10.0.0.255~~172.16.0.1"),
            &source,
            &existing,
        )
        .unwrap();
        assert!(imported.is_empty());
    }

    #[test]
    fn test_import_multiple_ips() {
        let source = vec![a("www", "example.com", "1.0.0.1")];
        let imported = expand_import(
            "internal.net",
            &import("0.0.0.0~1.1.1.1~~9.0.0.0,10.0.0.0"),
            &source,
            &[],
        )
        .unwrap();
        assert_eq!(imported.len(), 2);
    }

    #[test]
    fn test_import_bad_table() {
        let err = expand_import("internal.net", &import("garbage"), &[], &[]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTransform { .. }));
    }

    #[test]
    fn test_record_transform_clones() {
        let record = a("www", "example.com", "1.0.0.1")
            .with_meta(META_TRANSFORM, "0.0.0.0~1.1.1.1~~9.0.0.0,10.0.0.0");
        let plain = a("api", "example.com", "1.0.0.1");

        let out = apply_record_transforms("example.com", vec![record, plain]).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].rdata, Rdata::A("9.0.0.0".parse().unwrap()));
        assert_eq!(out[1].rdata, Rdata::A("10.0.0.0".parse().unwrap()));
        assert_eq!(out[1].label, "www");
        assert_eq!(out[2].rdata, Rdata::A("1.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_record_transform_bad_table() {
        let record = a("www", "example.com", "1.0.0.1").with_meta(META_TRANSFORM, "1~2");
        let errors = apply_record_transforms("example.com", vec![record]).unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
