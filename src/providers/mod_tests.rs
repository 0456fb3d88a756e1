// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `providers/mod.rs`

#[cfg(test)]
mod tests {
    use crate::config::ProviderCredentials;
    use crate::diff::ChangeType;
    use crate::errors::{ConfigError, ZoneError};
    use crate::models::{Correction, DomainConfig, Rdata, Record, UnmanagedConfig};
    use crate::providers::*;

    const ZONE: &str = "example.com";

    fn a(label: &str, ip: &str) -> Record {
        Record::new(label, ZONE, 300, Rdata::A(ip.parse().unwrap()))
    }

    fn domain(records: Vec<Record>) -> DomainConfig {
        DomainConfig {
            name: ZONE.into(),
            records,
            unmanaged_safety_check: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!("by_record".parse::<Granularity>().unwrap(), Granularity::ByRecord);
        assert_eq!("BY-RECORD-SET".parse::<Granularity>().unwrap(), Granularity::ByRecordSet);
        assert_eq!("zone".parse::<Granularity>().unwrap(), Granularity::ByZone);
        assert!("sometimes".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_snap_ttl() {
        let buckets = [60, 300, 3600];
        assert_eq!(snap_ttl(1, &buckets), 60);
        assert_eq!(snap_ttl(300, &buckets), 300);
        assert_eq!(snap_ttl(301, &buckets), 3600);
        assert_eq!(snap_ttl(86400, &buckets), 3600);
        assert_eq!(snap_ttl(42, &[]), 42);
    }

    #[test]
    fn test_check_credentials_lists_every_missing_key() {
        let mut creds = ProviderCredentials::default();
        creds.values.insert("api_url".into(), "http://x".into());
        creds.values.insert("colour".into(), "blue".into());

        let err = check_credentials("pdns", &creds, &["api_url", "api_key", "server_name"], &[])
            .unwrap_err();
        match err {
            ConfigError::MissingCredentials { provider, keys } => {
                assert_eq!(provider, "pdns");
                assert_eq!(keys, vec!["api_key", "server_name"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(check_credentials("pdns", &creds, &["api_url"], &[]).is_ok());
    }

    #[test]
    fn test_check_credentials_empty_value_is_missing() {
        let mut creds = ProviderCredentials::default();
        creds.values.insert("api_key".into(), String::new());
        assert!(check_credentials("pdns", &creds, &["api_key"], &[]).is_err());
    }

    #[test]
    fn test_plan_changes_applies_no_purge() {
        let existing = vec![a("foo1", "1.1.1.1"), a("foo2", "2.2.2.2"), a("foo3", "3.3.3.3")];
        let mut dc = domain(vec![a("foo1", "1.1.1.1"), a("foo2", "2.2.2.2")]);
        dc.no_purge = true;

        let plan = plan_changes(&dc, &existing, dc.records.clone(), Granularity::ByRecord, None)
            .unwrap();
        assert!(plan.changes.is_empty());
        assert!(plan.messages.iter().any(|m| m.contains("NO_PURGE")));
    }

    #[test]
    fn test_plan_changes_orders_dependencies() {
        let dc = domain(vec![
            Record::new("www", ZONE, 300, Rdata::Cname("origin.example.com.".into())),
            a("origin", "1.1.1.1"),
        ]);
        let plan = plan_changes(&dc, &[], dc.records.clone(), Granularity::ByRecord, None).unwrap();
        let labels: Vec<&str> = plan.changes.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["origin", "www"]);
    }

    #[test]
    fn test_plan_changes_safety_check_conflict() {
        let mut dc = domain(vec![a("foo", "1.1.1.1")]);
        dc.unmanaged.push(UnmanagedConfig {
            label_pattern: "foo".into(),
            ..Default::default()
        });
        let result = plan_changes(&dc, &[], dc.records.clone(), Granularity::ByRecord, None);
        assert!(matches!(result, Err(ZoneError::Conflict(_))));
    }

    #[test]
    fn test_plan_by_zone_granularity() {
        let dc = domain(vec![a("www", "1.2.3.4")]);
        let plan = plan_changes(&dc, &[a("www", "4.3.2.1")], dc.records.clone(), Granularity::ByZone, None)
            .unwrap();
        assert_eq!(plan.changes.last().unwrap().kind, ChangeType::Change);
    }

    #[tokio::test]
    async fn test_into_corrections_keeps_reports_first() {
        let plan = Plan {
            changes: vec![
                crate::diff::Change::report(a("x", "1.1.1.1").key(), "x", "note"),
                crate::diff::Change::create(a("www", "1.2.3.4")),
            ],
            messages: vec!["INFO: hello".into()],
        };
        let corrections = plan.into_corrections(|change| Correction::new(change.msg(), || async { Ok(()) }));
        assert_eq!(corrections.len(), 3);
        assert!(corrections[0].is_report());
        assert_eq!(corrections[0].msg, "INFO: hello");
        assert!(corrections[1].is_report());
        assert!(!corrections[2].is_report());
        for c in corrections {
            c.execute().await.unwrap();
        }
    }
}
