// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Properties that must hold for any zone
//!
//! Idempotence, convergence, CNAME exclusivity, hands-off containment,
//! TTL snapping and dependency ordering.

mod common;

use common::{actionable, contents, rec, rec_ttl, zone, ZONE};
use std::collections::{BTreeMap, BTreeSet};
use zonectl::config::{DnsConfig, DomainSpec, RawRecord};
use zonectl::diff::{by_record, by_record_set, by_zone};
use zonectl::errors::ValidationError;
use zonectl::handsoff::HandsOffPolicy;
use zonectl::models::{Record, UnmanagedConfig};
use zonectl::normalize::normalize;
use zonectl::providers::memory::MemoryProvider;
use zonectl::providers::{plan_changes, DnsProvider, Granularity};

fn mixed_zone() -> Vec<Record> {
    vec![
        rec("@", "NS", "ns1.example.net."),
        rec("@", "NS", "ns2.example.net."),
        rec("@", "MX", "10 mail.example.com."),
        rec("@", "TXT", "\"v=spf1 include:_spf.example.net -all\""),
        rec("www", "A", "192.0.2.1"),
        rec("www", "A", "192.0.2.2"),
        rec("www", "AAAA", "2001:db8::1"),
        rec("mail", "A", "192.0.2.10"),
        rec("blog", "CNAME", "www.example.com."),
        rec("_sip._tcp", "SRV", "10 60 5060 sip.example.com."),
        rec("@", "CAA", "0 issue \"ca.example.net\""),
    ]
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn same_records_in_any_order_produce_no_changes() {
    let existing = mixed_zone();
    let mut desired = mixed_zone();
    desired.reverse();
    desired.swap(1, 5);

    assert!(by_record(&existing, &desired, None).is_empty());
    assert!(by_record_set(&existing, &desired, None).is_empty());
    assert!(by_zone(ZONE, &existing, &desired, None).is_empty());
}

// ============================================================================
// Convergence: applying a plan reaches the desired state
// ============================================================================

#[tokio::test]
async fn applying_the_plan_converges() {
    let existing = vec![
        rec("www", "A", "192.0.2.1"),
        rec("www", "A", "192.0.2.99"),
        rec_ttl("mail", "A", "192.0.2.10", 3600),
        rec("old", "CNAME", "gone.example.net."),
        rec("@", "MX", "20 backup.example.com."),
    ];

    for granularity in [
        Granularity::ByRecord,
        Granularity::ByRecordSet,
        Granularity::ByZone,
    ] {
        let provider = MemoryProvider::new("mem")
            .with_granularity(granularity)
            .with_zone(ZONE, existing.clone());
        let dc = zone(mixed_zone());

        assert!(common::push(&provider, &dc).await > 0);
        assert_eq!(
            contents(&provider.records(ZONE).unwrap()),
            contents(&dc.records),
            "{granularity}"
        );
        assert_eq!(common::push(&provider, &dc).await, 0, "{granularity}");
    }
}

// ============================================================================
// CNAME exclusivity
// ============================================================================

fn raw(rtype: &str, name: &str, target: &str) -> RawRecord {
    RawRecord {
        rtype: rtype.into(),
        name: name.into(),
        target: target.into(),
        ..Default::default()
    }
}

#[test]
fn cname_cannot_share_a_label() {
    let config = DnsConfig {
        domains: vec![
            DomainSpec {
                name: "bad.example".into(),
                records: vec![raw("CNAME", "www", "web.example.net."), raw("A", "www", "192.0.2.1")],
                ..Default::default()
            },
            DomainSpec {
                name: "good.example".into(),
                records: vec![raw("CNAME", "www", "web.example.net."), raw("A", "web", "192.0.2.1")],
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let normalized = normalize(&config, &BTreeSet::new());
    assert!(normalized.rejected.contains("bad.example"));
    assert!(normalized
        .errors()
        .any(|e| matches!(e, ValidationError::CnameConflict { .. })));

    for dc in &normalized.domains {
        let mut by_label: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for r in &dc.records {
            by_label.entry(&r.name_fqdn).or_default().insert(r.rtype());
        }
        for types in by_label.values() {
            assert!(!types.contains("CNAME") || types.len() == 1);
        }
    }
}

// ============================================================================
// Hands-off containment
// ============================================================================

#[test]
fn protected_records_stay_desired_and_absences_are_never_foreign() {
    let mut dc = zone(vec![rec("www", "A", "192.0.2.1")]);
    dc.no_purge = true;
    dc.ignore_external_dns = true;
    dc.unmanaged = vec![UnmanagedConfig {
        label_pattern: "legacy-*".into(),
        ..Default::default()
    }];
    dc.ensure_absent = vec![rec("stale", "A", "192.0.2.66")];

    let existing = vec![
        rec("www", "A", "192.0.2.1"),
        rec("legacy-app", "A", "192.0.2.20"),
        rec("legacy-app", "TXT", "\"owned elsewhere\""),
        rec("a-k8s", "TXT", "\"heritage=external-dns,external-dns/owner=default\""),
        rec("k8s", "A", "10.0.0.1"),
        rec("manual", "A", "192.0.2.30"),
        rec("stale", "A", "192.0.2.66"),
    ];

    let policy = HandsOffPolicy::from_domain(&dc).unwrap();
    let result = policy.apply(&existing, dc.records.clone()).unwrap();

    let desired: BTreeSet<String> = contents(&result.desired).into_iter().collect();
    for kept in result.ignored.iter().chain(&result.foreign) {
        assert!(desired.contains(&contents(std::slice::from_ref(kept))[0]), "{kept}");
    }
    assert!(result.foreign.iter().all(|r| r.label != "stale"));
    assert_eq!(result.ignored.len(), 4);
    assert_eq!(contents(&result.foreign), contents(&[rec("manual", "A", "192.0.2.30")]));
}

// ============================================================================
// TTL snapping
// ============================================================================

#[tokio::test]
async fn snapped_ttls_come_from_the_bucket_list() {
    let buckets = vec![60, 300, 3600, 86400];
    let provider = MemoryProvider::new("mem").with_ttl_buckets(buckets.clone());
    let dc = zone(vec![
        rec_ttl("a", "A", "192.0.2.1", 1),
        rec_ttl("b", "A", "192.0.2.2", 301),
        rec_ttl("c", "A", "192.0.2.3", 100_000),
        rec_ttl("d", "A", "192.0.2.4", 3600),
    ]);

    common::push(&provider, &dc).await;
    let stored = provider
        .get_zone_records(ZONE, &BTreeMap::new())
        .await
        .unwrap();
    assert_eq!(stored.len(), 4);
    assert!(stored.iter().all(|r| buckets.contains(&r.ttl)));

    // Snapped TTLs are not seen as drift.
    assert_eq!(common::push(&provider, &dc).await, 0);
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn names_are_created_before_their_dependents() {
    let dc = zone(vec![
        rec("alias", "CNAME", "chain.example.com."),
        rec("chain", "CNAME", "origin.example.com."),
        rec("origin", "A", "192.0.2.50"),
        rec("@", "MX", "10 mx.example.com."),
        rec("mx", "A", "192.0.2.25"),
    ]);
    let plan = plan_changes(&dc, &[], dc.records.clone(), Granularity::ByRecord, None).unwrap();
    assert!(plan.messages.is_empty());

    let order: Vec<&str> = actionable(&plan.changes)
        .iter()
        .map(|c| c.label.as_str())
        .collect();
    let at = |label: &str| order.iter().position(|l| *l == label).unwrap();
    assert!(at("origin") < at("chain"));
    assert!(at("chain") < at("alias"));
    assert!(at("mx") < at("@"));
}
