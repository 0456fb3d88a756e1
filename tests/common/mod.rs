// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use zonectl::diff::{Change, ChangeType};
use zonectl::models::{DomainConfig, Rdata, Record};
use zonectl::providers::memory::MemoryProvider;
use zonectl::providers::DnsProvider;

pub const ZONE: &str = "example.com";

/// Record in the test zone from presentation text.
pub fn rec(label: &str, rtype: &str, content: &str) -> Record {
    rec_ttl(label, rtype, content, 300)
}

pub fn rec_ttl(label: &str, rtype: &str, content: &str, ttl: u32) -> Record {
    Record::new(label, ZONE, ttl, Rdata::parse(rtype, content).unwrap())
}

/// Zone with the given desired records and defaults otherwise.
pub fn zone(records: Vec<Record>) -> DomainConfig {
    DomainConfig {
        name: ZONE.into(),
        records,
        ..Default::default()
    }
}

/// Changes that would touch the provider.
pub fn actionable(changes: &[Change]) -> Vec<&Change> {
    changes
        .iter()
        .filter(|c| c.kind != ChangeType::Report)
        .collect()
}

/// Plan against the memory provider and run every correction.
///
/// Returns the number of corrections that had an operation.
pub async fn push(provider: &MemoryProvider, dc: &DomainConfig) -> usize {
    provider.ensure_zone_exists(&dc.name).await.unwrap();
    let existing = provider
        .get_zone_records(&dc.name, &BTreeMap::new())
        .await
        .unwrap();
    let corrections = provider.get_zone_records_corrections(dc, existing).unwrap();
    let mut ran = 0;
    for correction in corrections {
        if !correction.is_report() {
            ran += 1;
        }
        correction.execute().await.unwrap();
    }
    ran
}

/// Sorted `label TYPE content ttl` lines, for comparing zone contents.
pub fn contents(records: &[Record]) -> Vec<String> {
    let mut lines: Vec<String> = records
        .iter()
        .map(|r| format!("{} {} {}", r, r.ttl, r.comparable()))
        .collect();
    lines.sort();
    lines
}
