// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hands-off policy: keep records the configuration says not to touch.
//!
//! Protected existing records are appended to the desired set, so the diff
//! engine never has to know about `UNMANAGED`, `NO_PURGE` or external-dns.
//! `ENSURE_ABSENT` records are never protected by `NO_PURGE`.

pub mod external_dns;
pub mod glob;

use std::collections::BTreeSet;
use tracing::debug;

use crate::errors::{ConflictError, ZoneError};
use crate::models::{DomainConfig, Record, RecordKey};

use glob::UnmanagedMatcher;

/// Outcome of applying the policy to one zone.
#[derive(Debug, Default)]
pub struct HandsOff {
    /// Desired records with protected records appended
    pub desired: Vec<Record>,
    /// Existing records matched by `UNMANAGED` or external-dns
    pub ignored: Vec<Record>,
    /// Existing records kept only because of `NO_PURGE`
    pub foreign: Vec<Record>,
    /// Informational lines for the operator
    pub messages: Vec<String>,
}

/// Compiled policy for one zone.
#[derive(Debug, Clone)]
pub struct HandsOffPolicy {
    zone: String,
    unmanaged: Vec<UnmanagedMatcher>,
    absences: BTreeSet<(RecordKey, String)>,
    no_purge: bool,
    ignore_external_dns: bool,
    external_dns_prefix: String,
    safety_check: bool,
}

impl HandsOffPolicy {
    /// Compile the policy declared on a domain.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an `UNMANAGED` glob cannot be compiled.
    pub fn from_domain(dc: &DomainConfig) -> Result<Self, ZoneError> {
        let unmanaged = dc
            .unmanaged
            .iter()
            .map(UnmanagedMatcher::compile)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ZoneError::Config(format!("{}: invalid UNMANAGED pattern: {e}", dc.name)))?;

        Ok(Self {
            zone: dc.name.clone(),
            unmanaged,
            absences: dc
                .ensure_absent
                .iter()
                .map(|r| (r.key(), r.comparable()))
                .collect(),
            no_purge: dc.no_purge,
            ignore_external_dns: dc.ignore_external_dns,
            external_dns_prefix: dc.external_dns_prefix.clone(),
            safety_check: dc.unmanaged_safety_check,
        })
    }

    fn is_unmanaged(&self, record: &Record) -> bool {
        self.unmanaged.iter().any(|m| m.matches(record))
    }

    fn is_absent(&self, record: &Record) -> bool {
        self.absences
            .contains(&(record.key(), record.comparable()))
    }

    /// Apply the policy.
    ///
    /// # Errors
    ///
    /// Returns a conflict error when the safety check is enabled and a desired
    /// record also matches an `UNMANAGED` declaration.
    pub fn apply(&self, existing: &[Record], desired: Vec<Record>) -> Result<HandsOff, ZoneError> {
        let desired_keys: BTreeSet<RecordKey> = desired.iter().map(Record::key).collect();

        let mut ignored: Vec<Record> = Vec::new();
        let mut foreign: Vec<Record> = Vec::new();
        for record in existing {
            if self.is_unmanaged(record) {
                ignored.push(record.clone());
            } else if self.no_purge && !desired_keys.contains(&record.key()) && !self.is_absent(record)
            {
                foreign.push(record.clone());
            }
        }
        let unmanaged_count = ignored.len();

        let mut external_count = 0;
        if self.ignore_external_dns {
            for record in external_dns::find_managed(existing, &self.zone, &self.external_dns_prefix) {
                if !contains_record(&ignored, record) {
                    ignored.push(record.clone());
                    external_count += 1;
                }
            }
            // A record both external-dns owned and foreign only needs protecting once.
            foreign.retain(|f| !contains_record(&ignored, f));
        }

        let conflicts: Vec<String> = desired
            .iter()
            .filter(|r| self.is_unmanaged(r))
            .map(Record::describe)
            .collect();

        let mut messages = Vec::new();
        if !conflicts.is_empty() {
            if self.safety_check {
                return Err(ConflictError {
                    zone: self.zone.clone(),
                    conflicts,
                }
                .into());
            }
            for conflict in &conflicts {
                messages.push(format!(
                    "WARNING: {conflict} is both desired and UNMANAGED; the desired value wins"
                ));
            }
        }

        if unmanaged_count > 0 {
            messages.push(format!(
                "INFO: {unmanaged_count} records not being deleted because of UNMANAGED"
            ));
        }
        if external_count > 0 {
            messages.push(format!(
                "INFO: {external_count} records not being deleted because of IGNORE_EXTERNAL_DNS"
            ));
        }
        if !foreign.is_empty() {
            messages.push(format!(
                "INFO: {} records not being deleted because of NO_PURGE",
                foreign.len()
            ));
        }

        debug!(
            zone = %self.zone,
            ignored = ignored.len(),
            foreign = foreign.len(),
            "applied hands-off policy"
        );

        let mut merged = desired;
        for record in ignored.iter().chain(&foreign) {
            if !contains_record(&merged, record) {
                merged.push(record.clone());
            }
        }

        Ok(HandsOff {
            desired: merged,
            ignored,
            foreign,
            messages,
        })
    }
}

fn contains_record(set: &[Record], record: &Record) -> bool {
    let comparable = record.comparable();
    set.iter().any(|r| {
        r.name_fqdn == record.name_fqdn
            && r.rtype() == record.rtype()
            && r.comparable() == comparable
    })
}
