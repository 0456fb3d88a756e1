// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dependency ordering of planned changes.
//!
//! Changes carrying dependency hints are emitted only after every change that
//! provides the hinted names. Extraction runs in passes; a pass that makes no
//! progress means a cycle or a missing provider, and the remaining changes are
//! appended in their original order.
//!
//! RFC 2136 helpers live here too: the last-NS guard and submission batching.

use std::collections::BTreeMap;
use tracing::warn;

use crate::constants::SENTINEL_NS_TARGET;
use crate::diff::{Change, ChangeType};
use crate::errors::DependencyUnresolved;
use crate::models::{make_fqdn, Rdata, Record};

/// Order changes so providers run before dependents.
///
/// Returns the ordered changes and, if ordering had to give up, the first
/// change that could not be placed.
#[must_use]
pub fn order_changes(changes: Vec<Change>) -> (Vec<Change>, Option<DependencyUnresolved>) {
    if changes.iter().all(|c| c.dependency_hints.is_empty()) {
        return (changes, None);
    }

    // Pending providers per name; a name is resolved once its count reaches zero.
    let mut pending: BTreeMap<String, usize> = BTreeMap::new();
    for name in changes.iter().filter_map(Change::provides) {
        *pending.entry(name.to_string()).or_default() += 1;
    }
    let mut work = changes;
    let mut ordered = Vec::with_capacity(work.len());
    while !work.is_empty() {
        let (ready, waiting): (Vec<Change>, Vec<Change>) = work
            .into_iter()
            .partition(|c| c.dependency_hints.iter().all(|h| resolved(&pending, h.as_str())));

        if ready.is_empty() {
            let first = &waiting[0];
            let missing: Vec<String> = first
                .dependency_hints
                .iter()
                .filter(|h| !resolved(&pending, h.as_str()))
                .cloned()
                .collect();
            let err = DependencyUnresolved {
                change: first.msg(),
                missing,
            };
            warn!(change = %err.change, "{err}");
            ordered.extend(waiting);
            return (ordered, Some(err));
        }

        for change in &ready {
            if let Some(name) = change.provides() {
                if let Some(count) = pending.get_mut(name) {
                    *count = count.saturating_sub(1);
                }
            }
        }
        ordered.extend(ready);
        work = waiting;
    }
    (ordered, None)
}

fn resolved(pending: &BTreeMap<String, usize>, name: &str) -> bool {
    pending.get(name).copied().unwrap_or(0) == 0
}

/// True if any change touches the apex NS RRset.
#[must_use]
pub fn touches_apex_ns(changes: &[Change], zone: &str) -> bool {
    let apex = make_fqdn("@", zone);
    changes
        .iter()
        .any(|c| c.kind != ChangeType::Report && c.key.rtype == "NS" && c.key.name_fqdn == apex)
}

/// Wrap apex NS edits in a placeholder NS so the zone never loses its last NS.
///
/// The placeholder is created first and deleted last. Plans that leave the apex
/// NS set alone are returned unchanged.
#[must_use]
pub fn wrap_last_ns(changes: Vec<Change>, zone: &str) -> Vec<Change> {
    if !touches_apex_ns(&changes, zone) {
        return changes;
    }
    let apex = make_fqdn("@", zone);
    let ttl = changes
        .iter()
        .filter(|c| c.key.rtype == "NS" && c.key.name_fqdn == apex)
        .flat_map(|c| c.new.iter().chain(&c.old))
        .map(|r| r.ttl)
        .min()
        .unwrap_or(crate::constants::DEFAULT_DNS_RECORD_TTL_SECS);

    let sentinel = Record::new("@", zone, ttl, Rdata::Ns(SENTINEL_NS_TARGET.to_string()));
    let mut wrapped = Vec::with_capacity(changes.len() + 2);
    wrapped.push(Change::create(sentinel.clone()));
    wrapped.extend(changes);
    wrapped.push(Change::delete(sentinel));
    wrapped
}

/// Group consecutive changes at the same owner name into one submission.
///
/// With `buggy_cname`, a CNAME creation at a name the batch already deletes
/// from starts a new batch.
#[must_use]
pub fn submission_batches(changes: Vec<Change>, buggy_cname: bool) -> Vec<Vec<Change>> {
    let mut batches: Vec<Vec<Change>> = Vec::new();
    let mut current: Vec<Change> = Vec::new();

    for change in changes {
        let same_name = current
            .last()
            .is_some_and(|last| last.key.name_fqdn == change.key.name_fqdn);

        let cname_after_delete = buggy_cname
            && change.kind == ChangeType::Create
            && change.key.rtype == "CNAME"
            && current.iter().any(|c| c.kind == ChangeType::Delete);

        if !current.is_empty() && (!same_name || cname_after_delete) {
            batches.push(std::mem::take(&mut current));
        }
        current.push(change);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
#[path = "ordering_tests.rs"]
mod ordering_tests;
