// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-RRset diff.

use super::by_record::diff_group;
use super::{comparable, group_records, sort_changes, Change, ChangeType, Group};
use crate::models::{ComparableFn, Record};

/// Diff at RRset granularity.
///
/// Any difference inside an RRset yields one change carrying every existing and
/// every desired record of the set. Desired TTLs within a set are unified to
/// their minimum, with a report when they disagreed and the set is changing.
#[must_use]
pub fn by_record_set(
    existing: &[Record],
    desired: &[Record],
    extra: Option<&ComparableFn>,
) -> Vec<Change> {
    let mut changes = Vec::new();

    for (key, group) in group_records(existing, desired) {
        let label = group
            .desired
            .first()
            .or_else(|| group.existing.first())
            .map(|r| r.label.clone())
            .unwrap_or_default();

        let wanted = unify_ttl(&group.desired);
        if same_set(&group.existing, &wanted, extra) {
            continue;
        }

        if wanted.len() > 1 && group.desired.iter().any(|r| r.ttl != wanted[0].ttl) {
            changes.push(Change::report(
                key.clone(),
                label.clone(),
                format!(
                    "WARNING: {label} {} has mixed TTLs, using the lowest ({})",
                    key.rtype, wanted[0].ttl
                ),
            ));
        }

        let unified = Group {
            existing: group.existing.clone(),
            desired: wanted.iter().collect(),
        };
        let mut msgs: Vec<String> = diff_group(&unified, extra)
            .into_iter()
            .flat_map(|c| c.msgs)
            .collect();
        msgs.sort();

        let old: Vec<Record> = group.existing.iter().map(|r| (*r).clone()).collect();
        let kind = match (old.is_empty(), wanted.is_empty()) {
            (true, _) => ChangeType::Create,
            (_, true) => ChangeType::Delete,
            _ => ChangeType::Change,
        };
        changes.push(Change::new(kind, key, label, old, wanted, msgs));
    }

    sort_changes(&mut changes);
    changes
}

fn unify_ttl(desired: &[&Record]) -> Vec<Record> {
    let Some(min) = desired.iter().map(|r| r.ttl).min() else {
        return Vec::new();
    };
    desired
        .iter()
        .map(|r| {
            let mut record = (*r).clone();
            record.ttl = min;
            record
        })
        .collect()
}

fn same_set(existing: &[&Record], desired: &[Record], extra: Option<&ComparableFn>) -> bool {
    if existing.len() != desired.len() {
        return false;
    }
    let mut a: Vec<(String, u32)> = existing
        .iter()
        .map(|r| (comparable(r, extra), r.ttl))
        .collect();
    let mut b: Vec<(String, u32)> = desired
        .iter()
        .map(|r| (comparable(r, extra), r.ttl))
        .collect();
    a.sort();
    b.sort();
    a == b
}
