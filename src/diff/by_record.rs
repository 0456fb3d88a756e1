// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-record diff.

use super::{comparable, group_records, sort_changes, Change, Group};
use crate::models::{ComparableFn, Record};

/// Diff at single-record granularity.
///
/// Within each RRset, identical records are left alone, records whose content
/// is equal but TTL differs become changes, the remaining records are paired
/// in comparable order as changes, and the surplus becomes creates or deletes.
#[must_use]
pub fn by_record(
    existing: &[Record],
    desired: &[Record],
    extra: Option<&ComparableFn>,
) -> Vec<Change> {
    let mut changes = Vec::new();
    for group in group_records(existing, desired).values() {
        changes.extend(diff_group(group, extra));
    }
    sort_changes(&mut changes);
    changes
}

pub(crate) fn diff_group(group: &Group<'_>, extra: Option<&ComparableFn>) -> Vec<Change> {
    let mut old: Vec<(String, &Record)> = group
        .existing
        .iter()
        .map(|r| (comparable(r, extra), *r))
        .collect();
    let mut new: Vec<(String, &Record)> = group
        .desired
        .iter()
        .map(|r| (comparable(r, extra), *r))
        .collect();

    // Identical content and TTL: nothing to do.
    new.retain(|(cmp, rec)| {
        match old
            .iter()
            .position(|(c, r)| c == cmp && r.ttl == rec.ttl)
        {
            Some(i) => {
                old.remove(i);
                false
            }
            None => true,
        }
    });

    let mut changes = Vec::new();

    // Same content, different TTL.
    new.retain(|(cmp, rec)| match old.iter().position(|(c, _)| c == cmp) {
        Some(i) => {
            let (_, existing) = old.remove(i);
            changes.push(Change::modify(existing.clone(), (*rec).clone()));
            false
        }
        None => true,
    });

    old.sort_by(|a, b| a.0.cmp(&b.0));
    new.sort_by(|a, b| a.0.cmp(&b.0));

    let paired = old.len().min(new.len());
    let surplus_old = old.split_off(paired);
    let surplus_new = new.split_off(paired);

    for ((_, existing), (_, wanted)) in old.into_iter().zip(new) {
        changes.push(Change::modify(existing.clone(), wanted.clone()));
    }
    for (_, wanted) in surplus_new {
        changes.push(Change::create(wanted.clone()));
    }
    for (_, existing) in surplus_old {
        changes.push(Change::delete(existing.clone()));
    }
    changes
}
