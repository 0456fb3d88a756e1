// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Diff engine: compare existing and desired records at the granularity a
//! provider's API edits them.
//!
//! - [`by_record`]: one change per record
//! - [`by_record_set`]: one change per `(name, type)` RRset
//! - [`by_zone`]: report lines plus one change carrying the whole zone
//!
//! Output is sorted: reports, then deletes, then creates, then changes; within a
//! kind the apex comes first and SOA/NS/A/AAAA lead at each name.

mod by_record;
mod by_set;
mod by_zone;

pub use by_record::by_record;
pub use by_set::by_record_set;
pub use by_zone::{by_zone, ZONE_CHANGE_TYPE};

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::constants::APEX_LABEL;
use crate::models::{normalize_zone, ComparableFn, Record, RecordKey};

/// Kind of change. Declaration order is output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeType {
    /// Informational only
    Report,
    /// Remove records
    Delete,
    /// Add records
    Create,
    /// Replace records
    Change,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Report => "REPORT",
            Self::Delete => "DELETE",
            Self::Create => "CREATE",
            Self::Change => "CHANGE",
        })
    }
}

/// One planned edit.
#[derive(Debug, Clone)]
pub struct Change {
    /// Kind of edit
    pub kind: ChangeType,
    /// RRset this edit touches
    pub key: RecordKey,
    /// Short label of `key`
    pub label: String,
    /// Records removed or replaced
    pub old: Vec<Record>,
    /// Records added or replacing `old`
    pub new: Vec<Record>,
    /// One line per logical edit
    pub msgs: Vec<String>,
    /// Owner names that must be in place before this change runs
    pub dependency_hints: BTreeSet<String>,
}

impl Change {
    /// Build a change of the given kind.
    #[must_use]
    pub fn new(
        kind: ChangeType,
        key: RecordKey,
        label: impl Into<String>,
        old: Vec<Record>,
        new: Vec<Record>,
        msgs: Vec<String>,
    ) -> Self {
        Self {
            kind,
            key,
            label: label.into(),
            old,
            new,
            msgs,
            dependency_hints: BTreeSet::new(),
        }
    }

    /// An informational change.
    #[must_use]
    pub fn report(key: RecordKey, label: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(ChangeType::Report, key, label, vec![], vec![], vec![msg.into()])
    }

    /// Single-record creation.
    #[must_use]
    pub fn create(record: Record) -> Self {
        let msg = format!("+ CREATE {}", record.describe());
        Self::new(
            ChangeType::Create,
            record.key(),
            record.label.clone(),
            vec![],
            vec![record],
            vec![msg],
        )
    }

    /// Single-record deletion.
    #[must_use]
    pub fn delete(record: Record) -> Self {
        let msg = format!("- DELETE {}", record.describe());
        Self::new(
            ChangeType::Delete,
            record.key(),
            record.label.clone(),
            vec![record],
            vec![],
            vec![msg],
        )
    }

    /// Single-record replacement.
    #[must_use]
    pub fn modify(old: Record, new: Record) -> Self {
        let msg = modify_msg(&old, &new);
        Self::new(
            ChangeType::Change,
            new.key(),
            new.label.clone(),
            vec![old],
            vec![new],
            vec![msg],
        )
    }

    /// Owner name this change makes available, for creates and changes.
    #[must_use]
    pub fn provides(&self) -> Option<&str> {
        match self.kind {
            ChangeType::Create | ChangeType::Change => Some(&self.key.name_fqdn),
            ChangeType::Report | ChangeType::Delete => None,
        }
    }

    /// All messages joined with newlines.
    #[must_use]
    pub fn msg(&self) -> String {
        self.msgs.join("\n")
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg())
    }
}

pub(crate) fn modify_msg(old: &Record, new: &Record) -> String {
    format!(
        "± MODIFY {} {} ({} ttl={}) -> ({} ttl={})",
        new.label,
        new.rtype(),
        old.rdata,
        old.ttl,
        new.rdata,
        new.ttl
    )
}

/// Records of one RRset on each side of the diff.
#[derive(Debug, Default)]
pub(crate) struct Group<'a> {
    pub(crate) existing: Vec<&'a Record>,
    pub(crate) desired: Vec<&'a Record>,
}

pub(crate) fn group_records<'a>(
    existing: &'a [Record],
    desired: &'a [Record],
) -> BTreeMap<RecordKey, Group<'a>> {
    let mut groups: BTreeMap<RecordKey, Group<'a>> = BTreeMap::new();
    for record in existing {
        groups.entry(record.key()).or_default().existing.push(record);
    }
    for record in desired {
        groups.entry(record.key()).or_default().desired.push(record);
    }
    groups
}

pub(crate) fn comparable(record: &Record, extra: Option<&ComparableFn>) -> String {
    record.comparable_with(extra)
}

fn type_rank(rtype: &str) -> u8 {
    match rtype {
        "SOA" => 0,
        "NS" => 1,
        "A" => 2,
        "AAAA" => 3,
        _ => 4,
    }
}

/// Reverse a label's components so siblings sort together (`b.a` before `a.c`).
fn label_sort_key(label: &str) -> Vec<&str> {
    label.rsplit('.').collect()
}

fn compare_changes(a: &Change, b: &Change) -> Ordering {
    a.kind
        .cmp(&b.kind)
        .then_with(|| (a.label != APEX_LABEL).cmp(&(b.label != APEX_LABEL)))
        .then_with(|| label_sort_key(&a.label).cmp(&label_sort_key(&b.label)))
        .then_with(|| type_rank(&a.key.rtype).cmp(&type_rank(&b.key.rtype)))
        .then_with(|| a.key.rtype.cmp(&b.key.rtype))
}

/// Stable sort into output order.
pub fn sort_changes(changes: &mut [Change]) {
    changes.sort_by(compare_changes);
}

/// Replace every `CHANGE` by its deletions followed by its creations.
///
/// Consecutive changes to the same RRset are split together, so all of the
/// set's deletions precede all of its creations.
#[must_use]
pub fn split_changes(changes: Vec<Change>) -> Vec<Change> {
    let mut out = Vec::with_capacity(changes.len() * 2);
    let mut pending_creates: Vec<Change> = Vec::new();
    let mut pending_key: Option<RecordKey> = None;

    for change in changes {
        if pending_key.as_ref() != Some(&change.key) || change.kind != ChangeType::Change {
            out.append(&mut pending_creates);
            pending_key = None;
        }
        if change.kind != ChangeType::Change {
            out.push(change);
            continue;
        }
        pending_key = Some(change.key.clone());
        for record in change.old {
            out.push(Change::delete(record));
        }
        for record in change.new {
            pending_creates.push(Change::create(record));
        }
    }
    out.append(&mut pending_creates);
    out
}

/// Fill `dependency_hints`: in-zone targets of new records that another change provides.
pub fn annotate_dependencies(changes: &mut [Change], zone: &str) {
    let zone = normalize_zone(zone);
    let provided: BTreeSet<String> = changes
        .iter()
        .filter_map(Change::provides)
        .map(str::to_string)
        .collect();

    for change in changes.iter_mut() {
        let own = change.key.name_fqdn.clone();
        let hints: BTreeSet<String> = change
            .new
            .iter()
            .filter_map(|r| r.rdata.target())
            .map(normalize_zone)
            .filter(|t| *t == zone || t.ends_with(&format!(".{zone}")))
            .filter(|t| *t != own && provided.contains(t))
            .collect();
        change.dependency_hints = hints;
    }
}

/// Number of changes that do something.
#[must_use]
pub fn actionable(changes: &[Change]) -> usize {
    changes
        .iter()
        .filter(|c| c.kind != ChangeType::Report)
        .count()
}
