// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Whole-zone diff.

use super::{by_record, Change, ChangeType};
use crate::constants::APEX_LABEL;
use crate::models::{normalize_zone, ComparableFn, Record, RecordKey};

/// Type used in the key of whole-zone changes.
pub const ZONE_CHANGE_TYPE: &str = "ZONE";

/// Diff for providers that upload an entire zone.
///
/// Returns nothing when the zone is already as desired. Otherwise the per-record
/// differences become reports and a final change carries every desired record.
#[must_use]
pub fn by_zone(
    zone: &str,
    existing: &[Record],
    desired: &[Record],
    extra: Option<&ComparableFn>,
) -> Vec<Change> {
    let zone = normalize_zone(zone);
    let key = RecordKey::new(zone.clone(), ZONE_CHANGE_TYPE);

    let mut changes: Vec<Change> = if existing.is_empty() {
        if desired.is_empty() {
            return Vec::new();
        }
        vec![Change::report(
            key.clone(),
            APEX_LABEL,
            format!("writing new zone {zone}"),
        )]
    } else {
        let detail = by_record(existing, desired, extra);
        if detail.is_empty() {
            return Vec::new();
        }
        detail
            .into_iter()
            .map(|c| Change {
                kind: ChangeType::Report,
                old: vec![],
                new: vec![],
                ..c
            })
            .collect()
    };

    changes.push(Change::new(
        ChangeType::Change,
        key,
        APEX_LABEL,
        existing.to_vec(),
        desired.to_vec(),
        vec![format!(
            "write zone {zone} ({} records)",
            desired.len()
        )],
    ));
    changes
}
