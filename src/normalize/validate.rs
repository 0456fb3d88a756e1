// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label, type and target checks used by the normalizer.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{APEX_LABEL, UNDERSCORE_LABEL_EXCEPTIONS};
use crate::errors::ValidationError;
use crate::models::rdata::{PSEUDO_TYPES, STANDARD_TYPES};
use crate::models::{normalize_zone, Rdata, Record};

/// Outcome of classifying a type mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// Has a dedicated `Rdata` variant
    Standard,
    /// Expanded and removed by the normalizer
    Pseudo,
    /// Routed to exactly one provider type
    Custom,
    /// Not recognised
    Unknown,
}

/// Classify an uppercase type mnemonic.
#[must_use]
pub fn classify_type(rtype: &str, custom_types: &BTreeSet<String>) -> TypeClass {
    if STANDARD_TYPES.contains(&rtype) {
        TypeClass::Standard
    } else if PSEUDO_TYPES.contains(&rtype) {
        TypeClass::Pseudo
    } else if custom_types.contains(rtype) {
        TypeClass::Custom
    } else {
        TypeClass::Unknown
    }
}

/// Check a short label as written by the user.
///
/// Returns `Ok(Some(warning))` for soft findings.
///
/// # Errors
///
/// Returns an error for empty labels and labels written as absolute names.
pub fn check_label(
    zone: &str,
    label: &str,
    rtype: &str,
) -> Result<Option<ValidationError>, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidLabel {
        zone: zone.to_string(),
        label: label.to_string(),
        reason: reason.to_string(),
    };

    if label.trim().is_empty() {
        return Err(invalid("label is empty, use '@' for the apex"));
    }
    if label.ends_with('.') {
        return Err(invalid("label must be relative to the zone and not end with '.'"));
    }
    if label != APEX_LABEL && label.split('.').any(str::is_empty) {
        return Err(invalid("label contains an empty component"));
    }
    if label.contains(char::is_whitespace) {
        return Err(invalid("label contains whitespace"));
    }

    if label.contains('_') && !underscore_allowed(label, rtype) {
        return Ok(Some(ValidationError::Warning {
            zone: zone.to_string(),
            message: format!(
                "label '{label}' ({rtype}) contains an underscore; many resolvers and providers reject this"
            ),
        }));
    }
    Ok(None)
}

fn underscore_allowed(label: &str, rtype: &str) -> bool {
    let components: Vec<&str> = label.split('.').collect();
    if components
        .iter()
        .any(|c| UNDERSCORE_LABEL_EXCEPTIONS.contains(c))
    {
        return true;
    }
    // Service-style labels (_sip._tcp, _25._tcp, _acme-...) are expected for these types.
    matches!(rtype, "SRV" | "TLSA" | "TXT" | "CNAME" | "SVCB" | "HTTPS")
        && components.first().is_some_and(|c| c.starts_with('_'))
}

/// Make a target name fully qualified with a trailing dot.
///
/// `@` becomes the apex, relative names get the origin appended, `.` is left alone.
#[must_use]
pub fn canonicalize_target(target: &str, zone: &str) -> String {
    let zone = normalize_zone(zone);
    let target = target.trim().to_ascii_lowercase();
    if target == APEX_LABEL {
        format!("{zone}.")
    } else if target == "." || target.ends_with('.') {
        target
    } else {
        format!("{target}.{zone}.")
    }
}

/// Canonicalize every name-valued field of record data.
pub fn canonicalize_rdata(rdata: &mut Rdata, zone: &str) {
    if let Rdata::Soa(soa) = rdata {
        soa.mname = canonicalize_target(&soa.mname, zone);
        soa.rname = canonicalize_target(&soa.rname, zone);
        return;
    }
    if let Some(target) = rdata.target_mut() {
        *target = canonicalize_target(target, zone);
    }
}

/// Find CNAMEs that share their owner name with any other record.
#[must_use]
pub fn check_cname_exclusivity(zone: &str, records: &[Record]) -> Vec<ValidationError> {
    let mut by_name: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for record in records {
        by_name.entry(&record.name_fqdn).or_default().push(record);
    }

    let mut errors = Vec::new();
    for group in by_name.values() {
        let cnames = group.iter().filter(|r| r.rtype() == "CNAME").count();
        if cnames == 0 {
            continue;
        }
        let label = group[0].label.clone();
        if cnames > 1 {
            errors.push(ValidationError::CnameConflict {
                zone: zone.to_string(),
                label: label.clone(),
                other_type: "additional CNAME".to_string(),
            });
        }
        let others: BTreeSet<&str> = group
            .iter()
            .map(|r| r.rtype())
            .filter(|t| *t != "CNAME")
            .collect();
        for other in others {
            errors.push(ValidationError::CnameConflict {
                zone: zone.to_string(),
                label: label.clone(),
                other_type: other.to_string(),
            });
        }
    }
    errors
}
