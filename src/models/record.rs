// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The normalized record type shared by the normalizer, hands-off layer, diff
//! engine and providers.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::rdata::Rdata;
use crate::constants::APEX_LABEL;

/// Opaque handle to a provider's native representation of a record.
///
/// Providers store whatever they need to address the record later (an API id,
/// the raw JSON object) and downcast it inside their own correction thunks.
#[derive(Clone)]
pub struct Original(Arc<dyn Any + Send + Sync>);

impl Original {
    /// Wrap a provider-native value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the wrapped value if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Original {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Original(..)")
    }
}

/// Identifies an RRset: fully-qualified owner name and type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    /// Fully-qualified owner name, no trailing dot
    pub name_fqdn: String,
    /// Uppercase type mnemonic
    pub rtype: String,
}

impl RecordKey {
    /// Build a key from its parts.
    pub fn new(name_fqdn: impl Into<String>, rtype: impl Into<String>) -> Self {
        Self {
            name_fqdn: name_fqdn.into(),
            rtype: rtype.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name_fqdn, self.rtype)
    }
}

/// An intended DNS resource record.
#[derive(Debug, Clone)]
pub struct Record {
    /// Short name relative to the zone apex; `@` is the apex
    pub label: String,
    /// Fully-qualified owner name without trailing dot
    pub name_fqdn: String,
    /// Time to live in seconds
    pub ttl: u32,
    /// Typed payload
    pub rdata: Rdata,
    /// Per-record hints that survive round-tripping
    pub metadata: BTreeMap<String, String>,
    /// Provider-native representation, set on records read from an API
    pub original: Option<Original>,
}

impl Record {
    /// Create a record from a short label.
    pub fn new(label: &str, zone: &str, ttl: u32, rdata: Rdata) -> Self {
        let label = normalize_label(label);
        Self {
            name_fqdn: make_fqdn(&label, zone),
            label,
            ttl,
            rdata,
            metadata: BTreeMap::new(),
            original: None,
        }
    }

    /// Create a record from a fully-qualified owner name (trailing dot optional).
    pub fn from_fqdn(name: &str, zone: &str, ttl: u32, rdata: Rdata) -> Self {
        let label = short_name(name, zone);
        Self::new(&label, zone, ttl, rdata)
    }

    /// Attach a provider-native handle.
    #[must_use]
    pub fn with_original(mut self, original: Original) -> Self {
        self.original = Some(original);
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Uppercase type mnemonic.
    #[must_use]
    pub fn rtype(&self) -> &str {
        self.rdata.rtype()
    }

    /// The RRset this record belongs to.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.name_fqdn.clone(), self.rtype())
    }

    /// Canonical content text, excluding TTL. Used as record identity within an RRset.
    #[must_use]
    pub fn comparable(&self) -> String {
        match &self.rdata {
            // The logical TXT value is compared, not its segmentation.
            Rdata::Txt(segments) => crate::models::rdata::quote(&segments.concat()),
            other => other.to_string(),
        }
    }

    /// Canonical content text extended by a caller-supplied function.
    #[must_use]
    pub fn comparable_with(&self, extra: Option<&ComparableFn>) -> String {
        let base = self.comparable();
        match extra.map(|f| f(self)) {
            Some(more) if !more.is_empty() => format!("{base} {more}"),
            _ => base,
        }
    }

    /// True if this record sits at the zone apex.
    #[must_use]
    pub fn is_apex(&self) -> bool {
        self.label == APEX_LABEL
    }

    /// One-line description used in correction messages, e.g. `www A 1.2.3.4 ttl=300`.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "{} {} {} ttl={}",
            self.label,
            self.rtype(),
            self.rdata,
            self.ttl
        )
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.label, self.rtype(), self.rdata)
    }
}

/// Function folding provider-specific fields into a record's comparable text.
pub type ComparableFn = dyn Fn(&Record) -> String + Send + Sync;

/// Lowercase a label and strip any trailing dot; empty becomes the apex.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    let trimmed = label.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        APEX_LABEL.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Strip the trailing dot from a zone or host name and lowercase it.
#[must_use]
pub fn normalize_zone(zone: &str) -> String {
    zone.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Fully-qualified owner name for a short label.
#[must_use]
pub fn make_fqdn(label: &str, zone: &str) -> String {
    let zone = normalize_zone(zone);
    if label == APEX_LABEL || label.is_empty() {
        zone
    } else {
        format!("{label}.{zone}")
    }
}

/// Short label for a fully-qualified owner name. Names outside the zone are returned as-is.
#[must_use]
pub fn short_name(name: &str, zone: &str) -> String {
    let name = normalize_zone(name);
    let zone = normalize_zone(zone);
    if name == zone || name.is_empty() {
        return APEX_LABEL.to_string();
    }
    match name.strip_suffix(&format!(".{zone}")) {
        Some(label) => label.to_string(),
        None => name,
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;
