// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic registrar delegation flow.

use std::future::Future;

use crate::errors::ProviderError;
use crate::models::Correction;

/// Lowercase, strip the trailing dot, dedupe and sort.
#[must_use]
pub fn normalize_nameservers<S: AsRef<str>>(nameservers: &[S]) -> Vec<String> {
    let mut out: Vec<String> = nameservers
        .iter()
        .map(|ns| ns.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
        .filter(|ns| !ns.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Compare current and desired delegation.
///
/// Returns at most one correction. `apply` receives the normalized desired
/// list when the thunk runs.
pub fn nameserver_corrections<S, T, F, Fut>(current: &[S], desired: &[T], apply: F) -> Vec<Correction>
where
    S: AsRef<str>,
    T: AsRef<str>,
    F: FnOnce(Vec<String>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ProviderError>> + Send + 'static,
{
    let current = normalize_nameservers(current);
    let desired = normalize_nameservers(desired);
    if current == desired {
        return Vec::new();
    }
    let msg = format!(
        "Update nameservers {} -> {}",
        current.join(","),
        desired.join(",")
    );
    vec![Correction::new(msg, move || apply(desired))]
}
