// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for zonectl.
//!
//! This module provides specialized error types for:
//! - Validation of user-declared records (accumulated, never abort other zones)
//! - Provider API failures (rate limiting, transient, fatal)
//! - Hands-off safety check conflicts
//! - Dependency ordering problems
//! - Configuration and credential loading
//!
//! Each provider or zone failure is classified so the reconciliation driver can
//! decide whether to continue with the next correction or abandon the zone.

use std::time::Duration;
use thiserror::Error;

/// Errors found while normalizing and validating user input.
///
/// Validation errors are collected across all zones and reported together.
/// The `Warning` variant is a soft finding: it is surfaced to the user but
/// never prevents a zone from being planned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Record type is neither a standard type nor a registered pseudo or custom type
    #[error("{zone}: unknown record type '{rtype}' at label '{label}'")]
    UnknownRecordType {
        /// Zone containing the record
        zone: String,
        /// Short label of the record
        label: String,
        /// The unrecognised type mnemonic
        rtype: String,
    },

    /// Record data failed type-specific validation (bad IP, non-numeric preference, ...)
    #[error("{zone}: invalid {rtype} record at '{label}': {reason}")]
    InvalidRecordData {
        /// Zone containing the record
        zone: String,
        /// Short label of the record
        label: String,
        /// Record type
        rtype: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// Label is empty or otherwise malformed
    #[error("{zone}: invalid label '{label}': {reason}")]
    InvalidLabel {
        /// Zone containing the record
        zone: String,
        /// The offending label
        label: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// A CNAME shares its name with another record
    #[error("{zone}: CNAME at '{label}' cannot coexist with {other_type} records at the same name")]
    CnameConflict {
        /// Zone containing the records
        zone: String,
        /// Short label shared by the records
        label: String,
        /// Type of the conflicting record
        other_type: String,
    },

    /// `IMPORT_TRANSFORM` references a zone that is not part of the configuration
    #[error("{zone}: IMPORT_TRANSFORM source zone '{source_zone}' is not defined")]
    ImportSourceMissing {
        /// Destination zone
        zone: String,
        /// The missing source zone
        source_zone: String,
    },

    /// IP-transform table could not be parsed or applied
    #[error("{zone}: invalid transform table '{table}': {reason}")]
    InvalidTransform {
        /// Zone containing the record
        zone: String,
        /// The raw table text
        table: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// A DNS provider serving the zone lacks a capability the zone needs
    #[error("{zone}: provider '{provider}' does not support {capability}")]
    UnsupportedCapability {
        /// Zone being checked
        zone: String,
        /// Provider name from the configuration
        provider: String,
        /// Capability that is missing
        capability: String,
    },

    /// A provider-custom record type is used in a zone not served by its owning provider type
    #[error("{zone}: record type {rtype} can only be used with provider type {owner}")]
    CustomTypeUnroutable {
        /// Zone being checked
        zone: String,
        /// Custom record type
        rtype: String,
        /// Provider type that owns the record type
        owner: String,
    },

    /// Soft validation finding that does not fail the run
    #[error("{zone}: WARNING: {message}")]
    Warning {
        /// Zone the warning belongs to
        zone: String,
        /// Human-readable warning
        message: String,
    },
}

impl ValidationError {
    /// Returns true for soft findings that should not fail the run.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning { .. })
    }

    /// Returns the zone this finding belongs to.
    #[must_use]
    pub fn zone(&self) -> &str {
        match self {
            Self::UnknownRecordType { zone, .. }
            | Self::InvalidRecordData { zone, .. }
            | Self::InvalidLabel { zone, .. }
            | Self::CnameConflict { zone, .. }
            | Self::ImportSourceMissing { zone, .. }
            | Self::InvalidTransform { zone, .. }
            | Self::UnsupportedCapability { zone, .. }
            | Self::CustomTypeUnroutable { zone, .. }
            | Self::Warning { zone, .. } => zone,
        }
    }
}

/// Failure to parse presentation-format record content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {rtype} content '{content}': {reason}")]
pub struct RdataError {
    /// Record type being parsed
    pub rtype: String,
    /// The raw content
    pub content: String,
    /// Explanation of what is invalid
    pub reason: String,
}

impl RdataError {
    pub(crate) fn new(rtype: &str, content: &str, reason: impl Into<String>) -> Self {
        Self {
            rtype: rtype.to_string(),
            content: content.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by provider drivers.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Provider returned HTTP 429 or equivalent and retries were exhausted
    #[error("{provider}: rate limited by API")]
    RateLimited {
        /// Provider name
        provider: String,
        /// Server-suggested wait, when one was given
        retry_after: Option<Duration>,
    },

    /// 5xx or network failure
    #[error("{provider}: transient API error: {reason}")]
    Transient {
        /// Provider name
        provider: String,
        /// Reason for the failure
        reason: String,
    },

    /// HTTP 401/403 or TSIG rejection
    #[error("{provider}: authentication failed: {reason}")]
    AuthenticationFailed {
        /// Provider name
        provider: String,
        /// Reason for the failure
        reason: String,
    },

    /// The zone itself does not exist on the provider
    #[error("{provider}: zone '{zone}' not found")]
    ZoneNotFound {
        /// Provider name
        provider: String,
        /// Zone name
        zone: String,
    },

    /// `ensure_zone_exists` failed
    #[error("{provider}: could not ensure zone '{zone}' exists: {reason}")]
    EnsureZoneFailed {
        /// Provider name
        provider: String,
        /// Zone name
        zone: String,
        /// Reason for the failure
        reason: String,
    },

    /// Non-retryable API error (4xx other than auth, not found and rate limiting)
    #[error("{provider}: API request failed (HTTP {status}): {reason}")]
    Api {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body or error message
        reason: String,
    },

    /// The provider does not implement the requested operation
    #[error("{provider}: {operation} is not supported")]
    Unsupported {
        /// Provider name
        provider: String,
        /// Operation that was requested
        operation: String,
    },

    /// RFC 2136 server answered an UPDATE with a non-zero response code
    #[error("{provider}: DNS UPDATE rejected with response code {rcode}")]
    UpdateRejected {
        /// Provider name
        provider: String,
        /// Response code as reported by the server
        rcode: String,
    },

    /// Anything else (malformed responses, local I/O)
    #[error("{provider}: {reason}")]
    Other {
        /// Provider name
        provider: String,
        /// Reason for the failure
        reason: String,
    },
}

impl ProviderError {
    /// Returns true if this error must abort the zone it occurred in.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. }
                | Self::ZoneNotFound { .. }
                | Self::EnsureZoneFailed { .. }
        )
    }

    /// Returns true if this error is transient and the operation may be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient { .. })
    }

    /// Returns a stable reason code for summaries and metrics labels.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "RateLimited",
            Self::Transient { .. } => "TransientAPIError",
            Self::AuthenticationFailed { .. } => "AuthenticationFailed",
            Self::ZoneNotFound { .. } => "ZoneNotFound",
            Self::EnsureZoneFailed { .. } => "EnsureZoneFailed",
            Self::Api { .. } => "APIError",
            Self::Unsupported { .. } => "Unsupported",
            Self::UpdateRejected { .. } => "UpdateRejected",
            Self::Other { .. } => "ProviderError",
        }
    }

    /// Map an HTTP status code from a provider API to an error.
    ///
    /// | HTTP Code | Error |
    /// |-----------|-------|
    /// | 401, 403 | `AuthenticationFailed` |
    /// | 404 | `ZoneNotFound` when a zone was addressed, `Api` otherwise |
    /// | 429 | `RateLimited` |
    /// | 500-599 | `Transient` |
    /// | Other | `Api` |
    #[must_use]
    pub fn from_http_status(provider: &str, status: u16, zone: Option<&str>, body: &str) -> Self {
        let provider = provider.to_string();
        match status {
            401 | 403 => Self::AuthenticationFailed {
                provider,
                reason: format!("HTTP {status}: {body}"),
            },
            404 => match zone {
                Some(zone) => Self::ZoneNotFound {
                    provider,
                    zone: zone.to_string(),
                },
                None => Self::Api {
                    provider,
                    status,
                    reason: body.to_string(),
                },
            },
            429 => Self::RateLimited {
                provider,
                retry_after: None,
            },
            500..=599 => Self::Transient {
                provider,
                reason: format!("HTTP {status}: {body}"),
            },
            _ => Self::Api {
                provider,
                status,
                reason: body.to_string(),
            },
        }
    }
}

/// The hands-off safety check found UNMANAGED patterns matching desired records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{zone}: {} desired record(s) match UNMANAGED patterns: {}",
    conflicts.len(),
    conflicts.join(", ")
)]
pub struct ConflictError {
    /// Zone being planned
    pub zone: String,
    /// Human-readable description of each conflicting record
    pub conflicts: Vec<String>,
}

/// The dependency orderer could not satisfy every hint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dependency cycle or unresolved reference: {change} waits on {}", missing.join(", "))]
pub struct DependencyUnresolved {
    /// Description of the first change that could not be placed
    pub change: String,
    /// Names it was waiting on
    pub missing: Vec<String>,
}

/// Errors while loading configuration or constructing providers.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Provider constructor was missing required credential keys
    #[error("provider '{provider}' is missing required credentials: {}", keys.join(", "))]
    MissingCredentials {
        /// Provider name
        provider: String,
        /// Every missing key
        keys: Vec<String>,
    },

    /// Credentials entry has no `TYPE`
    #[error("credentials for '{provider}' have no TYPE")]
    MissingType {
        /// Provider name
        provider: String,
    },

    /// `TYPE` is not a registered provider type
    #[error("provider '{provider}' has unknown TYPE '{provider_type}'")]
    UnknownProviderType {
        /// Provider name
        provider: String,
        /// The unrecognised type
        provider_type: String,
    },

    /// A domain references a provider that has no credentials entry
    #[error("domain '{zone}' references undefined provider '{provider}'")]
    UndefinedProvider {
        /// Domain name
        zone: String,
        /// Provider name
        provider: String,
    },

    /// Credential value could not be interpreted
    #[error("provider '{provider}': invalid value for '{key}': {reason}")]
    InvalidCredential {
        /// Provider name
        provider: String,
        /// Credential key
        key: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// Environment variable referenced by a credential is unset
    #[error("provider '{provider}': environment variable '{var}' referenced by '{key}' is not set")]
    MissingEnvironment {
        /// Provider name
        provider: String,
        /// Credential key
        key: String,
        /// Variable name
        var: String,
    },
}

/// Composite error for everything that can stop a zone from reconciling.
#[derive(Error, Debug, Clone)]
pub enum ZoneError {
    /// Provider error
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Hands-off safety check conflict
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Validation errors specific to this zone (capabilities, custom types)
    #[error("{} validation error(s): {}", .0.len(), .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Validation(Vec<ValidationError>),

    /// The zone did not finish within the configured timeout
    #[error("zone '{zone}' timed out after {secs}s")]
    Timeout {
        /// Zone name
        zone: String,
        /// Timeout in seconds
        secs: u64,
    },

    /// Configuration problem discovered while processing the zone
    #[error("configuration error: {0}")]
    Config(String),
}

impl ZoneError {
    /// Returns true if this error aborts the zone.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_fatal(),
            Self::Conflict(_) | Self::Validation(_) | Self::Timeout { .. } | Self::Config(_) => {
                true
            }
        }
    }

    /// Returns true if this error should map to the "fatal backend" exit code.
    #[must_use]
    pub fn is_backend_fatal(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_fatal())
    }

    /// Returns a stable reason code for summaries and metrics labels.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Provider(e) => e.reason(),
            Self::Conflict(_) => "ConflictError",
            Self::Validation(_) => "ValidationError",
            Self::Timeout { .. } => "Timeout",
            Self::Config(_) => "ConfigError",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
