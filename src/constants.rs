// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for zonectl.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Record Constants
// ============================================================================

/// Default TTL applied to records declared without one (5 minutes)
pub const DEFAULT_DNS_RECORD_TTL_SECS: u32 = 300;

/// Label used for the zone apex
pub const APEX_LABEL: &str = "@";

/// Maximum length of a single TXT character-string on the wire
pub const TXT_SEGMENT_MAX_LEN: usize = 255;

/// Placeholder nameserver inserted while rotating apex NS records on servers
/// that refuse to delete the last NS of a zone.
pub const SENTINEL_NS_TARGET: &str = "255.255.255.255.";

/// Underscore-prefixed labels that are conventional and never warned about.
pub const UNDERSCORE_LABEL_EXCEPTIONS: &[&str] = &[
    "_domainkey",
    "_dmarc",
    "_acme-challenge",
    "_mta-sts",
    "_smtp._tls",
    "_tcp",
    "_udp",
    "_tls",
    "_sip",
    "_autodiscover",
    "_caldav",
    "_carddav",
    "_imap",
    "_imaps",
    "_submission",
    "_xmpp-client",
    "_xmpp-server",
    "_bimi",
];

// ============================================================================
// Record Metadata Keys
// ============================================================================

/// Metadata key carrying an IP-transform table on `IMPORT_TRANSFORM` records
pub const META_TRANSFORM_TABLE: &str = "transform_table";

/// Metadata key carrying an IP-transform table on individual `A` records
pub const META_TRANSFORM: &str = "transform";

// ============================================================================
// External-DNS Constants
// ============================================================================

/// Marker present in ownership TXT records written by external-dns
pub const EXTERNAL_DNS_HERITAGE: &str = "heritage=external-dns";

/// Record types external-dns encodes as TXT label prefixes
pub const EXTERNAL_DNS_TYPE_PREFIXES: &[&str] = &["aaaa", "cname", "a", "ns", "mx", "srv", "txt"];

/// Record types assumed managed when a legacy ownership TXT carries no type prefix
pub const EXTERNAL_DNS_LEGACY_TYPES: &[&str] = &["A", "AAAA", "CNAME", "NS", "MX", "SRV"];

// ============================================================================
// Retry Constants
// ============================================================================

/// Initial wait after a provider reports rate limiting (1 second)
pub const RATE_LIMIT_INITIAL_INTERVAL_SECS: u64 = 1;

/// Longest single wait while rate limited (5 minutes)
pub const RATE_LIMIT_MAX_INTERVAL_SECS: u64 = 300;

/// Total time spent waiting out rate limits before giving up (5 minutes)
pub const RATE_LIMIT_MAX_ELAPSED_SECS: u64 = 300;

/// Number of retries for transient (5xx, timeout) provider errors
pub const TRANSIENT_MAX_RETRIES: u32 = 2;

/// Initial wait before retrying a transient error (500ms)
pub const TRANSIENT_INITIAL_INTERVAL_MILLIS: u64 = 500;

/// Backoff multiplier (exponential growth factor)
pub const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
pub const RANDOMIZATION_FACTOR: f64 = 0.1;

// ============================================================================
// Reconciliation Constants
// ============================================================================

/// Default per-zone timeout (10 minutes)
pub const DEFAULT_ZONE_TIMEOUT_SECS: u64 = 600;

/// Default number of zones processed concurrently
pub const DEFAULT_ZONE_CONCURRENCY: usize = 8;

/// HTTP request timeout for provider APIs
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for dynamic updates and zone transfers
pub const DNS_PORT: u16 = 53;

/// Read and write timeout for one DNS exchange over TCP
pub const DNS_EXCHANGE_TIMEOUT_SECS: u64 = 30;

/// TSIG fudge time in seconds (allows for clock skew)
pub const TSIG_FUDGE_TIME_SECS: u64 = 300;

/// Default SOA refresh interval (1 hour)
pub const DEFAULT_SOA_REFRESH_SECS: u32 = 3600;

/// Default SOA retry interval (10 minutes)
pub const DEFAULT_SOA_RETRY_SECS: u32 = 600;

/// Default SOA expire time (7 days)
pub const DEFAULT_SOA_EXPIRE_SECS: u32 = 604_800;

/// Default SOA negative TTL (1 day)
pub const DEFAULT_SOA_NEGATIVE_TTL_SECS: u32 = 86400;

// ============================================================================
// Exit Codes
// ============================================================================

/// All zones reconciled, or dry run completed
pub const EXIT_OK: i32 = 0;

/// Usage or configuration error
pub const EXIT_CONFIG_ERROR: i32 = 1;

/// One or more zones had non-fatal errors
pub const EXIT_ZONE_ERRORS: i32 = 2;

/// At least one zone hit a fatal error (authentication, unreachable backend)
pub const EXIT_FATAL: i32 = 3;
