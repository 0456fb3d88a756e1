// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # zonectl - declarative multi-provider DNS
//!
//! `zonectl` reads a description of the zones you want, compares it with what
//! each DNS provider currently serves, and applies the difference.
//!
//! ## Overview
//!
//! A run goes through these stages:
//!
//! - **Normalize** - validate records, fill in defaults, expand `IMPORT_TRANSFORM`
//! - **Hands-off** - keep unmanaged, external-dns and `NO_PURGE` records out of deletions
//! - **Diff** - compare existing and desired records per record, RRset or zone
//! - **Order** - put changes that provide a name before changes that depend on it
//! - **Apply** - run each provider's corrections, then update registrar delegation
//!
//! ## Modules
//!
//! - [`config`] - dnsconfig and credentials files
//! - [`models`] - records, rdata, zones and corrections
//! - [`normalize`] - configuration validation and canonicalization
//! - [`handsoff`] - records the run must leave alone
//! - [`diff`] - change computation at three granularities
//! - [`ordering`] - dependency ordering and RFC 2136 batching
//! - [`providers`] - provider contract, registry and built-in backends
//! - [`reconcile`] - the per-zone driver and run summary
//! - [`commands`] - CLI command implementations
//! - [`metrics`] - Prometheus counters written at the end of a run
//!
//! ## Example
//!
//! ```rust,no_run
//! use zonectl::models::{DomainConfig, Rdata, Record};
//! use zonectl::providers::memory::MemoryProvider;
//! use zonectl::providers::DnsProvider;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let provider = MemoryProvider::new("mem");
//! let zone = DomainConfig {
//!     name: "example.com".to_string(),
//!     records: vec![Record::new("www", "example.com", 300, Rdata::A("192.0.2.1".parse()?))],
//!     ..Default::default()
//! };
//!
//! provider.ensure_zone_exists(&zone.name).await?;
//! let existing = provider.get_zone_records(&zone.name, &Default::default()).await?;
//! for correction in provider.get_zone_records_corrections(&zone, existing)? {
//!     println!("{}", correction.msg);
//!     correction.execute().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod constants;
pub mod diff;
pub mod errors;
pub mod handsoff;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod ordering;
pub mod providers;
pub mod reconcile;
