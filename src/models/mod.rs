// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Normalized in-memory data model: records, zones and corrections.

pub mod correction;
pub mod domain;
pub mod loc;
pub mod rdata;
pub mod record;

pub use correction::{Correction, CorrectionFuture, CorrectionThunk};
pub use domain::{AutoDnssec, DomainConfig, UnmanagedConfig};
pub use loc::Loc;
pub use rdata::{split_txt, Rdata, Soa, Svcb};
pub use record::{
    make_fqdn, normalize_label, normalize_zone, short_name, ComparableFn, Original, Record,
    RecordKey,
};
