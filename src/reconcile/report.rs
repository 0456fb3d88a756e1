// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-zone output buffers and the end-of-run summary.

use std::fmt;
use std::io::{self, Write};

use crate::constants::{EXIT_CONFIG_ERROR, EXIT_FATAL, EXIT_OK, EXIT_ZONE_ERRORS};
use crate::errors::ZoneError;
use crate::metrics::ZoneOutcome;

/// Everything one zone printed and how it ended.
///
/// Only the task working on the zone writes to it. The driver flushes it to
/// stdout in one piece once the zone is done, so zones running in parallel do
/// not interleave.
#[derive(Debug, Clone, Default)]
pub struct ZoneReport {
    /// Zone name
    pub zone: String,
    lines: Vec<String>,
    /// Actionable corrections produced by planning
    pub planned: usize,
    /// Corrections whose operation succeeded
    pub executed: usize,
    /// Corrections whose operation failed
    pub failed: usize,
    errors: Vec<ZoneError>,
    aborted: bool,
}

impl ZoneReport {
    /// Empty report for `zone`.
    #[must_use]
    pub fn new(zone: &str) -> Self {
        Self {
            zone: zone.to_string(),
            ..Default::default()
        }
    }

    /// Append output. Multi-line messages are kept as separate lines.
    pub fn line(&mut self, text: impl AsRef<str>) {
        self.lines
            .extend(text.as_ref().lines().map(ToString::to_string));
    }

    /// Buffered output.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Note an error that did not stop the zone.
    pub fn record_error(&mut self, err: ZoneError) {
        self.errors.push(err);
    }

    /// Note the error that stopped the zone.
    pub fn abort(&mut self, err: ZoneError) {
        self.line(format!("ABORTED: {err}"));
        self.errors.push(err);
        self.aborted = true;
    }

    /// All errors, in the order they happened.
    #[must_use]
    pub fn errors(&self) -> &[ZoneError] {
        &self.errors
    }

    /// First error, shown in the summary.
    #[must_use]
    pub fn first_error(&self) -> Option<&ZoneError> {
        self.errors.first()
    }

    /// True if the zone was stopped early.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// True if anything went wrong.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Outcome label used for metrics.
    #[must_use]
    pub fn outcome(&self) -> ZoneOutcome {
        match self.errors.last() {
            None => ZoneOutcome::Success,
            Some(ZoneError::Timeout { .. }) if self.aborted => ZoneOutcome::TimedOut,
            Some(_) if self.aborted => ZoneOutcome::Aborted,
            Some(_) => ZoneOutcome::Failed,
        }
    }

    /// Write the buffered output.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn flush<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for line in &self.lines {
            writeln!(out, "{line}")?;
        }
        out.flush()
    }
}

/// Result of a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// One report per zone, in configuration order
    pub zones: Vec<ZoneReport>,
    /// Validation errors found before any zone ran
    pub validation_errors: usize,
}

impl RunSummary {
    /// Summary of the given zone reports.
    #[must_use]
    pub fn new(zones: Vec<ZoneReport>) -> Self {
        Self {
            zones,
            validation_errors: 0,
        }
    }

    /// Add validation errors found while loading the configuration.
    #[must_use]
    pub fn with_validation_errors(mut self, count: usize) -> Self {
        self.validation_errors = count;
        self
    }

    /// Zones with at least one error.
    pub fn failed_zones(&self) -> impl Iterator<Item = &ZoneReport> {
        self.zones.iter().filter(|z| z.has_errors())
    }

    /// Process exit code.
    ///
    /// A fatal backend error wins over validation errors, which win over
    /// ordinary per-zone failures.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        let errors = || self.zones.iter().flat_map(|z| z.errors());
        if errors().any(ZoneError::is_backend_fatal) {
            return EXIT_FATAL;
        }
        if self.validation_errors > 0
            || errors().any(|e| matches!(e, ZoneError::Validation(_) | ZoneError::Config(_)))
        {
            return EXIT_CONFIG_ERROR;
        }
        if errors().next().is_some() {
            return EXIT_ZONE_ERRORS;
        }
        EXIT_OK
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for zone in &self.zones {
            writeln!(
                f,
                "{}: {} planned, {} executed, {} failed",
                zone.zone, zone.planned, zone.executed, zone.failed
            )?;
        }
        if self.validation_errors > 0 {
            writeln!(f, "{} validation error(s)", self.validation_errors)?;
        }
        let failed: Vec<&ZoneReport> = self.failed_zones().collect();
        if !failed.is_empty() {
            writeln!(f, "{} zone(s) failed:", failed.len())?;
            for zone in failed {
                if let Some(err) = zone.first_error() {
                    writeln!(f, "  {}: {err}", zone.zone)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod report_tests;
