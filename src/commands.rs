// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command implementations behind the CLI.
//!
//! Each command returns the process exit code; only unexpected failures
//! (unreadable files, broken stdout) come back as errors.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::{load_credentials, load_dnsconfig, DnsConfig, ProviderCredentials, RawRecord};
use crate::constants::{EXIT_CONFIG_ERROR, EXIT_OK};
use crate::metrics::write_metrics_file;
use crate::normalize::{normalize, Normalized};
use crate::providers::{Capability, REGISTRY};
use crate::reconcile::{build_targets, run, RunOptions};

/// Inputs shared by `check`, `preview` and `push`.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// dnsconfig file
    pub config: PathBuf,
    /// creds.json file
    pub creds: PathBuf,
    /// Only these zones; empty means all
    pub domains: Vec<String>,
    /// Only these providers; empty means all
    pub providers: Vec<String>,
    /// Driver settings
    pub run: RunOptions,
    /// Where to write Prometheus text output
    pub metrics_file: Option<PathBuf>,
}

fn load_and_normalize(opts: &PipelineOptions) -> Result<(DnsConfig, Normalized)> {
    let mut config = load_dnsconfig(&opts.config)?;
    config.retain_domains(&opts.domains);
    debug!(domains = config.domains.len(), path = %opts.config.display(), "loaded dnsconfig");
    let normalized = normalize(&config, &REGISTRY.custom_types());
    Ok((config, normalized))
}

fn print_findings<W: Write>(normalized: &Normalized, out: &mut W) -> Result<()> {
    for warning in normalized.warnings() {
        writeln!(out, "WARNING: {warning}")?;
    }
    for error in normalized.errors() {
        writeln!(out, "ERROR: {error}")?;
    }
    Ok(())
}

/// Validate the configuration without contacting any provider.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or output fails.
pub fn check<W: Write>(opts: &PipelineOptions, out: &mut W) -> Result<i32> {
    let (_, normalized) = load_and_normalize(opts)?;
    print_findings(&normalized, out)?;
    let errors = normalized.errors().count();
    writeln!(
        out,
        "{} zone(s) valid, {} rejected, {} error(s), {} warning(s)",
        normalized.domains.len(),
        normalized.rejected.len(),
        errors,
        normalized.warnings().count()
    )?;
    Ok(if errors > 0 { EXIT_CONFIG_ERROR } else { EXIT_OK })
}

/// Plan every zone and, unless `opts.run.dry_run` is set, apply the plan.
///
/// Zones with validation errors are skipped; the others still run.
///
/// # Errors
///
/// Returns an error if configuration or credentials cannot be read, a
/// provider cannot be constructed, or output fails.
pub async fn reconcile<W: Write>(opts: &PipelineOptions, out: &mut W) -> Result<i32> {
    let (config, normalized) = load_and_normalize(opts)?;
    print_findings(&normalized, out)?;
    let creds = load_credentials(&opts.creds)?;
    let validation_errors = normalized.errors().count();

    let targets = build_targets(
        &config,
        normalized.domains,
        &creds,
        &REGISTRY,
        &opts.providers,
    )?;

    let summary = run(&targets, &REGISTRY, opts.run, out)
        .await
        .context("failed to write plan output")?
        .with_validation_errors(validation_errors);
    write!(out, "{summary}")?;

    if let Some(path) = &opts.metrics_file {
        write_metrics_file(path)?;
        info!(path = %path.display(), "wrote metrics");
    }

    let code = summary.exit_code();
    info!(exit_code = code, zones = summary.zones.len(), "run complete");
    Ok(code)
}

/// List a provider's zones, or dump named zones as raw records.
///
/// The provider's type comes from the credentials, or from the dnsconfig
/// when one is given.
///
/// # Errors
///
/// Returns an error if the provider cannot be constructed or queried.
pub async fn get_zones<W: Write>(
    creds_path: &std::path::Path,
    config_path: Option<&std::path::Path>,
    provider_name: &str,
    zones: &[String],
    out: &mut W,
) -> Result<i32> {
    let creds = load_credentials(creds_path)?;
    let mut provider_creds: ProviderCredentials =
        creds.get(provider_name).cloned().unwrap_or_default();
    if provider_creds.provider_type.is_none() {
        if let Some(path) = config_path {
            let config = load_dnsconfig(path)?;
            provider_creds.provider_type = config.declared_type(provider_name).map(ToString::to_string);
        }
    }
    let provider = REGISTRY.create_provider(provider_name, &provider_creds)?;

    if zones.is_empty() {
        if !provider.capabilities().has(Capability::CanGetZones) {
            warn!(provider = %provider_name, "provider cannot list zones");
            writeln!(out, "{provider_name} cannot list zones; name the zones to dump")?;
            return Ok(EXIT_CONFIG_ERROR);
        }
        for zone in provider.list_zones().await? {
            writeln!(out, "{zone}")?;
        }
        return Ok(EXIT_OK);
    }

    let mut dump: Vec<(String, Vec<RawRecord>)> = Vec::with_capacity(zones.len());
    for zone in zones {
        let records = provider
            .get_zone_records(zone, &std::collections::BTreeMap::new())
            .await
            .with_context(|| format!("failed to read zone {zone}"))?;
        dump.push((zone.clone(), records.iter().map(RawRecord::from_record).collect()));
    }
    let json: serde_json::Value = dump
        .into_iter()
        .map(|(zone, records)| {
            serde_json::json!({
                "name": zone,
                "dns_providers": [provider_name],
                "records": records,
            })
        })
        .collect();
    writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
    Ok(EXIT_OK)
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod commands_tests;
