// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! IPv4 transform tables.
//!
//! A table is a semicolon-separated list of rules `low~high~newBase~newIPs`.
//! The first rule whose inclusive `[low, high]` range contains the input wins:
//! with a `newBase` the input's offset from `low` is added to it, otherwise the
//! comma-separated `newIPs` list replaces the input. An input matching no rule
//! is returned unchanged.

use std::net::Ipv4Addr;
use std::str::FromStr;

/// One compiled transform rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRule {
    /// Inclusive lower bound
    pub low: Ipv4Addr,
    /// Inclusive upper bound
    pub high: Ipv4Addr,
    /// Base address for offset mapping
    pub new_base: Option<Ipv4Addr>,
    /// Replacement addresses when no base is given
    pub new_ips: Vec<Ipv4Addr>,
}

/// A compiled transform table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformTable {
    rules: Vec<TransformRule>,
}

impl TransformTable {
    /// Rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[TransformRule] {
        &self.rules
    }

    /// Transform an address into one or more addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if offset mapping overflows the IPv4 space.
    pub fn apply(&self, ip: Ipv4Addr) -> Result<Vec<Ipv4Addr>, String> {
        let value = u32::from(ip);
        let Some(rule) = self
            .rules
            .iter()
            .find(|r| u32::from(r.low) <= value && value <= u32::from(r.high))
        else {
            return Ok(vec![ip]);
        };

        match rule.new_base {
            Some(base) => {
                let offset = value - u32::from(rule.low);
                u32::from(base)
                    .checked_add(offset)
                    .map(|v| vec![Ipv4Addr::from(v)])
                    .ok_or_else(|| format!("{ip} maps beyond 255.255.255.255 from base {base}"))
            }
            None => Ok(rule.new_ips.clone()),
        }
    }
}

impl FromStr for TransformTable {
    type Err = String;

    fn from_str(table: &str) -> Result<Self, Self::Err> {
        let mut rules = Vec::new();
        for raw_rule in table.split(';').map(str::trim).filter(|r| !r.is_empty()) {
            let parts: Vec<&str> = raw_rule.split('~').map(str::trim).collect();
            if parts.len() != 4 {
                return Err(format!(
                    "rule '{raw_rule}' has {} fields, expected low~high~newBase~newIPs",
                    parts.len()
                ));
            }
            let low = parse_ip(parts[0])?;
            let high = parse_ip(parts[1])?;
            if u32::from(low) > u32::from(high) {
                return Err(format!("rule '{raw_rule}': low {low} is above high {high}"));
            }
            let new_base = if parts[2].is_empty() {
                None
            } else {
                Some(parse_ip(parts[2])?)
            };
            let new_ips = parts[3]
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_ip)
                .collect::<Result<Vec<_>, _>>()?;

            match (new_base, new_ips.is_empty()) {
                (Some(_), false) => {
                    return Err(format!(
                        "rule '{raw_rule}': newBase and newIPs are mutually exclusive"
                    ))
                }
                (None, true) => {
                    return Err(format!("rule '{raw_rule}': needs either newBase or newIPs"))
                }
                _ => {}
            }

            rules.push(TransformRule {
                low,
                high,
                new_base,
                new_ips,
            });
        }
        Ok(Self { rules })
    }
}

fn parse_ip(raw: &str) -> Result<Ipv4Addr, String> {
    raw.parse()
        .map_err(|_| format!("'{raw}' is not an IPv4 address"))
}
