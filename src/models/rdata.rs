// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed record data.
//!
//! Every supported resource record type has its own variant carrying a typed
//! payload. Content is parsed from, and rendered back to, the presentation
//! format used in zone files; the rendered form is the canonical text used for
//! comparisons.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::loc::Loc;
use crate::constants::TXT_SEGMENT_MAX_LEN;
use crate::errors::RdataError;

/// Record types with a dedicated `Rdata` variant.
pub const STANDARD_TYPES: &[&str] = &[
    "A", "AAAA", "ALIAS", "CAA", "CNAME", "DS", "HTTPS", "LOC", "MX", "NAPTR", "NS", "PTR", "SOA",
    "SRV", "SSHFP", "SVCB", "TLSA", "TXT",
];

/// Pseudo-types understood only by the normalizer.
pub const PSEUDO_TYPES: &[&str] = &["IMPORT_TRANSFORM"];

/// SOA fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soa {
    /// Primary nameserver
    pub mname: String,
    /// Responsible mailbox in domain-name form
    pub rname: String,
    /// Zone serial
    pub serial: u32,
    /// Refresh interval
    pub refresh: u32,
    /// Retry interval
    pub retry: u32,
    /// Expire time
    pub expire: u32,
    /// Negative-caching TTL
    pub minimum: u32,
}

/// SVCB and HTTPS fields. Parameters are kept as normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Svcb {
    /// 0 for alias mode, otherwise service mode priority
    pub priority: u16,
    /// Target name (`.` for the owner name)
    pub target: String,
    /// Space-separated `key=value` parameters
    pub params: String,
}

/// Typed payload of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rdata {
    /// IPv4 address
    A(Ipv4Addr),
    /// IPv6 address
    Aaaa(Ipv6Addr),
    /// Apex alias flattened by providers that support it
    Alias(String),
    /// Certification authority authorization
    Caa {
        /// Flags byte (128 = critical)
        flags: u8,
        /// Property tag (`issue`, `issuewild`, `iodef`)
        tag: String,
        /// Property value
        value: String,
    },
    /// Canonical name
    Cname(String),
    /// Delegation signer
    Ds {
        /// Key tag of the referenced DNSKEY
        key_tag: u16,
        /// DNSSEC algorithm number
        algorithm: u8,
        /// Digest algorithm number
        digest_type: u8,
        /// Hex digest
        digest: String,
    },
    /// HTTPS service binding
    Https(Svcb),
    /// Geographic location
    Loc(Loc),
    /// Mail exchanger
    Mx {
        /// Lower is preferred
        preference: u16,
        /// Mail server name
        exchange: String,
    },
    /// Naming authority pointer
    Naptr {
        /// Processing order
        order: u16,
        /// Preference among equal orders
        preference: u16,
        /// Flags string
        flags: String,
        /// Service string
        service: String,
        /// Substitution expression
        regexp: String,
        /// Replacement name
        replacement: String,
    },
    /// Nameserver
    Ns(String),
    /// Reverse pointer
    Ptr(String),
    /// Start of authority
    Soa(Soa),
    /// Service locator
    Srv {
        /// Lower is preferred
        priority: u16,
        /// Relative weight among equal priorities
        weight: u16,
        /// Service port
        port: u16,
        /// Target host
        target: String,
    },
    /// SSH public key fingerprint
    Sshfp {
        /// Key algorithm
        algorithm: u8,
        /// Fingerprint type
        fingerprint_type: u8,
        /// Hex fingerprint
        fingerprint: String,
    },
    /// Generic service binding
    Svcb(Svcb),
    /// TLS certificate association
    Tlsa {
        /// Certificate usage
        usage: u8,
        /// Selector
        selector: u8,
        /// Matching type
        matching_type: u8,
        /// Hex association data
        certificate: String,
    },
    /// Text segments; the logical value is their concatenation
    Txt(Vec<String>),
    /// Pseudo-type or provider-custom type, opaque to the core
    Custom {
        /// Uppercase type mnemonic
        rtype: String,
        /// Raw content
        content: String,
    },
}

impl Rdata {
    /// Uppercase type mnemonic.
    #[must_use]
    pub fn rtype(&self) -> &str {
        match self {
            Self::A(_) => "A",
            Self::Aaaa(_) => "AAAA",
            Self::Alias(_) => "ALIAS",
            Self::Caa { .. } => "CAA",
            Self::Cname(_) => "CNAME",
            Self::Ds { .. } => "DS",
            Self::Https(_) => "HTTPS",
            Self::Loc(_) => "LOC",
            Self::Mx { .. } => "MX",
            Self::Naptr { .. } => "NAPTR",
            Self::Ns(_) => "NS",
            Self::Ptr(_) => "PTR",
            Self::Soa(_) => "SOA",
            Self::Srv { .. } => "SRV",
            Self::Sshfp { .. } => "SSHFP",
            Self::Svcb(_) => "SVCB",
            Self::Tlsa { .. } => "TLSA",
            Self::Txt(_) => "TXT",
            Self::Custom { rtype, .. } => rtype,
        }
    }

    /// Parse presentation-format content for the given type.
    ///
    /// Names are lowercased; they are not made fully qualified here, that is the
    /// normalizer's job.
    ///
    /// # Errors
    ///
    /// Returns an error if the content does not match the type's syntax. Types
    /// without a dedicated variant are returned as `Custom` without validation;
    /// deciding whether such a type is allowed is up to the caller.
    pub fn parse(rtype: &str, content: &str) -> Result<Self, RdataError> {
        let rtype_upper = rtype.to_ascii_uppercase();
        let err = |reason: &str| RdataError::new(&rtype_upper, content, reason);
        let trimmed = content.trim();

        let rdata = match rtype_upper.as_str() {
            "A" => Self::A(
                trimmed
                    .parse()
                    .map_err(|_| err("not a valid IPv4 address"))?,
            ),
            "AAAA" => Self::Aaaa(
                trimmed
                    .parse()
                    .map_err(|_| err("not a valid IPv6 address"))?,
            ),
            "ALIAS" => Self::Alias(parse_name(trimmed).map_err(|r| err(&r))?),
            "CNAME" => Self::Cname(parse_name(trimmed).map_err(|r| err(&r))?),
            "NS" => Self::Ns(parse_name(trimmed).map_err(|r| err(&r))?),
            "PTR" => Self::Ptr(parse_name(trimmed).map_err(|r| err(&r))?),
            "TXT" => Self::Txt(parse_txt(trimmed).map_err(|r| err(&r))?),
            "LOC" => Self::Loc(Loc::parse(trimmed).map_err(|r| err(&r))?),
            _ => {
                let fields = tokenize(trimmed).map_err(|r| err(&r))?;
                Self::parse_fields(&rtype_upper, content, &fields)?
            }
        };
        Ok(rdata)
    }

    fn parse_fields(rtype: &str, content: &str, fields: &[String]) -> Result<Self, RdataError> {
        let err = |reason: String| RdataError::new(rtype, content, reason);
        let expect = |n: usize| {
            if fields.len() == n {
                Ok(())
            } else {
                Err(err(format!("expected {n} fields, found {}", fields.len())))
            }
        };

        let rdata = match rtype {
            "MX" => {
                expect(2)?;
                Self::Mx {
                    preference: parse_num(&fields[0], "preference").map_err(err)?,
                    exchange: parse_name(&fields[1]).map_err(err)?,
                }
            }
            "SRV" => {
                expect(4)?;
                Self::Srv {
                    priority: parse_num(&fields[0], "priority").map_err(err)?,
                    weight: parse_num(&fields[1], "weight").map_err(err)?,
                    port: parse_num(&fields[2], "port").map_err(err)?,
                    target: parse_name(&fields[3]).map_err(err)?,
                }
            }
            "CAA" => {
                expect(3)?;
                let tag = fields[1].to_ascii_lowercase();
                if !matches!(tag.as_str(), "issue" | "issuewild" | "iodef" | "issuemail") {
                    return Err(err(format!("unknown CAA tag '{tag}'")));
                }
                Self::Caa {
                    flags: parse_num(&fields[0], "flags").map_err(err)?,
                    tag,
                    value: fields[2].clone(),
                }
            }
            "SSHFP" => {
                expect(3)?;
                Self::Sshfp {
                    algorithm: parse_num(&fields[0], "algorithm").map_err(err)?,
                    fingerprint_type: parse_num(&fields[1], "fingerprint type").map_err(err)?,
                    fingerprint: parse_hex(&fields[2]).map_err(err)?,
                }
            }
            "TLSA" => {
                expect(4)?;
                Self::Tlsa {
                    usage: parse_num(&fields[0], "usage").map_err(err)?,
                    selector: parse_num(&fields[1], "selector").map_err(err)?,
                    matching_type: parse_num(&fields[2], "matching type").map_err(err)?,
                    certificate: parse_hex(&fields[3]).map_err(err)?,
                }
            }
            "DS" => {
                if fields.len() < 4 {
                    return Err(err(format!("expected 4 fields, found {}", fields.len())));
                }
                // Long digests are sometimes split over several whitespace-separated fields.
                Self::Ds {
                    key_tag: parse_num(&fields[0], "key tag").map_err(err)?,
                    algorithm: parse_num(&fields[1], "algorithm").map_err(err)?,
                    digest_type: parse_num(&fields[2], "digest type").map_err(err)?,
                    digest: parse_hex(&fields[3..].concat()).map_err(err)?,
                }
            }
            "NAPTR" => {
                expect(6)?;
                Self::Naptr {
                    order: parse_num(&fields[0], "order").map_err(err)?,
                    preference: parse_num(&fields[1], "preference").map_err(err)?,
                    flags: fields[2].clone(),
                    service: fields[3].clone(),
                    regexp: fields[4].clone(),
                    replacement: parse_name(&fields[5]).map_err(err)?,
                }
            }
            "SVCB" | "HTTPS" => {
                if fields.len() < 2 {
                    return Err(err(format!("expected at least 2 fields, found {}", fields.len())));
                }
                let svcb = Svcb {
                    priority: parse_num(&fields[0], "priority").map_err(err)?,
                    target: parse_name(&fields[1]).map_err(err)?,
                    params: fields[2..].join(" "),
                };
                if rtype == "HTTPS" {
                    Self::Https(svcb)
                } else {
                    Self::Svcb(svcb)
                }
            }
            "SOA" => {
                expect(7)?;
                Self::Soa(Soa {
                    mname: parse_name(&fields[0]).map_err(err)?,
                    rname: parse_name(&fields[1]).map_err(err)?,
                    serial: parse_num(&fields[2], "serial").map_err(err)?,
                    refresh: parse_num(&fields[3], "refresh").map_err(err)?,
                    retry: parse_num(&fields[4], "retry").map_err(err)?,
                    expire: parse_num(&fields[5], "expire").map_err(err)?,
                    minimum: parse_num(&fields[6], "minimum").map_err(err)?,
                })
            }
            _ => Self::Custom {
                rtype: rtype.to_string(),
                content: content.trim().to_string(),
            },
        };
        Ok(rdata)
    }

    /// The domain name this record points at, for types that point at one.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Alias(t) | Self::Cname(t) | Self::Ns(t) | Self::Ptr(t) => Some(t),
            Self::Mx { exchange, .. } => Some(exchange),
            Self::Srv { target, .. } => Some(target),
            Self::Naptr { replacement, .. } => Some(replacement),
            Self::Svcb(s) | Self::Https(s) => Some(&s.target),
            _ => None,
        }
    }

    /// Mutable access to the pointed-at domain name.
    pub fn target_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::Alias(t) | Self::Cname(t) | Self::Ns(t) | Self::Ptr(t) => Some(t),
            Self::Mx { exchange, .. } => Some(exchange),
            Self::Srv { target, .. } => Some(target),
            Self::Naptr { replacement, .. } => Some(replacement),
            Self::Svcb(s) | Self::Https(s) => Some(&mut s.target),
            _ => None,
        }
    }

    /// Content used for targeting globs: the pointed-at name, or the canonical text.
    #[must_use]
    pub fn target_text(&self) -> String {
        match self {
            Self::A(ip) => ip.to_string(),
            Self::Aaaa(ip) => ip.to_string(),
            Self::Txt(segments) => segments.concat(),
            Self::Custom { content, .. } => content.clone(),
            other => other
                .target()
                .map_or_else(|| other.to_string(), ToString::to_string),
        }
    }

    /// Logical TXT value, or `None` for other types.
    #[must_use]
    pub fn txt_value(&self) -> Option<String> {
        match self {
            Self::Txt(segments) => Some(segments.concat()),
            _ => None,
        }
    }
}

impl fmt::Display for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(ip) => write!(f, "{ip}"),
            Self::Aaaa(ip) => write!(f, "{ip}"),
            Self::Alias(t) | Self::Cname(t) | Self::Ns(t) | Self::Ptr(t) => write!(f, "{t}"),
            Self::Caa { flags, tag, value } => write!(f, "{flags} {tag} {}", quote(value)),
            Self::Ds {
                key_tag,
                algorithm,
                digest_type,
                digest,
            } => write!(f, "{key_tag} {algorithm} {digest_type} {digest}"),
            Self::Https(s) | Self::Svcb(s) => {
                write!(f, "{} {}", s.priority, s.target)?;
                if !s.params.is_empty() {
                    write!(f, " {}", s.params)?;
                }
                Ok(())
            }
            Self::Loc(loc) => write!(f, "{loc}"),
            Self::Mx {
                preference,
                exchange,
            } => write!(f, "{preference} {exchange}"),
            Self::Naptr {
                order,
                preference,
                flags,
                service,
                regexp,
                replacement,
            } => write!(
                f,
                "{order} {preference} {} {} {} {replacement}",
                quote(flags),
                quote(service),
                quote(regexp)
            ),
            Self::Soa(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
            ),
            Self::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{priority} {weight} {port} {target}"),
            Self::Sshfp {
                algorithm,
                fingerprint_type,
                fingerprint,
            } => write!(f, "{algorithm} {fingerprint_type} {fingerprint}"),
            Self::Tlsa {
                usage,
                selector,
                matching_type,
                certificate,
            } => write!(f, "{usage} {selector} {matching_type} {certificate}"),
            Self::Txt(segments) => {
                let chunks = split_txt(&segments.concat());
                let quoted: Vec<String> = chunks.iter().map(|c| quote(c)).collect();
                write!(f, "{}", quoted.join(" "))
            }
            Self::Custom { content, .. } => write!(f, "{content}"),
        }
    }
}

/// Split a logical TXT value into wire-sized segments on character boundaries.
#[must_use]
pub fn split_txt(value: &str) -> Vec<String> {
    if value.is_empty() {
        return vec![String::new()];
    }
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in value.chars() {
        if current.len() + c.len_utf8() > TXT_SEGMENT_MAX_LEN {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Quote a character-string, escaping backslashes and double quotes.
#[must_use]
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Split presentation-format content into fields, honouring quotes and escapes.
///
/// # Errors
///
/// Returns an error on an unterminated quoted string.
pub fn tokenize(content: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut chars = content.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut field = String::new();
        if c == '"' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            field.push(escaped);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => field.push(c),
                }
            }
            if !closed {
                return Err("unterminated quoted string".to_string());
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                field.push(c);
                chars.next();
            }
        }
        fields.push(field);
    }
    Ok(fields)
}

fn parse_txt(content: &str) -> Result<Vec<String>, String> {
    if content.starts_with('"') {
        tokenize(content)
    } else {
        Ok(vec![content.to_string()])
    }
}

fn parse_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("empty name".to_string());
    }
    if name.contains(char::is_whitespace) {
        return Err(format!("'{name}' is not a single domain name"));
    }
    if name.contains("..") {
        return Err(format!("'{name}' contains an empty label"));
    }
    Ok(name.to_ascii_lowercase())
}

fn parse_num<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("{what} '{raw}' is not a valid number"))
}

fn parse_hex(raw: &str) -> Result<String, String> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("'{raw}' is not a hex string"));
    }
    Ok(raw.to_ascii_lowercase())
}

#[cfg(test)]
#[path = "rdata_tests.rs"]
mod rdata_tests;
