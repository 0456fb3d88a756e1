// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! LOC record data (RFC 1876).
//!
//! The presentation format is parsed into the wire fields so that two spellings
//! of the same location compare equal.

use std::fmt;

const EQUATOR: i64 = 1 << 31;
const ALTITUDE_BASE_CM: i64 = 10_000_000;
const MAX_ARC: i64 = 180 * 3_600_000;

/// Default size (1m), horizontal precision (10000m), vertical precision (10m) in cm.
const DEFAULT_SIZE_CM: u64 = 100;
const DEFAULT_HORIZ_PRE_CM: u64 = 1_000_000;
const DEFAULT_VERT_PRE_CM: u64 = 1_000;

/// LOC wire fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loc {
    /// Always 0
    pub version: u8,
    /// Diameter of the enclosing sphere, mantissa/exponent encoded
    pub size: u8,
    /// Horizontal precision, mantissa/exponent encoded
    pub horiz_pre: u8,
    /// Vertical precision, mantissa/exponent encoded
    pub vert_pre: u8,
    /// Thousandths of an arc second, offset by 2^31
    pub latitude: u32,
    /// Thousandths of an arc second, offset by 2^31
    pub longitude: u32,
    /// Centimetres above a base 100000m below the WGS84 ellipsoid
    pub altitude: u32,
}

impl Loc {
    /// Parse `d [m [s]] {N|S} d [m [s]] {E|W} alt[m] [size[m] [hp[m] [vp[m]]]]`.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed field.
    pub fn parse(content: &str) -> Result<Self, String> {
        let fields: Vec<&str> = content.split_whitespace().collect();
        let mut pos = 0;

        let latitude = parse_coordinate(&fields, &mut pos, 'N', 'S', 90)?;
        let longitude = parse_coordinate(&fields, &mut pos, 'E', 'W', 180)?;

        let altitude_m = fields
            .get(pos)
            .ok_or_else(|| "missing altitude".to_string())
            .and_then(|f| parse_meters(f))?;
        pos += 1;
        let altitude_cm = (altitude_m * 100.0).round() as i64 + ALTITUDE_BASE_CM;
        let altitude = u32::try_from(altitude_cm).map_err(|_| "altitude out of range")?;

        let mut precision = |default: u64| -> Result<u8, String> {
            match fields.get(pos) {
                Some(f) => {
                    pos += 1;
                    let cm = (parse_meters(f)? * 100.0).round();
                    if cm < 0.0 {
                        return Err(format!("negative precision '{f}'"));
                    }
                    Ok(encode_precision(cm as u64))
                }
                None => Ok(encode_precision(default)),
            }
        };
        let size = precision(DEFAULT_SIZE_CM)?;
        let horiz_pre = precision(DEFAULT_HORIZ_PRE_CM)?;
        let vert_pre = precision(DEFAULT_VERT_PRE_CM)?;

        if pos < fields.len() {
            return Err(format!("unexpected trailing field '{}'", fields[pos]));
        }

        Ok(Self {
            version: 0,
            size,
            horiz_pre,
            vert_pre,
            latitude,
            longitude,
            altitude,
        })
    }
}

fn parse_coordinate(
    fields: &[&str],
    pos: &mut usize,
    positive: char,
    negative: char,
    max_degrees: i64,
) -> Result<u32, String> {
    let mut parts: Vec<&str> = Vec::new();
    let hemisphere = loop {
        let field = fields
            .get(*pos)
            .ok_or_else(|| format!("missing {positive}/{negative} hemisphere"))?;
        *pos += 1;
        let upper = field.to_ascii_uppercase();
        if upper.len() == 1 && (upper.starts_with(positive) || upper.starts_with(negative)) {
            break upper.starts_with(positive);
        }
        if parts.len() == 3 {
            return Err(format!("expected hemisphere {positive} or {negative}, found '{field}'"));
        }
        parts.push(field);
    };

    let degrees: i64 = parts
        .first()
        .ok_or("missing degrees")?
        .parse()
        .map_err(|_| "invalid degrees".to_string())?;
    let minutes: i64 = match parts.get(1) {
        Some(m) => m.parse().map_err(|_| format!("invalid minutes '{m}'"))?,
        None => 0,
    };
    let seconds: f64 = match parts.get(2) {
        Some(s) => s.parse().map_err(|_| format!("invalid seconds '{s}'"))?,
        None => 0.0,
    };
    if degrees > max_degrees || !(0..60).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return Err("coordinate out of range".to_string());
    }

    let arc = degrees * 3_600_000 + minutes * 60_000 + (seconds * 1000.0).round() as i64;
    if arc > MAX_ARC {
        return Err("coordinate out of range".to_string());
    }
    let value = if hemisphere { EQUATOR + arc } else { EQUATOR - arc };
    u32::try_from(value).map_err(|_| "coordinate out of range".to_string())
}

fn parse_meters(field: &str) -> Result<f64, String> {
    let number = field.strip_suffix(['m', 'M']).unwrap_or(field);
    number
        .parse()
        .map_err(|_| format!("invalid distance '{field}'"))
}

fn encode_precision(mut cm: u64) -> u8 {
    let mut exponent = 0u8;
    while cm >= 10 && exponent < 9 {
        cm /= 10;
        exponent += 1;
    }
    let mantissa = u8::try_from(cm.min(9)).unwrap_or(9);
    (mantissa << 4) | exponent
}

fn decode_precision(encoded: u8) -> f64 {
    let mantissa = f64::from(encoded >> 4);
    let exponent = i32::from(encoded & 0x0f);
    mantissa * 10f64.powi(exponent) / 100.0
}

fn format_coordinate(value: u32, positive: char, negative: char) -> String {
    let offset = i64::from(value) - EQUATOR;
    let hemisphere = if offset >= 0 { positive } else { negative };
    let arc = offset.abs();
    let degrees = arc / 3_600_000;
    let minutes = (arc % 3_600_000) / 60_000;
    let millis = arc % 60_000;
    format!(
        "{degrees} {minutes} {}.{:03} {hemisphere}",
        millis / 1000,
        millis % 1000
    )
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let altitude_cm = i64::from(self.altitude) - ALTITUDE_BASE_CM;
        let sign = if altitude_cm < 0 { "-" } else { "" };
        let altitude_cm = altitude_cm.abs();
        write!(
            f,
            "{} {} {sign}{}.{:02}m {:.2}m {:.2}m {:.2}m",
            format_coordinate(self.latitude, 'N', 'S'),
            format_coordinate(self.longitude, 'E', 'W'),
            altitude_cm / 100,
            altitude_cm % 100,
            decode_precision(self.size),
            decode_precision(self.horiz_pre),
            decode_precision(self.vert_pre),
        )
    }
}
