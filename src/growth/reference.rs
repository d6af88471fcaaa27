//! WHO reference tables
//!
//! Tables are read once from CSV into typed maps. Lookups are exact-key
//! only: an age or length that is not tabulated is reported as
//! `ReferenceNotFound` rather than interpolated.

use super::{Indicator, Lms, Sex};
use crate::error::{Error, Result};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Days per monthly bucket when collapsing daily tables
pub const DAYS_PER_MONTH_BUCKET: u32 = 30;

/// How a table is keyed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Completed months of age
    Month,
    /// Recumbent length or standing height, stored in tenths of a centimetre
    Length,
}

impl KeyKind {
    fn column_names(&self) -> &'static [&'static str] {
        match self {
            KeyKind::Month => &["month"],
            KeyKind::Length => &["length", "height"],
        }
    }

    fn describe(&self, raw: u32) -> String {
        match self {
            KeyKind::Month => format!("month {}", raw),
            KeyKind::Length => format!("{:.1} cm", raw as f64 / 10.0),
        }
    }

    /// Convert a caller-supplied key to the stored integer key, if it can exist
    fn to_raw(&self, key: f64) -> Option<u32> {
        if !key.is_finite() || key < 0.0 {
            return None;
        }
        let scaled = match self {
            KeyKind::Month => key,
            KeyKind::Length => key * 10.0,
        };
        let rounded = scaled.round();
        if (scaled - rounded).abs() > 1e-6 || rounded > u32::MAX as f64 {
            return None;
        }
        Some(rounded as u32)
    }
}

/// Immutable LMS table for one indicator and sex
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    indicator: Indicator,
    sex: Sex,
    kind: KeyKind,
    rows: BTreeMap<u32, Lms>,
}

impl ReferenceTable {
    /// Build from `(key, lms)` pairs, rejecting duplicate keys
    pub fn from_rows(
        indicator: Indicator,
        sex: Sex,
        kind: KeyKind,
        rows: impl IntoIterator<Item = (f64, Lms)>,
    ) -> Result<Self> {
        let mut map = BTreeMap::new();
        for (key, lms) in rows {
            let raw = kind.to_raw(key).ok_or_else(|| {
                Error::Parse(format!("invalid {} key {} in {} table", indicator, key, sex))
            })?;
            if map.insert(raw, lms).is_some() {
                return Err(Error::Parse(format!(
                    "duplicate key {} in {} {} table",
                    kind.describe(raw),
                    sex,
                    indicator
                )));
            }
        }
        Ok(Self {
            indicator,
            sex,
            kind,
            rows: map,
        })
    }

    /// Parse a CSV table whose header names the key column and `L`, `M`, `S`
    pub fn from_csv<R: Read>(indicator: Indicator, sex: Sex, kind: KeyKind, reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let key_idx = find_column(&headers, kind.column_names())?;
        let (l_idx, m_idx, s_idx) = lms_columns(&headers)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let key = parse_field(&record, key_idx)?;
            let lms = Lms::new(
                parse_field(&record, l_idx)?,
                parse_field(&record, m_idx)?,
                parse_field(&record, s_idx)?,
            );
            rows.push((key, lms));
        }

        Self::from_rows(indicator, sex, kind, rows)
    }

    /// Load a CSV table from disk
    pub fn load(path: &Path, indicator: Indicator, sex: Sex, kind: KeyKind) -> Result<Self> {
        debug!("Loading {} {} table from {:?}", sex, indicator, path);
        let file = std::fs::File::open(path).map_err(|e| {
            Error::Config(format!("cannot open reference table {}: {}", path.display(), e))
        })?;
        Self::from_csv(indicator, sex, kind, file)
    }

    /// Exact-match lookup by age in months or length in centimetres
    pub fn lookup(&self, key: f64) -> Result<Lms> {
        self.kind
            .to_raw(key)
            .and_then(|raw| self.rows.get(&raw).copied())
            .ok_or_else(|| Error::ReferenceNotFound {
                indicator: self.indicator.to_string(),
                sex: self.sex.to_string(),
                key: match self.kind {
                    KeyKind::Month => format!("month {}", key),
                    KeyKind::Length => format!("{} cm", key),
                },
            })
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of a monthly table produced from daily data
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyRow {
    #[serde(rename = "Day")]
    pub day: u32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "L")]
    pub l: f64,
    #[serde(rename = "M")]
    pub m: f64,
    #[serde(rename = "S")]
    pub s: f64,
}

/// Read a daily table (`Day, L, M, S`) into a day-keyed map
pub fn read_daily<R: Read>(reader: R) -> Result<BTreeMap<u32, Lms>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let day_idx = find_column(&headers, &["day"])?;
    let (l_idx, m_idx, s_idx) = lms_columns(&headers)?;

    let mut days = BTreeMap::new();
    for record in reader.records() {
        let record = record?;
        let day = parse_field(&record, day_idx)?;
        if day < 0.0 || day.fract() != 0.0 {
            return Err(Error::Parse(format!("invalid day value {}", day)));
        }
        let lms = Lms::new(
            parse_field(&record, l_idx)?,
            parse_field(&record, m_idx)?,
            parse_field(&record, s_idx)?,
        );
        if days.insert(day as u32, lms).is_some() {
            return Err(Error::Parse(format!("duplicate day {}", day)));
        }
    }
    Ok(days)
}

/// Collapse a daily table to one row per 30-day bucket, taking the bucket's first day
pub fn reduce_to_monthly(daily: &BTreeMap<u32, Lms>) -> Result<Vec<MonthlyRow>> {
    let last_day = match daily.keys().next_back() {
        Some(day) => *day,
        None => return Ok(Vec::new()),
    };

    (0..=last_day / DAYS_PER_MONTH_BUCKET)
        .map(|month| {
            let day = month * DAYS_PER_MONTH_BUCKET;
            let lms = daily
                .get(&day)
                .ok_or_else(|| Error::Parse(format!("daily table has no row for day {}", day)))?;
            Ok(MonthlyRow {
                day,
                month,
                l: lms.l,
                m: lms.m,
                s: lms.s,
            })
        })
        .collect()
}

/// Write monthly rows as CSV (`Day, Month, L, M, S`)
pub fn write_monthly<W: Write>(rows: &[MonthlyRow], writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Result<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        .ok_or_else(|| Error::Parse(format!("missing column {:?} in header {:?}", names, headers)))
}

fn lms_columns(headers: &StringRecord) -> Result<(usize, usize, usize)> {
    Ok((
        find_column(headers, &["l"])?,
        find_column(headers, &["m"])?,
        find_column(headers, &["s"])?,
    ))
}

fn parse_field(record: &StringRecord, idx: usize) -> Result<f64> {
    let raw = record
        .get(idx)
        .ok_or_else(|| Error::Parse(format!("row {:?} has no column {}", record, idx)))?;
    raw.parse::<f64>()
        .map_err(|e| Error::Parse(format!("invalid number '{}': {}", raw, e)))
}
