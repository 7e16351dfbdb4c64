//! Decoding of record text into typed records.
//!
//! Field positions follow the meter's ASTM records:
//!
//! | record | field | content |
//! |--------|-------|---------|
//! | `H` | 4 | sender: product, software versions, serial |
//! | `H` | 6 | number of stored results |
//! | `H` | 13 | meter clock, `YYYYMMDDhhmm[ss]` |
//! | `R` | 1 | record number |
//! | `R` | 2 | universal test id, `^^^Glucose` |
//! | `R` | 3 | value, fixed point for some tests |
//! | `R` | 4 | unit `^` reference method |
//! | `R` | 6 | flags, `/` separated |
//! | `R` | 8 | timestamp |
//! | `L` | 2 | termination code |

use std::fmt;

use glucotux_frame::{split_fields, FieldTable, MAX_FIELDS, MAX_FIELD_LEN};
use serde::{Serialize, Serializer};

use crate::delimiters::DelimiterSet;
use crate::error::{Result, SessionError};

const TEST_ID_MAX_LEN: usize = 11;
const UNIT_MAX_LEN: usize = 9;
const FLAG_SEPARATOR: char = '/';

/// Record-type tag of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Header,
    Patient,
    Order,
    Result,
    Terminator,
    Unknown(u8),
}

impl RecordType {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            b'H' => RecordType::Header,
            b'P' => RecordType::Patient,
            b'O' => RecordType::Order,
            b'R' => RecordType::Result,
            b'L' => RecordType::Terminator,
            other => RecordType::Unknown(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            RecordType::Header => b'H',
            RecordType::Patient => b'P',
            RecordType::Order => b'O',
            RecordType::Result => b'R',
            RecordType::Terminator => b'L',
            RecordType::Unknown(tag) => tag,
        }
    }
}

/// What a result record measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Glucose,
    Insulin,
    Carb,
    Weight,
    Other,
}

impl TestKind {
    pub fn from_test_id(test: &str) -> Self {
        match test {
            "Glucose" => TestKind::Glucose,
            "Carb" | "Carbs" => TestKind::Carb,
            "Weight" => TestKind::Weight,
            t if t.starts_with("Insulin") => TestKind::Insulin,
            _ => TestKind::Other,
        }
    }

    /// Implied decimal places of the transmitted value.
    pub fn decimals(self) -> u32 {
        match self {
            TestKind::Insulin | TestKind::Weight => 1,
            TestKind::Glucose | TestKind::Carb | TestKind::Other => 0,
        }
    }
}

/// A fixed-point value: `units / 10^decimals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    units: i64,
    decimals: u32,
}

impl Measurement {
    pub fn new(units: i64, decimals: u32) -> Self {
        Self { units, decimals }
    }

    /// The raw value as sent by the meter.
    pub fn units(&self) -> i64 {
        self.units
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn as_f64(&self) -> f64 {
        self.units as f64 / 10f64.powi(self.decimals as i32)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.decimals == 0 {
            return f.pad(&self.units.to_string());
        }

        let scale = 10u64.pow(self.decimals);
        let magnitude = self.units.unsigned_abs();
        let sign = if self.units < 0 { "-" } else { "" };
        let text = format!(
            "{sign}{}.{:0width$}",
            magnitude / scale,
            magnitude % scale,
            width = self.decimals as usize
        );
        f.pad(&text)
    }
}

impl Serialize for Measurement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// Session header: delimiters, meter identity and clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    pub delimiters: DelimiterSet,
    pub product: String,
    pub software: String,
    pub serial: String,
    pub record_count: Option<u32>,
    /// Meter clock as transmitted (digits).
    pub timestamp: String,
}

impl HeaderRecord {
    /// Meter clock as `DD.MM.YYYY hh:mm[:ss]`.
    pub fn time_display(&self) -> Option<String> {
        format_meter_time(&self.timestamp)
    }
}

/// One stored measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub number: u32,
    pub test: String,
    pub kind: TestKind,
    pub value: Measurement,
    pub unit: String,
    pub flags: String,
    pub timestamp: String,
}

/// End of message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminatorRecord {
    pub code: String,
}

impl TerminatorRecord {
    /// `N` marks a normal end of transfer.
    pub fn is_normal(&self) -> bool {
        self.code == "N"
    }
}

/// A decoded frame payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(HeaderRecord),
    Patient,
    Order,
    Result(ResultRecord),
    Terminator(TerminatorRecord),
    Unknown(u8),
}

impl Record {
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::Header(_) => RecordType::Header,
            Record::Patient => RecordType::Patient,
            Record::Order => RecordType::Order,
            Record::Result(_) => RecordType::Result,
            Record::Terminator(_) => RecordType::Terminator,
            Record::Unknown(tag) => RecordType::Unknown(*tag),
        }
    }
}

/// Decode record text starting at the record-type tag.
///
/// A header is split with the delimiters it announces itself; every other
/// record uses `delimiters`. `timestamp_width` is the number of result
/// timestamp digits the meter variant sends.
pub fn decode_record(
    record: &[u8],
    delimiters: &DelimiterSet,
    timestamp_width: usize,
) -> Result<Record> {
    let Some(&tag) = record.first() else {
        return Err(SessionError::RecordFormat("empty record".to_string()));
    };

    match RecordType::from_tag(tag) {
        RecordType::Header => decode_header(record).map(Record::Header),
        RecordType::Result => {
            let fields = split_fields(record, delimiters.field, MAX_FIELDS, MAX_FIELD_LEN);
            decode_result(&fields, delimiters, timestamp_width).map(Record::Result)
        }
        RecordType::Terminator => {
            let fields = split_fields(record, delimiters.field, MAX_FIELDS, MAX_FIELD_LEN);
            Ok(Record::Terminator(TerminatorRecord {
                code: fields.get(2).to_string(),
            }))
        }
        RecordType::Patient => Ok(Record::Patient),
        RecordType::Order => Ok(Record::Order),
        RecordType::Unknown(tag) => Ok(Record::Unknown(tag)),
    }
}

fn decode_header(record: &[u8]) -> Result<HeaderRecord> {
    let delimiters = DelimiterSet::from_header(record)?;
    let fields = split_fields(record, delimiters.field, MAX_FIELDS, MAX_FIELD_LEN);
    let sender = fields.components(4, delimiters.component);

    Ok(HeaderRecord {
        delimiters,
        product: sender.get(0).to_string(),
        software: sender.get(1).to_string(),
        serial: sender.get(2).to_string(),
        record_count: fields.get(6).trim().parse().ok(),
        timestamp: leading_digits(fields.get(13), usize::MAX),
    })
}

fn decode_result(
    fields: &FieldTable,
    delimiters: &DelimiterSet,
    timestamp_width: usize,
) -> Result<ResultRecord> {
    if !fields.has(3) {
        return Err(SessionError::RecordFormat(format!(
            "result record has {} fields",
            fields.len()
        )));
    }

    let number = fields.get(1).trim().parse().map_err(|_| {
        SessionError::RecordFormat(format!("bad record number {:?}", fields.get(1)))
    })?;

    let test = strip_test_prefix(fields.get(2), delimiters.component.unwrap_or(b'^'));
    let test: String = test.chars().take(TEST_ID_MAX_LEN).collect();
    let kind = TestKind::from_test_id(&test);

    let units = fields.get(3).trim().parse().map_err(|_| {
        SessionError::RecordFormat(format!("bad result value {:?}", fields.get(3)))
    })?;

    let unit = fields.components(4, delimiters.component);

    Ok(ResultRecord {
        number,
        test,
        kind,
        value: Measurement::new(units, kind.decimals()),
        unit: unit.get(0).chars().take(UNIT_MAX_LEN).collect(),
        flags: map_flags(fields.get(6)),
        timestamp: leading_digits(fields.get(8), timestamp_width),
    })
}

/// Universal test ids carry three empty leading components (`^^^Glucose`).
fn strip_test_prefix(field: &str, component: u8) -> &str {
    let mut rest = field;
    for _ in 0..3 {
        match rest.strip_prefix(char::from(component)) {
            Some(stripped) => rest = stripped,
            None => break,
        }
    }
    rest
}

/// One letter per sub-field: `M` reads as `N`, an empty sub-field as `O`.
fn map_flags(field: &str) -> String {
    field
        .split(FLAG_SEPARATOR)
        .map(|flag| match flag.chars().next() {
            None => 'O',
            Some('M') => 'N',
            Some(other) => other,
        })
        .collect()
}

fn leading_digits(field: &str, max: usize) -> String {
    field
        .chars()
        .take_while(char::is_ascii_digit)
        .take(max)
        .collect()
}

/// Render a `YYYYMMDDhhmm[ss]` meter timestamp as `DD.MM.YYYY hh:mm[:ss]`.
pub fn format_meter_time(raw: &str) -> Option<String> {
    let digits = leading_digits(raw, 14);
    if digits.len() < 12 {
        return None;
    }

    let mut out = format!(
        "{}.{}.{} {}:{}",
        &digits[6..8],
        &digits[4..6],
        &digits[0..4],
        &digits[8..10],
        &digits[10..12]
    );
    if digits.len() == 14 {
        out.push(':');
        out.push_str(&digits[12..14]);
    }
    Some(out)
}
