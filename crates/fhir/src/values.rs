//! Typed answer values and the lexical rules of their literals.
//!
//! A questionnaire answer resolves to exactly one [`TypedValue`]. The primitive wrappers in
//! this module ([`FhirDate`], [`FhirDateTime`], [`FhirTime`], [`QuantityComparator`]) validate
//! the literal a client sent and fail closed with a [`FhirError`] instead of coercing it.
//!
//! Accepted literal forms:
//! - date: `YYYY`, `YYYY-MM`, `MM.YYYY`, `YYYY-MM-DD`, `DD.MM.YYYY` (precision from length)
//! - dateTime: `DD.MM.YYYY HH:mm[:ss]`, RFC 3339, `YYYY-MM-DDTHH:mm:ss`, or any date literal
//! - time: `HH:mm[:ss[.fff]]`

use crate::{FhirError, FhirResult};
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Timelike,
};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// ============================================================================
// Date
// ============================================================================

/// Precision of a partial date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

/// A FHIR `date` with explicit precision.
///
/// The stored [`NaiveDate`] is the first day of the period the literal denotes; only the
/// components covered by `precision` are rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FhirDate {
    date: NaiveDate,
    precision: DatePrecision,
}

impl FhirDate {
    /// Creates a day-precision date.
    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            date,
            precision: DatePrecision::Day,
        }
    }

    /// Parses a questionnaire date literal, inferring precision from its length.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidDate`] if the length is not 4, 7 or 10, the delimiters do
    /// not match one of the accepted layouts, or the components do not form a calendar date.
    pub fn parse(literal: &str) -> FhirResult<Self> {
        let invalid = |reason: String| FhirError::InvalidDate {
            literal: literal.to_string(),
            reason,
        };

        if !literal.is_ascii() {
            return Err(invalid("contains non-ASCII characters".into()));
        }

        let bytes = literal.as_bytes();
        let (year, month, day, precision) = match literal.len() {
            4 => (literal, None, None, DatePrecision::Year),
            7 if bytes[4] == b'-' => (
                &literal[0..4],
                Some(&literal[5..7]),
                None,
                DatePrecision::Month,
            ),
            7 if bytes[2] == b'.' => (
                &literal[3..7],
                Some(&literal[0..2]),
                None,
                DatePrecision::Month,
            ),
            7 => return Err(invalid("expected YYYY-MM or MM.YYYY".into())),
            10 if bytes[4] == b'-' && bytes[7] == b'-' => (
                &literal[0..4],
                Some(&literal[5..7]),
                Some(&literal[8..10]),
                DatePrecision::Day,
            ),
            10 if bytes[2] == b'.' && bytes[5] == b'.' => (
                &literal[6..10],
                Some(&literal[3..5]),
                Some(&literal[0..2]),
                DatePrecision::Day,
            ),
            10 => return Err(invalid("expected YYYY-MM-DD or DD.MM.YYYY".into())),
            other => return Err(invalid(format!("unsupported length {other}"))),
        };

        let year = digits(year).ok_or_else(|| invalid("year must be four digits".into()))?;
        let month = match month {
            Some(m) => digits(m).ok_or_else(|| invalid("month must be two digits".into()))?,
            None => 1,
        };
        let day = match day {
            Some(d) => digits(d).ok_or_else(|| invalid("day must be two digits".into()))?,
            None => 1,
        };

        let date = NaiveDate::from_ymd_opt(year as i32, month, day)
            .ok_or_else(|| invalid("not a calendar date".into()))?;

        Ok(Self { date, precision })
    }

    pub fn precision(&self) -> DatePrecision {
        self.precision
    }

    /// First day of the period this date denotes.
    pub fn first_day(&self) -> NaiveDate {
        self.date
    }
}

impl fmt::Display for FhirDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            DatePrecision::Year => write!(f, "{}", self.date.format("%Y")),
            DatePrecision::Month => write!(f, "{}", self.date.format("%Y-%m")),
            DatePrecision::Day => write!(f, "{}", self.date.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for FhirDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

// ============================================================================
// DateTime
// ============================================================================

/// Precision of a FHIR `dateTime`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateTimePrecision {
    Year,
    Month,
    Day,
    Second,
}

/// A FHIR `dateTime`: either a partial date or a full instant with offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FhirDateTime {
    /// Date-only value (year, month or day precision).
    Partial(FhirDate),
    /// Second-precision value.
    Instant(DateTime<FixedOffset>),
}

/// `DD.MM.YYYY HH:mm[:ss]` or `YYYY-MM-DDTHH:mm:ss`, two digits per field, no offset.
fn local_date_time_pattern() -> &'static Regex {
    static LOCAL_DATE_TIME_RE: OnceLock<Regex> = OnceLock::new();
    LOCAL_DATE_TIME_RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:[0-9]{2}\.[0-9]{2}\.[0-9]{4} [0-9]{2}:[0-9]{2}(?::[0-9]{2})?",
            r"|[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2})$"
        ))
        .expect("date-time regex must compile")
    })
}

impl FhirDateTime {
    /// Parses a questionnaire dateTime literal.
    ///
    /// Explicit date-time literals are tried first. A date-only literal is promoted to a
    /// dateTime of the same precision. Literals without an offset are taken as UTC.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidDateTime`] if the literal matches none of the accepted
    /// layouts.
    pub fn parse(literal: &str) -> FhirResult<Self> {
        let invalid = |reason: String| FhirError::InvalidDateTime {
            literal: literal.to_string(),
            reason,
        };

        if local_date_time_pattern().is_match(literal) {
            return ["%d.%m.%Y %H:%M", "%d.%m.%Y %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|layout| NaiveDateTime::parse_from_str(literal, layout).ok())
                .map(|naive| Self::Instant(naive.and_utc().fixed_offset()))
                .ok_or_else(|| invalid("not a calendar date and time of day".into()));
        }

        if literal.contains(' ') || literal.contains('T') {
            return DateTime::parse_from_rfc3339(literal)
                .map(Self::Instant)
                .map_err(|e| invalid(e.to_string()));
        }

        FhirDate::parse(literal)
            .map(Self::Partial)
            .map_err(|e| invalid(e.to_string()))
    }

    /// Promotes a date to a dateTime of the same precision.
    pub fn from_date(date: FhirDate) -> Self {
        Self::Partial(date)
    }

    pub fn precision(&self) -> DateTimePrecision {
        match self {
            Self::Partial(date) => match date.precision() {
                DatePrecision::Year => DateTimePrecision::Year,
                DatePrecision::Month => DateTimePrecision::Month,
                DatePrecision::Day => DateTimePrecision::Day,
            },
            Self::Instant(_) => DateTimePrecision::Second,
        }
    }
}

impl From<FhirDate> for FhirDateTime {
    fn from(date: FhirDate) -> Self {
        Self::from_date(date)
    }
}

impl fmt::Display for FhirDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partial(date) => fmt::Display::fmt(date, f),
            Self::Instant(instant) => {
                f.write_str(&instant.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
        }
    }
}

impl Serialize for FhirDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// Time
// ============================================================================

/// A FHIR `time` (time of day, no date, no offset).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FhirTime(NaiveTime);

fn time_pattern() -> &'static Regex {
    static TIME_RE: OnceLock<Regex> = OnceLock::new();
    TIME_RE.get_or_init(|| {
        Regex::new(r"^([0-9]{2}):([0-9]{2})(?::([0-9]{2})(?:\.([0-9]{1,3}))?)?$")
            .expect("time regex must compile")
    })
}

impl FhirTime {
    /// Parses `HH:mm`, `HH:mm:ss` or `HH:mm:ss.fff`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidTime`] if the layout does not match, the hour exceeds 23,
    /// or the minute or second exceeds 59.
    pub fn parse(literal: &str) -> FhirResult<Self> {
        let invalid = |reason: &str| FhirError::InvalidTime {
            literal: literal.to_string(),
            reason: reason.to_string(),
        };

        let caps = time_pattern()
            .captures(literal)
            .ok_or_else(|| invalid("expected HH:mm[:ss[.fff]]"))?;

        let component = |idx: usize| -> FhirResult<u32> {
            match caps.get(idx) {
                Some(m) => m.as_str().parse().map_err(|_| invalid("not a number")),
                None => Ok(0),
            }
        };
        let (hour, minute, second) = (component(1)?, component(2)?, component(3)?);

        if hour > 23 {
            return Err(invalid("hour out of range"));
        }
        if minute > 59 {
            return Err(invalid("minute out of range"));
        }
        if second > 59 {
            return Err(invalid("second out of range"));
        }

        let millis = match caps.get(4) {
            Some(m) => {
                let fraction = m.as_str();
                let scale = 10u32.pow(3 - fraction.len() as u32);
                fraction
                    .parse::<u32>()
                    .map_err(|_| invalid("fraction is not a number"))?
                    * scale
            }
            None => 0,
        };

        NaiveTime::from_hms_milli_opt(hour, minute, second, millis)
            .map(Self)
            .ok_or_else(|| invalid("not a time of day"))
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for FhirTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.nanosecond() == 0 {
            write!(f, "{}", self.0.format("%H:%M:%S"))
        } else {
            write!(f, "{}", self.0.format("%H:%M:%S%.3f"))
        }
    }
}

impl Serialize for FhirTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// Complex values
// ============================================================================

/// A code from a code system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    /// Creates a coding with system and code only.
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            version: None,
            code: code.into(),
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

/// Comparator of a quantity value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantityComparator {
    LessThan,
    LessOrEqual,
    GreaterOrEqual,
    GreaterThan,
}

impl QuantityComparator {
    /// Parses the questionnaire comparator code (`LT`, `LE`, `GE`, `GT`) or its FHIR symbol.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidComparator`] for any other value.
    pub fn parse(s: &str) -> FhirResult<Self> {
        match s {
            "LT" | "<" => Ok(Self::LessThan),
            "LE" | "<=" => Ok(Self::LessOrEqual),
            "GE" | ">=" => Ok(Self::GreaterOrEqual),
            "GT" | ">" => Ok(Self::GreaterThan),
            other => Err(FhirError::InvalidComparator(other.to_string())),
        }
    }

    /// FHIR wire symbol.
    pub fn as_symbol(&self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
            Self::GreaterThan => ">",
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LessThan => "less-than",
            Self::LessOrEqual => "less-or-equal",
            Self::GreaterOrEqual => "greater-or-equal",
            Self::GreaterThan => "greater-than",
        }
    }
}

impl fmt::Display for QuantityComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for QuantityComparator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_symbol())
    }
}

/// A measured amount.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Quantity {
    #[serde(
        serialize_with = "serialize_optional_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparator: Option<QuantityComparator>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Writes a decimal as a JSON number parsed from its literal digits.
fn serialize_decimal<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serde_json::Number::from_str(&value.to_string())
        .map_err(serde::ser::Error::custom)?
        .serialize(serializer)
}

fn serialize_optional_decimal<S: Serializer>(
    value: &Option<Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(decimal) => serialize_decimal(decimal, serializer),
        None => serializer.serialize_none(),
    }
}

/// A reference to another resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub reference: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            display: None,
        }
    }

    /// Relative reference `ResourceType/id`.
    pub fn to_resource(resource_type: &str, id: &crate::ResourceId) -> Self {
        Self::new(format!("{resource_type}/{id}"))
    }
}

// ============================================================================
// TypedValue
// ============================================================================

/// The resolved value of a questionnaire answer.
///
/// Serialises as the single `value[x]` member of a FHIR answer, e.g.
/// `{"valueDate": "2024-07-10"}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TypedValue {
    #[serde(rename = "valueString")]
    String(String),
    #[serde(rename = "valueBoolean")]
    Boolean(bool),
    #[serde(rename = "valueDecimal", serialize_with = "serialize_decimal")]
    Decimal(Decimal),
    #[serde(rename = "valueInteger")]
    Integer(i32),
    #[serde(rename = "valueDate")]
    Date(FhirDate),
    #[serde(rename = "valueDateTime")]
    DateTime(FhirDateTime),
    #[serde(rename = "valueTime")]
    Time(FhirTime),
    #[serde(rename = "valueUri")]
    Uri(String),
    #[serde(rename = "valueCoding")]
    Coding(Coding),
    #[serde(rename = "valueQuantity")]
    Quantity(Quantity),
    #[serde(rename = "valueReference")]
    Reference(Reference),
}

impl TypedValue {
    /// Short name of the active variant, as used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Decimal(_) => "decimal",
            Self::Integer(_) => "integer",
            Self::Date(_) => "date",
            Self::DateTime(_) => "dateTime",
            Self::Time(_) => "time",
            Self::Uri(_) => "uri",
            Self::Coding(_) => "coding",
            Self::Quantity(_) => "quantity",
            Self::Reference(_) => "reference",
        }
    }
}
