//! Field-level validation for the semi-structured JSON payloads.
//!
//! Payloads arrive as raw JSON at the API boundary and are read into typed
//! structs through a [`Checker`], which records a [`Violation`] (field path and
//! reason) for every shape, range or enumeration problem it meets. In
//! [`ValidationMode::FailFast`] only the first violation is kept.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveEnum, Iterable};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Non-empty list of violations produced by a failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn single(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self(vec![Violation::new(field, reason)])
    }

    pub fn first(&self) -> &Violation {
        // Constructed only from a non-empty list
        &self.0[0]
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.0
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Stop at the first violation
    #[default]
    FailFast,
    /// Report every violation found
    Accumulate,
}

impl std::str::FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_fast" | "failfast" | "first" => Ok(Self::FailFast),
            "accumulate" | "all" => Ok(Self::Accumulate),
            other => Err(format!(
                "unknown validation mode '{other}', expected 'fail_fast' or 'accumulate'"
            )),
        }
    }
}

/// Joins a parent path and a key into a dotted field path
pub fn field_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

pub struct Checker {
    mode: ValidationMode,
    today: NaiveDate,
    violations: Vec<Violation>,
}

impl Checker {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            today: Utc::now().date_naive(),
            violations: Vec::new(),
        }
    }

    /// Overrides the reference date used for "not in the future" rules
    #[cfg(test)]
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn reject(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        if self.mode == ValidationMode::FailFast && !self.violations.is_empty() {
            return;
        }
        self.violations.push(Violation::new(field, reason));
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    #[cfg(test)]
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Converts the outcome of a read into a result.
    ///
    /// A read that produced no value must have recorded at least one
    /// violation; a generic one is added otherwise so the error is never empty.
    pub fn finish<T>(self, parsed: Option<T>) -> Result<T, Violations> {
        match parsed {
            Some(value) if self.violations.is_empty() => Ok(value),
            _ if !self.violations.is_empty() => Err(Violations(self.violations)),
            _ => Err(Violations::single("$", "payload could not be read")),
        }
    }

    pub fn object<'a>(&mut self, value: &'a Value, field: &str) -> Option<&'a Map<String, Value>> {
        if let Value::Object(map) = value {
            Some(map)
        } else {
            self.reject(field, "must be a JSON object");
            None
        }
    }

    /// Looks up a key that must be present and non-null
    pub fn required<'a>(
        &mut self,
        map: &'a Map<String, Value>,
        parent: &str,
        key: &str,
    ) -> Option<&'a Value> {
        match map.get(key) {
            Some(Value::Null) | None => {
                self.reject(field_path(parent, key), "is required");
                None
            }
            Some(value) => Some(value),
        }
    }

    pub fn text(&mut self, value: &Value, field: &str) -> Option<String> {
        if let Value::String(s) = value {
            Some(s.clone())
        } else {
            self.reject(field, "must be a string");
            None
        }
    }

    pub fn non_blank(&mut self, value: &Value, field: &str) -> Option<String> {
        let text = self.text(value, field)?;
        if text.trim().is_empty() {
            self.reject(field, "cannot be empty");
            return None;
        }
        Some(text)
    }

    /// Reads a decimal from a JSON number or numeric string.
    ///
    /// The value is rounded to [`DECIMAL_DIGITS`] so that what is range-checked
    /// is exactly what the stored `f64` payload reads back as.
    pub fn decimal(&mut self, value: &Value, field: &str) -> Option<Decimal> {
        let parsed = match value {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s.trim()),
            _ => None,
        };
        if parsed.is_none() {
            self.reject(field, "must be a decimal number");
        }
        parsed
    }

    /// Inclusive range check on an already-read decimal
    pub fn within(&mut self, number: Decimal, field: &str, min: Decimal, max: Decimal) -> bool {
        if number < min || number > max {
            self.reject(field, format!("must be between {min} and {max}"));
            return false;
        }
        true
    }

    pub fn decimal_in_range(
        &mut self,
        value: &Value,
        field: &str,
        min: Decimal,
        max: Decimal,
    ) -> Option<Decimal> {
        let number = self.decimal(value, field)?;
        self.within(number, field, min, max).then_some(number)
    }

    pub fn integer_in_range(&mut self, value: &Value, field: &str, min: i64, max: i64) -> Option<i64> {
        let Some(number) = value.as_i64() else {
            self.reject(field, "must be an integer");
            return None;
        };
        if number < min || number > max {
            self.reject(field, format!("must be between {min} and {max}"));
            return None;
        }
        Some(number)
    }

    /// Reads an ISO `YYYY-MM-DD` date
    pub fn date(&mut self, value: &Value, field: &str) -> Option<NaiveDate> {
        let parsed = value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
        if parsed.is_none() {
            self.reject(field, "must be a date in YYYY-MM-DD format");
        }
        parsed
    }

    /// Reads an RFC 3339 timestamp
    pub fn timestamp(&mut self, value: &Value, field: &str) -> Option<DateTime<Utc>> {
        let parsed = value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc));
        if parsed.is_none() {
            self.reject(field, "must be an RFC 3339 timestamp");
        }
        parsed
    }

    pub fn positive_id(&mut self, value: &Value, field: &str) -> Option<i32> {
        let id = value
            .as_i64()
            .filter(|id| *id > 0)
            .and_then(|id| i32::try_from(id).ok());
        if id.is_none() {
            self.reject(field, "must be a positive integer id");
        }
        id
    }

    /// Reads a value from a closed string enumeration; unknown values are rejected
    pub fn choice<T>(&mut self, value: &Value, field: &str) -> Option<T>
    where
        T: ActiveEnum<Value = String> + Iterable,
    {
        let Value::String(raw) = value else {
            self.reject(field, format!("must be one of: {}", choices::<T>()));
            return None;
        };
        if let Ok(variant) = T::try_from_value(raw) {
            Some(variant)
        } else {
            self.reject(
                field,
                format!("'{raw}' is not valid, must be one of: {}", choices::<T>()),
            );
            None
        }
    }
}

/// Significant digits and decimal places kept when reading a number
pub const DECIMAL_DIGITS: u32 = 15;

/// Magnitudes below this underflow a `Decimal` and read as zero
const UNDERFLOW: f64 = 1e-28;

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let exact = Decimal::from_str_exact(raw)
        .ok()
        .or_else(|| Decimal::from_scientific(raw).ok());
    let number = match exact {
        Some(number) => number,
        None => {
            let float = raw.parse::<f64>().ok().filter(|f| f.is_finite())?;
            if float.abs() < UNDERFLOW {
                Decimal::ZERO
            } else {
                Decimal::from_f64_retain(float)?
            }
        }
    };
    let rounded = number.round_dp(DECIMAL_DIGITS);
    Some(rounded.round_sf(DECIMAL_DIGITS).unwrap_or(rounded).normalize())
}

fn choices<T>() -> String
where
    T: ActiveEnum<Value = String> + Iterable,
{
    T::iter()
        .map(|variant| variant.to_value())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A typed payload read from semi-structured JSON.
pub trait Payload: Sized {
    /// Reads the payload shape, recording a violation for every problem met
    fn read(value: &Value, checker: &mut Checker) -> Option<Self>;

    /// Rules that apply to an already-typed payload
    fn check(&self, _checker: &mut Checker) {}

    fn parse(value: &Value, mode: ValidationMode) -> Result<Self, Violations> {
        Self::parse_with(value, Checker::new(mode))
    }

    fn parse_with(value: &Value, mut checker: Checker) -> Result<Self, Violations> {
        let parsed = Self::read(value, &mut checker);
        if let Some(payload) = &parsed {
            if checker.is_clean() {
                payload.check(&mut checker);
            }
        }
        checker.finish(parsed)
    }

    /// Re-runs [`Payload::check`], e.g. after merging a partial update
    fn verify(&self, mode: ValidationMode) -> Result<(), Violations> {
        let mut checker = Checker::new(mode);
        self.check(&mut checker);
        checker.finish(Some(()))
    }

    /// Every violation in `value`, empty when it is valid
    #[cfg(test)]
    fn validate(value: &Value) -> Vec<Violation> {
        match Self::parse(value, ValidationMode::Accumulate) {
            Ok(_) => Vec::new(),
            Err(violations) => violations.into_vec(),
        }
    }
}
