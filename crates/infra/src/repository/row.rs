//! Storage-neutral row representation shared by mappers and backends.
//!
//! Money is stored as decimal TEXT next to a currency code, timestamps as
//! RFC 3339 TEXT with fixed nanosecond precision (so they sort lexically),
//! dates as `YYYY-MM-DD` and ids as hyphenated UUID TEXT.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use fintrack_core::{Currency, CurrencyValue};

use super::r#trait::RepositoryError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column affinity used when reading values back from the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
        }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Bool,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn text(value: impl Into<String>) -> Self {
        SqlValue::Text(value.into())
    }

    pub fn opt_text(value: Option<impl Into<String>>) -> Self {
        value.map_or(SqlValue::Null, |v| SqlValue::Text(v.into()))
    }

    pub fn decimal(value: Decimal) -> Self {
        SqlValue::Text(value.to_string())
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        SqlValue::Text(format_timestamp(value))
    }

    pub fn date(value: NaiveDate) -> Self {
        SqlValue::Text(value.format(DATE_FORMAT).to_string())
    }

    pub fn opt_date(value: Option<NaiveDate>) -> Self {
        value.map_or(SqlValue::Null, Self::date)
    }
}

/// Ordering used by the in-memory backend: NULLs first, then by value.
/// Values of different kinds compare by kind so sorting is total.
impl PartialOrd for SqlValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SqlValue {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &SqlValue) -> u8 {
            match v {
                SqlValue::Null => 0,
                SqlValue::Bool(_) => 1,
                SqlValue::Integer(_) => 2,
                SqlValue::Text(_) => 3,
            }
        }
        match (self, other) {
            (SqlValue::Text(a), SqlValue::Text(b)) => a.cmp(b),
            (SqlValue::Integer(a), SqlValue::Integer(b)) => a.cmp(b),
            (SqlValue::Bool(a), SqlValue::Bool(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// One table row as ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: Vec<(&'static str, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter; replaces an existing value for the same column.
    pub fn with(mut self, column: &'static str, value: SqlValue) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &'static str, value: SqlValue) {
        match self.values.iter_mut().find(|(c, _)| *c == column) {
            Some((_, v)) => *v = value,
            None => self.values.push((column, value)),
        }
    }

    /// Money is split over `<column>` (amount) and `<currency_column>`.
    pub fn with_money(
        self,
        column: &'static str,
        currency_column: &'static str,
        value: Option<&CurrencyValue>,
    ) -> Self {
        match value {
            Some(v) => self
                .with(column, SqlValue::decimal(v.amount()))
                .with(currency_column, SqlValue::text(v.currency().code())),
            None => self
                .with(column, SqlValue::Null)
                .with(currency_column, SqlValue::Null),
        }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().map(|(c, _)| *c)
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> + '_ {
        self.values.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SqlValue)> + '_ {
        self.values.iter().map(|(c, v)| (*c, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Primary key; every table this crate writes uses an `id` TEXT column.
    pub fn id(&self) -> Result<&str, RepositoryError> {
        self.text("id")
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<&str>, RepositoryError> {
        match self.get(column) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Text(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(mismatch(column, "text", other)),
        }
    }

    pub fn text(&self, column: &str) -> Result<&str, RepositoryError> {
        self.opt_text(column)?.ok_or_else(|| missing(column))
    }

    pub fn opt_string(&self, column: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.opt_text(column)?.map(str::to_owned))
    }

    pub fn string(&self, column: &str) -> Result<String, RepositoryError> {
        Ok(self.text(column)?.to_owned())
    }

    pub fn bool(&self, column: &str) -> Result<bool, RepositoryError> {
        match self.get(column) {
            Some(SqlValue::Bool(b)) => Ok(*b),
            Some(SqlValue::Integer(i)) => Ok(*i != 0),
            None | Some(SqlValue::Null) => Err(missing(column)),
            Some(other) => Err(mismatch(column, "bool", other)),
        }
    }

    pub fn uuid(&self, column: &str) -> Result<Uuid, RepositoryError> {
        let raw = self.text(column)?;
        Uuid::parse_str(raw).map_err(|e| invalid(column, raw, e))
    }

    pub fn decimal(&self, column: &str) -> Result<Decimal, RepositoryError> {
        let raw = self.text(column)?;
        Decimal::from_str(raw).map_err(|e| invalid(column, raw, e))
    }

    pub fn currency(&self, column: &str) -> Result<Currency, RepositoryError> {
        let raw = self.text(column)?;
        Currency::from_str(raw).map_err(|e| invalid(column, raw, e))
    }

    pub fn money(
        &self,
        column: &str,
        currency_column: &str,
    ) -> Result<CurrencyValue, RepositoryError> {
        Ok(CurrencyValue::new(
            self.decimal(column)?,
            self.currency(currency_column)?,
        ))
    }

    pub fn opt_money(
        &self,
        column: &str,
        currency_column: &str,
    ) -> Result<Option<CurrencyValue>, RepositoryError> {
        if self.opt_text(column)?.is_none() {
            return Ok(None);
        }
        self.money(column, currency_column).map(Some)
    }

    pub fn timestamp(&self, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
        let raw = self.text(column)?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| invalid(column, raw, e))
    }

    pub fn date(&self, column: &str) -> Result<NaiveDate, RepositoryError> {
        let raw = self.text(column)?;
        NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| invalid(column, raw, e))
    }

    pub fn opt_date(&self, column: &str) -> Result<Option<NaiveDate>, RepositoryError> {
        if self.opt_text(column)?.is_none() {
            return Ok(None);
        }
        self.date(column).map(Some)
    }
}

fn missing(column: &str) -> RepositoryError {
    RepositoryError::Mapping(format!("column '{column}' is missing or NULL"))
}

fn mismatch(column: &str, expected: &str, found: &SqlValue) -> RepositoryError {
    RepositoryError::Mapping(format!(
        "column '{column}' expected {expected}, found {found:?}"
    ))
}

fn invalid(column: &str, raw: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Mapping(format!("column '{column}' has invalid value '{raw}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn money_and_dates_survive_a_row() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let row = Row::new()
            .with("id", SqlValue::text("abc"))
            .with_money("amount", "currency", Some(&CurrencyValue::new(dec!(12.50), Currency::Brl)))
            .with("at", SqlValue::timestamp(ts))
            .with("due", SqlValue::date(date))
            .with("flag", SqlValue::Integer(1));

        assert_eq!(row.id().unwrap(), "abc");
        assert_eq!(
            row.money("amount", "currency").unwrap(),
            CurrencyValue::new(dec!(12.50), Currency::Brl)
        );
        assert_eq!(row.timestamp("at").unwrap(), ts);
        assert_eq!(row.date("due").unwrap(), date);
        assert!(row.bool("flag").unwrap());
    }

    #[test]
    fn null_optional_columns_read_as_none() {
        let row = Row::new()
            .with_money("target", "target_currency", None)
            .with("deadline", SqlValue::opt_date(None));
        assert_eq!(row.opt_money("target", "target_currency").unwrap(), None);
        assert_eq!(row.opt_date("deadline").unwrap(), None);
        assert!(matches!(row.text("deadline"), Err(RepositoryError::Mapping(_))));
    }

    #[test]
    fn set_replaces_existing_column() {
        let row = Row::new()
            .with("name", SqlValue::text("a"))
            .with("name", SqlValue::text("b"));
        assert_eq!(row.len(), 1);
        assert_eq!(row.text("name").unwrap(), "b");
    }

    #[test]
    fn invalid_values_are_mapping_errors() {
        let row = Row::new()
            .with("amount", SqlValue::text("twelve"))
            .with("currency", SqlValue::text("XXX"));
        assert!(matches!(row.decimal("amount"), Err(RepositoryError::Mapping(_))));
        assert!(matches!(row.currency("currency"), Err(RepositoryError::Mapping(_))));
    }

    #[test]
    fn timestamps_sort_lexically_in_time_order() {
        let a = format_timestamp(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let b = format_timestamp(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::nanoseconds(5));
        assert!(a < b);
        assert!(SqlValue::Null < SqlValue::text(""));
    }
}
