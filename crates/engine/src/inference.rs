use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// How many non-missing values the date check looks at, from the top of the column.
pub const DATE_SAMPLE_SIZE: usize = 50;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InferredType {
    Integer,
    Float,
    Boolean,
    Date,
    Text,
}

impl InferredType {
    /// DuckDB column type used in generated DDL.
    pub fn sql_type(self) -> &'static str {
        match self {
            InferredType::Integer => "BIGINT",
            InferredType::Float => "DOUBLE",
            InferredType::Boolean => "BOOLEAN",
            InferredType::Date => "DATE",
            InferredType::Text => "TEXT",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InferredType::Integer => "INTEGER",
            InferredType::Float => "FLOAT",
            InferredType::Boolean => "BOOLEAN",
            InferredType::Date => "DATE",
            InferredType::Text => "TEXT",
        };
        f.write_str(name)
    }
}

/// Picks the narrowest type every present value fits, in the order
/// integer, float, boolean, date, text.
///
/// The date rule is looser than the others: one parseable value among the
/// first [`DATE_SAMPLE_SIZE`] present values is enough. A column with no
/// present values is text.
pub fn infer_type(cells: &[Option<String>]) -> InferredType {
    let present: Vec<&str> = cells
        .iter()
        .flatten()
        .map(|cell| cell.trim())
        .filter(|value| !value.is_empty())
        .collect();
    if present.is_empty() {
        return InferredType::Text;
    }

    if present.iter().all(|value| parse_integer(value).is_some()) {
        return InferredType::Integer;
    }
    if present.iter().all(|value| parse_float(value).is_some()) {
        return InferredType::Float;
    }
    if present.iter().all(|value| parse_boolean(value).is_some()) {
        return InferredType::Boolean;
    }
    if present
        .iter()
        .take(DATE_SAMPLE_SIZE)
        .any(|value| parse_date(value).is_some())
    {
        return InferredType::Date;
    }
    InferredType::Text
}

pub fn parse_integer(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

/// Finite values only; `NaN` and `inf` spellings stay text.
pub fn parse_float(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

pub fn parse_boolean(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parses the date part of a date or date-time string.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// A column whose cells have been converted to its inferred type.
/// `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Date(Vec<Option<NaiveDate>>),
    Text(Vec<Option<String>>),
}

impl Column {
    /// Converts raw cells into `kind`. Cells that do not convert become
    /// missing; the second value is how many that happened to.
    pub fn coerce(kind: InferredType, cells: Vec<Option<String>>) -> (Self, usize) {
        let mut coerced = 0usize;
        let column = match kind {
            InferredType::Integer => {
                Column::Integer(convert_cells(cells, parse_integer, &mut coerced))
            }
            InferredType::Float => Column::Float(convert_cells(cells, parse_float, &mut coerced)),
            InferredType::Boolean => {
                Column::Boolean(convert_cells(cells, parse_boolean, &mut coerced))
            }
            InferredType::Date => Column::Date(convert_cells(cells, parse_date, &mut coerced)),
            InferredType::Text => Column::Text(cells),
        };
        (column, coerced)
    }

    /// Text form of one cell for the bulk-copy stream; `None` when missing.
    pub fn render(&self, row: usize) -> Option<String> {
        match self {
            Column::Integer(values) => values.get(row).copied().flatten().map(|v| v.to_string()),
            Column::Float(values) => values.get(row).copied().flatten().map(|v| v.to_string()),
            Column::Boolean(values) => values.get(row).copied().flatten().map(|v| v.to_string()),
            Column::Date(values) => values
                .get(row)
                .copied()
                .flatten()
                .map(|v| v.format("%Y-%m-%d").to_string()),
            Column::Text(values) => values.get(row).cloned().flatten(),
        }
    }
}

fn convert_cells<T>(
    cells: Vec<Option<String>>,
    parse: impl Fn(&str) -> Option<T>,
    coerced: &mut usize,
) -> Vec<Option<T>> {
    cells
        .into_iter()
        .map(|cell| {
            let parsed = parse(cell.as_deref()?);
            if parsed.is_none() {
                *coerced += 1;
            }
            parsed
        })
        .collect()
}
