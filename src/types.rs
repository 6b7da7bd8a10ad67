//! Types module: defines columns, literal values and tags for the filter tree.
//!
//! This module provides the Column catalog, IntervalOption and ScalarValue literals, and the
//! small tag enums (FilterType, LogicalOperator) shared by records, nodes and visitors.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Value category of a point-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Date,
    Time,
    Text,
}

/// Columns of the point table that filters may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Column {
    TrajectoryId,
    Date,
    Time,
    Latitude,
    Longitude,
    Altitude,
    Speed,
    Acceleration,
    Heading,
    RoadType,
    VehicleType,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::TrajectoryId,
        Column::Date,
        Column::Time,
        Column::Latitude,
        Column::Longitude,
        Column::Altitude,
        Column::Speed,
        Column::Acceleration,
        Column::Heading,
        Column::RoadType,
        Column::VehicleType,
    ];

    /// Name of the column in the database catalog.
    pub fn catalog_name(&self) -> &'static str {
        match self {
            Column::TrajectoryId => "trajectory_id",
            Column::Date => "date",
            Column::Time => "time",
            Column::Latitude => "latitude",
            Column::Longitude => "longitude",
            Column::Altitude => "altitude",
            Column::Speed => "speed",
            Column::Acceleration => "acceleration",
            Column::Heading => "heading",
            Column::RoadType => "road_type",
            Column::VehicleType => "vehicle_type",
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Date => ColumnKind::Date,
            Column::Time => ColumnKind::Time,
            Column::TrajectoryId | Column::RoadType | Column::VehicleType => ColumnKind::Text,
            Column::Latitude
            | Column::Longitude
            | Column::Altitude
            | Column::Speed
            | Column::Acceleration
            | Column::Heading => ColumnKind::Numeric,
        }
    }

    /// Resolves a catalog name token back to its column, if it is one.
    pub fn from_catalog_name(name: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.catalog_name() == name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.catalog_name())
    }
}

/// Bound of an interval filter. Knows how to format itself as a SQL literal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IntervalOption {
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl IntervalOption {
    pub fn kind(&self) -> ColumnKind {
        match self {
            IntervalOption::Integer(_) | IntervalOption::Float(_) => ColumnKind::Numeric,
            IntervalOption::Date(_) => ColumnKind::Date,
            IntervalOption::Time(_) => ColumnKind::Time,
        }
    }

    pub fn to_sql_literal(&self) -> String {
        match self {
            IntervalOption::Integer(i) => i.to_string(),
            IntervalOption::Float(v) => v.to_string(),
            IntervalOption::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            IntervalOption::Time(t) => format!("'{}'", t.format("%H:%M:%S")),
        }
    }

    /// False for NaN and infinite floats, which have no SQL literal.
    pub fn is_finite(&self) -> bool {
        match self {
            IntervalOption::Float(v) => v.is_finite(),
            _ => true,
        }
    }

    /// Orders two bounds of the same kind. Integers and floats compare numerically.
    pub fn partial_cmp_bound(&self, other: &IntervalOption) -> Option<Ordering> {
        match (self, other) {
            (IntervalOption::Date(a), IntervalOption::Date(b)) => Some(a.cmp(b)),
            (IntervalOption::Time(a), IntervalOption::Time(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            IntervalOption::Integer(i) => Some(*i as f64),
            IntervalOption::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// A single value of a discrete filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// SQL text for an `in (...)` list. Column-name tokens stay bare, everything else is quoted.
    pub fn to_sql_literal(&self) -> String {
        let text = self.to_string();
        if Column::from_catalog_name(&text).is_some() {
            text
        } else {
            format!("'{}'", text.replace('\'', "''"))
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Boolean(b) => write!(f, "{b}"),
            ScalarValue::Integer(i) => write!(f, "{i}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
            ScalarValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Integer(value)
    }
}

/// Concrete leaf shape. Fixed for the lifetime of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Interval,
    Discrete,
    Polygon,
}

impl FilterType {
    pub fn name(&self) -> &'static str {
        match self {
            FilterType::Interval => "interval",
            FilterType::Discrete => "discrete",
            FilterType::Polygon => "polygon",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    /// Infix text placed between sibling predicates.
    pub fn sql_infix(&self) -> &'static str {
        match self {
            LogicalOperator::And => " and ",
            LogicalOperator::Or => " or ",
        }
    }
}
