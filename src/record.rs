//! Record module: the wire form of filters and filter groups.
//!
//! Dialogs and controllers never touch tree nodes. They read and write these immutable records,
//! which the factory and the nodes' `change` methods validate.

use crate::types::{Column, ColumnKind, FilterType, IntervalOption, LogicalOperator, ScalarValue};
use crate::{FilterError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One of the two independent filter forests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Point,
    Trajectory,
}

impl Domain {
    pub fn name(&self) -> &'static str {
        match self {
            Domain::Point => "point",
            Domain::Trajectory => "trajectory",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Domain {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" => Ok(Domain::Point),
            "trajectory" => Ok(Domain::Trajectory),
            _ => Err(FilterError::UnknownDomain(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalSettings {
    pub column: Column,
    pub start: IntervalOption,
    pub end: IntervalOption,
}

impl IntervalSettings {
    pub fn new(column: Column, start: IntervalOption, end: IntervalOption) -> Self {
        Self { column, start, end }
    }

    pub fn validate(&self) -> Result<()> {
        let kind = self.column.kind();
        if kind == ColumnKind::Text {
            return Err(FilterError::InvalidPayload(format!(
                "column {} has no ordering for an interval",
                self.column
            )));
        }
        if self.start.kind() != kind || self.end.kind() != kind {
            return Err(FilterError::InvalidPayload(format!(
                "interval bounds do not match column {}",
                self.column
            )));
        }
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(FilterError::InvalidPayload(format!(
                "interval bounds on {} must be finite numbers",
                self.column
            )));
        }
        match self.start.partial_cmp_bound(&self.end) {
            Some(Ordering::Less | Ordering::Equal) => Ok(()),
            _ => Err(FilterError::InvalidPayload(format!(
                "interval start {} lies after end {}",
                self.start.to_sql_literal(),
                self.end.to_sql_literal()
            ))),
        }
    }

    /// `(column between start and end)`
    pub fn to_sql(&self) -> String {
        format!(
            "({} between {} and {})",
            self.column,
            self.start.to_sql_literal(),
            self.end.to_sql_literal()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteSettings {
    pub column: Column,
    pub values: Vec<ScalarValue>,
}

impl DiscreteSettings {
    pub fn new(column: Column, values: Vec<ScalarValue>) -> Self {
        Self { column, values }
    }

    /// Validates and returns the settings with duplicate values dropped, first occurrence kept.
    pub fn normalized(&self) -> Result<DiscreteSettings> {
        if self.values.is_empty() {
            return Err(FilterError::InvalidPayload(format!(
                "discrete filter on {} needs at least one value",
                self.column
            )));
        }
        let mut values: Vec<ScalarValue> = Vec::with_capacity(self.values.len());
        for value in &self.values {
            if !values.contains(value) {
                values.push(value.clone());
            }
        }
        Ok(DiscreteSettings { column: self.column, values })
    }

    /// `(column in ('v1', 'v2', ...))`
    pub fn to_sql(&self) -> String {
        let values = self
            .values
            .iter()
            .map(ScalarValue::to_sql_literal)
            .collect::<Vec<_>>()
            .join(", ");
        format!("({} in ({}))", self.column, values)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolygonSettings {
    pub polygon_ids: Vec<Uuid>,
}

impl PolygonSettings {
    pub fn new(polygon_ids: Vec<Uuid>) -> Self {
        Self { polygon_ids }
    }
}

/// Wire form of a leaf filter. Exactly one of the settings matches `filter_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRecord {
    pub name: String,
    pub domain: String,
    pub enabled: bool,
    pub negated: bool,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<IntervalSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discrete: Option<DiscreteSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<PolygonSettings>,
}

impl FilterRecord {
    fn with_type(name: impl Into<String>, domain: Domain, filter_type: FilterType) -> Self {
        Self {
            name: name.into(),
            domain: domain.name().to_string(),
            enabled: true,
            negated: false,
            filter_type,
            interval: None,
            discrete: None,
            polygon: None,
        }
    }

    pub fn interval(name: impl Into<String>, domain: Domain, settings: IntervalSettings) -> Self {
        Self {
            interval: Some(settings),
            ..Self::with_type(name, domain, FilterType::Interval)
        }
    }

    pub fn discrete(name: impl Into<String>, domain: Domain, settings: DiscreteSettings) -> Self {
        Self {
            discrete: Some(settings),
            ..Self::with_type(name, domain, FilterType::Discrete)
        }
    }

    pub fn polygon(name: impl Into<String>, domain: Domain, settings: PolygonSettings) -> Self {
        Self {
            polygon: Some(settings),
            ..Self::with_type(name, domain, FilterType::Polygon)
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    pub fn domain(&self) -> Result<Domain> {
        self.domain.parse()
    }
}

/// Wire form of a filter group. `child_ids` is filled on read-back only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGroupRecord {
    pub name: String,
    pub domain: String,
    pub enabled: bool,
    pub negated: bool,
    pub operator: LogicalOperator,
    #[serde(default)]
    pub child_ids: Vec<Uuid>,
}

impl FilterGroupRecord {
    pub fn new(name: impl Into<String>, domain: Domain, operator: LogicalOperator) -> Self {
        Self {
            name: name.into(),
            domain: domain.name().to_string(),
            enabled: true,
            negated: false,
            operator,
            child_ids: Vec::new(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    pub fn domain(&self) -> Result<Domain> {
        self.domain.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json;

    #[test]
    fn test_domain_parsing() {
        assert_eq!("point".parse::<Domain>().unwrap(), Domain::Point);
        assert_eq!(" Trajectory ".parse::<Domain>().unwrap(), Domain::Trajectory);
        assert_eq!(
            "lines".parse::<Domain>(),
            Err(FilterError::UnknownDomain("lines".to_string()))
        );
    }

    #[test]
    fn test_interval_validation() {
        let ok = IntervalSettings::new(
            Column::Speed,
            IntervalOption::Integer(10),
            IntervalOption::Float(50.5),
        );
        assert!(ok.validate().is_ok());
        let reversed = IntervalSettings::new(
            Column::Speed,
            IntervalOption::Integer(50),
            IntervalOption::Integer(10),
        );
        assert!(matches!(reversed.validate(), Err(FilterError::InvalidPayload(_))));
        let text = IntervalSettings::new(
            Column::RoadType,
            IntervalOption::Integer(1),
            IntervalOption::Integer(2),
        );
        assert!(text.validate().is_err());
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mixed = IntervalSettings::new(
            Column::Date,
            IntervalOption::Date(date),
            IntervalOption::Integer(2),
        );
        assert!(mixed.validate().is_err());
        let dates = IntervalSettings::new(
            Column::Date,
            IntervalOption::Date(date),
            IntervalOption::Date(date),
        );
        assert!(dates.validate().is_ok());
    }

    #[test]
    fn test_interval_rejects_non_finite_bounds() {
        let unbounded = IntervalSettings::new(
            Column::Speed,
            IntervalOption::Float(f64::INFINITY),
            IntervalOption::Float(f64::INFINITY),
        );
        assert!(matches!(unbounded.validate(), Err(FilterError::InvalidPayload(_))));
        let nan = IntervalSettings::new(
            Column::Altitude,
            IntervalOption::Integer(0),
            IntervalOption::Float(f64::NAN),
        );
        assert!(matches!(nan.validate(), Err(FilterError::InvalidPayload(_))));
        let below = IntervalSettings::new(
            Column::Heading,
            IntervalOption::Float(f64::NEG_INFINITY),
            IntervalOption::Integer(90),
        );
        assert!(below.validate().is_err());
    }

    #[test]
    fn test_interval_sql() {
        let settings = IntervalSettings::new(
            Column::Speed,
            IntervalOption::Integer(10),
            IntervalOption::Integer(50),
        );
        assert_eq!(settings.to_sql(), "(speed between 10 and 50)");
    }

    #[test]
    fn test_discrete_normalization() {
        let settings = DiscreteSettings::new(
            Column::RoadType,
            vec!["highway".into(), "residential".into(), "highway".into()],
        );
        let normalized = settings.normalized().unwrap();
        let expected = vec![ScalarValue::from("highway"), ScalarValue::from("residential")];
        assert_eq!(normalized.values, expected);
        assert!(DiscreteSettings::new(Column::RoadType, vec![]).normalized().is_err());
    }

    #[test]
    fn test_discrete_sql() {
        let values = vec!["highway".into(), "primary".into()];
        let settings = DiscreteSettings::new(Column::RoadType, values);
        assert_eq!(settings.to_sql(), "(road_type in ('highway', 'primary'))");
        let columns = DiscreteSettings::new(Column::VehicleType, vec!["road_type".into()]);
        assert_eq!(columns.to_sql(), "(vehicle_type in (road_type))");
    }

    #[test]
    fn test_filter_record_wire_format() {
        let json = r#"{
            "name": "fast",
            "domain": "point",
            "enabled": true,
            "negated": false,
            "type": "interval",
            "interval": {
                "column": "speed",
                "start": {"kind": "integer", "value": 10},
                "end": {"kind": "integer", "value": 50}
            }
        }"#;
        let record: FilterRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.filter_type, FilterType::Interval);
        assert_eq!(record.domain().unwrap(), Domain::Point);
        assert!(record.discrete.is_none() && record.polygon.is_none());
        let back = serde_json::to_value(&record).unwrap();
        assert!(back.get("discrete").is_none());
        assert_eq!(back["type"], "interval");
    }

    #[test]
    fn test_group_record_wire_format() {
        let json = r#"{"name":"g","domain":"trajectory","enabled":true,"negated":true,"operator":"OR"}"#;
        let record: FilterGroupRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.operator, LogicalOperator::Or);
        assert!(record.negated);
        assert!(record.child_ids.is_empty());
        assert_eq!(record.domain().unwrap(), Domain::Trajectory);
    }
}
