//! Factory module: builds tree nodes from validated records.
//!
//! The factory is the only place nodes are created. It also wires the polygon store handle
//! into polygon filters.

use crate::component::{Filter, FilterGroup, FilterPayload, PolygonPayload};
use crate::polygon::{PolygonHandle, PolygonLookup};
use crate::record::{
    DiscreteSettings, Domain, FilterGroupRecord, FilterRecord, IntervalSettings, PolygonSettings,
};
use crate::types::{Column, FilterType, IntervalOption, LogicalOperator};
use crate::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NAME_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Placeholder names of the form `"{base} {n}"` with a process-wide counter.
pub struct NameGenerator;

impl NameGenerator {
    pub fn next_name(base: &str) -> String {
        let n = NAME_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{base} {n}")
    }
}

#[derive(Debug, Clone)]
pub struct FilterFactory {
    polygons: PolygonHandle,
}

impl FilterFactory {
    pub fn new(polygons: &Arc<dyn PolygonLookup>) -> Self {
        Self { polygons: PolygonHandle::new(polygons) }
    }

    /// Builds a filter of `record.filter_type` with a fresh id and the record's content.
    pub fn create_filter(&self, record: &FilterRecord) -> Result<Filter> {
        let mut filter = Filter::new(String::new(), self.default_payload(record.filter_type));
        filter.change(record)?;
        Ok(filter)
    }

    pub fn create_group(&self, record: &FilterGroupRecord) -> FilterGroup {
        let mut group = FilterGroup::new(record.name.clone(), record.operator);
        group.change(record);
        group
    }

    /// Filter with a generated name and default content, used to seed creation dialogs.
    pub fn create_standard_filter(&self, filter_type: FilterType) -> Filter {
        let base = match filter_type {
            FilterType::Interval => "Interval Filter",
            FilterType::Discrete => "Discrete Filter",
            FilterType::Polygon => "Polygon Filter",
        };
        Filter::new(NameGenerator::next_name(base), self.default_payload(filter_type))
    }

    pub fn create_standard_group(&self) -> FilterGroup {
        FilterGroup::new(NameGenerator::next_name("Filter Group"), LogicalOperator::And)
    }

    pub(crate) fn create_root_group(&self, domain: Domain) -> FilterGroup {
        let name = match domain {
            Domain::Point => "Point Filters",
            Domain::Trajectory => "Trajectory Filters",
        };
        FilterGroup::new(name, LogicalOperator::And)
    }

    fn default_payload(&self, filter_type: FilterType) -> FilterPayload {
        match filter_type {
            FilterType::Interval => FilterPayload::Interval(IntervalSettings::new(
                Column::Speed,
                IntervalOption::Integer(0),
                IntervalOption::Integer(0),
            )),
            FilterType::Discrete => {
                FilterPayload::Discrete(DiscreteSettings::new(Column::RoadType, Vec::new()))
            }
            FilterType::Polygon => FilterPayload::Polygon(PolygonPayload::new(
                PolygonSettings::new(self.polygons.get_all_polygon_ids()),
                self.polygons.clone(),
            )),
        }
    }
}
