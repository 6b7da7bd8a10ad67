//! Component module: the filter tree.
//!
//! A tree is made of [`FilterGroup`]s (AND/OR composites owning their children) and leaf
//! [`Filter`]s. Children are owned by value, so moving a node out of one group and into another
//! is a plain move and a node can never sit in two groups at once.

use crate::polygon::{Polygon, PolygonHandle};
use crate::record::{
    DiscreteSettings, Domain, FilterGroupRecord, FilterRecord, IntervalSettings, PolygonSettings,
};
use crate::types::{FilterType, LogicalOperator};
use crate::visitor::FilterVisitor;
use crate::{FilterError, Result};
use uuid::Uuid;

/// Ids whose enabled flag flipped during a cascading enable/disable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnabledChanges {
    pub filters: Vec<Uuid>,
    pub groups: Vec<Uuid>,
}

impl EnabledChanges {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.groups.is_empty()
    }
}

/// Polygon filter payload: polygon ids plus the read-only store handle.
#[derive(Debug, Clone)]
pub struct PolygonPayload {
    pub settings: PolygonSettings,
    handle: PolygonHandle,
}

impl PolygonPayload {
    pub fn new(settings: PolygonSettings, handle: PolygonHandle) -> Self {
        Self { settings, handle }
    }

    pub fn polygon_ids(&self) -> &[Uuid] {
        &self.settings.polygon_ids
    }

    /// Polygons that still resolve in the store, in filter order.
    pub fn polygons(&self) -> Vec<Polygon> {
        self.settings
            .polygon_ids
            .iter()
            .filter_map(|id| {
                let polygon = self.handle.get_polygon(id);
                if polygon.is_none() {
                    tracing::warn!(polygon = %id, "polygon no longer resolves, skipping");
                }
                polygon
            })
            .collect()
    }

    pub fn handle(&self) -> &PolygonHandle {
        &self.handle
    }
}

/// Type-specific content of a leaf. The variant is the filter's fixed type.
#[derive(Debug, Clone)]
pub enum FilterPayload {
    Interval(IntervalSettings),
    Discrete(DiscreteSettings),
    Polygon(PolygonPayload),
}

impl FilterPayload {
    pub fn filter_type(&self) -> FilterType {
        match self {
            FilterPayload::Interval(_) => FilterType::Interval,
            FilterPayload::Discrete(_) => FilterType::Discrete,
            FilterPayload::Polygon(_) => FilterType::Polygon,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Filter {
    id: Uuid,
    name: String,
    enabled: bool,
    negated: bool,
    payload: FilterPayload,
}

impl Filter {
    pub(crate) fn new(name: impl Into<String>, payload: FilterPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            enabled: true,
            negated: false,
            payload,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
    pub fn is_negated(&self) -> bool {
        self.negated
    }
    pub fn filter_type(&self) -> FilterType {
        self.payload.filter_type()
    }
    pub fn payload(&self) -> &FilterPayload {
        &self.payload
    }

    /// Replaces name, flags and payload from `record`.
    ///
    /// The record must carry this filter's type and only the matching settings. Nothing is
    /// modified unless the whole record is valid.
    pub fn change(&mut self, record: &FilterRecord) -> Result<()> {
        let expected = self.filter_type();
        if record.filter_type != expected {
            return Err(FilterError::TypeMismatch { expected, found: record.filter_type });
        }
        let payload = match &self.payload {
            FilterPayload::Interval(_) => {
                let settings = only_settings(record.interval.as_ref(), record, expected)?;
                settings.validate()?;
                FilterPayload::Interval(settings.clone())
            }
            FilterPayload::Discrete(_) => {
                let settings = only_settings(record.discrete.as_ref(), record, expected)?;
                FilterPayload::Discrete(settings.normalized()?)
            }
            FilterPayload::Polygon(current) => {
                let settings = only_settings(record.polygon.as_ref(), record, expected)?;
                if settings.polygon_ids.is_empty() {
                    return Err(FilterError::InvalidPayload(
                        "polygon filter needs at least one polygon".to_string(),
                    ));
                }
                let handle = current.handle.clone();
                FilterPayload::Polygon(PolygonPayload::new(settings.clone(), handle))
            }
        };
        self.name = record.name.clone();
        self.enabled = record.enabled;
        self.negated = record.negated;
        self.payload = payload;
        Ok(())
    }

    pub fn change_enabled(&mut self, enabled: bool, changes: &mut EnabledChanges) {
        if self.enabled != enabled {
            self.enabled = enabled;
            changes.filters.push(self.id);
        }
    }

    pub fn is_polygon_in_use(&self, polygon_id: &Uuid) -> bool {
        match &self.payload {
            FilterPayload::Polygon(payload) => payload.polygon_ids().contains(polygon_id),
            _ => false,
        }
    }

    pub fn accept<V: FilterVisitor + ?Sized>(&self, visitor: &mut V) {
        if !self.enabled {
            return;
        }
        match &self.payload {
            FilterPayload::Interval(settings) => visitor.visit_interval_filter(self, settings),
            FilterPayload::Discrete(settings) => visitor.visit_discrete_filter(self, settings),
            FilterPayload::Polygon(payload) => visitor.visit_polygon_filter(self, payload),
        }
    }

    pub fn to_record(&self, domain: Domain) -> FilterRecord {
        let name = &self.name;
        let record = match &self.payload {
            FilterPayload::Interval(s) => FilterRecord::interval(name, domain, s.clone()),
            FilterPayload::Discrete(s) => FilterRecord::discrete(name, domain, s.clone()),
            FilterPayload::Polygon(p) => FilterRecord::polygon(name, domain, p.settings.clone()),
        };
        record.enabled(self.enabled).negated(self.negated)
    }
}

fn only_settings<'a, T>(
    settings: Option<&'a T>,
    record: &FilterRecord,
    expected: FilterType,
) -> Result<&'a T> {
    let others = [
        (FilterType::Interval, record.interval.is_some()),
        (FilterType::Discrete, record.discrete.is_some()),
        (FilterType::Polygon, record.polygon.is_some()),
    ];
    if let Some((stray, _)) = others.iter().find(|(t, present)| *t != expected && *present) {
        return Err(FilterError::InvalidPayload(format!(
            "{expected} filter record carries {stray} settings"
        )));
    }
    settings.ok_or_else(|| {
        FilterError::InvalidPayload(format!("{expected} filter record has no {expected} settings"))
    })
}

/// A node removed from its group, with where it used to sit.
#[derive(Debug)]
pub struct Detached {
    pub component: FilterComponent,
    pub parent_id: Uuid,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct FilterGroup {
    id: Uuid,
    name: String,
    enabled: bool,
    negated: bool,
    operator: LogicalOperator,
    children: Vec<FilterComponent>,
}

impl FilterGroup {
    pub(crate) fn new(name: impl Into<String>, operator: LogicalOperator) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            enabled: true,
            negated: false,
            operator,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
    pub fn is_negated(&self) -> bool {
        self.negated
    }
    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }
    pub fn children(&self) -> &[FilterComponent] {
        &self.children
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.id == *id || self.children.iter().any(|c| c.contains(id))
    }

    pub fn get(&self, id: &Uuid) -> Option<&FilterComponent> {
        self.children.iter().find_map(|c| c.get(id))
    }

    pub fn get_filter(&self, id: &Uuid) -> Option<&Filter> {
        self.children.iter().find_map(|c| c.get_filter(id))
    }

    pub fn get_filter_mut(&mut self, id: &Uuid) -> Option<&mut Filter> {
        self.children.iter_mut().find_map(|c| c.get_filter_mut(id))
    }

    /// This group or a group anywhere below it.
    pub fn get_filter_group(&self, id: &Uuid) -> Option<&FilterGroup> {
        if self.id == *id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.get_filter_group(id))
    }

    pub fn get_filter_group_mut(&mut self, id: &Uuid) -> Option<&mut FilterGroup> {
        if self.id == *id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.get_filter_group_mut(id))
    }

    /// Id of the group directly owning `id`.
    pub fn parent_id(&self, id: &Uuid) -> Option<Uuid> {
        if self.children.iter().any(|c| c.id() == *id) {
            return Some(self.id);
        }
        self.children.iter().find_map(|c| match c {
            FilterComponent::Group(group) => group.parent_id(id),
            FilterComponent::Filter(_) => None,
        })
    }

    /// Appends `component` to the group `group_id` in this subtree.
    ///
    /// Hands the component back if no such group exists.
    pub fn add(
        &mut self,
        component: FilterComponent,
        group_id: &Uuid,
    ) -> std::result::Result<(), FilterComponent> {
        self.insert(component, group_id, None)
    }

    pub(crate) fn insert(
        &mut self,
        component: FilterComponent,
        group_id: &Uuid,
        index: Option<usize>,
    ) -> std::result::Result<(), FilterComponent> {
        match self.get_filter_group_mut(group_id) {
            Some(group) => {
                let len = group.children.len();
                group.children.insert(index.unwrap_or(len).min(len), component);
                Ok(())
            }
            None => Err(component),
        }
    }

    /// Removes `id` from this subtree and returns it with its former parent's id.
    pub fn delete(&mut self, id: &Uuid) -> Option<(FilterComponent, Uuid)> {
        self.detach(id).map(|d| (d.component, d.parent_id))
    }

    pub(crate) fn detach(&mut self, id: &Uuid) -> Option<Detached> {
        if let Some(index) = self.children.iter().position(|c| c.id() == *id) {
            return Some(Detached {
                component: self.children.remove(index),
                parent_id: self.id,
                index,
            });
        }
        self.children.iter_mut().find_map(|c| match c {
            FilterComponent::Group(group) => group.detach(id),
            FilterComponent::Filter(_) => None,
        })
    }

    pub fn is_polygon_in_use(&self, polygon_id: &Uuid) -> bool {
        self.children.iter().any(|c| c.is_polygon_in_use(polygon_id))
    }

    /// Sets the flag on this group and cascades it to every descendant.
    ///
    /// Does nothing if the group already has the requested state.
    pub fn change_enabled(&mut self, enabled: bool, changes: &mut EnabledChanges) {
        if self.enabled == enabled {
            return;
        }
        changes.groups.push(self.id);
        self.enabled = enabled;
        for child in &mut self.children {
            child.change_enabled(enabled, changes);
        }
    }

    /// Applies name, flags and operator from `record`. Children are left alone.
    pub fn change(&mut self, record: &FilterGroupRecord) -> EnabledChanges {
        let mut changes = EnabledChanges::default();
        self.name = record.name.clone();
        self.negated = record.negated;
        self.operator = record.operator;
        self.change_enabled(record.enabled, &mut changes);
        changes
    }

    pub fn accept<V: FilterVisitor + ?Sized>(&self, visitor: &mut V) {
        if !self.enabled {
            return;
        }
        visitor.start_group(self.operator, self.negated);
        for child in &self.children {
            child.accept(visitor);
        }
        visitor.leave_group();
    }

    pub fn to_record(&self, domain: Domain) -> FilterGroupRecord {
        FilterGroupRecord {
            name: self.name.clone(),
            domain: domain.name().to_string(),
            enabled: self.enabled,
            negated: self.negated,
            operator: self.operator,
            child_ids: self.children.iter().map(FilterComponent::id).collect(),
        }
    }
}

/// Any node of the tree.
#[derive(Debug, Clone)]
pub enum FilterComponent {
    Filter(Filter),
    Group(FilterGroup),
}

impl FilterComponent {
    pub fn id(&self) -> Uuid {
        match self {
            FilterComponent::Filter(f) => f.id,
            FilterComponent::Group(g) => g.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FilterComponent::Filter(f) => &f.name,
            FilterComponent::Group(g) => &g.name,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            FilterComponent::Filter(f) => f.enabled,
            FilterComponent::Group(g) => g.enabled,
        }
    }

    pub fn is_negated(&self) -> bool {
        match self {
            FilterComponent::Filter(f) => f.negated,
            FilterComponent::Group(g) => g.negated,
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        match self {
            FilterComponent::Filter(f) => f.id == *id,
            FilterComponent::Group(g) => g.contains(id),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&FilterComponent> {
        if self.id() == *id {
            return Some(self);
        }
        match self {
            FilterComponent::Filter(_) => None,
            FilterComponent::Group(g) => g.get(id),
        }
    }

    pub fn get_filter(&self, id: &Uuid) -> Option<&Filter> {
        match self {
            FilterComponent::Filter(f) if f.id == *id => Some(f),
            FilterComponent::Filter(_) => None,
            FilterComponent::Group(g) => g.get_filter(id),
        }
    }

    pub fn get_filter_mut(&mut self, id: &Uuid) -> Option<&mut Filter> {
        match self {
            FilterComponent::Filter(f) if f.id == *id => Some(f),
            FilterComponent::Filter(_) => None,
            FilterComponent::Group(g) => g.get_filter_mut(id),
        }
    }

    pub fn get_filter_group(&self, id: &Uuid) -> Option<&FilterGroup> {
        match self {
            FilterComponent::Filter(_) => None,
            FilterComponent::Group(g) => g.get_filter_group(id),
        }
    }

    pub fn get_filter_group_mut(&mut self, id: &Uuid) -> Option<&mut FilterGroup> {
        match self {
            FilterComponent::Filter(_) => None,
            FilterComponent::Group(g) => g.get_filter_group_mut(id),
        }
    }

    /// Leaves own no children, so this only ever succeeds on groups.
    pub fn delete(&mut self, id: &Uuid) -> Option<(FilterComponent, Uuid)> {
        match self {
            FilterComponent::Filter(_) => None,
            FilterComponent::Group(g) => g.delete(id),
        }
    }

    pub fn add(
        &mut self,
        component: FilterComponent,
        group_id: &Uuid,
    ) -> std::result::Result<(), FilterComponent> {
        match self {
            FilterComponent::Filter(_) => Err(component),
            FilterComponent::Group(g) => g.add(component, group_id),
        }
    }

    pub fn is_polygon_in_use(&self, polygon_id: &Uuid) -> bool {
        match self {
            FilterComponent::Filter(f) => f.is_polygon_in_use(polygon_id),
            FilterComponent::Group(g) => g.is_polygon_in_use(polygon_id),
        }
    }

    pub fn change_enabled(&mut self, enabled: bool, changes: &mut EnabledChanges) {
        match self {
            FilterComponent::Filter(f) => f.change_enabled(enabled, changes),
            FilterComponent::Group(g) => g.change_enabled(enabled, changes),
        }
    }

    pub fn accept<V: FilterVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            FilterComponent::Filter(f) => f.accept(visitor),
            FilterComponent::Group(g) => g.accept(visitor),
        }
    }
}

impl From<Filter> for FilterComponent {
    fn from(filter: Filter) -> Self {
        FilterComponent::Filter(filter)
    }
}

impl From<FilterGroup> for FilterComponent {
    fn from(group: FilterGroup) -> Self {
        FilterComponent::Group(group)
    }
}
