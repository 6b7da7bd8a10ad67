//! Structure module: the facade over the point and trajectory filter forests.
//!
//! This is the only entry point that mutates the forests. Besides routing each call to the
//! right [`FilterHandler`], it keeps the session's undo bookkeeping:
//!
//! | operation                 | `added`            | `deleted`        |
//! |---------------------------|--------------------|------------------|
//! | `add_filter[_group]`      | push (id, domain)  | unchanged        |
//! | `delete_filter_component` | remove (id, domain)| push (id, domain)|
//! | `undo_add`                | pop                | unchanged        |
//! | `reconstruct`             | push (id, domain)  | pop              |
//!
//! Only ids present in `added` may be deleted. The deleted nodes themselves live in the
//! handlers; the facade only remembers which domain to ask.

use crate::component::EnabledChanges;
use crate::factory::FilterFactory;
use crate::handler::FilterHandler;
use crate::point_visitor::PointFilterVisitor;
use crate::polygon::PolygonLookup;
use crate::record::{Domain, FilterGroupRecord, FilterRecord};
use crate::schema::SqlSchema;
use crate::trajectory_visitor::TrajectoryFilterVisitor;
use crate::types::FilterType;
use crate::visitor::FilterVisitor;
use crate::{FilterError, Result};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct FilterStructure {
    schema: SqlSchema,
    factory: FilterFactory,
    point: FilterHandler,
    trajectory: FilterHandler,
    added: Vec<(Uuid, Domain)>,
    deleted: Vec<(Uuid, Domain)>,
}

impl FilterStructure {
    /// Creates both domains, each with an empty root group.
    pub fn new(schema: SqlSchema, polygons: &Arc<dyn PolygonLookup>) -> Self {
        let factory = FilterFactory::new(polygons);
        let point = FilterHandler::new(Domain::Point, factory.create_root_group(Domain::Point));
        let trajectory =
            FilterHandler::new(Domain::Trajectory, factory.create_root_group(Domain::Trajectory));
        Self {
            schema,
            factory,
            point,
            trajectory,
            added: Vec::new(),
            deleted: Vec::new(),
        }
    }

    pub fn schema(&self) -> &SqlSchema {
        &self.schema
    }

    pub fn handler(&self, domain: Domain) -> &FilterHandler {
        match domain {
            Domain::Point => &self.point,
            Domain::Trajectory => &self.trajectory,
        }
    }

    fn handler_mut(&mut self, domain: Domain) -> &mut FilterHandler {
        match domain {
            Domain::Point => &mut self.point,
            Domain::Trajectory => &mut self.trajectory,
        }
    }

    pub fn root_id(&self, domain: Domain) -> Uuid {
        self.handler(domain).root_id()
    }

    /// The domain whose tree currently holds `id`.
    pub fn domain_of(&self, id: &Uuid) -> Option<Domain> {
        [Domain::Point, Domain::Trajectory]
            .into_iter()
            .find(|domain| self.handler(*domain).contains(id))
    }

    fn resolve(&self, id: &Uuid) -> Result<Domain> {
        self.domain_of(id).ok_or(FilterError::NotFound(*id))
    }

    /// Builds a filter from `record` and appends it to `parent_id` in the record's domain.
    pub fn add_filter(&mut self, parent_id: &Uuid, record: &FilterRecord) -> Result<Uuid> {
        let added = record.domain().and_then(|domain| {
            let filter = self.factory.create_filter(record)?;
            let id = filter.id();
            self.handler_mut(domain).add(filter.into(), parent_id)?;
            Ok((id, domain))
        });
        self.track_addition(added, parent_id, "add_filter")
    }

    pub fn add_filter_group(
        &mut self,
        parent_id: &Uuid,
        record: &FilterGroupRecord,
    ) -> Result<Uuid> {
        let added = record.domain().and_then(|domain| {
            let group = self.factory.create_group(record);
            let id = group.id();
            self.handler_mut(domain).add(group.into(), parent_id)?;
            Ok((id, domain))
        });
        self.track_addition(added, parent_id, "add_filter_group")
    }

    fn track_addition(
        &mut self,
        added: Result<(Uuid, Domain)>,
        parent_id: &Uuid,
        operation: &'static str,
    ) -> Result<Uuid> {
        let (id, domain) = added.map_err(|e| e.reported(operation))?;
        self.added.push((id, domain));
        debug!(operation, %id, %domain, parent = %parent_id, "component added");
        Ok(id)
    }

    /// Deletes a component added in this session, keeping it for [`FilterStructure::reconstruct`].
    ///
    /// Returns the id of the group it was removed from.
    pub fn delete_filter_component(&mut self, id: &Uuid) -> Result<Uuid> {
        let deleted = self.resolve(id).and_then(|domain| {
            let position = self
                .added
                .iter()
                .rposition(|entry| *entry == (*id, domain))
                .ok_or(FilterError::UntrackedDeletion(*id))?;
            let parent_id = self.handler_mut(domain).delete(id)?;
            self.added.remove(position);
            self.deleted.push((*id, domain));
            Ok((parent_id, domain))
        });
        let (parent_id, domain) = deleted.map_err(|e| e.reported("delete_filter_component"))?;
        debug!(%id, %domain, parent = %parent_id, "component deleted");
        Ok(parent_id)
    }

    /// Discards the most recently added component. It cannot be reconstructed.
    pub fn undo_add(&mut self) -> Result<Uuid> {
        let undone = match self.added.last().copied() {
            Some((id, domain)) => self.handler_mut(domain).undo_add(&id).map(|()| (id, domain)),
            None => Err(FilterError::EmptyHistory),
        };
        let (id, domain) = undone.map_err(|e| e.reported("undo_add"))?;
        self.added.pop();
        debug!(%id, %domain, "addition undone");
        Ok(id)
    }

    /// Restores the most recently deleted component under its former parent.
    pub fn reconstruct(&mut self) -> Result<Uuid> {
        let restored = match self.deleted.last().copied() {
            Some((_, domain)) => self.handler_mut(domain).reconstruct().map(|id| (id, domain)),
            None => Err(FilterError::EmptyHistory),
        };
        let (id, domain) = restored.map_err(|e| e.reported("reconstruct"))?;
        self.deleted.pop();
        self.added.push((id, domain));
        debug!(%id, %domain, "component reconstructed");
        Ok(id)
    }

    pub fn can_undo_add(&self) -> bool {
        !self.added.is_empty()
    }

    pub fn can_reconstruct(&self) -> bool {
        !self.deleted.is_empty()
    }

    /// Starts a new undo epoch. Nothing added or deleted so far can be undone afterwards.
    pub fn clear_history(&mut self) {
        self.added.clear();
        self.deleted.clear();
        self.point.clear_history();
        self.trajectory.clear_history();
        debug!("filter history cleared");
    }

    pub fn is_deleted_component_id(&self, id: &Uuid) -> bool {
        self.point.is_deleted_component_id(id) || self.trajectory.is_deleted_component_id(id)
    }

    /// Moves a component under `group_id` of the same domain, keeping id and content.
    pub fn move_filter_to_group(&mut self, filter_id: &Uuid, group_id: &Uuid) -> Result<()> {
        let moved = self.resolve(filter_id).and_then(|domain| {
            let target = self.domain_of(group_id).ok_or(FilterError::GroupNotFound(*group_id))?;
            if target != domain {
                return Err(FilterError::InvalidMove { id: *filter_id, target: *group_id });
            }
            self.handler_mut(domain).move_component(filter_id, group_id)?;
            Ok(domain)
        });
        let domain = moved.map_err(|e| e.reported("move_filter_to_group"))?;
        debug!(id = %filter_id, %domain, group = %group_id, "component moved");
        Ok(())
    }

    fn check_domain(&self, id: &Uuid, declared: Result<Domain>) -> Result<Domain> {
        let domain = self.resolve(id)?;
        let found = declared?;
        if found != domain {
            return Err(FilterError::DomainMismatch { expected: domain, found });
        }
        Ok(domain)
    }

    pub fn change_filter(&mut self, id: &Uuid, record: &FilterRecord) -> Result<()> {
        let changed = self
            .check_domain(id, record.domain())
            .and_then(|domain| self.handler_mut(domain).change_filter(id, record));
        changed.map_err(|e| e.reported("change_filter"))?;
        debug!(%id, "filter changed");
        Ok(())
    }

    /// Applies `record` to a group. Returns every filter and group whose enabled flag flipped.
    pub fn change_filter_group(
        &mut self,
        id: &Uuid,
        record: &FilterGroupRecord,
    ) -> Result<EnabledChanges> {
        let changed = self
            .check_domain(id, record.domain())
            .and_then(|domain| self.handler_mut(domain).change_filter_group(id, record));
        let changes = changed.map_err(|e| e.reported("change_filter_group"))?;
        debug!(%id, flipped = changes.filters.len() + changes.groups.len(), "filter group changed");
        Ok(changes)
    }

    pub fn change_enabled(&mut self, id: &Uuid, enabled: bool) -> Result<EnabledChanges> {
        self.resolve(id)
            .and_then(|domain| self.handler_mut(domain).change_enabled(id, enabled))
            .map_err(|e| e.reported("change_enabled"))
    }

    pub fn get_filter(&self, id: &Uuid) -> Option<FilterRecord> {
        self.point
            .get_filter_record(id)
            .or_else(|| self.trajectory.get_filter_record(id))
    }

    pub fn get_filter_group(&self, id: &Uuid) -> Option<FilterGroupRecord> {
        self.point
            .get_filter_group_record(id)
            .or_else(|| self.trajectory.get_filter_group_record(id))
    }

    pub fn parent_id(&self, id: &Uuid) -> Option<Uuid> {
        self.point.parent_id(id).or_else(|| self.trajectory.parent_id(id))
    }

    /// Whether any filter of either domain references the polygon.
    pub fn is_polygon_in_use(&self, polygon_id: &Uuid) -> bool {
        self.point.is_polygon_in_use(polygon_id) || self.trajectory.is_polygon_in_use(polygon_id)
    }

    pub fn standard_filter_record(&self, filter_type: FilterType, domain: Domain) -> FilterRecord {
        self.factory.create_standard_filter(filter_type).to_record(domain)
    }

    pub fn standard_group_record(&self, domain: Domain) -> FilterGroupRecord {
        self.factory.create_standard_group().to_record(domain)
    }

    pub fn get_point_sql_request(&self) -> String {
        let mut visitor = PointFilterVisitor::new(&self.schema);
        self.point.accept(&mut visitor);
        visitor.get_sql_request()
    }

    pub fn get_trajectory_sql_request(&self) -> String {
        let mut visitor = TrajectoryFilterVisitor::new(&self.schema);
        self.trajectory.accept(&mut visitor);
        visitor.get_sql_request()
    }
}
