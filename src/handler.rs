//! Handler module: one filter tree per domain plus its reconstruct history.
//!
//! The handler owns the domain's root group for its whole lifetime. Deleted nodes are kept,
//! together with their former parent, on a stack so the most recent deletion can be undone.
//!
//! | operation      | tree                  | deleted stack     |
//! |----------------|-----------------------|-------------------|
//! | `add`          | node inserted         | unchanged         |
//! | `delete`       | node removed          | push (node, parent) |
//! | `undo_add`     | node removed          | unchanged         |
//! | `reconstruct`  | node re-inserted      | pop               |

use crate::component::{Detached, EnabledChanges, FilterComponent, FilterGroup};
use crate::record::{Domain, FilterGroupRecord, FilterRecord};
use crate::visitor::FilterVisitor;
use crate::{FilterError, Result};
use uuid::Uuid;

#[derive(Debug)]
struct DeletedComponent {
    component: FilterComponent,
    parent_id: Uuid,
    index: usize,
}

#[derive(Debug)]
pub struct FilterHandler {
    domain: Domain,
    root: FilterGroup,
    deleted: Vec<DeletedComponent>,
}

impl FilterHandler {
    pub fn new(domain: Domain, root: FilterGroup) -> Self {
        Self { domain, root, deleted: Vec::new() }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn root(&self) -> &FilterGroup {
        &self.root
    }

    pub fn root_id(&self) -> Uuid {
        self.root.id()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.root.contains(id)
    }

    pub fn add(&mut self, component: FilterComponent, group_id: &Uuid) -> Result<()> {
        self.root
            .add(component, group_id)
            .map_err(|_| FilterError::GroupNotFound(*group_id))
    }

    /// Removes `id` and keeps it for [`FilterHandler::reconstruct`]. Returns the former parent.
    pub fn delete(&mut self, id: &Uuid) -> Result<Uuid> {
        if *id == self.root.id() {
            return Err(FilterError::RootRemoval(*id));
        }
        let Detached { component, parent_id, index } =
            self.root.detach(id).ok_or(FilterError::NotFound(*id))?;
        self.deleted.push(DeletedComponent { component, parent_id, index });
        Ok(parent_id)
    }

    /// Removes `id` for good. The node cannot be reconstructed afterwards.
    pub fn undo_add(&mut self, id: &Uuid) -> Result<()> {
        if *id == self.root.id() {
            return Err(FilterError::RootRemoval(*id));
        }
        self.root.delete(id).map(|_| ()).ok_or(FilterError::NotFound(*id))
    }

    /// Puts the most recently deleted node back under its former parent, at its former position.
    ///
    /// If that parent no longer exists the entry stays on the stack.
    pub fn reconstruct(&mut self) -> Result<Uuid> {
        let DeletedComponent { component, parent_id, index } =
            self.deleted.pop().ok_or(FilterError::EmptyHistory)?;
        let id = component.id();
        match self.root.insert(component, &parent_id, Some(index)) {
            Ok(()) => Ok(id),
            Err(component) => {
                self.deleted.push(DeletedComponent { component, parent_id, index });
                Err(FilterError::GroupNotFound(parent_id))
            }
        }
    }

    /// True iff `id` is the oldest entry of the deleted stack.
    pub fn is_deleted_component_id(&self, id: &Uuid) -> bool {
        self.deleted.first().is_some_and(|entry| entry.component.id() == *id)
    }

    pub fn deleted_len(&self) -> usize {
        self.deleted.len()
    }

    pub fn clear_history(&mut self) {
        self.deleted.clear();
    }

    /// Reparents `id` under `group_id` keeping identity and content. History is untouched.
    pub fn move_component(&mut self, id: &Uuid, group_id: &Uuid) -> Result<()> {
        let invalid = FilterError::InvalidMove { id: *id, target: *group_id };
        if *id == self.root.id() {
            return Err(invalid);
        }
        if self.root.get_filter_group(group_id).is_none() {
            return Err(FilterError::GroupNotFound(*group_id));
        }
        // A group cannot become its own descendant.
        if self.root.get(id).is_some_and(|c| c.contains(group_id)) {
            return Err(invalid);
        }
        let detached = self.root.detach(id).ok_or(FilterError::NotFound(*id))?;
        if let Err(component) = self.root.insert(detached.component, group_id, None) {
            let parent_id = detached.parent_id;
            if let Err(lost) = self.root.insert(component, &parent_id, Some(detached.index)) {
                tracing::error!(id = %lost.id(), parent = %parent_id, "moved component lost");
            }
            return Err(invalid);
        }
        Ok(())
    }

    pub fn change_filter(&mut self, id: &Uuid, record: &FilterRecord) -> Result<()> {
        self.root
            .get_filter_mut(id)
            .ok_or(FilterError::NotFound(*id))?
            .change(record)
    }

    pub fn change_filter_group(
        &mut self,
        id: &Uuid,
        record: &FilterGroupRecord,
    ) -> Result<EnabledChanges> {
        let group = self.root.get_filter_group_mut(id).ok_or(FilterError::NotFound(*id))?;
        Ok(group.change(record))
    }

    /// Enables or disables any node, cascading through groups.
    pub fn change_enabled(&mut self, id: &Uuid, enabled: bool) -> Result<EnabledChanges> {
        let mut changes = EnabledChanges::default();
        if let Some(group) = self.root.get_filter_group_mut(id) {
            group.change_enabled(enabled, &mut changes);
        } else if let Some(filter) = self.root.get_filter_mut(id) {
            filter.change_enabled(enabled, &mut changes);
        } else {
            return Err(FilterError::NotFound(*id));
        }
        Ok(changes)
    }

    pub fn get_filter_record(&self, id: &Uuid) -> Option<FilterRecord> {
        self.root.get_filter(id).map(|f| f.to_record(self.domain))
    }

    pub fn get_filter_group_record(&self, id: &Uuid) -> Option<FilterGroupRecord> {
        self.root.get_filter_group(id).map(|g| g.to_record(self.domain))
    }

    pub fn parent_id(&self, id: &Uuid) -> Option<Uuid> {
        self.root.parent_id(id)
    }

    pub fn is_polygon_in_use(&self, polygon_id: &Uuid) -> bool {
        self.root.is_polygon_in_use(polygon_id)
    }

    pub fn accept<V: FilterVisitor + ?Sized>(&self, visitor: &mut V) {
        self.root.accept(visitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Filter, FilterPayload};
    use crate::record::IntervalSettings;
    use crate::types::{Column, IntervalOption, LogicalOperator};

    fn handler() -> FilterHandler {
        FilterHandler::new(Domain::Point, FilterGroup::new("root", LogicalOperator::And))
    }

    fn filter() -> FilterComponent {
        let settings = IntervalSettings::new(
            Column::Speed,
            IntervalOption::Integer(1),
            IntervalOption::Integer(2),
        );
        Filter::new("f", FilterPayload::Interval(settings)).into()
    }

    fn group() -> FilterComponent {
        FilterGroup::new("g", LogicalOperator::Or).into()
    }

    #[test]
    fn test_add_requires_existing_group() {
        let mut h = handler();
        let f = filter();
        let f_id = f.id();
        let root = h.root_id();
        h.add(f, &root).unwrap();
        assert!(h.contains(&f_id));
        assert_eq!(h.add(filter(), &f_id), Err(FilterError::GroupNotFound(f_id)));
        let missing = Uuid::new_v4();
        assert_eq!(h.add(filter(), &missing), Err(FilterError::GroupNotFound(missing)));
    }

    #[test]
    fn test_delete_root_is_rejected() {
        let mut h = handler();
        let root = h.root_id();
        assert_eq!(h.delete(&root), Err(FilterError::RootRemoval(root)));
        assert_eq!(h.undo_add(&root), Err(FilterError::RootRemoval(root)));
        assert!(h.contains(&root));
    }

    #[test]
    fn test_delete_and_reconstruct_lifo() {
        let mut h = handler();
        let root = h.root_id();
        let g = group();
        let g_id = g.id();
        h.add(g, &root).unwrap();
        let (a, b) = (filter(), filter());
        let (a_id, b_id) = (a.id(), b.id());
        h.add(a, &g_id).unwrap();
        h.add(b, &root).unwrap();

        assert_eq!(h.delete(&a_id), Ok(g_id));
        assert_eq!(h.delete(&b_id), Ok(root));
        assert!(h.is_deleted_component_id(&a_id));
        assert!(!h.is_deleted_component_id(&b_id));

        assert_eq!(h.reconstruct(), Ok(b_id));
        assert_eq!(h.parent_id(&b_id), Some(root));
        assert_eq!(h.reconstruct(), Ok(a_id));
        assert_eq!(h.parent_id(&a_id), Some(g_id));
        assert_eq!(h.reconstruct(), Err(FilterError::EmptyHistory));
    }

    #[test]
    fn test_reconstruct_restores_position() {
        let mut h = handler();
        let root = h.root_id();
        let ids: Vec<Uuid> = (0..3)
            .map(|_| {
                let f = filter();
                let id = f.id();
                h.add(f, &root).unwrap();
                id
            })
            .collect();
        h.delete(&ids[1]).unwrap();
        h.reconstruct().unwrap();
        let order: Vec<Uuid> = h.root().children().iter().map(FilterComponent::id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn test_undo_add_is_not_reconstructible() {
        let mut h = handler();
        let root = h.root_id();
        let f = filter();
        let f_id = f.id();
        h.add(f, &root).unwrap();
        h.undo_add(&f_id).unwrap();
        assert!(!h.contains(&f_id));
        assert_eq!(h.reconstruct(), Err(FilterError::EmptyHistory));
        assert_eq!(h.undo_add(&f_id), Err(FilterError::NotFound(f_id)));
    }

    #[test]
    fn test_reconstruct_keeps_entry_when_parent_is_gone() {
        let mut h = handler();
        let root = h.root_id();
        let g = group();
        let g_id = g.id();
        h.add(g, &root).unwrap();
        let f = filter();
        let f_id = f.id();
        h.add(f, &g_id).unwrap();
        h.delete(&f_id).unwrap();
        h.undo_add(&g_id).unwrap();
        assert_eq!(h.reconstruct(), Err(FilterError::GroupNotFound(g_id)));
        assert_eq!(h.deleted_len(), 1);
    }

    #[test]
    fn test_move_component() {
        let mut h = handler();
        let root = h.root_id();
        let (g1, g2) = (group(), group());
        let (g1_id, g2_id) = (g1.id(), g2.id());
        h.add(g1, &root).unwrap();
        h.add(g2, &root).unwrap();
        let f = filter();
        let f_id = f.id();
        h.add(f, &g1_id).unwrap();

        h.move_component(&f_id, &g2_id).unwrap();
        assert_eq!(h.parent_id(&f_id), Some(g2_id));
        assert_eq!(h.deleted_len(), 0);

        // Into its own subtree, or moving the root.
        assert!(matches!(h.move_component(&g2_id, &g2_id), Err(FilterError::InvalidMove { .. })));
        assert!(matches!(h.move_component(&root, &g1_id), Err(FilterError::InvalidMove { .. })));
        assert_eq!(h.move_component(&f_id, &f_id), Err(FilterError::GroupNotFound(f_id)));
        assert_eq!(h.parent_id(&f_id), Some(g2_id));
    }

    #[test]
    fn test_change_enabled_on_filter_and_group() {
        let mut h = handler();
        let root = h.root_id();
        let f = filter();
        let f_id = f.id();
        h.add(f, &root).unwrap();
        let changes = h.change_enabled(&f_id, false).unwrap();
        assert_eq!(changes.filters, vec![f_id]);
        let changes = h.change_enabled(&root, false).unwrap();
        assert_eq!(changes.groups, vec![root]);
        assert!(changes.filters.is_empty());
        let missing = Uuid::new_v4();
        assert_eq!(h.change_enabled(&missing, true), Err(FilterError::NotFound(missing)));
    }
}
