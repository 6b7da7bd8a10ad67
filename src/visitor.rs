//! Visitor module: depth-first rendering of a filter tree into SQL.
//!
//! Groups bracket their children through `start_group`/`leave_group`; leaves are handed to the
//! concrete visitor per filter type. [`SqlAccumulator`] carries the shared bracketing state.

use crate::component::{Filter, PolygonPayload};
use crate::record::{DiscreteSettings, IntervalSettings};
use crate::types::LogicalOperator;

pub trait FilterVisitor {
    fn start_group(&mut self, operator: LogicalOperator, negated: bool);
    fn leave_group(&mut self);
    fn visit_interval_filter(&mut self, filter: &Filter, settings: &IntervalSettings);
    fn visit_discrete_filter(&mut self, filter: &Filter, settings: &DiscreteSettings);
    fn visit_polygon_filter(&mut self, filter: &Filter, polygons: &PolygonPayload);
    fn get_sql_request(&self) -> String;
}

/// Stack of open groups and the predicates collected for each of them.
#[derive(Debug, Default)]
pub struct SqlAccumulator {
    groups: Vec<(LogicalOperator, bool)>,
    parents: Vec<Vec<String>>,
    current: Vec<String>,
}

impl SqlAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_group(&mut self, operator: LogicalOperator, negated: bool) {
        self.parents.push(std::mem::take(&mut self.current));
        self.groups.push((operator, negated));
    }

    /// Closes the innermost group and hands its text to the enclosing one.
    ///
    /// A group without any predicate vanishes. The outermost group is the whole predicate and
    /// gets no brackets of its own unless it is negated.
    pub fn leave_group(&mut self) {
        let Some((operator, negated)) = self.groups.pop() else {
            tracing::warn!("leave_group without matching start_group");
            return;
        };
        let finished = std::mem::replace(&mut self.current, self.parents.pop().unwrap_or_default());
        if finished.is_empty() {
            return;
        }
        let joined = finished.join(operator.sql_infix());
        let text = if negated {
            format!("NOT ({joined})")
        } else if self.groups.is_empty() {
            joined
        } else {
            format!("({joined})")
        };
        self.current.push(text);
    }

    pub fn push(&mut self, predicate: String) {
        self.current.push(predicate);
    }

    pub fn depth(&self) -> usize {
        self.groups.len()
    }

    pub fn sql_request(&self) -> String {
        self.current.first().cloned().unwrap_or_default()
    }
}

/// Wraps a leaf predicate as `(NOT (P))` when the leaf is negated.
pub fn negate_predicate(predicate: String, negated: bool) -> String {
    if negated {
        format!("(NOT ({predicate}))")
    } else {
        predicate
    }
}
