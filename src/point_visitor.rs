//! Point visitor: renders the point-domain tree against the point table's own columns.

use crate::component::{Filter, PolygonPayload};
use crate::record::{DiscreteSettings, IntervalSettings};
use crate::schema::SqlSchema;
use crate::types::LogicalOperator;
use crate::visitor::{negate_predicate, FilterVisitor, SqlAccumulator};

pub struct PointFilterVisitor<'a> {
    schema: &'a SqlSchema,
    sql: SqlAccumulator,
}

impl<'a> PointFilterVisitor<'a> {
    pub fn new(schema: &'a SqlSchema) -> Self {
        Self { schema, sql: SqlAccumulator::new() }
    }
}

impl FilterVisitor for PointFilterVisitor<'_> {
    fn start_group(&mut self, operator: LogicalOperator, negated: bool) {
        self.sql.start_group(operator, negated);
    }

    fn leave_group(&mut self) {
        self.sql.leave_group();
    }

    fn visit_interval_filter(&mut self, filter: &Filter, settings: &IntervalSettings) {
        self.sql.push(negate_predicate(settings.to_sql(), filter.is_negated()));
    }

    fn visit_discrete_filter(&mut self, filter: &Filter, settings: &DiscreteSettings) {
        self.sql.push(negate_predicate(settings.to_sql(), filter.is_negated()));
    }

    // One ST_Contains clause per polygon, always AND-joined. The point domain ignores the
    // negation flag of polygon filters.
    fn visit_polygon_filter(&mut self, _filter: &Filter, polygons: &PolygonPayload) {
        let (lat, lon) = (self.schema.latitude_column(), self.schema.longitude_column());
        self.sql.start_group(LogicalOperator::And, false);
        for polygon in polygons.polygons() {
            if let Some(clause) = polygon.contains_point_sql(lat, lon) {
                self.sql.push(clause);
            }
        }
        self.sql.leave_group();
    }

    fn get_sql_request(&self) -> String {
        self.sql.sql_request()
    }
}
