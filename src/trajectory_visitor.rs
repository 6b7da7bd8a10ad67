//! Trajectory visitor: renders the trajectory-domain tree.
//!
//! Every leaf predicate becomes an existence test over the points of the outer trajectory
//! `t`, so a trajectory matches when at least one of its points satisfies the predicate.

use crate::component::{Filter, PolygonPayload};
use crate::record::{DiscreteSettings, IntervalSettings};
use crate::schema::SqlSchema;
use crate::types::LogicalOperator;
use crate::visitor::{negate_predicate, FilterVisitor, SqlAccumulator};

pub struct TrajectoryFilterVisitor<'a> {
    schema: &'a SqlSchema,
    sql: SqlAccumulator,
}

impl<'a> TrajectoryFilterVisitor<'a> {
    pub fn new(schema: &'a SqlSchema) -> Self {
        Self { schema, sql: SqlAccumulator::new() }
    }

    fn exists(&self, predicate: &str) -> String {
        let id = self.schema.trajectory_id_column();
        format!(
            "EXISTS(SELECT 1 FROM \"{}\" AS p WHERE {} AND t.{} = p.{})",
            self.schema.point_table(),
            predicate,
            id,
            id
        )
    }
}

impl FilterVisitor for TrajectoryFilterVisitor<'_> {
    fn start_group(&mut self, operator: LogicalOperator, negated: bool) {
        self.sql.start_group(operator, negated);
    }

    fn leave_group(&mut self) {
        self.sql.leave_group();
    }

    fn visit_interval_filter(&mut self, filter: &Filter, settings: &IntervalSettings) {
        let predicate = negate_predicate(settings.to_sql(), filter.is_negated());
        let clause = self.exists(&predicate);
        self.sql.push(clause);
    }

    fn visit_discrete_filter(&mut self, filter: &Filter, settings: &DiscreteSettings) {
        let predicate = negate_predicate(settings.to_sql(), filter.is_negated());
        let clause = self.exists(&predicate);
        self.sql.push(clause);
    }

    // Negation is applied to each polygon clause inside its own existence test.
    fn visit_polygon_filter(&mut self, filter: &Filter, polygons: &PolygonPayload) {
        let (lat, lon) = (self.schema.latitude_column(), self.schema.longitude_column());
        self.sql.start_group(LogicalOperator::And, false);
        for polygon in polygons.polygons() {
            if let Some(clause) = polygon.contains_point_sql(lat, lon) {
                let clause = self.exists(&negate_predicate(clause, filter.is_negated()));
                self.sql.push(clause);
            }
        }
        self.sql.leave_group();
    }

    fn get_sql_request(&self) -> String {
        self.sql.sql_request()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{FilterGroup, FilterPayload};
    use crate::polygon::{Coordinate, Polygon, PolygonHandle, PolygonLookup, PolygonStore};
    use crate::record::{Domain, FilterRecord, PolygonSettings};
    use crate::schema::SqlSchemaBuilder;
    use crate::types::Column;
    use std::sync::Arc;

    #[test]
    fn test_discrete_leaf_is_wrapped_in_exists() {
        let mut root = FilterGroup::new("root", LogicalOperator::And);
        let root_id = root.id();
        let settings = DiscreteSettings::new(Column::VehicleType, vec!["bus".into()]);
        let mut filter = Filter::new("bus", FilterPayload::Discrete(settings.clone()));
        filter
            .change(&FilterRecord::discrete("bus", Domain::Trajectory, settings).negated(true))
            .unwrap();
        root.add(filter.into(), &root_id).unwrap();
        let schema = SqlSchema::new("points");
        let mut visitor = TrajectoryFilterVisitor::new(&schema);
        root.accept(&mut visitor);
        assert_eq!(
            visitor.get_sql_request(),
            "EXISTS(SELECT 1 FROM \"points\" AS p WHERE (NOT ((vehicle_type in ('bus')))) AND t.trajectory_id = p.trajectory_id)"
        );
    }

    #[test]
    fn test_polygon_clauses_negated_individually() {
        let store = Arc::new(PolygonStore::new());
        let a = store.insert(Polygon::new("a", vec![Coordinate::new(1.0, 2.0)]));
        let b = store.insert(Polygon::new("b", vec![Coordinate::new(3.0, 4.0)]));
        let lookup: Arc<dyn PolygonLookup> = store;
        let settings = PolygonSettings::new(vec![a, b]);
        let payload = PolygonPayload::new(settings.clone(), PolygonHandle::new(&lookup));
        let mut filter = Filter::new("area", FilterPayload::Polygon(payload));
        let record = FilterRecord::polygon("area", Domain::Trajectory, settings).negated(true);
        filter.change(&record).unwrap();

        let mut root = FilterGroup::new("root", LogicalOperator::Or);
        let root_id = root.id();
        root.add(filter.into(), &root_id).unwrap();
        let schema = SqlSchemaBuilder::new("gps")
            .latitude_column("lat")
            .longitude_column("lon")
            .trajectory_id_column("tid")
            .build();
        let mut visitor = TrajectoryFilterVisitor::new(&schema);
        root.accept(&mut visitor);
        assert_eq!(
            visitor.get_sql_request(),
            "(EXISTS(SELECT 1 FROM \"gps\" AS p WHERE (NOT (ST_Contains(ST_MakePolygon(ST_GeomFromText('LINESTRING(1 2, 1 2)')), ST_POINT(lat, lon)))) AND t.tid = p.tid) and \
             EXISTS(SELECT 1 FROM \"gps\" AS p WHERE (NOT (ST_Contains(ST_MakePolygon(ST_GeomFromText('LINESTRING(3 4, 3 4)')), ST_POINT(lat, lon)))) AND t.tid = p.tid))"
        );
    }
}
