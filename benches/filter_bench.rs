use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use trajfilter::*;

fn build_structure(store: &Arc<PolygonStore>) -> FilterStructure {
    let lookup: Arc<dyn PolygonLookup> = store.clone();
    let mut structure = FilterStructure::new(SqlSchema::new("points"), &lookup);
    let zone = store.insert(Polygon::new(
        "zone",
        vec![Coordinate::new(1.0, 2.0), Coordinate::new(3.0, 4.0), Coordinate::new(5.0, 6.0)],
    ));
    for domain in [Domain::Point, Domain::Trajectory] {
        let mut parent = structure.root_id(domain);
        for depth in 0..8i64 {
            let operator = if depth % 2 == 0 { LogicalOperator::Or } else { LogicalOperator::And };
            let group = FilterGroupRecord::new("level", domain, operator).negated(depth % 3 == 0);
            let id = structure.add_filter_group(&parent, &group).unwrap();
            let interval = IntervalSettings::new(
                Column::Speed,
                IntervalOption::Integer(depth),
                IntervalOption::Integer(depth * 10),
            );
            structure.add_filter(&id, &FilterRecord::interval("speed", domain, interval)).unwrap();
            let values = vec!["highway".into(), "ramp".into()];
            let roads = DiscreteSettings::new(Column::RoadType, values);
            structure
                .add_filter(&id, &FilterRecord::discrete("road", domain, roads).negated(true))
                .unwrap();
            let area = FilterRecord::polygon("zone", domain, PolygonSettings::new(vec![zone]));
            structure.add_filter(&id, &area).unwrap();
            parent = id;
        }
    }
    structure
}

fn bench_sql_generation(c: &mut Criterion) {
    let store = Arc::new(PolygonStore::new());
    let structure = build_structure(&store);

    c.bench_function("point_sql_request", |b| {
        b.iter(|| black_box(structure.get_point_sql_request()))
    });
    c.bench_function("trajectory_sql_request", |b| {
        b.iter(|| black_box(structure.get_trajectory_sql_request()))
    });
    c.bench_function("build_and_render", |b| {
        b.iter(|| {
            let structure = build_structure(&store);
            black_box(structure.get_point_sql_request())
        })
    });
}

criterion_group!(benches, bench_sql_generation);
criterion_main!(benches);
