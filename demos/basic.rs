use std::sync::Arc;
use trajfilter::*;

fn main() -> std::result::Result<(), FilterError> {
    // 1. Polygon store and table layout
    let store = Arc::new(PolygonStore::new());
    let lookup: Arc<dyn PolygonLookup> = store.clone();
    let schema = SqlSchemaBuilder::new("points").trajectory_id_column("trajectory_id").build();
    let mut structure = FilterStructure::new(schema, &lookup);

    // 2. Point filters: fast vehicles off the highway
    let root = structure.root_id(Domain::Point);
    let fast = FilterGroupRecord::new("fast", Domain::Point, LogicalOperator::And);
    let group = structure.add_filter_group(&root, &fast)?;
    let (start, end) = (IntervalOption::Integer(10), IntervalOption::Integer(50));
    let speed = IntervalSettings::new(Column::Speed, start, end);
    structure.add_filter(&group, &FilterRecord::interval("speed", Domain::Point, speed))?;
    let road = DiscreteSettings::new(Column::RoadType, vec!["highway".into()]);
    let off_highway = FilterRecord::discrete("road", Domain::Point, road).negated(true);
    let road_id = structure.add_filter(&group, &off_highway)?;
    println!("point:      {}", structure.get_point_sql_request());

    // 3. Trajectory filters: touched the city center at least once
    let center = store.insert(Polygon::new(
        "center",
        vec![Coordinate::new(48.1, 11.5), Coordinate::new(48.2, 11.5), Coordinate::new(48.2, 11.6)],
    ));
    let trajectory_root = structure.root_id(Domain::Trajectory);
    let settings = PolygonSettings::new(vec![center]);
    let area = FilterRecord::polygon("center", Domain::Trajectory, settings);
    structure.add_filter(&trajectory_root, &area)?;
    println!("trajectory: {}", structure.get_trajectory_sql_request());

    // 4. Delete and reconstruct
    structure.delete_filter_component(&road_id)?;
    println!("deleted:    {}", structure.get_point_sql_request());
    structure.reconstruct()?;
    println!("restored:   {}", structure.get_point_sql_request());

    // 5. Polygons referenced by a filter stay in the store
    match store.remove_if_unused(&center, |id| structure.is_polygon_in_use(id)) {
        Ok(_) => println!("polygon removed"),
        Err(e) => println!("polygon kept: {}", e),
    }
    Ok(())
}
