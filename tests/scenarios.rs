use approx::assert_relative_eq;
use geo::{coord, polygon, MultiPolygon};
use parkaccess::{
    AccessConfig, District, Inputs, Layer, Park, Pipeline, PopulationPoint, RoadFeature, RunOutput, Stage,
};

fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)]])
}

/// Two collinear 500 m roads sharing the node at x = 500, and a 2 ha park
/// just west of x = 0 whose only nearby boundary stretch faces the road end.
fn inputs() -> Inputs {
    Inputs {
        roads: Layer::new("roads", vec![
            RoadFeature::from_line(&[(0.0, 0.0), (500.0, 0.0)]).with_class("footway"),
            RoadFeature::from_line(&[(500.0, 0.0), (1000.0, 0.0)]).with_class("residential"),
        ]),
        parks: Layer::new("parks", vec![Park::new(rectangle(-210.0, -50.0, -10.0, 50.0))]),
        population: Layer::new("population", vec![
            PopulationPoint::new(100.0, 50.0, 10.0),
            PopulationPoint::new(800.0, 0.0, 5.0),
            PopulationPoint::new(5050.0, 50.0, 3.0),
        ]),
        districts: Layer::new("districts", vec![
            District::new("near", rectangle(-300.0, -200.0, 1100.0, 200.0)),
            District::new("far", rectangle(5000.0, 0.0, 5100.0, 100.0)),
        ]),
        study_area: None,
    }
}

fn run(config: AccessConfig, inputs: &Inputs) -> RunOutput {
    Pipeline::new(config).unwrap().run(inputs).unwrap()
}

#[test]
fn entrance_at_the_outer_end_reaches_400_metres_of_the_first_edge() {
    let output = run(AccessConfig::default(), &inputs());

    let nodes = output.entrances.nodes();
    assert_eq!(nodes.len(), 1);
    assert_eq!(output.graph.node(nodes[0]), Some(coord! { x: 0.0, y: 0.0 }));

    let spans = &output.service_area.spans;
    assert_eq!(spans.len(), 1);
    let first = output.graph.edge(spans[0].edge).unwrap();
    assert_eq!(first.road, 0);
    assert_relative_eq!(spans[0].start, 0.0);
    assert_relative_eq!(spans[0].end, 400.0, epsilon = 1e-9);

    let area = &output.service_area.area;
    assert_eq!(area.distance(), 400.0);
    for x in [-90.0, 0.0, 250.0, 400.0] {
        assert!(area.covers(coord! { x: x, y: 0.0 }), "x = {x} should be covered");
    }
    // Nothing past the 400 m reach point along the road.
    for x in [410.0, 480.0, 510.0, 750.0, 1000.0] {
        assert!(!area.covers(coord! { x: x, y: 0.0 }), "x = {x} should not be covered");
    }
}

#[test]
fn district_outside_the_walkable_area_has_no_access() {
    let output = run(AccessConfig::default(), &inputs());

    let near = &output.districts.districts[0];
    assert_eq!(near.record.total_population, 15.0);
    assert_eq!(near.record.accessible_population, 10.0);
    assert!(near.has_access);

    let far = &output.districts.districts[1];
    assert_eq!(far.record.total_population, 3.0);
    assert_eq!(far.record.accessible_population, 0.0);
    assert_eq!(far.record.area_ratio, 0.0);
    assert!(!far.has_access);
    assert_eq!(output.districts.summary.units_with_access, 1);
}

#[test]
fn half_hectare_park_yields_no_entrances() {
    let mut inputs = inputs();
    inputs.parks = Layer::new("parks", vec![Park::new(rectangle(-110.0, -25.0, -10.0, 25.0))]);
    assert_relative_eq!(inputs.parks.features[0].area(), 5_000.0);

    let output = run(AccessConfig::default(), &inputs);
    assert!(output.entrances.qualifying.is_empty());
    assert!(output.entrances.is_empty());
    assert!(output.service_area.area.is_empty());
    assert_eq!(output.diagnostics.warning_count(Stage::ServiceArea), 1);
    assert_eq!(output.districts.districts[0].record.accessible_population, 0.0);
}

#[test]
fn small_parks_can_be_included() {
    let mut inputs = inputs();
    inputs.parks = Layer::new("parks", vec![Park::new(rectangle(-110.0, -30.0, -10.0, 30.0))]);
    let config = AccessConfig { include_small_parks: true, ..Default::default() };

    let output = run(config, &inputs);
    assert_eq!(output.entrances.qualifying, vec![0]);
    assert!(!output.entrances.is_empty());
}

#[test]
fn runs_are_deterministic() {
    let inputs = inputs();
    let first = run(AccessConfig::default(), &inputs);
    let second = run(AccessConfig::default(), &inputs);
    assert_eq!(first.service_area.area.polygon(), second.service_area.area.polygon());
    assert_eq!(first.service_area.spans, second.service_area.spans);
    assert_eq!(first.districts, second.districts);
    assert_eq!(first.hex_report, second.hex_report);
}

#[test]
fn coverage_grows_with_the_threshold() {
    let inputs = inputs();
    let outputs: Vec<RunOutput> = [100.0, 400.0, 700.0, 1200.0].into_iter()
        .map(|t| run(AccessConfig { walk_distance_threshold: t, ..Default::default() }, &inputs))
        .collect();

    for pair in outputs.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.service_area.area.area() <= b.service_area.area.area() + 1e-6);
        assert!(a.service_area.reachable_length() <= b.service_area.reachable_length() + 1e-9);
        let (da, db) = (&a.districts.districts[0].record, &b.districts.districts[0].record);
        assert!(da.accessible_population <= db.accessible_population);
        assert!(da.accessible_area <= db.accessible_area + 1e-6);
    }
    // Both edges are fully reachable at 1200 m.
    assert_relative_eq!(outputs[3].service_area.reachable_length(), 1000.0, epsilon = 1e-6);
}

#[test]
fn residents_past_the_reach_point_are_not_accessible() {
    let mut inputs = inputs();
    inputs.population = Layer::new("population", vec![
        PopulationPoint::new(380.0, 0.0, 1.0),
        PopulationPoint::new(480.0, 0.0, 1.0),
    ]);
    let output = run(AccessConfig::default(), &inputs);
    let near = &output.districts.districts[0].record;
    assert_eq!(near.total_population, 2.0);
    assert_eq!(near.accessible_population, 1.0);
}

#[test]
fn park_beside_a_ring_road_corner_gets_access() {
    let mut inputs = inputs();
    inputs.roads = Layer::new("roads", vec![
        RoadFeature::from_line(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0), (0.0, 0.0)]).with_class("path"),
    ]);
    inputs.parks = Layer::new("parks", vec![Park::new(rectangle(-210.0, -210.0, -10.0, -10.0))]);
    inputs.population = Layer::new("population", vec![PopulationPoint::new(50.0, 50.0, 4.0)]);

    let output = run(AccessConfig::default(), &inputs);
    assert_eq!(output.entrances.nodes().len(), 1);
    assert!(output.graph.edges().iter().all(|edge| !edge.is_loop()));
    assert_relative_eq!(output.service_area.reachable_length(), 400.0, epsilon = 1e-6);
    assert_eq!(output.districts.districts[0].record.accessible_population, 4.0);
}

#[test]
fn points_on_the_walkable_boundary_are_accessible() {
    let output = run(AccessConfig::default(), &inputs());
    let area = &output.service_area.area;
    let vertex = area.polygon().0[0].exterior().0[0];
    assert!(area.covers(vertex));
}

#[test]
fn hex_cells_cover_the_dissolved_districts() {
    let output = run(AccessConfig { hex_ratio_threshold: Some(50.0), ..Default::default() }, &inputs());
    let total: f64 = output.hexes.iter().map(|cell| cell.area()).sum();
    assert_relative_eq!(total, 1400.0 * 400.0 + 100.0 * 100.0, max_relative = 1e-6);
    assert_eq!(output.hex_report.cells.len(), output.hexes.len());
    assert_relative_eq!(output.hex_report.summary.total_population, 18.0);
    assert_relative_eq!(output.hex_report.summary.accessible_population, 10.0);
    assert!(output.hex_report.cells.iter().all(|cell| cell.above_threshold.is_some()));
    let entrances: usize = output.hex_report.cells.iter().map(|cell| cell.park_entrances).sum();
    assert!(entrances >= output.entrances.entrances.len());
}
