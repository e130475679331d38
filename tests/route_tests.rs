//! Tests for the mutable search route and its caches.

use ils_vrp::problem::{ClientGroup, Location, Matrix, ProblemData, VehicleType};
use ils_vrp::route::SearchRoute;

/// One depot and four clients on a line, reload allowed at the depot.
fn reload_instance() -> ProblemData {
    let depot = Location::new(0, 0);
    let clients = vec![
        Location::new(10, 0).with_delivery(vec![5]),
        Location::new(20, 0).with_delivery(vec![5]),
        Location::new(30, 0).with_delivery(vec![5]),
        Location::new(40, 0).with_delivery(vec![5]),
    ];
    let vehicles = vec![VehicleType::new(2, vec![10]).with_reloads(vec![0], 1)];

    ProblemData::with_euclidean_matrices(
        vec![depot],
        clients,
        vehicles,
        Vec::<ClientGroup>::new(),
    )
    .expect("instance is valid")
}

fn route_with(data: &ProblemData, interior: &[usize]) -> SearchRoute {
    let mut route = SearchRoute::new(data, 0, 0);
    route.set_interior(interior);
    route.update(data);
    route
}

#[test]
fn test_empty_route_shape() {
    let data = reload_instance();
    let route = SearchRoute::new(&data, 0, 0);

    assert_eq!(route.size(), 2);
    assert_eq!(route.num_clients(&data), 0);
    assert_eq!(route.num_depots(&data), 2);
    assert_eq!(route.num_trips(), 1);
    assert!(route.is_empty(&data));
    assert_eq!(route.distance(&data), 0);
    assert_eq!(route.duration(&data), 0);
    assert_eq!(route.centroid(), (0.0, 0.0));
}

#[test]
fn test_distance_is_sum_of_arcs() {
    let data = reload_instance();
    let route = route_with(&data, &[1, 3, 2, 4]);

    let matrix = data.distance_matrix(0);
    let mut expected = 0;
    for pos in 1..route.size() {
        expected += matrix.get(route.visit(pos - 1), route.visit(pos));
    }
    assert_eq!(route.distance(&data), expected);

    // Reload visits count in the travelled distance too.
    let route = route_with(&data, &[1, 2, 0, 3, 4]);
    let mut expected = 0;
    for pos in 1..route.size() {
        expected += matrix.get(route.visit(pos - 1), route.visit(pos));
    }
    assert_eq!(route.distance(&data), expected);
}

#[test]
fn test_trip_bookkeeping() {
    let data = reload_instance();
    let route = route_with(&data, &[1, 2, 0, 3, 4]);

    assert_eq!(route.num_trips(), 2);
    assert_eq!(route.trip_of(1), 0);
    assert_eq!(route.trip_of(2), 0);
    assert_eq!(route.trip_of(3), 1); // the reload opens the next trip
    assert_eq!(route.trip_of(4), 1);
    assert_eq!(route.num_clients(&data), 4);
    assert_eq!(route.num_depots(&data), 3);
}

#[test]
fn test_reload_resets_the_carried_load() {
    let data = reload_instance();

    // Two trips of exactly the capacity: no excess anywhere.
    let balanced = route_with(&data, &[1, 2, 0, 3, 4]);
    assert_eq!(balanced.excess_load(0), 0);
    assert_eq!(balanced.load(0), 10);
    assert!(balanced.is_feasible(&data));

    // Three clients before the reload: the first trip carries 15.
    let skewed = route_with(&data, &[1, 2, 3, 0, 4]);
    assert_eq!(skewed.excess_load(0), 5);
    assert_eq!(skewed.load(0), 15);
    assert!(!skewed.is_feasible(&data));

    // Without any reload the whole 20 rides on one trip.
    let single = route_with(&data, &[1, 2, 3, 4]);
    assert_eq!(single.excess_load(0), 10);
}

#[test]
fn test_dist_before_after_between() {
    let data = reload_instance();
    let route = route_with(&data, &[1, 2, 3]);

    assert_eq!(route.dist_before(0), 0);
    assert_eq!(route.dist_before(2), 20); // 0 -> 1 -> 2
    assert_eq!(route.dist_after(2), 40); // 2 -> 3 -> 0
    assert_eq!(route.dist_between(&data, 1, 3, None), 20);
    assert_eq!(
        route.dist_before(route.last()),
        route.distance(&data)
    );

    // An explicit profile override on the only profile changes nothing.
    assert_eq!(route.dist_between(&data, 1, 3, Some(0)), 20);
}

#[test]
fn test_centroid_and_overlap() {
    let data = reload_instance();
    let left = route_with(&data, &[1, 2]);
    let right = route_with(&data, &[3, 4]);

    assert_eq!(left.centroid(), (15.0, 0.0));
    assert_eq!(right.centroid(), (35.0, 0.0));

    // A route overlaps itself at any tolerance.
    assert!(left.overlaps_with(&left, 0.0));
    assert!(left.overlaps_with(&left, 1.0));

    // Radii are 5; the centroids are 20 apart, so no tolerance in [0, 1]
    // makes these two overlap.
    assert!(!left.overlaps_with(&right, 1.0));

    let wide = route_with(&data, &[1, 4]);
    let inner = route_with(&data, &[2, 3]);
    // Identical centroids overlap even at tolerance zero.
    assert!(wide.overlaps_with(&inner, 0.0));
}

#[test]
fn test_update_after_mutation() {
    let data = reload_instance();
    let mut route = route_with(&data, &[1, 2]);
    let before = route.distance(&data);

    route.append(3);
    assert!(route.is_modified());
    route.update(&data);
    assert!(route.distance(&data) > before);

    route.remove(3);
    route.update(&data);
    assert_eq!(route.distance(&data), before);

    route.clear();
    route.update(&data);
    assert!(route.is_empty(&data));
    assert_eq!(route.distance(&data), 0);
}

#[test]
fn test_shift_duration_splits_into_overtime_and_warp() {
    let depot = Location::new(0, 0);
    let clients = vec![Location::new(30, 0).with_delivery(vec![1])];
    // Round trip takes 60; the shift caps at 40 with up to 15 overtime.
    let vehicles = vec![VehicleType::new(1, vec![10])
        .with_max_duration(40)
        .with_max_overtime(15)];
    let data = ProblemData::with_euclidean_matrices(
        vec![depot],
        clients,
        vehicles,
        Vec::<ClientGroup>::new(),
    )
    .expect("instance is valid");

    let route = route_with(&data, &[1]);
    assert_eq!(route.duration(&data), 60);
    assert_eq!(route.overtime(&data), 15);
    assert_eq!(route.time_warp(&data), 5);
}
