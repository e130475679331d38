//! Tests for finalised solutions and their query surface.

use ils_vrp::problem::{ClientGroup, Location, Matrix, ProblemData, VehicleType};
use ils_vrp::solution::Solution;

fn tw_instance() -> ProblemData {
    let matrix = Matrix::new(vec![
        vec![0, 1544, 1944, 1931, 1476],
        vec![1726, 0, 1992, 1427, 1593],
        vec![1965, 1975, 0, 621, 1090],
        vec![2063, 1433, 647, 0, 818],
        vec![1475, 1594, 1090, 828, 0],
    ]);

    let depot = Location::new(2334, 726).with_tw(0, 45000);
    let clients = vec![
        Location::new(226, 1297)
            .with_tw(15600, 22500)
            .with_service_duration(360)
            .with_delivery(vec![5]),
        Location::new(590, 530)
            .with_tw(12000, 19500)
            .with_service_duration(360)
            .with_delivery(vec![5]),
        Location::new(435, 718)
            .with_tw(8400, 15300)
            .with_service_duration(360)
            .with_delivery(vec![3]),
        Location::new(1191, 639)
            .with_tw(12000, 19500)
            .with_service_duration(360)
            .with_delivery(vec![5]),
    ];
    let vehicles = vec![VehicleType::new(3, vec![10])];

    ProblemData::new(
        vec![depot],
        clients,
        vehicles,
        Vec::<ClientGroup>::new(),
        vec![matrix.clone()],
        vec![matrix],
    )
    .expect("instance is valid")
}

#[test]
fn test_totals_are_sums_over_routes() {
    let data = tw_instance();
    let solution = Solution::new(&data, vec![(0, vec![1, 2]), (0, vec![3, 4])]);

    let route_dist: i64 = solution.routes().iter().map(|r| r.distance()).sum();
    let route_dur: i64 = solution.routes().iter().map(|r| r.duration()).sum();
    assert_eq!(solution.distance(), route_dist);
    assert_eq!(solution.duration(), route_dur);

    assert_eq!(solution.routes()[0].distance(), 1544 + 1992 + 1965);
    assert!(solution.is_complete());
    assert!(solution.is_feasible());
}

#[test]
fn test_route_aggregates() {
    let data = tw_instance();
    let solution = Solution::new(&data, vec![(0, vec![1, 2])]);
    let route = &solution.routes()[0];

    assert_eq!(route.vehicle_type(), 0);
    assert_eq!(route.start_depot(), 0);
    assert_eq!(route.end_depot(), 0);
    assert_eq!(route.num_trips(), 1);
    assert_eq!(route.num_clients(), 2);
    assert_eq!(route.delivery(), &[10]);
    assert_eq!(route.pickup(), &[0]);
    assert_eq!(route.load(), &[10]);
    assert_eq!(route.excess_load(0), 0);
    assert_eq!(route.time_warp(), 0);
    assert_eq!(route.service_duration(), 720);
    assert_eq!(route.travel_duration(), 1544 + 1992 + 1965);
    assert_eq!(
        route.duration(),
        route.travel_duration() + route.service_duration() + route.wait_duration()
    );
    assert_eq!(route.distance_cost(&data), route.distance());
    assert_eq!(route.duration_cost(&data), 0);
}

#[test]
fn test_schedule_reconstruction() {
    let data = tw_instance();
    let solution = Solution::new(&data, vec![(0, vec![1, 2])]);
    let route = &solution.routes()[0];

    let schedule = route.schedule(&data);
    assert_eq!(schedule.len(), 4); // depot, two clients, depot

    // Every service starts within its window, there is no warp, and the
    // per-visit warps sum to the route total.
    let total_warp: i64 = schedule.iter().map(|v| v.time_warp).sum();
    assert_eq!(total_warp, route.time_warp());

    let first_client = &schedule[1];
    assert_eq!(first_client.location, 1);
    assert!(first_client.start_service >= 15600);
    assert!(first_client.start_service <= 22500);
    assert_eq!(first_client.end_service, first_client.start_service + 360);

    // Service at consecutive visits never overlaps.
    for pair in schedule.windows(2) {
        assert!(pair[1].start_service + pair[1].time_warp >= pair[0].end_service);
    }
}

#[test]
fn test_schedule_warp_matches_route_total_when_infeasible() {
    let data = tw_instance();
    // Client 3 closes at 15300; serving it after client 1 forces warp.
    let solution = Solution::new(&data, vec![(0, vec![1, 3, 2])]);
    let route = &solution.routes()[0];
    assert_eq!(route.time_warp(), 2087);

    let schedule = route.schedule(&data);
    let total_warp: i64 = schedule.iter().map(|v| v.time_warp).sum();
    assert_eq!(total_warp, 2087);
    assert!(!solution.is_feasible());
}

#[test]
fn test_multi_trip_schedule_tags_trips() {
    let depot = Location::new(0, 0);
    let clients = vec![
        Location::new(10, 0).with_delivery(vec![5]),
        Location::new(20, 0).with_delivery(vec![5]),
    ];
    let vehicles = vec![VehicleType::new(1, vec![5]).with_reloads(vec![0], 1)];
    let data = ProblemData::with_euclidean_matrices(
        vec![depot],
        clients,
        vehicles,
        Vec::<ClientGroup>::new(),
    )
    .expect("instance is valid");

    let solution = Solution::new(&data, vec![(0, vec![1, 0, 2])]);
    let route = &solution.routes()[0];
    assert_eq!(route.num_trips(), 2);
    assert_eq!(route.excess_load(0), 0);

    let schedule = route.schedule(&data);
    let trips: Vec<usize> = schedule.iter().map(|v| v.trip).collect();
    assert_eq!(trips, vec![0, 0, 1, 1, 1]);
}

#[test]
fn test_missing_required_client_means_incomplete() {
    let data = tw_instance();
    let partial = Solution::new(&data, vec![(0, vec![1, 2])]);
    assert!(!partial.is_complete());

    let duplicated = Solution::new(&data, vec![(0, vec![1, 2]), (0, vec![1, 3, 4])]);
    assert!(!duplicated.is_complete());
}

#[test]
fn test_uncollected_prizes() {
    let depot = Location::new(0, 0);
    let clients = vec![
        Location::new(10, 0).with_delivery(vec![1]),
        Location::new(20, 0).with_delivery(vec![1]).with_prize(300),
        Location::new(30, 0).with_delivery(vec![1]).with_prize(500),
    ];
    let vehicles = vec![VehicleType::new(2, vec![10])];
    let data = ProblemData::with_euclidean_matrices(
        vec![depot],
        clients,
        vehicles,
        Vec::<ClientGroup>::new(),
    )
    .expect("instance is valid");

    let solution = Solution::new(&data, vec![(0, vec![1, 3])]);
    assert!(solution.is_complete()); // optional client 2 may stay out
    assert_eq!(solution.prizes(), 500);
    assert_eq!(solution.uncollected_prizes(), 300);
}

#[test]
fn test_empty_solution() {
    let data = tw_instance();
    let empty = Solution::empty(&data);
    assert_eq!(empty.num_routes(), 0);
    assert_eq!(empty.distance(), 0);
    assert!(!empty.is_complete()); // required clients are missing
    assert!(empty.is_feasible()); // nothing violated either
}

#[test]
fn test_display_summarises_routes() {
    let data = tw_instance();
    let solution = Solution::new(&data, vec![(0, vec![1, 2]), (0, vec![3, 4])]);
    let text = format!("{}", solution);
    assert!(text.contains("Routes: 2"));
    assert!(text.contains("Feasible: true"));
}
