//! Tests for the cost evaluator and proposal-based delta evaluation,
//! including the reference deltas of the small four-client time-window
//! instance.

use ils_vrp::cost::{CostEvaluator, Piece, RouteProposal};
use ils_vrp::problem::{ClientGroup, Location, Matrix, ProblemData, VehicleType};
use ils_vrp::route::SearchRoute;
use ils_vrp::solution::Solution;

/// Four clients with tight time windows around a single depot; distance
/// and duration share one asymmetric matrix.
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
            .with_delivery(vec![5])
            .with_pickup(vec![0]),
        Location::new(590, 530)
            .with_tw(12000, 19500)
            .with_service_duration(360)
            .with_delivery(vec![5])
            .with_pickup(vec![0]),
        Location::new(435, 718)
            .with_tw(8400, 15300)
            .with_service_duration(360)
            .with_delivery(vec![3])
            .with_pickup(vec![0]),
        Location::new(1191, 639)
            .with_tw(12000, 19500)
            .with_service_duration(360)
            .with_delivery(vec![5])
            .with_pickup(vec![0]),
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

fn route_with(data: &ProblemData, interior: &[usize]) -> SearchRoute {
    let mut route = SearchRoute::new(data, 0, 0);
    route.set_interior(interior);
    route.update(data);
    route
}

#[test]
fn test_insert_cost() {
    let data = tw_instance();
    let cost_evaluator = CostEvaluator::new(vec![1.0], 1.0, 0.0);
    let route = route_with(&data, &[1, 2]);
    let current = cost_evaluator.route_cost(&data, &route);

    // Client 4 after client 1: 691 extra distance plus 5 excess load.
    let proposal = RouteProposal::new(
        0,
        vec![
            Piece::Prefix(&route, 1),
            Piece::Client(4),
            Piece::Suffix(&route, 2),
        ],
    );
    let delta = cost_evaluator.proposal_cost(&data, &proposal) - current;
    assert_eq!(delta, 696);

    // Client 3 after client 1: 82 distance, 3 excess load and 2087 units
    // of time warp at client 3's window.
    let proposal = RouteProposal::new(
        0,
        vec![
            Piece::Prefix(&route, 1),
            Piece::Client(3),
            Piece::Suffix(&route, 2),
        ],
    );
    let delta = cost_evaluator.proposal_cost(&data, &proposal) - current;
    assert_eq!(delta, 2172);
}

#[test]
fn test_remove_cost() {
    let data = tw_instance();
    let cost_evaluator = CostEvaluator::new(vec![1.0], 1.0, 0.0);
    let route = route_with(&data, &[1, 2]);
    let current = cost_evaluator.route_cost(&data, &route);

    let proposal = RouteProposal::new(0, vec![Piece::Prefix(&route, 0), Piece::Suffix(&route, 2)]);
    let delta = cost_evaluator.proposal_cost(&data, &proposal) - current;
    assert_eq!(delta, -1592);

    let proposal = RouteProposal::new(0, vec![Piece::Prefix(&route, 1), Piece::Suffix(&route, 3)]);
    let delta = cost_evaluator.proposal_cost(&data, &proposal) - current;
    assert_eq!(delta, -2231);
}

#[test]
fn test_proposal_matches_route_cost_when_identical() {
    let data = tw_instance();
    let cost_evaluator = CostEvaluator::new(vec![2.0], 3.0, 1.0);
    let route = route_with(&data, &[1, 3, 2, 4]);

    let proposal = RouteProposal::new(0, vec![Piece::Prefix(&route, 2), Piece::Suffix(&route, 3)]);
    let rebuilt = RouteProposal::new(
        0,
        vec![
            Piece::Start,
            Piece::Client(1),
            Piece::Client(3),
            Piece::Client(2),
            Piece::Client(4),
            Piece::End,
        ],
    );

    // Splitting a route into prefix and suffix changes nothing, and a
    // piece-by-piece rebuild agrees with the cached evaluation.
    assert_eq!(
        cost_evaluator.proposal_cost(&data, &proposal),
        cost_evaluator.route_cost(&data, &route),
    );
    assert_eq!(
        cost_evaluator.proposal_cost(&data, &rebuilt),
        cost_evaluator.route_cost(&data, &route),
    );
}

/// Two depots, one client, and a vehicle running from depot 0 to depot 1
/// with a zero-duration shift. Inserting into the empty route must charge
/// only the arcs actually travelled, never the hypothetical
/// depot-to-depot leg of the empty route.
#[test]
fn test_empty_route_contributes_nothing() {
    let matrix = Matrix::new(vec![vec![0, 5, 1], vec![5, 0, 1], vec![1, 1, 0]]);
    let depots = vec![Location::new(0, 0), Location::new(10, 0)];
    let clients = vec![Location::new(5, 0)];
    let vehicles = vec![VehicleType::new(1, Vec::new())
        .with_depots(0, 1)
        .with_max_duration(0)];

    let data = ProblemData::new(
        depots,
        clients,
        vehicles,
        Vec::<ClientGroup>::new(),
        vec![matrix.clone()],
        vec![matrix],
    )
    .expect("instance is valid");

    let cost_evaluator = CostEvaluator::new(Vec::new(), 1.0, 1.0);

    let empty = route_with(&data, &[]);
    assert_eq!(cost_evaluator.route_cost(&data, &empty), 0);

    let proposal = RouteProposal::new(
        0,
        vec![
            Piece::Prefix(&empty, 0),
            Piece::Client(2),
            Piece::Suffix(&empty, 1),
        ],
    );
    let delta = cost_evaluator.proposal_cost(&data, &proposal);
    assert_eq!(delta, 4);

    let filled = route_with(&data, &[2]);
    assert_eq!(cost_evaluator.route_cost(&data, &filled), 4);

    let removal = RouteProposal::new(0, vec![Piece::Prefix(&filled, 0), Piece::Suffix(&filled, 2)]);
    let delta = cost_evaluator.proposal_cost(&data, &removal)
        - cost_evaluator.route_cost(&data, &filled);
    assert_eq!(delta, -4);
}

#[test]
fn test_fixed_cost_charged_for_nonempty_routes_only() {
    let data = {
        let depot = Location::new(0, 0);
        let clients = vec![
            Location::new(10, 0).with_delivery(vec![1]),
            Location::new(20, 0).with_delivery(vec![1]),
        ];
        let vehicles = vec![VehicleType::new(2, vec![10]).with_fixed_cost(1000)];
        ProblemData::with_euclidean_matrices(
            vec![depot],
            clients,
            vehicles,
            Vec::<ClientGroup>::new(),
        )
        .expect("instance is valid")
    };
    let cost_evaluator = CostEvaluator::new(vec![1.0], 1.0, 0.0);

    let empty = route_with(&data, &[]);
    let busy = route_with(&data, &[1, 2]);

    assert_eq!(cost_evaluator.route_cost(&data, &empty), 0);
    // Round trip 0 -> 1 -> 2 -> 0 is 40, plus the fixed cost.
    assert_eq!(cost_evaluator.route_cost(&data, &busy), 1040);
}

#[test]
fn test_solution_cost_is_infinite_when_infeasible() {
    let data = tw_instance();
    let cost_evaluator = CostEvaluator::new(vec![1.0], 1.0, 0.0);

    // All four clients on one vehicle overloads it.
    let overloaded = Solution::new(&data, vec![(0, vec![1, 2, 3, 4])]);
    assert!(!overloaded.is_feasible());
    assert_eq!(
        cost_evaluator.cost(&data, &overloaded),
        ils_vrp::problem::Cost::MAX
    );
    assert!(cost_evaluator.penalised_cost(&data, &overloaded) < ils_vrp::problem::Cost::MAX);

    let split = Solution::new(&data, vec![(0, vec![1, 2]), (0, vec![3, 4])]);
    assert!(split.is_complete());
    if split.is_feasible() {
        assert_eq!(
            cost_evaluator.cost(&data, &split),
            cost_evaluator.penalised_cost(&data, &split)
        );
    }
}
