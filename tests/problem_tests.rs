//! Validation tests for problem construction.

use ils_vrp::error::Error;
use ils_vrp::problem::{ClientGroup, Location, Matrix, ProblemData, VehicleType};

fn identity(size: usize) -> Matrix {
    let mut matrix = Matrix::zeros(size);
    for i in 0..size {
        for j in 0..size {
            if i != j {
                matrix.set(i, j, 1);
            }
        }
    }
    matrix
}

fn errors_of(result: Result<ProblemData, Error>) -> Vec<String> {
    match result {
        Err(Error::Validation { errors }) => errors,
        Err(other) => panic!("expected a validation error, got {other}"),
        Ok(_) => panic!("expected a validation error"),
    }
}

#[test]
fn test_empty_depot_set_is_rejected() {
    let result = ProblemData::new(
        Vec::new(),
        vec![Location::new(1, 1).with_delivery(vec![1])],
        vec![VehicleType::new(1, vec![10])],
        Vec::new(),
        vec![identity(1)],
        vec![identity(1)],
    );
    let errors = errors_of(result);
    assert!(errors.iter().any(|e| e.contains("depot")));
}

#[test]
fn test_empty_vehicle_set_is_rejected() {
    let result = ProblemData::new(
        vec![Location::new(0, 0)],
        vec![Location::new(1, 1)],
        Vec::new(),
        Vec::new(),
        vec![identity(2)],
        vec![identity(2)],
    );
    let errors = errors_of(result);
    assert!(errors.iter().any(|e| e.contains("vehicle")));
}

#[test]
fn test_load_dimension_mismatch_is_rejected() {
    let result = ProblemData::new(
        vec![Location::new(0, 0)],
        vec![Location::new(1, 1).with_delivery(vec![1, 2])],
        vec![VehicleType::new(1, vec![10])], // one dimension
        Vec::new(),
        vec![identity(2)],
        vec![identity(2)],
    );
    let errors = errors_of(result);
    assert!(errors.iter().any(|e| e.contains("load dimensions")));
}

#[test]
fn test_matrix_shape_and_diagonal_are_checked() {
    let result = ProblemData::new(
        vec![Location::new(0, 0)],
        vec![Location::new(1, 1).with_delivery(vec![1])],
        vec![VehicleType::new(1, vec![10])],
        Vec::new(),
        vec![identity(3)], // wrong size
        vec![identity(3)],
    );
    let errors = errors_of(result);
    assert!(errors.iter().any(|e| e.contains("square")));

    let mut bad_diagonal = identity(2);
    bad_diagonal.set(0, 0, 7);
    let result = ProblemData::new(
        vec![Location::new(0, 0)],
        vec![Location::new(1, 1).with_delivery(vec![1])],
        vec![VehicleType::new(1, vec![10])],
        Vec::new(),
        vec![bad_diagonal],
        vec![identity(2)],
    );
    let errors = errors_of(result);
    assert!(errors.iter().any(|e| e.contains("diagonal")));
}

#[test]
fn test_inverted_time_window_is_rejected() {
    let result = ProblemData::new(
        vec![Location::new(0, 0)],
        vec![Location::new(1, 1).with_delivery(vec![1]).with_tw(100, 50)],
        vec![VehicleType::new(1, vec![10])],
        Vec::new(),
        vec![identity(2)],
        vec![identity(2)],
    );
    let errors = errors_of(result);
    assert!(errors.iter().any(|e| e.contains("tw_early")));
}

#[test]
fn test_out_of_range_depot_reference_is_rejected() {
    let result = ProblemData::new(
        vec![Location::new(0, 0)],
        vec![Location::new(1, 1).with_delivery(vec![1])],
        vec![VehicleType::new(1, vec![10]).with_depots(0, 3)],
        Vec::new(),
        vec![identity(2)],
        vec![identity(2)],
    );
    let errors = errors_of(result);
    assert!(errors.iter().any(|e| e.contains("depot index")));
}

#[test]
fn test_required_client_in_mutually_exclusive_group_is_rejected() {
    let result = ProblemData::new(
        vec![Location::new(0, 0)],
        vec![
            Location::new(1, 1).with_delivery(vec![1]).with_group(0),
            Location::new(2, 2).with_delivery(vec![1]),
        ],
        vec![VehicleType::new(1, vec![10])],
        vec![ClientGroup::new(vec![1]).with_mutually_exclusive(true)],
        vec![identity(3)],
        vec![identity(3)],
    );
    let errors = errors_of(result);
    assert!(errors.iter().any(|e| e.contains("mutually exclusive")));
}

#[test]
fn test_multiple_errors_are_collected() {
    let result = ProblemData::new(
        Vec::new(),
        vec![Location::new(1, 1).with_delivery(vec![1]).with_tw(9, 3)],
        Vec::new(),
        Vec::new(),
        vec![identity(1)],
        vec![identity(1)],
    );
    let errors = errors_of(result);
    assert!(errors.len() >= 3);
}

#[test]
fn test_valid_instance_passes() {
    let data = ProblemData::new(
        vec![Location::new(0, 0)],
        vec![
            Location::new(1, 1).with_delivery(vec![1]).with_pickup(vec![0]),
            Location::new(2, 2).with_delivery(vec![2]).with_pickup(vec![1]),
        ],
        vec![VehicleType::new(2, vec![10])],
        Vec::new(),
        vec![identity(3)],
        vec![identity(3)],
    )
    .expect("instance is valid");

    assert_eq!(data.num_depots(), 1);
    assert_eq!(data.num_clients(), 2);
    assert_eq!(data.num_locations(), 3);
    assert_eq!(data.num_load_dims(), 1);
    assert_eq!(data.num_vehicles(), 2);
    assert!(data.is_depot(0));
    assert!(data.is_client(1));
    assert_eq!(data.delivery(2, 0), 2);
    assert_eq!(data.pickup(2, 0), 1);
}

#[test]
fn test_problem_data_survives_a_json_round_trip() {
    let data = ProblemData::new(
        vec![Location::new(0, 0).with_name("hub")],
        vec![
            Location::new(1, 1)
                .with_delivery(vec![2])
                .with_pickup(vec![1])
                .with_tw(10, 90)
                .with_service_duration(5),
            Location::new(2, 2)
                .with_delivery(vec![1])
                .with_pickup(vec![0])
                .with_prize(40),
        ],
        vec![VehicleType::new(2, vec![10])
            .with_fixed_cost(100)
            .with_reloads(vec![0], 1)
            .with_name("van")],
        Vec::new(),
        vec![identity(3)],
        vec![identity(3)],
    )
    .expect("instance is valid");

    let json = serde_json::to_string(&data).expect("serialises");
    let back: ProblemData = serde_json::from_str(&json).expect("deserialises");

    assert_eq!(back.num_clients(), data.num_clients());
    assert_eq!(back.location(1), data.location(1));
    assert_eq!(back.vehicle_type(0), data.vehicle_type(0));
    assert_eq!(back.distance_matrix(0), data.distance_matrix(0));
}

#[test]
fn test_euclidean_matrices_round_to_integers() {
    let data = ProblemData::with_euclidean_matrices(
        vec![Location::new(0, 0)],
        vec![
            Location::new(3, 4).with_delivery(vec![1]),
            Location::new(10, 0).with_delivery(vec![1]),
        ],
        vec![VehicleType::new(1, vec![10])],
        Vec::<ClientGroup>::new(),
    )
    .expect("instance is valid");

    let matrix = data.distance_matrix(0);
    assert_eq!(matrix.get(0, 1), 5);
    assert_eq!(matrix.get(0, 2), 10);
    assert_eq!(matrix.get(1, 2), 8); // sqrt(49 + 16) rounded
    assert_eq!(matrix.get(1, 1), 0);
}
