//! Problem definition and data structures for rich VRP instances.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Scalar cost unit. All cost arithmetic is integral and saturating.
pub type Cost = i64;
/// Distance unit.
pub type Distance = i64;
/// Duration unit (travel, service, waiting, time windows).
pub type Duration = i64;
/// Load unit, one value per load dimension.
pub type Load = i64;

/// Sentinel for "no limit". Arithmetic against this value must saturate.
pub const UNLIMITED: i64 = i64::MAX;

/// A square matrix of non-negative integers with flat row-major storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    size: usize,
    data: Vec<i64>,
}

impl Matrix {
    /// Create a matrix from rows. Rows must form a square.
    pub fn new(rows: Vec<Vec<i64>>) -> Self {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);
        for row in &rows {
            data.extend_from_slice(row);
        }
        Matrix { size, data }
    }

    /// Create a zero-filled matrix of the given size.
    pub fn zeros(size: usize) -> Self {
        Matrix {
            size,
            data: vec![0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> i64 {
        self.data[from * self.size + to]
    }

    pub fn set(&mut self, from: usize, to: usize, value: i64) {
        self.data[from * self.size + to] = value;
    }

    fn is_square(&self) -> bool {
        self.data.len() == self.size * self.size
    }
}

/// A depot or client location, identified by a 0-based index in a single
/// flat space; depots come first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub x: i64,
    pub y: i64,
    pub tw_early: Duration,
    pub tw_late: Duration,
    pub service_duration: Duration,
    pub release_time: Duration,
    pub delivery: Vec<Load>,
    pub pickup: Vec<Load>,
    pub prize: Cost,
    pub required: bool,
    pub group: Option<usize>,
    pub name: String,
}

impl Location {
    /// Create a location at the given coordinates with no demand, an open
    /// time window and no prize.
    pub fn new(x: i64, y: i64) -> Self {
        Location {
            x,
            y,
            tw_early: 0,
            tw_late: UNLIMITED,
            service_duration: 0,
            release_time: 0,
            delivery: Vec::new(),
            pickup: Vec::new(),
            prize: 0,
            required: true,
            group: None,
            name: String::new(),
        }
    }

    pub fn with_tw(mut self, early: Duration, late: Duration) -> Self {
        self.tw_early = early;
        self.tw_late = late;
        self
    }

    pub fn with_service_duration(mut self, duration: Duration) -> Self {
        self.service_duration = duration;
        self
    }

    pub fn with_release_time(mut self, release: Duration) -> Self {
        self.release_time = release;
        self
    }

    pub fn with_delivery(mut self, delivery: Vec<Load>) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_pickup(mut self, pickup: Vec<Load>) -> Self {
        self.pickup = pickup;
        self
    }

    /// Mark this client as optional, visited only when the prize is worth
    /// the detour.
    pub fn with_prize(mut self, prize: Cost) -> Self {
        self.prize = prize;
        self.required = false;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_group(mut self, group: usize) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A class of vehicles sharing depots, capacity, shift and cost structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleType {
    pub num_available: usize,
    pub start_depot: usize,
    pub end_depot: usize,
    pub capacity: Vec<Load>,
    pub fixed_cost: Cost,
    pub unit_distance_cost: Cost,
    pub unit_duration_cost: Cost,
    pub unit_overtime_cost: Cost,
    /// Shift time window applied at the route's depot sentinels.
    pub tw_early: Duration,
    pub tw_late: Duration,
    /// Shift duration cap; excess splits into overtime and time warp.
    pub max_duration: Duration,
    pub max_overtime: Duration,
    pub max_distance: Distance,
    pub initial_load: Vec<Load>,
    /// Depots at which the vehicle may reload mid-route. Empty means the
    /// vehicle runs a single trip.
    pub reload_depots: Vec<usize>,
    pub max_reloads: usize,
    /// Index of the distance/duration matrix pair this vehicle travels on.
    pub profile: usize,
    pub name: String,
}

impl VehicleType {
    /// Create a vehicle type with the given availability and capacity,
    /// based at depot 0 with an open shift and unit distance cost.
    pub fn new(num_available: usize, capacity: Vec<Load>) -> Self {
        VehicleType {
            num_available,
            start_depot: 0,
            end_depot: 0,
            capacity,
            fixed_cost: 0,
            unit_distance_cost: 1,
            unit_duration_cost: 0,
            unit_overtime_cost: 0,
            tw_early: 0,
            tw_late: UNLIMITED,
            max_duration: UNLIMITED,
            max_overtime: 0,
            max_distance: UNLIMITED,
            initial_load: Vec::new(),
            reload_depots: Vec::new(),
            max_reloads: 0,
            profile: 0,
            name: String::new(),
        }
    }

    pub fn with_depots(mut self, start: usize, end: usize) -> Self {
        self.start_depot = start;
        self.end_depot = end;
        self
    }

    pub fn with_fixed_cost(mut self, cost: Cost) -> Self {
        self.fixed_cost = cost;
        self
    }

    pub fn with_unit_costs(mut self, distance: Cost, duration: Cost, overtime: Cost) -> Self {
        self.unit_distance_cost = distance;
        self.unit_duration_cost = duration;
        self.unit_overtime_cost = overtime;
        self
    }

    pub fn with_shift_tw(mut self, early: Duration, late: Duration) -> Self {
        self.tw_early = early;
        self.tw_late = late;
        self
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn with_max_overtime(mut self, max_overtime: Duration) -> Self {
        self.max_overtime = max_overtime;
        self
    }

    pub fn with_max_distance(mut self, max_distance: Distance) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn with_initial_load(mut self, initial_load: Vec<Load>) -> Self {
        self.initial_load = initial_load;
        self
    }

    pub fn with_reloads(mut self, depots: Vec<usize>, max_reloads: usize) -> Self {
        self.reload_depots = depots;
        self.max_reloads = max_reloads;
        self
    }

    pub fn with_profile(mut self, profile: usize) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Maximum number of trips a single route of this type may run.
    pub fn max_trips(&self) -> usize {
        self.max_reloads + 1
    }
}

/// A set of clients with joint visiting rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientGroup {
    /// Flat location indices of the member clients.
    pub clients: Vec<usize>,
    /// At least one member must be visited.
    pub required: bool,
    /// At most one member may be visited.
    pub mutually_exclusive: bool,
}

impl ClientGroup {
    pub fn new(clients: Vec<usize>) -> Self {
        ClientGroup {
            clients,
            required: false,
            mutually_exclusive: false,
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_mutually_exclusive(mut self, mutually_exclusive: bool) -> Self {
        self.mutually_exclusive = mutually_exclusive;
        self
    }
}

/// An immutable, validated VRP instance. Constructed once and shared by
/// reference throughout the solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemData {
    depots: Vec<Location>,
    clients: Vec<Location>,
    vehicle_types: Vec<VehicleType>,
    groups: Vec<ClientGroup>,
    distance_matrices: Vec<Matrix>,
    duration_matrices: Vec<Matrix>,
    num_load_dims: usize,
}

impl ProblemData {
    /// Build and validate an instance. Matrices are given per profile and
    /// must be square over all locations (depots first).
    pub fn new(
        depots: Vec<Location>,
        clients: Vec<Location>,
        vehicle_types: Vec<VehicleType>,
        groups: Vec<ClientGroup>,
        distance_matrices: Vec<Matrix>,
        duration_matrices: Vec<Matrix>,
    ) -> Result<Self, Error> {
        let num_load_dims = vehicle_types
            .first()
            .map(|vt| vt.capacity.len())
            .unwrap_or(0);

        let data = ProblemData {
            depots,
            clients,
            vehicle_types,
            groups,
            distance_matrices,
            duration_matrices,
            num_load_dims,
        };

        data.validate()?;
        Ok(data)
    }

    /// Convenience constructor computing integer Euclidean distance and
    /// duration matrices from the location coordinates.
    pub fn with_euclidean_matrices(
        depots: Vec<Location>,
        clients: Vec<Location>,
        vehicle_types: Vec<VehicleType>,
        groups: Vec<ClientGroup>,
    ) -> Result<Self, Error> {
        let mut all: Vec<&Location> = Vec::with_capacity(depots.len() + clients.len());
        all.extend(depots.iter());
        all.extend(clients.iter());

        let n = all.len();
        let mut matrix = Matrix::zeros(n);
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let dx = (all[i].x - all[j].x) as f64;
                    let dy = (all[i].y - all[j].y) as f64;
                    matrix.set(i, j, (dx * dx + dy * dy).sqrt().round() as i64);
                }
            }
        }

        let duration = matrix.clone();
        ProblemData::new(
            depots,
            clients,
            vehicle_types,
            groups,
            vec![matrix],
            vec![duration],
        )
    }

    /// Check every structural invariant, collecting all violations.
    fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();
        let num_locs = self.num_locations();
        let num_profiles = self.distance_matrices.len();

        if self.depots.is_empty() {
            errors.push("at least one depot is required".to_string());
        }

        if self.vehicle_types.is_empty() {
            errors.push("at least one vehicle type is required".to_string());
        }

        if num_profiles == 0 {
            errors.push("at least one matrix profile is required".to_string());
        }

        if self.duration_matrices.len() != num_profiles {
            errors.push(format!(
                "{} distance matrices but {} duration matrices",
                num_profiles,
                self.duration_matrices.len()
            ));
        }

        for (p, matrix) in self
            .distance_matrices
            .iter()
            .chain(self.duration_matrices.iter())
            .enumerate()
        {
            if !matrix.is_square() || matrix.size() != num_locs {
                errors.push(format!(
                    "matrix {} must be square over {} locations",
                    p, num_locs
                ));
                continue;
            }
            for i in 0..num_locs {
                if matrix.get(i, i) != 0 {
                    errors.push(format!("matrix {} has a non-zero diagonal at {}", p, i));
                    break;
                }
                for j in 0..num_locs {
                    if matrix.get(i, j) < 0 {
                        errors.push(format!(
                            "matrix {} has a negative entry at ({}, {})",
                            p, i, j
                        ));
                        break;
                    }
                }
            }
        }

        for (idx, loc) in self.depots.iter().chain(self.clients.iter()).enumerate() {
            if loc.tw_early > loc.tw_late {
                errors.push(format!("location {}: tw_early exceeds tw_late", idx));
            }
            if loc.tw_early < 0 || loc.service_duration < 0 || loc.release_time < 0 {
                errors.push(format!("location {}: negative timing attribute", idx));
            }
            if loc.prize < 0 {
                errors.push(format!("location {}: negative prize", idx));
            }
        }

        for (idx, client) in self.clients.iter().enumerate() {
            let loc = self.num_depots() + idx;
            if client.delivery.len() != self.num_load_dims
                || client.pickup.len() != self.num_load_dims
            {
                errors.push(format!(
                    "client {}: delivery/pickup must have {} load dimensions",
                    loc, self.num_load_dims
                ));
            }
            if client
                .delivery
                .iter()
                .chain(client.pickup.iter())
                .any(|&d| d < 0)
            {
                errors.push(format!("client {}: negative demand", loc));
            }
            if let Some(group) = client.group {
                if group >= self.groups.len() {
                    errors.push(format!("client {}: group {} out of range", loc, group));
                }
            }
        }

        for (idx, vt) in self.vehicle_types.iter().enumerate() {
            if vt.start_depot >= self.num_depots() || vt.end_depot >= self.num_depots() {
                errors.push(format!("vehicle type {}: depot index out of range", idx));
            }
            if vt.capacity.len() != self.num_load_dims {
                errors.push(format!(
                    "vehicle type {}: capacity must have {} load dimensions",
                    idx, self.num_load_dims
                ));
            }
            if !vt.initial_load.is_empty() && vt.initial_load.len() != self.num_load_dims {
                errors.push(format!(
                    "vehicle type {}: initial load must have {} load dimensions",
                    idx, self.num_load_dims
                ));
            }
            if vt.reload_depots.iter().any(|&d| d >= self.num_depots()) {
                errors.push(format!("vehicle type {}: reload depot out of range", idx));
            }
            if vt.profile >= num_profiles {
                errors.push(format!("vehicle type {}: matrix profile out of range", idx));
            }
            if vt.tw_early > vt.tw_late {
                errors.push(format!(
                    "vehicle type {}: shift tw_early exceeds tw_late",
                    idx
                ));
            }
            if vt.num_available == 0 {
                errors.push(format!("vehicle type {}: zero vehicles available", idx));
            }
        }

        for (idx, group) in self.groups.iter().enumerate() {
            for &client in &group.clients {
                if client < self.num_depots() || client >= num_locs {
                    errors.push(format!("group {}: member {} is not a client", idx, client));
                    continue;
                }
                let loc = self.location(client);
                if group.mutually_exclusive && loc.required {
                    errors.push(format!(
                        "group {}: required client {} cannot be mutually exclusive",
                        idx, client
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(errors))
        }
    }

    pub fn num_depots(&self) -> usize {
        self.depots.len()
    }

    pub fn num_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn num_locations(&self) -> usize {
        self.depots.len() + self.clients.len()
    }

    pub fn num_load_dims(&self) -> usize {
        self.num_load_dims
    }

    pub fn num_vehicle_types(&self) -> usize {
        self.vehicle_types.len()
    }

    /// Total number of vehicles over all types.
    pub fn num_vehicles(&self) -> usize {
        self.vehicle_types.iter().map(|vt| vt.num_available).sum()
    }

    pub fn num_profiles(&self) -> usize {
        self.distance_matrices.len()
    }

    #[inline]
    pub fn is_depot(&self, location: usize) -> bool {
        location < self.depots.len()
    }

    #[inline]
    pub fn is_client(&self, location: usize) -> bool {
        location >= self.depots.len()
    }

    /// Look up any location by its flat index.
    #[inline]
    pub fn location(&self, index: usize) -> &Location {
        if index < self.depots.len() {
            &self.depots[index]
        } else {
            &self.clients[index - self.depots.len()]
        }
    }

    /// Flat indices of all clients.
    pub fn client_indices(&self) -> std::ops::Range<usize> {
        self.depots.len()..self.num_locations()
    }

    pub fn vehicle_type(&self, index: usize) -> &VehicleType {
        &self.vehicle_types[index]
    }

    pub fn vehicle_types(&self) -> &[VehicleType] {
        &self.vehicle_types
    }

    pub fn group(&self, index: usize) -> &ClientGroup {
        &self.groups[index]
    }

    pub fn groups(&self) -> &[ClientGroup] {
        &self.groups
    }

    #[inline]
    pub fn distance_matrix(&self, profile: usize) -> &Matrix {
        &self.distance_matrices[profile]
    }

    #[inline]
    pub fn duration_matrix(&self, profile: usize) -> &Matrix {
        &self.duration_matrices[profile]
    }

    /// Delivery demand of a location in one dimension; depots carry none.
    #[inline]
    pub fn delivery(&self, location: usize, dim: usize) -> Load {
        self.location(location).delivery.get(dim).copied().unwrap_or(0)
    }

    /// Pickup demand of a location in one dimension; depots carry none.
    #[inline]
    pub fn pickup(&self, location: usize, dim: usize) -> Load {
        self.location(location).pickup.get(dim).copied().unwrap_or(0)
    }

    /// Largest prize over all optional clients, zero when none exist.
    pub fn max_optional_prize(&self) -> Cost {
        self.clients
            .iter()
            .filter(|c| !c.required)
            .map(|c| c.prize)
            .max()
            .unwrap_or(0)
    }
}
