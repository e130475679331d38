//! Mutable route representation used during local search.
//!
//! A `SearchRoute` is a sequence of location indices bracketed by a
//! start-depot sentinel and an end-depot sentinel; reload-depot visits may
//! appear interior to mark trip boundaries. Prefix and suffix segment
//! caches are invalidated on mutation and rebuilt in a single pass by
//! [`SearchRoute::update`] before the next query.

use crate::problem::{Distance, Duration, Load, ProblemData};
use crate::segment::{DurationSegment, LoadSegment};

/// Where a client currently sits: route index, position and trip number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePos {
    pub route: usize,
    pub index: usize,
    pub trip: usize,
}

/// A mutable route with lazily rebuilt segment caches.
#[derive(Debug, Clone)]
pub struct SearchRoute {
    idx: usize,
    vehicle_type: usize,
    /// Location indices; `visits[0]` and `visits[last]` are the depot
    /// sentinels and may never be removed.
    visits: Vec<usize>,
    /// Has this route been modified since the last cache rebuild.
    modified: bool,

    cum_dist: Vec<Distance>,
    dur_node: Vec<DurationSegment>,
    dur_prefix: Vec<DurationSegment>,
    dur_suffix: Vec<DurationSegment>,
    /// Per dimension: single-visit load segments.
    load_node: Vec<Vec<LoadSegment>>,
    /// Per dimension: left-to-right segments, finalised at each depot.
    load_prefix: Vec<Vec<LoadSegment>>,
    /// Per dimension: open fragment from a position up to (excluding) the
    /// first depot at or after it.
    load_suffix_open: Vec<Vec<LoadSegment>>,
    /// Per dimension: excess of the trips that close strictly after that
    /// first depot, finalised at this route's capacity.
    load_suffix_closed: Vec<Vec<Load>>,
    /// Per dimension: largest instantaneous load over any single trip.
    max_trip_load: Vec<Load>,
    /// Number of interior reload depots at positions `<= i`.
    reloads_upto: Vec<usize>,
    /// Number of clients at positions `<= i`.
    clients_upto: Vec<usize>,
    /// Trip number per position; interior depots open the next trip.
    trip_of: Vec<usize>,

    centroid: (f64, f64),
    radius: f64,
}

impl SearchRoute {
    /// Create an empty route for the given vehicle type: just the two
    /// depot sentinels.
    pub fn new(data: &ProblemData, idx: usize, vehicle_type: usize) -> Self {
        let vt = data.vehicle_type(vehicle_type);
        let dims = data.num_load_dims();
        let mut route = SearchRoute {
            idx,
            vehicle_type,
            visits: vec![vt.start_depot, vt.end_depot],
            modified: true,
            cum_dist: Vec::new(),
            dur_node: Vec::new(),
            dur_prefix: Vec::new(),
            dur_suffix: Vec::new(),
            load_node: vec![Vec::new(); dims],
            load_prefix: vec![Vec::new(); dims],
            load_suffix_open: vec![Vec::new(); dims],
            load_suffix_closed: vec![Vec::new(); dims],
            max_trip_load: vec![0; dims],
            reloads_upto: Vec::new(),
            clients_upto: Vec::new(),
            trip_of: Vec::new(),
            centroid: (0.0, 0.0),
            radius: 0.0,
        };
        route.update(data);
        route
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn set_idx(&mut self, idx: usize) {
        self.idx = idx;
    }

    pub fn vehicle_type(&self) -> usize {
        self.vehicle_type
    }

    pub fn profile(&self, data: &ProblemData) -> usize {
        data.vehicle_type(self.vehicle_type).profile
    }

    /// Number of visits, depot sentinels counted.
    pub fn size(&self) -> usize {
        self.visits.len()
    }

    /// Position of the end-depot sentinel.
    pub fn last(&self) -> usize {
        self.visits.len() - 1
    }

    #[inline]
    pub fn visit(&self, index: usize) -> usize {
        self.visits[index]
    }

    pub fn visits(&self) -> &[usize] {
        &self.visits
    }

    /// Interior visits, sentinels excluded.
    pub fn interior(&self) -> &[usize] {
        &self.visits[1..self.visits.len() - 1]
    }

    pub fn num_clients(&self, data: &ProblemData) -> usize {
        self.interior()
            .iter()
            .filter(|&&loc| data.is_client(loc))
            .count()
    }

    /// Depot visits, sentinels counted.
    pub fn num_depots(&self, data: &ProblemData) -> usize {
        self.visits
            .iter()
            .filter(|&&loc| data.is_depot(loc))
            .count()
    }

    /// True iff the route serves no clients.
    pub fn is_empty(&self, data: &ProblemData) -> bool {
        self.interior().iter().all(|&loc| data.is_depot(loc))
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Replace the interior visit sequence wholesale.
    pub fn set_interior(&mut self, interior: &[usize]) {
        let start = self.visits[0];
        let end = self.visits[self.visits.len() - 1];
        self.visits.clear();
        self.visits.push(start);
        self.visits.extend_from_slice(interior);
        self.visits.push(end);
        self.modified = true;
    }

    /// Insert a visit so that it lands at position `index`.
    pub fn insert(&mut self, index: usize, location: usize) {
        debug_assert!(index > 0 && index < self.visits.len());
        self.visits.insert(index, location);
        self.modified = true;
    }

    /// Append a visit just before the end sentinel.
    pub fn append(&mut self, location: usize) {
        let last = self.visits.len() - 1;
        self.visits.insert(last, location);
        self.modified = true;
    }

    /// Remove and return the visit at `index`. Sentinels cannot be removed.
    pub fn remove(&mut self, index: usize) -> usize {
        debug_assert!(index > 0 && index < self.visits.len() - 1);
        self.modified = true;
        self.visits.remove(index)
    }

    /// Remove and return `count` consecutive visits starting at `index`.
    pub fn remove_range(&mut self, index: usize, count: usize) -> Vec<usize> {
        debug_assert!(index > 0 && index + count <= self.visits.len() - 1);
        self.modified = true;
        self.visits.drain(index..index + count).collect()
    }

    /// Insert a sequence of visits starting at position `index`.
    pub fn insert_range(&mut self, index: usize, locations: &[usize]) {
        debug_assert!(index > 0 && index < self.visits.len());
        self.modified = true;
        let tail: Vec<usize> = self.visits.drain(index..).collect();
        self.visits.extend_from_slice(locations);
        self.visits.extend(tail);
    }

    /// Swap two visits within this route.
    pub fn swap(&mut self, a: usize, b: usize) {
        debug_assert!(a > 0 && a < self.visits.len() - 1);
        debug_assert!(b > 0 && b < self.visits.len() - 1);
        self.visits.swap(a, b);
        self.modified = true;
    }

    /// Drop all interior visits.
    pub fn clear(&mut self) {
        let start = self.visits[0];
        let end = self.visits[self.visits.len() - 1];
        self.visits.clear();
        self.visits.push(start);
        self.visits.push(end);
        self.modified = true;
    }

    /// Number of trips, always at least one.
    pub fn num_trips(&self) -> usize {
        debug_assert!(!self.modified);
        self.trip_of[self.trip_of.len() - 1] + 1
    }

    /// Trip number of the visit at `index`.
    pub fn trip_of(&self, index: usize) -> usize {
        debug_assert!(!self.modified);
        self.trip_of[index]
    }

    /// Number of interior reload depots at positions `<= index`.
    pub fn reloads_upto(&self, index: usize) -> usize {
        debug_assert!(!self.modified);
        self.reloads_upto[index]
    }

    /// Number of clients at positions `<= index`.
    pub fn clients_upto(&self, index: usize) -> usize {
        debug_assert!(!self.modified);
        self.clients_upto[index]
    }

    /// Rebuild every cache in a single pass over the route.
    pub fn update(&mut self, data: &ProblemData) {
        let vt = data.vehicle_type(self.vehicle_type);
        let len = self.visits.len();
        let last = len - 1;
        let dims = data.num_load_dims();
        let dist_mat = data.distance_matrix(vt.profile);
        let dur_mat = data.duration_matrix(vt.profile);

        // Single-visit segments. The depot sentinels take the vehicle's
        // shift window; interior reload depots keep their own.
        self.dur_node.clear();
        for (pos, &loc) in self.visits.iter().enumerate() {
            let place = data.location(loc);
            let seg = if pos == 0 || pos == last {
                DurationSegment::new(
                    loc,
                    0,
                    place.tw_early.max(vt.tw_early),
                    place.tw_late.min(vt.tw_late),
                    0,
                )
            } else if data.is_depot(loc) {
                DurationSegment::new(loc, place.service_duration, place.tw_early, place.tw_late, 0)
            } else {
                DurationSegment::new(
                    loc,
                    place.service_duration,
                    place.tw_early,
                    place.tw_late,
                    place.release_time,
                )
            };
            self.dur_node.push(seg);
        }

        for dim in 0..dims {
            let nodes = &mut self.load_node[dim];
            nodes.clear();
            for (pos, &loc) in self.visits.iter().enumerate() {
                let seg = if pos == 0 {
                    let initial = vt.initial_load.get(dim).copied().unwrap_or(0);
                    LoadSegment::new(0, initial, initial)
                } else if data.is_depot(loc) {
                    LoadSegment::empty()
                } else {
                    LoadSegment::client(data.delivery(loc, dim), data.pickup(loc, dim))
                };
                nodes.push(seg);
            }
        }

        // Distance prefix sums.
        self.cum_dist.clear();
        self.cum_dist.push(0);
        for pos in 1..len {
            let arc = dist_mat.get(self.visits[pos - 1], self.visits[pos]);
            self.cum_dist.push(self.cum_dist[pos - 1].saturating_add(arc));
        }

        // Trip bookkeeping. Interior depots open the next trip.
        self.trip_of.clear();
        self.reloads_upto.clear();
        self.clients_upto.clear();
        let mut trip = 0;
        let mut reloads = 0;
        let mut clients = 0;
        for (pos, &loc) in self.visits.iter().enumerate() {
            if pos > 0 && pos < last && data.is_depot(loc) {
                trip += 1;
                reloads += 1;
            }
            if data.is_client(loc) {
                clients += 1;
            }
            self.trip_of.push(trip);
            self.reloads_upto.push(reloads);
            self.clients_upto.push(clients);
        }

        // Duration prefix and suffix caches.
        self.dur_prefix.clear();
        self.dur_prefix.push(self.dur_node[0]);
        for pos in 1..len {
            let merged = DurationSegment::merge(dur_mat, &self.dur_prefix[pos - 1], &self.dur_node[pos]);
            self.dur_prefix.push(merged);
        }

        self.dur_suffix.clear();
        self.dur_suffix.resize(len, self.dur_node[last]);
        for pos in (0..last).rev() {
            self.dur_suffix[pos] =
                DurationSegment::merge(dur_mat, &self.dur_node[pos], &self.dur_suffix[pos + 1]);
        }

        // Trip-aware load caches, per dimension.
        for dim in 0..dims {
            let capacity = vt.capacity.get(dim).copied().unwrap_or(0);
            let nodes = &self.load_node[dim];

            let prefix = &mut self.load_prefix[dim];
            prefix.clear();
            prefix.push(nodes[0]);
            let mut max_load = nodes[0].load();
            for pos in 1..len {
                let mut merged = LoadSegment::merge(&prefix[pos - 1], &nodes[pos]);
                if data.is_depot(self.visits[pos]) {
                    max_load = max_load.max(merged.load());
                    merged = merged.finalise(capacity);
                }
                prefix.push(merged);
            }
            self.max_trip_load[dim] = max_load;

            let open = &mut self.load_suffix_open[dim];
            let closed = &mut self.load_suffix_closed[dim];
            open.clear();
            closed.clear();
            open.resize(len, LoadSegment::empty());
            closed.resize(len, 0);
            for pos in (0..last).rev() {
                if data.is_depot(self.visits[pos]) {
                    open[pos] = LoadSegment::empty();
                    closed[pos] =
                        closed[pos + 1].saturating_add(open[pos + 1].excess_load(capacity));
                } else {
                    open[pos] = LoadSegment::merge(&nodes[pos], &open[pos + 1]);
                    closed[pos] = closed[pos + 1];
                }
            }
        }

        // Centroid and bounding radius over the clients.
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut count = 0;
        for &loc in self.interior() {
            if data.is_client(loc) {
                let place = data.location(loc);
                sum_x += place.x as f64;
                sum_y += place.y as f64;
                count += 1;
            }
        }
        if count > 0 {
            self.centroid = (sum_x / count as f64, sum_y / count as f64);
            let mut radius: f64 = 0.0;
            for &loc in self.interior() {
                if data.is_client(loc) {
                    let place = data.location(loc);
                    let dx = place.x as f64 - self.centroid.0;
                    let dy = place.y as f64 - self.centroid.1;
                    radius = radius.max((dx * dx + dy * dy).sqrt());
                }
            }
            self.radius = radius;
        } else {
            self.centroid = (0.0, 0.0);
            self.radius = 0.0;
        }

        self.modified = false;
    }

    // ---- cached segment access -------------------------------------------

    pub fn dur_at(&self, index: usize) -> &DurationSegment {
        debug_assert!(!self.modified);
        &self.dur_node[index]
    }

    pub fn dur_prefix(&self, index: usize) -> &DurationSegment {
        debug_assert!(!self.modified);
        &self.dur_prefix[index]
    }

    pub fn dur_suffix(&self, index: usize) -> &DurationSegment {
        debug_assert!(!self.modified);
        &self.dur_suffix[index]
    }

    pub fn load_at(&self, dim: usize, index: usize) -> &LoadSegment {
        debug_assert!(!self.modified);
        &self.load_node[dim][index]
    }

    pub fn load_prefix(&self, dim: usize, index: usize) -> &LoadSegment {
        debug_assert!(!self.modified);
        &self.load_prefix[dim][index]
    }

    pub fn load_suffix_open(&self, dim: usize, index: usize) -> &LoadSegment {
        debug_assert!(!self.modified);
        &self.load_suffix_open[dim][index]
    }

    pub fn load_suffix_closed(&self, dim: usize, index: usize) -> Load {
        debug_assert!(!self.modified);
        self.load_suffix_closed[dim][index]
    }

    // ---- route-level queries ---------------------------------------------

    /// Total distance over all arcs, sentinels and reloads included. An
    /// empty route travels nothing.
    pub fn distance(&self, data: &ProblemData) -> Distance {
        debug_assert!(!self.modified);
        if self.is_empty(data) {
            return 0;
        }
        self.cum_dist[self.cum_dist.len() - 1]
    }

    /// Distance beyond the vehicle's cap.
    pub fn excess_distance(&self, data: &ProblemData) -> Distance {
        let max_distance = data.vehicle_type(self.vehicle_type).max_distance;
        self.distance(data).saturating_sub(max_distance).max(0)
    }

    /// Route duration: travel, service and forced waiting.
    pub fn duration(&self, data: &ProblemData) -> Duration {
        debug_assert!(!self.modified);
        if self.is_empty(data) {
            return 0;
        }
        self.dur_prefix[self.dur_prefix.len() - 1].duration()
    }

    /// Overtime worked beyond the shift cap, clipped at the vehicle's
    /// maximum; anything further is charged as time warp.
    pub fn overtime(&self, data: &ProblemData) -> Duration {
        let vt = data.vehicle_type(self.vehicle_type);
        let excess = self
            .duration(data)
            .saturating_sub(vt.max_duration)
            .max(0);
        excess.min(vt.max_overtime)
    }

    /// Total time warp: window violations plus shift overrun beyond the
    /// allowed overtime.
    pub fn time_warp(&self, data: &ProblemData) -> Duration {
        debug_assert!(!self.modified);
        if self.is_empty(data) {
            return 0;
        }
        let vt = data.vehicle_type(self.vehicle_type);
        let full = &self.dur_prefix[self.dur_prefix.len() - 1];
        let excess = full.duration().saturating_sub(vt.max_duration).max(0);
        full.time_warp()
            .saturating_add(excess.saturating_sub(vt.max_overtime).max(0))
    }

    /// Largest instantaneous load over any trip in one dimension.
    pub fn load(&self, dim: usize) -> Load {
        debug_assert!(!self.modified);
        self.max_trip_load[dim]
    }

    /// Excess load in one dimension, summed over all trips.
    pub fn excess_load(&self, dim: usize) -> Load {
        debug_assert!(!self.modified);
        self.load_prefix[dim][self.load_prefix[dim].len() - 1].excess()
    }

    /// True iff no constraint is violated.
    pub fn is_feasible(&self, data: &ProblemData) -> bool {
        (0..data.num_load_dims()).all(|dim| self.excess_load(dim) == 0)
            && self.time_warp(data) == 0
            && self.excess_distance(data) == 0
    }

    /// Arithmetic mean of the client coordinates; (0, 0) when empty.
    pub fn centroid(&self) -> (f64, f64) {
        debug_assert!(!self.modified);
        self.centroid
    }

    /// Largest distance from the centroid to any client on the route.
    pub fn radius(&self) -> f64 {
        debug_assert!(!self.modified);
        self.radius
    }

    /// Bounding-circle proximity test: true iff the centroid distance is
    /// within `tolerance` times the larger route radius. A route always
    /// overlaps itself.
    pub fn overlaps_with(&self, other: &SearchRoute, tolerance: f64) -> bool {
        let (x1, y1) = self.centroid();
        let (x2, y2) = other.centroid();
        let dx = x1 - x2;
        let dy = y1 - y2;
        let dist = (dx * dx + dy * dy).sqrt();
        dist <= tolerance * self.radius().max(other.radius())
    }

    /// Distance travelled from the start sentinel up to `index`.
    pub fn dist_before(&self, index: usize) -> Distance {
        debug_assert!(!self.modified);
        self.cum_dist[index]
    }

    /// Distance travelled from `index` to the end sentinel.
    pub fn dist_after(&self, index: usize) -> Distance {
        debug_assert!(!self.modified);
        self.cum_dist[self.cum_dist.len() - 1].saturating_sub(self.cum_dist[index])
    }

    /// Distance over positions `start..=end`, optionally re-measured on a
    /// different matrix profile.
    pub fn dist_between(
        &self,
        data: &ProblemData,
        start: usize,
        end: usize,
        profile_override: Option<usize>,
    ) -> Distance {
        debug_assert!(!self.modified);
        match profile_override {
            None => self.cum_dist[end].saturating_sub(self.cum_dist[start]),
            Some(profile) if profile == self.profile(data) => {
                self.cum_dist[end].saturating_sub(self.cum_dist[start])
            }
            Some(profile) => {
                let matrix = data.distance_matrix(profile);
                let mut total: Distance = 0;
                for pos in start..end {
                    total = total.saturating_add(matrix.get(self.visits[pos], self.visits[pos + 1]));
                }
                total
            }
        }
    }

    /// Duration segment over positions `start..=end`, merged on demand.
    pub fn dur_between(
        &self,
        data: &ProblemData,
        start: usize,
        end: usize,
        profile_override: Option<usize>,
    ) -> DurationSegment {
        debug_assert!(!self.modified);
        let profile = profile_override.unwrap_or_else(|| self.profile(data));
        if profile == self.profile(data) {
            if start == 0 {
                return self.dur_prefix[end];
            }
            if end == self.last() {
                return self.dur_suffix[start];
            }
        }
        let matrix = data.duration_matrix(profile);
        let mut seg = self.dur_node[start];
        for pos in start + 1..=end {
            seg = DurationSegment::merge(matrix, &seg, &self.dur_node[pos]);
        }
        seg
    }

}

/// Swap two visits across distinct routes.
pub fn swap_nodes(route_a: &mut SearchRoute, a: usize, route_b: &mut SearchRoute, b: usize) {
    debug_assert!(a > 0 && a < route_a.visits.len() - 1);
    debug_assert!(b > 0 && b < route_b.visits.len() - 1);
    std::mem::swap(&mut route_a.visits[a], &mut route_b.visits[b]);
    route_a.modified = true;
    route_b.modified = true;
}
