//! Finalised, immutable solutions with cached aggregate metrics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::problem::{Cost, Distance, Duration, Load, ProblemData};
use crate::segment::{DurationSegment, LoadSegment};

/// One serviced visit in a route schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledVisit {
    pub location: usize,
    pub trip: usize,
    pub start_service: Duration,
    pub end_service: Duration,
    pub wait_duration: Duration,
    pub time_warp: Duration,
}

/// A finalised route: an interior visit sequence (clients, possibly
/// interleaved with reload-depot visits marking trip boundaries) tagged
/// with its vehicle type, plus cached aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    vehicle_type: usize,
    start_depot: usize,
    end_depot: usize,
    visits: Vec<usize>,

    distance: Distance,
    excess_distance: Distance,
    duration: Duration,
    travel_duration: Duration,
    service_duration: Duration,
    wait_duration: Duration,
    time_warp: Duration,
    overtime: Duration,
    start_time: Duration,
    end_time: Duration,
    slack: Duration,
    delivery: Vec<Load>,
    pickup: Vec<Load>,
    load: Vec<Load>,
    excess_load: Vec<Load>,
    prizes: Cost,
    num_trips: usize,
    num_clients: usize,
    centroid: (f64, f64),
}

impl Route {
    /// Finalise a route from its interior visit sequence, computing every
    /// cached aggregate in one pass.
    pub fn new(data: &ProblemData, vehicle_type: usize, visits: Vec<usize>) -> Self {
        let vt = data.vehicle_type(vehicle_type);
        let dims = data.num_load_dims();
        let dist_mat = data.distance_matrix(vt.profile);
        let dur_mat = data.duration_matrix(vt.profile);

        let mut sequence = Vec::with_capacity(visits.len() + 2);
        sequence.push(vt.start_depot);
        sequence.extend_from_slice(&visits);
        sequence.push(vt.end_depot);
        let last = sequence.len() - 1;

        let is_empty = visits.iter().all(|&loc| data.is_depot(loc));

        let mut distance: Distance = 0;
        let mut service_duration: Duration = 0;
        let mut prizes: Cost = 0;
        let mut num_trips = 1;
        for pos in 1..sequence.len() {
            distance = distance.saturating_add(dist_mat.get(sequence[pos - 1], sequence[pos]));
        }
        for &loc in &visits {
            if data.is_depot(loc) {
                num_trips += 1;
            } else {
                prizes = prizes.saturating_add(data.location(loc).prize);
            }
            service_duration = service_duration.saturating_add(data.location(loc).service_duration);
        }

        // Duration segment over the whole sequence, shift window applied
        // at the sentinels.
        let node_seg = |pos: usize| -> DurationSegment {
            let loc = sequence[pos];
            let place = data.location(loc);
            if pos == 0 || pos == last {
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
            }
        };

        let mut dur = node_seg(0);
        for pos in 1..sequence.len() {
            dur = DurationSegment::merge(dur_mat, &dur, &node_seg(pos));
        }

        // Trip-aware load totals per dimension.
        let mut delivery: Vec<Load> = vec![0; dims];
        let mut pickup: Vec<Load> = vec![0; dims];
        let mut load: Vec<Load> = vec![0; dims];
        let mut excess_load: Vec<Load> = vec![0; dims];
        for dim in 0..dims {
            let capacity = vt.capacity.get(dim).copied().unwrap_or(0);
            let initial = vt.initial_load.get(dim).copied().unwrap_or(0);
            let mut segment = LoadSegment::new(0, initial, initial);
            for &loc in sequence.iter().skip(1) {
                if data.is_depot(loc) {
                    load[dim] = load[dim].max(segment.load());
                    segment = segment.finalise(capacity);
                } else {
                    delivery[dim] = delivery[dim].saturating_add(data.delivery(loc, dim));
                    pickup[dim] = pickup[dim].saturating_add(data.pickup(loc, dim));
                    segment = LoadSegment::merge(
                        &segment,
                        &LoadSegment::client(data.delivery(loc, dim), data.pickup(loc, dim)),
                    );
                }
            }
            excess_load[dim] = segment.excess();
        }

        let (duration, time_warp, travel_duration, wait_duration, start_time, end_time, slack) =
            if is_empty {
                (0, 0, 0, 0, 0, 0, 0)
            } else {
                let duration = dur.duration();
                let excess = duration.saturating_sub(vt.max_duration).max(0);
                let time_warp = dur
                    .time_warp()
                    .saturating_add(excess.saturating_sub(vt.max_overtime).max(0));
                let mut travel: Duration = 0;
                for pos in 1..sequence.len() {
                    travel = travel.saturating_add(dur_mat.get(sequence[pos - 1], sequence[pos]));
                }
                let wait = duration
                    .saturating_sub(travel)
                    .saturating_sub(service_duration)
                    .max(0);
                let start = dur.tw_early().max(dur.release_time().min(dur.tw_late()));
                let end = start
                    .saturating_add(duration)
                    .saturating_sub(dur.time_warp());
                (duration, time_warp, travel, wait, start, end, dur.slack())
            };

        let overtime = if is_empty {
            0
        } else {
            duration
                .saturating_sub(vt.max_duration)
                .max(0)
                .min(vt.max_overtime)
        };

        let excess_distance = if is_empty {
            0
        } else {
            distance.saturating_sub(vt.max_distance).max(0)
        };

        // Centroid of the client visits.
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut count = 0;
        for &loc in &visits {
            if data.is_client(loc) {
                let place = data.location(loc);
                sum_x += place.x as f64;
                sum_y += place.y as f64;
                count += 1;
            }
        }
        let centroid = if count > 0 {
            (sum_x / count as f64, sum_y / count as f64)
        } else {
            (0.0, 0.0)
        };
        let num_clients = count;

        Route {
            vehicle_type,
            start_depot: vt.start_depot,
            end_depot: vt.end_depot,
            visits,
            distance: if is_empty { 0 } else { distance },
            excess_distance,
            duration,
            travel_duration,
            service_duration: if is_empty { 0 } else { service_duration },
            wait_duration,
            time_warp,
            overtime,
            start_time,
            end_time,
            slack,
            delivery,
            pickup,
            load,
            excess_load,
            prizes,
            num_trips,
            num_clients,
            centroid,
        }
    }

    /// The interior visit sequence, sentinels excluded.
    pub fn visits(&self) -> &[usize] {
        &self.visits
    }

    /// Client visits only, reload depots filtered out.
    pub fn clients<'a>(&'a self, data: &'a ProblemData) -> impl Iterator<Item = usize> + 'a {
        self.visits.iter().copied().filter(|&loc| data.is_client(loc))
    }

    /// True iff the route serves no clients.
    pub fn is_empty(&self) -> bool {
        self.num_clients == 0
    }

    pub fn num_clients(&self) -> usize {
        self.num_clients
    }

    pub fn vehicle_type(&self) -> usize {
        self.vehicle_type
    }

    pub fn start_depot(&self) -> usize {
        self.start_depot
    }

    pub fn end_depot(&self) -> usize {
        self.end_depot
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    pub fn excess_distance(&self) -> Distance {
        self.excess_distance
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn travel_duration(&self) -> Duration {
        self.travel_duration
    }

    pub fn service_duration(&self) -> Duration {
        self.service_duration
    }

    pub fn wait_duration(&self) -> Duration {
        self.wait_duration
    }

    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    pub fn overtime(&self) -> Duration {
        self.overtime
    }

    pub fn start_time(&self) -> Duration {
        self.start_time
    }

    pub fn end_time(&self) -> Duration {
        self.end_time
    }

    pub fn slack(&self) -> Duration {
        self.slack
    }

    pub fn delivery(&self) -> &[Load] {
        &self.delivery
    }

    pub fn pickup(&self) -> &[Load] {
        &self.pickup
    }

    /// Largest instantaneous load per dimension over any single trip.
    pub fn load(&self) -> &[Load] {
        &self.load
    }

    pub fn excess_load(&self, dim: usize) -> Load {
        self.excess_load.get(dim).copied().unwrap_or(0)
    }

    pub fn prizes(&self) -> Cost {
        self.prizes
    }

    pub fn num_trips(&self) -> usize {
        self.num_trips
    }

    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
    }

    /// True iff no constraint is violated on this route.
    pub fn is_feasible(&self) -> bool {
        self.time_warp == 0
            && self.excess_distance == 0
            && self.excess_load.iter().all(|&e| e == 0)
    }

    /// Distance-proportional part of the route cost.
    pub fn distance_cost(&self, data: &ProblemData) -> Cost {
        data.vehicle_type(self.vehicle_type)
            .unit_distance_cost
            .saturating_mul(self.distance)
    }

    /// Duration-proportional part of the route cost.
    pub fn duration_cost(&self, data: &ProblemData) -> Cost {
        data.vehicle_type(self.vehicle_type)
            .unit_duration_cost
            .saturating_mul(self.duration)
    }

    /// Reconstruct the service schedule by simulating the route from its
    /// start time: arrival, forced waiting and forced warp per visit.
    pub fn schedule(&self, data: &ProblemData) -> Vec<ScheduledVisit> {
        let vt = data.vehicle_type(self.vehicle_type);
        let dur_mat = data.duration_matrix(vt.profile);

        let mut sequence = Vec::with_capacity(self.visits.len() + 2);
        sequence.push(self.start_depot);
        sequence.extend_from_slice(&self.visits);
        sequence.push(self.end_depot);
        let last = sequence.len() - 1;

        let mut schedule = Vec::with_capacity(sequence.len());
        let mut clock = self.start_time;
        let mut trip = 0;

        for (pos, &loc) in sequence.iter().enumerate() {
            let place = data.location(loc);
            let (tw_early, tw_late, service) = if pos == 0 || pos == last {
                (
                    place.tw_early.max(vt.tw_early),
                    place.tw_late.min(vt.tw_late),
                    0,
                )
            } else {
                (place.tw_early, place.tw_late, place.service_duration)
            };

            if pos > 0 {
                clock = clock.saturating_add(dur_mat.get(sequence[pos - 1], loc));
                if pos < last && data.is_depot(loc) {
                    trip += 1;
                }
            }

            let wait = tw_early.saturating_sub(clock).max(0);
            let warp = clock.saturating_sub(tw_late).max(0);
            let start_service = clock.saturating_add(wait).saturating_sub(warp);
            let end_service = start_service.saturating_add(service);

            schedule.push(ScheduledVisit {
                location: loc,
                trip,
                start_service,
                end_service,
                wait_duration: wait,
                time_warp: warp,
            });

            clock = end_service;
        }

        schedule
    }
}

/// An immutable snapshot of a full solution with cached totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    routes: Vec<Route>,

    distance: Distance,
    excess_distance: Distance,
    duration: Duration,
    time_warp: Duration,
    overtime: Duration,
    excess_load: Vec<Load>,
    fixed_cost: Cost,
    prizes: Cost,
    uncollected_prizes: Cost,
    feasible: bool,
    complete: bool,
}

impl Solution {
    /// Finalise a solution from `(vehicle_type, interior visits)` pairs.
    /// Empty routes are kept but contribute nothing.
    pub fn new(data: &ProblemData, routes: Vec<(usize, Vec<usize>)>) -> Self {
        let finalised: Vec<Route> = routes
            .into_iter()
            .map(|(vehicle_type, visits)| Route::new(data, vehicle_type, visits))
            .collect();

        let dims = data.num_load_dims();
        let mut distance: Distance = 0;
        let mut excess_distance: Distance = 0;
        let mut duration: Duration = 0;
        let mut time_warp: Duration = 0;
        let mut overtime: Duration = 0;
        let mut excess_load: Vec<Load> = vec![0; dims];
        let mut fixed_cost: Cost = 0;
        let mut prizes: Cost = 0;

        let mut visit_counts = vec![0usize; data.num_locations()];

        for route in &finalised {
            distance = distance.saturating_add(route.distance());
            excess_distance = excess_distance.saturating_add(route.excess_distance());
            duration = duration.saturating_add(route.duration());
            time_warp = time_warp.saturating_add(route.time_warp());
            overtime = overtime.saturating_add(route.overtime());
            for dim in 0..dims {
                excess_load[dim] = excess_load[dim].saturating_add(route.excess_load(dim));
            }
            if !route.is_empty() {
                fixed_cost =
                    fixed_cost.saturating_add(data.vehicle_type(route.vehicle_type()).fixed_cost);
            }
            prizes = prizes.saturating_add(route.prizes());
            for client in route.clients(data) {
                visit_counts[client] += 1;
            }
        }

        // Completeness: every required client exactly once, optional ones
        // at most once, group rules honoured.
        let mut complete = true;
        let mut uncollected_prizes: Cost = 0;
        for client in data.client_indices() {
            let place = data.location(client);
            let count = visit_counts[client];
            if place.required && count != 1 {
                complete = false;
            }
            if !place.required && count > 1 {
                complete = false;
            }
            if count == 0 {
                uncollected_prizes = uncollected_prizes.saturating_add(place.prize);
            }
        }
        for group in data.groups() {
            let visited = group
                .clients
                .iter()
                .filter(|&&c| visit_counts[c] > 0)
                .count();
            if group.required && visited == 0 {
                complete = false;
            }
            if group.mutually_exclusive && visited > 1 {
                complete = false;
            }
        }

        let feasible = time_warp == 0
            && excess_distance == 0
            && excess_load.iter().all(|&e| e == 0);

        Solution {
            routes: finalised,
            distance,
            excess_distance,
            duration,
            time_warp,
            overtime,
            excess_load,
            fixed_cost,
            prizes,
            uncollected_prizes,
            feasible,
            complete,
        }
    }

    /// A solution with no routes at all.
    pub fn empty(data: &ProblemData) -> Self {
        Solution::new(data, Vec::new())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, index: usize) -> &Route {
        &self.routes[index]
    }

    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Routes that actually serve clients.
    pub fn num_nonempty_routes(&self) -> usize {
        self.routes.iter().filter(|r| !r.is_empty()).count()
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    pub fn excess_distance(&self) -> Distance {
        self.excess_distance
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    pub fn overtime(&self) -> Duration {
        self.overtime
    }

    pub fn excess_load(&self) -> &[Load] {
        &self.excess_load
    }

    pub fn fixed_cost(&self) -> Cost {
        self.fixed_cost
    }

    pub fn prizes(&self) -> Cost {
        self.prizes
    }

    pub fn uncollected_prizes(&self) -> Cost {
        self.uncollected_prizes
    }

    /// True iff no constraint is violated anywhere.
    pub fn is_feasible(&self) -> bool {
        self.feasible
    }

    /// True iff every required client (and group) is served exactly once.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Solution:")?;
        writeln!(f, "  Distance: {}", self.distance)?;
        writeln!(f, "  Duration: {}", self.duration)?;
        writeln!(f, "  Time warp: {}", self.time_warp)?;
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Complete: {}", self.complete)?;
        writeln!(f, "  Routes: {}", self.num_nonempty_routes())?;

        for (i, route) in self.routes.iter().enumerate() {
            if route.is_empty() {
                continue;
            }
            writeln!(
                f,
                "  Route {}: {:?} (distance: {}, trips: {})",
                i,
                route.visits(),
                route.distance(),
                route.num_trips()
            )?;
        }

        Ok(())
    }
}
