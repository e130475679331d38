//! Concatenable route-segment summaries.
//!
//! A segment summarises a contiguous sub-sequence of a route so that the
//! cost of any concatenation of segments can be evaluated in O(1). Three
//! kinds exist: distance, load (per dimension) and duration. Concatenation
//! is not commutative (matrices may be asymmetric) but is associative.
//!
//! All arithmetic saturates so that `UNLIMITED` sentinels clamp instead of
//! wrapping.

use crate::problem::{Distance, Duration, Load, Matrix};

/// Distance summary of a contiguous sub-sequence of visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceSegment {
    first: usize,
    last: usize,
    distance: Distance,
}

impl DistanceSegment {
    /// Segment of a single visit.
    pub fn new(location: usize) -> Self {
        DistanceSegment {
            first: location,
            last: location,
            distance: 0,
        }
    }

    /// Segment over a known sub-sequence with a precomputed distance.
    pub fn slice(first: usize, last: usize, distance: Distance) -> Self {
        DistanceSegment {
            first,
            last,
            distance,
        }
    }

    /// Concatenate two adjacent segments, adding the connecting arc.
    pub fn merge(matrix: &Matrix, first: &Self, second: &Self) -> Self {
        let arc = matrix.get(first.last, second.first);
        DistanceSegment {
            first: first.first,
            last: second.last,
            distance: first.distance.saturating_add(arc).saturating_add(second.distance),
        }
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn last(&self) -> usize {
        self.last
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Distance beyond the given cap, zero when within it.
    pub fn excess_distance(&self, max_distance: Distance) -> Distance {
        self.distance.saturating_sub(max_distance).max(0)
    }
}

/// Load summary of a contiguous sub-sequence, per load dimension.
///
/// `excess` accumulates the overload of trips already closed at a reload or
/// end depot, which is what makes multi-trip routes costable in O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSegment {
    delivery: Load,
    pickup: Load,
    load: Load,
    excess: Load,
}

impl LoadSegment {
    /// Segment with no demand; the identity of concatenation.
    pub fn empty() -> Self {
        LoadSegment {
            delivery: 0,
            pickup: 0,
            load: 0,
            excess: 0,
        }
    }

    pub fn new(delivery: Load, pickup: Load, load: Load) -> Self {
        LoadSegment {
            delivery,
            pickup,
            load,
            excess: 0,
        }
    }

    /// Segment of a single client visit.
    pub fn client(delivery: Load, pickup: Load) -> Self {
        LoadSegment {
            delivery,
            pickup,
            load: delivery.max(pickup),
            excess: 0,
        }
    }

    /// Concatenate two adjacent segments within one trip.
    pub fn merge(first: &Self, second: &Self) -> Self {
        LoadSegment {
            delivery: first.delivery.saturating_add(second.delivery),
            pickup: first.pickup.saturating_add(second.pickup),
            load: (first.load.saturating_add(second.delivery))
                .max(second.load.saturating_add(first.pickup)),
            excess: first.excess.saturating_add(second.excess),
        }
    }

    /// Close the current trip at a reload or end depot: charge the load
    /// beyond `capacity` into the excess accumulator and reset the trip
    /// state for whatever follows.
    pub fn finalise(&self, capacity: Load) -> Self {
        LoadSegment {
            delivery: 0,
            pickup: 0,
            load: 0,
            excess: self
                .excess
                .saturating_add(self.load.saturating_sub(capacity).max(0)),
        }
    }

    pub fn delivery(&self) -> Load {
        self.delivery
    }

    pub fn pickup(&self) -> Load {
        self.pickup
    }

    /// Maximum instantaneous load encountered inside the segment.
    pub fn load(&self) -> Load {
        self.load
    }

    /// Excess accumulated by already-closed trips.
    pub fn excess(&self) -> Load {
        self.excess
    }

    /// Total excess when the open trip closes at the given capacity.
    pub fn excess_load(&self, capacity: Load) -> Load {
        self.excess
            .saturating_add(self.load.saturating_sub(capacity).max(0))
    }
}

/// Duration and time-window summary of a contiguous sub-sequence.
///
/// `tw_early`/`tw_late` bound the feasible start times at the segment's
/// first visit such that every internal window can still be met, possibly
/// after absorbing slack; arriving later than `tw_late` forces time warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationSegment {
    first: usize,
    last: usize,
    duration: Duration,
    time_warp: Duration,
    tw_early: Duration,
    tw_late: Duration,
    release_time: Duration,
}

impl DurationSegment {
    /// Segment of a single visit with the given service and window.
    pub fn new(
        location: usize,
        service_duration: Duration,
        tw_early: Duration,
        tw_late: Duration,
        release_time: Duration,
    ) -> Self {
        DurationSegment {
            first: location,
            last: location,
            duration: service_duration,
            time_warp: 0,
            tw_early,
            tw_late,
            release_time,
        }
    }

    /// Concatenate two adjacent segments, travelling the connecting arc.
    pub fn merge(matrix: &Matrix, first: &Self, second: &Self) -> Self {
        let arc = matrix.get(first.last, second.first);

        // Time from starting the first segment to arriving at the second,
        // ignoring any slack not yet absorbed.
        let at_second = first
            .duration
            .saturating_sub(first.time_warp)
            .saturating_add(arc);

        // Waiting incurred when even the latest start of the first segment
        // arrives before the second opens.
        let wait = second
            .tw_early
            .saturating_sub(at_second)
            .saturating_sub(first.tw_late)
            .max(0);

        // Warp incurred when even the earliest start arrives after the
        // second closes.
        let warp = first
            .tw_early
            .saturating_add(at_second)
            .saturating_sub(second.tw_late)
            .max(0);

        DurationSegment {
            first: first.first,
            last: second.last,
            duration: first
                .duration
                .saturating_add(arc)
                .saturating_add(second.duration)
                .saturating_add(wait),
            time_warp: first
                .time_warp
                .saturating_add(second.time_warp)
                .saturating_add(warp),
            tw_early: second
                .tw_early
                .saturating_sub(at_second)
                .max(first.tw_early)
                .saturating_sub(wait),
            tw_late: second
                .tw_late
                .saturating_sub(at_second)
                .min(first.tw_late)
                .saturating_add(warp),
            release_time: first.release_time.max(second.release_time),
        }
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn last(&self) -> usize {
        self.last
    }

    /// Travel, service and forced waiting time over the segment.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Total forced time-window violation, including warp forced by the
    /// release time pushing the start past the latest feasible start.
    pub fn time_warp(&self) -> Duration {
        self.time_warp
            .saturating_add(self.release_time.saturating_sub(self.tw_late).max(0))
    }

    /// Earliest feasible start at the segment's first visit.
    pub fn tw_early(&self) -> Duration {
        self.tw_early
    }

    /// Latest feasible start at the segment's first visit.
    pub fn tw_late(&self) -> Duration {
        self.tw_late
    }

    pub fn release_time(&self) -> Duration {
        self.release_time
    }

    /// Slack between the earliest and latest feasible start.
    pub fn slack(&self) -> Duration {
        self.tw_late.saturating_sub(self.tw_early)
    }
}
