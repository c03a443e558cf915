// Copyright  (C) 2020, Kisio Digital and/or its affiliates. All rights reserved.
//
// This file is part of Navitia,
// the software to build cool stuff with public transport.
//
// Hope you'll enjoy and contribute to this project,
// powered by Kisio Digital (www.kisio.com).
// Help us simplify mobility and open public transport:
// a non ending quest to the responsive locomotion way of traveling!
//
// This contribution is a part of the research and development work of the
// IVA Project which aims to enhance traveler information and is carried out
// under the leadership of the Technological Research Institute SystemX,
// with the partnership and support of the transport organization authority
// Ile-De-France Mobilités (IDFM), SNCF, and public funds
// under the scope of the French Program "Investissements d’Avenir".
//
// LICENCE: This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.
//
// Stay tuned using
// twitter @navitia
// channel `#navitia` on riot https://riot.im/app/#/room/#navitia:matrix.org
// https://groups.google.com/d/forum/navitia
// www.navitia.io

pub mod entity_resolver;
pub mod estimated_timetable_handler;
pub mod messages;
pub mod pattern_cache;
pub mod trip_update_handler;

pub use entity_resolver::{EntityResolver, FuzzyTripMatcher};
pub use messages::{
    EstimatedCall, EstimatedTimetableDelivery, EstimatedVehicleJourney, FramedVehicleJourneyRef,
    StopTimeScheduleRelationship, StopTimeUpdate, TripScheduleRelationship, TripUpdateMessage,
    UpdateBatch, UpdateIncrementality,
};
pub use pattern_cache::TripPatternCache;

use std::fmt::{Display, Formatter};

use crate::models::FeedScopedId;

/// Why one realtime update could not be applied. A failed update leaves
/// the buffer untouched for its trip; the rest of the batch goes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// The trip reference did not resolve against the static model.
    UnknownTrip(String),
    /// A quay/stop reference did not resolve against the static model.
    UnknownStop(String),
    /// The update refers to a position outside the trip's stop pattern.
    InvalidStopSequence {
        trip_id: FeedScopedId,
        stop_sequence: usize,
    },
    /// The proposed times are decreasing along the trip, even after delay
    /// propagation.
    NonMonotonicTimes {
        trip_id: FeedScopedId,
        upstream: usize,
        downstream: usize,
    },
    /// The stop pattern of the update diverges from the scheduled pattern
    /// more than the updater is willing to follow.
    PatternChangedTooFar { trip_id: FeedScopedId },
    /// A date reference could not be parsed.
    DateUnparseable(String),
    /// A write reached an already published timetable. This is a
    /// programming error of the updater, not a data error.
    ReadOnly,
}

impl Display for UpdateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::UnknownTrip(reference) => {
                write!(f, "trip reference '{}' does not resolve", reference)
            }
            UpdateError::UnknownStop(reference) => {
                write!(f, "stop reference '{}' does not resolve", reference)
            }
            UpdateError::InvalidStopSequence {
                trip_id,
                stop_sequence,
            } => write!(
                f,
                "update for trip {} refers to stop sequence {} outside its pattern",
                trip_id, stop_sequence
            ),
            UpdateError::NonMonotonicTimes {
                trip_id,
                upstream,
                downstream,
            } => write!(
                f,
                "updated times for trip {} decrease between positions {} and {}",
                trip_id, upstream, downstream
            ),
            UpdateError::PatternChangedTooFar { trip_id } => write!(
                f,
                "update for trip {} changes its stop pattern too far",
                trip_id
            ),
            UpdateError::DateUnparseable(value) => {
                write!(f, "cannot parse '{}' as a service date", value)
            }
            UpdateError::ReadOnly => {
                write!(f, "write attempted on an already published timetable")
            }
        }
    }
}

impl std::error::Error for UpdateError {}

/// Non-fatal observations made while applying a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateWarning {
    /// Some stops of an added trip were unknown and its calls there were
    /// dropped.
    UnknownStopsRemovedFromAddedTrip {
        trip_id: FeedScopedId,
        nb_of_removed_stops: usize,
    },
}

/// Outcome of applying one batch of updates. Per-update errors do not
/// abort the batch : the remaining updates are still applied.
#[derive(Debug, Default)]
pub struct UpdateResult {
    pub successes: usize,
    pub warnings: Vec<UpdateWarning>,
    pub errors: Vec<UpdateError>,
}

impl UpdateResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fully_applied(&self) -> bool {
        self.errors.is_empty()
    }
}
