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

//! Validated realtime messages, as handed over by the feed readers.
//!
//! Parsing the upstream wire formats is not this crate's concern : the
//! readers deliver messages already decoded into the forms below, with
//! identifiers still unresolved (plain strings scoped by the feed the
//! batch belongs to) and times already expressed relative to the service
//! date.

use chrono::NaiveDate;

use crate::time::SecondsSinceDayStart;

/// Whether a batch replaces all previous realtime data of its feed, or
/// only changes part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateIncrementality {
    /// The batch contains the full realtime state of the feed : previous
    /// realtime data of the feed is dropped before the batch is applied.
    FullDataset,
    /// The batch only carries changes; previous realtime data is kept.
    Differential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripScheduleRelationship {
    /// The trip runs its schedule, with delays.
    Scheduled,
    /// A trip unknown to the schedule.
    Added,
    /// The trip does not run on this date.
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopTimeScheduleRelationship {
    #[default]
    Scheduled,
    /// The trip does not call at this stop.
    Skipped,
    /// No realtime information at this stop.
    NoData,
}

/// One stop-level change of a schedule-based trip update.
#[derive(Debug, Clone, Default)]
pub struct StopTimeUpdate {
    /// Position of the stop in the trip's pattern.
    pub stop_sequence: usize,
    /// Stop reference, mandatory for added trips, optional otherwise.
    pub stop_id: Option<String>,
    pub arrival_time: Option<SecondsSinceDayStart>,
    pub departure_time: Option<SecondsSinceDayStart>,
    pub schedule_relationship: StopTimeScheduleRelationship,
}

/// A schedule-based (trip-update dialect) realtime message for one trip on
/// one service date.
#[derive(Debug, Clone)]
pub struct TripUpdateMessage {
    pub trip_id: String,
    /// Route reference, used when an added trip cannot be tied to a known
    /// trip.
    pub route_id: Option<String>,
    pub service_date: NaiveDate,
    pub schedule_relationship: TripScheduleRelationship,
    pub stop_time_updates: Vec<StopTimeUpdate>,
}

/// Reference to a dated run of a vehicle journey : the journey reference
/// together with the data frame (a service date) it belongs to.
#[derive(Debug, Clone)]
pub struct FramedVehicleJourneyRef {
    pub data_frame_ref: String,
    pub dated_vehicle_journey_ref: String,
}

/// One call of an estimated vehicle journey at a quay.
#[derive(Debug, Clone, Default)]
pub struct EstimatedCall {
    pub quay_ref: String,
    pub aimed_arrival_time: Option<SecondsSinceDayStart>,
    pub expected_arrival_time: Option<SecondsSinceDayStart>,
    pub aimed_departure_time: Option<SecondsSinceDayStart>,
    pub expected_departure_time: Option<SecondsSinceDayStart>,
    pub cancellation: bool,
}

impl EstimatedCall {
    pub fn best_arrival_time(&self) -> Option<SecondsSinceDayStart> {
        self.expected_arrival_time
            .or(self.aimed_arrival_time)
            .or(self.expected_departure_time)
            .or(self.aimed_departure_time)
    }

    pub fn best_departure_time(&self) -> Option<SecondsSinceDayStart> {
        self.expected_departure_time
            .or(self.aimed_departure_time)
            .or(self.expected_arrival_time)
            .or(self.aimed_arrival_time)
    }
}

/// An estimated-timetable (SIRI-ET dialect) message for one vehicle
/// journey.
#[derive(Debug, Clone, Default)]
pub struct EstimatedVehicleJourney {
    pub framed_vehicle_journey_ref: Option<FramedVehicleJourneyRef>,
    pub dated_vehicle_journey_ref: Option<String>,
    pub estimated_vehicle_journey_code: Option<String>,
    pub line_ref: Option<String>,
    /// The whole journey is canceled on its date.
    pub cancellation: bool,
    /// The journey is not part of the schedule at all.
    pub extra_journey: bool,
    pub recorded_calls: Vec<EstimatedCall>,
    pub estimated_calls: Vec<EstimatedCall>,
}

impl EstimatedVehicleJourney {
    pub fn calls(&self) -> impl Iterator<Item = &EstimatedCall> {
        self.recorded_calls.iter().chain(self.estimated_calls.iter())
    }

    /// The most precise textual reference to the journey, for error
    /// reports.
    pub fn reference(&self) -> &str {
        if let Some(framed) = &self.framed_vehicle_journey_ref {
            return &framed.dated_vehicle_journey_ref;
        }
        if let Some(dated) = &self.dated_vehicle_journey_ref {
            return dated;
        }
        if let Some(code) = &self.estimated_vehicle_journey_code {
            return code;
        }
        "<unreferenced journey>"
    }
}

/// One estimated-timetable delivery, grouping journeys of a feed.
#[derive(Debug, Clone, Default)]
pub struct EstimatedTimetableDelivery {
    pub estimated_journeys: Vec<EstimatedVehicleJourney>,
}

/// A batch of updates of either dialect, as handed to
/// [`SnapshotSource::apply_updates`](crate::snapshot::SnapshotSource::apply_updates).
#[derive(Debug, Clone)]
pub enum UpdateBatch {
    TripUpdates {
        feed_id: String,
        incrementality: UpdateIncrementality,
        updates: Vec<TripUpdateMessage>,
    },
    EstimatedTimetables {
        feed_id: String,
        incrementality: UpdateIncrementality,
        deliveries: Vec<EstimatedTimetableDelivery>,
    },
}
