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

#![allow(dead_code)]

use std::sync::Arc;

use heimdall::chrono::NaiveDate;
use heimdall::config::SnapshotParams;
use heimdall::models::{BaseModel, FeedScopedId, ModelBuilder, TripPattern};
use heimdall::realtime::{
    StopTimeScheduleRelationship, StopTimeUpdate, TripScheduleRelationship, TripUpdateMessage,
};
use heimdall::time::{PositiveDuration, SecondsSinceDayStart};
use heimdall::SnapshotSource;

pub const FEED_ID: &str = "f";
pub const SERVICE_DATE: &str = "2024-06-01";

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn date(value: &str) -> NaiveDate {
    value.parse().unwrap()
}

pub fn time(value: &str) -> SecondsSinceDayStart {
    value.parse().unwrap()
}

pub fn id(local_id: &str) -> FeedScopedId {
    FeedScopedId::new(FEED_ID, local_id)
}

/// A model with two trips on 2024-06-01 :
/// - T1 : A -> B
/// - T2 : A -> B -> C
pub fn default_model() -> BaseModel {
    ModelBuilder::new(FEED_ID)
        .trip("T1", |trip| {
            trip.calendar(&[SERVICE_DATE])
                .st("A", "10:00:00", "10:00:00")
                .st("B", "10:10:00", "10:10:00");
        })
        .trip("T2", |trip| {
            trip.calendar(&[SERVICE_DATE])
                .st("A", "11:00:00", "11:01:00")
                .st("B", "11:10:00", "11:11:00")
                .st("C", "11:20:00", "11:21:00");
        })
        .build()
}

/// A model where T1 (A -> B) runs three days in a row.
pub fn three_day_model() -> BaseModel {
    ModelBuilder::new(FEED_ID)
        .trip("T1", |trip| {
            trip.calendar(&["2024-05-31", SERVICE_DATE, "2024-06-02"])
                .st("A", "10:00:00", "10:00:00")
                .st("B", "10:10:00", "10:10:00");
        })
        .build()
}

/// A source publishing after every batch and never purging, so that tests
/// control both behaviours explicitly.
pub fn test_source() -> SnapshotSource {
    let params = SnapshotParams {
        max_snapshot_frequency: PositiveDuration::zero(),
        purge_expired_data: false,
        ..SnapshotParams::default()
    };
    SnapshotSource::new(params)
}

pub fn pattern_of(model: &BaseModel, trip_local_id: &str) -> Arc<TripPattern> {
    let trip_idx = model.trip_idx(&id(trip_local_id)).unwrap();
    model.pattern_for_trip(trip_idx).unwrap().clone()
}

pub fn stop_time_update(
    stop_sequence: usize,
    arrival: Option<&str>,
    departure: Option<&str>,
) -> StopTimeUpdate {
    StopTimeUpdate {
        stop_sequence,
        stop_id: None,
        arrival_time: arrival.map(time),
        departure_time: departure.map(time),
        schedule_relationship: StopTimeScheduleRelationship::Scheduled,
    }
}

pub fn added_stop_time_update(
    stop_sequence: usize,
    stop_id: &str,
    arrival: &str,
    departure: &str,
) -> StopTimeUpdate {
    StopTimeUpdate {
        stop_sequence,
        stop_id: Some(stop_id.to_string()),
        arrival_time: Some(time(arrival)),
        departure_time: Some(time(departure)),
        schedule_relationship: StopTimeScheduleRelationship::Scheduled,
    }
}

pub fn delay_update(
    trip_id: &str,
    service_date: &str,
    stop_time_updates: Vec<StopTimeUpdate>,
) -> TripUpdateMessage {
    TripUpdateMessage {
        trip_id: trip_id.to_string(),
        route_id: None,
        service_date: date(service_date),
        schedule_relationship: TripScheduleRelationship::Scheduled,
        stop_time_updates,
    }
}

pub fn added_trip_update(
    trip_id: &str,
    service_date: &str,
    stop_time_updates: Vec<StopTimeUpdate>,
) -> TripUpdateMessage {
    TripUpdateMessage {
        trip_id: trip_id.to_string(),
        route_id: None,
        service_date: date(service_date),
        schedule_relationship: TripScheduleRelationship::Added,
        stop_time_updates,
    }
}

pub fn cancel_update(trip_id: &str, service_date: &str) -> TripUpdateMessage {
    TripUpdateMessage {
        trip_id: trip_id.to_string(),
        route_id: None,
        service_date: date(service_date),
        schedule_relationship: TripScheduleRelationship::Canceled,
        stop_time_updates: Vec::new(),
    }
}
