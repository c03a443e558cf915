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

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::models::base_model::{BaseModel, StopPoint, Trip, TripOnServiceDate};
use crate::models::{
    FeedScopedId, StopPointIdx, TripIdAndServiceDate, TripIdx, TripPattern, TripTimes,
};
use crate::snapshot::Timetable;
use crate::time::SecondsSinceDayStart;

const DEFAULT_ROUTE_ID: &str = "default_route";
const DEFAULT_SERVICE_DAY: &str = "2020-01-01";

/// Builder used to easily create a `BaseModel`.
/// Note: if not explicitly set, a trip runs on a default calendar
/// containing only 2020-01-01.
pub struct ModelBuilder {
    feed_id: String,
    stops: Vec<StopPoint>,
    stop_id_to_idx: HashMap<FeedScopedId, StopPointIdx>,
    trips: Vec<TripRecord>,
    dated_journeys: Vec<(String, String, NaiveDate)>,
}

struct TripRecord {
    local_id: String,
    route_local_id: String,
    service_days: BTreeSet<NaiveDate>,
    stops: Vec<StopPointIdx>,
    arrival_times: Vec<SecondsSinceDayStart>,
    departure_times: Vec<SecondsSinceDayStart>,
}

/// Builder used to create and modify a new trip of the model.
pub struct TripBuilder<'a> {
    model: &'a mut ModelBuilder,
    record: TripRecord,
}

impl ModelBuilder {
    pub fn new(feed_id: &str) -> Self {
        Self {
            feed_id: feed_id.to_string(),
            stops: Vec::new(),
            stop_id_to_idx: HashMap::new(),
            trips: Vec::new(),
            dated_journeys: Vec::new(),
        }
    }

    /// Add a new trip to the model
    ///
    /// ```
    /// # use heimdall::models::ModelBuilder;
    ///
    /// # fn main() {
    /// let model = ModelBuilder::new("f")
    ///     .trip("toto", |trip| {
    ///         trip.st("A", "10:00:00", "10:00:30")
    ///             .st("B", "11:00:00", "11:00:30");
    ///     })
    ///     .trip("tata", |trip| {
    ///         trip.st("C", "08:00:00", "08:00:30")
    ///             .st("B", "09:00:00", "09:00:30");
    ///     })
    ///     .build();
    /// # }
    /// ```
    pub fn trip<F>(mut self, local_id: &str, mut trip_initer: F) -> Self
    where
        F: FnMut(&mut TripBuilder),
    {
        let default_day = date(DEFAULT_SERVICE_DAY);
        let record = TripRecord {
            local_id: local_id.to_string(),
            route_local_id: DEFAULT_ROUTE_ID.to_string(),
            service_days: std::iter::once(default_day).collect(),
            stops: Vec::new(),
            arrival_times: Vec::new(),
            departure_times: Vec::new(),
        };
        let mut trip_builder = TripBuilder {
            model: &mut self,
            record,
        };
        trip_initer(&mut trip_builder);
        let record = trip_builder.record;
        assert!(
            !self
                .trips
                .iter()
                .any(|other| other.local_id == record.local_id),
            "trip {} already exists",
            record.local_id
        );
        self.trips.push(record);
        self
    }

    /// Register a stop point explicitly. Stops named in `st` calls are
    /// registered on the fly, so this is only needed for stops without any
    /// scheduled trip.
    pub fn stop_point(mut self, local_id: &str) -> Self {
        self.get_or_create_stop(local_id);
        self
    }

    /// Register a dated vehicle journey identifier for a `(trip, date)`
    /// pair. Each trip also gets one under its own id for its first
    /// service day.
    pub fn trip_on_service_date(
        mut self,
        local_id: &str,
        trip_local_id: &str,
        service_date: &str,
    ) -> Self {
        self.dated_journeys.push((
            local_id.to_string(),
            trip_local_id.to_string(),
            date(service_date),
        ));
        self
    }

    pub fn build(self) -> BaseModel {
        let feed_id = self.feed_id;

        let mut trips = Vec::new();
        let mut trip_id_to_idx = HashMap::new();
        for record in &self.trips {
            let trip_id = FeedScopedId::new(&feed_id, &record.local_id);
            let trip_idx = TripIdx { idx: trips.len() };
            trip_id_to_idx.insert(trip_id.clone(), trip_idx);
            trips.push(Trip {
                id: trip_id,
                route_id: FeedScopedId::new(&feed_id, &record.route_local_id),
                service_days: record.service_days.clone(),
            });
        }

        // one pattern per (route, stop sequence)
        let mut pattern_keys: Vec<(String, Vec<StopPointIdx>)> = Vec::new();
        let mut members: Vec<Vec<usize>> = Vec::new();
        for (trip_pos, record) in self.trips.iter().enumerate() {
            let key = (record.route_local_id.clone(), record.stops.clone());
            match pattern_keys.iter().position(|other| *other == key) {
                Some(pattern_pos) => members[pattern_pos].push(trip_pos),
                None => {
                    pattern_keys.push(key);
                    members.push(vec![trip_pos]);
                }
            }
        }

        let mut patterns = Vec::new();
        let mut pattern_for_trip = HashMap::new();
        for (pattern_pos, (route_local_id, stops)) in pattern_keys.into_iter().enumerate() {
            let trip_times = members[pattern_pos]
                .iter()
                .map(|trip_pos| {
                    let record = &self.trips[*trip_pos];
                    Arc::new(TripTimes::new_scheduled(
                        FeedScopedId::new(&feed_id, &record.local_id),
                        record.arrival_times.clone(),
                        record.departure_times.clone(),
                    ))
                })
                .collect();
            let pattern = Arc::new(TripPattern::new_scheduled(
                FeedScopedId::new(&feed_id, &format!("pattern:{}:{}", route_local_id, pattern_pos)),
                FeedScopedId::new(&feed_id, &route_local_id),
                stops,
                Timetable::scheduled(trip_times),
            ));
            for trip_pos in &members[pattern_pos] {
                pattern_for_trip.insert(TripIdx { idx: *trip_pos }, pattern_pos);
            }
            patterns.push(pattern);
        }

        let mut trips_on_service_date = HashMap::new();
        let mut trip_on_date_to_id = HashMap::new();
        for (trip_pos, record) in self.trips.iter().enumerate() {
            if let Some(first_day) = record.service_days.iter().next() {
                let id = FeedScopedId::new(&feed_id, &record.local_id);
                trip_on_date_to_id.insert(
                    TripIdAndServiceDate {
                        trip_id: id.clone(),
                        service_date: *first_day,
                    },
                    id.clone(),
                );
                trips_on_service_date.insert(
                    id.clone(),
                    TripOnServiceDate {
                        id,
                        trip: TripIdx { idx: trip_pos },
                        service_date: *first_day,
                    },
                );
            }
        }
        for (local_id, trip_local_id, service_date) in &self.dated_journeys {
            let trip_id = FeedScopedId::new(&feed_id, trip_local_id);
            let trip_idx = *trip_id_to_idx
                .get(&trip_id)
                .unwrap_or_else(|| panic!("dated journey for unknown trip {}", trip_local_id));
            let id = FeedScopedId::new(&feed_id, local_id);
            trip_on_date_to_id.insert(
                TripIdAndServiceDate {
                    trip_id,
                    service_date: *service_date,
                },
                id.clone(),
            );
            trips_on_service_date.insert(
                id.clone(),
                TripOnServiceDate {
                    id,
                    trip: trip_idx,
                    service_date: *service_date,
                },
            );
        }

        BaseModel::new(
            vec![feed_id],
            self.stops,
            self.stop_id_to_idx,
            trips,
            trip_id_to_idx,
            patterns,
            pattern_for_trip,
            trips_on_service_date,
            trip_on_date_to_id,
        )
    }

    fn get_or_create_stop(&mut self, local_id: &str) -> StopPointIdx {
        let id = FeedScopedId::new(&self.feed_id, local_id);
        if let Some(idx) = self.stop_id_to_idx.get(&id) {
            return *idx;
        }
        let idx = StopPointIdx {
            idx: self.stops.len(),
        };
        self.stops.push(StopPoint {
            id: id.clone(),
            name: local_id.to_string(),
        });
        self.stop_id_to_idx.insert(id, idx);
        idx
    }
}

impl<'a> TripBuilder<'a> {
    /// Set the route of the trip.
    pub fn route(&mut self, local_id: &str) -> &mut Self {
        self.record.route_local_id = local_id.to_string();
        self
    }

    /// Set the service days of the trip, replacing the default calendar.
    pub fn calendar(&mut self, days: &[&str]) -> &mut Self {
        self.record.service_days = days.iter().map(|day| date(day)).collect();
        self
    }

    /// Add a stop time at the end of the trip.
    pub fn st(&mut self, stop_local_id: &str, arrival: &str, departure: &str) -> &mut Self {
        let stop_idx = self.model.get_or_create_stop(stop_local_id);
        self.record.stops.push(stop_idx);
        self.record.arrival_times.push(time(arrival));
        self.record.departure_times.push(time(departure));
        self
    }
}

fn date(value: &str) -> NaiveDate {
    value
        .parse()
        .unwrap_or_else(|_| panic!("cannot parse '{}' as a date", value))
}

fn time(value: &str) -> SecondsSinceDayStart {
    value
        .parse()
        .unwrap_or_else(|_| panic!("cannot parse '{}' as a time", value))
}
