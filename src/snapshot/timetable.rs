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

use std::sync::Arc;

use chrono::NaiveDate;

use crate::models::{FeedScopedId, TripTimes};

/// The trip times of one pattern valid on one service date.
///
/// A timetable with no service date is the scheduled baseline, valid on
/// every date without realtime changes. Timetables carrying a service date
/// are created by copying another timetable of the same pattern
/// (copy-on-write, see
/// [`TimetableBuffer`](crate::snapshot::TimetableBuffer)); once such a copy
/// is reachable from a published snapshot it is only ever shared, never
/// mutated. Mutable access goes through `Arc::get_mut` in the buffer, so
/// the type system rules out writes to a published timetable.
///
/// Within one timetable, trip ids are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timetable {
    service_date: Option<NaiveDate>,
    trip_times: Vec<Arc<TripTimes>>,
}

impl Timetable {
    /// The scheduled baseline of a pattern, valid on all dates.
    pub fn scheduled(trip_times: Vec<Arc<TripTimes>>) -> Self {
        Self {
            service_date: None,
            trip_times,
        }
    }

    pub fn empty_scheduled() -> Self {
        Self {
            service_date: None,
            trip_times: Vec::new(),
        }
    }

    /// The copy-on-write step : a fresh timetable for `service_date`
    /// sharing the trip times of `self`.
    pub fn copy_for_date(&self, service_date: NaiveDate) -> Timetable {
        Timetable {
            service_date: Some(service_date),
            trip_times: self.trip_times.clone(),
        }
    }

    pub fn service_date(&self) -> Option<NaiveDate> {
        self.service_date
    }

    /// A dated timetable is valid on its service date only; the scheduled
    /// baseline is valid on every date.
    pub fn is_valid_for(&self, date: NaiveDate) -> bool {
        match self.service_date {
            Some(service_date) => service_date == date,
            None => true,
        }
    }

    pub fn trip_index(&self, trip_id: &FeedScopedId) -> Option<usize> {
        self.trip_times
            .iter()
            .position(|trip_times| trip_times.trip_id() == trip_id)
    }

    pub fn trip_times(&self) -> &[Arc<TripTimes>] {
        &self.trip_times
    }

    pub fn trip_times_for_trip(&self, trip_id: &FeedScopedId) -> Option<&Arc<TripTimes>> {
        self.trip_times
            .iter()
            .find(|trip_times| trip_times.trip_id() == trip_id)
    }

    pub fn nb_of_trips(&self) -> usize {
        self.trip_times.len()
    }

    pub fn add_trip_times(&mut self, trip_times: TripTimes) {
        debug_assert!(self.trip_index(trip_times.trip_id()).is_none());
        self.trip_times.push(Arc::new(trip_times));
    }

    pub fn set_trip_times(&mut self, index: usize, trip_times: TripTimes) {
        self.trip_times[index] = Arc::new(trip_times);
    }

    pub fn remove_trip_times_for_trip(&mut self, trip_id: &FeedScopedId) -> Option<Arc<TripTimes>> {
        let index = self.trip_index(trip_id)?;
        Some(self.trip_times.remove(index))
    }
}
