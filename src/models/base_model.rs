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

use crate::models::{FeedScopedId, StopPointIdx, TripIdAndServiceDate, TripIdx, TripPattern};

pub struct StopPoint {
    pub id: FeedScopedId,
    pub name: String,
}

pub struct Trip {
    pub id: FeedScopedId,
    pub route_id: FeedScopedId,
    pub service_days: BTreeSet<NaiveDate>,
}

/// Static-model entity pairing a trip with one specific service date,
/// addressable by its own (dated vehicle journey) identifier.
#[derive(Debug, Clone)]
pub struct TripOnServiceDate {
    pub id: FeedScopedId,
    pub trip: TripIdx,
    pub service_date: NaiveDate,
}

/// The immutable static schedule the snapshot engine resolves realtime
/// references against. It is built once (see
/// [`ModelBuilder`](crate::models::model_builder::ModelBuilder)) and never
/// mutated by the realtime layer.
pub struct BaseModel {
    feed_ids: Vec<String>,
    stops: Vec<StopPoint>,
    stop_id_to_idx: HashMap<FeedScopedId, StopPointIdx>,
    trips: Vec<Trip>,
    trip_id_to_idx: HashMap<FeedScopedId, TripIdx>,
    patterns: Vec<Arc<TripPattern>>,
    pattern_for_trip: HashMap<TripIdx, usize>,
    trips_on_service_date: HashMap<FeedScopedId, TripOnServiceDate>,
    trip_on_date_to_id: HashMap<TripIdAndServiceDate, FeedScopedId>,
}

impl BaseModel {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        feed_ids: Vec<String>,
        stops: Vec<StopPoint>,
        stop_id_to_idx: HashMap<FeedScopedId, StopPointIdx>,
        trips: Vec<Trip>,
        trip_id_to_idx: HashMap<FeedScopedId, TripIdx>,
        patterns: Vec<Arc<TripPattern>>,
        pattern_for_trip: HashMap<TripIdx, usize>,
        trips_on_service_date: HashMap<FeedScopedId, TripOnServiceDate>,
        trip_on_date_to_id: HashMap<TripIdAndServiceDate, FeedScopedId>,
    ) -> Self {
        Self {
            feed_ids,
            stops,
            stop_id_to_idx,
            trips,
            trip_id_to_idx,
            patterns,
            pattern_for_trip,
            trips_on_service_date,
            trip_on_date_to_id,
        }
    }

    pub fn feed_ids(&self) -> &[String] {
        &self.feed_ids
    }

    pub fn stop_point_idx(&self, stop_id: &FeedScopedId) -> Option<StopPointIdx> {
        self.stop_id_to_idx.get(stop_id).copied()
    }

    pub fn stop_point(&self, idx: StopPointIdx) -> &StopPoint {
        &self.stops[idx.idx]
    }

    pub fn nb_of_stop_points(&self) -> usize {
        self.stops.len()
    }

    pub fn trip_idx(&self, trip_id: &FeedScopedId) -> Option<TripIdx> {
        self.trip_id_to_idx.get(trip_id).copied()
    }

    pub fn trip(&self, idx: TripIdx) -> &Trip {
        &self.trips[idx.idx]
    }

    pub fn nb_of_trips(&self) -> usize {
        self.trips.len()
    }

    pub fn trips(&self) -> impl Iterator<Item = (TripIdx, &Trip)> {
        self.trips
            .iter()
            .enumerate()
            .map(|(idx, trip)| (TripIdx { idx }, trip))
    }

    /// The scheduled pattern of a trip, carrying its scheduled timetable.
    pub fn pattern_for_trip(&self, trip_idx: TripIdx) -> Option<&Arc<TripPattern>> {
        self.pattern_for_trip
            .get(&trip_idx)
            .map(|pos| &self.patterns[*pos])
    }

    pub fn patterns(&self) -> impl Iterator<Item = &Arc<TripPattern>> {
        self.patterns.iter()
    }

    pub fn trip_on_service_date(&self, id: &FeedScopedId) -> Option<&TripOnServiceDate> {
        self.trips_on_service_date.get(id)
    }

    /// The dated vehicle journey of a `(trip, service date)` pair, if the
    /// static model carries one.
    pub fn trip_on_service_date_for_trip_and_day(
        &self,
        run: &TripIdAndServiceDate,
    ) -> Option<&TripOnServiceDate> {
        let id = self.trip_on_date_to_id.get(run)?;
        self.trips_on_service_date.get(id)
    }

    pub fn trip_exists(&self, trip_idx: TripIdx, date: &NaiveDate) -> bool {
        self.trips[trip_idx.idx].service_days.contains(date)
    }
}
