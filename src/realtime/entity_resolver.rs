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

use chrono::NaiveDate;
use tracing::warn;

use crate::models::{BaseModel, FeedScopedId, StopPointIdx, TripIdAndServiceDate, TripIdx};
use crate::realtime::messages::{EstimatedVehicleJourney, FramedVehicleJourneyRef};
use crate::realtime::UpdateError;

/// Resolves the textual references carried by estimated-timetable
/// messages against the static model, within one feed's namespace.
pub struct EntityResolver<'model> {
    base: &'model BaseModel,
    feed_id: &'model str,
}

impl<'model> EntityResolver<'model> {
    pub fn new(base: &'model BaseModel, feed_id: &'model str) -> Self {
        Self { base, feed_id }
    }

    /// Resolve an estimated journey to a `(trip, service date)` pair,
    /// trying in order :
    /// 1. the framed vehicle journey ref : journey reference looked up as
    ///    a trip id, paired with the data frame ref parsed as a date;
    /// 2. the dated vehicle journey ref, looked up as a trip on service
    ///    date;
    /// 3. the estimated vehicle journey code, looked up the same way.
    ///
    /// A data frame ref that is not a date disables rule 1 only; if no
    /// rule applies afterwards, the resolution fails with
    /// [`UpdateError::DateUnparseable`] so the bad frame is reported.
    pub fn resolve_trip_and_date(
        &self,
        journey: &EstimatedVehicleJourney,
    ) -> Result<(TripIdx, NaiveDate), UpdateError> {
        let mut has_unparseable_date: Option<String> = None;

        if let Some(framed) = &journey.framed_vehicle_journey_ref {
            match self.resolve_service_date(framed) {
                Some(service_date) => {
                    let trip_id = FeedScopedId::new(self.feed_id, &framed.dated_vehicle_journey_ref);
                    if let Some(trip_idx) = self.base.trip_idx(&trip_id) {
                        if self.trip_runs_on(trip_idx, &trip_id, service_date) {
                            return Ok((trip_idx, service_date));
                        }
                    }
                }
                None => {
                    has_unparseable_date = Some(framed.data_frame_ref.clone());
                }
            }
        }

        if let Some(dated_ref) = &journey.dated_vehicle_journey_ref {
            if let Some(resolved) = self.resolve_trip_on_service_date(dated_ref) {
                return Ok(resolved);
            }
        }

        if let Some(code) = &journey.estimated_vehicle_journey_code {
            if let Some(resolved) = self.resolve_trip_on_service_date(code) {
                return Ok(resolved);
            }
        }

        match has_unparseable_date {
            Some(value) => Err(UpdateError::DateUnparseable(value)),
            None => Err(UpdateError::UnknownTrip(
                FeedScopedId::new(self.feed_id, journey.reference()).to_string(),
            )),
        }
    }

    /// Look up a dated vehicle journey reference as a trip on service
    /// date of the static model.
    pub fn resolve_trip_on_service_date(
        &self,
        dated_journey_ref: &str,
    ) -> Option<(TripIdx, NaiveDate)> {
        let id = FeedScopedId::new(self.feed_id, dated_journey_ref);
        self.base
            .trip_on_service_date(&id)
            .map(|trip_on_date| (trip_on_date.trip, trip_on_date.service_date))
    }

    /// The service date named by the data frame ref of a framed journey
    /// reference, or `None` when it is not an ISO date.
    pub fn resolve_service_date(&self, framed: &FramedVehicleJourneyRef) -> Option<NaiveDate> {
        match framed.data_frame_ref.parse::<NaiveDate>() {
            Ok(service_date) => Some(service_date),
            Err(_) => {
                warn!("invalid data frame ref: {}", framed.data_frame_ref);
                None
            }
        }
    }

    pub fn resolve_quay(&self, quay_ref: &str) -> Option<StopPointIdx> {
        let id = FeedScopedId::new(self.feed_id, quay_ref);
        self.base.stop_point_idx(&id)
    }

    /// A trip runs on a date when its calendar says so, or when the static
    /// model carries a dated vehicle journey for the pair (replacement
    /// runs outside the regular calendar).
    pub fn trip_runs_on(
        &self,
        trip_idx: TripIdx,
        trip_id: &FeedScopedId,
        service_date: NaiveDate,
    ) -> bool {
        if self.base.trip_exists(trip_idx, &service_date) {
            return true;
        }
        let run = TripIdAndServiceDate {
            trip_id: trip_id.clone(),
            service_date,
        };
        self.base.trip_on_service_date_for_trip_and_day(&run).is_some()
    }
}

/// Heuristic journey resolution, tried when the explicit references of an
/// estimated journey fail to resolve. An implementation is composed into
/// the [`SnapshotSource`](crate::snapshot::SnapshotSource) as an optional
/// capability.
pub trait FuzzyTripMatcher {
    fn match_trip_and_date(
        &self,
        base: &BaseModel,
        journey: &EstimatedVehicleJourney,
    ) -> Option<(TripIdx, NaiveDate)>;
}
