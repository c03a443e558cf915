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

use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::models::StopPointIdx;
use crate::snapshot::Timetable;

/// An identifier namespaced by the feed it originates from, so that
/// several upstream data sources may coexist in one model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeedScopedId {
    pub feed_id: String,
    pub id: String,
}

impl FeedScopedId {
    pub fn new(feed_id: &str, id: &str) -> Self {
        Self {
            feed_id: feed_id.to_string(),
            id: id.to_string(),
        }
    }
}

impl Display for FeedScopedId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.feed_id, self.id)
    }
}

/// Compound key identifying one run of a trip: the trip on one service date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TripIdAndServiceDate {
    pub trip_id: FeedScopedId,
    pub service_date: NaiveDate,
}

/// A sequence of stops traversed by a family of trips on one route.
///
/// Patterns are the structural key of realtime timetables. They are either
/// part of the static schedule, or synthesized at runtime when an update
/// moves a trip onto a stop sequence the schedule does not know
/// (`created_by_realtime_updater`). A pattern carries its scheduled
/// timetable, the baseline for every date without realtime changes.
///
/// Patterns are shared as `Arc<TripPattern>` between the static model, the
/// working buffer and any number of published snapshots; equality and
/// hashing go through the (unique) pattern id.
#[derive(Debug)]
pub struct TripPattern {
    id: FeedScopedId,
    route_id: FeedScopedId,
    stops: Vec<StopPointIdx>,
    scheduled_timetable: Arc<Timetable>,
    created_by_realtime_updater: bool,
}

impl TripPattern {
    pub fn new_scheduled(
        id: FeedScopedId,
        route_id: FeedScopedId,
        stops: Vec<StopPointIdx>,
        scheduled_timetable: Timetable,
    ) -> Self {
        Self {
            id,
            route_id,
            stops,
            scheduled_timetable: Arc::new(scheduled_timetable),
            created_by_realtime_updater: false,
        }
    }

    /// A pattern synthesized by the realtime updater. Its scheduled
    /// timetable is empty: every timetable of such a pattern comes from
    /// realtime updates.
    pub fn new_realtime(
        id: FeedScopedId,
        route_id: FeedScopedId,
        stops: Vec<StopPointIdx>,
    ) -> Self {
        Self {
            id,
            route_id,
            stops,
            scheduled_timetable: Arc::new(Timetable::empty_scheduled()),
            created_by_realtime_updater: true,
        }
    }

    pub fn id(&self) -> &FeedScopedId {
        &self.id
    }

    pub fn route_id(&self) -> &FeedScopedId {
        &self.route_id
    }

    pub fn stops(&self) -> &[StopPointIdx] {
        &self.stops
    }

    pub fn scheduled_timetable(&self) -> &Arc<Timetable> {
        &self.scheduled_timetable
    }

    pub fn is_created_by_realtime_updater(&self) -> bool {
        self.created_by_realtime_updater
    }
}

impl PartialEq for TripPattern {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TripPattern {}

impl Hash for TripPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
