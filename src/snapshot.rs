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

pub mod buffer;
pub mod source;
pub mod timetable;

pub use buffer::TimetableBuffer;
pub use source::{SnapshotReader, SnapshotSource, TransitLayerUpdater};
pub use timetable::Timetable;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use static_assertions::assert_impl_all;

use crate::models::{FeedScopedId, StopPointIdx, TripIdAndServiceDate, TripPattern};

/// The timetables of one pattern, one per service date with realtime
/// changes, ordered by increasing service date. Dates are unique within
/// the list, and the scheduled baseline (dateless) is never a member.
pub type SortedTimetables = Vec<Arc<Timetable>>;

pub type PatternTimetables = HashMap<Arc<TripPattern>, SortedTimetables>;

/// A set of realtime-updated timetables frozen at a moment in time.
///
/// A snapshot returns a timetable for any pattern of the transit network
/// considering all realtime updates committed before its publication,
/// falling back on the scheduled timetable for patterns without updates.
/// It never mutates : a routing search holds one snapshot for its whole
/// duration and observes an unchanging network, while the single writer
/// keeps accumulating updates in its
/// [`TimetableBuffer`](crate::snapshot::TimetableBuffer) for the next
/// snapshot. Timetables untouched since the commit are shared between the
/// snapshot, its successors and the buffer.
#[derive(Debug, Default)]
pub struct TimetableSnapshot {
    timetables: PatternTimetables,
    realtime_added_patterns: HashMap<TripIdAndServiceDate, Arc<TripPattern>>,
    patterns_for_stop: HashMap<StopPointIdx, HashSet<Arc<TripPattern>>>,
}

assert_impl_all!(TimetableSnapshot: Send, Sync);

impl TimetableSnapshot {
    pub(crate) fn new(
        timetables: PatternTimetables,
        realtime_added_patterns: HashMap<TripIdAndServiceDate, Arc<TripPattern>>,
        patterns_for_stop: HashMap<StopPointIdx, HashSet<Arc<TripPattern>>>,
    ) -> Self {
        Self {
            timetables,
            realtime_added_patterns,
            patterns_for_stop,
        }
    }

    /// The realtime-updated timetable of `pattern` on `date` if this
    /// snapshot contains one, the scheduled timetable of `pattern`
    /// otherwise.
    pub fn resolve<'a>(
        &'a self,
        pattern: &'a TripPattern,
        date: NaiveDate,
    ) -> &'a Arc<Timetable> {
        resolve_in(&self.timetables, pattern, date)
    }

    /// The pattern a realtime update moved `trip_id` onto for `date`, if
    /// any. `None` means the trip still runs on its scheduled pattern.
    pub fn realtime_added_pattern(
        &self,
        trip_id: &FeedScopedId,
        date: NaiveDate,
    ) -> Option<&Arc<TripPattern>> {
        let key = TripIdAndServiceDate {
            trip_id: trip_id.clone(),
            service_date: date,
        };
        self.realtime_added_patterns.get(&key)
    }

    pub fn has_realtime_added_patterns(&self) -> bool {
        !self.realtime_added_patterns.is_empty()
    }

    /// The realtime-synthesized patterns passing through `stop`.
    pub fn patterns_for_stop(
        &self,
        stop: &StopPointIdx,
    ) -> impl Iterator<Item = &Arc<TripPattern>> {
        self.patterns_for_stop.get(stop).into_iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.timetables.is_empty()
            && self.realtime_added_patterns.is_empty()
            && self.patterns_for_stop.is_empty()
    }
}

// Shared by the snapshot and the buffer : the first timetable valid for
// `date` wins; with unique dates per pattern there is at most one.
pub(crate) fn resolve_in<'a>(
    timetables: &'a PatternTimetables,
    pattern: &'a TripPattern,
    date: NaiveDate,
) -> &'a Arc<Timetable> {
    if let Some(sorted_timetables) = timetables.get(pattern) {
        for timetable in sorted_timetables {
            if timetable.is_valid_for(date) {
                return timetable;
            }
        }
    }
    pattern.scheduled_timetable()
}
