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

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error};

use crate::models::{FeedScopedId, StopPointIdx, TripIdAndServiceDate, TripPattern, TripTimes};
use crate::realtime::UpdateError;
use crate::snapshot::{
    resolve_in, PatternTimetables, SortedTimetables, Timetable, TimetableSnapshot,
    TransitLayerUpdater,
};

/// The mutable working set in which the single writer accumulates a batch
/// of realtime updates before committing them into an immutable
/// [`TimetableSnapshot`].
///
/// The buffer inherits the maps of the last committed snapshot and applies
/// updates copy-on-write : before the first mutation of a `(pattern, date)`
/// timetable in the lifetime of the current batch, that timetable is
/// replicated and the pattern's timetable list is rebuilt around the
/// replica, so that nothing reachable from an already published snapshot
/// ever changes. The replicas made since the last commit are tracked in
/// `dirty_timetables`, which both avoids repeated copies and guarantees
/// that each `(pattern, date)` timetable is copied at most once per batch.
pub struct TimetableBuffer {
    timetables: PatternTimetables,
    realtime_added_patterns: HashMap<TripIdAndServiceDate, Arc<TripPattern>>,
    patterns_for_stop: HashMap<StopPointIdx, HashSet<Arc<TripPattern>>>,
    // timetables already copied-on-write since the last commit
    dirty_timetables: HashSet<(Arc<TripPattern>, NaiveDate)>,
    // true once any mutation occurred since the last commit
    dirty: bool,
}

impl TimetableBuffer {
    pub fn new() -> Self {
        Self {
            timetables: HashMap::new(),
            realtime_added_patterns: HashMap::new(),
            patterns_for_stop: HashMap::new(),
            dirty_timetables: HashSet::new(),
            dirty: false,
        }
    }

    /// The realtime-updated timetable of `pattern` on `date` if this
    /// buffer contains one, the scheduled timetable of `pattern`
    /// otherwise. Never mutates.
    pub fn resolve<'a>(
        &'a self,
        pattern: &'a TripPattern,
        date: NaiveDate,
    ) -> &'a Arc<Timetable> {
        resolve_in(&self.timetables, pattern, date)
    }

    /// Update the trip times of one trip in the timetable of `pattern` on
    /// `service_date`, adding the trip to the timetable if it is not there
    /// yet. The timetable is replicated first unless it has already been
    /// replicated since the last commit.
    pub fn update(
        &mut self,
        pattern: &Arc<TripPattern>,
        updated_trip_times: TripTimes,
        service_date: NaiveDate,
    ) -> Result<(), UpdateError> {
        let trip_id = updated_trip_times.trip_id().clone();
        self.copy_timetable(pattern, service_date);
        {
            let timetable = self.dirty_timetable_mut(pattern, service_date)?;
            match timetable.trip_index(&trip_id) {
                Some(index) => timetable.set_trip_times(index, updated_trip_times),
                None => timetable.add_trip_times(updated_trip_times),
            }
        }

        if pattern.is_created_by_realtime_updater() {
            // remember which pattern now serves this trip on this date,
            // and make the pattern findable from its stops
            let key = TripIdAndServiceDate {
                trip_id,
                service_date,
            };
            self.realtime_added_patterns.insert(key, pattern.clone());
            for stop in pattern.stops() {
                self.patterns_for_stop
                    .entry(*stop)
                    .or_default()
                    .insert(pattern.clone());
            }
        }

        Ok(())
    }

    /// Dissociate `trip_id` on `service_date` from the realtime-added
    /// pattern a previous update moved it onto, removing its trip times
    /// from that pattern's timetable for the date. The trip falls back to
    /// its scheduled pattern until a future update changes it again.
    ///
    /// Returns false when no realtime-added pattern is recorded for the
    /// trip and date.
    pub fn revert_trip_to_scheduled_pattern(
        &mut self,
        trip_id: &FeedScopedId,
        service_date: NaiveDate,
    ) -> bool {
        let key = TripIdAndServiceDate {
            trip_id: trip_id.clone(),
            service_date,
        };
        let pattern = match self.realtime_added_patterns.remove(&key) {
            Some(pattern) => pattern,
            None => return false,
        };
        self.dirty = true;

        let nb_of_holders = match self.timetables.get(&pattern) {
            Some(sorted_timetables) => sorted_timetables
                .iter()
                .filter(|timetable| {
                    timetable.is_valid_for(service_date)
                        && timetable.trip_index(trip_id).is_some()
                })
                .count(),
            None => 0,
        };
        match nb_of_holders {
            0 => {
                debug!("no trip times to remove for trip {}", trip_id);
            }
            1 => {
                self.copy_timetable(&pattern, service_date);
                if let Ok(timetable) = self.dirty_timetable_mut(&pattern, service_date) {
                    timetable.remove_trip_times_for_trip(trip_id);
                }
            }
            _ => {
                // ambiguous : several timetables on the same date hold the
                // trip, removing one would be a guess
                debug!(
                    "found several trip times to remove for trip {} on {}, leaving them in place",
                    trip_id, service_date
                );
            }
        }
        true
    }

    /// Drop every timetable whose service date is on-or-before `date`, and
    /// every realtime-added pattern record for those dates. Patterns left
    /// without any timetable are dropped altogether.
    ///
    /// Returns true if anything was removed.
    pub fn purge_expired_data(&mut self, date: NaiveDate) -> bool {
        let mut modified = false;
        // the timetable lists are owned by this buffer (commit clones
        // them), so they can be filtered in place
        self.timetables.retain(|_, sorted_timetables| {
            let nb_before = sorted_timetables.len();
            sorted_timetables.retain(|timetable| match timetable.service_date() {
                Some(service_date) => service_date > date,
                None => false,
            });
            if sorted_timetables.len() != nb_before {
                modified = true;
            }
            !sorted_timetables.is_empty()
        });

        let nb_before = self.realtime_added_patterns.len();
        self.realtime_added_patterns
            .retain(|key, _| key.service_date > date);
        if self.realtime_added_patterns.len() != nb_before {
            modified = true;
        }

        // a purged timetable is no longer reachable, its replica must not
        // be reused by a later update of the same (pattern, date)
        self.dirty_timetables
            .retain(|(_, timetable_date)| *timetable_date > date);

        if modified {
            self.dirty = true;
        }
        modified
    }

    /// Drop all realtime data of one feed : every pattern of the feed and
    /// every realtime-added pattern record whose trip belongs to the feed.
    pub fn clear(&mut self, feed_id: &str) {
        let nb_of_patterns = self.timetables.len();
        self.timetables
            .retain(|pattern, _| pattern.id().feed_id != feed_id);
        let timetables_modified = self.timetables.len() != nb_of_patterns;

        let nb_of_added = self.realtime_added_patterns.len();
        self.realtime_added_patterns
            .retain(|key, _| key.trip_id.feed_id != feed_id);
        let added_modified = self.realtime_added_patterns.len() != nb_of_added;

        // same rule as in purge_expired_data : no replica may outlive its
        // timetable
        self.dirty_timetables
            .retain(|(pattern, _)| pattern.id().feed_id != feed_id);

        if timetables_modified || added_modified {
            self.dirty = true;
        }
    }

    /// Freeze the accumulated updates into an immutable snapshot.
    ///
    /// Returns `None` when nothing changed since the last commit and
    /// `force` is false. Otherwise the three maps are shallow-cloned into
    /// the snapshot (the timetables themselves are shared, not copied), the
    /// optional transit layer updater is notified before publication, and
    /// the buffer starts a new batch on top of the committed state.
    pub fn commit(
        &mut self,
        transit_layer_updater: Option<&dyn TransitLayerUpdater>,
        force: bool,
    ) -> Option<TimetableSnapshot> {
        if !force && !self.dirty {
            return None;
        }

        let snapshot = TimetableSnapshot::new(
            self.timetables.clone(),
            self.realtime_added_patterns.clone(),
            self.patterns_for_stop.clone(),
        );

        if let Some(updater) = transit_layer_updater {
            updater.update(&self.dirty_timetables, &self.timetables);
        }

        self.dirty_timetables.clear();
        self.dirty = false;

        Some(snapshot)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        self.timetables.is_empty()
            && self.realtime_added_patterns.is_empty()
            && self.patterns_for_stop.is_empty()
    }

    pub fn nb_of_updated_patterns(&self) -> usize {
        self.timetables.len()
    }

    // Replicate the timetable of `(pattern, date)` unless already done
    // since the last commit. The pattern's timetable list is rebuilt
    // around the replica : lists reachable from published snapshots are
    // shared and must not change.
    fn copy_timetable(&mut self, pattern: &Arc<TripPattern>, date: NaiveDate) {
        let key = (pattern.clone(), date);
        if self.dirty_timetables.contains(&key) {
            return;
        }
        let fresh_timetable = {
            let resolved = self.resolve(pattern, date);
            Arc::new(resolved.copy_for_date(date))
        };
        let mut sorted_timetables: SortedTimetables = match self.timetables.get(pattern) {
            Some(old_timetables) => old_timetables
                .iter()
                .filter(|timetable| timetable.service_date() != Some(date))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        let position = sorted_timetables
            .partition_point(|timetable| timetable.service_date() < Some(date));
        sorted_timetables.insert(position, fresh_timetable);
        self.timetables.insert(pattern.clone(), sorted_timetables);
        self.dirty_timetables.insert(key);
        self.dirty = true;
    }

    // Mutable access to the replica made by `copy_timetable`. A replica
    // made since the last commit is referenced only by this buffer, so
    // `Arc::get_mut` succeeds; anything else is a programming error.
    fn dirty_timetable_mut(
        &mut self,
        pattern: &Arc<TripPattern>,
        date: NaiveDate,
    ) -> Result<&mut Timetable, UpdateError> {
        let has_timetable = self
            .timetables
            .get_mut(pattern)
            .and_then(|sorted_timetables| {
                sorted_timetables
                    .iter_mut()
                    .find(|timetable| timetable.is_valid_for(date))
            });
        let timetable_arc = match has_timetable {
            Some(timetable_arc) => timetable_arc,
            None => {
                error!(
                    "no timetable for pattern {} on {} while it is marked dirty",
                    pattern.id(),
                    date
                );
                return Err(UpdateError::ReadOnly);
            }
        };
        match Arc::get_mut(timetable_arc) {
            Some(timetable) => Ok(timetable),
            None => {
                error!(
                    "timetable for pattern {} on {} is shared while marked dirty, \
                     refusing to modify it",
                    pattern.id(),
                    date
                );
                Err(UpdateError::ReadOnly)
            }
        }
    }
}

impl Default for TimetableBuffer {
    fn default() -> Self {
        Self::new()
    }
}
