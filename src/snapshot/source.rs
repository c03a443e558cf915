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

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use chrono::NaiveDate;
use static_assertions::assert_impl_all;
use tracing::debug;

use crate::config::SnapshotParams;
use crate::models::{BaseModel, TripPattern};
use crate::realtime::entity_resolver::FuzzyTripMatcher;
use crate::realtime::messages::{
    EstimatedTimetableDelivery, TripUpdateMessage, UpdateBatch, UpdateIncrementality,
};
use crate::realtime::pattern_cache::TripPatternCache;
use crate::realtime::{estimated_timetable_handler, trip_update_handler, UpdateResult};
use crate::snapshot::{PatternTimetables, TimetableBuffer, TimetableSnapshot};

/// Collaborator notified inside each commit, before publication, with the
/// timetables replicated since the last commit and the full timetable map.
pub trait TransitLayerUpdater {
    fn update(
        &self,
        dirty_timetables: &HashSet<(Arc<TripPattern>, NaiveDate)>,
        timetables: &PatternTimetables,
    );
}

/// Owner of the realtime lifecycle : accumulates updates in its private
/// [`TimetableBuffer`] and periodically commits them into an immutable
/// [`TimetableSnapshot`] it publishes to readers.
///
/// A source belongs to its single updater thread. Readers never touch the
/// source itself : they hold a [`SnapshotReader`] and load the current
/// snapshot from it, a wait-free operation. Publication is an atomic swap
/// of an `Arc`, so a reader either sees the previous snapshot or the new
/// one, both complete and internally consistent, for as long as it keeps
/// the reference.
pub struct SnapshotSource {
    params: SnapshotParams,
    buffer: TimetableBuffer,
    pattern_cache: TripPatternCache,
    published: Arc<ArcSwap<TimetableSnapshot>>,
    last_commit_at: Option<Instant>,
    // injectable so that tests control what "today" means for purging
    local_date_now: Box<dyn Fn() -> NaiveDate + Send>,
    transit_layer_updater: Option<Box<dyn TransitLayerUpdater + Send>>,
    fuzzy_trip_matcher: Option<Box<dyn FuzzyTripMatcher + Send>>,
}

impl SnapshotSource {
    pub fn new(params: SnapshotParams) -> Self {
        Self {
            params,
            buffer: TimetableBuffer::new(),
            pattern_cache: TripPatternCache::new(),
            published: Arc::new(ArcSwap::from_pointee(TimetableSnapshot::default())),
            last_commit_at: None,
            local_date_now: Box::new(|| chrono::Local::now().date_naive()),
            transit_layer_updater: None,
            fuzzy_trip_matcher: None,
        }
    }

    pub fn set_transit_layer_updater(&mut self, updater: Box<dyn TransitLayerUpdater + Send>) {
        self.transit_layer_updater = Some(updater);
    }

    pub fn set_fuzzy_trip_matcher(&mut self, matcher: Box<dyn FuzzyTripMatcher + Send>) {
        self.fuzzy_trip_matcher = Some(matcher);
    }

    pub fn set_local_date_supplier(&mut self, supplier: Box<dyn Fn() -> NaiveDate + Send>) {
        self.local_date_now = supplier;
    }

    /// The most recently published snapshot. Wait-free, callable from any
    /// thread holding a reference to the source or a reader.
    pub fn current_snapshot(&self) -> Arc<TimetableSnapshot> {
        self.published.load_full()
    }

    /// A shareable handle for reader threads.
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            published: self.published.clone(),
        }
    }

    /// The working buffer, for inspection. Updates only enter the buffer
    /// through [`apply_updates`](Self::apply_updates).
    pub fn buffer(&self) -> &TimetableBuffer {
        &self.buffer
    }

    /// Single-writer entry point : apply one batch of either dialect, then
    /// publish a new snapshot if the publication interval allows it.
    pub fn apply_updates(&mut self, base: &BaseModel, batch: UpdateBatch) -> UpdateResult {
        let result = match batch {
            UpdateBatch::TripUpdates {
                feed_id,
                incrementality,
                updates,
            } => self.handle_trip_updates(base, &feed_id, incrementality, &updates),
            UpdateBatch::EstimatedTimetables {
                feed_id,
                incrementality,
                deliveries,
            } => self.handle_estimated_timetables(base, &feed_id, incrementality, &deliveries),
        };
        self.maybe_commit();
        result
    }

    pub fn apply_trip_updates(
        &mut self,
        base: &BaseModel,
        feed_id: &str,
        incrementality: UpdateIncrementality,
        updates: &[TripUpdateMessage],
    ) -> UpdateResult {
        let result = self.handle_trip_updates(base, feed_id, incrementality, updates);
        self.maybe_commit();
        result
    }

    pub fn apply_estimated_timetables(
        &mut self,
        base: &BaseModel,
        feed_id: &str,
        incrementality: UpdateIncrementality,
        deliveries: &[EstimatedTimetableDelivery],
    ) -> UpdateResult {
        let result = self.handle_estimated_timetables(base, feed_id, incrementality, deliveries);
        self.maybe_commit();
        result
    }

    /// Commit and publish whatever the buffer holds, regardless of the
    /// publication interval.
    pub fn flush_buffer(&mut self) {
        self.commit_and_publish(true);
    }

    fn handle_trip_updates(
        &mut self,
        base: &BaseModel,
        feed_id: &str,
        incrementality: UpdateIncrementality,
        updates: &[TripUpdateMessage],
    ) -> UpdateResult {
        trip_update_handler::apply_trip_updates(
            base,
            &mut self.buffer,
            &mut self.pattern_cache,
            self.params.backwards_delay_propagation,
            feed_id,
            incrementality,
            updates,
        )
    }

    fn handle_estimated_timetables(
        &mut self,
        base: &BaseModel,
        feed_id: &str,
        incrementality: UpdateIncrementality,
        deliveries: &[EstimatedTimetableDelivery],
    ) -> UpdateResult {
        let fuzzy_matcher: Option<&dyn FuzzyTripMatcher> = match &self.fuzzy_trip_matcher {
            Some(matcher) => Some(matcher.as_ref()),
            None => None,
        };
        estimated_timetable_handler::apply_estimated_timetables(
            base,
            &mut self.buffer,
            &mut self.pattern_cache,
            fuzzy_matcher,
            feed_id,
            incrementality,
            deliveries,
        )
    }

    fn maybe_commit(&mut self) {
        let frequency = self.params.max_snapshot_frequency;
        let due = frequency.is_zero()
            || match self.last_commit_at {
                None => true,
                Some(at) => at.elapsed() >= Duration::from_secs(frequency.total_seconds()),
            };
        if due {
            self.commit_and_publish(false);
        }
    }

    fn commit_and_publish(&mut self, force: bool) {
        if self.params.purge_expired_data {
            let today = (self.local_date_now)();
            if let Some(yesterday) = today.pred_opt() {
                if self.buffer.purge_expired_data(yesterday) {
                    debug!("purged realtime timetables of dates before {}", today);
                }
            }
        }

        let updater: Option<&dyn TransitLayerUpdater> = match &self.transit_layer_updater {
            Some(updater) => Some(updater.as_ref()),
            None => None,
        };
        let has_snapshot = self.buffer.commit(updater, force);

        if let Some(snapshot) = has_snapshot {
            debug!(
                "publishing a new timetable snapshot with {} updated patterns",
                self.buffer.nb_of_updated_patterns()
            );
            self.published.store(Arc::new(snapshot));
            // the interval between publications counts from the last
            // actual commit, a fruitless attempt does not delay the next
            self.last_commit_at = Some(Instant::now());
        }
    }
}

/// Read-side handle on a [`SnapshotSource`]. Cloneable and shareable
/// across reader threads; `current` is wait-free.
#[derive(Clone)]
pub struct SnapshotReader {
    published: Arc<ArcSwap<TimetableSnapshot>>,
}

assert_impl_all!(SnapshotReader: Send, Sync);

impl SnapshotReader {
    pub fn current(&self) -> Arc<TimetableSnapshot> {
        self.published.load_full()
    }
}
