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

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{FeedScopedId, StopPointIdx, TripPattern};

/// Cache of the patterns synthesized by realtime updates.
///
/// A trip repeatedly updated onto the same diverging stop sequence must
/// land on the same pattern instance, otherwise every batch would churn
/// new pattern keys in the snapshot maps. The cache outlives commits : it
/// is owned by the [`SnapshotSource`](crate::snapshot::SnapshotSource),
/// not by the buffer.
pub struct TripPatternCache {
    patterns: HashMap<(FeedScopedId, Vec<StopPointIdx>), Arc<TripPattern>>,
    counter: usize,
}

impl TripPatternCache {
    pub fn new() -> Self {
        Self {
            patterns: HashMap::new(),
            counter: 0,
        }
    }

    /// The realtime pattern for `trip_id` running over `stops`, created on
    /// first use. The generated pattern id is stable for the lifetime of
    /// this cache.
    pub fn get_or_create(
        &mut self,
        trip_id: &FeedScopedId,
        route_id: &FeedScopedId,
        stops: Vec<StopPointIdx>,
    ) -> Arc<TripPattern> {
        let key = (trip_id.clone(), stops);
        if let Some(pattern) = self.patterns.get(&key) {
            return pattern.clone();
        }
        self.counter += 1;
        let pattern_id = FeedScopedId::new(
            &route_id.feed_id,
            &format!("{}:rt:{}", route_id.id, self.counter),
        );
        let pattern = Arc::new(TripPattern::new_realtime(
            pattern_id,
            route_id.clone(),
            key.1.clone(),
        ));
        self.patterns.insert(key, pattern.clone());
        pattern
    }

    pub fn nb_of_patterns(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for TripPatternCache {
    fn default() -> Self {
        Self::new()
    }
}
