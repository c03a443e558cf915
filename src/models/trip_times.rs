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

use crate::models::FeedScopedId;
use crate::time::SecondsSinceDayStart;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealTimeState {
    Scheduled,
    Updated,
    Added,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTimeState {
    Scheduled,
    Updated,
    NoData,
    Skipped,
}

/// Arrival and departure times of one trip, with realtime status flags,
/// at each position of the pattern the trip runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripTimes {
    trip_id: FeedScopedId,
    arrival_times: Vec<SecondsSinceDayStart>,
    departure_times: Vec<SecondsSinceDayStart>,
    stop_states: Vec<StopTimeState>,
    state: RealTimeState,
}

pub struct PositionPair {
    pub upstream: usize,
    pub downstream: usize,
}

impl TripTimes {
    /// Trip times as given by the static schedule.
    pub fn new_scheduled(
        trip_id: FeedScopedId,
        arrival_times: Vec<SecondsSinceDayStart>,
        departure_times: Vec<SecondsSinceDayStart>,
    ) -> Self {
        assert!(arrival_times.len() == departure_times.len());
        let nb_of_stops = arrival_times.len();
        Self {
            trip_id,
            arrival_times,
            departure_times,
            stop_states: vec![StopTimeState::Scheduled; nb_of_stops],
            state: RealTimeState::Scheduled,
        }
    }

    /// Trip times of a trip introduced by a realtime update.
    pub fn new_added(
        trip_id: FeedScopedId,
        arrival_times: Vec<SecondsSinceDayStart>,
        departure_times: Vec<SecondsSinceDayStart>,
    ) -> Self {
        assert!(arrival_times.len() == departure_times.len());
        let nb_of_stops = arrival_times.len();
        Self {
            trip_id,
            arrival_times,
            departure_times,
            stop_states: vec![StopTimeState::Updated; nb_of_stops],
            state: RealTimeState::Added,
        }
    }

    pub fn trip_id(&self) -> &FeedScopedId {
        &self.trip_id
    }

    pub fn nb_of_stops(&self) -> usize {
        self.arrival_times.len()
    }

    pub fn arrival_time(&self, position: usize) -> SecondsSinceDayStart {
        self.arrival_times[position]
    }

    pub fn departure_time(&self, position: usize) -> SecondsSinceDayStart {
        self.departure_times[position]
    }

    pub fn stop_state(&self, position: usize) -> StopTimeState {
        self.stop_states[position]
    }

    pub fn state(&self) -> RealTimeState {
        self.state
    }

    pub fn is_canceled(&self) -> bool {
        self.state == RealTimeState::Canceled
    }

    pub fn set_arrival_time(&mut self, position: usize, time: SecondsSinceDayStart) {
        self.arrival_times[position] = time;
    }

    pub fn set_departure_time(&mut self, position: usize, time: SecondsSinceDayStart) {
        self.departure_times[position] = time;
    }

    pub fn set_stop_state(&mut self, position: usize, stop_state: StopTimeState) {
        self.stop_states[position] = stop_state;
    }

    pub fn set_state(&mut self, state: RealTimeState) {
        self.state = state;
    }

    /// Mark the whole trip as canceled on its service date. Times are kept
    /// so that the canceled run can still be displayed.
    pub fn cancel(&mut self) {
        self.state = RealTimeState::Canceled;
        for stop_state in self.stop_states.iter_mut() {
            *stop_state = StopTimeState::Skipped;
        }
    }

    /// Check that times are coherent along the trip : at each position the
    /// departure does not precede the arrival, and no event precedes the
    /// departure at the previous position. Skipped positions are not
    /// serviced and are left out of the check.
    ///
    /// Returns the first offending pair of positions.
    pub fn check_increasing(&self) -> Result<(), PositionPair> {
        let mut has_previous: Option<usize> = None;
        for position in 0..self.nb_of_stops() {
            if let StopTimeState::Skipped = self.stop_states[position] {
                continue;
            }
            if self.departure_times[position] < self.arrival_times[position] {
                return Err(PositionPair {
                    upstream: position,
                    downstream: position,
                });
            }
            if let Some(previous) = has_previous {
                if self.arrival_times[position] < self.departure_times[previous] {
                    return Err(PositionPair {
                        upstream: previous,
                        downstream: position,
                    });
                }
            }
            has_previous = Some(position);
        }
        Ok(())
    }
}
