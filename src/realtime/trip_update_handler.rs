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

//! The schedule-based dialect : trip updates referencing trips of the
//! static schedule by id and stops by position in the trip's pattern.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::BackwardsDelayPropagation;
use crate::models::{
    BaseModel, FeedScopedId, RealTimeState, StopPointIdx, StopTimeState, TripPattern, TripTimes,
};
use crate::realtime::messages::{
    StopTimeScheduleRelationship, TripScheduleRelationship, TripUpdateMessage,
    UpdateIncrementality,
};
use crate::realtime::pattern_cache::TripPatternCache;
use crate::realtime::{UpdateError, UpdateResult, UpdateWarning};
use crate::snapshot::TimetableBuffer;
use crate::time::SecondsSinceDayStart;

pub fn apply_trip_updates(
    base: &BaseModel,
    buffer: &mut TimetableBuffer,
    pattern_cache: &mut TripPatternCache,
    propagation: BackwardsDelayPropagation,
    feed_id: &str,
    incrementality: UpdateIncrementality,
    updates: &[TripUpdateMessage],
) -> UpdateResult {
    let mut result = UpdateResult::new();

    if let UpdateIncrementality::FullDataset = incrementality {
        // a full dataset replaces all previous realtime data of the feed
        debug!("full dataset received for feed {}, clearing it", feed_id);
        buffer.clear(feed_id);
    }

    for update in updates {
        let applied = apply_trip_update(
            base,
            buffer,
            pattern_cache,
            propagation,
            feed_id,
            update,
            &mut result.warnings,
        );
        match applied {
            Ok(()) => result.successes += 1,
            Err(err) => {
                warn!("skipping update for trip {}: {}", update.trip_id, err);
                result.errors.push(err);
            }
        }
    }
    result
}

fn apply_trip_update(
    base: &BaseModel,
    buffer: &mut TimetableBuffer,
    pattern_cache: &mut TripPatternCache,
    propagation: BackwardsDelayPropagation,
    feed_id: &str,
    update: &TripUpdateMessage,
    warnings: &mut Vec<UpdateWarning>,
) -> Result<(), UpdateError> {
    let trip_id = FeedScopedId::new(feed_id, &update.trip_id);
    match update.schedule_relationship {
        TripScheduleRelationship::Scheduled => {
            apply_scheduled_update(base, buffer, propagation, trip_id, update)
        }
        TripScheduleRelationship::Added => {
            apply_added_trip(base, buffer, pattern_cache, feed_id, trip_id, update, warnings)
        }
        TripScheduleRelationship::Canceled => {
            apply_cancellation(base, buffer, trip_id, update)
        }
    }
}

fn apply_scheduled_update(
    base: &BaseModel,
    buffer: &mut TimetableBuffer,
    propagation: BackwardsDelayPropagation,
    trip_id: FeedScopedId,
    update: &TripUpdateMessage,
) -> Result<(), UpdateError> {
    let trip_idx = base
        .trip_idx(&trip_id)
        .filter(|trip_idx| base.trip_exists(*trip_idx, &update.service_date))
        .ok_or_else(|| UpdateError::UnknownTrip(trip_id.to_string()))?;
    let pattern = base
        .pattern_for_trip(trip_idx)
        .ok_or_else(|| UpdateError::UnknownTrip(trip_id.to_string()))?
        .clone();
    let scheduled = pattern
        .scheduled_timetable()
        .trip_times_for_trip(&trip_id)
        .ok_or_else(|| UpdateError::UnknownTrip(trip_id.to_string()))?;

    let trip_times =
        build_updated_trip_times(base, &pattern, scheduled, &trip_id, update, propagation)?;

    // the trip runs its schedule again : drop it from any pattern a
    // previous update moved it onto
    buffer.revert_trip_to_scheduled_pattern(&trip_id, update.service_date);
    buffer.update(&pattern, trip_times, update.service_date)
}

// Start from the scheduled times and rework them stop-time update by
// stop-time update, then propagate delays to the positions the update is
// silent about.
fn build_updated_trip_times(
    base: &BaseModel,
    pattern: &TripPattern,
    scheduled: &Arc<TripTimes>,
    trip_id: &FeedScopedId,
    update: &TripUpdateMessage,
    propagation: BackwardsDelayPropagation,
) -> Result<TripTimes, UpdateError> {
    let mut trip_times = TripTimes::clone(scheduled);
    trip_times.set_state(RealTimeState::Updated);
    let nb_of_stops = trip_times.nb_of_stops();
    // positions with an explicit realtime prediction
    let mut explicit = vec![false; nb_of_stops];

    for stop_time_update in &update.stop_time_updates {
        let position = stop_time_update.stop_sequence;
        if position >= nb_of_stops {
            return Err(UpdateError::InvalidStopSequence {
                trip_id: trip_id.clone(),
                stop_sequence: position,
            });
        }
        if let Some(stop_id) = &stop_time_update.stop_id {
            let stop_point = base.stop_point(pattern.stops()[position]);
            if stop_point.id.id != *stop_id {
                return Err(UpdateError::InvalidStopSequence {
                    trip_id: trip_id.clone(),
                    stop_sequence: position,
                });
            }
        }

        match stop_time_update.schedule_relationship {
            StopTimeScheduleRelationship::Skipped => {
                trip_times.set_stop_state(position, StopTimeState::Skipped);
            }
            StopTimeScheduleRelationship::NoData => {
                trip_times.set_stop_state(position, StopTimeState::NoData);
            }
            StopTimeScheduleRelationship::Scheduled => {
                let scheduled_arrival = scheduled.arrival_time(position);
                let scheduled_departure = scheduled.departure_time(position);
                let (arrival, departure) = match (
                    stop_time_update.arrival_time,
                    stop_time_update.departure_time,
                ) {
                    (Some(arrival), Some(departure)) => (arrival, departure),
                    (Some(arrival), None) => {
                        // carry the arrival delay over to the departure
                        let delay = arrival.seconds_since(&scheduled_arrival);
                        let departure = shift(scheduled_departure, delay, trip_id, position)?;
                        (arrival, departure)
                    }
                    (None, Some(departure)) => {
                        let delay = departure.seconds_since(&scheduled_departure);
                        let arrival = shift(scheduled_arrival, delay, trip_id, position)?;
                        (arrival, departure)
                    }
                    (None, None) => {
                        trip_times.set_stop_state(position, StopTimeState::NoData);
                        continue;
                    }
                };
                trip_times.set_arrival_time(position, arrival);
                trip_times.set_departure_time(position, departure);
                trip_times.set_stop_state(position, StopTimeState::Updated);
                explicit[position] = true;
            }
        }
    }

    propagate_delay_forwards(&mut trip_times, scheduled, &explicit, trip_id)?;
    propagate_delay_backwards(&mut trip_times, scheduled, &explicit, propagation, trip_id)?;

    trip_times
        .check_increasing()
        .map_err(|pair| UpdateError::NonMonotonicTimes {
            trip_id: trip_id.clone(),
            upstream: pair.upstream,
            downstream: pair.downstream,
        })?;

    Ok(trip_times)
}

// A delay observed at some position holds for the following positions
// until the next prediction.
fn propagate_delay_forwards(
    trip_times: &mut TripTimes,
    scheduled: &TripTimes,
    explicit: &[bool],
    trip_id: &FeedScopedId,
) -> Result<(), UpdateError> {
    let mut carried_delay = 0i32;
    for position in 0..trip_times.nb_of_stops() {
        if explicit[position] {
            carried_delay = trip_times
                .departure_time(position)
                .seconds_since(&scheduled.departure_time(position));
        } else if carried_delay != 0 {
            if let StopTimeState::Skipped = trip_times.stop_state(position) {
                continue;
            }
            let arrival = shift(
                scheduled.arrival_time(position),
                carried_delay,
                trip_id,
                position,
            )?;
            let departure = shift(
                scheduled.departure_time(position),
                carried_delay,
                trip_id,
                position,
            )?;
            trip_times.set_arrival_time(position, arrival);
            trip_times.set_departure_time(position, departure);
        }
    }
    Ok(())
}

// The stops before the first prediction have no data of their own; when
// the trip is already late there, their scheduled times may lie in the
// future of the prediction. The policy decides how much of the delay to
// push backwards onto them.
fn propagate_delay_backwards(
    trip_times: &mut TripTimes,
    scheduled: &TripTimes,
    explicit: &[bool],
    propagation: BackwardsDelayPropagation,
    trip_id: &FeedScopedId,
) -> Result<(), UpdateError> {
    let first_explicit = match explicit.iter().position(|is_explicit| *is_explicit) {
        Some(position) => position,
        None => return Ok(()),
    };

    match propagation {
        BackwardsDelayPropagation::Always => {
            let delay = trip_times
                .arrival_time(first_explicit)
                .seconds_since(&scheduled.arrival_time(first_explicit));
            if delay == 0 {
                return Ok(());
            }
            for position in 0..first_explicit {
                if let StopTimeState::Skipped = trip_times.stop_state(position) {
                    continue;
                }
                let arrival = shift(
                    scheduled.arrival_time(position),
                    delay,
                    trip_id,
                    position,
                )?;
                let departure = shift(
                    scheduled.departure_time(position),
                    delay,
                    trip_id,
                    position,
                )?;
                trip_times.set_arrival_time(position, arrival);
                trip_times.set_departure_time(position, departure);
                trip_times.set_stop_state(position, StopTimeState::Updated);
            }
        }
        BackwardsDelayPropagation::Required | BackwardsDelayPropagation::RequiredNoData => {
            let touched_state = match propagation {
                BackwardsDelayPropagation::RequiredNoData => StopTimeState::NoData,
                _ => StopTimeState::Updated,
            };
            let mut bound = trip_times.arrival_time(first_explicit);
            for position in (0..first_explicit).rev() {
                if let StopTimeState::Skipped = trip_times.stop_state(position) {
                    continue;
                }
                let mut touched = false;
                if trip_times.departure_time(position) > bound {
                    trip_times.set_departure_time(position, bound);
                    touched = true;
                }
                if trip_times.arrival_time(position) > trip_times.departure_time(position) {
                    trip_times.set_arrival_time(position, bound);
                    touched = true;
                }
                if !touched {
                    // earlier positions are already coherent
                    break;
                }
                trip_times.set_stop_state(position, touched_state);
                bound = trip_times.arrival_time(position);
            }
        }
    }
    Ok(())
}

fn shift(
    time: SecondsSinceDayStart,
    delay: i32,
    trip_id: &FeedScopedId,
    position: usize,
) -> Result<SecondsSinceDayStart, UpdateError> {
    time.checked_add_seconds(delay)
        .ok_or_else(|| UpdateError::NonMonotonicTimes {
            trip_id: trip_id.clone(),
            upstream: position,
            downstream: position,
        })
}

fn apply_added_trip(
    base: &BaseModel,
    buffer: &mut TimetableBuffer,
    pattern_cache: &mut TripPatternCache,
    feed_id: &str,
    trip_id: FeedScopedId,
    update: &TripUpdateMessage,
    warnings: &mut Vec<UpdateWarning>,
) -> Result<(), UpdateError> {
    let mut stops: Vec<StopPointIdx> = Vec::new();
    let mut arrival_times: Vec<SecondsSinceDayStart> = Vec::new();
    let mut departure_times: Vec<SecondsSinceDayStart> = Vec::new();
    let mut nb_of_removed_stops = 0usize;
    let mut has_first_unknown_stop: Option<String> = None;

    for stop_time_update in &update.stop_time_updates {
        let has_stop = stop_time_update.stop_id.as_ref().and_then(|stop_id| {
            let resolved = base.stop_point_idx(&FeedScopedId::new(feed_id, stop_id));
            if resolved.is_none() && has_first_unknown_stop.is_none() {
                has_first_unknown_stop = Some(FeedScopedId::new(feed_id, stop_id).to_string());
            }
            resolved
        });
        let has_arrival = stop_time_update
            .arrival_time
            .or(stop_time_update.departure_time);
        let has_departure = stop_time_update
            .departure_time
            .or(stop_time_update.arrival_time);
        match (has_stop, has_arrival, has_departure) {
            (Some(stop), Some(arrival), Some(departure)) => {
                stops.push(stop);
                arrival_times.push(arrival);
                departure_times.push(departure);
            }
            _ => {
                nb_of_removed_stops += 1;
            }
        }
    }

    if stops.len() < 2 {
        return Err(match has_first_unknown_stop {
            Some(stop_ref) => UpdateError::UnknownStop(stop_ref),
            None => UpdateError::PatternChangedTooFar { trip_id },
        });
    }
    if nb_of_removed_stops > 0 {
        warnings.push(UpdateWarning::UnknownStopsRemovedFromAddedTrip {
            trip_id: trip_id.clone(),
            nb_of_removed_stops,
        });
    }

    // an added trip may reuse the id of a known trip (replacement run); in
    // that case its scheduled pattern can absorb the update when the stop
    // sequence is unchanged
    let has_known_trip = base.trip_idx(&trip_id);
    let route_id = match has_known_trip {
        Some(trip_idx) => base.trip(trip_idx).route_id.clone(),
        None => {
            let route_ref = update.route_id.as_deref().unwrap_or(&update.trip_id);
            FeedScopedId::new(feed_id, route_ref)
        }
    };
    let has_scheduled_pattern =
        has_known_trip.and_then(|trip_idx| base.pattern_for_trip(trip_idx));
    let pattern = match has_scheduled_pattern {
        Some(scheduled_pattern) if scheduled_pattern.stops() == stops.as_slice() => {
            scheduled_pattern.clone()
        }
        _ => pattern_cache.get_or_create(&trip_id, &route_id, stops),
    };

    let trip_times = TripTimes::new_added(trip_id.clone(), arrival_times, departure_times);
    trip_times
        .check_increasing()
        .map_err(|pair| UpdateError::NonMonotonicTimes {
            trip_id: trip_id.clone(),
            upstream: pair.upstream,
            downstream: pair.downstream,
        })?;

    // a re-sent added trip may have changed its stops : drop it from the
    // pattern the previous version ran on, so it is never boardable on
    // two patterns at once
    buffer.revert_trip_to_scheduled_pattern(&trip_id, update.service_date);
    buffer.update(&pattern, trip_times, update.service_date)
}

fn apply_cancellation(
    base: &BaseModel,
    buffer: &mut TimetableBuffer,
    trip_id: FeedScopedId,
    update: &TripUpdateMessage,
) -> Result<(), UpdateError> {
    let trip_idx = base
        .trip_idx(&trip_id)
        .filter(|trip_idx| base.trip_exists(*trip_idx, &update.service_date))
        .ok_or_else(|| UpdateError::UnknownTrip(trip_id.to_string()))?;
    let pattern = base
        .pattern_for_trip(trip_idx)
        .ok_or_else(|| UpdateError::UnknownTrip(trip_id.to_string()))?
        .clone();
    let scheduled = pattern
        .scheduled_timetable()
        .trip_times_for_trip(&trip_id)
        .ok_or_else(|| UpdateError::UnknownTrip(trip_id.to_string()))?;

    let mut trip_times = TripTimes::clone(scheduled);
    trip_times.cancel();
    // the cancellation also concerns any pattern a previous update moved
    // the trip onto
    buffer.revert_trip_to_scheduled_pattern(&trip_id, update.service_date);
    buffer.update(&pattern, trip_times, update.service_date)
}
