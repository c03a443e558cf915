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

//! The estimated-timetable dialect : vehicle journeys referenced by dated
//! journey identifiers, with calls keyed by quay id. References may be
//! missing; resolution goes through the
//! [`EntityResolver`](crate::realtime::EntityResolver) precedence chain
//! and, on failure, the optional fuzzy matcher.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{
    BaseModel, FeedScopedId, RealTimeState, StopPointIdx, StopTimeState, TripTimes,
};
use crate::realtime::entity_resolver::{EntityResolver, FuzzyTripMatcher};
use crate::realtime::messages::{
    EstimatedCall, EstimatedTimetableDelivery, EstimatedVehicleJourney, UpdateIncrementality,
};
use crate::realtime::pattern_cache::TripPatternCache;
use crate::realtime::{UpdateError, UpdateResult, UpdateWarning};
use crate::snapshot::TimetableBuffer;
use crate::time::SecondsSinceDayStart;

pub fn apply_estimated_timetables(
    base: &BaseModel,
    buffer: &mut TimetableBuffer,
    pattern_cache: &mut TripPatternCache,
    fuzzy_matcher: Option<&dyn FuzzyTripMatcher>,
    feed_id: &str,
    incrementality: UpdateIncrementality,
    deliveries: &[EstimatedTimetableDelivery],
) -> UpdateResult {
    let mut result = UpdateResult::new();

    if let UpdateIncrementality::FullDataset = incrementality {
        debug!("full dataset received for feed {}, clearing it", feed_id);
        buffer.clear(feed_id);
    }

    for delivery in deliveries {
        for journey in &delivery.estimated_journeys {
            let applied = apply_estimated_journey(
                base,
                buffer,
                pattern_cache,
                fuzzy_matcher,
                feed_id,
                journey,
                &mut result.warnings,
            );
            match applied {
                Ok(()) => result.successes += 1,
                Err(err) => {
                    warn!("skipping journey {}: {}", journey.reference(), err);
                    result.errors.push(err);
                }
            }
        }
    }
    result
}

fn apply_estimated_journey(
    base: &BaseModel,
    buffer: &mut TimetableBuffer,
    pattern_cache: &mut TripPatternCache,
    fuzzy_matcher: Option<&dyn FuzzyTripMatcher>,
    feed_id: &str,
    journey: &EstimatedVehicleJourney,
    warnings: &mut Vec<UpdateWarning>,
) -> Result<(), UpdateError> {
    let resolver = EntityResolver::new(base, feed_id);

    if journey.extra_journey {
        return apply_extra_journey(buffer, pattern_cache, &resolver, feed_id, journey, warnings);
    }

    let (trip_idx, service_date) = match resolver.resolve_trip_and_date(journey) {
        Ok(resolved) => resolved,
        Err(err) => {
            // explicit references failed, give the heuristics a chance
            let has_fuzzy_match =
                fuzzy_matcher.and_then(|matcher| matcher.match_trip_and_date(base, journey));
            match has_fuzzy_match {
                Some(resolved) => resolved,
                None => return Err(err),
            }
        }
    };

    let trip = base.trip(trip_idx);
    let trip_id = trip.id.clone();
    let scheduled_pattern = base
        .pattern_for_trip(trip_idx)
        .ok_or_else(|| UpdateError::UnknownTrip(trip_id.to_string()))?
        .clone();
    let scheduled = scheduled_pattern
        .scheduled_timetable()
        .trip_times_for_trip(&trip_id)
        .ok_or_else(|| UpdateError::UnknownTrip(trip_id.to_string()))?;

    if journey.cancellation {
        let mut trip_times = TripTimes::clone(scheduled);
        trip_times.cancel();
        // the cancellation also concerns any pattern a previous update
        // moved the trip onto
        buffer.revert_trip_to_scheduled_pattern(&trip_id, service_date);
        return buffer.update(&scheduled_pattern, trip_times, service_date);
    }

    let (stops, arrival_times, departure_times) =
        resolve_calls(&resolver, &trip_id, journey.calls())?;

    if stops == scheduled_pattern.stops() {
        let mut trip_times =
            TripTimes::new_added(trip_id.clone(), arrival_times, departure_times);
        trip_times.set_state(RealTimeState::Updated);
        mark_cancelled_calls(&mut trip_times, journey.calls());
        check_times(&trip_times, &trip_id)?;
        // a previous update may have moved the trip onto a synthesized
        // pattern; it now runs its scheduled stops again
        if buffer.revert_trip_to_scheduled_pattern(&trip_id, service_date) {
            debug!(
                "trip {} reverts to its scheduled pattern on {}",
                trip_id, service_date
            );
        }
        return buffer.update(&scheduled_pattern, trip_times, service_date);
    }

    // the journey now calls at other quays than scheduled : move the trip
    // onto a synthesized pattern, but only follow a divergence that keeps
    // the number of calls
    if stops.len() != scheduled_pattern.stops().len() {
        return Err(UpdateError::PatternChangedTooFar { trip_id });
    }
    let pattern = pattern_cache.get_or_create(&trip_id, &trip.route_id, stops);
    let mut trip_times = TripTimes::new_added(trip_id.clone(), arrival_times, departure_times);
    trip_times.set_state(RealTimeState::Updated);
    mark_cancelled_calls(&mut trip_times, journey.calls());
    check_times(&trip_times, &trip_id)?;
    // drop the trip from the pattern a previous update moved it onto, so
    // it is never boardable on two patterns at once
    buffer.revert_trip_to_scheduled_pattern(&trip_id, service_date);
    buffer.update(&pattern, trip_times, service_date)?;

    // the scheduled pattern still carries the trip : cancel it there so a
    // search cannot board the ghost run
    let mut ghost_times = TripTimes::clone(scheduled);
    ghost_times.cancel();
    buffer.update(&scheduled_pattern, ghost_times, service_date)
}

// An extra journey is not in the schedule at all : every call must
// resolve, the date comes from the framed journey reference, and the trip
// always runs on a synthesized pattern.
fn apply_extra_journey(
    buffer: &mut TimetableBuffer,
    pattern_cache: &mut TripPatternCache,
    resolver: &EntityResolver,
    feed_id: &str,
    journey: &EstimatedVehicleJourney,
    warnings: &mut Vec<UpdateWarning>,
) -> Result<(), UpdateError> {
    let trip_id = FeedScopedId::new(feed_id, journey.reference());
    let service_date = resolve_extra_journey_date(journey)?;

    let mut stops: Vec<StopPointIdx> = Vec::new();
    let mut arrival_times: Vec<SecondsSinceDayStart> = Vec::new();
    let mut departure_times: Vec<SecondsSinceDayStart> = Vec::new();
    let mut nb_of_removed_stops = 0usize;
    let mut has_first_unknown_quay: Option<String> = None;

    for call in journey.calls() {
        let has_quay = resolver.resolve_quay(&call.quay_ref);
        if has_quay.is_none() && has_first_unknown_quay.is_none() {
            has_first_unknown_quay =
                Some(FeedScopedId::new(feed_id, &call.quay_ref).to_string());
        }
        match (has_quay, call.best_arrival_time(), call.best_departure_time()) {
            (Some(quay), Some(arrival), Some(departure)) => {
                stops.push(quay);
                arrival_times.push(arrival);
                departure_times.push(departure);
            }
            _ => {
                nb_of_removed_stops += 1;
            }
        }
    }

    if stops.len() < 2 {
        return Err(match has_first_unknown_quay {
            Some(quay_ref) => UpdateError::UnknownStop(quay_ref),
            None => UpdateError::PatternChangedTooFar { trip_id },
        });
    }
    if nb_of_removed_stops > 0 {
        warnings.push(UpdateWarning::UnknownStopsRemovedFromAddedTrip {
            trip_id: trip_id.clone(),
            nb_of_removed_stops,
        });
    }

    let route_ref = journey.line_ref.as_deref().unwrap_or(journey.reference());
    let route_id = FeedScopedId::new(feed_id, route_ref);
    let pattern = pattern_cache.get_or_create(&trip_id, &route_id, stops);

    let trip_times = TripTimes::new_added(trip_id.clone(), arrival_times, departure_times);
    check_times(&trip_times, &trip_id)?;
    // a re-sent extra journey may have changed its stops : drop it from
    // the pattern the previous version ran on
    buffer.revert_trip_to_scheduled_pattern(&trip_id, service_date);
    buffer.update(&pattern, trip_times, service_date)
}

fn resolve_extra_journey_date(
    journey: &EstimatedVehicleJourney,
) -> Result<NaiveDate, UpdateError> {
    let framed = journey
        .framed_vehicle_journey_ref
        .as_ref()
        .ok_or_else(|| UpdateError::UnknownTrip(journey.reference().to_string()))?;
    framed
        .data_frame_ref
        .parse::<NaiveDate>()
        .map_err(|_| UpdateError::DateUnparseable(framed.data_frame_ref.clone()))
}

// All calls must resolve and carry a usable time for a journey of the
// schedule : unlike an extra journey, silently dropping a call would
// desynchronize the call list from the pattern.
fn resolve_calls<'a>(
    resolver: &EntityResolver,
    trip_id: &FeedScopedId,
    calls: impl Iterator<Item = &'a EstimatedCall>,
) -> Result<
    (
        Vec<StopPointIdx>,
        Vec<SecondsSinceDayStart>,
        Vec<SecondsSinceDayStart>,
    ),
    UpdateError,
> {
    let mut stops = Vec::new();
    let mut arrival_times = Vec::new();
    let mut departure_times = Vec::new();
    for (position, call) in calls.enumerate() {
        let quay = resolver
            .resolve_quay(&call.quay_ref)
            .ok_or_else(|| UpdateError::UnknownStop(call.quay_ref.clone()))?;
        let has_times = call.best_arrival_time().zip(call.best_departure_time());
        let (arrival, departure) = match has_times {
            Some(times) => times,
            None => {
                return Err(UpdateError::InvalidStopSequence {
                    trip_id: trip_id.clone(),
                    stop_sequence: position,
                });
            }
        };
        stops.push(quay);
        arrival_times.push(arrival);
        departure_times.push(departure);
    }
    Ok((stops, arrival_times, departure_times))
}

fn mark_cancelled_calls<'a>(
    trip_times: &mut TripTimes,
    calls: impl Iterator<Item = &'a EstimatedCall>,
) {
    for (position, call) in calls.enumerate() {
        if call.cancellation && position < trip_times.nb_of_stops() {
            trip_times.set_stop_state(position, StopTimeState::Skipped);
        }
    }
}

fn check_times(trip_times: &TripTimes, trip_id: &FeedScopedId) -> Result<(), UpdateError> {
    trip_times
        .check_increasing()
        .map_err(|pair| UpdateError::NonMonotonicTimes {
            trip_id: trip_id.clone(),
            upstream: pair.upstream,
            downstream: pair.downstream,
        })
}
