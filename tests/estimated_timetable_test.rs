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

mod utils;

use std::sync::Arc;

use anyhow::Error;
use heimdall::chrono::NaiveDate;
use heimdall::models::{BaseModel, ModelBuilder, TripIdx};
use heimdall::realtime::{
    EstimatedCall, EstimatedTimetableDelivery, EstimatedVehicleJourney, FramedVehicleJourneyRef,
    FuzzyTripMatcher, UpdateError, UpdateIncrementality,
};
use utils::{date, id, init, pattern_of, test_source, time, FEED_ID, SERVICE_DATE};

fn model_with_dated_journey() -> BaseModel {
    ModelBuilder::new(FEED_ID)
        .trip("T1", |trip| {
            trip.calendar(&[SERVICE_DATE])
                .st("A", "10:00:00", "10:00:00")
                .st("B", "10:10:00", "10:10:00");
        })
        .stop_point("C")
        .trip_on_service_date("dsj:T1", "T1", SERVICE_DATE)
        // a replacement run of T1 outside its regular calendar
        .trip_on_service_date("dsj:extra-day", "T1", "2024-06-03")
        .build()
}

fn call(quay: &str, arrival: &str, departure: &str) -> EstimatedCall {
    EstimatedCall {
        quay_ref: quay.to_string(),
        aimed_arrival_time: Some(time(arrival)),
        expected_arrival_time: None,
        aimed_departure_time: Some(time(departure)),
        expected_departure_time: None,
        cancellation: false,
    }
}

fn delivery(journeys: Vec<EstimatedVehicleJourney>) -> EstimatedTimetableDelivery {
    EstimatedTimetableDelivery {
        estimated_journeys: journeys,
    }
}

fn framed(data_frame: &str, journey_ref: &str) -> FramedVehicleJourneyRef {
    FramedVehicleJourneyRef {
        data_frame_ref: data_frame.to_string(),
        dated_vehicle_journey_ref: journey_ref.to_string(),
    }
}

#[test]
fn framed_reference_resolves_trip_and_date() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();

    let journey = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed(SERVICE_DATE, "T1")),
        estimated_calls: vec![call("A", "10:02:00", "10:02:00"), call("B", "10:12:00", "10:12:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(result.is_fully_applied());

    let snapshot = source.current_snapshot();
    let pattern = pattern_of(&model, "T1");
    assert_eq!(
        snapshot
            .resolve(&pattern, date(SERVICE_DATE))
            .trip_times_for_trip(&id("T1"))
            .unwrap()
            .arrival_time(1),
        time("10:12:00")
    );
    Ok(())
}

#[test]
fn unparseable_data_frame_falls_back_to_dated_reference() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();

    let journey = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed("not-a-date", "T1")),
        dated_vehicle_journey_ref: Some("dsj:T1".to_string()),
        estimated_calls: vec![call("A", "10:02:00", "10:02:00"), call("B", "10:12:00", "10:12:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(result.is_fully_applied());
    Ok(())
}

#[test]
fn unparseable_data_frame_without_fallback_is_reported() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();

    let journey = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed("not-a-date", "T1")),
        estimated_calls: vec![call("A", "10:02:00", "10:02:00"), call("B", "10:12:00", "10:12:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(matches!(
        result.errors.as_slice(),
        [UpdateError::DateUnparseable(_)]
    ));
    Ok(())
}

#[test]
fn framed_reference_on_a_day_without_service_is_rejected() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();

    // T1 neither runs on 2024-07-09 nor has a dated journey for it
    let journey = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed("2024-07-09", "T1")),
        estimated_calls: vec![call("A", "10:02:00", "10:02:00"), call("B", "10:12:00", "10:12:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(matches!(
        result.errors.as_slice(),
        [UpdateError::UnknownTrip(_)]
    ));
    Ok(())
}

#[test]
fn framed_reference_accepts_a_dated_journey_outside_the_calendar() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();

    // 2024-06-03 is not in T1's calendar, but the static model carries a
    // dated journey for the pair
    let journey = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed("2024-06-03", "T1")),
        estimated_calls: vec![call("A", "10:02:00", "10:02:00"), call("B", "10:12:00", "10:12:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(result.is_fully_applied());

    let snapshot = source.current_snapshot();
    let pattern = pattern_of(&model, "T1");
    assert_eq!(
        snapshot
            .resolve(&pattern, date("2024-06-03"))
            .trip_times_for_trip(&id("T1"))
            .unwrap()
            .arrival_time(1),
        time("10:12:00")
    );
    Ok(())
}

#[test]
fn journey_code_resolves_through_the_dated_journey() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();

    let journey = EstimatedVehicleJourney {
        estimated_vehicle_journey_code: Some("dsj:T1".to_string()),
        estimated_calls: vec![call("A", "10:02:00", "10:02:00"), call("B", "10:12:00", "10:12:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(result.is_fully_applied());
    Ok(())
}

struct MatchEverythingToT1;

impl FuzzyTripMatcher for MatchEverythingToT1 {
    fn match_trip_and_date(
        &self,
        base: &BaseModel,
        _journey: &EstimatedVehicleJourney,
    ) -> Option<(TripIdx, NaiveDate)> {
        let trip_idx = base.trip_idx(&id("T1"))?;
        Some((trip_idx, date(SERVICE_DATE)))
    }
}

#[test]
fn fuzzy_matcher_rescues_unreferenced_journeys() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();

    let journey = EstimatedVehicleJourney {
        estimated_calls: vec![call("A", "10:02:00", "10:02:00"), call("B", "10:12:00", "10:12:00")],
        ..EstimatedVehicleJourney::default()
    };

    // without the matcher the journey is dropped
    let mut source = test_source();
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey.clone()])],
    );
    assert!(matches!(
        result.errors.as_slice(),
        [UpdateError::UnknownTrip(_)]
    ));

    // with it the journey lands on T1
    let mut source = test_source();
    source.set_fuzzy_trip_matcher(Box::new(MatchEverythingToT1));
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(result.is_fully_applied());
    Ok(())
}

#[test]
fn rerouted_journey_moves_to_a_synthesized_pattern_and_back() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();
    let day = date(SERVICE_DATE);
    let scheduled_pattern = pattern_of(&model, "T1");

    // T1 now calls at C instead of B
    let rerouted = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed(SERVICE_DATE, "T1")),
        estimated_calls: vec![call("A", "10:00:00", "10:00:00"), call("C", "10:15:00", "10:15:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![rerouted])],
    );
    assert!(result.is_fully_applied());

    let snapshot = source.current_snapshot();
    let moved_pattern = snapshot
        .realtime_added_pattern(&id("T1"), day)
        .expect("T1 should be moved to a synthesized pattern")
        .clone();
    assert!(moved_pattern.is_created_by_realtime_updater());
    let stop_c = model.stop_point_idx(&id("C")).unwrap();
    assert_eq!(moved_pattern.stops()[1], stop_c);

    // the scheduled pattern carries a canceled ghost so searches cannot
    // board the old run
    let ghost = snapshot
        .resolve(&scheduled_pattern, day)
        .trip_times_for_trip(&id("T1"))
        .unwrap()
        .clone();
    assert!(ghost.is_canceled());

    // next delivery : the journey runs its scheduled stops again
    let restored = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed(SERVICE_DATE, "T1")),
        estimated_calls: vec![call("A", "10:00:00", "10:00:00"), call("B", "10:11:00", "10:11:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![restored])],
    );
    assert!(result.is_fully_applied());

    let snapshot = source.current_snapshot();
    assert!(snapshot.realtime_added_pattern(&id("T1"), day).is_none());
    // the synthesized pattern lost the trip times
    assert!(snapshot
        .resolve(&moved_pattern, day)
        .trip_times_for_trip(&id("T1"))
        .is_none());
    // and the scheduled pattern carries the updated run
    let restored_times = snapshot
        .resolve(&scheduled_pattern, day)
        .trip_times_for_trip(&id("T1"))
        .unwrap()
        .clone();
    assert!(!restored_times.is_canceled());
    assert_eq!(restored_times.arrival_time(1), time("10:11:00"));
    Ok(())
}

#[test]
fn rerouted_journey_moves_between_synthesized_patterns_without_double_booking(
) -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();
    let day = date(SERVICE_DATE);

    let first_reroute = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed(SERVICE_DATE, "T1")),
        estimated_calls: vec![call("A", "10:00:00", "10:00:00"), call("C", "10:15:00", "10:15:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![first_reroute])],
    );
    assert!(result.is_fully_applied());
    let first_pattern = source
        .current_snapshot()
        .realtime_added_pattern(&id("T1"), day)
        .expect("T1 should be moved to a synthesized pattern")
        .clone();

    // rerouted again, onto yet another quay sequence
    let second_reroute = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed(SERVICE_DATE, "T1")),
        estimated_calls: vec![call("B", "10:05:00", "10:05:00"), call("C", "10:18:00", "10:18:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![second_reroute])],
    );
    assert!(result.is_fully_applied());

    let snapshot = source.current_snapshot();
    let second_pattern = snapshot
        .realtime_added_pattern(&id("T1"), day)
        .expect("T1 should still be on a synthesized pattern")
        .clone();
    assert!(!Arc::ptr_eq(&first_pattern, &second_pattern));
    let stop_b = model.stop_point_idx(&id("B")).unwrap();
    assert_eq!(second_pattern.stops()[0], stop_b);

    // the first synthesized pattern no longer carries the trip, only the
    // second one does
    assert!(snapshot
        .resolve(&first_pattern, day)
        .trip_times_for_trip(&id("T1"))
        .is_none());
    assert_eq!(
        snapshot
            .resolve(&second_pattern, day)
            .trip_times_for_trip(&id("T1"))
            .unwrap()
            .arrival_time(1),
        time("10:18:00")
    );
    Ok(())
}

#[test]
fn cancellation_after_reroute_clears_the_synthesized_pattern() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();
    let day = date(SERVICE_DATE);

    let rerouted = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed(SERVICE_DATE, "T1")),
        estimated_calls: vec![call("A", "10:00:00", "10:00:00"), call("C", "10:15:00", "10:15:00")],
        ..EstimatedVehicleJourney::default()
    };
    source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![rerouted])],
    );
    let moved_pattern = source
        .current_snapshot()
        .realtime_added_pattern(&id("T1"), day)
        .expect("T1 should be moved to a synthesized pattern")
        .clone();

    let canceled = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed(SERVICE_DATE, "T1")),
        cancellation: true,
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![canceled])],
    );
    assert!(result.is_fully_applied());

    let snapshot = source.current_snapshot();
    assert!(snapshot.realtime_added_pattern(&id("T1"), day).is_none());
    assert!(snapshot
        .resolve(&moved_pattern, day)
        .trip_times_for_trip(&id("T1"))
        .is_none());
    let scheduled_pattern = pattern_of(&model, "T1");
    assert!(snapshot
        .resolve(&scheduled_pattern, day)
        .trip_times_for_trip(&id("T1"))
        .unwrap()
        .is_canceled());
    Ok(())
}

#[test]
fn pattern_divergence_with_different_call_count_is_rejected() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();

    let journey = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed(SERVICE_DATE, "T1")),
        estimated_calls: vec![
            call("A", "10:00:00", "10:00:00"),
            call("B", "10:10:00", "10:10:00"),
            call("C", "10:20:00", "10:20:00"),
        ],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(matches!(
        result.errors.as_slice(),
        [UpdateError::PatternChangedTooFar { .. }]
    ));
    Ok(())
}

#[test]
fn canceled_journey_is_marked_canceled() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();

    let journey = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed(SERVICE_DATE, "T1")),
        cancellation: true,
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(result.is_fully_applied());

    let snapshot = source.current_snapshot();
    let pattern = pattern_of(&model, "T1");
    assert!(snapshot
        .resolve(&pattern, date(SERVICE_DATE))
        .trip_times_for_trip(&id("T1"))
        .unwrap()
        .is_canceled());
    Ok(())
}

#[test]
fn unknown_quay_in_a_scheduled_journey_is_rejected() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();

    let journey = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed(SERVICE_DATE, "T1")),
        estimated_calls: vec![
            call("A", "10:00:00", "10:00:00"),
            call("nowhere", "10:10:00", "10:10:00"),
        ],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(matches!(
        result.errors.as_slice(),
        [UpdateError::UnknownStop(_)]
    ));
    Ok(())
}

#[test]
fn extra_journey_builds_its_own_pattern() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();
    let day = date(SERVICE_DATE);

    let journey = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed(SERVICE_DATE, "extra:1")),
        line_ref: Some("L1".to_string()),
        extra_journey: true,
        estimated_calls: vec![call("B", "13:00:00", "13:00:00"), call("C", "13:20:00", "13:20:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(result.is_fully_applied());

    let snapshot = source.current_snapshot();
    let pattern = snapshot
        .realtime_added_pattern(&id("extra:1"), day)
        .expect("the extra journey should run on a synthesized pattern")
        .clone();
    assert!(pattern.is_created_by_realtime_updater());
    assert_eq!(pattern.route_id(), &id("L1"));
    let stop_b = model.stop_point_idx(&id("B")).unwrap();
    assert!(snapshot
        .patterns_for_stop(&stop_b)
        .any(|other| Arc::ptr_eq(other, &pattern)));
    Ok(())
}

#[test]
fn extra_journey_without_a_date_is_rejected() -> Result<(), Error> {
    init();
    let model = model_with_dated_journey();
    let mut source = test_source();

    let journey = EstimatedVehicleJourney {
        framed_vehicle_journey_ref: Some(framed("not-a-date", "extra:1")),
        extra_journey: true,
        estimated_calls: vec![call("B", "13:00:00", "13:00:00"), call("C", "13:20:00", "13:20:00")],
        ..EstimatedVehicleJourney::default()
    };
    let result = source.apply_estimated_timetables(
        &model,
        FEED_ID,
        UpdateIncrementality::Differential,
        &[delivery(vec![journey])],
    );
    assert!(matches!(
        result.errors.as_slice(),
        [UpdateError::DateUnparseable(_)]
    ));
    Ok(())
}
