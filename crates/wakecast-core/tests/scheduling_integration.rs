//! End-to-end scheduling scenarios against the public API.

mod common;

use chrono::{Days, Duration, Weekday};
use common::{at, harness, monday, time};
use wakecast_core::{
    select_sound, AlarmDefinition, AlarmId, AlarmState, DaySet, HolidayCalendar, HolidayPolicy,
    RecurrenceCalculator, ScheduleSettings, SkipOverrideStore, SkipState, SoundRef,
    WeatherCategory,
};

fn monday_seven(policy: HolidayPolicy) -> AlarmDefinition {
    AlarmDefinition::new(AlarmId(1), "Work", time(7, 0))
        .with_days(DaySet::only(Weekday::Mon))
        .with_policy(policy)
}

fn monday_holiday() -> HolidayCalendar {
    let mut cal = HolidayCalendar::new();
    cal.insert(monday(), "Spring Holiday");
    cal
}

#[test]
fn skip_policy_moves_to_following_monday() {
    let h = harness(monday_holiday(), at(monday(), 6, 0));
    let occ = h
        .engine
        .arm_next(&monday_seven(HolidayPolicy::Skip))
        .unwrap()
        .unwrap();

    assert_eq!(occ.fire_at, at(monday() + Days::new(7), 7, 0));
    assert!(!occ.is_holiday);
}

#[test]
fn delay_policy_fires_an_hour_later_today() {
    let h = harness(monday_holiday(), at(monday(), 6, 0));
    let occ = h
        .engine
        .arm_next(&monday_seven(HolidayPolicy::Delay))
        .unwrap()
        .unwrap();

    assert_eq!(occ.fire_at, at(monday(), 8, 0));
    assert_eq!(occ.effective_fire_time, time(8, 0));
    assert!(occ.is_holiday);

    let armed = h.db.armed_deliveries().unwrap();
    assert_eq!(armed[0].display_time, time(8, 0));
    let jobs = h.db.prefetch_jobs().unwrap();
    assert_eq!(jobs[0].run_at, at(monday(), 7, 30));
}

#[test]
fn holiday_only_waits_for_distant_holiday() {
    let holiday = monday() + Days::new(11);
    let mut cal = HolidayCalendar::new();
    cal.insert(holiday, "Remembrance Day");
    let now = at(monday(), 6, 0);

    let same = AlarmDefinition::new(AlarmId(2), "", time(9, 0)).holiday_only(true);
    let delayed = same.clone().with_policy(HolidayPolicy::Delay);

    let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
    let occ = calc.next_occurrence(&same, now).unwrap();
    assert_eq!(occ.fire_at, at(holiday, 9, 0));
    assert!(occ.is_holiday);

    let occ = calc.next_occurrence(&delayed, now).unwrap();
    assert_eq!(occ.fire_at, at(holiday, 10, 0));
    assert!(occ.is_holiday);
}

#[test]
fn weather_sound_then_default() {
    let def = AlarmDefinition::new(AlarmId(3), "", time(7, 0))
        .with_sound(WeatherCategory::Rain, SoundRef::new("A"))
        .with_default_sound(SoundRef::new("B"));
    let platform = SoundRef::new("builtin:alarm");

    assert_eq!(select_sound(&def, Some(WeatherCategory::Rain), &platform).as_str(), "A");
    assert_eq!(select_sound(&def, Some(WeatherCategory::Snow), &platform).as_str(), "B");
}

#[test]
fn skip_override_pushes_arm_past_next_occurrence() {
    let cal = HolidayCalendar::new();
    let now = at(monday(), 6, 0);
    let def = AlarmDefinition::new(AlarmId(4), "", time(7, 0));
    let h = harness(cal.clone(), now);

    let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
    let unmodified = calc.next_occurrence(&def, now).unwrap();
    h.skips.set(def.id, unmodified.fire_at).unwrap();

    let armed = h.engine.arm_next(&def).unwrap().unwrap();
    assert!(armed.fire_at > unmodified.fire_at);
    assert_eq!(armed.fire_at, unmodified.fire_at + Duration::days(1));
}

#[test]
fn arm_and_query_agree_without_override() {
    let now = at(monday(), 6, 0);
    let h = harness(monday_holiday(), now);
    for policy in [HolidayPolicy::Skip, HolidayPolicy::Delay, HolidayPolicy::Same] {
        let def = monday_seven(policy);
        let queried = h.engine.query().find_next(&[def.clone()], now).unwrap().unwrap();
        let armed = h.engine.arm_next(&def).unwrap().unwrap();
        assert_eq!(armed.fire_at, queried.occurrence.fire_at, "{policy:?}");
        assert_eq!(armed, queried.occurrence);
    }
}

#[test]
fn arm_and_query_agree_while_override_pending() {
    let now = at(monday(), 6, 0);
    let h = harness(HolidayCalendar::new(), now);
    let def = AlarmDefinition::new(AlarmId(5), "", time(7, 0));
    h.skips.set(def.id, at(monday(), 7, 0)).unwrap();

    let armed = h.engine.arm_next(&def).unwrap().unwrap();
    let queried = h.engine.query().find_next(&[def.clone()], now).unwrap().unwrap();
    assert_eq!(armed.fire_at, queried.occurrence.fire_at);
}

#[test]
fn query_has_no_side_effects() {
    let now = at(monday(), 6, 0);
    let h = harness(HolidayCalendar::new(), now);
    let def = AlarmDefinition::new(AlarmId(6), "", time(7, 0));
    let until = at(monday(), 7, 0);
    h.skips.set(def.id, until).unwrap();

    let query = h.engine.query();
    for _ in 0..5 {
        query.find_next(&[def.clone()], now).unwrap();
        query.find_next(&[def.clone()], now + Duration::days(3)).unwrap();
    }
    assert_eq!(h.skips.get(def.id).unwrap(), SkipState::PendingUntil(until));
    assert!(h.db.armed_deliveries().unwrap().is_empty());
    assert!(h.db.prefetch_jobs().unwrap().is_empty());

    let armed = h.engine.arm_next(&def).unwrap().unwrap();
    assert_eq!(armed.fire_at, at(monday() + Days::new(1), 7, 0));
}

#[test]
fn skip_once_is_consumed_exactly_once() {
    let now = at(monday(), 6, 0);
    let h = harness(HolidayCalendar::new(), now);
    let def = AlarmDefinition::new(AlarmId(7), "", time(7, 0));
    h.skips.set(def.id, at(monday(), 7, 0)).unwrap();

    let first = h.engine.arm_next(&def).unwrap().unwrap();
    assert_eq!(first.fire_at, at(monday() + Days::new(1), 7, 0));

    // The alarm fires on Tuesday; Wednesday must follow, not Thursday.
    h.clock.set(first.fire_at);
    let second = h.engine.on_fired(&def).unwrap().unwrap();
    assert_eq!(second.fire_at, at(monday() + Days::new(2), 7, 0));
    assert_eq!(h.skips.get(def.id).unwrap(), SkipState::None);

    h.clock.set(second.fire_at);
    let third = h.engine.on_fired(&def).unwrap().unwrap();
    assert_eq!(third.fire_at, at(monday() + Days::new(3), 7, 0));
}

#[test]
fn cancel_clears_outbox() {
    let h = harness(HolidayCalendar::new(), at(monday(), 6, 0));
    let def = AlarmDefinition::new(AlarmId(8), "", time(7, 0));
    h.engine.arm_next(&def).unwrap();
    assert_eq!(h.db.armed_deliveries().unwrap().len(), 1);

    h.engine.cancel(def.id).unwrap();
    h.engine.cancel(def.id).unwrap();
    assert!(h.db.armed_deliveries().unwrap().is_empty());
    assert!(h.db.prefetch_jobs().unwrap().is_empty());
}

#[test]
fn distinct_alarms_arm_concurrently() {
    let h = harness(HolidayCalendar::new(), at(monday(), 6, 0));
    let engine = &h.engine;
    std::thread::scope(|scope| {
        for id in 1..=8 {
            scope.spawn(move || {
                let def = AlarmDefinition::new(AlarmId(id), "", time(7, id as u32));
                engine.arm_next(&def).unwrap();
            });
        }
    });
    let armed = h.db.armed_deliveries().unwrap();
    assert_eq!(armed.len(), 8);
    assert_eq!(armed[0].alarm_id, AlarmId(1));
}

#[test]
fn same_alarm_arm_and_cancel_never_interleave() {
    let h = harness(HolidayCalendar::new(), at(monday(), 6, 0));
    let engine = &h.engine;
    let def = AlarmDefinition::new(AlarmId(1), "", time(7, 0));

    for _ in 0..200 {
        std::thread::scope(|scope| {
            let def = &def;
            scope.spawn(move || engine.arm_next(def).unwrap());
            scope.spawn(move || engine.cancel(def.id).unwrap());
        });

        let armed = h.db.armed_deliveries().unwrap();
        let jobs = h.db.prefetch_jobs().unwrap();
        assert_eq!(armed.len(), jobs.len());
        match armed.first() {
            Some(delivery) => {
                assert_eq!(delivery.fire_at, at(monday(), 7, 0));
                assert_eq!(jobs[0].run_at, at(monday(), 6, 30));
                assert_eq!(
                    engine.state_of(def.id),
                    AlarmState::Armed {
                        fire_at: delivery.fire_at
                    }
                );
            }
            None => assert_eq!(engine.state_of(def.id), AlarmState::Unarmed),
        }
    }
}
