use anyhow::{Result, bail};
use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

use crate::models::{FeedingSettings, PLAN_LENGTH, PlannedEntry, sort_by_clock, validate_settings};

/// Generate the deterministic fallback plan: locked feedings verbatim, the
/// remaining slots spaced `ideal` hours apart starting from `now`.
///
/// The cursor is a full date-time, not a bare clock; a slot is only rejected
/// when its clock collides with a locked time (locked feedings recur daily).
/// Past the date boundary the same clock string can therefore appear twice,
/// which keeps long windows schedulable instead of spinning on wraparound
/// collisions.
#[allow(clippy::cast_sign_loss)]
pub fn fallback_schedule(
    settings: &FeedingSettings,
    now: NaiveDateTime,
) -> Result<Vec<PlannedEntry>> {
    validate_settings(settings)?;

    let target = settings.feed_amounts.target;
    let locked_times = settings.active_locked_times();

    if locked_times.len() > PLAN_LENGTH {
        bail!(
            "{} locked feedings configured but a plan holds only {PLAN_LENGTH}",
            locked_times.len()
        );
    }

    let mut entries: Vec<PlannedEntry> = locked_times
        .iter()
        .map(|time| PlannedEntry {
            id: Uuid::new_v4().to_string(),
            time: time.clone(),
            amount: target,
            is_locked: true,
            is_completed: false,
        })
        .collect();

    let step_minutes = (settings.feed_windows.ideal * 60.0).round() as i64;
    if step_minutes < 1 {
        bail!("Ideal feeding window is too small to schedule (under one minute)");
    }
    let step = Duration::minutes(step_minutes);

    let max_steps = PLAN_LENGTH * (24.0 / settings.feed_windows.ideal).ceil() as usize
        + locked_times.len();

    let mut cursor = now;
    let mut steps = 0;
    while entries.len() < PLAN_LENGTH {
        if steps >= max_steps {
            bail!(
                "Could not place {PLAN_LENGTH} feedings within {max_steps} attempts; \
                 the locked times leave no room at an ideal window of {} hours",
                settings.feed_windows.ideal
            );
        }
        steps += 1;
        cursor += step;

        let clock = cursor.format("%H:%M").to_string();
        if locked_times.contains(&clock) {
            continue;
        }
        entries.push(PlannedEntry {
            id: Uuid::new_v4().to_string(),
            time: clock,
            amount: target,
            is_locked: false,
            is_completed: false,
        });
    }

    sort_by_clock(&mut entries);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedAmounts, FeedWindows, LockedFeedings, parse_clock, validate_plan};
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn settings(ideal: f64, target: f64, locked: &[&str]) -> FeedingSettings {
        FeedingSettings {
            feed_windows: FeedWindows {
                min: 0.5,
                max: 24.0,
                ideal,
            },
            feed_amounts: FeedAmounts {
                min: 0.5,
                max: 10.0,
                target,
            },
            use_metric: false,
            locked_feedings: LockedFeedings {
                enabled: !locked.is_empty(),
                times: locked.iter().map(|t| (*t).to_string()).collect(),
            },
        }
    }

    fn times(entries: &[PlannedEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.time.as_str()).collect()
    }

    #[test]
    fn test_locked_plus_generated_scenario() {
        // Five locked slots, ideal 2.5h, starting 08:30
        let s = settings(2.5, 2.0, &["22:00", "00:30", "03:00", "05:30", "08:00"]);
        let plan = fallback_schedule(&s, at(8, 30)).unwrap();

        assert_eq!(
            times(&plan),
            vec![
                "00:30", "03:00", "05:30", "08:00", "11:00", "13:30", "16:00", "18:30", "21:00",
                "22:00"
            ]
        );
        for e in &plan {
            assert!((e.amount - 2.0).abs() < f64::EPSILON);
            assert!(!e.is_completed);
        }
        let locked: Vec<&str> = plan.iter().filter(|e| e.is_locked).map(|e| e.time.as_str()).collect();
        assert_eq!(locked, vec!["00:30", "03:00", "05:30", "08:00", "22:00"]);
        assert!(validate_plan(&plan, &s).is_ok());
    }

    #[test]
    fn test_day_boundary_wrap_reuses_clock_times() {
        // ideal 3h from 06:00 crosses midnight; 09:00 and 12:00 recur on the
        // next day instead of exhausting the attempt budget.
        let s = settings(3.0, 2.5, &[]);
        let plan = fallback_schedule(&s, at(6, 0)).unwrap();

        assert_eq!(
            times(&plan),
            vec![
                "00:00", "03:00", "06:00", "09:00", "09:00", "12:00", "12:00", "15:00", "18:00",
                "21:00"
            ]
        );
        assert!(validate_plan(&plan, &s).is_ok());
    }

    #[test]
    fn test_exactly_ten_sorted_entries() {
        let s = settings(2.0, 4.0, &[]);
        let plan = fallback_schedule(&s, at(7, 15)).unwrap();

        assert_eq!(plan.len(), 10);
        let minutes: Vec<u32> = plan.iter().map(|e| parse_clock(&e.time).unwrap()).collect();
        let mut sorted = minutes.clone();
        sorted.sort_unstable();
        assert_eq!(minutes, sorted);
        assert!(plan.iter().all(|e| !e.is_locked));
    }

    #[test]
    fn test_idempotent_for_same_inputs() {
        let s = settings(2.5, 3.0, &["22:00"]);
        let a = fallback_schedule(&s, at(9, 0)).unwrap();
        let b = fallback_schedule(&s, at(9, 0)).unwrap();

        let shape = |p: &[PlannedEntry]| {
            p.iter()
                .map(|e| (e.time.clone(), e.amount.to_bits(), e.is_locked))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&a), shape(&b));
        // Fresh ids every run
        assert_ne!(a[0].id, b[0].id);
    }

    #[test]
    fn test_locked_disabled_times_ignored() {
        let mut s = settings(3.0, 2.0, &[]);
        s.locked_feedings = LockedFeedings {
            enabled: false,
            times: vec!["09:00".to_string()],
        };
        let plan = fallback_schedule(&s, at(6, 0)).unwrap();
        // 09:00 is generated normally because the lock list is disabled
        assert!(plan.iter().any(|e| e.time == "09:00" && !e.is_locked));
    }

    #[test]
    fn test_exhaustion_when_cursor_phases_onto_locked_time() {
        // A 24h ideal window from 06:00 lands on 06:00 every single step;
        // with 06:00 locked, no generated slot can ever be placed.
        let s = settings(24.0, 2.0, &["06:00"]);
        let err = fallback_schedule(&s, at(6, 0)).unwrap_err();
        assert!(err.to_string().contains("attempts"), "{err}");
    }

    #[test]
    fn test_too_many_locked_times() {
        let locked: Vec<String> = (0..11).map(|h| format!("{h:02}:00")).collect();
        let refs: Vec<&str> = locked.iter().map(String::as_str).collect();
        let s = settings(3.0, 2.0, &refs);
        assert!(fallback_schedule(&s, at(6, 0)).is_err());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut s = settings(3.0, 2.0, &[]);
        s.feed_windows.min = 0.0;
        assert!(fallback_schedule(&s, at(6, 0)).is_err());
    }

    #[test]
    fn test_sub_minute_ideal_rejected() {
        let mut s = settings(3.0, 2.0, &[]);
        s.feed_windows = FeedWindows {
            min: 0.001,
            max: 1.0,
            ideal: 0.001,
        };
        assert!(fallback_schedule(&s, at(6, 0)).is_err());
    }

    #[test]
    fn test_fractional_ideal_keeps_minute_precision() {
        // 1.75h = 105 minutes
        let s = settings(1.75, 2.0, &[]);
        let plan = fallback_schedule(&s, at(6, 0)).unwrap();
        assert!(plan.iter().any(|e| e.time == "07:45"));
        assert!(plan.iter().any(|e| e.time == "09:30"));
    }
}
