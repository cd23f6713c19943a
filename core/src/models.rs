use anyhow::{Result, bail};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Hours between feedings. `ideal` drives the spacing of generated plans;
/// `min`/`max` bound what a plan may propose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedWindows {
    pub min: f64,
    pub max: f64,
    pub ideal: f64,
}

/// Per-feeding quantity bounds and the default amount for generated slots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedAmounts {
    pub min: f64,
    pub max: f64,
    pub target: f64,
}

/// Fixed clock times that must appear verbatim in every generated plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedFeedings {
    pub enabled: bool,
    #[serde(default)]
    pub times: Vec<String>,
}

/// User-configured feeding constraints. Persisted as one JSON document;
/// the serde aliases absorb the camelCase spellings older exports used, so
/// nothing past the read path ever sees a legacy shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingSettings {
    #[serde(alias = "feedWindows", alias = "feedingWindows")]
    pub feed_windows: FeedWindows,
    #[serde(alias = "feedAmounts")]
    pub feed_amounts: FeedAmounts,
    #[serde(default, alias = "useMetric")]
    pub use_metric: bool,
    #[serde(alias = "lockedFeedings")]
    pub locked_feedings: LockedFeedings,
}

impl Default for FeedingSettings {
    fn default() -> Self {
        Self {
            feed_windows: FeedWindows {
                min: 2.0,
                max: 4.0,
                ideal: 3.0,
            },
            feed_amounts: FeedAmounts {
                min: 1.0,
                max: 8.0,
                target: 4.0,
            },
            use_metric: false,
            locked_feedings: LockedFeedings {
                enabled: false,
                times: Vec::new(),
            },
        }
    }
}

impl FeedingSettings {
    /// Locked times that actually apply: empty when the feature is disabled.
    #[must_use]
    pub fn active_locked_times(&self) -> &[String] {
        if self.locked_feedings.enabled {
            &self.locked_feedings.times
        } else {
            &[]
        }
    }
}

/// One slot of the upcoming feeding plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedEntry {
    pub id: String,
    /// 24h clock time, canonical `HH:MM`.
    pub time: String,
    pub amount: f64,
    #[serde(alias = "isLocked")]
    pub is_locked: bool,
    #[serde(default, alias = "isCompleted")]
    pub is_completed: bool,
}

/// A recorded (actual) feeding.
#[derive(Debug, Clone, Serialize)]
pub struct ActualFeeding {
    pub id: i64,
    pub uuid: String,
    /// `YYYY-MM-DDTHH:MM` local time.
    pub fed_at: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewFeeding {
    pub fed_at: NaiveDateTime,
    pub amount: f64,
    pub notes: Option<String>,
}

pub const FED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Parse a canonical `HH:MM` clock string into minutes since midnight.
/// Strict: exactly five characters, zero-padded, hour 0-23, minute 0-59.
#[must_use]
pub fn parse_clock(s: &str) -> Option<u32> {
    let b = s.as_bytes();
    if b.len() != 5 || b[2] != b':' {
        return None;
    }
    if !(b[0].is_ascii_digit() && b[1].is_ascii_digit() && b[3].is_ascii_digit() && b[4].is_ascii_digit()) {
        return None;
    }
    let hour = u32::from(b[0] - b'0') * 10 + u32::from(b[1] - b'0');
    let minute = u32::from(b[3] - b'0') * 10 + u32::from(b[4] - b'0');
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(hour * 60 + minute)
}

/// Format an amount for display. `use_metric` switches the unit label only;
/// stored amounts are never converted.
#[must_use]
pub fn format_amount(amount: f64, use_metric: bool) -> String {
    let unit = if use_metric { "ml" } else { "oz" };
    if amount.fract() == 0.0 {
        format!("{amount:.0} {unit}")
    } else {
        format!("{amount} {unit}")
    }
}

pub fn validate_settings(settings: &FeedingSettings) -> Result<()> {
    let w = settings.feed_windows;
    if w.min <= 0.0 {
        bail!("Minimum feeding window must be greater than 0 hours");
    }
    if !(w.min <= w.ideal && w.ideal <= w.max) {
        bail!(
            "Feeding windows must satisfy min <= ideal <= max (got min={}, ideal={}, max={})",
            w.min,
            w.ideal,
            w.max
        );
    }
    let a = settings.feed_amounts;
    if a.min <= 0.0 {
        bail!("Minimum feeding amount must be greater than 0");
    }
    if !(a.min <= a.target && a.target <= a.max) {
        bail!(
            "Feeding amounts must satisfy min <= target <= max (got min={}, target={}, max={})",
            a.min,
            a.target,
            a.max
        );
    }
    for time in &settings.locked_feedings.times {
        if parse_clock(time).is_none() {
            bail!("Invalid locked feeding time '{time}'. Use 24h HH:MM");
        }
    }
    let times = &settings.locked_feedings.times;
    for (i, time) in times.iter().enumerate() {
        if times[..i].contains(time) {
            bail!("Duplicate locked feeding time '{time}'");
        }
    }
    Ok(())
}

/// Number of entries in every finalized plan.
pub const PLAN_LENGTH: usize = 10;

/// Check the invariants every finalized plan must satisfy: entry count,
/// ascending clock order, amount bounds, and locked-time correspondence
/// (an entry is locked iff its time is a configured locked time, and each
/// configured time appears exactly once with the target amount).
///
/// Clock-string distinctness is intentionally not checked here: the
/// deterministic scheduler may legitimately revisit a clock time across the
/// date boundary. The proposal parser layers its own distinctness check on
/// top for clock-only model output.
pub fn validate_plan(entries: &[PlannedEntry], settings: &FeedingSettings) -> Result<()> {
    if entries.len() != PLAN_LENGTH {
        bail!("A plan must contain exactly {PLAN_LENGTH} feedings, got {}", entries.len());
    }

    let mut prev: Option<u32> = None;
    for entry in entries {
        let Some(minutes) = parse_clock(&entry.time) else {
            bail!("Invalid feeding time '{}'. Use 24h HH:MM", entry.time);
        };
        if let Some(p) = prev {
            if minutes < p {
                bail!("Plan entries must be sorted by clock time ('{}' is out of order)", entry.time);
            }
        }
        prev = Some(minutes);

        let a = settings.feed_amounts;
        if entry.amount < a.min || entry.amount > a.max {
            bail!(
                "Feeding amount {} at {} is outside the configured range [{}, {}]",
                entry.amount,
                entry.time,
                a.min,
                a.max
            );
        }
    }

    let locked = settings.active_locked_times();
    for time in locked {
        let matches: Vec<&PlannedEntry> = entries.iter().filter(|e| &e.time == time).collect();
        if matches.len() != 1 {
            bail!(
                "Locked feeding time {time} must appear exactly once in the plan (found {})",
                matches.len()
            );
        }
        let entry = matches[0];
        if !entry.is_locked {
            bail!("Feeding at locked time {time} must be marked locked");
        }
        if (entry.amount - settings.feed_amounts.target).abs() > f64::EPSILON {
            bail!(
                "Locked feeding at {time} must use the target amount {}",
                settings.feed_amounts.target
            );
        }
    }
    for entry in entries {
        if entry.is_locked && !locked.contains(&entry.time) {
            bail!("Feeding at {} is marked locked but {} is not a configured locked time", entry.time, entry.time);
        }
    }

    Ok(())
}

/// Sort plan entries ascending by minutes-since-midnight. Stable, so equal
/// clock times (a generated slot recurring past midnight) keep their
/// chronological order.
pub fn sort_by_clock(entries: &mut [PlannedEntry]) {
    entries.sort_by_key(|e| parse_clock(&e.time).unwrap_or(0));
}
