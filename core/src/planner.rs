use std::fmt::Write;

use anyhow::Result;

use crate::models::{ActualFeeding, FeedingSettings, PLAN_LENGTH, format_amount};

/// Platform-native natural-language planner.
///
/// The CLI implements this with reqwest against an OpenAI-compatible
/// endpoint; tests use a canned mock. Called synchronously from the core.
/// The implementation owns its own timeout, and any error it returns simply
/// routes plan generation to the deterministic fallback.
pub trait PlanProposalProvider: Send + Sync {
    fn propose(&self, prompt: &str) -> Result<String>;
}

/// Build the planner prompt: hard constraints first, recent history for
/// context, then the exact response contract.
#[must_use]
pub fn build_plan_prompt(settings: &FeedingSettings, history: &[ActualFeeding]) -> String {
    let w = settings.feed_windows;
    let a = settings.feed_amounts;
    let unit = if settings.use_metric { "ml" } else { "oz" };

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Plan the next {PLAN_LENGTH} bottle feedings for a baby."
    );
    let _ = writeln!(prompt, "\nHard constraints:");
    let _ = writeln!(
        prompt,
        "- Feedings must be between {} and {} hours apart; {} hours apart is ideal.",
        w.min, w.max, w.ideal
    );
    let _ = writeln!(
        prompt,
        "- Each feeding amount must be between {} and {} {unit}; the usual amount is {} {unit}.",
        a.min, a.max, a.target
    );

    let locked = settings.active_locked_times();
    if locked.is_empty() {
        let _ = writeln!(prompt, "- No feeding times are fixed in advance.");
    } else {
        let _ = writeln!(
            prompt,
            "- These clock times are fixed and must each appear exactly once, marked with \
             \"isLocked\": true and amount {}: {}.",
            a.target,
            locked.join(", ")
        );
        let _ = writeln!(prompt, "- No other feeding may be marked locked.");
    }

    if !history.is_empty() {
        let _ = writeln!(prompt, "\nRecent feedings, newest first:");
        for feeding in history {
            let _ = writeln!(
                prompt,
                "- {}: {}",
                feeding.fed_at,
                format_amount(feeding.amount, settings.use_metric)
            );
        }
    }

    let _ = writeln!(
        prompt,
        "\nRespond with a JSON array of exactly {PLAN_LENGTH} objects, each shaped \
         {{\"time\": \"HH:MM\", \"amount\": number, \"isLocked\": boolean}}, \
         sorted by time of day. Times use a 24h clock, zero-padded. \
         All times must be distinct. Return the array and nothing else."
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedAmounts, FeedWindows, LockedFeedings};

    fn settings(locked: &[&str]) -> FeedingSettings {
        FeedingSettings {
            feed_windows: FeedWindows {
                min: 2.0,
                max: 4.0,
                ideal: 3.0,
            },
            feed_amounts: FeedAmounts {
                min: 1.0,
                max: 6.0,
                target: 4.0,
            },
            use_metric: false,
            locked_feedings: LockedFeedings {
                enabled: !locked.is_empty(),
                times: locked.iter().map(|t| (*t).to_string()).collect(),
            },
        }
    }

    fn feeding(fed_at: &str, amount: f64) -> ActualFeeding {
        ActualFeeding {
            id: 1,
            uuid: "u".to_string(),
            fed_at: fed_at.to_string(),
            amount,
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_prompt_contains_constraints() {
        let prompt = build_plan_prompt(&settings(&[]), &[]);
        assert!(prompt.contains("between 2 and 4 hours apart"));
        assert!(prompt.contains("3 hours apart is ideal"));
        assert!(prompt.contains("between 1 and 6 oz"));
        assert!(prompt.contains("JSON array of exactly 10"));
        assert!(prompt.contains("No feeding times are fixed"));
    }

    #[test]
    fn test_prompt_lists_locked_times() {
        let prompt = build_plan_prompt(&settings(&["22:00", "03:00"]), &[]);
        assert!(prompt.contains("22:00, 03:00"));
        assert!(prompt.contains("\"isLocked\": true"));
    }

    #[test]
    fn test_prompt_includes_history() {
        let history = vec![feeding("2024-06-15T08:30", 3.5)];
        let prompt = build_plan_prompt(&settings(&[]), &history);
        assert!(prompt.contains("2024-06-15T08:30"));
        assert!(prompt.contains("3.5 oz"));
    }

    #[test]
    fn test_prompt_metric_unit() {
        let mut s = settings(&[]);
        s.use_metric = true;
        let prompt = build_plan_prompt(&s, &[]);
        assert!(prompt.contains("ml"));
        assert!(!prompt.contains(" oz"));
    }
}
