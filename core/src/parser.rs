use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{FeedingSettings, PLAN_LENGTH, PlannedEntry, parse_clock, sort_by_clock, validate_plan};

/// Extract the first JSON array from free-form text.
///
/// The planner wraps its answer in commentary, so this is a balanced-bracket
/// scan rather than a full JSON parse. Brackets inside string literals
/// (including escaped quotes) don't count toward the balance.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse and validate a planner proposal into a finalized plan.
///
/// One bad element rejects the whole proposal; a garbled model response is
/// never half-accepted. Any error here sends the caller to the
/// deterministic fallback.
pub fn parse_proposal(raw: &str, settings: &FeedingSettings) -> Result<Vec<PlannedEntry>> {
    let json = extract_json_array(raw).context("Planner response contains no JSON array")?;
    let elements: Vec<Value> =
        serde_json::from_str(json).context("Planner response is not valid JSON")?;

    if elements.len() != PLAN_LENGTH {
        bail!(
            "Planner proposed {} feedings, expected {PLAN_LENGTH}",
            elements.len()
        );
    }

    let amounts = settings.feed_amounts;
    let mut entries = Vec::with_capacity(PLAN_LENGTH);
    for (i, element) in elements.iter().enumerate() {
        let obj = element
            .as_object()
            .with_context(|| format!("Proposed feeding {i} is not an object"))?;

        let time = obj
            .get("time")
            .and_then(Value::as_str)
            .with_context(|| format!("Proposed feeding {i} is missing a string 'time'"))?;
        if parse_clock(time).is_none() {
            bail!("Proposed feeding {i} has invalid time '{time}'. Expected 24h HH:MM");
        }

        let amount = obj
            .get("amount")
            .and_then(Value::as_f64)
            .with_context(|| format!("Proposed feeding {i} is missing a numeric 'amount'"))?;
        if amount < amounts.min || amount > amounts.max {
            bail!(
                "Proposed feeding {i} amount {amount} is outside [{}, {}]",
                amounts.min,
                amounts.max
            );
        }

        let is_locked = obj
            .get("isLocked")
            .and_then(Value::as_bool)
            .with_context(|| format!("Proposed feeding {i} is missing a boolean 'isLocked'"))?;

        entries.push(PlannedEntry {
            id: Uuid::new_v4().to_string(),
            time: time.to_string(),
            amount,
            is_locked,
            is_completed: false,
        });
    }

    // Proposals are clock-only, so every time must be distinct.
    let mut seen = HashSet::new();
    for entry in &entries {
        if !seen.insert(entry.time.as_str()) {
            bail!("Planner proposed {} twice", entry.time);
        }
    }

    sort_by_clock(&mut entries);
    validate_plan(&entries, settings)?;
    Ok(entries)
}
