use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use serde_json::Value;

use crate::db::Database;
use crate::models::{FED_AT_FORMAT, NewFeeding};

/// Summary of what a legacy import would do / did.
#[derive(Debug, Clone)]
pub struct LegacyImportSummary {
    pub records_parsed: usize,
    pub feedings_imported: usize,
    pub duplicates_skipped: usize,
}

/// Parse a legacy feeding export (JSON array) into canonical records.
///
/// Older exports drifted: the timestamp was written as `time` or
/// `actualTime` (with either a `T` or a space separator, sometimes with
/// seconds), and the amount as a bare number (`amount`) or a unit-suffixed
/// string (`Amount: "4oz"` / `"120 ml"`). Everything is mapped onto
/// `NewFeeding` here, in one pass; the rest of the core never sees a legacy
/// shape.
pub fn parse_legacy_feedings(json: &str) -> Result<Vec<NewFeeding>> {
    let records: Vec<Value> =
        serde_json::from_str(json).context("Legacy export is not a JSON array")?;

    let mut feedings = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let feeding =
            normalize_record(record).with_context(|| format!("Bad legacy record {i}"))?;
        feedings.push(feeding);
    }
    Ok(feedings)
}

fn normalize_record(record: &Value) -> Result<NewFeeding> {
    let obj = record.as_object().context("Record is not an object")?;

    let raw_time = obj
        .get("time")
        .or_else(|| obj.get("actualTime"))
        .and_then(Value::as_str)
        .context("Missing 'time' or 'actualTime'")?;
    let fed_at = normalize_fed_at(raw_time)?;

    let amount = match obj.get("amount").or_else(|| obj.get("Amount")) {
        Some(Value::Number(n)) => n.as_f64().context("Amount is not a finite number")?,
        Some(Value::String(s)) => parse_suffixed_amount(s)?,
        Some(_) => bail!("Amount must be a number or a unit-suffixed string"),
        None => bail!("Missing 'amount' or 'Amount'"),
    };
    if amount <= 0.0 {
        bail!("Amount must be greater than 0 (got {amount})");
    }

    let notes = obj
        .get("notes")
        .or_else(|| obj.get("Notes"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(ToString::to_string);

    Ok(NewFeeding {
        fed_at,
        amount,
        notes,
    })
}

/// Normalize the timestamp spellings legacy exports used.
fn normalize_fed_at(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for format in [
        FED_AT_FORMAT,
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }
    bail!("Cannot parse feeding time: '{raw}'")
}

/// Parse `"4oz"`, `"2.5 oz"`, `"120ml"` into the numeric amount. The unit
/// suffix is shape drift only; amounts are stored as-is and labelled at
/// display time.
fn parse_suffixed_amount(s: &str) -> Result<f64> {
    let trimmed = s.trim();
    let end = trimmed
        .find(|c: char| c.is_alphabetic())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(end);
    let unit = unit.trim().to_lowercase();
    if !unit.is_empty() && unit != "oz" && unit != "ml" {
        bail!("Unknown amount unit '{unit}' in '{s}'");
    }
    number
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Cannot parse amount: '{s}'"))
}

/// Import normalized legacy feedings, skipping exact duplicates.
///
/// Returns a `LegacyImportSummary`. When `dry_run` is true, no data is
/// written.
pub fn import_legacy_feedings(
    db: &Database,
    feedings: &[NewFeeding],
    dry_run: bool,
) -> Result<LegacyImportSummary> {
    let mut imported: usize = 0;
    let mut skipped: usize = 0;

    for feeding in feedings {
        let fed_at = feeding.fed_at.format(FED_AT_FORMAT).to_string();
        if db.feeding_exists(&fed_at, feeding.amount)? {
            skipped += 1;
            continue;
        }
        if !dry_run {
            db.insert_feeding(feeding)?;
        }
        imported += 1;
    }

    Ok(LegacyImportSummary {
        records_parsed: feedings.len(),
        feedings_imported: imported,
        duplicates_skipped: skipped,
    })
}
