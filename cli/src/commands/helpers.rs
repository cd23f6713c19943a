use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use sprout_core::models::{ActualFeeding, PlannedEntry, format_amount, parse_clock};

/// Parse an amount string like "3.5", "3.5oz", "120ml", "120 ml".
/// The unit suffix is accepted for convenience and discarded; amounts are
/// stored as plain numbers and labelled at display time.
pub(crate) fn parse_amount(s: &str) -> Result<f64> {
    let trimmed = s.trim();
    let end = trimmed
        .find(|c: char| c.is_alphabetic())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(end);
    let unit = unit.trim().to_lowercase();
    if !unit.is_empty() && unit != "oz" && unit != "ml" {
        bail!("Unknown unit '{unit}' in '{s}'. Use a plain number, oz, or ml");
    }
    let value: f64 = number
        .trim()
        .parse()
        .with_context(|| format!("Invalid amount: '{s}'. Use a number like '3.5' or '120ml'"))?;
    if value <= 0.0 {
        bail!("Amount must be greater than 0");
    }
    Ok(value)
}

/// Validate and canonicalize an `HH:MM` argument.
pub(crate) fn parse_clock_arg(s: &str) -> Result<String> {
    let trimmed = s.trim();
    if parse_clock(trimmed).is_none() {
        bail!("Invalid time '{s}'. Use 24h HH:MM (e.g. 08:30)");
    }
    Ok(trimmed.to_string())
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

pub(crate) fn print_plan_table(entries: &[PlannedEntry], use_metric: bool) {
    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Locked")]
        locked: String,
        #[tabled(rename = "Done")]
        done: String,
        #[tabled(rename = "ID")]
        id: String,
    }

    let rows: Vec<PlanRow> = entries
        .iter()
        .map(|e| PlanRow {
            time: e.time.clone(),
            amount: format_amount(e.amount, use_metric),
            locked: if e.is_locked { "yes".into() } else { String::new() },
            done: if e.is_completed { "x".into() } else { String::new() },
            id: e.id.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_feedings_table(feedings: &[ActualFeeding], use_metric: bool) {
    #[derive(Tabled)]
    struct FeedingRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Fed at")]
        fed_at: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let rows: Vec<FeedingRow> = feedings
        .iter()
        .map(|f| FeedingRow {
            id: f.id,
            fed_at: f.fed_at.replace('T', " "),
            amount: format_amount(f.amount, use_metric),
            notes: f.notes.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
