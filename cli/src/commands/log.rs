use anyhow::Result;
use chrono::{Local, Timelike};
use std::process;

use sprout_core::models::{NewFeeding, format_amount};
use sprout_core::service::SproutService;

use super::helpers::{parse_amount, parse_clock_arg, parse_date, print_feedings_table};

pub(crate) fn cmd_log(
    svc: &SproutService,
    amount_str: &str,
    time: Option<String>,
    date: Option<String>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let amount = parse_amount(amount_str)?;
    let date = parse_date(date)?;

    let clock = match time {
        Some(t) => parse_clock_arg(&t)?,
        None => {
            let now = Local::now();
            format!("{:02}:{:02}", now.hour(), now.minute())
        }
    };
    let fed_at = format!("{date}T{clock}");
    let fed_at = chrono::NaiveDateTime::parse_from_str(&fed_at, sprout_core::models::FED_AT_FORMAT)?;

    let feeding = svc.log_feeding(&NewFeeding {
        fed_at,
        amount,
        notes,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&feeding)?);
    } else {
        let use_metric = svc.get_settings()?.use_metric;
        let when = feeding.fed_at.replace('T', " at ");
        let amount = format_amount(feeding.amount, use_metric);
        println!("Logged: {amount} on {when}");
    }

    Ok(())
}

pub(crate) fn cmd_history(svc: &SproutService, days: Option<u32>, json: bool) -> Result<()> {
    let feedings = svc.get_feedings(days.map(i64::from))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&feedings)?);
        return Ok(());
    }

    if feedings.is_empty() {
        match days {
            Some(d) => eprintln!("No feedings in the last {d} days"),
            None => eprintln!("No feedings logged yet"),
        }
        process::exit(2);
    }

    let use_metric = svc.get_settings()?.use_metric;
    print_feedings_table(&feedings, use_metric);
    Ok(())
}

pub(crate) fn cmd_delete(svc: &SproutService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_feeding(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else if deleted {
        println!("Feeding {id} deleted");
    } else {
        eprintln!("No feeding with id {id}");
        process::exit(2);
    }
    Ok(())
}
