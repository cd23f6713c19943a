use anyhow::{Result, bail};
use std::process;

use sprout_core::models::{FeedingSettings, format_amount};
use sprout_core::service::SproutService;

use super::helpers::parse_clock_arg;

fn print_settings(settings: &FeedingSettings) {
    let w = settings.feed_windows;
    let a = settings.feed_amounts;
    println!("Feeding window: {}-{} hours (ideal {})", w.min, w.max, w.ideal);
    println!(
        "Amount per feeding: {} to {} (usual {})",
        format_amount(a.min, settings.use_metric),
        format_amount(a.max, settings.use_metric),
        format_amount(a.target, settings.use_metric)
    );
    println!("Units: {}", if settings.use_metric { "metric (ml)" } else { "imperial (oz)" });

    let lock = &settings.locked_feedings;
    if lock.times.is_empty() {
        println!("Locked feedings: none configured");
    } else {
        let state = if lock.enabled { "enabled" } else { "disabled" };
        println!("Locked feedings ({state}): {}", lock.times.join(", "));
    }
}

pub(crate) fn cmd_settings_show(svc: &SproutService, json: bool) -> Result<()> {
    let settings = svc.get_settings()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        print_settings(&settings);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
pub(crate) fn cmd_settings_set(
    svc: &SproutService,
    window_min: Option<f64>,
    window_max: Option<f64>,
    window_ideal: Option<f64>,
    amount_min: Option<f64>,
    amount_max: Option<f64>,
    amount_target: Option<f64>,
    metric: bool,
    imperial: bool,
    json: bool,
) -> Result<()> {
    if metric && imperial {
        bail!("--metric and --imperial are mutually exclusive");
    }

    let mut settings = svc.get_settings()?;
    if let Some(v) = window_min {
        settings.feed_windows.min = v;
    }
    if let Some(v) = window_max {
        settings.feed_windows.max = v;
    }
    if let Some(v) = window_ideal {
        settings.feed_windows.ideal = v;
    }
    if let Some(v) = amount_min {
        settings.feed_amounts.min = v;
    }
    if let Some(v) = amount_max {
        settings.feed_amounts.max = v;
    }
    if let Some(v) = amount_target {
        settings.feed_amounts.target = v;
    }
    if metric {
        settings.use_metric = true;
    }
    if imperial {
        settings.use_metric = false;
    }

    svc.save_settings(&settings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        print_settings(&settings);
    }
    Ok(())
}

pub(crate) fn cmd_lock_add(svc: &SproutService, time: &str, json: bool) -> Result<()> {
    let time = parse_clock_arg(time)?;
    let mut settings = svc.get_settings()?;
    if settings.locked_feedings.times.contains(&time) {
        bail!("Locked feeding time {time} already exists");
    }
    settings.locked_feedings.times.push(time.clone());
    svc.save_settings(&settings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings.locked_feedings)?);
    } else {
        println!("Added locked feeding at {time}");
        if !settings.locked_feedings.enabled {
            eprintln!("Note: locked feedings are disabled. Run `sprout lock enable` to apply them.");
        }
    }
    Ok(())
}

pub(crate) fn cmd_lock_remove(svc: &SproutService, time: &str, json: bool) -> Result<()> {
    let time = parse_clock_arg(time)?;
    let mut settings = svc.get_settings()?;
    let before = settings.locked_feedings.times.len();
    settings.locked_feedings.times.retain(|t| t != &time);
    if settings.locked_feedings.times.len() == before {
        eprintln!("No locked feeding at {time}");
        process::exit(2);
    }
    svc.save_settings(&settings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings.locked_feedings)?);
    } else {
        println!("Removed locked feeding at {time}");
    }
    Ok(())
}

pub(crate) fn cmd_lock_set_enabled(svc: &SproutService, enabled: bool, json: bool) -> Result<()> {
    let mut settings = svc.get_settings()?;
    settings.locked_feedings.enabled = enabled;
    svc.save_settings(&settings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings.locked_feedings)?);
    } else if enabled {
        println!("Locked feedings enabled");
    } else {
        println!("Locked feedings disabled");
    }
    Ok(())
}

pub(crate) fn cmd_lock_list(svc: &SproutService, json: bool) -> Result<()> {
    let settings = svc.get_settings()?;
    let lock = &settings.locked_feedings;

    if json {
        println!("{}", serde_json::to_string_pretty(lock)?);
    } else if lock.times.is_empty() {
        eprintln!("No locked feedings configured. Add one with `sprout lock add HH:MM`.");
    } else {
        let state = if lock.enabled { "enabled" } else { "disabled" };
        println!("Locked feedings ({state}):");
        for time in &lock.times {
            println!("  {time}");
        }
    }
    Ok(())
}
