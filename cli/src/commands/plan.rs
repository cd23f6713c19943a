use anyhow::Result;
use chrono::Local;
use std::process;

use sprout_core::planner::PlanProposalProvider;
use sprout_core::service::SproutService;

use super::helpers::print_plan_table;

pub(crate) fn cmd_plan_generate(
    svc: &SproutService,
    provider: &dyn PlanProposalProvider,
    json: bool,
) -> Result<()> {
    let now = Local::now().naive_local();
    let plan = svc.regenerate_plan(provider, now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let use_metric = svc.get_settings()?.use_metric;
    println!("Generated a new feeding plan:\n");
    print_plan_table(&plan, use_metric);
    Ok(())
}

pub(crate) fn cmd_plan_show(svc: &SproutService, json: bool) -> Result<()> {
    let plan = svc.get_current_plan()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if plan.is_empty() {
        eprintln!("No plan yet. Run `sprout plan generate` to create one.");
        process::exit(2);
    }

    let use_metric = svc.get_settings()?.use_metric;
    print_plan_table(&plan, use_metric);
    Ok(())
}

pub(crate) fn cmd_plan_toggle(svc: &SproutService, id: &str, json: bool) -> Result<()> {
    let plan = svc.toggle_completed(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let entry = plan.iter().find(|e| e.id == id);
    match entry {
        Some(e) if e.is_completed => println!("Marked {} done", e.time),
        Some(e) => println!("Marked {} not done", e.time),
        None => {}
    }
    Ok(())
}
