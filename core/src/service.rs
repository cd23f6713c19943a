use std::path::Path;

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::db::Database;
use crate::legacy_import::{self, LegacyImportSummary};
use crate::models::{
    ActualFeeding, FeedingSettings, NewFeeding, PlannedEntry, validate_plan, validate_settings,
};
use crate::parser::parse_proposal;
use crate::planner::{PlanProposalProvider, build_plan_prompt};
use crate::scheduler::fallback_schedule;

/// How many recent feedings are handed to the planner as context.
const HISTORY_FOR_PROMPT: i64 = 12;

/// Service layer tying the scheduling engine to persistence. The CLI (or
/// any other thin frontend) talks to this and nothing below it.
pub struct SproutService {
    db: Database,
}

impl SproutService {
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Database::open(Path::new(db_path))?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    // --- Plan ---

    /// Regenerate the feeding plan and persist it atomically.
    ///
    /// One proposal attempt through `provider`; any failure there (network,
    /// timeout, malformed output, invariant violation) silently falls back
    /// to the deterministic scheduler, so the caller never learns which
    /// path produced the plan. The only errors surfaced are scheduling
    /// exhaustion and persistence failures, including losing the
    /// optimistic-concurrency race to a writer that snuck in during the
    /// (slow) proposal attempt.
    pub fn regenerate_plan(
        &self,
        provider: &dyn PlanProposalProvider,
        now: NaiveDateTime,
    ) -> Result<Vec<PlannedEntry>> {
        let settings = self.db.get_feeding_settings()?;
        validate_settings(&settings)?;

        let version = self.db.get_plan_version()?;
        let history = self.db.get_recent_feedings(HISTORY_FOR_PROMPT)?;

        let entries = match propose_plan(provider, &settings, &history) {
            Ok(entries) => entries,
            Err(_) => fallback_schedule(&settings, now)?,
        };

        validate_plan(&entries, &settings)?;
        self.db.save_plan(&entries, version)?;
        Ok(entries)
    }

    /// The last persisted plan, empty when none has been generated yet.
    pub fn get_current_plan(&self) -> Result<Vec<PlannedEntry>> {
        self.db.get_plan()
    }

    /// Flip one entry's completion flag and return the updated plan.
    pub fn toggle_completed(&self, id: &str) -> Result<Vec<PlannedEntry>> {
        self.db.toggle_completed(id)
    }

    // --- Feedings ---

    pub fn log_feeding(&self, feeding: &NewFeeding) -> Result<ActualFeeding> {
        self.db.insert_feeding(feeding)
    }

    pub fn get_feedings(&self, days: Option<i64>) -> Result<Vec<ActualFeeding>> {
        self.db.get_feedings(days)
    }

    pub fn delete_feeding(&self, id: i64) -> Result<bool> {
        self.db.delete_feeding(id)
    }

    // --- Settings ---

    pub fn get_settings(&self) -> Result<FeedingSettings> {
        self.db.get_feeding_settings()
    }

    pub fn save_settings(&self, settings: &FeedingSettings) -> Result<()> {
        validate_settings(settings)?;
        self.db.save_feeding_settings(settings)
    }

    // --- Legacy import ---

    pub fn import_legacy(&self, json: &str, dry_run: bool) -> Result<LegacyImportSummary> {
        let feedings = legacy_import::parse_legacy_feedings(json)?;
        legacy_import::import_legacy_feedings(&self.db, &feedings, dry_run)
    }
}

/// The proposal path: one provider call, strict parse, full validation.
/// Every failure mode collapses into `Err` and the caller falls back.
fn propose_plan(
    provider: &dyn PlanProposalProvider,
    settings: &FeedingSettings,
    history: &[ActualFeeding],
) -> Result<Vec<PlannedEntry>> {
    let prompt = build_plan_prompt(settings, history);
    let raw = provider.propose(&prompt)?;
    parse_proposal(&raw, settings)
}
