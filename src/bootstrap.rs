//! Bootstrap driver
//!
//! Runs the whole procedure once:
//! `Init → Probing → Settling → SyncingIndexes → SyncingSources → Done`,
//! leaving early on a readiness timeout or a failed index.

use crate::config::Settings;
use crate::probe::{wait_until_ready, HealthCheck, ProbeTimeout, Sleeper};
use crate::resource::{
    discover_index_definitions, discover_source_definitions, ResourceApi, ResourceKind,
    SyncReport, Synchronizer,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Probing,
    Settling,
    SyncingIndexes,
    SyncingSources,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Probing => "probing",
            Stage::Settling => "settling",
            Stage::SyncingIndexes => "syncing-indexes",
            Stage::SyncingSources => "syncing-sources",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Per-kind reports of a run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub indexes: SyncReport,
    pub sources: SyncReport,
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// All indexes in place; source failures, if any, were tolerated
    Done(RunReport),
    /// The service never became ready
    TimedOut(ProbeTimeout),
    /// An index could not be created; sources were not attempted
    IndexFailed(RunReport),
    /// Index definitions were unreadable, or every one of them was malformed
    NoUsableIndexDefinitions(RunReport),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Done(_))
    }

    /// Process exit code for the surrounding orchestrator
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Done(report)
            | RunOutcome::IndexFailed(report)
            | RunOutcome::NoUsableIndexDefinitions(report) => Some(report),
            RunOutcome::TimedOut(_) => None,
        }
    }
}

fn enter(stage: Stage) {
    tracing::info!(stage = %stage, "Entering stage {}", stage);
}

/// Run the bootstrap against `api`
pub async fn run<A, S>(api: &A, sleeper: &S, settings: &Settings) -> RunOutcome
where
    A: HealthCheck + ResourceApi,
    S: Sleeper,
{
    enter(Stage::Init);
    tracing::info!(
        "Bootstrapping {} (indexes: {}, sources: {}{})",
        settings.target_url,
        settings.index_definitions_dir.display(),
        settings.source_definitions_dir.display(),
        if settings.sync.dry_run { ", dry run" } else { "" }
    );

    enter(Stage::Probing);
    if let Err(timeout) = wait_until_ready(api, sleeper, &settings.probe).await {
        return RunOutcome::TimedOut(timeout);
    }

    enter(Stage::Settling);
    if !settings.settle_delay.is_zero() {
        tracing::info!("Waiting {:?} for the service to settle", settings.settle_delay);
        sleeper.sleep(settings.settle_delay).await;
    }

    let mut report = RunReport::default();
    let mut synchronizer = Synchronizer::new(api, sleeper, settings.sync.clone());

    enter(Stage::SyncingIndexes);
    let index_files = match discover_index_definitions(&settings.index_definitions_dir) {
        Ok(files) => files,
        Err(e) => {
            tracing::error!(
                "Failed to read index definitions from {}: {}",
                settings.index_definitions_dir.display(),
                e
            );
            return RunOutcome::NoUsableIndexDefinitions(report);
        }
    };
    if index_files.is_empty() {
        tracing::warn!(
            "No index definitions found in {}",
            settings.index_definitions_dir.display()
        );
    }

    report.indexes = synchronizer.sync(ResourceKind::Index, &index_files).await;
    log_summary(ResourceKind::Index, &report.indexes);

    if report.indexes.aborted {
        tracing::error!("Index creation failed, not attempting sources");
        return RunOutcome::IndexFailed(report);
    }
    if report.indexes.all_malformed() {
        tracing::error!("No usable index definition found");
        return RunOutcome::NoUsableIndexDefinitions(report);
    }

    enter(Stage::SyncingSources);
    match discover_source_definitions(&settings.source_definitions_dir) {
        Ok(source_files) => {
            report.sources = synchronizer.sync(ResourceKind::Source, &source_files).await;
            log_summary(ResourceKind::Source, &report.sources);
        }
        Err(e) => {
            tracing::error!(
                "Failed to read source definitions from {}: {}, skipping sources",
                settings.source_definitions_dir.display(),
                e
            );
        }
    }

    enter(Stage::Done);
    RunOutcome::Done(report)
}

fn log_summary(kind: ResourceKind, report: &SyncReport) {
    tracing::info!(
        "{} sync: {} created, {} already existed, {} planned, {} failed, {} malformed",
        kind,
        report.created(),
        report.already_exists(),
        report.planned(),
        report.failed(),
        report.malformed.len()
    );
}
