//! Declarative Resource Synchronizer
//!
//! Applies definition files against the live service: list what exists,
//! create what is missing, and treat "already exists" as success.

use super::definition::{DefinitionFile, MalformedDefinition, ResourceDefinition};
use super::kind::{FailurePolicy, ResourceKind};
use crate::probe::Sleeper;
use crate::quickwit::client::QuickwitClient;
use crate::quickwit::http::{sanitize_for_log, HttpResponse};
use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;

/// Listing and creation calls for each resource kind
#[allow(async_fn_in_trait)]
pub trait ResourceApi {
    /// Identifiers of the existing resources of `kind` (under `parent` for sources)
    async fn list(&self, kind: ResourceKind, parent: Option<&str>) -> Result<BTreeSet<String>>;

    /// Submit a creation request; only transport failures are `Err`
    async fn create(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        payload: &Value,
    ) -> Result<HttpResponse>;
}

impl ResourceApi for QuickwitClient {
    async fn list(&self, kind: ResourceKind, parent: Option<&str>) -> Result<BTreeSet<String>> {
        match (kind, parent) {
            (ResourceKind::Index, _) => self.list_index_ids().await,
            (ResourceKind::Source, Some(index_id)) => self.list_source_ids(index_id).await,
            (ResourceKind::Source, None) => Err(anyhow::anyhow!("Sources require an index id")),
        }
    }

    async fn create(
        &self,
        kind: ResourceKind,
        parent: Option<&str>,
        payload: &Value,
    ) -> Result<HttpResponse> {
        match (kind, parent) {
            (ResourceKind::Index, _) => self.create_index(payload).await,
            (ResourceKind::Source, Some(index_id)) => self.create_source(index_id, payload).await,
            (ResourceKind::Source, None) => Err(anyhow::anyhow!("Sources require an index id")),
        }
    }
}

/// Outcome of applying one definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    AlreadyExists,
    Created,
    /// Dry run: would have been created
    Planned,
    Failed {
        /// `None` when the request never got a response
        status: Option<u16>,
        body: String,
    },
}

impl ApplyResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, ApplyResult::Failed { .. })
    }
}

/// One applied definition
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub kind: ResourceKind,
    pub path: PathBuf,
    pub resource_id: String,
    pub parent_id: Option<String>,
    pub result: ApplyResult,
}

/// Everything that happened while syncing one resource kind
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub outcomes: Vec<ApplyOutcome>,
    pub malformed: Vec<MalformedDefinition>,
    /// Set when a failure under [`FailurePolicy::Abort`] stopped the stage
    pub aborted: bool,
}

impl SyncReport {
    fn count(&self, pred: impl Fn(&ApplyResult) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.result)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|r| matches!(r, ApplyResult::Created))
    }

    pub fn already_exists(&self) -> usize {
        self.count(|r| matches!(r, ApplyResult::AlreadyExists))
    }

    pub fn planned(&self) -> usize {
        self.count(|r| matches!(r, ApplyResult::Planned))
    }

    pub fn failed(&self) -> usize {
        self.count(ApplyResult::is_failed)
    }

    /// True if nothing could be applied because every file was malformed
    pub fn all_malformed(&self) -> bool {
        self.outcomes.is_empty() && !self.malformed.is_empty()
    }
}

/// Synchronizer settings
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Pause between consecutive creation requests
    pub apply_pause: Duration,
    /// List and report, but never create
    pub dry_run: bool,
}

/// A creation rejected because the resource is already there
fn is_conflict(response: &HttpResponse) -> bool {
    response.status == StatusCode::CONFLICT
        || (response.status == StatusCode::BAD_REQUEST
            && response.body.to_ascii_lowercase().contains("already exist"))
}

/// Map a creation response to an [`ApplyResult`]
pub fn interpret_response(response: &HttpResponse) -> ApplyResult {
    match response.status {
        StatusCode::OK | StatusCode::CREATED => ApplyResult::Created,
        _ if is_conflict(response) => ApplyResult::AlreadyExists,
        status => ApplyResult::Failed {
            status: Some(status.as_u16()),
            body: response.body.clone(),
        },
    }
}

pub struct Synchronizer<'a, A, S> {
    api: &'a A,
    sleeper: &'a S,
    config: SyncConfig,
    /// Remote listings, fetched once per (kind, parent) and updated with
    /// whatever this run creates
    known: HashMap<(ResourceKind, Option<String>), BTreeSet<String>>,
    posted: bool,
}

impl<'a, A, S> Synchronizer<'a, A, S>
where
    A: ResourceApi,
    S: Sleeper,
{
    pub fn new(api: &'a A, sleeper: &'a S, config: SyncConfig) -> Self {
        Self {
            api,
            sleeper,
            config,
            known: HashMap::new(),
            posted: false,
        }
    }

    /// Existing identifiers for `(kind, parent)`; listing errors degrade to
    /// an empty set so creation is still attempted
    async fn existing(
        &mut self,
        kind: ResourceKind,
        parent: Option<&str>,
    ) -> &mut BTreeSet<String> {
        let key = (kind, parent.map(str::to_string));
        if !self.known.contains_key(&key) {
            let ids = match self.api.list(kind, parent).await {
                Ok(ids) => {
                    tracing::debug!("Found {} existing {} resource(s)", ids.len(), kind);
                    ids
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to list existing {}s{}: {:#}, assuming none exist",
                        kind,
                        parent.map(|p| format!(" of index '{}'", p)).unwrap_or_default(),
                        e
                    );
                    BTreeSet::new()
                }
            };
            self.known.insert(key.clone(), ids);
        }
        self.known.entry(key).or_default()
    }

    /// Apply one parsed definition
    pub async fn apply(&mut self, definition: &ResourceDefinition) -> ApplyResult {
        let kind = definition.kind;
        let id = definition.resource_id.as_str();
        let parent = definition.parent_id.as_deref();

        if self.existing(kind, parent).await.contains(id) {
            tracing::info!("{} '{}' already exists, skipping", kind, id);
            return ApplyResult::AlreadyExists;
        }

        if self.config.dry_run {
            tracing::info!("[dry-run] would create {} '{}' from {}", kind, id, definition.path.display());
            return ApplyResult::Planned;
        }

        if self.posted && !self.config.apply_pause.is_zero() {
            self.sleeper.sleep(self.config.apply_pause).await;
        }
        self.posted = true;

        tracing::info!("Creating {} '{}' from {}", kind, id, definition.path.display());
        let result = match self.api.create(kind, parent, &definition.payload).await {
            Ok(response) => interpret_response(&response),
            Err(e) => ApplyResult::Failed {
                status: None,
                body: format!("{:#}", e),
            },
        };

        match &result {
            ApplyResult::Created => {
                tracing::info!("Created {} '{}'", kind, id);
            }
            ApplyResult::AlreadyExists => {
                tracing::info!("{} '{}' was created concurrently, treating as existing", kind, id);
            }
            ApplyResult::Failed { status, body } => {
                let status = status.map(|s| s.to_string()).unwrap_or_else(|| "no response".into());
                tracing::error!(
                    "Failed to create {} '{}': {} - {}",
                    kind,
                    id,
                    status,
                    sanitize_for_log(body)
                );
            }
            ApplyResult::Planned => {}
        }

        if matches!(result, ApplyResult::Created | ApplyResult::AlreadyExists) {
            self.existing(kind, parent).await.insert(id.to_string());
        }

        result
    }

    /// Load and apply every file of one kind, in order
    ///
    /// Malformed files are recorded and skipped. A failure stops the stage
    /// only when the kind's policy is [`FailurePolicy::Abort`].
    pub async fn sync(&mut self, kind: ResourceKind, files: &[DefinitionFile]) -> SyncReport {
        let mut report = SyncReport::default();

        for file in files {
            let definition = match ResourceDefinition::load(kind, file) {
                Ok(definition) => definition,
                Err(e) => {
                    tracing::warn!("Skipping malformed {} definition {}", kind, e);
                    report.malformed.push(e);
                    continue;
                }
            };

            let result = self.apply(&definition).await;
            let failed = result.is_failed();

            report.outcomes.push(ApplyOutcome {
                kind,
                path: definition.path,
                resource_id: definition.resource_id,
                parent_id: definition.parent_id,
                result,
            });

            if failed {
                match kind.failure_policy() {
                    FailurePolicy::Abort => {
                        report.aborted = true;
                        break;
                    }
                    FailurePolicy::Continue => {
                        tracing::warn!("Continuing after {} failure", kind);
                    }
                }
            }
        }

        report
    }
}
