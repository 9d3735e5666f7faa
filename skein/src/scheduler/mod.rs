//! Scheduled tool-call engine: a ticker-driven executor that polls a
//! persistent job store for due jobs, checks each against the scheduling
//! policy, dispatches it, and reschedules or retires it depending on
//! [`Recurrence`].
//!
//! Grounded on the background-monitor shape in `ahma_mcp`'s
//! `OperationMonitor::start_background_monitor`: a `tokio::spawn`ed loop
//! holding only a weak/shared handle to its state, woken on a fixed
//! interval, that stops cleanly once told to rather than panicking.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::context::ToolContext;
use crate::manager::McpManager;
use crate::registry::ToolRegistry;

/// Tool name a sub-agent run may call to bypass the scheduler's normal
/// allowlist check — a sub-agent task needs to invoke the scheduler's own
/// dispatch path (e.g. `schedule_task` itself) without first needing to be
/// on the allowlist it is about to populate.
pub const AGENT_TASK_SENTINEL: &str = "__agent_task__";

/// How a due job is rescheduled after it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// Runs once, then the job is retired.
    Once,
    Daily,
    Hourly,
}

impl Recurrence {
    /// The next run time after `from`, or `None` if this job does not recur.
    pub fn next(self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Recurrence::Once => None,
            Recurrence::Daily => Some(from + chrono::Duration::hours(24)),
            Recurrence::Hourly => Some(from + chrono::Duration::hours(1)),
        }
    }
}

/// Where a job's schedule request originated. Most jobs are `Direct`
/// (created through `schedule_task`); `LegacyTweet` models a
/// backward-compatible shape for a pre-existing "schedule a tweet" job type
/// that predates the general tool-call scheduler and carries the same
/// `tool_name`/`args` payload (`tool_name` is always `"sms_send"`-equivalent
/// for these) rather than a separate store table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSource {
    Direct,
    LegacyTweet,
}

/// Lifecycle state of a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

/// A tool call scheduled to run at or after `scheduled_for`, optionally
/// recurring.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub id: String,
    pub source: JobSource,
    pub tool_name: String,
    pub args: serde_json::Value,
    pub scheduled_for: DateTime<Utc>,
    pub recurrence: Recurrence,
    pub status: JobStatus,
    pub last_error: Option<String>,
    /// The tool-call result text from the most recent run, success or
    /// failure, for audit/debugging; distinct from `last_error`, which holds
    /// only the failure reason.
    pub last_result: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl ScheduledJob {
    pub fn new(
        tool_name: impl Into<String>,
        args: serde_json::Value,
        scheduled_for: DateTime<Utc>,
        recurrence: Recurrence,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: JobSource::Direct,
            tool_name: tool_name.into(),
            args,
            scheduled_for,
            recurrence,
            status: JobStatus::Pending,
            last_error: None,
            last_result: None,
            last_run_at: None,
        }
    }
}

/// Jobs fetched per tick are capped so one overloaded store can't make a
/// tick run unboundedly long.
pub const MAX_DUE_JOBS_PER_TICK: usize = 25;

/// Persistence contract for scheduled jobs. [`InMemoryScheduledJobStore`] is
/// the reference implementation; a durable store (sqlite, a flat file) would
/// implement the same trait.
#[async_trait::async_trait]
pub trait ScheduledJobStore: Send + Sync {
    /// Up to `limit` jobs pending as of `now`, whose `scheduled_for` has passed.
    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Vec<ScheduledJob>;
    async fn mark_succeeded(&self, id: &str, result: String, at: DateTime<Utc>);
    async fn mark_failed(&self, id: &str, error: String, result: String, at: DateTime<Utc>);
    /// Replaces a job's `scheduled_for` and resets it to `Pending`, used for
    /// recurring jobs after a successful run.
    async fn reschedule(&self, id: &str, next_run: DateTime<Utc>);
    async fn insert(&self, job: ScheduledJob);
    async fn cancel(&self, id: &str) -> bool;
    async fn all(&self) -> Vec<ScheduledJob>;
}

/// In-memory reference store backed by a `Mutex<Vec<ScheduledJob>>`. Suitable
/// for a single-process deployment; does not survive a restart.
#[derive(Default)]
pub struct InMemoryScheduledJobStore {
    jobs: Mutex<Vec<ScheduledJob>>,
}

impl InMemoryScheduledJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ScheduledJobStore for InMemoryScheduledJobStore {
    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Vec<ScheduledJob> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.status == JobStatus::Pending && j.scheduled_for <= now)
            .take(limit)
            .cloned()
            .collect()
    }

    async fn mark_succeeded(&self, id: &str, result: String, at: DateTime<Utc>) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            job.status = JobStatus::Succeeded;
            job.last_error = None;
            job.last_result = Some(result);
            job.last_run_at = Some(at);
        }
    }

    async fn mark_failed(&self, id: &str, error: String, result: String, at: DateTime<Utc>) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            job.status = JobStatus::Failed;
            job.last_error = Some(error);
            job.last_result = Some(result);
            job.last_run_at = Some(at);
        }
    }

    async fn reschedule(&self, id: &str, next_run: DateTime<Utc>) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            job.scheduled_for = next_run;
            job.status = JobStatus::Pending;
            job.last_error = None;
        }
    }

    async fn insert(&self, job: ScheduledJob) {
        self.jobs.lock().unwrap().push(job);
    }

    async fn cancel(&self, id: &str) -> bool {
        let mut jobs = self.jobs.lock().unwrap();
        let before = jobs.len();
        jobs.retain(|j| j.id != id);
        jobs.len() != before
    }

    async fn all(&self) -> Vec<ScheduledJob> {
        self.jobs.lock().unwrap().clone()
    }
}

/// Whether a scheduled job is allowed to call `tool_name` under `ctx`.
///
/// `tool_name` is trimmed and lowercased before every check, so a name is
/// normalized the same way whether it arrives from user config or a stored
/// job. An empty name is always denied. The agent-task sentinel bypasses the
/// allowlist entirely (a sub-agent task dispatch manages its own permissions
/// downstream). Otherwise a scheduled call is denied if the tool is in
/// `ctx.disabled_tools`, and must appear on the context's opt-in
/// `scheduled_allowed` set — unattended execution is deny-by-default even
/// for tools that are perfectly fine to call interactively.
pub fn is_scheduler_allowed(tool_name: &str, ctx: &ToolContext) -> bool {
    let normalized = tool_name.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return false;
    }
    if normalized == AGENT_TASK_SENTINEL {
        return true;
    }
    if ctx.is_disabled(&normalized) {
        return false;
    }
    ctx.is_scheduled_allowed(&normalized)
}

/// Drives due jobs from a [`ScheduledJobStore`] through a [`ToolRegistry`]
/// (and, for namespaced tool names, an [`McpManager`]) on a fixed tick
/// interval, until stopped. This is the same dispatcher the agent loop uses,
/// keyed on [`crate::naming::is_mcp_tool`].
pub struct ScheduledToolCallEngine {
    store: Arc<dyn ScheduledJobStore>,
    registry: Arc<ToolRegistry>,
    manager: Option<Arc<McpManager>>,
    ctx: ToolContext,
    tick_interval: Duration,
    cancellation: CancellationToken,
    handle: AsyncMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ScheduledToolCallEngine {
    /// Builds an engine with the default one-minute tick interval and no MCP
    /// manager — scheduled jobs may only target built-in tools.
    pub fn new(store: Arc<dyn ScheduledJobStore>, registry: Arc<ToolRegistry>, ctx: ToolContext) -> Self {
        Self::with_tick_interval(store, registry, ctx, Duration::from_secs(60))
    }

    pub fn with_tick_interval(
        store: Arc<dyn ScheduledJobStore>,
        registry: Arc<ToolRegistry>,
        ctx: ToolContext,
        tick_interval: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            manager: None,
            ctx,
            tick_interval,
            cancellation: CancellationToken::new(),
            handle: AsyncMutex::new(None),
        }
    }

    /// Attaches an [`McpManager`] so that namespaced (`mcp__<server>__<tool>`)
    /// jobs dispatch to the right connected server instead of failing lookup
    /// in the built-in registry.
    pub fn with_manager(mut self, manager: Arc<McpManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Starts the background tick loop. Idempotent: calling `start` while
    /// already running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return;
        }
        let engine = Arc::clone(self);
        let token = self.cancellation.clone();
        *handle = Some(tokio::spawn(async move {
            engine.run_due_jobs().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("scheduled tool-call engine stopping");
                        break;
                    }
                    _ = tokio::time::sleep(engine.tick_interval) => {
                        engine.run_due_jobs().await;
                    }
                }
            }
        }));
    }

    /// Cancels the background loop and awaits its exit. Idempotent.
    pub async fn stop(&self) {
        self.cancellation.cancel();
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
    }

    /// Runs one sweep over currently due jobs (at most
    /// [`MAX_DUE_JOBS_PER_TICK`] of them). Exposed separately from the tick
    /// loop so tests can drive it deterministically without sleeping.
    pub async fn run_due_jobs(&self) {
        let now = Utc::now();
        for job in self.store.due(now, MAX_DUE_JOBS_PER_TICK).await {
            self.run_one(job, now).await;
        }
    }

    async fn run_one(&self, job: ScheduledJob, now: DateTime<Utc>) {
        if !is_scheduler_allowed(&job.tool_name, &self.ctx) {
            tracing::warn!(tool = %job.tool_name, job_id = %job.id, "scheduled job blocked by allowlist");
            self.store
                .mark_failed(
                    &job.id,
                    format!("{} is not on the scheduled allowlist", job.tool_name),
                    String::new(),
                    now,
                )
                .await;
            return;
        }
        match self.dispatch(&job.tool_name, job.args.clone()).await {
            Ok(content) if !content.is_error => {
                self.store.mark_succeeded(&job.id, content.text, now).await;
                if let Some(next_run) = job.recurrence.next(now) {
                    self.store.reschedule(&job.id, next_run).await;
                }
            }
            Ok(content) => {
                self.store
                    .mark_failed(
                        &job.id,
                        "tool execution returned an error result".to_string(),
                        content.text,
                        now,
                    )
                    .await;
            }
            Err(exec_err) => {
                self.store.mark_failed(&job.id, exec_err, String::new(), now).await;
            }
        }
    }

    /// Routes to the MCP manager for namespaced tool names, the built-in
    /// registry otherwise. A dispatch-level failure (unknown tool, disabled,
    /// no manager configured) is `Err`; a tool that ran and reported its own
    /// error is `Ok` with `is_error` set.
    async fn dispatch(
        &self,
        tool_name: &str,
        args: serde_json::Value,
    ) -> Result<crate::tool_source::ToolCallContent, String> {
        if crate::naming::is_mcp_tool(tool_name) {
            let (server, tool, ok) = crate::naming::parse_namespaced_name(tool_name);
            if !ok {
                return Err(format!("{tool_name} is not a well-formed MCP tool name"));
            }
            return match &self.manager {
                Some(manager) => {
                    let (text, is_error) = manager.call_tool(&server, &tool, args).await;
                    Ok(crate::tool_source::ToolCallContent { text, is_error })
                }
                None => Err(format!("{tool_name} requires an MCP manager, none configured")),
            };
        }
        self.registry
            .call(tool_name, args, &self.ctx)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Scheduled-allowlist set a context provider can hand off to
/// [`ToolContext::scheduled_allowed`] for a given profile.
pub fn default_scheduled_allowlist() -> HashSet<String> {
    ["file_read", "ls", "grep", "web_search"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
