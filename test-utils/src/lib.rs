//! Fakes and a temporary host for exercising install and join end to end.
//!
//! Nothing here touches the real host: every path lives under a
//! [`TempDir`] and every external process is recorded by [`FakeRunner`].

use async_trait::async_trait;
use embedded_cluster::addons::{AddonApplier, AddonContext, HaPromoter};
use embedded_cluster::bundle::{BundleMaterializer, ReleaseBundle};
use embedded_cluster::install::RetryPolicy;
use embedded_cluster::join::{JoinCommand, JoinTokenSource};
use embedded_cluster::metrics::{MetricsEvent, MetricsReporter, MetricsTarget};
use embedded_cluster::preflight::runner::PreflightRunner;
use embedded_cluster::preflight::{HostPreflightSpec, PreflightOutput};
use embedded_cluster::terminal::Terminal;
use embedded_cluster::util::{CommandOutput, CommandRunner, CommandSpec};
use embedded_cluster::HostContext;
use embedded_cluster_shared::HostLayout;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Process runner
// ============================================================================

/// Records every command and succeeds unless told otherwise.
///
/// `k0s start` creates the status socket so readiness waits complete.
pub struct FakeRunner {
    socket: PathBuf,
    calls: Mutex<Vec<CommandSpec>>,
    failures: Mutex<Vec<(String, String, i32)>>,
    create_socket: Mutex<bool>,
}

impl FakeRunner {
    pub fn new(layout: &HostLayout) -> Self {
        Self {
            socket: layout.status_socket_path(),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            create_socket: Mutex::new(true),
        }
    }

    /// Make `<program> <first arg> ...` exit with `code`.
    pub fn fail_on(&self, program: &str, first_arg: &str, code: i32) {
        self.failures
            .lock()
            .push((program.to_string(), first_arg.to_string(), code));
    }

    /// Never create the status socket.
    pub fn never_ready(&self) {
        *self.create_socket.lock() = false;
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    /// Recorded commands as `program-name arg arg ...`.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|c| {
                std::iter::once(c.program_name())
                    .chain(c.args.iter().cloned())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    fn failure_for(&self, cmd: &CommandSpec) -> Option<i32> {
        let program = cmd.program_name();
        let first = cmd.args.first().map(String::as_str).unwrap_or_default();
        self.failures
            .lock()
            .iter()
            .find(|(p, a, _)| *p == program && a == first)
            .map(|(_, _, code)| *code)
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn output(&self, cmd: &CommandSpec) -> ClusterResult<CommandOutput> {
        self.calls.lock().push(cmd.clone());

        if let Some(code) = self.failure_for(cmd) {
            return Ok(CommandOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: format!("{} failed", cmd.display()),
            });
        }

        let is_start = cmd.program_name() == "k0s" && cmd.args.first().is_some_and(|a| a == "start");
        if is_start && *self.create_socket.lock() {
            if let Some(parent) = self.socket.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.socket, b"")?;
        }

        Ok(CommandOutput {
            code: Some(0),
            ..Default::default()
        })
    }
}

// ============================================================================
// Terminal
// ============================================================================

/// Answers prompts from a script and records everything printed.
#[derive(Default)]
pub struct ScriptedTerminal {
    answers: Mutex<VecDeque<bool>>,
    questions: Mutex<Vec<String>>,
    printed: Mutex<Vec<String>>,
}

impl ScriptedTerminal {
    pub fn answer(&self, yes: bool) {
        self.answers.lock().push_back(yes);
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }

    pub fn printed(&self) -> Vec<String> {
        self.printed.lock().clone()
    }
}

impl Terminal for ScriptedTerminal {
    fn confirm(&self, question: &str, default: bool) -> ClusterResult<bool> {
        self.questions.lock().push(question.to_string());
        Ok(self.answers.lock().pop_front().unwrap_or(default))
    }

    fn print(&self, text: &str) {
        self.printed.lock().push(text.to_string());
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Keeps every reported event; optionally fails each report afterwards.
#[derive(Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<(MetricsTarget, MetricsEvent)>>,
    failing: bool,
}

impl RecordingMetrics {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<MetricsEvent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn targets(&self) -> Vec<MetricsTarget> {
        self.events.lock().iter().map(|(t, _)| t.clone()).collect()
    }
}

#[async_trait]
impl MetricsReporter for RecordingMetrics {
    async fn report(&self, target: &MetricsTarget, event: &MetricsEvent) -> ClusterResult<()> {
        self.events.lock().push((target.clone(), event.clone()));
        if self.failing {
            return Err(ClusterError::Http("metrics endpoint unreachable".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Preflights
// ============================================================================

/// Returns a canned output and remembers the specs it was given.
#[derive(Default)]
pub struct FakePreflights {
    output: Mutex<PreflightOutput>,
    specs: Mutex<Vec<HostPreflightSpec>>,
}

impl FakePreflights {
    pub fn set_output(&self, output: PreflightOutput) {
        *self.output.lock() = output;
    }

    pub fn runs(&self) -> usize {
        self.specs.lock().len()
    }
}

#[async_trait]
impl PreflightRunner for FakePreflights {
    async fn run(
        &self,
        spec: &HostPreflightSpec,
        _envs: &[(String, String)],
    ) -> ClusterResult<PreflightOutput> {
        self.specs.lock().push(spec.clone());
        Ok(self.output.lock().clone())
    }
}

// ============================================================================
// Addons
// ============================================================================

/// Counts addon hook calls; promotion can be made to fail.
#[derive(Default)]
pub struct RecordingAddons {
    outros: AtomicUsize,
    promotions: AtomicUsize,
    fail_promotion: Mutex<bool>,
    last_ctx: Mutex<Option<AddonContext>>,
}

impl RecordingAddons {
    pub fn fail_promotion(&self) {
        *self.fail_promotion.lock() = true;
    }

    pub fn outros(&self) -> usize {
        self.outros.load(Ordering::SeqCst)
    }

    pub fn promotions(&self) -> usize {
        self.promotions.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Option<AddonContext> {
        self.last_ctx.lock().clone()
    }
}

#[async_trait]
impl AddonApplier for RecordingAddons {
    async fn outro(&self, ctx: &AddonContext) -> ClusterResult<()> {
        self.outros.fetch_add(1, Ordering::SeqCst);
        *self.last_ctx.lock() = Some(ctx.clone());
        Ok(())
    }
}

#[async_trait]
impl HaPromoter for RecordingAddons {
    async fn promote(&self, ctx: &AddonContext) -> ClusterResult<()> {
        self.promotions.fetch_add(1, Ordering::SeqCst);
        *self.last_ctx.lock() = Some(ctx.clone());
        if *self.fail_promotion.lock() {
            return Err(ClusterError::Internal("unable to promote cluster".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Join tokens
// ============================================================================

/// Serves a fixed join command, or hangs when built with [`StubTokenSource::pending`].
pub struct StubTokenSource {
    command: Option<JoinCommand>,
    calls: AtomicUsize,
}

impl StubTokenSource {
    pub fn new(command: JoinCommand) -> Self {
        Self {
            command: Some(command),
            calls: AtomicUsize::new(0),
        }
    }

    /// A source that never answers.
    pub fn pending() -> Self {
        Self {
            command: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JoinTokenSource for StubTokenSource {
    async fn fetch(&self, _url: &str, _token: &str) -> ClusterResult<JoinCommand> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.command {
            Some(cmd) => Ok(cmd.clone()),
            None => {
                std::future::pending::<()>().await;
                Err(ClusterError::Internal("unreachable".into()))
            }
        }
    }
}

/// A join command for `version` with the given k0s command line.
pub fn join_command(version: &str, k0s_join_command: &str) -> JoinCommand {
    JoinCommand {
        version: version.to_string(),
        cluster_id: uuid::Uuid::new_v4(),
        k0s_join_command: k0s_join_command.to_string(),
        k0s_token: "join-secret".to_string(),
        ..Default::default()
    }
}

// ============================================================================
// Host
// ============================================================================

/// A fake host rooted in a temporary directory.
///
/// ```text
/// {tmp}/
/// ├── root/       # host root for HostLayout
/// └── release/    # release bundle, bin/k0s pre-populated
/// ```
pub struct TestHost {
    pub dir: TempDir,
    pub ctx: HostContext,
    pub runner: Arc<FakeRunner>,
    pub terminal: Arc<ScriptedTerminal>,
    pub metrics: Arc<RecordingMetrics>,
    pub preflights: Arc<FakePreflights>,
    pub addons: Arc<RecordingAddons>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::with_metrics(RecordingMetrics::default())
    }

    pub fn with_metrics(metrics: RecordingMetrics) -> Self {
        let dir = tempfile::tempdir().expect("create temp host");
        let layout = HostLayout::new(dir.path().join("root"));
        let release = ReleaseBundle::new(dir.path().join("release"));

        std::fs::create_dir_all(release.bin_dir()).expect("create release bin dir");
        std::fs::write(release.bin_dir().join("k0s"), b"#!/bin/sh\n").expect("write fake k0s");

        let runner = Arc::new(FakeRunner::new(&layout));
        let terminal = Arc::new(ScriptedTerminal::default());
        let metrics = Arc::new(metrics);
        let preflights = Arc::new(FakePreflights::default());
        let addons = Arc::new(RecordingAddons::default());

        let ctx = HostContext {
            binary_name: "my-app".to_string(),
            version: embedded_cluster::VERSION.to_string(),
            readiness: RetryPolicy {
                interval: Duration::from_millis(5),
                max_attempts: 20,
            },
            runner: runner.clone(),
            terminal: terminal.clone(),
            metrics: metrics.clone(),
            materializer: Arc::new(BundleMaterializer::new(release.bin_dir())),
            preflights: preflights.clone(),
            addons: addons.clone(),
            ha: addons.clone(),
            layout,
            release,
        };

        Self {
            dir,
            ctx,
            runner,
            terminal,
            metrics,
            preflights,
            addons,
        }
    }

    pub fn layout(&self) -> &HostLayout {
        &self.ctx.layout
    }

    pub fn release_dir(&self) -> &Path {
        self.ctx.release.dir()
    }

    /// Write `contents` to `rel` inside the release bundle.
    pub fn write_release_file(&self, rel: &str, contents: &str) {
        let path = self.release_dir().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create release subdir");
        }
        std::fs::write(path, contents).expect("write release file");
    }

    /// Write a file next to the host root, e.g. a license or override file.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("write file");
        path
    }

    /// Pretend a previous install left its marker behind.
    pub fn mark_installed(&self) {
        let marker = self.layout().k0s_config_path();
        std::fs::create_dir_all(marker.parent().expect("marker has parent")).expect("create etc");
        std::fs::write(marker, "existing").expect("write marker");
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}
