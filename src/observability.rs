use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Process-wide counters for commands issued to the version-control tool
#[derive(Debug, Default)]
pub struct ExecutorMetrics {
    pub commands_spawned: AtomicU64,
    pub failures: AtomicU64,
    pub timeouts: AtomicU64,
    pub guard_rejections: AtomicU64,
}

impl ExecutorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_spawn(&self) {
        self.commands_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        self.record_failure();
    }

    pub fn record_guard_rejection(&self) {
        self.guard_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> ExecutorStats {
        ExecutorStats {
            commands_spawned: self.commands_spawned.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            guard_rejections: self.guard_rejections.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Executor metrics: spawned={}, failures={}, timeouts={}, guard_rejections={}",
            stats.commands_spawned, stats.failures, stats.timeouts, stats.guard_rejections
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorStats {
    pub commands_spawned: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub guard_rejections: u64,
}

/// Global metrics instance
static EXECUTOR_METRICS: std::sync::LazyLock<ExecutorMetrics> =
    std::sync::LazyLock::new(ExecutorMetrics::new);

pub fn executor_metrics() -> &'static ExecutorMetrics {
    &EXECUTOR_METRICS
}

/// Create correlated spans for workflow runs
pub fn create_workflow_span(workflow: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "workflow",
        workflow.name = workflow,
        correlation.id = correlation_id,
        otel.kind = "internal"
    )
}
