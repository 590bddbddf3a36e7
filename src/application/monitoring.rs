use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::domain::entity::Entity;
use crate::domain::ports::EntityRepository;
use crate::domain::value_objects::EntityId;

// ─── PerfReport ──────────────────────────────────────────────────────────────

/// A single timed repository call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OpTiming {
    /// "get", "create" or "update".
    pub operation: &'static str,
    pub entity_id: String,
    pub duration_ms: u128,
    pub ok: bool,
    /// The caller dropped the call before it finished (a cancelled save).
    pub abandoned: bool,
}

/// Accumulated repository timings.
///
/// Shared with the decorator through `Arc<Mutex<_>>`; render it with
/// `presentation::cli_summary::print_perf_summary`.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct PerfReport {
    pub timings: Vec<OpTiming>,
    pub failures: usize,
    pub total_ms: u128,
}

impl PerfReport {
    pub fn new() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::default()))
    }

    fn record(report: &Arc<Mutex<Self>>, timing: OpTiming) {
        if let Ok(mut r) = report.lock() {
            r.total_ms += timing.duration_ms;
            if !timing.ok {
                r.failures += 1;
            }
            r.timings.push(timing);
        }
    }
}

// ─── MonitoringRepository ────────────────────────────────────────────────────

/// Decorator: wraps any `EntityRepository`, measures wall time per call and
/// appends the result to the shared `PerfReport`.
pub struct MonitoringRepository<E: Entity> {
    inner: Arc<dyn EntityRepository<E>>,
    report: Arc<Mutex<PerfReport>>,
}

impl<E: Entity> MonitoringRepository<E> {
    pub fn new(inner: Arc<dyn EntityRepository<E>>, report: Arc<Mutex<PerfReport>>) -> Self {
        Self { inner, report }
    }

    fn start(&self, operation: &'static str, id: &str) -> CallTimer {
        CallTimer {
            report: Arc::clone(&self.report),
            operation,
            entity_id: id.to_string(),
            start: Instant::now(),
            finished: false,
        }
    }
}

/// Times one repository call. Recorded on `finish`, or as abandoned when
/// dropped first.
struct CallTimer {
    report: Arc<Mutex<PerfReport>>,
    operation: &'static str,
    entity_id: String,
    start: Instant,
    finished: bool,
}

impl CallTimer {
    fn finish<T>(mut self, result: &Result<T>) {
        self.finished = true;
        let duration_ms = self.start.elapsed().as_millis();
        let id = self.entity_id.as_str();
        match result {
            Ok(_) => info!(entity.id = id, duration_ms, "{} completed", self.operation),
            Err(err) => warn!(entity.id = id, duration_ms, error = %err, "{} failed", self.operation),
        }
        self.record(duration_ms, result.is_ok());
    }

    fn record(&self, duration_ms: u128, ok: bool) {
        PerfReport::record(
            &self.report,
            OpTiming {
                operation: self.operation,
                entity_id: self.entity_id.clone(),
                duration_ms,
                ok,
                abandoned: !self.finished,
            },
        );
    }
}

impl Drop for CallTimer {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let duration_ms = self.start.elapsed().as_millis();
        warn!(entity.id = %self.entity_id, duration_ms, "{} abandoned", self.operation);
        self.record(duration_ms, false);
    }
}

#[async_trait]
impl<E: Entity> EntityRepository<E> for MonitoringRepository<E> {
    #[instrument(name = "get", skip(self, id), fields(entity.id = %id), level = "info")]
    async fn get(&self, id: &EntityId) -> Result<E> {
        let timer = self.start("get", id.as_str());
        let result = self.inner.get(id).await;
        timer.finish(&result);
        result
    }

    #[instrument(name = "create", skip(self, entity), level = "info")]
    async fn create(&self, entity: &E) -> Result<E> {
        let mut timer = self.start("create", "");
        let result = self.inner.create(entity).await;
        if let Ok(created) = &result {
            timer.entity_id = created.id().to_string();
        }
        timer.finish(&result);
        result
    }

    #[instrument(name = "update", skip(self, id, partial, cancel), fields(entity.id = %id), level = "info")]
    async fn update(&self, id: &EntityId, partial: &Value, cancel: &CancellationToken) -> Result<E> {
        let timer = self.start("update", id.as_str());
        let result = self.inner.update(id, partial, cancel).await;
        timer.finish(&result);
        result
    }
}
