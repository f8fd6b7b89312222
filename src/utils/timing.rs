use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::catalogue::Category;

pub const TIMING_TARGET: &str = "tryon.timing";

#[derive(Debug)]
pub struct GenerationTimer {
    category: Category,
    model_bytes: usize,
    item_bytes: usize,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    status: String,
    detail: Option<String>,
    completed: bool,
}

impl GenerationTimer {
    pub fn new(category: Category, model_bytes: usize, item_bytes: usize) -> Self {
        GenerationTimer {
            category,
            model_bytes,
            item_bytes,
            started_at: Utc::now(),
            started_perf: Instant::now(),
            status: "success".to_string(),
            detail: None,
            completed: false,
        }
    }

    pub fn log_received(&self) {
        info!(
            target: TIMING_TARGET,
            "event=generation_received category={} model_bytes={} item_bytes={} received_at={}",
            self.category,
            self.model_bytes,
            self.item_bytes,
            self.started_at.to_rfc3339()
        );
    }

    pub fn mark_status(&mut self, status: &str, detail: Option<String>) {
        self.status = status.to_string();
        self.detail = detail;
    }

    pub fn log_completed(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        let completed_at = Utc::now();
        let duration = self.started_perf.elapsed().as_secs_f64();
        info!(
            target: TIMING_TARGET,
            "event=generation_completed category={} started_at={} completed_at={} duration_s={:.3} status={} detail={}",
            self.category,
            self.started_at.to_rfc3339(),
            completed_at.to_rfc3339(),
            duration,
            self.status,
            self.detail.clone().unwrap_or_default()
        );
    }
}

impl Drop for GenerationTimer {
    fn drop(&mut self) {
        if !self.completed {
            self.mark_status("abandoned", None);
            self.log_completed();
        }
    }
}

pub fn start_generation_timer(
    category: Category,
    model_bytes: usize,
    item_bytes: usize,
) -> GenerationTimer {
    let timer = GenerationTimer::new(category, model_bytes, item_bytes);
    timer.log_received();
    timer
}

pub fn complete_generation_timer(
    timer: &mut GenerationTimer,
    status: &str,
    detail: Option<String>,
) {
    timer.mark_status(status, detail);
    timer.log_completed();
}

pub async fn log_llm_timing<T, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, anyhow::Error>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    let metadata_text = metadata
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: TIMING_TARGET,
        "event=llm_request provider={} model={} operation={} started_at={} metadata={}",
        provider,
        model,
        operation,
        started_at.to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let status = if result.is_err() { "error" } else { "success" };

    let completed_at = Utc::now();
    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: TIMING_TARGET,
        "event=llm_response provider={} model={} operation={} completed_at={} duration_s={:.3} status={} metadata={}",
        provider,
        model,
        operation,
        completed_at.to_rfc3339(),
        duration,
        status,
        metadata_text
    );

    result
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[tokio::test]
    async fn llm_timing_passes_results_through() {
        let ok = log_llm_timing("stub", "m", "op", None, || async { Ok(7) });
        assert_eq!(ok.await.unwrap(), 7);

        let failing = || async { Err::<(), _>(anyhow!("nope")) };
        let err = log_llm_timing("stub", "m", "op", None, failing).await;
        assert_eq!(err.unwrap_err().to_string(), "nope");
    }

    #[test]
    fn timer_completes_once() {
        let mut timer = start_generation_timer(Category::Hats, 10, 20);
        complete_generation_timer(&mut timer, "error", Some("boom".into()));
        assert!(timer.completed);
        assert_eq!(timer.status, "error");
        timer.mark_status("success", None);
        timer.log_completed();
        assert_eq!(timer.status, "success");
    }
}
