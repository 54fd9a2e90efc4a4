use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Fixes the observability switch for the lifetime of the process.
///
/// Only the first call has an effect. When never called the switch falls
/// back to the `OBSERVABILITY_ENABLED` environment variable.
pub fn set_observability_enabled(enabled: bool) {
    let _ = OBSERVABILITY_ENABLED.set(enabled);
}

pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true)
    })
}

/// Installs the Prometheus recorder and its upkeep task.
///
/// Returns `None` when observability is disabled or a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5,
                10.0,
            ],
        )
        .ok()?;

    let handle = match builder.install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            return None;
        }
    };

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Some(handle)
}

/// Keeps `http_requests_active` balanced even when the handler future is dropped.
struct InFlight;

impl InFlight {
    fn start() -> Self {
        gauge!("http_requests_active").increment(1.0);
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        gauge!("http_requests_active").decrement(1.0);
    }
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = {
        let _in_flight = InFlight::start();
        next.run(req).await
    };

    let status = response.status().as_u16().to_string();
    counter!("http_requests_total", "method" => method.clone(), "route" => route.clone(), "status" => status)
        .increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "route" => route)
        .record(start.elapsed().as_secs_f64());

    response
}

/// Router for the standalone metrics listener.
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// Domain counters

pub fn track_login(success: bool) {
    if !is_observability_enabled() {
        return;
    }
    let status = if success { "success" } else { "failure" };
    counter!("user_logins_total", "status" => status).increment(1);
}

pub fn track_payment_recorded(method: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("fee_payments_recorded_total", "method" => method.to_string()).increment(1);
}

pub fn track_waiver_applied(targeted: bool) {
    if !is_observability_enabled() {
        return;
    }
    let kind = if targeted { "invoice" } else { "unattached" };
    counter!("fee_waivers_applied_total", "kind" => kind).increment(1);
}

pub fn track_notifications(kind: &str, created: u64, emailed: u64) {
    if !is_observability_enabled() {
        return;
    }
    counter!("notifications_created_total", "type" => kind.to_string()).increment(created);
    counter!("notifications_emailed_total", "type" => kind.to_string()).increment(emailed);
}

pub fn track_direct_emails(sent: u64, failed: u64) {
    if !is_observability_enabled() {
        return;
    }
    counter!("direct_emails_total", "status" => "sent").increment(sent);
    counter!("direct_emails_total", "status" => "failed").increment(failed);
}

pub fn track_sweep(name: &'static str, processed: u64, failed: u64) {
    if !is_observability_enabled() {
        return;
    }
    counter!("sweep_runs_total", "sweep" => name).increment(1);
    counter!("sweep_transitions_total", "sweep" => name).increment(processed);
    if failed > 0 {
        counter!("sweep_failures_total", "sweep" => name).increment(failed);
    }
}
