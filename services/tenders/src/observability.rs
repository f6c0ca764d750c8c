//! Logging, tracing and metrics for the tender service.
//!
//! # Purpose
//! Installs the `tracing` subscriber (env filter, fmt, optional OTLP export),
//! the Prometheus recorder with the store metric descriptions, and the
//! separate `/metrics` listener. Also extracts W3C trace context so request
//! spans join an upstream trace.
//!
//! # Notes
//! Every install step is guarded by a `OnceLock`; calling
//! [`init_observability`] twice returns the same metrics handle.
use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static TRACING: OnceLock<()> = OnceLock::new();
static PROPAGATOR: OnceLock<()> = OnceLock::new();
static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Resource attribute name, followed by the env vars consulted in order.
const RESOURCE_ENV: &[(&str, &[&str])] = &[
    (
        "service.instance.id",
        &["TENDERS_SERVICE_INSTANCE_ID", "HOSTNAME"],
    ),
    ("deployment.environment", &["DEPLOYMENT_ENVIRONMENT"]),
];

pub fn init_observability(service_name: &str) -> anyhow::Result<PrometheusHandle> {
    install_propagator();
    TRACING.get_or_init(|| init_tracing(service_name));
    let handle = install_metrics_recorder()?;
    describe_store_metrics();
    Ok(handle)
}

fn install_propagator() {
    PROPAGATOR.get_or_init(|| global::set_text_map_propagator(TraceContextPropagator::new()));
}

fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    match otlp_provider(service_name) {
        Some(provider) => {
            let tracer = provider.tracer(service_name.to_string());
            let _ = registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init();
        }
        None => {
            let _ = registry.try_init();
        }
    }
}

// Without a reachable collector configuration the exporter fails to build and
// spans stay local to the fmt layer.
fn otlp_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .ok()?;
    let resource = Resource::builder_empty()
        .with_attributes(resource_attributes(service_name))
        .build();
    Some(
        SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build(),
    )
}

fn resource_attributes(service_name: &str) -> Vec<KeyValue> {
    let mut attrs = vec![KeyValue::new("service.name", service_name.to_string())];
    for (attribute, vars) in RESOURCE_ENV {
        if let Some(value) = vars.iter().find_map(|var| std::env::var(var).ok()) {
            attrs.push(KeyValue::new(*attribute, value));
        }
    }
    attrs
}

fn describe_store_metrics() {
    metrics::describe_gauge!("tenders_total", "Number of tender version chains");
    metrics::describe_counter!(
        "tender_versions_written_total",
        "Tender versions appended, labelled by operation"
    );
}

fn install_metrics_recorder() -> anyhow::Result<PrometheusHandle> {
    if let Some(handle) = RECORDER.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("install prometheus recorder")?;
    Ok(RECORDER.get_or_init(|| handle).clone())
}

/// Parent context for a request span, read from `traceparent`/`tracestate`.
pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    install_propagator();
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

pub(crate) fn metrics_router(handle: PrometheusHandle) -> axum::Router {
    axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || std::future::ready(handle.render())),
    )
}

/// Serve `/metrics` on `addr` until the task is dropped.
pub async fn serve_metrics(handle: PrometheusHandle, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "metrics listening");
    serve_metrics_with_listener(handle, listener, std::future::pending()).await
}

pub(crate) async fn serve_metrics_with_listener<F>(
    handle: PrometheusHandle,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, metrics_router(handle).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{TraceContextExt, TraceId};
    use serial_test::serial;
    use std::time::Duration;
    use tower::ServiceExt;

    // Runs `f` with the given variables set (or removed), restoring them after.
    fn with_env(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        let saved: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
            .collect();
        for (key, value) in vars {
            match value {
                Some(value) => unsafe { std::env::set_var(key, value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
        f();
        for (key, value) in saved {
            match value {
                Some(value) => unsafe { std::env::set_var(&key, value) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
    }

    fn attribute(attrs: &[KeyValue], key: &str) -> Option<String> {
        attrs
            .iter()
            .find(|attr| attr.key.as_str() == key)
            .map(|attr| attr.value.to_string())
    }

    #[test]
    #[serial]
    fn resource_attributes_prefer_explicit_instance_id() {
        with_env(
            &[
                ("TENDERS_SERVICE_INSTANCE_ID", Some("instance-1")),
                ("HOSTNAME", Some("host-1")),
                ("DEPLOYMENT_ENVIRONMENT", Some("staging")),
            ],
            || {
                let attrs = resource_attributes("tenders");
                assert_eq!(attribute(&attrs, "service.name").as_deref(), Some("tenders"));
                assert_eq!(
                    attribute(&attrs, "service.instance.id").as_deref(),
                    Some("instance-1")
                );
                assert_eq!(
                    attribute(&attrs, "deployment.environment").as_deref(),
                    Some("staging")
                );
            },
        );
    }

    #[test]
    #[serial]
    fn resource_attributes_fall_back_to_hostname() {
        with_env(
            &[
                ("TENDERS_SERVICE_INSTANCE_ID", None),
                ("HOSTNAME", Some("host-1")),
                ("DEPLOYMENT_ENVIRONMENT", None),
            ],
            || {
                let attrs = resource_attributes("tenders");
                assert_eq!(
                    attribute(&attrs, "service.instance.id").as_deref(),
                    Some("host-1")
                );
                assert!(attribute(&attrs, "deployment.environment").is_none());
            },
        );
    }

    #[test]
    fn header_extractor_skips_non_utf8_values() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "traceparent",
            axum::http::HeaderValue::from_bytes(b"\xFF").expect("header"),
        );
        headers.insert("tracestate", "vendor=abc".parse().expect("header"));
        let extractor = HeaderExtractor(&headers);
        assert!(extractor.get("traceparent").is_none());
        assert_eq!(extractor.get("tracestate"), Some("vendor=abc"));
        assert!(extractor.keys().contains(&"traceparent"));
    }

    #[test]
    fn request_span_joins_upstream_trace() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
                .parse()
                .expect("header"),
        );
        let context = trace_context_from_headers(&headers);
        let span = context.span();
        let span_context = span.span_context();
        assert!(span_context.is_valid());
        assert_eq!(
            span_context.trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").expect("trace id")
        );
    }

    #[test]
    fn missing_traceparent_yields_no_remote_parent() {
        let context = trace_context_from_headers(&axum::http::HeaderMap::new());
        assert!(!context.span().span_context().is_valid());
    }

    #[tokio::test]
    #[serial]
    async fn init_returns_the_same_recorder() {
        let first = init_observability("tenders-test").expect("init");
        let second = init_observability("tenders-test").expect("init");
        metrics::gauge!("tenders_total").set(3.0);
        assert!(first.render().contains("tenders_total"));
        assert!(second.render().contains("tenders_total"));
    }

    #[tokio::test]
    #[serial]
    async fn metrics_router_renders_write_counter() {
        let handle = init_observability("tenders-test").expect("init");
        crate::store::record_version_written("rollback");
        let response = metrics_router(handle)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/metrics")
                    .body(axum::body::Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("tender_versions_written_total"));
        assert!(text.contains("op=\"rollback\""));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn metrics_listener_serves_over_http() {
        let handle = init_observability("tenders-test").expect("init");
        crate::store::record_version_written("create");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_metrics_with_listener(handle, listener, async move {
            let _ = stop_rx.await;
        }));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .no_proxy()
            .build()
            .expect("client");
        let body = client
            .get(format!("http://{addr}/metrics"))
            .send()
            .await
            .expect("GET /metrics")
            .error_for_status()
            .expect("status")
            .text()
            .await
            .expect("body");
        assert!(body.contains("tender_versions_written_total"));

        let _ = stop_tx.send(());
        tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .expect("shutdown in time")
            .expect("join")
            .expect("serve");
    }
}
