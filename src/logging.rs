use axum::{
    extract::Request,
    http::{Method, Uri},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let remote_addr = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
        })
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();
    let timestamp = Utc::now().format("%d-%m-%Y %H:%M:%S");

    info!(
        target: "access_log",
        "{} {} \"{}\" {} {} {}ms \"{}\"",
        timestamp,
        remote_addr,
        format_request(&method, &uri),
        status.as_u16(),
        response
            .headers()
            .get("content-length")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("-"),
        duration.as_millis(),
        user_agent,
    );

    response
}

fn format_request(method: &Method, uri: &Uri) -> String {
    format!("{} {} HTTP/1.1", method, uri)
}
