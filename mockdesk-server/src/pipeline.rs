//! Request-interception pipeline
//!
//! Stage order per request: scenario handler overrides, scenario fault
//! patterns, the scenario's probabilistic error rate, the shared fault
//! injector, latency injection, admission control, and only then the
//! resource handler. A matched fault short-circuits latency injection.
//! Whatever the outcome, a completed entry lands in the request log.

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use mockdesk_sim::faults::render_error_body;
use mockdesk_sim::{RateLimitResult, RequestProfile};
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tracing::warn;

use crate::context::SimContext;
use crate::request_log::RequestLogEntry;

/// Middleware entry point applied to every resource route.
pub async fn simulation_pipeline(
    State(ctx): State<SimContext>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let profile = profile_of(&request);

    let response = intercept(&ctx, &profile, request, next).await;

    if ctx.config.server.capture_request_log {
        ctx.request_log.append(RequestLogEntry {
            method: profile.method.clone(),
            path: profile.path.clone(),
            headers: profile.headers.clone(),
            status: response.status().as_u16(),
            response_headers: flatten_headers(response.headers()),
            duration: started.elapsed(),
            completed_at: Utc::now(),
        });
    }

    response
}

async fn intercept(
    ctx: &SimContext,
    profile: &RequestProfile,
    request: Request,
    next: Next,
) -> Response {
    let scenario = ctx.scenarios.active_details();

    // Canned handler overrides replace the real handler outright.
    if let Some(canned) = scenario.match_override(profile) {
        let status =
            StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return json_response(status, canned.body.to_string());
    }

    // Scenario fault patterns; a match suppresses latency injection.
    if let Some(fault) = scenario.match_fault(profile) {
        let body = render_error_body(fault);
        return fault_response(fault.status, body, fault.details.as_ref());
    }

    // The scenario's baseline error rate: a probabilistic generic
    // failure independent of any pattern.
    if scenario.error_rate > 0.0 && fastrand::f64() < scenario.error_rate {
        warn!(
            scenario = %scenario.name,
            path = %profile.path,
            "scenario error rate fired"
        );
        let body = json!({
            "error": {
                "code": "internal_error",
                "message": "The simulated backend failed unexpectedly"
            }
        });
        return json_response(StatusCode::INTERNAL_SERVER_ERROR, body.to_string());
    }

    // Shared fault scenarios are an independent layer on top of the
    // active behavior set.
    for scenario_name in &ctx.config.faults.enabled_scenarios {
        if let Some(simulated) = ctx.faults.simulate_error(profile, scenario_name) {
            if let Some(backoff) = simulated.backoff {
                tokio::time::sleep(backoff).await;
            }
            let details = serde_json::from_str::<serde_json::Value>(&simulated.body)
                .ok()
                .and_then(|body| body.pointer("/error/details").cloned());
            return fault_response(simulated.status, simulated.body, details.as_ref());
        }
    }

    // Real wall-clock delay under the scenario's bounds.
    ctx.latency
        .simulate(profile, Some(scenario.latency_range()))
        .await;

    // Admission control may still reject the request.
    let admission = ctx.rate_limiter.check_rate_limit(profile);
    if !admission.allowed && ctx.rate_limiter.deny_with_429() {
        return deny_response(ctx, &admission);
    }

    let mut response = next.run(request).await;
    apply_headers(&mut response, ctx.rate_limiter.limit_headers(&admission));
    response
}

/// Build the simulation's view of the request.
fn profile_of(request: &Request) -> RequestProfile {
    let mut profile = RequestProfile::new(request.method().as_str(), request.uri().path());
    for (name, value) in request.headers() {
        if let Ok(value) = value.to_str() {
            profile
                .headers
                .insert(name.as_str().to_ascii_lowercase(), value.to_string());
        }
    }
    profile.content_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);
    profile
}

fn json_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

/// A manufactured fault response with the remediation headers the
/// status calls for.
fn fault_response(status: u16, body: String, details: Option<&serde_json::Value>) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = json_response(status, body);

    match status {
        StatusCode::UNAUTHORIZED => {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"mockdesk\""),
            );
        }
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS => {
            let retry_secs = details
                .and_then(|d| d.get("retry_after_seconds"))
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(30);
            if let Ok(value) = HeaderValue::from_str(&retry_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        _ => {}
    }

    response
}

/// 429 denial from admission control.
fn deny_response(ctx: &SimContext, admission: &RateLimitResult) -> Response {
    let retry_secs = admission.retry_after_secs();
    let body = json!({
        "error": {
            "code": "rate_limited",
            "message": "Too many requests, slow down",
            "limit_type": admission.limit_type,
            "retry_after_seconds": retry_secs
        }
    });

    let mut response = json_response(StatusCode::TOO_MANY_REQUESTS, body.to_string());
    if let Ok(value) = HeaderValue::from_str(&retry_secs.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    apply_headers(&mut response, ctx.rate_limiter.limit_headers(admission));
    response
}

fn apply_headers(response: &mut Response, headers: Vec<(&'static str, String)>) {
    for (name, value) in headers {
        let name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => name,
            Err(_) => continue,
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().insert(name, value);
        }
    }
}

fn flatten_headers(headers: &axum::http::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
