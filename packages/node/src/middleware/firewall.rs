//! Per-IP sliding-window firewall.
//!
//! Every request is timestamped against its client IP. Timestamps older than
//! the window are pruned; if more than `limit` remain the request is rejected
//! with HTTP 429 and a `Retry-After` header. Admitted or not, every request is
//! appended to the firewall log.
//!
//! A limit of `0` disables rejection. Requests are still logged.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use cloelia::FirewallLogEntry;
use cloelia_node_api::{codes, ErrorResponse};

use crate::request_log::JsonlLog;

/// Body text of every 429.
pub const REJECTION_MESSAGE: &str = "Cloelia has sensed an unnatural rhythm. Delay your inquiry.";

// ---------------------------------------------------------------------------
// RateTracker
// ---------------------------------------------------------------------------

/// Outcome of [`RateTracker::admit_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted,
    Rejected { retry_after: Duration },
}

impl Decision {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Decision::Rejected { .. })
    }
}

/// Sliding-window request tracker keyed by client IP.
///
/// Each bucket keeps at most `limit + 1` timestamps. Anything older than that
/// can never change a decision, so dropping it keeps memory bounded without
/// altering behaviour.
pub struct RateTracker {
    buckets: Mutex<HashMap<String, VecDeque<Instant>>>,
    limit: u32,
    window: Duration,
}

impl RateTracker {
    /// Pass `limit = 0` to disable rejection.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            limit,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn buckets(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.buckets.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Record a request from `ip` at `now` and decide whether it is too
    /// frequent.
    pub fn admit_at(&self, ip: &str, now: Instant) -> Decision {
        if self.limit == 0 {
            return Decision::Admitted;
        }
        let cap = self.limit as usize + 1;

        let mut buckets = self.buckets();
        let bucket = buckets.entry(ip.to_string()).or_default();
        bucket.push_back(now);
        bucket.retain(|t| now.saturating_duration_since(*t) < self.window);
        while bucket.len() > cap {
            bucket.pop_front();
        }

        if bucket.len() > self.limit as usize {
            // The next request is counted too, so at most `limit - 1` of the
            // current entries may remain. It is admitted once the entry at
            // `len - limit` has expired.
            let blocking = bucket
                .get(bucket.len() - self.limit as usize)
                .copied()
                .unwrap_or(now);
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(blocking));
            Decision::Rejected { retry_after }
        } else {
            Decision::Admitted
        }
    }

    pub fn admit(&self, ip: &str) -> Decision {
        self.admit_at(ip, Instant::now())
    }

    /// Drop buckets with no timestamp inside the window. Returns how many
    /// were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut buckets = self.buckets();
        let before = buckets.len();
        buckets.retain(|_, bucket| {
            bucket
                .back()
                .is_some_and(|t| now.saturating_duration_since(*t) < self.window)
        });
        before - buckets.len()
    }

    /// Number of IPs currently tracked.
    pub fn tracked_ips(&self) -> usize {
        self.buckets().len()
    }
}

/// Sweep idle buckets once per window, forever.
pub fn spawn_sweeper(tracker: Arc<RateTracker>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tracker.window());
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = tracker.sweep_at(Instant::now());
            if removed > 0 {
                tracing::debug!(
                    removed,
                    remaining = tracker.tracked_ips(),
                    "swept idle rate buckets"
                );
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Middleware function
// ---------------------------------------------------------------------------

/// Everything the firewall needs per request.
#[derive(Clone)]
pub struct Firewall {
    pub tracker: Arc<RateTracker>,
    pub log: JsonlLog<FirewallLogEntry>,
    pub trust_proxy: bool,
}

/// Axum `from_fn` middleware that rate-limits and logs every request.
pub async fn firewall_middleware(firewall: Firewall, req: Request<Body>, next: Next) -> Response {
    let ip = client_ip(&req, firewall.trust_proxy);
    let path = req.uri().path().to_string();

    let decision = firewall.tracker.admit(&ip);
    firewall
        .log
        .append(FirewallLogEntry::now(&ip, &path, decision.is_rejected()))
        .await;

    match decision {
        Decision::Admitted => next.run(req).await,
        Decision::Rejected { retry_after } => {
            tracing::warn!(%ip, %path, "rate limit exceeded");
            rejection(retry_after)
        }
    }
}

fn rejection(retry_after: Duration) -> Response {
    let body = ErrorResponse::new(codes::RATE_LIMIT_EXCEEDED, REJECTION_MESSAGE);
    let mut resp = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
    if let Ok(v) = HeaderValue::from_str(&secs.to_string()) {
        resp.headers_mut().insert("retry-after", v);
    }
    resp
}

// ---------------------------------------------------------------------------
// IP extraction
// ---------------------------------------------------------------------------

/// Resolve the client IP.
///
/// Proxy headers are only consulted when `trust_proxy` is set; otherwise a
/// client could pick its own bucket. Falls back to the TCP peer address, then
/// to a shared `"unknown"` bucket.
fn client_ip(req: &Request<Body>, trust_proxy: bool) -> String {
    if trust_proxy {
        // X-Forwarded-For: client, proxy1, proxy2. Leftmost is the client.
        if let Some(ip) = header_str(req, "x-forwarded-for")
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return ip.to_string();
        }
        if let Some(ip) = header_str(req, "x-real-ip")
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return ip.to_string();
        }
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

fn header_str<'a>(req: &'a Request<Body>, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
