use std::{
    collections::{HashMap, VecDeque},
    net::{IpAddr, SocketAddr},
    sync::Mutex,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    error::{ApiError, RateLimitedError},
    state::ApiState,
};

#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Sliding-window request counter keyed by client IP.
///
/// Each client keeps a queue of admission timestamps. A check prunes
/// timestamps older than the window across all clients, dropping clients
/// whose admissions have all aged out, then rejects once the caller's queue
/// is full. Rejected requests are not recorded.
pub struct RateLimiter {
    config: RateLimiterConfig,
    hits: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, client: IpAddr) -> Result<(), RateLimitedError> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> Result<(), RateLimitedError> {
        let mut hits = self.hits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        hits.retain(|_, queue| {
            while let Some(front) = queue.front() {
                if now.duration_since(*front) >= self.config.window {
                    queue.pop_front();
                } else {
                    break;
                }
            }

            !queue.is_empty()
        });

        let queue = hits.entry(client).or_default();

        if queue.len() >= self.config.max_requests {
            tracing::warn!(%client, "Rate limit exceeded");

            return Err(RateLimitedError::new());
        }

        queue.push_back(now);

        Ok(())
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.hits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Middleware to reject clients that exceeded the request budget before any
/// other collaborator runs.
pub async fn rate_limit(
    State(state): State<ApiState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    state.rate_limiter().check(addr.ip())?;

    Ok(next.run(req).await)
}
