//! Small blocking HTTP client for vendor APIs.
//!
//! Two behaviors sit on top of a pluggable `Transport`:
//!
//! - client-side rate limiting (minimum interval between requests)
//! - bounded retries for transport errors and retryable statuses
//!
//! Time is read through a `Clock` so both behaviors are testable without
//! sleeping.

use std::cell::Cell;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::FetchError;

const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Performs one GET request.
pub trait Transport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, FetchError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, FetchError> {
        let mut req = self.client.get(url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let resp = req
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .map_err(|e| FetchError::Transport(format!("failed to read body: {e}")))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

/// Monotonic time source.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

pub struct HttpClient<T = ReqwestTransport, C = SystemClock> {
    transport: T,
    clock: C,
    interval: Duration,
    max_retries: u32,
    next_allowed: Cell<Duration>,
}

impl HttpClient {
    /// Real network client.
    pub fn with_defaults(rate_limit_per_second: f64, max_retries: u32) -> Result<Self, FetchError> {
        Ok(HttpClient::new(
            ReqwestTransport::new()?,
            SystemClock::default(),
            rate_limit_per_second,
            max_retries,
        ))
    }
}

impl<T: Transport, C: Clock> HttpClient<T, C> {
    /// A non-positive rate limit disables client-side pacing, as does a rate
    /// whose interval has no `Duration` representation (`Settings` rejects those).
    pub fn new(transport: T, clock: C, rate_limit_per_second: f64, max_retries: u32) -> Self {
        let interval = pacing_interval(rate_limit_per_second).unwrap_or(Duration::ZERO);
        Self {
            transport,
            clock,
            interval,
            max_retries,
            next_allowed: Cell::new(Duration::ZERO),
        }
    }

    /// GET `url` and decode a JSON object body.
    pub fn request_json(&self, url: &str, headers: &[(&str, &str)]) -> Result<Map<String, Value>, FetchError> {
        let mut attempt: u32 = 0;

        loop {
            self.wait_for_rate_limit();

            let response = match self.transport.get(url, headers) {
                Ok(resp) => resp,
                Err(err) => {
                    if attempt >= self.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    warn!(attempt, error = %err, "request failed; retrying");
                    self.clock.sleep(backoff(attempt));
                    continue;
                }
            };

            self.mark_request_time();

            if response.status == 200 {
                return match serde_json::from_slice::<Value>(&response.body)? {
                    Value::Object(map) => Ok(map),
                    _ => Err(FetchError::NotAnObject),
                };
            }

            if RETRYABLE_STATUS.contains(&response.status) && attempt < self.max_retries {
                attempt += 1;
                warn!(attempt, status = response.status, "retryable status; retrying");
                self.clock.sleep(backoff(attempt));
                continue;
            }

            return Err(FetchError::Status(response.status));
        }
    }

    fn wait_for_rate_limit(&self) {
        let now = self.clock.now();
        let next = self.next_allowed.get();
        if next > now {
            self.clock.sleep(next - now);
        }
    }

    fn mark_request_time(&self) {
        self.next_allowed.set(self.clock.now().saturating_add(self.interval));
    }
}

/// Minimum spacing between requests for `rate_limit_per_second`.
///
/// Non-positive rates mean "no pacing" (`Some(ZERO)`). Returns `None` for NaN,
/// infinity, or a positive rate so small its interval overflows `Duration`.
pub fn pacing_interval(rate_limit_per_second: f64) -> Option<Duration> {
    if rate_limit_per_second.is_nan() || rate_limit_per_second.is_infinite() {
        return None;
    }
    if rate_limit_per_second <= 0.0 {
        return Some(Duration::ZERO);
    }
    Duration::try_from_secs_f64(1.0 / rate_limit_per_second).ok()
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt))
}
