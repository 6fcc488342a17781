//! Per-call statistics.

use std::fmt;
use std::time::{Duration, Instant};

/// Stats could not be set up for a call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("server host is empty")]
    EmptyHost,
    #[error("service name is empty")]
    EmptyService,
}

/// Timing and size record for one client call.
///
/// Created (and started) once the call's options are validated; ended and
/// logged when the call completes.
#[derive(Debug, Clone)]
pub struct Stats {
    /// `host:port` of the server.
    pub server: String,
    pub service: String,
    pub method: String,
    /// Size of the encoded request envelope, once sent.
    pub request_size: usize,
    /// Size of the encoded response envelope, once received.
    pub response_size: usize,
    start: Option<Instant>,
    end: Option<Instant>,
}

impl Stats {
    /// Stats for a client call. The clock starts immediately.
    pub fn client(host: &str, port: u16, service: &str, method: &str) -> Result<Self, StatsError> {
        if host.is_empty() {
            return Err(StatsError::EmptyHost);
        }
        if service.is_empty() {
            return Err(StatsError::EmptyService);
        }
        let mut stats = Self {
            server: format!("{host}:{port}"),
            service: service.to_string(),
            method: method.to_string(),
            request_size: 0,
            response_size: 0,
            start: None,
            end: None,
        };
        stats.start();
        Ok(stats)
    }

    pub fn start(&mut self) {
        self.start = Some(Instant::now());
    }

    /// Stop the clock. Later calls keep the first end time.
    pub fn end(&mut self) {
        if self.end.is_none() {
            self.end = Some(Instant::now());
        }
    }

    pub fn is_started(&self) -> bool {
        self.start.is_some()
    }

    pub fn is_ended(&self) -> bool {
        self.end.is_some()
    }

    /// Time from start to end, or to now while still running.
    pub fn elapsed(&self) -> Duration {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Emit the summary line.
    pub fn log_stats(&self) {
        tracing::info!(
            server = %self.server,
            service = %self.service,
            method = %self.method,
            request_size = self.request_size,
            response_size = self.response_size,
            elapsed_us = self.elapsed().as_micros() as u64,
            "{self}"
        );
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CLIENT {} - {}#{} - {}B/{}B - {:.4}s",
            self.server,
            self.service,
            self.method,
            self.request_size,
            self.response_size,
            self.elapsed().as_secs_f64()
        )
    }
}
