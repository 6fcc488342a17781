//! Client metrics.
//!
//! Process-wide counters for calls made through this crate, registered with
//! metriken for exposition.

use metriken::{Counter, metric};

#[metric(
    name = "socketrpc/client/requests/sent",
    description = "Request envelopes handed to a connector"
)]
pub static REQUESTS_SENT: Counter = Counter::new();

#[metric(
    name = "socketrpc/client/bytes/sent",
    description = "Request envelope bytes sent"
)]
pub static BYTES_SENT: Counter = Counter::new();

#[metric(
    name = "socketrpc/client/bytes/received",
    description = "Response envelope bytes received"
)]
pub static BYTES_RECEIVED: Counter = Counter::new();

#[metric(
    name = "socketrpc/client/calls/succeeded",
    description = "Calls whose success callback completed"
)]
pub static CALLS_SUCCEEDED: Counter = Counter::new();

#[metric(
    name = "socketrpc/client/calls/failed",
    description = "Calls that took the failure path"
)]
pub static CALLS_FAILED: Counter = Counter::new();

#[metric(
    name = "socketrpc/client/calls/completed",
    description = "Calls that reached completion"
)]
pub static CALLS_COMPLETED: Counter = Counter::new();
