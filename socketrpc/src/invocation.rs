//! The request/response lifecycle of one call.
//!
//! An [`Invocation`] walks through
//!
//! ```text
//! Built ──> Sent ──> Decoded ──> Succeeded ──> Completed
//!   │         │         │                        ^
//!   └─────────┴─────────┴──────> Failed ─────────┘
//! ```
//!
//! entering each phase at most once. Every path ends in `Completed`, and the
//! completion step (stats, `on_complete`) runs exactly once. Exactly one of
//! `on_success` / `on_failure` sees the outcome.
//!
//! Callbacks run synchronously inside the phase that triggers them, on the
//! thread that drives the invocation.

use std::fmt;
use std::io;

use protocol_socketrpc::{ErrorReason, Request, Response};
use tracing::{Span, debug, error, field};

use crate::callback::Slot;
use crate::connector::Connector;
use crate::error::{CallbackResult, ClientError, Error, ReasonCode};
use crate::message::{AnyMessage, MessageType, RequestArg};
use crate::metrics;
use crate::options::ClientOptions;
use crate::stats::Stats;

/// Lifecycle phase of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Built,
    Sent,
    Decoded,
    Succeeded,
    Failed,
    Completed,
}

/// The result of a call.
#[derive(Debug)]
pub enum Outcome {
    Success(AnyMessage),
    Failure(ClientError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn error(&self) -> Option<&ClientError> {
        match self {
            Self::Failure(err) => Some(err),
            Self::Success(_) => None,
        }
    }

    pub fn into_result(self) -> Result<AnyMessage, ClientError> {
        match self {
            Self::Success(message) => Ok(message),
            Self::Failure(err) => Err(err),
        }
    }

    /// The response as an `M`, if the call succeeded with one.
    pub fn response<M: 'static>(self) -> Option<M> {
        match self {
            Self::Success(message) => message.downcast(),
            Self::Failure(_) => None,
        }
    }
}

type CompleteCallback = Box<dyn FnOnce(&Invocation) -> CallbackResult>;

/// One client-side rpc call and its lifecycle state.
///
/// An invocation owns its connector and is good for a single request. Once
/// it has completed it cannot be sent again.
pub struct Invocation {
    options: ClientOptions,
    request_type: Option<MessageType>,
    response_type: Option<MessageType>,
    /// `Err` holds why a field map could not be turned into a request.
    request: Option<Result<AnyMessage, String>>,
    connector: Box<dyn Connector>,
    on_success: Slot<AnyMessage>,
    on_failure: Slot<ClientError>,
    on_complete: Option<CompleteCallback>,
    callbacks_verified: bool,
    used_sync_fallback: bool,
    captured: Option<Outcome>,
    initialized: bool,
    stats: Option<Stats>,
    error: Option<ClientError>,
    phases: Vec<Phase>,
    span: Span,
}

impl Invocation {
    pub fn new(options: ClientOptions, connector: impl Connector + 'static) -> Self {
        Self {
            options,
            request_type: None,
            response_type: None,
            request: None,
            connector: Box::new(connector),
            on_success: Slot::Unset,
            on_failure: Slot::Unset,
            on_complete: None,
            callbacks_verified: false,
            used_sync_fallback: false,
            captured: None,
            initialized: false,
            stats: None,
            error: None,
            phases: vec![Phase::Built],
            span: tracing::debug_span!("rpc_call", service = field::Empty, method = field::Empty),
        }
    }

    // -- Configuration --------------------------------------------------------

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Mutable options, while the call has not started.
    pub fn options_mut(&mut self) -> Result<&mut ClientOptions, Error> {
        self.ensure_unstarted()?;
        Ok(&mut self.options)
    }

    pub fn request_type(&self) -> Option<MessageType> {
        self.request_type
    }

    /// Set the request type. Fixed once the call has started.
    pub fn set_request_type(&mut self, ty: MessageType) -> Result<(), Error> {
        self.ensure_unstarted()?;
        self.request_type = Some(ty);
        Ok(())
    }

    pub fn response_type(&self) -> Option<MessageType> {
        self.response_type
    }

    /// Set the response type. Fixed once the call has started.
    pub fn set_response_type(&mut self, ty: MessageType) -> Result<(), Error> {
        self.ensure_unstarted()?;
        self.response_type = Some(ty);
        Ok(())
    }

    /// Set the request payload.
    ///
    /// A message is used as-is; its type is checked against the request type
    /// when the request is sent. A field map is built into an instance of the
    /// request type now, so the request type must already be set.
    pub fn set_request(&mut self, arg: RequestArg) -> Result<(), Error> {
        self.ensure_unstarted()?;
        let request = match arg {
            RequestArg::Message(message) => Ok(message),
            RequestArg::Fields(fields) => match self.request_type {
                Some(ty) => ty.build(fields).map_err(|e| e.to_string()),
                None => Err("request fields given before a request type".to_string()),
            },
        };
        if let Ok(message) = &request {
            debug!(request = ?message, "request data");
        }
        self.request = Some(request);
        Ok(())
    }

    /// Whether the call has started: options were validated or a phase past
    /// `Built` was entered.
    pub fn is_started(&self) -> bool {
        self.initialized || self.phase() != Phase::Built
    }

    fn ensure_unstarted(&self) -> Result<(), Error> {
        if self.is_started() {
            debug!(phase = ?self.phase(), "configuration change refused, call already started");
            return Err(Error::AlreadyStarted);
        }
        Ok(())
    }

    // -- Callbacks ------------------------------------------------------------

    /// Register the callback that receives a successful response. If it
    /// returns an error the call is failed with `RPC_ERROR` instead.
    pub fn on_success<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(AnyMessage) -> CallbackResult + 'static,
    {
        self.on_success = Slot::caller(f);
        self
    }

    /// Like [`on_success`](Self::on_success), downcasting the response to
    /// `M` first. A response of another type is a callback error.
    pub fn on_success_as<M, F>(&mut self, f: F) -> &mut Self
    where
        M: 'static,
        F: FnOnce(M) -> CallbackResult + 'static,
    {
        self.on_success(move |message: AnyMessage| {
            let actual = message.type_name();
            match message.downcast::<M>() {
                Some(response) => f(response),
                None => Err(format!(
                    "response was {actual}, expected {}",
                    std::any::type_name::<M>()
                )
                .into()),
            }
        })
    }

    /// Register the callback that receives the error of a failed call. An
    /// error it returns is re-raised from the send operation.
    pub fn on_failure<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(ClientError) -> CallbackResult + 'static,
    {
        self.on_failure = Slot::caller(f);
        self
    }

    /// Register the callback run once the call has completed, whichever way
    /// it went. An error it returns is re-raised from the send operation.
    pub fn on_complete<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&Invocation) -> CallbackResult + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Capture the outcome for [`take_outcome`](Self::take_outcome) instead
    /// of delivering it to success/failure callbacks.
    pub fn capture_outcome(&mut self) {
        self.on_success = Slot::Capture;
        self.on_failure = Slot::Capture;
    }

    /// Take the captured outcome, if any.
    pub fn take_outcome(&mut self) -> Option<Outcome> {
        self.captured.take()
    }

    // -- State ----------------------------------------------------------------

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phases.last().copied().unwrap_or(Phase::Built)
    }

    /// Every phase entered so far, in order.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn is_completed(&self) -> bool {
        self.phase() == Phase::Completed
    }

    /// Whether the call has failed.
    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }

    /// The error the call failed with.
    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    /// Whether the outcome was captured because no callbacks were registered.
    pub fn used_sync_fallback(&self) -> bool {
        self.used_sync_fallback
    }

    /// Stats for the call, once options were validated.
    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    // -- Driving --------------------------------------------------------------

    /// Run the whole call over the connector: validate, connect, send, wait
    /// for the response, and deliver the outcome.
    ///
    /// Returns the outcome directly when none of the callbacks were
    /// registered; otherwise `Ok(None)` once the callbacks have run.
    pub fn send_request(&mut self) -> Result<Option<Outcome>, Error> {
        if self.is_completed() {
            return Err(Error::AlreadyCompleted);
        }
        let span = self.span.clone();
        let _enter = span.enter();

        self.initialize()?;

        if !self.is_errored() && self.phase() == Phase::Built {
            let host = self.options.host.clone().unwrap_or_default();
            let port = self.options.port.unwrap_or_default();
            if let Err(e) = self.connector.connect(&host, port) {
                self.connector.close();
                self.fail(ErrorReason::RpcError, format!("Connection error: {e}"))?;
            }
        }

        self.connection_completed()?;

        if self.phase() == Phase::Sent {
            match self.connector.recv_response() {
                Ok(data) => self.parse_response(&data)?,
                Err(e) => self.read_failed(e)?,
            }
        }

        Ok(self.take_outcome())
    }

    /// Validate the required options and start stats. Runs once; later calls
    /// do nothing.
    pub fn initialize(&mut self) -> Result<(), Error> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        let span = self.span.clone();
        let _enter = span.enter();
        if let Some(service) = &self.options.service {
            self.span.record("service", service.as_str());
        }
        if let Some(method) = &self.options.method {
            self.span.record("method", method.as_str());
        }

        if let Some(missing) = self.options.missing() {
            return self.fail(
                ErrorReason::RpcError,
                format!("Invalid client connection configuration. {missing} must be a defined option."),
            );
        }

        let stats = Stats::client(
            self.options.host.as_deref().unwrap_or_default(),
            self.options.port.unwrap_or_default(),
            self.options.service.as_deref().unwrap_or_default(),
            self.options.method.as_deref().unwrap_or_default(),
        );
        match stats {
            Ok(stats) => {
                self.stats = Some(stats);
                Ok(())
            }
            Err(e) => self.fail(
                ErrorReason::RpcError,
                format!("Invalid stats configuration. {e}"),
            ),
        }
    }

    /// The transport is connected: build the request envelope and send it.
    ///
    /// Does nothing if the call has already failed or was already sent.
    pub fn connection_completed(&mut self) -> Result<(), Error> {
        self.initialize()?;
        if self.is_errored() || self.phase() != Phase::Built {
            return Ok(());
        }
        let span = self.span.clone();
        let _enter = span.enter();

        let envelope = match self.build_request() {
            Ok(envelope) => envelope,
            Err(err) => return self.fail(err.code, err.message),
        };
        let bytes = envelope.to_bytes();
        debug!(
            service = %envelope.service_name,
            method = %envelope.method_name,
            size = bytes.len(),
            "sending request"
        );
        if let Some(stats) = self.stats.as_mut() {
            stats.request_size = bytes.len();
        }

        if let Err(e) = self.connector.send_bytes(&bytes) {
            self.connector.close();
            return self.fail(ErrorReason::RpcError, format!("Connection error: {e}"));
        }
        metrics::REQUESTS_SENT.increment();
        metrics::BYTES_SENT.add(bytes.len() as u64);
        self.enter(Phase::Sent);
        Ok(())
    }

    /// A full response envelope has arrived: decode it and deliver the
    /// outcome.
    ///
    /// Returns the outcome directly when none of the callbacks were
    /// registered.
    pub fn response_received(&mut self, data: &[u8]) -> Result<Option<Outcome>, Error> {
        let span = self.span.clone();
        let _enter = span.enter();
        self.parse_response(data)?;
        Ok(self.take_outcome())
    }

    /// The transport failed before a response arrived.
    pub fn transport_failed(&mut self, err: io::Error) -> Result<Option<Outcome>, Error> {
        let span = self.span.clone();
        let _enter = span.enter();
        if self.phase() == Phase::Sent {
            self.read_failed(err)?;
        } else {
            self.connector.close();
            self.fail(ErrorReason::RpcError, format!("Connection error: {err}"))?;
        }
        Ok(self.take_outcome())
    }

    // -- Internal -------------------------------------------------------------

    fn build_request(&self) -> Result<Request, ClientError> {
        let Some(request_type) = self.request_type else {
            return Err(missing_option("request_type"));
        };
        if self.response_type.is_none() {
            return Err(missing_option("response_type"));
        }

        let request = match &self.request {
            Some(Ok(request)) => request,
            Some(Err(reason)) => {
                return Err(ClientError::new(ErrorReason::InvalidRequestProto, reason.clone()));
            }
            None => {
                return Err(ClientError::new(
                    ErrorReason::InvalidRequestProto,
                    format!(
                        "Expected request type to be type of {}, got nothing instead",
                        request_type.name()
                    ),
                ));
            }
        };

        if !request_type.matches(request) {
            return Err(ClientError::new(
                ErrorReason::InvalidRequestProto,
                format!(
                    "Expected request type to be type of {}, got {} instead",
                    request_type.name(),
                    request.type_name()
                ),
            ));
        }

        Ok(Request::new(
            self.options.service.clone().unwrap_or_default(),
            self.options.method.clone().unwrap_or_default(),
            request.encode(),
        ))
    }

    fn read_failed(&mut self, err: io::Error) -> Result<(), Error> {
        self.connector.close();
        self.fail(
            ErrorReason::IoError,
            format!("Unable to read response from server: {err}"),
        )
    }

    fn parse_response(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.phase() != Phase::Sent {
            debug!(phase = ?self.phase(), "ignoring response outside of the sent phase");
            return Ok(());
        }

        // One request per connection.
        self.connector.close();
        debug!(size = data.len(), "parsing response from server (connection closed)");
        if let Some(stats) = self.stats.as_mut() {
            stats.response_size = data.len();
        }
        metrics::BYTES_RECEIVED.add(data.len() as u64);

        let envelope = match Response::from_bytes(data) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "response envelope did not decode");
                return self.fail(ErrorReason::BadResponseProto, BAD_RESPONSE);
            }
        };
        self.enter(Phase::Decoded);

        // Presence of a reason is what makes this an error response, even if
        // a payload came along with it.
        if let Some(code) = envelope.reason_code() {
            debug!(code, "error response parsed");
            return self.fail(code, envelope.error_text());
        }

        let parsed = match (self.response_type, envelope.payload()) {
            (Some(ty), Some(payload)) => ty.decode(payload).ok(),
            _ => None,
        };
        match parsed {
            Some(response) => {
                debug!("successful response parsed");
                self.verify_callbacks();
                self.succeed(response)
            }
            None => self.fail(ErrorReason::BadResponseProto, BAD_RESPONSE),
        }
    }

    /// Install the capturing fallback if the caller registered no callbacks.
    /// Only the first delivered outcome gets to decide.
    fn verify_callbacks(&mut self) {
        if self.callbacks_verified {
            return;
        }
        self.callbacks_verified = true;
        let any = self.on_success.is_set() || self.on_failure.is_set() || self.on_complete.is_some();
        if !any {
            debug!("no callbacks set, capturing outcome");
            self.capture_outcome();
            self.used_sync_fallback = true;
        }
    }

    fn succeed(&mut self, response: AnyMessage) -> Result<(), Error> {
        debug!("request succeeded (invoking on_success)");
        let delivered = match self.on_success.take() {
            Slot::Unset => Ok(()),
            Slot::Capture => {
                self.captured = Some(Outcome::Success(response));
                Ok(())
            }
            Slot::Caller(cb) => cb(response),
        };

        match delivered {
            Ok(()) => {
                self.enter(Phase::Succeeded);
                metrics::CALLS_SUCCEEDED.increment();
                self.complete()
            }
            Err(e) => {
                error!(error = %e, "success callback error encountered");
                self.fail(
                    ErrorReason::RpcError,
                    format!("An exception occurred while calling on_success: {e}"),
                )
            }
        }
    }

    /// The one failure routine: every error path ends here, and this always
    /// completes the call.
    fn fail(&mut self, code: impl Into<ReasonCode>, message: impl Into<String>) -> Result<(), Error> {
        if self.is_completed() {
            return Ok(());
        }
        self.verify_callbacks();

        let err = ClientError::new(code, message);
        error!(code = %err.code, message = %err.message, "request failed (invoking on_failure)");
        self.error = Some(err.clone());
        self.enter(Phase::Failed);
        metrics::CALLS_FAILED.increment();

        let delivered = match self.on_failure.take() {
            Slot::Unset => Ok(()),
            Slot::Capture => {
                self.captured = Some(Outcome::Failure(err));
                Ok(())
            }
            Slot::Caller(cb) => cb(err).map_err(|e| {
                error!(error = %e, "failure callback error encountered");
                Error::FailureCallback(e)
            }),
        };

        self.complete()?;
        delivered
    }

    fn complete(&mut self) -> Result<(), Error> {
        if self.is_completed() {
            return Ok(());
        }
        self.enter(Phase::Completed);
        if let Some(stats) = self.stats.as_mut() {
            stats.end();
            stats.log_stats();
        }
        metrics::CALLS_COMPLETED.increment();
        debug!("response processing complete");

        if let Some(cb) = self.on_complete.take() {
            cb(&*self).map_err(|e| {
                error!(error = %e, "complete callback error encountered");
                Error::CompleteCallback(e)
            })?;
        }
        Ok(())
    }

    fn enter(&mut self, phase: Phase) {
        debug_assert!(!self.phases.contains(&phase), "{phase:?} entered twice");
        tracing::trace!(from = ?self.phase(), to = ?phase, "phase transition");
        self.phases.push(phase);
    }
}

const BAD_RESPONSE: &str = "Unable to parse response from server";

fn missing_option(name: &str) -> ClientError {
    ClientError::new(
        ErrorReason::RpcError,
        format!("Invalid client connection configuration. {name} must be a defined option."),
    )
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("options", &self.options)
            .field("request_type", &self.request_type)
            .field("response_type", &self.response_type)
            .field("phase", &self.phase())
            .field("error", &self.error)
            .field("used_sync_fallback", &self.used_sync_fallback)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullConnector;

    impl Connector for NullConnector {
        fn connect(&mut self, _host: &str, _port: u16) -> io::Result<()> {
            Ok(())
        }

        fn send_bytes(&mut self, _data: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn recv_response(&mut self) -> io::Result<Vec<u8>> {
            Err(io::ErrorKind::UnexpectedEof.into())
        }

        fn close(&mut self) {}
    }

    #[test]
    fn starts_built() {
        let inv = Invocation::new(ClientOptions::new(), NullConnector);
        assert_eq!(inv.phase(), Phase::Built);
        assert_eq!(inv.phases(), [Phase::Built]);
        assert!(!inv.is_errored());
        assert!(inv.stats().is_none());
    }

    #[test]
    fn complete_runs_once() {
        let mut inv = Invocation::new(ClientOptions::new(), NullConnector);
        inv.complete().unwrap();
        inv.complete().unwrap();
        assert_eq!(inv.phases(), [Phase::Built, Phase::Completed]);
    }

    #[test]
    fn fail_after_complete_is_ignored() {
        let mut inv = Invocation::new(ClientOptions::new(), NullConnector);
        inv.complete().unwrap();
        inv.fail(ErrorReason::RpcError, "late").unwrap();
        assert!(inv.error().is_none());
    }

    #[test]
    fn response_before_send_is_ignored() {
        let mut inv = Invocation::new(ClientOptions::new(), NullConnector);
        let bytes = Response::success(Vec::new()).to_bytes();
        assert!(inv.response_received(&bytes).unwrap().is_none());
        assert_eq!(inv.phase(), Phase::Built);
    }

    /// Records, for every event, the name of the span it was emitted in.
    #[derive(Clone, Default)]
    struct SpanNames(std::sync::Arc<std::sync::Mutex<Vec<Option<String>>>>);

    impl<S> tracing_subscriber::Layer<S> for SpanNames
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        fn on_event(
            &self,
            _event: &tracing::Event<'_>,
            ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let name = ctx.lookup_current().map(|span| span.name().to_string());
            self.0.lock().unwrap().push(name);
        }
    }

    fn in_rpc_span(names: &SpanNames) -> bool {
        let names = names.0.lock().unwrap();
        !names.is_empty() && names.iter().all(|n| n.as_deref() == Some("rpc_call"))
    }

    #[test]
    fn event_driven_entry_points_log_in_call_span() {
        use tracing_subscriber::layer::SubscriberExt;

        let names = SpanNames::default();
        let subscriber = tracing_subscriber::registry().with(names.clone());
        tracing::subscriber::with_default(subscriber, || {
            // Missing options: initialize fails and completes the call.
            let mut inv = Invocation::new(ClientOptions::new(), NullConnector);
            inv.initialize().unwrap();
            assert!(inv.is_completed());
        });
        assert!(in_rpc_span(&names));

        let names = SpanNames::default();
        let subscriber = tracing_subscriber::registry().with(names.clone());
        tracing::subscriber::with_default(subscriber, || {
            let options = ClientOptions::new()
                .with_service("S")
                .with_method("m")
                .with_host("h")
                .with_port(1);
            let mut inv = Invocation::new(options, NullConnector);
            inv.set_request_type(MessageType::of::<()>()).unwrap();
            inv.set_response_type(MessageType::of::<()>()).unwrap();
            inv.set_request(RequestArg::message(())).unwrap();
            names.0.lock().unwrap().clear();
            inv.connection_completed().unwrap();
            assert_eq!(inv.phase(), Phase::Sent);
        });
        assert!(in_rpc_span(&names));
    }

    #[test]
    fn outcome_helpers() {
        let failure = Outcome::Failure(ClientError::new(ErrorReason::RpcFailed, "x"));
        assert!(!failure.is_success());
        assert_eq!(failure.error().unwrap().reason(), Some(ErrorReason::RpcFailed));
        assert!(failure.response::<()>().is_none());
    }
}
