//! Client facade and method dispatcher.

use std::sync::Arc;

use tracing::{debug, error};

use crate::connector::{Connector, TcpConnector};
use crate::error::{CallbackResult, ClientError, Error};
use crate::invocation::{Invocation, Outcome};
use crate::message::{AnyMessage, RequestArg};
use crate::options::ClientOptions;
use crate::service::ServiceDescriptor;

/// A client for one call against one service.
///
/// The client resolves method names through the service's method table and
/// drives a single [`Invocation`]. Create a new client for every call.
///
/// # Example
///
/// ```no_run
/// # use socketrpc::{Client, ClientOptions, RequestArg, ServiceDescriptor};
/// # #[derive(Clone, PartialEq, prost::Message, serde::Deserialize)]
/// # struct FindRequest { #[prost(string, tag = "1")] name: String }
/// # #[derive(Clone, PartialEq, prost::Message)]
/// # struct WidgetList { #[prost(string, repeated, tag = "1")] names: Vec<String> }
/// let service = ServiceDescriptor::builder("WidgetService")
///     .rpc::<FindRequest, WidgetList>("find")
///     .build();
/// let options = ClientOptions::new().with_host("localhost").with_port(9939);
///
/// let mut client = Client::tcp(service, options);
/// let request = RequestArg::message(FindRequest { name: "sprocket".into() });
/// client.dispatch("find", request, |c| {
///     c.on_success_as(|list: WidgetList| {
///         println!("{:?}", list.names);
///         Ok(())
///     });
///     c.on_failure(|err| {
///         eprintln!("{err}");
///         Ok(())
///     });
/// })?;
/// # Ok::<(), socketrpc::Error>(())
/// ```
pub struct Client {
    service: Arc<ServiceDescriptor>,
    invocation: Invocation,
}

impl Client {
    /// Create a client for `service`. The service name in `options` is
    /// replaced by the descriptor's.
    pub fn new(
        service: Arc<ServiceDescriptor>,
        mut options: ClientOptions,
        connector: impl Connector + 'static,
    ) -> Self {
        options.service = Some(service.name().to_string());
        debug!(?options, "client initialized");
        Self {
            service,
            invocation: Invocation::new(options, connector),
        }
    }

    /// Create a client that talks to the server over TCP.
    pub fn tcp(service: Arc<ServiceDescriptor>, options: ClientOptions) -> Self {
        Self::new(service, options, TcpConnector::default())
    }

    pub fn service(&self) -> &ServiceDescriptor {
        &self.service
    }

    pub fn options(&self) -> &ClientOptions {
        self.invocation.options()
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn invocation_mut(&mut self) -> &mut Invocation {
        &mut self.invocation
    }

    pub fn on_success<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(AnyMessage) -> CallbackResult + 'static,
    {
        self.invocation.on_success(f);
        self
    }

    pub fn on_success_as<M, F>(&mut self, f: F) -> &mut Self
    where
        M: 'static,
        F: FnOnce(M) -> CallbackResult + 'static,
    {
        self.invocation.on_success_as(f);
        self
    }

    pub fn on_failure<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(ClientError) -> CallbackResult + 'static,
    {
        self.invocation.on_failure(f);
        self
    }

    pub fn on_complete<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&Invocation) -> CallbackResult + 'static,
    {
        self.invocation.on_complete(f);
        self
    }

    /// Call `method` on the service.
    ///
    /// `setup` runs with the client after the method is resolved and before
    /// anything is sent; it is the place to register callbacks. If it
    /// registers none, the outcome is returned instead.
    ///
    /// An unknown method name is an [`Error::MethodNotFound`]; nothing about
    /// the invocation changes in that case. A client whose call already ran
    /// returns [`Error::AlreadyCompleted`] without resolving or running
    /// `setup`.
    pub fn dispatch<F>(
        &mut self,
        method: &str,
        request: impl Into<RequestArg>,
        setup: F,
    ) -> Result<Option<Outcome>, Error>
    where
        F: FnOnce(&mut Self),
    {
        if self.invocation.is_completed() {
            return Err(Error::AlreadyCompleted);
        }
        self.resolve(method, request.into())?;
        debug!("running client setup");
        setup(self);
        self.invocation.send_request()
    }

    /// Call `method` and block for its outcome.
    ///
    /// Success and failure are both returned rather than delivered to
    /// callbacks; an `on_complete` callback still runs.
    pub fn call(&mut self, method: &str, request: impl Into<RequestArg>) -> Result<Outcome, Error> {
        if self.invocation.is_completed() {
            return Err(Error::AlreadyCompleted);
        }
        self.resolve(method, request.into())?;
        self.invocation.capture_outcome();
        self.invocation.send_request()?.ok_or(Error::NoOutcome)
    }

    /// Send the invocation as configured so far.
    pub fn send_request(&mut self) -> Result<Option<Outcome>, Error> {
        self.invocation.send_request()
    }

    /// Populate the invocation from the method table.
    fn resolve(&mut self, method: &str, request: RequestArg) -> Result<(), Error> {
        let service = self.service.name();
        let Some(rpc) = self.service.method(method) else {
            error!(service, method, "not an rpc method");
            return Err(Error::MethodNotFound {
                service: service.to_string(),
                method: method.to_string(),
            });
        };

        debug!(
            service,
            method,
            request_type = rpc.request_type().name(),
            response_type = rpc.response_type().name(),
            "resolved rpc method"
        );
        self.invocation.options_mut()?.method = Some(method.to_string());
        self.invocation.set_request_type(rpc.request_type())?;
        self.invocation.set_response_type(rpc.response_type())?;
        self.invocation.set_request(request)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("service", &self.service.name())
            .field("invocation", &self.invocation)
            .finish()
    }
}
