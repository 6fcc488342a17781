/// Connection options for one call.
///
/// All four are required before a request can be sent. A call with any of
/// them missing fails with `RPC_ERROR` before anything touches the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Service name sent in the request envelope.
    pub service: Option<String>,
    /// Method name sent in the request envelope.
    pub method: Option<String>,
    /// Server host name or address.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<u16>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// The first required option that is not set, checked in the order
    /// service, method, host, port.
    pub fn missing(&self) -> Option<&'static str> {
        if self.service.is_none() {
            Some("service")
        } else if self.method.is_none() {
            Some("method")
        } else if self.host.is_none() {
            Some("host")
        } else if self.port.is_none() {
            Some("port")
        } else {
            None
        }
    }
}
