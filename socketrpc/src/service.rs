//! Per-service method tables.
//!
//! A [`ServiceDescriptor`] is built once, when the service is declared, and
//! maps each rpc method name to its request and response types. Looking up
//! a name that is not in the table is how the dispatcher detects calls to
//! methods the service does not have.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::message::MessageType;

/// One rpc method: its name and declared message types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcMethod {
    name: String,
    request_type: MessageType,
    response_type: MessageType,
}

impl RpcMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request_type(&self) -> MessageType {
        self.request_type
    }

    pub fn response_type(&self) -> MessageType {
        self.response_type
    }
}

/// A named service and its rpc method table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    name: String,
    methods: BTreeMap<String, RpcMethod>,
}

impl ServiceDescriptor {
    /// Start declaring a service. `name` is sent on the wire as the
    /// envelope's service name.
    pub fn builder(name: impl Into<String>) -> ServiceBuilder {
        ServiceBuilder {
            name: name.into(),
            methods: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<&RpcMethod> {
        self.methods.get(name)
    }

    /// All methods, ordered by name.
    pub fn methods(&self) -> impl Iterator<Item = &RpcMethod> {
        self.methods.values()
    }
}

/// Builder for a [`ServiceDescriptor`].
#[derive(Debug)]
pub struct ServiceBuilder {
    name: String,
    methods: BTreeMap<String, RpcMethod>,
}

impl ServiceBuilder {
    /// Declare an rpc method whose request can also be given as a field
    /// map. Declaring the same name twice replaces the earlier declaration.
    pub fn rpc<Req, Resp>(self, name: impl Into<String>) -> Self
    where
        Req: prost::Message + Default + DeserializeOwned + 'static,
        Resp: prost::Message + Default + 'static,
    {
        self.declare(name, MessageType::with_fields::<Req>(), MessageType::of::<Resp>())
    }

    /// Declare an rpc method for a request type without serde support.
    /// Requests must then be given as messages; a field map fails the call
    /// with `INVALID_REQUEST_PROTO`.
    pub fn rpc_message<Req, Resp>(self, name: impl Into<String>) -> Self
    where
        Req: prost::Message + Default + 'static,
        Resp: prost::Message + Default + 'static,
    {
        self.declare(name, MessageType::of::<Req>(), MessageType::of::<Resp>())
    }

    fn declare(
        mut self,
        name: impl Into<String>,
        request_type: MessageType,
        response_type: MessageType,
    ) -> Self {
        let name = name.into();
        let method = RpcMethod {
            name: name.clone(),
            request_type,
            response_type,
        };
        self.methods.insert(name, method);
        self
    }

    pub fn build(self) -> Arc<ServiceDescriptor> {
        Arc::new(ServiceDescriptor {
            name: self.name,
            methods: self.methods,
        })
    }
}
