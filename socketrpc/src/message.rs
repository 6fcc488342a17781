//! Runtime descriptions of protobuf message types.
//!
//! A method table names its request and response types at registration time,
//! but a payload handed to a call is only checked against the request type at
//! send time. [`RpcMessage`] makes prost messages usable behind a pointer so
//! that check can be done, and [`MessageType`] carries what the lifecycle
//! needs to know about a type: its name, its identity, and how to decode it.

use std::any::{Any, TypeId};
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Field-name to value mapping used to build a request without constructing
/// the message by hand.
pub type FieldMap = Map<String, Value>;

/// Object-safe view of a prost message.
pub trait RpcMessage: Any + Send + Sync + fmt::Debug {
    /// The message's Rust type name.
    fn type_name(&self) -> &'static str;

    /// Serialize the message to its protobuf encoding.
    fn encode_payload(&self) -> Vec<u8>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<M> RpcMessage for M
where
    M: prost::Message + Default + 'static,
{
    fn type_name(&self) -> &'static str {
        std::any::type_name::<M>()
    }

    fn encode_payload(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A message of some type only known at runtime.
pub struct AnyMessage(Box<dyn RpcMessage>);

impl AnyMessage {
    pub fn new<M: RpcMessage>(message: M) -> Self {
        Self(Box::new(message))
    }

    /// The concrete message's Rust type name.
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    /// The concrete message's type identity.
    pub fn type_id(&self) -> TypeId {
        self.0.as_any().type_id()
    }

    /// Serialize the message to its protobuf encoding.
    pub fn encode(&self) -> Vec<u8> {
        self.0.encode_payload()
    }

    pub fn is<M: 'static>(&self) -> bool {
        self.0.as_any().is::<M>()
    }

    pub fn downcast_ref<M: 'static>(&self) -> Option<&M> {
        self.0.as_any().downcast_ref::<M>()
    }

    /// Take the concrete message out. Returns `None` if it is not an `M`.
    pub fn downcast<M: 'static>(self) -> Option<M> {
        self.0.into_any().downcast::<M>().ok().map(|m| *m)
    }
}

impl fmt::Debug for AnyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

/// A field map did not describe a valid instance of the request type.
#[derive(Debug, thiserror::Error)]
pub enum FieldsError {
    #[error("{0} cannot be built from fields")]
    Unsupported(&'static str),
    #[error("invalid fields for {type_name}: {source}")]
    Invalid {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

type DecodeFn = fn(&[u8]) -> Result<AnyMessage, prost::DecodeError>;
type BuildFn = fn(FieldMap) -> Result<AnyMessage, FieldsError>;

/// Runtime descriptor of a prost message type.
#[derive(Clone, Copy)]
pub struct MessageType {
    name: &'static str,
    id: TypeId,
    decode: DecodeFn,
    build: Option<BuildFn>,
}

impl MessageType {
    /// Describe `M`. Instances can be decoded but not built from fields.
    pub fn of<M>() -> Self
    where
        M: prost::Message + Default + 'static,
    {
        Self {
            name: std::any::type_name::<M>(),
            id: TypeId::of::<M>(),
            decode: decode_as::<M>,
            build: None,
        }
    }

    /// Describe `M`, which can also be built from a [`FieldMap`].
    pub fn with_fields<M>() -> Self
    where
        M: prost::Message + Default + DeserializeOwned + 'static,
    {
        Self {
            build: Some(build_as::<M>),
            ..Self::of::<M>()
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Whether `message` is exactly of this type.
    pub fn matches(&self, message: &AnyMessage) -> bool {
        message.type_id() == self.id
    }

    /// Decode a fresh instance from its protobuf encoding.
    pub fn decode(&self, buf: &[u8]) -> Result<AnyMessage, prost::DecodeError> {
        (self.decode)(buf)
    }

    /// Build an instance from a field map. Fields absent from the map keep
    /// their protobuf defaults if the type allows it.
    pub fn build(&self, fields: FieldMap) -> Result<AnyMessage, FieldsError> {
        match self.build {
            Some(build) => build(fields),
            None => Err(FieldsError::Unsupported(self.name)),
        }
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageType").field(&self.name).finish()
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

fn decode_as<M>(buf: &[u8]) -> Result<AnyMessage, prost::DecodeError>
where
    M: prost::Message + Default + 'static,
{
    M::decode(buf).map(AnyMessage::new)
}

fn build_as<M>(fields: FieldMap) -> Result<AnyMessage, FieldsError>
where
    M: prost::Message + Default + DeserializeOwned + 'static,
{
    serde_json::from_value::<M>(Value::Object(fields))
        .map(AnyMessage::new)
        .map_err(|source| FieldsError::Invalid {
            type_name: std::any::type_name::<M>(),
            source,
        })
}

/// The request argument of a dispatched call.
#[derive(Debug)]
pub enum RequestArg {
    /// A ready-made message, used as-is.
    Message(AnyMessage),
    /// Field values to build an instance of the method's request type from.
    Fields(FieldMap),
}

impl RequestArg {
    pub fn message<M: RpcMessage>(message: M) -> Self {
        Self::Message(AnyMessage::new(message))
    }
}

impl From<AnyMessage> for RequestArg {
    fn from(message: AnyMessage) -> Self {
        Self::Message(message)
    }
}

impl From<FieldMap> for RequestArg {
    fn from(fields: FieldMap) -> Self {
        Self::Fields(fields)
    }
}
