use std::{fmt, marker::PhantomData, str::FromStr};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::de::Visitor;
use thiserror::Error;

/// Error returned when a string is not valid standard Base64.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Data isn't base64 encoded")]
pub struct NotB64Encoded;

pub(crate) fn encode_b64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub(crate) fn decode_b64(data: &str) -> Result<Vec<u8>, NotB64Encoded> {
    STANDARD.decode(data).map_err(|_| NotB64Encoded)
}

/// Serde visitor that deserializes a string through the type's [`FromStr`]
/// implementation.
pub struct FromStrVisitor<T>(PhantomData<T>);

impl<T> FromStrVisitor<T> {
    /// Create a new visitor.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FromStrVisitor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromStr> Visitor<'_> for FromStrVisitor<T>
where
    T::Err: fmt::Display,
{
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a string parseable as {}", std::any::type_name::<T>())
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        T::from_str(v).map_err(E::custom)
    }
}
