//! Byte newtypes for the values exchanged during a verifier-based login.
//!
//! All of these serialize as standard Base64 strings so they can travel in
//! JSON payloads and be stored alongside the records that own them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding::{FromStrVisitor, NotB64Encoded, decode_b64, encode_b64};

/// A password verifier, derived by the client from the password and a [`Salt`]
/// at registration and stored server side in place of the password.
///
/// The verifier lets the server check a login proof without ever learning the
/// password. It is still sensitive material, since anyone holding it can mount
/// an offline guessing attack, so its `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Verifier(Vec<u8>);

impl Verifier {
    /// Build a verifier from raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw verifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier").finish()
    }
}

impl fmt::Display for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_b64(&self.0))
    }
}

impl FromStr for Verifier {
    type Err = NotB64Encoded;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_b64(s).map(Self)
    }
}

impl<'de> Deserialize<'de> for Verifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(FromStrVisitor::new())
    }
}

impl Serialize for Verifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// The public salt paired with a [`Verifier`]. Handed back to any client that
/// asks to log in, so it carries no secrecy requirement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Build a salt from raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_b64(&self.0))
    }
}

impl FromStr for Salt {
    type Err = NotB64Encoded;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_b64(s).map(Self)
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(FromStrVisitor::new())
    }
}

impl Serialize for Salt {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// The private half of an ephemeral exchange key pair.
///
/// Held server side for the lifetime of one pending login and discarded with
/// it. Zeroized on drop, redacted `Debug`, constant time equality.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EphemeralSecret(Vec<u8>);

impl EphemeralSecret {
    /// Build a secret from raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for EphemeralSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralSecret").finish()
    }
}

impl PartialEq for EphemeralSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for EphemeralSecret {}

impl fmt::Display for EphemeralSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_b64(&self.0))
    }
}

impl FromStr for EphemeralSecret {
    type Err = NotB64Encoded;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_b64(s).map(Self)
    }
}

impl<'de> Deserialize<'de> for EphemeralSecret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(FromStrVisitor::new())
    }
}

impl Serialize for EphemeralSecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// The public half of an ephemeral exchange key pair, safe to send over the
/// wire in either direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EphemeralPublic(Vec<u8>);

impl EphemeralPublic {
    /// Build a public value from raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw public bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the value is empty, which no legal exchange ever produces.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EphemeralPublic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_b64(&self.0))
    }
}

impl FromStr for EphemeralPublic {
    type Err = NotB64Encoded;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_b64(s).map(Self)
    }
}

impl<'de> Deserialize<'de> for EphemeralPublic {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(FromStrVisitor::new())
    }
}

impl Serialize for EphemeralPublic {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Evidence that one side of the exchange derived the shared session key.
///
/// Compared in constant time.
#[derive(Clone, Debug)]
pub struct Proof(Vec<u8>);

impl Proof {
    /// Build a proof from raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw proof bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for Proof {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for Proof {}

impl fmt::Display for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_b64(&self.0))
    }
}

impl FromStr for Proof {
    type Err = NotB64Encoded;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_b64(s).map(Self)
    }
}

impl<'de> Deserialize<'de> for Proof {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(FromStrVisitor::new())
    }
}

impl Serialize for Proof {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// A freshly generated ephemeral key pair for one login exchange.
pub struct Ephemeral {
    /// The private half, kept server side with the pending session.
    pub secret: EphemeralSecret,
    /// The public half, sent to the client.
    pub public: EphemeralPublic,
}
