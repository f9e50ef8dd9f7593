//! Repository revision numbers

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// Monotonically increasing version stamp
///
/// Backed by a `u128`; the external form (serde, `Display`) is lowercase hex
/// without a prefix.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RevisionNumber(u128);

impl RevisionNumber {
    /// Revision written by repository bootstrap
    pub const INITIAL: RevisionNumber = RevisionNumber(0);

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u128 {
        self.0
    }

    /// The revision after this one
    pub fn next(&self) -> Self {
        *self + 1
    }

    /// `self - n`, or `None` below zero
    pub fn checked_sub(&self, n: u128) -> Option<Self> {
        self.0.checked_sub(n).map(Self)
    }

    pub fn to_hex(&self) -> String {
        format!("{:x}", self.0)
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.is_empty() || hex.len() > 32 {
            return Err(Error::InvalidRevision(hex.to_string()));
        }
        u128::from_str_radix(hex, 16)
            .map(Self)
            .map_err(|_| Error::InvalidRevision(hex.to_string()))
    }

    /// Big-endian bytes; byte order matches numeric order (used in storage keys)
    pub fn to_be_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }
}

impl Add<u128> for RevisionNumber {
    type Output = RevisionNumber;

    fn add(self, rhs: u128) -> Self::Output {
        RevisionNumber(self.0 + rhs)
    }
}

impl From<u64> for RevisionNumber {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl FromStr for RevisionNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for RevisionNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RevisionNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        RevisionNumber::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for RevisionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.to_hex())
    }
}

impl fmt::Display for RevisionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
