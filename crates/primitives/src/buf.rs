//! Fixed-size byte buffers for hashes, verification keys and signatures.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ParseError;

macro_rules! impl_buf {
    ($name:ident, $len:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
        )]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Length of the buffer in bytes.
            pub const LEN: usize = $len;

            /// Returns the all-zero buffer.
            pub fn zero() -> Self {
                Self([0u8; $len])
            }

            /// Returns `true` if every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// Borrows the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Parses the buffer from a hex string.
            pub fn from_hex(s: &str) -> Result<Self, ParseError> {
                let bytes = hex::decode(s).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
                Self::try_from(bytes.as_slice())
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(value: [u8; $len]) -> Self {
                Self(value)
            }
        }

        impl From<$name> for [u8; $len] {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = ParseError;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; $len] =
                    value.try_into().map_err(|_| ParseError::InvalidBufLength {
                        expected: $len,
                        got: value.len(),
                    })?;
                Ok(Self(arr))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), hex::encode(self.0))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as Deserialize>::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(de::Error::custom)
            }
        }
    };
}

impl_buf!(Buf32, 32, "A 32-byte buffer, typically a hash or an Ed25519 verification key.");
impl_buf!(Buf64, 64, "A 64-byte buffer, typically an Ed25519 signature.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let buf = Buf32([7u8; 32]);
        let parsed = Buf32::from_hex(&buf.to_string()).unwrap();
        assert_eq!(buf, parsed);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = Buf32::try_from([0u8; 16].as_slice()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidBufLength {
                expected: 32,
                got: 16
            }
        ));
    }
}
