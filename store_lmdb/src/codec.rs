//! Record encoding. Every value stored in LMDB is a `bincode` blob.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::LmdbError;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}
