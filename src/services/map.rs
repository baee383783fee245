//! In-memory key/value store.
//!
//! # Routes
//! ```text
//! POST   /map            {"key": .., "val": ..}  insert, fails if the key exists
//! GET    /map/{0:key}                           value of key
//! PUT    /map/{0:key}    "val"                  replace, fails if the key is unknown
//! DELETE /map/{0:key}                           remove, returns the removed pair
//! ```

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{CodedError, ConfigurationError};
use crate::routing::{Json, Route, Service};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub val: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("existing: {key} -> {val}")]
    Existing { key: String, val: String },

    #[error("unknown key: {0}")]
    UnknownKey(String),
}

impl MapError {
    pub fn status(&self) -> u16 {
        match self {
            MapError::Existing { .. } => 409,
            MapError::UnknownKey(_) => 404,
        }
    }
}

impl From<MapError> for CodedError {
    fn from(err: MapError) -> Self {
        CodedError::new(err.status(), err)
    }
}

/// Concurrent string map.
#[derive(Debug, Default)]
pub struct MapService {
    entries: DashMap<String, String>,
}

impl MapService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, kv: KeyValue) -> Result<(), MapError> {
        match self.entries.entry(kv.key) {
            Entry::Occupied(entry) => Err(MapError::Existing {
                key: entry.key().clone(),
                val: entry.get().clone(),
            }),
            Entry::Vacant(entry) => {
                tracing::debug!(key = %entry.key(), "Key inserted");
                entry.insert(kv.val);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &str) -> Result<String, MapError> {
        self.entries
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| MapError::UnknownKey(key.to_string()))
    }

    pub fn update(&self, key: &str, val: String) -> Result<(), MapError> {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                *entry = val;
                Ok(())
            }
            None => Err(MapError::UnknownKey(key.to_string())),
        }
    }

    pub fn remove(&self, key: &str) -> Result<KeyValue, MapError> {
        self.entries
            .remove(key)
            .map(|(key, val)| KeyValue { key, val })
            .ok_or_else(|| MapError::UnknownKey(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Service for MapService {
    fn routes(self: &Arc<Self>) -> Result<Vec<Route>, ConfigurationError> {
        let (post, get, put, delete) = (
            Arc::clone(self),
            Arc::clone(self),
            Arc::clone(self),
            Arc::clone(self),
        );

        Ok(vec![
            Route::post("/map", move |Json(kv): Json<KeyValue>| -> Result<(), CodedError> {
                Ok(post.insert(kv)?)
            })?,
            Route::get("/map/{0:key}", move |key: String| -> Result<String, CodedError> {
                Ok(get.get(&key)?)
            })?,
            Route::put("/map/{0:key}", move |key: String, val: String| -> Result<(), CodedError> {
                Ok(put.update(&key, val)?)
            })?,
            Route::delete("/map/{0:key}", move |key: String| -> Result<Json<KeyValue>, CodedError> {
                Ok(Json(delete.remove(&key)?))
            })?,
        ])
    }
}
