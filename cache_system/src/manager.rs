//! Process cache implementation
//!
//! This module provides the static `ThingCache` store and the `CacheKey`
//! builder used to name its entries.

use crate::errors::CacheError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

static ENTRIES: LazyLock<RwLock<BTreeMap<String, Value>>> =
    LazyLock::new(|| RwLock::new(BTreeMap::new()));

/// Unbounded process-wide key/value cache
///
/// Entries live until they are unset; there is no eviction and no expiry.
/// Values are stored as JSON so that any serializable type can be memoized.
pub struct ThingCache;

impl ThingCache {
    fn read() -> RwLockReadGuard<'static, BTreeMap<String, Value>> {
        ENTRIES.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write() -> RwLockWriteGuard<'static, BTreeMap<String, Value>> {
        ENTRIES.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a raw cached value
    pub fn get(key: &str) -> Option<Value> {
        Self::read().get(key).cloned()
    }

    /// Get a cached value decoded into `T`
    pub fn get_as<T: DeserializeOwned>(key: &str) -> Result<Option<T>, CacheError> {
        match Self::get(key) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| CacheError::serialization(key, e)),
            None => Ok(None),
        }
    }

    /// Store a value, returning the value that was stored
    pub fn set(key: impl Into<String>, value: Value) -> Value {
        let key = key.into();
        tracing::trace!("[CACHE] Set {}", key);
        Self::write().insert(key, value.clone());
        value
    }

    /// Store any serializable value
    pub fn set_as<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Value, CacheError> {
        let key = key.into();
        let encoded = serde_json::to_value(value).map_err(|e| CacheError::serialization(&key, e))?;
        Ok(Self::set(key, encoded))
    }

    /// Remove a single entry; absent keys are ignored
    pub fn unset(key: &str) {
        Self::write().remove(key);
    }

    /// Remove every entry whose key starts with `prefix`, returning how many went
    pub fn unset_prefix(prefix: &str) -> usize {
        let mut entries = Self::write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("[CACHE] Unset {} entries under {}", removed, prefix);
        }
        removed
    }

    /// Snapshot of every entry
    pub fn list() -> BTreeMap<String, Value> {
        Self::read().clone()
    }

    /// Snapshot of every key
    pub fn list_keys() -> Vec<String> {
        Self::read().keys().cloned().collect()
    }

    pub fn contains(key: &str) -> bool {
        Self::read().contains_key(key)
    }

    pub fn len() -> usize {
        Self::read().len()
    }

    pub fn is_empty() -> bool {
        Self::read().is_empty()
    }

    /// Drop everything
    pub fn clear() {
        Self::write().clear();
    }
}

/// Builder for `_`-joined cache keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(scope: impl AsRef<str>) -> Self {
        Self(scope.as_ref().to_string())
    }

    pub fn push(mut self, part: impl AsRef<str>) -> Self {
        self.0.push('_');
        self.0.push_str(part.as_ref());
        self
    }

    /// Prefix matching every key built by extending this one
    pub fn prefix(&self) -> String {
        format!("{}_", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
