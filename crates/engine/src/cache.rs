// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL+grace memoisation of an expensive external accessor (spec §4.7).
//!
//! `SlurmRequirementAdapter` and `SlurmIntegrationAdapter` each instantiate
//! one of these over their respective `BatchSystem` calls, so a queue or
//! node-list fetch is cheap inside a cycle and the external system is
//! polled at a bounded rate.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use roced_core::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

struct CacheState<T> {
    value: Option<T>,
    fetched_at: Option<DateTime<Utc>>,
}

enum Decision {
    ReturnCached,
    CallWithFallback,
    CallNoFallback,
}

/// Memoises an async, possibly-failing accessor.
///
/// - age ≤ `validity`: return the cached value, no call.
/// - `validity` < age ≤ `validity + redundancy`: call the accessor; on
///   `None` fall back to the cached value; on `Some`, refresh and return it.
/// - age > `validity + redundancy`: call the accessor and propagate its
///   result as-is, clearing the cache on `None`.
///
/// A `validity` of `-1` in the original spec ("always eligible for
/// refresh, but honour redundancy as a fallback window") is modeled as
/// [`CachingWrapper::always_refresh`] rather than overloading a negative
/// `Duration`, since `Duration` cannot be negative in Rust.
pub struct CachingWrapper<T> {
    validity: Option<Duration>,
    redundancy: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState<T>>,
}

impl<T: Clone> CachingWrapper<T> {
    pub fn new(validity: Duration, redundancy: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            validity: Some(validity),
            redundancy,
            clock,
            state: Mutex::new(CacheState {
                value: None,
                fetched_at: None,
            }),
        }
    }

    pub fn always_refresh(redundancy: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            validity: None,
            redundancy,
            clock,
            state: Mutex::new(CacheState {
                value: None,
                fetched_at: None,
            }),
        }
    }

    /// Fetch through the cache, calling `accessor` only when the cached
    /// value's age requires it.
    pub async fn get<F, Fut>(&self, accessor: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let now = self.clock.now();
        let (decision, cached) = {
            let state = self.state.lock();
            let cached = state.value.clone();
            let age = state
                .fetched_at
                .map(|fetched_at| (now - fetched_at).to_std().unwrap_or(Duration::ZERO));
            (self.classify(age), cached)
        };

        match decision {
            Decision::ReturnCached => cached,
            Decision::CallWithFallback => match accessor().await {
                Some(value) => {
                    self.refresh(now, value.clone());
                    Some(value)
                }
                None => cached,
            },
            Decision::CallNoFallback => match accessor().await {
                Some(value) => {
                    self.refresh(now, value.clone());
                    Some(value)
                }
                None => {
                    self.clear();
                    None
                }
            },
        }
    }

    fn classify(&self, age: Option<Duration>) -> Decision {
        let validity_bound = self.validity.unwrap_or(Duration::ZERO);
        match age {
            None => Decision::CallNoFallback,
            Some(age) => {
                let within_validity = self.validity.is_some() && age <= validity_bound;
                if within_validity {
                    return Decision::ReturnCached;
                }
                if age <= validity_bound + self.redundancy {
                    Decision::CallWithFallback
                } else {
                    Decision::CallNoFallback
                }
            }
        }
    }

    fn refresh(&self, now: DateTime<Utc>, value: T) {
        let mut state = self.state.lock();
        state.value = Some(value);
        state.fetched_at = Some(now);
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.value = None;
        state.fetched_at = None;
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
