//! Per-user session state at the host boundary.
//!
//! The crate never owns session storage: the host (CMS, web framework,
//! whatever provides cookies) injects a [`SessionStore`] and the coordinator
//! reads and writes timing signals through it under its own namespace. The
//! signals are what the form's anti-spam checks consume: when the page was
//! last rendered, when the user last posted, and the post history for the
//! trailing hour.

use serde_json::{Value, json};
use std::collections::HashMap;

/// Namespace for every key this crate writes into the host session.
pub const SESSION_NAMESPACE: &str = "formgate";

const LAST_PAGE_LOAD: &str = "last_page_load";
const LAST_POST_TIME: &str = "last_post_time";
const POST_TIMES: &str = "post_times";

const HOUR_SECS: i64 = 3600;

/// Host-provided per-user key/value session storage.
///
/// Values are JSON so hosts can persist them with whatever session mechanism
/// they already have.
pub trait SessionStore {
    fn get(&self, namespace: &str, key: &str) -> Option<Value>;
    fn set(&mut self, namespace: &str, key: &str, value: Value);
}

/// Timing signals layered over any [`SessionStore`].
pub trait SessionTiming: SessionStore {
    /// Record the timestamp of the current page render.
    ///
    /// Called once per page parse, after all directives are processed;
    /// overwrites any previous value.
    fn record_page_load(&mut self, now: i64) {
        self.set(SESSION_NAMESPACE, LAST_PAGE_LOAD, json!(now));
    }

    fn last_page_load(&self) -> Option<i64> {
        self.get(SESSION_NAMESPACE, LAST_PAGE_LOAD)?.as_i64()
    }

    /// Record an accepted submission: updates the last-post marker and the
    /// trailing-hour history (pruned as it is written).
    fn record_post(&mut self, now: i64) {
        let mut times = self.post_times();
        times.retain(|&t| now - t < HOUR_SECS);
        times.push(now);
        self.set(SESSION_NAMESPACE, POST_TIMES, json!(times));
        self.set(SESSION_NAMESPACE, LAST_POST_TIME, json!(now));
    }

    fn last_post_time(&self) -> Option<i64> {
        self.get(SESSION_NAMESPACE, LAST_POST_TIME)?.as_i64()
    }

    fn posts_in_last_hour(&self, now: i64) -> usize {
        self.post_times()
            .iter()
            .filter(|&&t| now - t < HOUR_SECS)
            .count()
    }

    #[doc(hidden)]
    fn post_times(&self) -> Vec<i64> {
        self.get(SESSION_NAMESPACE, POST_TIMES)
            .and_then(|value| {
                value
                    .as_array()
                    .map(|items| items.iter().filter_map(Value::as_i64).collect())
            })
            .unwrap_or_default()
    }
}

impl<S: SessionStore + ?Sized> SessionTiming for S {}

/// In-memory session, for hosts without their own mechanism and for tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    data: HashMap<(String, String), Value>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        self.data
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
    }

    fn set(&mut self, namespace: &str, key: &str, value: Value) {
        self.data
            .insert((namespace.to_string(), key.to_string()), value);
    }
}
