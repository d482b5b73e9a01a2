//! Recording listener calls from inside rules.
//!
//! Listener closures must be `'static`, so a test cannot push into a local
//! `Vec`. A [`CallLog`] is a cheap, cloneable handle to one shared log: clone
//! it into every closure, then inspect the original after linting.
//!
//! ## Usage
//!
//! ```ignore
//! use lualint_test_utils::CallLog;
//!
//! let log = CallLog::new();
//! let recorder = log.clone();
//! let listeners = ListenerMap::new().on_enter("call", move |node, _| {
//!     recorder.record(format!("enter {}", node.tag));
//!     Ok(())
//! });
//! // ... lint ...
//! assert_eq!(log.count("enter call"), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Events {
    entries: Vec<String>,
    counts: HashMap<String, usize>,
}

/// Shared, ordered log of events
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    events: Arc<Mutex<Events>>,
}

impl CallLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Events> {
        // A listener that panicked mid-record still leaves a readable log
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, event: impl Into<String>) {
        let event = event.into();
        let mut events = self.lock();
        *events.counts.entry(event.clone()).or_insert(0) += 1;
        events.entries.push(event);
    }

    /// Every event, in the order it was recorded
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.lock().entries.clone()
    }

    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.lock().counts.get(event).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Index position marking the current end of the log
    #[must_use]
    pub fn checkpoint(&self) -> usize {
        self.len()
    }

    /// Events recorded after `checkpoint`
    #[must_use]
    pub fn since(&self, checkpoint: usize) -> Vec<String> {
        self.lock()
            .entries
            .get(checkpoint..)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        let mut events = self.lock();
        events.entries.clear();
        events.counts.clear();
    }
}
