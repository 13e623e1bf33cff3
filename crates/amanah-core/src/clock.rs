//! Time source for workflow timestamps.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A manually driven clock for tests. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
  instant: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
  pub fn new(at: DateTime<Utc>) -> Self { Self { instant: Arc::new(Mutex::new(at)) } }

  pub fn set(&self, at: DateTime<Utc>) {
    *self.instant.lock().unwrap_or_else(|e| e.into_inner()) = at;
  }

  pub fn advance(&self, by: Duration) {
    let mut guard = self.instant.lock().unwrap_or_else(|e| e.into_inner());
    *guard += by;
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    *self.instant.lock().unwrap_or_else(|e| e.into_inner())
  }
}
