//! Aggregate counters: per-status totals derived from the record set.
//!
//! Counts are always recomputed from the authoritative store after a write.
//! Nothing here is a running total, so nothing here can drift.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::{EntityKind, Status};

/// `{status → count}` for one kind, covering every legal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
  pub kind:   EntityKind,
  pub counts: BTreeMap<Status, u64>,
}

impl StatusCounts {
  /// All legal statuses of `kind` at zero.
  pub fn empty(kind: EntityKind) -> Self {
    Self {
      kind,
      counts: kind.statuses().iter().map(|s| (*s, 0)).collect(),
    }
  }

  /// Count the statuses of individual records.
  pub fn tally<I>(kind: EntityKind, statuses: I) -> Self
  where
    I: IntoIterator<Item = Status>,
  {
    Self::from_grouped(kind, statuses.into_iter().map(|s| (s, 1)))
  }

  /// Fold `(status, count)` groups, as returned by a `GROUP BY` query.
  /// Statuses outside the kind's legal set are ignored.
  pub fn from_grouped<I>(kind: EntityKind, groups: I) -> Self
  where
    I: IntoIterator<Item = (Status, u64)>,
  {
    let mut out = Self::empty(kind);
    for (status, n) in groups {
      if let Some(slot) = out.counts.get_mut(&status) {
        *slot += n;
      }
    }
    out
  }

  pub fn get(&self, status: Status) -> u64 {
    self.counts.get(&status).copied().unwrap_or(0)
  }

  pub fn total(&self) -> u64 { self.counts.values().sum() }

  /// Share of records that are approved; zero when there are none.
  pub fn verification_rate(&self) -> f64 {
    rate(self.get(Status::Approved), self.total())
  }
}

/// `numerator / denominator`, defined as `0.0` when the denominator is zero.
pub fn rate(numerator: u64, denominator: u64) -> f64 {
  if denominator == 0 {
    0.0
  } else {
    numerator as f64 / denominator as f64
  }
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

/// Counts for every workflow kind plus platform-wide totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
  pub kinds:             Vec<KindSummary>,
  pub total:             u64,
  pub pending:           u64,
  pub approved:          u64,
  pub verification_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindSummary {
  pub counts:            StatusCounts,
  pub total:             u64,
  pub verification_rate: f64,
}

impl DashboardSummary {
  pub fn from_counts(all: impl IntoIterator<Item = StatusCounts>) -> Self {
    let kinds: Vec<KindSummary> = all
      .into_iter()
      .map(|counts| KindSummary {
        total:             counts.total(),
        verification_rate: counts.verification_rate(),
        counts,
      })
      .collect();

    let total = kinds.iter().map(|k| k.total).sum();
    let pending = kinds.iter().map(|k| k.counts.get(Status::Pending)).sum();
    let approved = kinds.iter().map(|k| k.counts.get(Status::Approved)).sum();

    Self {
      kinds,
      total,
      pending,
      approved,
      verification_rate: rate(approved, total),
    }
  }
}
