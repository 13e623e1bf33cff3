//! Volunteer match view.
//!
//! Volunteers reach a mosque two ways: an application addressed to that
//! mosque, or a general offer visible to every mosque. This module merges
//! both into one list. Entries are derived per query and never stored.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  record::{EntityRecord, Payload, Status},
};

/// Upper bound on `limit` unless the workflow is configured otherwise.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

// ─── Query types ─────────────────────────────────────────────────────────────

/// Whose view is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum MatchScope {
  /// Applications for this mosque plus every general offer.
  Mosque(Uuid),
  /// General offers only.
  AllMosques,
  /// Everything one volunteer has submitted.
  Volunteer(Uuid),
}

/// Offset pagination; `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
  pub page:  u32,
  pub limit: u32,
}

impl Default for PageRequest {
  fn default() -> Self { Self { page: 1, limit: 20 } }
}

impl PageRequest {
  pub fn new(page: u32, limit: u32) -> Self { Self { page, limit } }

  pub fn validate(self, max_limit: u32) -> Result<Self> {
    if self.page == 0 {
      return Err(Error::validation("page starts at 1"));
    }
    if self.limit == 0 || self.limit > max_limit {
      return Err(Error::validation(format!(
        "limit must be between 1 and {max_limit}"
      )));
    }
    Ok(self)
  }

  fn offset(self) -> usize { (self.page as usize - 1) * self.limit as usize }
}

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
  Application,
  Offer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEntry {
  pub source:    MatchSource,
  /// `None` for general offers.
  pub mosque_id: Option<Uuid>,
  pub record:    EntityRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
  pub page:        u32,
  pub limit:       u32,
  pub total:       u64,
  pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPage {
  pub items:      Vec<MatchEntry>,
  pub pagination: Pagination,
}

// ─── Composition ─────────────────────────────────────────────────────────────

/// The entry `record` contributes to `scope`, if it belongs there at all.
pub fn entry_for(scope: MatchScope, record: EntityRecord) -> Option<MatchEntry> {
  let (source, mosque_id, visible) = match (&record.payload, scope) {
    (Payload::VolunteerApplication(app), MatchScope::Mosque(target)) => {
      (MatchSource::Application, Some(app.mosque_id), app.mosque_id == target)
    }
    (Payload::VolunteerApplication(app), MatchScope::Volunteer(user)) => {
      (MatchSource::Application, Some(app.mosque_id), app.volunteer_id == user)
    }
    (Payload::VolunteerOffer(offer), MatchScope::Mosque(_) | MatchScope::AllMosques) => {
      (MatchSource::Offer, None, offer.is_general_offer)
    }
    (Payload::VolunteerOffer(offer), MatchScope::Volunteer(user)) => {
      let mosque_id = (!offer.is_general_offer).then_some(offer.preferred_mosque).flatten();
      (MatchSource::Offer, mosque_id, offer.volunteer_id == user)
    }
    _ => return None,
  };
  visible.then_some(MatchEntry { source, mosque_id, record })
}

/// Merge candidate records into one sorted, paginated view.
///
/// Sorting happens on the union, before paging, so "most recent first"
/// holds across applications and offers alike.
pub fn compose<I>(
  scope: MatchScope,
  status: Option<Status>,
  candidates: I,
  page: PageRequest,
) -> MatchPage
where
  I: IntoIterator<Item = EntityRecord>,
{
  let mut entries: Vec<MatchEntry> = candidates
    .into_iter()
    .filter(|r| status.is_none_or(|s| r.status == s))
    .filter_map(|r| entry_for(scope, r))
    .collect();

  entries.sort_by(|a, b| {
    b.record
      .created_at
      .cmp(&a.record.created_at)
      .then_with(|| b.record.id.cmp(&a.record.id))
  });

  let total = entries.len() as u64;
  let total_pages = total.div_ceil(u64::from(page.limit.max(1)));
  let items = entries
    .into_iter()
    .skip(page.offset())
    .take(page.limit as usize)
    .collect();

  MatchPage {
    items,
    pagination: Pagination { page: page.page, limit: page.limit, total, total_pages },
  }
}
