//! Admin accounts, roles and the module × capability permission grid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

// ─── Grid axes ───────────────────────────────────────────────────────────────

/// An area of the platform guarded by the permission grid.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Module {
  Mosques,
  Volunteers,
  Businesses,
  HalalCertifications,
  Users,
  Settings,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
  Read,
  Write,
  Delete,
}

// ─── Grid ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
  #[serde(default)]
  pub read:   bool,
  #[serde(default)]
  pub write:  bool,
  #[serde(default)]
  pub delete: bool,
}

impl Capabilities {
  pub const NONE: Self = Self { read: false, write: false, delete: false };
  pub const READ_ONLY: Self = Self { read: true, write: false, delete: false };
  pub const ALL: Self = Self { read: true, write: true, delete: true };

  pub fn has(&self, capability: Capability) -> bool {
    match capability {
      Capability::Read => self.read,
      Capability::Write => self.write,
      Capability::Delete => self.delete,
    }
  }

  pub fn set(&mut self, capability: Capability, value: bool) {
    match capability {
      Capability::Read => self.read = value,
      Capability::Write => self.write = value,
      Capability::Delete => self.delete = value,
    }
  }
}

/// Per-account matrix of module × capability booleans.
///
/// Every module is a named field so that an unknown module or a misspelt
/// capability is a compile error rather than a silently ignored path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrid {
  pub mosques:              Capabilities,
  pub volunteers:           Capabilities,
  pub businesses:           Capabilities,
  pub halal_certifications: Capabilities,
  pub users:                Capabilities,
  pub settings:             Capabilities,
}

impl Default for PermissionGrid {
  /// Least privilege: read access to the four directory modules only.
  fn default() -> Self {
    Self {
      mosques:              Capabilities::READ_ONLY,
      volunteers:           Capabilities::READ_ONLY,
      businesses:           Capabilities::READ_ONLY,
      halal_certifications: Capabilities::READ_ONLY,
      users:                Capabilities::NONE,
      settings:             Capabilities::NONE,
    }
  }
}

impl PermissionGrid {
  /// Every capability on every module.
  pub fn full() -> Self {
    Self {
      mosques:              Capabilities::ALL,
      volunteers:           Capabilities::ALL,
      businesses:           Capabilities::ALL,
      halal_certifications: Capabilities::ALL,
      users:                Capabilities::ALL,
      settings:             Capabilities::ALL,
    }
  }

  pub fn module(&self, module: Module) -> &Capabilities {
    match module {
      Module::Mosques => &self.mosques,
      Module::Volunteers => &self.volunteers,
      Module::Businesses => &self.businesses,
      Module::HalalCertifications => &self.halal_certifications,
      Module::Users => &self.users,
      Module::Settings => &self.settings,
    }
  }

  pub fn module_mut(&mut self, module: Module) -> &mut Capabilities {
    match module {
      Module::Mosques => &mut self.mosques,
      Module::Volunteers => &mut self.volunteers,
      Module::Businesses => &mut self.businesses,
      Module::HalalCertifications => &mut self.halal_certifications,
      Module::Users => &mut self.users,
      Module::Settings => &mut self.settings,
    }
  }

  pub fn allows(&self, module: Module, capability: Capability) -> bool {
    self.module(module).has(capability)
  }

  /// Builder-style single-cell update.
  pub fn with(mut self, module: Module, capability: Capability, value: bool) -> Self {
    self.module_mut(module).set(capability, value);
    self
  }

  /// Whether every cell `other` grants is also granted here.
  pub fn covers(&self, other: &PermissionGrid) -> bool {
    Module::iter().all(|module| {
      Capability::iter().all(|cap| !other.allows(module, cap) || self.allows(module, cap))
    })
  }
}

// ─── Roles ───────────────────────────────────────────────────────────────────

/// Privilege tier of an admin account. Ordered lowest to highest.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  Moderator,
  #[default]
  Admin,
  SuperAdmin,
}

impl Role {
  pub const TOP: Role = Role::SuperAdmin;

  pub fn is_top(self) -> bool { self == Self::TOP }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// An administrator of the platform. Not a workflow target; it is the
/// identity every workflow action is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccount {
  pub admin_id:     Uuid,
  pub username:     String,
  pub display_name: String,
  pub role:         Role,
  pub permissions:  PermissionGrid,
  pub is_active:    bool,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
  pub version:      i64,
}

/// Input for creating an admin account. A missing grid means the
/// least-privilege default, or the full grid for a super admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdmin {
  pub username:     String,
  /// Defaults to the username when blank.
  #[serde(default)]
  pub display_name: String,
  #[serde(default)]
  pub role:         Role,
  pub permissions:  Option<PermissionGrid>,
}

impl NewAdmin {
  pub fn new(username: impl Into<String>, role: Role) -> Self {
    let username = username.into();
    Self { display_name: username.clone(), username, role, permissions: None }
  }

  /// The grid the account is created with.
  pub fn resolved_permissions(&self) -> PermissionGrid {
    match (self.permissions, self.role) {
      (Some(grid), _) => grid,
      (None, Role::SuperAdmin) => PermissionGrid::full(),
      (None, _) => PermissionGrid::default(),
    }
  }
}

/// Partial edit of an admin account; `None` fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminUpdate {
  pub display_name: Option<String>,
  pub role:         Option<Role>,
  pub permissions:  Option<PermissionGrid>,
  pub is_active:    Option<bool>,
}

impl AdminUpdate {
  /// Apply the edit to `account` in place.
  pub fn apply_to(&self, account: &mut AdminAccount) {
    if let Some(name) = &self.display_name {
      account.display_name = name.clone();
    }
    if let Some(role) = self.role {
      account.role = role;
    }
    if let Some(grid) = self.permissions {
      account.permissions = grid;
    }
    if let Some(active) = self.is_active {
      account.is_active = active;
    }
  }
}

// ─── Actor ───────────────────────────────────────────────────────────────────

/// The resolved identity performing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
  pub actor_id:    Uuid,
  pub role:        Role,
  pub permissions: PermissionGrid,
}

impl Actor {
  /// `None` for deactivated accounts: they resolve to no actor at all.
  pub fn from_account(account: &AdminAccount) -> Option<Self> {
    account.is_active.then(|| Self {
      actor_id:    account.admin_id,
      role:        account.role,
      permissions: account.permissions,
    })
  }

  pub fn can(&self, module: Module, capability: Capability) -> bool {
    self.permissions.allows(module, capability)
  }

  /// Whether this actor may leave `target` holding `role` after a create or
  /// an edit. Only the top tier may grant the top tier, or touch an account
  /// that already holds it.
  pub fn may_assign(&self, role: Role, existing: Option<Role>) -> bool {
    let touches_top = role.is_top() || existing.is_some_and(Role::is_top);
    !touches_top || self.role.is_top()
  }

  /// Whether this actor may hand out `grid`. Below the top tier an actor can
  /// only grant cells it holds itself.
  pub fn may_grant(&self, grid: &PermissionGrid) -> bool {
    self.role.is_top() || self.permissions.covers(grid)
  }
}
