//! Seam to the externally-owned identity system.
//!
//! The core never owns identity truth: it holds opaque ids and asks the
//! provider for role rosters and name lookups. OAuth/token plumbing lives in
//! the concrete implementations outside this crate; the core only needs the
//! calls below.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One externally-managed user: opaque id plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: String,
    pub username: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// All users holding a role. This is the batch primitive: one call
    /// returns the whole id/name roster for a role.
    async fn users_for_role(&self, role: &str) -> Result<Vec<IdentityRecord>>;

    /// Resolve a username to its opaque id.
    async fn find_user_id(&self, username: &str) -> Result<Option<String>>;

    /// Resolve a single opaque id to its display name. Used as the per-id
    /// fallback after the role-batched pass.
    async fn find_username(&self, user_id: &str) -> Result<Option<String>>;
}
