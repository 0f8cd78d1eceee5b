//! # Identity Resolution Cache
//!
//! Resolves opaque reviewer ids to display names, backed by a TTL- and
//! capacity-bounded cache. The resolver is an injected object with an
//! explicit lifetime, shared via `Arc`; concurrent access goes through
//! `DashMap`.
//!
//! Bulk resolution is the hot path for the aggregation engine: requested
//! ids are partitioned into cached/uncached, uncached ids are filled by one
//! `users_for_role` call per known role (a bounded batch, never a per-id
//! fan-out), and anything still unresolved falls back to per-id lookups.
//! Ids the provider cannot resolve at all resolve to themselves; a value
//! that still looks like an id is the caller's soft-failure signal.

use crate::error::Result;
use crate::identity::provider::{IdentityProvider, IdentityRecord};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct CachedName {
    name: String,
    inserted: Instant,
}

pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    /// Roles swept during the batched fill pass
    known_roles: Vec<String>,
    names: DashMap<String, CachedName>,
    /// Presence flags set externally; an id never flagged counts as present.
    presence: DashMap<String, bool>,
    ttl: Duration,
    max_entries: usize,
}

impl IdentityResolver {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        known_roles: Vec<String>,
        ttl: Duration,
        max_entries: usize,
    ) -> Self {
        Self {
            provider,
            known_roles,
            names: DashMap::new(),
            presence: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Resolve one id to a display name. Unresolvable ids echo back.
    pub async fn resolve(&self, id: &str) -> String {
        if let Some(name) = self.cached(id) {
            return name;
        }

        match self.provider.find_username(id).await {
            Ok(Some(name)) => {
                self.insert(id.to_string(), name.clone());
                name
            }
            Ok(None) => {
                debug!(id, "identity not resolvable, echoing id as name");
                id.to_string()
            }
            Err(e) => {
                warn!(id, error = %e, "identity provider lookup failed, echoing id");
                id.to_string()
            }
        }
    }

    /// Bulk resolution: one provider call per known role for the uncached
    /// portion, then a per-id fallback for leftovers. Every requested id is
    /// present in the returned map.
    pub async fn resolve_many(&self, ids: &[String]) -> HashMap<String, String> {
        let mut resolved = HashMap::with_capacity(ids.len());
        let mut uncached: Vec<&String> = Vec::new();

        for id in ids {
            match self.cached(id) {
                Some(name) => {
                    resolved.insert(id.clone(), name);
                }
                None => uncached.push(id),
            }
        }

        if uncached.is_empty() {
            return resolved;
        }

        debug!(
            cached = resolved.len(),
            uncached = uncached.len(),
            "bulk identity resolution: filling from role rosters"
        );

        for role in &self.known_roles {
            match self.provider.users_for_role(role).await {
                Ok(users) => {
                    for user in users {
                        self.insert(user.id, user.username);
                    }
                }
                Err(e) => {
                    warn!(role, error = %e, "role roster fetch failed during bulk resolution");
                }
            }

            if uncached.iter().all(|id| self.cached(id).is_some()) {
                break;
            }
        }

        for id in uncached {
            if let Some(name) = self.cached(id) {
                resolved.insert(id.clone(), name);
            } else {
                resolved.insert(id.clone(), self.resolve(id).await);
            }
        }

        resolved
    }

    /// Resolve a username to an id through the provider, caching the
    /// id/name pair on success.
    pub async fn find_user_id(&self, username: &str) -> Result<Option<String>> {
        let id = self.provider.find_user_id(username).await?;
        if let Some(ref id) = id {
            self.insert(id.clone(), username.to_string());
        }
        Ok(id)
    }

    /// Users holding a role, filtered to those currently flagged present.
    /// Roster names are cached as a side effect.
    pub async fn eligible_for_role(&self, role: &str) -> Result<Vec<IdentityRecord>> {
        let users = self.provider.users_for_role(role).await?;
        for user in &users {
            self.insert(user.id.clone(), user.username.clone());
        }
        Ok(users
            .into_iter()
            .filter(|u| self.is_present(&u.id))
            .collect())
    }

    /// Externally-driven presence flag (leave, rotation, shift changes).
    pub fn set_present(&self, id: &str, present: bool) {
        self.presence.insert(id.to_string(), present);
    }

    pub fn is_present(&self, id: &str) -> bool {
        self.presence.get(id).map(|p| *p).unwrap_or(true)
    }

    fn cached(&self, id: &str) -> Option<String> {
        if let Some(entry) = self.names.get(id) {
            if entry.inserted.elapsed() < self.ttl {
                return Some(entry.name.clone());
            }
        }
        // Expired or missing; drop the stale entry so capacity is reclaimed.
        self.names
            .remove_if(id, |_, v| v.inserted.elapsed() >= self.ttl);
        None
    }

    fn insert(&self, id: String, name: String) {
        if self.names.len() >= self.max_entries && !self.names.contains_key(&id) {
            self.evict();
        }
        self.names.insert(
            id,
            CachedName {
                name,
                inserted: Instant::now(),
            },
        );
    }

    /// Drop expired entries; if none were expired, drop the oldest one.
    fn evict(&self) {
        let before = self.names.len();
        self.names.retain(|_, v| v.inserted.elapsed() < self.ttl);
        if self.names.len() < before {
            return;
        }

        let oldest = self
            .names
            .iter()
            .min_by_key(|entry| entry.value().inserted)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.names.remove(&key);
        }
    }

    #[cfg(test)]
    pub(crate) fn cached_len(&self) -> usize {
        self.names.len()
    }
}
