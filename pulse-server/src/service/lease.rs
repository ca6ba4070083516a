//! Edit Lease Manager
//!
//! Grants, renews, and releases the advisory exclusive-edit lease over a
//! shared resource. Expiry is lazy: a stale lease is swept on the next
//! `check`/`acquire` for that specific resource, not by a background task,
//! so an abandoned lease on a resource nobody visits can outlive the
//! timeout until someone queries it.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use pulse_core::domain::lease::EditLease;
use pulse_core::domain::team::Team;
use pulse_core::dto::lease::{LeaseAcquire, LeaseCheck};

use crate::store::{Store, StoreError};

/// Service error type
#[derive(Debug)]
pub enum LeaseError {
    TeamNotFound(Uuid),
    StorageError(StoreError),
}

impl From<StoreError> for LeaseError {
    fn from(err: StoreError) -> Self {
        LeaseError::StorageError(err)
    }
}

pub type Result<T> = std::result::Result<T, LeaseError>;

/// Verify the caller's organization owns the team behind a lease call
///
/// Foreign teams read as not-found, same as metrics.
pub async fn verify_team(store: &Arc<dyn Store>, org_id: Uuid, team_id: Uuid) -> Result<Team> {
    let team = store
        .find_team(team_id)
        .await?
        .filter(|t| t.org_id == org_id)
        .ok_or(LeaseError::TeamNotFound(team_id))?;

    Ok(team)
}

/// Lease state machine per resource: unheld, or held by one actor
pub struct LeaseManager {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl LeaseManager {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Whether the caller may edit the resource right now.
    pub async fn check(&self, resource_id: Uuid, caller_id: Uuid) -> Result<LeaseCheck> {
        match self.live_lease(resource_id).await? {
            None => Ok(LeaseCheck {
                can_edit: true,
                editing_user_name: None,
            }),
            Some(lease) if lease.holder_id == caller_id => Ok(LeaseCheck {
                can_edit: true,
                editing_user_name: lease.holder_name,
            }),
            Some(lease) => Ok(LeaseCheck {
                can_edit: false,
                editing_user_name: lease.holder_name,
            }),
        }
    }

    /// Try to take the lease. A conflict is a structured result, not an
    /// error: there is no blocking or queueing, only an advisory signal.
    pub async fn acquire(
        &self,
        resource_id: Uuid,
        caller_id: Uuid,
        user_name: Option<String>,
    ) -> Result<LeaseAcquire> {
        if let Some(lease) = self.live_lease(resource_id).await? {
            if lease.holder_id != caller_id {
                return Ok(LeaseAcquire {
                    acquired: false,
                    editing_user_name: lease.holder_name,
                });
            }
        }

        let lease = EditLease {
            resource_id,
            holder_id: caller_id,
            holder_name: user_name.clone(),
            last_seen: chrono::Utc::now(),
        };
        self.store.upsert_lease(lease).await?;

        tracing::debug!("Lease on {} acquired by {}", resource_id, caller_id);

        Ok(LeaseAcquire {
            acquired: true,
            editing_user_name: user_name,
        })
    }

    /// Renew the caller's lease. A heartbeat from a non-holder writes
    /// nothing: it neither creates nor extends any lease row.
    pub async fn heartbeat(&self, resource_id: Uuid, caller_id: Uuid) -> Result<()> {
        let renewed = self
            .store
            .touch_lease(resource_id, caller_id, chrono::Utc::now())
            .await?;

        if !renewed {
            tracing::debug!(
                "Ignoring heartbeat on {} from non-holder {}",
                resource_id,
                caller_id
            );
        }

        Ok(())
    }

    /// Drop the caller's lease if present.
    pub async fn release(&self, resource_id: Uuid, caller_id: Uuid) -> Result<()> {
        let released = self.store.delete_lease(resource_id, caller_id).await?;

        if released {
            tracing::debug!("Lease on {} released by {}", resource_id, caller_id);
        }

        Ok(())
    }

    /// The current lease after the lazy expiry sweep for this resource.
    async fn live_lease(&self, resource_id: Uuid) -> Result<Option<EditLease>> {
        match self.store.find_lease(resource_id).await? {
            Some(lease) if lease.is_expired(self.timeout, chrono::Utc::now()) => {
                self.store
                    .delete_lease(resource_id, lease.holder_id)
                    .await?;
                tracing::debug!(
                    "Expired lease on {} held by {}",
                    resource_id,
                    lease.holder_id
                );
                Ok(None)
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager(store: &MemoryStore, timeout: Duration) -> LeaseManager {
        LeaseManager::new(Arc::new(store.clone()), timeout)
    }

    #[tokio::test]
    async fn test_acquire_conflicts_before_timeout() {
        let store = MemoryStore::new();
        let leases = manager(&store, Duration::from_secs(60));
        let resource = Uuid::new_v4();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        let first = leases
            .acquire(resource, alice, Some("Alice".to_string()))
            .await
            .unwrap();
        assert!(first.acquired);

        let second = leases
            .acquire(resource, bob, Some("Bob".to_string()))
            .await
            .unwrap();
        assert!(!second.acquired);
        assert_eq!(second.editing_user_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_acquire_succeeds_after_timeout_without_heartbeat() {
        let store = MemoryStore::new();
        let leases = manager(&store, Duration::from_secs(60));
        let resource = Uuid::new_v4();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        leases
            .acquire(resource, alice, Some("Alice".to_string()))
            .await
            .unwrap();

        // Age Alice's lease past the timeout window.
        store.set_lease_last_seen(resource, chrono::Utc::now() - chrono::Duration::seconds(61));

        let taken = leases
            .acquire(resource, bob, Some("Bob".to_string()))
            .await
            .unwrap();
        assert!(taken.acquired);
        assert_eq!(taken.editing_user_name.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn test_heartbeat_from_non_holder_is_a_no_op() {
        let store = MemoryStore::new();
        let leases = manager(&store, Duration::from_secs(60));
        let resource = Uuid::new_v4();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        // No lease at all: heartbeat must not create one.
        leases.heartbeat(resource, bob).await.unwrap();
        assert!(store.find_lease(resource).await.unwrap().is_none());

        leases
            .acquire(resource, alice, Some("Alice".to_string()))
            .await
            .unwrap();
        let before = store.find_lease(resource).await.unwrap().unwrap();

        leases.heartbeat(resource, bob).await.unwrap();
        let after = store.find_lease(resource).await.unwrap().unwrap();
        assert_eq!(after.holder_id, alice);
        assert_eq!(after.last_seen, before.last_seen);
    }

    #[tokio::test]
    async fn test_heartbeat_renews_holder_lease() {
        let store = MemoryStore::new();
        let leases = manager(&store, Duration::from_secs(60));
        let resource = Uuid::new_v4();
        let alice = Uuid::new_v4();

        leases.acquire(resource, alice, None).await.unwrap();
        store.set_lease_last_seen(resource, chrono::Utc::now() - chrono::Duration::seconds(30));
        let before = store.find_lease(resource).await.unwrap().unwrap();

        leases.heartbeat(resource, alice).await.unwrap();
        let after = store.find_lease(resource).await.unwrap().unwrap();
        assert!(after.last_seen > before.last_seen);
    }

    #[tokio::test]
    async fn test_release_frees_the_lease_immediately() {
        let store = MemoryStore::new();
        let leases = manager(&store, Duration::from_secs(60));
        let resource = Uuid::new_v4();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        leases
            .acquire(resource, alice, Some("Alice".to_string()))
            .await
            .unwrap();
        leases.release(resource, alice).await.unwrap();

        let taken = leases
            .acquire(resource, bob, Some("Bob".to_string()))
            .await
            .unwrap();
        assert!(taken.acquired);
    }

    #[tokio::test]
    async fn test_check_sweeps_expired_lease() {
        let store = MemoryStore::new();
        let leases = manager(&store, Duration::from_secs(60));
        let resource = Uuid::new_v4();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        leases
            .acquire(resource, alice, Some("Alice".to_string()))
            .await
            .unwrap();
        store.set_lease_last_seen(resource, chrono::Utc::now() - chrono::Duration::seconds(120));

        let check = leases.check(resource, bob).await.unwrap();
        assert!(check.can_edit);
        assert!(check.editing_user_name.is_none());

        // The sweep deleted the stale row, not just ignored it.
        assert!(store.find_lease(resource).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_holder_can_always_edit() {
        let store = MemoryStore::new();
        let leases = manager(&store, Duration::from_secs(60));
        let resource = Uuid::new_v4();
        let alice = Uuid::new_v4();

        leases
            .acquire(resource, alice, Some("Alice".to_string()))
            .await
            .unwrap();

        let check = leases.check(resource, alice).await.unwrap();
        assert!(check.can_edit);
        assert_eq!(check.editing_user_name.as_deref(), Some("Alice"));
    }
}
