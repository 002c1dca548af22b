//! Registry ledger: write-once content hashes with relayer permissions

use provenance_common::{
    Address, ContentHash, Error, Receipt, Registration, RegistrationEvent, Result, Role,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::storage::RegistrationStore;

/// Source of block time, in Unix seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(1) as u64
    }
}

/// Clock pinned to a single instant
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

/// The registry contract.
///
/// Every state-changing call names its caller explicitly, the way a
/// transaction carries its sender.
pub struct Registry {
    store: Arc<dyn RegistrationStore>,
    clock: Arc<dyn Clock>,
    /// Held across the permission check and the write of every role change
    role_changes: Mutex<()>,
}

impl Registry {
    /// Deploy the registry; the deployer becomes admin and the first relayer
    pub async fn deploy(
        store: Arc<dyn RegistrationStore>,
        deployer: Address,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if deployer.is_zero() {
            return Err(Error::validation("deployer cannot be the zero address"));
        }

        store.add_role_member(Role::Admin, &deployer).await?;
        store.add_role_member(Role::Relayer, &deployer).await?;

        info!(
            "Registry deployed by {} on {} storage",
            deployer,
            store.backend()
        );

        Ok(Self {
            store,
            clock,
            role_changes: Mutex::new(()),
        })
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// `HashRegistered` history: up to `limit` receipts with sequence >= `from`
    pub async fn events(&self, from: u64, limit: usize) -> Result<Vec<Receipt>> {
        Ok(self
            .store
            .events_since(from, limit)
            .await?
            .into_iter()
            .map(|(sequence, event)| Receipt::new(sequence, event))
            .collect())
    }

    /// Register `hash`, attributed to the caller
    pub async fn register(
        &self,
        caller: &Address,
        hash: ContentHash,
        ipfs_cid: &str,
    ) -> Result<Receipt> {
        self.record(hash, *caller, ipfs_cid).await
    }

    /// Register `hash` on behalf of `reporter`; the caller must be a relayer
    pub async fn register_by_relayer(
        &self,
        caller: &Address,
        hash: ContentHash,
        reporter: &Address,
        ipfs_cid: &str,
    ) -> Result<Receipt> {
        self.require_role(Role::Relayer, caller).await?;
        if reporter.is_zero() {
            return Err(Error::validation("reporter cannot be the zero address"));
        }
        self.record(hash, *reporter, ipfs_cid).await
    }

    async fn record(&self, hash: ContentHash, reporter: Address, ipfs_cid: &str) -> Result<Receipt> {
        let event = RegistrationEvent {
            hash,
            reporter,
            ipfs_cid: ipfs_cid.to_string(),
            timestamp: self.clock.now(),
        };

        let Some(sequence) = self.store.commit_registration(&event).await? else {
            debug!("Rejected duplicate registration for {}", hash);
            return Err(Error::AlreadyRegistered(hash));
        };

        let receipt = Receipt::new(sequence, event);
        info!(
            "HashRegistered {} reporter={} tx={} seq={}",
            hash, reporter, receipt.tx_hash, sequence
        );

        Ok(receipt)
    }

    pub async fn is_registered(&self, hash: &ContentHash) -> Result<bool> {
        Ok(self.store.get(hash).await?.is_some())
    }

    /// Stored details, or the zero-valued registration if none exists
    pub async fn registration(&self, hash: &ContentHash) -> Result<Registration> {
        Ok(self.store.get(hash).await?.unwrap_or_default())
    }

    pub async fn has_role(&self, role: Role, account: &Address) -> Result<bool> {
        self.store.is_role_member(role, account).await
    }

    pub async fn role_members(&self, role: Role) -> Result<Vec<Address>> {
        self.store.role_members(role).await
    }

    /// Admin-only. Returns false if the account already held the role.
    pub async fn grant_role(&self, caller: &Address, role: Role, account: &Address) -> Result<bool> {
        let _guard = self.role_changes.lock().await;
        self.require_role(Role::Admin, caller).await?;
        if account.is_zero() {
            return Err(Error::validation("cannot grant a role to the zero address"));
        }

        let granted = self.store.add_role_member(role, account).await?;
        if granted {
            info!("RoleGranted {} to {} by {}", role, account, caller);
        }
        Ok(granted)
    }

    /// Admin-only. Returns false if the account did not hold the role.
    pub async fn revoke_role(&self, caller: &Address, role: Role, account: &Address) -> Result<bool> {
        let _guard = self.role_changes.lock().await;
        self.require_role(Role::Admin, caller).await?;

        if role == Role::Admin && self.store.is_role_member(Role::Admin, account).await? {
            let admins = self.store.role_members(Role::Admin).await?;
            if admins.len() <= 1 {
                return Err(Error::validation("cannot revoke the last admin"));
            }
        }

        let revoked = self.store.remove_role_member(role, account).await?;
        if revoked {
            info!("RoleRevoked {} from {} by {}", role, account, caller);
        }
        Ok(revoked)
    }

    async fn require_role(&self, role: Role, account: &Address) -> Result<()> {
        if self.store.is_role_member(role, account).await? {
            Ok(())
        } else {
            warn!("{} attempted a {}-only operation", account, role);
            Err(Error::Unauthorized {
                account: *account,
                role,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Memory store that can stall role reads and fail commits
    #[derive(Default)]
    struct FaultyStore {
        inner: MemoryStore,
        role_read_delay: Duration,
        failing_commits: AtomicUsize,
    }

    #[async_trait]
    impl RegistrationStore for FaultyStore {
        fn backend(&self) -> &'static str {
            "faulty"
        }

        async fn commit_registration(&self, event: &RegistrationEvent) -> Result<Option<u64>> {
            let failing = self
                .failing_commits
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if failing.is_ok() {
                return Err(Error::TransientChain("connection reset".to_string()));
            }
            self.inner.commit_registration(event).await
        }

        async fn get(&self, hash: &ContentHash) -> Result<Option<Registration>> {
            self.inner.get(hash).await
        }

        async fn events_since(
            &self,
            from: u64,
            limit: usize,
        ) -> Result<Vec<(u64, RegistrationEvent)>> {
            self.inner.events_since(from, limit).await
        }

        async fn add_role_member(&self, role: Role, account: &Address) -> Result<bool> {
            self.inner.add_role_member(role, account).await
        }

        async fn remove_role_member(&self, role: Role, account: &Address) -> Result<bool> {
            self.inner.remove_role_member(role, account).await
        }

        async fn is_role_member(&self, role: Role, account: &Address) -> Result<bool> {
            tokio::time::sleep(self.role_read_delay).await;
            self.inner.is_role_member(role, account).await
        }

        async fn role_members(&self, role: Role) -> Result<Vec<Address>> {
            tokio::time::sleep(self.role_read_delay).await;
            self.inner.role_members(role).await
        }
    }

    async fn deploy_on(store: FaultyStore) -> Registry {
        Registry::deploy(Arc::new(store), owner(), Arc::new(FixedClock(BLOCK_TIME)))
            .await
            .unwrap()
    }

    const BLOCK_TIME: u64 = 1_761_000_000;

    fn owner() -> Address {
        Address::new([0x01; 20])
    }

    fn relayer() -> Address {
        Address::new([0x02; 20])
    }

    fn user() -> Address {
        Address::new([0x03; 20])
    }

    async fn deploy() -> Registry {
        Registry::deploy(
            Arc::new(MemoryStore::new()),
            owner(),
            Arc::new(FixedClock(BLOCK_TIME)),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_deployer_is_admin_and_relayer() {
        let registry = deploy().await;
        assert!(registry.has_role(Role::Admin, &owner()).await.unwrap());
        assert!(registry.has_role(Role::Relayer, &owner()).await.unwrap());
        assert!(!registry.has_role(Role::Relayer, &user()).await.unwrap());
    }

    #[tokio::test]
    async fn test_deploy_rejects_zero_deployer() {
        let result = Registry::deploy(
            Arc::new(MemoryStore::new()),
            Address::ZERO,
            Arc::new(SystemClock),
        )
        .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_anyone_can_register() {
        let registry = deploy().await;
        let hash = ContentHash::keccak256(b"test-data");

        let receipt = registry.register(&user(), hash, "QmTest123").await.unwrap();
        assert_eq!(receipt.sequence, 1);
        assert_eq!(receipt.event.reporter, user());

        let logged = registry.events(1, 10).await.unwrap();
        assert_eq!(logged, vec![receipt.clone()]);
        assert_eq!(
            logged[0].event,
            RegistrationEvent {
                hash,
                reporter: user(),
                ipfs_cid: "QmTest123".to_string(),
                timestamp: BLOCK_TIME,
            }
        );

        assert!(registry.is_registered(&hash).await.unwrap());
        let stored = registry.registration(&hash).await.unwrap();
        assert_eq!(stored.reporter, user());
        assert_eq!(stored.ipfs_cid, "QmTest123");
        assert!(stored.timestamp > 0);
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = deploy().await;
        let hash = ContentHash::keccak256(b"test-data");

        registry.register(&user(), hash, "QmTest123").await.unwrap();
        let err = registry
            .register(&relayer(), hash, "QmOther")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(h) if h == hash));

        // first registration is untouched
        let stored = registry.registration(&hash).await.unwrap();
        assert_eq!(stored.reporter, user());
        assert_eq!(stored.ipfs_cid, "QmTest123");
    }

    #[tokio::test]
    async fn test_relayer_registers_on_behalf_of_reporter() {
        let registry = deploy().await;
        registry
            .grant_role(&owner(), Role::Relayer, &relayer())
            .await
            .unwrap();
        let hash = ContentHash::keccak256(b"relayer-test");

        let receipt = registry
            .register_by_relayer(&relayer(), hash, &user(), "QmRelayer123")
            .await
            .unwrap();
        assert_eq!(receipt.event.reporter, user());
        assert_eq!(registry.registration(&hash).await.unwrap().reporter, user());

        let err = registry
            .register_by_relayer(&relayer(), hash, &user(), "QmRelayer123")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn test_non_relayer_cannot_use_relayer_entry_point() {
        let registry = deploy().await;
        let hash = ContentHash::keccak256(b"relayer-test");

        let err = registry
            .register_by_relayer(&user(), hash, &user(), "QmRelayer123")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Unauthorized { account, role: Role::Relayer } if account == user()
        ));
        assert!(!registry.is_registered(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_relayer_cannot_attribute_to_zero_address() {
        let registry = deploy().await;
        let err = registry
            .register_by_relayer(&owner(), ContentHash::keccak256(b"x"), &Address::ZERO, "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_hash_is_not_registered() {
        let registry = deploy().await;
        let hash = ContentHash::keccak256(b"unregistered");
        assert!(!registry.is_registered(&hash).await.unwrap());

        let details = registry.registration(&hash).await.unwrap();
        assert_eq!(details.timestamp, 0);
        assert!(!details.exists());
    }

    #[tokio::test]
    async fn test_only_admin_manages_roles() {
        let registry = deploy().await;

        let err = registry
            .grant_role(&user(), Role::Relayer, &user())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { role: Role::Admin, .. }));

        assert!(registry
            .grant_role(&owner(), Role::Relayer, &relayer())
            .await
            .unwrap());
        assert!(!registry
            .grant_role(&owner(), Role::Relayer, &relayer())
            .await
            .unwrap());

        let err = registry
            .revoke_role(&relayer(), Role::Relayer, &relayer())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));

        assert!(registry
            .revoke_role(&owner(), Role::Relayer, &relayer())
            .await
            .unwrap());

        let err = registry
            .register_by_relayer(&relayer(), ContentHash::keccak256(b"after"), &user(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_revoked() {
        let registry = deploy().await;
        let err = registry
            .revoke_role(&owner(), Role::Admin, &owner())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        registry.grant_role(&owner(), Role::Admin, &user()).await.unwrap();
        assert!(registry
            .revoke_role(&user(), Role::Admin, &owner())
            .await
            .unwrap());
        assert!(!registry.has_role(Role::Admin, &owner()).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_have_one_winner() {
        let registry = Arc::new(deploy().await);
        let hash = ContentHash::keccak256(b"race");

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .register(&Address::new([i + 10; 20]), hash, "QmRace")
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(Error::AlreadyRegistered(_)) => {}
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_admins_revoking_each_other_leave_one_admin() {
        let registry = deploy_on(FaultyStore {
            role_read_delay: Duration::from_millis(50),
            ..Default::default()
        })
        .await;
        registry.grant_role(&owner(), Role::Admin, &user()).await.unwrap();

        let (owner_addr, user_addr) = (owner(), user());
        let (a, b) = tokio::join!(
            registry.revoke_role(&owner_addr, Role::Admin, &user_addr),
            registry.revoke_role(&user_addr, Role::Admin, &owner_addr),
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(registry.role_members(Role::Admin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_hash_unregistered() {
        let registry = deploy_on(FaultyStore {
            failing_commits: AtomicUsize::new(1),
            ..Default::default()
        })
        .await;
        let hash = ContentHash::keccak256(b"retry-me");

        let err = registry.register(&user(), hash, "QmRetry").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!registry.is_registered(&hash).await.unwrap());
        assert!(registry.events(1, 10).await.unwrap().is_empty());

        let receipt = registry.register(&user(), hash, "QmRetry").await.unwrap();
        assert_eq!(receipt.sequence, 1);
        assert!(registry.is_registered(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_event_log_follows_commit_order() {
        let registry = deploy().await;
        let first = ContentHash::keccak256(b"first");
        let second = ContentHash::keccak256(b"second");

        registry.register(&user(), first, "QmA").await.unwrap();
        registry.register(&user(), first, "QmA").await.unwrap_err();
        registry
            .register_by_relayer(&owner(), second, &relayer(), "QmB")
            .await
            .unwrap();

        let logged = registry.events(1, 10).await.unwrap();
        let summary: Vec<_> = logged
            .iter()
            .map(|r| (r.sequence, r.event.hash, r.event.reporter))
            .collect();
        assert_eq!(summary, vec![(1, first, user()), (2, second, relayer())]);

        assert_eq!(registry.events(2, 10).await.unwrap(), logged[1..].to_vec());
    }
}
