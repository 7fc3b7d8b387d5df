//! Roles and capability tokens for privileged operations.
//!
//! Capabilities are issued by [`Roles`] to a holder who currently has the
//! role, and are re-checked on every use: revoking an account invalidates
//! every capability it already holds.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sluice_core::error::AuthorizationError;
use sluice_core::types::AccountId;

/// Proof that `holder` was authorized when the capability was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCap {
    holder: AccountId,
}

impl AdminCap {
    pub fn holder(&self) -> AccountId {
        self.holder
    }
}

/// Proof that `holder` was the owner when the capability was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerCap {
    holder: AccountId,
}

impl OwnerCap {
    pub fn holder(&self) -> AccountId {
        self.holder
    }
}

/// One owner plus a set of authorized operators. The owner is always authorized.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Roles {
    owner: AccountId,
    authorized: BTreeSet<AccountId>,
}

impl Roles {
    pub fn new(owner: AccountId) -> Self {
        Self { owner, authorized: BTreeSet::new() }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn is_authorized(&self, account: &AccountId) -> bool {
        *account == self.owner || self.authorized.contains(account)
    }

    /// Authorized accounts other than the owner.
    pub fn authorized(&self) -> impl Iterator<Item = &AccountId> {
        self.authorized.iter()
    }

    pub fn issue_admin(&self, caller: AccountId) -> Result<AdminCap, AuthorizationError> {
        if !self.is_authorized(&caller) {
            return Err(AuthorizationError::NotAuthorized(caller));
        }
        Ok(AdminCap { holder: caller })
    }

    pub fn issue_owner(&self, caller: AccountId) -> Result<OwnerCap, AuthorizationError> {
        if caller != self.owner {
            return Err(AuthorizationError::NotOwner(caller));
        }
        Ok(OwnerCap { holder: caller })
    }

    pub fn check_admin(&self, cap: &AdminCap) -> Result<(), AuthorizationError> {
        if !self.is_authorized(&cap.holder) {
            return Err(AuthorizationError::NotAuthorized(cap.holder));
        }
        Ok(())
    }

    pub fn check_owner(&self, cap: &OwnerCap) -> Result<(), AuthorizationError> {
        if cap.holder != self.owner {
            return Err(AuthorizationError::NotOwner(cap.holder));
        }
        Ok(())
    }

    pub fn add_authorized(&mut self, cap: &OwnerCap, account: AccountId) -> Result<(), AuthorizationError> {
        self.check_owner(cap)?;
        if account != self.owner {
            self.authorized.insert(account);
        }
        Ok(())
    }

    pub fn remove_authorized(&mut self, cap: &OwnerCap, account: AccountId) -> Result<(), AuthorizationError> {
        self.check_owner(cap)?;
        if account == cap.holder {
            return Err(AuthorizationError::CannotRemoveSelf);
        }
        self.authorized.remove(&account);
        Ok(())
    }

    /// Hand the owner role to `new_owner`. The previous owner keeps no role
    /// unless it was separately authorized.
    pub fn transfer_ownership(&mut self, cap: &OwnerCap, new_owner: AccountId) -> Result<(), AuthorizationError> {
        self.check_owner(cap)?;
        self.authorized.remove(&new_owner);
        self.owner = new_owner;
        Ok(())
    }
}
