//! Account registrar.
//!
//! Registration is a two-step workflow over two document types with no
//! transaction spanning them: persist the account, then provision its cart.
//! The workflow is an explicit state machine with one compensating edge —
//! if cart provisioning fails, the just-created account is deleted so no
//! caller ever observes a "created" account without a cart. The compensation
//! is best-effort: when the delete itself fails, the failure carries a
//! `needs_manual_cleanup` flag because the system cannot self-heal from that
//! state without the signal.
//!
//! The single-admin invariant is not a read-then-insert: the account store's
//! conditional insert verifies the slot and reserves it as part of the same
//! write. Backends that can only report the race as a transient conflict are
//! re-driven through the retry coordinator, and exhaustion surfaces as
//! `Contention`, never as a spurious success.

use serde::Serialize;
use tracing::{debug, error, warn};

use tradepost_accounts::{Account, NewAccount, Role};
use tradepost_carts::PricedCart;
use tradepost_core::{AccountId, Document, DomainError, DomainResult};

use crate::carts::CartManager;
use crate::retry::RetryCoordinator;
use crate::store::{AccountStore, CartStore, ProductStore};

/// Credential-hashing collaborator. Hashing itself is external to this core.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> String;
}

impl<H> PasswordHasher for std::sync::Arc<H>
where
    H: PasswordHasher + ?Sized,
{
    fn hash(&self, plaintext: &str) -> String {
        (**self).hash(plaintext)
    }
}

/// Registration workflow states.
///
/// `Validating → AdminSlotReserving → AccountPersisting → CartProvisioning → Done`,
/// with the compensating edge `CartProvisioning(fail) → AccountDeleting → Failed`.
/// Non-admin registrations skip `AdminSlotReserving`; any other failing step
/// transitions straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Validating,
    AdminSlotReserving,
    AccountPersisting,
    CartProvisioning,
    AccountDeleting,
    Done,
    Failed,
}

fn transition(state: &mut RegistrationState, next: RegistrationState) {
    debug!(from = ?*state, to = ?next, "registration transition");
    *state = next;
}

/// A successfully registered account together with its provisioned cart.
#[derive(Debug, Clone)]
pub struct RegisteredAccount {
    pub account: Account,
    pub cart: PricedCart,
}

/// Orchestrates account creation, the single-admin guard, and cart
/// provisioning with compensation.
pub struct AccountRegistrar<A, C, P, H> {
    accounts: A,
    carts: CartManager<C, P>,
    hasher: H,
    retries: RetryCoordinator,
}

impl<A, C, P, H> AccountRegistrar<A, C, P, H>
where
    A: AccountStore,
    C: CartStore,
    P: ProductStore,
    H: PasswordHasher,
{
    pub fn new(accounts: A, carts: CartManager<C, P>, hasher: H) -> Self {
        Self::with_retries(accounts, carts, hasher, RetryCoordinator::default())
    }

    pub fn with_retries(
        accounts: A,
        carts: CartManager<C, P>,
        hasher: H,
        retries: RetryCoordinator,
    ) -> Self {
        Self {
            accounts,
            carts,
            hasher,
            retries,
        }
    }

    pub fn register(&self, profile: NewAccount) -> DomainResult<RegisteredAccount> {
        let mut state = RegistrationState::Validating;
        debug!(email = %profile.email, "registration started");

        let (role, account) = match self.validate(profile) {
            Ok(validated) => validated,
            Err(err) => {
                transition(&mut state, RegistrationState::Failed);
                return Err(err);
            }
        };

        if role == Role::Admin {
            transition(&mut state, RegistrationState::AdminSlotReserving);
        }
        transition(&mut state, RegistrationState::AccountPersisting);

        // One conditioned write claims the email key and, for admins, the
        // admin slot. Transient conflicts on the guard are re-driven up to
        // the retry budget.
        let stored = match self.retries.run(|| Ok(self.accounts.insert(account.clone())?)) {
            Ok(stored) => stored,
            Err(err) => {
                transition(&mut state, RegistrationState::Failed);
                return Err(err);
            }
        };

        transition(&mut state, RegistrationState::CartProvisioning);
        match self.carts.create_cart(stored.id()) {
            Ok(cart) => {
                transition(&mut state, RegistrationState::Done);
                debug!(account_id = %stored.id(), cart_id = %cart.id, "registration completed");
                Ok(RegisteredAccount {
                    account: stored,
                    cart,
                })
            }
            Err(cause) => {
                transition(&mut state, RegistrationState::AccountDeleting);
                warn!(
                    account_id = %stored.id(),
                    error = %cause,
                    "cart provisioning failed, compensating by deleting the account"
                );
                let needs_manual_cleanup = match self.accounts.delete(stored.id()) {
                    Ok(_) => false,
                    Err(delete_err) => {
                        error!(
                            account_id = %stored.id(),
                            error = %delete_err,
                            "compensating delete failed, manual cleanup required"
                        );
                        true
                    }
                };
                transition(&mut state, RegistrationState::Failed);
                Err(DomainError::AccountProvisioningFailed {
                    source: Box::new(cause),
                    needs_manual_cleanup,
                })
            }
        }
    }

    /// Validation phase: role parse, advisory email pre-check, credential
    /// hashing, and account construction. No writes happen here; the
    /// conditional insert remains the authoritative guard against the
    /// lookup/insert race on the email key.
    fn validate(&self, profile: NewAccount) -> DomainResult<(Role, Account)> {
        let role: Role = profile.role.parse()?;

        if self
            .accounts
            .find_by_email(&profile.email)
            .map_err(|e| e.into_domain())?
            .is_some()
        {
            return Err(DomainError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash(&profile.password);
        let account = Account::new(
            profile.first_name,
            profile.last_name,
            profile.email,
            password_hash,
            role,
        )?;
        Ok((role, account))
    }

    /// Delete an account and its cart. The cart goes first; if removing it
    /// fails, the account stays and the failure surfaces.
    pub fn delete_account(&self, id: AccountId) -> DomainResult<()> {
        if self
            .accounts
            .find(id)
            .map_err(|e| e.into_domain())?
            .is_none()
        {
            return Err(DomainError::NotFound);
        }
        self.carts.delete_cart_for_account(id)?;
        self.accounts.delete(id).map_err(|e| e.into_domain())?;
        debug!(account_id = %id, "account deleted");
        Ok(())
    }
}
