//! Account records and account management operations.

mod accounts_client;
pub use accounts_client::*;
mod manage;
pub use manage::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vaultgate_crypto::{Salt, Verifier};
use vaultgate_state::{Repository, RepositoryError, register_repository_item};

use crate::AccountId;

/// Which second factor the account demands at login.
///
/// Anything other than `None` forces out-of-band approval even when the
/// device is already trusted, under the default policy.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MfaType {
    #[default]
    None,
    Fingerprint,
    OneTimePassword,
}

/// A registered account.
///
/// Only the password-independent verifier and salt are stored; nothing here
/// can be turned back into the password. Immutable after creation except for
/// [`MfaType`] updates and soft-deletion.
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    /// Opaque login identifier chosen by the client, unique among live
    /// accounts.
    pub account_key: String,
    pub username: String,
    pub verifier: Verifier,
    pub salt: Salt,
    pub mfa_type: MfaType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

register_repository_item!(Account, "Account");

impl Account {
    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fetches the account by id, treating soft-deleted records as absent.
pub(crate) async fn get_live(
    repository: &dyn Repository<Account>,
    id: AccountId,
) -> Result<Option<Account>, RepositoryError> {
    Ok(repository
        .get(id.to_string())
        .await?
        .filter(|account| !account.is_deleted()))
}

/// Finds the live account registered under `account_key`.
pub(crate) async fn find_by_account_key(
    repository: &dyn Repository<Account>,
    account_key: &str,
) -> Result<Option<Account>, RepositoryError> {
    Ok(repository
        .list()
        .await?
        .into_iter()
        .find(|account| !account.is_deleted() && account.account_key == account_key))
}
