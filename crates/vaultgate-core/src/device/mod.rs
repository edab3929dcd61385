//! Device records and device management operations.

mod create;
pub use create::*;
mod devices_client;
pub use devices_client::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vaultgate_state::{Repository, RepositoryError, register_repository_item};

use crate::DeviceId;

/// A client installation.
///
/// Metadata is best-effort and absent for devices first seen through a
/// sign-in rather than [`create_device`]. A device record carries no trust
/// by itself; trust lives in [`VerificationDevice`](crate::trust::VerificationDevice).
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub os: Option<String>,
    pub hostname: Option<String>,
    pub user_agent: Option<String>,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

register_repository_item!(Device, "Device");

impl Device {
    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// A placeholder record for a device id first observed during sign-in.
    pub(crate) fn bare(id: DeviceId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            os: None,
            hostname: None,
            user_agent: None,
            model: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            revision: 1,
        }
    }
}

/// Fetches the device by id, treating soft-deleted records as absent.
pub(crate) async fn get_live(
    repository: &dyn Repository<Device>,
    id: DeviceId,
) -> Result<Option<Device>, RepositoryError> {
    Ok(repository
        .get(id.to_string())
        .await?
        .filter(|device| !device.is_deleted()))
}
