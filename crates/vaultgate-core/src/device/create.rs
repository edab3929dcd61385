use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use vaultgate_state::{Repository, RepositoryError};

use crate::{CoreError, DeviceId, device::Device, error::ValidationError};

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum CreateDeviceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<CreateDeviceError> for CoreError {
    fn from(value: CreateDeviceError) -> Self {
        match value {
            CreateDeviceError::Validation(e) => e.into(),
            CreateDeviceError::Repository(e) => e.into(),
        }
    }
}

/// Metadata describing the client installation being registered.
#[allow(missing_docs)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceRequest {
    pub os: String,
    pub hostname: String,
    pub user_agent: Option<String>,
    pub model: Option<String>,
}

#[instrument(err, skip_all)]
pub(super) async fn create_device<R: Repository<Device> + ?Sized>(
    repository: &R,
    request: CreateDeviceRequest,
) -> Result<DeviceId, CreateDeviceError> {
    if request.os.trim().is_empty() {
        return Err(ValidationError {
            field: "os",
            reason: "must not be empty",
        }
        .into());
    }
    if request.hostname.trim().is_empty() {
        return Err(ValidationError {
            field: "hostname",
            reason: "must not be empty",
        }
        .into());
    }

    let now = Utc::now();
    let device = Device {
        id: DeviceId::new_v4(),
        os: Some(request.os),
        hostname: Some(request.hostname),
        user_agent: request.user_agent,
        model: request.model,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        revision: 1,
    };

    repository.set(device.id.to_string(), device.clone()).await?;
    debug!(device_id = %device.id, "Registered device");

    Ok(device.id)
}

#[cfg(test)]
mod tests {
    use vaultgate_test::MemoryRepository;

    use super::*;

    fn request() -> CreateDeviceRequest {
        CreateDeviceRequest {
            os: "linux".to_owned(),
            hostname: "workstation".to_owned(),
            user_agent: Some("vaultgate-cli/1.0".to_owned()),
            model: None,
        }
    }

    #[tokio::test]
    async fn test_create_device_persists_metadata() {
        let repository = MemoryRepository::<Device>::default();

        let id = create_device(&repository, request()).await.unwrap();

        let device = repository.get(id.to_string()).await.unwrap().unwrap();
        assert_eq!(device.os.as_deref(), Some("linux"));
        assert_eq!(device.hostname.as_deref(), Some("workstation"));
        assert_eq!(device.user_agent.as_deref(), Some("vaultgate-cli/1.0"));
        assert_eq!(device.model, None);
        assert_eq!(device.revision, 1);
        assert!(device.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_create_device_rejects_blank_os() {
        let repository = MemoryRepository::<Device>::default();

        let result = create_device(
            &repository,
            CreateDeviceRequest {
                os: "   ".to_owned(),
                ..request()
            },
        )
        .await;

        assert!(matches!(result, Err(CreateDeviceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_device_rejects_blank_hostname() {
        let repository = MemoryRepository::<Device>::default();

        let result = create_device(
            &repository,
            CreateDeviceRequest {
                hostname: String::new(),
                ..request()
            },
        )
        .await;

        assert!(matches!(result, Err(CreateDeviceError::Validation(_))));
    }
}
