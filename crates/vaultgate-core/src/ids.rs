//! Typed identifiers for the protocol's entities.

/// Defines a UUID newtype so ids of different entities cannot be mixed up.
macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Wraps an existing UUID.
            pub fn new(value: uuid::Uuid) -> Self {
                Self(value)
            }

            /// Generates a fresh random id.
            pub fn new_v4() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(value: uuid::Uuid) -> Self {
                Self(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_newtype!(
    /// Identifies an account.
    AccountId
);
uuid_newtype!(
    /// Identifies a device.
    DeviceId
);
uuid_newtype!(
    /// Identifies one login session.
    SessionId
);
uuid_newtype!(
    /// Identifies an approval notification.
    NotificationId
);
uuid_newtype!(
    /// Identifies a device trust record.
    VerificationDeviceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let id: SessionId = "12345678-1234-5678-1234-567812345678".parse().unwrap();
        assert_eq!(id.to_string(), "12345678-1234-5678-1234-567812345678");

        let raw: uuid::Uuid = id.into();
        assert_eq!(SessionId::new(raw), id);
    }

    #[test]
    fn test_new_v4_is_unique() {
        assert_ne!(AccountId::new_v4(), AccountId::new_v4());
    }
}
