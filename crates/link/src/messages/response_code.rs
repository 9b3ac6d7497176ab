//! Control-protocol response codes.

/// Symbolic response codes with stable wire integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Success,
    InsufficientClients,
    LocalError,
    UnknownAuthId,
    InvalidCredentials,
    UnsupportedAuthType,
    UnsupportedClientVersion,
    UnsupportedServerVersion,
    ClientRejected,
}

impl ResponseCode {
    /// The stable integer carried on the wire.
    pub fn code(&self) -> i64 {
        match self {
            ResponseCode::Success => 0,
            ResponseCode::InsufficientClients => 1,
            ResponseCode::LocalError => 2,
            ResponseCode::UnknownAuthId => 10,
            ResponseCode::InvalidCredentials => 11,
            ResponseCode::UnsupportedAuthType => 12,
            ResponseCode::UnsupportedClientVersion => 13,
            ResponseCode::UnsupportedServerVersion => 14,
            ResponseCode::ClientRejected => 15,
        }
    }

    /// Parses a wire integer.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ResponseCode::Success),
            1 => Some(ResponseCode::InsufficientClients),
            2 => Some(ResponseCode::LocalError),
            10 => Some(ResponseCode::UnknownAuthId),
            11 => Some(ResponseCode::InvalidCredentials),
            12 => Some(ResponseCode::UnsupportedAuthType),
            13 => Some(ResponseCode::UnsupportedClientVersion),
            14 => Some(ResponseCode::UnsupportedServerVersion),
            15 => Some(ResponseCode::ClientRejected),
            _ => None,
        }
    }

    /// True when a handshake carrying this code may be retried. The
    /// rejection codes in the non-recoverable set terminate the manager.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ResponseCode::UnknownAuthId
                | ResponseCode::InvalidCredentials
                | ResponseCode::UnsupportedAuthType
                | ResponseCode::UnsupportedClientVersion
                | ResponseCode::UnsupportedServerVersion
                | ResponseCode::ClientRejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for code in [
            ResponseCode::Success,
            ResponseCode::InsufficientClients,
            ResponseCode::LocalError,
            ResponseCode::UnknownAuthId,
            ResponseCode::InvalidCredentials,
            ResponseCode::UnsupportedAuthType,
            ResponseCode::UnsupportedClientVersion,
            ResponseCode::UnsupportedServerVersion,
            ResponseCode::ClientRejected,
        ] {
            assert_eq!(ResponseCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ResponseCode::from_code(99), None);
    }

    #[test]
    fn test_recoverability() {
        assert!(ResponseCode::Success.is_recoverable());
        assert!(ResponseCode::InsufficientClients.is_recoverable());
        assert!(ResponseCode::LocalError.is_recoverable());
        assert!(!ResponseCode::InvalidCredentials.is_recoverable());
        assert!(!ResponseCode::ClientRejected.is_recoverable());
        assert!(!ResponseCode::UnsupportedClientVersion.is_recoverable());
    }
}
