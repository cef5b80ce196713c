use crate::types::HmdError;

/// Errors raised while bringing up or running the tracking session.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Failed to load OSVR ClientKit: {0}")]
    Library(#[from] libloading::Error),

    #[error("Failed to create OSVR client context '{0}'")]
    ContextInit(String),

    #[error("OSVR interface '{0}' is unavailable")]
    InterfaceUnavailable(String),

    #[error("Failed to register pose callback on '{0}'")]
    CallbackRegistration(String),

    #[error("Failed to free OSVR interface {0}")]
    FreeInterface(String),

    #[error("OSVR client update failed")]
    Update,

    #[error("OSVR client shutdown failed")]
    Shutdown,

    #[error("String contains an interior NUL: {0}")]
    InvalidString(#[from] std::ffi::NulError),

    #[error("Failed to spawn update thread: {0}")]
    Thread(#[from] std::io::Error),
}

impl DriverError {
    /// Host error code reported from `Init` when this error aborts it.
    pub fn hmd_error(&self) -> HmdError {
        match self {
            DriverError::Library(_) => HmdError::DriverNotLoaded,
            DriverError::InterfaceUnavailable(_) => HmdError::InitHmdNotFound,
            DriverError::ContextInit(_)
            | DriverError::CallbackRegistration(_)
            | DriverError::FreeInterface(_)
            | DriverError::Update
            | DriverError::Shutdown
            | DriverError::InvalidString(_)
            | DriverError::Thread(_) => HmdError::DriverFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmd_error_mapping() {
        assert_eq!(
            DriverError::ContextInit("com.osvr.SteamVR".into()).hmd_error(),
            HmdError::DriverFailed
        );
        assert_eq!(
            DriverError::InterfaceUnavailable("/display".into()).hmd_error(),
            HmdError::InitHmdNotFound
        );
        assert_eq!(DriverError::Update.hmd_error(), HmdError::DriverFailed);
        assert_eq!(
            DriverError::FreeInterface("0x1000".into()).hmd_error(),
            HmdError::DriverFailed
        );
        assert_eq!(HmdError::DriverFailed.code(), 200);
    }

    #[test]
    fn test_display_message() {
        let err = DriverError::InterfaceUnavailable("/display".into());
        assert_eq!(err.to_string(), "OSVR interface '/display' is unavailable");
    }
}
