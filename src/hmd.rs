use std::ffi::c_void;

/// A head-mounted display exposed to the host.
///
/// Implementors own whatever object the host talks to for this device;
/// [`HmdDevice::driver_interface`] hands the host a pointer to it.
pub trait HmdDevice: Send + Sync {
    /// Identifier the host uses with `FindHmd`.
    fn id(&self) -> &str;

    /// Host-facing driver object for this device.
    ///
    /// Must stay valid for as long as the device is held by the provider.
    fn driver_interface(&self) -> *mut c_void;
}
