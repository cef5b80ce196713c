//! Host ABI for the driver.
//!
//! The host expects a C++ object implementing `IHmdDriverProvider`: a pointer
//! whose first word is a vtable. [`ProviderShim`] reproduces that layout over
//! a [`Provider`]. The vtable entries take `this` as the first argument, which
//! matches the member-call convention on 64-bit targets.
//! The generated C header is written to `include/driver_osvr.h` by cbindgen.

use crate::logging::init_logging;
use crate::provider::{self, Provider};
use crate::types::HmdError;
use std::borrow::Cow;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::sync::OnceLock;

/// Family prefix shared by every provider interface version.
pub const IHMD_DRIVER_PROVIDER_PREFIX: &str = "IHmdDriverProvider_";
/// The one provider interface version this driver implements.
pub const IHMD_DRIVER_PROVIDER_VERSION: &str = "IHmdDriverProvider_001";

/// `IHmdDriverProvider` virtual table, in declaration order.
#[repr(C)]
pub struct HmdDriverProviderVtable {
    pub init: unsafe extern "C" fn(*mut ProviderShim, *const c_char, *const c_char) -> i32,
    pub cleanup: unsafe extern "C" fn(*mut ProviderShim),
    pub get_hmd_count: unsafe extern "C" fn(*mut ProviderShim) -> u32,
    pub get_hmd: unsafe extern "C" fn(*mut ProviderShim, u32) -> *mut c_void,
    pub find_hmd: unsafe extern "C" fn(*mut ProviderShim, *const c_char) -> *mut c_void,
}

static PROVIDER_VTABLE: HmdDriverProviderVtable = HmdDriverProviderVtable {
    init: provider_init,
    cleanup: provider_cleanup,
    get_hmd_count: provider_get_hmd_count,
    get_hmd: provider_get_hmd,
    find_hmd: provider_find_hmd,
};

/// Host-facing provider object.
#[repr(C)]
pub struct ProviderShim {
    vtable: &'static HmdDriverProviderVtable,
    provider: &'static Provider,
}

impl ProviderShim {
    pub fn new(provider: &'static Provider) -> Self {
        Self {
            vtable: &PROVIDER_VTABLE,
            provider,
        }
    }

    pub fn vtable(&self) -> &'static HmdDriverProviderVtable {
        self.vtable
    }

    pub fn provider(&self) -> &'static Provider {
        self.provider
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self as *const ProviderShim as *mut c_void
    }
}

fn global_shim() -> &'static ProviderShim {
    static SHIM: OnceLock<ProviderShim> = OnceLock::new();
    SHIM.get_or_init(|| ProviderShim::new(provider::global()))
}

/// Validate a requested interface name against the provider interface.
///
/// A missing name or one outside the `IHmdDriverProvider_` family is an
/// invalid interface; a family member other than the exact supported
/// version is not found.
pub fn check_interface_name(name: Option<&CStr>) -> Result<(), HmdError> {
    let name = name.map(CStr::to_bytes).unwrap_or_default();

    if !name.starts_with(IHMD_DRIVER_PROVIDER_PREFIX.as_bytes()) {
        return Err(HmdError::InitInvalidInterface);
    }
    if name != IHMD_DRIVER_PROVIDER_VERSION.as_bytes() {
        return Err(HmdError::InitInterfaceNotFound);
    }
    Ok(())
}

/// Resolve an interface request to the process-wide provider object.
pub fn provider_for_interface(name: Option<&CStr>) -> Result<&'static ProviderShim, HmdError> {
    check_interface_name(name)?;
    Ok(global_shim())
}

/// Plugin entry point looked up by the host runtime.
///
/// Returns the provider object for `IHmdDriverProvider_001`, or NULL with
/// the reason written to `return_code`. `return_code` is left untouched on
/// success.
///
/// # Safety
/// `interface_name` must be null or a valid C string. `return_code` must be
/// null or valid for writes.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn HmdDriverFactory(
    interface_name: *const c_char,
    return_code: *mut c_int,
) -> *mut c_void {
    init_logging();

    let name = if interface_name.is_null() {
        None
    } else {
        Some(CStr::from_ptr(interface_name))
    };

    match provider_for_interface(name) {
        Ok(shim) => shim.as_ptr(),
        Err(err) => {
            log::debug!(
                "Rejected interface request {:?}: {:?}",
                name.map(CStr::to_string_lossy),
                err
            );
            if !return_code.is_null() {
                return_code.write(err.code());
            }
            std::ptr::null_mut()
        }
    }
}

unsafe fn c_str_lossy<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

unsafe extern "C" fn provider_init(
    this: *mut ProviderShim,
    user_config_dir: *const c_char,
    driver_install_dir: *const c_char,
) -> i32 {
    let Some(shim) = this.as_ref() else {
        return HmdError::DriverFailed.code();
    };
    let user_config_dir = c_str_lossy(user_config_dir);
    let driver_install_dir = c_str_lossy(driver_install_dir);

    match shim.provider.init(&user_config_dir, &driver_install_dir) {
        Ok(()) => HmdError::None.code(),
        Err(e) => {
            log::error!("OSVR driver init failed: {}", e);
            e.hmd_error().code()
        }
    }
}

unsafe extern "C" fn provider_cleanup(this: *mut ProviderShim) {
    if let Some(shim) = this.as_ref() {
        shim.provider.cleanup();
    }
}

unsafe extern "C" fn provider_get_hmd_count(this: *mut ProviderShim) -> u32 {
    this.as_ref().map_or(0, |shim| shim.provider.hmd_count())
}

unsafe extern "C" fn provider_get_hmd(this: *mut ProviderShim, index: u32) -> *mut c_void {
    this.as_ref()
        .and_then(|shim| shim.provider.hmd(index))
        .map_or(std::ptr::null_mut(), |hmd| hmd.driver_interface())
}

unsafe extern "C" fn provider_find_hmd(this: *mut ProviderShim, hmd_id: *const c_char) -> *mut c_void {
    if hmd_id.is_null() {
        return std::ptr::null_mut();
    }
    let id = CStr::from_ptr(hmd_id).to_string_lossy();
    this.as_ref()
        .and_then(|shim| shim.provider.find_hmd(&id))
        .map_or(std::ptr::null_mut(), |hmd| hmd.driver_interface())
}
