//! OSVR ClientKit backend, loaded at runtime.
//!
//! The library is resolved when a context is opened rather than when the
//! plugin is loaded, so a missing OSVR install surfaces as an `Init` error
//! instead of a failed `dlopen` of the whole driver.

use crate::tracking::{InterfaceHandle, PoseCallback, TrackingBackend, TrackingContext};
use crate::{DriverError, Result};
use libloading::Library;
use std::ffi::{c_char, c_void, CString, OsString};
use std::path::PathBuf;
use std::sync::Arc;

const OSVR_RETURN_SUCCESS: i8 = 0;

type ClientContextPtr = *mut c_void;
type ClientInterfacePtr = *mut c_void;

// osvrClientKit entry points
type OsvrClientInit = unsafe extern "C" fn(*const c_char, u32) -> ClientContextPtr;
type OsvrClientUpdate = unsafe extern "C" fn(ClientContextPtr) -> i8;
type OsvrClientCheckStatus = unsafe extern "C" fn(ClientContextPtr) -> i8;
type OsvrClientShutdown = unsafe extern "C" fn(ClientContextPtr) -> i8;
type OsvrClientGetInterface =
    unsafe extern "C" fn(ClientContextPtr, *const c_char, *mut ClientInterfacePtr) -> i8;
type OsvrClientFreeInterface = unsafe extern "C" fn(ClientContextPtr, ClientInterfacePtr) -> i8;
type OsvrRegisterPoseCallback =
    unsafe extern "C" fn(ClientInterfacePtr, PoseCallback, *mut c_void) -> i8;

struct ClientKitLibrary {
    client_init: OsvrClientInit,
    client_update: OsvrClientUpdate,
    client_check_status: OsvrClientCheckStatus,
    client_shutdown: OsvrClientShutdown,
    client_get_interface: OsvrClientGetInterface,
    client_free_interface: OsvrClientFreeInterface,
    register_pose_callback: OsvrRegisterPoseCallback,
    // Keeps the entry points above mapped.
    _lib: Library,
}

impl ClientKitLibrary {
    unsafe fn load(path: &OsString) -> Result<ClientKitLibrary> {
        let lib = Library::new(path)?;

        // Copy the function pointers out so the `Symbol` borrows end before `lib` moves.
        let client_init = *lib.get::<OsvrClientInit>(b"osvrClientInit\0")?;
        let client_update = *lib.get::<OsvrClientUpdate>(b"osvrClientUpdate\0")?;
        let client_check_status = *lib.get::<OsvrClientCheckStatus>(b"osvrClientCheckStatus\0")?;
        let client_shutdown = *lib.get::<OsvrClientShutdown>(b"osvrClientShutdown\0")?;
        let client_get_interface = *lib.get::<OsvrClientGetInterface>(b"osvrClientGetInterface\0")?;
        let client_free_interface =
            *lib.get::<OsvrClientFreeInterface>(b"osvrClientFreeInterface\0")?;
        let register_pose_callback =
            *lib.get::<OsvrRegisterPoseCallback>(b"osvrRegisterPoseCallback\0")?;

        Ok(ClientKitLibrary {
            client_init,
            client_update,
            client_check_status,
            client_shutdown,
            client_get_interface,
            client_free_interface,
            register_pose_callback,
            _lib: lib,
        })
    }
}

/// Opens contexts through the system's `osvrClientKit` shared library.
pub struct ClientKitBackend {
    library_path: Option<PathBuf>,
}

impl ClientKitBackend {
    /// `library_path` overrides the platform library name (`libosvrClientKit.so`,
    /// `osvrClientKit.dll`, ...).
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn library_name(&self) -> OsString {
        match &self.library_path {
            Some(path) => path.clone().into_os_string(),
            None => libloading::library_filename("osvrClientKit"),
        }
    }
}

impl TrackingBackend for ClientKitBackend {
    fn connect(&self, app_id: &str) -> Result<Box<dyn TrackingContext>> {
        let name = self.library_name();
        log::debug!("Loading OSVR ClientKit from {:?}", name);
        let library = Arc::new(unsafe { ClientKitLibrary::load(&name)? });

        let app_id_c = CString::new(app_id)?;
        let context = unsafe { (library.client_init)(app_id_c.as_ptr(), 0) };
        if context.is_null() {
            return Err(DriverError::ContextInit(app_id.to_string()));
        }

        log::info!("Opened OSVR client context '{}'", app_id);
        Ok(Box::new(ClientKitContext { library, context }))
    }
}

/// An `OSVR_ClientContext`. The library stays loaded for as long as this lives.
struct ClientKitContext {
    library: Arc<ClientKitLibrary>,
    context: ClientContextPtr,
}

// ClientKit contexts are not thread-affine; callers serialize access.
unsafe impl Send for ClientKitContext {}

impl TrackingContext for ClientKitContext {
    fn get_interface(&mut self, path: &str) -> Result<InterfaceHandle> {
        if self.context.is_null() {
            return Err(DriverError::InterfaceUnavailable(path.to_string()));
        }
        let path_c = CString::new(path)?;
        let mut iface: ClientInterfacePtr = std::ptr::null_mut();
        let rc = unsafe { (self.library.client_get_interface)(self.context, path_c.as_ptr(), &mut iface) };
        if rc != OSVR_RETURN_SUCCESS || iface.is_null() {
            return Err(DriverError::InterfaceUnavailable(path.to_string()));
        }
        Ok(InterfaceHandle(iface))
    }

    fn register_pose_callback(
        &mut self,
        iface: InterfaceHandle,
        callback: PoseCallback,
        userdata: *mut c_void,
    ) -> Result<()> {
        let rc = unsafe { (self.library.register_pose_callback)(iface.as_ptr(), callback, userdata) };
        if rc != OSVR_RETURN_SUCCESS {
            return Err(DriverError::CallbackRegistration(format!("{:p}", iface.as_ptr())));
        }
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        if self.context.is_null() {
            return Err(DriverError::Update);
        }
        match unsafe { (self.library.client_update)(self.context) } {
            OSVR_RETURN_SUCCESS => Ok(()),
            _ => Err(DriverError::Update),
        }
    }

    fn is_connected(&mut self) -> bool {
        !self.context.is_null()
            && unsafe { (self.library.client_check_status)(self.context) } == OSVR_RETURN_SUCCESS
    }

    fn free_interface(&mut self, iface: InterfaceHandle) -> Result<()> {
        if self.context.is_null() {
            return Ok(());
        }
        match unsafe { (self.library.client_free_interface)(self.context, iface.as_ptr()) } {
            OSVR_RETURN_SUCCESS => Ok(()),
            _ => Err(DriverError::FreeInterface(format!("{:p}", iface.as_ptr()))),
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.context.is_null() {
            return Ok(());
        }
        let context = std::mem::replace(&mut self.context, std::ptr::null_mut());
        match unsafe { (self.library.client_shutdown)(context) } {
            OSVR_RETURN_SUCCESS => {
                log::info!("Closed OSVR client context");
                Ok(())
            }
            _ => Err(DriverError::Shutdown),
        }
    }
}

impl Drop for ClientKitContext {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_a_load_error() {
        let backend = ClientKitBackend::new(Some(PathBuf::from(
            "/nonexistent/osvr/libosvrClientKit-missing.so",
        )));
        let err = match backend.connect("com.osvr.SteamVR") {
            Ok(_) => panic!("connect should fail without a library"),
            Err(e) => e,
        };
        assert!(matches!(err, DriverError::Library(_)));
        assert_eq!(err.hmd_error(), crate::HmdError::DriverNotLoaded);
    }

    #[test]
    fn test_default_library_name() {
        let backend = ClientKitBackend::new(None);
        let name = backend.library_name();
        assert!(name.to_string_lossy().contains("osvrClientKit"));
    }
}
