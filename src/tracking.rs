//! Seam between the provider and the tracking client library.

use crate::types::{OsvrPoseReport, OsvrTimeValue};
use crate::Result;
use std::ffi::c_void;

/// Signature of an OSVR pose callback (`OSVR_PoseCallback`).
pub type PoseCallback =
    unsafe extern "C" fn(userdata: *mut c_void, timestamp: *const OsvrTimeValue, report: *const OsvrPoseReport);

/// Opaque interface handle (`OSVR_ClientInterface`) owned by a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceHandle(pub(crate) *mut c_void);

// Only ever dereferenced by the tracking library, on the context that issued it.
unsafe impl Send for InterfaceHandle {}

impl InterfaceHandle {
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }
}

/// Opens client contexts on a tracking service.
pub trait TrackingBackend: Send + Sync {
    fn connect(&self, app_id: &str) -> Result<Box<dyn TrackingContext>>;
}

/// An open client context.
///
/// `shutdown` must be idempotent; dropping a context that was never shut
/// down is allowed to shut it down implicitly.
pub trait TrackingContext: Send {
    fn get_interface(&mut self, path: &str) -> Result<InterfaceHandle>;

    /// Register `callback` on `iface`. `userdata` is passed back verbatim and
    /// must stay valid until the context has been shut down.
    fn register_pose_callback(
        &mut self,
        iface: InterfaceHandle,
        callback: PoseCallback,
        userdata: *mut c_void,
    ) -> Result<()>;

    /// Process pending messages, invoking callbacks on the calling thread.
    fn update(&mut self) -> Result<()>;

    /// Whether the context has reached the tracking server yet.
    fn is_connected(&mut self) -> bool;

    fn free_interface(&mut self, iface: InterfaceHandle) -> Result<()>;

    fn shutdown(&mut self) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scriptable in-memory backend for provider tests.

    use super::*;
    use crate::DriverError;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Connect(String),
        GetInterface(String),
        Register,
        Update,
        FreeInterface,
        Shutdown,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum FailAt {
        #[default]
        Nothing,
        Connect,
        GetInterface,
        Register,
        Update,
        FreeInterface,
    }

    #[derive(Default)]
    struct Registration {
        callback: Option<PoseCallback>,
        userdata: usize,
    }

    #[derive(Default)]
    pub struct Shared {
        calls: Vec<Call>,
        registration: Registration,
        // Reports delivered from inside the next `update()`.
        queued: Vec<(OsvrTimeValue, OsvrPoseReport)>,
    }

    /// Backend handle. Clones observe the same call log.
    #[derive(Clone, Default)]
    pub struct MockBackend {
        shared: Arc<Mutex<Shared>>,
        fail_at: FailAt,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_at(fail_at: FailAt) -> Self {
            Self {
                fail_at,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.shared.lock().unwrap().calls.clone()
        }

        pub fn count(&self, call: &Call) -> usize {
            self.calls().iter().filter(|c| *c == call).count()
        }

        /// Queue a report that the next `update()` delivers to the callback.
        pub fn queue_pose(&self, timestamp: OsvrTimeValue, report: OsvrPoseReport) {
            self.shared.lock().unwrap().queued.push((timestamp, report));
        }

        /// Invoke the registered callback directly, as a library thread would.
        pub fn fire(&self, timestamp: OsvrTimeValue, report: OsvrPoseReport) -> bool {
            let (callback, userdata) = {
                let shared = self.shared.lock().unwrap();
                (shared.registration.callback, shared.registration.userdata)
            };
            match callback {
                Some(callback) => {
                    unsafe { callback(userdata as *mut c_void, &timestamp, &report) };
                    true
                }
                None => false,
            }
        }
    }

    impl TrackingBackend for MockBackend {
        fn connect(&self, app_id: &str) -> Result<Box<dyn TrackingContext>> {
            self.shared
                .lock()
                .unwrap()
                .calls
                .push(Call::Connect(app_id.to_string()));
            if self.fail_at == FailAt::Connect {
                return Err(DriverError::ContextInit(app_id.to_string()));
            }
            Ok(Box::new(MockContext {
                backend: self.clone(),
                open: true,
            }))
        }
    }

    struct MockContext {
        backend: MockBackend,
        open: bool,
    }

    impl MockContext {
        fn record(&self, call: Call) {
            self.backend.shared.lock().unwrap().calls.push(call);
        }
    }

    impl TrackingContext for MockContext {
        fn get_interface(&mut self, path: &str) -> Result<InterfaceHandle> {
            self.record(Call::GetInterface(path.to_string()));
            if self.backend.fail_at == FailAt::GetInterface {
                return Err(DriverError::InterfaceUnavailable(path.to_string()));
            }
            Ok(InterfaceHandle(0x1000 as *mut c_void))
        }

        fn register_pose_callback(
            &mut self,
            _iface: InterfaceHandle,
            callback: PoseCallback,
            userdata: *mut c_void,
        ) -> Result<()> {
            self.record(Call::Register);
            if self.backend.fail_at == FailAt::Register {
                return Err(DriverError::CallbackRegistration("mock".into()));
            }
            self.backend.shared.lock().unwrap().registration = Registration {
                callback: Some(callback),
                userdata: userdata as usize,
            };
            Ok(())
        }

        fn update(&mut self) -> Result<()> {
            self.record(Call::Update);
            let queued = std::mem::take(&mut self.backend.shared.lock().unwrap().queued);
            for (timestamp, report) in queued {
                self.backend.fire(timestamp, report);
            }
            if self.backend.fail_at == FailAt::Update {
                return Err(DriverError::Update);
            }
            Ok(())
        }

        fn is_connected(&mut self) -> bool {
            true
        }

        fn free_interface(&mut self, _iface: InterfaceHandle) -> Result<()> {
            self.record(Call::FreeInterface);
            if self.backend.fail_at == FailAt::FreeInterface {
                return Err(DriverError::FreeInterface("mock".into()));
            }
            Ok(())
        }

        fn shutdown(&mut self) -> Result<()> {
            if self.open {
                self.open = false;
                self.record(Call::Shutdown);
                self.backend.shared.lock().unwrap().registration = Registration::default();
            }
            Ok(())
        }
    }

    impl Drop for MockContext {
        fn drop(&mut self) {
            let _ = self.shutdown();
        }
    }
}
