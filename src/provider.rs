use crate::clientkit::ClientKitBackend;
use crate::config::DriverConfig;
use crate::hmd::HmdDevice;
use crate::pose::{hmd_tracker_callback, PoseSink};
use crate::tracking::{InterfaceHandle, TrackingBackend, TrackingContext};
use crate::types::PoseSample;
use crate::Result;
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

type SharedContext = Arc<Mutex<Box<dyn TrackingContext>>>;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The driver provider handed to the host.
///
/// The device collection is fixed once the provider is shared, so the
/// enumeration calls never contend with the pose callback. Only the
/// lifecycle state is locked.
pub struct Provider {
    hmds: Vec<Box<dyn HmdDevice>>,
    backend: Box<dyn TrackingBackend>,
    config: DriverConfig,
    state: Mutex<Lifecycle>,
    poses: Arc<PoseSink>,
}

enum Lifecycle {
    Uninitialized,
    Initialized(Session),
}

impl Provider {
    pub fn new(backend: Box<dyn TrackingBackend>, config: DriverConfig) -> Self {
        let poses = Arc::new(PoseSink::new(config.log_poses));
        Self {
            hmds: Vec::new(),
            backend,
            config,
            state: Mutex::new(Lifecycle::Uninitialized),
            poses,
        }
    }

    /// Provider backed by the system ClientKit library and environment config.
    pub fn from_env() -> Self {
        let config = DriverConfig::from_env();
        let backend = ClientKitBackend::new(config.library_path.clone());
        Self::new(Box::new(backend), config)
    }

    /// Append a device. Devices are enumerated in insertion order.
    pub fn add_hmd(&mut self, hmd: Box<dyn HmdDevice>) {
        self.hmds.push(hmd);
    }

    /// Open the tracking session.
    ///
    /// On failure every resource acquired so far is released and the
    /// provider stays uninitialized. Calling this while initialized is a
    /// no-op.
    pub fn init(&self, user_config_dir: &str, driver_install_dir: &str) -> Result<()> {
        log::debug!(
            "Init: user config dir '{}', driver install dir '{}'",
            user_config_dir,
            driver_install_dir
        );

        let mut state = lock(&self.state);
        if let Lifecycle::Initialized(_) = *state {
            log::warn!("Init called on an initialized provider, keeping the open session");
            return Ok(());
        }

        let session = Session::open(self.backend.as_ref(), &self.config, self.poses.clone())?;
        *state = Lifecycle::Initialized(session);
        log::info!("OSVR driver initialized");
        Ok(())
    }

    /// Release everything `init` acquired. No-op when uninitialized.
    pub fn cleanup(&self) {
        let previous = std::mem::replace(&mut *lock(&self.state), Lifecycle::Uninitialized);
        if let Lifecycle::Initialized(mut session) = previous {
            session.close();
            log::info!("OSVR driver cleaned up");
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*lock(&self.state), Lifecycle::Initialized(_))
    }

    pub fn hmd_count(&self) -> u32 {
        u32::try_from(self.hmds.len()).unwrap_or(u32::MAX)
    }

    pub fn hmd(&self, index: u32) -> Option<&dyn HmdDevice> {
        let index = usize::try_from(index).ok()?;
        self.hmds.get(index).map(|hmd| hmd.as_ref())
    }

    pub fn find_hmd(&self, id: &str) -> Option<&dyn HmdDevice> {
        self.hmds
            .iter()
            .find(|hmd| hmd.id() == id)
            .map(|hmd| hmd.as_ref())
    }

    /// Receiver for pose samples delivered by the tracking callback.
    ///
    /// Samples are queued only once a receiver has been requested, and the
    /// queue is emptied whenever a session closes. Clones share one queue,
    /// so each sample goes to a single receiver.
    pub fn poses(&self) -> Receiver<PoseSample> {
        self.poses.subscribe()
    }
}

impl Drop for Provider {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// The process-wide provider, built from the environment on first use.
pub fn global() -> &'static Provider {
    static PROVIDER: OnceLock<Provider> = OnceLock::new();
    PROVIDER.get_or_init(Provider::from_env)
}

/// Resources held between a successful `init` and `cleanup`.
struct Session {
    pump: Option<UpdatePump>,
    context: SharedContext,
    display: Option<InterfaceHandle>,
    // Shared with the provider; its address is the callback's userdata.
    sink: Arc<PoseSink>,
}

impl Session {
    fn open(backend: &dyn TrackingBackend, config: &DriverConfig, sink: Arc<PoseSink>) -> Result<Session> {
        let context = backend.connect(&config.app_id)?;

        let mut session = Session {
            pump: None,
            context: Arc::new(Mutex::new(context)),
            display: None,
            sink,
        };

        if let Err(e) = session.start(config) {
            session.close();
            return Err(e);
        }
        Ok(session)
    }

    fn start(&mut self, config: &DriverConfig) -> Result<()> {
        {
            let mut context = lock(&self.context);

            let display = context.get_interface(&config.interface_path)?;
            self.display = Some(display);

            context.register_pose_callback(display, hmd_tracker_callback, self.sink.as_userdata())?;
            context.update()?;

            if !context.is_connected() {
                log::warn!("OSVR server not connected yet, poses will arrive once it is");
            }
        }

        if let Some(interval) = config.update_interval {
            self.pump = Some(UpdatePump::start(self.context.clone(), interval)?);
        }
        Ok(())
    }

    /// Release in reverse acquisition order. Safe to call more than once.
    fn close(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.stop();
        }

        let mut context = lock(&self.context);
        if let Some(display) = self.display.take() {
            if let Err(e) = context.free_interface(display) {
                log::warn!("Failed to free OSVR interface: {}", e);
            }
        }
        if let Err(e) = context.shutdown() {
            log::warn!("{}", e);
        }
        drop(context);

        // No callbacks can fire past this point; samples never outlive the session.
        self.sink.drain();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Background thread that pumps the tracking context so callbacks keep firing.
struct UpdatePump {
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl UpdatePump {
    fn start(context: SharedContext, interval: Duration) -> Result<UpdatePump> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("osvr-update".into())
            .spawn(move || {
                update_loop(context, interval, stop_clone);
            })?;

        Ok(UpdatePump {
            stop_flag,
            thread: Some(thread),
        })
    }

    /// Stop the pump and wait for the thread to finish.
    fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for UpdatePump {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn update_loop(context: SharedContext, interval: Duration, stop_flag: Arc<AtomicBool>) {
    log::info!("OSVR update pump started ({:?} period)", interval);
    let mut failing = false;

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            log::info!("OSVR update pump stopping");
            break;
        }

        let result = lock(&context).update();
        match result {
            Ok(()) if failing => {
                log::info!("OSVR update recovered");
                failing = false;
            }
            Ok(()) => {}
            Err(e) if !failing => {
                log::warn!("{}", e);
                failing = true;
            }
            Err(_) => {}
        }

        std::thread::sleep(interval);
    }
}
