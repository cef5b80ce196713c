use crate::types::{OsvrPoseReport, OsvrTimeValue, PoseSample};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};

/// Capacity of the pose channel. Once full, the oldest sample is evicted.
pub const POSE_CHANNEL_CAPACITY: usize = 256;

/// Destination of pose callbacks.
///
/// Samples are only queued after a receiver has been handed out through
/// [`PoseSink::subscribe`]; until then each pose is logged and dropped.
/// A pointer to the sink is registered as the callback's userdata, so it
/// must outlive the context the callback is registered on.
pub struct PoseSink {
    sender: Sender<PoseSample>,
    // Kept to evict the oldest sample when the queue is full.
    receiver: Receiver<PoseSample>,
    subscribed: AtomicBool,
    log_poses: bool,
}

impl PoseSink {
    pub fn new(log_poses: bool) -> Self {
        Self::with_capacity(POSE_CHANNEL_CAPACITY, log_poses)
    }

    pub fn with_capacity(capacity: usize, log_poses: bool) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self {
            sender,
            receiver,
            subscribed: AtomicBool::new(false),
            log_poses,
        }
    }

    /// Receiver for published samples. Clones share one queue.
    pub fn subscribe(&self) -> Receiver<PoseSample> {
        self.subscribed.store(true, Ordering::Release);
        self.receiver.clone()
    }

    pub fn publish(&self, sample: PoseSample) {
        if self.log_poses {
            emit_pose_line(&sample);
        }
        if !self.subscribed.load(Ordering::Acquire) {
            return;
        }

        if let Err(TrySendError::Full(sample)) = self.sender.try_send(sample) {
            log::trace!("Pose channel full, dropping oldest sample");
            let _ = self.receiver.try_recv();
            let _ = self.sender.try_send(sample);
        }
    }

    /// Discard every queued sample.
    pub fn drain(&self) {
        let dropped = self.receiver.try_iter().count();
        if dropped > 0 {
            log::debug!("Discarded {} queued pose samples", dropped);
        }
    }

    pub fn as_userdata(&self) -> *mut c_void {
        self as *const PoseSink as *mut c_void
    }
}

/// One-line text rendering of a pose: translation, then w and the vector part.
pub fn format_pose(sample: &PoseSample) -> String {
    let [tx, ty, tz] = sample.translation;
    let [w, x, y, z] = sample.rotation;
    format!(
        "Got POSE report: Position = ({}, {}, {}), orientation = ({}, ({}, {}, {}))",
        tx, ty, tz, w, x, y, z
    )
}

#[cfg(test)]
thread_local! {
    static EMITTED_LINES: std::cell::RefCell<Vec<String>> = const { std::cell::RefCell::new(Vec::new()) };
}

/// Pose lines emitted on the current thread since the last call.
#[cfg(test)]
pub(crate) fn take_emitted_lines() -> Vec<String> {
    EMITTED_LINES.with(|lines| lines.take())
}

fn emit_pose_line(sample: &PoseSample) {
    let line = format_pose(sample);
    #[cfg(test)]
    EMITTED_LINES.with(|lines| lines.borrow_mut().push(line.clone()));
    log::info!("{}", line);
}

/// Pose callback registered on the display interface.
///
/// # Safety
/// `userdata` must be null or point to a live [`PoseSink`]; `timestamp` and
/// `report` must be null or valid for the duration of the call.
pub unsafe extern "C" fn hmd_tracker_callback(
    userdata: *mut c_void,
    timestamp: *const OsvrTimeValue,
    report: *const OsvrPoseReport,
) {
    if report.is_null() {
        return;
    }
    let timestamp = if timestamp.is_null() {
        OsvrTimeValue::default()
    } else {
        *timestamp
    };
    let sample = PoseSample::from_report(&timestamp, &*report);

    match (userdata as *const PoseSink).as_ref() {
        Some(sink) => sink.publish(sample),
        None => emit_pose_line(&sample),
    }
}
