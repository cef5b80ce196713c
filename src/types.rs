/// Timestamp as delivered by the OSVR client (`OSVR_TimeValue`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OsvrTimeValue {
    pub seconds: i64,
    pub microseconds: i32,
}

/// Translation in meters (`OSVR_Vec3`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OsvrVec3 {
    pub data: [f64; 3],
}

/// Unit quaternion (`OSVR_Quaternion`). Component order on the wire is [w, x, y, z].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OsvrQuaternion {
    pub data: [f64; 4],
}

impl OsvrQuaternion {
    pub const IDENTITY: OsvrQuaternion = OsvrQuaternion {
        data: [1.0, 0.0, 0.0, 0.0],
    };
}

impl Default for OsvrQuaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position and orientation (`OSVR_PoseState`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OsvrPoseState {
    pub translation: OsvrVec3,
    pub rotation: OsvrQuaternion,
}

/// Pose report handed to pose callbacks (`OSVR_PoseReport`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OsvrPoseReport {
    pub sensor: i32,
    pub pose: OsvrPoseState,
}

/// A single pose measurement, copied out of the callback arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub timestamp: OsvrTimeValue,
    pub sensor: i32,
    /// Translation in meters [x, y, z].
    pub translation: [f64; 3],
    /// Quaternion [w, x, y, z].
    pub rotation: [f64; 4],
}

impl PoseSample {
    pub fn from_report(timestamp: &OsvrTimeValue, report: &OsvrPoseReport) -> Self {
        Self {
            timestamp: *timestamp,
            sensor: report.sensor,
            translation: report.pose.translation.data,
            rotation: report.pose.rotation.data,
        }
    }
}

/// Error codes understood by the host runtime.
///
/// Only the codes this driver can produce are listed. Anything other than
/// [`HmdError::None`] returned from `Init` makes the host unload the driver.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmdError {
    None = 0,
    InitInterfaceNotFound = 105,
    InitInvalidInterface = 106,
    InitHmdNotFound = 108,
    DriverFailed = 200,
    DriverNotLoaded = 203,
}

impl HmdError {
    pub fn code(self) -> i32 {
        self as i32
    }
}
