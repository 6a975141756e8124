//! Audio subsystem: device models, the controller seam, and the Windows
//! MMDevice/IPolicyConfig implementations.

pub mod controller;
pub mod device;

#[cfg(windows)]
pub mod enumerator;
#[cfg(windows)]
pub mod notifications;
#[cfg(windows)]
pub mod policy;

pub use controller::DeviceController;
pub use device::{AudioError, DeviceEvent, DeviceId, DeviceRole, DeviceState, PlaybackDevice};

#[cfg(windows)]
pub use enumerator::{ComGuard, WindowsDeviceController};
#[cfg(windows)]
pub use notifications::DeviceNotificationClient;
