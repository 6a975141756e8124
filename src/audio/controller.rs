//! The seam between switching logic and the OS audio subsystem.
//!
//! The orchestrator and the app loop talk to the audio system only through
//! [`DeviceController`], so tests can drive them with an in-memory
//! implementation and the Windows MMDevice implementation stays in its own
//! module.

use super::device::{AudioError, DeviceId, DeviceRole, DeviceState, PlaybackDevice};

/// Enumerate playback devices and change role defaults.
///
/// `set_default` and `set_default_communications` return `false` on failure
/// rather than an error: a rejected switch is an expected outcome that the
/// retry loops step over, not an exceptional condition.
pub trait DeviceController: Send + Sync {
    /// All playback devices currently in the given state.
    fn playback_devices(&self, state: DeviceState) -> Result<Vec<PlaybackDevice>, AudioError>;

    /// Look up a single device by id. `None` when it does not resolve.
    fn device(&self, id: &DeviceId) -> Option<PlaybackDevice>;

    /// Id of the current default device for the role, if any.
    fn default_device(&self, role: DeviceRole) -> Option<DeviceId>;

    /// Make the device the Console/Multimedia default. True on success.
    fn set_default(&self, id: &DeviceId) -> bool;

    /// Make the device the Communications default. True on success.
    fn set_default_communications(&self, id: &DeviceId) -> bool;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// In-memory controller for orchestrator and app tests. Devices listed
    /// in `failing` reject switches the way a broken endpoint would.
    pub struct MockController {
        pub devices: Mutex<Vec<PlaybackDevice>>,
        pub failing: Vec<DeviceId>,
        pub set_default_calls: Mutex<Vec<DeviceId>>,
        pub set_comm_calls: Mutex<Vec<DeviceId>>,
        pub comm_fails: bool,
    }

    impl MockController {
        pub fn new(named: Vec<(DeviceId, &str)>, default: Option<DeviceId>) -> Self {
            let devices = named
                .into_iter()
                .map(|(id, name)| {
                    let mut d = PlaybackDevice::new(id.clone(), name);
                    d.is_default = Some(&id) == default.as_ref();
                    d
                })
                .collect();
            Self {
                devices: Mutex::new(devices),
                failing: Vec::new(),
                set_default_calls: Mutex::new(Vec::new()),
                set_comm_calls: Mutex::new(Vec::new()),
                comm_fails: false,
            }
        }

        pub fn attempts(&self) -> Vec<DeviceId> {
            self.set_default_calls.lock().unwrap().clone()
        }
    }

    impl DeviceController for MockController {
        fn playback_devices(&self, _state: DeviceState) -> Result<Vec<PlaybackDevice>, AudioError> {
            Ok(self.devices.lock().unwrap().clone())
        }

        fn device(&self, id: &DeviceId) -> Option<PlaybackDevice> {
            self.devices
                .lock()
                .unwrap()
                .iter()
                .find(|d| &d.id == id)
                .cloned()
        }

        fn default_device(&self, role: DeviceRole) -> Option<DeviceId> {
            let devices = self.devices.lock().unwrap();
            devices
                .iter()
                .find(|d| match role {
                    DeviceRole::Communications => d.is_default_communication,
                    _ => d.is_default,
                })
                .map(|d| d.id.clone())
        }

        fn set_default(&self, id: &DeviceId) -> bool {
            self.set_default_calls.lock().unwrap().push(id.clone());
            if self.failing.contains(id) {
                return false;
            }
            let mut devices = self.devices.lock().unwrap();
            for d in devices.iter_mut() {
                d.is_default = &d.id == id;
            }
            true
        }

        fn set_default_communications(&self, id: &DeviceId) -> bool {
            self.set_comm_calls.lock().unwrap().push(id.clone());
            if self.comm_fails {
                return false;
            }
            let mut devices = self.devices.lock().unwrap();
            for d in devices.iter_mut() {
                d.is_default_communication = &d.id == id;
            }
            true
        }
    }
}
