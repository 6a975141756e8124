//! Windows implementation of [`DeviceController`] over the MMDevice API.

use windows::Win32::Devices::Properties::DEVPKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::{
    eCommunications, eConsole, eMultimedia, eRender, IMMDevice, IMMDeviceEnumerator,
    MMDeviceEnumerator, DEVICE_STATE, DEVICE_STATE_ACTIVE, DEVICE_STATE_DISABLED,
    DEVICE_STATE_NOTPRESENT, DEVICE_STATE_UNPLUGGED,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_APARTMENTTHREADED, STGM,
};
use windows::Win32::UI::Shell::PropertiesSystem::{IPropertyStore, PROPERTYKEY};

use super::controller::DeviceController;
use super::device::{AudioError, DeviceId, DeviceRole, DeviceState, PlaybackDevice};
use super::policy;

/// COM initialization guard that uninitializes COM on drop.
pub struct ComGuard {
    initialized: bool,
}

impl ComGuard {
    /// Initialize COM for the current thread.
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            CoInitializeEx(None, COINIT_APARTMENTTHREADED)
                .ok()
                .map_err(AudioError::ComInitFailed)?;
        }
        Ok(Self { initialized: true })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// Extract the trailing GUID from a full MMDevice endpoint id string
/// (`{0.0.0.00000000}.{guid}`).
pub(crate) fn endpoint_guid(endpoint_id: &str) -> Option<DeviceId> {
    let brace = endpoint_id.rfind('{')?;
    DeviceId::parse_guid(&endpoint_id[brace..])
}

fn state_flags(state: DeviceState) -> DEVICE_STATE {
    match state {
        DeviceState::Active => DEVICE_STATE_ACTIVE,
        DeviceState::Disabled => DEVICE_STATE_DISABLED,
        DeviceState::NotPresent => DEVICE_STATE_NOTPRESENT,
        DeviceState::Unplugged => DEVICE_STATE_UNPLUGGED,
    }
}

/// MMDevice-backed playback device controller.
pub struct WindowsDeviceController {
    enumerator: IMMDeviceEnumerator,
}

impl WindowsDeviceController {
    /// Note: COM must be initialized on this thread first (see [`ComGuard`]).
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(AudioError::EnumerationFailed)?;
            Ok(Self { enumerator })
        }
    }

    pub fn raw_enumerator(&self) -> &IMMDeviceEnumerator {
        &self.enumerator
    }

    /// Resolve a device GUID back to the full endpoint id string the policy
    /// interface needs.
    fn endpoint_id_for(&self, id: &DeviceId) -> Option<String> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(eRender, DEVICE_STATE_ACTIVE)
                .ok()?;
            let count = collection.GetCount().ok()?;
            for i in 0..count {
                let device = collection.Item(i).ok()?;
                let endpoint_id = device.GetId().ok()?.to_string().ok()?;
                if endpoint_guid(&endpoint_id).as_ref() == Some(id) {
                    return Some(endpoint_id);
                }
            }
            None
        }
    }

    fn device_to_playback(
        &self,
        device: &IMMDevice,
        default_console: &Option<DeviceId>,
        default_comm: &Option<DeviceId>,
        state: DeviceState,
    ) -> Result<PlaybackDevice, AudioError> {
        unsafe {
            let endpoint_id = device
                .GetId()
                .map_err(AudioError::EnumerationFailed)?
                .to_string()
                .map_err(|e| AudioError::StringConversion(e.to_string()))?;
            let id = endpoint_guid(&endpoint_id).ok_or_else(|| {
                AudioError::StringConversion(format!("no GUID in endpoint id {endpoint_id:?}"))
            })?;

            let props: IPropertyStore = device
                .OpenPropertyStore(STGM(0))
                .map_err(AudioError::EnumerationFailed)?;
            let name = friendly_name(&props).unwrap_or_else(|| "Unknown".to_string());

            Ok(PlaybackDevice {
                is_default: default_console.as_ref() == Some(&id),
                is_default_communication: default_comm.as_ref() == Some(&id),
                id,
                name,
                state,
            })
        }
    }
}

impl DeviceController for WindowsDeviceController {
    fn playback_devices(&self, state: DeviceState) -> Result<Vec<PlaybackDevice>, AudioError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(eRender, state_flags(state))
                .map_err(AudioError::EnumerationFailed)?;
            let count = collection
                .GetCount()
                .map_err(AudioError::EnumerationFailed)?;

            let default_console = self.default_device(DeviceRole::Console);
            let default_comm = self.default_device(DeviceRole::Communications);

            let mut devices = Vec::with_capacity(count as usize);
            for i in 0..count {
                let device = collection.Item(i).map_err(AudioError::EnumerationFailed)?;
                match self.device_to_playback(&device, &default_console, &default_comm, state) {
                    Ok(playback) => devices.push(playback),
                    Err(e) => tracing::debug!(error = %e, "skipping unreadable endpoint"),
                }
            }
            Ok(devices)
        }
    }

    fn device(&self, id: &DeviceId) -> Option<PlaybackDevice> {
        self.playback_devices(DeviceState::Active)
            .ok()?
            .into_iter()
            .find(|d| &d.id == id)
    }

    fn default_device(&self, role: DeviceRole) -> Option<DeviceId> {
        unsafe {
            let erole = match role {
                DeviceRole::Console => eConsole,
                DeviceRole::Multimedia => eMultimedia,
                DeviceRole::Communications => eCommunications,
            };
            let device = self.enumerator.GetDefaultAudioEndpoint(eRender, erole).ok()?;
            let endpoint_id = device.GetId().ok()?.to_string().ok()?;
            endpoint_guid(&endpoint_id)
        }
    }

    fn set_default(&self, id: &DeviceId) -> bool {
        let Some(endpoint_id) = self.endpoint_id_for(id) else {
            tracing::debug!(device = %id, "no active endpoint for device");
            return false;
        };
        match policy::set_default_endpoint(
            &endpoint_id,
            &[DeviceRole::Console, DeviceRole::Multimedia],
        ) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(device = %id, error = %e, "SetDefaultEndpoint failed");
                false
            }
        }
    }

    fn set_default_communications(&self, id: &DeviceId) -> bool {
        let Some(endpoint_id) = self.endpoint_id_for(id) else {
            return false;
        };
        match policy::set_default_endpoint(&endpoint_id, &[DeviceRole::Communications]) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(device = %id, error = %e, "communications SetDefaultEndpoint failed");
                false
            }
        }
    }
}

/// Friendly name from a device property store.
fn friendly_name(props: &IPropertyStore) -> Option<String> {
    unsafe {
        let key = PROPERTYKEY {
            fmtid: DEVPKEY_Device_FriendlyName.fmtid,
            pid: DEVPKEY_Device_FriendlyName.pid,
        };
        let prop = props.GetValue(&key).ok()?;
        let name = prop.to_string();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}
