//! Device change notifications using IMMNotificationClient.
//!
//! The COM callbacks arrive on a system thread; each one is converted to a
//! [`DeviceEvent`] and forwarded over the app channel so the single-writer
//! loop can react without any shared mutable state.

use crossbeam_channel::Sender;
use windows::core::{implement, PCWSTR};
use windows::Win32::Media::Audio::{
    eCommunications, eConsole, eRender, EDataFlow, ERole, IMMDeviceEnumerator,
    IMMNotificationClient, IMMNotificationClient_Impl, DEVICE_STATE,
};
// Re-export windows_core so the implement macro can find it
#[allow(unused_imports)]
use windows_core;

use super::device::{DeviceEvent, DeviceId, DeviceRole, DeviceState};
use super::enumerator::endpoint_guid;

/// Notification client that forwards playback device events to a channel.
#[implement(IMMNotificationClient)]
pub struct DeviceNotificationClient {
    sender: Sender<DeviceEvent>,
}

impl DeviceNotificationClient {
    pub fn new(sender: Sender<DeviceEvent>) -> Self {
        Self { sender }
    }

    /// Register with an enumerator. Takes ownership of self because the COM
    /// interface needs to own the data; keep the returned interface alive
    /// for as long as events are wanted.
    pub fn register(
        self,
        enumerator: &IMMDeviceEnumerator,
    ) -> Result<IMMNotificationClient, windows::core::Error> {
        unsafe {
            let client: IMMNotificationClient = self.into();
            enumerator.RegisterEndpointNotificationCallback(&client)?;
            Ok(client)
        }
    }

    fn convert_role(role: ERole) -> DeviceRole {
        if role == eConsole {
            DeviceRole::Console
        } else if role == eCommunications {
            DeviceRole::Communications
        } else {
            DeviceRole::Multimedia
        }
    }

    fn convert_state(state: DEVICE_STATE) -> DeviceState {
        match state.0 {
            1 => DeviceState::Active,
            2 => DeviceState::Disabled,
            8 => DeviceState::Unplugged,
            _ => DeviceState::NotPresent,
        }
    }
}

fn device_id_from(pwstr: &PCWSTR) -> Option<DeviceId> {
    unsafe {
        if pwstr.is_null() {
            return None;
        }
        let endpoint_id = pwstr.to_string().ok()?;
        endpoint_guid(&endpoint_id)
    }
}

impl IMMNotificationClient_Impl for DeviceNotificationClient_Impl {
    fn OnDeviceStateChanged(
        &self,
        pwstrdeviceid: &PCWSTR,
        dwnewstate: DEVICE_STATE,
    ) -> windows::core::Result<()> {
        if let Some(device_id) = device_id_from(pwstrdeviceid) {
            let _ = self.sender.send(DeviceEvent::DeviceStateChanged {
                device_id,
                new_state: DeviceNotificationClient::convert_state(dwnewstate),
            });
        }
        Ok(())
    }

    fn OnDeviceAdded(&self, pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        if let Some(device_id) = device_id_from(pwstrdeviceid) {
            let _ = self.sender.send(DeviceEvent::DeviceAdded { device_id });
        }
        Ok(())
    }

    fn OnDeviceRemoved(&self, pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        if let Some(device_id) = device_id_from(pwstrdeviceid) {
            let _ = self.sender.send(DeviceEvent::DeviceRemoved { device_id });
        }
        Ok(())
    }

    fn OnDefaultDeviceChanged(
        &self,
        flow: EDataFlow,
        role: ERole,
        pwstrdefaultdeviceid: &PCWSTR,
    ) -> windows::core::Result<()> {
        // Only playback devices matter here.
        if flow != eRender {
            return Ok(());
        }
        let _ = self.sender.send(DeviceEvent::DefaultDeviceChanged {
            role: DeviceNotificationClient::convert_role(role),
            device_id: device_id_from(pwstrdefaultdeviceid),
        });
        Ok(())
    }

    fn OnPropertyValueChanged(
        &self,
        _pwstrdeviceid: &PCWSTR,
        _key: &windows::Win32::UI::Shell::PropertiesSystem::PROPERTYKEY,
    ) -> windows::core::Result<()> {
        Ok(())
    }
}
