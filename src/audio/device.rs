//! Audio device data models.
//!
//! Defines the core data structures for representing playback endpoints,
//! their state, roles, and change events.

use std::fmt;

use thiserror::Error;

/// Identifier of an audio endpoint, persisted as a braced GUID string
/// (`{8-4-4-4-12}` hex). The all-zero GUID marks an unbound binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DeviceId(String);

impl DeviceId {
    pub const NIL_GUID: &'static str = "{00000000-0000-0000-0000-000000000000}";

    /// Wrap an already-normalized braced GUID string.
    pub fn new(guid: impl Into<String>) -> Self {
        Self(guid.into())
    }

    /// The unbound (all-zero) identifier.
    pub fn nil() -> Self {
        Self(Self::NIL_GUID.to_string())
    }

    /// Parse a GUID in `8-4-4-4-12` hex form, braces optional. The result
    /// is normalized to braced lowercase. Returns `None` when the shape is
    /// wrong anywhere.
    pub fn parse_guid(text: &str) -> Option<Self> {
        let inner = text
            .strip_prefix('{')
            .and_then(|t| t.strip_suffix('}'))
            .unwrap_or(text);

        const GROUP_LENS: [usize; 5] = [8, 4, 4, 4, 12];
        let groups: Vec<&str> = inner.split('-').collect();
        if groups.len() != GROUP_LENS.len() {
            return None;
        }
        for (group, len) in groups.iter().zip(GROUP_LENS) {
            if group.len() != len || !group.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
        }

        Some(Self(format!("{{{}}}", inner.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty or all-zero identifier; such a value never
    /// resolves to a device and is excluded from persistence.
    pub fn is_nil(&self) -> bool {
        self.0.is_empty() || self.0 == Self::NIL_GUID
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A playback endpoint with its current default flags.
#[derive(Debug, Clone)]
pub struct PlaybackDevice {
    pub id: DeviceId,

    /// Human-readable device name (from device properties)
    pub name: String,

    /// Whether this is the default device for the Console role
    pub is_default: bool,

    /// Whether this is the default device for the Communications role
    pub is_default_communication: bool,

    pub state: DeviceState,
}

impl PlaybackDevice {
    pub fn new(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_default: false,
            is_default_communication: false,
            state: DeviceState::Active,
        }
    }
}

/// Audio device role (maps to the Windows ERole enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DeviceRole {
    /// Games, system sounds, most general applications
    Console = 0,

    /// Music players, video players
    Multimedia = 1,

    /// Teams, Zoom, Discord, and other VoIP applications
    Communications = 2,
}

/// Endpoint state flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Active,
    Disabled,
    NotPresent,
    Unplugged,
}

/// Events from the audio subsystem, delivered onto the app channel.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    DeviceAdded {
        device_id: DeviceId,
    },

    DeviceRemoved {
        device_id: DeviceId,
    },

    DeviceStateChanged {
        device_id: DeviceId,
        new_state: DeviceState,
    },

    /// Default device changed for a specific role. `None` if the role now
    /// has no default device.
    DefaultDeviceChanged {
        role: DeviceRole,
        device_id: Option<DeviceId>,
    },
}

/// Audio subsystem error types.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: DeviceId },

    #[error("No default device available")]
    NoDefaultDevice,

    #[cfg(windows)]
    #[error("COM initialization failed: {0}")]
    ComInitFailed(#[source] windows::core::Error),

    #[cfg(windows)]
    #[error("Failed to enumerate devices: {0}")]
    EnumerationFailed(#[source] windows::core::Error),

    #[cfg(windows)]
    #[error("Failed to set default device: {0}")]
    SetDefaultFailed(#[source] windows::core::Error),

    #[error("String conversion error: {0}")]
    StringConversion(String),
}
