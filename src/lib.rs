//! AudioSwitch - Library
//!
//! A background utility for switching the default Windows playback device.
//!
//! ## Features
//!
//! - Bind global hotkeys to "make this device the default" actions
//! - Single-key quick switch rotating through favourite devices
//! - Dual-switch mode that also moves the Communications role
//! - Flat textual persistence that survives partial corruption
//! - Automatic reaction to device hot-plug events

pub mod app;
pub mod audio;
pub mod favourites;
pub mod hotkey;
pub mod settings;
pub mod switching;

pub use app::{run_event_loop, AppEvent, AppState};
pub use audio::{AudioError, DeviceController, DeviceEvent, DeviceId, PlaybackDevice};
pub use favourites::FavouriteDeviceManager;
pub use hotkey::{Chord, HotKeyRegistry, HotkeySource, ModifierSet, PressTarget, VirtualKey};
pub use settings::{JsonSettings, SettingsError};
pub use switching::{DeviceSwitchOrchestrator, SwitchOutcome};
