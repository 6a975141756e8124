//! OS-level hotkey registration and press delivery.
//!
//! [`HotkeySource`] is the seam between the registry and the OS: the real
//! implementation wraps `global-hotkey`, tests use an in-memory source.
//! Presses arrive on the library's own listener thread and are forwarded
//! onto the app channel, preserving the single-writer discipline: nothing
//! on the delivery path touches registry state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use thiserror::Error;

use super::chord::Chord;

/// Opaque handle for a registered hotkey, used to correlate press events
/// back to the originating binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyHandle(pub u32);

#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("no OS key mapping for chord {chord}")]
    Unmappable { chord: Chord },

    /// The OS rejected the chord, typically because another process (or
    /// this one) already claimed it system-wide.
    #[error("OS rejected hotkey {chord}: {message}")]
    Rejected { chord: Chord, message: String },

    #[error("hotkey backend unavailable: {0}")]
    Backend(String),
}

/// The consumed OS hotkey capability: register a chord, get back a handle,
/// release it later. Every acquired handle must be released on delete,
/// reload, and shutdown. Implementations stay on the single-writer thread
/// that created them.
pub trait HotkeySource {
    fn register(&mut self, chord: Chord) -> Result<HotkeyHandle, HotkeyError>;
    fn unregister(&mut self, handle: HotkeyHandle) -> Result<(), HotkeyError>;
}

/// Production implementation backed by `global-hotkey`.
pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    registered: HashMap<HotkeyHandle, HotKey>,
}

impl GlobalHotkeyBackend {
    pub fn new() -> Result<Self, HotkeyError> {
        let manager =
            GlobalHotKeyManager::new().map_err(|e| HotkeyError::Backend(e.to_string()))?;
        Ok(Self {
            manager,
            registered: HashMap::new(),
        })
    }
}

impl HotkeySource for GlobalHotkeyBackend {
    fn register(&mut self, chord: Chord) -> Result<HotkeyHandle, HotkeyError> {
        let hotkey = chord
            .to_os_hotkey()
            .ok_or(HotkeyError::Unmappable { chord })?;
        self.manager
            .register(hotkey)
            .map_err(|e| HotkeyError::Rejected {
                chord,
                message: e.to_string(),
            })?;
        let handle = HotkeyHandle(hotkey.id());
        self.registered.insert(handle, hotkey);
        Ok(handle)
    }

    fn unregister(&mut self, handle: HotkeyHandle) -> Result<(), HotkeyError> {
        let Some(hotkey) = self.registered.remove(&handle) else {
            return Ok(());
        };
        self.manager
            .unregister(hotkey)
            .map_err(|e| HotkeyError::Backend(e.to_string()))
    }
}

impl Drop for GlobalHotkeyBackend {
    fn drop(&mut self) {
        for (_, hotkey) in self.registered.drain() {
            let _ = self.manager.unregister(hotkey);
        }
    }
}

/// Forward OS press events onto the app channel from a dedicated thread.
///
/// Only `Pressed` transitions are forwarded, one send per OS-delivered
/// press. `disabled` is the process-wide "hotkey function disabled" flag;
/// it is a single idempotent bit, so a relaxed read on the delivery path
/// is enough. The thread exits when the app side hangs up.
pub fn spawn_press_pump(
    tx: Sender<HotkeyHandle>,
    disabled: Arc<AtomicBool>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("hotkey-press-pump".into())
        .spawn(move || {
            let receiver = GlobalHotKeyEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if event.state() != HotKeyState::Pressed {
                    continue;
                }
                if disabled.load(Ordering::Relaxed) {
                    tracing::debug!(id = event.id(), "hotkeys disabled, dropping press");
                    continue;
                }
                if tx.send(HotkeyHandle(event.id())).is_err() {
                    break;
                }
            }
        })
}
