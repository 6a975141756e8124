//! Global hotkey handling: chord model, persisted encodings, OS backend,
//! and the binding registry.

pub mod backend;
pub mod chord;
pub mod encoding;
pub mod registry;

pub use backend::{GlobalHotkeyBackend, HotkeyError, HotkeyHandle, HotkeySource};
pub use chord::{Chord, ModifierSet, VirtualKey};
pub use registry::{HotKeyBinding, HotKeyRegistry, PressTarget, VisibleHotKey};
