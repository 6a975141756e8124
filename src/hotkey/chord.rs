//! Hotkey chord model.
//!
//! A chord is a virtual-key code plus a modifier bitmask. The integer
//! representations follow the Win32 `RegisterHotKey` convention, which is
//! also the persisted wire format: ALT=1, CONTROL=2, SHIFT=4, WIN=8.

use std::fmt;

use global_hotkey::hotkey::{Code, HotKey, Modifiers as GhkModifiers};

/// Windows virtual-key code. Zero means "no key bound".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VirtualKey(pub u32);

impl VirtualKey {
    pub const NONE: VirtualKey = VirtualKey(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Modifier bitmask in `RegisterHotKey` encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierSet(pub u32);

impl ModifierSet {
    pub const NONE: ModifierSet = ModifierSet(0);
    pub const ALT: ModifierSet = ModifierSet(1);
    pub const CONTROL: ModifierSet = ModifierSet(2);
    pub const SHIFT: ModifierSet = ModifierSet(4);
    pub const WIN: ModifierSet = ModifierSet(8);

    pub fn contains(self, other: ModifierSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: ModifierSet) -> ModifierSet {
        ModifierSet(self.0 | other.0)
    }
}

impl fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (bit, name) in [
            (ModifierSet::CONTROL, "Ctrl"),
            (ModifierSet::ALT, "Alt"),
            (ModifierSet::SHIFT, "Shift"),
            (ModifierSet::WIN, "Win"),
        ] {
            if self.contains(bit) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A key + modifier combination identifying a hotkey binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Chord {
    pub key: VirtualKey,
    pub modifiers: ModifierSet,
}

impl Chord {
    pub fn new(key: VirtualKey, modifiers: ModifierSet) -> Self {
        Self { key, modifiers }
    }

    /// True when no key is bound. Such a chord is never persisted or
    /// registered.
    pub fn is_empty(self) -> bool {
        self.key.is_none()
    }

    /// Convert to the `global-hotkey` representation. Returns `None` for a
    /// virtual-key code that has no stable `Code` equivalent; such chords
    /// cannot be registered with the OS.
    pub fn to_os_hotkey(self) -> Option<HotKey> {
        let code = vk_to_code(self.key)?;
        let mut mods = GhkModifiers::empty();
        if self.modifiers.contains(ModifierSet::ALT) {
            mods |= GhkModifiers::ALT;
        }
        if self.modifiers.contains(ModifierSet::CONTROL) {
            mods |= GhkModifiers::CONTROL;
        }
        if self.modifiers.contains(ModifierSet::SHIFT) {
            mods |= GhkModifiers::SHIFT;
        }
        if self.modifiers.contains(ModifierSet::WIN) {
            mods |= GhkModifiers::META;
        }
        let mods = if mods.is_empty() { None } else { Some(mods) };
        Some(HotKey::new(mods, code))
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers != ModifierSet::NONE {
            write!(f, "{}+", self.modifiers)?;
        }
        match key_name(self.key) {
            Some(name) => f.write_str(name),
            None => write!(f, "VK{}", self.key.0),
        }
    }
}

/// Friendly name for common virtual keys, used in logs and display lists.
fn key_name(key: VirtualKey) -> Option<&'static str> {
    Some(match key.0 {
        8 => "Backspace",
        9 => "Tab",
        13 => "Enter",
        27 => "Esc",
        32 => "Space",
        33 => "PageUp",
        34 => "PageDown",
        35 => "End",
        36 => "Home",
        37 => "Left",
        38 => "Up",
        39 => "Right",
        40 => "Down",
        45 => "Insert",
        46 => "Delete",
        48 => "0",
        49 => "1",
        50 => "2",
        51 => "3",
        52 => "4",
        53 => "5",
        54 => "6",
        55 => "7",
        56 => "8",
        57 => "9",
        65 => "A",
        66 => "B",
        67 => "C",
        68 => "D",
        69 => "E",
        70 => "F",
        71 => "G",
        72 => "H",
        73 => "I",
        74 => "J",
        75 => "K",
        76 => "L",
        77 => "M",
        78 => "N",
        79 => "O",
        80 => "P",
        81 => "Q",
        82 => "R",
        83 => "S",
        84 => "T",
        85 => "U",
        86 => "V",
        87 => "W",
        88 => "X",
        89 => "Y",
        90 => "Z",
        112 => "F1",
        113 => "F2",
        114 => "F3",
        115 => "F4",
        116 => "F5",
        117 => "F6",
        118 => "F7",
        119 => "F8",
        120 => "F9",
        121 => "F10",
        122 => "F11",
        123 => "F12",
        173 => "VolumeMute",
        174 => "VolumeDown",
        175 => "VolumeUp",
        176 => "MediaNext",
        177 => "MediaPrev",
        178 => "MediaStop",
        179 => "MediaPlayPause",
        _ => return None,
    })
}

/// Map a Windows virtual-key code to a `global-hotkey` key code.
fn vk_to_code(key: VirtualKey) -> Option<Code> {
    Some(match key.0 {
        8 => Code::Backspace,
        9 => Code::Tab,
        13 => Code::Enter,
        19 => Code::Pause,
        20 => Code::CapsLock,
        27 => Code::Escape,
        32 => Code::Space,
        33 => Code::PageUp,
        34 => Code::PageDown,
        35 => Code::End,
        36 => Code::Home,
        37 => Code::ArrowLeft,
        38 => Code::ArrowUp,
        39 => Code::ArrowRight,
        40 => Code::ArrowDown,
        44 => Code::PrintScreen,
        45 => Code::Insert,
        46 => Code::Delete,
        48 => Code::Digit0,
        49 => Code::Digit1,
        50 => Code::Digit2,
        51 => Code::Digit3,
        52 => Code::Digit4,
        53 => Code::Digit5,
        54 => Code::Digit6,
        55 => Code::Digit7,
        56 => Code::Digit8,
        57 => Code::Digit9,
        65 => Code::KeyA,
        66 => Code::KeyB,
        67 => Code::KeyC,
        68 => Code::KeyD,
        69 => Code::KeyE,
        70 => Code::KeyF,
        71 => Code::KeyG,
        72 => Code::KeyH,
        73 => Code::KeyI,
        74 => Code::KeyJ,
        75 => Code::KeyK,
        76 => Code::KeyL,
        77 => Code::KeyM,
        78 => Code::KeyN,
        79 => Code::KeyO,
        80 => Code::KeyP,
        81 => Code::KeyQ,
        82 => Code::KeyR,
        83 => Code::KeyS,
        84 => Code::KeyT,
        85 => Code::KeyU,
        86 => Code::KeyV,
        87 => Code::KeyW,
        88 => Code::KeyX,
        89 => Code::KeyY,
        90 => Code::KeyZ,
        96 => Code::Numpad0,
        97 => Code::Numpad1,
        98 => Code::Numpad2,
        99 => Code::Numpad3,
        100 => Code::Numpad4,
        101 => Code::Numpad5,
        102 => Code::Numpad6,
        103 => Code::Numpad7,
        104 => Code::Numpad8,
        105 => Code::Numpad9,
        106 => Code::NumpadMultiply,
        107 => Code::NumpadAdd,
        109 => Code::NumpadSubtract,
        110 => Code::NumpadDecimal,
        111 => Code::NumpadDivide,
        112 => Code::F1,
        113 => Code::F2,
        114 => Code::F3,
        115 => Code::F4,
        116 => Code::F5,
        117 => Code::F6,
        118 => Code::F7,
        119 => Code::F8,
        120 => Code::F9,
        121 => Code::F10,
        122 => Code::F11,
        123 => Code::F12,
        124 => Code::F13,
        125 => Code::F14,
        126 => Code::F15,
        127 => Code::F16,
        128 => Code::F17,
        129 => Code::F18,
        130 => Code::F19,
        131 => Code::F20,
        132 => Code::F21,
        133 => Code::F22,
        134 => Code::F23,
        135 => Code::F24,
        145 => Code::ScrollLock,
        173 => Code::AudioVolumeMute,
        174 => Code::AudioVolumeDown,
        175 => Code::AudioVolumeUp,
        176 => Code::MediaTrackNext,
        177 => Code::MediaTrackPrevious,
        178 => Code::MediaStop,
        179 => Code::MediaPlayPause,
        186 => Code::Semicolon,
        187 => Code::Equal,
        188 => Code::Comma,
        189 => Code::Minus,
        190 => Code::Period,
        191 => Code::Slash,
        192 => Code::Backquote,
        219 => Code::BracketLeft,
        220 => Code::Backslash,
        221 => Code::BracketRight,
        222 => Code::Quote,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_display_order() {
        let mods = ModifierSet::ALT.union(ModifierSet::CONTROL);
        assert_eq!(mods.to_string(), "Ctrl+Alt");
    }

    #[test]
    fn chord_display() {
        let chord = Chord::new(VirtualKey(65), ModifierSet::CONTROL);
        assert_eq!(chord.to_string(), "Ctrl+A");

        let bare = Chord::new(VirtualKey(250), ModifierSet::NONE);
        assert_eq!(bare.to_string(), "VK250");
    }

    #[test]
    fn os_hotkey_mapping() {
        let chord = Chord::new(VirtualKey(65), ModifierSet::CONTROL.union(ModifierSet::SHIFT));
        let hk = chord.to_os_hotkey().unwrap();
        assert_eq!(hk.key, Code::KeyA);
        assert!(hk.mods.contains(GhkModifiers::CONTROL));
        assert!(hk.mods.contains(GhkModifiers::SHIFT));
        assert!(!hk.mods.contains(GhkModifiers::ALT));
    }

    #[test]
    fn unmappable_key_is_rejected() {
        let chord = Chord::new(VirtualKey(7), ModifierSet::NONE);
        assert!(chord.to_os_hotkey().is_none());
    }
}
