//! The hotkey registry: binding lifecycle, conflict detection, persistence.
//!
//! Owns every binding and its OS registration handle. Chords are unique
//! across the per-device bindings and the single quick-switch binding.
//! Mutations re-register with the OS and write through to the settings
//! store; persistence failures are hard errors, OS rejections are reported
//! as a plain `false`.

use std::sync::Arc;

use crate::audio::DeviceId;
use crate::settings::{keys, JsonSettings, SettingsError};

use super::backend::{HotkeyHandle, HotkeySource};
use super::chord::Chord;
use super::encoding;

/// One binding of a chord to a target device.
#[derive(Debug)]
pub struct HotKeyBinding {
    pub chord: Chord,
    pub device_id: DeviceId,
    handle: Option<HotkeyHandle>,
}

impl HotKeyBinding {
    /// Whether the OS currently delivers presses for this binding.
    pub fn is_registered(&self) -> bool {
        self.handle.is_some()
    }
}

/// What a press resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PressTarget {
    /// A per-device binding targeting this device.
    Device(DeviceId),

    /// The device-agnostic quick-switch binding.
    QuickSwitch,
}

/// Display-oriented row recomputed by [`HotKeyRegistry::refresh_visible`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleHotKey {
    pub chord: Chord,
    pub device_id: DeviceId,
    pub device_known: bool,
}

pub struct HotKeyRegistry {
    source: Box<dyn HotkeySource>,
    settings: Arc<JsonSettings>,
    bindings: Vec<HotKeyBinding>,
    quick_switch: Option<HotKeyBinding>,
    visible: Vec<VisibleHotKey>,
}

impl HotKeyRegistry {
    pub fn new(source: Box<dyn HotkeySource>, settings: Arc<JsonSettings>) -> Self {
        Self {
            source,
            settings,
            bindings: Vec::new(),
            quick_switch: None,
            visible: Vec::new(),
        }
    }

    pub fn bindings(&self) -> &[HotKeyBinding] {
        &self.bindings
    }

    pub fn quick_switch_chord(&self) -> Option<Chord> {
        self.quick_switch.as_ref().map(|b| b.chord)
    }

    pub fn visible(&self) -> &[VisibleHotKey] {
        &self.visible
    }

    /// Reload all bindings from the settings store, releasing all current
    /// OS registrations first. Malformed persisted records are skipped one
    /// at a time; the rest of the load proceeds.
    pub fn load(&mut self) {
        self.unregister_all();
        self.bindings.clear();
        self.quick_switch = None;

        let data = self.settings.get(keys::HOTKEYS).unwrap_or_default();
        for record in encoding::parse_hotkeys(&data) {
            match record {
                Ok((chord, device_id)) => {
                    let handle = self.register_with_os(chord);
                    self.bindings.push(HotKeyBinding {
                        chord,
                        device_id,
                        handle,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping corrupt hotkey entry");
                }
            }
        }

        let quick = self
            .settings
            .get(keys::QUICK_SWITCH_HOTKEY)
            .unwrap_or_default();
        match encoding::parse_quick_switch(&quick) {
            Ok(Some(chord)) => {
                // The chord survives in settings even while the feature is
                // toggled off; only the OS registration is skipped.
                let handle = if self.quick_switch_enabled() {
                    self.register_with_os(chord)
                } else {
                    None
                };
                self.quick_switch = Some(HotKeyBinding {
                    chord,
                    device_id: DeviceId::nil(),
                    handle,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "skipping corrupt quick-switch entry");
            }
        }

        tracing::info!(
            bindings = self.bindings.len(),
            quick_switch = self.quick_switch.is_some(),
            "loaded hotkeys"
        );
    }

    /// Persist the current binding set. Entries with no key or a nil device
    /// id are dropped from the output. A store write failure is returned to
    /// the caller; a read-back mismatch is only logged.
    pub fn save(&self) -> Result<(), SettingsError> {
        let encoded =
            encoding::encode_hotkeys(self.bindings.iter().map(|b| (&b.chord, &b.device_id)));
        self.settings.set(keys::HOTKEYS, encoded.as_str())?;

        let quick = encoding::encode_quick_switch(self.quick_switch_chord());
        self.settings.set(keys::QUICK_SWITCH_HOTKEY, quick.as_str())?;

        let read_back = self.settings.get(keys::HOTKEYS);
        if read_back.as_deref() != Some(encoded.as_str()) {
            tracing::warn!(
                expected = %encoded,
                got = ?read_back,
                "saved hotkey data does not read back identically"
            );
        }
        Ok(())
    }

    /// True iff the chord equals an existing binding's or the quick-switch
    /// binding's chord.
    pub fn is_duplicate(&self, chord: Chord) -> bool {
        self.bindings.iter().any(|b| b.chord == chord)
            || self.quick_switch_chord() == Some(chord)
    }

    /// Add a per-device binding. `Ok(false)` when the chord is already in
    /// use in-app or the OS rejects the registration; `Err` only when the
    /// subsequent persistence write fails.
    pub fn add_hotkey(&mut self, chord: Chord, device_id: DeviceId) -> Result<bool, SettingsError> {
        if self.is_duplicate(chord) {
            tracing::debug!(%chord, "rejected duplicate hotkey");
            return Ok(false);
        }

        let Some(handle) = self.register_with_os(chord) else {
            return Ok(false);
        };

        self.bindings.push(HotKeyBinding {
            chord,
            device_id,
            handle: Some(handle),
        });
        self.save()?;
        Ok(true)
    }

    /// Remove the binding with this chord, releasing its OS registration.
    /// Returns whether a binding was removed.
    pub fn delete_hotkey(&mut self, chord: Chord) -> Result<bool, SettingsError> {
        let Some(index) = self.bindings.iter().position(|b| b.chord == chord) else {
            return Ok(false);
        };
        let mut binding = self.bindings.remove(index);
        if let Some(handle) = binding.handle.take() {
            if let Err(e) = self.source.unregister(handle) {
                tracing::warn!(%chord, error = %e, "failed to unregister hotkey");
            }
        }
        self.save()?;
        Ok(true)
    }

    /// Unregister everything including the quick-switch binding, clear the
    /// persisted strings, and reload (to an empty set).
    pub fn clear_all(&mut self) -> Result<(), SettingsError> {
        self.unregister_all();
        self.settings.set(keys::HOTKEYS, "")?;
        self.settings.set(keys::QUICK_SWITCH_HOTKEY, "")?;
        self.load();
        Ok(())
    }

    /// Bind the device-agnostic quick-switch chord, replacing any prior
    /// quick-switch binding. Same duplicate/registration contract as
    /// [`Self::add_hotkey`].
    pub fn set_quick_switch(&mut self, chord: Chord) -> Result<bool, SettingsError> {
        if self.bindings.iter().any(|b| b.chord == chord) {
            tracing::debug!(%chord, "rejected quick-switch chord already bound to a device");
            return Ok(false);
        }
        if self.quick_switch_chord() == Some(chord) {
            return Ok(true);
        }

        let Some(handle) = self.register_with_os(chord) else {
            return Ok(false);
        };

        if let Some(mut old) = self.quick_switch.take() {
            if let Some(old_handle) = old.handle.take() {
                if let Err(e) = self.source.unregister(old_handle) {
                    tracing::warn!(error = %e, "failed to unregister previous quick-switch hotkey");
                }
            }
        }
        self.quick_switch = Some(HotKeyBinding {
            chord,
            device_id: DeviceId::nil(),
            handle: Some(handle),
        });
        self.save()?;
        Ok(true)
    }

    pub fn quick_switch_enabled(&self) -> bool {
        self.settings.get_bool(keys::ENABLE_QUICK_SWITCH, true)
    }

    /// Toggle the quick-switch feature. Disabling releases the OS
    /// registration but keeps the chord; enabling re-registers it.
    pub fn set_quick_switch_enabled(&mut self, enabled: bool) -> Result<(), SettingsError> {
        self.settings.set_bool(keys::ENABLE_QUICK_SWITCH, enabled)?;
        if let Some(binding) = self.quick_switch.as_mut() {
            if enabled && binding.handle.is_none() {
                binding.handle = match self.source.register(binding.chord) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        tracing::warn!(chord = %binding.chord, error = %e,
                            "OS hotkey registration failed");
                        None
                    }
                };
            } else if !enabled {
                if let Some(handle) = binding.handle.take() {
                    let _ = self.source.unregister(handle);
                }
            }
        }
        Ok(())
    }

    /// Remove the quick-switch binding, if any.
    pub fn clear_quick_switch(&mut self) -> Result<(), SettingsError> {
        if let Some(mut old) = self.quick_switch.take() {
            if let Some(handle) = old.handle.take() {
                let _ = self.source.unregister(handle);
            }
            self.save()?;
        }
        Ok(())
    }

    /// Correlate an OS press back to the originating binding.
    pub fn resolve_press(&self, handle: HotkeyHandle) -> Option<PressTarget> {
        if self
            .quick_switch
            .as_ref()
            .is_some_and(|b| b.handle == Some(handle))
        {
            return Some(PressTarget::QuickSwitch);
        }
        self.bindings
            .iter()
            .find(|b| b.handle == Some(handle))
            .map(|b| PressTarget::Device(b.device_id.clone()))
    }

    /// Recompute the display list. Bindings whose device does not resolve
    /// are excluded unless `ShowUnknownDevicesInHotkeyList` is set.
    pub fn refresh_visible(&mut self, device_known: impl Fn(&DeviceId) -> bool) {
        let show_unknown = self.settings.get_bool(keys::SHOW_UNKNOWN_DEVICES, false);
        self.visible = self
            .bindings
            .iter()
            .map(|b| VisibleHotKey {
                chord: b.chord,
                device_id: b.device_id.clone(),
                device_known: device_known(&b.device_id),
            })
            .filter(|row| show_unknown || row.device_known)
            .collect();
    }

    fn register_with_os(&mut self, chord: Chord) -> Option<HotkeyHandle> {
        match self.source.register(chord) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(%chord, error = %e, "OS hotkey registration failed");
                None
            }
        }
    }

    fn unregister_all(&mut self) {
        for binding in self.bindings.iter_mut() {
            if let Some(handle) = binding.handle.take() {
                let _ = self.source.unregister(handle);
            }
        }
        if let Some(quick) = self.quick_switch.as_mut() {
            if let Some(handle) = quick.handle.take() {
                let _ = self.source.unregister(handle);
            }
        }
    }
}

impl Drop for HotKeyRegistry {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::backend::testing::MockHotkeySource;
    use crate::hotkey::chord::{ModifierSet, VirtualKey};
    use std::sync::Mutex;

    type SharedMock = Arc<Mutex<MockHotkeySource>>;

    fn chord(key: u32, mods: u32) -> Chord {
        Chord::new(VirtualKey(key), ModifierSet(mods))
    }

    fn device(n: u8) -> DeviceId {
        DeviceId::parse_guid(&format!("{n:08}-0000-0000-0000-000000000000")).unwrap()
    }

    fn registry(dir: &std::path::Path) -> (HotKeyRegistry, SharedMock, Arc<JsonSettings>) {
        let mock: SharedMock = Arc::default();
        let settings = Arc::new(JsonSettings::open(dir.join("settings.json")));
        let registry = HotKeyRegistry::new(Box::new(Arc::clone(&mock)), Arc::clone(&settings));
        (registry, mock, settings)
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, _, settings) = registry(dir.path());

        assert!(reg.add_hotkey(chord(65, 2), device(1)).unwrap());
        assert!(reg.add_hotkey(chord(66, 0), device(2)).unwrap());
        assert!(reg.set_quick_switch(chord(120, 6)).unwrap());
        drop(reg);

        let mock: SharedMock = Arc::default();
        let mut reloaded = HotKeyRegistry::new(Box::new(Arc::clone(&mock)), settings);
        reloaded.load();

        let set: Vec<_> = reloaded
            .bindings()
            .iter()
            .map(|b| (b.chord, b.device_id.clone()))
            .collect();
        assert_eq!(set, vec![(chord(65, 2), device(1)), (chord(66, 0), device(2))]);
        assert_eq!(reloaded.quick_switch_chord(), Some(chord(120, 6)));
        // Everything re-registered with the OS on load.
        assert_eq!(mock.lock().unwrap().active.len(), 3);
    }

    #[test]
    fn duplicate_chord_rejected_including_quick_switch() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, _, _) = registry(dir.path());

        assert!(reg.add_hotkey(chord(65, 2), device(1)).unwrap());
        assert!(!reg.add_hotkey(chord(65, 2), device(2)).unwrap());

        assert!(reg.set_quick_switch(chord(70, 0)).unwrap());
        assert!(!reg.add_hotkey(chord(70, 0), device(3)).unwrap());
        assert!(!reg.set_quick_switch(chord(65, 2)).unwrap());

        assert!(reg.is_duplicate(chord(70, 0)));
        assert!(!reg.is_duplicate(chord(71, 0)));
    }

    #[test]
    fn os_rejection_reports_false_without_adding() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, mock, settings) = registry(dir.path());
        mock.lock().unwrap().rejected.insert(chord(65, 2));

        assert!(!reg.add_hotkey(chord(65, 2), device(1)).unwrap());
        assert!(reg.bindings().is_empty());
        assert_eq!(mock.lock().unwrap().register_calls, 1);
        // Nothing was persisted either.
        assert_eq!(settings.get(keys::HOTKEYS), None);
    }

    #[test]
    fn delete_unregisters_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, mock, settings) = registry(dir.path());

        reg.add_hotkey(chord(65, 2), device(1)).unwrap();
        reg.add_hotkey(chord(66, 0), device(2)).unwrap();

        assert!(reg.delete_hotkey(chord(65, 2)).unwrap());
        assert!(!reg.delete_hotkey(chord(65, 2)).unwrap());

        assert_eq!(reg.bindings().len(), 1);
        assert_eq!(mock.lock().unwrap().active.len(), 1);
        let persisted = settings.get(keys::HOTKEYS).unwrap();
        assert!(!persisted.contains("[65,"));
        assert!(persisted.contains("[66,"));
    }

    #[test]
    fn clear_all_empties_registry_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, mock, settings) = registry(dir.path());

        reg.add_hotkey(chord(65, 2), device(1)).unwrap();
        reg.set_quick_switch(chord(120, 6)).unwrap();
        reg.clear_all().unwrap();

        assert!(reg.bindings().is_empty());
        assert_eq!(reg.quick_switch_chord(), None);
        assert!(mock.lock().unwrap().active.is_empty());
        assert_eq!(settings.get(keys::HOTKEYS).as_deref(), Some(""));
        assert_eq!(settings.get(keys::QUICK_SWITCH_HOTKEY).as_deref(), Some(""));
    }

    #[test]
    fn quick_switch_replacement_releases_prior_handle() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, mock, _) = registry(dir.path());

        assert!(reg.set_quick_switch(chord(120, 6)).unwrap());
        assert!(reg.set_quick_switch(chord(121, 6)).unwrap());

        let mock = mock.lock().unwrap();
        assert_eq!(mock.active.len(), 1);
        assert!(mock.active.values().any(|c| *c == chord(121, 6)));
    }

    #[test]
    fn clear_quick_switch_releases_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, mock, settings) = registry(dir.path());

        reg.set_quick_switch(chord(120, 6)).unwrap();
        reg.clear_quick_switch().unwrap();

        assert_eq!(reg.quick_switch_chord(), None);
        assert!(mock.lock().unwrap().active.is_empty());
        assert_eq!(settings.get(keys::QUICK_SWITCH_HOTKEY).as_deref(), Some(""));
    }

    #[test]
    fn disabling_quick_switch_keeps_chord_but_releases_handle() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, mock, settings) = registry(dir.path());

        reg.set_quick_switch(chord(120, 6)).unwrap();
        reg.set_quick_switch_enabled(false).unwrap();

        assert_eq!(reg.quick_switch_chord(), Some(chord(120, 6)));
        assert!(mock.lock().unwrap().active.is_empty());

        reg.set_quick_switch_enabled(true).unwrap();
        assert_eq!(mock.lock().unwrap().active.len(), 1);

        // A reload while disabled parses the chord without registering it.
        settings.set_bool(keys::ENABLE_QUICK_SWITCH, false).unwrap();
        reg.load();
        assert_eq!(reg.quick_switch_chord(), Some(chord(120, 6)));
        assert!(mock.lock().unwrap().active.is_empty());
    }

    #[test]
    fn load_skips_corrupt_entries_individually() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, _, settings) = registry(dir.path());

        settings
            .set(
                keys::HOTKEYS,
                "[65,2,{11111111-1111-1111-1111-111111111111}][garbage][66,0,{22222222-2222-2222-2222-222222222222}]",
            )
            .unwrap();
        reg.load();

        let keys_loaded: Vec<_> = reg.bindings().iter().map(|b| b.chord.key.0).collect();
        assert_eq!(keys_loaded, vec![65, 66]);
    }

    #[test]
    fn press_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, mock, _) = registry(dir.path());

        reg.add_hotkey(chord(65, 2), device(1)).unwrap();
        reg.set_quick_switch(chord(120, 6)).unwrap();

        let (device_handle, quick_handle) = {
            let mock = mock.lock().unwrap();
            let find = |c: Chord| {
                *mock
                    .active
                    .iter()
                    .find(|(_, chord)| **chord == c)
                    .unwrap()
                    .0
            };
            (find(chord(65, 2)), find(chord(120, 6)))
        };

        assert_eq!(
            reg.resolve_press(device_handle),
            Some(PressTarget::Device(device(1)))
        );
        assert_eq!(reg.resolve_press(quick_handle), Some(PressTarget::QuickSwitch));
        assert_eq!(reg.resolve_press(HotkeyHandle(9999)), None);
    }

    #[test]
    fn refresh_visible_filters_unknown_devices() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, _, settings) = registry(dir.path());

        reg.add_hotkey(chord(65, 2), device(1)).unwrap();
        reg.add_hotkey(chord(66, 0), device(2)).unwrap();

        reg.refresh_visible(|id| *id == device(1));
        assert_eq!(reg.visible().len(), 1);
        assert_eq!(reg.visible()[0].device_id, device(1));

        settings.set_bool(keys::SHOW_UNKNOWN_DEVICES, true).unwrap();
        reg.refresh_visible(|id| *id == device(1));
        assert_eq!(reg.visible().len(), 2);
        assert!(!reg.visible()[1].device_known);
    }

    #[test]
    fn drop_releases_all_handles() {
        let dir = tempfile::tempdir().unwrap();
        let (mut reg, mock, _) = registry(dir.path());

        reg.add_hotkey(chord(65, 2), device(1)).unwrap();
        reg.set_quick_switch(chord(120, 6)).unwrap();
        drop(reg);

        let mock = mock.lock().unwrap();
        assert!(mock.active.is_empty());
        assert_eq!(mock.unregister_calls, 2);
    }
}
