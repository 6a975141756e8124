//! Application state and the single-writer event loop.
//!
//! Exactly one thread owns `AppState` and drains the app channel; the
//! hotkey press pump and the device notification client only ever send
//! into that channel, so all registry and favourites mutation happens on
//! one logical thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::audio::{DeviceController, DeviceEvent, DeviceId, DeviceState};
use crate::favourites::FavouriteDeviceManager;
use crate::hotkey::{encoding, Chord, HotKeyRegistry, HotkeyHandle, HotkeySource, PressTarget};
use crate::settings::{keys, JsonSettings, SettingsError};
use crate::switching::{DeviceSwitchOrchestrator, SwitchOutcome};

/// Everything the single-writer loop reacts to.
#[derive(Debug)]
pub enum AppEvent {
    HotkeyPressed(HotkeyHandle),
    DeviceChanged(DeviceEvent),
    Shutdown,
}

pub struct AppState {
    settings: Arc<JsonSettings>,
    registry: HotKeyRegistry,
    favourites: FavouriteDeviceManager,
    orchestrator: DeviceSwitchOrchestrator,
    controller: Arc<dyn DeviceController>,
    hotkeys_disabled: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        settings: Arc<JsonSettings>,
        hotkey_source: Box<dyn HotkeySource>,
        controller: Arc<dyn DeviceController>,
        hotkeys_disabled: Arc<AtomicBool>,
    ) -> Self {
        let registry = HotKeyRegistry::new(hotkey_source, Arc::clone(&settings));

        let mut favourites = FavouriteDeviceManager::new();
        let favourites_settings = Arc::clone(&settings);
        favourites.set_on_change(Box::new(move |order| {
            favourites_settings.set(keys::FAVOURITE_DEVICES, encoding::encode_favourites(order))
        }));

        Self {
            orchestrator: DeviceSwitchOrchestrator::new(Arc::clone(&controller)),
            settings,
            registry,
            favourites,
            controller,
            hotkeys_disabled,
        }
    }

    /// Load persisted state, register everything with the OS, and apply the
    /// configured startup device if any.
    pub fn initialize(&mut self) {
        self.hotkeys_disabled.store(
            self.settings.get_bool(keys::DISABLE_HOTKEYS, false),
            Ordering::Relaxed,
        );

        self.registry.load();

        let favourites_data = self
            .settings
            .get(keys::FAVOURITE_DEVICES)
            .unwrap_or_default();
        let mut loaded = Vec::new();
        for record in encoding::parse_favourites(&favourites_data) {
            match record {
                Ok(id) => loaded.push(id),
                Err(e) => tracing::warn!(error = %e, "skipping corrupt favourite entry"),
            }
        }
        self.favourites.load(loaded);

        self.apply_startup_device();
        self.refresh_visible();
    }

    /// Switch to the configured startup device, if one is set and resolves.
    fn apply_startup_device(&self) {
        let Some(configured) = self.settings.get(keys::STARTUP_PLAYBACK_DEVICE) else {
            return;
        };
        let Some(id) = DeviceId::parse_guid(&configured) else {
            tracing::warn!(value = %configured, "startup device setting is not a GUID");
            return;
        };
        let outcome = self.orchestrator.switch_to(&id, self.dual_switch_mode());
        tracing::debug!(device = %id, ?outcome, "applied startup playback device");
    }

    pub fn registry(&self) -> &HotKeyRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HotKeyRegistry {
        &mut self.registry
    }

    pub fn favourites(&self) -> &FavouriteDeviceManager {
        &self.favourites
    }

    pub fn is_favourite(&self, id: &DeviceId) -> bool {
        self.favourites.is_favourite(id)
    }

    /// Toggle a device's favourite membership, persisting the new order.
    pub fn toggle_favourite(&mut self, id: DeviceId) -> Result<(), SettingsError> {
        if self.favourites.is_favourite(&id) {
            self.favourites.remove(&id)
        } else {
            self.favourites.add(id)
        }
    }

    /// Flip the process-wide "hotkey function disabled" flag and persist it.
    pub fn set_hotkeys_disabled(&self, disabled: bool) -> Result<(), SettingsError> {
        self.hotkeys_disabled.store(disabled, Ordering::Relaxed);
        self.settings.set_bool(keys::DISABLE_HOTKEYS, disabled)
    }

    fn dual_switch_mode(&self) -> bool {
        self.settings.get_bool(keys::DUAL_SWITCH_MODE, false)
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::HotkeyPressed(handle) => self.handle_press(handle),
            AppEvent::DeviceChanged(event) => self.handle_device_change(event),
            AppEvent::Shutdown => {}
        }
    }

    fn handle_press(&mut self, handle: HotkeyHandle) {
        // The pump already drops presses while disabled; double check here
        // because the flag can flip while presses are in flight.
        if self.hotkeys_disabled.load(Ordering::Relaxed) {
            return;
        }
        let Some(target) = self.registry.resolve_press(handle) else {
            tracing::debug!(?handle, "press for unknown hotkey handle");
            return;
        };

        let dual = self.dual_switch_mode();
        let outcome = match target {
            PressTarget::Device(device_id) => self.orchestrator.switch_to(&device_id, dual),
            PressTarget::QuickSwitch => self.orchestrator.quick_switch(&self.favourites, dual),
        };
        if let SwitchOutcome::Switched(_) = outcome {
            self.refresh_visible();
        }
    }

    fn handle_device_change(&mut self, event: DeviceEvent) {
        tracing::debug!(?event, "device change");
        // Favourite membership survives unplug/replug; only the display
        // view of hotkeys tracks the live device set.
        self.refresh_visible();
    }

    /// Recompute the display list of hotkeys against the live device set.
    pub fn refresh_visible(&mut self) {
        let known: Vec<DeviceId> = self
            .controller
            .playback_devices(DeviceState::Active)
            .map(|devices| devices.into_iter().map(|d| d.id).collect())
            .unwrap_or_default();
        self.registry
            .refresh_visible(|id| known.iter().any(|k| k == id));
    }

    /// Convenience wrapper used by the binding UI surface: bind a chord to
    /// a device, reporting `false` on conflict or OS rejection.
    pub fn bind_device_hotkey(
        &mut self,
        chord: Chord,
        device_id: DeviceId,
    ) -> Result<bool, SettingsError> {
        let added = self.registry.add_hotkey(chord, device_id)?;
        if added {
            self.refresh_visible();
        }
        Ok(added)
    }
}

/// Drain the app channel until every sender hangs up or a shutdown event
/// arrives.
pub fn run_event_loop(state: &mut AppState, events: Receiver<AppEvent>) {
    while let Ok(event) = events.recv() {
        if matches!(event, AppEvent::Shutdown) {
            tracing::info!("shutting down");
            break;
        }
        state.handle_event(event);
    }
}
