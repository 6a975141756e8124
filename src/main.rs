#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

#[cfg(windows)]
use std::path::PathBuf;

#[cfg(windows)]
use anyhow::Context;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[cfg(windows)]
fn settings_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("no user config directory")?;
    Ok(base.join("audioswitch").join("settings.json"))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[cfg(windows)]
fn main() -> Result<()> {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use audioswitch::app::{run_event_loop, AppEvent, AppState};
    use audioswitch::audio::{ComGuard, DeviceNotificationClient, WindowsDeviceController};
    use audioswitch::hotkey::backend::{spawn_press_pump, GlobalHotkeyBackend};
    use audioswitch::settings::JsonSettings;

    init_tracing();

    let path = settings_path()?;
    tracing::info!(path = %path.display(), "starting audioswitch");
    let settings = Arc::new(JsonSettings::open(path));

    let _com = ComGuard::new().context("COM initialization failed")?;
    let controller = Arc::new(WindowsDeviceController::new().context("audio controller init")?);

    // Keep the notification registration alive for the process lifetime.
    let (event_tx, event_rx) = crossbeam_channel::unbounded::<AppEvent>();
    let device_tx = event_tx.clone();
    let (raw_device_tx, raw_device_rx) = crossbeam_channel::unbounded();
    let _notifications = DeviceNotificationClient::new(raw_device_tx)
        .register(controller.raw_enumerator())
        .context("device notification registration failed")?;
    std::thread::Builder::new()
        .name("device-event-pump".into())
        .spawn(move || {
            while let Ok(event) = raw_device_rx.recv() {
                if device_tx.send(AppEvent::DeviceChanged(event)).is_err() {
                    break;
                }
            }
        })
        .context("spawning device event pump")?;

    let hotkeys_disabled = Arc::new(AtomicBool::new(false));
    let backend = GlobalHotkeyBackend::new().context("hotkey backend init")?;
    let (press_tx, press_rx) = crossbeam_channel::unbounded();
    spawn_press_pump(press_tx, Arc::clone(&hotkeys_disabled))
        .context("spawning hotkey press pump")?;
    let press_event_tx = event_tx.clone();
    std::thread::Builder::new()
        .name("hotkey-event-adapter".into())
        .spawn(move || {
            while let Ok(handle) = press_rx.recv() {
                if press_event_tx.send(AppEvent::HotkeyPressed(handle)).is_err() {
                    break;
                }
            }
        })
        .context("spawning hotkey event adapter")?;

    let mut state = AppState::new(
        settings,
        Box::new(backend),
        controller,
        hotkeys_disabled,
    );
    state.initialize();

    // The loop ends if every producer thread dies.
    drop(event_tx);
    run_event_loop(&mut state, event_rx);
    Ok(())
}

#[cfg(not(windows))]
fn main() -> Result<()> {
    init_tracing();
    anyhow::bail!("audioswitch only supports Windows; no audio policy backend on this platform");
}
