pub mod audio;
pub mod cli;
mod frontend;
pub mod settings;
pub mod timer;
mod utils;
pub mod wake_lock;

use std::sync::Arc;

use anyhow::{Context, Result};

use audio::{AudioCuePlayer, AudioEngineHandle, CueResource, CueSound};
use cli::Cli;
use settings::SettingsStore;
use timer::{SessionConfig, SessionController};
use wake_lock::{platform_backend, NoopBackend, WakeLock};

pub fn run(cli: Cli) -> Result<()> {
    utils::logging::init(cli.verbose);

    log::info!("trance-bell starting up...");

    let settings_path = match cli.config.clone() {
        Some(path) => path,
        None => SettingsStore::default_path()?,
    };
    let store = SettingsStore::new(settings_path)?;
    let settings = if cli.save {
        let saved = store.update(|s| cli.apply(s))?;
        log::info!("settings saved to {}", store.path().display());
        saved
    } else {
        store.with_overrides(|s| cli.apply(s))
    };

    // Everything runs on one thread; only audio output has its own.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;

    runtime.block_on(async move {
        let engine = AudioEngineHandle::new(settings.sound.volume);
        let loaded = CueSound::load(&CueResource::from_path(settings.sound.path.clone())).await;
        let cue = AudioCuePlayer::from_load(engine.clone(), loaded);

        let wake_lock = WakeLock::new(if settings.keep_awake {
            platform_backend()
        } else {
            Box::new(NoopBackend)
        });

        let config = SessionConfig {
            countdown_secs: settings.countdown_secs,
            ..SessionConfig::default()
        };
        let controller = SessionController::new(config, Arc::new(cue), wake_lock);

        let result = frontend::run_terminal(&controller).await;

        // Teardown runs whether the front end ended cleanly or not.
        controller.deactivate().await;
        engine.stop();
        result
    })
}
