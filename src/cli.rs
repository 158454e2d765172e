use clap::Parser;
use std::path::PathBuf;

use crate::settings::UserSettings;

/// Meditation bell that rings at an ever-lengthening interval.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Audio file (wav, mp3, ogg, flac) to ring instead of the bundled bell
    #[arg(short, long)]
    pub sound: Option<PathBuf>,

    /// Cue volume between 0.0 and 1.0
    #[arg(long)]
    pub volume: Option<f32>,

    /// Seconds to count down before the first cue is armed
    #[arg(short, long)]
    pub countdown: Option<u32>,

    /// Settings file to use instead of the platform default
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Let the screen sleep during the session
    #[arg(long)]
    pub no_wake_lock: bool,

    /// Write the given options to the settings file
    #[arg(long)]
    pub save: bool,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Overlay command-line options on the stored settings.
    pub fn apply(&self, settings: &mut UserSettings) {
        if let Some(path) = &self.sound {
            settings.sound.path = Some(path.clone());
        }
        if let Some(volume) = self.volume {
            settings.sound.volume = volume;
        }
        if let Some(countdown) = self.countdown {
            settings.countdown_secs = countdown;
        }
        if self.no_wake_lock {
            settings.keep_awake = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsStore;

    #[test]
    fn no_flags_leave_settings_alone() {
        let cli = Cli::try_parse_from(["trance-bell"]).unwrap();
        let mut settings = UserSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings, UserSettings::default());
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "trance-bell",
            "--sound",
            "bowl.ogg",
            "--volume",
            "0.3",
            "-c",
            "3",
            "--no-wake-lock",
        ])
        .unwrap();

        let mut settings = UserSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.sound.path, Some(PathBuf::from("bowl.ogg")));
        assert_eq!(settings.sound.volume, 0.3);
        assert_eq!(settings.countdown_secs, 3);
        assert!(!settings.keep_awake);
    }

    #[test]
    fn rejects_negative_countdown() {
        assert!(Cli::try_parse_from(["trance-bell", "--countdown", "-1"]).is_err());
    }

    #[test]
    fn nan_volume_resolves_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let cli = Cli::try_parse_from(["trance-bell", "--volume", "NaN"]).unwrap();

        let settings = store.with_overrides(|s| cli.apply(s));
        assert_eq!(settings.sound.volume, 0.8);
    }
}
