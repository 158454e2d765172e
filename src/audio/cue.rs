//! The cue sound and the player the session scheduler rings on every tick.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use rodio::{decoder::DecoderError, Decoder};
use thiserror::Error;

use super::AudioEngineHandle;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Where the cue sound comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueResource {
    /// The bell synthesized in [`super::bell::BellTone`].
    Bundled,
    /// An audio file on disk (wav, mp3, ogg, flac).
    File(PathBuf),
}

impl CueResource {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(CueResource::Bundled, CueResource::File)
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open sound {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode sound {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecoderError,
    },
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("no cue sound loaded")]
    NotLoaded,

    #[error("audio engine unavailable: {0}")]
    EngineUnavailable(String),
}

/// A loaded, playable cue. Cheap to clone; encoded bytes are shared.
#[derive(Clone)]
pub enum CueSound {
    Bell,
    Encoded(Arc<[u8]>),
}

impl std::fmt::Debug for CueSound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CueSound::Bell => f.write_str("Bell"),
            CueSound::Encoded(bytes) => write!(f, "Encoded({} bytes)", bytes.len()),
        }
    }
}

impl CueSound {
    /// Acquire the resource. File reads happen off the caller's task; the
    /// bytes are probed once with the decoder so a broken file fails here
    /// rather than on the first tick.
    pub async fn load(resource: &CueResource) -> Result<CueSound, LoadError> {
        let path = match resource {
            CueResource::Bundled => return Ok(CueSound::Bell),
            CueResource::File(path) => path.clone(),
        };

        let bytes: Arc<[u8]> = tokio::fs::read(&path)
            .await
            .map_err(|source| LoadError::Open {
                path: path.clone(),
                source,
            })?
            .into();

        Decoder::new(Cursor::new(bytes.clone()))
            .map_err(|source| LoadError::Decode { path, source })?;

        Ok(CueSound::Encoded(bytes))
    }
}

/// Something that can ring the cue. Fire-and-forget: returning `Ok` means the
/// request was handed off, not that the sound finished.
pub trait CuePlayer: Send + Sync {
    fn play_from_start(&self) -> Result<(), PlaybackError>;
}

/// Cue player backed by the rodio engine thread.
pub struct AudioCuePlayer {
    engine: AudioEngineHandle,
    sound: Option<CueSound>,
}

impl AudioCuePlayer {
    /// Build the player from the outcome of [`CueSound::load`]. A load
    /// failure is reported here, once; the player then stays silent and
    /// every play attempt returns [`PlaybackError::NotLoaded`].
    pub fn from_load(engine: AudioEngineHandle, loaded: Result<CueSound, LoadError>) -> Self {
        let sound = match loaded {
            Ok(sound) => {
                log_info!("cue sound ready: {:?}", sound);
                Some(sound)
            }
            Err(err) => {
                log_error!("Failed to load the sound: {err}");
                None
            }
        };

        Self { engine, sound }
    }

    pub fn is_loaded(&self) -> bool {
        self.sound.is_some()
    }
}

impl CuePlayer for AudioCuePlayer {
    fn play_from_start(&self) -> Result<(), PlaybackError> {
        let sound = self.sound.as_ref().ok_or(PlaybackError::NotLoaded)?;
        self.engine.restart_with(sound.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn bundled_resource_always_loads() {
        let sound = CueSound::load(&CueResource::Bundled).await.unwrap();
        assert!(matches!(sound, CueSound::Bell));
    }

    #[tokio::test]
    async fn missing_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bell.mp3");

        let err = CueSound::load(&CueResource::File(path.clone()))
            .await
            .unwrap_err();
        match err {
            LoadError::Open { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected open error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_file_is_a_decode_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not audio").unwrap();

        let err = CueSound::load(&CueResource::File(file.path().to_path_buf()))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[tokio::test]
    async fn failed_load_makes_playback_report_not_loaded() {
        let loaded = CueSound::load(&CueResource::File("/nonexistent/bell.mp3".into())).await;
        let player = AudioCuePlayer::from_load(AudioEngineHandle::new(1.0), loaded);

        assert!(!player.is_loaded());
        assert!(matches!(
            player.play_from_start(),
            Err(PlaybackError::NotLoaded)
        ));
    }

    #[test]
    fn resource_from_optional_path() {
        assert_eq!(CueResource::from_path(None), CueResource::Bundled);
        assert_eq!(
            CueResource::from_path(Some("a.wav".into())),
            CueResource::File("a.wav".into())
        );
    }
}
