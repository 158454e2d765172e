pub mod bell;
pub mod cue;

use bell::BellTone;
pub use cue::{AudioCuePlayer, CuePlayer, CueResource, CueSound, LoadError, PlaybackError};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error};

enum AudioCommand {
    /// Drop whatever is playing and start this sound from its first sample.
    Restart(CueSound),
    Stop,
}

/// Handle to the audio thread. The output stream is not `Send`, so it lives on
/// a dedicated thread and everything else talks to it over a channel.
#[derive(Clone)]
pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    volume: f32,
}

impl AudioEngineHandle {
    pub fn new(volume: f32) -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, PlaybackError> {
        let mut slot = self
            .tx
            .lock()
            .map_err(|e| PlaybackError::EngineUnavailable(e.to_string()))?;
        if let Some(tx) = slot.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let volume = self.volume;

        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || {
                let mut stream: Option<(OutputStream, OutputStreamHandle)> = None;
                let mut sink: Option<Sink> = None;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Restart(sound) => {
                            // Dropping the old sink cuts off a cue that is still ringing.
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            match restart(&mut stream, sound, volume) {
                                Ok(new_sink) => sink = Some(new_sink),
                                Err(err) => log_error!("cue playback failed: {err}"),
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            stream = None;
                        }
                    }
                }
                log_debug!("audio engine thread exiting");
            })
            .map_err(|e| PlaybackError::EngineUnavailable(e.to_string()))?;

        *slot = Some(tx.clone());
        Ok(tx)
    }

    pub(crate) fn restart_with(&self, sound: CueSound) -> Result<(), PlaybackError> {
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::Restart(sound))
            .map_err(|e| PlaybackError::EngineUnavailable(e.to_string()))
    }

    /// Silence any cue in flight and release the output device.
    pub fn stop(&self) {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AudioCommand::Stop);
        }
    }
}

fn restart(
    stream: &mut Option<(OutputStream, OutputStreamHandle)>,
    sound: CueSound,
    volume: f32,
) -> Result<Sink, String> {
    if stream.is_none() {
        let opened = OutputStream::try_default()
            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
        *stream = Some(opened);
    }
    let Some((_, handle)) = stream.as_ref() else {
        return Err("audio output stream missing".to_string());
    };

    let sink =
        Sink::try_new(handle).map_err(|e| format!("Failed to create audio sink: {}", e))?;
    sink.set_volume(volume);

    match sound {
        CueSound::Bell => sink.append(BellTone::new()),
        CueSound::Encoded(bytes) => {
            let source = Decoder::new(Cursor::new(bytes))
                .map_err(|e| format!("Failed to decode cue: {}", e))?;
            sink.append(source);
        }
    }

    Ok(sink)
}
