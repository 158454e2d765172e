//! Terminal front end: a start prompt, then one block of text per update.

use anyhow::{Context, Result};
use std::io::Write;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    signal,
};

use crate::timer::{SessionController, SessionView};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Wait for Enter, run the session until a shutdown signal or end of input,
/// then stop it.
pub async fn run_terminal(controller: &SessionController) -> Result<()> {
    let mut out = std::io::stdout();
    run_with(controller, tokio::io::stdin(), &mut out, shutdown_signal()).await
}

/// Resolves on Ctrl-C, and on unix also on SIGTERM or SIGHUP, so the session
/// is torn down (and the wake lock dropped) when the process is asked to exit.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::SignalKind;

        let mut terminate = signal::unix::signal(SignalKind::terminate())?;
        let mut hangup = signal::unix::signal(SignalKind::hangup())?;
        tokio::select! {
            res = signal::ctrl_c() => res,
            _ = terminate.recv() => Ok(()),
            _ = hangup.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await
    }
}

async fn run_with<R, W, S>(
    controller: &SessionController,
    input: R,
    out: &mut W,
    shutdown: S,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: Write,
    S: std::future::Future<Output = std::io::Result<()>>,
{
    tokio::pin!(shutdown);
    let mut lines = BufReader::new(input).lines();
    let mut views = controller.subscribe();

    render(out, &views.borrow_and_update())?;

    tokio::select! {
        line = lines.next_line() => {
            if line.context("failed to read start input")?.is_none() {
                return Ok(());
            }
        }
        _ = &mut shutdown => return Ok(()),
    }

    controller.start().await?;

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                render(out, &view)?;
            }
            line = lines.next_line() => {
                // Further lines are ignored; closing stdin ends the session.
                if !matches!(line, Ok(Some(_))) {
                    break;
                }
            }
            _ = &mut shutdown => break,
        }
    }

    controller.deactivate().await;
    let last = controller.snapshot().await;
    log_info!("session ended after {} cues", last.ticks);
    render(out, &last)?;
    Ok(())
}

fn render<W: Write>(out: &mut W, view: &SessionView) -> Result<()> {
    for line in view.lines() {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{CuePlayer, PlaybackError};
    use crate::timer::{SessionConfig, SessionStatus};
    use crate::wake_lock::{NoopBackend, WakeLock};
    use std::sync::Arc;
    use std::time::Duration;

    struct SilentCue;

    impl CuePlayer for SilentCue {
        fn play_from_start(&self) -> Result<(), PlaybackError> {
            Ok(())
        }
    }

    fn controller(countdown_secs: u32) -> SessionController {
        let config = SessionConfig {
            countdown_secs,
            ..SessionConfig::default()
        };
        SessionController::new(
            config,
            Arc::new(SilentCue),
            WakeLock::new(Box::new(NoopBackend)),
        )
    }

    #[tokio::test]
    async fn closed_input_before_start_does_nothing() {
        let controller = controller(10);
        let mut out = Vec::new();

        run_with(&controller, &b""[..], &mut out, std::future::pending())
            .await
            .unwrap();

        assert_eq!(controller.get_state().await.status, SessionStatus::Idle);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Press Enter to start meditation\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_a_running_session() {
        let controller = controller(2);
        let mut out = Vec::new();
        let (reader, mut writer) = tokio::io::duplex(64);

        let shutdown = async {
            tokio::io::AsyncWriteExt::write_all(&mut writer, b"\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(4_100)).await;
            Ok::<(), std::io::Error>(())
        };

        run_with(&controller, reader, &mut out, shutdown)
            .await
            .unwrap();

        let state = controller.get_state().await;
        assert_eq!(state.status, SessionStatus::Stopped);
        assert_eq!(state.ticks, 2);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Meditation starts in 2..."));
        assert!(text.contains("Meditation starts in 1..."));
        assert!(text.contains("Trance gap: 1.00 seconds"));
        assert!(text.contains("Trance gap: 1.10 seconds"));
        assert!(text.trim_end().ends_with("Meditation duration: 2.05 seconds"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_countdown_does_not_prompt_again() {
        let controller = controller(5);
        let mut out = Vec::new();
        let (reader, mut writer) = tokio::io::duplex(64);

        let shutdown = async {
            tokio::io::AsyncWriteExt::write_all(&mut writer, b"\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(1_500)).await;
            Ok::<(), std::io::Error>(())
        };

        run_with(&controller, reader, &mut out, shutdown)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Press Enter to start meditation").count(), 1);
        assert!(text.trim_end().ends_with("Meditation cancelled before it began"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hangup_resolves_shutdown_signal() {
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        // First poll installs the handlers.
        assert!(
            tokio::time::timeout(Duration::from_millis(50), &mut shutdown)
                .await
                .is_err()
        );

        let status = std::process::Command::new("kill")
            .args(["-HUP", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), &mut shutdown)
            .await
            .expect("SIGHUP should end the session")
            .unwrap();
    }
}
