use super::state::{SessionRecord, SessionStatus};

/// Read-only projection of the session record for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub status: SessionStatus,
    /// Seconds until the session starts; only while counting down.
    pub countdown_remaining: Option<u32>,
    /// Current trance gap; only once the session has started.
    pub trance_gap_secs: Option<f64>,
    pub elapsed_secs: f64,
    pub ticks: u64,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            countdown_remaining: None,
            trance_gap_secs: None,
            elapsed_secs: 0.0,
            ticks: 0,
        }
    }
}

impl From<&SessionRecord> for SessionView {
    fn from(record: &SessionRecord) -> Self {
        let started = record.started_at.is_some()
            && matches!(
                record.status,
                SessionStatus::Active | SessionStatus::Stopped
            );

        Self {
            status: record.status,
            countdown_remaining: match record.status {
                // A zero-length countdown is never shown.
                SessionStatus::CountingDown => record
                    .countdown
                    .map(|c| c.remaining())
                    .filter(|&secs| secs > 0),
                _ => None,
            },
            trance_gap_secs: started.then(|| record.delay_ms / 1000.0),
            elapsed_secs: record.elapsed_ms / 1000.0,
            ticks: record.ticks,
        }
    }
}

impl SessionView {
    /// Text lines for a terminal, two decimals for the running figures.
    pub fn lines(&self) -> Vec<String> {
        if let Some(remaining) = self.countdown_remaining {
            return vec![format!("Meditation starts in {remaining}...")];
        }

        if let Some(gap) = self.trance_gap_secs {
            return vec![
                format!("Trance gap: {gap:.2} seconds"),
                format!("Meditation duration: {:.2} seconds", self.elapsed_secs),
            ];
        }

        match self.status {
            SessionStatus::Idle => vec!["Press Enter to start meditation".to_string()],
            SessionStatus::Stopped => vec!["Meditation cancelled before it began".to_string()],
            // Activation is imminent; nothing worth printing in between.
            SessionStatus::CountingDown | SessionStatus::Active => Vec::new(),
        }
    }
}
