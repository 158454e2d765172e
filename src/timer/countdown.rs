/// Outcome of one second passing on the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    Remaining(u32),
    Finished,
}

/// Whole-second countdown that gates the start of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn new(start_secs: u32) -> Self {
        Self {
            remaining: start_secs,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Advance by one second. Reports `Finished` on the tick that reaches
    /// zero and on every tick after it.
    pub fn tick(&mut self) -> CountdownStep {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            CountdownStep::Finished
        } else {
            CountdownStep::Remaining(self.remaining)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_ticks_finish_a_ten_second_countdown() {
        let mut countdown = Countdown::new(10);
        for expected in (1..10).rev() {
            assert_eq!(countdown.tick(), CountdownStep::Remaining(expected));
        }
        assert_eq!(countdown.tick(), CountdownStep::Finished);
        assert!(countdown.is_finished());
    }

    #[test]
    fn zero_start_is_already_finished() {
        let mut countdown = Countdown::new(0);
        assert!(countdown.is_finished());
        assert_eq!(countdown.tick(), CountdownStep::Finished);
        assert_eq!(countdown.remaining(), 0);
    }
}
