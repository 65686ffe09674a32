use serde::Serialize;

use crate::settings::RecordingSettings;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TickOutcome {
    /// Time remains and this tick is a sampling instant.
    Sample,
    /// Time remains but the sampling policy skips this tick.
    Skip,
    /// The terminal tick: remaining time is zero and the timer stops.
    Finished,
}

/// Fixed-length countdown measured in ticks.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    total_ticks: u32,
    remaining: u32,
    sample_every: u32,
}

impl Countdown {
    pub fn new(total_ticks: u32, sample_every: u32) -> Self {
        let total_ticks = total_ticks.max(1);
        Self {
            total_ticks,
            remaining: total_ticks,
            sample_every: sample_every.clamp(1, 2),
        }
    }

    pub fn from_settings(settings: &RecordingSettings) -> Self {
        Self::new(settings.duration_ticks, settings.sample_every_ticks)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.remaining <= 1 {
            self.remaining = 0;
            return TickOutcome::Finished;
        }

        let elapsed = self.total_ticks - self.remaining;
        self.remaining -= 1;
        if elapsed % self.sample_every == 0 {
            TickOutcome::Sample
        } else {
            TickOutcome::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(countdown: &mut Countdown) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let outcome = countdown.tick();
            outcomes.push(outcome);
            if outcome == TickOutcome::Finished {
                return outcomes;
            }
        }
    }

    #[test]
    fn ten_ticks_sample_every_tick_before_the_last() {
        let mut countdown = Countdown::new(10, 1);
        let outcomes = run(&mut countdown);

        assert_eq!(outcomes.len(), 10);
        assert_eq!(
            outcomes.iter().filter(|o| **o == TickOutcome::Sample).count(),
            9
        );
        assert_eq!(outcomes.last(), Some(&TickOutcome::Finished));
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn coarse_policy_never_gaps_more_than_two_ticks() {
        let mut countdown = Countdown::new(10, 5);
        let outcomes = run(&mut countdown);
        let samples: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| **o == TickOutcome::Sample)
            .map(|(index, _)| index)
            .collect();

        assert_eq!(samples, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn remaining_decrements_once_per_tick() {
        let mut countdown = Countdown::new(3, 1);
        assert_eq!(countdown.remaining(), 3);
        countdown.tick();
        assert_eq!(countdown.remaining(), 2);
        countdown.tick();
        assert_eq!(countdown.remaining(), 1);
        assert_eq!(countdown.tick(), TickOutcome::Finished);
        assert_eq!(countdown.remaining(), 0);
        assert_eq!(countdown.tick(), TickOutcome::Finished);
    }

    #[test]
    fn zero_length_is_promoted_to_one_tick() {
        let mut countdown = Countdown::new(0, 1);
        assert_eq!(countdown.tick(), TickOutcome::Finished);
    }
}
