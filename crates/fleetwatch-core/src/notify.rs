//! Edge detection on the fleet-wide "simulation active" flag.

use tokio::sync::mpsc;

/// Raised once when the simulation goes from running to stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationEnded;

/// Fires on `true -> false` of the active flag and nowhere else.
///
/// Holds exactly one bit of history. Feed it every committed poll in
/// order; the poller guarantees ordering by running a single loop.
#[derive(Debug, Clone, Default)]
pub struct TransitionNotifier {
    previous_active: bool,
}

impl TransitionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest flag. Returns the event if this observation ended
    /// the simulation.
    pub fn observe(&mut self, is_active: bool) -> Option<SimulationEnded> {
        let fired = self.previous_active && !is_active;
        self.previous_active = is_active;
        fired.then_some(SimulationEnded)
    }
}

/// Receiving half handed to the notification surface.
pub type NotificationReceiver = mpsc::UnboundedReceiver<SimulationEnded>;

pub(crate) type NotificationSender = mpsc::UnboundedSender<SimulationEnded>;

pub(crate) fn channel() -> (NotificationSender, NotificationReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fired_at(sequence: &[bool]) -> Vec<usize> {
        let mut notifier = TransitionNotifier::new();
        sequence
            .iter()
            .enumerate()
            .filter_map(|(i, &active)| notifier.observe(active).map(|_| i))
            .collect()
    }

    #[test]
    fn fires_on_each_falling_edge() {
        assert_eq!(fired_at(&[true, true, false, false, true, false]), [2, 5]);
    }

    #[test]
    fn never_fires_on_rising_or_steady() {
        assert!(fired_at(&[false, false, true, true, true]).is_empty());
    }

    #[test]
    fn starts_inactive() {
        // First poll reporting inactive is not a transition.
        assert!(fired_at(&[false]).is_empty());
        assert_eq!(fired_at(&[true, false]), [1]);
    }

    #[test]
    fn history_updates_even_when_not_firing() {
        let mut notifier = TransitionNotifier::new();
        assert_eq!(notifier.observe(true), None);
        assert_eq!(notifier.observe(true), None);
        assert_eq!(notifier.observe(false), Some(SimulationEnded));
        assert_eq!(notifier.observe(false), None);
        assert_eq!(notifier.observe(true), None);
        assert_eq!(notifier.observe(false), Some(SimulationEnded));
    }
}
