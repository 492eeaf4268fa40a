/// Escalating per-session response delay (tarpit).
///
/// Tracks the delay applied before each dispatched command. The delay
/// grows by a fixed increment after every command, capped at `ceiling`,
/// and never decreases within a session. A new session starts a fresh
/// instance at `initial`.
use std::time::Duration;

pub struct Throttle {
    increment: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Throttle {
    pub fn new(initial: Duration, increment: Duration, ceiling: Duration) -> Self {
        Self {
            increment,
            ceiling,
            current: initial.min(ceiling),
        }
    }

    /// Returns the delay to apply before the next command and advances
    /// the state. The delay grows by `increment` (up to `ceiling`) for
    /// the next call.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current + self.increment).min(self.ceiling);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_growth() {
        let mut t = Throttle::new(
            Duration::from_millis(500),
            Duration::from_millis(100),
            Duration::from_millis(5000),
        );
        assert_eq!(t.next_delay(), Duration::from_millis(500));
        assert_eq!(t.next_delay(), Duration::from_millis(600));
        assert_eq!(t.next_delay(), Duration::from_millis(700));
        assert_eq!(t.next_delay(), Duration::from_millis(800));
    }

    #[test]
    fn test_ceiling_cap() {
        let mut t = Throttle::new(
            Duration::from_millis(500),
            Duration::from_millis(100),
            Duration::from_millis(700),
        );
        assert_eq!(t.next_delay(), Duration::from_millis(500));
        assert_eq!(t.next_delay(), Duration::from_millis(600));
        assert_eq!(t.next_delay(), Duration::from_millis(700));
        // 700 + 100 = 800, capped at 700
        assert_eq!(t.next_delay(), Duration::from_millis(700));
        assert_eq!(t.next_delay(), Duration::from_millis(700));
    }

    #[test]
    fn test_delay_formula() {
        // k-th command sees min(initial + (k-1)*increment, ceiling)
        let initial = Duration::from_millis(500);
        let increment = Duration::from_millis(100);
        let ceiling = Duration::from_millis(1200);
        let mut t = Throttle::new(initial, increment, ceiling);
        for k in 0u32..20 {
            let expected = (initial + increment * k).min(ceiling);
            assert_eq!(t.next_delay(), expected);
        }
    }

    #[test]
    fn test_never_decreases() {
        let mut t = Throttle::new(
            Duration::from_millis(100),
            Duration::from_millis(30),
            Duration::from_millis(400),
        );
        let mut previous = Duration::ZERO;
        for _ in 0..50 {
            let delay = t.next_delay();
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn test_new_session_resets() {
        let mut first = Throttle::new(
            Duration::from_millis(500),
            Duration::from_millis(100),
            Duration::from_millis(5000),
        );
        first.next_delay();
        first.next_delay();
        first.next_delay();

        // A fresh instance starts back at the initial delay
        let mut second = Throttle::new(
            Duration::from_millis(500),
            Duration::from_millis(100),
            Duration::from_millis(5000),
        );
        assert_eq!(second.next_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_config_disables_delay() {
        let mut t = Throttle::new(Duration::ZERO, Duration::ZERO, Duration::ZERO);
        assert_eq!(t.next_delay(), Duration::ZERO);
        assert_eq!(t.next_delay(), Duration::ZERO);
    }
}
