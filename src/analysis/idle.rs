//! Idle-time accumulation (neither microwave nor grill on)

/// Sums the time between consecutive samples whenever the later sample
/// shows both heating elements off.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IdleTracker {
    last_elapsed: Option<f64>,
    idle_secs: f64,
}

impl IdleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, elapsed_secs: f64, heating: bool) {
        if let Some(last) = self.last_elapsed {
            let dt = elapsed_secs - last;
            if !heating && dt > 0.0 {
                self.idle_secs += dt;
            }
        }
        self.last_elapsed = Some(elapsed_secs);
    }

    pub fn idle_secs(&self) -> f64 {
        self.idle_secs
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_only_idle_intervals() {
        let mut t = IdleTracker::new();
        t.record(0.0, false);
        t.record(1.0, false);
        t.record(2.0, true);
        t.record(3.5, false);
        assert_eq!(t.idle_secs(), 2.5);
    }

    #[test]
    fn first_sample_contributes_nothing() {
        let mut t = IdleTracker::new();
        t.record(10.0, false);
        assert_eq!(t.idle_secs(), 0.0);
    }
}
