use super::Service;
use crate::error::Result;

/// Run maintenance every this many iterations
const MAINTENANCE_EVERY: u64 = 5;

/// Built-in service body: reports liveness on every iteration
pub struct Heartbeat {
    name: String,
    beats: u64,
}

impl Heartbeat {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            beats: 0,
        }
    }

    /// Number of completed beats
    pub fn beats(&self) -> u64 {
        self.beats
    }

    fn maintenance_due(&self) -> bool {
        self.beats % MAINTENANCE_EVERY == 0
    }
}

impl Service for Heartbeat {
    fn name(&self) -> &str {
        &self.name
    }

    fn run_once(&mut self) -> Result<()> {
        self.beats += 1;
        tracing::info!(beat = self.beats, "{} is running...", self.name);

        if self.maintenance_due() {
            tracing::info!(beat = self.beats, "Performing maintenance");
        }

        Ok(())
    }

    fn on_stop(&mut self) {
        tracing::info!("{} stopped after {} beats", self.name, self.beats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beats_count_up() {
        let mut heartbeat = Heartbeat::new("hb");
        for _ in 0..3 {
            heartbeat.run_once().unwrap();
        }
        assert_eq!(heartbeat.beats(), 3);
        assert_eq!(heartbeat.name(), "hb");
    }

    #[test]
    fn test_maintenance_every_fifth_beat() {
        let mut heartbeat = Heartbeat::new("hb");
        let mut due = Vec::new();
        for _ in 0..10 {
            heartbeat.run_once().unwrap();
            due.push(heartbeat.maintenance_due());
        }
        assert_eq!(
            due,
            vec![false, false, false, false, true, false, false, false, false, true]
        );
    }
}
