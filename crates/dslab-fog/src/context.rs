//! Component-scoped view of the simulation clock.

/// Named handle to the simulation clock used by components for logging.
///
/// The engine owns the authoritative clock and moves the contexts of datacenters forward at every
/// step, so their log records carry the time of the step being processed.
#[derive(Clone, Debug)]
pub struct SimulationContext {
    name: String,
    time: f64,
}

impl SimulationContext {
    /// Creates context with the specified component name at time zero.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            time: 0.,
        }
    }

    /// Returns the component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Moves the clock forward. Time never goes back.
    pub(crate) fn advance_to(&mut self, time: f64) {
        debug_assert!(time >= self.time, "time went back: {} -> {}", self.time, time);
        if time > self.time {
            self.time = time;
        }
    }
}
