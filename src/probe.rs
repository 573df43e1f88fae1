//! Data-ready line instrumentation
//!
//! With [`Config::data_ready_interrupt`](crate::config::Config) set the INT pin
//! pulses once per sample. Wiring that pin to an edge interrupt is left to the
//! board code, whose handler calls [`DataReadyProbe::on_edge`] with a
//! microsecond timestamp. The probe only measures; sample delivery never
//! depends on it.

/// Measures the interval between data-ready edges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataReadyProbe {
    last_edge_us: Option<u32>,
    delta_us: Option<u32>,
    edges: u32,
}

impl DataReadyProbe {
    pub const fn new() -> Self {
        Self {
            last_edge_us: None,
            delta_us: None,
            edges: 0,
        }
    }

    /// Record an edge seen at `now_us`, returns the time since the previous one
    ///
    /// The timestamp is a free running counter, wrap around is handled.
    pub fn on_edge(&mut self, now_us: u32) -> Option<u32> {
        let delta = self.last_edge_us.map(|last| now_us.wrapping_sub(last));
        if delta.is_some() {
            self.delta_us = delta;
        }
        self.last_edge_us = Some(now_us);
        self.edges = self.edges.wrapping_add(1);

        delta
    }

    /// Interval between the two most recent edges
    pub fn last_delta_us(&self) -> Option<u32> {
        self.delta_us
    }

    pub fn edges(&self) -> u32 {
        self.edges
    }
}
