//! A minimal in-memory instrument registry implementing
//! [`measureit_sweep::metadata::Station`], for resolving parameter
//! identities back into live handles when reloading sweep metadata.

use measureit_parameter::{Parameter, SimulatedParameter};
use measureit_sweep::metadata::Station;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Owns every simulated instrument channel the demo station exposes,
/// keyed by identity string.
#[derive(Clone, Default)]
pub struct DemoStation {
    channels: Arc<Mutex<HashMap<String, (String, f64)>>>,
}

impl DemoStation {
    /// A station with no channels registered yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel under `identity`, with a starting value.
    pub fn register(&self, identity: impl Into<String>, unit: impl Into<String>, initial: f64) {
        self.channels.lock().insert(identity.into(), (unit.into(), initial));
    }
}

impl Station for DemoStation {
    fn resolve(&self, identity: &str) -> Option<Box<dyn Parameter>> {
        let (unit, initial) = self.channels.lock().get(identity).cloned()?;
        Some(Box::new(SimulatedParameter::new(identity, unit, initial)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_channel() {
        let station = DemoStation::new();
        station.register("dmm.ch1", "V", 1.5);
        let mut param = station.resolve("dmm.ch1").unwrap();
        assert_eq!(param.get().unwrap(), 1.5);
    }

    #[test]
    fn unregistered_identity_resolves_to_none() {
        let station = DemoStation::new();
        assert!(station.resolve("missing").is_none());
    }
}
