//! The `Parameter` trait: an external handle owned by its instrument.
//!
//! A sweep holds only a non-owning reference to each `Parameter` it controls
//! or follows.

/// Optional descriptive metadata for a parameter.
#[derive(Debug, Clone, Default)]
pub struct ParameterMetadata {
    /// Human-readable label, distinct from the stable `name()`.
    pub label: Option<String>,
    /// Valid range, if the instrument exposes one.
    pub range: Option<(f64, f64)>,
}

/// An external handle with a stable name, a unit, a `get()` capability, and
/// optionally a `set(value)` capability.
///
/// Implementors are not assumed to be thread-safe: only the Runner touches
/// a parameter while its owning sweep is RUNNING.
pub trait Parameter: Send {
    /// Stable identifying name, unique within the owning instrument.
    fn name(&self) -> &str;

    /// Unit string (e.g. "V", "A", "Hz"). Empty string if dimensionless.
    fn unit(&self) -> &str;

    /// Read the current value from the instrument.
    ///
    /// # Errors
    /// Returns an instrument-defined error message on communication failure.
    fn get(&mut self) -> Result<f64, String>;

    /// Write a new value to the instrument, if this parameter supports
    /// setting. Returns `None` for get-only (follow) parameters the caller
    /// mistakenly tried to set.
    ///
    /// # Errors
    /// Returns an instrument-defined error message on communication failure.
    fn set(&mut self, value: f64) -> Result<(), String>;

    /// Whether this parameter supports `set()`. Follow-only parameters
    /// return `false`; controlled parameters must return `true`.
    fn settable(&self) -> bool {
        true
    }

    /// Optional descriptive metadata.
    fn metadata(&self) -> ParameterMetadata {
        ParameterMetadata::default()
    }

    /// A stable instrument identity string used in metadata export — e.g. `"<instrument>.<channel>"`.
    fn identity(&self) -> String {
        self.name().to_string()
    }
}
