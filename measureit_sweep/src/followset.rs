//! Ordered list of follow parameters sampled after each step.

use measureit_common::error::MeasureItError;
use measureit_parameter::Parameter;

/// An ordered list of parameters sampled after each step. Must not contain
/// the sweep's own controlled parameter(s).
pub struct FollowSet {
    params: Vec<Box<dyn Parameter>>,
}

impl Default for FollowSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowSet {
    /// An empty follow set.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Append one or more follow parameters, rejecting any whose name
    /// collides with an already-controlled identity.
    ///
    /// # Errors
    /// Returns [`MeasureItError::Config`] if `name` collides with a
    /// controlled-parameter identity in `controlled_names`.
    pub fn follow_param(
        &mut self,
        param: Box<dyn Parameter>,
        controlled_names: &[String],
    ) -> Result<(), MeasureItError> {
        if controlled_names.iter().any(|n| n == param.name()) {
            return Err(MeasureItError::Config(format!(
                "follow parameter '{}' is also a controlled parameter of this sweep",
                param.name()
            )));
        }
        self.params.push(param);
        Ok(())
    }

    /// Number of follow parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the follow set is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Names, in declared order.
    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name().to_string()).collect()
    }

    /// Instrument identities, in declared order (used in metadata export).
    pub fn identities(&self) -> Vec<String> {
        self.params.iter().map(|p| p.identity()).collect()
    }

    /// Sample every follow parameter via `safe_get`, in declared order.
    /// Stops at the first failure.
    ///
    /// # Errors
    /// Propagates the first [`MeasureItError`] encountered.
    pub fn sample(&mut self) -> Result<Vec<f64>, MeasureItError> {
        let mut values = Vec::with_capacity(self.params.len());
        for p in self.params.iter_mut() {
            values.push(measureit_parameter::safe_get(p.as_mut())?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measureit_parameter::SimulatedParameter;

    #[test]
    fn rejects_follow_param_matching_controlled() {
        let mut fs = FollowSet::new();
        let p = Box::new(SimulatedParameter::new("gate", "V", 0.0));
        let err = fs.follow_param(p, &["gate".to_string()]).unwrap_err();
        assert!(matches!(err, MeasureItError::Config(_)));
    }

    #[test]
    fn sample_reads_all_in_order() {
        let mut fs = FollowSet::new();
        fs.follow_param(Box::new(SimulatedParameter::new("a", "V", 1.0)), &[]).unwrap();
        fs.follow_param(Box::new(SimulatedParameter::new("b", "V", 2.0)), &[]).unwrap();
        assert_eq!(fs.sample().unwrap(), vec![1.0, 2.0]);
        assert_eq!(fs.names(), vec!["a".to_string(), "b".to_string()]);
    }
}
