//! Convenient re-exports: `use measureit_common::prelude::*;`

pub use crate::config::{AppConfig, ConfigError, LogLevel};
pub use crate::consts::*;
pub use crate::error::{MeasureItError, ParameterErrorKind};
pub use crate::paths::PersistenceRoot;
