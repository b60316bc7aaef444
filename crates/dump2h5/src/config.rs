//! Run configuration.

use std::path::PathBuf;

use crate::importer::AppendPolicy;

/// Output used when none is given.
pub const DEFAULT_OUTPUT: &str = "data.h5";

/// What one invocation imports, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub output: PathBuf,
    /// Dump files and directories of dumps, in processing order.
    pub inputs: Vec<PathBuf>,
    /// Append the first dump to an existing output instead of replacing it.
    pub append: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            inputs: Vec::new(),
            append: false,
        }
    }
}

impl RunConfig {
    pub fn append_policy(&self) -> AppendPolicy {
        if self.append {
            AppendPolicy::AppendAll
        } else {
            AppendPolicy::CreateFirst
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.output, PathBuf::from("data.h5"));
        assert_eq!(cfg.append_policy(), AppendPolicy::CreateFirst);
    }

    #[test]
    fn append_flag_maps_to_policy() {
        let cfg = RunConfig {
            append: true,
            ..RunConfig::default()
        };
        assert_eq!(cfg.append_policy(), AppendPolicy::AppendAll);
    }
}
