//! Run outputs handed to downstream pipeline steps.
//!
//! Written as `key=value` lines, the format CI runners read from their
//! step-output file (`$GITHUB_OUTPUT`).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::tagger::ReleaseOutcome;

/// Environment variable naming the CI step-output file
pub const OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Ordered `key=value` pairs produced by a run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOutputs {
    entries: Vec<(String, String)>,
}

impl RunOutputs {
    /// Collects the outputs of a finished run
    pub fn from_outcome(outcome: &ReleaseOutcome, config: &Config) -> Self {
        let mut outputs = RunOutputs::default();

        outputs.set(
            "latest_tag",
            outcome
                .context
                .latest_tag
                .as_ref()
                .map(|tag| tag.to_string())
                .unwrap_or_default(),
        );
        outputs.set("new_tag", outcome.context.new_tag.to_string());
        outputs.set("committed", outcome.committed().to_string());
        outputs.set("pushed", outcome.pushed.to_string());

        for (name, scan) in &config.scans {
            outputs.set(format!("scan_{}", name), scan.enabled.to_string());
            if let Some(endpoint) = &scan.endpoint {
                outputs.set(format!("scan_{}_endpoint", name), endpoint.clone());
            }
        }

        outputs
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Renders one `key=value` line per entry
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect()
    }

    /// Appends the rendered outputs to `path`, creating it if needed
    pub fn append_to(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(self.render().as_bytes())?;
        tracing::debug!(path = %path.display(), "wrote {} outputs", self.entries.len());
        Ok(())
    }
}
