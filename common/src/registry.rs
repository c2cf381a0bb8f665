use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::config::SourceEntry;

// a compiled id-to-path mapping rule
#[derive(Clone, Debug)]
pub struct DataSource {
    pattern: Regex,
    path: String,
}

impl DataSource {
    pub fn new(entry: &SourceEntry) -> Result<Self> {
        let pattern = Regex::new(&entry.pattern)
            .with_context(|| format!("invalid data source pattern {:?}", entry.pattern))?;

        Ok(DataSource {
            pattern,
            path: entry.path.clone(),
        })
    }

    // if the id matches, substitute each named capture group into the path
    // template and return the result
    fn resolve(&self, id: &str) -> Option<String> {
        let captures = self.pattern.captures(id)?;

        let mut path = self.path.clone();
        for name in self.pattern.capture_names().flatten() {
            if let Some(matched) = captures.name(name) {
                path = path.replace(&format!("{{{name}}}"), matched.as_str());
            }
        }

        Some(path)
    }
}

// ordered list of data sources; the first matching pattern wins.  built once
// at startup and read-only afterwards, so requests can share it freely
#[derive(Clone, Debug)]
pub struct DataSourceRegistry {
    sources: Vec<DataSource>,
}

impl DataSourceRegistry {
    pub fn new(entries: &[SourceEntry]) -> Result<Self> {
        let sources = entries.iter().map(DataSource::new).collect::<Result<_>>()?;

        Ok(DataSourceRegistry { sources })
    }

    pub fn resolve(&self, id: &str) -> Option<String> {
        for source in &self.sources {
            if let Some(path) = source.resolve(id) {
                debug!(id, path = %path, "resolved data source");
                return Some(path);
            }
        }

        None
    }
}
