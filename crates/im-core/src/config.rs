//! Configuration types and parsing for idmig.yml

use crate::error::{CoreError, CoreResult};
use crate::ident::SqlIdent;
use crate::table::{DependentTable, TargetTable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "idmig.yml";

/// Default number of rows per batch transaction.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of would-be assignments shown by a dry run.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Main configuration from idmig.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Rows per batch transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of sample assignments reported by a dry run
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Tables whose identifier column is backfilled, in run order
    #[serde(default = "default_tables")]
    pub tables: Vec<TargetTable>,

    /// Tables whose cursor columns are resolved after their parent is migrated
    #[serde(default)]
    pub dependents: Vec<DependentTable>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            sample_size: default_sample_size(),
            tables: default_tables(),
            dependents: Vec::new(),
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_sample_size() -> usize {
    DEFAULT_SAMPLE_SIZE
}

fn default_tables() -> Vec<TargetTable> {
    vec![TargetTable::new(
        SqlIdent::from_static("group_messages"),
        SqlIdent::from_static("id"),
        SqlIdent::from_static("public_id"),
    )
    .with_created_at(SqlIdent::from_static("created_at"))]
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `idmig.yml` from a directory, falling back to built-in defaults
    /// when the file is absent.
    pub fn load_from_dir_or_default(dir: &Path) -> CoreResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            log::debug!(
                "No {} in {}, using built-in defaults",
                CONFIG_FILE_NAME,
                dir.display()
            );
            Ok(Self::default())
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.batch_size == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "batch_size must be a positive integer".to_string(),
            });
        }

        if self.tables.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one entry in tables must be specified".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("Duplicate table '{}' in tables", table.name),
                });
            }
            if table.key == table.target {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "Table '{}': target column must differ from key column",
                        table.name
                    ),
                });
            }
        }

        for dep in &self.dependents {
            if self.table(dep.parent.as_str()).is_none() {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "Dependent '{}' references unknown parent '{}'",
                        dep.name, dep.parent
                    ),
                });
            }
            if dep.reference == dep.cursor {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "Dependent '{}': cursor column must differ from reference column",
                        dep.name
                    ),
                });
            }
        }

        Ok(())
    }

    /// Look up a target table by name
    pub fn table(&self, name: &str) -> Option<&TargetTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Parent table of a dependent
    pub fn parent_of(&self, dep: &DependentTable) -> Option<&TargetTable> {
        self.table(dep.parent.as_str())
    }

    /// Dependents whose parent is `table`
    pub fn dependents_of<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a DependentTable> {
        self.dependents.iter().filter(move |d| d.parent == table)
    }

    /// Restrict the configuration to a single table and its dependents
    pub fn restrict_to(&mut self, table: &str) -> CoreResult<()> {
        if self.table(table).is_none() {
            return Err(CoreError::ConfigInvalid {
                message: format!("Table '{}' is not configured", table),
            });
        }
        self.tables.retain(|t| t.name == table);
        self.dependents.retain(|d| d.parent == table);
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
