use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;

fn default_assoc() -> u64 {
    1
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LevelConfig {
    pub name: String,
    pub size: u64,
    pub block_size: u64,
    #[serde(default = "default_assoc")]
    pub assoc: u64,
    /// trace every access of this level through `log::debug!`
    #[serde(default)]
    pub debug: bool,
}

impl LevelConfig {
    pub fn geometry(&self) -> Result<Geometry> {
        Geometry::new(self.size, self.block_size, self.assoc)
            .map_err(|e| anyhow!("level {}: {e}", self.name))
    }
}

/// levels ordered from the one closest to the core outwards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SimConfig {
    pub levels: Vec<LevelConfig>,
}

impl SimConfig {
    pub fn single(level: LevelConfig) -> Self {
        Self {
            levels: vec![level],
        }
    }
    pub fn deser(file: impl std::io::Read) -> Result<Self> {
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }
    /// whether any level asks for a debug trace.
    pub fn debug_any(&self) -> bool {
        self.levels.iter().any(|l| l.debug)
    }
    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(anyhow!("configuration does not describe any cache level"));
        }
        for l in &self.levels {
            l.geometry()?;
        }
        Ok(())
    }
}
