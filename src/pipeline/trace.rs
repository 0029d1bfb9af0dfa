use std::path::PathBuf;

use anyhow::Context;
use sha2::{Digest, Sha256};

use crate::level::{Level, ScriptVariant};

/// Dumps final prompts into a trace directory, one file per distinct prompt.
pub struct TraceWriter {
    dir: PathBuf,
    enabled: bool,
}

impl TraceWriter {
    pub fn new(dir: PathBuf, enabled: bool) -> anyhow::Result<Self> {
        if enabled {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create trace dir: {}", dir.display()))?;
        }
        Ok(Self { dir, enabled })
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    /// Returns the written path, or `None` while tracing is off.
    pub fn write_prompt(
        &self,
        script: ScriptVariant,
        level: Level,
        prompt: &str,
    ) -> anyhow::Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }
        let path = self.dir.join(prompt_file_name(script, level, prompt));
        std::fs::write(&path, prompt).with_context(|| format!("write trace: {}", path.display()))?;
        Ok(Some(path))
    }
}

/// `prompt_<script>_<level>_<12 hex of sha256>.txt`; identical prompts share a file.
fn prompt_file_name(script: ScriptVariant, level: Level, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("prompt_{}_{}_{}.txt", script.key(), level.key(), &digest[..12])
}
