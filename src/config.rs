use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "zh-simplifier.toml";
pub const CONFIG_ENV: &str = "ZH_SIMPLIFIER_CONFIG";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub wiki: WikiSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub prompts: PromptsSection,
    #[serde(default)]
    pub shell: ShellSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct WikiSection {
    /// Contact string (usually an email address) placed in the User-Agent header.
    #[serde(default)]
    pub contact: Option<String>,
    /// JSON file holding `{"email": "..."}`; used when `contact` is not set.
    #[serde(default)]
    pub contact_file: Option<String>,
    /// Action API URL with a `{lang}` placeholder.
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub english_preview_chars: Option<usize>,
    #[serde(default)]
    pub chinese_preview_chars: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CacheSection {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub max_age_days: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GenerationSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsSection {
    #[serde(default)]
    pub simplified: Option<String>,
    #[serde(default)]
    pub traditional: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ShellSection {
    #[serde(default)]
    pub default_script: Option<String>,
    #[serde(default)]
    pub default_level: Option<String>,
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub trace_dir: Option<String>,
    #[serde(default)]
    pub trace_prompts: Option<bool>,
    #[serde(default)]
    pub log_max_chars: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ContactFile {
    email: String,
}

pub fn find_file_upwards(start: &Path, filename: &str, max_depth: usize) -> Option<PathBuf> {
    let mut dir = Some(start);
    for _ in 0..=max_depth {
        let d = dir?;
        let cand = d.join(filename);
        if cand.is_file() {
            return Some(cand);
        }
        dir = d.parent();
    }
    None
}

pub fn find_default_config(filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    parse_config(&text).with_context(|| format!("parse config: {}", path.display()))
}

pub fn parse_config(text: &str) -> anyhow::Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(text).context("parse config toml")?;
    Ok(cfg)
}

/// Reads the contact address from a `{"email": "..."}` JSON file.
pub fn read_contact_file(path: &Path) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read contact file: {}", path.display()))?;
    let parsed: ContactFile = serde_json::from_str(&text)
        .with_context(|| format!("parse contact file: {}", path.display()))?;
    let email = parsed.email.trim().to_string();
    if email.is_empty() {
        return Err(anyhow!("contact file has an empty email: {}", path.display()));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = parse_config("").expect("parse");
        assert!(cfg.wiki.contact.is_none());
        assert!(cfg.generation.model.is_none());
        assert!(cfg.cache.enabled.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let cfg = parse_config(
            r#"
[wiki]
contact = "me@example.com"
english_preview_chars = 300

[cache]
enabled = false
max_age_days = 7

[generation]
model = "qwen2"

[prompts]
simplified = "p/s.prompt"

[shell]
default_script = "simplified"
trace_prompts = true
"#,
        )
        .expect("parse");
        assert_eq!(cfg.wiki.contact.as_deref(), Some("me@example.com"));
        assert_eq!(cfg.wiki.english_preview_chars, Some(300));
        assert_eq!(cfg.cache.enabled, Some(false));
        assert_eq!(cfg.cache.max_age_days, Some(7));
        assert_eq!(cfg.generation.model.as_deref(), Some("qwen2"));
        assert_eq!(cfg.prompts.simplified.as_deref(), Some("p/s.prompt"));
        assert!(cfg.prompts.traditional.is_none());
        assert_eq!(cfg.shell.default_script.as_deref(), Some("simplified"));
        assert_eq!(cfg.shell.trace_prompts, Some(true));
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(parse_config("[cache]\nmax_age_days = \"soon\"\n").is_err());
    }

    #[test]
    fn contact_file_reads_email() {
        let dir = std::env::temp_dir().join(format!("zh-simplifier-contact-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("user_agent.cfg");

        std::fs::write(&path, r#"{"email": " me@example.com "}"#).expect("write");
        assert_eq!(read_contact_file(&path).expect("read"), "me@example.com");

        std::fs::write(&path, r#"{"email": ""}"#).expect("write");
        assert!(read_contact_file(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn find_upwards_walks_parents() {
        let root = std::env::temp_dir().join(format!("zh-simplifier-find-{}", std::process::id()));
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(root.join(CONFIG_FILENAME), "").expect("write");

        assert_eq!(
            find_file_upwards(&nested, CONFIG_FILENAME, 4),
            Some(root.join(CONFIG_FILENAME))
        );
        assert_eq!(find_file_upwards(&nested, CONFIG_FILENAME, 1), None);

        let _ = std::fs::remove_dir_all(&root);
    }
}
