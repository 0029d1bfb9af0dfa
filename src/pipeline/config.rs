use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::config::{
    find_default_config, load_config, read_contact_file, AppConfig, CONFIG_ENV, CONFIG_FILENAME,
};
use crate::level::{Level, ScriptVariant};
use crate::models::ollama::DEFAULT_BASE_URL;
use crate::pipeline::prompts::{default_prompt_files, PromptSet, DEFAULT_PROMPTS_DIR};
use crate::pipeline::simplifier::DEFAULT_MODEL;
use crate::wiki::cache::DEFAULT_MAX_AGE_DAYS;
use crate::wiki::client::DEFAULT_API_URL;
use crate::wiki::PreviewLimits;

pub const LEGACY_CONTACT_FILE: &str = "user_agent.cfg";

/// Command-line values that win over the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub model: Option<String>,
    pub level: Option<String>,
    pub script: Option<String>,
    pub no_cache: bool,
    pub quiet: bool,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub config_path: PathBuf,

    pub contact: String,
    pub wiki_api_url: String,
    pub wiki_timeout: Duration,
    pub preview: PreviewLimits,

    pub cache_enabled: bool,
    pub cache_dir: PathBuf,
    pub cache_max_age: Duration,

    pub generation_base_url: String,
    pub model: String,

    pub default_level: Level,
    pub default_script: ScriptVariant,

    pub verbose: bool,
    pub trace_dir: PathBuf,
    pub trace_prompts: bool,
    pub log_max_chars: usize,

    pub prompts: PromptSet,
}

impl Settings {
    pub fn resolve(overrides: &Overrides) -> anyhow::Result<Self> {
        let cfg_file = overrides
            .config_path
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(|| find_default_config(CONFIG_FILENAME));

        let mut file_cfg = AppConfig::default();
        if let Some(p) = cfg_file.as_ref() {
            if p.exists() {
                file_cfg = load_config(p)?;
            } else if overrides.config_path.is_some() {
                return Err(anyhow!("config file not found: {}", p.display()));
            }
        }
        let cfg_path = match cfg_file {
            Some(p) => p,
            None => std::env::current_dir()
                .context("resolve current dir")?
                .join(CONFIG_FILENAME),
        };
        Self::from_config(cfg_path, &file_cfg, overrides)
    }

    pub fn from_config(
        cfg_path: PathBuf,
        file_cfg: &AppConfig,
        overrides: &Overrides,
    ) -> anyhow::Result<Self> {
        let config_dir = cfg_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let relative = |s: &str| {
            let p = PathBuf::from(s);
            if p.is_relative() {
                config_dir.join(p)
            } else {
                p
            }
        };

        let contact = resolve_contact(&config_dir, file_cfg)?;
        let wiki_api_url = non_empty(file_cfg.wiki.api_url.as_deref())
            .unwrap_or(DEFAULT_API_URL)
            .to_string();
        let wiki_timeout = Duration::from_secs(file_cfg.wiki.timeout_secs.unwrap_or(30).max(1));
        let defaults = PreviewLimits::default();
        let preview = PreviewLimits {
            english_chars: file_cfg
                .wiki
                .english_preview_chars
                .unwrap_or(defaults.english_chars),
            chinese_chars: file_cfg
                .wiki
                .chinese_preview_chars
                .unwrap_or(defaults.chinese_chars),
        };

        let cache_enabled = !overrides.no_cache && file_cfg.cache.enabled.unwrap_or(true);
        let cache_dir = relative(
            non_empty(file_cfg.cache.dir.as_deref()).unwrap_or(".cache/wiki"),
        );
        let max_age_days = file_cfg.cache.max_age_days.unwrap_or(DEFAULT_MAX_AGE_DAYS);
        let cache_max_age = Duration::from_secs(max_age_days.saturating_mul(24 * 3600));

        let generation_base_url = non_empty(file_cfg.generation.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string();
        let model = non_empty(overrides.model.as_deref())
            .or_else(|| non_empty(file_cfg.generation.model.as_deref()))
            .unwrap_or(DEFAULT_MODEL)
            .to_string();

        let default_level = match overrides
            .level
            .as_deref()
            .or(file_cfg.shell.default_level.as_deref())
        {
            Some(s) => Level::parse(s)?,
            None => Level::default(),
        };
        let default_script = match overrides
            .script
            .as_deref()
            .or(file_cfg.shell.default_script.as_deref())
        {
            Some(s) => ScriptVariant::parse(s)?,
            None => ScriptVariant::default(),
        };

        let verbose = !overrides.quiet && file_cfg.shell.verbose.unwrap_or(true);
        let trace_dir = relative(non_empty(file_cfg.shell.trace_dir.as_deref()).unwrap_or("_trace"));
        let trace_prompts = file_cfg.shell.trace_prompts.unwrap_or(false);
        let log_max_chars = file_cfg.shell.log_max_chars.unwrap_or(240);

        let prompts = PromptSet::load(&config_dir, &file_cfg.prompts).context("load prompts")?;

        Ok(Self {
            config_path: cfg_path,
            contact,
            wiki_api_url,
            wiki_timeout,
            preview,
            cache_enabled,
            cache_dir,
            cache_max_age,
            generation_base_url,
            model,
            default_level,
            default_script,
            verbose,
            trace_dir,
            trace_prompts,
            log_max_chars,
            prompts,
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn resolve_contact(config_dir: &Path, cfg: &AppConfig) -> anyhow::Result<String> {
    if let Some(c) = non_empty(cfg.wiki.contact.as_deref()) {
        return Ok(c.to_string());
    }
    if let Some(f) = non_empty(cfg.wiki.contact_file.as_deref()) {
        let mut p = PathBuf::from(f);
        if p.is_relative() {
            p = config_dir.join(p);
        }
        return read_contact_file(&p);
    }
    let legacy = config_dir.join(LEGACY_CONTACT_FILE);
    if legacy.exists() {
        return read_contact_file(&legacy);
    }
    Err(anyhow!(
        "no wiki contact configured: set [wiki].contact in {} (Wikipedia requires an identifying User-Agent)",
        config_dir.join(CONFIG_FILENAME).display()
    ))
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);

    let prompts_dir = dir.join(DEFAULT_PROMPTS_DIR);
    std::fs::create_dir_all(&prompts_dir)
        .with_context(|| format!("create prompts dir: {}", prompts_dir.display()))?;

    for (fname, body) in default_prompt_files() {
        let p = prompts_dir.join(fname);
        if p.exists() && !force {
            continue;
        }
        std::fs::write(&p, body).with_context(|| format!("write prompt: {}", p.display()))?;
    }

    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r#"[wiki]
# Wikipedia asks every client to identify itself. Put a way to reach you here.
contact = "you@example.com"
# Or read it from a JSON file holding {"email": "..."}:
# contact_file = "user_agent.cfg"
api_url = "https://{lang}.wikipedia.org/w/api.php"
english_preview_chars = 500
chinese_preview_chars = 200
timeout_secs = 30

[cache]
enabled = true
dir = ".cache/wiki"
max_age_days = 30

[generation]
base_url = "http://localhost:11434"
model = "glm4"

[prompts]
simplified = "prompts/simplified.prompt"
traditional = "prompts/traditional.prompt"

[shell]
default_script = "traditional"
default_level = "elementary"
verbose = true
trace_dir = "_trace"
trace_prompts = false
log_max_chars = 240
"#;
