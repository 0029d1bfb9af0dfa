use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use zh_simplifier::models::ollama::OllamaClient;
use zh_simplifier::pipeline::{
    init_default_config, Overrides, Services, Session, Settings, Simplifier, TraceWriter,
};
use zh_simplifier::progress::ConsoleProgress;
use zh_simplifier::shell::Shell;
use zh_simplifier::wiki::{CachedPageSource, Encyclopedia, MediaWikiClient, PageCache, PageSource};

#[derive(Parser, Debug)]
#[command(name = "zh-simplifier")]
#[command(about = "Look up Wikipedia articles in English and Chinese, then rewrite Chinese text for a reading level", long_about = None)]
struct Args {
    /// Generate default config + prompt files, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write config/prompt files (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite existing config/prompt files when used with --init-config
    #[arg(long)]
    force: bool,

    /// Config file path (default: search for zh-simplifier.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Generation model name (e.g. glm4, qwen2.5)
    #[arg(long)]
    model: Option<String>,

    /// Starting reading level: elementary | middle | high
    #[arg(long)]
    level: Option<String>,

    /// Starting script: simplified | traditional
    #[arg(long)]
    script: Option<String>,

    /// Always fetch from Wikipedia; do not read or write the page cache
    #[arg(long)]
    no_cache: bool,

    /// Suppress progress logs on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let overrides = Overrides {
        config_path: args.config,
        model: args.model,
        level: args.level,
        script: args.script,
        no_cache: args.no_cache,
        quiet: args.quiet,
    };
    let settings = Settings::resolve(&overrides).context("load settings")?;
    let progress = ConsoleProgress::new(settings.verbose);
    progress.info(format!("Config: {}", settings.config_path.display()));

    let client = MediaWikiClient::new(&settings.wiki_api_url, &settings.contact, settings.wiki_timeout)
        .context("build Wikipedia client")?;
    let source: Box<dyn PageSource> = if settings.cache_enabled {
        progress.info(format!("Page cache: {}", settings.cache_dir.display()));
        Box::new(CachedPageSource::new(
            client,
            PageCache::new(settings.cache_dir.clone(), settings.cache_max_age),
            progress.clone(),
        ))
    } else {
        Box::new(client)
    };

    let generator = OllamaClient::new(&settings.generation_base_url).context("build generation client")?;
    progress.info(format!(
        "Generation backend: {} model={}",
        generator.base_url(),
        settings.model
    ));
    let trace = TraceWriter::new(settings.trace_dir.clone(), settings.trace_prompts)?;

    let services = Services {
        wiki: Encyclopedia::new(source, settings.preview),
        simplifier: Simplifier::new(
            generator,
            &settings.model,
            progress.clone(),
            trace,
            settings.log_max_chars,
        ),
        prompts: settings.prompts.clone(),
        progress,
    };
    let session = Session::new(settings.default_level, settings.default_script);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    Shell::new(&services, session).run(stdin.lock(), &mut stdout)?;
    stdout.flush()?;
    Ok(())
}
