use super::prompts::InstructionTemplate;
use super::trace::TraceWriter;
use crate::level::{resolve_label, Level, ScriptVariant};
use crate::models::{FragmentStream, GenerationFailed, TextGenerator};
use crate::progress::ConsoleProgress;
use crate::textutil::clip_for_log;

pub const DEFAULT_MODEL: &str = "glm4";

/// A fully composed rewrite prompt plus what it was built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimplificationRequest {
    pub script: ScriptVariant,
    pub level: Level,
    pub label: &'static str,
    pub prompt: String,
}

/// `instruction + "\n\n" + trimmed source`, where the instruction is the
/// template filled with (label, trimmed source). No content checks here.
pub fn build_request(
    template: &InstructionTemplate,
    source: &str,
    level: Level,
    script: ScriptVariant,
) -> SimplificationRequest {
    let label = resolve_label(script, level);
    let source = source.trim();
    let instruction = template.render(label, source);
    SimplificationRequest {
        script,
        level,
        label,
        prompt: format!("{instruction}\n\n{source}"),
    }
}

pub struct Simplifier<G> {
    generator: G,
    model: String,
    progress: ConsoleProgress,
    trace: TraceWriter,
    log_max_chars: usize,
}

impl<G: TextGenerator> Simplifier<G> {
    pub fn new(
        generator: G,
        model: &str,
        progress: ConsoleProgress,
        trace: TraceWriter,
        log_max_chars: usize,
    ) -> Self {
        Self {
            generator,
            model: model.to_string(),
            progress,
            trace,
            log_max_chars,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one rewrite request and hands back its fragments as they arrive.
    /// Each call is a fresh request; nothing is retried.
    pub fn simplify(
        &self,
        template: &InstructionTemplate,
        source: &str,
        level: Level,
        script: ScriptVariant,
    ) -> Result<FragmentStream, GenerationFailed> {
        let req = build_request(template, source, level, script);
        self.progress.info(format!(
            "Simplify: model={} script={} level={} label={}",
            self.model, req.script, req.level, req.label
        ));
        self.progress.info(format!(
            "Final prompt: {}",
            clip_for_log(&req.prompt, self.log_max_chars)
        ));
        match self.trace.write_prompt(req.script, req.level, &req.prompt) {
            Ok(Some(path)) => self.progress.info(format!("Prompt trace: {}", path.display())),
            Ok(None) => {}
            Err(e) => self.progress.warn(format!("{e:#}")),
        }
        self.generator.generate_stream(&self.model, &req.prompt)
    }
}
