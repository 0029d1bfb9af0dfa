use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::config::PromptsSection;
use crate::level::ScriptVariant;

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";

pub const DEFAULT_SIMPLIFIED: &str = "simplified.prompt";
pub const DEFAULT_TRADITIONAL: &str = "traditional.prompt";

/// Positional slots a template may reference: 0 = level label, 1 = source text.
pub const SLOT_COUNT: usize = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(usize),
}

/// An instruction template with `{}` / `{0}` / `{1}` slots and `{{` `}}` escapes,
/// checked and split into segments once at load time.
#[derive(Clone, Debug)]
pub struct InstructionTemplate {
    text: String,
    segments: Vec<Segment>,
}

impl InstructionTemplate {
    /// Braces must balance, slot 0 must appear, and no slot past 1 may be
    /// referenced.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let segments = tokenize(text)?;
        let mut has_label = false;
        for seg in &segments {
            if let Segment::Slot(i) = seg {
                if *i >= SLOT_COUNT {
                    return Err(anyhow!(
                        "template references slot {i}, only {SLOT_COUNT} are available"
                    ));
                }
                has_label |= *i == 0;
            }
        }
        if !has_label {
            return Err(anyhow!("template never references the level label slot"));
        }
        Ok(Self {
            text: text.to_string(),
            segments,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn render(&self, label: &str, source: &str) -> String {
        let args: [&str; SLOT_COUNT] = [label, source];
        let mut out = String::with_capacity(self.text.len() + source.len());
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Slot(i) => out.push_str(args[*i]),
            }
        }
        out
    }
}

#[derive(Clone, Debug)]
pub struct PromptSet {
    pub simplified: InstructionTemplate,
    pub traditional: InstructionTemplate,
}

impl PromptSet {
    pub fn load(config_dir: &Path, p: &PromptsSection) -> anyhow::Result<Self> {
        Ok(Self {
            simplified: read_prompt(config_dir, p.simplified.as_deref(), DEFAULT_SIMPLIFIED)?,
            traditional: read_prompt(config_dir, p.traditional.as_deref(), DEFAULT_TRADITIONAL)?,
        })
    }

    #[must_use]
    pub fn for_script(&self, script: ScriptVariant) -> &InstructionTemplate {
        match script {
            ScriptVariant::Simplified => &self.simplified,
            ScriptVariant::Traditional => &self.traditional,
        }
    }
}

/// Resolves a prompt path. Without a configured path, `prompts/<file>` is
/// tried first, then the older flat layout `<config_dir>/<file>`.
fn prompt_path(config_dir: &Path, configured: Option<&str>, default_filename: &str) -> PathBuf {
    if let Some(c) = configured {
        let p = PathBuf::from(c);
        return if p.is_relative() { config_dir.join(p) } else { p };
    }
    let nested = config_dir.join(DEFAULT_PROMPTS_DIR).join(default_filename);
    let flat = config_dir.join(default_filename);
    if !nested.exists() && flat.exists() {
        flat
    } else {
        nested
    }
}

fn read_prompt(
    config_dir: &Path,
    configured: Option<&str>,
    default_filename: &str,
) -> anyhow::Result<InstructionTemplate> {
    let p = prompt_path(config_dir, configured, default_filename);
    if !p.exists() {
        return Err(anyhow!(
            "prompt file not found: {} (run: zh-simplifier --init-config)",
            p.display()
        ));
    }
    let text = std::fs::read_to_string(&p).with_context(|| format!("read prompt: {}", p.display()))?;
    InstructionTemplate::parse(&text).with_context(|| format!("invalid prompt: {}", p.display()))
}

fn tokenize(template: &str) -> anyhow::Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut auto_next = 0usize;
    let mut used_auto = false;
    let mut used_manual = false;
    let mut chars = template.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match ch {
            '{' => {
                if let Some((_, '{')) = chars.peek() {
                    chars.next();
                    literal.push('{');
                    continue;
                }
                let mut field = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    field.push(c);
                }
                if !closed {
                    return Err(anyhow!("unclosed '{{' at byte {i}"));
                }
                let field = field.trim();
                let idx = if field.is_empty() {
                    used_auto = true;
                    auto_next += 1;
                    auto_next - 1
                } else {
                    used_manual = true;
                    field
                        .parse::<usize>()
                        .map_err(|_| anyhow!("unsupported slot {{{field}}} at byte {i}"))?
                };
                if used_auto && used_manual {
                    return Err(anyhow!(
                        "cannot mix automatic {{}} and numbered {{N}} slots"
                    ));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Slot(idx));
            }
            '}' => {
                if let Some((_, '}')) = chars.peek() {
                    chars.next();
                    literal.push('}');
                    continue;
                }
                return Err(anyhow!("single '}}' at byte {i}"));
            }
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

pub fn default_prompt_files() -> Vec<(&'static str, &'static str)> {
    vec![
        (DEFAULT_SIMPLIFIED, DEFAULT_SIMPLIFIED_TEXT),
        (DEFAULT_TRADITIONAL, DEFAULT_TRADITIONAL_TEXT),
    ]
}

pub const DEFAULT_SIMPLIFIED_TEXT: &str = r#"你是一名中文老师。请把下面这段文字改写成适合{0}阅读的版本。

要求：
- 全文使用简体中文。
- 保留原文的主要事实，不要编造内容。
- 使用{0}能够理解的常用词语和短句，必要时解释难词。
- 只输出改写后的文字，不要添加标题、说明或原文。
"#;

pub const DEFAULT_TRADITIONAL_TEXT: &str = r#"你是一名中文老師。請把下面這段文字改寫成適合{0}閱讀的版本。

要求：
- 全文使用繁體中文。
- 保留原文的主要事實，不要編造內容。
- 使用{0}能夠理解的常用詞語和短句，必要時解釋難詞。
- 只輸出改寫後的文字，不要添加標題、說明或原文。
"#;
