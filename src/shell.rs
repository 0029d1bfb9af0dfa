use std::io::{BufRead, Write};

use anyhow::{anyhow, Context};

use crate::level::{Level, ScriptVariant};
use crate::models::TextGenerator;
use crate::pipeline::{Services, Session, SimplifyError};
use crate::textutil::clip_for_log;
use crate::wiki::{LookupOutcome, PageSource};

const HELP: &str = "\
commands:
  search <term>        look up a term on English Wikipedia and its Chinese page
  text <text>          set the text to simplify (typed text wins over search results)
  text                 enter multi-line text; finish with a line holding only '.'
  clear                forget the typed text
  level <name>         elementary | middle | high
  script <name>        simplified | traditional
  simplify             rewrite the current text for the chosen level and script
  show                 print the current selections
  help                 this list
  quit                 leave (also :q)";

const LLM_NOTE: &str = "Note: responses are generated by an LLM. They may hallucinate and are not guaranteed to match the chosen level.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Search(String),
    Text(Option<String>),
    Clear,
    Level(Level),
    Script(ScriptVariant),
    Simplify,
    Show,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    let cmd = match head.to_ascii_lowercase().as_str() {
        "search" | "s" => {
            if rest.is_empty() {
                return Err(anyhow!("usage: search <term>"));
            }
            Command::Search(rest.to_string())
        }
        "text" | "t" => Command::Text((!rest.is_empty()).then(|| rest.to_string())),
        "clear" => Command::Clear,
        "level" => Command::Level(Level::parse(rest)?),
        "script" => Command::Script(ScriptVariant::parse(rest)?),
        "simplify" | "go" => Command::Simplify,
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | ":q" | ":quit" => Command::Quit,
        other => return Err(anyhow!("unknown command: {other} (type 'help')")),
    };
    Ok(Some(cmd))
}

pub struct Shell<'a, S, G> {
    services: &'a Services<S, G>,
    session: Session,
}

impl<'a, S: PageSource, G: TextGenerator> Shell<'a, S, G> {
    pub fn new(services: &'a Services<S, G>, session: Session) -> Self {
        Self { services, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W) -> anyhow::Result<()> {
        writeln!(out, "Chinese Simplifying Tool | model: {}", self.services.simplifier.model())?;
        writeln!(out, "Type 'help' for commands, 'quit' to leave.")?;
        self.write_selection(out)?;

        let mut line = String::new();
        loop {
            line.clear();
            write!(out, "zh> ")?;
            out.flush()?;
            if input.read_line(&mut line).context("read input")? == 0 {
                break;
            }
            let cmd = match parse_command(&line) {
                Ok(Some(c)) => c,
                Ok(None) => continue,
                Err(e) => {
                    writeln!(out, "error: {e:#}")?;
                    continue;
                }
            };
            if !self.dispatch(cmd, &mut input, out)? {
                break;
            }
        }
        Ok(())
    }

    /// Runs one command. Returns false when the session should end.
    pub fn dispatch<R: BufRead, W: Write>(
        &mut self,
        cmd: Command,
        input: &mut R,
        out: &mut W,
    ) -> anyhow::Result<bool> {
        match cmd {
            Command::Search(term) => self.search(&term, out)?,
            Command::Text(Some(text)) => {
                self.session.free_text = text;
                writeln!(out, "Text set ({} chars). Typed text takes priority.", self.session.free_text.chars().count())?;
            }
            Command::Text(None) => {
                writeln!(out, "Enter text; finish with a line holding only '.'")?;
                self.session.free_text = read_block(input)?;
                writeln!(out, "Text set ({} chars). Typed text takes priority.", self.session.free_text.chars().count())?;
            }
            Command::Clear => {
                self.session.free_text.clear();
                writeln!(out, "Typed text cleared.")?;
            }
            Command::Level(level) => {
                self.session.level = level;
                writeln!(out, "Level: {}", level.display_name())?;
            }
            Command::Script(script) => {
                self.session.script = script;
                writeln!(out, "Script type: {}", script.display_name())?;
            }
            Command::Simplify => self.simplify(out)?,
            Command::Show => self.write_selection(out)?,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn search<W: Write>(&mut self, term: &str, out: &mut W) -> anyhow::Result<()> {
        match self.services.search(&mut self.session, term) {
            Ok(LookupOutcome::Found(r)) => {
                writeln!(out, "Page Title: {} ({})", r.chinese_title, r.english_title)?;
                writeln!(out, "English Preview:\n{}", r.english_preview)?;
                writeln!(out, "Chinese Preview:\n{}", r.chinese_preview)?;
                writeln!(out, "Note: Only pulling article summaries for length reasons.")?;
            }
            Ok(miss) => writeln!(out, "error: {miss}")?,
            Err(e) => writeln!(out, "error: lookup failed: {e:#}")?,
        }
        Ok(())
    }

    fn simplify<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        let source = match self.session.source_text() {
            Ok(s) => s.to_string(),
            Err(e) => {
                writeln!(out, "warning: {e}")?;
                return Ok(());
            }
        };
        writeln!(out, "Original:\n{source}")?;
        writeln!(out, "Simplified Text:")?;

        let stream = match self.services.simplify(&self.session) {
            Ok(s) => s,
            Err(e @ (SimplifyError::NoInputProvided | SimplifyError::NotChineseText(_))) => {
                writeln!(out, "warning: {e}")?;
                return Ok(());
            }
            Err(e) => {
                writeln!(out, "error: {e}")?;
                return Ok(());
            }
        };
        for item in stream {
            match item {
                Ok(fragment) => {
                    write!(out, "{fragment}")?;
                    out.flush()?;
                }
                Err(e) => {
                    writeln!(out)?;
                    writeln!(out, "error: {e}")?;
                    return Ok(());
                }
            }
        }
        writeln!(out)?;
        writeln!(out, "{LLM_NOTE}")?;
        Ok(())
    }

    fn write_selection<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        writeln!(out, "Level: {}", self.session.level.display_name())?;
        writeln!(out, "Script type: {}", self.session.script.display_name())?;
        if !self.session.free_text.is_empty() {
            writeln!(out, "Typed text: {}", clip_for_log(&self.session.free_text, 60))?;
        }
        if let Some(r) = self.session.lookup.as_ref() {
            writeln!(out, "Search result: {} ({})", r.chinese_title, r.english_title)?;
        }
        Ok(())
    }
}

fn read_block<R: BufRead>(input: &mut R) -> anyhow::Result<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line).context("read input")? == 0 {
            break;
        }
        let l = line.trim_end_matches(['\r', '\n']);
        if l.trim() == "." {
            break;
        }
        lines.push(l.to_string());
    }
    Ok(lines.join("\n"))
}
