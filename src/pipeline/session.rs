use std::fmt;

use super::prompts::PromptSet;
use super::simplifier::Simplifier;
use crate::level::{Level, ScriptVariant};
use crate::models::{FragmentStream, GenerationFailed, TextGenerator};
use crate::progress::ConsoleProgress;
use crate::textutil::contains_chinese_characters;
use crate::wiki::{Encyclopedia, LookupOutcome, LookupResult, PageSource};

/// Everything one interactive session knows. Handlers receive it explicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub level: Level,
    pub script: ScriptVariant,
    /// Typed text; wins over the fetched summary whenever it is non-empty.
    pub free_text: String,
    /// Last successful lookup. Failed searches leave it as it was.
    pub lookup: Option<LookupResult>,
}

#[derive(Debug)]
pub enum SimplifyError {
    NoInputProvided,
    NotChineseText(String),
    Generation(GenerationFailed),
}

impl fmt::Display for SimplifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInputProvided => f.write_str("No text to simplify."),
            Self::NotChineseText(text) => {
                write!(f, "String does not contain valid Chinese characters: {text}")
            }
            Self::Generation(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SimplifyError {}

impl From<GenerationFailed> for SimplifyError {
    fn from(e: GenerationFailed) -> Self {
        Self::Generation(e)
    }
}

impl Session {
    pub fn new(level: Level, script: ScriptVariant) -> Self {
        Self {
            level,
            script,
            ..Self::default()
        }
    }

    /// Stores a successful lookup. Returns false (and changes nothing) otherwise.
    pub fn apply_lookup(&mut self, outcome: &LookupOutcome) -> bool {
        match outcome {
            LookupOutcome::Found(r) => {
                self.lookup = Some(r.clone());
                true
            }
            LookupOutcome::NotFound | LookupOutcome::NoChineseVersion => false,
        }
    }

    /// Text the next simplification will use: typed text first, then the
    /// fetched Chinese summary. Whitespace-only typed text still wins and is
    /// rejected by the Chinese gate.
    pub fn source_text(&self) -> Result<&str, SimplifyError> {
        if !self.free_text.is_empty() {
            return Ok(&self.free_text);
        }
        match self.lookup.as_ref() {
            Some(r) => Ok(&r.chinese_full_summary),
            None => Err(SimplifyError::NoInputProvided),
        }
    }

    /// [`Session::source_text`] gated on containing Chinese.
    pub fn checked_source_text(&self) -> Result<&str, SimplifyError> {
        let text = self.source_text()?;
        if !contains_chinese_characters(text) {
            return Err(SimplifyError::NotChineseText(text.to_string()));
        }
        Ok(text)
    }
}

/// Process-wide collaborators shared by every handler call.
pub struct Services<S, G> {
    pub wiki: Encyclopedia<S>,
    pub simplifier: Simplifier<G>,
    pub prompts: PromptSet,
    pub progress: ConsoleProgress,
}

impl<S: PageSource, G: TextGenerator> Services<S, G> {
    pub fn search(&self, session: &mut Session, term: &str) -> anyhow::Result<LookupOutcome> {
        self.progress.info(format!("Search: {}", term.trim()));
        let outcome = self.wiki.lookup(term)?;
        if session.apply_lookup(&outcome) {
            self.progress.info(format!("Found: {outcome}"));
        } else {
            self.progress.info(format!("Search miss: {outcome}"));
        }
        Ok(outcome)
    }

    pub fn simplify(&self, session: &Session) -> Result<FragmentStream, SimplifyError> {
        let source = session.checked_source_text()?;
        let template = self.prompts.for_script(session.script);
        let stream = self
            .simplifier
            .simplify(template, source, session.level, session.script)?;
        Ok(stream)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::prompts::InstructionTemplate;
    use crate::pipeline::simplifier::tests::ScriptedGenerator;
    use crate::pipeline::trace::TraceWriter;
    use crate::wiki::lookup::tests::FakeWiki;
    use crate::wiki::PreviewLimits;

    pub(crate) fn services<'a>(
        wiki: &'a FakeWiki,
        generator: &'a ScriptedGenerator,
    ) -> Services<&'a FakeWiki, &'a ScriptedGenerator> {
        Services {
            wiki: Encyclopedia::new(wiki, PreviewLimits::default()),
            simplifier: Simplifier::new(
                generator,
                "glm4",
                ConsoleProgress::new(false),
                TraceWriter::disabled(),
                80,
            ),
            prompts: PromptSet {
                simplified: InstructionTemplate::parse("简:{}").expect("template"),
                traditional: InstructionTemplate::parse("繁:{}").expect("template"),
            },
            progress: ConsoleProgress::new(false),
        }
    }

    #[test]
    fn successful_search_populates_lookup() {
        let wiki = FakeWiki::dog();
        let generator = ScriptedGenerator::new(vec![]);
        let svc = services(&wiki, &generator);
        let mut session = Session::default();

        let outcome = svc.search(&mut session, "Dog").expect("search");
        assert!(matches!(outcome, LookupOutcome::Found(_)));
        let r = session.lookup.as_ref().expect("lookup stored");
        assert_eq!(r.chinese_title, "狗");
        assert!(r.english_preview.chars().count() <= 503);
        assert!(r.chinese_preview.chars().count() <= 203);
    }

    #[test]
    fn failed_search_leaves_session_untouched() {
        let wiki = FakeWiki::dog();
        let generator = ScriptedGenerator::new(vec![]);
        let svc = services(&wiki, &generator);

        let mut fresh = Session::default();
        assert_eq!(svc.search(&mut fresh, "Qwxzzy").expect("search"), LookupOutcome::NotFound);
        assert_eq!(fresh, Session::default());

        let mut session = Session::default();
        svc.search(&mut session, "Dog").expect("search");
        let before = session.clone();
        assert_eq!(svc.search(&mut session, "Qwxzzy").expect("search"), LookupOutcome::NotFound);
        assert_eq!(session, before);
        // The earlier summary is still the simplification candidate.
        assert_eq!(
            session.source_text().expect("source"),
            "狗是一种家养的哺乳动物。".repeat(40)
        );
    }

    #[test]
    fn free_text_beats_fetched_summary() {
        let wiki = FakeWiki::dog();
        let generator = ScriptedGenerator::new(vec!["好"]);
        let svc = services(&wiki, &generator);
        let mut session = Session::new(Level::Middle, ScriptVariant::Simplified);
        svc.search(&mut session, "Dog").expect("search");
        session.free_text = "  猫很可爱。 ".to_string();

        let text = svc.simplify(&session).expect("stream").collect_text().expect("text");
        assert_eq!(text, "好");
        let prompts = generator.prompts.borrow();
        assert_eq!(prompts[0].1, "简:初中生\n\n猫很可爱。");
    }

    #[test]
    fn empty_free_text_falls_back_to_summary() {
        let mut session = Session::default();
        assert!(matches!(session.source_text(), Err(SimplifyError::NoInputProvided)));

        session.lookup = Some(LookupResult {
            english_title: "Tea".to_string(),
            chinese_title: "茶".to_string(),
            english_preview: "Tea...".to_string(),
            chinese_preview: "茶...".to_string(),
            chinese_full_summary: "茶是饮料。".to_string(),
        });
        assert_eq!(session.source_text().expect("source"), "茶是饮料。");
    }

    #[test]
    fn whitespace_free_text_still_beats_summary() {
        let wiki = FakeWiki::dog();
        let generator = ScriptedGenerator::new(vec!["x"]);
        let svc = services(&wiki, &generator);
        let mut session = Session::default();
        svc.search(&mut session, "Dog").expect("search");
        session.free_text = " \n".to_string();

        assert_eq!(session.source_text().expect("source"), " \n");
        let err = svc.simplify(&session).err().expect("rejected");
        assert!(matches!(err, SimplifyError::NotChineseText(ref t) if t == " \n"));
        assert!(generator.prompts.borrow().is_empty());
    }

    #[test]
    fn non_chinese_text_never_reaches_the_backend() {
        let wiki = FakeWiki::default();
        let generator = ScriptedGenerator::new(vec!["x"]);
        let svc = services(&wiki, &generator);
        let mut session = Session::default();
        session.free_text = "Hello world".to_string();

        let err = svc.simplify(&session).err().expect("rejected");
        assert!(matches!(err, SimplifyError::NotChineseText(ref t) if t == "Hello world"));
        assert!(err.to_string().contains("Hello world"));
        assert!(generator.prompts.borrow().is_empty());
    }

    #[test]
    fn nothing_to_simplify_is_reported() {
        let wiki = FakeWiki::default();
        let generator = ScriptedGenerator::new(vec![]);
        let svc = services(&wiki, &generator);
        let err = svc.simplify(&Session::default()).err().expect("rejected");
        assert!(matches!(err, SimplifyError::NoInputProvided));
    }

    #[test]
    fn script_choice_picks_template_and_label() {
        let wiki = FakeWiki::default();
        let generator = ScriptedGenerator::new(vec![]);
        let svc = services(&wiki, &generator);
        let mut session = Session::new(Level::Middle, ScriptVariant::Traditional);
        session.free_text = "貓".to_string();
        svc.simplify(&session).expect("stream").collect_text().expect("text");
        assert_eq!(generator.prompts.borrow()[0].1, "繁:國中生\n\n貓");
    }
}
