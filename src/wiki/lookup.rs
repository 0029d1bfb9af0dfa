use std::fmt;

use super::{Locale, PageSource};
use crate::textutil::preview;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewLimits {
    pub english_chars: usize,
    pub chinese_chars: usize,
}

impl Default for PreviewLimits {
    fn default() -> Self {
        Self {
            english_chars: 500,
            chinese_chars: 200,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupResult {
    pub english_title: String,
    pub chinese_title: String,
    pub english_preview: String,
    pub chinese_preview: String,
    pub chinese_full_summary: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(LookupResult),
    NotFound,
    NoChineseVersion,
}

impl fmt::Display for LookupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(r) => write!(f, "{} ({})", r.chinese_title, r.english_title),
            Self::NotFound => f.write_str("The page does not exist on English Wikipedia."),
            Self::NoChineseVersion => f.write_str(
                "The page does not have a corresponding Chinese version on Wikipedia.",
            ),
        }
    }
}

/// English-first lookup that follows the cross-language link to Chinese.
pub struct Encyclopedia<S> {
    source: S,
    limits: PreviewLimits,
}

impl<S: PageSource> Encyclopedia<S> {
    pub fn new(source: S, limits: PreviewLimits) -> Self {
        Self { source, limits }
    }

    pub fn lookup(&self, term: &str) -> anyhow::Result<LookupOutcome> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(LookupOutcome::NotFound);
        }
        let en = self.source.page(Locale::English, term)?;
        if !en.exists {
            return Ok(LookupOutcome::NotFound);
        }
        let Some(zh_title) = en.link_for(Locale::Chinese) else {
            return Ok(LookupOutcome::NoChineseVersion);
        };
        let zh = self.source.page(Locale::Chinese, zh_title)?;
        if !zh.exists {
            return Ok(LookupOutcome::NoChineseVersion);
        }
        Ok(LookupOutcome::Found(LookupResult {
            english_title: en.title.clone(),
            chinese_title: zh.title.clone(),
            english_preview: preview(&en.summary, self.limits.english_chars),
            chinese_preview: preview(&zh.summary, self.limits.chinese_chars),
            chinese_full_summary: zh.summary,
        }))
    }
}
