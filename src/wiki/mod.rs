use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod cache;
pub mod client;
pub mod lookup;

pub use cache::{CachedPageSource, PageCache};
pub use client::MediaWikiClient;
pub use lookup::{Encyclopedia, LookupOutcome, LookupResult, PreviewLimits};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh")]
    Chinese,
}

impl Locale {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Chinese => "zh",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// What one encyclopedia query tells us about a title.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub title: String,
    pub exists: bool,
    #[serde(default)]
    pub summary: String,
    /// Language code -> page title in that language.
    #[serde(default)]
    pub langlinks: BTreeMap<String, String>,
}

impl PageSnapshot {
    pub fn missing(title: &str) -> Self {
        Self {
            title: title.to_string(),
            exists: false,
            summary: String::new(),
            langlinks: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn link_for(&self, locale: Locale) -> Option<&str> {
        self.langlinks.get(locale.code()).map(String::as_str)
    }
}

pub trait PageSource {
    fn page(&self, locale: Locale, title: &str) -> anyhow::Result<PageSnapshot>;
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn page(&self, locale: Locale, title: &str) -> anyhow::Result<PageSnapshot> {
        (**self).page(locale, title)
    }
}

impl<S: PageSource + ?Sized> PageSource for Box<S> {
    fn page(&self, locale: Locale, title: &str) -> anyhow::Result<PageSnapshot> {
        (**self).page(locale, title)
    }
}
