use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::Deserialize;

use super::{Locale, PageSnapshot, PageSource};

pub const DEFAULT_API_URL: &str = "https://{lang}.wikipedia.org/w/api.php";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryBody>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<ApiPage>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    langlinks: Vec<ApiLangLink>,
}

#[derive(Debug, Deserialize)]
struct ApiLangLink {
    lang: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

/// Blocking MediaWiki action API client. One instance serves every locale.
#[derive(Debug, Clone)]
pub struct MediaWikiClient {
    http: reqwest::blocking::Client,
    api_url: String,
}

impl MediaWikiClient {
    pub fn new(api_url: &str, contact: &str, timeout: Duration) -> anyhow::Result<Self> {
        let contact = contact.trim();
        if contact.is_empty() {
            return Err(anyhow!("wiki contact is empty; set [wiki].contact in the config"));
        }
        if !api_url.contains("{lang}") {
            return Err(anyhow!("wiki api_url must contain {{lang}}: {api_url}"));
        }
        let http = reqwest::blocking::Client::builder()
            .user_agent(user_agent(contact))
            .timeout(timeout)
            .build()
            .context("create wiki HTTP client")?;
        Ok(Self {
            http,
            api_url: api_url.trim().to_string(),
        })
    }

    fn endpoint(&self, locale: Locale) -> String {
        self.api_url.replace("{lang}", locale.code())
    }
}

impl PageSource for MediaWikiClient {
    fn page(&self, locale: Locale, title: &str) -> anyhow::Result<PageSnapshot> {
        let url = self.endpoint(locale);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("prop", "extracts|langlinks"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("lllimit", "max"),
                ("titles", title),
            ])
            .send()
            .with_context(|| format!("query {locale} wiki for {title:?}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{locale} wiki returned {status} for {title:?}"));
        }
        let body = resp
            .text()
            .with_context(|| format!("read {locale} wiki response for {title:?}"))?;
        parse_query_response(title, &body)
    }
}

pub fn user_agent(contact: &str) -> String {
    format!("zh-simplifier/{} ({})", env!("CARGO_PKG_VERSION"), contact.trim())
}

/// Turns a `formatversion=2` query response into a snapshot of the first page.
pub fn parse_query_response(requested: &str, body: &str) -> anyhow::Result<PageSnapshot> {
    let resp: QueryResponse = serde_json::from_str(body).context("parse wiki response json")?;
    if let Some(err) = resp.error {
        return Err(anyhow!("wiki api error {}: {}", err.code, err.info));
    }
    let Some(page) = resp.query.and_then(|q| q.pages.into_iter().next()) else {
        return Ok(PageSnapshot::missing(requested));
    };
    if page.missing || page.invalid {
        let title = if page.title.is_empty() {
            requested.to_string()
        } else {
            page.title
        };
        return Ok(PageSnapshot::missing(&title));
    }
    let langlinks: BTreeMap<String, String> = page
        .langlinks
        .into_iter()
        .map(|l| (l.lang, l.title))
        .collect();
    Ok(PageSnapshot {
        title: page.title,
        exists: true,
        summary: page.extract.unwrap_or_default().trim().to_string(),
        langlinks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_existing_page_with_langlinks() {
        let body = r#"{
            "batchcomplete": true,
            "query": {
                "normalized": [{"fromencoded": false, "from": "dog", "to": "Dog"}],
                "pages": [{
                    "pageid": 4269567,
                    "ns": 0,
                    "title": "Dog",
                    "extract": "The dog is a domesticated descendant of the gray wolf.\n",
                    "langlinks": [
                        {"lang": "de", "title": "Haushund"},
                        {"lang": "zh", "title": "狗"}
                    ]
                }]
            }
        }"#;
        let page = parse_query_response("dog", body).expect("parse");
        assert!(page.exists);
        assert_eq!(page.title, "Dog");
        assert_eq!(page.summary, "The dog is a domesticated descendant of the gray wolf.");
        assert_eq!(page.link_for(Locale::Chinese), Some("狗"));
        assert_eq!(page.langlinks.len(), 2);
    }

    #[test]
    fn missing_page_is_not_an_error() {
        let body = r#"{"batchcomplete":true,"query":{"pages":[{"ns":0,"title":"Qwxzzy","missing":true}]}}"#;
        let page = parse_query_response("qwxzzy", body).expect("parse");
        assert!(!page.exists);
        assert_eq!(page.title, "Qwxzzy");
        assert!(page.summary.is_empty());
    }

    #[test]
    fn invalid_title_is_missing() {
        let body = r#"{"query":{"pages":[{"title":"<>","invalidreason":"bad","invalid":true}]}}"#;
        let page = parse_query_response("<>", body).expect("parse");
        assert!(!page.exists);
    }

    #[test]
    fn api_error_is_reported() {
        let body = r#"{"error":{"code":"badvalue","info":"Unrecognized value"}}"#;
        let err = parse_query_response("x", body).expect_err("api error");
        assert!(err.to_string().contains("badvalue"));
    }

    #[test]
    fn client_requires_contact_and_lang_placeholder() {
        assert!(MediaWikiClient::new(DEFAULT_API_URL, "  ", Duration::from_secs(5)).is_err());
        assert!(MediaWikiClient::new("https://example.org/api.php", "me@example.com", Duration::from_secs(5)).is_err());

        let client = MediaWikiClient::new(DEFAULT_API_URL, "me@example.com", Duration::from_secs(5))
            .expect("client");
        assert_eq!(client.endpoint(Locale::Chinese), "https://zh.wikipedia.org/w/api.php");
    }

    #[test]
    fn user_agent_names_contact() {
        assert!(user_agent(" me@example.com ").ends_with("(me@example.com)"));
    }
}
