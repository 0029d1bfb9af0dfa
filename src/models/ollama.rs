use std::io::{BufRead, BufReader};
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use super::{FragmentStream, GenerationFailed, TextGenerator};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        // Generation runs until the backend finishes; no client-side timeout.
        let http = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .context("create generation HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn post_generate(&self, model: &str, prompt: &str) -> anyhow::Result<reqwest::blocking::Response> {
        let url = self.generate_url();
        let req = GenerateRequest {
            model,
            prompt,
            stream: true,
        };
        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .with_context(|| format!("request generation: {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            let body = body.trim();
            if body.is_empty() {
                return Err(anyhow!("generation backend returned {status}"));
            }
            return Err(anyhow!("generation backend returned {status} | {body}"));
        }
        Ok(resp)
    }
}

impl TextGenerator for OllamaClient {
    fn generate_stream(&self, model: &str, prompt: &str) -> Result<FragmentStream, GenerationFailed> {
        let resp = self
            .post_generate(model, prompt)
            .map_err(GenerationFailed::before_output)?;
        Ok(FragmentStream::new(GenerateChunks::new(BufReader::new(resp))))
    }
}

/// Decodes the newline-delimited JSON body of a streaming generate call.
pub struct GenerateChunks<R> {
    reader: R,
    line: String,
    done: bool,
}

impl<R: BufRead> GenerateChunks<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            done: false,
        }
    }

    fn fail(&mut self, err: anyhow::Error) -> Option<anyhow::Result<String>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<R: BufRead> Iterator for GenerateChunks<R> {
    type Item = anyhow::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            self.line.clear();
            let bytes = match self.reader.read_line(&mut self.line) {
                Ok(n) => n,
                Err(e) => {
                    return self.fail(anyhow::Error::new(e).context("read generation stream"))
                }
            };
            if bytes == 0 {
                return self.fail(anyhow!("generation stream ended before completion"));
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let chunk: GenerateChunk = match serde_json::from_str(trimmed) {
                Ok(c) => c,
                Err(e) => {
                    let err = anyhow::Error::new(e).context("decode generation chunk");
                    return self.fail(err);
                }
            };
            if let Some(msg) = chunk.error {
                return self.fail(anyhow!("generation backend error: {msg}"));
            }
            if chunk.done {
                self.done = true;
                if chunk.response.is_empty() {
                    return None;
                }
                return Some(Ok(chunk.response));
            }
            if chunk.response.is_empty() {
                continue;
            }
            return Some(Ok(chunk.response));
        }
    }
}
