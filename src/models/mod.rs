use std::fmt;

pub mod ollama;

/// A backend that turns a prompt into a stream of text fragments.
pub trait TextGenerator {
    fn generate_stream(&self, model: &str, prompt: &str) -> Result<FragmentStream, GenerationFailed>;
}

impl<G: TextGenerator + ?Sized> TextGenerator for &G {
    fn generate_stream(&self, model: &str, prompt: &str) -> Result<FragmentStream, GenerationFailed> {
        (**self).generate_stream(model, prompt)
    }
}

impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    fn generate_stream(&self, model: &str, prompt: &str) -> Result<FragmentStream, GenerationFailed> {
        (**self).generate_stream(model, prompt)
    }
}

/// Generation stopped with an error. `partial` holds every fragment that was
/// already handed out; callers have rendered it and cannot take it back.
#[derive(Debug)]
pub struct GenerationFailed {
    pub partial: String,
    pub cause: anyhow::Error,
}

impl GenerationFailed {
    pub fn before_output(cause: anyhow::Error) -> Self {
        Self {
            partial: String::new(),
            cause,
        }
    }
}

impl fmt::Display for GenerationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "generation failed: {:#}", self.cause)
    }
}

impl std::error::Error for GenerationFailed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.cause)
    }
}

/// Forward-only sequence of generated fragments.
///
/// Yields `Ok(fragment)` in arrival order, then ends. A backend error is
/// yielded once as `Err(GenerationFailed)` and the stream is finished after
/// that. Dropping the stream early releases the underlying connection.
pub struct FragmentStream {
    inner: Box<dyn Iterator<Item = anyhow::Result<String>>>,
    produced: String,
    finished: bool,
}

impl FragmentStream {
    pub fn new(inner: impl Iterator<Item = anyhow::Result<String>> + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            produced: String::new(),
            finished: false,
        }
    }

    /// Text yielded so far.
    #[must_use]
    pub fn produced(&self) -> &str {
        &self.produced
    }

    /// Drains the stream into one string.
    pub fn collect_text(mut self) -> Result<String, GenerationFailed> {
        for item in self.by_ref() {
            item?;
        }
        Ok(self.produced)
    }
}

impl Iterator for FragmentStream {
    type Item = Result<String, GenerationFailed>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.inner.next() {
            Some(Ok(fragment)) => {
                self.produced.push_str(&fragment);
                Some(Ok(fragment))
            }
            Some(Err(cause)) => {
                self.finished = true;
                Some(Err(GenerationFailed {
                    partial: self.produced.clone(),
                    cause,
                }))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn stream_concatenates_fragments() {
        let stream = FragmentStream::new(vec![Ok("你".to_string()), Ok("好".to_string())].into_iter());
        assert_eq!(stream.collect_text().expect("complete"), "你好");
    }

    #[test]
    fn failure_carries_partial_text_and_ends_stream() {
        let mut stream = FragmentStream::new(
            vec![
                Ok("第一".to_string()),
                Err(anyhow!("connection reset")),
                Ok("never".to_string()),
            ]
            .into_iter(),
        );
        assert_eq!(stream.next().expect("first").expect("ok"), "第一");
        let err = stream.next().expect("second").expect_err("failure");
        assert_eq!(err.partial, "第一");
        assert!(err.to_string().contains("connection reset"));
        assert!(stream.next().is_none());
        assert_eq!(stream.produced(), "第一");
    }

    #[test]
    fn collect_text_reports_partial() {
        let stream = FragmentStream::new(
            vec![Ok("a".to_string()), Ok("b".to_string()), Err(anyhow!("boom"))].into_iter(),
        );
        let err = stream.collect_text().expect_err("failure");
        assert_eq!(err.partial, "ab");
    }
}
