use std::fmt;

use anyhow::anyhow;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScriptVariant {
    Simplified,
    #[default]
    Traditional,
}

impl ScriptVariant {
    pub const ALL: [ScriptVariant; 2] = [ScriptVariant::Simplified, ScriptVariant::Traditional];

    /// Parses a variant name (`simplified` / `traditional`, case-insensitive).
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simplified" => Ok(Self::Simplified),
            "traditional" => Ok(Self::Traditional),
            other => Err(anyhow!(
                "invalid script variant: {other:?} (expected: simplified, traditional)"
            )),
        }
    }

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Simplified => "simplified",
            Self::Traditional => "traditional",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Simplified => "Simplified",
            Self::Traditional => "Traditional",
        }
    }
}

impl fmt::Display for ScriptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Level {
    #[default]
    Elementary,
    Middle,
    High,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Elementary, Level::Middle, Level::High];

    /// Parses a level name (`elementary` / `middle` / `high`, case-insensitive).
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elementary" => Ok(Self::Elementary),
            "middle" => Ok(Self::Middle),
            "high" => Ok(Self::High),
            other => Err(anyhow!(
                "invalid level: {other:?} (expected: elementary, middle, high)"
            )),
        }
    }

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Elementary => "elementary",
            Self::Middle => "middle",
            Self::High => "high",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Elementary => "Elementary (小学/小學)",
            Self::Middle => "Middle School (初中/國中)",
            Self::High => "High School (高中)",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Reader label for a level, written in the script of the chosen variant.
#[must_use]
pub fn resolve_label(script: ScriptVariant, level: Level) -> &'static str {
    match (script, level) {
        (ScriptVariant::Simplified, Level::Elementary) => "小学生",
        (ScriptVariant::Simplified, Level::Middle) => "初中生",
        (ScriptVariant::Simplified, Level::High) => "高中生",
        (ScriptVariant::Traditional, Level::Elementary) => "小學生",
        (ScriptVariant::Traditional, Level::Middle) => "國中生",
        (ScriptVariant::Traditional, Level::High) => "高中生",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pair_has_a_stable_label() {
        for script in ScriptVariant::ALL {
            for level in Level::ALL {
                let label = resolve_label(script, level);
                assert!(!label.is_empty());
                assert_eq!(label, resolve_label(script, level));
            }
        }
    }

    #[test]
    fn labels_follow_the_script() {
        assert_eq!(resolve_label(ScriptVariant::Simplified, Level::Middle), "初中生");
        assert_eq!(resolve_label(ScriptVariant::Traditional, Level::Middle), "國中生");
        assert_eq!(resolve_label(ScriptVariant::Traditional, Level::Elementary), "小學生");
        assert_eq!(resolve_label(ScriptVariant::Simplified, Level::High), "高中生");
    }

    #[test]
    fn parse_accepts_known_names_only() {
        assert_eq!(ScriptVariant::parse(" Simplified ").expect("parse"), ScriptVariant::Simplified);
        assert_eq!(Level::parse("HIGH").expect("parse"), Level::High);

        let err = Level::parse("college").expect_err("college is not a level");
        assert!(err.to_string().contains("college"));
        assert!(ScriptVariant::parse("pinyin").is_err());
    }

    #[test]
    fn defaults_match_the_form() {
        assert_eq!(ScriptVariant::default(), ScriptVariant::Traditional);
        assert_eq!(Level::default(), Level::Elementary);
    }
}
