use once_cell::sync::Lazy;
use regex::Regex;

static CJK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{4e00}-\u{9fff}\u{3400}-\u{4dbf}\u{f900}-\u{faff}]").expect("cjk")
});

pub const ELLIPSIS: &str = "...";

/// True when the text holds at least one CJK ideograph (unified, extension A or
/// compatibility block). Says nothing about simplified vs traditional.
#[must_use]
pub fn contains_chinese_characters(text: &str) -> bool {
    CJK_RE.is_match(text)
}

/// First `max_chars` characters of `text` followed by `...`.
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Single-line form of `text` for log output, cut to `max_chars` characters.
#[must_use]
pub fn clip_for_log(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}
