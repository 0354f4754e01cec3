use once_cell::sync::Lazy;
use regex::Regex;

static REPEATED_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").expect("Failed to compile space pattern"));

static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f-\x{9f}]").expect("Failed to compile control-char pattern")
});

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("Failed to compile newline pattern"));

/// Normalises extracted document text before it is sent to the model.
pub fn clean(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = text.replace('\t', " ");
    let text = REPEATED_SPACES.replace_all(&text, " ");

    let text = CONTROL_CHARS.replace_all(&text, "");
    let text = text.replace('\u{f0b7}', "•").replace('\u{200b}', "");

    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");

    // Trailing spaces per line
    let mut result = String::with_capacity(text.len());
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            result.push('\n');
        }
        result.push_str(line.trim_end());
    }

    result.trim().to_string()
}
