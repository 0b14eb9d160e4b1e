use regex::Regex;
use std::sync::LazyLock;

static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s").expect("valid regex"));

const MAX_HEADING_CHARS: usize = 100;
const MAX_HEADING_WORDS: usize = 10;

pub fn normalize_markdown(text: &str) -> String {
    text.lines()
        .map(classify_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn classify_line(raw: &str) -> String {
    let line = raw.trim();

    if line.is_empty() {
        return String::new();
    }

    let short = line.chars().count() < MAX_HEADING_CHARS;

    if short && is_all_uppercase(line) && line.split_whitespace().count() <= MAX_HEADING_WORDS {
        return format!("## {}", title_case(line));
    }

    if short && line.ends_with(':') && starts_uppercase(line) {
        let stripped = line.strip_suffix(':').unwrap_or(line);
        return format!("### {stripped}");
    }

    if let Some(item) = strip_bullet_marker(line) {
        return format!("- {}", item.trim());
    }

    if NUMBERED_ITEM.is_match(line) {
        return line.to_string();
    }

    if raw.starts_with('\t') || raw.starts_with("    ") {
        return format!("```\n{line}\n```");
    }

    line.to_string()
}

fn is_all_uppercase(line: &str) -> bool {
    let mut has_cased = false;
    for character in line.chars() {
        if character.is_lowercase() {
            return false;
        }
        if character.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

fn starts_uppercase(line: &str) -> bool {
    line.chars().next().is_some_and(|first| first.is_uppercase())
}

fn strip_bullet_marker(line: &str) -> Option<&str> {
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("\u{2022} "))
}

fn title_case(line: &str) -> String {
    line.split_whitespace()
        .map(|word| {
            let mut characters = word.chars();
            match characters.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>()
                        + &characters.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
