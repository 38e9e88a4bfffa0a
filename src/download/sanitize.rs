//! Turning scraped titles into safe path components.

use regex::Regex;
use std::sync::OnceLock;

const NAME_MAX: usize = 255;

fn forbidden() -> &'static Regex {
    static FORBIDDEN: OnceLock<Regex> = OnceLock::new();
    FORBIDDEN.get_or_init(|| {
        Regex::new(r#"[<>:"/\\|?*\x00-\x1f\x7f]+"#).expect("static pattern is valid")
    })
}

/// Replaces path separators, characters Windows rejects and control
/// characters with `_`, trims surrounding dots and whitespace and caps the
/// length at 255 bytes. Never returns an empty string.
pub fn sanitize_component(name: &str) -> String {
    sanitize_capped(name, NAME_MAX)
}

/// Sanitizes a file name that `extension` will be appended to, leaving
/// room for the extension within the length cap.
pub fn sanitize_stem(name: &str, extension: &str) -> String {
    sanitize_capped(name, NAME_MAX.saturating_sub(extension.len()).max(1))
}

fn sanitize_capped(name: &str, max: usize) -> String {
    let replaced = forbidden().replace_all(name, "_");
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());

    let mut take = trimmed.len().min(max);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    let capped = trimmed[..take].trim_end();

    if capped.is_empty() {
        "untitled".to_string()
    } else {
        capped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_ordinary_titles() {
        assert_eq!(sanitize_component("CS 61A"), "CS 61A");
        assert_eq!(sanitize_component("Lecture Slides"), "Lecture Slides");
    }

    #[test]
    fn replaces_separators_and_reserved_characters() {
        assert_eq!(sanitize_component("HW 1/2"), "HW 1_2");
        assert_eq!(sanitize_component(r"a\b"), "a_b");
        assert_eq!(sanitize_component("What? Why: <now>"), "What_ Why_ _now_");
        assert_eq!(sanitize_component("tab\there"), "tab_here");
    }

    #[test]
    fn trims_dots_and_spaces() {
        assert_eq!(sanitize_component("  ..hidden.. "), "hidden");
        assert_eq!(sanitize_component(".."), "untitled");
        assert_eq!(sanitize_component(""), "untitled");
    }

    #[test]
    fn caps_length_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_component(&long);
        assert!(out.len() <= NAME_MAX);
        assert!(out.chars().all(|c| c == 'é'));
    }

    #[test]
    fn long_stem_leaves_room_for_extension() {
        let long = "Lecture ".repeat(60);
        let stem = sanitize_stem(&long, ".pptx");
        let name = crate::download::file_name_for(&stem, ".pptx");

        assert!(name.len() <= NAME_MAX);
        assert!(name.ends_with(".pptx"));
        assert_eq!(sanitize_component(&name), name);
    }
}
