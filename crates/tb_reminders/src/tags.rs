use regex::Regex;

/// Reminders has no native tags; they ride in the notes field below this
/// delimiter so user-authored notes round-trip untouched.
pub const TAGS_DELIMITER: &str = "\n\n---tags---\n";

fn tag_re() -> Regex {
    Regex::new(r"#([a-zA-Z0-9_\-/]+)").expect("valid regex")
}

fn with_hash_prefix(tag: &str) -> String {
    if tag.starts_with('#') {
        tag.to_string()
    } else {
        format!("#{tag}")
    }
}

/// Combine user notes with an encoded tag block. Existing encoded tags in
/// `notes` are replaced, user content above the delimiter is preserved.
pub fn encode_tags_in_notes(notes: Option<&str>, tags: &[String]) -> String {
    let user_notes = match notes {
        Some(text) => match text.find(TAGS_DELIMITER) {
            Some(idx) => &text[..idx],
            None => text,
        },
        None => "",
    };

    let normalized: Vec<String> = tags
        .iter()
        .filter(|tag| !tag.is_empty())
        .map(|tag| with_hash_prefix(tag))
        .collect();

    if normalized.is_empty() {
        return user_notes.trim_end().to_string();
    }
    if user_notes.trim().is_empty() {
        format!("{}{}", TAGS_DELIMITER, normalized.join(" "))
    } else {
        format!(
            "{}{}{}",
            user_notes.trim_end(),
            TAGS_DELIMITER,
            normalized.join(" ")
        )
    }
}

/// Split a combined notes field back into user notes and tags.
pub fn decode_tags_from_notes(notes: Option<&str>) -> (Option<String>, Vec<String>) {
    let Some(text) = notes else {
        return (None, Vec::new());
    };
    let Some(idx) = text.find(TAGS_DELIMITER) else {
        return (
            if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            },
            Vec::new(),
        );
    };

    let user_part = &text[..idx];
    let tag_part = &text[idx + TAGS_DELIMITER.len()..];
    let user_notes = if user_part.trim().is_empty() {
        None
    } else {
        Some(user_part.trim_end().to_string())
    };
    let tags = tag_re()
        .captures_iter(tag_part)
        .map(|caps| format!("#{}", caps.get(1).expect("tag group").as_str()))
        .collect();
    (user_notes, tags)
}
