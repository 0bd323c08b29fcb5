//! Cross-platform filename sanitization.

/// Longest filename we hand to the native downloader, in characters.
pub const MAX_FILENAME_CHARS: usize = 200;

fn is_reserved(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || ('\u{0}'..='\u{1f}').contains(&c)
}

/// Cleans a candidate filename without substituting a default.
///
/// - Replaces control characters (0x00-0x1F) and `/ \ : * ? " < > |` with `_`
/// - Collapses whitespace runs to one space
/// - Trims leading/trailing whitespace and dots
/// - Collapses consecutive dots
/// - Limits length to [`MAX_FILENAME_CHARS`], keeping the extension
///
/// May return an empty string.
pub fn clean_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_space = false;
    let mut prev_dot = false;

    for c in name.chars() {
        let c = if is_reserved(c) { '_' } else { c };
        if c.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
            prev_dot = false;
            continue;
        }
        if c == '.' {
            if !prev_dot {
                out.push('.');
            }
            prev_dot = true;
            prev_space = false;
            continue;
        }
        out.push(c);
        prev_space = false;
        prev_dot = false;
    }

    let trimmed = out.trim_matches(|c: char| c.is_whitespace() || c == '.');
    truncate_preserving_extension(trimmed, MAX_FILENAME_CHARS)
}

/// Sanitizes a filename; an empty result becomes a generated default name.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = clean_filename(name);
    if cleaned.is_empty() {
        super::default_filename()
    } else {
        cleaned
    }
}

/// Truncates `name` to `max` characters, keeping a trailing `.ext` intact.
pub fn truncate_preserving_extension(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }

    let ext = match name.rfind('.') {
        Some(i) if i > 0 && name[i..].chars().count() < max => &name[i..],
        _ => "",
    };
    let stem_len = max - ext.chars().count();
    let stem: String = name[..name.len() - ext.len()].chars().take(stem_len).collect();
    let stem = stem.trim_end_matches(|c: char| c.is_whitespace() || c == '.');
    format!("{}{}", stem, ext)
}

/// True when `name` carries an extension (a dot that is neither first nor last).
pub fn has_extension(name: &str) -> bool {
    matches!(name.rfind('.'), Some(i) if i > 0 && i + 1 < name.len())
}
