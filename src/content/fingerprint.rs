use sha2::{Digest, Sha256};

/// Normalizes page text before hashing
///
/// Leftover tag fragments (`<...>`) and character entities (`&...;`) are
/// replaced by spaces, then the text is lower-cased and runs of whitespace
/// collapse to a single space.
pub fn clean_text(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '<' if starts_tag(&text[i + 1..]) => {
                if let Some(end) = text[i..].find('>') {
                    // Skip the whole tag remnant
                    while let Some((j, _)) = chars.peek() {
                        if *j > i + end {
                            break;
                        }
                        chars.next();
                    }
                    stripped.push(' ');
                } else {
                    stripped.push(c);
                }
            }
            '&' => match entity_len(&text[i..]) {
                Some(len) => {
                    while let Some((j, _)) = chars.peek() {
                        if *j >= i + len {
                            break;
                        }
                        chars.next();
                    }
                    stripped.push(' ');
                }
                None => stripped.push(c),
            },
            _ => stripped.push(c),
        }
    }

    stripped
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn starts_tag(rest: &str) -> bool {
    rest.chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '/' || c == '!')
}

/// Byte length of a `&name;` or `&#123;` entity at the start of `s`
fn entity_len(s: &str) -> Option<usize> {
    let end = s.find(';')?;
    if end < 2 || end > 10 {
        return None;
    }
    let body = &s[1..end];
    let valid = match body.strip_prefix('#') {
        Some(num) => !num.is_empty() && num.chars().all(|c| c.is_ascii_alphanumeric()),
        None => body.chars().all(|c| c.is_ascii_alphanumeric()),
    };
    valid.then_some(end + 1)
}

/// Computes the content fingerprint of a page's body text
///
/// # Arguments
///
/// * `text` - Visible body text as extracted from the page
///
/// # Returns
///
/// * `Some(String)` - Hex-encoded SHA-256 of the cleaned text
/// * `None` - The text is empty after cleaning; such pages never count as duplicates
pub fn fingerprint(text: &str) -> Option<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return None;
    }

    let mut hasher = Sha256::new();
    hasher.update(cleaned.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_collapses_whitespace_and_case() {
        assert_eq!(clean_text("  Hello\n\tWORLD  "), "hello world");
    }

    #[test]
    fn test_clean_strips_markup_remnants() {
        assert_eq!(clean_text("Hello <br/> world&nbsp;again"), "hello world again");
        assert_eq!(clean_text("a &#169; b"), "a b");
    }

    #[test]
    fn test_clean_keeps_plain_symbols() {
        assert_eq!(clean_text("1 < 2 & 3 > 2"), "1 < 2 & 3 > 2");
        assert_eq!(clean_text("fish & chips; tasty"), "fish & chips; tasty");
    }

    #[test]
    fn test_fingerprint_ignores_formatting() {
        let a = fingerprint("Hello   World").unwrap();
        let b = fingerprint("hello world\n").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_differs_for_different_text() {
        assert_ne!(fingerprint("hello world"), fingerprint("hello there"));
    }

    #[test]
    fn test_empty_text_has_no_fingerprint() {
        assert_eq!(fingerprint(""), None);
        assert_eq!(fingerprint("   <p> </p> "), None);
    }
}
