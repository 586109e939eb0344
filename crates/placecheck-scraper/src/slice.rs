//! Balanced-bracket slicing for JSON objects embedded in page markup.

/// Returns the smallest balanced `{...}` or `[...]` prefix of `text[start..]`.
///
/// `text[start..]` must begin with `{` or `[`. Brackets inside string
/// literals are ignored and backslash escapes are honored. Returns `None`
/// when the region is truncated or a closer does not match its opener, so
/// `[42}` is never accepted.
#[must_use]
pub fn slice_balanced(text: &str, start: usize) -> Option<&str> {
    let region = text.get(start..)?;
    if !region.starts_with(['{', '[']) {
        return None;
    }

    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    // All structural characters are ASCII, so byte offsets are always
    // char boundaries when we slice.
    for (i, b) in region.bytes().enumerate() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&region[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Finds `marker` in `text` and slices the first balanced object or array
/// that follows it.
#[must_use]
pub fn slice_after_marker<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let after = text.find(marker)? + marker.len();
    let open = text[after..].find(['{', '['])? + after;
    slice_balanced(text, open)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_object_with_trailing_noise() {
        let text = r#"window.__STATE__ = {"a":{"b":[1,2]}};console.log(1)"#;
        let start = text.find('{').unwrap();
        assert_eq!(slice_balanced(text, start), Some(r#"{"a":{"b":[1,2]}}"#));
    }

    #[test]
    fn brackets_inside_strings_are_ignored() {
        let text = r#"{"a":"}]{["}"#;
        assert_eq!(slice_balanced(text, 0), Some(text));
    }

    #[test]
    fn escaped_quotes_do_not_end_strings() {
        let text = r#"{"a":"say \"}\" twice","b":1} tail"#;
        assert_eq!(slice_balanced(text, 0), Some(r#"{"a":"say \"}\" twice","b":1}"#));
    }

    #[test]
    fn truncated_region_is_none() {
        assert_eq!(slice_balanced(r#"{"a":[1,2"#, 0), None);
    }

    #[test]
    fn mismatched_closer_is_rejected() {
        assert_eq!(slice_balanced("[42}", 0), None);
    }

    #[test]
    fn start_must_be_an_opener() {
        assert_eq!(slice_balanced("x{}", 0), None);
        assert_eq!(slice_balanced("{}", 10), None);
    }

    #[test]
    fn multibyte_text_is_sliced_on_char_boundaries() {
        let text = r#"앞 {"name":"카페 [본점]"} 뒤"#;
        let start = text.find('{').unwrap();
        assert_eq!(slice_balanced(text, start), Some(r#"{"name":"카페 [본점]"}"#));
    }

    #[test]
    fn slice_after_marker_skips_assignment() {
        let text = r#"<script>window.__APOLLO_STATE__ = {"k":1};</script>"#;
        assert_eq!(slice_after_marker(text, "__APOLLO_STATE__"), Some(r#"{"k":1}"#));
        assert_eq!(slice_after_marker(text, "__MISSING__"), None);
    }
}
