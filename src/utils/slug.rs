//! Url slugs for categories and courses.

/// Lowercases, keeps ascii alphanumerics, collapses everything else into
/// single dashes. Non-ascii titles can produce an empty slug; callers are
/// expected to substitute a generated fallback.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_dash = true; // suppress a leading dash

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Web Development"), "web-development");
        assert_eq!(slugify("  Rust 101!  "), "rust-101");
    }

    #[test]
    fn slugify_non_ascii_is_empty() {
        assert_eq!(slugify("Программирование"), "");
    }
}
