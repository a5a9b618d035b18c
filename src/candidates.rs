use std::collections::HashSet;

use url::Url;

/// Ordered, de-duplicated path spellings derived from one media reference.
///
/// Asset references in gift catalogs are written loosely: with or without a
/// leading slash, sometimes `./`-relative, sometimes already absolute. The
/// resolver tries every plausible spelling in a stable order instead of
/// guessing which one the hosting layout expects.
pub fn generate(reference: &str, origin: Option<&Url>) -> Vec<String> {
    let reference = sanitize_reference(reference);
    if reference.is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && seen.insert(candidate.clone()) {
            candidates.push(candidate);
        }
    };

    if has_scheme(&reference) {
        push(reference);
        return candidates;
    }

    let stripped = reference.trim_start_matches('/').to_string();

    push(reference.clone());
    push(stripped.clone());
    push(format!("./{stripped}"));
    push(format!("/{stripped}"));

    if let Some(origin) = origin {
        for relative in [stripped.as_str(), &format!("/{stripped}")] {
            if let Ok(joined) = origin.join(relative) {
                push(joined.to_string());
            }
        }
    }

    candidates
}

fn sanitize_reference(raw: &str) -> String {
    raw.trim().replace("&amp;", "&")
}

fn has_scheme(reference: &str) -> bool {
    reference
        .split_once(':')
        .map(|(scheme, rest)| {
            rest.starts_with("//")
                && !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://example.com").unwrap()
    }

    #[test]
    fn empty_reference_yields_nothing() {
        assert!(generate("", None).is_empty());
        assert!(generate("   ", Some(&origin())).is_empty());
    }

    #[test]
    fn leading_slash_reference_without_origin() {
        let candidates = generate("/clips/a.mp4", None);
        assert_eq!(
            candidates,
            vec!["/clips/a.mp4", "clips/a.mp4", "./clips/a.mp4"]
        );
    }

    #[test]
    fn relative_reference_with_origin_matches_expected_order() {
        let candidates = generate("clips/video.mp4", Some(&origin()));
        assert_eq!(
            candidates,
            vec![
                "clips/video.mp4",
                "./clips/video.mp4",
                "/clips/video.mp4",
                "https://example.com/clips/video.mp4",
            ]
        );
    }

    #[test]
    fn variants_are_deduplicated_preserving_first_seen() {
        let candidates = generate("/clips/a.mp4", Some(&origin()));
        let unique: HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
        assert_eq!(candidates[0], "/clips/a.mp4");
        assert!(candidates.contains(&"https://example.com/clips/a.mp4".to_string()));
    }

    #[test]
    fn absolute_reference_passes_through_untouched() {
        let candidates = generate("https://cdn.test/clips/a.mp4", Some(&origin()));
        assert_eq!(candidates, vec!["https://cdn.test/clips/a.mp4"]);
    }

    #[test]
    fn sanitizes_html_encoded_ampersands() {
        let candidates = generate("https://cdn.test/v.mp4?a=1&amp;b=2", None);
        assert_eq!(candidates, vec!["https://cdn.test/v.mp4?a=1&b=2"]);
    }

    #[test]
    fn origin_with_subpath_joins_relative_forms() {
        let origin = Url::parse("https://example.com/gifts/").unwrap();
        let candidates = generate("clips/a.mp4", Some(&origin));
        assert!(candidates.contains(&"https://example.com/gifts/clips/a.mp4".to_string()));
        assert!(candidates.contains(&"https://example.com/clips/a.mp4".to_string()));
    }
}
