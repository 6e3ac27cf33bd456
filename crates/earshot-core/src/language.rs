//! Language tag handling.

/// Language used when the configuration does not name one.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Normalize a `language-REGION` tag.
///
/// Tags with exactly two hyphen-separated parts get a lower-case language
/// and an upper-case region (`en-us` becomes `en-US`). Anything else is
/// returned unchanged.
pub fn normalize_language(tag: &str) -> String {
    let parts: Vec<&str> = tag.split('-').collect();
    match parts.as_slice() {
        [language, region] => format!("{}-{}", language.to_lowercase(), region.to_uppercase()),
        _ => tag.to_string(),
    }
}
