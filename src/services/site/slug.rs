//! Title normalization and deterministic content URL construction

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{MediaInfo, MediaKind};

lazy_static! {
    /// Punctuation that separates words in a slug
    static ref SLUG_PUNCT_REGEX: Regex = Regex::new(r"[/:.,;!?()\[\]]").unwrap();
    /// Anything that cannot appear in a slug
    static ref SLUG_STRIP_REGEX: Regex = Regex::new(r"[^a-z0-9\s\-]").unwrap();
    /// Runs of whitespace and dashes
    static ref SLUG_COLLAPSE_REGEX: Regex = Regex::new(r"[\s\-]+").unwrap();
    /// Runs of non-alphanumerics, for match normalization
    static ref NON_ALNUM_REGEX: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    /// Trailing `-YYYY` on a slug
    static ref TRAILING_YEAR_REGEX: Regex = Regex::new(r"-\d{4}$").unwrap();
}

/// Lowercase and fold accented letters to their base Latin letter
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' => out.push('a'),
            'é' | 'è' | 'ê' | 'ë' => out.push('e'),
            'í' | 'ì' | 'î' | 'ï' => out.push('i'),
            'ó' | 'ò' | 'ô' | 'ö' | 'ő' | 'õ' => out.push('o'),
            'ú' | 'ù' | 'û' | 'ü' | 'ű' | 'ũ' => out.push('u'),
            'ý' | 'ÿ' => out.push('y'),
            'ç' => out.push('c'),
            'ñ' => out.push('n'),
            'ß' => out.push_str("ss"),
            other => out.push(other),
        }
    }
    out
}

/// Normalize a title for comparison: folded, alphanumeric words separated by one space
pub fn normalize_for_match(text: &str) -> String {
    NON_ALNUM_REGEX
        .replace_all(&transliterate(text), " ")
        .trim()
        .to_string()
}

/// URL slug of a title, e.g. "Alien: Föld" -> "alien-fold"
pub fn slugify(title: &str) -> String {
    let folded = transliterate(title);
    let dashed = SLUG_PUNCT_REGEX.replace_all(&folded, "-");
    let stripped = SLUG_STRIP_REGEX.replace_all(&dashed, "");
    let collapsed = SLUG_COLLAPSE_REGEX.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Remove a trailing `-YYYY` from a slug
pub fn strip_trailing_year(slug: &str) -> String {
    TRAILING_YEAR_REGEX.replace(slug, "").to_string()
}

pub fn movie_url(base_url: &str, slug: &str) -> String {
    format!("{}/movies/{}/", base_url.trim_end_matches('/'), slug)
}

pub fn series_url(base_url: &str, slug: &str) -> String {
    format!("{}/series/{}/", base_url.trim_end_matches('/'), slug)
}

pub fn tvshow_url(base_url: &str, slug: &str) -> String {
    format!("{}/tvshows/{}/", base_url.trim_end_matches('/'), slug)
}

pub fn episode_url(base_url: &str, slug: &str, season: u32, episode: u32) -> String {
    format!(
        "{}/episodes/{}-{}x{}/",
        base_url.trim_end_matches('/'),
        slug,
        season,
        episode
    )
}

/// Deterministic content URL for a title, used when search gives nothing usable
pub fn construct_url(base_url: &str, info: &MediaInfo, episode: Option<(u32, u32)>) -> Option<String> {
    let slug = slugify(&info.display_title);
    if slug.is_empty() {
        return None;
    }

    let url = match (info.kind, episode) {
        (MediaKind::Movie, _) => movie_url(base_url, &slug),
        (MediaKind::Series, Some((season, ep))) => episode_url(base_url, &slug, season, ep),
        (MediaKind::Series, None) => series_url(base_url, &slug),
    };
    Some(url)
}
