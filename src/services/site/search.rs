//! Search result parsing and candidate scoring

use lazy_static::lazy_static;
use regex::Regex;

use super::slug::normalize_for_match;
use crate::models::{MediaInfo, MediaKind};

/// Candidates scoring below this are not trusted
pub const MIN_ACCEPT_SCORE: i32 = 40;

lazy_static! {
    /// One result block of the search page
    static ref DETAILS_BLOCK_REGEX: Regex =
        Regex::new(r#"(?is)<div class="details">(.*?)</div>\s*</div>"#).unwrap();
    /// Link and title inside a result block
    static ref TITLE_LINK_REGEX: Regex =
        Regex::new(r#"(?i)<div class="title">\s*<a href="([^"]+)">([^<]+)</a>"#).unwrap();
    static ref YEAR_REGEX: Regex =
        Regex::new(r#"(?i)<span class="year">\s*(\d{4})\s*</span>"#).unwrap();
    /// Episode slug ending in `-<season>x<episode>`
    static ref EPISODE_SUFFIX_REGEX: Regex = Regex::new(r"^(.+)-\d+x\d+$").unwrap();
    static ref SLUG_SEPARATOR_REGEX: Regex = Regex::new(r"[-_]+").unwrap();
}

/// One parsed search result
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePage {
    pub url: String,
    pub title: String,
    pub year: Option<i32>,
    pub kind: Option<MediaKind>,
    pub raw_block: String,
}

/// Content kind implied by a site path
pub fn kind_from_url(url: &str) -> Option<MediaKind> {
    if url.contains("/movies/") {
        Some(MediaKind::Movie)
    } else if url.contains("/series/") || url.contains("/tvshows/") || url.contains("/episodes/") {
        Some(MediaKind::Series)
    } else {
        None
    }
}

/// Parse result blocks. Blocks without both a link and a title are skipped.
pub fn parse_search_results(html: &str) -> Vec<CandidatePage> {
    DETAILS_BLOCK_REGEX
        .captures_iter(html)
        .filter_map(|caps| {
            let block = caps.get(1)?.as_str();
            let link = TITLE_LINK_REGEX.captures(block)?;
            let url = link.get(1)?.as_str().to_string();
            let title = link.get(2)?.as_str().trim().to_string();
            if url.is_empty() || title.is_empty() {
                return None;
            }

            let year = YEAR_REGEX
                .captures(block)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok());

            Some(CandidatePage {
                kind: kind_from_url(&url),
                url,
                title,
                year,
                raw_block: block.to_string(),
            })
        })
        .collect()
}

/// Additive match score, higher is better
pub fn score_candidate(candidate: &CandidatePage, info: &MediaInfo) -> i32 {
    let target = normalize_for_match(&info.display_title);
    let title = normalize_for_match(&candidate.title);
    let mut score = 0;

    if title == target {
        score += 100;
    } else if title.contains(&target) || target.contains(&title) {
        score += 60;
    }

    if let (Some(wanted), Some(found)) = (info.year, candidate.year) {
        let diff = (wanted - found).abs();
        score += (30 - diff * 10).max(0);
    }

    if candidate.kind == Some(info.kind) {
        score += 15;
    }

    if candidate.url.contains("/movies/") || candidate.url.contains("/series/") {
        score += 5;
    }

    score
}

/// Highest scoring candidate; ties keep search order
pub fn best_candidate<'a>(
    candidates: &'a [CandidatePage],
    info: &MediaInfo,
) -> Option<(&'a CandidatePage, i32)> {
    let mut best: Option<(&CandidatePage, i32)> = None;
    for candidate in candidates {
        let score = score_candidate(candidate, info);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best
}

/// Series slug behind a search hit: series pages give their last segment,
/// episode pages lose the `-<s>x<e>` suffix. Movie pages give nothing.
pub fn derive_series_slug(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().filter(|s| !s.is_empty())?;

    if trimmed.contains("/series/") || trimmed.contains("/tvshows/") {
        Some(last.to_string())
    } else if trimmed.contains("/episodes/") {
        let slug = EPISODE_SUFFIX_REGEX
            .captures(last)
            .and_then(|c| c.get(1))
            .map_or(last, |m| m.as_str());
        Some(slug.to_string())
    } else {
        None
    }
}

/// Whether a slug's words cover the significant words of `title`.
/// Short single-word titles need an exact word; longer titles need every
/// word over two characters.
pub fn slug_covers_title(slug: &str, title: &str) -> bool {
    let spaced = SLUG_SEPARATOR_REGEX.replace_all(slug, " ");
    let slug_norm = normalize_for_match(&spaced);
    let slug_words: Vec<&str> = slug_norm.split_whitespace().collect();
    let title_norm = normalize_for_match(title);
    let target_words: Vec<&str> = title_norm.split_whitespace().collect();

    match target_words.as_slice() {
        [only] if only.len() <= 4 => slug_words.contains(only),
        words => words
            .iter()
            .all(|w| w.len() <= 2 || slug_words.contains(w)),
    }
}
