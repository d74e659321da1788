//! Markup patterns shared by the extraction strategies
//!
//! Provider-specific patterns are compiled per provider host at startup;
//! everything else is static.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

lazy_static! {
    // ============ SECONDARY PLAYER (Videa) ============
    static ref VIDEA_PATTERNS: Vec<Regex> = vec![
        Regex::new(r#"(?i)<iframe[^>]*src=["'](?:https?:)?//(?:www\.)?videa\.hu/player\?[^"']*v=([A-Za-z0-9_-]{6,})[^"']*["'][^>]*>"#).unwrap(),
        Regex::new(r#"(?i)https?://(?:www\.)?videa\.hu/player\?[^"'\s>]*v=([A-Za-z0-9_-]{6,})"#).unwrap(),
        Regex::new(r#"(?i)(?:https?:)?//(?:www\.)?videa\.hu/player\?[^"'\s>]*v=([A-Za-z0-9_-]{6,})"#).unwrap(),
    ];

    // ============ BROAD ID PATTERNS ============
    static ref BROAD_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)rpm[_-]?share[_-]([a-zA-Z0-9]{4,})").unwrap(),
        Regex::new(r#"(?i)data-rpm-id=['"]([a-zA-Z0-9]{4,})['"]"#).unwrap(),
        Regex::new(r#"(?i)rpm[_-]?id['"]\s*:\s*['"]([a-zA-Z0-9]{4,})['"]"#).unwrap(),
        Regex::new(r#"(?i)rpm['"]\s*:\s*['"]([a-zA-Z0-9]{4,})['"]"#).unwrap(),
        Regex::new(r"(?i)background-image:\s*url\([^)]*/([a-zA-Z0-9_-]{15,})/[^)]*\)").unwrap(),
        Regex::new(r"(?i)url\(&quot;/([a-zA-Z0-9_-]{15,})/tab/[^&]*&quot;\)").unwrap(),
        Regex::new(r"(?i)/([a-zA-Z0-9_-]{20,})/tab/[a-zA-Z0-9_-]+/[a-zA-Z0-9_-]+/").unwrap(),
        Regex::new(r#"(?i)"video_?id"\s*:\s*"([a-zA-Z0-9_-]{5,})""#).unwrap(),
        Regex::new(r#"(?i)"videoId"\s*:\s*"([a-zA-Z0-9_-]{5,})""#).unwrap(),
        Regex::new(r"[?&]id=([a-zA-Z0-9_-]{5,})").unwrap(),
        Regex::new(r"(?i)rpm/([a-z0-9]{4,8})[^a-z0-9]").unwrap(),
        Regex::new(r#"(?i)player[^"']*/([a-z0-9]{4,8})['"]"#).unwrap(),
        Regex::new(r#"(?i)stream[^"']*/([a-z0-9]{4,8})['"]"#).unwrap(),
    ];

    static ref SCRIPT_BODY_REGEX: Regex = Regex::new(r"(?is)<script[^>]*>(.*?)</script>").unwrap();

    /// Free-standing short alphanumeric runs
    static ref TOKEN_REGEX: Regex = Regex::new(r"[a-zA-Z0-9]{4,8}").unwrap();

    static ref COMMON_WORD_REGEX: Regex = Regex::new(
        r"(?i)^(true|false|null|undefined|none|auto|left|right|top|bottom|center|middle|alien|online|filmek|sonline|ndash|robots|techblis|platinum|shortcut)$"
    ).unwrap();

    static ref LOWERCASE_ID_REGEX: Regex = Regex::new(r"^[a-z]{5,8}$").unwrap();

    /// Markup and script vocabulary that is never an id
    static ref MARKUP_WORDS: HashSet<&'static str> = [
        "DOCTYPE", "prefix", "charset", "apple", "touch", "hdmozi", "content", "uploads",
        "smile", "mobile", "capable", "status", "style", "black", "theme", "color",
        "viewport", "width", "height", "device", "initial", "scale", "shrink", "title",
        "property", "description", "image", "locale", "updated", "time", "author",
        "section", "published", "favicon", "icon", "sizes", "type", "script", "window",
        "https", "jQuery", "ready", "function", "document", "length", "version", "async",
        "defer", "onload", "innerHTML", "className", "appendChild",
    ]
    .into_iter()
    .collect();
}

/// Obvious non-ids: repeated digits, the classic dummy, very short tokens,
/// or asset path fragments
pub fn is_placeholder(token: &str) -> bool {
    token.len() < 4
        || token == "123456"
        || token.chars().all(|c| c == '0')
        || token.chars().all(|c| c == '1')
        || ["wp-content", "assets", "uploads"]
            .iter()
            .any(|fragment| token.contains(fragment))
}

/// Whether a free-standing token is shaped like a provider id
pub fn looks_like_id(token: &str) -> bool {
    if token.len() < 5 || token.len() > 8 {
        return false;
    }
    if token.chars().all(|c| c.is_ascii_digit())
        || MARKUP_WORDS.contains(token)
        || COMMON_WORD_REGEX.is_match(token)
    {
        return false;
    }

    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    let mixed_case = token.chars().any(|c| c.is_ascii_lowercase())
        && token.chars().any(|c| c.is_ascii_uppercase());
    has_digit || mixed_case || LOWERCASE_ID_REGEX.is_match(token)
}

/// Secondary player id referenced by `text`, if any
pub fn find_videa_id(text: &str) -> Option<String> {
    VIDEA_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `host[:port]` of a base URL, as it appears in embed URLs
pub fn authority_of(base_url: &str) -> Option<String> {
    let url = Url::parse(base_url).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Patterns keyed to the primary provider's embed host
pub struct ProviderPatterns {
    authority: String,
    frame: Regex,
    frame_src: Regex,
    sweep: Vec<Regex>,
    fragment: Regex,
    rescan: Vec<Regex>,
}

impl ProviderPatterns {
    pub fn new(authority: &str) -> Result<Self, regex::Error> {
        let host = regex::escape(authority);
        // Plain or JSON-escaped slash
        let slash = r"(?:\\/|/)";

        Ok(Self {
            authority: authority.to_string(),
            frame: Regex::new(&format!(
                r#"(?i)<iframe[^>]*src=["'](?:https?:)?//{host}/#([a-zA-Z0-9_-]+)["'][^>]*>"#
            ))?,
            frame_src: Regex::new(&format!(r#"(?i)src=["']([^"']*{host}[^"']*)["']"#))?,
            sweep: vec![
                Regex::new(&format!(r"{host}/#([a-zA-Z0-9]+)"))?,
                Regex::new(&format!(r"//{host}/#([a-zA-Z0-9]+)"))?,
                Regex::new(&format!(r"https?://{host}/#([a-zA-Z0-9]+)"))?,
                Regex::new(&format!(r#"src=["'][^"']*{host}/#([a-zA-Z0-9]+)["']"#))?,
                Regex::new(&format!(r"{host}\\/#([a-zA-Z0-9]+)"))?,
            ],
            fragment: Regex::new(&format!(r"{host}{slash}#([a-zA-Z0-9]+)"))?,
            rescan: vec![
                Regex::new(&format!(
                    r#"(?i)<iframe[^>]*src=["'](?:https?:)?{slash}{{2}}{host}{slash}#([a-zA-Z0-9]{{4,}})["'][^>]*>"#
                ))?,
                Regex::new(&format!(r"(?i){host}{slash}#([a-zA-Z0-9]{{4,}})"))?,
                Regex::new(&format!(
                    r"(?i){host}{slash}(?:video|watch|embed){slash}([a-zA-Z0-9]{{4,}})\b"
                ))?,
                Regex::new(&format!(r"(?i){host}/([a-zA-Z0-9]{{4,}})"))?,
                Regex::new(&format!(r#"(?i){host}[^"']*id=([a-zA-Z0-9]{{4,}})"#))?,
            ],
        })
    }

    pub fn from_base_url(base_url: &str) -> Result<Self, regex::Error> {
        let authority = authority_of(base_url).unwrap_or_else(|| base_url.to_string());
        Self::new(&authority)
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Whether the provider host is mentioned anywhere in `html`
    pub fn mentions_provider(&self, html: &str) -> bool {
        html.contains(&self.authority)
    }

    /// Id from an embedded player frame pointing at the provider
    pub fn frame_id(&self, html: &str) -> Option<String> {
        self.frame
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Fragment of the first `src` attribute naming the provider host
    pub fn src_fragment(&self, html: &str) -> Option<String> {
        let raw = self.frame_src.captures(html)?.get(1)?.as_str();
        let absolute = if raw.starts_with("//") {
            format!("https:{}", raw)
        } else {
            raw.to_string()
        };
        let url = Url::parse(&absolute).ok()?;
        url.fragment()
            .filter(|frag| !frag.is_empty())
            .map(str::to_string)
    }

    /// First non-placeholder id from the ordered sweep patterns
    pub fn sweep_id(&self, html: &str) -> Option<String> {
        self.sweep
            .iter()
            .flat_map(|re| re.captures_iter(html))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .find(|id| !is_placeholder(id))
            .map(str::to_string)
    }

    /// Provider fragment id in loader responses, JSON-escaped slashes included
    pub fn fragment_id(&self, text: &str) -> Option<String> {
        self.fragment
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Every candidate id in `html`, most specific sources first, deduplicated
    /// and placeholder-filtered
    pub fn rescan_candidates(&self, html: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut push = |token: &str| {
            if !is_placeholder(token) && seen.insert(token.to_string()) {
                candidates.push(token.to_string());
            }
        };

        let scripts: Vec<String> = SCRIPT_BODY_REGEX
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().replace("\\/", "/"))
            .collect();

        for source in std::iter::once(html).chain(scripts.iter().map(String::as_str)) {
            for re in self.rescan.iter().chain(BROAD_PATTERNS.iter()) {
                for caps in re.captures_iter(source) {
                    if let Some(m) = caps.get(1) {
                        push(m.as_str());
                    }
                }
            }
        }

        for m in TOKEN_REGEX.find_iter(html) {
            if looks_like_id(m.as_str()) {
                push(m.as_str());
            }
        }

        candidates
    }
}
