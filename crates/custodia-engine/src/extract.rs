//! Link extraction from rendered HTML field bodies.
//!
//! The content-link scan phase mines rich-text HTML for references to
//! files and external resources. Extraction is regex-based over the
//! rendered markup; it does not attempt full HTML parsing, matching how
//! the link targets are actually authored in CMS text fields.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use custodia_core::EmbedMethod;

/// One link found in an HTML body, with how it was embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub url: String,
    pub embed_method: EmbedMethod,
    /// Occurrences of this (url, method) pair in the body.
    pub count: i64,
}

static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).expect("anchor regex")
});
static IMG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("img regex")
});
static VIDEO_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<video\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("video regex")
});
static VIDEO_SOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<video\b[^>]*>(.*?)</video>"#).expect("video block regex")
});
static AUDIO_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<audio\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("audio regex")
});
static AUDIO_SOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<audio\b[^>]*>(.*?)</audio>"#).expect("audio block regex")
});
static SOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<source\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("source regex")
});
static OBJECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<object\b[^>]*?\bdata\s*=\s*["']([^"']+)["']"#).expect("object regex")
});
static EMBED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<embed\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("embed regex")
});
static MEDIA_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<drupal-media\b[^>]*?\bdata-entity-uuid\s*=\s*["']([^"']+)["']"#)
        .expect("media token regex")
});
// Bare URL in running text: preceded by start, whitespace, or a closed
// tag, so attribute values do not double-count.
static BARE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|[\s>])(https?://[^\s<>"']+)"#).expect("bare url regex")
});

/// Extract every file/resource link from an HTML body, aggregated per
/// (url, embed method) with occurrence counts.
pub fn extract_links(html: &str) -> Vec<ExtractedLink> {
    let mut counts: HashMap<(String, EmbedMethod), i64> = HashMap::new();
    let mut tally = |url: &str, method: EmbedMethod| {
        let url = url.trim();
        if url.is_empty() || url.starts_with('#') {
            return;
        }
        *counts.entry((url.to_string(), method)).or_insert(0) += 1;
    };

    for cap in ANCHOR_RE.captures_iter(html) {
        tally(&cap[1], EmbedMethod::TextLink);
    }
    for cap in IMG_RE.captures_iter(html) {
        tally(&cap[1], EmbedMethod::InlineImage);
    }
    for cap in VIDEO_SRC_RE.captures_iter(html) {
        tally(&cap[1], EmbedMethod::Html5Video);
    }
    for block in VIDEO_SOURCE_RE.captures_iter(html) {
        for cap in SOURCE_RE.captures_iter(&block[1]) {
            tally(&cap[1], EmbedMethod::Html5Video);
        }
    }
    for cap in AUDIO_SRC_RE.captures_iter(html) {
        tally(&cap[1], EmbedMethod::Html5Audio);
    }
    for block in AUDIO_SOURCE_RE.captures_iter(html) {
        for cap in SOURCE_RE.captures_iter(&block[1]) {
            tally(&cap[1], EmbedMethod::Html5Audio);
        }
    }
    for cap in OBJECT_RE.captures_iter(html) {
        tally(&cap[1], EmbedMethod::ObjectEmbed);
    }
    for cap in EMBED_RE.captures_iter(html) {
        tally(&cap[1], EmbedMethod::EmbedElement);
    }
    for cap in MEDIA_TOKEN_RE.captures_iter(html) {
        tally(&format!("media:{}", &cap[1]), EmbedMethod::MediaEmbed);
    }
    // Bare URLs already captured via an attribute are not text mentions.
    let seen: Vec<String> = counts.keys().map(|(url, _)| url.clone()).collect();
    for cap in BARE_URL_RE.captures_iter(html) {
        let url = cap[1].trim_end_matches(['.', ',', ')', ';']);
        if !seen.iter().any(|s| s == url) {
            *counts
                .entry((url.to_string(), EmbedMethod::TextUrl))
                .or_insert(0) += 1;
        }
    }

    let mut links: Vec<ExtractedLink> = counts
        .into_iter()
        .map(|((url, embed_method), count)| ExtractedLink {
            url,
            embed_method,
            count,
        })
        .collect();
    links.sort_by(|a, b| a.url.cmp(&b.url));
    links
}
