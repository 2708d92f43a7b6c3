//! Text and image screening.

use regex::Regex;
use std::sync::LazyLock;

use super::image::{analyze, ImageThresholds};

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+").expect("static url pattern"));

/// Gambling and crypto-scam vocabulary, English and Khmer.
pub const DEFAULT_TERMS: &[&str] = &[
    // gambling
    "game",
    "gamble",
    "bet",
    "casino",
    "lottery",
    "slot",
    "poker",
    "baccarat",
    "roulette",
    "ភ្នាល់",
    "ល្បែង",
    "ស្លត់",
    "បាការ៉ាត់",
    "ឡូតេ",
    // crypto scams and airdrops
    "airdrop",
    "token",
    "claim free",
    "crypto",
    "web3",
    "defi",
    "wallet connect",
    "connect wallet",
    "snapshot",
    "presale",
    "whitelist",
    "fomo",
    "hurry",
    "limited offer",
    "first come",
    "$friend",
    "socialfi",
    "meme coin",
    "nft giveaway",
    "អាកាសយាន",
    "ថេរូវ",
    "គ្រាប់បរិច្ចាគ",
    "ឥតគិតថ្លៃ",
];

/// Why a message was flagged.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagReason {
    Term(String),
    Url,
    RedDominant { mean_red: f64 },
    Bright { mean: f64 },
}

/// Best-effort keyword, URL and image heuristic filter.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    terms: Vec<String>,
    thresholds: ImageThresholds,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(&[], ImageThresholds::default())
    }
}

impl ContentFilter {
    /// Default vocabulary plus `extra_terms`. Matching is case-insensitive.
    pub fn new(extra_terms: &[String], thresholds: ImageThresholds) -> Self {
        let mut terms: Vec<String> = DEFAULT_TERMS
            .iter()
            .map(|t| t.to_lowercase())
            .chain(
                extra_terms
                    .iter()
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty()),
            )
            .collect();
        terms.sort();
        terms.dedup();
        Self { terms, thresholds }
    }

    pub fn check_text(&self, text: &str) -> Option<FlagReason> {
        let lowered = text.to_lowercase();
        if let Some(term) = self.terms.iter().find(|t| lowered.contains(t.as_str())) {
            return Some(FlagReason::Term(term.clone()));
        }
        if URL_PATTERN.is_match(&lowered) {
            return Some(FlagReason::Url);
        }
        None
    }

    /// Coarse color heuristic. Undecodable data is never flagged.
    pub fn check_image(&self, data: &[u8]) -> Option<FlagReason> {
        let stats = match analyze(data) {
            Ok(Some(stats)) => stats,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(error = %e, "Image could not be analyzed");
                return None;
            }
        };
        if stats.mean_red > self.thresholds.red {
            Some(FlagReason::RedDominant {
                mean_red: stats.mean_red,
            })
        } else if stats.mean > self.thresholds.brightness {
            Some(FlagReason::Bright { mean: stats.mean })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denylisted_term_is_flagged_case_insensitively() {
        let filter = ContentFilter::default();
        assert_eq!(
            filter.check_text("Join our CASINO tonight"),
            Some(FlagReason::Term("casino".to_string()))
        );
        assert_eq!(
            filter.check_text("FREE $FRIEND drop"),
            Some(FlagReason::Term("$friend".to_string()))
        );
    }

    #[test]
    fn test_khmer_term_is_flagged() {
        let filter = ContentFilter::default();
        assert!(filter.check_text("មកលេងល្បែងជាមួយយើង").is_some());
    }

    #[test]
    fn test_bare_url_is_flagged() {
        let filter = ContentFilter::default();
        assert_eq!(filter.check_text("see www.example.com"), Some(FlagReason::Url));
        assert_eq!(
            filter.check_text("HTTPS://example.com/x"),
            Some(FlagReason::Url)
        );
    }

    #[test]
    fn test_clean_message_passes() {
        let filter = ContentFilter::default();
        assert_eq!(filter.check_text("What time do you close today?"), None);
        assert_eq!(filter.check_text("ABC-1234"), None);
    }

    #[test]
    fn test_extra_terms_extend_the_list() {
        let filter = ContentFilter::new(
            &["  Pyramid Scheme ".to_string(), String::new()],
            ImageThresholds::default(),
        );
        assert_eq!(
            filter.check_text("a pyramid scheme offer"),
            Some(FlagReason::Term("pyramid scheme".to_string()))
        );
    }

    #[test]
    fn test_garbage_image_is_not_flagged() {
        let filter = ContentFilter::default();
        assert_eq!(filter.check_image(b"not an image"), None);
    }
}
