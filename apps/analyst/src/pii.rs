//! PII redaction applied to text before it is sent to the language model.
//!
//! Emails, card-like digit runs (Luhn-valid, 13–19 digits, spaces or dashes
//! allowed) and URLs are replaced with fixed placeholder tokens.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

pub const EMAIL_PLACEHOLDER: &str = "[REDACTED_EMAIL]";
pub const CREDIT_CARD_PLACEHOLDER: &str = "[REDACTED_CREDIT_CARD]";
pub const URL_PLACEHOLDER: &str = "[REDACTED_URL]";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern")
});

static CARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d(?:[ -]?\d){12,18}\b").expect("card pattern"));

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#).expect("url pattern")
});

/// Returns `text` with every email, card number and URL replaced by a placeholder.
pub fn redact_pii(text: &str) -> String {
    let mut emails = 0usize;
    let mut cards = 0usize;
    let mut urls = 0usize;

    let step = EMAIL_RE.replace_all(text, |_: &Captures| {
        emails += 1;
        EMAIL_PLACEHOLDER
    });

    let step = replace_cow(step, &CARD_RE, |caps: &Captures| {
        let candidate = &caps[0];
        match card_prefix_len(candidate) {
            Some(end) => {
                cards += 1;
                format!("{CREDIT_CARD_PLACEHOLDER}{}", &candidate[end..])
            }
            None => candidate.to_string(),
        }
    });

    let step = replace_cow(step, &URL_RE, |caps: &Captures| {
        urls += 1;
        let raw = &caps[0];
        let trimmed = raw.trim_end_matches(['.', ',', ')', ';', ':', '!', '?']);
        format!("{URL_PLACEHOLDER}{}", &raw[trimmed.len()..])
    });

    if emails + cards + urls > 0 {
        debug!(emails, cards, urls, "Redacted PII from inbound text");
    }

    step.into_owned()
}

fn replace_cow<'a, F>(input: Cow<'a, str>, re: &Regex, replacer: F) -> Cow<'a, str>
where
    F: FnMut(&Captures) -> String,
{
    match input {
        Cow::Borrowed(s) => re.replace_all(s, replacer),
        Cow::Owned(s) => Cow::Owned(re.replace_all(&s, replacer).into_owned()),
    }
}

/// Byte length of the longest card number at the start of `candidate`.
/// Shorter numbers only end where a digit group ends, so a CVV typed after the
/// card is left behind instead of hiding the card.
fn card_prefix_len(candidate: &str) -> Option<usize> {
    if luhn_valid(candidate) {
        return Some(candidate.len());
    }
    candidate
        .char_indices()
        .filter(|&(_, c)| c == ' ' || c == '-')
        .map(|(i, _)| i)
        .rev()
        .find(|&end| luhn_valid(&candidate[..end]))
}

/// Luhn checksum over the digits of `candidate`, ignoring separators.
fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_email_card_and_url() {
        let input = "Reach me at user@example.com, card 4111 1111 1111 1111, see https://example.com.";
        let out = redact_pii(input);
        assert!(!out.contains("user@example.com"));
        assert!(!out.contains("4111 1111 1111 1111"));
        assert!(!out.contains("https://example.com"));
        assert!(out.contains(EMAIL_PLACEHOLDER));
        assert!(out.contains(CREDIT_CARD_PLACEHOLDER));
        assert!(out.ends_with(&format!("{URL_PLACEHOLDER}.")));
    }

    #[test]
    fn test_dashed_card_number_is_redacted() {
        let out = redact_pii("paid with 5500-0000-0000-0004 yesterday");
        assert_eq!(out, format!("paid with {CREDIT_CARD_PLACEHOLDER} yesterday"));
    }

    #[test]
    fn test_card_followed_by_cvv_is_redacted() {
        let out = redact_pii("card 4111 1111 1111 1111 123 thanks");
        assert_eq!(out, format!("card {CREDIT_CARD_PLACEHOLDER} 123 thanks"));

        let out = redact_pii("5500-0000-0000-0004-987");
        assert_eq!(out, format!("{CREDIT_CARD_PLACEHOLDER}-987"));
    }

    #[test]
    fn test_non_luhn_digits_are_kept() {
        let input = "order 1234 5678 9012 3456 shipped";
        assert_eq!(redact_pii(input), input);
    }

    #[test]
    fn test_phone_numbers_are_not_cards() {
        let input = "call +1 415 555 0100";
        assert_eq!(redact_pii(input), input);
    }

    #[test]
    fn test_www_url_is_redacted() {
        let out = redact_pii("portfolio: www.ada.dev/projects");
        assert_eq!(out, format!("portfolio: {URL_PLACEHOLDER}"));
    }

    #[test]
    fn test_clean_text_is_untouched() {
        let input = "Senior Rust engineer with 6 years of experience";
        assert_eq!(redact_pii(input), input);
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4111111111111111"));
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid("4111"));
    }
}
