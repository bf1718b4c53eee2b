//! Invite reference classification. Syntactic only, never touches the network.
//!
//! Supported forms:
//! - `https://t.me/+HASH`, `https://t.me/joinchat/HASH` (private invite)
//! - `https://t.me/handle`, `@handle`, `handle` (public chat)
//! - `t.me/...` / `telegram.me/...` without scheme (re-validated once with `https://`)

use crate::domain::entities::{InviteReference, LinkKind};
use crate::domain::errors::FormatError;
use regex::Regex;
use std::sync::LazyLock;

/// Human-readable list of accepted formats, shown with format errors.
pub const SUPPORTED_FORMATS: &str = "https://t.me/+abc123, https://t.me/joinchat/abc123, https://t.me/username, @username";

static PRIVATE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:t|telegram)\.me/(?:\+|joinchat/)([A-Za-z0-9_-]+)$")
        .expect("private invite pattern")
});

static PUBLIC_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:t|telegram)\.me/([A-Za-z0-9_]+)$").expect("public url pattern")
});

static HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@?([A-Za-z0-9_]+)$").expect("handle pattern"));

const SCHEMELESS_HOSTS: &[&str] = &["t.me/", "telegram.me/"];

/// Trim whitespace and trailing slashes. Stable under repeated application.
fn clean(raw: &str) -> &str {
    raw.trim_start()
        .trim_end_matches(|c: char| c == '/' || c.is_whitespace())
}

/// Rewrite `raw` to its absolute form. Unrecognized text is only cleaned.
pub fn normalize(raw: &str) -> String {
    let s = clean(raw);
    if let Some(caps) = HANDLE.captures(s) {
        return format!("https://t.me/{}", &caps[1]);
    }
    if SCHEMELESS_HOSTS.iter().any(|h| s.starts_with(h)) {
        return format!("https://{}", s);
    }
    s.to_string()
}

/// Match an absolute URL against the private and public patterns.
fn match_absolute(url: &str) -> Option<(LinkKind, String)> {
    if let Some(caps) = PRIVATE_URL.captures(url) {
        return Some((LinkKind::PrivateHash, caps[1].to_string()));
    }
    PUBLIC_URL
        .captures(url)
        .map(|caps| (LinkKind::PublicHandle, caps[1].to_string()))
}

/// Classify raw user text into an [`InviteReference`].
pub fn classify(raw: &str) -> Result<InviteReference, FormatError> {
    let s = clean(raw);
    if s.is_empty() {
        return Err(FormatError::new("empty reference"));
    }

    let matched = match_absolute(s)
        .or_else(|| {
            HANDLE
                .captures(s)
                .map(|caps| (LinkKind::PublicHandle, caps[1].to_string()))
        })
        .or_else(|| {
            // One retry with a scheme prepended; no further recursion.
            if SCHEMELESS_HOSTS.iter().any(|h| s.starts_with(h)) {
                match_absolute(&format!("https://{}", s))
            } else {
                None
            }
        });

    match matched {
        Some((kind, identifier)) => Ok(InviteReference {
            raw: raw.to_string(),
            normalized: normalize(s),
            kind,
            identifier,
        }),
        None => Err(FormatError::new(format!(
            "unrecognized invite format; use {}",
            SUPPORTED_FORMATS
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_style_hash() {
        let r = classify("https://t.me/+AbCdEf123").unwrap();
        assert_eq!(r.kind, LinkKind::PrivateHash);
        assert_eq!(r.identifier, "AbCdEf123");
    }

    #[test]
    fn test_legacy_joinchat_hash() {
        let r = classify("https://telegram.me/joinchat/Xy_z-09").unwrap();
        assert_eq!(r.kind, LinkKind::PrivateHash);
        assert_eq!(r.identifier, "Xy_z-09");
    }

    #[test]
    fn test_at_handle() {
        let r = classify("@mychannel").unwrap();
        assert_eq!(r.kind, LinkKind::PublicHandle);
        assert_eq!(r.identifier, "mychannel");
        assert_eq!(r.normalized, "https://t.me/mychannel");
    }

    #[test]
    fn test_not_a_link() {
        assert!(classify("not a link").is_err());
        assert!(classify("   ").is_err());
        assert!(classify("https://example.com/+abc").is_err());
    }

    #[test]
    fn test_schemeless_host_is_revalidated() {
        let r = classify("t.me/+AbC").unwrap();
        assert_eq!(r.kind, LinkKind::PrivateHash);
        assert_eq!(r.identifier, "AbC");
        assert_eq!(r.normalized, "https://t.me/+AbC");

        assert!(classify("t.me/bad handle").is_err());
    }

    #[test]
    fn test_trailing_slash_and_case_preserved() {
        let r = classify("https://t.me/MyGroup/").unwrap();
        assert_eq!(r.kind, LinkKind::PublicHandle);
        assert_eq!(r.identifier, "MyGroup");
    }

    #[test]
    fn test_all_forms_agree_with_normalized_form() {
        let forms = [
            "mychannel",
            "@mychannel",
            "https://t.me/mychannel",
            "http://telegram.me/mychannel",
            "t.me/mychannel",
            "https://t.me/+AbCdEf123",
            "t.me/joinchat/AbCdEf123",
            "https://t.me/joinchat/AbCdEf123/",
        ];
        for form in forms {
            let direct = classify(form).unwrap();
            let via_normal = classify(&normalize(form)).unwrap();
            assert_eq!(direct.kind, via_normal.kind, "{form}");
            assert_eq!(direct.identifier, via_normal.identifier, "{form}");
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "",
            "@",
            "@x",
            "x",
            "t.me/",
            "t.me/x/",
            " telegram.me/+h ",
            "x / /",
            "not a link",
            "https://t.me/+abc",
            "@a b",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "{input:?}");
        }
    }
}
