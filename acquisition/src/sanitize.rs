//! Filesystem/object-key-safe names, per §4.5's `audio/<artist>/<title>.mp3`
//! (and, for freshly downloaded content, `..._<uuid8>.mp3`) key shapes.

use regex::Regex;
use std::sync::LazyLock;

static HOSTILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// Lowercases, strips anything that isn't `[a-z0-9]`, collapses runs into a
/// single underscore, and trims leading/trailing underscores.
#[must_use]
pub fn sanitize_component(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let collapsed = HOSTILE.replace_all(&lowered, "_");
    collapsed.trim_matches('_').to_string()
}

/// The stable lookup key for a previously-ingested `(artist, title)` pair,
/// with no uuid suffix: `audio/<artist>/<title>.mp3`.
#[must_use]
pub fn deterministic_key(prefix: &str, artist: &str, title: &str) -> String {
    format!("{prefix}/{}/{}.mp3", sanitize_component(artist), sanitize_component(title))
}

/// The key a freshly downloaded file is uploaded under:
/// `audio/<artist>/<title>_<uuid8>.mp3`. The uuid suffix keeps concurrent
/// acquisitions of the same `(artist, title)` from clobbering each other;
/// it is never itself looked up by [`deterministic_key`].
#[must_use]
pub fn fresh_key(prefix: &str, artist: &str, title: &str) -> String {
    let uuid8: String = uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("{prefix}/{}/{}_{uuid8}.mp3", sanitize_component(artist), sanitize_component(title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_hostile_characters_and_collapses_runs() {
        assert_eq!(sanitize_component("Daft Punk / Justice!!"), "daft_punk_justice");
    }

    #[test]
    fn trims_leading_and_trailing_underscores() {
        assert_eq!(sanitize_component("***Title***"), "title");
    }

    #[test]
    fn deterministic_key_has_no_uuid_suffix() {
        let key = deterministic_key("audio", "Daft Punk", "One More Time");
        assert_eq!(key, "audio/daft_punk/one_more_time.mp3");
    }

    #[test]
    fn fresh_key_is_unique_across_calls() {
        let a = fresh_key("audio", "Daft Punk", "One More Time");
        let b = fresh_key("audio", "Daft Punk", "One More Time");
        assert_ne!(a, b);
        assert!(a.starts_with("audio/daft_punk/one_more_time_"));
    }
}
