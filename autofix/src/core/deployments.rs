//! Parsing of the deployment listing and revision matching.
//!
//! The listing tool prints a human table whose layout drifts between CLI
//! releases, so candidates are recognized by the shape of the first token
//! rather than by column position.

use std::sync::LazyLock;

use regex::Regex;

/// First tokens (lower-cased) that mark a column-header line.
const HEADER_WORDS: &[&str] = &[
    "age",
    "deployment",
    "deployments",
    "id",
    "url",
    "project",
    "status",
    "environment",
    "duration",
    "username",
];

/// Banner prefixes printed by the CLI before the table.
const BANNER_PREFIXES: &[&str] = &["Vercel CLI", ">"];

/// Characters used to draw table borders and separators.
const BORDER_CHARS: &[char] = &[
    '─', '━', '┌', '└', '┼', '│', '┐', '┘', '├', '┤', '┬', '┴', '═', '-', '=', '+', '|',
];

const PLATFORM_DOMAIN_SUFFIX: &str = ".vercel.app";
const RAW_ID_PREFIX: &str = "dpl_";
const RAW_ID_MIN_LEN: usize = 8;

static URL_SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("url scheme regex should be valid")
});

/// Extract deployment candidates from a listing table, in listed order.
pub fn parse_deployment_list(table: &str) -> Vec<String> {
    table
        .lines()
        .map(str::trim)
        .filter(|line| !is_noise_line(line))
        .filter_map(|line| line.split_whitespace().next())
        .filter(|token| looks_like_deployment(token))
        .map(str::to_string)
        .collect()
}

/// True if `token` has the shape of a deployment URL or raw deployment id.
pub fn looks_like_deployment(token: &str) -> bool {
    looks_like_url(token) || looks_like_raw_id(token)
}

fn looks_like_url(token: &str) -> bool {
    token.contains(PLATFORM_DOMAIN_SUFFIX) || URL_SCHEME_RE.is_match(token)
}

fn looks_like_raw_id(token: &str) -> bool {
    if token.starts_with(RAW_ID_PREFIX) {
        return true;
    }
    token.len() >= RAW_ID_MIN_LEN
        && token.chars().all(|ch| ch.is_ascii_alphanumeric())
        && token.chars().any(|ch| ch.is_ascii_digit())
}

fn is_noise_line(line: &str) -> bool {
    if line.is_empty() {
        return true;
    }
    if BANNER_PREFIXES.iter().any(|prefix| line.starts_with(prefix)) {
        return true;
    }
    if line
        .chars()
        .all(|ch| ch.is_whitespace() || BORDER_CHARS.contains(&ch))
    {
        return true;
    }
    let first = line
        .split_whitespace()
        .next()
        .map(|token| token.trim_end_matches(':').to_lowercase())
        .unwrap_or_default();
    HEADER_WORDS.contains(&first.as_str())
}

/// True if the inspection output of a deployment references `revision`.
///
/// Both streams are searched; the CLI prints metadata on either depending on
/// version and flags.
pub fn mentions_revision(stdout: &str, stderr: &str, revision: &str) -> bool {
    if revision.is_empty() {
        return false;
    }
    stdout.contains(revision) || stderr.contains(revision)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "\
Vercel CLI 28.4.0
> Deployments for acme/web [512ms]

  Deployment                                   Age     Status
  Age   Url   State
  ─────────────────────────────────────────────────────────
  https://web-7h2k9x1ab-acme.vercel.app        3m      Ready
  dpl_4Fq2ZrT9                                 1h      Error
  web9k2m3q7                                   2d      Ready
";

    #[test]
    fn fixture_yields_three_candidates_in_order() {
        let candidates = parse_deployment_list(FIXTURE);
        assert_eq!(
            candidates,
            vec![
                "https://web-7h2k9x1ab-acme.vercel.app",
                "dpl_4Fq2ZrT9",
                "web9k2m3q7",
            ]
        );
    }

    #[test]
    fn header_words_match_case_insensitively() {
        let table = "ID  URL\nDEPLOYMENTS: 3\nid1234567 ok\n";
        // "id1234567" is not the header word "id"; it is a raw id.
        assert_eq!(parse_deployment_list(table), vec!["id1234567"]);
    }

    #[test]
    fn border_only_lines_are_skipped() {
        let table = "┌──────┐\n│      │\n└──────┘\n----- -----\n";
        assert!(parse_deployment_list(table).is_empty());
    }

    #[test]
    fn rejects_tokens_without_deployment_shape() {
        for token in ["3m", "Ready", "abcdefgh", "a1b2c3", "web-app-1234", "●"] {
            assert!(!looks_like_deployment(token), "token: {token}");
        }
    }

    #[test]
    fn accepts_urls_and_raw_ids() {
        for token in [
            "https://example.com/d/1",
            "http://localhost:3000",
            "web-abc.vercel.app",
            "dpl_x",
            "abc12345",
        ] {
            assert!(looks_like_deployment(token), "token: {token}");
        }
    }

    #[test]
    fn revision_match_checks_both_streams() {
        assert!(mentions_revision("commit abc1234 built", "", "abc1234"));
        assert!(mentions_revision("", "ref: abc1234", "abc1234"));
        assert!(!mentions_revision("commit abc1235", "", "abc1234"));
        assert!(!mentions_revision("anything", "anything", ""));
    }
}
