//! Text heuristics over fetched page markup.
//!
//! Readers and scrapers hand back flattened text or markdown; staff blocks,
//! phone numbers, and profile links are recovered with line-level rules
//! rather than a DOM.

use regex::Regex;

use crate::domain::candidate::{matches_role_keyword, ROLE_KEYWORDS};
use crate::providers::contracts::StaffEntry;

/// Phone formats seen on club sites: (804) 784-5663, 804-592-5861,
/// 804.529.5367, optionally with an extension.
pub fn phone_pattern() -> Regex {
    Regex::new(r"(?:\(\d{3}\)|\d{3})[-.\s]?\d{3}[-.\s]?\d{4}(?:\s?(?:ext|x)\.?\s?\d+)?")
        .expect("static regex is valid")
}

pub fn find_phone(text: &str) -> Option<String> {
    phone_pattern()
        .find(text)
        .map(|m| m.as_str().trim().to_owned())
}

pub fn find_linkedin_urls(text: &str) -> Vec<String> {
    let pattern = Regex::new(r"https?://(?:www\.)?linkedin\.com/in/[A-Za-z0-9\-_%]+")
        .expect("static regex is valid");
    let mut urls = Vec::new();
    for m in pattern.find_iter(text) {
        let url = m.as_str().to_owned();
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// First external http(s) link on a line mentioning "website", falling back
/// to the first link that is not a social or directory host.
pub fn find_website(text: &str, exclude_host: Option<&str>) -> Option<String> {
    let link = Regex::new(r#"https?://[^\s"'<>\)]+"#).expect("static regex is valid");
    let excluded = ["linkedin.com", "facebook.com", "instagram.com", "twitter.com", "google.com"];

    let is_acceptable = |url: &str| {
        if excluded.iter().any(|host| url.contains(host)) {
            return false;
        }
        if let Some(host) = exclude_host {
            if url.contains(host) {
                return false;
            }
        }
        true
    };

    for line in text.lines() {
        if line.to_ascii_lowercase().contains("website") {
            if let Some(m) = link.find(line) {
                let url = m.as_str().trim_end_matches(['.', ',']).to_owned();
                if is_acceptable(&url) {
                    return Some(url);
                }
            }
        }
    }

    let result = link
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_owned())
        .find(|url| is_acceptable(url));
    result
}

/// Extracts staff blocks: a proximate pairing of a 2-4-capitalized-word name
/// with a known role keyword, either on the same line ("Stacy Foster,
/// General Manager") or within the next two lines.
pub fn extract_staff(text: &str) -> Vec<StaffEntry> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut staff: Vec<StaffEntry> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }

        // Same-line pairing split on common separators.
        if let Some(entry) = split_name_title_line(line) {
            push_unique(&mut staff, entry);
            continue;
        }

        if !is_plausible_name(line) {
            continue;
        }

        for follow in lines.iter().skip(index + 1).take(2) {
            if follow.is_empty() {
                continue;
            }
            if matches_role_keyword(follow) {
                push_unique(
                    &mut staff,
                    StaffEntry {
                        name: line.to_string(),
                        title: canonical_title(follow),
                    },
                );
            }
            break;
        }
    }

    staff
}

fn split_name_title_line(line: &str) -> Option<StaffEntry> {
    for separator in [" - ", " – ", " — ", ", ", " | "] {
        let Some((left, right)) = line.split_once(separator) else {
            continue;
        };
        if is_plausible_name(left.trim()) && matches_role_keyword(right) {
            return Some(StaffEntry {
                name: left.trim().to_string(),
                title: canonical_title(right),
            });
        }
    }
    None
}

/// 2-4 capitalized words; lines carrying URLs, emails, phone digits, or
/// navigation boilerplate are never names.
fn is_plausible_name(line: &str) -> bool {
    let lowered = line.to_ascii_lowercase();
    const BOILERPLATE: [&str; 10] = [
        "http", "www.", "@", "copyright", "cookie", "privacy", "menu", "login", "sign up",
        "reserved",
    ];
    if BOILERPLATE.iter().any(|token| lowered.contains(token)) {
        return false;
    }
    if phone_pattern().is_match(line) {
        return false;
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) {
        return false;
    }

    words.iter().all(|word| {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) if first.is_ascii_uppercase() => {
                chars.all(|ch| ch.is_ascii_alphabetic() || ch == '\'' || ch == '.' || ch == '-')
            }
            _ => false,
        }
    })
}

/// The role keyword as written in the closed set, preserving its canonical
/// capitalization.
fn canonical_title(raw: &str) -> String {
    let lowered = raw.to_ascii_lowercase();
    for keyword in ROLE_KEYWORDS {
        if lowered.contains(&keyword.to_ascii_lowercase()) {
            return keyword.to_string();
        }
    }
    raw.trim().to_string()
}

fn push_unique(staff: &mut Vec<StaffEntry>, entry: StaffEntry) {
    let exists = staff
        .iter()
        .any(|existing| existing.name.eq_ignore_ascii_case(&entry.name));
    if !exists {
        staff.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Richmond Country Club
Website: https://www.richmondcountryclubva.com/
Phone: (804) 784-5663

Stacy Foster
General Manager

Bill Ranson
Head Golf Professional

Greg McCue
Superintendent

Copyright 2025 VSGA. All rights reserved.
";

    #[test]
    fn extracts_stacked_name_title_blocks() {
        let staff = extract_staff(LISTING);
        let names: Vec<&str> = staff.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Stacy Foster", "Bill Ranson", "Greg McCue"]);
        assert_eq!(staff[0].title, "General Manager");
    }

    #[test]
    fn extracts_same_line_pairs() {
        let staff = extract_staff("Dean Sumner, Director of Golf\nPeter Miller - PGA Professional");
        assert_eq!(staff.len(), 2);
        assert_eq!(staff[1].title, "PGA Professional");
    }

    #[test]
    fn boilerplate_lines_are_not_names() {
        let staff = extract_staff("Privacy Policy\nGeneral Manager\nhttps://club.test/a\nOwner");
        assert!(staff.is_empty());
    }

    #[test]
    fn names_paired_with_unknown_roles_are_dropped() {
        let staff = extract_staff("Jane Moore\nDirector of Marketing");
        assert!(staff.is_empty());
    }

    #[test]
    fn finds_phones_with_extensions() {
        assert_eq!(
            find_phone("Call 703-779-2022 ext. 5386 today"),
            Some(String::from("703-779-2022 ext. 5386"))
        );
        assert_eq!(find_phone("no digits here"), None);
    }

    #[test]
    fn website_prefers_labelled_lines_and_skips_socials() {
        let text = "Follow https://facebook.com/club\nWebsite: https://www.richmondcountryclubva.com/";
        assert_eq!(
            find_website(text, None),
            Some(String::from("https://www.richmondcountryclubva.com/"))
        );
    }

    #[test]
    fn linkedin_urls_are_deduplicated() {
        let text = "https://www.linkedin.com/in/stacy-foster and again \
https://www.linkedin.com/in/stacy-foster";
        assert_eq!(find_linkedin_urls(text).len(), 1);
    }
}
