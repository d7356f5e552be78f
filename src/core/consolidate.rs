//! Turns noisy scraped profile text into one block that can be handed to the
//! extraction service.

use crate::domain::model::RawProfileBlob;
use url::Url;

/// Lines containing any of these (case-insensitively) are platform chrome.
pub const DEFAULT_NOISE_TERMS: &[&str] = &[
    "facebook",
    "attachment",
    "see more",
    "edit",
    "photo",
    "video",
    "likes",
    "comment",
    "share",
    "menu",
];

pub const DEFAULT_SELF_REFERENTIAL_HOST: &str = "facebook";

/// Section labels, declared in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SectionLabel {
    Intro,
    Main,
    FriendsFollowers,
}

impl SectionLabel {
    fn json_keys(self) -> (&'static str, &'static str) {
        match self {
            SectionLabel::Intro => ("introText", "introLinks"),
            SectionLabel::Main => ("mainText", "mainLinks"),
            SectionLabel::FriendsFollowers => ("friendsCount", "friendsLinks"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextSection<'a> {
    pub label: SectionLabel,
    pub text: &'a str,
    pub links: &'a [String],
}

impl<'a> TextSection<'a> {
    pub fn new(label: SectionLabel, text: &'a str, links: &'a [String]) -> Self {
        Self { label, text, links }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPolicy {
    KeepAll,
    /// Company-side text must not carry links back to the source platform.
    DropSelfReferential,
}

#[derive(Debug, Clone)]
pub struct Consolidator {
    noise_terms: Vec<String>,
    self_host: String,
}

impl Default for Consolidator {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_TERMS.iter().copied(), DEFAULT_SELF_REFERENTIAL_HOST)
    }
}

impl Consolidator {
    pub fn new<I, S>(noise_terms: I, self_referential_host: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            noise_terms: noise_terms
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            self_host: self_referential_host.trim().to_lowercase(),
        }
    }

    pub fn is_noise(&self, line: &str) -> bool {
        let line = line.trim().to_lowercase();
        line.is_empty() || self.noise_terms.iter().any(|term| line.contains(term.as_str()))
    }

    /// Keeps surviving lines in their original order.
    pub fn filter_lines(&self, text: &str) -> String {
        text.lines()
            .filter(|line| !self.is_noise(line))
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_self_referential(&self, link: &str) -> bool {
        if self.self_host.is_empty() {
            return false;
        }
        match Url::parse(link.trim()) {
            Ok(url) => url
                .host_str()
                .map(|host| host.to_lowercase().contains(&self.self_host))
                .unwrap_or(false),
            Err(_) => link.to_lowercase().contains(&self.self_host),
        }
    }

    fn keep_links<'s>(&self, links: &'s [String], policy: LinkPolicy) -> Vec<&'s str> {
        links
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .filter(|l| policy == LinkPolicy::KeepAll || !self.is_self_referential(l))
            .collect()
    }

    /// Merges labelled sections into one string. Never returns an empty string:
    /// when nothing survives filtering, the filtered fields are serialized instead.
    pub fn consolidate(&self, sections: &[TextSection<'_>], policy: LinkPolicy) -> String {
        let mut ordered: Vec<&TextSection<'_>> = sections.iter().collect();
        ordered.sort_by_key(|s| s.label);

        let mut out = String::new();
        let mut links: Vec<&str> = Vec::new();
        let mut fallback = serde_json::Map::new();

        for section in ordered {
            let (text_key, links_key) = section.label.json_keys();
            let section_links = self.keep_links(section.links, policy);

            let text = match section.label {
                SectionLabel::Intro | SectionLabel::Main => self.filter_lines(section.text),
                SectionLabel::FriendsFollowers => section.text.trim().to_string(),
            };

            if !text.is_empty() {
                match section.label {
                    SectionLabel::Intro => out.push_str(&format!("Intro section:\n{}\n", text)),
                    SectionLabel::Main => out.push_str(&format!("Main section:\n{}\n", text)),
                    SectionLabel::FriendsFollowers => {
                        out.push_str(&format!("Friends/Followers: {}\n", text))
                    }
                }
            }

            fallback.insert(text_key.to_string(), serde_json::Value::String(text));
            fallback.insert(
                links_key.to_string(),
                serde_json::Value::Array(
                    section_links
                        .iter()
                        .map(|l| serde_json::Value::String(l.to_string()))
                        .collect(),
                ),
            );
            links.extend(section_links);
        }

        if !links.is_empty() {
            out.push_str(&format!("Links: {}\n", links.join(", ")));
        }

        if out.is_empty() {
            tracing::debug!("Nothing survived filtering; falling back to serialized fields");
            return serde_json::Value::Object(fallback).to_string();
        }
        out
    }

    /// Text block for the person-side extraction.
    pub fn person_text(&self, profile: &RawProfileBlob) -> String {
        let friends = profile.friends_count.as_deref().unwrap_or("");
        let sections = [
            TextSection::new(SectionLabel::Intro, &profile.intro_text, &profile.intro_links),
            TextSection::new(SectionLabel::Main, &profile.main_text, &[]),
            TextSection::new(SectionLabel::FriendsFollowers, friends, &[]),
        ];
        self.consolidate(&sections, LinkPolicy::KeepAll)
    }

    /// Text block for the company-side extraction, with self-referential links removed.
    pub fn company_text(&self, profile: &RawProfileBlob) -> String {
        let sections = [
            TextSection::new(SectionLabel::Intro, &profile.intro_text, &profile.intro_links),
            TextSection::new(SectionLabel::Main, &profile.main_text, &[]),
        ];
        self.consolidate(&sections, LinkPolicy::DropSelfReferential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_lines_removed_and_order_preserved() {
        let consolidator = Consolidator::default();
        let text = "Owner at Acme Pty Ltd\nSee more\nLives in Perth\n12 Likes\nStudied at UWA\nEdit details";
        assert_eq!(
            consolidator.filter_lines(text),
            "Owner at Acme Pty Ltd\nLives in Perth\nStudied at UWA"
        );
    }

    #[test]
    fn test_noise_match_is_case_insensitive() {
        let consolidator = Consolidator::default();
        assert!(consolidator.is_noise("Visit us on FACEBOOK"));
        assert!(consolidator.is_noise("   "));
        assert!(!consolidator.is_noise("Mortgage broker"));
    }

    #[test]
    fn test_sections_rendered_in_fixed_order() {
        let consolidator = Consolidator::default();
        let no_links: Vec<String> = Vec::new();
        let sections = [
            TextSection::new(SectionLabel::Main, "Posts about lending", &no_links),
            TextSection::new(SectionLabel::Intro, "Works at Acme Pty Ltd", &no_links),
        ];
        let out = consolidator.consolidate(&sections, LinkPolicy::KeepAll);
        assert_eq!(
            out,
            "Intro section:\nWorks at Acme Pty Ltd\nMain section:\nPosts about lending\n"
        );
    }

    #[test]
    fn test_company_text_drops_self_referential_links() {
        let consolidator = Consolidator::default();
        let profile = RawProfileBlob {
            intro_text: "Acme Pty Ltd\nMortgage broker".into(),
            intro_links: vec![
                "https://www.facebook.com/acme".into(),
                "https://acme.com.au/".into(),
                "https://l.facebook.com/l.php?u=x".into(),
            ],
            ..RawProfileBlob::default()
        };
        let out = consolidator.company_text(&profile);
        assert!(out.contains("Links: https://acme.com.au/"));
        assert!(!out.to_lowercase().contains("facebook"));
    }

    #[test]
    fn test_person_text_keeps_links_and_counter() {
        let consolidator = Consolidator::default();
        let profile = RawProfileBlob {
            intro_text: "Works at Acme Pty Ltd".into(),
            intro_links: vec!["https://linkedin.com/in/jane".into()],
            friends_count: Some("1.2K friends".into()),
            ..RawProfileBlob::default()
        };
        assert_eq!(
            consolidator.person_text(&profile),
            "Intro section:\nWorks at Acme Pty Ltd\nFriends/Followers: 1.2K friends\nLinks: https://linkedin.com/in/jane\n"
        );
    }

    #[test]
    fn test_empty_result_falls_back_to_serialized_fields() {
        let consolidator = Consolidator::default();
        let profile = RawProfileBlob {
            intro_text: "See more\nPhoto".into(),
            main_text: "Share".into(),
            intro_links: vec!["https://facebook.com/acme".into()],
            ..RawProfileBlob::default()
        };
        let out = consolidator.company_text(&profile);
        assert!(!out.is_empty());
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["introText"], "");
        assert_eq!(parsed["introLinks"], serde_json::json!([]));
        assert_eq!(parsed["mainText"], "");
    }

    #[test]
    fn test_filtering_holds_across_blob_shapes() {
        let consolidator = Consolidator::default();
        let links = |l: &[&str]| l.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let shapes = [
            (
                "only links",
                RawProfileBlob {
                    intro_links: links(&["https://acme.com.au/", "https://www.facebook.com/acme"]),
                    ..RawProfileBlob::default()
                },
            ),
            (
                "only counter",
                RawProfileBlob {
                    friends_count: Some("1.2K friends".into()),
                    ..RawProfileBlob::default()
                },
            ),
            (
                "all-noise main",
                RawProfileBlob {
                    main_text: "See more\nShare\n12 Likes\nWrite a comment".into(),
                    ..RawProfileBlob::default()
                },
            ),
            (
                "mixed case",
                RawProfileBlob {
                    intro_text: "Owner at Acme\nSEE MORE\nLives in Perth\nFaceBook Photo".into(),
                    main_text: "Mortgage Broker\nEDIT profile\nWestern Australia".into(),
                    intro_links: links(&["https://linkedin.com/in/jane"]),
                    ..RawProfileBlob::default()
                },
            ),
            ("empty", RawProfileBlob::default()),
        ];

        for (shape, blob) in &shapes {
            let input_lines: Vec<&str> = blob
                .intro_text
                .lines()
                .chain(blob.main_text.lines())
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            let (noise, kept): (Vec<&str>, Vec<&str>) =
                input_lines.into_iter().partition(|l| consolidator.is_noise(l));

            for out in [consolidator.person_text(blob), consolidator.company_text(blob)] {
                assert!(!out.is_empty(), "{}: empty output", shape);
                for line in &noise {
                    assert!(
                        !out.lines().any(|o| o.trim() == *line),
                        "{}: noise line {:?} survived in {:?}",
                        shape,
                        line,
                        out
                    );
                }
                let mut cursor = 0;
                for line in &kept {
                    let found = out[cursor..]
                        .find(line)
                        .unwrap_or_else(|| panic!("{}: {:?} missing or out of order in {:?}", shape, line, out));
                    cursor += found + line.len();
                }
            }
        }
    }

    #[test]
    fn test_consolidate_never_empty() {
        let consolidator = Consolidator::default();
        assert!(!consolidator.person_text(&RawProfileBlob::default()).is_empty());
        assert!(!consolidator.consolidate(&[], LinkPolicy::KeepAll).is_empty());
    }
}
