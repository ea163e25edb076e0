//! Expert knowledge extracted from markdown documents
//!
//! Level-two headings select a bucket by keyword (case-insensitive, first
//! match wins in the order pattern, rule, example, conflict). Top-level list
//! items under the heading land in that bucket. Deeper headings keep the
//! current bucket; nested list items are folded into their parent item.
//!
//! Numbered rule passages (`Rule 12: ...`) are extracted from the raw text
//! independently of the section structure.

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};

static RULE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Rule \d+:").expect("rule pattern should be valid"));

/// Bucketed knowledge items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertKnowledge {
    /// Items under pattern sections
    pub patterns: Vec<String>,
    /// Items under rule sections
    pub rules: Vec<String>,
    /// Items under example sections
    pub examples: Vec<String>,
    /// Items under conflict sections
    pub conflicts: Vec<String>,
}

impl ExpertKnowledge {
    /// No items in any bucket
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
            && self.rules.is_empty()
            && self.examples.is_empty()
            && self.conflicts.is_empty()
    }

    /// Total number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len() + self.rules.len() + self.examples.len() + self.conflicts.len()
    }

    fn bucket(&mut self, section: Bucket) -> &mut Vec<String> {
        match section {
            Bucket::Patterns => &mut self.patterns,
            Bucket::Rules => &mut self.rules,
            Bucket::Examples => &mut self.examples,
            Bucket::Conflicts => &mut self.conflicts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Patterns,
    Rules,
    Examples,
    Conflicts,
}

impl Bucket {
    fn classify(heading: &str) -> Option<Self> {
        let heading = heading.to_lowercase();
        if heading.contains("pattern") {
            Some(Self::Patterns)
        } else if heading.contains("rule") {
            Some(Self::Rules)
        } else if heading.contains("example") {
            Some(Self::Examples)
        } else if heading.contains("conflict") {
            Some(Self::Conflicts)
        } else {
            None
        }
    }
}

/// Parse section/bullet knowledge from a markdown document
#[must_use]
pub fn parse_knowledge(content: &str) -> ExpertKnowledge {
    let mut knowledge = ExpertKnowledge::default();
    let mut section: Option<Bucket> = None;
    let mut heading: Option<String> = None;
    let mut list_depth = 0_usize;
    let mut item: Option<String> = None;

    for event in Parser::new(content) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H2,
                ..
            }) => heading = Some(String::new()),
            Event::End(TagEnd::Heading(HeadingLevel::H2)) => {
                if let Some(text) = heading.take() {
                    section = Bucket::classify(&text);
                }
            }
            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(TagEnd::List(_)) => list_depth = list_depth.saturating_sub(1),
            Event::Start(Tag::Item) if list_depth == 1 => item = Some(String::new()),
            Event::End(TagEnd::Item) if list_depth == 1 => {
                if let (Some(text), Some(bucket)) = (item.take(), section) {
                    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                    if !text.is_empty() {
                        knowledge.bucket(bucket).push(text);
                    }
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(h) = heading.as_mut() {
                    h.push_str(&text);
                } else if let Some(i) = item.as_mut() {
                    i.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(i) = item.as_mut() {
                    i.push(' ');
                }
            }
            _ => {}
        }
    }
    knowledge
}

/// Extract `Rule N:` passages
///
/// A passage runs to the next rule or the end of its paragraph, whichever
/// comes first, and is collapsed onto one line.
#[must_use]
pub fn extract_rules(content: &str) -> Vec<String> {
    let starts: Vec<usize> = RULE_START.find_iter(content).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let next = starts.get(i + 1).copied().unwrap_or(content.len());
            let raw = &content[start..next];
            let raw = raw.find("\n\n").map_or(raw, |end| &raw[..end]);
            let passage = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            passage
                .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '-' | '+'))
                .to_string()
        })
        .filter(|passage| !passage.is_empty())
        .collect()
}
