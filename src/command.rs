//! Data-driven voice command tables keyed by language.
//!
//! Each base language has a fixed `(pattern, action)` list compiled once at
//! startup; matching is first-wins over the normalized transcript. Adding a
//! language means adding a rule list, not branching in code.

use anyhow::{Context, Result};
use regex::Regex;

/// What a recognized utterance asks the system to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Launch an application by its program command.
    OpenApplication { command: String },
    /// Open a web search for the captured term.
    WebSearch { term: String },
    /// Speak the current local time.
    SpeakTime,
    /// Request global shutdown.
    Exit,
    /// No rule matched; the processor speaks a notice instead of publishing.
    Unrecognized,
}

/// Table row action; the search term comes from capture group 1 at match
/// time.
#[derive(Debug, Clone, Copy)]
enum RuleAction {
    OpenApplication(&'static str),
    WebSearch,
    SpeakTime,
    Exit,
}

struct Rule {
    pattern: Regex,
    action: RuleAction,
}

// The regex crate has no lookaround, so "A and B both present" rules are
// spelled as alternations of both orders.
const ENGLISH_RULES: &[(&str, RuleAction)] = &[
    (r"\bopen chrome\b", RuleAction::OpenApplication("chrome")),
    (r"\bopen notepad\b", RuleAction::OpenApplication("notepad")),
    (r"^search\s+(.+)$", RuleAction::WebSearch),
    (r"\btime\b", RuleAction::SpeakTime),
    (r"\b(?:exit|quit|close)\b", RuleAction::Exit),
];

const HINDI_RULES: &[(&str, RuleAction)] = &[
    (
        r"क्रोम.*खोल|खोल.*क्रोम",
        RuleAction::OpenApplication("chrome"),
    ),
    (
        r"नोटपैड.*खोल|खोल.*नोटपैड",
        RuleAction::OpenApplication("notepad"),
    ),
    (r"^खोज(?:ो|ें)?\s+(.+)$", RuleAction::WebSearch),
    (r"समय", RuleAction::SpeakTime),
    (r"बाहर निकल|बंद करो", RuleAction::Exit),
];

/// Compiled first-match-wins table for one language.
pub struct CommandTable {
    rules: Vec<Rule>,
}

impl CommandTable {
    /// Builds the table for a base language tag; unknown tags fall back to
    /// English.
    pub fn for_language(base: &str) -> Result<Self> {
        let rows = match base {
            "hi" => HINDI_RULES,
            _ => ENGLISH_RULES,
        };
        let rules = rows
            .iter()
            .map(|(pattern, action)| {
                Ok(Rule {
                    pattern: Regex::new(pattern)
                        .with_context(|| format!("compile command pattern {pattern:?}"))?,
                    action: *action,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Normalizes and matches one transcript; the first matching rule wins.
    pub fn interpret(&self, transcript: &str) -> Intent {
        let text = normalize(transcript);
        if text.is_empty() {
            return Intent::Unrecognized;
        }
        for rule in &self.rules {
            let Some(captures) = rule.pattern.captures(&text) else {
                continue;
            };
            return match rule.action {
                RuleAction::OpenApplication(command) => Intent::OpenApplication {
                    command: command.to_string(),
                },
                RuleAction::WebSearch => Intent::WebSearch {
                    term: captures
                        .get(1)
                        .map(|m| m.as_str().trim().to_string())
                        .unwrap_or_default(),
                },
                RuleAction::SpeakTime => Intent::SpeakTime,
                RuleAction::Exit => Intent::Exit,
            };
        }
        Intent::Unrecognized
    }
}

/// Lowercases and collapses whitespace the way transcripts are matched.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
