//! Action ideas.
//!
//! Every pulse ends with exactly three actions, whatever happened upstream.
//! The model is walked through a short chain of reasoning per theme (pain
//! point, root cause, measurable fix) and asked for one action per theme on
//! `ACTION n:` lines.
//!
//! An action shorter than [`MIN_ACTION_CHARS`] is too vague to act on. If
//! an answer does not contain one specific action per theme, the model gets
//! one more try, and then each theme gets the template
//! "Investigate and address {name}".
//!
//! | Themes | Model actions | Padding                          |
//! |--------|---------------|----------------------------------|
//! | 0      | none          | generic action, three times      |
//! | 1-2    | one per theme | template for the largest theme   |
//! | 3+     | top three     | none                             |

use std::time::Duration;

use tracing::debug;

use crate::generate::call_with_deadline;
use crate::theme::by_rank;
use crate::{Generated, Generator, Quote, SummarizedTheme};

/// Number of actions in every pulse.
pub const ACTION_COUNT: usize = 3;

/// An action must be longer than this many characters.
pub const MIN_ACTION_CHARS: usize = 20;

/// Quotes shown to the model.
const PROMPT_QUOTES: usize = 5;

/// Used for every slot when there are no themes at all.
const GENERIC_ACTION: &str =
    "Review this week's unclustered feedback for emerging issues and follow up with affected users.";

/// Drafts the pulse's action ideas.
#[derive(Clone, Copy)]
pub struct ActionGenerator<'a> {
    generator: &'a dyn Generator,
    timeout: Duration,
}

impl std::fmt::Debug for ActionGenerator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionGenerator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<'a> ActionGenerator<'a> {
    /// Create a generator that gives each model call `timeout`.
    pub fn new(generator: &'a dyn Generator, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Produce exactly [`ACTION_COUNT`] actions, ordered by theme rank.
    pub fn generate_actions(
        &self,
        themes: &[SummarizedTheme],
        quotes: &[Quote],
    ) -> Generated<Vec<String>> {
        let mut ranked: Vec<&SummarizedTheme> = themes.iter().collect();
        ranked.sort_by(|a, b| by_rank(&a.theme, &b.theme));
        ranked.truncate(ACTION_COUNT);

        let Some(largest) = ranked.first() else {
            return Generated::fallback(vec![GENERIC_ACTION.to_string(); ACTION_COUNT], "no themes");
        };
        let wanted = ranked.len();
        let prompt = build_prompt(&ranked, quotes);

        let mut reason = String::new();
        for attempt in 1..=2 {
            match call_with_deadline(self.generator, &prompt, self.timeout) {
                Ok(response) => {
                    let specific: Vec<String> = parse_actions(&response)
                        .into_iter()
                        .filter(|a| is_specific(a))
                        .take(wanted)
                        .collect();
                    if specific.len() == wanted {
                        return Generated::model(pad(specific, &largest.theme.name));
                    }
                    debug!(attempt, got = specific.len(), wanted, "actions not specific enough");
                    reason = format!("{} of {wanted} actions passed the specificity check", specific.len());
                }
                Err(e) => {
                    reason = e.to_string();
                    break;
                }
            }
        }

        let templated = ranked.iter().map(|t| template(&t.theme.name)).collect();
        Generated::fallback(pad(templated, &largest.theme.name), reason)
    }
}

fn template(theme_name: &str) -> String {
    format!("Investigate and address {theme_name}")
}

fn is_specific(action: &str) -> bool {
    action.chars().count() > MIN_ACTION_CHARS
}

fn pad(mut actions: Vec<String>, largest: &str) -> Vec<String> {
    actions.resize(ACTION_COUNT, template(largest));
    actions
}

fn build_prompt(themes: &[&SummarizedTheme], quotes: &[Quote]) -> String {
    let theme_lines: Vec<String> = themes
        .iter()
        .map(|t| format!("- {} ({} reviews): {}", t.theme.name, t.theme.size, t.summary))
        .collect();
    let quote_lines: Vec<String> = quotes
        .iter()
        .take(PROMPT_QUOTES)
        .map(|q| format!("- \"{}\" (on {})", q.text, q.theme))
        .collect();
    let action_lines: Vec<String> = (1..=themes.len())
        .map(|i| format!("ACTION {i}: [one specific, measurable action in 1 sentence]"))
        .collect();

    format!(
        "You are a product manager turning user feedback into improvements.\n\n\
         Top Themes:\n{themes}\n\n\
         Key Quotes:\n{quotes}\n\n\
         For each theme, reason step by step:\n\
         Step 1: Identify the pain point\n\
         Step 2: Hypothesize the root cause\n\
         Step 3: Propose one specific, measurable action\n\n\
         Then output exactly {n} actions, one per theme, in theme order:\n\
         {actions}\n\n\
         Be specific (not \"improve UX\" but \"add progress indicators to the KYC upload flow\").",
        themes = theme_lines.join("\n"),
        quotes = quote_lines.join("\n"),
        n = themes.len(),
        actions = action_lines.join("\n"),
    )
}

/// Actions from `ACTION n:` lines, or failing that, every substantial line
/// that is not part of the reasoning steps.
fn parse_actions(response: &str) -> Vec<String> {
    let tagged: Vec<String> = response.lines().filter_map(tagged_action).collect();
    if !tagged.is_empty() {
        return tagged;
    }

    response
        .lines()
        .map(str::trim)
        .filter(|line| is_specific(line) && !line.starts_with("Step"))
        .map(str::to_string)
        .collect()
}

/// `"ACTION 2: Do the thing"` -> `Some("Do the thing")`.
fn tagged_action(line: &str) -> Option<String> {
    let line = line.trim().trim_start_matches(['*', '-', ' ']);
    let rest = line.strip_prefix("ACTION")?.trim_start();
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let action = rest.strip_prefix(':')?.trim().trim_matches('*').trim();
    (!action.is_empty()).then(|| action.to_string())
}
