//! Rule-driven classification of process output
//!
//! Backends own ordered rule tables written in their own phrasing; this
//! module only knows how to walk a table. Adding a backend never touches
//! the logic here.

use std::borrow::Cow;

use regex::Regex;
use shellfs_process::InvocationResult;

use crate::operation::OperationKind;
use crate::outcome::{Category, ClassifiedOutcome};

/// How a rule recognizes output text
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Case-sensitive substring
    Contains(&'static str),
    /// Regular expression
    Pattern(&'static std::sync::LazyLock<Regex>),
}

impl Matcher {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Contains(needle) => text.contains(needle),
            Matcher::Pattern(re) => re.is_match(text),
        }
    }
}

/// Operation kinds a rule applies to
#[derive(Debug, Clone, Copy)]
pub enum Scope {
    All,
    Only(&'static [OperationKind]),
}

/// One entry of a backend's classification table
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub matcher: Matcher,
    pub category: Category,
    pub scope: Scope,
}

impl Rule {
    pub const fn contains(needle: &'static str, category: Category) -> Self {
        Self {
            matcher: Matcher::Contains(needle),
            category,
            scope: Scope::All,
        }
    }

    pub const fn pattern(re: &'static std::sync::LazyLock<Regex>, category: Category) -> Self {
        Self {
            matcher: Matcher::Pattern(re),
            category,
            scope: Scope::All,
        }
    }

    /// Restrict this rule to some operation kinds
    pub const fn only(mut self, kinds: &'static [OperationKind]) -> Self {
        self.scope = Scope::Only(kinds);
        self
    }

    pub fn applies_to(&self, kind: OperationKind) -> bool {
        match self.scope {
            Scope::All => true,
            Scope::Only(kinds) => kinds.contains(&kind),
        }
    }
}

/// Classify one invocation against an ordered rule table.
///
/// Rules are matched first-match-wins against stderr followed by stdout,
/// regardless of exit code: several shells print failures and still exit
/// zero. For kinds whose stdout is payload (file contents, listings) only
/// stderr is matched, so a file that merely *contains* an error phrase is
/// not misread as a failure. When nothing matches, a zero exit is success
/// and a non-zero exit is [`Category::Unknown`]. `trust_exit_code = false` declares that the
/// backend's exit code for this kind carries no information, so an
/// unmatched result counts as success. A timed-out invocation is always
/// [`Category::Unknown`].
pub fn classify(
    rules: &[Rule],
    kind: OperationKind,
    result: &InvocationResult,
    trust_exit_code: bool,
) -> ClassifiedOutcome {
    classify_with_paths(rules, kind, result, trust_exit_code, &[])
}

/// [`classify`], but phrases that only occur inside `paths` do not count.
///
/// Shells echo the paths they were given, so `/tmp/File exists` must not
/// read as an "already exists" failure. A path is masked only when some
/// rule would match its own text; the raw text keeps it.
pub fn classify_with_paths(
    rules: &[Rule],
    kind: OperationKind,
    result: &InvocationResult,
    trust_exit_code: bool,
    paths: &[String],
) -> ClassifiedOutcome {
    let text = result.combined_output();
    let matched = mask_paths(
        rules,
        kind,
        if kind.produces_output() {
            result.stderr.as_str()
        } else {
            text.as_str()
        },
        paths,
    );

    if result.timed_out {
        return ClassifiedOutcome::new(Category::Unknown, format!("process timed out\n{text}"));
    }

    if let Some(rule) = rules
        .iter()
        .find(|rule| rule.applies_to(kind) && rule.matcher.is_match(&matched))
    {
        return ClassifiedOutcome::new(rule.category, text);
    }

    if result.exit_code == 0 || !trust_exit_code {
        ClassifiedOutcome::success(text)
    } else {
        ClassifiedOutcome::new(Category::Unknown, text)
    }
}

/// Replace each path in `paths` that looks like a rule phrase, longest first
fn mask_paths<'a>(
    rules: &[Rule],
    kind: OperationKind,
    text: &'a str,
    paths: &[String],
) -> Cow<'a, str> {
    let mut masked = Cow::Borrowed(text);
    for path in paths {
        let misleading = rules
            .iter()
            .any(|rule| rule.applies_to(kind) && rule.matcher.is_match(path));
        if misleading && masked.contains(path.as_str()) {
            masked = Cow::Owned(masked.replace(path.as_str(), "<path>"));
        }
    }
    masked
}

/// Split a listing into entry names, tolerating CRLF and blank lines
pub fn listing_entries(stdout: &str) -> impl Iterator<Item = &str> {
    stdout
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
}
