//! Prompt classification rules.
//!
//! Detection is table driven: an ordered list of [`PromptRule`]s, each a
//! regex paired with the classification it yields. Rules are evaluated by
//! ascending priority, so vendor dialects can be added with
//! [`PromptDetector::with_rule`] without touching the state machine.

use regex::Regex;

use super::sanitize::{self, PAGER_BANNER_PATTERN};

/// Priority of the built-in credential rules.
pub const CREDENTIAL_PRIORITY: u8 = 0;

/// Priority of the built-in shell prompt rule.
pub const SHELL_PRIORITY: u8 = 100;

/// Which credential a login prompt is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    /// `Username:`, `User Name:` or `login:`
    Username,
    /// `Password:`
    Password,
}

/// The final character of a shell prompt.
///
/// The terminator carries the privilege semantics: `>` unprivileged,
/// `#` privileged, `]` bracket-style system view, `$` Unix shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminator {
    Angle,
    Hash,
    Bracket,
    Dollar,
}

impl Terminator {
    /// Map a trailing prompt character to its terminator.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '>' => Some(Self::Angle),
            '#' => Some(Self::Hash),
            ']' => Some(Self::Bracket),
            '$' => Some(Self::Dollar),
            _ => None,
        }
    }

    /// The prompt character.
    pub fn as_char(self) -> char {
        match self {
            Self::Angle => '>',
            Self::Hash => '#',
            Self::Bracket => ']',
            Self::Dollar => '$',
        }
    }
}

/// Classification of the trailing line of device output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// The device asks for a credential.
    Credential(Credential),

    /// The device is ready for a command.
    Shell {
        terminator: Terminator,
        /// The trimmed prompt text, e.g. `switch#`.
        text: String,
    },

    /// Anything else.
    Output,
}

/// What a matching rule means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Matched against the trailing line; yields a credential prompt.
    Credential(Credential),
    /// Matched against the trailing line; yields a shell prompt whose
    /// terminator is the line's last character.
    Shell,
    /// Matched against the raw chunk; yields a pager continuation.
    Pager,
}

/// A single detection rule.
#[derive(Debug, Clone)]
pub struct PromptRule {
    /// Classification produced on match.
    pub kind: RuleKind,

    /// Pattern tested against the trimmed trailing line (or the raw chunk
    /// for pager rules).
    pub pattern: Regex,

    /// Lower values are evaluated first.
    pub priority: u8,
}

impl PromptRule {
    /// Create a new rule.
    pub fn new(kind: RuleKind, pattern: &str, priority: u8) -> Result<Self, regex::Error> {
        Ok(Self {
            kind,
            pattern: Regex::new(pattern)?,
            priority,
        })
    }
}

/// Ordered prompt rule table.
#[derive(Debug, Clone)]
pub struct PromptDetector {
    rules: Vec<PromptRule>,
}

impl PromptDetector {
    /// Create a detector with the built-in rules.
    pub fn new() -> Self {
        let rules = vec![
            PromptRule::new(
                RuleKind::Credential(Credential::Username),
                r"(?i)(?:user\s?name|login)\s*:$",
                CREDENTIAL_PRIORITY,
            )
            .unwrap(),
            PromptRule::new(
                RuleKind::Credential(Credential::Password),
                r"(?i)password\s*:$",
                CREDENTIAL_PRIORITY,
            )
            .unwrap(),
            PromptRule::new(RuleKind::Pager, PAGER_BANNER_PATTERN, CREDENTIAL_PRIORITY).unwrap(),
            PromptRule::new(RuleKind::Shell, r"^\S+[>#\]$]$", SHELL_PRIORITY).unwrap(),
        ];

        Self { rules }
    }

    /// Add a rule, keeping the table ordered by priority.
    ///
    /// Rules with equal priority keep insertion order.
    pub fn with_rule(mut self, rule: PromptRule) -> Self {
        self.rules.push(rule);
        self.rules.sort_by_key(|r| r.priority);
        self
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[PromptRule] {
        &self.rules
    }

    /// Classify the trailing line of sanitized text.
    pub fn classify(&self, text: &str) -> Prompt {
        let line = text.rsplit('\n').next().unwrap_or_default().trim();
        if line.is_empty() {
            return Prompt::Output;
        }

        for rule in &self.rules {
            if !rule.pattern.is_match(line) {
                continue;
            }
            match rule.kind {
                RuleKind::Credential(credential) => return Prompt::Credential(credential),
                RuleKind::Shell => {
                    if let Some(terminator) = line.chars().last().and_then(Terminator::from_char) {
                        return Prompt::Shell {
                            terminator,
                            text: line.to_string(),
                        };
                    }
                }
                RuleKind::Pager => {}
            }
        }

        Prompt::Output
    }

    /// Check a raw (unsanitized) chunk for a pager banner.
    pub fn is_pager(&self, raw: &str) -> bool {
        let probe = sanitize::filter_non_printable(&sanitize::strip_ansi(raw));
        self.rules
            .iter()
            .filter(|r| r.kind == RuleKind::Pager)
            .any(|r| r.pattern.is_match(&probe))
    }
}

impl Default for PromptDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(text: &str, terminator: Terminator) -> Prompt {
        Prompt::Shell {
            terminator,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_credential_prompts() {
        let detector = PromptDetector::new();
        assert_eq!(
            detector.classify("Username: "),
            Prompt::Credential(Credential::Username)
        );
        assert_eq!(
            detector.classify("User Name:"),
            Prompt::Credential(Credential::Username)
        );
        assert_eq!(
            detector.classify("Last login: today\nrouter login: "),
            Prompt::Credential(Credential::Username)
        );
        assert_eq!(
            detector.classify("\nPASSWORD:"),
            Prompt::Credential(Credential::Password)
        );
    }

    #[test]
    fn test_shell_prompts() {
        let detector = PromptDetector::new();
        assert_eq!(detector.classify("switch>"), shell("switch>", Terminator::Angle));
        assert_eq!(detector.classify("banner\nswitch# "), shell("switch#", Terminator::Hash));
        assert_eq!(detector.classify("[~HUAWEI]"), shell("[~HUAWEI]", Terminator::Bracket));
        assert_eq!(
            detector.classify("user@host:~$ "),
            shell("user@host:~$", Terminator::Dollar)
        );
    }

    #[test]
    fn test_plain_output() {
        let detector = PromptDetector::new();
        assert_eq!(detector.classify("Building configuration..."), Prompt::Output);
        assert_eq!(detector.classify("switch#\n"), Prompt::Output);
        assert_eq!(detector.classify(" description to core #"), Prompt::Output);
        assert_eq!(detector.classify(""), Prompt::Output);
    }

    #[test]
    fn test_credential_outranks_shell() {
        // A rule that would classify anything ending in ':' as a shell prompt
        // still loses to the credential rules.
        let detector = PromptDetector::new().with_rule(
            PromptRule::new(RuleKind::Shell, r":$", SHELL_PRIORITY + 1).unwrap(),
        );
        assert_eq!(
            detector.classify("Password:"),
            Prompt::Credential(Credential::Password)
        );
    }

    #[test]
    fn test_custom_rule() {
        let detector = PromptDetector::new().with_rule(
            PromptRule::new(RuleKind::Shell, r"^\[[^\]]+\]\s*>$", SHELL_PRIORITY - 1).unwrap(),
        );
        assert_eq!(
            detector.classify("[admin@MikroTik] >"),
            shell("[admin@MikroTik] >", Terminator::Angle)
        );
    }

    #[test]
    fn test_pager_detection() {
        let detector = PromptDetector::new();
        assert!(detector.is_pager("--More--\nreal content"));
        assert!(detector.is_pager(" \x1b[7m--More--\x1b[m "));
        assert!(!detector.is_pager("switch#"));
    }
}
