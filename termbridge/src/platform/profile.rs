//! Vendor profile: the dialect a one-shot run speaks.

/// Command written when a vendor needs privilege elevation at a `>` prompt.
pub const ENABLE_COMMAND: &str = "enable";

/// Everything the state machine needs to know about a device family.
///
/// A profile is looked up once when a run starts and stays fixed for the
/// rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorProfile {
    /// Vendor identifier as sent by clients.
    pub id: u8,

    /// Display name (e.g., "cisco_ios", "huawei_vrp").
    pub name: String,

    /// Command that prints the running configuration.
    pub show_command: String,

    /// Command that elevates an unprivileged `>` session; `None` means the
    /// show command runs directly at `>`.
    pub elevate_command: Option<String>,

    /// Whether a `]` prompt (system view) is a valid place to run the
    /// show command.
    pub bracket_prompts: bool,
}

impl VendorProfile {
    /// Create a profile that runs its show command directly.
    pub fn new(id: u8, name: impl Into<String>, show_command: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            show_command: show_command.into(),
            elevate_command: None,
            bracket_prompts: false,
        }
    }

    /// Require elevation with the given command at an unprivileged prompt.
    pub fn with_elevation(mut self, command: impl Into<String>) -> Self {
        self.elevate_command = Some(command.into());
        self
    }

    /// Accept bracket (`]`) prompts.
    pub fn with_bracket_prompts(mut self) -> Self {
        self.bracket_prompts = true;
        self
    }

    /// Check if an unprivileged prompt must be elevated first.
    pub fn requires_elevation(&self) -> bool {
        self.elevate_command.is_some()
    }
}
