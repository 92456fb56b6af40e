//! Helpers shared by create/edit forms and destructive actions.

/// Whether any text input holds non-whitespace content or any selection
/// has been made.
pub fn has_unsaved_input(texts: &[&str], selections: usize) -> bool {
    selections > 0 || texts.iter().any(|t| !t.trim().is_empty())
}

/// A destructive action waiting for explicit confirmation.
///
/// Nothing is performed until [`Confirmation::confirm`] hands the action
/// back; dropping or [`Confirmation::cancel`]ling it performs nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a confirmation does nothing until it is confirmed"]
pub struct Confirmation<A> {
    prompt: String,
    action: A,
}

impl<A> Confirmation<A> {
    pub fn new(prompt: impl Into<String>, action: A) -> Self {
        Self {
            prompt: prompt.into(),
            action,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    /// Release the action for execution.
    pub fn confirm(self) -> A {
        self.action
    }

    pub fn cancel(self) {}
}

/// Prompt shown before discarding a form with typed input.
pub const DISCARD_CHANGES_PROMPT: &str =
    "You have unsaved changes. Are you sure you want to close without saving?";

/// Confirmation for closing a form, or `None` when nothing would be lost.
pub fn discard_confirmation(unsaved: bool) -> Option<Confirmation<()>> {
    unsaved.then(|| Confirmation::new(DISCARD_CHANGES_PROMPT, ()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsaved_input() {
        assert!(!has_unsaved_input(&["", "  "], 0));
        assert!(has_unsaved_input(&["", "x"], 0));
        assert!(has_unsaved_input(&[], 1));
    }

    #[test]
    fn test_confirmation_releases_action_only_on_confirm() {
        let confirmation = Confirmation::new("Delete bundle?", 42);
        assert_eq!(confirmation.prompt(), "Delete bundle?");
        assert_eq!(*confirmation.action(), 42);
        assert_eq!(confirmation.confirm(), 42);
    }

    #[test]
    fn test_discard_confirmation_only_when_unsaved() {
        assert!(discard_confirmation(false).is_none());
        let c = discard_confirmation(true).unwrap();
        assert_eq!(c.prompt(), DISCARD_CHANGES_PROMPT);
    }
}
