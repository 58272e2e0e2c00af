use std::future::Future;

use tokio::sync::oneshot;

/// Visual tone of a dialog, forwarded to whatever renders it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialogVariant {
    #[default]
    Default,
    Danger,
    Warning,
    Info,
}

/// DialogOptions
///
/// What a confirmation dialog shows. Defaults match the application's
/// standard "Konfirmasi" dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogOptions {
    pub title: String,
    pub message: String,
    pub detail: Option<String>,
    pub variant: DialogVariant,
    pub confirm_text: String,
    pub cancel_text: String,
    pub show_warning: bool,
    pub warning_message: Option<String>,
}

impl Default for DialogOptions {
    fn default() -> Self {
        Self {
            title: "Konfirmasi".to_string(),
            message: String::new(),
            detail: None,
            variant: DialogVariant::Default,
            confirm_text: "Ya, Lanjutkan".to_string(),
            cancel_text: "Batal".to_string(),
            show_warning: true,
            warning_message: None,
        }
    }
}

impl DialogOptions {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn variant(mut self, variant: DialogVariant) -> Self {
        self.variant = variant;
        self
    }

    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn confirm_text(mut self, text: impl Into<String>) -> Self {
        self.confirm_text = text.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Confirmed,
    Cancelled,
}

impl DialogOutcome {
    pub fn is_confirmed(self) -> bool {
        self == Self::Confirmed
    }
}

/// Opens yes/no confirmation dialogs.
pub struct ConfirmDialog;

impl ConfirmDialog {
    /// Returns the handle given to whoever renders the dialog and the future
    /// the caller awaits. Dropping the responder without answering resolves
    /// the future with [`DialogOutcome::Cancelled`].
    pub fn open(
        options: DialogOptions,
    ) -> (DialogResponder, impl Future<Output = DialogOutcome> + Send + 'static) {
        let (reply, rx) = oneshot::channel();
        let outcome = async move { rx.await.unwrap_or(DialogOutcome::Cancelled) };
        (DialogResponder { options, reply }, outcome)
    }
}

/// The rendering side of an open [`ConfirmDialog`]. Consumed on answer, so a
/// dialog resolves at most once.
#[derive(Debug)]
pub struct DialogResponder {
    options: DialogOptions,
    reply: oneshot::Sender<DialogOutcome>,
}

impl DialogResponder {
    pub fn options(&self) -> &DialogOptions {
        &self.options
    }

    pub fn confirm(self) {
        // The caller may have stopped waiting; nothing to do then.
        let _ = self.reply.send(DialogOutcome::Confirmed);
    }

    pub fn cancel(self) {
        let _ = self.reply.send(DialogOutcome::Cancelled);
    }

    /// Answers from a boolean, e.g. a terminal y/n prompt.
    pub fn answer(self, confirmed: bool) {
        if confirmed {
            self.confirm();
        } else {
            self.cancel();
        }
    }
}

/// Dialog that asks for a password before a sensitive action.
pub struct PasswordPrompt;

impl PasswordPrompt {
    /// Resolves with `Some(password)` when submitted, `None` when cancelled or
    /// abandoned.
    pub fn open(
        options: DialogOptions,
    ) -> (PromptResponder, impl Future<Output = Option<String>> + Send + 'static) {
        let (reply, rx) = oneshot::channel();
        let outcome = async move { rx.await.ok().flatten() };
        (PromptResponder { options, reply }, outcome)
    }
}

#[derive(Debug)]
pub struct PromptResponder {
    options: DialogOptions,
    reply: oneshot::Sender<Option<String>>,
}

impl PromptResponder {
    pub fn options(&self) -> &DialogOptions {
        &self.options
    }

    /// Blank input counts as a cancel.
    pub fn submit(self, password: impl Into<String>) {
        let password = password.into();
        let value = (!password.is_empty()).then_some(password);
        let _ = self.reply.send(value);
    }

    pub fn cancel(self) {
        let _ = self.reply.send(None);
    }
}
