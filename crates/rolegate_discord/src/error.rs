use miette::Diagnostic;
use rolegate_core::{ConfigError, ReconcileError, SessionError};
use rolegate_db::DbError;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DiscordError {
    #[error("Discord API error: {0}")]
    #[diagnostic(code(rolegate_discord::serenity))]
    Serenity(#[from] serenity::Error),

    #[error("Invalid /{command} invocation: {reason}")]
    #[diagnostic(code(rolegate_discord::invalid_command))]
    InvalidCommand { command: String, reason: String },

    #[error("Failed to build sign-in link: {0}")]
    #[diagnostic(
        code(rolegate_discord::signin_url),
        help("Check auth.signin_url and auth.public_url")
    )]
    SigninUrl(#[from] url::ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

impl DiscordError {
    pub fn invalid_command(command: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscordError>;
