use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum ServerError {
    #[error("Invalid bind address {addr}: {reason}")]
    #[diagnostic(
        code(rolegate_server::invalid_bind),
        help("Use host:port, for example 0.0.0.0:8080")
    )]
    InvalidBind { addr: String, reason: String },

    #[error("Failed to bind {addr}: {source}")]
    #[diagnostic(code(rolegate_server::bind))]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    #[diagnostic(code(rolegate_server::serve))]
    Serve(#[source] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
