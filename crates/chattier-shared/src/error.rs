use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Remote write error: {0}")]
    RemoteWrite(#[from] RemoteWriteError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("No active channel")]
    NoActiveChannel,
}

/// Form-level failures, surfaced inline and never propagated further.
/// The messages are the exact strings shown next to the form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("There are empty fields")]
    EmptyFields,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("The passwords are different")]
    PasswordMismatch,

    #[error("The password must have at least 6 characters")]
    PasswordTooShort,

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
}

/// A push/write/remove against the remote store failed. Logged and
/// surfaced as a generic error state; never retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{op} on '{path}' failed: {message}")]
pub struct RemoteWriteError {
    pub op: &'static str,
    pub path: String,
    pub message: String,
}

impl RemoteWriteError {
    pub fn new(op: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            op,
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("upload cancelled")]
    Cancelled,

    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

/// Sign-in/sign-up failure; carries the provider's message verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct AuthError(pub String);

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
