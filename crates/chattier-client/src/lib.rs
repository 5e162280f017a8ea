//! Headless chattier client core.
//!
//! Reconciles the hosted backend's event streams (messages, typing,
//! presence, channels, stars, notification counts) into consistent local
//! view state, and manages listener lifecycle across channel switches.

pub mod auth;
pub mod client;
pub mod composer;
pub mod directory;
pub mod messages;
pub mod notifications;
pub mod presence;
pub mod registry;
pub mod starred;
pub mod typing;
pub mod uploads;

pub use auth::{register, sign_in, LoginForm, RegisterForm};
pub use client::ChatClient;
pub use directory::ChannelForm;
pub use presence::Status;
pub use registry::{Owner, SubscriptionRegistry};
pub use uploads::UploadState;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise structured logging for an embedding application.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("chattier_client=debug,chattier_backend=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::info!("chattier client starting");
}
