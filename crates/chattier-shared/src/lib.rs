// Shared domain types, path layout and error taxonomy for the chattier client.

pub mod constants;
pub mod error;
pub mod paths;
pub mod types;

pub use error::{AuthError, ChatError, RemoteWriteError, UploadError, ValidationError};
pub use types::{
    direct_channel_id, Author, Channel, ChannelId, ChannelKind, Creator, Message, MessageBody,
    TypingUser, UserId, UserProfile,
};
