/// Application name
pub const APP_NAME: &str = "chattier";

/// Content types accepted for media uploads
pub const AUTHORIZED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Maximum media upload size in bytes (50 MiB)
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Avatar generation service; query takes `name`, `background` and `length`
pub const AVATAR_SERVICE_URL: &str = "https://avatar.oxro.io/avatar.svg";

/// Map a file extension onto its upload content type, if authorized.
pub fn content_type_for(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.').map(|(_, e)| e)?;
    match ext.to_ascii_lowercase().as_str() {
        "jpeg" => Some("image/jpeg"),
        "jpg" => Some("image/jpg"),
        "png" => Some("image/png"),
        _ => None,
    }
}
