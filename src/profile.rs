//! Profile page operations for the signed-in user.

use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::session::SessionState;
use crate::users::UserStore;

/// One editable profile field as shown on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileField {
    /// Column name, used as the form field name.
    pub field: String,
    /// Column name with its first letter capitalized.
    pub label: String,
    pub value: String,
}

fn capitalize(s: &str) -> String {
    let lower = s.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn require_user(session: &SessionState) -> Result<&str> {
    session
        .current_user()
        .ok_or_else(|| DashboardError::NotFound("No user logged in.".to_string()))
}

/// Everything on the user's row except email and password.
pub fn view(store: &UserStore, session: &SessionState) -> Result<Vec<ProfileField>> {
    let email = require_user(session)?;
    if !store.has_table() {
        return Err(DashboardError::NotFound("User data not found.".to_string()));
    }
    let user = store
        .find_by_email(email)?
        .ok_or_else(|| DashboardError::NotFound("User not found.".to_string()))?;

    Ok(user
        .profile_fields()
        .into_iter()
        .map(|(field, value)| ProfileField {
            label: capitalize(&field),
            field,
            value,
        })
        .collect())
}

/// Saves submitted profile values onto the signed-in user's row only.
pub fn save(store: &UserStore, session: &SessionState, fields: &[(String, String)]) -> Result<()> {
    let email = require_user(session)?;
    if fields.is_empty() {
        return Ok(());
    }
    store.update_many(email, fields)
}

#[cfg(feature = "web")]
pub use picture::{load_picture, picture_path, save_picture};

#[cfg(feature = "web")]
mod picture {
    use image::{DynamicImage, ImageFormat};
    use log::info;
    use std::fs;
    use std::path::{Path, PathBuf};

    use crate::error::{DashboardError, Result};

    const ALLOWED: [&str; 3] = ["png", "jpg", "jpeg"];

    /// Where a user's picture lives. The email is percent-encoded so it is
    /// always a single safe path component.
    pub fn picture_path(dir: &Path, email: &str) -> PathBuf {
        dir.join(format!("{}.jpg", urlencoding::encode(email)))
    }

    /// Decodes an uploaded png/jpg and stores it as JPEG.
    pub fn save_picture(dir: &Path, email: &str, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !ALLOWED.contains(&ext.as_str()) {
            return Err(DashboardError::Validation(
                "Profile pictures must be PNG or JPEG images.".to_string(),
            ));
        }

        let img = image::load_from_memory(bytes).map_err(|e| DashboardError::Image(e.to_string()))?;
        fs::create_dir_all(dir)?;
        let path = picture_path(dir, email);
        // JPEG has no alpha channel.
        DynamicImage::ImageRgb8(img.to_rgb8())
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|e| DashboardError::Image(e.to_string()))?;
        info!("updated profile picture for {}", email);
        Ok(path)
    }

    pub fn load_picture(dir: &Path, email: &str) -> Option<Vec<u8>> {
        fs::read(picture_path(dir, email)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_capitalized() {
        assert_eq!(capitalize("phone"), "Phone");
        assert_eq!(capitalize("NAME"), "Name");
        assert_eq!(capitalize(""), "");
    }
}
