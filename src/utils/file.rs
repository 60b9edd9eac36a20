use uuid::Uuid;

/// Extensions accepted by the upload endpoint.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "cr2"];

pub const CR2_EXTENSION: &str = "cr2";

/// Lower-cased extension of `file_name`, without the dot.
pub fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_allowed_extension(ext: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&ext)
}

/// Random object name for a staged upload.
pub fn generate_file_name(ext: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), ext)
}

pub fn image_content_type(ext: &str) -> String {
    format!("image/{}", ext)
}
