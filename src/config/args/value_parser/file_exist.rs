use std::path::Path;

/// Clap value parser for the rclone configuration file.
///
/// The transfer runs unattended, so a missing or mistyped config path is
/// rejected at startup rather than surfacing as a failed rclone run.
pub fn is_file_exist(file_path: &str) -> Result<String, String> {
    let path = Path::new(file_path);

    if path.is_file() {
        Ok(path.to_string_lossy().to_string())
    } else if path.exists() {
        Err(format!("not a regular file: {}", path.display()))
    } else {
        Err(format!("file not found: {}", path.display()))
    }
}
