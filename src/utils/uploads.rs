use std::path::PathBuf;

/// Media files are written here out of band; the router serves the directory
/// under /api/v1/static/.
pub fn get_uploads_dir() -> std::io::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(cwd.join("uploads"))
}
