use crate::utils::error::{AppError, Result};
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 允許上傳的合約檔案類型
pub const CONTRACT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "png", "jpg", "jpeg"];

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> AppError {
    AppError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", scheme),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// 檢查上傳檔案存在且副檔名在允許清單內
pub fn validate_upload_file(field_name: &str, path: &Path) -> Result<()> {
    let shown = path.display().to_string();
    if !path.is_file() {
        return Err(invalid(field_name, &shown, "File does not exist"));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| invalid(field_name, &shown, "File has no extension"))?;

    if !CONTRACT_EXTENSIONS.contains(&extension.as_str()) {
        return Err(invalid(
            field_name,
            &shown,
            format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                CONTRACT_EXTENSIONS.join(", ")
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api.base_url", "https://invoices.example.com").is_ok());
        assert!(validate_url("api.base_url", "http://localhost:8000/api").is_ok());
        assert!(validate_url("api.base_url", "").is_err());
        assert!(validate_url("api.base_url", "not a url").is_err());
        assert!(validate_url("api.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("schedule.max_occurrences", 24, 1, 120).is_ok());
        assert!(validate_range("schedule.max_occurrences", 0, 1, 120).is_err());
    }

    #[test]
    fn test_validate_upload_file() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("lease.PDF");
        std::fs::File::create(&pdf)
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();
        assert!(validate_upload_file("file", &pdf).is_ok());

        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "hello").unwrap();
        assert!(validate_upload_file("file", &txt).is_err());

        assert!(validate_upload_file("file", &dir.path().join("missing.pdf")).is_err());
    }
}
