//! Common validation utilities.

use validator::ValidationError;

/// Validates that a text field contains something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates that an export file path is relative to the export root.
///
/// Rejects absolute paths and parent-directory segments.
pub fn validate_export_path(path: &str) -> Result<(), ValidationError> {
    let escapes_root = path.starts_with('/')
        || path.starts_with('\\')
        || path.split(['/', '\\']).any(|segment| segment == "..");

    if path.trim().is_empty() || escapes_root {
        let mut err = ValidationError::new("export_path");
        err.message = Some("Export path must be relative to the export root".into());
        return Err(err);
    }

    Ok(())
}
