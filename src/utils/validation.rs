use crate::utils::error::{RbsyncError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(RbsyncError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(RbsyncError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(RbsyncError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// Checks the file name suffix rather than `Path::extension`, so that
/// double extensions like `.nii.gz` can be listed as allowed.
pub fn validate_file_suffix(field_name: &str, file: &str, allowed_suffixes: &[&str]) -> Result<()> {
    let lower = file.to_ascii_lowercase();
    if allowed_suffixes
        .iter()
        .any(|suffix| lower.ends_with(&format!(".{}", suffix)))
    {
        return Ok(());
    }

    Err(RbsyncError::InvalidConfigValue {
        field: field_name.to_string(),
        value: file.to_string(),
        reason: format!(
            "Unsupported file extension. Allowed extensions: {}",
            allowed_suffixes.join(", ")
        ),
    })
}

pub fn validate_allowed_values(field_name: &str, values: &[String], allowed: &[&str]) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed.iter().copied().collect();

    for value in values {
        if !allowed_set.contains(value.to_ascii_lowercase().as_str()) {
            return Err(RbsyncError::InvalidConfigValue {
                field: field_name.to_string(),
                value: value.clone(),
                reason: format!("Unsupported value. Valid values: {}", allowed.join(", ")),
            });
        }
    }

    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| RbsyncError::MissingConfig {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RbsyncError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}
