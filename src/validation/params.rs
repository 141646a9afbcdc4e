use url::Url;
use crate::error::{AppError, Result};

/// Maximum accepted length of a caller redirect URL.
const MAX_URL_LENGTH: usize = 2048;

/// Validates a required query parameter.
///
/// # Arguments
///
/// * `name` - The parameter name, echoed back in the error.
/// * `value` - The value as extracted from the query string.
///
/// # Returns
///
/// The value, or `MissingParameter` if it is absent or blank.
pub fn required(name: &'static str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::MissingParameter(name)),
    }
}

/// Validates a required query parameter holding an absolute http(s) URL.
pub fn required_url(name: &'static str, value: Option<String>) -> Result<Url> {
    let value = required(name, value)?;

    if value.len() > MAX_URL_LENGTH {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            name, MAX_URL_LENGTH
        )));
    }

    let url = Url::parse(value.trim())
        .map_err(|e| AppError::Validation(format!("{} is not a valid URL: {}", name, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "{} must use http or https",
            name
        )));
    }

    Ok(url)
}
