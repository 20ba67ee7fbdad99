use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("URL is required")]
    UrlRequired,

    #[error("Filename is required")]
    FilenameRequired,

    #[error("Job queue is closed")]
    QueueClosed,
}

/// Keep word characters, whitespace and `-`, then collapse every run of
/// whitespace and dashes into a single `_`.
///
/// `"Test Video!"` becomes `"Test_Video"`.
pub fn sanitize_filename(raw: &str) -> String {
    let kept = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace());

    let mut out = String::with_capacity(raw.len());
    let mut in_separator = false;
    for c in kept {
        if c == '-' || c.is_whitespace() {
            if !in_separator {
                out.push('_');
                in_separator = true;
            }
        } else {
            out.push(c);
            in_separator = false;
        }
    }
    out
}

/// Check required fields and return `(url, sanitized filename)`.
pub fn validate_submission(url: &str, filename: &str) -> Result<(String, String), SubmitError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(SubmitError::UrlRequired);
    }
    if filename.trim().is_empty() {
        return Err(SubmitError::FilenameRequired);
    }

    let clean = sanitize_filename(filename);
    if clean.is_empty() {
        return Err(SubmitError::FilenameRequired);
    }
    Ok((url.to_string(), clean))
}
