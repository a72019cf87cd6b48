//! Candidate validation, run synchronously before any network call.

use scribe_common::{UploadLimits, ValidationError};

use crate::candidate::FileCandidate;

/// Check a candidate against the configured limits.
///
/// Type is checked before size: a non-image is rejected as such no matter
/// how large it is.
pub fn validate(candidate: &FileCandidate, limits: &UploadLimits) -> Result<(), ValidationError> {
    if !candidate.mime_type.starts_with(limits.accept_mime_prefix.as_str()) {
        return Err(ValidationError::InvalidFileType {
            mime_type: candidate.mime_type.to_string(),
        });
    }
    if candidate.size_bytes > limits.max_size_bytes {
        return Err(ValidationError::FileTooLarge {
            size_bytes: candidate.size_bytes,
            max_bytes: limits.max_size_bytes,
        });
    }
    Ok(())
}
