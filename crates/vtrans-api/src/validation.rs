//! Request input validation.

/// Longest job ID accepted from a path parameter.
const MAX_JOB_ID_LENGTH: usize = 128;

/// Longest filename kept when building an object key.
const MAX_FILENAME_LENGTH: usize = 100;

/// Validate job ID format.
///
/// Valid format: alphanumeric characters, hyphens and underscores,
/// bounded length. Anything else never came from the engine.
pub fn is_valid_job_id(id: &str) -> bool {
    if id.is_empty() || id.len() > MAX_JOB_ID_LENGTH {
        return false;
    }
    id.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Sanitize an uploaded filename for use inside an object key.
///
/// Path separators and control characters are replaced, leading dots
/// stripped, and the result truncated. Empty input falls back to a
/// generic name.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return "upload.bin".to_string();
    }
    cleaned.chars().take(MAX_FILENAME_LENGTH).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_validation() {
        assert!(is_valid_job_id("job-42"));
        assert!(is_valid_job_id("a1_b2-c3"));
        assert!(!is_valid_job_id(""));
        assert!(!is_valid_job_id("jobs/42"));
        assert!(!is_valid_job_id("job 42"));
        assert!(!is_valid_job_id(&"x".repeat(129)));
    }

    #[test]
    fn test_filename_sanitization() {
        assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("my clip (1).mp4"), "my_clip__1_.mp4");
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename(""), "upload.bin");
        assert_eq!(sanitize_filename("..."), "upload.bin");
        assert_eq!(sanitize_filename(".hidden.mp4"), "hidden.mp4");
        assert_eq!(sanitize_filename(&"a".repeat(200)).len(), 100);
    }
}
