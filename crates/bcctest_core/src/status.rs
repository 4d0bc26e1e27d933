//! Exit-status semantics for test programs.

/// Status recorded when a program did not exit normally (signal, timeout) or could not be spawned.
///
/// No expectation can hold a negative code, so this never compares equal to one.
pub const ABNORMAL_STATUS: i32 = -1;

/// Reduce a raw exit code to the 8-bit value a POSIX parent observes.
///
/// A program returning `-1` is observed as `255`, so `// RETURN: 255` keeps working on platforms that report
/// wider exit codes.
pub fn normalize_exit_code(raw: i32) -> u8 {
    (raw & 0xFF) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_range_codes_are_unchanged() {
        assert_eq!(normalize_exit_code(0), 0);
        assert_eq!(normalize_exit_code(3), 3);
        assert_eq!(normalize_exit_code(255), 255);
    }

    #[test]
    fn negative_codes_wrap() {
        assert_eq!(normalize_exit_code(-1), 255);
        assert_eq!(normalize_exit_code(-2), 254);
    }

    #[test]
    fn wide_codes_truncate() {
        assert_eq!(normalize_exit_code(256), 0);
        assert_eq!(normalize_exit_code(300), 44);
    }
}
