pub const INVALID_INPUT: &str = "invalid_input";
pub const PERMISSION_DENIED: &str = "permission_denied";
pub const MISSING_SOURCE: &str = "missing_source";
pub const INTERNAL_ERROR: &str = "internal_error";
