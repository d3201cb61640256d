//! Standard entry field names.

/// Title field.
pub const TITLE: &str = "Title";
/// User name field.
pub const USER_NAME: &str = "UserName";
/// Password field.
pub const PASSWORD: &str = "Password";
/// URL field.
pub const URL: &str = "URL";
/// Notes field.
pub const NOTES: &str = "Notes";

/// All standard fields, in display order.
pub const STANDARD: [&str; 5] = [TITLE, USER_NAME, PASSWORD, URL, NOTES];

/// Returns `true` if `name` is one of the standard fields.
#[must_use]
pub fn is_standard(name: &str) -> bool {
    STANDARD.contains(&name)
}
