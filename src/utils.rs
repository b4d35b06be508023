/// Usernames come from the external auth layer with Django's charset:
/// letters, digits and @/./+/-/_ only, at most 150 characters.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 150
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@.+-_".contains(c))
}
