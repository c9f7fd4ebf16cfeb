//! DRM client-token handling.

/// Split a composite client token into `(username, password)`.
///
/// The circulation vendor embeds both in one string: the segment after the
/// last `|` is the password, everything before it (pipes included) is the
/// username. A token with no `|` yields the whole token as the username and
/// an empty password, matching the vendor's historical behavior.
pub(crate) fn split_client_token(token: &str) -> (String, String) {
    match token.rsplit_once('|') {
        Some((username, password)) => (username.to_string(), password.to_string()),
        None => (token.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_separator() {
        let (username, password) = split_client_token("NYNYPL|LEpmbYhqbAZCLbZNmeKa8");
        assert_eq!(username, "NYNYPL");
        assert_eq!(password, "LEpmbYhqbAZCLbZNmeKa8");
    }

    #[test]
    fn test_multiple_separators_rejoin_username() {
        let (username, password) = split_client_token("NYNYPL|1569044555|5deadbeef|secret");
        assert_eq!(username, "NYNYPL|1569044555|5deadbeef");
        assert_eq!(password, "secret");
    }

    #[test]
    fn test_no_separator_keeps_whole_token_as_username() {
        let (username, password) = split_client_token("plain-token");
        assert_eq!(username, "plain-token");
        assert_eq!(password, "");
    }

    #[test]
    fn test_trailing_separator_yields_empty_password() {
        let (username, password) = split_client_token("NYNYPL|");
        assert_eq!(username, "NYNYPL");
        assert_eq!(password, "");
    }
}
