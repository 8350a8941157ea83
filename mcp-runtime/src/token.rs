pub const TOKEN_ENV: &str = "WB_ANALYTICS_OAUTH_TOKEN";

pub const MISSING_TOKEN_MESSAGE: &str = "API key is required. Please set WB_ANALYTICS_OAUTH_TOKEN environment variable or provide --apiKey argument.";

/// Where the analytics access token comes from.
///
/// Resolution happens on every tool call so a token exported after startup
/// is picked up without restarting the server.
#[derive(Clone, Debug)]
pub enum TokenSource {
    /// `WB_ANALYTICS_OAUTH_TOKEN`, falling back to the `--apiKey` value.
    Process { cli_api_key: Option<String> },
    /// A fixed token, ignoring the environment.
    Fixed(Option<String>),
}

impl TokenSource {
    pub fn from_process(cli_api_key: Option<String>) -> Self {
        TokenSource::Process { cli_api_key }
    }

    pub fn fixed(token: Option<String>) -> Self {
        TokenSource::Fixed(token)
    }

    pub fn resolve(&self) -> Option<String> {
        match self {
            TokenSource::Process { cli_api_key } => {
                pick_token(std::env::var(TOKEN_ENV).ok(), cli_api_key.as_deref())
            }
            TokenSource::Fixed(token) => pick_token(token.clone(), None),
        }
    }
}

/// Environment wins over the command line; empty values count as unset.
fn pick_token(env_value: Option<String>, cli_value: Option<&str>) -> Option<String> {
    env_value
        .filter(|value| !value.is_empty())
        .or_else(|| cli_value.filter(|value| !value.is_empty()).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_takes_precedence_over_cli() {
        assert_eq!(
            pick_token(Some("env-token".to_string()), Some("cli-token")),
            Some("env-token".to_string())
        );
    }

    #[test]
    fn cli_is_used_when_environment_is_unset_or_empty() {
        assert_eq!(pick_token(None, Some("cli-token")), Some("cli-token".to_string()));
        assert_eq!(
            pick_token(Some(String::new()), Some("cli-token")),
            Some("cli-token".to_string())
        );
    }

    #[test]
    fn nothing_configured_means_no_token() {
        assert_eq!(pick_token(None, None), None);
        assert_eq!(pick_token(None, Some("")), None);
        assert_eq!(TokenSource::fixed(None).resolve(), None);
        assert_eq!(TokenSource::fixed(Some(String::new())).resolve(), None);
    }

    #[test]
    fn cli_tokens_keep_embedded_equals_signs() {
        assert_eq!(
            TokenSource::fixed(Some("abc==".to_string())).resolve(),
            Some("abc==".to_string())
        );
    }
}
