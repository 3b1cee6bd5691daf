//! Token verification for provider clients.

use tracing::info;

use super::{GitHubClient, GitLabClient, ProviderClient, ProviderError, ProviderKind, Result};

/// Builds a client for `kind` and verifies `token` against the provider.
///
/// A token the provider answers with a non-success status for is reported as
/// [`ProviderError::AuthenticationFailed`]; network failures pass through
/// unchanged.
pub async fn connect(
    kind: ProviderKind,
    token: &str,
    api_url: &str,
) -> Result<Box<dyn ProviderClient>> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ProviderError::AuthenticationFailed {
            provider: kind,
            message: "token is empty".to_string(),
        });
    }

    let client: Box<dyn ProviderClient> = match kind {
        ProviderKind::GitHub => Box::new(GitHubClient::new(token.to_string(), api_url)?),
        ProviderKind::GitLab => Box::new(GitLabClient::new(token.to_string(), api_url)?),
    };

    match client.current_user().await {
        Ok(user) => {
            info!(provider = %kind, user = %user, "Authenticated");
            Ok(client)
        }
        Err(ProviderError::RequestFailed { status, body, .. }) => {
            Err(ProviderError::AuthenticationFailed {
                provider: kind,
                message: format!("HTTP {status}: {body}"),
            })
        }
        Err(e) => Err(e),
    }
}
