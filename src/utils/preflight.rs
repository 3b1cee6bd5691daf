//! Preflight credential resolution.
//!
//! Commands resolve tokens before any remote call, so the prompt flow only
//! asks when neither the flag, the environment nor the settings file has one.

use crate::provider::ProviderKind;
use crate::utils::settings::Settings;

/// Resolves the access token for `kind`: explicit value first, then the
/// provider's environment variable, then the settings file.
pub fn resolve_provider_token(
    settings: &Settings,
    kind: ProviderKind,
    explicit: Option<&str>,
) -> Option<String> {
    resolve_token(settings, kind.token_env_var(), explicit)
}

fn resolve_token(settings: &Settings, env_var: &str, explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .or_else(|| settings.get_env_var(env_var))
}
