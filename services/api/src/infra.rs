use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Duration;
use metrics_exporter_prometheus::PrometheusHandle;
use questionnaire_hub::clock::Clock;
use questionnaire_hub::config::AuthConfig;
use questionnaire_hub::identity::{
    DisabledVerifier, HttpKeySetFetcher, JwtVerifier, KeySetCache, TokenVerifier,
};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Largest refresh interval chrono can represent without overflow.
const MAX_REFRESH_SECS: u64 = (i64::MAX / 1_000) as u64;

/// Builds the bearer-token verifier. Without a key-set URL every request is refused.
pub(crate) fn build_verifier(auth: &AuthConfig, clock: Arc<dyn Clock>) -> Arc<dyn TokenVerifier> {
    let Some(url) = auth.jwks_url.as_deref() else {
        warn!("AUTH_JWKS_URL is not set; every API request will be rejected");
        return Arc::new(DisabledVerifier);
    };

    let ttl = Duration::seconds(auth.jwks_refresh_secs.min(MAX_REFRESH_SECS) as i64);
    let keys = Arc::new(KeySetCache::new(
        Arc::new(HttpKeySetFetcher::new(url)),
        clock,
        ttl,
    ));
    info!(
        jwks_url = url,
        refresh_secs = auth.jwks_refresh_secs,
        algorithms = ?auth.algorithms,
        "verifying bearer tokens against the identity provider"
    );
    Arc::new(
        JwtVerifier::new(keys)
            .with_algorithms(auth.algorithms.clone())
            .with_issuer(auth.issuer.clone())
            .with_audience(auth.audience.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use questionnaire_hub::clock::SystemClock;
    use questionnaire_hub::config::DEFAULT_JWKS_REFRESH_SECS;
    use questionnaire_hub::identity::AuthError;

    #[tokio::test]
    async fn missing_key_set_url_refuses_every_token() {
        let auth = AuthConfig {
            jwks_url: None,
            issuer: None,
            audience: None,
            jwks_refresh_secs: DEFAULT_JWKS_REFRESH_SECS,
            algorithms: Vec::new(),
        };
        let verifier = build_verifier(&auth, Arc::new(SystemClock));
        assert!(matches!(
            verifier.verify("anything").await,
            Err(AuthError::NotConfigured)
        ));
    }
}
