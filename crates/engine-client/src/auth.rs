//! JWT bearer authentication for outbound Engine API requests.
//!
//! The execution layer checks that the `iat` claim is within ±60 seconds of its own clock, so a
//! token is minted for every request rather than cached.

use std::{
    fs,
    path::Path,
    task::{Context, Poll},
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_rpc_types_engine::{Claims, JwtSecret};
use http::{header::AUTHORIZATION, HeaderValue, Request};
use tower::{Layer, Service};
use tracing::warn;

use crate::errors::{AuthError, ConfigError};

/// Reads a hex encoded 32 byte secret, with or without a `0x` prefix.
pub fn load_jwt_secret(path: &Path) -> Result<JwtSecret, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::JwtRead {
        path: path.to_path_buf(),
        source,
    })?;

    let hex = raw.trim();
    if hex.is_empty() {
        return Err(ConfigError::EmptyJwtSecret(path.to_path_buf()));
    }

    JwtSecret::from_hex(hex).map_err(|err| ConfigError::MalformedJwtSecret {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// Signs an HS256 token whose only claim is `iat = now`.
pub fn mint_token(secret: &JwtSecret, now: SystemTime) -> Result<String, AuthError> {
    let iat = now
        .duration_since(UNIX_EPOCH)
        .map_err(|_| AuthError::Clock)?
        .as_secs();

    secret
        .encode(&Claims { iat, exp: None })
        .map_err(|err| AuthError::Signing(err.to_string()))
}

fn bearer_header(secret: &JwtSecret, now: SystemTime) -> Result<HeaderValue, AuthError> {
    let token = mint_token(secret, now)?;
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|err| AuthError::Header(err.to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Layer adding `Authorization: Bearer <jwt>` to every request when a secret is configured.
#[derive(Clone, Debug)]
pub struct JwtAuthLayer {
    secret: Option<JwtSecret>,
}

impl JwtAuthLayer {
    pub fn new(secret: Option<JwtSecret>) -> Self {
        Self { secret }
    }
}

impl<S> Layer<S> for JwtAuthLayer {
    type Service = JwtAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        JwtAuthService {
            secret: self.secret.clone(),
            inner,
        }
    }
}

#[derive(Clone, Debug)]
pub struct JwtAuthService<S> {
    secret: Option<JwtSecret>,
    inner: S,
}

impl<S, B> Service<Request<B>> for JwtAuthService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        if let Some(secret) = &self.secret {
            match bearer_header(secret, SystemTime::now()) {
                Ok(value) => {
                    request.headers_mut().insert(AUTHORIZATION, value);
                }
                // The peer rejects the request, which surfaces as a transport error.
                Err(err) => warn!(%err, "failed to mint engine credential, sending unauthenticated"),
            }
        }
        self.inner.call(request)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        io::Write,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use tower::{service_fn, ServiceBuilder, ServiceExt};

    use super::*;

    const SECRET_HEX: &str = "f79ae8046bc11c9927afe911db7143c51a806c4a537cc08e0d37140b0192f430";

    fn secret() -> JwtSecret {
        JwtSecret::from_hex(SECRET_HEX).unwrap()
    }

    fn claims_of(token: &str) -> serde_json::Value {
        let payload = token.split('.').nth(1).expect("jwt has a payload segment");
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
    }

    /// Runs a request through the layer and returns the authorization header it carried.
    async fn captured_header(layer: JwtAuthLayer) -> Option<HeaderValue> {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let svc = ServiceBuilder::new()
            .layer(layer)
            .service(service_fn(move |req: Request<()>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = req.headers().get(AUTHORIZATION).cloned();
                    Ok::<_, Infallible>(())
                }
            }));

        svc.oneshot(Request::new(())).await.unwrap();
        let header = seen.lock().unwrap().take();
        header
    }

    #[test]
    fn test_mint_token_sets_iat() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let token = mint_token(&secret(), now).unwrap();

        let claims = claims_of(&token);
        assert_eq!(claims["iat"], 1_700_000_000u64);
    }

    #[test]
    fn test_mint_token_is_pure() {
        let now = UNIX_EPOCH + Duration::from_secs(42);
        assert_eq!(
            mint_token(&secret(), now).unwrap(),
            mint_token(&secret(), now).unwrap()
        );
        let other = JwtSecret::from_hex("11".repeat(32)).unwrap();
        assert_ne!(
            mint_token(&secret(), now).unwrap(),
            mint_token(&other, now).unwrap()
        );
    }

    #[tokio::test]
    async fn test_layer_injects_sensitive_bearer() {
        let header = captured_header(JwtAuthLayer::new(Some(secret())))
            .await
            .expect("authorization header present");

        assert!(header.is_sensitive());
        let value = header.to_str().unwrap();
        let token = value.strip_prefix("Bearer ").expect("bearer scheme");
        let iat = claims_of(token)["iat"].as_u64().unwrap();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert!(now.abs_diff(iat) <= 60);
    }

    #[tokio::test]
    async fn test_layer_without_secret_passes_through() {
        assert!(captured_header(JwtAuthLayer::new(None)).await.is_none());
    }

    #[test]
    fn test_load_jwt_secret_accepts_prefix_and_whitespace() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  0x{SECRET_HEX}  ").unwrap();

        let loaded = load_jwt_secret(file.path()).unwrap();
        assert_eq!(loaded, secret());
    }

    #[test]
    fn test_load_jwt_secret_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.hex");
        assert!(matches!(
            load_jwt_secret(&missing),
            Err(ConfigError::JwtRead { .. })
        ));

        let empty = dir.path().join("empty.hex");
        fs::write(&empty, "\n").unwrap();
        assert!(matches!(
            load_jwt_secret(&empty),
            Err(ConfigError::EmptyJwtSecret(_))
        ));

        let short = dir.path().join("short.hex");
        fs::write(&short, "deadbeef").unwrap();
        assert!(matches!(
            load_jwt_secret(&short),
            Err(ConfigError::MalformedJwtSecret { .. })
        ));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let rendered = format!("{:?}", JwtAuthLayer::new(Some(secret())));
        assert!(!rendered.contains(SECRET_HEX));
    }
}
