use actix_web::http::header::HeaderMap;

use crate::error::ProxyError;

pub const SECRET_KEY_HEADER: &str = "x-secret-key";
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// How the proxy authenticates against the upstream chat API.
#[derive(Debug, Clone)]
pub enum CredentialStrategy {
    /// Backend secret key, taken from configuration only.
    SecretKey { secret_key: Option<String> },
    /// Client id from configuration, or from the inbound `x-client-id` header.
    ClientId { client_id: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub header: &'static str,
    pub value: String,
}

impl CredentialStrategy {
    pub fn resolve(&self, inbound: &HeaderMap) -> Result<Credential, ProxyError> {
        match self {
            CredentialStrategy::SecretKey { secret_key } => non_empty(secret_key.as_deref())
                .map(|value| Credential {
                    header: SECRET_KEY_HEADER,
                    value,
                })
                .ok_or_else(|| {
                    ProxyError::MissingCredential(
                        "Thirdweb secret key is required. Set THIRDWEB_SECRET_KEY environment variable."
                            .to_string(),
                    )
                }),
            CredentialStrategy::ClientId { client_id } => non_empty(client_id.as_deref())
                .or_else(|| {
                    non_empty(
                        inbound
                            .get(CLIENT_ID_HEADER)
                            .and_then(|value| value.to_str().ok()),
                    )
                })
                .map(|value| Credential {
                    header: CLIENT_ID_HEADER,
                    value,
                })
                .ok_or_else(|| {
                    ProxyError::MissingCredential(
                        "Thirdweb client ID is required. Set THIRDWEB_CLIENT_ID environment variable or send the x-client-id header."
                            .to_string(),
                    )
                }),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
