/// Errors from the outbound HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote service returned a non-2xx status code.
    #[error("{service} API error ({status}): {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// A 2xx response that carried nothing usable.
    #[error("{service} returned an empty response")]
    Empty { service: &'static str },
}

impl ProviderError {
    pub(crate) async fn check(
        service: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Api {
            service,
            status: status.as_u16(),
            body,
        })
    }
}
