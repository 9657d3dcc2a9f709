use reqwest::Client;

const APP_USER_AGENT: &str = concat!("mc-bootstrap/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client. Redirects (including scheme-changing ones)
/// are followed by the default policy; timeouts are left to reqwest's
/// connection defaults.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(APP_USER_AGENT).build()
}
