use reqwest::Client;
use std::time::Duration;
use crate::config::Config;
use crate::error::Result;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

pub fn create_http_client(config: &Config) -> Result<Client> {
    let client = Client::builder()
        .tcp_nodelay(true)
        .https_only(config.https_only)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(config.request_limit.min(32))
        .connect_timeout(CONNECTION_TIMEOUT)
        .timeout(config.request_timeout())
        .build()?;

    Ok(client)
}
