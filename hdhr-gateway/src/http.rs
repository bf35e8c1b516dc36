//! Single-attempt HTTP GET shared by the device, cloud and guide clients.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use thiserror::Error;

/// Failure of one GET request.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(StatusCode),
}

/// Issue a GET with a per-request timeout. Anything but `200 OK` is an error.
pub async fn get_ok(client: &Client, url: &str, timeout: Duration) -> Result<Response, HttpError> {
    let response = client.get(url).timeout(timeout).send().await?;
    if response.status() != StatusCode::OK {
        return Err(HttpError::Status(response.status()));
    }
    Ok(response)
}

/// Build the base URL of the device's HTTP API.
pub fn device_base_url(ip: &str, http_port: u16) -> String {
    if http_port == 80 {
        format!("http://{}", ip)
    } else {
        format!("http://{}:{}", ip, http_port)
    }
}
