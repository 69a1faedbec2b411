//! Interactive Consent Flow
//!
//! Installed-app authorization: PKCE pair and CSRF state, a loopback
//! listener on a random port, the browser sent to the authorization URL, and
//! the code from the redirect exchanged for tokens.

use std::collections::HashMap;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::provider::google::{generate_code_challenge, generate_code_verifier};
use super::provider::{OAuthProvider, OAuthTokens};
use crate::common::{AppError, AppResult};

const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// What the browser sent to the loopback listener
#[derive(Debug, PartialEq, Eq)]
enum Callback {
    Code { code: String, state: String },
    Denied { error: String, description: String },
    /// Anything else, e.g. `/favicon.ico`
    Other,
}

/// Run the full consent flow and return the exchanged tokens.
pub async fn run_consent_flow<P: OAuthProvider>(
    provider: &P,
    scopes: &[String],
) -> AppResult<OAuthTokens> {
    // 1. PKCE pair and state
    let code_verifier = generate_code_verifier();
    let code_challenge = generate_code_challenge(&code_verifier);
    let state = generate_state();

    // 2. Loopback listener on a random available port
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| AppError::consent_failed(format!("Failed to bind local server: {}", e)))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| AppError::consent_failed(format!("Failed to get local address: {}", e)))?;
    let redirect_uri = format!("http://127.0.0.1:{}", local_addr.port());
    info!("OAuth callback server listening on {}", redirect_uri);

    // 3. Send the user to the authorization page
    let auth_url = provider.authorize_url(scopes, &state, &code_challenge, &redirect_uri)?;
    println!("Please visit this URL to authorize this application: {}", auth_url);
    if let Err(e) = open::that(&auth_url) {
        warn!("Failed to open browser automatically: {}", e);
    }

    // 4. Wait for the redirect
    let code = timeout(CONSENT_TIMEOUT, wait_for_callback(&listener, &state))
        .await
        .map_err(|_| {
            AppError::consent_failed(format!(
                "OAuth flow timed out after {} seconds",
                CONSENT_TIMEOUT.as_secs()
            ))
        })??;

    // 5. Exchange code for tokens
    provider
        .exchange_code(&code, &code_verifier, &redirect_uri)
        .await
}

/// Accept connections until the authorization redirect arrives; return the code.
async fn wait_for_callback(listener: &TcpListener, expected_state: &str) -> AppResult<String> {
    loop {
        let (mut socket, _) = listener
            .accept()
            .await
            .map_err(|e| AppError::consent_failed(format!("Callback server error: {}", e)))?;

        let mut reader = BufReader::new(&mut socket);
        let mut request_line = String::new();
        if let Err(e) = reader.read_line(&mut request_line).await {
            debug!("Dropping unreadable callback connection: {}", e);
            continue;
        }

        match parse_callback(&request_line) {
            Callback::Code { code, state } => {
                if state != expected_state {
                    respond(&mut socket, "400 Bad Request", "Error: Invalid state parameter. Please try again.").await;
                    return Err(AppError::consent_failed("State mismatch in OAuth callback"));
                }
                respond(&mut socket, "200 OK", "Authentication successful! You can close this tab.").await;
                return Ok(code);
            }
            Callback::Denied { error, description } => {
                respond(
                    &mut socket,
                    "400 Bad Request",
                    &format!("Error: {} - {}", error, description),
                )
                .await;
                return Err(AppError::consent_failed(format!("{}: {}", error, description)));
            }
            Callback::Other => {
                respond(&mut socket, "404 Not Found", "Not found").await;
            }
        }
    }
}

/// Parse the request line: `GET /path?query HTTP/1.1`
fn parse_callback(request_line: &str) -> Callback {
    let Some(target) = request_line.split_whitespace().nth(1) else {
        return Callback::Other;
    };
    let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");
    let mut params = parse_query_params(query);

    if let (Some(code), Some(state)) = (params.remove("code"), params.remove("state")) {
        return Callback::Code { code, state };
    }
    if let Some(error) = params.remove("error") {
        let description = params
            .remove("error_description")
            .unwrap_or_else(|| "Unknown error".to_string());
        return Callback::Denied { error, description };
    }
    Callback::Other
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Generate a random state string for CSRF protection
fn generate_state() -> String {
    use rand::Rng;
    let bytes: [u8; 16] = rand::rngs::OsRng.gen();
    hex::encode(bytes)
}

/// Parse URL query parameters into a HashMap
fn parse_query_params(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            let replaced = value.replace('+', " ");
            let decoded_value = urlencoding::decode(&replaced).ok()?;
            Some((key.to_string(), decoded_value.into_owned()))
        })
        .collect()
}

/// Send an HTML page back to the browser. Failures only lose the page.
async fn respond(socket: &mut TcpStream, status: &str, message: &str) {
    let html = result_html(message);
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        html.len(),
        html
    );
    if let Err(e) = socket.write_all(response.as_bytes()).await {
        debug!("Failed to answer browser: {}", e);
        return;
    }
    let _ = socket.flush().await;
}

fn result_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>maildrive - authorization</title>
    <style>
        body {{ font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; text-align: center; margin-top: 20vh; }}
        p {{ color: #444; }}
    </style>
</head>
<body>
    <h1>maildrive</h1>
    <p>{}</p>
</body>
</html>"#,
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use tokio::io::AsyncReadExt;

    async fn send_request(port: u16, request_line: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream
            .write_all(format!("{}\r\nHost: 127.0.0.1\r\n\r\n", request_line).as_bytes())
            .await
            .unwrap();
        let mut response = Vec::new();
        let _ = stream.read_to_end(&mut response).await;
        String::from_utf8_lossy(&response).into_owned()
    }

    #[test]
    fn test_parse_callback_code() {
        let cb = parse_callback("GET /?state=abc&code=4%2F0AX&scope=x HTTP/1.1\r\n");
        assert_eq!(
            cb,
            Callback::Code {
                code: "4/0AX".to_string(),
                state: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_parse_callback_denied() {
        let cb = parse_callback("GET /?error=access_denied HTTP/1.1");
        assert_eq!(
            cb,
            Callback::Denied {
                error: "access_denied".to_string(),
                description: "Unknown error".to_string()
            }
        );
    }

    #[test]
    fn test_parse_callback_other() {
        assert_eq!(parse_callback("GET /favicon.ico HTTP/1.1"), Callback::Other);
        assert_eq!(parse_callback(""), Callback::Other);
    }

    #[test]
    fn test_parse_query_params_plus_is_space() {
        let params = parse_query_params("error_description=Access+denied%21&scope=a+b&code=4%2F0A");
        assert_eq!(params["error_description"], "Access denied!");
        assert_eq!(params["scope"], "a b");
        assert_eq!(params["code"], "4/0A");
    }

    #[test]
    fn test_state_is_random_hex() {
        let a = generate_state();
        assert_eq!(a.len(), 32);
        assert_ne!(a, generate_state());
    }

    #[tokio::test]
    async fn test_wait_for_callback_skips_favicon() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let browser = tokio::spawn(async move {
            let favicon = send_request(port, "GET /favicon.ico HTTP/1.1").await;
            let redirect = send_request(port, "GET /?code=the-code&state=s1 HTTP/1.1").await;
            (favicon, redirect)
        });

        let code = wait_for_callback(&listener, "s1").await.unwrap();
        assert_eq!(code, "the-code");

        let (favicon, redirect) = browser.await.unwrap();
        assert!(favicon.starts_with("HTTP/1.1 404"));
        assert!(redirect.starts_with("HTTP/1.1 200 OK"));
    }

    #[tokio::test]
    async fn test_wait_for_callback_state_mismatch() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let browser =
            tokio::spawn(async move { send_request(port, "GET /?code=c&state=forged HTTP/1.1").await });

        let err = wait_for_callback(&listener, "expected").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConsentFailed);
        assert!(browser.await.unwrap().starts_with("HTTP/1.1 400"));
    }

    #[tokio::test]
    async fn test_wait_for_callback_denied() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let browser = tokio::spawn(async move {
            send_request(port, "GET /?error=access_denied HTTP/1.1").await
        });

        let err = wait_for_callback(&listener, "s").await.unwrap_err();
        assert!(err.message.contains("access_denied"));
        browser.await.unwrap();
    }
}
