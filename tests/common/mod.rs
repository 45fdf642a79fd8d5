#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use jwt_session::auth::{BcryptHasher, SessionManager, TokenCodec};
use jwt_session::configuration::JwtSettings;
use jwt_session::startup::run;
use jwt_session::users::{InMemoryUserStore, UserStore};

const PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/jwt-private.pem");
const PUBLIC_PEM: &[u8] = include_bytes!("../fixtures/jwt-public.pem");

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryUserStore>,
    pub sessions: SessionManager,
    pub client: reqwest::Client,
}

pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(InMemoryUserStore::new());
    let codec = TokenCodec::from_pem("RS256", PRIVATE_PEM, PUBLIC_PEM)
        .expect("Failed to load fixture keys");
    let sessions = SessionManager::new(
        store.clone(),
        Arc::new(BcryptHasher::new(4)),
        Arc::new(codec),
        &JwtSettings::default(),
    );

    let server = run(listener, store.clone() as Arc<dyn UserStore>, sessions.clone())
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        sessions,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json(
            "/auth/register",
            &serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json(
            "/auth/login",
            &serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// GET `path` with the given cookies attached.
    pub async fn get_with_cookies(&self, path: &str, cookies: &[(&str, &str)]) -> reqwest::Response {
        let mut request = self.client.get(&format!("{}{}", self.address, path));
        if !cookies.is_empty() {
            let header = cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header("Cookie", header);
        }
        request.send().await.expect("Failed to execute request.")
    }
}

/// Raw `Set-Cookie` header for `name`, if the response sets it.
pub fn set_cookie_header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}

/// Value of the cookie `name` set by the response.
pub fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    let header = set_cookie_header(response, name)?;
    let pair = header.split(';').next()?;
    pair.split_once('=').map(|(_, value)| value.to_string())
}
