use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{
    json::JsonCodec,
    prefs::StoreError,
    remote::WsClient,
    session::{Session, SessionManager},
};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Not connected to '{0}'")]
    NotConnected(String),
    #[error("Login rejected: {0}")]
    Rejected(String),
    #[error("Malformed message: {0}")]
    Codec(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub imei: String,
    pub fleet_id: i64,
    pub fleet_name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub model: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub uid: i64,
    pub username: String,
}

/// Request frame understood by the scmv server
#[derive(Debug, Clone, Serialize)]
pub struct WsRequest {
    pub name: String,
    pub usr: Option<String>,
    pub pwd: Option<String>,
    pub uid: Option<i64>,
    pub params: Option<serde_json::Value>,
}

impl WsRequest {
    pub fn login(username: &str, password: &str) -> Self {
        Self {
            name: "login".to_string(),
            usr: Some(username.to_string()),
            pwd: Some(password.to_string()),
            uid: None,
            params: None,
        }
    }

    pub fn authorized(name: &str, session: &Session) -> Self {
        Self {
            name: name.to_string(),
            usr: Some(session.username.clone()),
            pwd: Some(session.password.clone()),
            uid: Some(session.uid),
            params: None,
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = Some(params);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WsResponse {
    pub name: String,
    pub msg: Option<String>,
    #[serde(default)]
    pub res: Vec<WsResultSet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WsResultSet {
    pub uid: Option<i64>,
}

/// Encodes and sends a request over the shared socket
///
/// Without an open connection the request is dropped and a connection attempt is started.
fn dispatch(ws: &WsClient, json: &JsonCodec, request: &WsRequest) -> Result<(), RepositoryError> {
    let frame = json.encode(request)?;
    if !ws.send(&frame) {
        ws.connect();
        return Err(RepositoryError::NotConnected(ws.url()));
    }
    tracing::debug!("Sent '{}' request", request.name);
    Ok(())
}

pub trait AuthRepository: Send + Sync {
    /// Sends the login request, the server answers asynchronously
    fn login(&self, username: &str, password: &str) -> Result<(), RepositoryError>;

    /// Handles the server's answer to a login request
    fn complete_login(
        &self,
        response: &str,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<User, RepositoryError>;

    fn logout(&self) -> Result<(), RepositoryError>;

    fn is_logged_in(&self) -> bool;

    fn current_user(&self) -> Option<User>;
}

pub trait DeviceRepository: Send + Sync {
    fn request_devices(&self) -> Result<(), RepositoryError>;

    /// Devices whose name, IMEI or fleet name contain `query`, ignoring case
    fn search_devices(&self, query: &str, devices: &[Device]) -> Vec<Device>;
}

pub trait TrackRepository: Send + Sync {
    fn request_raw_track(&self, device_id: i64, from: &str, to: &str) -> Result<(), RepositoryError>;

    fn request_mileage(&self, device_id: i64, from: &str, to: &str) -> Result<(), RepositoryError>;
}

pub struct AuthRepositoryImpl {
    ws: Arc<WsClient>,
    sessions: Arc<SessionManager>,
    json: Arc<JsonCodec>,
}

impl AuthRepositoryImpl {
    pub fn new(ws: Arc<WsClient>, sessions: Arc<SessionManager>, json: Arc<JsonCodec>) -> Self {
        Self { ws, sessions, json }
    }
}

impl AuthRepository for AuthRepositoryImpl {
    fn login(&self, username: &str, password: &str) -> Result<(), RepositoryError> {
        dispatch(&self.ws, &self.json, &WsRequest::login(username, password))
    }

    fn complete_login(
        &self,
        response: &str,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<User, RepositoryError> {
        let response: WsResponse = self.json.decode(response)?;

        match response.res.first().and_then(|set| set.uid) {
            Some(uid) if uid > 0 => {
                self.sessions
                    .save_session(username, password, uid, remember_me)?;
                Ok(User {
                    uid,
                    username: username.to_string(),
                })
            }
            _ => Err(RepositoryError::Rejected(
                response
                    .msg
                    .unwrap_or_else(|| "Invalid credentials".to_string()),
            )),
        }
    }

    fn logout(&self) -> Result<(), RepositoryError> {
        self.sessions.clear_session()?;
        self.ws.disconnect();
        Ok(())
    }

    fn is_logged_in(&self) -> bool {
        self.sessions.is_logged_in()
    }

    fn current_user(&self) -> Option<User> {
        self.sessions.session().map(|session| User {
            uid: session.uid,
            username: session.username,
        })
    }
}

pub struct DeviceRepositoryImpl {
    ws: Arc<WsClient>,
    sessions: Arc<SessionManager>,
    json: Arc<JsonCodec>,
}

impl DeviceRepositoryImpl {
    pub fn new(ws: Arc<WsClient>, sessions: Arc<SessionManager>, json: Arc<JsonCodec>) -> Self {
        Self { ws, sessions, json }
    }
}

impl DeviceRepository for DeviceRepositoryImpl {
    fn request_devices(&self) -> Result<(), RepositoryError> {
        let session = self.sessions.session().ok_or(RepositoryError::NotLoggedIn)?;
        dispatch(
            &self.ws,
            &self.json,
            &WsRequest::authorized("Vehicle Show", &session),
        )
    }

    fn search_devices(&self, query: &str, devices: &[Device]) -> Vec<Device> {
        search_devices(query, devices)
    }
}

pub fn search_devices(query: &str, devices: &[Device]) -> Vec<Device> {
    if query.trim().is_empty() {
        return devices.to_vec();
    }

    let query = query.trim().to_lowercase();
    devices
        .iter()
        .filter(|device| {
            [&device.name, &device.imei, &device.fleet_name]
                .iter()
                .any(|field| field.to_lowercase().contains(&query))
        })
        .cloned()
        .collect()
}

pub struct TrackRepositoryImpl {
    ws: Arc<WsClient>,
    sessions: Arc<SessionManager>,
    json: Arc<JsonCodec>,
}

impl TrackRepositoryImpl {
    pub fn new(ws: Arc<WsClient>, sessions: Arc<SessionManager>, json: Arc<JsonCodec>) -> Self {
        Self { ws, sessions, json }
    }

    fn request_range(
        &self,
        name: &str,
        device_id: i64,
        from: &str,
        to: &str,
    ) -> Result<(), RepositoryError> {
        let session = self.sessions.session().ok_or(RepositoryError::NotLoggedIn)?;
        let request = WsRequest::authorized(name, &session).with_params(serde_json::json!({
            "id": device_id,
            "from": from,
            "to": to,
        }));
        dispatch(&self.ws, &self.json, &request)
    }
}

impl TrackRepository for TrackRepositoryImpl {
    fn request_raw_track(&self, device_id: i64, from: &str, to: &str) -> Result<(), RepositoryError> {
        self.request_range("Vehicle Track", device_id, from, to)
    }

    fn request_mileage(&self, device_id: i64, from: &str, to: &str) -> Result<(), RepositoryError> {
        self.request_range("Mileage", device_id, from, to)
    }
}
