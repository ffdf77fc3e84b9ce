//! Shared fixtures for integration flows.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
    response::Response,
    Router,
};
use hd_01_broadcast_dispatch::{
    DispatchEngine, DirectoryProvider, HistoryStore, InMemoryDirectory, InMemoryHistoryStore,
    MessageSender, RecordingSender,
};
use hd_02_admin_gateway::{AdminGatewayService, GatewayConfig, SessionCodec};
use shared_types::{AdminSession, AuthState, Channel, ChannelKind, Directory, Guild, User};
use std::io::Cursor;
use std::sync::Arc;

pub const SECRET: &str = "integration-secret-0123456789abcdef";

pub fn channel(id: &str, can_send: bool) -> Channel {
    Channel {
        id: id.into(),
        name: format!("#{id}"),
        kind: ChannelKind::Text,
        can_send,
    }
}

pub fn guild(id: &str, channels: Vec<Channel>) -> Guild {
    Guild {
        id: id.into(),
        name: format!("guild {id}"),
        channels,
    }
}

pub fn user(id: &str, is_banned: bool) -> User {
    User {
        id: id.into(),
        username: format!("user-{id}"),
        is_banned,
    }
}

/// Three guilds, one with no sendable channel; three users, one banned.
pub fn directory() -> Directory {
    Directory::new(
        vec![
            guild("g1", vec![channel("g1-announce", true), channel("g1-mods", false)]),
            guild("g2", vec![channel("g2-locked", false), channel("g2-news", true)]),
            guild("g3", vec![channel("g3-locked", false)]),
        ],
        vec![user("u1", false), user("u2", true), user("u3", false)],
    )
}

pub fn gateway_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.access.session_secret = SECRET.into();
    config
}

pub fn gateway<D, S, H>(config: GatewayConfig, engine: DispatchEngine<D, S, H>) -> Router
where
    D: DirectoryProvider + 'static,
    S: MessageSender + 'static,
    H: HistoryStore + 'static,
{
    AdminGatewayService::new(config, Arc::new(engine))
        .unwrap()
        .router()
}

/// Gateway over in-memory adapters.
pub struct Harness {
    pub router: Router,
    pub sender: Arc<RecordingSender>,
    pub history: Arc<InMemoryHistoryStore>,
}

pub fn harness(sender: RecordingSender) -> Harness {
    let sender = Arc::new(sender);
    let history = Arc::new(InMemoryHistoryStore::new());
    let engine = DispatchEngine::new(
        Arc::new(InMemoryDirectory::new(directory())),
        Arc::clone(&sender),
        Arc::clone(&history),
    );
    Harness {
        router: gateway(gateway_config(), engine),
        sender,
        history,
    }
}

pub fn session_cookie(session: &AdminSession) -> String {
    let value = SessionCodec::new(SECRET).encode(session).unwrap();
    format!("admin_session={value}")
}

pub fn verified_cookie() -> String {
    session_cookie(&AdminSession::new("admin-1", AuthState::Verified))
}

pub fn post_json(uri: &str, cookie: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(res: Response) -> serde_json::Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Semi-transparent PNG, so normalization has to flatten it.
pub fn translucent_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 128]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
