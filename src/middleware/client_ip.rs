use std::net::SocketAddr;

use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Requester address as seen by the service; `None` when it cannot be told.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

pub async fn client_ip_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let client = resolve_client_ip(req.headers(), peer, state.config.trust_proxy);
    req.extensions_mut().insert(client);

    next.run(req).await
}

/// First `X-Forwarded-For` hop when proxies are trusted, else the socket peer.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> ClientIp {
    let forwarded = trust_proxy
        .then(|| headers.get(FORWARDED_FOR))
        .flatten()
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    ClientIp(forwarded.or_else(|| peer.map(|addr| addr.ip().to_string())))
}
