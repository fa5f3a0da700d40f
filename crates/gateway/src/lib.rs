//! Transparent reverse-proxy gateway.
//!
//! Browser code never talks cross-origin to the upstream directly; the
//! gateway relays requests from the dashboard's own origin instead. It is
//! orthogonal to the report cache: it never reads or writes artifacts.
//!
//! Resilience at this layer is network retry with exponential backoff, the
//! complement of the report client's endpoint fallback.

mod proxy;
mod transport;

pub use proxy::ProxyGateway;
pub use transport::{ProxiedRequest, ProxiedResponse, ProxyTransport, ReqwestTransport};
