/// Kizuna - Discord/Wikidot account federation service
///
/// Links Discord identities to Wikidot accounts through a PKCE-protected
/// authorization flow, stores the resulting link history, and exposes the
/// account data plus site permission tooling over an HTTP API.
pub mod api;
pub mod application;
pub mod client;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod flow;
pub mod idp;
pub mod link;
pub mod permission;
pub mod pkce;
pub mod server;
