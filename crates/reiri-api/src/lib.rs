//! Async client for the Reiri HVAC controller.
//!
//! The controller speaks a small application protocol over one persistent
//! WebSocket:
//!
//! - **Handshake** ([`handshake`]) — the client offers an ephemeral RSA
//!   public key and receives the AES common key, RSA-OAEP wrapped.
//! - **Envelopes** ([`frame`], [`cipher`]) — every command and reply is a
//!   `["enc", null, [keyword, hex-ciphertext]]` frame, AES-128-CBC under the
//!   common key (which doubles as the IV).
//! - **[`ReiriClient`]** — serializes callers onto the single connection,
//!   matches replies by keyword, and transparently reconnects (with one
//!   retry) when the controller drops the socket.
//!
//! ```rust,ignore
//! use reiri_api::{ClientConfig, ReiriClient};
//!
//! let client = ReiriClient::new(ClientConfig::new("10.0.0.5", "admin", password));
//! client.connect().await?;
//! if !client.login().await? {
//!     return Err("bad credentials".into());
//! }
//! let points = client.get_point_list().await?;
//! ```

pub mod cipher;
pub mod client;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod model;
mod session;
pub mod transport;

pub use cipher::{Cipher, SessionKey};
pub use client::{ClientConfig, DEFAULT_PORT, DEFAULT_RECEIVE_TIMEOUT, ReiriClient};
pub use error::Error;
pub use model::{Attributes, ConnectionState, PointTable, PointValue};
