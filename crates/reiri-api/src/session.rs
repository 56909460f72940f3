// One authenticated conversation with the controller.
//
// A session owns the transport and the cipher negotiated on it. It knows
// how to log in and how to run one request/response exchange; it does not
// lock or reconnect. `ReiriClient` does both around it.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::cipher::Cipher;
use crate::error::Error;
use crate::frame::{self, Frame, keyword};
use crate::handshake;
use crate::model::ConnectionState;
use crate::transport::Transport;

#[derive(Serialize)]
struct LoginBody<'a> {
    name: &'a str,
    passwd: &'a str,
    uuid: Option<&'a str>,
}

#[derive(serde::Deserialize)]
struct LoginReply {
    #[serde(default)]
    result: Option<serde_json::Value>,
}

/// A request the engine can replay after a reconnect.
#[derive(Debug, Clone)]
pub(crate) enum Request {
    PointList,
    /// Compact JSON body of an operate command.
    Operate(String),
}

impl Request {
    fn keyword(&self) -> &'static str {
        match self {
            Self::PointList => keyword::POINT_LIST,
            Self::Operate(_) => keyword::OPERATE,
        }
    }
}

pub(crate) struct Session {
    transport: Transport,
    cipher: Cipher,
    authenticated: bool,
    timeout: Duration,
}

impl Session {
    /// Open a socket and run the key exchange.
    pub(crate) async fn open(url: &Url, timeout: Duration) -> Result<Self, Error> {
        let mut transport = Transport::connect(url).await?;
        let cipher = match handshake::perform(&mut transport, timeout).await {
            Ok(cipher) => cipher,
            Err(e) => {
                transport.close().await;
                return Err(e);
            }
        };
        Ok(Self {
            transport,
            cipher,
            authenticated: false,
            timeout,
        })
    }

    pub(crate) fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub(crate) fn state(&self) -> ConnectionState {
        if !self.transport.is_open() {
            ConnectionState::Disconnected
        } else if self.authenticated {
            ConnectionState::Authenticated
        } else {
            ConnectionState::Connected
        }
    }

    /// Send credentials; `Ok(false)` if the controller said anything but OK.
    pub(crate) async fn login(
        &mut self,
        username: &str,
        password: &SecretString,
    ) -> Result<bool, Error> {
        let body = frame::compact(&LoginBody {
            name: username,
            passwd: password.expose_secret(),
            uuid: None,
        })?;

        debug!(username, "logging in");
        let envelope = frame::envelope(keyword::LOGIN, Some(&self.cipher.encrypt(&body)));
        self.transport.send(envelope).await?;

        let text = self.await_reply(keyword::LOGIN).await?;
        let Some(reply) = self.open_reply(&text, keyword::LOGIN)? else {
            warn!("controller answered login unencrypted");
            return Ok(false);
        };

        let parsed: LoginReply =
            serde_json::from_str(&reply).map_err(|e| Error::Deserialization {
                message: format!("login reply: {e}"),
                body: reply.clone(),
            })?;

        let accepted = parsed
            .result
            .as_ref()
            .and_then(serde_json::Value::as_str)
            == Some("OK");
        if accepted {
            info!("login successful");
        } else {
            warn!(result = ?parsed.result, "login rejected by controller");
        }
        self.authenticated = accepted;
        Ok(accepted)
    }

    /// Run one request/response exchange and return the decrypted body.
    pub(crate) async fn run(&mut self, request: &Request) -> Result<String, Error> {
        let kw = request.keyword();
        let envelope = match request {
            Request::PointList => frame::envelope(kw, None),
            Request::Operate(body) => frame::envelope(kw, Some(&self.cipher.encrypt(body))),
        };

        debug!(keyword = kw, "sending command");
        self.transport.send(envelope).await?;

        let text = self.await_reply(kw).await?;
        self.open_reply(&text, kw)?
            .ok_or_else(|| Error::UnexpectedReply {
                keyword: kw.to_owned(),
            })
    }

    pub(crate) async fn close(&mut self) {
        self.authenticated = false;
        self.transport.close().await;
    }

    /// Receive until a frame mentions `kw`; other frames are discarded.
    async fn await_reply(&mut self, kw: &str) -> Result<String, Error> {
        loop {
            let text = self.transport.receive(self.timeout).await?;
            if frame::mentions(&text, kw) {
                return Ok(text);
            }
            trace!(keyword = kw, "discarding unrelated frame");
        }
    }

    /// Decrypt the payload of a matched reply; `None` if it came unencrypted.
    fn open_reply(&self, text: &str, kw: &str) -> Result<Option<String>, Error> {
        let reply = Frame::parse(text).ok_or_else(|| Error::Deserialization {
            message: format!("malformed '{kw}' reply frame"),
            body: text.to_owned(),
        })?;
        if !reply.is_encrypted() {
            return Ok(None);
        }
        self.cipher.decrypt(reply.ciphertext()?).map(Some)
    }
}
