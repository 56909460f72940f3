// Scripted in-process controller speaking the real protocol: RSA key
// exchange, AES envelopes, keyword-addressed replies.
#![allow(dead_code, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures_util::{SinkExt, StreamExt};
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::{Oaep, RsaPublicKey};
use serde_json::{Value, json};
use sha1::Sha1;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use reiri_api::frame::Frame;
use reiri_api::{Cipher, ClientConfig, SessionKey};

/// What the controller does with each request.
#[derive(Debug, Clone)]
pub struct Script {
    pub login_result: String,
    pub points: Value,
    pub op_reply: Value,
    /// Delay between receiving a request and answering it.
    pub reply_delay: Duration,
    /// Close the socket instead of answering the next N point-list queries.
    pub drop_point_list: usize,
    /// Push unrelated frames ahead of every reply.
    pub noise: bool,
    /// Never answer point-list queries.
    pub silent_point_list: bool,
    /// Answer point-list queries with an unencrypted frame.
    pub plain_point_list: bool,
    /// Encrypt point-list replies under a key the client never saw.
    pub wrong_key_point_list: bool,
    /// Never send the common key.
    pub withhold_common_key: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            login_result: "OK".into(),
            points: json!({
                "p1": {"name": "Living Room", "temp": "24", "stat": "on", "mode": "C", "csp": "22"}
            }),
            op_reply: json!({"result": "OK"}),
            reply_delay: Duration::ZERO,
            drop_point_list: 0,
            noise: false,
            silent_point_list: false,
            plain_point_list: false,
            wrong_key_point_list: false,
            withhold_common_key: false,
        }
    }
}

/// Observable controller-side events, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected,
    Received(String),
    Replied(String),
    Dropped,
}

struct Shared {
    script: Script,
    drops_remaining: AtomicUsize,
    connections: AtomicUsize,
    events: Mutex<Vec<Event>>,
    login_bodies: Mutex<Vec<String>>,
    op_bodies: Mutex<Vec<String>>,
}

impl Shared {
    fn log(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct MockController {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl MockController {
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Shared {
            drops_remaining: AtomicUsize::new(script.drop_point_list),
            script,
            connections: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
            login_bodies: Mutex::new(Vec::new()),
            op_bodies: Mutex::new(Vec::new()),
        });

        let accept_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let shared = Arc::clone(&accept_shared);
                tokio::spawn(serve(stream, shared));
            }
        });

        Self { addr, shared }
    }

    /// Client config pointed at this controller with the scenario credentials.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new("127.0.0.1", "admin", "secret".to_owned()).with_port(self.addr.port())
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<Event> {
        self.shared.events.lock().unwrap().clone()
    }

    pub fn login_bodies(&self) -> Vec<String> {
        self.shared.login_bodies.lock().unwrap().clone()
    }

    pub fn op_bodies(&self) -> Vec<String> {
        self.shared.op_bodies.lock().unwrap().clone()
    }
}

async fn serve(stream: TcpStream, shared: Arc<Shared>) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    shared.connections.fetch_add(1, Ordering::SeqCst);
    shared.log(Event::Connected);

    // ── Key exchange ──
    let pem = loop {
        let Some(Ok(Message::Text(text))) = ws.next().await else {
            return;
        };
        if let Some(frame) = Frame::parse(text.as_str()) {
            if frame.keyword == "sys_info" {
                break frame.payload.unwrap().as_str().unwrap().to_owned();
            }
        }
    };
    let public = RsaPublicKey::from_pkcs1_pem(&pem).unwrap();
    let secret: [u8; 16] = rand::random();
    let wrapped = public
        .encrypt(&mut OsRng, Oaep::new::<Sha1>(), &secret)
        .unwrap();

    // Unrelated and malformed frames first; the client must skip them.
    send(&mut ws, "not json".to_owned()).await;
    send(&mut ws, json!([null, null, ["sys_info", {"ver": "2.0"}]]).to_string()).await;
    if shared.script.withhold_common_key {
        // Keep the socket open until the client gives up.
        while let Some(Ok(_)) = ws.next().await {}
        return;
    }
    send(
        &mut ws,
        json!([null, null, ["sys_info", {"common_key": STANDARD.encode(wrapped)}]]).to_string(),
    )
    .await;

    let cipher = Cipher::new(SessionKey::new(secret));

    // ── Requests ──
    // Arrivals are logged as they happen; replies go out from a separate
    // task after the scripted delay, so overlapping requests are visible.
    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();

    let reader_shared = Arc::clone(&shared);
    tokio::spawn(async move {
        while let Some(Ok(message)) = source.next().await {
            if let Message::Text(text) = message {
                if let Some(frame) = Frame::parse(text.as_str()) {
                    reader_shared.log(Event::Received(frame.keyword.clone()));
                    if tx.send(frame).is_err() {
                        break;
                    }
                }
            }
        }
    });

    while let Some(request) = rx.recv().await {
        tokio::time::sleep(shared.script.reply_delay).await;

        let keyword = request.keyword.clone();
        let body = match keyword.as_str() {
            "login" => {
                let plain = cipher.decrypt(request.ciphertext().unwrap()).unwrap();
                shared.login_bodies.lock().unwrap().push(plain);
                json!({"result": shared.script.login_result})
            }
            "mplist" => {
                if shared.script.silent_point_list {
                    continue;
                }
                if take_drop(&shared) {
                    shared.log(Event::Dropped);
                    let _ = sink.close().await;
                    return;
                }
                if shared.script.plain_point_list {
                    let frame = json!([null, null, ["mplist", shared.script.points]]);
                    shared.log(Event::Replied(keyword));
                    let _ = sink.send(Message::Text(frame.to_string().into())).await;
                    continue;
                }
                if shared.script.wrong_key_point_list {
                    let hex = foreign_ciphertext(&cipher, &shared.script.points.to_string());
                    shared.log(Event::Replied(keyword.clone()));
                    let frame = json!(["enc", null, [keyword, hex]]);
                    let _ = sink.send(Message::Text(frame.to_string().into())).await;
                    continue;
                }
                shared.script.points.clone()
            }
            "op" => {
                let plain = cipher.decrypt(request.ciphertext().unwrap()).unwrap();
                shared.op_bodies.lock().unwrap().push(plain);
                shared.script.op_reply.clone()
            }
            _ => continue,
        };

        if shared.script.noise {
            let notice = cipher.encrypt("{\"event\":\"heartbeat\"}");
            let frame = json!(["enc", null, ["notice", notice]]);
            let _ = sink.send(Message::Text(frame.to_string().into())).await;
        }

        // Logged before sending: the client may answer before we get back here.
        let reply = json!(["enc", null, [keyword, cipher.encrypt(&body.to_string())]]);
        shared.log(Event::Replied(keyword));
        if sink
            .send(Message::Text(reply.to_string().into()))
            .await
            .is_err()
        {
            return;
        }
    }
}

/// Ciphertext under a random key that the session cipher cannot decrypt.
fn foreign_ciphertext(session: &Cipher, plaintext: &str) -> String {
    loop {
        let foreign = Cipher::new(SessionKey::new(rand::random()));
        let hex = foreign.encrypt(plaintext);
        if session.decrypt(&hex).is_err() {
            return hex;
        }
    }
}

fn take_drop(shared: &Shared) -> bool {
    shared
        .drops_remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

async fn send(ws: &mut tokio_tungstenite::WebSocketStream<TcpStream>, text: String) {
    ws.send(Message::Text(text.into())).await.unwrap();
}
