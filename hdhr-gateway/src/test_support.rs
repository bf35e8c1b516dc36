//! In-process stand-ins for the tuner, the vendor cloud and the UDP
//! discovery responder.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use reqwest::Client;
use tokio::net::UdpSocket;
use tokio::sync::RwLock;

/// A minimal but valid XMLTV document.
pub const SAMPLE_GUIDE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<tv source-info-name=\"test\">\n\
  <channel id=\"2.1\"><display-name>NEWS</display-name></channel>\n\
  <programme start=\"20260101000000 +0000\" stop=\"20260101010000 +0000\" channel=\"2.1\">\n\
    <title>Evening News</title>\n\
  </programme>\n\
</tv>\n";

pub const SAMPLE_LINEUP: &str = r#"[
    {"GuideNumber":"2.1","GuideName":"NEWS","DRM":false,"URL":""},
    {"GuideNumber":"5.1","GuideName":"SPORT","DRM":true}
]"#;

pub const SAMPLE_DISCOVER: &str = r#"{"FriendlyName":"HDHomeRun FLEX 4K","ModelNumber":"HDFX-4K","FirmwareVersion":"20250101","DeviceID":"1052ABCD","DeviceAuth":"test-auth","TunerCount":4}"#;

/// HTTP client that never goes through a proxy.
pub fn test_client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub status: u16,
    pub body: String,
}

/// Canned responses of the fake device and cloud.
#[derive(Debug, Clone)]
pub struct FakeResponses {
    pub discover: FakeResponse,
    pub lineup: FakeResponse,
    pub guide: FakeResponse,
    pub cloud: FakeResponse,
    /// Added latency on `lineup.json`, to hold a refresh in flight.
    pub lineup_delay: Duration,
}

impl FakeResponses {
    pub fn ok(body: &str) -> FakeResponse {
        FakeResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(status: u16) -> FakeResponse {
        FakeResponse {
            status,
            body: String::new(),
        }
    }
}

impl Default for FakeResponses {
    fn default() -> Self {
        Self {
            discover: Self::ok(SAMPLE_DISCOVER),
            lineup: Self::ok(SAMPLE_LINEUP),
            guide: Self::ok(SAMPLE_GUIDE),
            cloud: Self::ok("[]"),
            lineup_delay: Duration::ZERO,
        }
    }
}

/// Request counts per endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hits {
    pub discover: usize,
    pub lineup: usize,
    pub guide: usize,
    pub cloud: usize,
}

#[derive(Default)]
struct Counters {
    discover: AtomicUsize,
    lineup: AtomicUsize,
    guide: AtomicUsize,
    cloud: AtomicUsize,
}

struct Shared {
    responses: RwLock<FakeResponses>,
    counters: Counters,
    last_auth: Mutex<Option<String>>,
}

/// Fake tuner and cloud API served from one local axum router.
pub struct FakeDevice {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

fn reply(response: &FakeResponse) -> (StatusCode, String) {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, response.body.clone())
}

impl FakeDevice {
    pub async fn spawn(responses: FakeResponses) -> Self {
        let shared = Arc::new(Shared {
            responses: RwLock::new(responses),
            counters: Counters::default(),
            last_auth: Mutex::new(None),
        });

        let app = Router::new()
            .route(
                "/discover.json",
                get(|State(s): State<Arc<Shared>>| async move {
                    s.counters.discover.fetch_add(1, Ordering::SeqCst);
                    reply(&s.responses.read().await.discover)
                }),
            )
            .route(
                "/lineup.json",
                get(|State(s): State<Arc<Shared>>| async move {
                    s.counters.lineup.fetch_add(1, Ordering::SeqCst);
                    let (delay, response) = {
                        let responses = s.responses.read().await;
                        (responses.lineup_delay, responses.lineup.clone())
                    };
                    tokio::time::sleep(delay).await;
                    reply(&response)
                }),
            )
            .route(
                "/api/xmltv",
                get(
                    |State(s): State<Arc<Shared>>,
                     Query(query): Query<HashMap<String, String>>| async move {
                        s.counters.guide.fetch_add(1, Ordering::SeqCst);
                        *s.last_auth.lock().unwrap() = query.get("DeviceAuth").cloned();
                        reply(&s.responses.read().await.guide)
                    },
                ),
            )
            .route(
                "/discover",
                get(|State(s): State<Arc<Shared>>| async move {
                    s.counters.cloud.fetch_add(1, Ordering::SeqCst);
                    reply(&s.responses.read().await.cloud)
                }),
            )
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, shared }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> Hits {
        let c = &self.shared.counters;
        Hits {
            discover: c.discover.load(Ordering::SeqCst),
            lineup: c.lineup.load(Ordering::SeqCst),
            guide: c.guide.load(Ordering::SeqCst),
            cloud: c.cloud.load(Ordering::SeqCst),
        }
    }

    /// `DeviceAuth` query parameter of the last guide request.
    pub fn last_auth(&self) -> Option<String> {
        self.shared.last_auth.lock().unwrap().clone()
    }

    pub async fn set_guide(&self, response: FakeResponse) {
        self.shared.responses.write().await.guide = response;
    }

    pub async fn set_lineup(&self, response: FakeResponse) {
        self.shared.responses.write().await.lineup = response;
    }
}

/// Local UDP endpoint standing in for the broadcast target.
pub struct UdpPeer {
    pub port: u16,
    requests: Arc<AtomicUsize>,
}

impl UdpPeer {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// A discover reply for device `1052ABCD`.
const REPLY: [u8; 16] = [
    0x00, 0x03, 0x00, 0x0c, 0x01, 0x04, 0x00, 0x00, 0x00, 0x01, 0x02, 0x04, 0x10, 0x52, 0xAB, 0xCD,
];

async fn spawn_udp_peer(answer: bool) -> UdpPeer {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&requests);

    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        while let Ok((_, from)) = socket.recv_from(&mut buf).await {
            counter.fetch_add(1, Ordering::SeqCst);
            if answer {
                let _ = socket.send_to(&REPLY, from).await;
            }
        }
    });

    UdpPeer { port, requests }
}

/// A UDP peer that answers every discover request.
pub async fn spawn_udp_responder() -> UdpPeer {
    spawn_udp_peer(true).await
}

/// A UDP peer that receives requests and never answers.
pub async fn spawn_udp_sink() -> UdpPeer {
    spawn_udp_peer(false).await
}
