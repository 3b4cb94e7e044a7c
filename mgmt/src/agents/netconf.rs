// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

// NETCONF client: sessions over TCP with NETCONF 1.0 end-of-message framing

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use config::ConfigState;
use std::io::Cursor;
use std::net::{IpAddr, SocketAddr};
use std::str::from_utf8;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, Instant, sleep, timeout};
#[allow(unused)]
use tracing::{debug, error, info, warn};

use super::VnfProgress;

/// NETCONF 1.0 end-of-message delimiter
const EOM: &[u8] = b"]]>]]>";
const NETCONF_BASE: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

#[derive(Error, Debug)]
pub enum NetconfErr {
    #[error("Failed to connect to {0}: {1}")]
    ConnectFailed(SocketAddr, String),

    #[error("Could not connect to {0} in {1:?}")]
    ConnectTimeout(SocketAddr, Duration),

    #[error("Timeout: did not receive response in time")]
    TimeOut,

    #[error("Peer left")]
    PeerLeft,

    #[error("Receive failure {0}")]
    RxFail(String),

    #[error("Send failure {0}")]
    TxFail(String),

    #[error("Peer replied with rpc-error: {0}")]
    RpcError(String),

    #[error("Decoding error: {0}")]
    DecodeError(&'static str),
}

/// Where to open a NETCONF session. The TCP transport does not authenticate.
#[derive(Clone, Debug, PartialEq)]
pub struct NetconfTarget {
    pub host: IpAddr,
    pub port: u16,
}
impl NetconfTarget {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[async_trait]
pub trait NetconfSession: Send {
    /// Issue an `edit-config` of `payload` against datastore `target`
    async fn edit_config(&mut self, target: &str, payload: &str) -> Result<(), NetconfErr>;
    async fn close(&mut self);
}

#[async_trait]
pub trait NetconfConnector: Send + Sync {
    async fn connect(
        &self,
        target: &NetconfTarget,
        tout: Duration,
    ) -> Result<Box<dyn NetconfSession>, NetconfErr>;
}

/// Send a buffer over the provided [`TcpStream`]
async fn send_buf(sock: &mut TcpStream, buf: &[u8]) -> Result<(), NetconfErr> {
    let mut cursor = Cursor::new(buf);
    while cursor.has_remaining() {
        sock.write_buf(&mut cursor).await.map_err(|e| {
            error!("Failed to send buffer: {e}");
            NetconfErr::TxFail(e.to_string())
        })?;
    }
    Ok(())
}

/// Send a message, terminated by the end-of-message delimiter
pub(crate) async fn send_msg(sock: &mut TcpStream, msg: &str) -> Result<(), NetconfErr> {
    let mut wire_msg = BytesMut::with_capacity(msg.len() + EOM.len());
    wire_msg.extend_from_slice(msg.as_bytes());
    wire_msg.extend_from_slice(EOM);
    send_buf(sock, &wire_msg).await?;
    debug!("Sent NETCONF message of {} octets", msg.len());
    Ok(())
}

fn find_eom(buf: &[u8]) -> Option<usize> {
    buf.windows(EOM.len()).position(|w| w == EOM)
}

/// Receive one message. Octets past the delimiter are kept in `pending` for the next call.
pub(crate) async fn receive_msg(
    sock: &mut TcpStream,
    pending: &mut BytesMut,
) -> Result<String, NetconfErr> {
    loop {
        if let Some(pos) = find_eom(pending) {
            let msg = pending.split_to(pos);
            pending.advance(EOM.len());
            let msg = from_utf8(&msg).map_err(|_| NetconfErr::DecodeError("not utf-8"))?;
            return Ok(msg.to_string());
        }
        let mut chunk = [0u8; 4096];
        match sock.read(&mut chunk).await {
            Ok(0) => return Err(NetconfErr::PeerLeft),
            Ok(n) => pending.extend_from_slice(&chunk[..n]),
            Err(e) => return Err(NetconfErr::RxFail(e.to_string())),
        }
    }
}

async fn receive_msg_timed(
    sock: &mut TcpStream,
    pending: &mut BytesMut,
    tout: Duration,
) -> Result<String, NetconfErr> {
    timeout(tout, receive_msg(sock, pending)).await.map_err(|_| {
        let peer = sock.peer_addr();
        error!("No response from NETCONF server at {peer:?} in {tout:?}");
        NetconfErr::TimeOut
    })?
}

fn client_hello() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<hello xmlns=\"{NETCONF_BASE}\"><capabilities>\
<capability>{NETCONF_BASE}</capability>\
</capabilities></hello>"
    )
}

fn edit_config_rpc(message_id: u64, target: &str, payload: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<rpc message-id=\"{message_id}\" xmlns=\"{NETCONF_BASE}\">\
<edit-config><target><{target}/></target><config>{payload}</config></edit-config>\
</rpc>"
    )
}

/// Tell if `xml` holds an element with local name `name`, whatever its namespace prefix
/// or attributes
fn has_element(xml: &str, name: &str) -> bool {
    xml.match_indices('<').any(|(pos, _)| {
        let tag = &xml[pos + 1..];
        let end = tag
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(tag.len());
        let qname = &tag[..end];
        qname.rsplit_once(':').map_or(qname, |(_, local)| local) == name
    })
}

fn close_session_rpc(message_id: u64) -> String {
    format!("<rpc message-id=\"{message_id}\" xmlns=\"{NETCONF_BASE}\"><close-session/></rpc>")
}

/// A NETCONF session over plain TCP
pub struct TcpNetconfSession {
    sock: TcpStream,
    pending: BytesMut,
    message_id: u64,
    timeout: Duration,
}

impl TcpNetconfSession {
    const RPC_TIMEOUT: Duration = Duration::from_secs(30);

    /// Open a session: connect and exchange hellos
    pub async fn open(target: &NetconfTarget, tout: Duration) -> Result<Self, NetconfErr> {
        let addr = target.addr();
        debug!("Connecting to NETCONF server at {addr}...");
        let sock = timeout(tout, TcpStream::connect(addr))
            .await
            .map_err(|_| NetconfErr::ConnectTimeout(addr, tout))?
            .map_err(|e| NetconfErr::ConnectFailed(addr, e.to_string()))?;
        let mut session = Self {
            sock,
            pending: BytesMut::new(),
            message_id: 0,
            timeout: Self::RPC_TIMEOUT.min(tout),
        };
        send_msg(&mut session.sock, &client_hello()).await?;
        let hello = receive_msg_timed(&mut session.sock, &mut session.pending, tout).await?;
        if !hello.contains("<hello") {
            return Err(NetconfErr::DecodeError("expected a hello"));
        }
        info!("Opened NETCONF session with {addr}");
        Ok(session)
    }

    async fn rpc(&mut self, msg: &str) -> Result<String, NetconfErr> {
        send_msg(&mut self.sock, msg).await?;
        receive_msg_timed(&mut self.sock, &mut self.pending, self.timeout).await
    }
}

#[async_trait]
impl NetconfSession for TcpNetconfSession {
    async fn edit_config(&mut self, target: &str, payload: &str) -> Result<(), NetconfErr> {
        self.message_id += 1;
        let reply = self
            .rpc(&edit_config_rpc(self.message_id, target, payload))
            .await?;
        if has_element(&reply, "rpc-error") {
            return Err(NetconfErr::RpcError(reply));
        }
        if !has_element(&reply, "ok") {
            warn!("edit-config reply carries no <ok/>: {reply}");
            return Err(NetconfErr::RpcError(reply));
        }
        Ok(())
    }
    async fn close(&mut self) {
        self.message_id += 1;
        let _ = self.rpc(&close_session_rpc(self.message_id)).await;
        let _ = self.sock.shutdown().await;
    }
}

/// Opens [`TcpNetconfSession`]s
pub struct TcpNetconfConnector;

#[async_trait]
impl NetconfConnector for TcpNetconfConnector {
    async fn connect(
        &self,
        target: &NetconfTarget,
        tout: Duration,
    ) -> Result<Box<dyn NetconfSession>, NetconfErr> {
        Ok(Box::new(TcpNetconfSession::open(target, tout).await?))
    }
}

/// Connect to a VNF, retrying every `retry_interval` until `budget` is exhausted. The
/// connection sub-states are reported through `progress`.
pub async fn connect_with_retry(
    connector: &dyn NetconfConnector,
    target: &NetconfTarget,
    progress: &VnfProgress,
    budget: Duration,
    retry_interval: Duration,
) -> Result<Box<dyn NetconfSession>, NetconfErr> {
    let start = Instant::now();
    loop {
        progress.report(ConfigState::Connecting).await;
        let remaining = budget.saturating_sub(start.elapsed());
        match connector.connect(target, remaining).await {
            Ok(session) => {
                progress.report(ConfigState::NetconfConnected).await;
                return Ok(session);
            }
            Err(e) => {
                progress.report(ConfigState::FailedConnection).await;
                if start.elapsed() + retry_interval >= budget {
                    error!(
                        "Giving up connecting to {} after {:?}: {e}",
                        target.addr(),
                        start.elapsed()
                    );
                    return Err(NetconfErr::ConnectTimeout(target.addr(), budget));
                }
                debug!("Connection to {} failed: {e}. Retrying...", target.addr());
                sleep(retry_interval).await;
            }
        }
    }
}
