//! SyslogSink - RFC 3164 style messages over udp, tcp or a unix datagram socket

use std::future::Future;
use std::io;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use contracts::{Event, EventSink, SinkError, SyslogConfig, SyslogNetwork};
use template::Template;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::encode_payload;

/// Facility `local0`
const FACILITY_LOCAL0: u8 = 16;

/// Open transport to the collector
enum SyslogConn {
    Udp(UdpSocket),
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(tokio::net::UnixDatagram),
}

impl SyslogConn {
    async fn connect(
        network: SyslogNetwork,
        address: &str,
        timeout: Duration,
    ) -> io::Result<Self> {
        within(timeout, address, Self::dial(network, address)).await
    }

    async fn dial(network: SyslogNetwork, address: &str) -> io::Result<Self> {
        match network {
            SyslogNetwork::Udp => {
                let socket = UdpSocket::bind("0.0.0.0:0").await?;
                socket.connect(address).await?;
                Ok(Self::Udp(socket))
            }
            SyslogNetwork::Tcp => Ok(Self::Tcp(TcpStream::connect(address).await?)),
            #[cfg(unix)]
            SyslogNetwork::Unixgram => {
                let socket = tokio::net::UnixDatagram::unbound()?;
                socket.connect(address)?;
                Ok(Self::Unix(socket))
            }
            #[cfg(not(unix))]
            SyslogNetwork::Unixgram => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unixgram requires a unix platform",
            )),
        }
    }

    /// Whether the collector has hung up on a stream connection
    fn is_stale(&self) -> bool {
        match self {
            Self::Tcp(stream) => {
                let mut buf = [0u8; 1];
                match stream.try_read(&mut buf) {
                    Ok(0) => true,
                    Ok(_) => false,
                    Err(e) => e.kind() != io::ErrorKind::WouldBlock,
                }
            }
            _ => false,
        }
    }

    async fn write(&mut self, frame: &[u8]) -> io::Result<()> {
        match self {
            Self::Udp(socket) => socket.send(frame).await.map(drop),
            Self::Tcp(stream) => stream.write_all(frame).await,
            #[cfg(unix)]
            Self::Unix(socket) => socket.send(frame).await.map(drop),
        }
    }

    async fn shutdown(self) -> io::Result<()> {
        match self {
            Self::Tcp(mut stream) => stream.shutdown().await,
            _ => Ok(()),
        }
    }
}

/// Bound a dial by `timeout`, reporting expiry as `TimedOut`
async fn within<T>(
    timeout: Duration,
    address: &str,
    dial: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    tokio::time::timeout(timeout, dial).await.unwrap_or_else(|_| {
        Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connect to {address} timed out after {}ms", timeout.as_millis()),
        ))
    })
}

/// Connection slot shared by concurrent sends
///
/// A send takes the connection out and leaves `Broken` behind until its
/// write succeeds, so a failed or cancelled write forces a redial.
enum ConnState {
    Open(SyslogConn),
    Broken,
    Closed,
}

/// Build one framed syslog message
///
/// `<PRI>TIMESTAMP HOST TAG[PID]: MSG` with a trailing newline.
pub fn format_message(
    severity: u8,
    timestamp: DateTime<Utc>,
    host: &str,
    tag: &str,
    pid: u32,
    msg: &str,
) -> String {
    let pri = FACILITY_LOCAL0 * 8 + severity;
    let ts = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
    let newline = if msg.ends_with('\n') { "" } else { "\n" };
    format!("<{pri}>{ts} {host} {tag}[{pid}]: {msg}{newline}")
}

async fn local_hostname() -> String {
    if let Ok(host) = std::env::var("HOSTNAME") {
        if !host.trim().is_empty() {
            return host.trim().to_string();
        }
    }
    match tokio::fs::read_to_string("/etc/hostname").await {
        Ok(host) if !host.trim().is_empty() => host.trim().to_string(),
        _ => "localhost".to_string(),
    }
}

/// Sink that forwards events to a syslog collector
pub struct SyslogSink {
    name: String,
    config: SyslogConfig,
    layout: Option<Template>,
    hostname: String,
    dial_timeout: Duration,
    conn: Mutex<ConnState>,
}

impl SyslogSink {
    /// Dial the collector, giving up after `dial_timeout`
    ///
    /// The same bound applies to every later redial.
    #[instrument(name = "syslog_sink_connect", skip(name, config, layout))]
    pub async fn connect(
        name: impl Into<String>,
        config: SyslogConfig,
        layout: Option<Template>,
        dial_timeout: Duration,
    ) -> io::Result<Self> {
        let name = name.into();
        let conn = SyslogConn::connect(config.network, &config.address, dial_timeout).await?;
        let hostname = local_hostname().await;

        debug!(
            sink = %name,
            network = ?config.network,
            target = %config.address,
            "SyslogSink connected"
        );

        Ok(Self {
            name,
            config,
            layout,
            hostname,
            dial_timeout,
            conn: Mutex::new(ConnState::Open(conn)),
        })
    }

    async fn redial(&self) -> Result<SyslogConn, SinkError> {
        debug!(sink = %self.name, target = %self.config.address, "Redialling syslog collector");
        SyslogConn::connect(self.config.network, &self.config.address, self.dial_timeout)
            .await
            .map_err(|e| SinkError::delivery(&self.name, format!("reconnect failed: {e}")))
    }

    fn frame(&self, event: &Event) -> Result<String, SinkError> {
        let payload = encode_payload(&self.name, self.layout.as_ref(), event)?;
        let msg = String::from_utf8_lossy(&payload);
        Ok(format_message(
            self.config.severity.code(),
            Utc::now(),
            &self.hostname,
            &self.config.tag,
            std::process::id(),
            &msg,
        ))
    }
}

impl EventSink for SyslogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "syslog_sink_send",
        skip(self, event),
        fields(sink = %self.name)
    )]
    async fn send(&self, event: &Event) -> Result<(), SinkError> {
        let frame = self.frame(event)?;

        let mut state = self.conn.lock().await;
        let mut conn = match std::mem::replace(&mut *state, ConnState::Broken) {
            ConnState::Closed => {
                *state = ConnState::Closed;
                return Err(SinkError::Closed {
                    sink: self.name.clone(),
                });
            }
            ConnState::Open(conn) if !conn.is_stale() => conn,
            ConnState::Open(_) | ConnState::Broken => self.redial().await?,
        };

        if let Err(e) = conn.write(frame.as_bytes()).await {
            warn!(sink = %self.name, error = %e, "Syslog write failed, dropping connection");
            return Err(SinkError::delivery(&self.name, e.to_string()));
        }
        *state = ConnState::Open(conn);
        Ok(())
    }

    #[instrument(name = "syslog_sink_close", skip(self))]
    async fn close(&self) -> Result<(), SinkError> {
        let previous = std::mem::replace(&mut *self.conn.lock().await, ConnState::Closed);
        let conn = match previous {
            ConnState::Closed => return Ok(()),
            ConnState::Broken => {
                debug!(sink = %self.name, "SyslogSink closed");
                return Ok(());
            }
            ConnState::Open(conn) => conn,
        };
        if let Err(e) = conn.shutdown().await {
            warn!(sink = %self.name, error = %e, "Syslog connection shutdown failed");
        }
        debug!(sink = %self.name, "SyslogSink closed");
        Ok(())
    }
}
