//! Minimal MPD protocol client
//!
//! Speaks the MPD text protocol over TCP: one command per line, `key: value`
//! response fields, terminated by `OK` or `ACK ...`. Every request runs
//! under the configured timeout; a timeout or I/O error drops the connection
//! so the lifecycle manager can reconnect.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{AudioBackend, BackendError, BackendResult, PlaybackSnapshot, PlayerState};

pub struct MpdBackend {
    host: String,
    port: u16,
    timeout: Duration,
    conn: Mutex<Option<MpdConnection>>,
}

struct MpdConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Outcome of one command exchange, before timeout handling.
enum Exchange {
    Fields(Vec<(String, String)>),
    /// Server rejected the command (`ACK` line). The connection stays usable.
    Ack(String),
}

impl MpdConnection {
    async fn handshake(stream: TcpStream) -> std::io::Result<(Self, String)> {
        let (read, writer) = stream.into_split();
        let mut reader = BufReader::new(read);
        let mut greeting = String::new();
        reader.read_line(&mut greeting).await?;
        let greeting = greeting.trim().to_string();
        if !greeting.starts_with("OK MPD") {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unexpected MPD greeting: {greeting}"),
            ));
        }
        Ok((Self { reader, writer }, greeting))
    }

    async fn exchange(&mut self, command: &str) -> std::io::Result<Exchange> {
        // One write per command: a separate write for the trailing newline
        // can be delayed by Nagle's algorithm and split the line across
        // TCP segments.
        self.writer.write_all(format!("{command}\n").as_bytes()).await?;
        self.writer.flush().await?;

        let mut fields = Vec::new();
        loop {
            let mut line = String::new();
            let n = self.reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(std::io::ErrorKind::UnexpectedEof.into());
            }
            let line = line.trim_end();
            if line == "OK" {
                return Ok(Exchange::Fields(fields));
            }
            if let Some(ack) = line.strip_prefix("ACK ") {
                return Ok(Exchange::Ack(ack.to_string()));
            }
            if let Some((key, value)) = line.split_once(": ") {
                fields.push((key.to_string(), value.to_string()));
            }
        }
    }
}

impl MpdBackend {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            conn: Mutex::new(None),
        }
    }

    /// Run one command, mapping timeouts and I/O failures to transient
    /// errors and dropping the connection on either.
    async fn request(&self, command: &str) -> BackendResult<Vec<(String, String)>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(BackendError::NotConnected)?;
        match tokio::time::timeout(self.timeout, conn.exchange(command)).await {
            Ok(Ok(Exchange::Fields(fields))) => Ok(fields),
            Ok(Ok(Exchange::Ack(reason))) => Err(BackendError::Protocol(reason)),
            Ok(Err(e)) => {
                *guard = None;
                Err(BackendError::Transient(e.to_string()))
            },
            Err(_) => {
                *guard = None;
                Err(BackendError::Timeout(self.timeout))
            },
        }
    }

    fn lookup<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Build a snapshot from `status` response fields.
    ///
    /// The `audio` field is only reported while the decoder produces sound;
    /// an absent or zero value counts as inactive.
    fn parse_snapshot(fields: &[(String, String)]) -> PlaybackSnapshot {
        let state = match Self::lookup(fields, "state") {
            Some("play") => PlayerState::Playing,
            Some("pause") => PlayerState::Paused,
            _ => PlayerState::Stopped,
        };
        let audio_active = Self::lookup(fields, "audio")
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(false);
        PlaybackSnapshot {
            state,
            elapsed_secs: Self::lookup(fields, "elapsed").and_then(|v| v.parse().ok()),
            song: Self::lookup(fields, "song").and_then(|v| v.parse().ok()),
            playlist_length: Self::lookup(fields, "playlistlength")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            volume: Self::lookup(fields, "volume").and_then(|v| v.parse().ok()),
            bitrate_kbps: Self::lookup(fields, "bitrate").and_then(|v| v.parse().ok()),
            audio_active,
        }
    }
}

#[async_trait]
impl AudioBackend for MpdBackend {
    async fn connect(&self) -> BackendResult<()> {
        let mut guard = self.conn.lock().await;
        let stream =
            match tokio::time::timeout(self.timeout, TcpStream::connect((self.host.as_str(), self.port)))
                .await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(BackendError::Transient(e.to_string())),
                Err(_) => return Err(BackendError::Timeout(self.timeout)),
            };
        let (conn, greeting) =
            match tokio::time::timeout(self.timeout, MpdConnection::handshake(stream)).await {
                Ok(Ok(ok)) => ok,
                Ok(Err(e)) => return Err(BackendError::Transient(e.to_string())),
                Err(_) => return Err(BackendError::Timeout(self.timeout)),
            };
        info!("connected to MPD at {}:{} ({})", self.host, self.port, greeting);
        *guard = Some(conn);
        Ok(())
    }

    async fn disconnect(&self) {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_mut() {
            // Best effort; the server closes the socket either way.
            let _ = tokio::time::timeout(self.timeout, conn.writer.write_all(b"close\n")).await;
            debug!("disconnected from MPD");
        }
        *guard = None;
    }

    async fn set_volume(&self, volume: u8) -> BackendResult<()> {
        self.request(&format!("setvol {volume}")).await.map(|_| ())
    }

    async fn set_pause(&self, paused: bool) -> BackendResult<()> {
        self.request(if paused { "pause 1" } else { "pause 0" })
            .await
            .map(|_| ())
    }

    async fn next(&self) -> BackendResult<()> {
        self.request("next").await.map(|_| ())
    }

    async fn previous(&self) -> BackendResult<()> {
        self.request("previous").await.map(|_| ())
    }

    async fn status(&self) -> BackendResult<PlaybackSnapshot> {
        let fields = self.request("status").await?;
        Ok(Self::parse_snapshot(&fields))
    }

    async fn ping(&self) -> BackendResult<()> {
        self.request("ping").await.map(|_| ())
    }

    async fn clear_queue(&self) -> BackendResult<()> {
        self.request("clear").await.map(|_| ())
    }

    async fn enqueue(&self, uri: &str) -> BackendResult<u32> {
        let fields = self.request(&format!("addid \"{uri}\"")).await?;
        Self::lookup(&fields, "Id")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| BackendError::Protocol("addid response missing Id".into()))
    }

    async fn play(&self) -> BackendResult<()> {
        self.request("play 0").await.map(|_| ())
    }
}
