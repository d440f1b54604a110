use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Destination and request-line attributes of one exchange. Must be sent
/// identically on the request and response events.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub method: String,
    pub path: String,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WireEvent<'a> {
    RequestSeen {
        exchange: &'a Exchange,
        raw: &'a str,
        body_offset: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        observed_at_ms: Option<u64>,
    },
    ResponseSeen {
        exchange: &'a Exchange,
        raw: &'a str,
        body_offset: usize,
        status: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        observed_at_ms: Option<u64>,
    },
}

/// Connection to the relay's ingest surface.
pub struct ObserverClient {
    stream: TcpStream,
}

impl ObserverClient {
    /// Connect to the relay ingest listener.
    pub async fn connect(addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self { stream })
    }

    /// Emit a request-seen event.
    pub async fn request_seen(
        &mut self,
        exchange: &Exchange,
        raw: &str,
        body_offset: usize,
        url: Option<&str>,
        observed_at_ms: Option<u64>,
    ) -> std::io::Result<()> {
        self.emit(&WireEvent::RequestSeen {
            exchange,
            raw,
            body_offset,
            url,
            observed_at_ms,
        })
        .await
    }

    /// Emit a response-seen event.
    pub async fn response_seen(
        &mut self,
        exchange: &Exchange,
        raw: &str,
        body_offset: usize,
        status: u16,
        observed_at_ms: Option<u64>,
    ) -> std::io::Result<()> {
        self.emit(&WireEvent::ResponseSeen {
            exchange,
            raw,
            body_offset,
            status,
            observed_at_ms,
        })
        .await
    }

    async fn emit(&mut self, event: &WireEvent<'_>) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        self.stream.write_all(&line).await?;
        self.stream.flush().await
    }
}
