// client: one-shot request/reply driver built on the tether client library
use clap::Parser;
use std::time::Duration;
use tether::{ClientConfig, Endpoint, TransportClient};
use tracing::info;

pub const DEFAULT_MAX_LEN: usize = 1024;

#[derive(Parser, Debug, Clone)]
#[command(name = "tether-hello")]
#[command(about = "Connect, send one message, print one reply", long_about = None)]
#[command(version)]
pub struct HelloArgs {
    /// Endpoint to connect to (host:port, tcp://host:port or unix:/path)
    #[arg(short, long, env = "TETHER_ENDPOINT", default_value = tether::DEFAULT_ENDPOINT)]
    pub endpoint: Endpoint,

    /// Payload to send
    #[arg(short, long, default_value = "hello")]
    pub message: String,

    /// Largest reply accepted in the single receive
    #[arg(long, default_value_t = DEFAULT_MAX_LEN)]
    pub max_len: usize,

    /// Append a NUL byte to the payload and strip trailing NULs from the reply
    #[arg(long)]
    pub terminator: bool,

    /// Bound on connect in milliseconds (overrides TETHER_CONNECT_TIMEOUT_MS)
    #[arg(long, value_name = "MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Bound on each send/receive in milliseconds (overrides TETHER_READ/WRITE_TIMEOUT_MS)
    #[arg(long, value_name = "MS")]
    pub io_timeout_ms: Option<u64>,
}

impl HelloArgs {
    pub fn config(&self) -> tether::Result<ClientConfig> {
        let mut config = ClientConfig::from_env()?;
        config.endpoint = self.endpoint.clone();
        if let Some(ms) = self.connect_timeout_ms {
            config = config.with_connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.io_timeout_ms {
            config = config
                .with_read_timeout(Duration::from_millis(ms))
                .with_write_timeout(Duration::from_millis(ms));
        }
        Ok(config)
    }

    /// Bytes put on the wire. The terminator is an application convention,
    /// the transport only ever sees a byte count.
    pub fn payload(&self) -> Vec<u8> {
        let mut payload = self.message.as_bytes().to_vec();
        if self.terminator {
            payload.push(0);
        }
        payload
    }
}

/// connect -> send -> receive once -> close. Returns the reply bytes.
pub fn exchange(args: &HelloArgs, config: ClientConfig) -> tether::Result<Vec<u8>> {
    let client = TransportClient::new(config);
    let payload = args.payload();

    info!(endpoint = %client.endpoint(), "connect");
    let mut conn = client.connect()?;

    let sent = conn.send_all(&payload)?;
    info!(bytes = sent, "sent");

    let mut buf = vec![0u8; args.max_len];
    let n = conn.receive(&mut buf, args.max_len)?;
    info!(bytes = n, "received");
    buf.truncate(n);

    conn.close();
    Ok(buf)
}

pub fn render_reply(reply: &[u8], terminator: bool) -> String {
    let text = if terminator {
        let end = reply.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        &reply[..end]
    } else {
        reply
    };
    String::from_utf8_lossy(text).into_owned()
}
