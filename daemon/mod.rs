// echo: peer that writes every received byte back on the same connection
use crossbeam::channel::{bounded, Receiver};
use std::io::{ErrorKind, Result};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tether_core::Endpoint;
use tether_transport::{EndpointListener, Transport, TransportListener};
use tracing::{debug, info, warn};

pub const DEFAULT_WORKERS: usize = 4;

// Accepted connections waiting for a free worker
const PENDING_CONNECTIONS: usize = 64;
const ECHO_CHUNK: usize = 4096;
// Pause after an accept failure that is likely to repeat (EMFILE, ENOBUFS)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct EchoServer {
    listener: EndpointListener,
    endpoint: Endpoint,
}

impl EchoServer {
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        let listener = EndpointListener::bind_endpoint(endpoint)?;
        let endpoint = listener.local_endpoint()?;
        Ok(EchoServer { listener, endpoint })
    }

    /// Endpoint clients should connect to (TCP port 0 resolved).
    pub fn local_endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Accept connections forever, handing each to one of `workers` threads.
    pub fn serve(mut self, workers: usize) -> Result<()> {
        let workers = workers.max(1);
        let (tx, rx) = bounded::<Box<dyn Transport>>(PENDING_CONNECTIONS);

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let rx = rx.clone();
            handles.push(
                thread::Builder::new()
                    .name(format!("echo-worker-{}", i))
                    .spawn(move || worker_thread(rx))?,
            );
        }
        drop(rx);

        info!(endpoint = %self.endpoint, workers, "echo server serving");

        loop {
            let conn = match self.listener.accept() {
                Ok(conn) => conn,
                Err(e) => {
                    if let Some(pause) = accept_backoff(&e) {
                        warn!(error = %e, ?pause, "accept failed");
                        thread::sleep(pause);
                    }
                    continue;
                }
            };
            if tx.send(conn).is_err() {
                // Every worker is gone; nothing left to serve with
                break;
            }
        }

        drop(tx);
        for handle in handles {
            let _ = handle.join();
        }
        Ok(())
    }

    /// Run [`EchoServer::serve`] on a background thread.
    pub fn spawn(self, workers: usize) -> Result<(Endpoint, JoinHandle<Result<()>>)> {
        let endpoint = self.endpoint.clone();
        let handle = thread::Builder::new()
            .name("echo-accept".to_string())
            .spawn(move || self.serve(workers))?;
        Ok((endpoint, handle))
    }
}

// None means retry at once: the failure belonged to a single connection attempt
fn accept_backoff(err: &std::io::Error) -> Option<Duration> {
    match err.kind() {
        ErrorKind::Interrupted | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

fn worker_thread(rx: Receiver<Box<dyn Transport>>) {
    let mut buf = vec![0u8; ECHO_CHUNK];
    for mut conn in rx {
        match echo(&mut conn, &mut buf) {
            Ok(total) => debug!(bytes = total, "echo connection finished"),
            Err(e) => debug!(error = %e, "echo connection dropped"),
        }
        if let Err(e) = conn.disconnect() {
            debug!(error = %e, "echo disconnect failed");
        }
    }
}

// Echo until end-of-stream; returns the number of bytes mirrored
fn echo(conn: &mut dyn Transport, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    loop {
        let n = match conn.receive(buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let mut written = 0;
        while written < n {
            match conn.send(&buf[written..n]) {
                Ok(0) => return Err(ErrorKind::WriteZero.into()),
                Ok(w) => written += w,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        total += n;
    }
}
