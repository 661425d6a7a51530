//! Serves liveness and readiness probes
//!
//! - `/live` responds 200 while the process is running.
//! - `/ready` responds 200 once every controller has synced, and 500 before
//!   that and after shutdown begins.

use bytes::Bytes;
use futures_util::future;
use http_body_util::Full;
use hyper::{
    header::{self, HeaderValue},
    server::conn::http1,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::{TokioIo, TokioTimer};
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::net::TcpListener;
use tracing::{debug, info_span, warn, Instrument};

const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// Server errors
pub type Error = std::io::Error;

/// Command-line arguments used to configure the admin server
#[derive(Clone, Debug, clap::Args)]
pub struct AdminArgs {
    /// The admin server's address
    #[clap(long, default_value = "0.0.0.0:8080")]
    pub admin_addr: SocketAddr,
}

/// Configures an admin server
#[derive(Debug)]
pub struct Builder {
    addr: SocketAddr,
    ready: Readiness,
}

/// An admin server that is bound but not yet accepting connections
#[derive(Debug)]
pub struct Bound {
    addr: SocketAddr,
    ready: Readiness,
    listener: TcpListener,
}

/// Controls whether the admin server reports the process as ready
#[derive(Clone, Debug, Default)]
pub struct Readiness(Arc<AtomicBool>);

/// A handle to a running admin server
#[derive(Debug)]
pub struct Server {
    addr: SocketAddr,
    ready: Readiness,
    task: tokio::task::JoinHandle<()>,
}

// === impl AdminArgs ===

impl Default for AdminArgs {
    fn default() -> Self {
        Self {
            admin_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl AdminArgs {
    pub fn into_builder(self) -> Builder {
        Builder::new(self.admin_addr)
    }
}

// === impl Builder ===

impl Builder {
    /// The server starts unready.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            ready: Readiness::default(),
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.ready.clone()
    }

    /// Binds the server's listener. Must be called from within a runtime.
    pub fn bind(self) -> Result<Bound, Error> {
        let listener = std::net::TcpListener::bind(self.addr)?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        Ok(Bound {
            addr,
            ready: self.ready,
            listener: TcpListener::from_std(listener)?,
        })
    }
}

// === impl Bound ===

impl Bound {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn readiness(&self) -> Readiness {
        self.ready.clone()
    }

    /// Accepts connections on a background task.
    pub fn spawn(self) -> Server {
        let Self {
            addr,
            ready,
            listener,
        } = self;
        let task = tokio::spawn(
            serve(listener, ready.clone()).instrument(info_span!("admin", port = %addr.port())),
        );
        Server { addr, ready, task }
    }
}

async fn serve(listener: TcpListener, ready: Readiness) {
    debug!("Serving");
    loop {
        let (stream, client) = match listener.accept().await {
            Ok(conn) => conn,
            Err(error) => {
                warn!(%error, "Failed to accept connection");
                // Errors like EMFILE persist until connections are closed.
                tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                continue;
            }
        };

        let ready = ready.clone();
        tokio::spawn(async move {
            let service = hyper::service::service_fn(move |req: Request<hyper::body::Incoming>| {
                future::ready(Ok::<_, Infallible>(handle(&ready, &req)))
            });

            let mut http = http1::Builder::new();
            http.timer(TokioTimer::new())
                // Allow clients that half-close after writing, like netcat.
                .half_close(true)
                // Keep port scanners from holding connections open.
                .header_read_timeout(Duration::from_secs(2))
                .max_buf_size(8 * 1024);
            if let Err(error) = http.serve_connection(TokioIo::new(stream), service).await {
                debug!(%error, %client, "Connection failed");
            }
        });
    }
}

// === impl Readiness ===

impl Readiness {
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, ready: bool) {
        self.0.store(ready, Ordering::Release);
    }
}

// === impl Server ===

impl Server {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn readiness(&self) -> Readiness {
        self.ready.clone()
    }

    pub fn into_join_handle(self) -> tokio::task::JoinHandle<()> {
        self.task
    }
}

// === handlers ===

fn handle<B>(ready: &Readiness, req: &Request<B>) -> Response<Full<Bytes>> {
    if !matches!(*req.method(), Method::GET | Method::HEAD) {
        return respond(StatusCode::METHOD_NOT_ALLOWED, "");
    }

    match req.uri().path() {
        "/live" => respond(StatusCode::OK, "alive\n"),
        "/ready" if ready.get() => respond(StatusCode::OK, "ready\n"),
        "/ready" => respond(StatusCode::INTERNAL_SERVER_ERROR, "not ready\n"),
        _ => respond(StatusCode::NOT_FOUND, ""),
    }
}

fn respond(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut rsp = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *rsp.status_mut() = status;
    if !body.is_empty() {
        rsp.headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    }
    rsp
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn get(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    #[test]
    fn live() {
        let rsp = handle(&Readiness::default(), &get("/live"));
        assert_eq!(rsp.status(), StatusCode::OK);
    }

    #[test]
    fn ready_follows_readiness() {
        let ready = Readiness::default();
        assert_eq!(
            handle(&ready, &get("/ready")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        ready.set(true);
        assert_eq!(handle(&ready, &get("/ready")).status(), StatusCode::OK);

        ready.set(false);
        assert_eq!(
            handle(&ready, &get("/ready")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rejects_other_requests() {
        let ready = Readiness::default();
        assert_eq!(handle(&ready, &get("/metrics")).status(), StatusCode::NOT_FOUND);

        let post = Request::builder()
            .method(Method::POST)
            .uri("/live")
            .body(())
            .unwrap();
        assert_eq!(handle(&ready, &post).status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn serves_probes() {
        let bound = Builder::new(SocketAddr::from(([127, 0, 0, 1], 0)))
            .bind()
            .expect("must bind");
        let addr = bound.local_addr();
        let server = bound.spawn();
        server.readiness().set(true);

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /ready HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut rsp = String::new();
        stream.read_to_string(&mut rsp).await.unwrap();
        assert!(rsp.starts_with("HTTP/1.1 200 OK"), "{rsp}");
        assert!(rsp.ends_with("ready\n"), "{rsp}");

        server.into_join_handle().abort();
    }
}
