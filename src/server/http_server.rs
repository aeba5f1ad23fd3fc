use super::service::AppService;
use crate::dispatcher::Dispatcher;
use may::coroutine::JoinHandle;
use may_minihttp::HttpService;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(5);
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(250);

/// Listener wrapper around a `may_minihttp` service.
pub struct HttpServer<T>(pub T);

impl HttpServer<AppService> {
    /// Server that answers every connection through `dispatcher`.
    #[must_use]
    pub fn for_dispatcher(dispatcher: Arc<Dispatcher>) -> Self {
        HttpServer(AppService::new(dispatcher))
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Bind the first address `addr` resolves to and start accepting.
    ///
    /// # Errors
    ///
    /// The address does not resolve or the port cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "address did not resolve"))?;
        let handle = may_minihttp::HttpServer(self.0).start(addr)?;
        info!(addr = %addr, "HTTP server listening");
        Ok(ServerHandle { addr, handle })
    }
}

/// Running accept coroutine.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// [`wait_ready_within`](Self::wait_ready_within) 250ms.
    ///
    /// # Errors
    ///
    /// `TimedOut` when the listener never accepts.
    pub fn wait_ready(&self) -> io::Result<()> {
        self.wait_ready_within(DEFAULT_READY_TIMEOUT)
    }

    /// Poll the listener every 5ms until a connection succeeds.
    ///
    /// # Errors
    ///
    /// `TimedOut` when `timeout` passes without a successful connect.
    pub fn wait_ready_within(&self, timeout: Duration) -> io::Result<()> {
        let start = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if TcpStream::connect(self.addr).is_ok() {
                debug!(addr = %self.addr, attempts = attempts, "Server accepting connections");
                return Ok(());
            }
            if start.elapsed() >= timeout {
                warn!(
                    addr = %self.addr,
                    attempts = attempts,
                    timeout_ms = timeout.as_millis(),
                    "Server not ready"
                );
                return Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"));
            }
            thread::sleep(READY_POLL_INTERVAL);
        }
    }

    /// Cancel the accept coroutine and wait for it to end.
    pub fn stop(self) {
        info!(addr = %self.addr, "Stopping server");
        // SAFETY: the coroutine is owned by this handle and is joined below.
        #[allow(unsafe_code)]
        unsafe {
            self.handle.coroutine().cancel();
        }
        if self.handle.join().is_err() {
            warn!(addr = %self.addr, "Server coroutine ended with a panic");
        }
    }

    /// Block until the accept coroutine finishes.
    ///
    /// # Errors
    ///
    /// The coroutine panicked.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}
