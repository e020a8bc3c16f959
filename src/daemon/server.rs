// Daemon server module
// Binds the control socket (and optional TCP listener) and serves connections

use std::net::SocketAddr;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};

use super::api;
use crate::config::AppState;
use crate::error::{DaemonError, Result};
use crate::logger;

/// Serve the API until Ctrl-C, then remove the control socket.
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let socket_path = state.config.daemon.socket_path.clone();
    let http_addr = state.config.get_http_addr()?;

    let unix_listener = bind_control_socket(Path::new(&socket_path))?;
    let tcp_listener = http_addr.map(create_reusable_listener).transpose()?;
    let connections = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(&socket_path, http_addr.as_ref(), &state.config);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = unix_listener.accept() => match accepted {
                Ok((stream, _)) => accept_connection(stream, "unix".to_string(), &state, &connections),
                Err(e) => logger::log_error(&format!("Failed to accept control socket connection: {e}")),
            },
            accepted = accept_tcp(tcp_listener.as_ref()) => match accepted {
                Ok((stream, peer_addr)) => accept_connection(stream, peer_addr.to_string(), &state, &connections),
                Err(e) => logger::log_error(&format!("Failed to accept TCP connection: {e}")),
            },
            result = &mut shutdown => {
                if let Err(e) = result {
                    logger::log_error(&format!("Failed to listen for shutdown signal: {e}"));
                }
                break;
            }
        }
    }

    logger::log_shutdown(&socket_path);
    drop(unix_listener);
    if let Err(e) = std::fs::remove_file(&socket_path) {
        logger::log_warning(&format!("Failed to remove control socket {socket_path}: {e}"));
    }
    Ok(())
}

async fn accept_tcp(
    listener: Option<&TcpListener>,
) -> std::io::Result<(tokio::net::TcpStream, SocketAddr)> {
    match listener {
        Some(l) => l.accept().await,
        None => std::future::pending().await,
    }
}

/// Bind the Unix control socket, replacing a stale socket file left by a previous run.
/// Anything that is not a socket, or a socket a live daemon still answers on, is left alone.
pub fn bind_control_socket(path: &Path) -> Result<UnixListener> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) => {
            if !meta.file_type().is_socket() {
                return Err(DaemonError::InvalidConfig(format!(
                    "{} exists and is not a socket",
                    path.display()
                )));
            }
            if std::os::unix::net::UnixStream::connect(path).is_ok() {
                return Err(DaemonError::InvalidConfig(format!(
                    "control socket {} is already in use",
                    path.display()
                )));
            }
            logger::log_warning(&format!("Removing stale control socket {}", path.display()));
            std::fs::remove_file(path)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(UnixListener::bind(path)?)
}

/// Create a `TcpListener` with `SO_REUSEADDR` enabled so a restarted daemon
/// can rebind while old connections sit in `TIME_WAIT`.
pub fn create_reusable_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Accept a connection, enforcing the connection limit.
fn accept_connection<S>(
    stream: S,
    peer: String,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer);
    handle_connection(stream, peer, Arc::clone(state), Arc::clone(conn_counter));
}

/// Serve one connection with HTTP/1 in a spawned task, bounded by the
/// configured connection timeout. The counter is decremented when done.
fn handle_connection<S>(
    stream: S,
    peer: String,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let timeout_duration = Duration::from_secs(state.config.performance.connection_timeout);

        let mut builder = http1::Builder::new();
        builder.keep_alive(state.config.performance.keep_alive);

        let service_peer = peer.clone();
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&state);
                let peer = service_peer.clone();
                async move { api::handle_request(req, state, &peer).await }
            }),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer} timed out after {} seconds",
                timeout_duration.as_secs()
            )),
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_control_socket_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run/controld.socket");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        // Dropping the listener leaves the socket file behind with nobody answering
        drop(std::os::unix::net::UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let listener = bind_control_socket(&path).unwrap();
        assert_eq!(
            listener.local_addr().unwrap().as_pathname(),
            Some(path.as_path())
        );
    }

    #[tokio::test]
    async fn test_bind_control_socket_refuses_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("important.db");
        std::fs::write(&path, b"keep me").unwrap();

        let err = bind_control_socket(&path).unwrap_err();
        assert!(matches!(err, DaemonError::InvalidConfig(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn test_bind_control_socket_refuses_live_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controld.socket");
        let _running = bind_control_socket(&path).unwrap();

        let err = bind_control_socket(&path).unwrap_err();
        assert!(matches!(&err, DaemonError::InvalidConfig(msg) if msg.contains("already in use")));
        assert!(std::os::unix::net::UnixStream::connect(&path).is_ok());
    }

    #[tokio::test]
    async fn test_reusable_listener_binds_ephemeral_port() {
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
