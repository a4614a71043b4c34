//! Socket binding and non-blocking accept for the control endpoint.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

use croupier_config::SocketEndpoint;

use super::connection::ConnectionStream;
use super::errors::TransportError;

#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::Path;

/// Listener bound to the configured control endpoint.
///
/// The listener and every accepted stream run in non-blocking mode: all
/// socket operations are zero-timeout polls driven by the host tick.
#[derive(Debug)]
pub(crate) struct Listener {
    endpoint: SocketEndpoint,
    kind: ListenerKind,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl Listener {
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, TransportError> {
        let kind = match endpoint {
            SocketEndpoint::Tcp { host, port } => ListenerKind::Tcp(bind_tcp(host, *port)?),
            SocketEndpoint::Unix { path } => {
                #[cfg(unix)]
                {
                    ListenerKind::Unix(bind_unix(path.as_std_path())?)
                }

                #[cfg(not(unix))]
                {
                    return Err(TransportError::UnsupportedUnix {
                        endpoint: endpoint.to_string(),
                    });
                }
            }
        };

        let listener = Self {
            endpoint: endpoint.clone(),
            kind,
        };
        if let Err(source) = listener.set_nonblocking() {
            return Err(TransportError::NonBlocking { source });
        }
        Ok(listener)
    }

    fn set_nonblocking(&self) -> io::Result<()> {
        match &self.kind {
            ListenerKind::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            ListenerKind::Unix(listener) => listener.set_nonblocking(true),
        }
    }

    /// The endpoint this listener was bound from.
    pub(crate) fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Local address for TCP endpoints; `None` for unix sockets.
    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &self.kind {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            ListenerKind::Unix(_) => None,
        }
    }

    /// Accepts one pending connection, if any, without blocking.
    ///
    /// The accepted stream is switched to non-blocking mode before use.
    pub(crate) fn poll_accept(&self) -> io::Result<Option<ConnectionStream>> {
        match &self.kind {
            ListenerKind::Tcp(tcp) => match tcp.accept() {
                Ok((stream, _)) => {
                    stream.set_nonblocking(true)?;
                    Ok(Some(ConnectionStream::Tcp(stream)))
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
                Err(error) => Err(error),
            },
            #[cfg(unix)]
            ListenerKind::Unix(unix) => match unix.accept() {
                Ok((stream, _)) => {
                    stream.set_nonblocking(true)?;
                    Ok(Some(ConnectionStream::Unix(stream)))
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
                Err(error) => Err(error),
            },
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        #[cfg(unix)]
        cleanup_unix_socket(&self.endpoint);
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, TransportError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?;
    let addr = addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| TransportError::ResolveEmpty {
            host: host.to_string(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| TransportError::BindTcp { addr, source })
}

#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<UnixListener, TransportError> {
    if path.exists() {
        let metadata =
            fs::symlink_metadata(path).map_err(|source| TransportError::UnixMetadata {
                path: path.display().to_string(),
                source,
            })?;
        if !metadata.file_type().is_socket() {
            return Err(TransportError::UnixNotSocket {
                path: path.display().to_string(),
            });
        }
        match UnixStream::connect(path) {
            Ok(_stream) => {
                return Err(TransportError::UnixInUse {
                    path: path.display().to_string(),
                });
            }
            Err(error)
                if error.kind() == io::ErrorKind::ConnectionRefused
                    || error.kind() == io::ErrorKind::NotFound =>
            {
                fs::remove_file(path).map_err(|source| TransportError::UnixCleanup {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            Err(error) => {
                return Err(TransportError::UnixConnect {
                    path: path.display().to_string(),
                    source: error,
                });
            }
        }
    }

    UnixListener::bind(path).map_err(|source| TransportError::BindUnix {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(unix)]
fn cleanup_unix_socket(endpoint: &SocketEndpoint) {
    let SocketEndpoint::Unix { path } = endpoint else {
        return;
    };
    if let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(
            target: super::TRANSPORT_TARGET,
            error = %error,
            path = %path,
            "failed to remove unix socket file"
        );
    }
}
