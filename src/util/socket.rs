//! Socket utilities

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;

/// Create a listening TCP socket with an explicit backlog.
///
/// The socket is nonblocking so it can be registered with the runtime.
pub fn bind_tcp_listener(addr: SocketAddr, backlog: u32) -> Result<std::net::TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
        .context("failed to create listening socket")?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;

    socket
        .bind(&addr.into())
        .with_context(|| format!("failed to bind {addr}"))?;
    socket
        .listen(backlog as i32)
        .with_context(|| format!("failed to listen on {addr}"))?;

    Ok(socket.into())
}
