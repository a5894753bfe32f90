//! Connection lifecycle scenarios against a scripted transport
//!
//! These verify the coupling between the pools and the completion
//! lifecycle: buffers are returned once per read notification, and the
//! connection record is returned exactly once, only after the close
//! completion has been observed.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;

use poolserve::config::Config;
use poolserve::connection::{ConnectionPhase, LifecycleManager};
use poolserve::context::AppContext;
use poolserve::pool::{PoolError, ReadBuffer};
use poolserve::transport::Transport;

/// One scripted read completion
enum ScriptedRead {
    Data(&'static [u8]),
    Eof,
    Error(io::ErrorKind),
}

/// Transport double driven entirely by a read script.
///
/// `on_close` runs inside `close`, before the completion is reported,
/// which is the point where release-ordering assertions belong.
struct FakeTransport {
    peer: Option<SocketAddr>,
    script: RefCell<VecDeque<ScriptedRead>>,
    close_count: Rc<Cell<usize>>,
    on_close: Option<Box<dyn Fn()>>,
}

impl FakeTransport {
    fn new(
        peer: Option<SocketAddr>,
        script: Vec<ScriptedRead>,
        close_count: Rc<Cell<usize>>,
        on_close: Option<Box<dyn Fn()>>,
    ) -> Self {
        Self {
            peer,
            script: RefCell::new(script.into()),
            close_count,
            on_close,
        }
    }
}

impl Transport for FakeTransport {
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.peer
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "peer not available"))
    }

    async fn readable(&self) -> io::Result<()> {
        if self.script.borrow().is_empty() {
            // A real transport would stay pending; a drained script means
            // the scenario is over.
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "script drained"));
        }
        Ok(())
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.script.borrow_mut().pop_front() {
            Some(ScriptedRead::Data(data)) => {
                buf[..data.len()].copy_from_slice(data);
                Ok(data.len())
            }
            Some(ScriptedRead::Eof) => Ok(0),
            Some(ScriptedRead::Error(kind)) => Err(kind.into()),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        if let Some(on_close) = &self.on_close {
            on_close();
        }
        self.close_count.set(self.close_count.get() + 1);
        Ok(())
    }
}

fn manager_with(connection_slots: usize, buffer_slots: usize) -> Rc<LifecycleManager> {
    let mut config = Config::default();
    config.pool.connection_slots = connection_slots;
    config.pool.buffer_slots = buffer_slots;
    LifecycleManager::new(Rc::new(AppContext::new(config).unwrap()))
}

fn peer() -> Option<SocketAddr> {
    Some("127.0.0.1:50000".parse().unwrap())
}

/// Scenario: accept completes, one read delivers EOF. The buffer is
/// returned within the notification cycle; the record goes Closing, then
/// Closed, and its slot is released only after the close completion.
#[tokio::test]
async fn test_eof_releases_slot_only_after_close_completion() {
    let manager = manager_with(4, 4);
    let handle = manager.reserve().unwrap();
    assert_eq!(manager.phase(handle), Some(ConnectionPhase::Accepted));

    let close_count = Rc::new(Cell::new(0));
    let observer = manager.clone();
    let transport = FakeTransport::new(
        peer(),
        vec![ScriptedRead::Eof],
        close_count.clone(),
        Some(Box::new(move || {
            // Close requested but not yet complete: the record must still
            // be live and in Closing, with every read buffer returned.
            assert_eq!(observer.connection_count(), 1);
            assert_eq!(observer.phase(handle), Some(ConnectionPhase::Closing));
            assert_eq!(observer.context().buf_pool.borrow().len(), 0);
        })),
    );

    manager.drive(handle, transport).await;

    assert_eq!(close_count.get(), 1);
    assert_eq!(manager.connection_count(), 0);
    assert!(manager.phase(handle).is_none());
    assert_eq!(manager.context().buf_pool.borrow().len(), 0);
}

/// Scenario: accept succeeds but the peer-address lookup fails. The
/// connection is abandoned through the close path, never by returning
/// the slot synchronously at the failure site.
#[tokio::test]
async fn test_peer_lookup_failure_goes_through_close_path() {
    let manager = manager_with(2, 2);
    let handle = manager.reserve().unwrap();

    let close_count = Rc::new(Cell::new(0));
    let observer = manager.clone();
    let transport = FakeTransport::new(
        None,
        vec![],
        close_count.clone(),
        Some(Box::new(move || {
            assert_eq!(observer.connection_count(), 1);
            assert_eq!(observer.phase(handle), Some(ConnectionPhase::Closing));
        })),
    );

    manager.drive(handle, transport).await;

    assert_eq!(close_count.get(), 1);
    assert_eq!(manager.connection_count(), 0);
    // No read was ever serviced, so no buffer was touched
    assert_eq!(manager.context().buf_pool.borrow().len(), 0);
}

/// Data reads each consume exactly one buffer and give it back before
/// the next notification is awaited.
#[tokio::test]
async fn test_data_reads_then_eof() {
    let manager = manager_with(2, 2);
    let handle = manager.reserve().unwrap();

    let close_count = Rc::new(Cell::new(0));
    let transport = FakeTransport::new(
        peer(),
        vec![
            ScriptedRead::Data(b"hello"),
            ScriptedRead::Data(b"world!"),
            ScriptedRead::Eof,
        ],
        close_count.clone(),
        None,
    );

    manager.drive(handle, transport).await;

    assert_eq!(close_count.get(), 1);
    assert_eq!(manager.connection_count(), 0);
    assert_eq!(manager.context().buf_pool.borrow().len(), 0);
}

/// A read error abandons the connection the same way EOF does.
#[tokio::test]
async fn test_read_error_closes_connection() {
    let manager = manager_with(2, 2);
    let handle = manager.reserve().unwrap();

    let close_count = Rc::new(Cell::new(0));
    let transport = FakeTransport::new(
        peer(),
        vec![ScriptedRead::Error(io::ErrorKind::ConnectionReset)],
        close_count.clone(),
        None,
    );

    manager.drive(handle, transport).await;

    assert_eq!(close_count.get(), 1);
    assert_eq!(manager.connection_count(), 0);
    assert_eq!(manager.context().buf_pool.borrow().len(), 0);
}

/// A spurious readiness notification (WouldBlock) still allocates and
/// returns a buffer, then the loop continues.
#[tokio::test]
async fn test_spurious_readiness_returns_buffer_and_continues() {
    let manager = manager_with(2, 2);
    let handle = manager.reserve().unwrap();

    let close_count = Rc::new(Cell::new(0));
    let transport = FakeTransport::new(
        peer(),
        vec![ScriptedRead::Error(io::ErrorKind::WouldBlock), ScriptedRead::Eof],
        close_count.clone(),
        None,
    );

    manager.drive(handle, transport).await;

    assert_eq!(close_count.get(), 1);
    assert_eq!(manager.connection_count(), 0);
    assert_eq!(manager.context().buf_pool.borrow().len(), 0);
}

/// Buffer-pool exhaustion during the allocate phase aborts the
/// connection through the close path instead of growing or crashing.
#[tokio::test]
async fn test_buffer_exhaustion_aborts_connection() {
    let manager = manager_with(2, 1);
    let handle = manager.reserve().unwrap();

    // Hold the only buffer so the allocate phase must fail
    let held = manager
        .context()
        .buf_pool
        .borrow_mut()
        .allocate(ReadBuffer::zeroed())
        .unwrap();

    let close_count = Rc::new(Cell::new(0));
    let transport = FakeTransport::new(
        peer(),
        vec![ScriptedRead::Data(b"never read")],
        close_count.clone(),
        None,
    );

    manager.drive(handle, transport).await;

    assert_eq!(close_count.get(), 1);
    assert_eq!(manager.connection_count(), 0);
    // The held buffer is untouched
    assert_eq!(manager.context().buf_pool.borrow().len(), 1);
    manager.context().buf_pool.borrow_mut().deallocate(held).unwrap();
}

/// The connection pool is a hard admission bound: reservation beyond
/// capacity reports exhaustion.
#[tokio::test]
async fn test_reservation_beyond_capacity_is_rejected() {
    let manager = manager_with(1, 1);

    let first = manager.reserve().unwrap();
    assert_eq!(manager.reserve().unwrap_err(), PoolError::Exhausted);

    // Releasing through a full lifecycle makes the slot admittable again
    let transport = FakeTransport::new(peer(), vec![ScriptedRead::Eof], Rc::new(Cell::new(0)), None);
    manager.drive(first, transport).await;
    assert!(manager.reserve().is_ok());
}
