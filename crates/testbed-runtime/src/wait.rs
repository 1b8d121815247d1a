//! Readiness checks for freshly started instances.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use testbed_common::error::{Result, TestbedError};
use testbed_common::types::{Address, WaitStrategy};

/// Blocks until `address` satisfies `strategy`.
///
/// # Errors
///
/// Returns [`TestbedError::Runtime`] if the deadline elapses first.
pub fn wait_until_ready(address: &Address, strategy: WaitStrategy) -> Result<()> {
    match strategy {
        WaitStrategy::Immediate => Ok(()),
        WaitStrategy::ListeningPort { timeout, interval } => {
            wait_for_listening_port(address, timeout, interval)
        }
    }
}

/// Polls TCP until `address` accepts a connection or `timeout` elapses.
///
/// # Errors
///
/// Returns [`TestbedError::Runtime`] if the address never accepts a
/// connection within `timeout`.
pub fn wait_for_listening_port(
    address: &Address,
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    let start = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);
        if resolve(address).iter().any(|addr| accepts_connection(addr, interval)) {
            tracing::info!(%address, attempts, "service is accepting connections");
            return Ok(());
        }
        if start.elapsed() >= timeout {
            break;
        }
        std::thread::sleep(interval);
    }

    Err(TestbedError::Runtime {
        operation: "wait",
        message: format!(
            "{address} did not accept connections within {}s ({attempts} attempts)",
            timeout.as_secs()
        ),
    })
}

fn resolve(address: &Address) -> Vec<SocketAddr> {
    (address.host.as_str(), address.port)
        .to_socket_addrs()
        .map(Iterator::collect)
        .unwrap_or_default()
}

fn accepts_connection(addr: &SocketAddr, connect_timeout: Duration) -> bool {
    let connect_timeout = connect_timeout.max(Duration::from_millis(50));
    TcpStream::connect_timeout(addr, connect_timeout).is_ok()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn immediate_returns_without_connecting() {
        let address = Address::new("192.0.2.1", 9);
        wait_until_ready(&address, WaitStrategy::Immediate).expect("immediate");
    }

    #[test]
    fn listening_port_is_detected() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let address = Address::new("127.0.0.1", port);
        wait_for_listening_port(&address, Duration::from_secs(2), Duration::from_millis(20))
            .expect("port is open");
    }

    #[test]
    fn closed_port_times_out() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let address = Address::new("127.0.0.1", port);
        let err = wait_for_listening_port(
            &address,
            Duration::from_millis(200),
            Duration::from_millis(50),
        )
        .expect_err("nothing listens");
        assert!(matches!(err, TestbedError::Runtime { operation: "wait", .. }));
    }
}
