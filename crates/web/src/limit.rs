use std::collections::HashMap;
use std::net::IpAddr;

/// Caps live connections, in total and per remote address.
///
/// Every successful [`acquire`](Self::acquire) must be paired with one [`release`](Self::release)
/// for the same address.
#[derive(Debug)]
pub struct ConnectionLimiter {
    max_connections: usize,
    max_per_ip: usize,
    active: usize,
    per_ip: HashMap<IpAddr, usize>,
}

impl ConnectionLimiter {
    /// Creates a limiter with no live connections.
    ///
    /// # Arguments
    ///
    /// * `max_connections` - live connections allowed in total
    /// * `max_per_ip` - live connections allowed from one remote address
    pub fn new(max_connections: usize, max_per_ip: usize) -> Self {
        Self { max_connections, max_per_ip, active: 0, per_ip: HashMap::new() }
    }

    /// Admits one more connection from `ip`, returns `false` if a limit is reached.
    pub fn acquire(&mut self, ip: IpAddr) -> bool {
        if self.active >= self.max_connections {
            return false;
        }
        let count = self.per_ip.entry(ip).or_default();
        if *count >= self.max_per_ip {
            return false;
        }
        *count += 1;
        self.active += 1;
        true
    }

    /// Gives back a slot taken by [`acquire`](Self::acquire) for `ip`.
    ///
    /// Releasing an address with no live connection is a no-op.
    pub fn release(&mut self, ip: IpAddr) {
        let Some(count) = self.per_ip.get_mut(&ip) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.per_ip.remove(&ip);
        }
        self.active -= 1;
    }

    /// Number of live connections in total.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Number of live connections from `ip`.
    ///
    /// # Returns
    ///
    /// `0` for an address that holds no connection.
    pub fn active_for(&self, ip: IpAddr) -> usize {
        self.per_ip.get(&ip).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const A: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const B: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    #[test]
    fn per_ip_cap() {
        let mut limiter = ConnectionLimiter::new(100, 2);
        assert!(limiter.acquire(A));
        assert!(limiter.acquire(A));
        assert!(!limiter.acquire(A));
        assert!(limiter.acquire(B));
        assert_eq!(limiter.active_for(A), 2);
        assert_eq!(limiter.active(), 3);

        limiter.release(A);
        assert!(limiter.acquire(A));
    }

    #[test]
    fn total_cap() {
        let mut limiter = ConnectionLimiter::new(2, 2);
        assert!(limiter.acquire(A));
        assert!(limiter.acquire(B));
        assert!(!limiter.acquire(B));
        assert_eq!(limiter.active_for(B), 1);
    }

    #[test]
    fn release_forgets_address() {
        let mut limiter = ConnectionLimiter::new(10, 10);
        limiter.acquire(A);
        limiter.release(A);
        assert_eq!(limiter.active(), 0);
        assert!(limiter.per_ip.is_empty());

        // unknown address is a no-op
        limiter.release(B);
        assert_eq!(limiter.active(), 0);
    }
}
