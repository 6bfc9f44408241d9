//! Reload signal.
//!
//! SIGHUP on unix. Elsewhere the reload signal never arrives.

/// Stream of reload requests.
pub struct Hangup {
    #[cfg(unix)]
    signal: tokio::signal::unix::Signal,
}

impl Hangup {
    /// Install the handler.
    ///
    /// # Errors
    ///
    /// When the signal handler cannot be registered.
    #[cfg(unix)]
    pub fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            signal: signal(SignalKind::hangup())?,
        })
    }

    /// Install the handler.
    ///
    /// # Errors
    ///
    /// Never.
    #[cfg(not(unix))]
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next reload request.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> Option<()> {
        self.signal.recv().await
    }

    /// Wait for the next reload request.
    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}
