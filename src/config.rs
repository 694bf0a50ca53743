use std::time::Duration;

/// Connection options for [`crate::Client::connect`].
///
/// `command_timeout` bounds ordinary request/reply round trips. Blocking
/// stream reads are exempt: their bound is the BLOCK argument the caller
/// passes per read.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    /// Logical database index, selected with SELECT right after connect.
    pub db: u32,
    pub connect_timeout: Duration,
    pub command_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            connect_timeout: Duration::from_secs(10),
            command_timeout: None,
        }
    }
}

impl ConnectOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
