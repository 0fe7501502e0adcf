use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Sink for operational events from the server and client.
/// Every hook defaults to a no-op so sinks only implement what they record.
pub trait Logger: Send + Sync {
    fn listening(&self, _addr: &str, _file: &Path) {}
    fn connected(&self, _peer: &str) {}
    fn transfer_done(&self, _peer: &str, _bytes: u64) {}
    fn disconnected(&self, _peer: &str) {}
    fn error(&self, _context: &str, _peer: &str, _msg: &str) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

/// Forwards events to `tracing`
pub struct TracingLogger {
    name: String,
}

impl TracingLogger {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Logger for TracingLogger {
    fn listening(&self, addr: &str, file: &Path) {
        tracing::info!(component = %self.name, %addr, file = %file.display(), "listening");
    }
    fn connected(&self, peer: &str) {
        tracing::info!(component = %self.name, %peer, "connected");
    }
    fn transfer_done(&self, peer: &str, bytes: u64) {
        tracing::info!(component = %self.name, %peer, bytes, "transfer complete");
    }
    fn disconnected(&self, peer: &str) {
        tracing::debug!(component = %self.name, %peer, "disconnected");
    }
    fn error(&self, context: &str, peer: &str, msg: &str) {
        tracing::error!(component = %self.name, %peer, context, "{msg}");
    }
}

/// Append-only text log, one timestamped line per event
pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl Logger for TextLogger {
    fn listening(&self, addr: &str, file: &Path) {
        self.line(&format!("LISTEN addr={} file={}", addr, file.display()));
    }
    fn connected(&self, peer: &str) {
        self.line(&format!("CONNECT peer={peer}"));
    }
    fn transfer_done(&self, peer: &str, bytes: u64) {
        self.line(&format!("SENT peer={peer} bytes={bytes}"));
    }
    fn disconnected(&self, peer: &str) {
        self.line(&format!("DISCONNECT peer={peer}"));
    }
    fn error(&self, context: &str, peer: &str, msg: &str) {
        self.line(&format!("ERROR ctx={context} peer={peer} msg={msg}"));
    }
}

/// Fan one event out to several sinks
pub struct TeeLogger {
    sinks: Vec<Box<dyn Logger>>,
}

impl TeeLogger {
    pub fn new(sinks: Vec<Box<dyn Logger>>) -> Self {
        Self { sinks }
    }
}

impl Logger for TeeLogger {
    fn listening(&self, addr: &str, file: &Path) {
        self.sinks.iter().for_each(|s| s.listening(addr, file));
    }
    fn connected(&self, peer: &str) {
        self.sinks.iter().for_each(|s| s.connected(peer));
    }
    fn transfer_done(&self, peer: &str, bytes: u64) {
        self.sinks.iter().for_each(|s| s.transfer_done(peer, bytes));
    }
    fn disconnected(&self, peer: &str) {
        self.sinks.iter().for_each(|s| s.disconnected(peer));
    }
    fn error(&self, context: &str, peer: &str, msg: &str) {
        self.sinks.iter().for_each(|s| s.error(context, peer, msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_logger_appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("server_9001.log");
        let logger = TextLogger::new(&path).unwrap();
        logger.connected("127.0.0.1:5000");
        logger.transfer_done("127.0.0.1:5000", 42);
        drop(logger);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("CONNECT peer=127.0.0.1:5000"));
        assert!(lines[1].ends_with("SENT peer=127.0.0.1:5000 bytes=42"));
    }
}
