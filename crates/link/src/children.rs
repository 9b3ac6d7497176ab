//! Child-process supervision.
//!
//! The manager spawns each client process from a single configured command
//! line. Standard output is piped and drained to a bit bucket so a chatty
//! client can never stall on a full pipe; exits are polled without
//! blocking every pass through the link loop.

use crate::error::{LinkError, LinkResult};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// One supervised client process.
pub struct ManagedClient {
    child: Child,
    command: String,
}

impl ManagedClient {
    /// Spawns a client from the configured command line. The command is
    /// split on whitespace; the first token is the program.
    pub fn spawn(command_line: &str) -> LinkResult<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or_else(|| LinkError::Spawn {
            command: command_line.to_string(),
            reason: "empty start command".to_string(),
        })?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LinkError::Spawn {
                command: command_line.to_string(),
                reason: e.to_string(),
            })?;

        // Drain stdout for the life of the child; the bytes are discarded.
        if let Some(mut stdout) = child.stdout.take() {
            tokio::spawn(async move {
                let _ = tokio::io::copy(&mut stdout, &mut tokio::io::sink()).await;
            });
        }

        debug!(pid = child.id(), command = command_line, "spawned client process");
        Ok(Self {
            child,
            command: command_line.to_string(),
        })
    }

    /// The OS process ID, while the child is running.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Non-blocking exit poll. Returns the exit code when the child has
    /// finished.
    pub fn poll_exit(&mut self) -> Option<i32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.code().unwrap_or(-1)),
            Ok(None) => None,
            Err(e) => {
                warn!(command = self.command.as_str(), error = %e, "exit poll failed");
                Some(-1)
            }
        }
    }

    /// Kills the child and reaps it.
    pub async fn kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!(command = self.command.as_str(), error = %e, "kill failed");
        }
        let _ = self.child.wait().await;
    }
}

/// The manager's list of live client processes.
pub struct ClientProcessList {
    children: Vec<ManagedClient>,
    start_command: String,
    max_clients: usize,
}

impl ClientProcessList {
    pub fn new(start_command: impl Into<String>, max_clients: usize) -> Self {
        Self {
            children: Vec::new(),
            start_command: start_command.into(),
            max_clients,
        }
    }

    /// Number of live children.
    pub fn live_count(&self) -> usize {
        self.children.len()
    }

    /// Maximum children this manager may run at once.
    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// True when `requested` more children would exceed the limit.
    pub fn would_exceed_limit(&self, requested: usize) -> bool {
        self.live_count() + requested > self.max_clients
    }

    /// Spawns `count` children. On a spawn failure the remainder of the
    /// batch is abandoned; children spawned earlier in the batch stay
    /// live. Returns how many were started.
    pub fn spawn_batch(&mut self, count: usize) -> (usize, Option<LinkError>) {
        for started in 0..count {
            match ManagedClient::spawn(&self.start_command) {
                Ok(child) => self.children.push(child),
                Err(e) => {
                    warn!(error = %e, started, requested = count, "abandoning spawn batch");
                    return (started, Some(e));
                }
            }
        }
        (count, None)
    }

    /// Kills up to `count` children from the list; a negative count means
    /// all of them. Returns the number killed.
    pub async fn stop(&mut self, count: i64) -> usize {
        let to_stop = if count < 0 {
            self.children.len()
        } else {
            (count as usize).min(self.children.len())
        };
        let mut stopped = 0;
        for mut child in self.children.drain(..to_stop).collect::<Vec<_>>() {
            child.kill().await;
            stopped += 1;
        }
        info!(stopped, "stopped client processes");
        stopped
    }

    /// Kills every child.
    pub async fn kill_all(&mut self) {
        let count = self.children.len();
        for mut child in self.children.drain(..).collect::<Vec<_>>() {
            child.kill().await;
        }
        if count > 0 {
            info!(count, "killed all client processes");
        }
    }

    /// Polls every child for exit, removing and logging the finished ones.
    pub fn reap_exited(&mut self) {
        self.children.retain_mut(|child| match child.poll_exit() {
            Some(code) => {
                info!(exit_code = code, "client process exited");
                false
            }
            None => true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_and_kill() {
        let mut list = ClientProcessList::new("sleep 30", 4);
        let (started, error) = list.spawn_batch(2);
        assert_eq!(started, 2);
        assert!(error.is_none());
        assert_eq!(list.live_count(), 2);

        let stopped = list.stop(-1).await;
        assert_eq!(stopped, 2);
        assert_eq!(list.live_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_partial() {
        let mut list = ClientProcessList::new("sleep 30", 4);
        list.spawn_batch(3);
        assert_eq!(list.stop(2).await, 2);
        assert_eq!(list.live_count(), 1);
        list.kill_all().await;
    }

    #[tokio::test]
    async fn test_spawn_failure_abandons_batch() {
        let mut list = ClientProcessList::new("/no/such/binary-at-all", 8);
        let (started, error) = list.spawn_batch(3);
        assert_eq!(started, 0);
        assert!(matches!(error, Some(LinkError::Spawn { .. })));
        assert_eq!(list.live_count(), 0);
    }

    #[tokio::test]
    async fn test_reap_exited_children() {
        let mut list = ClientProcessList::new("true", 4);
        list.spawn_batch(2);
        // `true` exits immediately; poll until the reaper notices.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while list.live_count() > 0 {
            assert!(std::time::Instant::now() < deadline);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            list.reap_exited();
        }
    }

    #[test]
    fn test_limit_check() {
        let list = ClientProcessList::new("sleep 30", 5);
        assert!(!list.would_exceed_limit(5));
        assert!(list.would_exceed_limit(6));
    }
}
