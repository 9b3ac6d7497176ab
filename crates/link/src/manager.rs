//! The client-manager side of the control link.
//!
//! A state machine with three states. Disconnected: dial the controller,
//! backing off between attempts. Connecting: send the hello and wait for
//! the controller's verdict. Connected: serve spawn/kill requests with a
//! short read deadline so child-process supervision runs between reads.
//!
//! Failure handling follows the link error taxonomy: codec errors tear the
//! link down immediately, an I/O error is tolerated once before the second
//! in a row forces a disconnect, and a non-recoverable handshake code
//! terminates the manager entirely. Whenever the link drops, every child
//! process is killed before reconnecting.

use crate::children::ClientProcessList;
use crate::error::{LinkError, LinkResult};
use crate::messages::{
    ControlMessage, ControlMessageBody, MessageIdSequence, ResponseCode,
};
use crate::transport::{self, Transport};
use stampede_codec::{read_element_bounded, write_element, CodecError};
use stampede_config::{ManagerConfig, MAX_ELEMENT_SIZE, PROTOCOL_VERSION};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// How one connected session ended.
enum SessionEnd {
    /// The link dropped or the controller shut down; reconnect later.
    Reconnect,
    /// A terminal condition; the manager must exit.
    Terminal,
}

/// What to do after handling one message.
enum DispatchOutcome {
    Continue,
    Disconnect,
}

/// The client-manager link task.
pub struct ClientManager {
    config: ManagerConfig,
    shutdown: Arc<AtomicBool>,
    children: ClientProcessList,
    message_ids: MessageIdSequence,
}

impl ClientManager {
    pub fn new(config: ManagerConfig) -> Self {
        let children = ClientProcessList::new(&config.start_command, config.max_clients);
        Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            children,
            message_ids: MessageIdSequence::manager(),
        }
    }

    /// A handle other tasks use to stop the manager.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Number of live client processes.
    pub fn live_clients(&self) -> usize {
        self.children.live_count()
    }

    /// Runs the state machine until shutdown. Never returns while a
    /// recoverable path remains.
    pub async fn run(&mut self) -> LinkResult<()> {
        info!(
            endpoint = self.config.controller_endpoint().as_str(),
            "client manager starting"
        );

        while !self.shutdown_requested() {
            // Disconnected: dial out.
            let stream = match transport::connect(&self.config).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "connection attempt failed");
                    self.backoff().await;
                    continue;
                }
            };

            // Connecting, then Connected.
            let outcome = self.serve_session(stream).await;
            self.children.kill_all().await;

            match outcome {
                Ok(SessionEnd::Terminal) => {
                    info!("client manager exiting");
                    return Ok(());
                }
                Ok(SessionEnd::Reconnect) => {
                    info!("link closed, will reconnect");
                }
                Err(e) => {
                    if e.is_terminal() {
                        error!(error = %e, "terminal handshake failure");
                        return Err(e);
                    }
                    warn!(error = %e, "link failed");
                }
            }
            self.backoff().await;
        }

        self.children.kill_all().await;
        Ok(())
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Sleeps the reconnect delay in short slices so a shutdown request is
    /// honored promptly.
    async fn backoff(&self) {
        let mut remaining = self.config.reconnect_wait();
        let slice = Duration::from_millis(250);
        while !remaining.is_zero() && !self.shutdown_requested() {
            let step = remaining.min(slice);
            sleep(step).await;
            remaining -= step;
        }
    }

    /// Runs the handshake and the connected loop on one transport.
    async fn serve_session(&mut self, mut stream: Transport) -> LinkResult<SessionEnd> {
        self.handshake(&mut stream).await?;

        // Connected: bring up the configured baseline of clients.
        if self.config.auto_create_clients > 0 {
            let (started, _) = self.children.spawn_batch(self.config.auto_create_clients);
            info!(started, "auto-created client processes");
        }

        let read_timeout = self.config.read_timeout();
        let mut io_failures = 0u32;

        loop {
            if self.shutdown_requested() {
                info!("shutdown requested, closing link");
                return Ok(SessionEnd::Terminal);
            }

            self.children.reap_exited();

            match read_element_bounded(&mut stream, read_timeout, MAX_ELEMENT_SIZE).await {
                Ok(element) => {
                    io_failures = 0;
                    let message = ControlMessage::decode(&element)?;
                    if let DispatchOutcome::Disconnect =
                        self.dispatch(&mut stream, message).await?
                    {
                        return Ok(SessionEnd::Reconnect);
                    }
                }
                Err(e) if e.is_timeout() => {
                    // Nothing arrived inside the read deadline; loop so
                    // child supervision keeps running.
                    io_failures = 0;
                }
                Err(e) if e.is_end_of_stream() => {
                    info!("controller closed the link");
                    return Ok(SessionEnd::Reconnect);
                }
                Err(CodecError::Io { operation, reason }) => {
                    io_failures += 1;
                    if io_failures >= 2 {
                        warn!(reason = reason.as_str(), "second consecutive I/O failure");
                        return Err(LinkError::io(operation, reason));
                    }
                    warn!(reason = reason.as_str(), "I/O failure, tolerating once");
                }
                Err(e) => {
                    // Framing is unrecoverable; tear the link down.
                    return Err(LinkError::Codec(e));
                }
            }
        }
    }

    /// Sends the hello and waits for the controller's verdict. A
    /// non-recoverable rejection surfaces as a terminal error; a
    /// recoverable one as an ordinary link error, which triggers the
    /// normal backoff-and-retry path.
    async fn handshake(&mut self, stream: &mut Transport) -> LinkResult<()> {
        let hello = ControlMessage::new(
            self.message_ids.next_id(),
            ControlMessageBody::ManagerHello {
                client_version: PROTOCOL_VERSION.to_string(),
                client_id: self.config.client_id.clone(),
                max_clients: self.config.max_clients as i64,
            },
        );
        write_element(stream, &hello.encode()).await?;
        debug!(message_id = hello.message_id, "hello sent");

        let element = read_element_bounded(
            stream,
            Duration::from_millis(stampede_config::MAX_BLOCK_TIME_MS),
            MAX_ELEMENT_SIZE,
        )
        .await?;
        let response = ControlMessage::decode(&element)?;

        let ControlMessageBody::HelloResponse {
            response_code,
            response_message,
        } = response.body
        else {
            return Err(LinkError::protocol(format!(
                "expected HelloResponse, got message type {}",
                response.message_type()
            )));
        };

        match response_code {
            ResponseCode::Success => {
                info!(client_id = self.config.client_id.as_str(), "handshake accepted");
                Ok(())
            }
            code if !code.is_recoverable() => Err(LinkError::HandshakeRejected {
                code,
                message: response_message,
            }),
            code => {
                warn!(?code, message = response_message.as_str(), "handshake deferred");
                Err(LinkError::protocol(format!(
                    "handshake deferred with {:?}",
                    code
                )))
            }
        }
    }

    /// Handles one controller message on the connected link. Responses
    /// echo the request's message ID.
    async fn dispatch(
        &mut self,
        stream: &mut Transport,
        message: ControlMessage,
    ) -> LinkResult<DispatchOutcome> {
        match message.body {
            ControlMessageBody::StartClientRequest { count } => {
                let response = self.handle_start_request(count);
                write_element(
                    stream,
                    &ControlMessage::new(message.message_id, response).encode(),
                )
                .await?;
                Ok(DispatchOutcome::Continue)
            }
            ControlMessageBody::StopClientRequest { count } => {
                let stopped = self.children.stop(count).await as i64;
                write_element(
                    stream,
                    &ControlMessage::new(
                        message.message_id,
                        ControlMessageBody::StopClientResponse { stopped },
                    )
                    .encode(),
                )
                .await?;
                Ok(DispatchOutcome::Continue)
            }
            ControlMessageBody::ServerShutdown => {
                info!("controller shutting down");
                Ok(DispatchOutcome::Disconnect)
            }
            other => {
                warn!(?other, "ignoring unexpected message");
                Ok(DispatchOutcome::Continue)
            }
        }
    }

    fn handle_start_request(&mut self, count: i64) -> ControlMessageBody {
        if count < 0 {
            return ControlMessageBody::StartClientResponse {
                response_code: ResponseCode::LocalError,
                response_message: format!("cannot start {} clients", count),
            };
        }
        let requested = count as usize;

        if self.children.would_exceed_limit(requested) {
            info!(
                requested,
                live = self.children.live_count(),
                max = self.children.max_clients(),
                "rejecting start request"
            );
            return ControlMessageBody::StartClientResponse {
                response_code: ResponseCode::InsufficientClients,
                response_message: format!(
                    "{} live + {} requested exceeds limit {}",
                    self.children.live_count(),
                    requested,
                    self.children.max_clients()
                ),
            };
        }

        match self.children.spawn_batch(requested) {
            (started, None) => {
                info!(started, "started client processes");
                ControlMessageBody::StartClientResponse {
                    response_code: ResponseCode::Success,
                    response_message: format!("started {} clients", started),
                }
            }
            (started, Some(error)) => ControlMessageBody::StartClientResponse {
                response_code: ResponseCode::LocalError,
                response_message: format!("started {} of {}: {}", started, requested, error),
            },
        }
    }
}
