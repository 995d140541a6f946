//! The two ways a session can run its child.
//!
//! [`DirectPipeBackend`] owns the shell's PTY and streams its output to the
//! panel. [`HttpBridgeBackend`] starts a terminal-over-HTTP server on a
//! local port and tells the panel to load it in a browser view once it
//! answers. Both go through the same [`ProcessSupervisor`].

use std::io;
use std::sync::Arc;
use std::time::Duration;

use notch_common::BackendKind;
use notch_config::schema::BridgeConfig;
use tokio::runtime::Handle;

use crate::bridge::{bridge_url, BridgePolicy, BridgeProbe, ProbeOutcome};
use crate::error::TerminalError;
use crate::event::SessionEvent;
use crate::input::{InputFailure, InputRouter, InputSender};
use crate::port::{PortAllocator, PortLease};
use crate::session::{SessionContext, SessionOptions};
use crate::stream::StreamBridge;
use crate::supervisor::{LaunchSpec, ProcessHandle, ProcessSupervisor, StopOutcome};

/// How long an exited child's remaining output may take to drain before
/// the session is marked terminated.
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Launch strategy for a session.
pub trait SessionBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Start `command` and attach the running resources to `ctx`.
    ///
    /// Called with the session in `Starting`. On success the backend moves
    /// it on (directly, or once the child is ready); on error the caller
    /// marks it failed.
    fn launch(
        &self,
        command: &str,
        args: &[String],
        options: &SessionOptions,
        ctx: &SessionContext,
    ) -> Result<(), TerminalError>;
}

// =============================================================================
// ATTACHMENT
// =============================================================================

/// Resources a running session holds, released together.
pub struct Attachment {
    process: Arc<ProcessHandle>,
    output: Option<StreamBridge>,
    input: Option<InputRouter>,
    port: Option<PortLease>,
    probe: Option<BridgeProbe>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("process", &self.process)
            .field("port", &self.port())
            .field("has_input", &self.input.is_some())
            .finish()
    }
}

impl Attachment {
    pub fn new(process: Arc<ProcessHandle>) -> Self {
        Self {
            process,
            output: None,
            input: None,
            port: None,
            probe: None,
        }
    }

    pub fn with_output(mut self, output: StreamBridge) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_input(mut self, input: InputRouter) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_port(mut self, lease: PortLease) -> Self {
        self.port = Some(lease);
        self
    }

    pub fn with_probe(mut self, probe: BridgeProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn process(&self) -> &Arc<ProcessHandle> {
        &self.process
    }

    pub fn port(&self) -> Option<u16> {
        self.port.as_ref().map(PortLease::port)
    }

    pub fn input_sender(&self) -> Option<InputSender> {
        self.input.as_ref().map(InputRouter::sender)
    }

    /// Tear everything down: probe, output, input, process, then the port.
    pub fn release(self) -> StopOutcome {
        let Attachment {
            process,
            output,
            input,
            port,
            probe,
        } = self;

        if let Some(probe) = probe {
            probe.cancel();
        }
        if let Some(output) = &output {
            output.stop();
        }
        if let Some(input) = &input {
            input.shutdown();
        }
        let outcome = process.stop();
        drop(port);
        outcome
    }
}

fn missing_stream(what: &str) -> TerminalError {
    TerminalError::Io(io::Error::other(format!("PTY {what} already taken")))
}

fn launch_spec(program: &str, args: Vec<String>, options: &SessionOptions) -> LaunchSpec {
    LaunchSpec::new(program, args)
        .env(options.env.clone())
        .cwd(options.cwd.clone())
        .size(options.cols, options.rows)
}

// =============================================================================
// DIRECT PIPE
// =============================================================================

/// Streams a shell's PTY straight into the panel.
#[derive(Debug, Clone, Default)]
pub struct DirectPipeBackend {
    supervisor: ProcessSupervisor,
}

impl DirectPipeBackend {
    pub fn new(supervisor: ProcessSupervisor) -> Self {
        Self { supervisor }
    }

    fn wire(
        &self,
        process: &Arc<ProcessHandle>,
        options: &SessionOptions,
        ctx: &SessionContext,
    ) -> Result<Attachment, TerminalError> {
        let reader = process.take_reader().ok_or_else(|| missing_stream("reader"))?;
        let writer = process.take_writer().ok_or_else(|| missing_stream("writer"))?;

        let sink = ctx.events().clone();
        let output = StreamBridge::spawn("pty-reader", reader, options.read_chunk, move |text| {
            sink.output(text);
        })?;

        let sink = ctx.events().clone();
        let input = InputRouter::spawn(writer, options.drop_policy, move |failure: InputFailure| {
            sink.emit(SessionEvent::InputFailed {
                source: failure.source,
                message: failure.message,
            });
        })?;

        Ok(Attachment::new(Arc::clone(process))
            .with_output(output)
            .with_input(input))
    }
}

impl SessionBackend for DirectPipeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DirectPipe
    }

    fn launch(
        &self,
        command: &str,
        args: &[String],
        options: &SessionOptions,
        ctx: &SessionContext,
    ) -> Result<(), TerminalError> {
        let spec = launch_spec(command, args.to_vec(), options);
        let (process, watcher) = self.supervisor.start(&spec)?;

        let attachment = match self.wire(&process, options, ctx) {
            Ok(attachment) => attachment,
            Err(e) => {
                process.stop();
                return Err(e);
            }
        };
        let drain = attachment
            .output
            .as_ref()
            .map(StreamBridge::drain_watch);
        ctx.attach(attachment);

        let exit_ctx = ctx.clone();
        watcher.spawn(move |exit| {
            // Let the reader deliver what the child wrote before it exited.
            if let Some(drain) = drain {
                drain.wait(EXIT_DRAIN_GRACE);
            }
            exit_ctx.process_exited(exit);
        })?;

        ctx.mark_running();
        Ok(())
    }
}

// =============================================================================
// HTTP BRIDGE
// =============================================================================

/// Runs a terminal-over-HTTP server and waits for it to answer.
#[derive(Debug, Clone)]
pub struct HttpBridgeBackend {
    supervisor: ProcessSupervisor,
    ports: PortAllocator,
    config: BridgeConfig,
    policy: BridgePolicy,
    runtime: Handle,
}

impl HttpBridgeBackend {
    /// `runtime` drives the readiness probe.
    pub fn new(
        supervisor: ProcessSupervisor,
        ports: PortAllocator,
        config: BridgeConfig,
        runtime: Handle,
    ) -> Self {
        let policy = BridgePolicy::from_config(&config);
        Self {
            supervisor,
            ports,
            config,
            policy,
            runtime,
        }
    }

    pub fn with_policy(mut self, policy: BridgePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> BridgePolicy {
        self.policy
    }
}

impl SessionBackend for HttpBridgeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::HttpBridge
    }

    /// `command` is the shell the bridge serves; `args` are appended to the
    /// bridge's own arguments.
    fn launch(
        &self,
        command: &str,
        args: &[String],
        options: &SessionOptions,
        ctx: &SessionContext,
    ) -> Result<(), TerminalError> {
        let lease = self.ports.reserve(self.config.port_start, self.config.port_range);
        let port = lease.port();
        let mut bridge_args = self.config.render_args(port, command);
        bridge_args.extend(args.iter().cloned());

        let spec = launch_spec(&self.config.program, bridge_args, options);
        let (process, watcher) = self.supervisor.start(&spec)?;

        // The bridge's own output only matters for debugging. Its input
        // stays parked in the handle so the bridge never sees end of input.
        let session_id = ctx.id().short().to_string();
        let log = process.take_reader().map(|reader| {
            StreamBridge::spawn("bridge-log", reader, options.read_chunk, move |text| {
                tracing::debug!(session_id = %session_id, output = %text.trim_end(), "terminal bridge output");
            })
        });
        let log = match log.transpose() {
            Ok(log) => log,
            Err(e) => {
                process.stop();
                return Err(e);
            }
        };

        let url = bridge_url(port);
        let probe_ctx = ctx.clone();
        let probe_url = url.clone();
        let probe = BridgeProbe::spawn(&self.runtime, url.clone(), self.policy, move |outcome| {
            match outcome {
                ProbeOutcome::Reachable { .. } => {
                    if probe_ctx.mark_running() {
                        probe_ctx.emit(SessionEvent::BridgeReady { url: probe_url });
                    }
                }
                ProbeOutcome::Exhausted {
                    attempts,
                    last_error,
                } => probe_ctx.mark_failed(&TerminalError::BridgeUnreachable {
                    url: probe_url,
                    attempts,
                    last_error,
                }),
                ProbeOutcome::Cancelled => {}
            }
        });
        let probe = match probe {
            Ok(probe) => probe,
            Err(e) => {
                process.stop();
                return Err(e);
            }
        };

        tracing::info!(session_id = %ctx.id().short(), url = %url, "terminal bridge started");

        let mut attachment = Attachment::new(Arc::clone(&process))
            .with_port(lease)
            .with_probe(probe);
        if let Some(log) = log {
            attachment = attachment.with_output(log);
        }
        ctx.attach(attachment);

        let exit_ctx = ctx.clone();
        watcher.spawn(move |exit| exit_ctx.process_exited(exit))?;
        Ok(())
    }
}
