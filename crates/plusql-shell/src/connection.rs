//! SQL*Plus session.
//!
//! A session owns at most one shell process. Each statement is framed, piped
//! into the shell and answered by the shell's HTML output, after which the
//! shell exits. The next statement finds the process gone and spawns a fresh
//! one, so every round-trip runs in a new SQL*Plus session.

use std::time::{Duration, Instant};

use plusql_core::error::{ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind};
use plusql_core::{Error, Row};

use crate::config::ShellConfig;
use crate::encoding::Codec;
use crate::process::{Invocation, Launcher, ProcessOutput, ShellProcess, SystemLauncher};
use crate::protocol;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No process has been spawned yet
    Disconnected,
    /// Spawning a shell process
    Connecting,
    /// Ready for statements
    Ready,
    /// A round-trip is in flight
    Executing,
    /// The last round-trip lost its process; the next statement respawns
    Dead,
    /// Closed; no further statements are accepted
    Terminated,
}

/// A session driving the SQL*Plus shell.
pub struct ShellConnection<L: Launcher = SystemLauncher> {
    launcher: L,
    config: ShellConfig,
    invocation: Invocation,
    codec: Codec,
    process: Option<L::Process>,
    state: ConnectionState,
    spawn_count: u64,
}

impl<L: Launcher> std::fmt::Debug for ShellConnection<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellConnection")
            .field("state", &self.state)
            .field("binary", &self.config.binary)
            .field("connect", &self.config.redacted_connect_string())
            .field("codec", &self.codec)
            .field("pid", &self.process.as_ref().and_then(ShellProcess::id))
            .field("spawn_count", &self.spawn_count)
            .finish_non_exhaustive()
    }
}

impl<L: Launcher> std::fmt::Display for ShellConnection<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ShellConnection({} {})",
            self.config.binary.display(),
            self.config.redacted_connect_string()
        )
    }
}

impl ShellConnection<SystemLauncher> {
    /// Validate the configuration and spawn the first shell.
    #[allow(clippy::result_large_err)]
    pub fn connect(config: ShellConfig) -> Result<Self, Error> {
        Self::connect_with(SystemLauncher, config)
    }
}

impl<L: Launcher> ShellConnection<L> {
    /// Like [`ShellConnection::connect`], with a custom launcher.
    #[allow(clippy::result_large_err)]
    pub fn connect_with(launcher: L, config: ShellConfig) -> Result<Self, Error> {
        let mut conn = Self::new(launcher, config)?;
        conn.spawn()?;
        Ok(conn)
    }

    /// Create a session without spawning; the first statement spawns.
    #[allow(clippy::result_large_err)]
    pub fn new(launcher: L, config: ShellConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            launcher,
            invocation: config.invocation(),
            codec: config.codec(),
            config,
            process: None,
            state: ConnectionState::Disconnected,
            spawn_count: 0,
        })
    }

    /// Get the current session state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Is there a shell ready to take a statement right now?
    pub fn is_alive(&mut self) -> bool {
        self.process.as_mut().is_some_and(ShellProcess::is_alive)
    }

    /// How many shell processes this session has spawned.
    pub fn spawn_count(&self) -> u64 {
        self.spawn_count
    }

    /// The session configuration.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// The codec used for statements and output.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Spawn a fresh shell, terminating any previous one.
    #[allow(clippy::result_large_err)]
    fn spawn(&mut self) -> Result<(), Error> {
        if let Some(mut stale) = self.process.take() {
            // Best effort - a stale process may already be gone
            let _ = stale.terminate();
        }

        self.state = ConnectionState::Connecting;
        match self.launcher.launch(&self.invocation) {
            Ok(process) => {
                self.spawn_count += 1;
                self.process = Some(process);
                self.state = ConnectionState::Ready;
                tracing::debug!(
                    session = %self,
                    spawn_count = self.spawn_count,
                    "Shell process started"
                );
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Dead;
                Err(Error::Connection(ConnectionError {
                    kind: ConnectionErrorKind::Connect,
                    message: format!(
                        "connect failed. {} base error[{}]",
                        self.config.binary.display(),
                        e
                    ),
                    source: Some(Box::new(e)),
                }))
            }
        }
    }

    /// Execute a statement with the configured default timeout.
    #[allow(clippy::result_large_err)]
    pub fn execute(&mut self, sql: &str) -> Result<Vec<Row>, Error> {
        self.execute_timeout(sql, self.config.statement_timeout)
    }

    /// Execute a statement and return its rows.
    ///
    /// Statements that produce no table (DML, DDL) return an empty vector.
    /// A failing statement returns [`Error::Query`] carrying the native
    /// error codes found in the output, or the raw output when there are none.
    #[allow(clippy::result_large_err)]
    #[tracing::instrument(level = "debug", skip(self, sql))]
    pub fn execute_timeout(
        &mut self,
        sql: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<Row>, Error> {
        if self.state == ConnectionState::Terminated {
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Closed,
                message: "session is closed".to_string(),
                source: None,
            }));
        }

        if !self.is_alive() {
            if self.process.is_some() {
                tracing::debug!("Shell process gone; respawning");
            }
            self.spawn()?;
        }

        let batch = protocol::frame_statement(sql);
        tracing::trace!(batch = %batch, "Sending statement batch");
        let input = self.codec.encode(&batch);

        let Some(process) = self.process.as_mut() else {
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Disconnected,
                message: "no shell process".to_string(),
                source: None,
            }));
        };

        self.state = ConnectionState::Executing;
        let started = Instant::now();
        let result = process.round_trip(&input, timeout);
        let elapsed = started.elapsed();

        match result {
            Ok(output) => {
                self.state = ConnectionState::Ready;
                tracing::debug!(
                    status = ?output.status,
                    bytes = output.stdout.len() + output.stderr.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "Statement round-trip finished"
                );
                self.classify(output, sql)
            }
            Err(Error::Timeout(limit)) => {
                // The process is left alone; liveness is rechecked on the next statement.
                self.state = ConnectionState::Ready;
                tracing::debug!(timeout_ms = limit.as_millis(), "Statement timed out");
                Err(Error::Timeout(limit))
            }
            Err(e) => {
                self.state = ConnectionState::Dead;
                tracing::debug!(error = %e, "Statement round-trip failed");
                Err(e)
            }
        }
    }

    /// Execute a statement and return the first row, if any.
    #[allow(clippy::result_large_err)]
    pub fn query_one(&mut self, sql: &str) -> Result<Option<Row>, Error> {
        let rows = self.execute(sql)?;
        Ok(rows.into_iter().next())
    }

    /// Terminate the shell process. Closing twice is fine.
    #[allow(clippy::result_large_err)]
    pub fn close(&mut self) -> Result<(), Error> {
        if self.state == ConnectionState::Terminated {
            return Ok(());
        }

        let result = match self.process.take() {
            Some(mut process) => process.terminate().map_err(Error::Io),
            None => Ok(()),
        };
        self.state = ConnectionState::Terminated;
        tracing::debug!(session = %self, "Session closed");
        result
    }

    #[allow(clippy::result_large_err)]
    fn classify(&self, output: ProcessOutput, sql: &str) -> Result<Vec<Row>, Error> {
        if output.success() {
            let markup = self.codec.decode(&output.stdout);
            return Ok(protocol::parse(&markup));
        }

        let stderr = self.codec.decode(&output.stderr);
        let stdout = self.codec.decode(&output.stdout);
        let flattened = format!("{}{}", stderr.replace('\n', ""), stdout.replace('\n', ""));
        let codes = self.config.error_codes.find_codes(&flattened);

        let (kind, message) = if codes.is_empty() {
            (QueryErrorKind::Unrecognized, format!("{stderr}{stdout}"))
        } else {
            (QueryErrorKind::NativeCodes, flattened)
        };
        tracing::debug!(status = ?output.status, codes = ?codes, "Statement failed");

        Err(Error::Query(QueryError {
            kind,
            codes,
            message,
            sql: Some(sql.to_string()),
        }))
    }
}

impl<L: Launcher> Drop for ShellConnection<L> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
