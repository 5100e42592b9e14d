//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use noticeboard_entrypoint::config::{DependencyConfig, EntrypointConfig};
use noticeboard_entrypoint::lifecycle::Shutdown;
use noticeboard_entrypoint::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};

/// Start a listener that accepts and immediately drops connections,
/// standing in for a dependency service.
pub async fn start_dependency() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });

    addr
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn local_dependency(name: &str, port: u16) -> DependencyConfig {
    DependencyConfig {
        name: name.into(),
        host: "127.0.0.1".into(),
        port,
    }
}

/// Default config pointed at two local dependencies.
pub fn config_for(db: SocketAddr, cache: SocketAddr) -> EntrypointConfig {
    let mut config = EntrypointConfig::default();
    config.dependencies.database = local_dependency("PostgreSQL", db.port());
    config.dependencies.cache = local_dependency("Redis", cache.port());
    config.readiness.interval_ms = 10;
    config
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run(CommandSpec),
    Exec(CommandSpec),
}

impl Invocation {
    pub fn spec(&self) -> &CommandSpec {
        match self {
            Invocation::Run(spec) | Invocation::Exec(spec) => spec,
        }
    }
}

/// Records every command instead of running it.
#[derive(Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<Invocation>>,
    /// Commands whose command line contains the key exit with the code.
    failures: Mutex<Vec<(String, i32)>>,
    server_exit_code: i32,
}

impl RecordingRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_server_exit_code(code: i32) -> Arc<Self> {
        Arc::new(Self {
            server_exit_code: code,
            ..Default::default()
        })
    }

    pub fn fail_when(&self, needle: &str, exit_code: i32) {
        self.failures
            .lock()
            .unwrap()
            .push((needle.to_string(), exit_code));
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(|i| i.spec().command_line())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        _cancel: &CancellationToken,
    ) -> Result<CommandOutput, ProcessError> {
        self.invocations
            .lock()
            .unwrap()
            .push(Invocation::Run(spec.clone()));

        let line = spec.command_line();
        let exit_code = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| line.contains(needle.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);

        Ok(CommandOutput {
            exit_code,
            stderr: if exit_code == 0 {
                String::new()
            } else {
                format!("{line} exploded")
            },
            ..Default::default()
        })
    }

    async fn exec(&self, spec: &CommandSpec, _shutdown: &Shutdown) -> Result<i32, ProcessError> {
        self.invocations
            .lock()
            .unwrap()
            .push(Invocation::Exec(spec.clone()));
        Ok(self.server_exit_code)
    }
}
