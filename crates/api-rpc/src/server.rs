//! JSON-RPC Server
//!
//! Serves the batch task methods over TCP on localhost.

use crate::handler::RpcHandler;
use crate::types::{CreateBatchTaskRequest, GetBatchTaskRequest};
use healthcheck_core::application::BatchTaskService;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9630;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, service: Arc<BatchTaskService>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(service)),
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the handle and the bound address (port 0 picks a free port).
    pub async fn start(self) -> Result<(ServerHandle, SocketAddr), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let mut module = RpcModule::new(());

        // Register methods
        let handler = self.handler.clone();
        module
            .register_async_method("batch.two_phase.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: CreateBatchTaskRequest = params.parse()?;
                    handler.two_phase(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("batch.tcc.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: CreateBatchTaskRequest = params.parse()?;
                    handler.tcc(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("batch.saga.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: CreateBatchTaskRequest = params.parse()?;
                    handler.saga(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("batch.get.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: GetBatchTaskRequest = params.parse()?;
                    handler.get(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        info!(addr = %local_addr, "JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok((handle, local_addr))
    }
}
