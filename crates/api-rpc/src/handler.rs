//! RPC Method Handlers

use crate::error::to_rpc_error;
use crate::types::{
    CreateBatchTaskRequest, CreateBatchTaskResponse, GetBatchTaskRequest, GetBatchTaskResponse,
};
use healthcheck_core::application::{BatchTaskRequest, BatchTaskService};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    service: Arc<BatchTaskService>,
}

impl RpcHandler {
    pub fn new(service: Arc<BatchTaskService>) -> Self {
        Self { service }
    }

    /// batch.two_phase.v1
    pub async fn two_phase(
        &self,
        params: CreateBatchTaskRequest,
    ) -> Result<CreateBatchTaskResponse, ErrorObjectOwned> {
        let outcome = self
            .service
            .create_with_two_phase_commit(into_request(params))
            .await
            .map_err(to_rpc_error)?;
        Ok(outcome.into())
    }

    /// batch.tcc.v1
    pub async fn tcc(
        &self,
        params: CreateBatchTaskRequest,
    ) -> Result<CreateBatchTaskResponse, ErrorObjectOwned> {
        let outcome = self
            .service
            .create_with_tcc(into_request(params))
            .await
            .map_err(to_rpc_error)?;
        Ok(outcome.into())
    }

    /// batch.saga.v1
    pub async fn saga(
        &self,
        params: CreateBatchTaskRequest,
    ) -> Result<CreateBatchTaskResponse, ErrorObjectOwned> {
        let outcome = self
            .service
            .create_with_saga(into_request(params))
            .await
            .map_err(to_rpc_error)?;
        Ok(outcome.into())
    }

    /// batch.get.v1
    pub async fn get(
        &self,
        params: GetBatchTaskRequest,
    ) -> Result<GetBatchTaskResponse, ErrorObjectOwned> {
        let task = self
            .service
            .find_task(&params.task_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(task.into())
    }
}

fn into_request(params: CreateBatchTaskRequest) -> BatchTaskRequest {
    BatchTaskRequest {
        task_id: params.task_id,
        service_names: params.service_names,
    }
}
