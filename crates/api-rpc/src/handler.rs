//! RPC Method Handlers
//!
//! Translates JSON-RPC params into queue engine calls.

use crate::error::to_rpc_error;
use crate::types::{
    CreateQueueResponse, DeleteQueueResponse, ListQueuesResponse, MessageItem, QueueInfo,
    QueueInfoResponse, QueueRequest, ReceiveMessagesResponse, SendMessageRequest,
    SendMessageResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use kvqueue_core::application::QueueEngine;
use kvqueue_core::error::AppError;
use std::sync::Arc;
use tracing::debug;

const STATUS_OK: &str = "ok";
const STATUS_ERROR: &str = "error";

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    engine: Arc<QueueEngine>,
}

impl RpcHandler {
    pub fn new(engine: Arc<QueueEngine>) -> Self {
        Self { engine }
    }

    /// queue.list.v1
    pub async fn list_queues(&self) -> Result<ListQueuesResponse, ErrorObjectOwned> {
        let queues = self
            .engine
            .list()
            .await
            .into_iter()
            .map(|(name, meta)| (name, QueueInfo::from(meta)))
            .collect();

        Ok(ListQueuesResponse { queues })
    }

    /// queue.create.v1
    pub async fn create_queue(
        &self,
        params: QueueRequest,
    ) -> Result<CreateQueueResponse, ErrorObjectOwned> {
        self.engine
            .create(&params.queue)
            .await
            .map_err(to_rpc_error)?;

        Ok(CreateQueueResponse {
            queue: params.queue,
            created: true,
        })
    }

    /// queue.delete.v1
    pub async fn delete_queue(
        &self,
        params: QueueRequest,
    ) -> Result<DeleteQueueResponse, ErrorObjectOwned> {
        self.engine
            .delete(&params.queue)
            .await
            .map_err(to_rpc_error)?;

        Ok(DeleteQueueResponse {
            queue: params.queue,
            deleted: true,
        })
    }

    /// queue.info.v1
    pub async fn queue_info(
        &self,
        params: QueueRequest,
    ) -> Result<QueueInfoResponse, ErrorObjectOwned> {
        let meta = self
            .engine
            .info(&params.queue)
            .await
            .map_err(to_rpc_error)?;

        Ok(QueueInfoResponse {
            queue: params.queue,
            info: meta.into(),
        })
    }

    /// message.send.v1
    pub async fn send_message(
        &self,
        params: SendMessageRequest,
    ) -> Result<SendMessageResponse, ErrorObjectOwned> {
        let message_id = self
            .engine
            .send(&params.queue, &params.message)
            .await
            .map_err(to_rpc_error)?;

        Ok(SendMessageResponse {
            queue: params.queue,
            message_id,
        })
    }

    /// message.receive.v1
    pub async fn receive_messages(
        &self,
        params: QueueRequest,
    ) -> Result<ReceiveMessagesResponse, ErrorObjectOwned> {
        match self.engine.receive(&params.queue).await {
            Ok(batch) => Ok(ReceiveMessagesResponse {
                queue: params.queue,
                status: STATUS_OK.to_string(),
                message: None,
                messages: batch.into_iter().map(MessageItem::from).collect(),
            }),
            Err(AppError::NotFound(_)) => {
                debug!(queue = %params.queue, "receive on unknown queue");
                Ok(ReceiveMessagesResponse {
                    queue: params.queue,
                    status: STATUS_ERROR.to_string(),
                    message: Some("queue does not exist".to_string()),
                    messages: Vec::new(),
                })
            }
            Err(e) => Err(to_rpc_error(e)),
        }
    }
}
