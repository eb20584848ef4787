//! JSON-RPC Server
//!
//! Serves the queue methods as JSON-RPC 2.0 over HTTP.

use crate::handler::RpcHandler;
use crate::types::{QueueRequest, SendMessageRequest};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use kvqueue_core::application::QueueEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9999;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 binds an ephemeral port
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
    pub fn new(config: RpcServerConfig, engine: Arc<QueueEngine>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(engine)),
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the bound address (useful with port 0) and the handle used to stop it.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;

        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_async_method("queue.list.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.list_queues().await }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.create.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: QueueRequest = params.parse()?;
                    handler.create_queue(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.delete.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: QueueRequest = params.parse()?;
                    handler.delete_queue(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.info.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: QueueRequest = params.parse()?;
                    handler.queue_info(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("message.send.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: SendMessageRequest = params.parse()?;
                    handler.send_message(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("message.receive.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: QueueRequest = params.parse()?;
                    handler.receive_messages(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handle = server.start(module);

        info!(addr = %local_addr, "JSON-RPC server listening");

        Ok((local_addr, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use crate::types::{
        CreateQueueResponse, ListQueuesResponse, QueueInfoResponse, ReceiveMessagesResponse,
        SendMessageResponse,
    };
    use jsonrpsee::core::client::{ClientT, Error as ClientError};
    use jsonrpsee::core::params::ObjectParams;
    use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
    use jsonrpsee::rpc_params;
    use kvqueue_core::application::RecoveryService;
    use kvqueue_core::port::bucket_store::mocks::InMemoryBucketStore;
    use kvqueue_core::port::{BucketStore, SystemTimeProvider, TimestampIdProvider};

    async fn start_test_server() -> (HttpClient, ServerHandle) {
        let store: Arc<dyn BucketStore> = Arc::new(InMemoryBucketStore::new());
        let (registry, _) = RecoveryService::new(store.clone(), false)
            .recover()
            .await
            .unwrap();
        let engine = Arc::new(QueueEngine::new(
            store,
            registry,
            Arc::new(TimestampIdProvider::new()),
            Arc::new(SystemTimeProvider),
        ));

        let config = RpcServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let (addr, handle) = RpcServer::new(config, engine).start().await.unwrap();
        let client = HttpClientBuilder::default()
            .build(format!("http://{}", addr))
            .unwrap();
        (client, handle)
    }

    fn queue_params(queue: &str) -> ObjectParams {
        let mut params = ObjectParams::new();
        params.insert("queue", queue).unwrap();
        params
    }

    fn send_params(queue: &str, message: &str) -> ObjectParams {
        let mut params = queue_params(queue);
        params.insert("message", message).unwrap();
        params
    }

    fn error_code(err: ClientError) -> i32 {
        match err {
            ClientError::Call(obj) => obj.code(),
            other => panic!("expected call error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_queue_lifecycle_over_rpc() {
        let (client, handle) = start_test_server().await;

        let created: CreateQueueResponse = client
            .request("queue.create.v1", queue_params("q1"))
            .await
            .unwrap();
        assert!(created.created);

        let sent: SendMessageResponse = client
            .request("message.send.v1", send_params("q1", "hello"))
            .await
            .unwrap();
        assert_eq!(sent.message_id.len(), 20);

        let info: QueueInfoResponse = client
            .request("queue.info.v1", queue_params("q1"))
            .await
            .unwrap();
        assert_eq!(info.info.message_count, 1);
        assert_eq!(info.info.messages_sent, 1);

        let batch: ReceiveMessagesResponse = client
            .request("message.receive.v1", queue_params("q1"))
            .await
            .unwrap();
        assert_eq!(batch.status, "ok");
        assert_eq!(batch.messages.len(), 1);
        assert_eq!(batch.messages[0].id, sent.message_id);
        assert_eq!(batch.messages[0].data, "hello");

        let listed: ListQueuesResponse = client.request("queue.list.v1", rpc_params![]).await.unwrap();
        let q1 = &listed.queues["q1"];
        assert_eq!(q1.message_count, 0);
        assert_eq!(q1.messages_received, 1);

        let _: serde_json::Value = client
            .request("queue.delete.v1", queue_params("q1"))
            .await
            .unwrap();
        let listed: ListQueuesResponse = client.request("queue.list.v1", rpc_params![]).await.unwrap();
        assert!(listed.queues.is_empty());

        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_receive_unknown_queue_is_empty_batch() {
        let (client, handle) = start_test_server().await;

        let batch: ReceiveMessagesResponse = client
            .request("message.receive.v1", queue_params("missing"))
            .await
            .unwrap();
        assert_eq!(batch.status, "error");
        assert_eq!(batch.message.as_deref(), Some("queue does not exist"));
        assert!(batch.messages.is_empty());

        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_error_codes_over_rpc() {
        let (client, handle) = start_test_server().await;

        let err = client
            .request::<serde_json::Value, _>("queue.info.v1", queue_params("missing"))
            .await
            .unwrap_err();
        assert_eq!(error_code(err), code::NOT_FOUND);

        let err = client
            .request::<serde_json::Value, _>("message.send.v1", send_params("missing", "x"))
            .await
            .unwrap_err();
        assert_eq!(error_code(err), code::NOT_FOUND);

        let err = client
            .request::<serde_json::Value, _>("queue.create.v1", queue_params(""))
            .await
            .unwrap_err();
        assert_eq!(error_code(err), code::INVALID_ARGUMENT);

        let _: CreateQueueResponse = client
            .request("queue.create.v1", queue_params("q1"))
            .await
            .unwrap();
        let err = client
            .request::<serde_json::Value, _>("queue.create.v1", queue_params("q1"))
            .await
            .unwrap_err();
        assert_eq!(error_code(err), code::ALREADY_EXISTS);

        let err = client
            .request::<serde_json::Value, _>("message.send.v1", send_params("q1", ""))
            .await
            .unwrap_err();
        assert_eq!(error_code(err), code::INVALID_ARGUMENT);

        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_receive_batches_of_ten() {
        let (client, handle) = start_test_server().await;

        let _: CreateQueueResponse = client
            .request("queue.create.v1", queue_params("bulk"))
            .await
            .unwrap();
        for i in 0..12 {
            let _: SendMessageResponse = client
                .request("message.send.v1", send_params("bulk", &format!("m{}", i)))
                .await
                .unwrap();
        }

        let first: ReceiveMessagesResponse = client
            .request("message.receive.v1", queue_params("bulk"))
            .await
            .unwrap();
        let second: ReceiveMessagesResponse = client
            .request("message.receive.v1", queue_params("bulk"))
            .await
            .unwrap();
        assert_eq!(first.messages.len(), 10);
        assert_eq!(second.messages.len(), 2);
        assert_eq!(first.messages[0].data, "m0");
        assert_eq!(second.messages[1].data, "m11");

        handle.stop().unwrap();
    }
}
