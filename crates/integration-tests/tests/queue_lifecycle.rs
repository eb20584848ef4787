//! Queue lifecycle against the SQLite store

mod common;

use common::{temp_db, Node};
use kvqueue_core::application::BATCH_LIMIT;
use kvqueue_core::domain::{message_bucket, Message};
use kvqueue_core::error::AppError;
use kvqueue_core::port::BucketStore;
use std::collections::HashSet;

#[tokio::test]
async fn test_create_send_receive_scenario() {
    let (_dir, path) = temp_db();
    let node = Node::start(&path, false, false).await.unwrap();
    let engine = &node.engine;

    engine.create("q1").await.unwrap();
    let info = engine.info("q1").await.unwrap();
    assert_eq!(
        (info.message_count, info.messages_sent, info.messages_received),
        (0, 0, 0)
    );
    assert!(info.created_at > 0);

    let id = engine.send("q1", "content").await.unwrap();
    assert_eq!(engine.info("q1").await.unwrap().message_count, 1);

    let batch = engine.receive("q1").await.unwrap();
    assert_eq!(batch, vec![Message::new(id, "content")]);

    let info = engine.info("q1").await.unwrap();
    assert_eq!(info.message_count, 0);
    assert_eq!(info.messages_received, 1);

    node.stop().await;
}

#[tokio::test]
async fn test_drain_takes_ceil_n_over_ten_calls() {
    let (_dir, path) = temp_db();
    let node = Node::start(&path, false, false).await.unwrap();
    let engine = &node.engine;
    engine.create("bulk").await.unwrap();

    let total = 37;
    let mut sent = Vec::with_capacity(total);
    for i in 0..total {
        sent.push(engine.send("bulk", &format!("payload-{}", i)).await.unwrap());
    }

    let mut received = Vec::new();
    let mut calls = 0;
    loop {
        let batch = engine.receive("bulk").await.unwrap();
        if batch.is_empty() {
            break;
        }
        assert!(batch.len() <= BATCH_LIMIT);
        calls += 1;
        received.extend(batch);
    }

    assert_eq!(calls, total.div_ceil(BATCH_LIMIT));
    assert_eq!(received.len(), total);
    let ids: Vec<_> = received.iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids, sent);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), total);
    assert_eq!(received[0].data, "payload-0");

    let info = engine.info("bulk").await.unwrap();
    assert_eq!(info.message_count, 0);
    assert_eq!(info.messages_sent, total as u64);
    assert_eq!(info.messages_received, total as u64);

    node.stop().await;
}

#[tokio::test]
async fn test_duplicate_create_and_invalid_input() {
    let (_dir, path) = temp_db();
    let node = Node::start(&path, false, false).await.unwrap();
    let engine = &node.engine;

    engine.create("q1").await.unwrap();
    engine.send("q1", "keep").await.unwrap();

    assert!(matches!(
        engine.create("q1").await,
        Err(AppError::AlreadyExists(_))
    ));
    assert_eq!(engine.info("q1").await.unwrap().messages_sent, 1);

    assert!(matches!(
        engine.create("").await,
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        engine.send("q1", "").await,
        Err(AppError::InvalidArgument(_))
    ));

    node.stop().await;
}

#[tokio::test]
async fn test_delete_removes_queue_and_its_bucket() {
    let (_dir, path) = temp_db();
    let node = Node::start(&path, false, false).await.unwrap();
    let engine = &node.engine;

    engine.create("gone").await.unwrap();
    engine.send("gone", "a").await.unwrap();
    engine.create("stays").await.unwrap();

    engine.delete("gone").await.unwrap();

    let names: Vec<_> = engine.list().await.into_keys().collect();
    assert_eq!(names, vec!["stays".to_string()]);
    assert!(matches!(engine.info("gone").await, Err(AppError::NotFound(_))));
    assert!(matches!(
        engine.send("gone", "a").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        engine.receive("gone").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(engine.delete("gone").await, Err(AppError::NotFound(_))));

    let mut tx = node.store.begin().await.unwrap();
    assert!(!tx.bucket_exists(&message_bucket("gone")).await.unwrap());
    tx.rollback().await.unwrap();

    // A recreated queue starts from scratch
    engine.create("gone").await.unwrap();
    assert!(engine.receive("gone").await.unwrap().is_empty());
    assert_eq!(engine.info("gone").await.unwrap().messages_sent, 0);

    node.stop().await;
}

#[tokio::test]
async fn test_list_is_sorted_by_name() {
    let (_dir, path) = temp_db();
    let node = Node::start(&path, false, false).await.unwrap();

    for name in ["zeta", "alpha", "mid"] {
        node.engine.create(name).await.unwrap();
    }

    let names: Vec<_> = node.engine.list().await.into_keys().collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);

    node.stop().await;
}
