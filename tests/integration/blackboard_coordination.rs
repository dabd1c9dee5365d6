//! Blackboard coordination under concurrent access.
//!
//! Delivery guarantees (FIFO per inbox, at-most-once drain, broadcasts
//! excluding the sender) and knowledge last-writer-wins must hold when
//! many tasks hit the board at once.

use std::sync::Arc;

use serde_json::json;

use quorum::{Blackboard, Message, Recipient, WorkerId};

fn board_with_workers(n: usize) -> (Arc<Blackboard>, Vec<WorkerId>) {
    let board = Arc::new(Blackboard::new());
    let workers: Vec<WorkerId> = (0..n).map(|_| WorkerId::new()).collect();
    for id in &workers {
        board.register_worker(*id);
    }
    (board, workers)
}

#[tokio::test]
async fn test_concurrent_publishers_never_lose_messages() {
    let (board, workers) = board_with_workers(2);
    let (sender, receiver) = (workers[0], workers[1]);

    let mut handles = Vec::new();
    for i in 0..10 {
        let board = Arc::clone(&board);
        handles.push(tokio::spawn(async move {
            for j in 0..20 {
                board.publish(Message::new(
                    sender,
                    Recipient::Worker(receiver),
                    "ping",
                    json!({"task": i, "seq": j}),
                ));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(board.pending_count(&receiver), 200);
    let drained = board.drain(&receiver);
    assert_eq!(drained.len(), 200);
    assert!(drained.iter().all(|m| m.read));
}

#[tokio::test]
async fn test_drain_is_at_most_once() {
    let (board, workers) = board_with_workers(2);
    board.publish(Message::new(
        workers[0],
        Recipient::Worker(workers[1]),
        "once",
        json!({}),
    ));

    assert_eq!(board.drain(&workers[1]).len(), 1);
    // A second drain returns nothing; the message was consumed.
    assert!(board.drain(&workers[1]).is_empty());
    assert_eq!(board.pending_count(&workers[1]), 0);
}

#[tokio::test]
async fn test_broadcast_excludes_sender_and_late_joiners() {
    let (board, workers) = board_with_workers(3);
    board.publish(Message::new(
        workers[0],
        Recipient::Broadcast,
        "announce",
        json!({"v": 1}),
    ));

    assert_eq!(board.pending_count(&workers[0]), 0);
    assert_eq!(board.pending_count(&workers[1]), 1);
    assert_eq!(board.pending_count(&workers[2]), 1);

    // A worker registered after the broadcast gets no replay.
    let late = WorkerId::new();
    board.register_worker(late);
    assert_eq!(board.pending_count(&late), 0);
}

#[tokio::test]
async fn test_fifo_order_per_inbox() {
    let (board, workers) = board_with_workers(2);
    for seq in 0..50 {
        board.publish(Message::new(
            workers[0],
            Recipient::Worker(workers[1]),
            "seq",
            json!({"seq": seq}),
        ));
    }

    let drained = board.drain(&workers[1]);
    for (i, message) in drained.iter().enumerate() {
        assert_eq!(message.payload["seq"], json!(i));
    }
}

#[tokio::test]
async fn test_knowledge_last_writer_wins_accumulates_contributors() {
    let (board, workers) = board_with_workers(3);

    board.put_knowledge("market_trend", json!({"direction": "up"}), workers[0]);
    board.put_knowledge("market_trend", json!({"direction": "down"}), workers[1]);
    board.put_knowledge("market_trend", json!({"direction": "down"}), workers[1]);

    let entry = board.get_knowledge("market_trend").unwrap();
    assert_eq!(entry.value["direction"], "down");
    // Contributors accumulate across overwrites, without duplicates.
    assert_eq!(entry.contributors, vec![workers[0], workers[1]]);
}

#[tokio::test]
async fn test_concurrent_knowledge_writes_settle_on_one_value() {
    let (board, workers) = board_with_workers(4);

    let mut handles = Vec::new();
    for (i, worker) in workers.iter().copied().enumerate() {
        let board = Arc::clone(&board);
        handles.push(tokio::spawn(async move {
            for round in 0..25 {
                board.put_knowledge("shared", json!({"writer": i, "round": round}), worker);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let entry = board.get_knowledge("shared").unwrap();
    // Some writer's final round won; the entry is coherent either way.
    assert_eq!(entry.value["round"], json!(24));
    assert_eq!(entry.contributors.len(), 4);
    assert_eq!(board.metric("knowledge_writes"), 100);
}

#[tokio::test]
async fn test_market_data_shared_across_readers() {
    let (board, _) = board_with_workers(1);
    board.set_market("sentiment", json!(0.62));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let board = Arc::clone(&board);
        handles.push(tokio::spawn(async move {
            board.get_market("sentiment")
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some(json!(0.62)));
    }
}
