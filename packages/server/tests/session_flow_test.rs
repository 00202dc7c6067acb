//! End-to-end tests of admission, routing and notification over WebSocket.

mod common;

use std::time::Duration;

use common::{TestClient, TestServer, join_active};
use luconnect_server::{
    config::ServerConfig,
    domain::MessageStore,
    infrastructure::dto::websocket::{ClientFrame, ServerFrame},
};

fn is_message(frame: &ServerFrame) -> bool {
    matches!(frame, ServerFrame::Message { .. })
}

#[tokio::test]
async fn test_fourth_client_waits_and_is_admitted_after_exit() {
    // テスト項目: 3 人が Active、4 人目は位置 1 で待機し、1 人目の /exit で Active になる
    // given (前提条件):
    let server = TestServer::start().await;
    let url = server.ws_url();
    let mut alice = join_active(&url, "alice").await;
    let _bob = join_active(&url, "bob").await;
    let _charlie = join_active(&url, "charlie").await;

    // when (操作):
    let mut dave = TestClient::register(&url, "dave").await;

    // then (期待する結果):
    assert_eq!(
        dave.recv().await,
        ServerFrame::QueuePosition {
            position: 1,
            estimated_wait_secs: 120,
        }
    );

    // when (操作): alice が /exit
    alice.send_line("/exit").await;

    // then (期待する結果): dave が Active になり、キューは空
    assert_eq!(
        dave.recv_until(|f| matches!(f, ServerFrame::Admitted { .. }))
            .await,
        ServerFrame::Admitted {
            username: "dave".to_string(),
        }
    );
    assert!(alice.is_closed().await);
    server.shutdown().await;
}

#[tokio::test]
async fn test_message_is_delivered_to_other_active_clients_with_notify() {
    // テスト項目: A の "hi" が B と C に message + notify で届き、A には ack が返り、ストアに残る
    // given (前提条件):
    let server = TestServer::start().await;
    let url = server.ws_url();
    let mut a = join_active(&url, "A").await;
    let mut b = join_active(&url, "B").await;
    let mut c = join_active(&url, "C").await;

    // when (操作):
    a.send_line("hi").await;

    // then (期待する結果):
    let ack = a.recv_until(|f| matches!(f, ServerFrame::Ack { .. })).await;
    let ServerFrame::Ack {
        sent_at,
        delivered_to,
    } = ack
    else {
        unreachable!()
    };
    assert_eq!(delivered_to, 2);

    for client in [&mut b, &mut c] {
        let frame = client.recv_until(is_message).await;
        let ServerFrame::Message {
            from,
            body,
            sent_at: message_sent_at,
            delivered_at,
            audible,
        } = frame
        else {
            unreachable!()
        };
        assert_eq!(from, "A");
        assert_eq!(body, "hi");
        assert_eq!(message_sent_at, sent_at);
        assert!(delivered_at >= sent_at);
        assert!(audible);
        assert!(matches!(
            client.recv().await,
            ServerFrame::Notify { ref from, .. } if from == "A"
        ));
    }

    let history = server.store.query_history(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from.as_str(), "A");
    assert_eq!(history[0].body.as_str(), "hi");
    assert_eq!(history[0].sent_at.value(), sent_at);
    server.shutdown().await;
}

#[tokio::test]
async fn test_muted_client_receives_message_without_notify() {
    // テスト項目: /mute したクライアントには notify が届かず、/unmute で元に戻る
    // given (前提条件):
    let server = TestServer::start().await;
    let url = server.ws_url();
    let mut a = join_active(&url, "alice").await;
    let mut b = join_active(&url, "bob").await;
    b.send_line("/MUTE").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // when (操作):
    a.send_line("quiet please").await;

    // then (期待する結果):
    let frame = b.recv_until(is_message).await;
    assert!(matches!(frame, ServerFrame::Message { audible: false, .. }));
    assert!(b.try_recv(Duration::from_millis(300)).await.is_none());

    // when (操作): /unmute 後に再送
    b.send_line("/unmute").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    a.send_line("hello again").await;

    // then (期待する結果):
    let frame = b.recv_until(is_message).await;
    assert!(matches!(frame, ServerFrame::Message { audible: true, .. }));
    assert!(matches!(b.recv().await, ServerFrame::Notify { .. }));
    server.shutdown().await;
}

#[tokio::test]
async fn test_waiting_client_cannot_send() {
    // テスト項目: 待機中のクライアントの送信は not-active エラーになる
    // given (前提条件):
    let server = TestServer::start_with(ServerConfig {
        capacity: 1,
        ..ServerConfig::default()
    })
    .await;
    let url = server.ws_url();
    let _alice = join_active(&url, "alice").await;
    let mut bob = TestClient::register(&url, "bob").await;
    assert!(matches!(
        bob.recv().await,
        ServerFrame::QueuePosition { position: 1, .. }
    ));

    // when (操作):
    bob.send_line("let me in").await;

    // then (期待する結果):
    assert_eq!(
        bob.recv().await,
        ServerFrame::Error {
            code: "not-active".to_string(),
            message: "you are still waiting in the queue".to_string(),
        }
    );
    server.shutdown().await;
}

#[tokio::test]
async fn test_queue_positions_decrease_after_departure() {
    // テスト項目: Active が抜けると待機者の位置が 1 ずつ繰り上がる
    // given (前提条件):
    let server = TestServer::start_with(ServerConfig {
        capacity: 1,
        ..ServerConfig::default()
    })
    .await;
    let url = server.ws_url();
    let mut alice = join_active(&url, "alice").await;
    let mut bob = TestClient::register(&url, "bob").await;
    let mut charlie = TestClient::register(&url, "charlie").await;
    assert!(matches!(
        bob.recv().await,
        ServerFrame::QueuePosition { position: 1, .. }
    ));
    assert!(matches!(
        charlie.recv().await,
        ServerFrame::QueuePosition { position: 2, .. }
    ));

    // when (操作): alice が JSON ではない生のテキストで /exit を送る
    alice.send_raw("/exit").await;

    // then (期待する結果):
    assert!(matches!(bob.recv().await, ServerFrame::Admitted { .. }));
    assert_eq!(
        charlie.recv().await,
        ServerFrame::QueuePosition {
            position: 1,
            estimated_wait_secs: 120,
        }
    );
    server.shutdown().await;
}

#[tokio::test]
async fn test_auth_attempts_are_bounded() {
    // テスト項目: 認証の失敗が上限に達すると接続が閉じられる
    // given (前提条件):
    let server = TestServer::start_with(ServerConfig {
        max_auth_attempts: 2,
        ..ServerConfig::default()
    })
    .await;
    let mut client = TestClient::connect(&server.ws_url()).await;
    let login = ClientFrame::Login {
        username: "ghost".to_string(),
        password: "nope".to_string(),
    };

    // when (操作):
    client.send(&login).await;
    let first = client.recv().await;
    client.send(&login).await;
    let second = client.recv().await;

    // then (期待する結果):
    assert_eq!(
        first,
        ServerFrame::AuthFailed {
            reason: "invalid-credentials".to_string(),
            remaining_attempts: 1,
        }
    );
    assert_eq!(
        second,
        ServerFrame::AuthFailed {
            reason: "invalid-credentials".to_string(),
            remaining_attempts: 0,
        }
    );
    assert!(matches!(
        client.recv().await,
        ServerFrame::Error { ref code, .. } if code == "auth-exhausted"
    ));
    assert!(client.is_closed().await);
    server.shutdown().await;
}

#[tokio::test]
async fn test_auth_phase_times_out() {
    // テスト項目: 認証しないまま放置すると auth-timeout で閉じられる
    // given (前提条件):
    let server = TestServer::start_with(ServerConfig {
        auth_timeout: Duration::from_millis(200),
        ..ServerConfig::default()
    })
    .await;

    // when (操作):
    let mut client = TestClient::connect(&server.ws_url()).await;

    // then (期待する結果):
    assert!(matches!(
        client.recv().await,
        ServerFrame::Error { ref code, .. } if code == "auth-timeout"
    ));
    assert!(client.is_closed().await);
    server.shutdown().await;
}

#[tokio::test]
async fn test_second_login_of_live_user_is_refused() {
    // テスト項目: 生存中のユーザー名で再ログインすると already-connected で失敗する
    // given (前提条件):
    let server = TestServer::start().await;
    let url = server.ws_url();
    let _alice = join_active(&url, "alice").await;
    let mut intruder = TestClient::connect(&url).await;

    // when (操作):
    intruder
        .send(&ClientFrame::Login {
            username: "alice".to_string(),
            password: "password".to_string(),
        })
        .await;

    // then (期待する結果):
    assert_eq!(
        intruder.recv().await,
        ServerFrame::AuthFailed {
            reason: "already-connected".to_string(),
            remaining_attempts: 2,
        }
    );
    server.shutdown().await;
}

#[tokio::test]
async fn test_history_is_replayed_on_admission() {
    // テスト項目: Active になったクライアントに直近の履歴が届く
    // given (前提条件):
    let server = TestServer::start().await;
    let url = server.ws_url();
    let mut alice = join_active(&url, "alice").await;
    let mut bob = join_active(&url, "bob").await;
    alice.send_line("before you came").await;
    bob.recv_until(is_message).await;

    // when (操作):
    let mut charlie = join_active(&url, "charlie").await;

    // then (期待する結果):
    let frame = charlie.recv().await;
    let ServerFrame::History { messages } = frame else {
        panic!("expected history, got {frame:?}");
    };
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].from, "alice");
    assert_eq!(messages[0].body, "before you came");
    server.shutdown().await;
}

#[tokio::test]
async fn test_join_and_leave_are_announced() {
    // テスト項目: 参加と退出が他の Active クライアントに通知される
    // given (前提条件):
    let server = TestServer::start().await;
    let url = server.ws_url();
    let mut alice = join_active(&url, "alice").await;

    // when (操作):
    let mut bob = join_active(&url, "bob").await;
    bob.send_line("/exit").await;

    // then (期待する結果):
    assert!(matches!(
        alice.recv().await,
        ServerFrame::ParticipantJoined { ref username, .. } if username == "bob"
    ));
    assert!(matches!(
        alice.recv().await,
        ServerFrame::ParticipantLeft { ref username, .. } if username == "bob"
    ));
    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_notifies_every_session() {
    // テスト項目: サーバー停止で Active・待機中の全クライアントに server-shutdown だけが届き、
    //            待機中のクライアントが停止の途中で昇格することはない
    for _ in 0..3 {
        // given (前提条件):
        let server = TestServer::start_with(ServerConfig {
            capacity: 1,
            ..ServerConfig::default()
        })
        .await;
        let url = server.ws_url();
        let mut alice = join_active(&url, "alice").await;
        let mut bob = TestClient::register(&url, "bob").await;
        assert!(matches!(
            bob.recv().await,
            ServerFrame::QueuePosition { position: 1, .. }
        ));

        // when (操作):
        server.shutdown().await;

        // then (期待する結果):
        for client in [&mut alice, &mut bob] {
            let frames = client.drain(Duration::from_millis(500)).await;
            assert_eq!(frames, vec![ServerFrame::ServerShutdown]);
        }
    }
}

#[tokio::test]
async fn test_waiting_client_dropping_socket_leaves_queue() {
    // テスト項目: 待機中のクライアントの接続が切れるとキューから外れ、後ろの待機者が繰り上がる
    // given (前提条件):
    let server = TestServer::start_with(ServerConfig {
        capacity: 1,
        ..ServerConfig::default()
    })
    .await;
    let url = server.ws_url();
    let alice = join_active(&url, "alice").await;
    let mut bob = TestClient::register(&url, "bob").await;
    let mut carol = TestClient::register(&url, "carol").await;
    bob.recv().await;
    assert!(matches!(
        carol.recv().await,
        ServerFrame::QueuePosition { position: 2, .. }
    ));

    // when (操作): bob の接続が /exit なしで切れる
    drop(bob);

    // then (期待する結果):
    assert_eq!(
        carol.recv().await,
        ServerFrame::QueuePosition {
            position: 1,
            estimated_wait_secs: 120,
        }
    );

    // when (操作): alice の接続も切れる
    drop(alice);

    // then (期待する結果): 次に昇格するのは carol
    assert_eq!(
        carol.recv().await,
        ServerFrame::Admitted {
            username: "carol".to_string(),
        }
    );
    server.shutdown().await;
}

#[tokio::test]
async fn test_active_client_dropping_socket_is_treated_as_exit() {
    // テスト項目: Active なクライアントの接続切れは /exit と同じく退出の通知と昇格を起こす
    // given (前提条件):
    let server = TestServer::start_with(ServerConfig {
        capacity: 2,
        ..ServerConfig::default()
    })
    .await;
    let url = server.ws_url();
    let alice = join_active(&url, "alice").await;
    let mut carol = join_active(&url, "carol").await;
    let mut bob = TestClient::register(&url, "bob").await;
    bob.recv().await;

    // when (操作): alice の接続が /exit なしで切れる
    drop(alice);

    // then (期待する結果):
    assert!(matches!(
        carol.recv().await,
        ServerFrame::ParticipantLeft { ref username, .. } if username == "alice"
    ));
    assert_eq!(
        bob.recv().await,
        ServerFrame::Admitted {
            username: "bob".to_string(),
        }
    );
    server.shutdown().await;
}
