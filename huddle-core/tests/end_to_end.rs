//! End-to-end tests: a real dispatcher and real client sessions over
//! localhost TCP, exercising the full handshake, message flow, and
//! shutdown.

use std::net::SocketAddr;

use huddle_core::client::{ClientError, ClientSession};
use huddle_core::server::{Dispatcher, DispatcherHandle};
use huddle_core::Config;
use tokio::task::JoinHandle;

async fn start_server() -> (DispatcherHandle, SocketAddr, JoinHandle<()>) {
    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap();

    let dispatcher = Dispatcher::bind(config).await.expect("bind should succeed");
    let addr = dispatcher.local_addr().unwrap();
    let handle = dispatcher.handle();
    let task = tokio::spawn(async move {
        dispatcher.run().await.expect("dispatcher should run");
    });
    (handle, addr, task)
}

async fn connect(addr: SocketAddr, nickname: &str) -> ClientSession {
    let mut session =
        ClientSession::new(addr.ip().to_string(), addr.port(), "default", "default", nickname)
            .unwrap();
    session.open().await.expect("open should succeed");
    session
}

#[tokio::test]
async fn test_full_session() {
    let (handle, addr, task) = start_server().await;
    let mut session = connect(addr, "alice").await;
    assert!(session.is_open());
    assert_eq!(session.current_topic(), "default");

    session.send_message("hello huddle").await.unwrap();
    let listing = session.get_messages().await.unwrap();
    assert!(listing.contains("[alice]: hello huddle"));
    assert!(listing.starts_with("{default}"));

    // Switch topic and check the listings partition correctly.
    session.set_topic("news").await.unwrap();
    session.send_message("n1").await.unwrap();
    session.send_message("n2").await.unwrap();
    session.send_message("n3").await.unwrap();

    let news = session.get_messages().await.unwrap();
    assert_eq!(news.lines().count(), 3);
    assert!(!news.contains("hello huddle"));

    let all = session.get_all_messages().await.unwrap();
    assert_eq!(all.lines().count(), 4);

    let topics = session.get_topics().await.unwrap();
    assert_eq!(topics, "'default'\n'news'\n");

    session.close().await.unwrap();
    assert!(!session.is_open());

    handle.stop();
    task.await.unwrap();
}

#[tokio::test]
async fn test_wrong_password_fails_open() {
    let (handle, addr, task) = start_server().await;

    let mut session =
        ClientSession::new(addr.ip().to_string(), addr.port(), "default", "wrong", "mallory")
            .unwrap();
    let result = session.open().await;
    assert!(matches!(result, Err(ClientError::Establishment(_))));
    assert!(!session.is_open());

    handle.stop();
    task.await.unwrap();
}

#[tokio::test]
async fn test_unknown_group_fails_open() {
    let (handle, addr, task) = start_server().await;

    let mut session =
        ClientSession::new(addr.ip().to_string(), addr.port(), "nowhere", "default", "bob")
            .unwrap();
    assert!(matches!(
        session.open().await,
        Err(ClientError::Establishment(_))
    ));

    handle.stop();
    task.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_writers_no_lost_update() {
    let (handle, addr, task) = start_server().await;

    let writer = |nickname: &'static str, body: &'static str| {
        let addr = addr;
        tokio::spawn(async move {
            let mut session = connect(addr, nickname).await;
            session.send_message(body).await.unwrap();
            session.close().await.unwrap();
        })
    };

    let a = writer("alice", "from alice");
    let b = writer("bob", "from bob");
    a.await.unwrap();
    b.await.unwrap();

    // A third session observes both appends.
    let mut reader = connect(addr, "carol").await;
    let listing = reader.get_all_messages().await.unwrap();
    assert!(listing.contains("from alice"));
    assert!(listing.contains("from bob"));
    reader.close().await.unwrap();

    handle.stop();
    task.await.unwrap();
}
