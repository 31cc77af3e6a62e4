//! Integration test for the process-wide registry.
//!
//! Kept in its own test binary: registrations are permanent for the process.

mod common;

use assert2::{check, let_assert};
use common::{Event, FakeServer, Recorder};
use ferry::middleware::Registry;
use ferry::{Client, Config, Reply};

/// Test that `register` instruments clients built afterwards only.
#[tokio::test]
async fn test_global_registration() {
    let server = FakeServer::new();
    let before = Client::builder(server.connector()).build();

    let recorder = Recorder::new();
    ferry::register(recorder.middleware());
    check!(Registry::global().names().contains(&"recorder".to_owned()));

    before.call("PING").await.expect("reply");
    check!(recorder.events().is_empty());

    let after = Client::new(server.connector(), Config::default());
    let reply = after.call("PING").await.expect("reply");

    check!(reply == Reply::from("PONG"));
    let calls = recorder.calls();
    check!(calls.len() == 1);
    let_assert!(Event::Call { attempt: Some(0), result: Ok(_), .. } = &calls[0]);
}
