use crate::adapter::Adapter;
use crate::asynch::{join_async, wait_async};
use crate::commands::HealthCheckCommand;
use crate::config::Config;
use crate::responses::ResponseStatus;
use crate::tests::mock::{MockTimer, MockTransport};
use crate::wifi::JoinStatus;
use embassy_futures::block_on;

type AdapterType = Adapter<MockTransport, MockTimer, 1_000_000, 512>;

fn adapter(transport: MockTransport, timer: MockTimer) -> AdapterType {
    Adapter::new(transport, timer, &Config::default())
}

#[test]
fn test_wait_async_chunked_response() {
    let mut transport = MockTransport::new();
    transport.add_chunked_response(&[b"busy p...\r\n", b"\r\nOK\r\n"]);
    let mut adapter = adapter(transport, MockTimer::frozen());

    assert_eq!(ResponseStatus::Waiting, adapter.issue_command(&HealthCheckCommand));
    assert_eq!(ResponseStatus::Success, block_on(wait_async(&mut adapter)));
    assert_eq!(2, adapter.transport.arm_count);
}

#[test]
fn test_wait_async_timeout() {
    let mut transport = MockTransport::new();
    transport.add_no_response();
    let mut adapter = adapter(transport, MockTimer::stepping(1_000));
    adapter.set_response_timeout(5_000);

    adapter.issue_command(&HealthCheckCommand);
    assert_eq!(ResponseStatus::Timeout, block_on(wait_async(&mut adapter)));
}

#[test]
fn test_join_async_connected() {
    let mut transport = MockTransport::new();
    transport.add_chunked_response(&[b"WIFI CONNECTED\r\n", b"WIFI GOT IP\r\n\r\nOK\r\n"]);
    let mut adapter = adapter(transport, MockTimer::frozen());

    adapter.join("test_wifi", "secret").unwrap();
    assert_eq!(JoinStatus::Connected, block_on(join_async(&mut adapter)));
}

#[test]
fn test_join_async_wrong_password() {
    let mut transport = MockTransport::new();
    transport.add_chunked_response(&[b"+CWJAP:2\r\n", b"\r\nFAIL\r\n"]);
    let mut adapter = adapter(transport, MockTimer::frozen());

    adapter.join("test_wifi", "wrong").unwrap();
    assert_eq!(JoinStatus::WrongPassword, block_on(join_async(&mut adapter)));
}
