use crate::adapter::{Adapter, ConnectionMode};
use crate::config::Config;
use crate::responses::ResponseStatus;
use crate::stack::{CloseTarget, Error, LinkId, Protocol, SocketState};
use crate::tests::mock::{MockTimer, MockTransport};
use crate::{TxRegion, TxTarget};
use embedded_io::Write;

type AdapterType = Adapter<MockTransport, MockTimer, 1_000_000, 512>;

fn adapter(transport: MockTransport) -> AdapterType {
    Adapter::new(transport, MockTimer::frozen(), &Config::default())
}

/// Adapter in multiple connections mode
fn multi_adapter(mut transport: MockTransport) -> AdapterType {
    let mut responses = MockTransport::new();
    responses.add_ok_response();

    let mut adapter = adapter(responses);
    assert_eq!(ResponseStatus::Success, adapter.set_connection_mode(ConnectionMode::Multiple));

    core::mem::swap(&mut adapter.transport, &mut transport);
    adapter
}

fn link(id: u8) -> LinkId {
    LinkId::new(id).unwrap()
}

fn shared_target() -> TxTarget {
    TxTarget {
        region: TxRegion::Shared,
        capacity: 512,
    }
}

#[test]
fn test_link_id_range() {
    assert_eq!(Some(4), LinkId::new(4).map(|link| link.id()));
    assert_eq!(None, LinkId::new(5));
}

#[test]
fn test_connect_tcp() {
    let mut transport = MockTransport::new();
    transport.add_response(b"CONNECT\r\n\r\nOK\r\n");
    let mut adapter = adapter(transport);

    assert_eq!(Ok(ResponseStatus::Success), adapter.connect(Protocol::Tcp, "10.0.0.1", 80));
    assert_eq!(SocketState::Open, adapter.socket_state(link(0)));
    assert_eq!(shared_target(), adapter.transmit_target());
    assert_eq!(
        vec!["AT+CIPSTART=\"TCP\",\"10.0.0.1\",80\r\n"],
        adapter.transport.get_transmissions_as_strings()
    );
}

#[test]
fn test_connect_udp() {
    let mut transport = MockTransport::new();
    transport.add_response(b"CONNECT\r\n\r\nOK\r\n");
    let mut adapter = adapter(transport);

    assert_eq!(Ok(ResponseStatus::Success), adapter.connect(Protocol::Udp, "example.org", 5683));
    assert_eq!(
        vec!["AT+CIPSTART=\"UDP\",\"example.org\",5683\r\n"],
        adapter.transport.get_transmissions_as_strings()
    );
}

#[test]
fn test_connect_already_connected() {
    let mut transport = MockTransport::new();
    transport.add_response(b"ALREADY CONNECTED\r\n\r\nERROR\r\n");
    let mut adapter = adapter(transport);

    assert_eq!(Ok(ResponseStatus::Success), adapter.connect(Protocol::Tcp, "10.0.0.1", 80));
    assert_eq!(SocketState::Open, adapter.socket_state(link(0)));
}

#[test]
fn test_connect_error() {
    let mut transport = MockTransport::new();
    transport.add_response(b"DNS Fail\r\n\r\nERROR\r\n");
    let mut adapter = adapter(transport);

    assert_eq!(Ok(ResponseStatus::Error), adapter.connect(Protocol::Tcp, "unknown.host", 80));
    assert_eq!(SocketState::Closed, adapter.socket_state(link(0)));
    assert_eq!(shared_target(), adapter.transmit_target());
}

#[test]
fn test_connect_timeout_restores_target() {
    let mut transport = MockTransport::new();
    transport.add_no_response();
    let mut adapter: AdapterType = Adapter::new(transport, MockTimer::stepping(20_000), &Config::default());

    assert_eq!(Ok(ResponseStatus::Timeout), adapter.connect(Protocol::Tcp, "10.0.0.1", 80));
    assert_eq!(SocketState::Closed, adapter.socket_state(link(0)));
    assert_eq!(shared_target(), adapter.transmit_target());
}

#[test]
fn test_connect_host_too_long() {
    let mut adapter = adapter(MockTransport::new());

    let host = "a".repeat(129);
    assert_eq!(Err(Error::HostTooLong), adapter.connect(Protocol::Tcp, &host, 80));
    assert_eq!(SocketState::Closed, adapter.socket_state(link(0)));
    assert_eq!(0, adapter.transport.transmission_count());
}

#[test]
fn test_connect_by_id() {
    let mut transport = MockTransport::new();
    transport.add_response(b"3,CONNECT\r\n\r\nOK\r\n");
    let mut adapter = multi_adapter(transport);

    assert_eq!(
        Ok(ResponseStatus::Success),
        adapter.connect_by_id(link(3), Protocol::Tcp, "10.0.0.1", 21)
    );
    assert_eq!(SocketState::Open, adapter.socket_state(link(3)));
    assert_eq!(SocketState::Closed, adapter.socket_state(link(0)));
    assert_eq!(3, adapter.session().request().link_id);
    assert_eq!(
        vec!["AT+CIPSTART=3,\"TCP\",\"10.0.0.1\",21\r\n"],
        adapter.transport.get_transmissions_as_strings()
    );
}

#[test]
fn test_check_connection() {
    let mut transport = MockTransport::new();
    transport.add_chunked_response(&[b"ALREADY CONNECTED\r\n", b"\r\nERROR\r\n"]);
    let mut adapter = adapter(transport);

    adapter.issue_command(&crate::commands::HealthCheckCommand);
    assert_eq!(ResponseStatus::Waiting, adapter.check_connection());
    assert_eq!(ResponseStatus::Success, adapter.check_connection());
}

#[test]
fn test_check_connection_error() {
    let mut transport = MockTransport::new();
    transport.add_error_response();
    let mut adapter = adapter(transport);

    adapter.issue_command(&crate::commands::HealthCheckCommand);
    assert_eq!(ResponseStatus::Error, adapter.check_connection());
}

#[test]
fn test_close() {
    let mut transport = MockTransport::new();
    transport.add_response(b"CONNECT\r\n\r\nOK\r\n");
    transport.add_response(b"CLOSED\r\n\r\nOK\r\n");
    let mut adapter = adapter(transport);

    adapter.connect(Protocol::Tcp, "10.0.0.1", 80).unwrap();
    assert_eq!(ResponseStatus::Success, adapter.close());
    assert_eq!(SocketState::Closed, adapter.socket_state(link(0)));
    assert_eq!("AT+CIPCLOSE\r\n", adapter.transport.get_transmissions_as_strings()[1]);
}

#[test]
fn test_close_wrong_mode() {
    let mut adapter = multi_adapter(MockTransport::new());

    assert_eq!(ResponseStatus::Error, adapter.close());
    assert_eq!(0, adapter.transport.transmission_count());
}

#[test]
fn test_close_by_id_wrong_mode() {
    let mut adapter = adapter(MockTransport::new());

    assert_eq!(ResponseStatus::Error, adapter.close_by_id(CloseTarget::Link(link(1))));
    assert_eq!(0, adapter.transport.transmission_count());
}

#[test]
fn test_close_by_id() {
    let mut transport = MockTransport::new();
    transport.add_response(b"1,CONNECT\r\n\r\nOK\r\n");
    transport.add_response(b"1,CLOSED\r\n\r\nOK\r\n");
    let mut adapter = multi_adapter(transport);

    adapter.connect_by_id(link(1), Protocol::Tcp, "10.0.0.1", 80).unwrap();
    assert_eq!(ResponseStatus::Success, adapter.close_by_id(CloseTarget::Link(link(1))));
    assert_eq!(SocketState::Closed, adapter.socket_state(link(1)));
    assert_eq!("AT+CIPCLOSE=1\r\n", adapter.transport.get_transmissions_as_strings()[1]);
}

#[test]
fn test_close_all() {
    let mut transport = MockTransport::new();
    transport.add_response(b"0,CONNECT\r\n\r\nOK\r\n");
    transport.add_response(b"4,CONNECT\r\n\r\nOK\r\n");
    transport.add_response(b"0,CLOSED\r\n4,CLOSED\r\n\r\nOK\r\n");
    let mut adapter = multi_adapter(transport);

    adapter.connect_by_id(link(0), Protocol::Tcp, "10.0.0.1", 80).unwrap();
    adapter.connect_by_id(link(4), Protocol::Udp, "10.0.0.2", 53).unwrap();
    assert_eq!(SocketState::Open, adapter.socket_state(link(4)));

    assert_eq!(ResponseStatus::Success, adapter.close_by_id(CloseTarget::All));
    assert_eq!(SocketState::Closed, adapter.socket_state(link(0)));
    assert_eq!(SocketState::Closed, adapter.socket_state(link(4)));
    assert_eq!("AT+CIPCLOSE=5\r\n", adapter.transport.get_transmissions_as_strings()[2]);
}

#[test]
fn test_send() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nOK\r\n> ");
    transport.add_response(b"\r\nRecv 7 bytes\r\n\r\nSEND OK\r\n\r\n+IPD,2:ok\r\n");
    let mut adapter = adapter(transport);

    assert_eq!(Ok(ResponseStatus::Waiting), adapter.send(b"hello"));
    assert!(adapter.session().response().server_response_awaited);
    assert_eq!(ResponseStatus::Success, adapter.wait());

    assert_eq!(
        vec!["AT+CIPSEND=7\r\n", "hello\r\n"],
        adapter.transport.get_transmissions_as_strings()
    );
}

#[test]
fn test_send_prompt_error() {
    let mut transport = MockTransport::new();
    transport.add_response(b"link is not valid\r\n\r\nERROR\r\n");
    let mut adapter = adapter(transport);

    assert_eq!(Ok(ResponseStatus::Error), adapter.send(b"hello"));
    assert_eq!(1, adapter.transport.transmission_count());
    assert!(!adapter.session().response().server_response_awaited);
}

#[test]
fn test_send_payload_too_long() {
    let mut adapter = adapter(MockTransport::new());

    assert_eq!(Err(Error::PayloadTooLong), adapter.send(&[b'a'; 511]));
    assert_eq!(0, adapter.transport.transmission_count());
}

#[test]
fn test_send_server_response_never_error() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nOK\r\n> ");
    transport.add_chunked_response(&[b"\r\nERROR\r\n", b"CLOSED\r\n"]);
    let mut adapter = adapter(transport);

    adapter.send(b"hello").unwrap();
    assert_eq!(ResponseStatus::Waiting, adapter.poll());
    assert_eq!(ResponseStatus::Success, adapter.poll());
}

#[test]
fn test_send_by_id() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nOK\r\n> ");
    let mut adapter = multi_adapter(transport);

    assert_eq!(Ok(ResponseStatus::Waiting), adapter.send_by_id(link(2), b"ping"));
    assert_eq!(2, adapter.session().request().link_id);
    assert_eq!(
        vec!["AT+CIPSEND=2,6\r\n", "ping\r\n"],
        adapter.transport.get_transmissions_as_strings()
    );
}

#[test]
fn test_send_request_body() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nOK\r\n> ");
    transport.add_response(b"+IPD,5:hello\r\nCLOSED\r\n");
    let mut adapter = adapter(transport);

    adapter.request_body().write_all(b"GET / HTTP/1.1\r\n").unwrap();
    assert_eq!(Ok(ResponseStatus::Waiting), adapter.send_request_body());
    assert_eq!(shared_target(), adapter.transmit_target());
    assert_eq!(ResponseStatus::Success, adapter.wait());

    assert_eq!(
        vec!["AT+CIPSEND=18\r\n", "GET / HTTP/1.1\r\n\r\n"],
        adapter.transport.get_transmissions_as_strings()
    );
}

#[test]
fn test_send_request_body_explicit_length() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nOK\r\n> ");
    transport.add_no_response();
    transport.add_response(b"\r\nOK\r\n> ");
    let mut adapter = adapter(transport);

    adapter.request_body().write_all(b"0123456789").unwrap();
    adapter.set_request_length(4);

    assert_eq!(Ok(ResponseStatus::Waiting), adapter.send_request_body());
    assert_eq!(0, adapter.session().request().data_length);

    // Length got reset, so the content length is used again
    adapter.request_body().write_all(b"abcdef").unwrap();
    assert_eq!(Ok(ResponseStatus::Waiting), adapter.send_request_body());

    assert_eq!(
        vec!["AT+CIPSEND=6\r\n", "0123\r\n", "AT+CIPSEND=8\r\n", "abcdef\r\n"],
        adapter.transport.get_transmissions_as_strings()
    );
}

#[test]
fn test_send_request_body_length_reset_on_error() {
    let mut transport = MockTransport::new();
    transport.add_error_response();
    let mut adapter = adapter(transport);

    adapter.request_body().write_all(b"data").unwrap();
    adapter.set_request_length(3);

    assert_eq!(Ok(ResponseStatus::Error), adapter.send_request_body());
    assert_eq!(0, adapter.session().request().data_length);
    assert_eq!(shared_target(), adapter.transmit_target());
    assert_eq!(1, adapter.transport.transmission_count());
}

#[test]
fn test_send_request_body_length_reset_on_timeout() {
    let mut transport = MockTransport::new();
    transport.add_no_response();
    let mut adapter: AdapterType = Adapter::new(transport, MockTimer::stepping(20_000), &Config::default());

    adapter.request_body().write_all(b"data").unwrap();
    adapter.set_request_length(3);

    assert_eq!(Ok(ResponseStatus::Timeout), adapter.send_request_body());
    assert_eq!(0, adapter.session().request().data_length);
    assert_eq!(shared_target(), adapter.transmit_target());
}

#[test]
fn test_send_request_body_too_long() {
    let mut adapter = adapter(MockTransport::new());

    adapter.set_request_length(511);
    assert_eq!(Err(Error::PayloadTooLong), adapter.send_request_body());
    assert_eq!(0, adapter.session().request().data_length);
    assert_eq!(0, adapter.transport.transmission_count());
}

#[test]
fn test_send_request_body_by_id() {
    let mut transport = MockTransport::new();
    transport.add_response(b"\r\nOK\r\n> ");
    let mut adapter = multi_adapter(transport);

    adapter.request_body().write_all(b"hello").unwrap();
    assert_eq!(Ok(ResponseStatus::Waiting), adapter.send_request_body_by_id(link(1)));

    assert_eq!(
        vec!["AT+CIPSEND=1,7\r\n", "hello\r\n"],
        adapter.transport.get_transmissions_as_strings()
    );
}

#[test]
fn test_remote_close_marks_socket_closed() {
    let mut transport = MockTransport::new();
    transport.add_response(b"CONNECT\r\n\r\nOK\r\n");
    transport.add_response(b"\r\nOK\r\n> ");
    transport.add_response(b"\r\nSEND OK\r\n\r\n+IPD,5:hello\r\nCLOSED\r\n");
    let mut adapter = adapter(transport);

    adapter.connect(Protocol::Tcp, "10.0.0.1", 80).unwrap();
    adapter.send(b"hello").unwrap();
    assert_eq!(ResponseStatus::Success, adapter.wait());

    assert_eq!(SocketState::Closed, adapter.socket_state(link(0)));
}

#[test]
fn test_server_data_keeps_socket_open() {
    let mut transport = MockTransport::new();
    transport.add_response(b"CONNECT\r\n\r\nOK\r\n");
    transport.add_response(b"\r\nOK\r\n> ");
    transport.add_response(b"\r\nSEND OK\r\n\r\n+IPD,5:hello\r\n");
    let mut adapter = adapter(transport);

    adapter.connect(Protocol::Tcp, "10.0.0.1", 80).unwrap();
    adapter.send(b"hello").unwrap();
    assert_eq!(ResponseStatus::Success, adapter.wait());

    assert_eq!(SocketState::Open, adapter.socket_state(link(0)));
}

#[test]
fn test_remote_close_by_id() {
    let mut transport = MockTransport::new();
    transport.add_response(b"0,CONNECT\r\n\r\nOK\r\n");
    transport.add_response(b"2,CONNECT\r\n\r\nOK\r\n");
    transport.add_response(b"\r\nOK\r\n> ");
    transport.add_response(b"\r\nSEND OK\r\n2,CLOSED\r\n");
    let mut adapter = multi_adapter(transport);

    adapter.connect_by_id(link(0), Protocol::Tcp, "10.0.0.1", 80).unwrap();
    adapter.connect_by_id(link(2), Protocol::Tcp, "10.0.0.2", 80).unwrap();
    adapter.send_by_id(link(2), b"bye").unwrap();
    assert_eq!(ResponseStatus::Success, adapter.wait());

    assert_eq!(SocketState::Closed, adapter.socket_state(link(2)));
    assert_eq!(SocketState::Open, adapter.socket_state(link(0)));
}
