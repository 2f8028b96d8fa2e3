use crate::adapter::Adapter;
use crate::buffer::{TxRegion, TxTarget, HOST_SCRATCH_SIZE, SCRATCH_SIZE, SEND_SCRATCH_SIZE};
use crate::commands::HealthCheckCommand;
use crate::config::Config;
use crate::responses::ResponseStatus;
use crate::tests::mock::{MockTimer, MockTransport};
use embedded_io::{ErrorKind, Write};

type AdapterType = Adapter<MockTransport, MockTimer, 1_000_000, 512>;

fn shared_target() -> TxTarget {
    TxTarget {
        region: TxRegion::Shared,
        capacity: 512,
    }
}

fn assert_lease_restored(mut adapter: AdapterType, expected: ResponseStatus) {
    let status = adapter.with_scratch_buffer(SEND_SCRATCH_SIZE, |adapter| {
        assert_eq!(
            TxTarget {
                region: TxRegion::Scratch,
                capacity: SEND_SCRATCH_SIZE
            },
            adapter.transmit_target()
        );
        adapter.health_check()
    });

    assert_eq!(expected, status);
    assert_eq!(shared_target(), adapter.transmit_target());
}

#[test]
fn test_lease_restored_on_success() {
    let mut transport = MockTransport::new();
    transport.add_ok_response();

    let adapter: AdapterType = Adapter::new(transport, MockTimer::frozen(), &Config::default());
    assert_lease_restored(adapter, ResponseStatus::Success);
}

#[test]
fn test_lease_restored_on_error() {
    let mut transport = MockTransport::new();
    transport.add_error_response();

    let adapter: AdapterType = Adapter::new(transport, MockTimer::frozen(), &Config::default());
    assert_lease_restored(adapter, ResponseStatus::Error);
}

#[test]
fn test_lease_restored_on_timeout() {
    let mut transport = MockTransport::new();
    transport.add_no_response();

    let adapter: AdapterType = Adapter::new(transport, MockTimer::stepping(20_000), &Config::default());
    assert_lease_restored(adapter, ResponseStatus::Timeout);
}

#[test]
fn test_lease_restored_on_early_return() {
    let mut adapter: AdapterType = Adapter::new(MockTransport::new(), MockTimer::frozen(), &Config::default());

    let result: Result<(), u8> = adapter.with_scratch_buffer(HOST_SCRATCH_SIZE, |_| {
        Err::<(), u8>(1)?;
        Ok(())
    });

    assert_eq!(Err(1), result);
    assert_eq!(shared_target(), adapter.transmit_target());
}

#[test]
fn test_nested_leases() {
    let mut adapter: AdapterType = Adapter::new(MockTransport::new(), MockTimer::frozen(), &Config::default());

    adapter.with_scratch_buffer(HOST_SCRATCH_SIZE, |outer| {
        outer.with_scratch_buffer(SEND_SCRATCH_SIZE, |inner| {
            assert_eq!(SEND_SCRATCH_SIZE, inner.transmit_target().capacity);
        });

        assert_eq!(
            TxTarget {
                region: TxRegion::Scratch,
                capacity: HOST_SCRATCH_SIZE
            },
            outer.transmit_target()
        );
    });

    assert_eq!(shared_target(), adapter.transmit_target());
}

#[test]
fn test_lease_capacity_limited_to_scratch_size() {
    let mut adapter: AdapterType = Adapter::new(MockTransport::new(), MockTimer::frozen(), &Config::default());

    let capacity = adapter.with_scratch_buffer(SCRATCH_SIZE + 100, |adapter| adapter.transmit_target().capacity);
    assert_eq!(SCRATCH_SIZE, capacity);
}

#[test]
fn test_scratch_command_keeps_shared_content() {
    let mut transport = MockTransport::new();
    transport.add_ok_response();
    let mut adapter: AdapterType = Adapter::new(transport, MockTimer::frozen(), &Config::default());

    adapter.request_body().write_all(b"payload").unwrap();
    adapter.with_scratch_buffer(SEND_SCRATCH_SIZE, |adapter| adapter.issue_command(&HealthCheckCommand));

    assert_eq!(b"payload", &adapter.tx_buffer[..7]);
    assert_eq!(7, adapter.tx_length);
    assert_eq!(vec!["AT\r\n"], adapter.transport.get_transmissions_as_strings());
}

#[test]
fn test_request_body_write() {
    let mut adapter: AdapterType = Adapter::new(MockTransport::new(), MockTimer::frozen(), &Config::default());

    let mut body = adapter.request_body();
    assert!(body.is_empty());
    assert_eq!(510, body.remaining());

    body.write_all(b"GET / HTTP/1.1\r\n").unwrap();
    write!(body, "Host: {}\r\n", "example.org").unwrap();

    assert_eq!(35, body.len());
    assert_eq!(475, body.remaining());
    assert_eq!(b"GET / HTTP/1.1\r\nHost: example.org\r\n", &adapter.tx_buffer[..35]);
}

#[test]
fn test_request_body_clears_previous_content() {
    let mut adapter: AdapterType = Adapter::new(MockTransport::new(), MockTimer::frozen(), &Config::default());

    adapter.request_body().write_all(b"first request").unwrap();
    adapter.request_body().write_all(b"second").unwrap();

    assert_eq!(6, adapter.tx_length);
    assert_eq!(b"second\0", &adapter.tx_buffer[..7]);
}

#[test]
fn test_request_body_overflow() {
    let mut adapter: AdapterType = Adapter::new(MockTransport::new(), MockTimer::frozen(), &Config::default());
    let mut body = adapter.request_body();

    body.write_all(&[b'a'; 500]).unwrap();
    assert_eq!(Ok(10), body.write(&[b'b'; 20]));
    assert_eq!(Err(ErrorKind::OutOfMemory), body.write(b"c"));
    assert_eq!(Ok(0), body.write(b""));
    assert_eq!(510, body.len());
}

#[test]
fn test_request_body_fmt_overflow() {
    let mut adapter: AdapterType = Adapter::new(MockTransport::new(), MockTimer::frozen(), &Config::default());
    let mut body = adapter.request_body();

    body.write_all(&[b'a'; 505]).unwrap();
    assert!(core::fmt::Write::write_str(&mut body, "123456").is_err());
    assert_eq!(505, body.len());
}
