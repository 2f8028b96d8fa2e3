//! Mocks for doc examples
use crate::transport::Transport;
use core::convert::Infallible;
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use heapless::Vec;

/// Transport mock responding to the commands used by the doc examples
#[derive(Default)]
pub struct ExampleTransport {
    /// Response to the last transmission
    response: Vec<u8, 256>,
}

impl ExampleTransport {
    fn respond(&mut self, response: &[u8]) {
        self.response.clear();
        let _ = self.response.extend_from_slice(response);
    }
}

impl Transport for ExampleTransport {
    type Error = Infallible;

    fn transmit(&mut self, data: &[u8]) {
        match data {
            b"AT+CWJAP_CUR=\"test_wifi\",\"secret\"\r\n" => {
                self.respond(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");
            }
            b"AT+CIFSR\r\n" => self.respond(
                b"+CIFSR:APIP,\"192.168.4.1\"\r\n+CIFSR:APMAC,\"12:fe:ed:05:ba:50\"\r\n\
                +CIFSR:STAIP,\"10.0.0.181\"\r\n+CIFSR:STAMAC,\"10:fe:ed:05:ba:50\"\r\n\r\nOK\r\n",
            ),
            b"AT+CIPSTART=\"TCP\",\"10.0.0.1\",80\r\n" => self.respond(b"CONNECT\r\n\r\nOK\r\n"),
            b"AT+CIPSEND=18\r\n" => self.respond(b"\r\nOK\r\n> "),
            b"AT+CIPCLOSE\r\n" => self.respond(b"CLOSED\r\n\r\nOK\r\n"),
            payload if payload.starts_with(b"GET ") => {
                self.respond(b"\r\nRecv 18 bytes\r\n\r\nSEND OK\r\n\r\n+IPD,5:hello\r\n");
            }
            _ => self.respond(b"\r\nOK\r\n"),
        }
    }

    fn arm_receive(&mut self) {}

    fn is_receive_complete(&mut self) -> bool {
        !self.response.is_empty()
    }

    fn receive_buffer(&self) -> &[u8] {
        &self.response
    }

    fn clear_receive_buffer(&mut self) {
        self.response.clear();
    }
}

/// Countdown timer mock, each wait() call counts as one elapsed millisecond
#[derive(Default)]
pub struct ExampleTimer {
    remaining_ms: u32,
}

impl Timer<1_000_000> for ExampleTimer {
    type Error = u32;

    fn now(&mut self) -> TimerInstantU32<1000000> {
        TimerInstantU32::from_ticks(0)
    }

    fn start(&mut self, duration: TimerDurationU32<1000000>) -> Result<(), Self::Error> {
        self.remaining_ms = duration.to_millis();
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        self.remaining_ms = 0;
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        if self.remaining_ms == 0 {
            return Ok(());
        }

        self.remaining_ms -= 1;
        Err(nb::Error::WouldBlock)
    }
}
