//! We use this mocking module in unit tests to emulate the serial port.
//!
//! Reads follow a script: a queue of reply frames, optionally interleaved
//! with injected timeouts so a test can fail one exchange in the middle of
//! a longer run. An exhausted script times out, like a silent controller.

use thiserror::Error;

use crate::codec::REPLY_LEN;

enum ReadStep {
    /// Bytes the controller "sends" for one exchange. May be short to
    /// simulate a truncated reply.
    Reply(heapless::Vec<u8, REPLY_LEN>),
    /// One read call fails with a timeout.
    TimedOut,
}

/// Our mock type used to emulate a serial port.
pub struct MockPort {
    script: heapless::Deque<ReadStep, 64>,
    /// Offset into the front `Reply` step.
    cursor: usize,
    /// Everything written to the port, frames back to back.
    write_buffer: heapless::Vec<u8, 1024>,
}

#[derive(Error, Debug)]
pub enum MockPortError {
    /// Simulated timeout, also returned once the script runs dry.
    #[error("simulated timeout")]
    Timeout,
    /// A buffer in the mock overflowed; the test is at fault.
    #[error("mock buffer overflow")]
    BufferOverflow,
}

impl embedded_io::Error for MockPortError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockPortError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockPortError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
        }
    }
}

impl embedded_io::ErrorType for MockPort {
    type Error = MockPortError;
}

impl embedded_io::Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockPortError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io::Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.script.front() {
            None => Err(MockPortError::Timeout),
            Some(ReadStep::TimedOut) => {
                self.script.pop_front();
                Err(MockPortError::Timeout)
            }
            Some(ReadStep::Reply(reply)) => {
                let available = reply.len() - self.cursor;
                let n = core::cmp::min(buf.len(), available);
                buf[..n].copy_from_slice(&reply[self.cursor..self.cursor + n]);
                self.cursor += n;
                if self.cursor == reply.len() {
                    self.script.pop_front();
                    self.cursor = 0;
                }
                Ok(n)
            }
        }
    }
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            script: heapless::Deque::new(),
            cursor: 0,
            write_buffer: heapless::Vec::new(),
        }
    }

    /// Queue one reply frame (or a deliberately short fragment of one).
    pub fn queue_reply(&mut self, data: &[u8]) {
        let mut reply = heapless::Vec::new();
        reply.extend_from_slice(data).expect("reply longer than a frame");
        if self.script.push_back(ReadStep::Reply(reply)).is_err() {
            panic!("mock script full");
        }
    }

    /// Queue one read call that fails with a timeout.
    pub fn queue_timeout(&mut self) {
        if self.script.push_back(ReadStep::TimedOut).is_err() {
            panic!("mock script full");
        }
    }

    /// Get a reference to the data that was written to this mock port.
    pub fn written(&self) -> &[u8] {
        &self.write_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, Write};

    #[test]
    fn errors_carry_a_message_and_a_kind() {
        use embedded_io::Error as _;
        assert_eq!(MockPortError::Timeout.to_string(), "simulated timeout");
        assert_eq!(
            MockPortError::Timeout.kind(),
            embedded_io::ErrorKind::TimedOut
        );
        assert_eq!(
            MockPortError::BufferOverflow.kind(),
            embedded_io::ErrorKind::OutOfMemory
        );
    }

    #[test]
    fn collects_written_bytes_across_calls() {
        let mut mock = MockPort::new();
        mock.write(b"*1c00").unwrap();
        mock.write(b"ebbb\r").unwrap();
        assert_eq!(mock.written(), b"*1c00ebbb\r");
    }

    #[test]
    fn serves_queued_replies_in_order() {
        let mut mock = MockPort::new();
        mock.queue_reply(b"*00eb27^");
        mock.queue_reply(b"*0000c0^");

        let mut buf = [0u8; 8];
        mock.read(&mut buf).unwrap();
        assert_eq!(&buf, b"*00eb27^");
        mock.read(&mut buf).unwrap();
        assert_eq!(&buf, b"*0000c0^");
    }

    #[test]
    fn partial_reads_stay_within_one_reply() {
        let mut mock = MockPort::new();
        mock.queue_reply(b"*00eb27^");

        let mut buf = [0u8; 3];
        assert_eq!(mock.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"*00");
        let mut rest = [0u8; 8];
        assert_eq!(mock.read(&mut rest).unwrap(), 5);
        assert_eq!(&rest[..5], b"eb27^");
    }

    #[test]
    fn exhausted_script_times_out() {
        let mut mock = MockPort::new();
        let mut buf = [0u8; 8];
        assert!(matches!(
            mock.read(&mut buf),
            Err(MockPortError::Timeout)
        ));
    }

    #[test]
    fn injected_timeout_fails_one_read_then_recovers() {
        let mut mock = MockPort::new();
        mock.queue_timeout();
        mock.queue_reply(b"*00eb27^");

        let mut buf = [0u8; 8];
        assert!(matches!(mock.read(&mut buf), Err(MockPortError::Timeout)));
        assert_eq!(mock.read(&mut buf).unwrap(), 8);
        assert_eq!(&buf, b"*00eb27^");
    }
}
