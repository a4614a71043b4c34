//! The single client connection: line framing in, buffered writes out.

use std::io::{self, Read, Write};
use std::net::TcpStream;

use super::errors::FrameError;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Stream types accepted by the control listener.
pub(crate) enum ConnectionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Result of polling the connection for one request frame.
pub(crate) enum FramePoll {
    /// Nothing complete yet.
    Idle,
    /// One well-framed request line, newline stripped.
    Frame(String),
    /// A framing violation; the offending bytes were discarded.
    Reject(FrameError),
    /// The peer closed the connection or the socket failed.
    Disconnected,
}

/// One live client connection with its framing state.
pub(crate) struct Connection {
    stream: ConnectionStream,
    generation: u64,
    inbound: Vec<u8>,
    outgoing: Vec<u8>,
    /// After an oversized line with no terminator yet, input is dropped
    /// through the next newline so the stream re-synchronises.
    discarding: bool,
}

impl Connection {
    pub(crate) fn new(stream: ConnectionStream, generation: u64) -> Self {
        Self {
            stream,
            generation,
            inbound: Vec::new(),
            outgoing: Vec::new(),
            discarding: false,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Reads whatever bytes are available and extracts at most one frame.
    pub(crate) fn poll_frame(&mut self, max_frame: usize) -> FramePoll {
        let mut chunk = [0_u8; 512];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return FramePoll::Disconnected,
                Ok(read) => self.inbound.extend_from_slice(&chunk[..read]),
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => return FramePoll::Disconnected,
            }
        }
        self.extract_frame(max_frame)
    }

    fn extract_frame(&mut self, max_frame: usize) -> FramePoll {
        if self.discarding {
            match newline_position(&self.inbound) {
                Some(pos) => {
                    self.inbound.drain(..=pos);
                    self.discarding = false;
                }
                None => {
                    self.inbound.clear();
                    return FramePoll::Idle;
                }
            }
        }

        let Some(pos) = newline_position(&self.inbound) else {
            if self.inbound.len() > max_frame {
                let size = self.inbound.len();
                self.inbound.clear();
                self.discarding = true;
                return FramePoll::Reject(FrameError::TooLarge {
                    size,
                    max: max_frame,
                });
            }
            return FramePoll::Idle;
        };

        let line_len = pos + 1;
        if line_len > max_frame {
            self.inbound.clear();
            return FramePoll::Reject(FrameError::TooLarge {
                size: line_len,
                max: max_frame,
            });
        }
        if self.inbound.len() > line_len {
            let extra = self.inbound.len() - line_len;
            self.inbound.clear();
            return FramePoll::Reject(FrameError::Pipelined { extra });
        }

        let mut line = std::mem::take(&mut self.inbound);
        line.truncate(pos);
        let Ok(text) = String::from_utf8(line) else {
            return FramePoll::Reject(FrameError::InvalidEncoding);
        };
        let trimmed = text.trim();
        if !trimmed.starts_with('{') {
            return FramePoll::Reject(FrameError::NotAnObject);
        }
        FramePoll::Frame(trimmed.to_owned())
    }

    /// Queues response bytes for transmission.
    pub(crate) fn queue_write(&mut self, bytes: &[u8]) {
        self.outgoing.extend_from_slice(bytes);
    }

    /// Writes as much queued output as the socket accepts right now.
    pub(crate) fn flush_outgoing(&mut self) -> io::Result<()> {
        while !self.outgoing.is_empty() {
            match self.stream.write(&self.outgoing) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "client stopped accepting bytes",
                    ));
                }
                Ok(written) => {
                    self.outgoing.drain(..written);
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            }
        }
        match self.stream.flush() {
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(()),
            other => other,
        }
    }
}

fn newline_position(buffer: &[u8]) -> Option<usize> {
    buffer.iter().position(|byte| *byte == b'\n')
}

#[cfg(test)]
mod tests {
    use std::net::{TcpListener, TcpStream};
    use std::time::{Duration, Instant};

    use super::*;

    const MAX: usize = 256;

    fn connected_pair() -> (TcpStream, Connection) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");
        let client = TcpStream::connect(addr).expect("connect");
        let (server, _) = listener.accept().expect("accept");
        server.set_nonblocking(true).expect("nonblocking");
        (client, Connection::new(ConnectionStream::Tcp(server), 1))
    }

    fn poll_until_not_idle(connection: &mut Connection) -> FramePoll {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            match connection.poll_frame(MAX) {
                FramePoll::Idle => std::thread::sleep(Duration::from_millis(5)),
                other => return other,
            }
        }
        FramePoll::Idle
    }

    #[test]
    fn frames_one_complete_line() {
        let (mut client, mut connection) = connected_pair();
        client
            .write_all(b"{\"jsonrpc\":\"2.0\"}\n")
            .expect("write frame");
        match poll_until_not_idle(&mut connection) {
            FramePoll::Frame(line) => assert_eq!(line, "{\"jsonrpc\":\"2.0\"}"),
            _ => panic!("expected a frame"),
        }
    }

    #[test]
    fn accepts_line_of_exactly_max_bytes() {
        let (mut client, mut connection) = connected_pair();
        // 255 payload bytes + newline == 256 exactly.
        let mut line = vec![b'{'];
        line.resize(MAX - 1, b' ');
        line.push(b'\n');
        client.write_all(&line).expect("write frame");
        assert!(matches!(
            poll_until_not_idle(&mut connection),
            FramePoll::Frame(_)
        ));
    }

    #[test]
    fn rejects_line_one_byte_over_max() {
        let (mut client, mut connection) = connected_pair();
        let mut line = vec![b'{'];
        line.resize(MAX, b' ');
        line.push(b'\n');
        client.write_all(&line).expect("write frame");
        match poll_until_not_idle(&mut connection) {
            FramePoll::Reject(FrameError::TooLarge { size, max }) => {
                assert_eq!(size, MAX + 1);
                assert_eq!(max, MAX);
            }
            _ => panic!("expected a size rejection"),
        }
    }

    #[test]
    fn rejects_pipelined_objects_without_processing_either() {
        let (mut client, mut connection) = connected_pair();
        client
            .write_all(b"{\"a\":1}\n{\"b\":2}\n")
            .expect("write burst");
        // Give the kernel a moment to coalesce both objects into one read.
        std::thread::sleep(Duration::from_millis(50));
        match poll_until_not_idle(&mut connection) {
            FramePoll::Reject(FrameError::Pipelined { extra }) => assert!(extra > 0),
            _ => panic!("expected a pipelining rejection"),
        }
        // The offending bytes are gone: nothing further is framed.
        assert!(matches!(connection.poll_frame(MAX), FramePoll::Idle));
    }

    #[test]
    fn rejects_lines_not_starting_with_brace() {
        let (mut client, mut connection) = connected_pair();
        client.write_all(b"  not json\n").expect("write line");
        assert!(matches!(
            poll_until_not_idle(&mut connection),
            FramePoll::Reject(FrameError::NotAnObject)
        ));
    }

    #[test]
    fn whitespace_around_object_is_trimmed() {
        let (mut client, mut connection) = connected_pair();
        client.write_all(b"  {\"a\":1}  \n").expect("write line");
        match poll_until_not_idle(&mut connection) {
            FramePoll::Frame(line) => assert_eq!(line, "{\"a\":1}"),
            _ => panic!("expected a frame"),
        }
    }

    #[test]
    fn disconnect_is_reported() {
        let (client, mut connection) = connected_pair();
        drop(client);
        assert!(matches!(
            poll_until_not_idle(&mut connection),
            FramePoll::Disconnected
        ));
    }

    #[test]
    fn flushes_queued_output_to_the_peer() {
        let (client, mut connection) = connected_pair();
        connection.queue_write(b"{\"result\":{}}\n");
        connection.flush_outgoing().expect("flush");

        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .expect("timeout");
        let mut reader = std::io::BufReader::new(client);
        let mut line = String::new();
        std::io::BufRead::read_line(&mut reader, &mut line).expect("read response");
        assert_eq!(line, "{\"result\":{}}\n");
    }
}
