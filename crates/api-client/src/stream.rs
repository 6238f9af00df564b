use crate::error::{Fault, SimulationFailure};
use crate::responses::{decode_line, ResponseRecord};
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;

/// Lifecycle of one simulation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Connecting,
    Streaming { lines: usize },
    Completed,
    Faulted,
}

/// Splits an arbitrarily chunked byte stream into `\n`-terminated lines.
///
/// Consumed lines are only dropped from the buffer on the next [`push`](Self::push),
/// so a chunk holding many lines is compacted once rather than once per line.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
    // Start of the first line not yet handed out.
    start: usize,
    // Bytes of `buf` before this index are known not to contain a pending newline.
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Takes the next complete line out of the buffer, without its terminator.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        match self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset;
                let mut line = self.buf[self.start..end].to_vec();
                strip_cr(&mut line);
                self.start = end + 1;
                self.scanned = self.start;
                Some(line)
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Bytes held that have not been returned as a line yet.
    pub fn pending(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Flushes whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let mut line = self.buf.split_off(self.start);
        self.buf.clear();
        self.start = 0;
        self.scanned = 0;
        if line.is_empty() {
            return None;
        }
        strip_cr(&mut line);
        Some(line)
    }
}

fn strip_cr(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}

/// Drives one call from request to result and owns everything read so far.
///
/// Each exit path consumes the call, so the response body it was reading is
/// dropped (and its connection released) whether the call completes or faults.
#[derive(Debug)]
pub struct StreamingCall {
    state: CallState,
    records: Vec<ResponseRecord>,
}

impl Default for StreamingCall {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingCall {
    pub fn new() -> Self {
        Self {
            state: CallState::Idle,
            records: Vec::new(),
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    fn transition(&mut self, next: CallState) {
        tracing::debug!(from = ?self.state, to = ?next, "Simulation call state change.");
        self.state = next;
    }

    pub fn connecting(&mut self) {
        self.transition(CallState::Connecting);
    }

    /// Ends the call with a fault, handing back the records read before it.
    pub fn fail(mut self, fault: Fault) -> SimulationFailure {
        self.transition(CallState::Faulted);
        tracing::warn!(records = self.records.len(), error = %fault, "Simulation call faulted.");
        SimulationFailure {
            fault,
            partial: self.records,
        }
    }

    fn complete(mut self) -> Vec<ResponseRecord> {
        self.transition(CallState::Completed);
        tracing::debug!(records = self.records.len(), "Simulation call completed.");
        self.records
    }

    fn accept(&mut self, line: &[u8]) -> Result<(), Fault> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        let record = decode_line(line)?;
        self.records.push(record);
        if let CallState::Streaming { lines } = &mut self.state {
            *lines += 1;
        }
        Ok(())
    }

    /// Reads a newline-delimited JSON body to the end, or to the first fault.
    ///
    /// Lines are decoded in arrival order and nothing after a faulting line is
    /// read. A non-success `status` whose body carries no in-band error still
    /// fails the call once the body is exhausted.
    pub async fn read<S, B, E>(mut self, status: StatusCode, body: S) -> Result<Vec<ResponseRecord>, SimulationFailure>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        Fault: From<E>,
    {
        self.transition(CallState::Streaming { lines: 0 });
        let mut body = std::pin::pin!(body);
        let mut decoder = LineDecoder::new();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return Err(self.fail(Fault::from(e))),
            };
            decoder.push(chunk.as_ref());
            while let Some(line) = decoder.next_line() {
                if let Err(fault) = self.accept(&line) {
                    return Err(self.fail(fault));
                }
            }
        }
        if let Some(line) = decoder.finish() {
            if let Err(fault) = self.accept(&line) {
                return Err(self.fail(fault));
            }
        }

        if !status.is_success() {
            let message = format!("HTTP {}", status);
            return Err(self.fail(Fault::Protocol { message }));
        }
        Ok(self.complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<&'static [u8], Fault>> {
        stream::iter(parts.iter().map(|p| Ok(p.as_bytes())).collect::<Vec<_>>())
    }

    #[test]
    fn decoder_handles_split_and_joined_lines() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"{\"a\":");
        assert_eq!(decoder.next_line(), None);
        decoder.push(b"1}\r\n{\"b\":2}\n{\"c\"");
        assert_eq!(decoder.next_line().unwrap(), b"{\"a\":1}");
        assert_eq!(decoder.next_line().unwrap(), b"{\"b\":2}");
        assert_eq!(decoder.next_line(), None);
        decoder.push(b":3}");
        assert_eq!(decoder.finish().unwrap(), b"{\"c\":3}");
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn decoder_drains_many_lines_from_one_chunk() {
        let chunk: String = (0..1000).map(|i| format!("{{\"i\":{}}}\n", i)).collect();
        let mut decoder = LineDecoder::new();
        decoder.push(chunk.as_bytes());
        decoder.push(b"{\"i\":");

        let mut count = 0;
        while let Some(line) = decoder.next_line() {
            assert_eq!(line, format!("{{\"i\":{}}}", count).into_bytes());
            count += 1;
        }
        assert_eq!(count, 1000);
        assert_eq!(decoder.pending(), 5);

        decoder.push(b"1000}\n");
        assert_eq!(decoder.pending(), 11);
        assert_eq!(decoder.next_line().unwrap(), b"{\"i\":1000}");
        assert_eq!(decoder.pending(), 0);
        assert_eq!(decoder.finish(), None);
    }

    #[tokio::test]
    async fn returns_all_records_in_order() {
        let body = chunks(&["{\"i\":0}\n{\"i\":1}\n", "{\"i\":2}\n\n{\"i\"", ":3}\n{\"i\":4}"]);
        let records = StreamingCall::new().read(StatusCode::OK, body).await.unwrap();
        let order: Vec<_> = records.iter().map(|r| r.get("i").unwrap().as_i64().unwrap()).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn stops_at_first_fault_and_keeps_partial_results() {
        let body = chunks(&[
            "{\"i\":0}\n{\"i\":1}\n",
            "{\"vault_error_code\":\"X\",\"message\":\"Y\"}\n{\"i\":3}\n",
        ])
        // Polling past the faulting chunk would panic.
        .chain(stream::poll_fn(|_| -> std::task::Poll<Option<Result<&'static [u8], Fault>>> {
            panic!("body read after fault")
        }));

        let failure = StreamingCall::new().read(StatusCode::OK, body).await.unwrap_err();
        assert!(matches!(
            failure.fault,
            Fault::Service { ref code, ref message } if code == "X" && message == "Y"
        ));
        assert_eq!(failure.partial.len(), 2);
    }

    #[tokio::test]
    async fn generic_error_line_is_protocol_fault() {
        let body = chunks(&["{\"i\":0}\n{\"error\":\"bad request\"}\n"]);
        let failure = StreamingCall::new().read(StatusCode::OK, body).await.unwrap_err();
        assert!(matches!(failure.fault, Fault::Protocol { ref message } if message == "bad request"));
        assert_eq!(failure.partial.len(), 1);
    }

    #[tokio::test]
    async fn unterminated_garbage_is_decode_fault() {
        let body = chunks(&["{\"i\":0}\nnot-json"]);
        let failure = StreamingCall::new().read(StatusCode::OK, body).await.unwrap_err();
        assert!(matches!(failure.fault, Fault::Decode { ref line, .. } if line == "not-json"));
    }

    #[tokio::test]
    async fn error_status_without_in_band_error_faults() {
        let body = chunks(&["{\"i\":0}\n"]);
        let failure = StreamingCall::new()
            .read(StatusCode::BAD_GATEWAY, body)
            .await
            .unwrap_err();
        assert!(matches!(failure.fault, Fault::Protocol { ref message } if message.contains("502")));
        assert_eq!(failure.partial.len(), 1);
    }

    #[tokio::test]
    async fn empty_body_is_an_empty_result() {
        let records = StreamingCall::new().read(StatusCode::OK, chunks(&[])).await.unwrap();
        assert!(records.is_empty());
    }
}
