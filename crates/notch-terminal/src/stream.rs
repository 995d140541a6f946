//! Background reading of child output.
//!
//! One thread per session owns the PTY reader. Each chunk is decoded,
//! sanitized, and handed to a delivery callback in read order. Reads are
//! blocking and cannot be cancelled; teardown closes the child so the read
//! returns, and the stop flag makes the thread drop anything that arrives
//! afterwards.

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::decode::Utf8ChunkDecoder;
use crate::error::TerminalError;
use crate::sanitize::sanitize;

/// Read size used when the config does not set one.
pub const DEFAULT_READ_CHUNK: usize = 8192;

/// Signals when the reader has hit end of stream.
#[derive(Debug, Clone, Default)]
pub struct DrainWatch {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl DrainWatch {
    fn mark_drained(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_drained(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until drained or `timeout` passes. Returns whether it drained.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |drained| !*drained)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// A running output reader.
#[derive(Debug)]
pub struct StreamBridge {
    stopped: Arc<AtomicBool>,
    drain: DrainWatch,
    thread: Option<thread::JoinHandle<()>>,
}

impl StreamBridge {
    /// Start reading `reader` on a thread called `name`.
    ///
    /// `deliver` receives every non-empty sanitized chunk, in order, until
    /// end of stream or [`stop`](Self::stop).
    pub fn spawn<R, F>(
        name: &str,
        mut reader: R,
        chunk_size: usize,
        mut deliver: F,
    ) -> Result<Self, TerminalError>
    where
        R: Read + Send + 'static,
        F: FnMut(String) + Send + 'static,
    {
        let stopped = Arc::new(AtomicBool::new(false));
        let drain = DrainWatch::default();
        let thread_stopped = Arc::clone(&stopped);
        let thread_drain = drain.clone();
        let chunk_size = chunk_size.max(1);

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut buf = vec![0u8; chunk_size];
                let mut decoder = Utf8ChunkDecoder::new();
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if thread_stopped.load(Ordering::SeqCst) {
                                break;
                            }
                            let text = sanitize(&decoder.decode(&buf[..n]));
                            if !text.is_empty() {
                                deliver(text);
                            }
                        }
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => {
                            // Linux reports a closed PTY as EIO rather than EOF.
                            tracing::debug!(error = %e, "output reader finished");
                            break;
                        }
                    }
                }
                if !thread_stopped.load(Ordering::SeqCst) {
                    let tail = sanitize(&decoder.finish());
                    if !tail.is_empty() {
                        deliver(tail);
                    }
                }
                thread_drain.mark_drained();
            })?;

        Ok(Self {
            stopped,
            drain,
            thread: Some(thread),
        })
    }

    /// Discard anything read from now on. Does not wait for the thread.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn drain_watch(&self) -> DrainWatch {
        self.drain.clone()
    }

    /// Wait for the reader thread. Only safe once the source has closed.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("output reader thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc;

    /// Yields one scripted chunk per read.
    struct Chunks(std::vec::IntoIter<Vec<u8>>);

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.next() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }
    }

    fn collect(reader: impl Read + Send + 'static) -> Vec<String> {
        let (tx, rx) = mpsc::channel();
        let bridge = StreamBridge::spawn("test-reader", reader, 64, move |text| {
            tx.send(text).unwrap();
        })
        .unwrap();
        bridge.join();
        rx.try_iter().collect()
    }

    #[test]
    fn delivers_sanitized_text_in_order() {
        let chunks = vec![
            b"\x1b[32mone\x1b[0m\n".to_vec(),
            b"two\x07\n".to_vec(),
            b"three\n".to_vec(),
        ];
        let got = collect(Chunks(chunks.into_iter()));
        assert_eq!(got, vec!["one\n", "two\n", "three\n"]);
    }

    #[test]
    fn concatenation_equals_sanitized_whole() {
        let chunks: Vec<Vec<u8>> = vec![
            b"\x1b[?2004hprompt$ ".to_vec(),
            b"ls\r\n".to_vec(),
            b"\x1b[01;34msrc\x1b[0m  Cargo.toml\r\n".to_vec(),
        ];
        let whole = sanitize(&String::from_utf8(chunks.concat()).unwrap());
        let got: String = collect(Chunks(chunks.into_iter())).concat();
        assert_eq!(got, whole);
    }

    #[test]
    fn multibyte_split_between_reads() {
        let bytes = "naïve ☕".as_bytes();
        let chunks = vec![bytes[..3].to_vec(), bytes[3..9].to_vec(), bytes[9..].to_vec()];
        let got: String = collect(Chunks(chunks.into_iter())).concat();
        assert_eq!(got, "naïve ☕");
    }

    #[test]
    fn chunks_that_sanitize_to_nothing_are_skipped() {
        let chunks = vec![b"\x1b[?2004h".to_vec(), b"x".to_vec()];
        assert_eq!(collect(Chunks(chunks.into_iter())), vec!["x"]);
    }

    #[test]
    fn drain_watch_fires_at_end_of_stream() {
        let bridge = StreamBridge::spawn("test-reader", Cursor::new(b"done".to_vec()), 16, |_| {}).unwrap();
        let watch = bridge.drain_watch();
        assert!(watch.wait(Duration::from_secs(5)));
        assert!(watch.is_drained());
        bridge.join();
    }

    #[test]
    fn output_after_stop_is_discarded() {
        let (data_tx, data_rx) = mpsc::channel::<Vec<u8>>();
        struct ChannelReader(mpsc::Receiver<Vec<u8>>);
        impl Read for ChannelReader {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                match self.0.recv() {
                    Ok(chunk) => {
                        buf[..chunk.len()].copy_from_slice(&chunk);
                        Ok(chunk.len())
                    }
                    Err(_) => Ok(0),
                }
            }
        }

        let (tx, rx) = mpsc::channel();
        let bridge = StreamBridge::spawn("test-reader", ChannelReader(data_rx), 64, move |t| {
            tx.send(t).unwrap();
        })
        .unwrap();

        data_tx.send(b"before".to_vec()).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "before");

        bridge.stop();
        assert!(bridge.is_stopped());
        data_tx.send(b"after".to_vec()).unwrap();
        drop(data_tx);
        bridge.join();
        assert!(rx.try_recv().is_err());
    }
}
