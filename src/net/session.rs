//! Session lifecycle for the test console.
//!
//! A [`Session`] owns the connection plus the background receiver thread
//! that prints incoming data. Teardown stops the receiver, shuts the
//! socket down to unblock it and joins the thread before the connection
//! is dropped.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError};
use tracing::debug;

use super::connection::{Connection, NetError};

/// Outcome of the scripted command phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// Every command was sent
    Completed,
    /// An interrupt arrived during an inter-command pause
    Interrupted,
}

/// One connect-to-disconnect lifecycle of the test console.
pub struct Session {
    /// Connection shared with the receiver thread
    conn: Arc<Connection>,
    /// Set when teardown starts; silences the receiver's notices
    stopping: Arc<AtomicBool>,
    /// Receiver thread handle
    reader_thread: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(conn),
            stopping: Arc::new(AtomicBool::new(false)),
            reader_thread: None,
        }
    }

    /// Spawn the background receiver thread printing incoming data.
    pub fn start_receiver(&mut self) {
        let conn = self.conn.clone();
        let stopping = self.stopping.clone();

        let handle = thread::spawn(move || {
            receive_loop(&conn, &stopping, io::stdout());
        });

        self.reader_thread = Some(handle);
    }

    /// Write one command line to the connection.
    pub fn send_line(&self, line: &str) -> Result<(), NetError> {
        self.conn.write_line(line)?;
        debug!("Sent: {}", line);
        Ok(())
    }

    /// Send the command sequence, pausing after each command so the
    /// simulator's replies land before the next send.
    ///
    /// The pause doubles as the cancellation point: an interrupt ends the
    /// phase early without sending the remaining commands.
    pub fn send_scripted(
        &self,
        commands: &[String],
        delay: Duration,
        interrupts: &Receiver<()>,
    ) -> Result<ScriptOutcome, NetError> {
        for cmd in commands {
            println!("Sending: {}", cmd);
            self.send_line(cmd)?;

            match interrupts.recv_timeout(delay) {
                Ok(()) => {
                    debug!("Scripted phase interrupted");
                    return Ok(ScriptOutcome::Interrupted);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => thread::sleep(delay),
            }
        }

        Ok(ScriptOutcome::Completed)
    }
}

/// Print incoming data until the peer closes, a read fails, or teardown
/// starts. Invalid ASCII bytes are dropped from the printed text.
fn receive_loop<W: Write>(conn: &Connection, stopping: &AtomicBool, mut out: W) {
    let mut buffer = [0u8; 1024];

    loop {
        match conn.read(&mut buffer) {
            Ok(0) => {
                if !stopping.load(Ordering::SeqCst) {
                    let _ = writeln!(out, "Server disconnected");
                }
                break;
            }
            Ok(n) => {
                if stopping.load(Ordering::SeqCst) {
                    break;
                }
                let _ = writeln!(out, "Received: {}", decode_ascii(&buffer[..n]));
                let _ = out.flush();
            }
            Err(e) => {
                if !stopping.load(Ordering::SeqCst) {
                    let _ = writeln!(out, "Receive error: {}", e);
                }
                break;
            }
        }
    }

    debug!("Receiver thread exiting");
}

/// Decode a received chunk as ASCII, dropping any non-ASCII bytes.
fn decode_ascii(bytes: &[u8]) -> String {
    bytes.iter().filter(|b| b.is_ascii()).map(|&b| b as char).collect()
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);

        // Shut the socket down to unblock a pending read
        if let Err(e) = self.conn.shutdown() {
            debug!("Socket shutdown during teardown failed: {}", e);
        }

        // Wait for the receiver thread to finish
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
    }
}
