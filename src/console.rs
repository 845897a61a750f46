//! Console input plumbing.
//!
//! Stdin is read on a dedicated thread feeding a bounded channel, so the
//! interactive loop can wait on typed lines and Ctrl+C at the same time.

use std::io::{self, BufRead, Write};
use std::thread;

use crossbeam::channel::{bounded, Receiver, Sender};
use crossbeam::select;
use tracing::debug;

use crate::net::connection::NetError;
use crate::net::session::Session;

/// What to do with one line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Send the command over the connection
    Send(String),
    /// Ignore the line (empty input)
    Ignore,
    /// End the session without sending anything
    Quit,
}

/// Classify a line of console input.
///
/// `quit` and `exit` end the session (case-insensitive, surrounding
/// whitespace ignored); empty lines are ignored; anything else is sent
/// as a command.
pub fn classify(line: &str) -> InputAction {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return InputAction::Ignore;
    }
    if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
        return InputAction::Quit;
    }
    InputAction::Send(trimmed.to_string())
}

/// Spawn the stdin reader thread.
///
/// The thread blocks on stdin for its whole life, so it is left detached;
/// it exits on console EOF or once the receiving side is dropped.
pub fn spawn_reader() -> Receiver<String> {
    let (tx, rx) = bounded::<String>(16);

    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(text) => {
                    if tx.send(text).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Console read failed: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

/// Install the Ctrl+C handler feeding the interrupt channel.
///
/// The returned sender keeps the channel open; hold on to it for the
/// life of the session.
pub fn interrupt_channel() -> Result<(Sender<()>, Receiver<()>), ctrlc::Error> {
    let (tx, rx) = bounded::<()>(1);

    let handler_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = handler_tx.try_send(());
    })?;

    Ok((tx, rx))
}

/// Prompt for console lines and forward them to the simulator until
/// `quit`/`exit`, console EOF, or an interrupt.
pub fn run_interactive(
    session: &Session,
    lines: &Receiver<String>,
    interrupts: &Receiver<()>,
) -> Result<(), NetError> {
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        select! {
            recv(lines) -> line => {
                match line {
                    Ok(text) => match classify(&text) {
                        InputAction::Send(cmd) => session.send_line(&cmd)?,
                        InputAction::Ignore => {}
                        InputAction::Quit => {
                            debug!("Session ended from the console");
                            return Ok(());
                        }
                    },
                    Err(_) => {
                        // Reader thread is gone: console EOF
                        println!();
                        debug!("Console input closed");
                        return Ok(());
                    }
                }
            }
            recv(interrupts) -> _msg => {
                println!();
                debug!("Interrupted");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::{TcpListener, TcpStream};
    use std::time::Duration;

    use crate::net::connection::Connection;

    #[test]
    fn test_classify_quit_and_exit() {
        assert_eq!(classify("quit"), InputAction::Quit);
        assert_eq!(classify("QUIT"), InputAction::Quit);
        assert_eq!(classify("exit"), InputAction::Quit);
        assert_eq!(classify("  Exit  "), InputAction::Quit);
    }

    #[test]
    fn test_classify_ignores_empty_input() {
        assert_eq!(classify(""), InputAction::Ignore);
        assert_eq!(classify("   "), InputAction::Ignore);
        assert_eq!(classify("\t"), InputAction::Ignore);
    }

    #[test]
    fn test_classify_commands() {
        assert_eq!(classify("M105"), InputAction::Send("M105".to_string()));
        assert_eq!(classify("  G28  "), InputAction::Send("G28".to_string()));
        // Only the bare words terminate
        assert_eq!(classify("quit now"), InputAction::Send("quit now".to_string()));
    }

    fn loopback_session() -> (TcpStream, Session) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let conn = Connection::connect("127.0.0.1", port, Duration::from_secs(5)).unwrap();
        let (server, _) = listener.accept().unwrap();
        (server, Session::new(conn))
    }

    #[test]
    fn test_interactive_quit_is_not_sent() {
        let (mut server, session) = loopback_session();
        let (line_tx, lines) = bounded::<String>(16);
        let (_interrupt_tx, interrupts) = bounded::<()>(1);

        line_tx.send("M105".to_string()).unwrap();
        line_tx.send("".to_string()).unwrap();
        line_tx.send("   ".to_string()).unwrap();
        line_tx.send("QUIT".to_string()).unwrap();

        run_interactive(&session, &lines, &interrupts).unwrap();
        drop(session);

        let mut received = String::new();
        server.read_to_string(&mut received).unwrap();
        assert_eq!(received, "M105\n");
    }

    #[test]
    fn test_interactive_interrupt_ends_loop() {
        let (mut server, session) = loopback_session();
        let (_line_tx, lines) = bounded::<String>(16);
        let (interrupt_tx, interrupts) = bounded::<()>(1);

        interrupt_tx.send(()).unwrap();

        run_interactive(&session, &lines, &interrupts).unwrap();
        drop(session);

        let mut received = String::new();
        server.read_to_string(&mut received).unwrap();
        assert_eq!(received, "");
    }

    #[test]
    fn test_interactive_eof_ends_loop() {
        let (mut server, session) = loopback_session();
        let (_interrupt_tx, interrupts) = bounded::<()>(1);
        let lines = {
            let (tx, rx) = bounded::<String>(1);
            drop(tx);
            rx
        };

        run_interactive(&session, &lines, &interrupts).unwrap();
        drop(session);

        let mut received = String::new();
        server.read_to_string(&mut received).unwrap();
        assert_eq!(received, "");
    }
}
