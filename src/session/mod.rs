//! REPL session
//!
//! A [`Session`] is the view a REPL runs in. It owns the buffer (through a
//! [`View`]), the [`TerminalEngine`] that writes program output into it, and
//! an [`InputSink`] that carries committed user input back to the program.
//!
//! Buffer layout while a prompt is showing:
//!
//! ```text
//! [ program output ][ prompt ][ user input ]
//!                   ^         ^            ^
//!              text_end   output_end      size
//! ```

mod history;
mod reader;

use std::io::{self, Write};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};

use tracing::{debug, warn};

use crate::app::Config;
use crate::core::{Buffer, View};
use crate::error::{Error, Result};
use crate::parser::tokenizer;
use crate::terminal::TerminalEngine;

pub use history::{History, HistoryMatch};
pub use reader::{spawn_child, ChildSource, OutputSource, Reader};

/// Marker written when the program's output ends
pub const CLOSED_MESSAGE: &str = "\n***Repl Closed***\n";

/// A unit of program output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Ordinary output
    Output(String),
    /// A prompt; the program is waiting for input
    Prompt(String),
}

/// Where committed user input goes
pub trait InputSink {
    fn send(&mut self, input: &str) -> Result<()>;
}

/// Sink over any writer, typically a child's stdin
#[derive(Debug)]
pub struct WriteSink<W>(pub W);

impl<W: Write> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        Self(writer)
    }
}

impl<W: Write> InputSink for WriteSink<W> {
    fn send(&mut self, input: &str) -> Result<()> {
        let result = self
            .0
            .write_all(input.as_bytes())
            .and_then(|()| self.0.flush());
        match result {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Err(Error::Disconnected),
            other => other.map_err(Error::from),
        }
    }
}

/// Collects input; handy for tests and replays
impl InputSink for Vec<String> {
    fn send(&mut self, input: &str) -> Result<()> {
        self.push(input.to_string());
        Ok(())
    }
}

impl InputSink for Sender<String> {
    fn send(&mut self, input: &str) -> Result<()> {
        Sender::send(self, input.to_string()).map_err(|_| Error::Disconnected)
    }
}

/// Discards input
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl InputSink for NullSink {
    fn send(&mut self, _input: &str) -> Result<()> {
        Ok(())
    }
}

/// A REPL view over a buffer
pub struct Session<B, S> {
    view: View<B>,
    engine: TerminalEngine,
    config: Config,
    sink: S,
    history: History,
    history_match: Option<HistoryMatch>,
}

impl<B: Buffer, S: InputSink> Session<B, S> {
    /// Start a session over `buffer`. Existing text counts as output.
    pub fn new(buffer: B, sink: S, config: Config) -> Self {
        let view = View::new(buffer);
        let mut engine = TerminalEngine::new(config.engine_options());
        engine.attach(view.text_end());
        Self {
            view,
            engine,
            config,
            sink,
            history: History::new(),
            history_match: None,
        }
    }

    pub fn view(&self) -> &View<B> {
        &self.view
    }

    pub fn engine(&self) -> &TerminalEngine {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Write program output in front of the prompt
    pub fn write(&mut self, text: &str) -> Result<()> {
        if self.config.emulate_ansi_csi {
            return self.engine.run(&mut self.view, text);
        }
        let text = if self.config.filter_ascii_color_codes {
            tokenizer::strip_escapes(text)
        } else {
            text.into()
        };
        let pos = self.view.text_end();
        self.view.insert(pos, &text, None)?;
        self.engine.attach(self.view.text_end());
        Ok(())
    }

    /// Write a prompt after the output. The text it adds becomes the prompt
    /// region, and later output lands in front of it.
    pub fn write_prompt(&mut self, text: &str) -> Result<()> {
        if self.config.emulate_ansi_csi {
            self.engine.flush(&mut self.view)?;
        }
        self.view.set_prompt_size(0);
        let before = self.view.output_end();
        self.engine.attach(self.view.text_end());

        self.write(text)?;
        if self.config.emulate_ansi_csi {
            self.engine.flush(&mut self.view)?;
        }

        let grown = self.view.output_end().saturating_sub(before);
        self.view.set_prompt_size(grown);
        self.engine.attach(self.view.text_end());
        Ok(())
    }

    /// Text the user has typed since the last prompt
    pub fn user_input(&self) -> Result<String> {
        let buffer = self.view.buffer();
        buffer.text(self.view.output_end()..buffer.size())
    }

    /// Append typed text to the input region
    pub fn type_input(&mut self, text: &str) -> Result<()> {
        let size = self.view.buffer().size();
        self.view.buffer_mut().insert(size, text)
    }

    /// Replace the whole input region with `text`
    pub fn replace_input(&mut self, text: &str) -> Result<()> {
        let start = self.view.output_end();
        let size = self.view.buffer().size();
        self.view.buffer_mut().erase(start, size)?;
        self.view.buffer_mut().insert(start, text)
    }

    /// Commit the input region: send it with the command postfix, record it
    /// in history and make it part of the output. Returns what was sent.
    ///
    /// Nothing changes if the sink fails, so the commit can be retried.
    pub fn commit_input(&mut self) -> Result<String> {
        let input = self.user_input()?;
        let command = format!("{}{}", input, self.config.cmd_postfix);
        self.sink.send(&command)?;
        debug!(len = command.len(), "input committed");

        self.history.push(&input);
        self.history_match = None;

        let size = self.view.buffer().size();
        self.view.buffer_mut().insert(size, &self.config.cmd_postfix)?;
        let size = self.view.buffer().size();
        if self.config.suppress_echo {
            let start = self.view.output_end();
            self.view.buffer_mut().erase(start, size)?;
        } else {
            self.view.set_output_end(size);
        }
        self.view.set_prompt_size(0);
        self.engine.attach(self.view.text_end());
        Ok(command)
    }

    /// Recall the previous history entry matching the current input
    pub fn previous_command(&mut self) -> Result<()> {
        self.ensure_history_match()?;
        let command = match self.history_match.as_mut() {
            Some(m) => m.prev().to_string(),
            None => return Ok(()),
        };
        if command.is_empty() {
            return Ok(());
        }
        self.replace_input(&command)
    }

    /// Recall the next newer history entry matching the current input
    pub fn next_command(&mut self) -> Result<()> {
        self.ensure_history_match()?;
        let command = match self.history_match.as_mut() {
            Some(m) => m.next().to_string(),
            None => return Ok(()),
        };
        if command.is_empty() {
            return Ok(());
        }
        self.replace_input(&command)
    }

    /// Start a new match list unless the input still shows the current match
    fn ensure_history_match(&mut self) -> Result<()> {
        let input = self.user_input()?;
        let stale = self
            .history_match
            .as_ref()
            .map_or(true, |m| m.current() != input);
        if stale {
            self.history_match = Some(self.history.matching(&input));
        }
        Ok(())
    }

    /// Erase all output in front of the prompt
    pub fn clear_output(&mut self) -> Result<()> {
        let end = self.view.text_end();
        self.view.erase(0, end)?;
        self.engine.attach(0);
        Ok(())
    }

    pub fn handle_packet(&mut self, packet: Packet) -> Result<()> {
        match packet {
            Packet::Output(text) => self.write(&text),
            Packet::Prompt(text) => self.write_prompt(&text),
        }
    }

    /// Drain everything queued on `receiver` without blocking.
    ///
    /// Consecutive output packets are joined and written once `read_buffer`
    /// characters have accumulated. Returns `false` once the source has
    /// ended, after writing the closed marker.
    pub fn pump(&mut self, receiver: &Receiver<Option<Packet>>) -> Result<bool> {
        let mut batch = String::new();
        let mut batched = 0;
        let open = loop {
            match receiver.try_recv() {
                Ok(Some(Packet::Output(text))) => {
                    batched += text.chars().count();
                    batch.push_str(&text);
                    if batched >= self.config.read_buffer {
                        self.write_batch(&mut batch)?;
                        batched = 0;
                    }
                }
                Ok(Some(Packet::Prompt(text))) => {
                    self.write_batch(&mut batch)?;
                    batched = 0;
                    self.write_prompt(&text)?;
                }
                Ok(None) | Err(TryRecvError::Disconnected) => break false,
                Err(TryRecvError::Empty) => break true,
            }
        };
        self.write_batch(&mut batch)?;
        if !open {
            self.close()?;
        }
        Ok(open)
    }

    fn write_batch(&mut self, batch: &mut String) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(batch);
        self.write(&text).inspect_err(|e| warn!("failed to write output: {}", e))
    }

    /// Release any held-back escape fragment as literal text
    pub fn flush(&mut self) -> Result<()> {
        self.engine.flush(&mut self.view)
    }

    /// Flush and mark the session closed
    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.write(CLOSED_MESSAGE)
    }

    /// Replace the input sink, returning the old one
    pub fn with_sink<T: InputSink>(self, sink: T) -> (Session<B, T>, S) {
        let session = Session {
            view: self.view,
            engine: self.engine,
            config: self.config,
            sink,
            history: self.history,
            history_match: self.history_match,
        };
        (session, self.sink)
    }

    pub fn into_view(self) -> View<B> {
        self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TextBuffer;
    use std::sync::mpsc;

    fn session() -> Session<TextBuffer, Vec<String>> {
        Session::new(TextBuffer::new(), Vec::new(), Config::default())
    }

    fn text<S: InputSink>(session: &Session<TextBuffer, S>) -> String {
        session.view().buffer().to_string()
    }

    #[test]
    fn test_prompt_and_commit() {
        let mut s = session();
        s.write("Python 3\n").unwrap();
        s.write_prompt(">>> ").unwrap();
        assert_eq!(s.view().prompt_size(), 4);
        assert_eq!(s.view().text_end(), 9);

        s.type_input("1+1").unwrap();
        assert_eq!(s.user_input().unwrap(), "1+1");

        let sent = s.commit_input().unwrap();
        assert_eq!(sent, "1+1\n");
        assert_eq!(s.sink(), &vec!["1+1\n".to_string()]);
        assert_eq!(text(&s), "Python 3\n>>> 1+1\n");
        assert_eq!(s.view().output_end(), 17);
        assert_eq!(s.view().prompt_size(), 0);
        assert_eq!(s.engine().cursor(), 17);

        s.write("2\n").unwrap();
        assert_eq!(text(&s), "Python 3\n>>> 1+1\n2\n");
    }

    #[test]
    fn test_output_lands_before_prompt() {
        let mut s = session();
        s.write_prompt("> ").unwrap();
        s.type_input("ab").unwrap();
        s.write("out\n").unwrap();
        assert_eq!(text(&s), "out\n> ab");
        assert_eq!(s.view().output_end(), 6);
        assert_eq!(s.view().prompt_size(), 2);
        assert_eq!(s.user_input().unwrap(), "ab");
    }

    #[test]
    fn test_suppress_echo() {
        let config = Config {
            suppress_echo: true,
            ..Default::default()
        };
        let mut s = Session::new(TextBuffer::new(), Vec::new(), config);
        s.write_prompt("$ ").unwrap();
        s.type_input("ls").unwrap();
        assert_eq!(s.commit_input().unwrap(), "ls\n");
        assert_eq!(text(&s), "$ ");
        assert_eq!(s.view().output_end(), 2);
        assert_eq!(s.engine().cursor(), 2);
    }

    #[test]
    fn test_verbatim_mode() {
        let config = Config {
            emulate_ansi_csi: false,
            ..Default::default()
        };
        let mut s = Session::new(TextBuffer::new(), Vec::new(), config);
        s.write("a\rb\x1b[2K").unwrap();
        assert_eq!(text(&s), "a\rb\x1b[2K");

        let config = Config {
            emulate_ansi_csi: false,
            filter_ascii_color_codes: true,
            ..Default::default()
        };
        let mut s = Session::new(TextBuffer::new(), Vec::new(), config);
        s.write("\x1b[31mred\x1b[0m\n").unwrap();
        s.write_prompt("> ").unwrap();
        s.write("more\n").unwrap();
        assert_eq!(text(&s), "red\nmore\n> ");
    }

    #[test]
    fn test_clear_output_keeps_prompt_and_input() {
        let mut s = session();
        s.write("lots\nof\noutput\n").unwrap();
        s.write_prompt("> ").unwrap();
        s.type_input("x").unwrap();
        s.clear_output().unwrap();
        assert_eq!(text(&s), "> x");
        assert_eq!(s.view().output_end(), 2);
        assert_eq!(s.view().prompt_size(), 2);
        assert_eq!(s.engine().cursor(), 0);

        s.write("new\n").unwrap();
        assert_eq!(text(&s), "new\n> x");
    }

    #[test]
    fn test_history_recall() {
        let mut s = session();
        for cmd in ["print(1)", "x = 2", "print(x)"] {
            s.write_prompt(">>> ").unwrap();
            s.type_input(cmd).unwrap();
            s.commit_input().unwrap();
        }
        s.write_prompt(">>> ").unwrap();
        s.type_input("pr").unwrap();

        s.previous_command().unwrap();
        assert_eq!(s.user_input().unwrap(), "print(x)");
        s.previous_command().unwrap();
        assert_eq!(s.user_input().unwrap(), "print(1)");
        s.next_command().unwrap();
        assert_eq!(s.user_input().unwrap(), "print(x)");
        assert_eq!(s.history().len(), 3);
    }

    #[test]
    fn test_recall_without_history_keeps_input() {
        let mut s = session();
        s.type_input("abc").unwrap();
        s.previous_command().unwrap();
        s.next_command().unwrap();
        assert_eq!(s.user_input().unwrap(), "abc");
    }

    #[test]
    fn test_pump_batches_and_closes() {
        let mut s = session();
        let (tx, rx) = mpsc::channel();
        tx.send(Some(Packet::Output("hel".to_string()))).unwrap();
        tx.send(Some(Packet::Output("lo\n".to_string()))).unwrap();
        tx.send(Some(Packet::Prompt("> ".to_string()))).unwrap();
        assert!(s.pump(&rx).unwrap());
        assert_eq!(text(&s), "hello\n> ");
        assert_eq!(s.view().prompt_size(), 2);

        tx.send(Some(Packet::Output("bye".to_string()))).unwrap();
        tx.send(None).unwrap();
        assert!(!s.pump(&rx).unwrap());
        assert_eq!(text(&s), "hello\nbye\n***Repl Closed***\n> ");
    }

    #[test]
    fn test_pump_escape_split_across_packets() {
        let mut s = session();
        let (tx, rx) = mpsc::channel();
        tx.send(Some(Packet::Output("abc\x1b[".to_string()))).unwrap();
        assert!(s.pump(&rx).unwrap());
        assert_eq!(text(&s), "abc");
        tx.send(Some(Packet::Output("2Dx".to_string()))).unwrap();
        assert!(s.pump(&rx).unwrap());
        assert_eq!(text(&s), "axc");
    }

    #[test]
    fn test_pump_dropped_sender() {
        let mut s = session();
        let (tx, rx) = mpsc::channel::<Option<Packet>>();
        drop(tx);
        assert!(!s.pump(&rx).unwrap());
        assert_eq!(text(&s), CLOSED_MESSAGE);
    }

    #[test]
    fn test_sender_sink_disconnected() {
        let (tx, rx) = mpsc::channel();
        let mut s = Session::new(TextBuffer::new(), tx, Config::default());
        s.type_input("a").unwrap();
        s.commit_input().unwrap();
        assert_eq!(rx.recv().unwrap(), "a\n");

        drop(rx);
        s.type_input("b").unwrap();
        assert!(matches!(s.commit_input(), Err(Error::Disconnected)));
    }

    /// Fails the first `failures` sends, then records
    struct FlakySink {
        failures: usize,
        sent: Vec<String>,
    }

    impl InputSink for FlakySink {
        fn send(&mut self, input: &str) -> Result<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(Error::Disconnected);
            }
            self.sent.push(input.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_failed_commit_can_be_retried() {
        let sink = FlakySink {
            failures: 1,
            sent: Vec::new(),
        };
        let mut s = Session::new(TextBuffer::new(), sink, Config::default());
        s.write_prompt("$ ").unwrap();
        s.type_input("ls").unwrap();

        assert!(matches!(s.commit_input(), Err(Error::Disconnected)));
        assert_eq!(text(&s), "$ ls");
        assert_eq!(s.user_input().unwrap(), "ls");
        assert_eq!(s.view().output_end(), 2);
        assert_eq!(s.view().prompt_size(), 2);
        assert!(s.history().is_empty());

        assert_eq!(s.commit_input().unwrap(), "ls\n");
        assert_eq!(s.sink().sent, vec!["ls\n".to_string()]);
        assert_eq!(text(&s), "$ ls\n");
        assert_eq!(s.view().output_end(), 5);
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn test_next_command_follows_edited_input() {
        let mut s = session();
        for cmd in ["git status", "ls", "git log"] {
            s.type_input(cmd).unwrap();
            s.commit_input().unwrap();
        }
        s.previous_command().unwrap();
        s.previous_command().unwrap();
        assert_eq!(s.user_input().unwrap(), "ls");

        s.replace_input("git s").unwrap();
        s.next_command().unwrap();
        assert_eq!(s.user_input().unwrap(), "git status");
    }

    #[test]
    fn test_next_command_without_recall() {
        let mut s = session();
        for cmd in ["make", "make test"] {
            s.type_input(cmd).unwrap();
            s.commit_input().unwrap();
        }
        s.next_command().unwrap();
        assert_eq!(s.user_input().unwrap(), "make test");
    }

    #[test]
    fn test_write_sink() {
        let mut sink = WriteSink::new(Vec::new());
        sink.send("ls\n").unwrap();
        assert_eq!(sink.0, b"ls\n");
        NullSink.send("ignored").unwrap();
    }
}
