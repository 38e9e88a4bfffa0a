//! The status console: a channel of messages drained by a printer task, so
//! workers can report progress while the front end waits on input.

use chrono::Local;
use log::info;
use std::io::Write;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum ConsoleMessage {
    Line(String),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct StatusConsole {
    tx: mpsc::UnboundedSender<ConsoleMessage>,
}

impl StatusConsole {
    pub fn spawn_stdout() -> (Self, JoinHandle<()>) {
        Self::spawn(std::io::stdout())
    }

    pub fn spawn<W: Write + Send + 'static>(mut writer: W) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    ConsoleMessage::Line(line) => {
                        let _ = writeln!(writer, "[{}] {}", Local::now().format("%H:%M:%S"), line);
                        let _ = writer.flush();
                    }
                    ConsoleMessage::Flush(done) => {
                        let _ = writer.flush();
                        let _ = done.send(());
                    }
                }
            }
        });
        (Self { tx }, handle)
    }

    pub fn append(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        // the printer only stops once every sender is gone
        let _ = self.tx.send(ConsoleMessage::Line(message));
    }

    /// Waits until everything appended so far has been written.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(ConsoleMessage::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// A `Write` whose contents can be read back after the printer ran.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn lines_are_written_in_order() {
        let buffer = SharedBuffer::default();
        let (console, printer) = StatusConsole::spawn(buffer.clone());

        console.append("Logging in...");
        console.clone().append("Log in successfully");
        console.flush().await;

        let out = buffer.contents();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] Logging in..."));
        assert!(lines[1].ends_with("] Log in successfully"));

        drop(console);
        printer.await.unwrap();
    }
}
