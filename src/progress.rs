//! Console spinner shown while a report is being built.
//!
//! The spinner is its own tokio task and only ever reads the stop signal,
//! so the blocking report work and the animation never wait on each other.

use std::io::Write;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const TICK: Duration = Duration::from_millis(100);

pub struct Spinner {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Spinner {
    /// Starts spinning on stderr.
    pub fn start(message: impl Into<String>) -> Self {
        Self::start_with_writer(message, std::io::stderr())
    }

    pub fn start_with_writer<W>(message: impl Into<String>, mut writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        let message = message.into();
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            let mut frame = 0;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        write!(writer, "\r{message} ... {} ", FRAMES[frame % FRAMES.len()]).ok();
                        writer.flush().ok();
                        frame += 1;
                    }
                    // a dropped sender stops the spinner as well
                    _ = stopped.changed() => break,
                }
            }
            writeln!(writer, "\rDone!{:width$}", "", width = message.len() + 4).ok();
            writer.flush().ok();
        });
        Self { stop, handle }
    }

    /// Signals the task to stop and waits for its final line.
    pub async fn stop(self) {
        self.stop.send(true).ok();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "spinner task failed");
        }
    }
}
