//! Human-in-the-loop pause: the pipeline blocks until an operator sends a resume
//! signal. Signals come from a channel, so tests drive the gate directly and the
//! CLI feeds it from stdin.

use crate::utils::error::GateError;
use tokio::sync::{mpsc, Mutex};

pub struct ResumeGate {
    receiver: Mutex<mpsc::UnboundedReceiver<()>>,
}

/// Sending half of a [`ResumeGate`]. Dropping every trigger cancels pending waits.
#[derive(Clone)]
pub struct ResumeTrigger {
    sender: mpsc::UnboundedSender<()>,
}

impl ResumeTrigger {
    /// Returns `false` once the gate is gone.
    pub fn resume(&self) -> bool {
        self.sender.send(()).is_ok()
    }
}

impl ResumeGate {
    pub fn channel() -> (ResumeGate, ResumeTrigger) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            ResumeGate {
                receiver: Mutex::new(receiver),
            },
            ResumeTrigger { sender },
        )
    }

    /// Blocks until the next resume signal. Signals sent before the wait started are discarded.
    pub async fn wait(&self, reason: &str) -> Result<(), GateError> {
        let mut receiver = self.receiver.lock().await;
        while receiver.try_recv().is_ok() {}

        tracing::warn!("⏸️  {} - press ENTER to continue", reason);
        match receiver.recv().await {
            Some(()) => {
                tracing::info!("▶️  Resumed: {}", reason);
                Ok(())
            }
            None => Err(GateError::Closed {
                reason: reason.to_string(),
            }),
        }
    }
}

/// Turns every line on stdin into a resume signal. Runs on a detached OS thread so
/// a pending read never holds up runtime shutdown.
pub fn spawn_stdin_trigger(trigger: ResumeTrigger) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if !trigger.resume() {
                        break;
                    }
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_resumes_on_signal() {
        let (gate, trigger) = ResumeGate::channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.resume();
        });
        tokio_test::assert_ok!(gate.wait("manual inspection").await);
    }

    #[tokio::test]
    async fn test_stale_signal_does_not_skip_wait() {
        let (gate, trigger) = ResumeGate::channel();
        trigger.resume();
        let waited = tokio::time::timeout(Duration::from_millis(50), gate.wait("captcha")).await;
        assert!(waited.is_err(), "a signal sent before the wait must not release it");
    }

    #[tokio::test]
    async fn test_dropped_trigger_cancels_wait() {
        let (gate, trigger) = ResumeGate::channel();
        drop(trigger);
        let err = gate.wait("captcha").await.unwrap_err();
        assert_eq!(
            err,
            GateError::Closed {
                reason: "captcha".into()
            }
        );
    }
}
