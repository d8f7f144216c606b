//! Background work for the UI thread.
//!
//! Each task runs on its own thread and reports back exactly once through a
//! shared channel. Nothing here is cancellable: a scheduled submission is
//! delivered even if the screen that queued it is gone.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::form::InlineImage;
use crate::post::PostDraft;
use crate::upload::{self, UploadError};

#[derive(Debug)]
pub enum Completion {
    Submission {
        draft: PostDraft,
    },
    Upload {
        request_id: u64,
        path: PathBuf,
        result: Result<InlineImage, UploadError>,
    },
}

pub struct TaskRunner {
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    next_request_id: u64,
    pending_submissions: usize,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunner {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            next_request_id: 1,
            pending_submissions: 0,
        }
    }

    /// Delivers `draft` back to the UI thread after `delay`.
    pub fn schedule_submission(&mut self, delay: Duration, draft: PostDraft) {
        self.pending_submissions += 1;
        tracing::debug!(?delay, title = %draft.title, "scheduled submission");
        let tx = self.tx.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = tx.send(Completion::Submission { draft });
        });
    }

    /// Starts reading `path` into a data URL and returns the request id.
    pub fn start_upload(&mut self, path: PathBuf, max_bytes: u64) -> u64 {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        tracing::debug!(request_id, path = %path.display(), "reading upload");
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = upload::read_inline_image(&path, max_bytes);
            let _ = tx.send(Completion::Upload {
                request_id,
                path,
                result,
            });
        });
        request_id
    }

    pub fn is_submitting(&self) -> bool {
        self.pending_submissions > 0
    }

    /// Drains every completion that has arrived so far.
    pub fn poll(&mut self) -> Vec<Completion> {
        let ready: Vec<Completion> = self.rx.try_iter().collect();
        for completion in &ready {
            self.account(completion);
        }
        ready
    }

    /// Blocks for the next completion, up to `timeout`.
    pub fn wait(&mut self, timeout: Duration) -> Option<Completion> {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.account(&completion);
                Some(completion)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn account(&mut self, completion: &Completion) {
        if matches!(completion, Completion::Submission { .. }) {
            self.pending_submissions = self.pending_submissions.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::tests::PNG_HEADER;
    use std::fs;
    use tempfile::tempdir;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn submission_arrives_after_delay() {
        let mut tasks = TaskRunner::new();
        tasks.schedule_submission(Duration::from_millis(10), PostDraft::new("Kites", "", ""));
        assert!(tasks.is_submitting());
        match tasks.wait(WAIT) {
            Some(Completion::Submission { draft }) => assert_eq!(draft.title, "Kites"),
            other => panic!("unexpected completion: {other:?}"),
        }
        assert!(!tasks.is_submitting());
    }

    #[test]
    fn overlapping_submissions_keep_loading_until_last() {
        let mut tasks = TaskRunner::new();
        tasks.schedule_submission(Duration::from_millis(1), PostDraft::new("one", "", ""));
        tasks.schedule_submission(Duration::from_millis(50), PostDraft::new("two", "", ""));
        assert!(tasks.wait(WAIT).is_some());
        assert!(tasks.is_submitting());
        assert!(tasks.wait(WAIT).is_some());
        assert!(!tasks.is_submitting());
    }

    #[test]
    fn upload_reports_once_with_its_request_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kite.png");
        fs::write(&path, PNG_HEADER).unwrap();

        let mut tasks = TaskRunner::new();
        let first = tasks.start_upload(path.clone(), 1024);
        let second = tasks.start_upload(dir.path().join("missing.png"), 1024);
        assert_ne!(first, second);

        let mut seen = Vec::new();
        while let Some(completion) = tasks.wait(WAIT) {
            if let Completion::Upload {
                request_id, result, ..
            } = completion
            {
                seen.push((request_id, result.is_ok()));
            }
            if seen.len() == 2 {
                break;
            }
        }
        seen.sort();
        assert_eq!(seen, vec![(first, true), (second, false)]);
        assert!(tasks.poll().is_empty());
    }
}
