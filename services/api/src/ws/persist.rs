//! Stores session updates as the interview tools publish them.
//!
//! The drain runs in its own task, so a failed turn or a dropped socket
//! cannot strand updates that were already published.

use super::protocol::ServerMessage;
use crate::db::Db;
use anyhow::Result;
use async_trait::async_trait;
use interviewer_core::{InterviewSession, agent::SessionUpdate, scoring::InterviewSummary};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

/// Where session snapshots and final reports are written.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, interview_id: Uuid, session: &InterviewSession) -> Result<()>;
    async fn save_report(&self, interview_id: Uuid, summary: &InterviewSummary) -> Result<()>;
}

#[async_trait]
impl SessionStore for Db {
    async fn save_session(&self, interview_id: Uuid, session: &InterviewSession) -> Result<()> {
        Db::save_session(self, interview_id, session).await
    }

    async fn save_report(&self, interview_id: Uuid, summary: &InterviewSummary) -> Result<()> {
        Db::save_report(self, interview_id, serde_json::to_value(summary)?).await?;
        Ok(())
    }
}

/// Drains `updates` until every sender is gone.
///
/// Each update is stored before it is forwarded to `outbox`. A failed write
/// is logged and the drain continues. `completed` is raised once the final
/// report has been handled.
pub async fn persist_updates(
    store: Arc<dyn SessionStore>,
    interview_id: Uuid,
    mut updates: mpsc::Receiver<SessionUpdate>,
    outbox: mpsc::UnboundedSender<ServerMessage>,
    completed: Arc<AtomicBool>,
) {
    while let Some(update) = updates.recv().await {
        let msg = match update {
            SessionUpdate::Snapshot(session) => {
                if let Err(e) = store.save_session(interview_id, &session).await {
                    error!(error = ?e, "Failed to save session snapshot");
                }
                ServerMessage::StateUpdate { session }
            }
            SessionUpdate::Completed(summary) => {
                match store.save_report(interview_id, &summary).await {
                    Ok(()) => info!(
                        avg_technical_score = summary.avg_technical_score,
                        avg_behavioral_score = summary.avg_behavioral_score,
                        "Interview report saved"
                    ),
                    Err(e) => error!(error = ?e, "Failed to save interview report"),
                }
                completed.store(true, Ordering::SeqCst);
                ServerMessage::InterviewCompleted { summary }
            }
        };
        // The client may already be gone; the write above is what counts.
        let _ = outbox.send(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        sessions: Mutex<Vec<InterviewSession>>,
        reports: Mutex<Vec<InterviewSummary>>,
        fail_snapshots: bool,
    }

    #[async_trait]
    impl SessionStore for MemoryStore {
        async fn save_session(&self, _: Uuid, session: &InterviewSession) -> Result<()> {
            if self.fail_snapshots {
                bail!("database unavailable");
            }
            self.sessions.lock().unwrap().push(session.clone());
            Ok(())
        }

        async fn save_report(&self, _: Uuid, summary: &InterviewSummary) -> Result<()> {
            self.reports.lock().unwrap().push(summary.clone());
            Ok(())
        }
    }

    fn finished_session() -> (InterviewSession, InterviewSummary) {
        let start = Utc.with_ymd_and_hms(2024, 5, 20, 14, 0, 0).unwrap();
        let mut session = InterviewSession::new(start);
        session.set_candidate_info("Ada", "Software Engineer");
        session.force_complete();
        let summary = InterviewSummary::build(&session, "Strong", start);
        (session, summary)
    }

    #[tokio::test]
    async fn test_updates_are_stored_after_the_client_is_gone() {
        let store = Arc::new(MemoryStore::default());
        let (tx, rx) = mpsc::channel(8);
        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        drop(outbox_rx);
        let completed = Arc::new(AtomicBool::new(false));

        let (session, summary) = finished_session();
        tx.send(SessionUpdate::Snapshot(session.clone())).await.unwrap();
        tx.send(SessionUpdate::Completed(summary.clone())).await.unwrap();
        drop(tx);

        persist_updates(store.clone(), Uuid::nil(), rx, outbox, completed.clone()).await;

        assert_eq!(*store.sessions.lock().unwrap(), vec![session]);
        assert_eq!(*store.reports.lock().unwrap(), vec![summary]);
        assert!(completed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_snapshot_does_not_stop_the_report() {
        let store = Arc::new(MemoryStore {
            fail_snapshots: true,
            ..Default::default()
        });
        let (tx, rx) = mpsc::channel(8);
        let (outbox, mut outbox_rx) = mpsc::unbounded_channel();
        let completed = Arc::new(AtomicBool::new(false));

        let (session, summary) = finished_session();
        tx.send(SessionUpdate::Snapshot(session)).await.unwrap();
        tx.send(SessionUpdate::Completed(summary)).await.unwrap();
        drop(tx);

        persist_updates(store.clone(), Uuid::nil(), rx, outbox, completed.clone()).await;

        assert!(store.sessions.lock().unwrap().is_empty());
        assert_eq!(store.reports.lock().unwrap().len(), 1);
        assert!(matches!(
            outbox_rx.recv().await,
            Some(ServerMessage::StateUpdate { .. })
        ));
        assert!(matches!(
            outbox_rx.recv().await,
            Some(ServerMessage::InterviewCompleted { .. })
        ));
    }
}
