use crate::ingest::{self, ImageSource, IngestLimits, SkippedFile};
use crate::models::{EventDraft, PlanEvent};
use crate::store::EventStore;
use crate::sync::SyncAdapter;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of committing one image batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// How many payloads were appended to the target.
    pub appended: usize,
    /// Files that were skipped, with user-presentable reasons.
    pub skipped: Vec<SkippedFile>,
}

/// Orchestrates the plan collection: CRUD, the draft/edit form, the open
/// detail view, and image-batch commits. All persisted mutations go through
/// the store and come back via the sync adapter; the single exception is the
/// optimistic patch of the open detail view after an image write.
pub struct Planner {
    store: Arc<dyn EventStore>,
    sync: SyncAdapter,
    limits: IngestLimits,
    draft: EventDraft,
    editing_id: Option<String>,
    detail: Option<PlanEvent>,
}

impl Planner {
    pub fn new(store: Arc<dyn EventStore>, limits: IngestLimits, backoff: Duration) -> Self {
        let sync = SyncAdapter::new(store.clone(), backoff);
        Self {
            store,
            sync,
            limits,
            draft: EventDraft::blank(chrono::Utc::now().date_naive()),
            editing_id: None,
            detail: None,
        }
    }

    /// Start mirroring the remote collection.
    pub fn start(&self) {
        self.sync.subscribe();
    }

    /// Stop mirroring. Called once when the owning view goes away.
    pub fn close(&self) {
        self.sync.shutdown();
    }

    pub fn sync(&self) -> &SyncAdapter {
        &self.sync
    }

    /// Current mirrored event list.
    pub fn events(&self) -> Vec<PlanEvent> {
        self.sync.snapshot()
    }

    pub fn draft(&self) -> &EventDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut EventDraft {
        &mut self.draft
    }

    pub fn detail(&self) -> Option<&PlanEvent> {
        self.detail.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing_id.is_some()
    }

    fn find_event(&self, id: &str) -> Result<PlanEvent> {
        self.sync
            .snapshot()
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| anyhow!("no plan with id {}", id))
    }

    /// Open the detail view for one plan.
    pub fn open_detail(&mut self, id: &str) -> Result<()> {
        self.detail = Some(self.find_event(id)?);
        Ok(())
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    /// Switch to the edit form, pre-populated from the existing plan (the
    /// stored date becomes the editable string form).
    pub fn begin_edit(&mut self, id: &str) -> Result<()> {
        let ev = self.find_event(id)?;
        self.draft = EventDraft::from_event(&ev);
        self.editing_id = Some(ev.id);
        self.detail = None;
        Ok(())
    }

    /// Discard the form without saving.
    pub fn cancel_draft(&mut self) {
        self.reset_draft();
    }

    fn reset_draft(&mut self) {
        self.draft = EventDraft::blank(chrono::Utc::now().date_naive());
        self.editing_id = None;
    }

    /// Validate and persist the form. Creates a new record (store assigns
    /// the id) or updates the record being edited in place. Returns the id.
    pub async fn save_draft(&mut self) -> Result<String> {
        let record = self.draft.validate()?;
        let id = match &self.editing_id {
            Some(id) => {
                self.store.update_event(id, &record).await?;
                info!("updated plan {}", id);
                id.clone()
            }
            None => {
                let id = self.store.create_event(&record).await?;
                info!("created plan {}", id);
                id
            }
        };
        self.reset_draft();
        Ok(id)
    }

    /// Delete a plan. Never acts without `confirmed`; returns false when the
    /// confirmation was missing so the caller can prompt. Closes the detail
    /// view if it references the deleted record.
    pub async fn delete_event(&mut self, id: &str, confirmed: bool) -> Result<bool> {
        if !confirmed {
            return Ok(false);
        }
        self.store.delete_event(id).await?;
        info!("deleted plan {}", id);
        if self.detail.as_ref().map(|d| d.id.as_str()) == Some(id) {
            self.detail = None;
        }
        Ok(true)
    }

    /// Run one upload batch and commit the results.
    ///
    /// With a detail view open this is a single read-modify-write against
    /// the store (current sequence + new payloads, whole sequence written
    /// back) followed by an optimistic patch of the open view — the one
    /// sanctioned bypass of the sync path. Otherwise the payloads go into
    /// the draft form locally. A store write failure leaves local state
    /// untouched; per-file skips never abort the batch.
    pub async fn attach_images(&mut self, files: Vec<ImageSource>) -> Result<BatchReport> {
        let outcome = ingest::process_batch(files, self.limits).await;
        for skip in &outcome.skipped {
            warn!("upload skipped {}: {}", skip.name, skip.reason);
        }
        let mut report = BatchReport { appended: 0, skipped: outcome.skipped };
        if outcome.images.is_empty() {
            return Ok(report);
        }
        let payloads: Vec<String> = outcome.images.into_iter().map(|i| i.data_uri).collect();
        report.appended = payloads.len();

        match &mut self.detail {
            Some(detail) => {
                let mut images = detail.images.clone();
                images.extend(payloads);
                self.store.update_images(&detail.id, &images).await?;
                detail.images = images;
                info!(
                    "appended {} images to plan {} ({} total)",
                    report.appended,
                    detail.id,
                    detail.images.len()
                );
            }
            None => {
                self.draft.images.extend(payloads);
            }
        }
        Ok(report)
    }

    /// Remove one image by position, from the open detail view (persisted,
    /// then patched locally) or from the draft form.
    pub async fn remove_image(&mut self, index: usize) -> Result<()> {
        match &mut self.detail {
            Some(detail) => {
                if index >= detail.images.len() {
                    return Err(anyhow!("no image at position {}", index));
                }
                let mut images = detail.images.clone();
                images.remove(index);
                self.store.update_images(&detail.id, &images).await?;
                detail.images = images;
            }
            None => {
                if index >= self.draft.images.len() {
                    return Err(anyhow!("no image at position {}", index));
                }
                self.draft.images.remove(index);
            }
        }
        Ok(())
    }
}
