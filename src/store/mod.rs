use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::wire::{ElementEdit, GeneratedSite, SiteSummary};

/// Volatile storage for generated sites and their element edits.
///
/// Created once at startup and shared behind an `Arc`. Nothing is persisted;
/// everything is gone on restart.
#[derive(Default)]
pub struct SiteStore {
    sites: RwLock<HashMap<Uuid, GeneratedSite>>,
    edits: RwLock<HashMap<Uuid, Vec<ElementEdit>>>,
}

impl SiteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last writer wins.
    pub fn save(&self, site: GeneratedSite) {
        self.sites.write().insert(site.id, site);
    }

    pub fn get(&self, id: Uuid) -> Option<GeneratedSite> {
        self.sites.read().get(&id).cloned()
    }

    /// Newest first.
    pub fn list(&self) -> Vec<SiteSummary> {
        let mut out: Vec<SiteSummary> =
            self.sites.read().values().map(GeneratedSite::summary).collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out
    }

    /// Replaces the edit for the same element in place, otherwise appends.
    /// The scan and the write happen under one lock.
    pub fn save_edit(&self, edit: ElementEdit) {
        let mut edits = self.edits.write();
        let list = edits.entry(edit.site_id).or_default();
        match list.iter_mut().find(|e| e.element_id == edit.element_id) {
            Some(slot) => *slot = edit,
            None => list.push(edit),
        }
    }

    pub fn get_edits(&self, site_id: Uuid) -> Vec<ElementEdit> {
        self.edits.read().get(&site_id).cloned().unwrap_or_default()
    }
}
