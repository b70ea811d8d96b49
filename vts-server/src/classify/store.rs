//! In-memory violation store
//!
//! An owned, encapsulated snapshot of one user's violation records, ordered
//! by sequence number. Handlers rebuild it wholesale from the database and
//! hand references to the pure classification functions; nothing holds a
//! store across requests, so a realtime refresh can never swap the list out
//! from under an in-flight mutation.

use uuid::Uuid;
use vts_common::models::ViolationRecord;

use super::level::HistoryEntry;

#[derive(Debug, Clone, Default)]
pub struct ViolationStore {
    records: Vec<ViolationRecord>,
}

impl ViolationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from rows, sorting by `no`.
    pub fn from_rows(rows: Vec<ViolationRecord>) -> Self {
        let mut store = Self { records: rows };
        store.sort();
        store
    }

    /// Replace the whole contents (wholesale rebuild on load/refresh).
    pub fn replace_all(&mut self, rows: Vec<ViolationRecord>) {
        self.records = rows;
        self.sort();
    }

    pub fn apply_create(&mut self, record: ViolationRecord) {
        self.records.push(record);
        self.sort();
    }

    /// Replace the record with the same id, if present.
    pub fn apply_update(&mut self, record: ViolationRecord) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
            self.sort();
        }
    }

    pub fn apply_delete(&mut self, id: Uuid) {
        self.records.retain(|r| r.id != id);
    }

    pub fn snapshot(&self) -> &[ViolationRecord] {
        &self.records
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<&ViolationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Any record holding this receipt number, other than `exclude_id`.
    pub fn receipt_in_use(&self, receipt: &str, exclude_id: Option<Uuid>) -> Option<&ViolationRecord> {
        self.records.iter().find(|r| {
            r.status.receipt_number() == Some(receipt) && Some(r.id) != exclude_id
        })
    }

    /// History entries for the offense-level resolver.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.records.iter().map(HistoryEntry::from).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sort(&mut self) {
        self.records.sort_by_key(|r| r.no);
    }
}
