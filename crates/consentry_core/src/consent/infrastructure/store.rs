//! Keyed storage for consent records and privacy notices.
//!
//! The stores are the only holders of shared mutable state in the consent
//! manager; the lifecycle, token and exchange services are stateless
//! processors over records fetched from and written back here. Concurrent
//! correctness therefore reduces to the conditional-update contract of
//! [`ConsentStore::update`]: every write is conditioned on the version the
//! writer previously read, and a stale writer is rejected with
//! `StoreConflict` instead of silently clobbering a concurrent transition.

use std::sync::Arc;

use dashmap::{DashMap, Entry};

use crate::consent::{
    error::ConsentError,
    infrastructure::records::{ConsentRecord, ConsentStatus, PrivacyNotice},
};

#[derive(Debug, Clone)]
struct VersionedRecord {
    version: u64,
    record: ConsentRecord,
}

/// Thread-safe keyed store of consent records with optimistic concurrency.
#[derive(Default, Debug, Clone)]
pub struct ConsentStore {
    records: Arc<DashMap<String, VersionedRecord>>,
}

impl ConsentStore {
    /// Inserts a new record under its identifier.
    pub fn insert(&self, record: ConsentRecord) -> Result<ConsentRecord, ConsentError> {
        match self.records.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(ConsentError::DuplicateRecord(record.id)),
            Entry::Vacant(vacant) => {
                vacant.insert(VersionedRecord { version: 0, record: record.clone() });
                Ok(record)
            }
        }
    }

    /// Returns a record together with the version to condition updates on.
    pub fn get(&self, id: &str) -> Result<(ConsentRecord, u64), ConsentError> {
        self.records
            .get(id)
            .map(|entry| (entry.record.clone(), entry.version))
            .ok_or_else(|| ConsentError::RecordNotFound(id.to_string()))
    }

    /// Read-modify-write with optimistic concurrency.
    ///
    /// The mutation is applied only if the stored version still matches
    /// `expected_version`; otherwise the write is rejected with
    /// `StoreConflict` and the record is left untouched. A mutation that
    /// returns an error commits nothing.
    pub fn update<F>(
        &self,
        id: &str,
        expected_version: u64,
        mutate: F,
    ) -> Result<ConsentRecord, ConsentError>
    where
        F: FnOnce(&mut ConsentRecord) -> Result<(), ConsentError>,
    {
        let mut entry =
            self.records.get_mut(id).ok_or_else(|| ConsentError::RecordNotFound(id.to_string()))?;
        if entry.version != expected_version {
            return Err(ConsentError::StoreConflict(id.to_string()));
        }
        let mut candidate = entry.record.clone();
        mutate(&mut candidate)?;
        entry.version += 1;
        entry.record = candidate.clone();
        Ok(candidate)
    }

    /// All records owned by the given user, most recently updated first.
    pub fn list_by_user(&self, user: &str) -> Vec<ConsentRecord> {
        let mut records: Vec<ConsentRecord> = self
            .records
            .iter()
            .filter(|entry| entry.record.user.as_deref() == Some(user))
            .map(|entry| entry.record.clone())
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        records
    }

    /// All records between the given provider and consumer participants.
    pub fn list_by_pair(&self, provider: &str, consumer: &str) -> Vec<ConsentRecord> {
        let mut records: Vec<ConsentRecord> = self
            .records
            .iter()
            .filter(|entry| {
                entry.record.data_provider == provider && entry.record.data_consumer == consumer
            })
            .map(|entry| entry.record.clone())
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        records
    }

    /// All records attached to the given contract reference.
    pub fn list_by_contract(&self, contract: &str) -> Vec<ConsentRecord> {
        self.records
            .iter()
            .filter(|entry| entry.record.contract.as_deref() == Some(contract))
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Identifiers of granted records whose validity window elapsed.
    ///
    /// Input of the system-triggered expiry transition; only `Granted`
    /// records are ever due.
    pub fn due_for_expiry(&self, now: u64) -> Vec<String> {
        self.records
            .iter()
            .filter(|entry| {
                entry.record.status == ConsentStatus::Granted
                    && entry.record.valid_until.is_some_and(|until| until <= now)
            })
            .map(|entry| entry.record.id.clone())
            .collect()
    }
}

/// Thread-safe keyed store of privacy notices.
///
/// Notices are append-only from the record's perspective: archiving freezes a
/// notice, after which it can only be read, never changed. Superseding a
/// notice means registering a new version and archiving the old one.
#[derive(Default, Debug, Clone)]
pub struct NoticeStore {
    notices: Arc<DashMap<String, PrivacyNotice>>,
}

impl NoticeStore {
    /// Registers a new notice under its identifier.
    pub fn register(&self, notice: PrivacyNotice) -> Result<PrivacyNotice, ConsentError> {
        match self.notices.entry(notice.id.clone()) {
            Entry::Occupied(occupied) if occupied.get().is_archived() => {
                Err(ConsentError::NoticeArchived(notice.id))
            }
            Entry::Occupied(_) => Err(ConsentError::DuplicateRecord(notice.id)),
            Entry::Vacant(vacant) => {
                vacant.insert(notice.clone());
                Ok(notice)
            }
        }
    }

    /// Resolves a notice reference to its content.
    pub fn resolve(&self, reference: &str) -> Result<PrivacyNotice, ConsentError> {
        self.notices
            .get(reference)
            .map(|notice| notice.value().clone())
            .ok_or_else(|| ConsentError::NoticeNotFound(reference.to_string()))
    }

    /// Freezes a notice; no-op-rejecting if it is already archived.
    pub fn archive(&self, reference: &str, now: u64) -> Result<PrivacyNotice, ConsentError> {
        let mut entry = self
            .notices
            .get_mut(reference)
            .ok_or_else(|| ConsentError::NoticeNotFound(reference.to_string()))?;
        if entry.is_archived() {
            return Err(ConsentError::NoticeArchived(reference.to_string()));
        }
        entry.archived_at = Some(now);
        Ok(entry.value().clone())
    }

    /// Live notices offered between the given participant pair.
    pub fn list_by_pair(&self, provider: &str, consumer: &str) -> Vec<PrivacyNotice> {
        self.notices
            .iter()
            .filter(|notice| {
                !notice.is_archived()
                    && notice.data_provider == provider
                    && notice.data_consumer == consumer
            })
            .map(|notice| notice.value().clone())
            .collect()
    }

    /// Live notices attached to the given contract reference.
    pub fn list_by_contract(&self, contract: &str) -> Vec<PrivacyNotice> {
        self.notices
            .iter()
            .filter(|notice| !notice.is_archived() && notice.contract.as_deref() == Some(contract))
            .map(|notice| notice.value().clone())
            .collect()
    }

    /// Live notices in which the participant appears on either side.
    pub fn list_for_participant(&self, participant: &str) -> Vec<PrivacyNotice> {
        self.notices
            .iter()
            .filter(|notice| {
                !notice.is_archived()
                    && (notice.data_provider == participant || notice.data_consumer == participant)
            })
            .map(|notice| notice.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::infrastructure::records::ConsentIntent;

    fn record(user: &str, provider: &str, consumer: &str) -> ConsentRecord {
        ConsentRecord::from_intent(
            ConsentIntent {
                user: Some(user.to_string()),
                data_provider: provider.to_string(),
                data_consumer: consumer.to_string(),
                ..Default::default()
            },
            0,
        )
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let store = ConsentStore::default();
        let record = store.insert(record("user-1", "did:prov", "did:cons")).unwrap();
        let (fetched, version) = store.get(&record.id).unwrap();
        assert_eq!(fetched, record);
        assert_eq!(version, 0);
        assert_eq!(store.insert(record), Err(ConsentError::DuplicateRecord(fetched.id)));
    }

    #[test]
    fn test_update_rejects_stale_version() {
        let store = ConsentStore::default();
        let record = store.insert(record("user-1", "did:prov", "did:cons")).unwrap();
        let (_, version) = store.get(&record.id).unwrap();

        store
            .update(&record.id, version, |r| {
                r.status = ConsentStatus::Granted;
                Ok(())
            })
            .unwrap();

        // Same version again: the first writer won, the second is stale.
        assert_eq!(
            store.update(&record.id, version, |r| {
                r.status = ConsentStatus::Revoked;
                Ok(())
            }),
            Err(ConsentError::StoreConflict(record.id.clone()))
        );
        let (stored, new_version) = store.get(&record.id).unwrap();
        assert_eq!(stored.status, ConsentStatus::Granted);
        assert_eq!(new_version, 1);
    }

    #[test]
    fn test_update_failure_commits_nothing() {
        let store = ConsentStore::default();
        let record = store.insert(record("user-1", "did:prov", "did:cons")).unwrap();
        let (before, version) = store.get(&record.id).unwrap();

        let result = store.update(&record.id, version, |r| {
            r.status = ConsentStatus::Granted;
            Err(ConsentError::InternalConsentryError)
        });
        assert_eq!(result, Err(ConsentError::InternalConsentryError));

        let (after, after_version) = store.get(&record.id).unwrap();
        assert_eq!(after, before);
        assert_eq!(after_version, version);
    }

    #[test]
    fn test_queries_by_user_and_pair() {
        let store = ConsentStore::default();
        store.insert(record("user-1", "did:prov", "did:cons")).unwrap();
        store.insert(record("user-1", "did:prov", "did:other")).unwrap();
        store.insert(record("user-2", "did:prov", "did:cons")).unwrap();

        assert_eq!(store.list_by_user("user-1").len(), 2);
        assert_eq!(store.list_by_user("user-3").len(), 0);
        assert_eq!(store.list_by_pair("did:prov", "did:cons").len(), 2);
        assert_eq!(store.list_by_pair("did:cons", "did:prov").len(), 0);
    }

    #[test]
    fn test_due_for_expiry_only_granted_with_elapsed_window() {
        let store = ConsentStore::default();
        let mut granted_due = record("user-1", "did:prov", "did:cons");
        granted_due.status = ConsentStatus::Granted;
        granted_due.valid_until = Some(100);
        let mut granted_live = record("user-1", "did:prov", "did:cons");
        granted_live.status = ConsentStatus::Granted;
        granted_live.valid_until = Some(1_000);
        let mut pending_due = record("user-1", "did:prov", "did:cons");
        pending_due.valid_until = Some(100);

        let due_id = granted_due.id.clone();
        store.insert(granted_due).unwrap();
        store.insert(granted_live).unwrap();
        store.insert(pending_due).unwrap();

        assert_eq!(store.due_for_expiry(500), vec![due_id]);
    }

    #[test]
    fn test_notice_archive_is_final() {
        let store = NoticeStore::default();
        let notice = PrivacyNotice {
            id: "notice-1".to_string(),
            title: "v1".to_string(),
            data_provider: "did:prov".to_string(),
            ..Default::default()
        };
        store.register(notice.clone()).unwrap();
        store.archive("notice-1", 10).unwrap();

        assert_eq!(
            store.archive("notice-1", 20),
            Err(ConsentError::NoticeArchived("notice-1".to_string()))
        );
        assert_eq!(
            store.register(notice),
            Err(ConsentError::NoticeArchived("notice-1".to_string()))
        );
        // Archived notices resolve but are excluded from offer listings.
        assert!(store.resolve("notice-1").unwrap().is_archived());
        assert!(store.list_for_participant("did:prov").is_empty());
    }
}
