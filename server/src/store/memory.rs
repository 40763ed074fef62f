use std::cmp::Reverse;
use std::sync::RwLock;

use futures::future::{BoxFuture, FutureExt};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dates::DateRange;
use crate::errors::BackendError;
use crate::registration::{Registration, RegistrationFields};
use crate::store::Store;

/// An in-memory store used as a test fixture.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Registration>>,
    api_key: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record as-is, without assigning an id or timestamp.
    /// Lets tests stage records with historical or missing timestamps.
    pub fn insert_raw(&self, registration: Registration) {
        self.records.write().unwrap().push(registration);
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot_newest_first(&self) -> Vec<Registration> {
        let mut records = self.records.read().unwrap().clone();
        records.sort_by_key(|record| (record.registered_at.is_none(), Reverse(record.registered_at)));

        records
    }
}

impl Store for MemoryStore {
    fn append(
        &self,
        fields: RegistrationFields,
    ) -> BoxFuture<Result<Registration, BackendError>> {
        async move {
            let registration = Registration {
                id: Uuid::new_v4(),
                fields,
                registered_at: Some(OffsetDateTime::now_utc()),
            };

            self.records.write().unwrap().push(registration.clone());

            Ok(registration)
        }
        .boxed()
    }

    fn list_all(&self) -> BoxFuture<Result<Vec<Registration>, BackendError>> {
        async move { Ok(self.snapshot_newest_first()) }.boxed()
    }

    fn list_in_range(
        &self,
        range: DateRange,
    ) -> BoxFuture<Result<Vec<Registration>, BackendError>> {
        async move {
            let mut records = self.snapshot_newest_first();
            records.retain(|record| range.contains(record.registered_at));

            Ok(records)
        }
        .boxed()
    }

    fn update(
        &self,
        id: &Uuid,
        fields: RegistrationFields,
    ) -> BoxFuture<Result<(), BackendError>> {
        let id = *id;

        async move {
            let mut records = self.records.write().unwrap();

            match records.iter_mut().find(|record| record.id == id) {
                Some(record) => {
                    record.fields = fields;
                    Ok(())
                }
                None => Err(BackendError::NonExistentId(id)),
            }
        }
        .boxed()
    }

    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let id = *id;

        async move {
            let mut records = self.records.write().unwrap();
            let before = records.len();
            records.retain(|record| record.id != id);

            if records.len() == before {
                Err(BackendError::NonExistentId(id))
            } else {
                Ok(())
            }
        }
        .boxed()
    }

    fn retrieve_api_key(&self) -> BoxFuture<Result<Option<String>, BackendError>> {
        async move { Ok(self.api_key.read().unwrap().clone()) }.boxed()
    }

    fn replace_api_key(&self, key: String) -> BoxFuture<Result<(), BackendError>> {
        async move {
            *self.api_key.write().unwrap() = Some(key);

            Ok(())
        }
        .boxed()
    }
}
