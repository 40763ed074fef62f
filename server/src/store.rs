use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dates::DateRange;
use crate::errors::BackendError;
use crate::registration::{Registration, RegistrationFields};

pub mod memory;

/// The persistence capability registrations are appended to and listed
/// from. Backend-agnostic: the validator and aggregator never see a
/// concrete engine. The singleton API key lives here too, as a reserved
/// entry alongside the records.
pub trait Store: Send + Sync {
    /// Appends a validated submission, assigning the id and timestamp.
    fn append(&self, fields: RegistrationFields)
        -> BoxFuture<Result<Registration, BackendError>>;

    /// All registrations, newest first. Records without a timestamp
    /// appear last.
    fn list_all(&self) -> BoxFuture<Result<Vec<Registration>, BackendError>>;

    /// The registrations whose timestamp falls within the range, newest
    /// first. Records without a parsable timestamp are excluded.
    fn list_in_range(&self, range: DateRange)
        -> BoxFuture<Result<Vec<Registration>, BackendError>>;

    /// Replaces the fields of an existing registration.
    fn update(
        &self,
        id: &Uuid,
        fields: RegistrationFields,
    ) -> BoxFuture<Result<(), BackendError>>;

    /// Deletes a registration.
    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>>;

    /// The current API key, if one has been generated.
    fn retrieve_api_key(&self) -> BoxFuture<Result<Option<String>, BackendError>>;

    /// Replaces the API key, invalidating the previous one immediately.
    fn replace_api_key(&self, key: String) -> BoxFuture<Result<(), BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::postgres::{PgPool, PgRow};
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::dates::DateRange;
    use crate::errors::BackendError;
    use crate::registration::{Registration, RegistrationFields};

    pub struct PgStore {
        pool: PgPool,
    }

    impl PgStore {
        pub fn new(pool: PgPool) -> Self {
            PgStore { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Store for PgStore {
        fn append(
            &self,
            fields: RegistrationFields,
        ) -> BoxFuture<Result<Registration, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/append.sql"));

                let (id, registered_at): (Uuid, Option<OffsetDateTime>) = query
                    .bind(&fields.name)
                    .bind(&fields.whatsapp)
                    .bind(&fields.email)
                    .bind(&fields.qualification)
                    .bind(&fields.designation)
                    .bind(&fields.gender)
                    .bind(&fields.college)
                    .bind(&fields.blood_donation)
                    .bind(&fields.blood_group)
                    .bind(&fields.webinar_interest)
                    .bind(&fields.webinar_date)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(Registration {
                    id,
                    fields,
                    registered_at,
                })
            }
            .boxed()
        }

        fn list_all(&self) -> BoxFuture<Result<Vec<Registration>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/list_all.sql"));

                let registrations = query
                    .try_map(|row: PgRow| row_to_registration(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(registrations)
            }
            .boxed()
        }

        fn list_in_range(
            &self,
            range: DateRange,
        ) -> BoxFuture<Result<Vec<Registration>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/list_in_range.sql"));

                let registrations = query
                    .bind(range.start)
                    .bind(range.end)
                    .try_map(|row: PgRow| row_to_registration(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(registrations)
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
                let query = sqlx::query(include_str!("queries/update.sql"));

                let count = query
                    .bind(id)
                    .bind(&fields.name)
                    .bind(&fields.whatsapp)
                    .bind(&fields.email)
                    .bind(&fields.qualification)
                    .bind(&fields.designation)
                    .bind(&fields.gender)
                    .bind(&fields.college)
                    .bind(&fields.blood_donation)
                    .bind(&fields.blood_group)
                    .bind(&fields.webinar_interest)
                    .bind(&fields.webinar_date)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentId(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/delete.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentId(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn retrieve_api_key(&self) -> BoxFuture<Result<Option<String>, BackendError>> {
            async move {
                let query =
                    sqlx::query_as(include_str!("queries/retrieve_api_key.sql"));

                let key: Option<(String,)> = query
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(key.map(|(value,)| value))
            }
            .boxed()
        }

        fn replace_api_key(&self, key: String) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/replace_api_key.sql"));

                query
                    .bind(key)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(())
            }
            .boxed()
        }
    }

    fn row_to_registration(row: &PgRow) -> Result<Registration, sqlx::Error> {
        let fields = RegistrationFields {
            name: try_get(row, "name")?,
            whatsapp: try_get(row, "whatsapp")?,
            email: try_get(row, "email")?,
            qualification: try_get(row, "qualification")?,
            designation: try_get(row, "designation")?,
            gender: try_get(row, "gender")?,
            college: try_get(row, "college")?,
            blood_donation: try_get(row, "blood_donation")?,
            blood_group: try_get(row, "blood_group")?,
            webinar_interest: try_get(row, "webinar_interest")?,
            webinar_date: try_get(row, "webinar_date")?,
        };

        Ok(Registration {
            id: try_get(row, "id")?,
            fields,
            registered_at: try_get(row, "registered_at")?,
        })
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        BackendError::Sqlx { source: error }
    }
}
