use anyhow::Context;
use sqlx::{Sqlite, SqliteExecutor, SqlitePool, Transaction};
use time::OffsetDateTime;

use super::repo_types::{AdoptionRequestRow, RequestStatus};
use crate::pets::repo::SELECT_PET;
use crate::pets::repo_types::PetRow;

const SELECT_REQUEST: &str = r#"
    SELECT r.id, r.pet_id, p.name AS pet_name, p.owner_id AS pet_owner_id,
           r.user_id, u.username AS requester_username, r.message, r.status,
           r.request_date
      FROM adoption_requests r
      JOIN pets p ON p.id = r.pet_id
      JOIN users u ON u.id = r.user_id
"#;

pub async fn get<'e, E>(db: E, request_id: i64) -> anyhow::Result<Option<AdoptionRequestRow>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{SELECT_REQUEST} WHERE r.id = ?");
    let row = sqlx::query_as::<_, AdoptionRequestRow>(&sql)
        .bind(request_id)
        .fetch_optional(db)
        .await
        .context("get adoption request")?;
    Ok(row)
}

/// Whether `user_id` has ever requested `pet_id`, whatever the outcome.
pub async fn exists_for_pair_tx(
    tx: &mut Transaction<'_, Sqlite>,
    pet_id: i64,
    user_id: i64,
) -> anyhow::Result<bool> {
    let found = sqlx::query_scalar::<_, i64>(
        r#"SELECT 1 FROM adoption_requests WHERE pet_id = ? AND user_id = ? LIMIT 1"#,
    )
    .bind(pet_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await
    .context("check existing adoption request")?;
    Ok(found.is_some())
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Sqlite>,
    pet_id: i64,
    user_id: i64,
    message: Option<&str>,
) -> anyhow::Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO adoption_requests (pet_id, user_id, message, status, request_date)
        VALUES (?, ?, ?, 'Pending', ?)
        RETURNING id
        "#,
    )
    .bind(pet_id)
    .bind(user_id)
    .bind(message)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(&mut **tx)
    .await
    .context("insert adoption request")?;
    Ok(id)
}

/// Newest first; ids grow with creation time.
pub async fn list_by_requester(db: &SqlitePool, user_id: i64) -> anyhow::Result<Vec<AdoptionRequestRow>> {
    let sql = format!("{SELECT_REQUEST} WHERE r.user_id = ? ORDER BY r.id DESC");
    let rows = sqlx::query_as::<_, AdoptionRequestRow>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list requests by requester")?;
    Ok(rows)
}

/// Pending requests on pets owned by `owner_id`, oldest first.
pub async fn list_pending_for_owner(
    db: &SqlitePool,
    owner_id: i64,
    pet_id: Option<i64>,
) -> anyhow::Result<Vec<AdoptionRequestRow>> {
    let sql = format!(
        "{SELECT_REQUEST}
         WHERE p.owner_id = ?1
           AND (?2 IS NULL OR r.pet_id = ?2)
           AND r.status = 'Pending'
         ORDER BY r.id ASC"
    );
    let rows = sqlx::query_as::<_, AdoptionRequestRow>(&sql)
        .bind(owner_id)
        .bind(pet_id)
        .fetch_all(db)
        .await
        .context("list pending requests for owner")?;
    Ok(rows)
}

/// Pets behind the user's approved requests.
pub async fn list_adopted_pets(db: &SqlitePool, user_id: i64) -> anyhow::Result<Vec<PetRow>> {
    let sql = format!(
        "{SELECT_PET}
         JOIN adoption_requests r ON r.pet_id = p.id
         WHERE r.user_id = ? AND r.status = 'Approved'
         ORDER BY r.id DESC"
    );
    let rows = sqlx::query_as::<_, PetRow>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list adopted pets")?;
    Ok(rows)
}

pub async fn set_status_tx(
    tx: &mut Transaction<'_, Sqlite>,
    request_id: i64,
    status: RequestStatus,
) -> anyhow::Result<()> {
    sqlx::query(r#"UPDATE adoption_requests SET status = ? WHERE id = ?"#)
        .bind(status.as_str())
        .bind(request_id)
        .execute(&mut **tx)
        .await
        .context("set adoption request status")?;
    Ok(())
}

/// Rejects every other request on the pet, whatever its current status.
pub async fn reject_siblings_tx(
    tx: &mut Transaction<'_, Sqlite>,
    pet_id: i64,
    except_id: i64,
) -> anyhow::Result<u64> {
    let res = sqlx::query(
        r#"UPDATE adoption_requests SET status = 'Rejected' WHERE pet_id = ? AND id <> ?"#,
    )
    .bind(pet_id)
    .bind(except_id)
    .execute(&mut **tx)
    .await
    .context("reject sibling requests")?;
    Ok(res.rows_affected())
}
