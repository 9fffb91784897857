use anyhow::Context;
use sqlx::{Sqlite, SqliteExecutor, SqlitePool, Transaction};
use time::OffsetDateTime;

use super::repo_types::{PetAttributes, PetCounts, PetRow};

pub(crate) const SELECT_PET: &str = r#"
    SELECT p.id, p.name, p.category, p.age, p.breed, p.description, p.image,
           p.available, p.owner_id, u.username AS owner_username, p.contact_email,
           p.adopted, p.approved, p.created_at
      FROM pets p
      JOIN users u ON u.id = p.owner_id
"#;

/// `%query%` for LIKE, with the query's own wildcards escaped.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 2);
    out.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Pets matching `query` on name, breed or category (case-insensitive substring),
/// optionally restricted to one owner. Newest first.
pub async fn search(
    db: &SqlitePool,
    query: Option<&str>,
    owner_id: Option<i64>,
) -> anyhow::Result<Vec<PetRow>> {
    let sql = format!(
        r#"{SELECT_PET}
         WHERE (?1 IS NULL OR p.owner_id = ?1)
           AND (?2 IS NULL
                OR p.name LIKE ?2 ESCAPE '\'
                OR p.breed LIKE ?2 ESCAPE '\'
                OR p.category LIKE ?2 ESCAPE '\')
         ORDER BY p.id DESC
        "#
    );
    let rows = sqlx::query_as::<_, PetRow>(&sql)
        .bind(owner_id)
        .bind(query.map(like_pattern))
        .fetch_all(db)
        .await
        .context("search pets")?;
    Ok(rows)
}

pub async fn get<'e, E>(db: E, pet_id: i64) -> anyhow::Result<Option<PetRow>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{SELECT_PET} WHERE p.id = ?");
    let row = sqlx::query_as::<_, PetRow>(&sql)
        .bind(pet_id)
        .fetch_optional(db)
        .await
        .context("get pet")?;
    Ok(row)
}

/// Lookup scoped by owner: a pet owned by someone else is reported as absent.
pub async fn get_owned(db: &SqlitePool, pet_id: i64, owner_id: i64) -> anyhow::Result<Option<PetRow>> {
    let sql = format!("{SELECT_PET} WHERE p.id = ? AND p.owner_id = ?");
    let row = sqlx::query_as::<_, PetRow>(&sql)
        .bind(pet_id)
        .bind(owner_id)
        .fetch_optional(db)
        .await
        .context("get owned pet")?;
    Ok(row)
}

pub async fn insert(
    db: &SqlitePool,
    owner_id: i64,
    attrs: &PetAttributes,
    image_key: &str,
) -> anyhow::Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO pets (name, category, age, breed, description, image,
                          available, owner_id, contact_email, adopted, approved, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, 0, 0, ?)
        RETURNING id
        "#,
    )
    .bind(&attrs.name)
    .bind(attrs.category.as_str())
    .bind(attrs.age)
    .bind(&attrs.breed)
    .bind(&attrs.description)
    .bind(image_key)
    .bind(owner_id)
    .bind(&attrs.contact_email)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(db)
    .await
    .context("insert pet")?;
    Ok(id)
}

/// Returns false when no pet with that id belongs to `owner_id`.
pub async fn update(
    db: &SqlitePool,
    pet_id: i64,
    owner_id: i64,
    attrs: &PetAttributes,
    image_key: &str,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE pets
           SET name = ?, category = ?, age = ?, breed = ?, description = ?,
               contact_email = ?, image = ?
         WHERE id = ? AND owner_id = ?
        "#,
    )
    .bind(&attrs.name)
    .bind(attrs.category.as_str())
    .bind(attrs.age)
    .bind(&attrs.breed)
    .bind(&attrs.description)
    .bind(&attrs.contact_email)
    .bind(image_key)
    .bind(pet_id)
    .bind(owner_id)
    .execute(db)
    .await
    .context("update pet")?;
    Ok(res.rows_affected() == 1)
}

/// Deletes an owned pet and returns its image key. Its adoption requests go with it.
pub async fn delete(db: &SqlitePool, pet_id: i64, owner_id: i64) -> anyhow::Result<Option<String>> {
    let key = sqlx::query_scalar::<_, String>(
        r#"DELETE FROM pets WHERE id = ? AND owner_id = ? RETURNING image"#,
    )
    .bind(pet_id)
    .bind(owner_id)
    .fetch_optional(db)
    .await
    .context("delete pet")?;
    Ok(key)
}

pub async fn mark_unavailable_tx(tx: &mut Transaction<'_, Sqlite>, pet_id: i64) -> anyhow::Result<()> {
    sqlx::query(r#"UPDATE pets SET available = 0 WHERE id = ?"#)
        .bind(pet_id)
        .execute(&mut **tx)
        .await
        .context("mark pet unavailable")?;
    Ok(())
}

pub async fn counts(db: &SqlitePool) -> anyhow::Result<PetCounts> {
    let counts = sqlx::query_as::<_, PetCounts>(
        r#"
        SELECT COUNT(*) AS total_pets,
               COALESCE(SUM(CASE WHEN available THEN 1 ELSE 0 END), 0) AS available_pets,
               COALESCE(SUM(CASE WHEN available THEN 0 ELSE 1 END), 0) AS adopted_pets
          FROM pets
        "#,
    )
    .fetch_one(db)
    .await
    .context("count pets")?;
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("lab"), "%lab%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }
}
