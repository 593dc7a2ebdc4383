//! Database repository for CRUD operations.
//!
//! Uses prepared statements, and transactions wherever a comment and its
//! campground reference list change together.

use chrono::{TimeDelta, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Campground, Comment, CommentAuthor, CreateCampgroundRequest, User, UserCredentials,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ==================== CAMPGROUND OPERATIONS ====================

    /// List all campgrounds in insertion order.
    pub async fn list_campgrounds(&self) -> Result<Vec<Campground>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, image, description, comments, created_at FROM campgrounds ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(campground_from_row).collect())
    }

    /// Get a campground by ID.
    pub async fn get_campground(&self, id: &str) -> Result<Option<Campground>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, image, description, comments, created_at FROM campgrounds WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(campground_from_row))
    }

    /// Create a new campground with an empty comment list.
    pub async fn create_campground(
        &self,
        request: &CreateCampgroundRequest,
    ) -> Result<Campground, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let name = request.campground_name.trim().to_string();
        let image = request.campground_image.trim().to_string();
        let description = request.description().map(str::to_string);

        sqlx::query(
            "INSERT INTO campgrounds (id, name, image, description, comments, created_at) VALUES (?, ?, ?, ?, '[]', ?)",
        )
        .bind(&id)
        .bind(&name)
        .bind(&image)
        .bind(&description)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Campground {
            id,
            name,
            image,
            description,
            comments: Vec::new(),
            created_at: now,
        })
    }

    // ==================== COMMENT OPERATIONS ====================

    /// Get a comment by ID.
    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let row = sqlx::query(
            "SELECT id, text, author_id, author_username, created_at, updated_at FROM comments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    /// Resolve a campground's reference list, preserving its order.
    ///
    /// Ids whose comment no longer exists are skipped.
    pub async fn list_comments_by_ids(&self, ids: &[String]) -> Result<Vec<Comment>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids_json = serde_json::to_string(ids)?;
        let rows = sqlx::query(
            "SELECT id, text, author_id, author_username, created_at, updated_at FROM comments WHERE id IN (SELECT value FROM json_each(?))",
        )
        .bind(&ids_json)
        .fetch_all(&self.pool)
        .await?;

        let mut found: Vec<Comment> = rows.iter().map(comment_from_row).collect();
        let mut ordered = Vec::with_capacity(found.len());
        for id in ids {
            if let Some(pos) = found.iter().position(|c| &c.id == id) {
                ordered.push(found.swap_remove(pos));
            }
        }
        Ok(ordered)
    }

    /// Create a comment stamped with `author` and append it to the campground.
    ///
    /// Both writes commit together; a missing campground leaves nothing behind.
    pub async fn create_comment_for_campground(
        &self,
        campground_id: &str,
        text: &str,
        author: &User,
    ) -> Result<Comment, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the write lock before reading the list.
        sqlx::query(
            "INSERT INTO comments (id, text, author_id, author_username, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(text)
        .bind(&author.id)
        .bind(&author.username)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT comments FROM campgrounds WHERE id = ?")
            .bind(campground_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(AppError::NotFound("Campground not found".to_string()));
        };

        let mut comments = parse_id_list(row.get("comments"));
        comments.push(id.clone());

        sqlx::query("UPDATE campgrounds SET comments = ? WHERE id = ?")
            .bind(serde_json::to_string(&comments)?)
            .bind(campground_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Comment {
            id,
            text: text.to_string(),
            author: CommentAuthor {
                id: author.id.clone(),
                username: author.username.clone(),
            },
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Replace a comment's text in a single statement.
    pub async fn update_comment_text(&self, id: &str, text: &str) -> Result<Comment, AppError> {
        let now = Utc::now().to_rfc3339();

        let row = sqlx::query(
            "UPDATE comments SET text = ?, updated_at = ? WHERE id = ? RETURNING id, text, author_id, author_username, created_at, updated_at",
        )
        .bind(text)
        .bind(&now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(comment_from_row)
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    /// Delete a comment and prune its id from every campground that lists it.
    pub async fn delete_comment(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound("Comment not found".to_string()));
        }

        let owners = sqlx::query(
            "SELECT id, comments FROM campgrounds WHERE EXISTS (SELECT 1 FROM json_each(campgrounds.comments) WHERE value = ?)",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for owner in &owners {
            let campground_id: String = owner.get("id");
            let remaining: Vec<String> = parse_id_list(owner.get("comments"))
                .into_iter()
                .filter(|c| c != id)
                .collect();

            sqlx::query("UPDATE campgrounds SET comments = ? WHERE id = ?")
                .bind(serde_json::to_string(&remaining)?)
                .bind(&campground_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // ==================== USER OPERATIONS ====================

    /// Create a user from an already hashed password.
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(User {
                id,
                username: username.to_string(),
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Conflict(format!("A user with the name {} already exists", username)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a user together with their password hash.
    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, AppError> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| UserCredentials {
            user: User {
                id: row.get("id"),
                username: row.get("username"),
            },
            password_hash: row.get("password_hash"),
        }))
    }

    // ==================== SESSION OPERATIONS ====================

    /// Store a session keyed by the hash of its token.
    pub async fn create_session(
        &self,
        token_hash: &str,
        user_id: &str,
        ttl_hours: i64,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let expires_at = TimeDelta::try_hours(ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                AppError::Internal(format!("Session lifetime of {} hours is out of range", ttl_hours))
            })?
            .timestamp();

        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(now.to_rfc3339())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Resolve an unexpired session to its user.
    pub async fn get_session_user(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT u.id, u.username FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token_hash = ? AND s.expires_at > ?",
        )
        .bind(token_hash)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            username: row.get("username"),
        }))
    }

    /// Remove a session. Missing sessions are not an error.
    pub async fn delete_session(&self, token_hash: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
impl Repository {
    /// Number of stored comments.
    pub async fn count_comments(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Insert a session with an explicit expiry.
    pub async fn insert_session_expiring_at(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(Utc::now().to_rfc3339())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ==================== ROW MAPPERS ====================

fn parse_id_list(raw: String) -> Vec<String> {
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!("Ignoring malformed comment list {:?}: {}", raw, e);
        Vec::new()
    })
}

fn campground_from_row(row: &SqliteRow) -> Campground {
    Campground {
        id: row.get("id"),
        name: row.get("name"),
        image: row.get("image"),
        description: row.get("description"),
        comments: parse_id_list(row.get("comments")),
        created_at: row.get("created_at"),
    }
}

fn comment_from_row(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        text: row.get("text"),
        author: CommentAuthor {
            id: row.get("author_id"),
            username: row.get("author_username"),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn setup() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        (Repository::new(pool), temp_dir)
    }

    fn campground_request(name: &str) -> CreateCampgroundRequest {
        CreateCampgroundRequest {
            campground_name: name.to_string(),
            campground_image: "http://x/img.jpg".to_string(),
            campground_description: Some("nice".to_string()),
        }
    }

    #[tokio::test]
    async fn test_created_campground_is_listed_once() {
        let (repo, _dir) = setup().await;

        let first = repo
            .create_campground(&campground_request("Unley Creek"))
            .await
            .unwrap();
        repo.create_campground(&campground_request("Norwood Forest"))
            .await
            .unwrap();

        let all = repo.list_campgrounds().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Unley Creek");
        assert_eq!(all.iter().filter(|c| c.id == first.id).count(), 1);
        assert!(all[0].comments.is_empty());
    }

    #[tokio::test]
    async fn test_blank_description_is_absent() {
        let (repo, _dir) = setup().await;
        let mut request = campground_request("Glenelg Valley");
        request.campground_description = Some("   ".to_string());

        let created = repo.create_campground(&request).await.unwrap();
        let fetched = repo.get_campground(&created.id).await.unwrap().unwrap();
        assert!(fetched.description.is_none());
    }

    #[tokio::test]
    async fn test_comment_is_appended_to_campground() {
        let (repo, _dir) = setup().await;
        let user = repo.create_user("alice", "hash").await.unwrap();
        let campground = repo
            .create_campground(&campground_request("Unley Creek"))
            .await
            .unwrap();

        let first = repo
            .create_comment_for_campground(&campground.id, "first", &user)
            .await
            .unwrap();
        let second = repo
            .create_comment_for_campground(&campground.id, "second", &user)
            .await
            .unwrap();

        assert_eq!(first.author.id, user.id);
        assert_eq!(first.author.username, "alice");

        let stored = repo.get_campground(&campground.id).await.unwrap().unwrap();
        assert_eq!(stored.comments, vec![first.id.clone(), second.id.clone()]);

        let resolved = repo.list_comments_by_ids(&stored.comments).await.unwrap();
        let texts: Vec<&str> = resolved.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_comment_on_missing_campground_leaves_no_orphan() {
        let (repo, _dir) = setup().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let result = repo
            .create_comment_for_campground("missing", "hello", &user)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(repo.count_comments().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_comment_text() {
        let (repo, _dir) = setup().await;
        let user = repo.create_user("alice", "hash").await.unwrap();
        let campground = repo
            .create_campground(&campground_request("Unley Creek"))
            .await
            .unwrap();
        let comment = repo
            .create_comment_for_campground(&campground.id, "draft", &user)
            .await
            .unwrap();

        let updated = repo
            .update_comment_text(&comment.id, "final")
            .await
            .unwrap();
        assert_eq!(updated.text, "final");
        assert_eq!(updated.author, comment.author);

        let missing = repo.update_comment_text("missing", "x").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_comment_prunes_reference() {
        let (repo, _dir) = setup().await;
        let user = repo.create_user("alice", "hash").await.unwrap();
        let campground = repo
            .create_campground(&campground_request("Unley Creek"))
            .await
            .unwrap();
        let keep = repo
            .create_comment_for_campground(&campground.id, "keep", &user)
            .await
            .unwrap();
        let drop = repo
            .create_comment_for_campground(&campground.id, "drop", &user)
            .await
            .unwrap();

        repo.delete_comment(&drop.id).await.unwrap();

        assert!(repo.get_comment(&drop.id).await.unwrap().is_none());
        let stored = repo.get_campground(&campground.id).await.unwrap().unwrap();
        assert_eq!(stored.comments, vec![keep.id]);

        let again = repo.delete_comment(&drop.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stale_references_resolve_as_absent() {
        let (repo, _dir) = setup().await;
        let user = repo.create_user("alice", "hash").await.unwrap();
        let campground = repo
            .create_campground(&campground_request("Unley Creek"))
            .await
            .unwrap();
        let comment = repo
            .create_comment_for_campground(&campground.id, "hello", &user)
            .await
            .unwrap();

        let ids = vec!["gone".to_string(), comment.id.clone()];
        let resolved = repo.list_comments_by_ids(&ids).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, comment.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let (repo, _dir) = setup().await;
        repo.create_user("alice", "hash").await.unwrap();

        let result = repo.create_user("alice", "other").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let stored = repo.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "hash");
    }

    #[tokio::test]
    async fn test_closed_pool_reports_database_errors() {
        let (repo, _dir) = setup().await;
        let campground = repo
            .create_campground(&campground_request("Unley Creek"))
            .await
            .unwrap();
        let user = repo.create_user("alice", "hash").await.unwrap();

        repo.close().await;

        let created = repo
            .create_comment_for_campground(&campground.id, "hello", &user)
            .await;
        assert!(matches!(created, Err(AppError::Database(_))));
        assert!(matches!(
            repo.list_campgrounds().await,
            Err(AppError::Database(_))
        ));
        assert!(matches!(
            repo.get_session_user("tok").await,
            Err(AppError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_session_with_unrepresentable_lifetime_is_an_error() {
        let (repo, _dir) = setup().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let result = repo
            .create_session("tok", &user.id, 3_000_000_000_000_000)
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(repo.get_session_user("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sessions_expire_and_delete() {
        let (repo, _dir) = setup().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        repo.create_session("live", &user.id, 1).await.unwrap();
        repo.insert_session_expiring_at("stale", &user.id, Utc::now().timestamp() - 10)
            .await
            .unwrap();

        assert_eq!(repo.get_session_user("live").await.unwrap(), Some(user));
        assert!(repo.get_session_user("stale").await.unwrap().is_none());

        repo.delete_session("live").await.unwrap();
        assert!(repo.get_session_user("live").await.unwrap().is_none());
    }
}
