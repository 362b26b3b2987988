/// Account link store and lifecycle state machine
use crate::{
    error::{LinkerError, LinkerResult},
    link::{
        AccountLink, DiscordAccount, LinkStatus, LinkedDiscordAccount, LinkedWikidotAccount,
        WikidotAccount,
    },
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::HashMap;

/// Owns the lifecycle of Discord ↔ Wikidot associations.
///
/// Invariant enforced on every mutating call: no two active rows share a
/// wikidot_id. A single Discord account may hold several active links.
#[derive(Clone)]
pub struct LinkManager {
    db: SqlitePool,
}

impl LinkManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert or refresh a Discord identity snapshot
    pub async fn upsert_discord(&self, account: &DiscordAccount) -> LinkerResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO discord_account (id, username, avatar, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                avatar = excluded.avatar,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(&account.avatar)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Insert or refresh a Wikidot identity
    pub async fn upsert_wikidot(&self, account: &WikidotAccount) -> LinkerResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO wikidot_account (id, username, unixname, is_jp_member, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                unixname = excluded.unixname,
                is_jp_member = excluded.is_jp_member,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.unixname)
        .bind(account.is_jp_member)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Establish an active link for the pair.
    ///
    /// Idempotent on an already-active pair. An unlinked row is never
    /// silently resurrected; callers must use `relink` so history stays
    /// auditable.
    pub async fn link(&self, discord_id: &str, wikidot_id: i64) -> LinkerResult<AccountLink> {
        let mut tx = self.db.begin().await?;

        Self::assert_wikidot_free(&mut tx, discord_id, wikidot_id).await?;

        let existing = sqlx::query(
            "SELECT id, discord_id, wikidot_id, status, created_at, updated_at, unlinked_at
             FROM account_link WHERE discord_id = ? AND wikidot_id = ?",
        )
        .bind(discord_id)
        .bind(wikidot_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = existing {
            let link = parse_link(&row)?;
            return match link.status {
                LinkStatus::Active => {
                    tx.commit().await?;
                    Ok(link)
                }
                LinkStatus::Unlinked => Err(LinkerError::UseRelinkInstead {
                    discord_id: discord_id.to_string(),
                    wikidot_id,
                }),
                LinkStatus::Pending => {
                    let now = Utc::now();
                    sqlx::query(
                        "UPDATE account_link SET status = ?, updated_at = ? WHERE id = ?",
                    )
                    .bind(LinkStatus::Active.as_str())
                    .bind(now.to_rfc3339())
                    .bind(link.id)
                    .execute(&mut *tx)
                    .await?;
                    tx.commit().await?;

                    Ok(AccountLink {
                        status: LinkStatus::Active,
                        updated_at: now,
                        ..link
                    })
                }
            };
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO account_link (discord_id, wikidot_id, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(discord_id)
        .bind(wikidot_id)
        .bind(LinkStatus::Active.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        tx.commit().await?;

        Ok(AccountLink {
            id,
            discord_id: discord_id.to_string(),
            wikidot_id,
            status: LinkStatus::Active,
            created_at: now,
            updated_at: now,
            unlinked_at: None,
        })
    }

    /// Sever an active link, keeping the row for audit
    pub async fn unlink(&self, discord_id: &str, wikidot_id: i64) -> LinkerResult<AccountLink> {
        let mut tx = self.db.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE account_link SET status = ?, updated_at = ?, unlinked_at = ?
             WHERE discord_id = ? AND wikidot_id = ? AND status = ?",
        )
        .bind(LinkStatus::Unlinked.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(discord_id)
        .bind(wikidot_id)
        .bind(LinkStatus::Active.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LinkerError::LinkNotFound {
                discord_id: discord_id.to_string(),
                wikidot_id,
            });
        }

        let link = Self::fetch_pair(&mut tx, discord_id, wikidot_id).await?;
        tx.commit().await?;

        Ok(link)
    }

    /// Restore an unlinked pair to active, preserving the original created_at
    pub async fn relink(&self, discord_id: &str, wikidot_id: i64) -> LinkerResult<AccountLink> {
        let mut tx = self.db.begin().await?;

        Self::assert_wikidot_free(&mut tx, discord_id, wikidot_id).await?;

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE account_link SET status = ?, updated_at = ?, unlinked_at = NULL
             WHERE discord_id = ? AND wikidot_id = ? AND status = ?",
        )
        .bind(LinkStatus::Active.as_str())
        .bind(now.to_rfc3339())
        .bind(discord_id)
        .bind(wikidot_id)
        .bind(LinkStatus::Unlinked.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LinkerError::LinkNotFound {
                discord_id: discord_id.to_string(),
                wikidot_id,
            });
        }

        let link = Self::fetch_pair(&mut tx, discord_id, wikidot_id).await?;
        tx.commit().await?;

        Ok(link)
    }

    /// Fetch the link row for an exact pair, if any
    pub async fn get(&self, discord_id: &str, wikidot_id: i64) -> LinkerResult<Option<AccountLink>> {
        let row = sqlx::query(
            "SELECT id, discord_id, wikidot_id, status, created_at, updated_at, unlinked_at
             FROM account_link WHERE discord_id = ? AND wikidot_id = ?",
        )
        .bind(discord_id)
        .bind(wikidot_id)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(parse_link).transpose()
    }

    /// Links held by a Discord account, active only unless history requested
    pub async fn list_by_discord(
        &self,
        discord_id: &str,
        include_history: bool,
    ) -> LinkerResult<Vec<AccountLink>> {
        let rows = if include_history {
            sqlx::query(
                "SELECT id, discord_id, wikidot_id, status, created_at, updated_at, unlinked_at
                 FROM account_link WHERE discord_id = ? ORDER BY created_at",
            )
            .bind(discord_id)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query(
                "SELECT id, discord_id, wikidot_id, status, created_at, updated_at, unlinked_at
                 FROM account_link WHERE discord_id = ? AND status = ? ORDER BY created_at",
            )
            .bind(discord_id)
            .bind(LinkStatus::Active.as_str())
            .fetch_all(&self.db)
            .await?
        };

        rows.iter().map(parse_link).collect()
    }

    /// Links held on a Wikidot account, active only unless history requested
    pub async fn list_by_wikidot(
        &self,
        wikidot_id: i64,
        include_history: bool,
    ) -> LinkerResult<Vec<AccountLink>> {
        let rows = if include_history {
            sqlx::query(
                "SELECT id, discord_id, wikidot_id, status, created_at, updated_at, unlinked_at
                 FROM account_link WHERE wikidot_id = ? ORDER BY created_at",
            )
            .bind(wikidot_id)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query(
                "SELECT id, discord_id, wikidot_id, status, created_at, updated_at, unlinked_at
                 FROM account_link WHERE wikidot_id = ? AND status = ? ORDER BY created_at",
            )
            .bind(wikidot_id)
            .bind(LinkStatus::Active.as_str())
            .fetch_all(&self.db)
            .await?
        };

        rows.iter().map(parse_link).collect()
    }

    /// Wikidot accounts actively linked to a Discord account
    pub async fn active_wikidot_accounts(
        &self,
        discord_id: &str,
    ) -> LinkerResult<Vec<WikidotAccount>> {
        let rows = sqlx::query(
            r#"
            SELECT w.id, w.username, w.unixname, w.is_jp_member
            FROM account_link l
            JOIN wikidot_account w ON w.id = l.wikidot_id
            WHERE l.discord_id = ? AND l.status = ?
            ORDER BY w.id
            "#,
        )
        .bind(discord_id)
        .bind(LinkStatus::Active.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(parse_wikidot).collect())
    }

    /// Stored Discord snapshot, if the account has ever started a flow
    pub async fn get_discord(&self, discord_id: &str) -> LinkerResult<Option<DiscordAccount>> {
        let row = sqlx::query("SELECT id, username, avatar FROM discord_account WHERE id = ?")
            .bind(discord_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|r| DiscordAccount {
            id: r.get("id"),
            username: r.get("username"),
            avatar: r.get("avatar"),
        }))
    }

    /// Batch account lookup: a single query for many Discord ids.
    ///
    /// One query rather than parallel sub-requests, to bound load.
    pub async fn accounts_for_discord_ids(
        &self,
        discord_ids: &[String],
    ) -> LinkerResult<HashMap<String, (DiscordAccount, Vec<WikidotAccount>)>> {
        if discord_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; discord_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT d.id AS discord_id, d.username AS discord_username, d.avatar,
                   w.id AS wikidot_id, w.username AS wikidot_username, w.unixname, w.is_jp_member
            FROM discord_account d
            LEFT JOIN account_link l ON l.discord_id = d.id AND l.status = 'active'
            LEFT JOIN wikidot_account w ON w.id = l.wikidot_id
            WHERE d.id IN ({})
            ORDER BY d.id, w.id
            "#,
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in discord_ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.db).await?;

        let mut result: HashMap<String, (DiscordAccount, Vec<WikidotAccount>)> = HashMap::new();
        for row in rows {
            let discord_id: String = row.get("discord_id");
            let entry = result.entry(discord_id.clone()).or_insert_with(|| {
                (
                    DiscordAccount {
                        id: discord_id,
                        username: row.get("discord_username"),
                        avatar: row.get("avatar"),
                    },
                    Vec::new(),
                )
            });

            // The LEFT JOIN yields NULL link columns for accounts with no
            // active links; sqlite decodes NULL into a bare i64 as 0, so
            // the column must be read as an Option
            if let Some(wikidot_id) = row.try_get::<Option<i64>, _>("wikidot_id")? {
                entry.1.push(WikidotAccount {
                    id: wikidot_id,
                    username: row.get("wikidot_username"),
                    unixname: row.get("unixname"),
                    is_jp_member: row.get("is_jp_member"),
                });
            }
        }

        Ok(result)
    }

    /// Administrative dump keyed by Discord account, including unlink history
    pub async fn dump_by_discord(
        &self,
    ) -> LinkerResult<Vec<(DiscordAccount, Vec<LinkedWikidotAccount>)>> {
        let rows = sqlx::query(
            r#"
            SELECT d.id AS discord_id, d.username AS discord_username, d.avatar,
                   w.id AS wikidot_id, w.username AS wikidot_username, w.unixname, w.is_jp_member,
                   l.created_at, l.updated_at, l.unlinked_at
            FROM discord_account d
            LEFT JOIN account_link l ON l.discord_id = d.id
            LEFT JOIN wikidot_account w ON w.id = l.wikidot_id
            ORDER BY d.id, w.id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut result: Vec<(DiscordAccount, Vec<LinkedWikidotAccount>)> = Vec::new();
        for row in rows {
            let discord_id: String = row.get("discord_id");
            if result.last().map(|(d, _)| d.id != discord_id).unwrap_or(true) {
                result.push((
                    DiscordAccount {
                        id: discord_id,
                        username: row.get("discord_username"),
                        avatar: row.get("avatar"),
                    },
                    Vec::new(),
                ));
            }

            let Some(entry) = result.last_mut() else {
                continue;
            };
            // NULL joined columns mean the account never completed a link
            if let Some(wikidot_id) = row.try_get::<Option<i64>, _>("wikidot_id")? {
                entry.1.push(LinkedWikidotAccount {
                    id: wikidot_id,
                    username: row.get("wikidot_username"),
                    unixname: row.get("unixname"),
                    is_jp_member: row.get("is_jp_member"),
                    created_at: parse_timestamp(&row, "created_at")?,
                    updated_at: parse_timestamp(&row, "updated_at")?,
                    unlinked_at: parse_optional_timestamp(&row, "unlinked_at"),
                });
            }
        }

        Ok(result)
    }

    /// Administrative dump keyed by Wikidot account, including unlink history
    pub async fn dump_by_wikidot(
        &self,
    ) -> LinkerResult<Vec<(WikidotAccount, Vec<LinkedDiscordAccount>)>> {
        let rows = sqlx::query(
            r#"
            SELECT w.id AS wikidot_id, w.username AS wikidot_username, w.unixname, w.is_jp_member,
                   d.id AS discord_id, d.username AS discord_username, d.avatar,
                   l.created_at, l.updated_at, l.unlinked_at
            FROM wikidot_account w
            LEFT JOIN account_link l ON l.wikidot_id = w.id
            LEFT JOIN discord_account d ON d.id = l.discord_id
            ORDER BY w.id, d.id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut result: Vec<(WikidotAccount, Vec<LinkedDiscordAccount>)> = Vec::new();
        for row in rows {
            let wikidot_id: i64 = row.get("wikidot_id");
            if result.last().map(|(w, _)| w.id != wikidot_id).unwrap_or(true) {
                result.push((
                    WikidotAccount {
                        id: wikidot_id,
                        username: row.get("wikidot_username"),
                        unixname: row.get("unixname"),
                        is_jp_member: row.get("is_jp_member"),
                    },
                    Vec::new(),
                ));
            }

            let Some(entry) = result.last_mut() else {
                continue;
            };
            // NULL joined columns mean the account never completed a link
            if let Some(discord_id) = row.try_get::<Option<String>, _>("discord_id")? {
                entry.1.push(LinkedDiscordAccount {
                    id: discord_id,
                    username: row.get("discord_username"),
                    avatar: row.get("avatar"),
                    created_at: parse_timestamp(&row, "created_at")?,
                    updated_at: parse_timestamp(&row, "updated_at")?,
                    unlinked_at: parse_optional_timestamp(&row, "unlinked_at"),
                });
            }
        }

        Ok(result)
    }

    /// A wikidot_id may be actively linked to at most one Discord identity
    async fn assert_wikidot_free(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        discord_id: &str,
        wikidot_id: i64,
    ) -> LinkerResult<()> {
        let holder: Option<String> = sqlx::query_scalar(
            "SELECT discord_id FROM account_link WHERE wikidot_id = ? AND status = ? LIMIT 1",
        )
        .bind(wikidot_id)
        .bind(LinkStatus::Active.as_str())
        .fetch_optional(&mut **tx)
        .await?;

        match holder {
            Some(holder) if holder != discord_id => {
                Err(LinkerError::ConflictingLink { wikidot_id })
            }
            _ => Ok(()),
        }
    }

    async fn fetch_pair(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        discord_id: &str,
        wikidot_id: i64,
    ) -> LinkerResult<AccountLink> {
        let row = sqlx::query(
            "SELECT id, discord_id, wikidot_id, status, created_at, updated_at, unlinked_at
             FROM account_link WHERE discord_id = ? AND wikidot_id = ?",
        )
        .bind(discord_id)
        .bind(wikidot_id)
        .fetch_one(&mut **tx)
        .await?;

        parse_link(&row)
    }
}

fn parse_link(row: &SqliteRow) -> LinkerResult<AccountLink> {
    let status_str: String = row.get("status");

    Ok(AccountLink {
        id: row.get("id"),
        discord_id: row.get("discord_id"),
        wikidot_id: row.get("wikidot_id"),
        status: LinkStatus::parse(&status_str)?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
        unlinked_at: parse_optional_timestamp(row, "unlinked_at"),
    })
}

fn parse_wikidot(row: &SqliteRow) -> WikidotAccount {
    WikidotAccount {
        id: row.get("id"),
        username: row.get("username"),
        unixname: row.get("unixname"),
        is_jp_member: row.get("is_jp_member"),
    }
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> LinkerResult<DateTime<Utc>> {
    let raw: String = row.get(column);
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LinkerError::Internal(format!("Invalid timestamp in store: {}", e)))
}

fn parse_optional_timestamp(row: &SqliteRow, column: &str) -> Option<DateTime<Utc>> {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_manager() -> LinkManager {
        let db = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::run_migrations(&db).await.unwrap();
        let manager = LinkManager::new(db);

        manager
            .upsert_discord(&DiscordAccount {
                id: "42".into(),
                username: "alice".into(),
                avatar: "a.png".into(),
            })
            .await
            .unwrap();
        manager
            .upsert_discord(&DiscordAccount {
                id: "99".into(),
                username: "bob".into(),
                avatar: "b.png".into(),
            })
            .await
            .unwrap();
        manager
            .upsert_wikidot(&WikidotAccount {
                id: 7,
                username: "Alice W".into(),
                unixname: "alice-w".into(),
                is_jp_member: true,
            })
            .await
            .unwrap();
        manager
            .upsert_wikidot(&WikidotAccount {
                id: 8,
                username: "Alt".into(),
                unixname: "alt".into(),
                is_jp_member: false,
            })
            .await
            .unwrap();

        manager
    }

    #[tokio::test]
    async fn link_is_idempotent() {
        let manager = test_manager().await;

        let first = manager.link("42", 7).await.unwrap();
        let second = manager.link("42", 7).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, LinkStatus::Active);
        assert_eq!(manager.list_by_discord("42", false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn one_discord_many_wikidot() {
        let manager = test_manager().await;

        manager.link("42", 7).await.unwrap();
        manager.link("42", 8).await.unwrap();

        let links = manager.list_by_discord("42", false).await.unwrap();
        assert_eq!(links.len(), 2);
    }

    #[tokio::test]
    async fn wikidot_linked_to_one_discord_only() {
        let manager = test_manager().await;

        manager.link("42", 7).await.unwrap();
        let err = manager.link("99", 7).await.unwrap_err();

        assert!(matches!(
            err,
            LinkerError::ConflictingLink { wikidot_id: 7 }
        ));
        // Store unchanged: only one active holder
        assert_eq!(manager.list_by_wikidot(7, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unlink_requires_active_pair() {
        let manager = test_manager().await;

        let err = manager.unlink("42", 7).await.unwrap_err();
        assert!(matches!(err, LinkerError::LinkNotFound { .. }));

        manager.link("42", 7).await.unwrap();
        let unlinked = manager.unlink("42", 7).await.unwrap();
        assert_eq!(unlinked.status, LinkStatus::Unlinked);
        assert!(unlinked.unlinked_at.is_some());

        // Second unlink fails, the row is no longer active
        let err = manager.unlink("42", 7).await.unwrap_err();
        assert!(matches!(err, LinkerError::LinkNotFound { .. }));
    }

    #[tokio::test]
    async fn relink_restores_without_new_row() {
        let manager = test_manager().await;

        let original = manager.link("42", 7).await.unwrap();
        manager.unlink("42", 7).await.unwrap();
        let restored = manager.relink("42", 7).await.unwrap();

        assert_eq!(restored.id, original.id);
        assert_eq!(restored.status, LinkStatus::Active);
        assert_eq!(restored.created_at, original.created_at);
        assert!(restored.unlinked_at.is_none());
    }

    #[tokio::test]
    async fn relink_never_creates() {
        let manager = test_manager().await;

        let err = manager.relink("42", 7).await.unwrap_err();
        assert!(matches!(err, LinkerError::LinkNotFound { .. }));
        assert!(manager.get("42", 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn link_refuses_to_resurrect_unlinked_row() {
        let manager = test_manager().await;

        manager.link("42", 7).await.unwrap();
        manager.unlink("42", 7).await.unwrap();

        let err = manager.link("42", 7).await.unwrap_err();
        assert!(matches!(err, LinkerError::UseRelinkInstead { .. }));
    }

    #[tokio::test]
    async fn relink_rechecks_wikidot_uniqueness() {
        let manager = test_manager().await;

        manager.link("42", 7).await.unwrap();
        manager.unlink("42", 7).await.unwrap();
        // Wikidot 7 moves to bob while alice's row is unlinked
        manager.link("99", 7).await.unwrap();

        let err = manager.relink("42", 7).await.unwrap_err();
        assert!(matches!(err, LinkerError::ConflictingLink { .. }));
    }

    #[tokio::test]
    async fn history_listing_includes_unlinked() {
        let manager = test_manager().await;

        manager.link("42", 7).await.unwrap();
        manager.link("42", 8).await.unwrap();
        manager.unlink("42", 8).await.unwrap();

        assert_eq!(manager.list_by_discord("42", false).await.unwrap().len(), 1);
        assert_eq!(manager.list_by_discord("42", true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn batch_lookup_groups_by_discord_id() {
        let manager = test_manager().await;

        manager.link("42", 7).await.unwrap();
        manager.link("42", 8).await.unwrap();

        let result = manager
            .accounts_for_discord_ids(&["42".into(), "99".into(), "404".into()])
            .await
            .unwrap();

        assert_eq!(result.len(), 2); // "404" was never seen
        assert_eq!(result["42"].1.len(), 2);
        assert!(result["99"].1.is_empty());
    }

    #[tokio::test]
    async fn dumps_include_unlink_timestamps() {
        let manager = test_manager().await;

        manager.link("42", 7).await.unwrap();
        manager.unlink("42", 7).await.unwrap();

        let by_discord = manager.dump_by_discord().await.unwrap();
        let alice = by_discord.iter().find(|(d, _)| d.id == "42").unwrap();
        assert!(alice.1[0].unlinked_at.is_some());

        let by_wikidot = manager.dump_by_wikidot().await.unwrap();
        let seven = by_wikidot.iter().find(|(w, _)| w.id == 7).unwrap();
        assert!(seven.1[0].unlinked_at.is_some());
    }

    #[tokio::test]
    async fn accounts_without_links_dump_with_empty_vectors() {
        // Every started flow upserts the Discord snapshot, so accounts with
        // no completed link are the common case in the dumps
        let manager = test_manager().await;

        manager.link("42", 7).await.unwrap();

        let by_discord = manager.dump_by_discord().await.unwrap();
        let bob = by_discord.iter().find(|(d, _)| d.id == "99").unwrap();
        assert!(bob.1.is_empty());

        let by_wikidot = manager.dump_by_wikidot().await.unwrap();
        let eight = by_wikidot.iter().find(|(w, _)| w.id == 8).unwrap();
        assert!(eight.1.is_empty());

        let batch = manager
            .accounts_for_discord_ids(&["99".into()])
            .await
            .unwrap();
        assert!(batch["99"].1.is_empty());
    }
}
