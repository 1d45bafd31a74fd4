use anyhow::{Result, bail};
use rusqlite::params;
use sha2::{Digest, Sha256};

use super::LeadStore;
use super::types::ApiTokenRecord;

pub const TOKEN_PREFIX: &str = "lfk_";

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn mint_token() -> String {
    let bytes: [u8; 24] = rand::random();
    format!("{}{}", TOKEN_PREFIX, hex::encode(bytes))
}

impl LeadStore {
    /// Mint a bearer token for the JSON API. The raw value is returned once;
    /// only its SHA-256 digest is kept.
    pub async fn create_api_token(&self, name: &str) -> Result<(String, ApiTokenRecord)> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Token name must not be empty");
        }
        let raw_token = mint_token();
        let id = uuid::Uuid::new_v4().to_string();

        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO api_tokens (id, name, token_hash) VALUES (?1, ?2, ?3)",
            params![id, name, digest(&raw_token)],
        )?;
        let created_at: String = db.query_row(
            "SELECT created_at FROM api_tokens WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;

        Ok((
            raw_token,
            ApiTokenRecord {
                id,
                name: name.to_string(),
                created_at,
            },
        ))
    }

    pub async fn list_api_tokens(&self) -> Result<Vec<ApiTokenRecord>> {
        let db = self.db.lock().await;
        let mut stmt =
            db.prepare("SELECT id, name, created_at FROM api_tokens ORDER BY created_at DESC, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(ApiTokenRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        let mut tokens = Vec::new();
        for row in rows {
            tokens.push(row?);
        }
        Ok(tokens)
    }

    pub async fn revoke_api_token(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute("DELETE FROM api_tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub async fn validate_api_token(&self, raw_token: &str) -> Result<bool> {
        if !raw_token.starts_with(TOKEN_PREFIX) {
            return Ok(false);
        }
        let db = self.db.lock().await;
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM api_tokens WHERE token_hash = ?1",
            params![digest(raw_token)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub async fn has_any_api_tokens(&self) -> Result<bool> {
        let db = self.db.lock().await;
        let count: i64 = db.query_row("SELECT COUNT(*) FROM api_tokens", [], |row| row.get(0))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::test_lead_store;

    #[tokio::test]
    async fn issued_token_validates_until_revoked() {
        let store = test_lead_store().await;
        assert!(!store.has_any_api_tokens().await.unwrap());

        let (raw, record) = store.create_api_token("dashboard").await.unwrap();
        assert!(raw.starts_with(TOKEN_PREFIX));
        assert!(store.validate_api_token(&raw).await.unwrap());
        assert!(!store.validate_api_token("lfk_nope").await.unwrap());

        assert!(store.revoke_api_token(&record.id).await.unwrap());
        assert!(!store.validate_api_token(&raw).await.unwrap());
        assert!(!store.revoke_api_token(&record.id).await.unwrap());
    }

    #[tokio::test]
    async fn raw_token_is_not_stored() {
        let store = test_lead_store().await;
        let (raw, _) = store.create_api_token("cli").await.unwrap();
        let db = store.get_db();
        let db = db.lock().await;
        let stored: String = db
            .query_row("SELECT token_hash FROM api_tokens", [], |row| row.get(0))
            .unwrap();
        assert_ne!(stored, raw);
        assert_eq!(stored.len(), 64);
    }
}
