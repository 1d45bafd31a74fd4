use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use hmac::Mac;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::Sha256;
use std::sync::Arc;
use tokio::sync::Mutex;

type HmacSha256 = hmac::Hmac<Sha256>;

/// Access token of the ads platform page; required for any sync.
pub const META_API_TOKEN: &str = "meta_api_token";
/// Optional application secret, kept alongside the token for operators.
pub const META_APP_SECRET: &str = "meta_app_secret";

const KEY_LABEL: &[u8] = b"leadflow-vault-v1";
const NONCE_LEN: usize = 12;

/// Encrypted key/value storage for integration credentials, living in the
/// same SQLite file as the lead store.
pub struct SecretsVault {
    db: Arc<Mutex<Connection>>,
    cipher: Aes256Gcm,
}

/// Key bound to this host and OS user: HMAC-SHA256 over hostname and
/// username, keyed by a fixed label.
fn machine_key() -> Result<[u8; 32]> {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let user = whoami::username();

    let mut mac = <HmacSha256 as Mac>::new_from_slice(KEY_LABEL)
        .map_err(|e| anyhow!("Vault key derivation failed: {}", e))?;
    mac.update(host.as_bytes());
    mac.update(b"/");
    mac.update(user.as_bytes());

    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    Ok(key)
}

impl SecretsVault {
    pub fn new(db: Arc<Mutex<Connection>>) -> Result<Self> {
        let key = machine_key()?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| anyhow!("Vault cipher setup failed: {}", e))?;
        Ok(Self { db, cipher })
    }

    pub async fn initialize(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "CREATE TABLE IF NOT EXISTS secrets_vault (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// base64(nonce || ciphertext)
    fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        let mut out = nonce_bytes.to_vec();
        out.extend_from_slice(&sealed);
        Ok(B64.encode(out))
    }

    fn open(&self, encoded: &str) -> Result<String> {
        let raw = B64
            .decode(encoded)
            .map_err(|e| anyhow!("Stored secret is not valid base64: {}", e))?;
        if raw.len() <= NONCE_LEN {
            return Err(anyhow!("Stored secret is truncated"));
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| anyhow!("Stored secret cannot be decrypted on this machine"))?;
        String::from_utf8(plain).map_err(|e| anyhow!("Stored secret is not UTF-8: {}", e))
    }

    pub async fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        let sealed = self.seal(value)?;
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO secrets_vault (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, sealed],
        )?;
        Ok(())
    }

    pub async fn get_secret(&self, key: &str) -> Result<Option<String>> {
        let stored: Option<String> = {
            let db = self.db.lock().await;
            db.query_row(
                "SELECT value FROM secrets_vault WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?
        };
        stored.map(|s| self.open(&s)).transpose()
    }

    /// A secret that is present but blank counts as missing.
    pub async fn get_non_empty(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get_secret(key)
            .await?
            .filter(|v| !v.trim().is_empty()))
    }

    pub async fn remove_secret(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.execute("DELETE FROM secrets_vault WHERE key = ?1", params![key])?;
        Ok(())
    }
}
