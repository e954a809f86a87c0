use crate::moves::{Move, FALLBACK_SEQUENCE};
use chrono::Utc;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One persisted secret code, bound to a game label.
///
/// `expires_at`/`used_at` are epoch seconds, matching the on-disk format the
/// kiosk fleet already carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub game: String,
    pub sequence: Vec<Move>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<i64>,
}

impl CodeRecord {
    /// A record is eligible when the label matches, it has not been redeemed,
    /// and it carries no expiry or one strictly in the future.
    pub fn is_eligible(&self, game: &str, now: i64) -> bool {
        self.game == game && !self.used && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("code database not found at {0}")]
    Missing(PathBuf),
    #[error("failed to read code database: {0}")]
    Io(#[from] std::io::Error),
    #[error("code database is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Storage boundary for code records, so the session logic can be exercised
/// against an in-memory double.
pub trait CodeStore {
    /// First unused, unexpired sequence registered for `game`.
    fn find_eligible(&self, game: &str) -> Result<Option<Vec<Move>>, StoreError>;
    /// Flag the matching record as redeemed and rewrite the database.
    fn mark_used(&self, game: &str, sequence: &[Move]) -> Result<(), StoreError>;
}

/// Flat JSON-array database, read and rewritten wholesale.
#[derive(Debug, Clone)]
pub struct FileCodeStore {
    path: PathBuf,
}

impl FileCodeStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read_all(&self) -> Result<Vec<CodeRecord>, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::Missing(self.path.clone()));
        }
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_all(&self, records: &[CodeRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(records)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

impl CodeStore for FileCodeStore {
    fn find_eligible(&self, game: &str) -> Result<Option<Vec<Move>>, StoreError> {
        let now = Utc::now().timestamp();
        let records = self.read_all()?;
        Ok(records
            .into_iter()
            .find(|r| r.is_eligible(game, now) && !r.sequence.is_empty())
            .map(|r| r.sequence))
    }

    fn mark_used(&self, game: &str, sequence: &[Move]) -> Result<(), StoreError> {
        let mut records = self.read_all()?;
        if let Some(rec) = records
            .iter_mut()
            .find(|r| r.game == game && r.sequence == sequence && !r.used)
        {
            rec.used = true;
            rec.used_at = Some(Utc::now().timestamp());
            self.write_all(&records)?;
        }
        Ok(())
    }
}

/// Resolve the sequence to challenge with: the first eligible record, or the
/// built-in demo code when the store is unusable or empty for this game.
///
/// The silent fallback mirrors the deployed behavior; the warn line exists so
/// a misconfigured kiosk is at least visible in the logs.
pub fn load_sequence<S: CodeStore>(store: &S, game: &str) -> Vec<Move> {
    match store.find_eligible(game) {
        Ok(Some(seq)) => seq,
        Ok(None) => {
            warn!(
                game,
                demo = %FALLBACK_SEQUENCE.iter().join(" "),
                "no eligible code record, using demo sequence"
            );
            FALLBACK_SEQUENCE.to_vec()
        }
        Err(err) => {
            warn!(
                game,
                %err,
                demo = %FALLBACK_SEQUENCE.iter().join(" "),
                "code database unavailable, using demo sequence"
            );
            FALLBACK_SEQUENCE.to_vec()
        }
    }
}
