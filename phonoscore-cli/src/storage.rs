//! Attempt history in a local SQLite file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use phonoscore_core::{AttemptRecord, AttemptRecorder, Verdict};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptItem {
    pub id: String,
    pub created_at: String,
    pub word: String,
    pub audio_path: Option<String>,
    pub recognized_text: Option<String>,
    pub alignment_score: Option<f64>,
    pub edit_distance: Option<usize>,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptPage {
    pub items: Vec<AttemptItem>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordStats {
    pub word: String,
    pub attempts: usize,
    pub correct: usize,
    pub accuracy: f32,
    /// Mean over attempts that reached the phonetic check.
    pub avg_edit_distance: Option<f32>,
    /// Mean over attempts that had reference audio.
    pub avg_alignment_score: Option<f64>,
    pub last_attempt_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBucket {
    pub date: String,
    pub attempts: usize,
    pub correct: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPayload {
    pub range_days: usize,
    pub total_attempts: usize,
    pub total_correct: usize,
    pub accuracy: f32,
    pub words: Vec<WordStats>,
    pub buckets: Vec<StatsBucket>,
}

#[derive(Debug, Clone)]
pub struct AttemptStore {
    db_path: PathBuf,
}

impl AttemptStore {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let store = Self { db_path };
        store.init_schema()?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("opening {}", self.db_path.display()))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS attempts (
              id TEXT PRIMARY KEY,
              created_at INTEGER NOT NULL,
              word TEXT NOT NULL,
              audio_path TEXT,
              recognized_text TEXT,
              alignment_score REAL,
              edit_distance INTEGER,
              verdict TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_attempts_created_at ON attempts(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_attempts_word ON attempts(word);
            "#,
        )
        .context("creating attempts schema")?;
        Ok(())
    }

    pub fn insert_attempt(&self, attempt: &AttemptRecord) -> Result<String> {
        let id = new_id("att");
        let created_at = DateTime::<Utc>::from(attempt.timestamp).timestamp();
        let word = attempt.word.trim().to_lowercase();
        let conn = self.open()?;
        conn.execute(
            r#"
            INSERT INTO attempts
            (id, created_at, word, audio_path, recognized_text, alignment_score, edit_distance, verdict)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                id,
                created_at,
                word,
                attempt.audio_path,
                attempt.recognized_text,
                attempt.alignment_score,
                attempt.edit_distance.map(|d| d as i64),
                verdict_to_str(attempt.verdict),
            ],
        )
        .context("inserting attempt")?;
        debug!(id = %id, word = %word, "attempt stored");
        Ok(id)
    }

    /// Newest first, optionally for one word.
    pub fn get_history(
        &self,
        word: Option<&str>,
        page: usize,
        page_size: usize,
    ) -> Result<AttemptPage> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 200);
        let offset = (page - 1).saturating_mul(page_size);
        let word = word.map(|w| w.trim().to_lowercase()).filter(|w| !w.is_empty());
        let conn = self.open()?;

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM attempts WHERE (?1 IS NULL OR word = ?1)",
            params![word],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT id, created_at, word, audio_path, recognized_text, alignment_score, edit_distance, verdict
             FROM attempts
             WHERE (?1 IS NULL OR word = ?1)
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let mut rows = stmt.query(params![word, page_size as i64, offset as i64])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let verdict: String = row.get(7)?;
            items.push(AttemptItem {
                id: row.get(0)?,
                created_at: ts_to_rfc3339(row.get(1)?),
                word: row.get(2)?,
                audio_path: row.get(3)?,
                recognized_text: row.get(4)?,
                alignment_score: row.get(5)?,
                edit_distance: row.get::<_, Option<i64>>(6)?.map(|d| d.max(0) as usize),
                verdict: verdict_from_str(&verdict),
            });
        }

        Ok(AttemptPage {
            items,
            total: total.max(0) as usize,
            page,
            page_size,
        })
    }

    pub fn get_stats(&self, range_days: usize) -> Result<StatsPayload> {
        let range_days = range_days.clamp(1, 365);
        let cutoff = Utc::now() - Duration::days(range_days as i64);
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT created_at, word, alignment_score, edit_distance, verdict
             FROM attempts
             WHERE created_at >= ?1
             ORDER BY created_at ASC",
        )?;
        let mut rows = stmt.query(params![cutoff.timestamp()])?;

        #[derive(Default)]
        struct WordAgg {
            attempts: usize,
            correct: usize,
            distance_total: usize,
            distance_count: usize,
            alignment_total: f64,
            alignment_count: usize,
            last_ts: i64,
        }

        let mut words: BTreeMap<String, WordAgg> = BTreeMap::new();
        let mut buckets: BTreeMap<(i32, u32, u32), (usize, usize)> = BTreeMap::new();
        let mut total_attempts = 0usize;
        let mut total_correct = 0usize;

        while let Some(row) = rows.next()? {
            let ts: i64 = row.get(0)?;
            let word: String = row.get(1)?;
            let alignment: Option<f64> = row.get(2)?;
            let distance: Option<i64> = row.get(3)?;
            let verdict: String = row.get(4)?;
            let correct = verdict_from_str(&verdict).is_correct();

            let agg = words.entry(word).or_default();
            agg.attempts += 1;
            agg.correct += usize::from(correct);
            if let Some(d) = distance {
                agg.distance_total += d.max(0) as usize;
                agg.distance_count += 1;
            }
            if let Some(a) = alignment.filter(|a| a.is_finite()) {
                agg.alignment_total += a;
                agg.alignment_count += 1;
            }
            agg.last_ts = agg.last_ts.max(ts);

            let dt = Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now);
            let day = buckets.entry((dt.year(), dt.month(), dt.day())).or_default();
            day.0 += 1;
            day.1 += usize::from(correct);

            total_attempts += 1;
            total_correct += usize::from(correct);
        }

        let words = words
            .into_iter()
            .map(|(word, agg)| WordStats {
                word,
                attempts: agg.attempts,
                correct: agg.correct,
                accuracy: ratio(agg.correct, agg.attempts),
                avg_edit_distance: (agg.distance_count > 0)
                    .then(|| agg.distance_total as f32 / agg.distance_count as f32),
                avg_alignment_score: (agg.alignment_count > 0)
                    .then(|| agg.alignment_total / agg.alignment_count as f64),
                last_attempt_at: ts_to_rfc3339(agg.last_ts),
            })
            .collect();

        let buckets = buckets
            .into_iter()
            .map(|((y, m, d), (attempts, correct))| StatsBucket {
                date: format!("{y:04}-{m:02}-{d:02}"),
                attempts,
                correct,
            })
            .collect();

        Ok(StatsPayload {
            range_days,
            total_attempts,
            total_correct,
            accuracy: ratio(total_correct, total_attempts),
            words,
            buckets,
        })
    }

    pub fn prune_history(&self, retention_days: usize) -> Result<usize> {
        if retention_days == 0 {
            return Ok(0);
        }
        let cutoff = Utc::now() - Duration::days(retention_days as i64);
        let conn = self.open()?;
        let changed = conn.execute(
            "DELETE FROM attempts WHERE created_at < ?1",
            params![cutoff.timestamp()],
        )?;
        Ok(changed)
    }

    pub fn delete_attempt(&self, id: &str) -> Result<bool> {
        let conn = self.open()?;
        let exists = conn
            .query_row("SELECT 1 FROM attempts WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?
            .is_some();
        if exists {
            conn.execute("DELETE FROM attempts WHERE id = ?1", params![id])?;
        }
        Ok(exists)
    }
}

impl AttemptRecorder for AttemptStore {
    fn record(&self, attempt: &AttemptRecord) {
        if let Err(e) = self.insert_attempt(attempt) {
            warn!(error = %e, word = %attempt.word, "failed to record attempt");
        }
    }
}

fn verdict_to_str(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Correct => "correct",
        Verdict::Incorrect => "incorrect",
    }
}

fn verdict_from_str(raw: &str) -> Verdict {
    if raw == "correct" {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    }
}

fn ratio(part: usize, whole: usize) -> f32 {
    if whole == 0 {
        0.0
    } else {
        part as f32 / whole as f32
    }
}

fn ts_to_rfc3339(ts: i64) -> String {
    let dt: DateTime<Utc> = Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now);
    dt.to_rfc3339()
}

fn new_id(prefix: &str) -> String {
    format!(
        "{prefix}-{}-{:08x}",
        Utc::now().timestamp_micros(),
        rand::random::<u32>()
    )
}
