//! `phonoscore`: score a recorded word from the command line.
//!
//! Exit status for `score`: 0 correct, 1 incorrect, 2 error.

mod scoring;
mod settings;
mod stt;
mod storage;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use phonoscore_core::phonetics::normalizer::normalize;
use phonoscore_core::{
    AttemptRecorder, NoopRecorder, PronunciationDictionary, ReferenceDirectory,
    ReferenceSynthesizer, ScoringEngine, SpeechRecognizer, TranscriptRecognizer,
    VerificationResult, WavDecoder,
};
use scoring::{Collaborators, ReferenceFile};
use serde::Serialize;
use settings::{default_db_path, default_settings_path, load_settings, save_settings, AppSettings};
use storage::AttemptStore;
use stt::HttpRecognizer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Pronunciation scoring for single words.
#[derive(Parser)]
#[command(name = "phonoscore", version)]
struct Cli {
    /// CMUdict-format pronunciation dictionary.
    #[arg(long, global = true)]
    dictionary: Option<PathBuf>,

    /// Attempt history database.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Settings file.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a recording of WORD.
    Score {
        #[arg(long)]
        word: String,

        /// Learner's recording (WAV).
        #[arg(long)]
        audio: PathBuf,

        /// Reference recording (WAV) for the acoustic check.
        #[arg(long, conflicts_with = "reference_dir")]
        reference: Option<PathBuf>,

        /// Directory of `<word>.wav` reference recordings.
        #[arg(long)]
        reference_dir: Option<PathBuf>,

        /// What the learner said, if already known.
        #[arg(long, conflicts_with = "stt")]
        transcript: Option<String>,

        /// Transcribe with the configured speech-to-text endpoint.
        #[arg(long)]
        stt: bool,

        /// Allowed edit distance as a fraction of the reference length.
        #[arg(long)]
        tolerance: Option<f64>,

        /// DTW score at or above which the attempt is rejected.
        #[arg(long)]
        ceiling: Option<f64>,

        /// Do not record this attempt.
        #[arg(long)]
        no_history: bool,

        /// Print a short human-readable summary instead of JSON.
        #[arg(long)]
        summary: bool,
    },

    /// Show dictionary pronunciations of WORD.
    Lookup { word: String },

    /// List past attempts, newest first.
    History {
        #[arg(long)]
        word: Option<String>,

        #[arg(long, default_value = "1")]
        page: usize,

        #[arg(long, default_value = "20")]
        page_size: usize,

        /// Delete the attempt with this id instead of listing.
        #[arg(long)]
        delete: Option<String>,
    },

    /// Accuracy per word over recent days.
    Stats {
        #[arg(long, default_value = "30")]
        days: usize,
    },

    /// Show or update persistent settings.
    Config {
        /// Default dictionary path to store.
        #[arg(long)]
        set_dictionary: Option<PathBuf>,

        /// Default reference directory to store.
        #[arg(long)]
        set_reference_dir: Option<PathBuf>,

        #[arg(long)]
        set_tolerance: Option<f64>,

        #[arg(long)]
        set_ceiling: Option<f64>,

        /// Enable or disable attempt history.
        #[arg(long)]
        set_history: Option<bool>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreOutput<'a> {
    #[serde(flatten)]
    result: &'a VerificationResult,
    feedback: &'static str,
}

#[derive(Serialize)]
struct LookupEntry {
    phonemes: String,
    vowels: String,
}

fn main() -> ExitCode {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("phonoscore=info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) if scoring::is_unknown_word(&e) => {
            eprintln!("Unknown word: {e:#}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    settings.apply_env_overrides();
    let db_path = cli.db.clone().unwrap_or_else(default_db_path);

    match cli.command {
        Command::Score {
            word,
            audio,
            reference,
            reference_dir,
            transcript,
            stt,
            tolerance,
            ceiling,
            no_history,
            summary,
        } => {
            if let Some(t) = tolerance {
                settings.tolerance_factor = t;
            }
            if let Some(c) = ceiling {
                settings.alignment_ceiling = c;
            }
            settings.normalize();

            let dictionary = load_dictionary(cli.dictionary.as_ref(), &settings)?;
            let engine = ScoringEngine::new(settings.engine_config(), dictionary)?;

            let recognizer = build_recognizer(transcript, stt, &settings)?;
            let references: Option<Box<dyn ReferenceSynthesizer>> = match (reference, reference_dir)
            {
                (Some(path), _) => Some(Box::new(ReferenceFile::new(path))),
                (None, Some(dir)) => Some(Box::new(ReferenceDirectory::new(dir))),
                (None, None) => settings
                    .reference_dir
                    .clone()
                    .map(|dir| Box::new(ReferenceDirectory::new(dir)) as Box<dyn ReferenceSynthesizer>),
            };

            let store = if settings.history_enabled && !no_history {
                Some(AttemptStore::new(db_path)?)
            } else {
                None
            };
            let recorder: &dyn AttemptRecorder = match &store {
                Some(store) => store,
                None => &NoopRecorder,
            };

            let collaborators = Collaborators {
                decoder: &WavDecoder,
                recognizer: recognizer.as_ref(),
                references: references.as_deref(),
                recorder,
            };
            let result = scoring::score_attempt(&engine, &collaborators, &word, &audio)?;

            if let Some(store) = &store {
                match store.prune_history(settings.retention_days) {
                    Ok(0) => {}
                    Ok(n) => info!(removed = n, "pruned old attempts"),
                    Err(e) => warn!(error = %e, "history pruning failed"),
                }
            }

            if summary {
                print_summary(&result);
            } else {
                let output = ScoreOutput {
                    result: &result,
                    feedback: result.feedback(),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            Ok(if result.verdict.is_correct() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }

        Command::Lookup { word } => {
            let dictionary = load_dictionary(cli.dictionary.as_ref(), &settings)?;
            let variants = dictionary.lookup(&word);
            if variants.is_empty() {
                bail!("\"{word}\" is not in the dictionary");
            }
            let entries: Vec<LookupEntry> = variants
                .iter()
                .map(|variant| LookupEntry {
                    phonemes: join(variant),
                    vowels: join(&normalize(variant)),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
            Ok(ExitCode::SUCCESS)
        }

        Command::History {
            word,
            page,
            page_size,
            delete,
        } => {
            let store = AttemptStore::new(db_path)?;
            if let Some(id) = delete {
                if !store.delete_attempt(&id)? {
                    bail!("no attempt with id {id}");
                }
                println!("deleted {id}");
                return Ok(ExitCode::SUCCESS);
            }
            let history = store.get_history(word.as_deref(), page, page_size)?;
            println!("{}", serde_json::to_string_pretty(&history)?);
            Ok(ExitCode::SUCCESS)
        }

        Command::Stats { days } => {
            let store = AttemptStore::new(db_path)?;
            let stats = store.get_stats(days)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(ExitCode::SUCCESS)
        }

        Command::Config {
            set_dictionary,
            set_reference_dir,
            set_tolerance,
            set_ceiling,
            set_history,
        } => {
            // Re-read without env overrides so secrets from the environment
            // are never written to disk.
            let mut stored = load_settings(&settings_path);
            let changed = set_dictionary.is_some()
                || set_reference_dir.is_some()
                || set_tolerance.is_some()
                || set_ceiling.is_some()
                || set_history.is_some();
            if let Some(path) = set_dictionary {
                stored.dictionary_path = Some(path);
            }
            if let Some(dir) = set_reference_dir {
                stored.reference_dir = Some(dir);
            }
            if let Some(t) = set_tolerance {
                stored.tolerance_factor = t;
            }
            if let Some(c) = set_ceiling {
                stored.alignment_ceiling = c;
            }
            if let Some(h) = set_history {
                stored.history_enabled = h;
            }
            stored.normalize();
            if changed {
                save_settings(&settings_path, &stored)
                    .with_context(|| format!("writing {}", settings_path.display()))?;
                info!(path = %settings_path.display(), "settings saved");
            }
            println!("{}", redacted_json(&stored)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_dictionary(
    flag: Option<&PathBuf>,
    settings: &AppSettings,
) -> Result<Arc<PronunciationDictionary>> {
    let Some(path) = flag.or(settings.dictionary_path.as_ref()) else {
        bail!("no pronunciation dictionary; pass --dictionary or run `phonoscore config --set-dictionary`");
    };
    let dictionary = PronunciationDictionary::load(path)
        .with_context(|| format!("loading dictionary {}", path.display()))?;
    Ok(Arc::new(dictionary))
}

fn build_recognizer(
    transcript: Option<String>,
    stt: bool,
    settings: &AppSettings,
) -> Result<Box<dyn SpeechRecognizer>> {
    if let Some(text) = transcript {
        return Ok(Box::new(TranscriptRecognizer::new(text)));
    }
    if !stt {
        // Audio only leaves the machine on an explicit --stt.
        warn!("no transcript and no --stt; phonetic check will be skipped");
        return Ok(Box::new(TranscriptRecognizer::silent()));
    }
    let Some(key) = &settings.stt_api_key else {
        bail!("--stt needs an API key (set PHONOSCORE_STT_API_KEY)");
    };
    info!(url = %settings.stt_url, model = %settings.stt_model, "using remote speech-to-text");
    Ok(Box::new(
        HttpRecognizer::new(&settings.stt_url, key, &settings.stt_model)
            .with_language(&settings.language_hint)
            .with_timeout(Duration::from_secs(settings.stt_timeout_secs)),
    ))
}

fn print_summary(result: &VerificationResult) {
    println!("{}: {}", result.word, result.feedback());
    match result.alignment_score {
        Some(score) => println!("  alignment score: {score:.2}"),
        None => println!("  alignment score: n/a (no reference audio)"),
    }
    match result.edit_distance {
        Some(d) => println!(
            "  edit distance:   {d} (allowed {})",
            result.max_allowed_distance
        ),
        None => println!("  edit distance:   n/a"),
    }
    if let Some(text) = &result.recognized_text {
        println!("  heard:           {text}");
    }
    println!("  expected vowels: {}", join(&result.reference_phonemes));
    println!("  heard vowels:    {}", join(&result.candidate_phonemes));
}

fn join(phonemes: &[phonoscore_core::Phoneme]) -> String {
    phonemes
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn redacted_json(settings: &AppSettings) -> Result<String> {
    let mut shown = settings.clone();
    if shown.stt_api_key.is_some() {
        shown.stt_api_key = Some("********".into());
    }
    Ok(serde_json::to_string_pretty(&shown)?)
}
