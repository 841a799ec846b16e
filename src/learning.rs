// File: src/learning.rs
use crate::core::context::CompilationSession;
use crate::core::engine::{EngineBackend, LearnStatus, SchemeEngine, Status, VARNAM_SUCCESS};
use std::path::Path;

/// Teaches the engine one correct spelling. A failure becomes an error
/// diagnostic; returns whether the word was learned.
#[track_caller]
pub fn learn_word<B: EngineBackend>(
    engine: &mut SchemeEngine<B>,
    session: &mut CompilationSession,
    word: &str,
) -> bool {
    match engine.learn(word) {
        Ok(()) => true,
        Err(e) => {
            session.record_error(e.to_string());
            false
        }
    }
}

/// Learns every word in `path`. Each bad line becomes a warning and the batch
/// goes on; a final warning summarizes the failures. Only a failure to run the
/// batch at all is an error.
#[track_caller]
pub fn learn_from_file<B: EngineBackend>(
    engine: &mut SchemeEngine<B>,
    session: &mut CompilationSession,
    path: &Path,
) -> Option<LearnStatus> {
    let mut failed_words = Vec::new();
    let result = engine.learn_from_file(path, &mut |word: &str, status: Status| {
        if status != VARNAM_SUCCESS {
            failed_words.push((word.to_string(), status));
        }
    });

    match result {
        Ok(status) => {
            for (word, code) in failed_words {
                session.record_warning(format!("Failed to learn '{}' (status {})", word, code));
            }
            if status.failed > 0 {
                session.record_warning(format!(
                    "Learned {} of {} words from '{}', {} failed",
                    status.learned(),
                    status.total_words,
                    path.display(),
                    status.failed
                ));
            }
            Some(status)
        }
        Err(e) => {
            session.record_error(e.to_string());
            None
        }
    }
}
