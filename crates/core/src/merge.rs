//! Merging annotation sets from independently edited copies of a document.
//!
//! The first input is the base. Every later input is a candidate whose
//! annotations are compared with everything already in the base by
//! [`fingerprint`]; only annotations the base has not seen are re-created.

use crate::config::Settings;
use crate::document::{open_document, with_document};
use crate::extract::extract_document;
use crate::sink::{AnnotationSink, DocumentSink};
use annotmerge_model::{fingerprint, AnnotationRecord, FingerprintKey};
use pdf_engine::{PdfEngine, PdfEngineError};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("at least 2 input files are required, got {0}")]
    NotEnoughInputs(usize),
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),
    #[error("output file {0} is also an input file")]
    OutputCollision(PathBuf),
    #[error("cannot read {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: PdfEngineError,
    },
    #[error("cannot save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: PdfEngineError,
    },
    #[error(transparent)]
    Engine(#[from] PdfEngineError),
}

/// Totals of a merge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Annotations already in the base document
    pub base_count: usize,
    pub merged: usize,
    pub failed: usize,
    /// Candidate annotations the base (or an earlier candidate) already had
    pub duplicate: usize,
    pub files_processed: usize,
}

impl MergeStats {
    fn absorb(&mut self, outcome: &CandidateOutcome) {
        self.merged += outcome.merged;
        self.failed += outcome.failed;
        self.duplicate += outcome.duplicate;
        self.files_processed += 1;
    }
}

/// Result of merging one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateOutcome {
    pub total: usize,
    /// Distinct fingerprints the accumulated set did not contain
    pub unique: usize,
    pub merged: usize,
    pub failed: usize,
    pub duplicate: usize,
}

/// Fingerprints of everything present in the base so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenFingerprints(BTreeSet<FingerprintKey>);

impl SeenFingerprints {
    pub fn from_records(records: &[AnnotationRecord]) -> Self {
        Self(records.iter().map(fingerprint).collect())
    }

    pub fn contains(&self, key: &FingerprintKey) -> bool {
        self.0.contains(key)
    }

    pub fn insert(&mut self, key: FingerprintKey) -> bool {
        self.0.insert(key)
    }

}

/// Merge one candidate's records into `sink`.
///
/// Records are visited by ascending page, keeping document order within a
/// page. Each new fingerprint is attempted once, on its first occurrence;
/// repeats inside the candidate count as duplicates.
pub fn merge_candidate<S: AnnotationSink + ?Sized>(
    mut seen: SeenFingerprints,
    records: &[AnnotationRecord],
    sink: &mut S,
    preview_chars: usize,
) -> (SeenFingerprints, CandidateOutcome) {
    let keys: Vec<FingerprintKey> = records.iter().map(fingerprint).collect();
    let mut pending: HashSet<&FingerprintKey> =
        keys.iter().filter(|key| !seen.contains(key)).collect();

    let mut outcome = CandidateOutcome {
        total: records.len(),
        unique: pending.len(),
        duplicate: records.len() - pending.len(),
        ..CandidateOutcome::default()
    };

    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|&index| records[index].page());

    for index in order {
        let key = &keys[index];
        if !pending.remove(key) {
            continue;
        }

        let record = &records[index];
        match sink.recreate(record) {
            Ok(()) => {
                seen.insert(key.clone());
                outcome.merged += 1;
            }
            Err(err) => {
                outcome.failed += 1;
                tracing::warn!(
                    page = record.page() + 1,
                    kind = %record.kind(),
                    preview = %record.content_preview(preview_chars),
                    %err,
                    "failed to merge annotation"
                );
            }
        }
    }

    (seen, outcome)
}

/// Running state of one merge: the accumulated fingerprints and totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRun {
    seen: SeenFingerprints,
    stats: MergeStats,
}

impl MergeRun {
    /// Start from the base document's records.
    pub fn new(base_records: &[AnnotationRecord]) -> Self {
        Self {
            seen: SeenFingerprints::from_records(base_records),
            stats: MergeStats {
                base_count: base_records.len(),
                files_processed: 1,
                ..MergeStats::default()
            },
        }
    }

    pub fn add_candidate<S: AnnotationSink + ?Sized>(
        &mut self,
        records: &[AnnotationRecord],
        sink: &mut S,
        preview_chars: usize,
    ) -> CandidateOutcome {
        let seen = std::mem::take(&mut self.seen);
        let (seen, outcome) = merge_candidate(seen, records, sink, preview_chars);
        self.seen = seen;
        self.stats.absorb(&outcome);
        outcome
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    pub fn finish(self) -> (SeenFingerprints, MergeStats) {
        (self.seen, self.stats)
    }
}

/// Merge already extracted record sets. `candidates` are processed in order.
pub fn merge<S: AnnotationSink + ?Sized>(
    base_records: &[AnnotationRecord],
    candidates: &[Vec<AnnotationRecord>],
    sink: &mut S,
    preview_chars: usize,
) -> (SeenFingerprints, MergeStats) {
    let mut run = MergeRun::new(base_records);
    for records in candidates {
        run.add_candidate(records, &mut *sink, preview_chars);
    }
    run.finish()
}

/// Merge the annotations of every input into a copy of the first one and
/// write it to `output`.
///
/// Inputs are checked before anything is opened. The output is written once,
/// after the last candidate; every document is closed on return.
pub fn merge_files<E: PdfEngine + ?Sized>(
    engine: &mut E,
    output: &Path,
    inputs: &[PathBuf],
    settings: &Settings,
) -> Result<MergeStats, MergeError> {
    check_paths(output, inputs)?;
    let Some((base_path, candidates)) = inputs.split_first() else {
        return Err(MergeError::NotEnoughInputs(inputs.len()));
    };

    let open = |engine: &mut E, path: &Path| {
        open_document(engine, path, settings.repair_inputs)
            .map_err(|source| MergeError::Open { path: path.to_path_buf(), source })
    };

    let base = open(&mut *engine, base_path.as_path())?;
    with_document(engine, base, |engine, base| {
        let base_records = extract_document(engine, base)
            .map_err(|source| MergeError::Open { path: base_path.clone(), source })?;
        tracing::info!(
            file = %base_path.display(),
            annotations = base_records.len(),
            "loaded base document"
        );

        let mut run = MergeRun::new(&base_records);

        for path in candidates {
            let handle = open(&mut *engine, path.as_path())?;
            let records = with_document(engine, handle, |engine, handle| {
                extract_document(engine, handle)
                    .map_err(|source| MergeError::Open { path: path.clone(), source })
            })?;

            let mut sink = DocumentSink::new(&mut *engine, base);
            let outcome = run.add_candidate(&records, &mut sink, settings.preview_chars);

            tracing::info!(
                file = %path.display(),
                total = outcome.total,
                unique = outcome.unique,
                merged = outcome.merged,
                failed = outcome.failed,
                "merged candidate"
            );
        }

        let stats = run.stats();
        engine
            .save(base, output, settings.save_options())
            .map_err(|source| MergeError::Save { path: output.to_path_buf(), source })?;
        tracing::info!(output = %output.display(), merged = stats.merged, "saved merged document");

        Ok(stats)
    })
}

fn check_paths(output: &Path, inputs: &[PathBuf]) -> Result<(), MergeError> {
    if inputs.len() < 2 {
        return Err(MergeError::NotEnoughInputs(inputs.len()));
    }

    if let Some(missing) = inputs.iter().find(|input| !input.is_file()) {
        return Err(MergeError::MissingInput(missing.clone()));
    }

    // An output that does not exist yet cannot be one of the (existing) inputs.
    let Ok(output_canonical) = fs::canonicalize(output) else {
        return Ok(());
    };
    for input in inputs {
        if fs::canonicalize(input).is_ok_and(|input| input == output_canonical) {
            return Err(MergeError::OutputCollision(output.to_path_buf()));
        }
    }

    Ok(())
}
