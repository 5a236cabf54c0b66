//! Output file naming and verification.
//!
//! A job writing `paper.pdf` into `/out` with target language `zh` must
//! produce `/out/paper.zh.mono.pdf` and/or `/out/paper.zh.dual.pdf`, one per
//! requested output mode. A pipeline that exits cleanly without every
//! requested file is treated as failed.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::BridgeError;
use crate::models::{OutputKind, TranslationJob};

/// A file the pipeline is expected to produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedOutput {
    pub kind: OutputKind,
    pub path: PathBuf,
}

/// `{stem}.{lang_out}.{mono|dual}.{ext}`
pub fn output_file_name(stem: &str, lang_out: &str, kind: OutputKind, ext: &str) -> String {
    format!("{}.{}.{}.{}", stem, lang_out, kind.suffix(), ext)
}

/// Paths the job must produce, monolingual first
pub fn expected_outputs(job: &TranslationJob) -> Vec<ExpectedOutput> {
    let stem = job.stem();
    let ext = job.extension();
    job.outputs
        .kinds()
        .into_iter()
        .map(|kind| ExpectedOutput {
            kind,
            path: job
                .output_dir
                .join(output_file_name(&stem, &job.lang_out, kind, &ext)),
        })
        .collect()
}

/// Confirm every expected output exists, returning their paths.
///
/// A missing file yields `PipelineFailed` carrying `diagnostics`.
pub fn locate_outputs(job: &TranslationJob, diagnostics: &str) -> Result<Vec<PathBuf>, BridgeError> {
    let expected = expected_outputs(job);
    let missing: Vec<String> = expected
        .iter()
        .filter(|output| !output.path.is_file())
        .map(|output| output.path.display().to_string())
        .collect();

    if !missing.is_empty() {
        tracing::warn!(
            missing = ?missing,
            "Pipeline reported success but expected outputs are missing"
        );
        return Err(BridgeError::PipelineFailed {
            reason: format!(
                "pipeline exited successfully but did not produce {}",
                missing.join(", ")
            ),
            diagnostics: diagnostics.to_string(),
        });
    }

    Ok(expected.into_iter().map(|output| output.path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutputModes, PageSelector};
    use crate::providers::{ProviderConfig, ProviderKind};
    use std::path::Path;

    fn job(output_dir: &Path, outputs: OutputModes) -> TranslationJob {
        TranslationJob {
            input_file: PathBuf::from("/docs/paper.pdf"),
            output_dir: output_dir.to_path_buf(),
            lang_in: "en".to_string(),
            lang_out: "zh".to_string(),
            pages: PageSelector::All,
            page_count: 3,
            provider: ProviderConfig::new(ProviderKind::OpenAi, "k", "https://x", "m", 4).unwrap(),
            outputs,
            watermark: true,
            qps: 4,
            admission_timeout: None,
        }
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name("paper", "zh", OutputKind::Mono, "pdf"),
            "paper.zh.mono.pdf"
        );
        assert_eq!(
            output_file_name("my.report", "ja", OutputKind::Dual, "PDF"),
            "my.report.ja.dual.PDF"
        );
    }

    #[test]
    fn test_expected_outputs_per_mode() {
        let out = Path::new("/out");
        let both = expected_outputs(&job(out, OutputModes::all()));
        assert_eq!(
            both.iter().map(|o| o.path.clone()).collect::<Vec<_>>(),
            vec![
                PathBuf::from("/out/paper.zh.mono.pdf"),
                PathBuf::from("/out/paper.zh.dual.pdf")
            ]
        );

        let mono_only = expected_outputs(&job(out, OutputModes::from_skip_flags(true, false)));
        assert_eq!(mono_only.len(), 1);
        assert_eq!(mono_only[0].kind, OutputKind::Mono);

        let dual_only = expected_outputs(&job(out, OutputModes::from_skip_flags(false, true)));
        assert_eq!(dual_only.len(), 1);
        assert_eq!(dual_only[0].path, PathBuf::from("/out/paper.zh.dual.pdf"));
    }

    #[test]
    fn test_locate_outputs_present() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path(), OutputModes::all());
        for output in expected_outputs(&job) {
            std::fs::write(&output.path, b"%PDF-1.7").unwrap();
        }
        let paths = locate_outputs(&job, "").unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_locate_outputs_missing_is_pipeline_failure() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path(), OutputModes::all());
        std::fs::write(dir.path().join("paper.zh.mono.pdf"), b"%PDF-1.7").unwrap();

        let err = locate_outputs(&job, "done.").unwrap_err();
        assert_eq!(err.kind(), "PipelineFailed");
        assert!(err.to_string().contains("paper.zh.dual.pdf"));
        assert_eq!(err.diagnostics(), Some("done."));
    }
}
