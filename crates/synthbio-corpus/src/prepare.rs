//! Batch conversion of an XML directory into engine input files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::CorpusError;
use crate::jats::{extract_text_from_str, TableFormat};

/// Outcome of one [`prepare_dir`] run.
#[derive(Debug, Default)]
pub struct PrepareReport {
    /// Text files written, in processing order.
    pub written: Vec<PathBuf>,

    /// Sources that could not be converted, with the reason.
    pub failed: Vec<(PathBuf, CorpusError)>,
}

impl PrepareReport {
    pub fn converted(&self) -> usize {
        self.written.len()
    }
}

/// `<PMCID>.txt` when the source stem carries one, else `<stem>.txt`.
pub fn output_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = pmcid_re()
        .find(&stem)
        .map(|m| m.as_str().to_string())
        .unwrap_or(stem);
    format!("{base}.txt")
}

/// Convert every `*.xml` file directly under `source` into `dest`.
///
/// Files are processed in name order and existing outputs are overwritten.
/// A file that fails to parse is reported and skipped.
pub fn prepare_dir(
    source: &Path,
    dest: &Path,
    format: TableFormat,
) -> Result<PrepareReport, CorpusError> {
    if !source.is_dir() {
        return Err(CorpusError::SourceNotFound(source.to_path_buf()));
    }
    fs::create_dir_all(dest).map_err(|e| CorpusError::io(dest, e))?;

    let mut sources: Vec<PathBuf> = fs::read_dir(source)
        .map_err(|e| CorpusError::io(source, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "xml"))
        .collect();
    sources.sort();
    debug!(count = sources.len(), source = %source.display(), "found XML sources");

    let mut report = PrepareReport::default();
    for path in sources {
        match convert_file(&path, dest, format) {
            Ok(written) => report.written.push(written),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to convert article");
                report.failed.push((path, e));
            }
        }
    }
    info!(
        converted = report.converted(),
        failed = report.failed.len(),
        dest = %dest.display(),
        "corpus prepared"
    );
    Ok(report)
}

fn convert_file(path: &Path, dest: &Path, format: TableFormat) -> Result<PathBuf, CorpusError> {
    let xml = fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
    let text = extract_text_from_str(&xml, format)?;
    let out = dest.join(output_name(path));
    fs::write(&out, text).map_err(|e| CorpusError::io(&out, e))?;
    Ok(out)
}

fn pmcid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"PMC\d+").expect("static PMCID regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name_prefers_pmcid() {
        assert_eq!(output_name(Path::new("in/PMC7654321.xml")), "PMC7654321.txt");
        assert_eq!(output_name(Path::new("pmc_PMC42_full.xml")), "PMC42.txt");
        assert_eq!(output_name(Path::new("article-7.xml")), "article-7.txt");
    }

    #[test]
    fn test_missing_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = prepare_dir(&dir.path().join("nope"), dir.path(), TableFormat::Markdown)
            .unwrap_err();
        assert!(matches!(err, CorpusError::SourceNotFound(_)));
    }
}
