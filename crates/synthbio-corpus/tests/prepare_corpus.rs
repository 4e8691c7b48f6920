//! Directory conversion against small on-disk corpora.

use std::fs;

use synthbio_corpus::{prepare_dir, CorpusError, TableFormat};

const ARTICLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE article PUBLIC "-//NLM//DTD JATS (Z39.96) Journal Archiving and Interchange DTD v1.3 20210610//EN" "JATS-archivearticle1-3-mathml3.dtd">
<article xmlns:xlink="http://www.w3.org/1999/xlink" article-type="research-article">
  <front>
    <article-meta>
      <article-id pub-id-type="pmcid">PMC9000001</article-id>
      <title-group><article-title>AAV gene therapy for hemophilia B</article-title></title-group>
      <abstract><p>Factor IX expression was sustained.</p></abstract>
    </article-meta>
  </front>
  <body>
    <sec><title>Results</title>
      <table-wrap><label>Table 2</label><caption><p>Dosing</p></caption>
        <table><tbody><tr><td>Dose</td><td>FIX %</td></tr><tr><td>2e11</td><td>39</td></tr></tbody></table>
      </table-wrap>
    </sec>
  </body>
</article>"#;

/// Test: every XML file is converted, named by PMCID, and other files are ignored
#[test]
fn test_prepare_converts_directory() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let out = dest.path().join("input");
    fs::write(src.path().join("PMC9000001.xml"), ARTICLE).unwrap();
    fs::write(src.path().join("notes.xml"), "<article><front><article-meta><title-group><article-title>Notes</article-title></title-group></article-meta></front></article>").unwrap();
    fs::write(src.path().join("README.md"), "not xml").unwrap();

    let report = prepare_dir(src.path(), &out, TableFormat::Markdown).unwrap();
    assert_eq!(report.converted(), 2);
    assert!(report.failed.is_empty());
    assert_eq!(
        report.written,
        vec![out.join("PMC9000001.txt"), out.join("notes.txt")]
    );

    let text = fs::read_to_string(out.join("PMC9000001.txt")).unwrap();
    assert_eq!(
        text,
        "Title: AAV gene therapy for hemophilia B\n\n\
         PMCID: PMC9000001\n\n\
         Abstract 1:\n\n\
         Factor IX expression was sustained.\n\n\
         ## Results\n\n\
         Table: Table 2 - Dosing\n\
         | Dose | FIX % |\n\
         | --- | --- |\n\
         | 2e11 | 39 |\n"
    );
    assert_eq!(
        fs::read_to_string(out.join("notes.txt")).unwrap(),
        "Title: Notes\n"
    );
}

/// Test: a malformed file is reported and the rest of the batch still converts
#[test]
fn test_prepare_skips_malformed_files() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    fs::write(src.path().join("a_broken.xml"), "<article><body></article>").unwrap();
    fs::write(src.path().join("PMC9000001.xml"), ARTICLE).unwrap();

    let report = prepare_dir(src.path(), dest.path(), TableFormat::Tsv).unwrap();
    assert_eq!(report.converted(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("a_broken.xml"));
    assert!(matches!(report.failed[0].1, CorpusError::Xml(_)));

    let text = fs::read_to_string(dest.path().join("PMC9000001.txt")).unwrap();
    assert!(text.contains("Table: Table 2 - Dosing\nDose\tFIX %\n2e11\t39"));
}

/// Test: rerunning overwrites earlier output
#[test]
fn test_prepare_overwrites_existing_output() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    fs::write(src.path().join("PMC9000001.xml"), ARTICLE).unwrap();
    fs::write(dest.path().join("PMC9000001.txt"), "stale").unwrap();

    prepare_dir(src.path(), dest.path(), TableFormat::Csv).unwrap();
    let text = fs::read_to_string(dest.path().join("PMC9000001.txt")).unwrap();
    assert!(text.starts_with("Title: AAV gene therapy for hemophilia B\n"));
    assert!(text.contains("Dose,FIX %\n2e11,39"));
}
