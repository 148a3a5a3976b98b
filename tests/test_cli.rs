//! End-to-end tests of the `tag_pdf` binary on files in a temporary directory.

use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn write_pdf(path: &Path, content: &[u8]) {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn catalog(doc: &Document) -> &lopdf::Dictionary {
    let id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
    doc.get_dictionary(id).unwrap()
}

fn tag_pdf() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tag_pdf"))
}

#[test]
fn test_tags_document_and_writes_report() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let elements = dir.path().join("elements.json");
    let output = dir.path().join("out.pdf");
    let report = dir.path().join("report.json");

    write_pdf(&input, b"BT /F1 12 Tf 72 700 Td (Intro) Tj 0 -20 Td (Hello world) Tj ET");
    std::fs::write(
        &elements,
        r#"[{"role": "H1", "content": "Intro", "page": 1},
            {"role": "P", "content": "Hello world", "page": 1}]"#,
    )
    .unwrap();

    let status = tag_pdf()
        .arg(&input)
        .arg(&elements)
        .arg(&output)
        .args(["--report", report.to_str().unwrap(), "--lang", "en-US"])
        .status()
        .unwrap();
    assert!(status.success());

    let tagged = Document::load(&output).unwrap();
    let catalog = catalog(&tagged);
    assert!(catalog.has(b"StructTreeRoot"));
    assert!(catalog.has(b"MarkInfo"));

    let page_id = tagged.get_pages()[&1];
    let content = tagged.get_page_content(page_id).unwrap();
    let content = String::from_utf8_lossy(&content);
    assert!(content.contains("/MCID 0 >> BDC"));
    assert!(content.contains("/MCID 1 >> BDC"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["linked"], 2);
    assert_eq!(report["unlinked"], 0);
}

#[test]
fn test_usage_error_exits_with_two() {
    let status = tag_pdf().arg("only-one-arg.pdf").status().unwrap();
    assert_eq!(status.code(), Some(2));
}

#[test]
fn test_missing_input_exits_with_one() {
    let dir = tempdir().unwrap();
    let elements = dir.path().join("elements.json");
    std::fs::write(&elements, "[]").unwrap();

    let status = tag_pdf()
        .arg(dir.path().join("missing.pdf"))
        .arg(&elements)
        .arg(dir.path().join("out.pdf"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
    assert!(!dir.path().join("out.pdf").exists());
}
