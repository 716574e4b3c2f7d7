use super::*;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::path::PathBuf;
use tempfile::TempDir;

/// Build a minimal PDF with one page per entry in `page_texts`.
fn write_test_pdf(path: &Path, page_texts: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("should encode content stream"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(path).expect("should save test PDF");
}

#[test]
fn missing_file_is_a_typed_error() {
    let result = load_pages("no_such_document.pdf");

    match result {
        Err(RagError::PdfNotFound(path)) => {
            assert_eq!(path, PathBuf::from("no_such_document.pdf"));
        }
        other => panic!("Expected PdfNotFound, got {:?}", other),
    }
}

#[test]
fn directory_path_is_a_typed_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let result = load_pages(temp_dir.path());

    assert!(matches!(result, Err(RagError::PdfNotFound(_))));
}

#[test]
fn loads_pages_in_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let pdf_path = temp_dir.path().join("test.pdf");
    write_test_pdf(&pdf_path, &["First page text", "Second page text"]);

    let pages = load_pages(&pdf_path).expect("load should succeed");

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].page_number, 1);
    assert_eq!(pages[1].page_number, 2);
    assert!(pages[0].text.contains("First page text"));
    assert!(pages[1].text.contains("Second page text"));
}

#[test]
fn empty_pages_are_skipped() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let pdf_path = temp_dir.path().join("test.pdf");
    write_test_pdf(&pdf_path, &["Only real content", "   "]);

    let pages = load_pages(&pdf_path).expect("load should succeed");

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].page_number, 1);
}

#[test]
fn garbage_file_is_a_parse_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("not_a_pdf.pdf");
    std::fs::write(&path, b"this is not a pdf").expect("should write file");

    let result = load_pages(&path);

    assert!(matches!(result, Err(RagError::Pdf(_))));
}
