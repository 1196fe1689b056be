//! Input normalization: file decoding and metadata validation.

use helpdesk_rag::{FileUpload, MetadataValue, RagError, decode_file, metadata_from_json};
use serde_json::json;

#[test]
fn plain_text_files_decode_as_is() {
    let upload = FileUpload::new("Refunds within 30 days.").with_content_type("text/plain");
    assert_eq!(decode_file(&upload).unwrap(), "Refunds within 30 days.");
}

#[test]
fn missing_content_type_is_treated_as_text() {
    let upload = FileUpload::new("faq").with_filename("faq.txt");
    assert_eq!(decode_file(&upload).unwrap(), "faq");
}

#[test]
fn utf8_charset_and_bom_are_accepted() {
    let mut bytes = "\u{feff}Öffnungszeiten".as_bytes().to_vec();
    bytes.extend_from_slice(b": 9-17");
    let upload = FileUpload::new(bytes).with_content_type("text/markdown; charset=\"UTF-8\"");

    assert_eq!(decode_file(&upload).unwrap(), "Öffnungszeiten: 9-17");
}

#[test]
fn html_files_are_reduced_to_text() {
    let upload = FileUpload::new("<h1>Shipping</h1><p>Free over $50</p>")
        .with_content_type("text/html");
    let text = decode_file(&upload).unwrap();
    assert!(text.contains("Shipping"));
    assert!(text.contains("Free over $50"));
    assert!(!text.contains("<h1>"));
}

#[test]
fn json_files_are_accepted() {
    let upload = FileUpload::new(r#"{"q": "hours"}"#).with_content_type("application/json");
    assert_eq!(decode_file(&upload).unwrap(), r#"{"q": "hours"}"#);
}

#[test]
fn binary_types_are_unsupported() {
    for content_type in ["application/pdf", "image/png", "application/octet-stream"] {
        let upload = FileUpload::new(vec![0x25, 0x50, 0x44, 0x46]).with_content_type(content_type);
        let err = decode_file(&upload).unwrap_err();
        assert!(matches!(err, RagError::UnsupportedContent(_)), "{content_type}: {err:?}");
        assert!(err.is_client_error());
    }
}

#[test]
fn non_utf8_content_is_unsupported() {
    let upload = FileUpload::new(vec![0xff, 0xfe, 0x00, 0x41]).with_content_type("text/plain");
    assert!(matches!(decode_file(&upload), Err(RagError::UnsupportedContent(_))));

    let latin1 = FileUpload::new("caf\u{e9}").with_content_type("text/plain; charset=iso-8859-1");
    assert!(matches!(decode_file(&latin1), Err(RagError::UnsupportedContent(_))));
}

#[test]
fn scalar_metadata_is_accepted() {
    let metadata =
        metadata_from_json(&json!({"category": "billing", "priority": 2, "weight": 0.5, "public": true}))
            .unwrap();

    assert_eq!(metadata["category"], MetadataValue::from("billing"));
    assert_eq!(metadata["priority"], MetadataValue::Integer(2));
    assert_eq!(metadata["weight"], MetadataValue::Float(0.5));
    assert_eq!(metadata["public"], MetadataValue::Bool(true));
}

#[test]
fn null_metadata_is_empty() {
    assert!(metadata_from_json(&json!(null)).unwrap().is_empty());
}

#[test]
fn nested_metadata_is_rejected() {
    for value in [
        json!({"tags": ["a", "b"]}),
        json!({"author": {"name": "x"}}),
        json!({"missing": null}),
        json!(["not", "an", "object"]),
        json!("text"),
    ] {
        let err = metadata_from_json(&value).unwrap_err();
        assert!(matches!(err, RagError::Validation(_)), "{value}: {err:?}");
    }
}
