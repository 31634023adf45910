//! Integration tests for the TSV output files

use std::fs;
use tempfile::TempDir;

use clipscout::models::ProductRecord;
use clipscout::storage::tsv::{OutputPaths, PRODUCT_HEADER};
use clipscout::storage::{ProcessedUrlWriter, RecordSink, TsvProductWriter};

#[test]
fn test_record_round_trip_through_file() {
    let dir = TempDir::new().unwrap();
    let paths = OutputPaths::for_seed(dir.path(), "https://www.tokopedia.com/").unwrap();
    let mut writer = TsvProductWriter::new(&paths.products);

    let records = vec![
        ProductRecord::new(
            "100",
            "https://www.tokopedia.com/store/blender",
            vec![
                "https://www.youtube.com/watch?v=abc123".to_string(),
                "https://www.youtube.com/watch?v=xyz789".to_string(),
            ],
        ),
        ProductRecord::new("101", "https://www.tokopedia.com/store/mixer", Vec::new()),
        ProductRecord::new(
            "102\twith tab",
            "https://www.tokopedia.com/store/kettle\n",
            vec!["https://www.youtube.com/watch?v=k1".to_string()],
        ),
    ];
    for record in &records {
        writer.write_record(record).unwrap();
    }

    let content = fs::read_to_string(&paths.products).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some(PRODUCT_HEADER));

    let parsed: Vec<ProductRecord> = lines
        .map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            assert_eq!(fields.len(), 3, "row: {line:?}");
            let links = if fields[2].is_empty() {
                Vec::new()
            } else {
                fields[2].split(',').map(str::to_string).collect()
            };
            ProductRecord::new(fields[0], fields[1], links)
        })
        .collect();

    assert_eq!(parsed[0], records[0]);
    assert_eq!(parsed[1], records[1]);
    assert_eq!(parsed[2].product_id(), "102 with tab");
    assert_eq!(parsed[2].product_url(), "https://www.tokopedia.com/store/kettle ");
}

#[test]
fn test_output_files_named_after_domain() {
    let dir = TempDir::new().unwrap();
    let paths = OutputPaths::for_seed(dir.path(), "https://www.tokopedia.com/").unwrap();

    TsvProductWriter::new(&paths.products)
        .append(&ProductRecord::new("1", "https://www.tokopedia.com/a/b", Vec::new()))
        .unwrap();
    ProcessedUrlWriter::new(&paths.processed)
        .write_all(&["https://www.tokopedia.com/".to_string()])
        .unwrap();

    assert!(dir.path().join("tokopedia-ProductDetails.tsv").exists());
    assert!(dir.path().join("tokopedia-ProcessedURLs.tsv").exists());
}

#[test]
fn test_unwritable_location_is_an_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();

    let writer = TsvProductWriter::new(blocker.join("shop-ProductDetails.tsv"));
    let result = writer.append(&ProductRecord::new("1", "https://a.test/b/c", Vec::new()));
    assert!(result.is_err());
    assert!(!writer.exists());
}
