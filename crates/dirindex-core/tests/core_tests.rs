use chrono::{TimeZone, Utc};
use dirindex_core::{IndexConfig, MetadataRecord, ScanError, ScanWarning, WarningKind};
use std::path::PathBuf;

#[test]
fn test_record_serde_field_names() {
    let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let record = MetadataRecord::file("/a/f.txt", 100, t, t);

    let json = serde_json::to_value(&record).unwrap();
    let obj = json.as_object().unwrap();

    for key in [
        "path",
        "name",
        "is_directory",
        "size",
        "modification_time",
        "creation_time",
        "type_tag",
        "parent_path",
    ] {
        assert!(obj.contains_key(key), "missing field {key}");
    }
    assert_eq!(obj["size"], 100);
    assert_eq!(obj["type_tag"], "document/txt");
}

#[test]
fn test_record_optional_fields_omitted() {
    let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut record = MetadataRecord::file("/a/Makefile", 10, t, t).with_parent(None);
    record.type_tag = None;

    let json = serde_json::to_string(&record).unwrap();
    assert!(!json.contains("type_tag"));
    assert!(!json.contains("parent_path"));

    let back: MetadataRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_directory_has_no_extension_tag() {
    let t = Utc::now();
    let record = MetadataRecord::directory("/srv/archive.zip.d", t, t);
    assert_eq!(record.type_tag.as_deref(), Some("directory"));
}

#[test]
fn test_config_partial_deserialize() {
    // Missing fields fall back to defaults.
    let config: IndexConfig =
        serde_json::from_str(r#"{ "state_dir": "/tmp/state", "max_passes": 3 }"#).unwrap();

    assert_eq!(config.state_dir, PathBuf::from("/tmp/state"));
    assert_eq!(config.max_passes, 3);
    assert!(!config.include_hidden);
    assert!(config.skip_packages);
    assert!(!config.package_extensions.is_empty());
}

#[test]
fn test_scan_error_not_found() {
    let err = ScanError::io(
        "/missing",
        std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
    );
    assert!(matches!(err, ScanError::NotFound { .. }));
    assert!(err.to_string().contains("/missing"));
}

#[test]
fn test_warning_constructors() {
    let warning = ScanWarning::metadata("/a/b", "no timestamps");
    assert_eq!(warning.kind, WarningKind::MetadataError);
    assert_eq!(warning.path, PathBuf::from("/a/b"));
}
