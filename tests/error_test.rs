//! Tests for error types

use variant_db::Error;

#[test]
fn test_no_variants_error() {
    let error = Error::NoVariants("checkout_button".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("checkout_button"));
    assert!(error_str.contains("at least one variant"));
    assert!(error.is_configuration());
}

#[test]
fn test_duplicate_variant_error() {
    let error = Error::DuplicateVariant {
        experiment_id: "hero".to_string(),
        variant_id: "a".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("duplicate variant id 'a'"));
    assert!(error_str.contains("hero"));
}

#[test]
fn test_invalid_weight_error() {
    let error = Error::InvalidWeight {
        experiment_id: "hero".to_string(),
        variant_id: "b".to_string(),
        weight: -3.0,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("-3"));
    assert!(error_str.contains("finite and >= 0"));
}

#[test]
fn test_zero_total_weight_error() {
    let error = Error::ZeroTotalWeight("hero".to_string());
    assert!(format!("{error}").contains("total variant weight must be > 0"));
}

#[test]
fn test_invalid_total_weight_error() {
    let error = Error::InvalidTotalWeight {
        experiment_id: "hero".to_string(),
        total: f64::INFINITY,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("hero"));
    assert!(error_str.contains("inf"));
    assert!(error_str.contains("not finite"));
    assert!(error.is_configuration());
}

#[test]
fn test_invalid_url_pattern_error() {
    let error = Error::InvalidUrlPattern {
        experiment_id: "hero".to_string(),
        pattern: "/landing/*".to_string(),
        reason: "size limit exceeded".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("'/landing/*'"));
    assert!(error_str.contains("size limit exceeded"));
    assert!(error.is_configuration());
}

#[test]
fn test_traffic_allocation_error() {
    let error = Error::InvalidTrafficAllocation {
        experiment_id: "hero".to_string(),
        allocation: 150.0,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("150"));
    assert!(error_str.contains("[0, 100]"));
}

#[test]
fn test_variant_removed_error() {
    let error = Error::VariantRemoved {
        experiment_id: "hero".to_string(),
        variant_id: "b".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("variant 'b' was removed"));
    assert!(error_str.contains("Remove the experiment first"));
    assert!(error.is_configuration());
}

#[test]
fn test_empty_ids_and_window_errors() {
    assert!(format!("{}", Error::EmptyExperimentId).contains("id must not be empty"));
    assert!(format!("{}", Error::EmptyVariantId("hero".to_string())).contains("variant id"));
    assert!(format!("{}", Error::InvalidWindow("hero".to_string())).contains("start time is after end time"));
}

#[test]
fn test_storage_error() {
    let error = Error::StorageError("disk full".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("disk full"));
    assert!(!error.is_configuration());
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
    assert!(!error.is_configuration());
}

#[test]
fn test_database_error_conversion() {
    let error: Error = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(format!("{error}").contains("Database error"));
    assert!(!error.is_configuration());
}

#[test]
fn test_serialization_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("Serialization error"));
    assert!(!error.is_configuration());
}

#[test]
fn test_error_debug() {
    let error = Error::StorageError("test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("StorageError"));
}
