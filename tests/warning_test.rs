use data_version::ui;
use data_version::warning::PipelineWarning;

// ============================================================================
// PipelineWarning Display Tests
// ============================================================================

#[test]
fn test_missing_credentials_display() {
    let warning = PipelineWarning::MissingArtifactCredentials {
        remote: "storage".to_string(),
    };

    let display_msg = warning.to_string();
    assert!(
        display_msg.contains("storage"),
        "Message should name the remote, got: {}",
        display_msg
    );
    assert!(
        display_msg.contains("without credentials"),
        "Message should say the push continues, got: {}",
        display_msg
    );
}

#[test]
fn test_local_delete_failed_display() {
    let warning = PipelineWarning::LocalTagDeleteFailed {
        tag: "data-latest".to_string(),
        reason: "reference not found".to_string(),
    };

    let display_msg = warning.to_string();
    assert!(display_msg.contains("data-latest"));
    assert!(display_msg.contains("reference not found"));
}

#[test]
fn test_version_tag_exists_display() {
    let warning = PipelineWarning::VersionTagExists {
        tag: "data-v1.3.0".to_string(),
    };

    assert_eq!(
        warning.to_string(),
        "Tag 'data-v1.3.0' already exists, skipping creation"
    );
}

// ============================================================================
// Display Function Tests
// ============================================================================

#[test]
fn test_display_warning_all_variants() {
    let warnings = vec![
        PipelineWarning::MissingArtifactCredentials {
            remote: "storage".to_string(),
        },
        PipelineWarning::LocalTagDeleteFailed {
            tag: "data-previous".to_string(),
            reason: "locked".to_string(),
        },
        PipelineWarning::VersionTagExists {
            tag: "data-v1.0.0".to_string(),
        },
    ];

    for warning in &warnings {
        ui::display_warning(warning);
    }
}
