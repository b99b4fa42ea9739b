mod common;

use std::sync::Arc;

use rand::Rng;

use common::{classifier, gradient_jpeg, gradient_png, solid_png, ScriptedBackend};
use stoolai::classifier::CLASS_LABELS;
use stoolai::error::{ClassifyError, EMPTY_INPUT_MESSAGE};
use stoolai::ClassificationResult;

#[test]
fn test_empty_input_rejected_before_loading() {
    let backend = Arc::new(ScriptedBackend::new());
    let classifier = classifier(backend.clone());

    let result = classifier.classify(&[]);

    assert_eq!(result, ClassificationResult::error(EMPTY_INPUT_MESSAGE));
    assert_eq!(result.confidence(), 0.0);
    assert_eq!(backend.loads(), 0);
    assert!(!classifier.loader().is_loaded());
}

#[test]
fn test_garbage_bytes_fail_in_preprocessing() {
    let backend = Arc::new(ScriptedBackend::new());
    let classifier = classifier(backend.clone());

    let mut garbage = vec![0u8; 512];
    rand::rng().fill(&mut garbage[..]);
    // No known format signature starts with these bytes.
    garbage[0] = 0x00;
    garbage[1] = 0x01;

    let result = classifier.classify(&garbage);
    let message = result.error_message().unwrap();
    assert!(message.starts_with("Classification failed: "));
    assert!(result.predicted_type().is_none());

    let err = classifier.run_pipeline(&garbage).unwrap_err();
    assert!(matches!(err, ClassifyError::Decode(_)));
    // Decoding fails before the model is touched.
    assert_eq!(backend.loads(), 0);
}

#[test]
fn test_valid_image_yields_known_label() {
    let classifier = classifier(Arc::new(ScriptedBackend::new()));

    let images = [
        gradient_png(64, 48),
        gradient_jpeg(320, 200),
        solid_png(10, 10, [200, 120, 40]),
    ];
    for bytes in images {
        let result = classifier.classify(&bytes);
        assert!(!result.is_error(), "unexpected error: {:?}", result);

        let label = result.predicted_type().unwrap();
        assert!(CLASS_LABELS.contains(&label));
        let confidence = result.confidence();
        assert!(confidence > 0.0 && confidence <= 1.0);
        // Seven classes: the winner carries at least a seventh of the mass.
        assert!(confidence >= 1.0 / 7.0 - 1e-6);
    }
}

#[test]
fn test_probabilities_sum_to_one() {
    let classifier = classifier(Arc::new(ScriptedBackend::new()));
    let decision = classifier.run_pipeline(&gradient_png(100, 100)).unwrap();

    let sum: f32 = decision.probabilities.iter().sum();
    assert!((sum - 1.0).abs() < 1e-4);
    assert_eq!(decision.label, CLASS_LABELS[decision.index]);
    assert_eq!(decision.confidence, decision.probabilities[decision.index]);
}

#[test]
fn test_classification_is_deterministic() {
    let classifier = classifier(Arc::new(ScriptedBackend::new()));
    let bytes = gradient_jpeg(256, 256);

    let first = classifier.classify(&bytes);
    for _ in 0..5 {
        assert_eq!(classifier.classify(&bytes), first);
    }
}

#[test]
fn test_input_size_does_not_change_solid_colour_result() {
    let classifier = classifier(Arc::new(ScriptedBackend::new()));
    let colour = [30, 160, 90];

    let reference = classifier.classify(&solid_png(224, 224, colour));
    for (w, h) in [(100, 100), (300, 120), (512, 512), (1, 1)] {
        let result = classifier.classify(&solid_png(w, h, colour));
        assert_eq!(result.predicted_type(), reference.predicted_type());
        assert!((result.confidence() - reference.confidence()).abs() < 1e-5);
    }
}

#[test]
fn test_colour_drives_scripted_prediction() {
    let classifier = classifier(Arc::new(ScriptedBackend::new()));

    // Scripted logits are 3x the channel means; a red image maximizes the first.
    let red = classifier.classify(&solid_png(32, 32, [255, 0, 0]));
    assert_eq!(red.predicted_type(), Some("type-1"));

    // A black image has negative means everywhere and red sits furthest
    // below zero, so the negated red logit wins.
    let black = classifier.classify(&solid_png(32, 32, [0, 0, 0]));
    assert_eq!(black.predicted_type(), Some("type-4"));
}

#[test]
fn test_model_load_failure_is_reported_then_recovers() {
    let backend = Arc::new(ScriptedBackend::new().failing_first(1));
    let classifier = classifier(backend.clone());
    let bytes = gradient_png(50, 50);

    let failed = classifier.classify(&bytes);
    let message = failed.error_message().unwrap();
    assert!(message.starts_with("Classification failed: Failed to load ONNX model"));

    let ok = classifier.classify(&bytes);
    assert!(!ok.is_error());
    assert_eq!(backend.loads(), 2);
}

#[test]
fn test_panicking_model_becomes_error_result() {
    let classifier = classifier(Arc::new(ScriptedBackend::new().panicking()));

    let result = classifier.classify(&gradient_png(20, 20));
    assert_eq!(result.error_message(), Some("Classification failed: internal error"));

    // Still usable afterwards.
    let again = classifier.classify(&gradient_png(20, 20));
    assert!(again.is_error());
}

#[test]
fn test_result_wire_format() {
    let classifier = classifier(Arc::new(ScriptedBackend::new()));

    let ok = serde_json::to_value(classifier.classify(&gradient_png(40, 40))).unwrap();
    assert!(ok.get("predictedType").is_some());
    assert!(ok.get("confidence").is_some());
    assert!(ok.get("error").is_none());

    let err = serde_json::to_value(classifier.classify(&[])).unwrap();
    assert_eq!(err, serde_json::json!({ "error": EMPTY_INPUT_MESSAGE }));
}
