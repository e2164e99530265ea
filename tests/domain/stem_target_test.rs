use std::str::FromStr;

use unmixer::domain::StemTarget;

#[test]
fn given_known_labels_when_parsing_then_returns_matching_targets() {
    for target in StemTarget::ALL {
        assert_eq!(StemTarget::from_str(target.as_str()).unwrap(), target);
    }
}

#[test]
fn given_unknown_label_when_parsing_then_error_lists_valid_targets() {
    let err = "piano".parse::<StemTarget>().unwrap_err();

    assert_eq!(err.0, "piano");
    assert_eq!(
        err.to_string(),
        "Target must be: vocals, drums, bass, or other"
    );
}

#[test]
fn given_wrong_case_when_parsing_then_is_rejected() {
    assert!("Vocals".parse::<StemTarget>().is_err());
    assert!("DRUMS".parse::<StemTarget>().is_err());
    assert!("".parse::<StemTarget>().is_err());
}

#[test]
fn given_target_when_naming_output_then_uses_separated_prefix() {
    assert_eq!(StemTarget::Vocals.output_file_name(), "separated_vocals.wav");
    assert_eq!(StemTarget::Other.output_file_name(), "separated_other.wav");
}

#[test]
fn given_target_when_serialized_then_is_lowercase_string() {
    let json = serde_json::to_string(&StemTarget::Bass).unwrap();
    assert_eq!(json, "\"bass\"");

    let parsed: StemTarget = serde_json::from_str("\"drums\"").unwrap();
    assert_eq!(parsed, StemTarget::Drums);
}
