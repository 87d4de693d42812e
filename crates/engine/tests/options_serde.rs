use rstest::rstest;
use xmldb_engine::consts::INLINE_TEXT;
use xmldb_engine::{FtCase, FtOptions, Options};

#[rstest]
fn options_roundtrip_through_json() {
    let options = Options::new().with_max_nodes(1000).with_chop_whitespace(false).with_strip_namespaces(true);
    let json = serde_json::to_string(&options).unwrap();
    let back: Options = serde_json::from_str(&json).unwrap();
    assert_eq!(back, options);
}

#[rstest]
fn missing_fields_take_defaults() {
    let options: Options = serde_json::from_str(r#"{ "max_nodes": 10 }"#).unwrap();
    assert_eq!(options.max_nodes, 10);
    assert_eq!(options.inline_text, INLINE_TEXT);
    assert!(options.chop_whitespace);
    assert!(!options.strip_namespaces);
}

#[rstest]
#[case("insensitive", FtCase::Insensitive)]
#[case("sensitive", FtCase::Sensitive)]
#[case("lower", FtCase::Lower)]
#[case("upper", FtCase::Upper)]
fn case_modes_use_lowercase_names(#[case] name: &str, #[case] case: FtCase) {
    let options: FtOptions = serde_json::from_str(&format!(r#"{{ "case": "{name}" }}"#)).unwrap();
    assert_eq!(options.case, case);
    assert!(!options.diacritics_sensitive);
    assert_eq!(serde_json::to_value(&options).unwrap()["case"], name);
}

#[rstest]
fn unknown_case_mode_is_rejected() {
    assert!(serde_json::from_str::<FtOptions>(r#"{ "case": "title" }"#).is_err());
}
