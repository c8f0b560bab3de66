use literal::{Bracket, ExtractError, extract_segment, parse_literal, read_assignment};
use serde_json::json;

#[test]
fn json_compatible_list_parses_strictly() {
    let source = "APP_TIERS_ROLES = [\"PM USA\", \"PM India\"]\n";
    let value = read_assignment(source, "APP_TIERS_ROLES", Bracket::Square)
        .expect("roles should extract");
    assert_eq!(value, json!(["PM USA", "PM India"]));
}

#[test]
fn keywords_and_comments_are_normalized() {
    let text = concat!(
        "FLAGS = {\n",
        "    \"enabled\": True,  # switched on\n",
        "    \"legacy\": False,\n",
        "    \"owner\": None\n",
        "}",
    );
    let value = extract_segment(text).expect("mapping should extract");
    assert_eq!(
        value,
        json!({"enabled": true, "legacy": false, "owner": null})
    );
}

#[test]
fn trailing_commas_fall_back_to_literal_parser() {
    let text = concat!(
        "EFFORT_ESTIMATION_TEMPLATE = {\n",
        "    \"Discovery\": {\n",
        "        \"total\": 40,\n",
        "        \"tasks\": {\n",
        "            \"Kickoff\": 8,  # first meeting\n",
        "            'Workshops': 32.5,\n",
        "        },\n",
        "    },\n",
        "}",
    );
    let value = extract_segment(text).expect("mapping should extract");
    assert_eq!(
        value,
        json!({"Discovery": {"total": 40, "tasks": {"Kickoff": 8, "Workshops": 32.5}}})
    );
}

#[test]
fn mapping_preserves_source_order() {
    let value = parse_literal("{'zeta': 1, 'alpha': 2, 'mid': 3,}").expect("dict should parse");
    let keys = value
        .as_object()
        .expect("value should be a mapping")
        .keys()
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn literal_parser_understands_source_language_forms() {
    let value = parse_literal(
        r#"[
            (1, -2, +3.5, 1_000, 2e3),
            'single',
            "esc \"quoted\" é",
            '''tri'ple''',
            "joined " "text",
            r"raw\d",
            {1: None, True: 'yes'},
        ]"#,
    )
    .expect("literal should parse");
    assert_eq!(
        value,
        json!([
            [1, -2, 3.5, 1000, 2000.0],
            "single",
            "esc \"quoted\" é",
            "tri'ple",
            "joined text",
            "raw\\d",
            {"1": null, "True": "yes"}
        ])
    );
}

#[test]
fn names_and_calls_are_rejected() {
    let err = parse_literal("[os.system('rm -rf /')]").expect_err("code must not parse");
    assert_eq!(err.line, 1);
    assert!(err.message.contains("os"), "message: {}", err.message);

    let err = parse_literal("{\n  'a': 1,\n  'b': open\n}").expect_err("bare names are rejected");
    assert_eq!(err.line, 3);
}

#[test]
fn unterminated_literal_reports_parse_error() {
    let err = extract_segment("DATA = [1, 2").expect_err("literal is incomplete");
    assert!(err.message.contains("end of input"), "message: {}", err.message);
}

#[test]
fn missing_assignment_surfaces_locate_error() {
    let err = read_assignment("OTHER = []", "DATA", Bracket::Square).expect_err("no segment");
    assert!(matches!(err, ExtractError::Locate(_)));
    assert_eq!(err.to_string(), "could not find 'DATA = ['");
}
