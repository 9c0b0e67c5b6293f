use octave_core::lexer::tokenize;
use octave_core::token::TokenKind;

#[test]
fn grammar_sentinel_only_recognized_at_offset_zero() {
    let out = tokenize("OCTAVE::5.1.0\n===DOC===\n===END===\n", true).unwrap();
    assert_eq!(out.tokens[0].kind, TokenKind::GrammarSentinel);

    let out = tokenize("NOTE::OCTAVE::5.1.0\n", true).unwrap();
    assert!(!out.tokens.iter().any(|t| t.kind == TokenKind::GrammarSentinel));
}

#[test]
fn ascii_operator_aliases_normalize_and_are_logged() {
    let out = tokenize("===DOC===\nMETA:\n  A -> B\n===END===\n", true).unwrap();
    assert!(out.tokens.iter().any(|t| t.kind == TokenKind::Flow && t.value == "\u{2192}"));
    assert!(out.repairs.iter().any(|r| r.original == "->"));
}

#[test]
fn hash_alias_is_section_not_comment() {
    let out = tokenize("===DOC===\n#CONTEXT::Intro\n===END===\n", true).unwrap();
    assert!(out.tokens.iter().any(|t| t.kind == TokenKind::Section));
}

#[test]
fn double_slash_starts_a_comment() {
    let out = tokenize("===DOC===\n// a note\n===END===\n", true).unwrap();
    assert!(out.tokens.iter().any(|t| t.kind == TokenKind::Comment && t.value == "a note"));
}

#[test]
fn tab_outside_literal_zone_is_an_error() {
    let err = tokenize("===DOC===\n\tKEY:: 1\n===END===\n", true).unwrap_err();
    assert_eq!(err.error_code, "E005");
}

#[test]
fn unbalanced_bracket_points_at_first_offender() {
    let err = tokenize("===DOC===\nKEY:: [1, 2\n===END===\n", true).unwrap_err();
    assert_eq!(err.error_code, "E_UNBALANCED_BRACKET");
}

#[test]
fn literal_zone_content_is_not_nfc_normalized() {
    let text = "===DOC===\nBODY::\n  ```\n  caf\u{0065}\u{0301}\n  ```\n===END===\n";
    let out = tokenize(text, true).unwrap();
    let content = out.tokens.iter().find(|t| t.kind == TokenKind::LiteralContent).expect("literal content token");
    assert!(content.value.contains("caf\u{0065}\u{0301}"));
}

#[test]
fn percent_suffix_merges_into_previous_token() {
    let out = tokenize("===DOC===\nRATE:: 60%\n===END===\n", true).unwrap();
    assert!(out.tokens.iter().any(|t| t.value == "60%"));
}

#[test]
fn angle_bracket_annotation_is_a_single_identifier_token() {
    let out = tokenize("===DOC===\nAGENT:: ATHENA<strategic_wisdom>\n===END===\n", true).unwrap();
    assert!(out.tokens.iter().any(|t| t.kind == TokenKind::Identifier && t.value == "ATHENA<strategic_wisdom>"));
}

#[test]
fn standalone_angle_bracket_is_unexpected_character_not_an_identifier() {
    let err = tokenize("===DOC===\nKEY:: <\n===END===\n", true).unwrap_err();
    assert_eq!(err.error_code, "E005");
}

#[test]
fn scientific_notation_number_keeps_raw_lexeme_on_the_token() {
    let out = tokenize("===DOC===\nRATE:: 1e10\n===END===\n", true).unwrap();
    let num = out.tokens.iter().find(|t| t.kind == TokenKind::Number).expect("number token");
    assert_eq!(num.raw_lexeme.as_deref(), Some("1e10"));
}
