use apigen_scanner::{TokenKind, Tokenizer};

#[test]
fn identifiers_and_punctuation_are_lexed_with_lines() {
    let source = "class Foo :\n    public Bar";
    let mut tok = Tokenizer::new(source, "Foo.h");

    let t = tok.next_token().unwrap();
    assert_eq!(t.kind, TokenKind::Identifier);
    assert_eq!(t.text, "class");
    assert_eq!(t.line, 1);

    assert_eq!(tok.next_token().unwrap().text, "Foo");
    assert_eq!(tok.next_token().unwrap().kind, TokenKind::Colon);

    let t = tok.next_token().unwrap();
    assert_eq!(t.text, "public");
    assert_eq!(t.line, 2);
}

#[test]
fn double_colon_is_one_token() {
    let mut tok = Tokenizer::new("Engine::Core::Object", "A.h");
    assert_eq!(tok.next_token().unwrap().text, "Engine");
    assert_eq!(tok.next_token().unwrap().kind, TokenKind::DoubleColon);
    assert_eq!(tok.next_token().unwrap().text, "Core");
    assert_eq!(tok.next_token().unwrap().kind, TokenKind::DoubleColon);
    assert_eq!(tok.next_token().unwrap().text, "Object");
    assert_eq!(tok.next_token().unwrap().kind, TokenKind::EndOfFile);
}

#[test]
fn string_literals_keep_escapes_in_source_text() {
    let mut tok = Tokenizer::new(r#""hello \"world\"" x"#, "A.h");
    let t = tok.next_token().unwrap();
    assert_eq!(t.kind, TokenKind::String);
    assert_eq!(t.text, r#""hello \"world\"""#);
    assert_eq!(tok.next_token().unwrap().text, "x");
}

#[test]
fn unterminated_string_is_a_syntax_error() {
    let mut tok = Tokenizer::new("\"oops\nnext", "A.h");
    let err = tok.next_token().unwrap_err();
    assert_eq!(err.kind, apigen_common::ErrorKind::Syntax);
    assert_eq!(err.location.unwrap().line, 1);
}

#[test]
fn unterminated_block_comment_is_a_syntax_error() {
    let mut tok = Tokenizer::new("/* no end", "A.h");
    assert!(tok.next_token().is_err());
}

#[test]
fn comments_are_skipped_by_next_token() {
    let source = "// leading\n/* block\ncomment */ value";
    let mut tok = Tokenizer::new(source, "A.h");
    let t = tok.next_token().unwrap();
    assert_eq!(t.text, "value");
    assert_eq!(t.line, 3);
}

#[test]
fn block_comments_advance_the_line_counter() {
    let mut tok = Tokenizer::new("/* a\nb\nc */ x", "A.h");
    assert_eq!(tok.next_token().unwrap().line, 3);
}

#[test]
fn newlines_are_visible_on_line_mode() {
    let mut tok = Tokenizer::new("#define X 1\nint", "A.h");
    assert_eq!(tok.next_token_on_line().unwrap().kind, TokenKind::Preprocessor);
    assert_eq!(tok.next_token_on_line().unwrap().text, "define");
    assert_eq!(tok.next_token_on_line().unwrap().text, "X");
    assert_eq!(tok.next_token_on_line().unwrap().text, "1");
    assert_eq!(tok.next_token_on_line().unwrap().kind, TokenKind::Newline);
    assert_eq!(tok.next_token_on_line().unwrap().text, "int");
}

#[test]
fn rewind_returns_the_same_token_without_rereading() {
    let mut tok = Tokenizer::new("alpha beta", "A.h");
    let first = tok.next_token().unwrap();
    tok.rewind(first);
    let again = tok.next_token().unwrap();
    assert_eq!(first, again);
    assert_eq!(tok.next_token().unwrap().text, "beta");
}

#[test]
fn peek_does_not_consume() {
    let mut tok = Tokenizer::new("one two", "A.h");
    assert_eq!(tok.peek_token().unwrap().text, "one");
    assert_eq!(tok.next_token().unwrap().text, "one");
    assert_eq!(tok.next_token().unwrap().text, "two");
}

#[test]
fn expect_reports_expected_and_found() {
    let mut tok = Tokenizer::new("foo", "A.h");
    let err = tok.expect_token(TokenKind::LeftParent).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("expected '('"), "{text}");
    assert!(text.contains("'foo'"), "{text}");
    assert!(text.starts_with("A.h(1)"), "{text}");
}

#[test]
fn skip_until_captures_elided_text() {
    let mut tok = Tokenizer::new("int Value = Vector3::Zero + 1;", "A.h");
    // consume up to '='
    tok.skip_until(TokenKind::Equal).unwrap();
    let (t, text) = tok.skip_until_captured(TokenKind::Semicolon).unwrap();
    assert_eq!(t.kind, TokenKind::Semicolon);
    assert_eq!(text, "Vector3::Zero + 1");
}

#[test]
fn capture_works_after_a_rewind() {
    let mut tok = Tokenizer::new("= DefaultValue ;", "A.h");
    tok.skip_until(TokenKind::Equal).unwrap();
    let peeked = tok.next_token().unwrap();
    tok.rewind(peeked);
    let (_, text) = tok.skip_until_captured(TokenKind::Semicolon).unwrap();
    assert_eq!(text, "DefaultValue");
}

#[test]
fn numbers_cover_hex_suffix_and_float_forms() {
    for (source, expected) in [
        ("123", "123"),
        ("0xFF0u", "0xFF0u"),
        ("1.5f", "1.5f"),
        ("2e-3", "2e-3"),
    ] {
        let mut tok = Tokenizer::new(source, "A.h");
        let t = tok.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::Number);
        assert_eq!(t.text, expected);
    }
}

#[test]
fn number_followed_by_shift_stops_at_angle_bracket() {
    let mut tok = Tokenizer::new("1<<2", "A.h");
    assert_eq!(tok.next_token().unwrap().text, "1");
    assert_eq!(tok.next_token().unwrap().kind, TokenKind::LeftAngleBracket);
    assert_eq!(tok.next_token().unwrap().kind, TokenKind::LeftAngleBracket);
    assert_eq!(tok.next_token().unwrap().text, "2");
}

#[test]
fn crlf_counts_one_line() {
    let mut tok = Tokenizer::new("a\r\nb", "A.h");
    assert_eq!(tok.next_token().unwrap().line, 1);
    let t = tok.next_token().unwrap();
    assert_eq!(t.text, "b");
    assert_eq!(t.line, 2);
}
