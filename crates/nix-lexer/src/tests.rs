use super::*;
use pretty_assertions::assert_eq;

fn lex_all(src: &str) -> (Vec<(TokenKind, String)>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(src);
    let mut diags = Vec::new();
    let mut out = Vec::new();
    loop {
        let tok = lexer.lex(&mut diags);
        let text = tok.view(src).to_string();
        let kind = tok.kind;
        out.push((kind, text));
        if kind == TokenKind::Eof {
            break;
        }
    }
    (out, diags)
}

fn kinds(src: &str) -> Vec<TokenKind> {
    lex_all(src).0.into_iter().map(|(k, _)| k).collect()
}

#[test]
fn integers_and_floats() {
    use TokenKind::*;
    assert_eq!(kinds("1 23 0"), vec![Int, Int, Int, Eof]);
    assert_eq!(kinds("1.5 0.25 2.5e-3 1.e2"), vec![Float, Float, Float, Float, Eof]);
    assert_eq!(kinds(".5"), vec![Float, Eof]);
}

#[test]
fn float_with_no_exponent_digits_is_an_error_token() {
    let (toks, diags) = lex_all("1.5e");
    assert_eq!(toks[0].0, TokenKind::Unknown);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind(), DiagnosticKind::FloatNoExp);
    assert_eq!(diags[0].format(), "float point has trailing `e` but has no exponential part");
}

#[test]
fn leading_zero_float_warns_but_lexes() {
    let (toks, diags) = lex_all("00.33");
    assert_eq!(toks[0], (TokenKind::Float, "00.33".to_string()));
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind(), DiagnosticKind::FloatLeadingZero);
    // The diagnostic covers the two leading zeros.
    assert_eq!(diags[0].range().view("00.33"), "00");
}

#[test]
fn keywords_and_identifiers() {
    use TokenKind::*;
    assert_eq!(
        kinds("let in rec with assert if then else inherit or"),
        vec![KwLet, KwIn, KwRec, KwWith, KwAssert, KwIf, KwThen, KwElse, KwInherit, KwOr, Eof]
    );
    let (toks, _) = lex_all("foo-bar baz' _x letx");
    assert_eq!(toks[0], (TokenKind::Identifier, "foo-bar".into()));
    assert_eq!(toks[1], (TokenKind::Identifier, "baz'".into()));
    assert_eq!(toks[2], (TokenKind::Identifier, "_x".into()));
    assert_eq!(toks[3], (TokenKind::Identifier, "letx".into()));
}

#[test]
fn operators() {
    use TokenKind::*;
    assert_eq!(
        kinds("-> || && == != < <= > >= // ! + - * / ++ ? ..."),
        vec![
            Implies, Or, And, Equal, NotEqual, Less, LessEqual, Greater, GreaterEqual, Update,
            Not, Plus, Minus, Star, Slash, Concat, Question, Ellipsis, Eof
        ]
    );
}

#[test]
fn uris_lex_as_single_tokens() {
    let (toks, _) = lex_all("https://example.org/foo?a=1 x:y");
    assert_eq!(toks[0], (TokenKind::Uri, "https://example.org/foo?a=1".into()));
    assert_eq!(toks[1], (TokenKind::Uri, "x:y".into()));
}

#[test]
fn lambda_head_is_not_a_uri() {
    use TokenKind::*;
    // `x: y` has a space after the colon, so it stays identifier + colon.
    assert_eq!(kinds("x: y"), vec![Identifier, Colon, Identifier, Eof]);
}

#[test]
fn path_starts() {
    let (toks, _) = lex_all("./foo/bar.nix");
    assert_eq!(toks[0], (TokenKind::PathFragment, "./foo/bar.nix".into()));
    let (toks, _) = lex_all("~/config");
    assert_eq!(toks[0], (TokenKind::PathFragment, "~/config".into()));
    let (toks, _) = lex_all("1/2");
    assert_eq!(toks[0], (TokenKind::PathFragment, "1/2".into()));
    // Division needs spaces around the slash.
    assert_eq!(kinds("1 / 2"), vec![TokenKind::Int, TokenKind::Slash, TokenKind::Int, TokenKind::Eof]);
}

#[test]
fn path_fragment_stops_at_interpolation() {
    let (toks, _) = lex_all("./m/${name}");
    assert_eq!(toks[0], (TokenKind::PathFragment, "./m/".into()));
    assert_eq!(toks[1].0, TokenKind::DollarCurly);
}

#[test]
fn search_paths() {
    let (toks, _) = lex_all("<nixpkgs/lib>");
    assert_eq!(toks[0], (TokenKind::SearchPath, "<nixpkgs/lib>".into()));
    // A bare `<` stays a comparison operator.
    assert_eq!(kinds("a < b"), vec![TokenKind::Identifier, TokenKind::Less, TokenKind::Identifier, TokenKind::Eof]);
}

#[test]
fn trivia_attaches_to_the_following_token() {
    let src = "  # comment\n  foo";
    let mut lexer = Lexer::new(src);
    let mut diags = Vec::new();
    let tok = lexer.lex(&mut diags);
    assert_eq!(tok.kind, TokenKind::Identifier);
    let comments: Vec<&str> = tok
        .leading
        .iter()
        .filter(|p| p.is_comment())
        .map(|p| p.range.view(src))
        .collect();
    assert_eq!(comments, vec!["# comment"]);
}

#[test]
fn unterminated_block_comment_notes_the_opener() {
    let (_, diags) = lex_all("/* never closed");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind(), DiagnosticKind::UnterminatedBComment);
    assert_eq!(diags[0].notes().len(), 1);
    assert_eq!(diags[0].notes()[0].kind(), NoteKind::BCommentBegin);
    assert_eq!(diags[0].notes()[0].range().view("/* never closed"), "/*");
}

#[test]
fn string_mode_tokens() {
    let src = r#""a\n${x}b""#;
    let mut lexer = Lexer::new(src);
    let mut diags = Vec::new();
    assert_eq!(lexer.lex(&mut diags).kind, TokenKind::DQuote);
    let part = lexer.lex_string(&mut diags);
    assert_eq!((part.kind, part.view(src)), (TokenKind::StringPart, "a"));
    let esc = lexer.lex_string(&mut diags);
    assert_eq!((esc.kind, esc.view(src)), (TokenKind::StringEscape, "\\n"));
    assert_eq!(lexer.lex_string(&mut diags).kind, TokenKind::DollarCurly);
    // Back in expression mode for the interpolation body.
    assert_eq!(lexer.lex(&mut diags).kind, TokenKind::Identifier);
    assert_eq!(lexer.lex(&mut diags).kind, TokenKind::RBrace);
    let part = lexer.lex_string(&mut diags);
    assert_eq!((part.kind, part.view(src)), (TokenKind::StringPart, "b"));
    assert_eq!(lexer.lex_string(&mut diags).kind, TokenKind::DQuote);
}

#[test]
fn dollar_dollar_is_absorbed_into_string_parts() {
    let src = r#""a$${b""#;
    let mut lexer = Lexer::new(src);
    let mut diags = Vec::new();
    assert_eq!(lexer.lex(&mut diags).kind, TokenKind::DQuote);
    let part = lexer.lex_string(&mut diags);
    assert_eq!((part.kind, part.view(src)), (TokenKind::StringPart, "a$${b"));
}

#[test]
fn indented_string_escapes() {
    let src = "''a'''b''${c''";
    let mut lexer = Lexer::new(src);
    let mut diags = Vec::new();
    assert_eq!(lexer.lex(&mut diags).kind, TokenKind::Quote2);
    let part = lexer.lex_ind_string(&mut diags);
    assert_eq!((part.kind, part.view(src)), (TokenKind::StringPart, "a"));
    let esc = lexer.lex_ind_string(&mut diags);
    assert_eq!((esc.kind, esc.view(src)), (TokenKind::StringEscape, "'''"));
    let part = lexer.lex_ind_string(&mut diags);
    assert_eq!((part.kind, part.view(src)), (TokenKind::StringPart, "b"));
    let esc = lexer.lex_ind_string(&mut diags);
    assert_eq!((esc.kind, esc.view(src)), (TokenKind::StringEscape, "''$"));
    let part = lexer.lex_ind_string(&mut diags);
    assert_eq!((part.kind, part.view(src)), (TokenKind::StringPart, "{c"));
    assert_eq!(lexer.lex_ind_string(&mut diags).kind, TokenKind::Quote2);
}

#[test]
fn path_mode_round_trip() {
    let src = "./a/${x}/b rest";
    let mut lexer = Lexer::new(src);
    let mut diags = Vec::new();
    let first = lexer.lex(&mut diags);
    assert_eq!((first.kind, first.view(src)), (TokenKind::PathFragment, "./a/"));
    assert_eq!(lexer.lex_path(&mut diags).kind, TokenKind::DollarCurly);
    assert_eq!(lexer.lex(&mut diags).kind, TokenKind::Identifier);
    assert_eq!(lexer.lex(&mut diags).kind, TokenKind::RBrace);
    let frag = lexer.lex_path(&mut diags);
    assert_eq!((frag.kind, frag.view(src)), (TokenKind::PathFragment, "/b"));
    let end = lexer.lex_path(&mut diags);
    assert_eq!(end.kind, TokenKind::PathEnd);
    assert!(end.range.is_empty());
    let rest = lexer.lex(&mut diags);
    assert_eq!((rest.kind, rest.view(src)), (TokenKind::Identifier, "rest"));
}

#[test]
fn set_cur_rewinds_for_relexing() {
    let src = "a b";
    let mut lexer = Lexer::new(src);
    let mut diags = Vec::new();
    let a = lexer.lex(&mut diags);
    let _b = lexer.lex(&mut diags);
    lexer.set_cur(a.l_cur());
    let again = lexer.lex(&mut diags);
    assert_eq!(again.range, a.range);
}

#[test]
fn unknown_bytes_become_unknown_tokens() {
    let (toks, _) = lex_all("^");
    assert_eq!(toks[0].0, TokenKind::Unknown);
}
