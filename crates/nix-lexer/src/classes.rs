//! Character classes of the Nix lexical grammar.

/// `PATH_CHAR = [a-zA-Z0-9._+-]`
pub fn is_path_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'+' | b'-')
}

/// Second and later characters of a URI scheme: `[a-zA-Z0-9+.-]`
pub fn is_uri_scheme_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-')
}

/// Characters allowed after the `:` of an unquoted URI:
/// `[a-zA-Z0-9%/?:@&=+$,\-_.!~*']`
pub fn is_uri_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'%' | b'/'
                | b'?'
                | b':'
                | b'@'
                | b'&'
                | b'='
                | b'+'
                | b'$'
                | b','
                | b'-'
                | b'_'
                | b'.'
                | b'!'
                | b'~'
                | b'*'
                | b'\''
        )
}

/// First character of an identifier: `[a-zA-Z_]`
pub fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// Later characters of an identifier: `[a-zA-Z0-9_'-]`
pub fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'\'' | b'-')
}
