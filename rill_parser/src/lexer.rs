//! Token definitions, via `logos`.
//!
//! Keyword and symbol spellings are taken verbatim from
//! `original_source/src/localize/Keywords.hpp`.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    #[token("and")]
    And,
    #[token("bool")]
    Bool,
    #[token("case")]
    Case,
    #[token("class")]
    Class,
    #[token("complex")]
    Complex,
    #[token("else")]
    Else,
    #[token("endcase")]
    EndCase,
    #[token("endclass")]
    EndClass,
    #[token("endfn")]
    EndFn,
    #[token("endif")]
    EndIf,
    #[token("endwhile")]
    EndWhile,
    #[token("exit")]
    Exit,
    #[token("false")]
    False,
    #[token("float")]
    Float,
    #[token("fn")]
    Fn,
    #[token("if")]
    If,
    #[token("imag")]
    Imag,
    #[token("input")]
    Input,
    #[token("int")]
    Int,
    #[token("let")]
    Let,
    #[token("nil")]
    Nil,
    #[token("not")]
    Not,
    #[token("or")]
    Or,
    #[token("print")]
    Print,
    #[token("real")]
    Real,
    #[token("repeat")]
    Repeat,
    #[token("return")]
    Return,
    #[token("str")]
    Str,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("until")]
    Until,
    #[token("when")]
    When,
    #[token("while")]
    While,

    #[token("**")]
    Exponent,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Times,
    #[token("//")]
    FloorDivide,
    #[token("/")]
    Divide,
    #[token("%")]
    Modulo,

    #[token("<-")]
    From,
    #[token("->")]
    To,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("!=")]
    NotEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Equal,

    #[token("&")]
    BitAnd,
    #[token("|")]
    BitOr,
    #[token("^")]
    BitXor,
    #[token("~")]
    Compl,

    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(";")]
    SemiColon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("!")]
    Bang,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?[jJ]?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[jJ]?", |lex| lex.slice().to_string())]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| lex.slice().to_string())]
    #[regex(r"0[bB][01]+", |lex| lex.slice().to_string())]
    #[regex(r"[0-9]+[jJ]?", |lex| lex.slice().to_string())]
    Number(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len() - 1])
    })]
    StringLit(String),
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_keywords_and_arrows() {
        let toks: Vec<_> = Token::lexer("let x <- 1;").filter_map(|t| t.ok()).collect();
        assert_eq!(
            toks,
            vec![
                Token::Let,
                Token::Ident("x".to_string()),
                Token::From,
                Token::Number("1".to_string()),
                Token::SemiColon,
            ]
        );
    }

    #[test]
    fn strips_comments() {
        let toks: Vec<_> = Token::lexer("# a comment\nlet x = 1;").filter_map(|t| t.ok()).collect();
        assert_eq!(toks[0], Token::Let);
    }

    #[test]
    fn lexes_complex_literal() {
        let toks: Vec<_> = Token::lexer("3+4j").filter_map(|t| t.ok()).collect();
        assert_eq!(
            toks,
            vec![Token::Number("3".to_string()), Token::Plus, Token::Number("4j".to_string())]
        );
    }
}
