use std::fmt;
use std::vec::IntoIter;

use thiserror::Error;

#[derive(Error, Debug, Eq, PartialEq)]
pub enum LexerError {
    #[error("Unknown character '{ch}' on line {line}")]
    UnknownCharacter { ch: char, line: usize },
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TokenKind {
    Eof,
    Identifier(String),
    IntLiteral(String),
    OpenParen,  // (
    CloseParen, // )
    OpenBrace,  // {
    CloseBrace, // }
    Semicolon,  // ;
    Assign,     // =
    Plus,       // +
    Minus,      // -
    Asterisk,   // *
    Slash,      // /

    // Keywords
    KWReturn,
    KWLet,
    KWIf,
    KWElif,
    KWElse,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl TokenKind {
    pub fn from_string(string: &str) -> Self {
        match string {
            "return" => Self::KWReturn,
            "let" => Self::KWLet,
            "if" => Self::KWIf,
            "elif" => Self::KWElif,
            "else" => Self::KWElse,
            _ => Self::Identifier(string.to_owned()),
        }
    }

    /// Binding strength of the binary operator tokens. Higher binds tighter.
    /// The table is part of the language contract: `-` binds weaker than
    /// `+`, which is not conventional arithmetic precedence.
    pub fn binary_precedence(&self) -> Option<u8> {
        match self {
            Self::Minus => Some(0),
            Self::Plus => Some(1),
            Self::Asterisk => Some(2),
            Self::Slash => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eof => "end of input",
            Self::Identifier(_) => "identifier",
            Self::IntLiteral(_) => "int literal",
            Self::OpenParen => "`(`",
            Self::CloseParen => "`)`",
            Self::OpenBrace => "`{`",
            Self::CloseBrace => "`}`",
            Self::Semicolon => "`;`",
            Self::Assign => "`=`",
            Self::Plus => "`+`",
            Self::Minus => "`-`",
            Self::Asterisk => "`*`",
            Self::Slash => "`/`",
            Self::KWReturn => "`return`",
            Self::KWLet => "`let`",
            Self::KWIf => "`if`",
            Self::KWElif => "`elif`",
            Self::KWElse => "`else`",
        };
        write!(f, "{}", name)
    }
}

/// Tokenize the whole source up front. The parser consumes the returned
/// sequence; `Eof` is not included in it.
pub fn tokenize(source: String) -> Result<Vec<Token>, LexerError> {
    let mut tokens = Vec::new();
    for token in Lexer::new(source) {
        tokens.push(token?);
    }
    Ok(tokens)
}

#[derive(Debug)]
pub struct Lexer {
    chars: IntoIter<char>,
    line: usize,

    ch: char,
    peek_ch: char,
}

impl Lexer {
    pub fn new(input: String) -> Self {
        let mut lexer = Self {
            chars: input.chars().collect::<Vec<_>>().into_iter(),
            line: 1,
            ch: '\0',
            peek_ch: '\0',
        };

        lexer.peek_ch = lexer.chars.next().unwrap_or('\0');
        lexer.read_char();
        lexer
    }

    fn read_char(&mut self) {
        if self.ch == '\n' {
            self.line += 1;
        }
        self.ch = self.peek_ch;
        self.peek_ch = self.chars.next().unwrap_or('\0');
    }

    fn is_digit(&self) -> bool {
        self.ch.is_ascii_digit()
    }

    fn is_alphabetic(&self) -> bool {
        self.ch.is_ascii_alphabetic()
    }

    fn is_alphanumeric(&self) -> bool {
        self.ch.is_ascii_alphanumeric()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.ch != '\0' && self.ch.is_ascii_whitespace() {
                self.read_char();
            }

            if self.ch == '/' && self.peek_ch == '/' {
                while self.ch != '\0' && self.ch != '\n' {
                    self.read_char();
                }
            } else if self.ch == '/' && self.peek_ch == '*' {
                self.read_char();
                self.read_char();
                // An unterminated comment swallows the rest of the input.
                while self.ch != '\0' && !(self.ch == '*' && self.peek_ch == '/') {
                    self.read_char();
                }
                if self.ch != '\0' {
                    self.read_char();
                    self.read_char();
                }
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> Token {
        let line = self.line;
        let mut string = String::new();

        while self.is_alphanumeric() {
            string.push(self.ch);
            self.read_char();
        }
        Token {
            kind: TokenKind::from_string(&string),
            line,
        }
    }

    fn read_int_literal(&mut self) -> Token {
        let line = self.line;
        let mut string = String::new();

        while self.is_digit() {
            string.push(self.ch);
            self.read_char();
        }
        Token {
            kind: TokenKind::IntLiteral(string),
            line,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace_and_comments();

        let line = self.line;

        let kind = match self.ch {
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            ';' => TokenKind::Semicolon,
            '=' => TokenKind::Assign,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Asterisk,
            '/' => TokenKind::Slash,
            '\0' => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    line,
                })
            }
            _ => {
                if self.is_digit() {
                    return Ok(self.read_int_literal());
                } else if self.is_alphabetic() {
                    return Ok(self.read_identifier());
                }

                return Err(LexerError::UnknownCharacter { ch: self.ch, line });
            }
        };

        self.read_char();
        Ok(Token { kind, line })
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();

        if let Ok(ref tok) = token {
            if let TokenKind::Eof = tok.kind {
                return None;
            }
        }

        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_token() {
        let input = r"
            let answer = 6 * 7;
            return (answer);
            "
        .to_owned();
        let mut lexer = Lexer::new(input);
        let expected: Vec<_> = vec![
            TokenKind::KWLet,
            TokenKind::Identifier("answer".to_owned()),
            TokenKind::Assign,
            TokenKind::IntLiteral("6".to_owned()),
            TokenKind::Asterisk,
            TokenKind::IntLiteral("7".to_owned()),
            TokenKind::Semicolon,
            TokenKind::KWReturn,
            TokenKind::OpenParen,
            TokenKind::Identifier("answer".to_owned()),
            TokenKind::CloseParen,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ];

        for expected_token in expected {
            let token = lexer.next_token().expect("should return token");

            assert_eq!(expected_token, token.kind);
        }
    }

    #[test]
    fn test_keywords_and_braces() {
        let input = "if (1) { } elif (2) { } else { }".to_owned();
        let mut lexer = Lexer::new(input);
        let expected: Vec<_> = vec![
            TokenKind::KWIf,
            TokenKind::OpenParen,
            TokenKind::IntLiteral("1".to_owned()),
            TokenKind::CloseParen,
            TokenKind::OpenBrace,
            TokenKind::CloseBrace,
            TokenKind::KWElif,
            TokenKind::OpenParen,
            TokenKind::IntLiteral("2".to_owned()),
            TokenKind::CloseParen,
            TokenKind::OpenBrace,
            TokenKind::CloseBrace,
            TokenKind::KWElse,
            TokenKind::OpenBrace,
            TokenKind::CloseBrace,
            TokenKind::Eof,
        ];

        for expected_token in expected {
            let token = lexer.next_token().expect("should return token");

            assert_eq!(expected_token, token.kind);
        }
    }

    #[test]
    fn test_comments_are_discarded() {
        let input = r"
            // a line comment
            let x /* inline */ = 1; /* multi
            line */ return (x);
            "
        .to_owned();
        let bare = "let x = 1; return (x);".to_owned();

        let with_comments: Vec<_> = tokenize(input)
            .expect("should tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect();
        let without_comments: Vec<_> = tokenize(bare)
            .expect("should tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect();

        assert_eq!(with_comments, without_comments);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let tokens = tokenize("let x = 1; /* runs off the end".to_owned())
            .expect("an unterminated comment is not an error");

        assert_eq!(tokens.len(), 5);
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("let x = 1;\nreturn (x);\n".to_owned()).expect("should tokenize");

        assert_eq!(tokens[0].kind, TokenKind::KWLet);
        assert_eq!(tokens[0].line, 1);
        let ret = tokens
            .iter()
            .find(|token| token.kind == TokenKind::KWReturn)
            .expect("return token");
        assert_eq!(ret.line, 2);
    }

    #[test]
    fn test_tokenize_is_deterministic() {
        let source = "let x = 1 - 2 + 3; return (x);";

        assert_eq!(
            tokenize(source.to_owned()).expect("should tokenize"),
            tokenize(source.to_owned()).expect("should tokenize"),
        );
    }

    #[test]
    fn test_unknown_character() {
        let result = tokenize("let x = 1;\nlet y @ 2;".to_owned());

        assert_eq!(
            result,
            Err(LexerError::UnknownCharacter { ch: '@', line: 2 })
        );
    }

    #[test]
    fn test_precedence_table() {
        // Deliberately not school arithmetic: `-` is the weakest binder.
        assert_eq!(TokenKind::Minus.binary_precedence(), Some(0));
        assert_eq!(TokenKind::Plus.binary_precedence(), Some(1));
        assert_eq!(TokenKind::Asterisk.binary_precedence(), Some(2));
        assert_eq!(TokenKind::Slash.binary_precedence(), Some(3));
        assert_eq!(TokenKind::Assign.binary_precedence(), None);
    }
}
