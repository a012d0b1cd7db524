//! Character-level tokenizer shared by the metadata and formula parsers.
//!
//! The scanner never fails: every byte of the input lands in exactly one
//! token, and each token remembers its byte offset so callers can splice
//! replacement text back into the original string.

/// Characters that end a word and are reported as [`TokenKind::Operator`].
const OPERATORS: &[char] = &['+', '-', '*', '/', '&', '^', '<', '>', ':', '%'];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Whitespace,
    Equals,
    Semicolon,
    Comma,
    Bang,
    LeftParen,
    RightParen,
    SingleQuote,
    DoubleQuote,
    Operator(char),
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of `text` within the scanned input.
    pub start: usize,
}

impl Token<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

#[derive(Clone)]
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Produce the next token. Returns [`TokenKind::End`] forever once the
    /// input is exhausted.
    pub fn next_token(&mut self) -> Token<'a> {
        let rest = &self.input[self.pos..];
        let Some(first) = rest.chars().next() else {
            return Token {
                kind: TokenKind::End,
                text: "",
                start: self.pos,
            };
        };

        let start = self.pos;
        let single = |kind| (kind, first.len_utf8());
        let (kind, len) = match first {
            '=' => single(TokenKind::Equals),
            ';' => single(TokenKind::Semicolon),
            ',' => single(TokenKind::Comma),
            '!' => single(TokenKind::Bang),
            '(' => single(TokenKind::LeftParen),
            ')' => single(TokenKind::RightParen),
            '\'' => single(TokenKind::SingleQuote),
            '"' => single(TokenKind::DoubleQuote),
            c if OPERATORS.contains(&c) => single(TokenKind::Operator(c)),
            c if c.is_whitespace() => {
                let len = rest
                    .find(|c: char| !c.is_whitespace())
                    .unwrap_or(rest.len());
                (TokenKind::Whitespace, len)
            }
            _ => {
                let len = rest.find(is_delimiter).unwrap_or(rest.len());
                (TokenKind::Word, len)
            }
        };

        self.pos += len;
        Token {
            kind,
            text: &self.input[start..start + len],
            start,
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    /// Iterates tokens up to, but not including, [`TokenKind::End`].
    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.next_token();
        (token.kind != TokenKind::End).then_some(token)
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace()
        || matches!(c, '=' | ';' | ',' | '!' | '(' | ')' | '\'' | '"')
        || OPERATORS.contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Scanner::new(input).map(|t| t.kind).collect()
    }

    #[test]
    fn test_metadata_tokens() {
        assert_eq!(
            kinds("extraRows=2; fixed = true"),
            vec![
                TokenKind::Word,
                TokenKind::Equals,
                TokenKind::Word,
                TokenKind::Semicolon,
                TokenKind::Whitespace,
                TokenKind::Word,
                TokenKind::Whitespace,
                TokenKind::Equals,
                TokenKind::Whitespace,
                TokenKind::Word,
            ]
        );
    }

    #[test]
    fn test_formula_tokens_keep_dollar_and_pipes_in_words() {
        let words: Vec<&str> = Scanner::new("SUM(Sheet1!$A$1,B2||0)")
            .filter(|t| t.kind == TokenKind::Word)
            .map(|t| t.text)
            .collect();
        assert_eq!(words, vec!["SUM", "Sheet1", "$A$1", "B2||0"]);
    }

    #[test]
    fn test_operators_split_words() {
        let tokens: Vec<Token> = Scanner::new("A1-B2").collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Operator('-'));
        assert_eq!(tokens[2].start, 3);
        assert_eq!(tokens[2].end(), 5);
    }

    #[test]
    fn test_end_is_sticky() {
        let mut scanner = Scanner::new("x");
        assert_eq!(scanner.next_token().kind, TokenKind::Word);
        assert_eq!(scanner.next_token().kind, TokenKind::End);
        assert_eq!(scanner.next_token().kind, TokenKind::End);
        assert_eq!(scanner.position(), 1);
    }

    #[test]
    fn test_multibyte_words() {
        let tokens: Vec<Token> = Scanner::new("'Données'!A1").collect();
        assert_eq!(tokens[1].text, "Données");
        assert_eq!(tokens[2].kind, TokenKind::SingleQuote);
    }
}
