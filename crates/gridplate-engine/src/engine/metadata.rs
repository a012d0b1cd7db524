//! Parser for the `name=value;...` metadata appended to tag text.
//!
//! Metadata lets a template author override how a tag's block is sized and
//! how its loop behaves, e.g. `extraRows=1;left=0;right=3;copyRight=true`.

use thiserror::Error;

use super::scanner::{Scanner, Token, TokenKind};

/// What to do with cells that reference a collection past its end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PastEndAction {
    /// Blank the value, keep the style.
    #[default]
    Clear,
    /// Delete the cell's space and shift its siblings inward.
    Remove,
}

impl PastEndAction {
    pub fn parse(value: &str) -> Option<PastEndAction> {
        match value {
            "clear" => Some(PastEndAction::Clear),
            "remove" => Some(PastEndAction::Remove),
            _ => None,
        }
    }
}

/// Outline grouping requested for a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupDir {
    #[default]
    None,
    Rows,
    Cols,
}

impl GroupDir {
    pub fn parse(value: &str) -> Option<GroupDir> {
        match value {
            "none" => Some(GroupDir::None),
            "rows" => Some(GroupDir::Rows),
            "cols" => Some(GroupDir::Cols),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("unknown metadata variable `{0}`")]
    UnknownVariable(String),

    #[error("metadata value `{0}` has no variable name")]
    MissingVariableName(String),

    #[error("expected `=` after metadata variable `{name}`")]
    ExpectedEquals { name: String },

    #[error("unexpected end of metadata")]
    UnexpectedEnd,

    #[error("invalid value `{value}` for metadata variable `{name}`")]
    InvalidValue { name: String, value: String },

    #[error("metadata variable `{name}` must not be negative, got `{value}`")]
    NegativeValue { name: String, value: String },
}

/// Parsed metadata for a single tag occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub extra_rows: usize,
    pub cols_left: usize,
    pub cols_right: usize,
    pub copy_right: bool,
    pub fixed: bool,
    /// Only set when the metadata names it explicitly.
    pub past_end_action: Option<PastEndAction>,
    pub group_dir: GroupDir,
    pub collapse: bool,
    defining_cols: bool,
}

impl Metadata {
    /// True when `left` or `right` was given.
    pub fn is_defining_cols(&self) -> bool {
        self.defining_cols
    }

    pub fn is_copying_right(&self) -> bool {
        self.copy_right && self.defining_cols
    }

    pub fn is_collapsing_group(&self) -> bool {
        self.group_dir != GroupDir::None && self.collapse
    }

    fn assign(&mut self, name: &str, value: String) -> Result<(), MetadataError> {
        match name {
            "extraRows" => self.extra_rows = parse_count(name, &value)?,
            "left" => {
                self.cols_left = parse_count(name, &value)?;
                self.defining_cols = true;
            }
            "right" => {
                self.cols_right = parse_count(name, &value)?;
                self.defining_cols = true;
            }
            "copyRight" => self.copy_right = parse_flag(&value),
            "fixed" => self.fixed = parse_flag(&value),
            "collapse" => self.collapse = parse_flag(&value),
            "pastEndAction" => {
                let action = PastEndAction::parse(&value).ok_or_else(|| {
                    MetadataError::InvalidValue {
                        name: name.to_string(),
                        value: value.clone(),
                    }
                })?;
                self.past_end_action = Some(action);
            }
            "groupDir" => {
                self.group_dir =
                    GroupDir::parse(&value).ok_or_else(|| MetadataError::InvalidValue {
                        name: name.to_string(),
                        value: value.clone(),
                    })?;
            }
            _ => return Err(MetadataError::UnknownVariable(name.to_string())),
        }
        Ok(())
    }
}

/// Parse metadata text such as `extraRows=2;pastEndAction="remove"`.
pub fn parse_metadata(text: &str) -> Result<Metadata, MetadataError> {
    let mut metadata = Metadata::default();
    let mut scanner = Scanner::new(text);

    loop {
        let token = next_significant(&mut scanner);
        match token.kind {
            TokenKind::End => break,
            TokenKind::Semicolon => continue,
            TokenKind::Equals => {
                let value = read_value(&mut scanner, "")?;
                return Err(MetadataError::MissingVariableName(value));
            }
            _ => {}
        }

        let (name, after_name) = read_run(&mut scanner, token);
        let after_name = match after_name.kind {
            TokenKind::Whitespace => next_significant(&mut scanner),
            _ => after_name,
        };
        match after_name.kind {
            TokenKind::Equals => {}
            TokenKind::End => return Err(MetadataError::UnexpectedEnd),
            _ => return Err(MetadataError::ExpectedEquals { name }),
        }

        let value = read_value(&mut scanner, &name)?;
        metadata.assign(&name, value)?;
    }

    Ok(metadata)
}

fn next_significant<'a>(scanner: &mut Scanner<'a>) -> Token<'a> {
    loop {
        let token = scanner.next_token();
        if token.kind != TokenKind::Whitespace {
            return token;
        }
    }
}

/// Concatenate `first` with the word/operator tokens that follow it.
/// Returns the text and the first token that was not part of the run.
fn read_run<'a>(scanner: &mut Scanner<'a>, first: Token<'a>) -> (String, Token<'a>) {
    let mut text = String::from(first.text);
    loop {
        let token = scanner.next_token();
        match token.kind {
            TokenKind::Word | TokenKind::Operator(_) | TokenKind::Bang => {
                text.push_str(token.text)
            }
            _ => return (text, token),
        }
    }
}

/// Read the value assigned to `name`.
fn read_value(scanner: &mut Scanner<'_>, name: &str) -> Result<String, MetadataError> {
    let token = next_significant(scanner);
    match token.kind {
        TokenKind::End => Err(MetadataError::UnexpectedEnd),
        TokenKind::DoubleQuote => {
            let mut value = String::new();
            loop {
                let token = scanner.next_token();
                match token.kind {
                    TokenKind::DoubleQuote => break,
                    TokenKind::End => return Err(MetadataError::UnexpectedEnd),
                    _ => value.push_str(token.text),
                }
            }
            expect_separator(scanner)?;
            Ok(value)
        }
        TokenKind::Semicolon => Ok(String::new()),
        _ => {
            let (value, after) = read_run(scanner, token);
            match after.kind {
                TokenKind::Semicolon | TokenKind::End => Ok(value),
                TokenKind::Whitespace => {
                    expect_separator(scanner)?;
                    Ok(value)
                }
                _ => Err(MetadataError::InvalidValue {
                    name: name.to_string(),
                    value: format!("{}{}", value, after.text),
                }),
            }
        }
    }
}

/// After a value only whitespace may precede the next `;` or the end.
fn expect_separator(scanner: &mut Scanner<'_>) -> Result<(), MetadataError> {
    let token = next_significant(scanner);
    match token.kind {
        TokenKind::Semicolon | TokenKind::End => Ok(()),
        _ => Err(MetadataError::MissingVariableName(token.text.to_string())),
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize, MetadataError> {
    match value.trim().parse::<i64>() {
        Ok(n) if n < 0 => Err(MetadataError::NegativeValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
        Ok(n) => usize::try_from(n).map_err(|_| MetadataError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
        Err(_) => Err(MetadataError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
