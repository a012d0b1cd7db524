//! Formula reference extraction and formula-marker handling.
//!
//! Formula cells in a template are written as a marker around raw formula
//! text, e.g. `$[SUM(B3)]`. When a loop copies such a cell, the copy gets an
//! iteration suffix (`$[SUM(B3)][2]`, nested loops `[2,0]`) so copies made in
//! different iterations can be told apart when references are remapped.
//!
//! Reference extraction is a single left-to-right pass over the shared
//! [`Scanner`] tokens:
//!
//! - `!` promotes the pending word to a sheet name
//! - `(` drops the pending word (it was a function name)
//! - any other delimiter validates the pending word as `A1`-style reference
//! - `"..."` string literals are skipped, `'...'` quotes a sheet name

use std::ops::Range;

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use super::cell_ref::CellRef;
use super::scanner::{Scanner, TokenKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    #[error("unterminated formula `{0}`")]
    Unterminated(String),
}

/// How a reference participates in a `start:end` range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefRole {
    Single,
    RangeStart,
    RangeEnd,
}

/// One reference occurrence in formula text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefSpan {
    /// Byte range covering the sheet qualifier (if any) and the reference.
    pub span: Range<usize>,
    pub cell_ref: CellRef,
    pub role: RefRole,
}

/// Extract the ordered, deduplicated cell references of a formula.
pub fn parse_formula_refs(formula: &str) -> Result<Vec<CellRef>, FormulaError> {
    let mut refs: Vec<CellRef> = Vec::new();
    for occurrence in scan_formula_refs(formula)? {
        if !refs.contains(&occurrence.cell_ref) {
            refs.push(occurrence.cell_ref);
        }
    }
    Ok(refs)
}

/// Find every reference occurrence in a formula, with byte spans.
pub fn scan_formula_refs(formula: &str) -> Result<Vec<RefSpan>, FormulaError> {
    let mut scanner = Scanner::new(formula);
    let mut spans: Vec<RefSpan> = Vec::new();

    // Pending word that may turn out to be a reference: (start, text).
    let mut candidate: Option<(usize, &str)> = None;
    // Sheet qualifier waiting for its reference: (span start, name).
    let mut sheet: Option<(usize, String)> = None;
    // Inside `'...'`: (opening quote offset, name so far).
    let mut quoted: Option<(usize, String)> = None;
    // A closed `'...'` that still needs its `!`.
    let mut closed_quote: Option<(usize, String)> = None;
    let mut in_string = false;
    let mut depth = 0usize;

    let unterminated = || FormulaError::Unterminated(formula.to_string());

    loop {
        let token = scanner.next_token();

        if in_string {
            match token.kind {
                TokenKind::DoubleQuote => in_string = false,
                TokenKind::End => return Err(unterminated()),
                _ => {}
            }
            continue;
        }

        if let Some((start, name)) = quoted.as_mut() {
            match token.kind {
                TokenKind::End => return Err(unterminated()),
                TokenKind::SingleQuote => {
                    let mut lookahead = scanner.clone();
                    if lookahead.next_token().kind == TokenKind::SingleQuote {
                        name.push('\'');
                        scanner = lookahead;
                    } else {
                        closed_quote = Some((*start, std::mem::take(name)));
                        quoted = None;
                    }
                }
                _ => name.push_str(token.text),
            }
            continue;
        }

        if let Some(pending) = closed_quote.take() {
            if token.kind == TokenKind::Bang {
                sheet = Some(pending);
                continue;
            }
        }

        match token.kind {
            TokenKind::Word => candidate = Some((token.start, token.text)),
            TokenKind::Bang => {
                if let Some((start, text)) = candidate.take() {
                    sheet = Some((start, text.to_string()));
                }
            }
            TokenKind::LeftParen => {
                candidate = None;
                sheet = None;
                depth += 1;
            }
            TokenKind::RightParen => {
                flush(&mut candidate, &mut sheet, &mut spans);
                depth = depth.saturating_sub(1);
            }
            TokenKind::DoubleQuote => {
                flush(&mut candidate, &mut sheet, &mut spans);
                in_string = true;
            }
            TokenKind::SingleQuote => {
                flush(&mut candidate, &mut sheet, &mut spans);
                quoted = Some((token.start, String::new()));
            }
            TokenKind::End => {
                flush(&mut candidate, &mut sheet, &mut spans);
                if depth > 0 {
                    return Err(unterminated());
                }
                break;
            }
            TokenKind::Whitespace
            | TokenKind::Equals
            | TokenKind::Semicolon
            | TokenKind::Comma
            | TokenKind::Operator(_) => flush(&mut candidate, &mut sheet, &mut spans),
        }
    }

    mark_ranges(formula, &mut spans);
    Ok(spans)
}

/// Validate the pending word; a match becomes a reference, anything else is text.
fn flush(
    candidate: &mut Option<(usize, &str)>,
    sheet: &mut Option<(usize, String)>,
    spans: &mut Vec<RefSpan>,
) {
    let qualifier = sheet.take();
    let Some((start, text)) = candidate.take() else {
        return;
    };
    let Some(mut cell_ref) = CellRef::from_str(text) else {
        return;
    };
    let span_start = match qualifier {
        Some((sheet_start, name)) => {
            cell_ref.sheet = Some(name);
            sheet_start
        }
        None => start,
    };
    spans.push(RefSpan {
        span: span_start..start + text.len(),
        cell_ref,
        role: RefRole::Single,
    });
}

fn mark_ranges(formula: &str, spans: &mut [RefSpan]) {
    for i in 1..spans.len() {
        let between = &formula[spans[i - 1].span.end..spans[i].span.start];
        if between == ":" && spans[i - 1].role == RefRole::Single {
            spans[i - 1].role = RefRole::RangeStart;
            spans[i].role = RefRole::RangeEnd;
        }
    }
}

/// A formula marker split into its body and iteration suffix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormulaMarker {
    pub body: String,
    /// Iteration indices, outermost loop first.
    pub suffix: Vec<usize>,
}

impl FormulaMarker {
    /// Parse `text` as `begin body end [i,j]`. Surrounding whitespace is ignored;
    /// anything else around the marker means the text is not a formula marker.
    pub fn parse(text: &str, begin: &str, end: &str) -> Option<FormulaMarker> {
        let rest = text.trim().strip_prefix(begin)?;

        let (inner, suffix) = match suffix_re().captures(rest) {
            Some(caps) if rest[..caps.get(0)?.start()].ends_with(end) => {
                let whole = caps.get(0)?;
                let suffix = caps[1]
                    .split(',')
                    .map(|n| n.parse::<usize>())
                    .collect::<Result<Vec<_>, _>>()
                    .ok()?;
                (&rest[..whole.start()], suffix)
            }
            _ => (rest, Vec::new()),
        };

        let body = inner.strip_suffix(end)?;
        Some(FormulaMarker {
            body: body.to_string(),
            suffix,
        })
    }

    /// The marker text without any iteration suffix; this is the key formulas
    /// are recorded under.
    pub fn key(&self, begin: &str, end: &str) -> String {
        format!("{}{}{}", begin, self.body, end)
    }

    pub fn render(&self, begin: &str, end: &str) -> String {
        let mut text = self.key(begin, end);
        if !self.suffix.is_empty() {
            let indices: Vec<String> = self.suffix.iter().map(|i| i.to_string()).collect();
            text.push_str(&format!("[{}]", indices.join(",")));
        }
        text
    }
}

fn suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[([0-9]+(?:,[0-9]+)*)\]$").expect("iteration suffix regex must compile")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_qualifier_attaches_to_one_ref() {
        let refs = parse_formula_refs("SUM(Sheet1!A1,B2)").unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].sheet.as_deref(), Some("Sheet1"));
        assert_eq!((refs[0].col, refs[0].row), (0, 0));
        assert_eq!(refs[1].sheet, None);
        assert_eq!((refs[1].col, refs[1].row), (1, 1));
    }

    #[test]
    fn test_default_value() {
        let refs = parse_formula_refs("A1||0").unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].default_value.as_deref(), Some("0"));
    }

    #[test]
    fn test_function_names_and_text_are_ignored() {
        let refs = parse_formula_refs("IF(LOG10(C3)>1,\"B2 is big\",D4)").unwrap();
        let names: Vec<String> = refs.iter().map(|r| r.to_string()).collect();
        assert_eq!(names, vec!["C3", "D4"]);
    }

    #[test]
    fn test_duplicates_removed_in_order() {
        let refs = parse_formula_refs("B2+A1*B2").unwrap();
        let names: Vec<String> = refs.iter().map(|r| r.to_string()).collect();
        assert_eq!(names, vec!["B2", "A1"]);
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(
            parse_formula_refs("SUM(A1"),
            Err(FormulaError::Unterminated(_))
        ));
        assert!(matches!(
            parse_formula_refs("CONCAT(A1,\"x)"),
            Err(FormulaError::Unterminated(_))
        ));
        assert!(matches!(
            parse_formula_refs("'Q1 Sales!A1"),
            Err(FormulaError::Unterminated(_))
        ));
    }

    #[test]
    fn test_quoted_sheet_and_spans() {
        let formula = "'Q1 ''Sales'''!B2*$C$3";
        let spans = scan_formula_refs(formula).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].cell_ref.sheet.as_deref(), Some("Q1 'Sales'"));
        assert_eq!(&formula[spans[0].span.clone()], "'Q1 ''Sales'''!B2");
        assert_eq!(&formula[spans[1].span.clone()], "$C$3");
        assert!(spans[1].cell_ref.col_absolute);
    }

    #[test]
    fn test_range_roles() {
        let spans = scan_formula_refs("SUM(A1:A3)+B1").unwrap();
        let roles: Vec<RefRole> = spans.iter().map(|s| s.role).collect();
        assert_eq!(
            roles,
            vec![RefRole::RangeStart, RefRole::RangeEnd, RefRole::Single]
        );
    }

    #[test]
    fn test_marker_parse_and_render() {
        let marker = FormulaMarker::parse("$[SUM(B3)][1,0]", "$[", "]").unwrap();
        assert_eq!(marker.body, "SUM(B3)");
        assert_eq!(marker.suffix, vec![1, 0]);
        assert_eq!(marker.key("$[", "]"), "$[SUM(B3)]");
        assert_eq!(marker.render("$[", "]"), "$[SUM(B3)][1,0]");

        let plain = FormulaMarker::parse(" $[B3*C3] ", "$[", "]").unwrap();
        assert!(plain.suffix.is_empty());
        assert_eq!(plain.body, "B3*C3");

        let indexed = FormulaMarker::parse("$[INDEX(X[0])]", "$[", "]").unwrap();
        assert_eq!(indexed.body, "INDEX(X[0])");
        assert!(indexed.suffix.is_empty());

        assert!(FormulaMarker::parse("total: $[B3]", "$[", "]").is_none());
        assert!(FormulaMarker::parse("$[B3", "$[", "]").is_none());
    }
}
