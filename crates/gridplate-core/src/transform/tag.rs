//! Tag markup: `<t:name attr="value">`, `</t:name>` and bodiless `<t:name ... />`.

use std::ops::Range;
use std::sync::OnceLock;

use gridplate_engine::engine::{GroupDir, PastEndAction, whole_expression};
use regex::Regex;

/// A start tag found in cell text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagStart {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub bodiless: bool,
    /// Byte range of the tag markup in the cell text.
    pub span: Range<usize>,
}

impl TagStart {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A start or end tag occurrence, used to match nested tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagMarker {
    pub span: Range<usize>,
    pub is_start: bool,
}

/// Tag regexes for one namespace.
pub struct TagSyntax {
    prefix: String,
    start: Regex,
    end: Regex,
}

impl TagSyntax {
    pub fn new(namespace: &str) -> Self {
        let ns = regex::escape(namespace);
        let start = Regex::new(&format!(
            r#"<{ns}:([A-Za-z][A-Za-z0-9]*)((?:\s+[A-Za-z_][A-Za-z0-9_]*\s*=\s*(?:"[^"]*"|'[^']*'))*)\s*(/?)>"#
        ))
        .expect("start tag regex must compile");
        let end = Regex::new(&format!(r"</{ns}:([A-Za-z][A-Za-z0-9]*)\s*>"))
            .expect("end tag regex must compile");
        TagSyntax {
            prefix: format!("<{}:", namespace),
            start,
            end,
        }
    }

    /// First start tag in `text`.
    pub fn find_start(&self, text: &str) -> Option<TagStart> {
        let caps = self.start.captures(text)?;
        let whole = caps.get(0)?;
        let attrs = attr_re()
            .captures_iter(caps.get(2).map_or("", |m| m.as_str()))
            .map(|a| {
                let value = a.get(2).or_else(|| a.get(3)).map_or("", |m| m.as_str());
                (a[1].to_string(), value.to_string())
            })
            .collect();
        Some(TagStart {
            name: caps[1].to_string(),
            attrs,
            bodiless: !caps[3].is_empty(),
            span: whole.range(),
        })
    }

    pub fn has_end(&self, text: &str) -> bool {
        self.end.is_match(text)
    }

    /// Text that starts a tag but does not parse as one.
    pub fn is_malformed(&self, text: &str) -> bool {
        text.contains(&self.prefix) && !self.start.is_match(text)
    }

    /// Bodied start tags and end tags named `name`, in text order.
    pub fn markers(&self, text: &str, name: &str) -> Vec<TagMarker> {
        let mut markers: Vec<TagMarker> = self
            .start
            .captures_iter(text)
            .filter(|caps| &caps[1] == name && caps[3].is_empty())
            .filter_map(|caps| caps.get(0))
            .map(|m| TagMarker {
                span: m.range(),
                is_start: true,
            })
            .chain(
                self.end
                    .captures_iter(text)
                    .filter(|caps| &caps[1] == name)
                    .filter_map(|caps| caps.get(0))
                    .map(|m| TagMarker {
                        span: m.range(),
                        is_start: false,
                    }),
            )
            .collect();
        markers.sort_by_key(|m| m.span.start);
        markers
    }
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("tag attribute regex must compile")
    })
}

/// What an `if` does with its block when the test is false.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ElseAction {
    #[default]
    Remove,
    Clear,
}

/// A parsed tag. Expressions are stored without their `${...}` markers;
/// flags stay raw because they may themselves be expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    ForEach {
        items: String,
        var: String,
        index_var: Option<String>,
        fixed: Option<String>,
        copy_right: Option<String>,
    },
    MultiForEach {
        collections: Vec<String>,
        vars: Vec<String>,
        index_var: Option<String>,
        past_end: Option<PastEndAction>,
        fixed: Option<String>,
        copy_right: Option<String>,
    },
    If {
        test: String,
        else_action: ElseAction,
    },
    Group {
        group_dir: GroupDir,
        collapse: Option<String>,
    },
}

impl Tag {
    pub fn parse(start: &TagStart, begin: &str, end: &str) -> Result<Tag, String> {
        let allowed: &[&str] = match start.name.as_str() {
            "forEach" => &["items", "var", "indexVar", "fixed", "copyRight"],
            "multiForEach" => &[
                "collections",
                "vars",
                "indexVar",
                "pastEndAction",
                "fixed",
                "copyRight",
            ],
            "if" => &["test", "elseAction"],
            "group" => &["groupDir", "collapse"],
            other => return Err(format!("unknown tag `{}`", other)),
        };
        if let Some((key, _)) = start.attrs.iter().find(|(key, _)| !allowed.contains(&key.as_str())) {
            return Err(format!("unknown attribute `{}` on `{}`", key, start.name));
        }

        let required = |name: &str| {
            start
                .attr(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| format!("`{}` requires attribute `{}`", start.name, name))
        };
        let optional = |name: &str| start.attr(name).map(|v| v.trim().to_string());
        let index_var = optional("indexVar").map(|v| identifier(&v)).transpose()?;

        match start.name.as_str() {
            "forEach" => Ok(Tag::ForEach {
                items: expression(required("items")?, begin, end),
                var: identifier(required("var")?)?,
                index_var,
                fixed: optional("fixed"),
                copy_right: optional("copyRight"),
            }),
            "multiForEach" => {
                let collections: Vec<String> = split_top_level(required("collections")?)
                    .into_iter()
                    .map(|c| expression(c, begin, end))
                    .collect();
                let vars = split_top_level(required("vars")?)
                    .into_iter()
                    .map(identifier)
                    .collect::<Result<Vec<_>, _>>()?;
                if collections.len() != vars.len() {
                    return Err(format!(
                        "`multiForEach` has {} collections but {} vars",
                        collections.len(),
                        vars.len()
                    ));
                }
                let past_end = optional("pastEndAction")
                    .map(|v| {
                        PastEndAction::parse(&v)
                            .ok_or_else(|| format!("invalid pastEndAction `{}`", v))
                    })
                    .transpose()?;
                Ok(Tag::MultiForEach {
                    collections,
                    vars,
                    index_var,
                    past_end,
                    fixed: optional("fixed"),
                    copy_right: optional("copyRight"),
                })
            }
            "if" => {
                let else_action = match optional("elseAction").as_deref() {
                    None | Some("remove") => ElseAction::Remove,
                    Some("clear") => ElseAction::Clear,
                    Some(other) => return Err(format!("invalid elseAction `{}`", other)),
                };
                Ok(Tag::If {
                    test: expression(required("test")?, begin, end),
                    else_action,
                })
            }
            _ => {
                let group_dir = match optional("groupDir") {
                    None => GroupDir::Rows,
                    Some(v) => GroupDir::parse(&v).ok_or_else(|| format!("invalid groupDir `{}`", v))?,
                };
                Ok(Tag::Group {
                    group_dir,
                    collapse: optional("collapse"),
                })
            }
        }
    }

    /// Expressions evaluated before the block is transformed.
    pub fn expressions(&self) -> Vec<&str> {
        match self {
            Tag::ForEach { items, .. } => vec![items.as_str()],
            Tag::MultiForEach { collections, .. } => collections.iter().map(String::as_str).collect(),
            Tag::If { test, .. } => vec![test.as_str()],
            Tag::Group { .. } => Vec::new(),
        }
    }
}

/// Attribute value as an expression: `${expr}` or bare `expr`.
fn expression(value: &str, begin: &str, end: &str) -> String {
    whole_expression(value, begin, end)
        .unwrap_or(value)
        .trim()
        .to_string()
}

fn identifier(value: &str) -> Result<String, String> {
    let value = value.trim();
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(value.to_string())
    } else {
        Err(format!("`{}` is not a valid variable name", value))
    }
}

/// Split on commas outside brackets and string literals.
pub fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut last = 0;

    for (i, c) in list.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(list[last..i].trim());
                last = i + 1;
            }
            _ => {}
        }
    }
    parts.push(list[last..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}
