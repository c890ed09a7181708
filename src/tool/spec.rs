// ABOUTME: Tool and parameter declarations presented to the model, plus
// ABOUTME: the parser for the parameter type tags accepted at registration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declaration of one tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    /// Semantic type tag such as `str` or `list[str]`.
    #[serde(rename = "type")]
    pub type_tag: String,
    pub required: bool,
}

impl ParamSpec {
    pub fn new(
        name: impl Into<String>,
        type_tag: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            type_tag: type_tag.into(),
            required,
        }
    }

    /// A required parameter.
    pub fn required(
        name: impl Into<String>,
        type_tag: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, type_tag, description, true)
    }

    /// An optional parameter.
    pub fn optional(
        name: impl Into<String>,
        type_tag: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, type_tag, description, false)
    }
}

/// Description of a registered tool, as sent in the `functions` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

/// Scalar type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    String,
    Integer,
    Number,
    Boolean,
}

/// A parsed parameter type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Scalar(Scalar),
    List(Box<ParamType>),
    Set(Box<ParamType>),
    Tuple(Vec<ParamType>),
    Dict(Box<ParamType>, Box<ParamType>),
}

impl ParamType {
    /// Parse a type tag; `None` if the tag is not recognized.
    ///
    /// Scalars: `str`, `string`, `int`, `integer`, `float`, `number`, `bool`,
    /// `boolean`. Composites: `list[T]`, `set[T]`, `tuple[T, ...]`, `dict[K, V]`.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        if let Some(scalar) = parse_scalar(tag) {
            return Some(Self::Scalar(scalar));
        }

        let (head, inner) = tag.strip_suffix(']')?.split_once('[')?;
        let args = split_args(inner)?
            .into_iter()
            .map(Self::parse)
            .collect::<Option<Vec<_>>>()?;

        match (head.trim(), args.as_slice()) {
            ("list", [item]) => Some(Self::List(Box::new(item.clone()))),
            ("set", [item]) => Some(Self::Set(Box::new(item.clone()))),
            ("tuple", items) if !items.is_empty() => Some(Self::Tuple(items.to_vec())),
            ("dict", [key, value]) => {
                Some(Self::Dict(Box::new(key.clone()), Box::new(value.clone())))
            }
            _ => None,
        }
    }
}

fn parse_scalar(tag: &str) -> Option<Scalar> {
    match tag {
        "str" | "string" => Some(Scalar::String),
        "int" | "integer" => Some(Scalar::Integer),
        "float" | "number" => Some(Scalar::Number),
        "bool" | "boolean" => Some(Scalar::Boolean),
        _ => None,
    }
}

/// Split a bracket body on top-level commas. `None` on unbalanced brackets.
fn split_args(inner: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in inner.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&inner[start..]);
    Some(parts)
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(Scalar::String) => write!(f, "str"),
            Self::Scalar(Scalar::Integer) => write!(f, "int"),
            Self::Scalar(Scalar::Number) => write!(f, "float"),
            Self::Scalar(Scalar::Boolean) => write!(f, "bool"),
            Self::List(item) => write!(f, "list[{item}]"),
            Self::Set(item) => write!(f, "set[{item}]"),
            Self::Tuple(items) => {
                write!(f, "tuple[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Dict(key, value) => write!(f, "dict[{key}, {value}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(ParamType::parse("str"), Some(ParamType::Scalar(Scalar::String)));
        assert_eq!(ParamType::parse("number"), Some(ParamType::Scalar(Scalar::Number)));
        assert_eq!(ParamType::parse(" bool "), Some(ParamType::Scalar(Scalar::Boolean)));
        assert_eq!(ParamType::parse("int"), Some(ParamType::Scalar(Scalar::Integer)));
    }

    #[test]
    fn test_composites() {
        assert_eq!(
            ParamType::parse("list[str]"),
            Some(ParamType::List(Box::new(ParamType::Scalar(Scalar::String))))
        );
        let dict = ParamType::parse("dict[str, list[int]]").unwrap();
        assert_eq!(dict.to_string(), "dict[str, list[int]]");
        assert_eq!(
            ParamType::parse("tuple[str, float, bool]").unwrap().to_string(),
            "tuple[str, float, bool]"
        );
    }

    #[test]
    fn test_rejected_tags() {
        for tag in [
            "",
            "Str",
            "datetime",
            "list",
            "list[]",
            "list[str, int]",
            "dict[str]",
            "list[datetime]",
            "list[str",
            "list[str]]",
            "map[str, str]",
            "tuple[]",
        ] {
            assert_eq!(ParamType::parse(tag), None, "tag {tag:?} should be rejected");
        }
    }

    #[test]
    fn test_param_spec_serialization() {
        let param = ParamSpec::required("pubtime", "str", "记录的时间");
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "pubtime",
                "description": "记录的时间",
                "type": "str",
                "required": true
            })
        );
    }
}
