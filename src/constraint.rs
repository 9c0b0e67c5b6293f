//! Constraint chain parsing, validation, and compilation (spec §4.4).
//!
//! `ConstraintChain::parse` splits the raw chain text on `∧`, trims each
//! segment, and parses it into a [`Constraint`] variant. Each variant knows
//! how to render itself canonically, validate a runtime value, and compile
//! to a regex fragment for grammar-formatter consumption.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::ast::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Req,
    Opt,
    Enum(Vec<String>),
    Const(String),
    Type(Vec<String>),
    Regex(String),
    Range(f64, f64),
    MinLength(usize),
    MaxLength(usize),
    Date,
    Iso8601,
    Dir,
    AppendOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintChain {
    pub constraints: Vec<Constraint>,
}

impl ConstraintChain {
    pub fn parse(s: &str) -> Result<Self, String> {
        let constraints = s
            .split('∧')
            .map(|seg| seg.trim())
            .filter(|seg| !seg.is_empty())
            .map(Constraint::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { constraints })
    }

    pub fn to_string(&self) -> String {
        self.constraints.iter().map(|c| c.to_string()).collect::<Vec<_>>().join("∧")
    }

    pub fn validate(&self, value: &Value, prior: Option<&Value>) -> Result<(), String> {
        for c in &self.constraints {
            c.validate(value, prior)?;
        }
        Ok(())
    }

    pub fn compile(&self) -> String {
        self.constraints.iter().map(|c| c.compile()).collect::<Vec<_>>().join("")
    }
}

fn bracket_args(s: &str, name: &str) -> Option<String> {
    let rest = s.strip_prefix(name)?.strip_prefix('[')?;
    let end = rest.rfind(']')?;
    Some(rest[..end].to_string())
}

impl Constraint {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "REQ" => return Ok(Constraint::Req),
            "OPT" => return Ok(Constraint::Opt),
            "DATE" => return Ok(Constraint::Date),
            "ISO8601" => return Ok(Constraint::Iso8601),
            "DIR" => return Ok(Constraint::Dir),
            "APPEND_ONLY" => return Ok(Constraint::AppendOnly),
            _ => {}
        }
        if let Some(args) = bracket_args(s, "ENUM") {
            return Ok(Constraint::Enum(split_args(&args)));
        }
        if let Some(args) = bracket_args(s, "CONST") {
            return Ok(Constraint::Const(unquote(args.trim())));
        }
        if let Some(args) = bracket_args(s, "TYPE") {
            return Ok(Constraint::Type(args.split('|').map(|t| t.trim().to_string()).collect()));
        }
        if let Some(args) = bracket_args(s, "REGEX") {
            return Ok(Constraint::Regex(unquote(args.trim())));
        }
        if let Some(args) = bracket_args(s, "RANGE") {
            let parts = split_args(&args);
            if parts.len() != 2 {
                return Err(format!("RANGE requires exactly two bounds, got '{args}'"));
            }
            let min: f64 = parts[0].parse().map_err(|_| format!("invalid RANGE min '{}'", parts[0]))?;
            let max: f64 = parts[1].parse().map_err(|_| format!("invalid RANGE max '{}'", parts[1]))?;
            return Ok(Constraint::Range(min, max));
        }
        if let Some(args) = bracket_args(s, "MIN_LENGTH") {
            return Ok(Constraint::MinLength(args.trim().parse().map_err(|_| format!("invalid MIN_LENGTH '{args}'"))?));
        }
        if let Some(args) = bracket_args(s, "MAX_LENGTH") {
            return Ok(Constraint::MaxLength(args.trim().parse().map_err(|_| format!("invalid MAX_LENGTH '{args}'"))?));
        }
        Err(format!("unrecognized constraint '{s}'"))
    }

    pub fn to_string(&self) -> String {
        match self {
            Constraint::Req => "REQ".to_string(),
            Constraint::Opt => "OPT".to_string(),
            Constraint::Enum(v) => format!("ENUM[{}]", v.join(",")),
            Constraint::Const(v) => format!("CONST[{v}]"),
            Constraint::Type(v) => format!("TYPE[{}]", v.join("|")),
            Constraint::Regex(p) => {
                if p.contains('[') || p.contains(']') {
                    format!("REGEX[\"{p}\"]")
                } else {
                    format!("REGEX[{p}]")
                }
            }
            Constraint::Range(min, max) => format!("RANGE[{min},{max}]"),
            Constraint::MinLength(n) => format!("MIN_LENGTH[{n}]"),
            Constraint::MaxLength(n) => format!("MAX_LENGTH[{n}]"),
            Constraint::Date => "DATE".to_string(),
            Constraint::Iso8601 => "ISO8601".to_string(),
            Constraint::Dir => "DIR".to_string(),
            Constraint::AppendOnly => "APPEND_ONLY".to_string(),
        }
    }

    pub fn validate(&self, value: &Value, prior: Option<&Value>) -> Result<(), String> {
        match self {
            Constraint::Req => {
                if value.is_absent() || matches!(value, Value::Null) {
                    return Err("value is required".to_string());
                }
            }
            Constraint::Opt => {}
            Constraint::Enum(allowed) => {
                let s = value_as_str(value).ok_or("ENUM requires a string value")?;
                if !allowed.iter().any(|a| a == &s) && !allowed.iter().any(|a| a.eq_ignore_ascii_case(&s)) {
                    return Err(format!("'{s}' is not one of {allowed:?}"));
                }
            }
            Constraint::Const(expected) => {
                let s = value_as_str(value).ok_or("CONST requires a string value")?;
                if &s != expected {
                    return Err(format!("expected constant '{expected}', got '{s}'"));
                }
            }
            Constraint::Type(types) => {
                let actual = type_name(value);
                if !types.iter().any(|t| t == actual) {
                    return Err(format!("expected type {types:?}, got {actual}"));
                }
            }
            Constraint::Regex(pattern) => {
                let s = value_as_str(value).ok_or("REGEX requires a string value")?;
                let re = compiled_regex(pattern).map_err(|e| format!("invalid REGEX pattern: {e}"))?;
                if !re.is_match(&s) {
                    return Err(format!("'{s}' does not match /{pattern}/"));
                }
            }
            Constraint::Range(min, max) => {
                let n = value_as_f64(value).ok_or("RANGE requires a numeric value")?;
                if n < *min || n > *max {
                    return Err(format!("{n} is outside range [{min}, {max}]"));
                }
            }
            Constraint::MinLength(n) => {
                if value_length(value).ok_or("MIN_LENGTH requires a string or list")? < *n {
                    return Err(format!("length below minimum {n}"));
                }
            }
            Constraint::MaxLength(n) => {
                if value_length(value).ok_or("MAX_LENGTH requires a string or list")? > *n {
                    return Err(format!("length exceeds maximum {n}"));
                }
            }
            Constraint::Date => {
                let s = value_as_str(value).ok_or("DATE requires a string value")?;
                NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| format!("'{s}' is not a valid YYYY-MM-DD date"))?;
            }
            Constraint::Iso8601 => {
                let s = value_as_str(value).ok_or("ISO8601 requires a string value")?;
                chrono::DateTime::parse_from_rfc3339(&s).map_err(|_| format!("'{s}' is not a valid ISO 8601 datetime"))?;
            }
            Constraint::Dir => {
                let s = value_as_str(value).ok_or("DIR requires a string value")?;
                if s.is_empty() {
                    return Err("DIR requires a non-empty path-shaped string".to_string());
                }
            }
            Constraint::AppendOnly => {
                if let (Value::List(prev), Value::List(cur)) = (prior.unwrap_or(&Value::Absent), value) {
                    if cur.items.len() < prev.items.len() {
                        return Err("APPEND_ONLY: list shrank".to_string());
                    }
                    if prev.items != cur.items[..prev.items.len()] {
                        return Err("APPEND_ONLY: prior items were modified".to_string());
                    }
                }
            }
        }
        Ok(())
    }

    pub fn compile(&self) -> String {
        match self {
            Constraint::Enum(v) => format!("(?:{})", v.iter().map(|s| regex::escape(s)).collect::<Vec<_>>().join("|")),
            Constraint::Const(v) => regex::escape(v),
            Constraint::Regex(p) => p.clone(),
            Constraint::Date => r"\d{4}-\d{2}-\d{2}".to_string(),
            Constraint::Iso8601 => r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})".to_string(),
            _ => String::new(),
        }
    }
}

fn compiled_regex(pattern: &str) -> Result<Regex, regex::Error> {
    static CELL: OnceLock<std::sync::Mutex<std::collections::HashMap<String, Regex>>> = OnceLock::new();
    let cache = CELL.get_or_init(|| std::sync::Mutex::new(std::collections::HashMap::new()));
    let mut guard = cache.lock().unwrap();
    if let Some(re) = guard.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)?;
    guard.insert(pattern.to_string(), re.clone());
    Ok(re)
}

fn split_args(s: &str) -> Vec<String> {
    s.split(',').map(|p| unquote(p.trim())).collect()
}

fn unquote(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

fn value_as_str(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i, _) => Some(i.to_string()),
        Value::Float(f, _) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(i, _) => Some(*i as f64),
        Value::Float(f, _) => Some(*f),
        _ => None,
    }
}

fn value_length(v: &Value) -> Option<usize> {
    match v {
        Value::String(s) => Some(s.chars().count()),
        Value::List(l) => Some(l.items.len()),
        _ => None,
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::String(_) => "STRING",
        Value::Integer(_, _) | Value::Float(_, _) => "NUMBER",
        Value::Boolean(_) => "BOOLEAN",
        Value::List(_) => "LIST",
        Value::InlineMap(_) => "INLINE_MAP",
        Value::Holographic(_) => "HOLOGRAPHIC",
        Value::LiteralZone(_) => "LITERAL_ZONE",
        Value::Variable(_) => "VARIABLE",
        Value::SectionRef(_) => "SECTION_REF",
        Value::Null => "NULL",
        Value::Absent => "ABSENT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_validates_enum() {
        let chain = ConstraintChain::parse("REQ∧ENUM[X,Y]").unwrap();
        assert!(chain.validate(&Value::string("X"), None).is_ok());
        assert!(chain.validate(&Value::string("Z"), None).is_err());
    }

    #[test]
    fn range_validates_inclusive_bounds() {
        let c = Constraint::parse("RANGE[0,10]").unwrap();
        assert!(c.validate(&Value::integer(10), None).is_ok());
        assert!(c.validate(&Value::integer(11), None).is_err());
    }

    #[test]
    fn to_string_round_trips() {
        let chain = ConstraintChain::parse("REQ∧ENUM[A,B]").unwrap();
        assert_eq!(chain.to_string(), "REQ∧ENUM[A,B]");
    }

    #[test]
    fn append_only_rejects_shrinking_list() {
        use crate::ast::ListValue;
        let prev = Value::List(ListValue { items: vec![Value::integer(1), Value::integer(2)], token_slice: None });
        let cur = Value::List(ListValue { items: vec![Value::integer(1)], token_slice: None });
        let c = Constraint::AppendOnly;
        assert!(c.validate(&cur, Some(&prev)).is_err());
    }
}
