//! Value-position parsing: literals, lists, inline maps, holographic
//! patterns, expressions, multi-word coalescing, and colon-path values
//! (spec §4.2 "Value parsing" through "Colon-path values").

use crate::ast::{HolographicValue, InlineMap, ListValue, Value};
use crate::constraint::ConstraintChain;
use crate::error::ParserError;
use crate::parser::Parser;
use crate::token::{Token, TokenKind, Warning};

/// Parses the tokens making up a value (everything after `::` on an
/// assignment line) and returns the value plus any trailing `// comment`.
pub fn parse_value_tokens(tokens: &[Token], parser: &mut Parser, line: usize) -> Result<(Value, Option<String>), ParserError> {
    let (core, trailing_comment) = split_trailing_comment(tokens);
    if core.is_empty() {
        return Ok((Value::Absent, trailing_comment));
    }
    let value = parse_value(core, parser, line)?;
    Ok((value, trailing_comment))
}

fn split_trailing_comment(tokens: &[Token]) -> (&[Token], Option<String>) {
    if let Some(pos) = tokens.iter().position(|t| t.kind == TokenKind::Comment) {
        (&tokens[..pos], Some(tokens[pos].value.clone()))
    } else {
        (tokens, None)
    }
}

fn parse_value(tokens: &[Token], parser: &mut Parser, line: usize) -> Result<Value, ParserError> {
    if tokens.is_empty() {
        return Ok(Value::Absent);
    }

    match tokens[0].kind {
        TokenKind::ListStart => parse_bracketed(tokens, parser, line),
        TokenKind::Variable => Ok(Value::Variable(tokens[0].value.clone())),
        TokenKind::Section => {
            let target = tokens.get(1).map(|t| t.value.clone()).unwrap_or_default();
            Ok(Value::SectionRef(target))
        }
        TokenKind::Number => Ok(parse_scalar_number(&tokens[0])),
        TokenKind::Boolean => Ok(Value::Boolean(tokens[0].value == "true")),
        TokenKind::Null => Ok(Value::Null),
        TokenKind::String => Ok(maybe_coalesce(tokens, parser, line, Value::string(tokens[0].value.clone()))),
        TokenKind::Identifier | TokenKind::Version => {
            if tokens.len() >= 3 && tokens[1].kind == TokenKind::Block && tokens[2].kind == TokenKind::Identifier {
                // colon-path: IDENT ':' IDENT (...)
                let mut parts = vec![tokens[0].value.clone()];
                let mut i = 1;
                while i + 1 < tokens.len() && tokens[i].kind == TokenKind::Block && tokens[i + 1].kind == TokenKind::Identifier {
                    parts.push(tokens[i + 1].value.clone());
                    i += 2;
                }
                let joined = parts.join(":");
                if i < tokens.len() && tokens[i].kind == TokenKind::ListStart {
                    // adjacent constructor-annotation bracket attaches to the joined path
                    return parse_bracketed(&tokens[i..], parser, line).map(|v| match v {
                        Value::List(list) => Value::string(format!("{joined}<{}>", render_list_as_annotation(&list))),
                        other => other,
                    });
                }
                return Ok(Value::string(joined));
            }
            Ok(maybe_coalesce(tokens, parser, line, Value::string(tokens[0].value.clone())))
        }
        _ if tokens[0].kind.is_expression_operator() => parse_expression(tokens, parser, line),
        _ => Ok(Value::string(tokens.iter().map(|t| t.value.clone()).collect::<Vec<_>>().join(" "))),
    }
}

fn render_list_as_annotation(list: &ListValue) -> String {
    list.items
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => format!("{other:?}"),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_scalar_number(tok: &Token) -> Value {
    let raw = tok.raw_lexeme.as_deref().unwrap_or(&tok.value);
    Value::number_from_lexeme(raw)
}

/// Multi-word coalescing: a run of value-atom tokens with no intervening
/// structural delimiter joins into a single space-separated string, unless
/// the run contains an angle-bracket-annotated identifier anywhere (lookahead
/// scans for any annotation before deciding, per spec §9 Open Question) — in
/// which case it stays a `ListValue` of separate items.
fn maybe_coalesce(tokens: &[Token], parser: &mut Parser, line: usize, first: Value) -> Value {
    if tokens.len() == 1 {
        return first;
    }
    let rest = &tokens[1..];
    if rest.iter().all(|t| t.kind.is_value_atom()) {
        let has_annotation = tokens.iter().any(|t| t.kind == TokenKind::Identifier && t.value.contains('<'));
        parser.push_warning(Warning::new("multi_word_coalesce", format!("coalesced {} tokens into one value", tokens.len()), line, tokens[0].column));
        if has_annotation {
            return Value::List(ListValue { items: tokens.iter().map(|t| Value::string(t.value.clone())).collect(), token_slice: None });
        }
        return Value::string(tokens.iter().map(|t| t.value.clone()).collect::<Vec<_>>().join(" "));
    }
    if rest.iter().next().map(|t| t.kind.is_expression_operator()).unwrap_or(false) {
        return parse_expression(tokens, parser, line).unwrap_or(first);
    }
    first
}

fn parse_expression(tokens: &[Token], parser: &mut Parser, line: usize) -> Result<Value, ParserError> {
    let mut rendered = String::new();
    let mut tension_count = 0;

    for (i, tok) in tokens.iter().enumerate() {
        if i > 0 {
            rendered.push(' ');
        }
        rendered.push_str(&tok.value);
        match tok.kind {
            TokenKind::Flow if i == 0 => {
                parser.push_warning(Warning::new("W_BARE_FLOW", "bare flow operator outside brackets".to_string(), line, tok.column))
            }
            TokenKind::Constraint if i == 0 => parser.push_warning(Warning::new(
                "W_CONSTRAINT_OUTSIDE_BRACKETS",
                "bare constraint operator outside brackets".to_string(),
                line,
                tok.column,
            )),
            TokenKind::Tension => tension_count += 1,
            _ => {}
        }
    }
    if tension_count > 1 {
        parser.push_warning(Warning::new("W_CHAINED_TENSION", "more than one tension operator in a single expression".to_string(), line, tokens[0].column));
    }
    Ok(Value::string(rendered))
}

fn parse_bracketed(tokens: &[Token], parser: &mut Parser, line: usize) -> Result<Value, ParserError> {
    debug_assert_eq!(tokens[0].kind, TokenKind::ListStart);
    parser.enter_bracket();
    if parser.bracket_depth() >= crate::parser::MAX_NESTING_DEPTH {
        return Err(ParserError::new("maximum nesting depth exceeded", line, tokens[0].column, "E_MAX_NESTING_EXCEEDED"));
    }
    parser.note_bracket_depth_warning(line);
    let end = find_matching_close(tokens, 0, line)?;
    let inner = &tokens[1..end];

    let has_comma_at_depth1 = has_comma_at_depth(inner, 0);
    let has_constraint_at_depth1 = has_token_at_depth(inner, 0, TokenKind::Constraint);

    let result = if has_constraint_at_depth1 && !has_comma_at_depth1 {
        match try_parse_holographic(inner, tokens) {
            Some(h) => Value::Holographic(h),
            None => parse_list_or_inline_map(inner, parser, line)?,
        }
    } else {
        parse_list_or_inline_map(inner, parser, line)?
    };
    parser.exit_bracket();
    Ok(result)
}

fn find_matching_close(tokens: &[Token], open_idx: usize, line: usize) -> Result<usize, ParserError> {
    let mut depth = 0i32;
    for (i, t) in tokens.iter().enumerate().skip(open_idx) {
        match t.kind {
            TokenKind::ListStart => depth += 1,
            TokenKind::ListEnd => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(ParserError::new("unclosed '['", line, tokens[open_idx].column, "E007"))
}

fn has_comma_at_depth(tokens: &[Token], target_depth: i32) -> bool {
    let mut depth = 0i32;
    for t in tokens {
        match t.kind {
            TokenKind::ListStart => depth += 1,
            TokenKind::ListEnd => depth -= 1,
            TokenKind::Comma if depth == target_depth => return true,
            _ => {}
        }
    }
    false
}

fn has_token_at_depth(tokens: &[Token], target_depth: i32, kind: TokenKind) -> bool {
    let mut depth = 0i32;
    for t in tokens {
        match t.kind {
            TokenKind::ListStart => depth += 1,
            TokenKind::ListEnd => depth -= 1,
            k if k == kind && depth == target_depth => return true,
            _ => {}
        }
    }
    false
}

/// `_try_parse_holographic` / `_reconstruct_pattern_from_tokens`: reconstruct
/// the raw pattern text byte-for-byte from the captured token slice so I1
/// holds, then split it into example / constraint chain / target.
fn try_parse_holographic(inner: &[Token], full_slice: &[Token]) -> Option<HolographicValue> {
    let flow_pos = inner.iter().rposition(|t| t.kind == TokenKind::Flow);
    let constraint_pos = inner.iter().position(|t| t.kind == TokenKind::Constraint)?;
    if constraint_pos == 0 {
        return None;
    }
    let example_tokens = &inner[..constraint_pos];
    let chain_end = flow_pos.unwrap_or(inner.len());
    let chain_tokens = &inner[constraint_pos + 1..chain_end];
    let target = flow_pos.and_then(|p| inner.get(p + 2)).map(|t| t.value.clone());

    let example_text = example_tokens.iter().map(|t| t.value.clone()).collect::<String>();
    let example = Box::new(reconstruct_example_value(example_tokens));
    let chain_text = reconstruct_chain_text(chain_tokens);
    ConstraintChain::parse(&chain_text).ok()?;

    let raw_pattern = reconstruct_pattern_from_tokens(full_slice);
    let _ = example_text;

    Some(HolographicValue { example, constraint_chain: chain_text, target, raw_pattern })
}

fn reconstruct_example_value(tokens: &[Token]) -> Value {
    match tokens.first() {
        Some(t) if t.kind == TokenKind::String => Value::string(t.value.clone()),
        Some(t) if t.kind == TokenKind::Number => parse_scalar_number(t),
        Some(t) if t.kind == TokenKind::Boolean => Value::Boolean(t.value == "true"),
        Some(t) if t.kind == TokenKind::Null => Value::Null,
        _ => Value::string(tokens.iter().map(|t| t.value.clone()).collect::<Vec<_>>().join("")),
    }
}

fn reconstruct_chain_text(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut depth = 0i32;
    for t in tokens {
        match t.kind {
            TokenKind::ListStart => {
                depth += 1;
                out.push('[');
            }
            TokenKind::ListEnd => {
                depth -= 1;
                out.push(']');
            }
            TokenKind::Comma => {
                out.push(',');
            }
            TokenKind::Constraint => out.push('∧'),
            _ => {
                out.push_str(&t.value);
            }
        }
    }
    let _ = depth;
    out
}

/// Byte-for-byte reconstruction of the original bracketed text from the
/// captured token slice, used as `HolographicValue.raw_pattern`.
fn reconstruct_pattern_from_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for t in tokens {
        match t.kind {
            TokenKind::String => {
                out.push('"');
                out.push_str(&t.value);
                out.push('"');
            }
            TokenKind::Comma => out.push(','),
            _ => out.push_str(&t.value),
        }
    }
    out
}

fn parse_list_or_inline_map(inner: &[Token], parser: &mut Parser, line: usize) -> Result<Value, ParserError> {
    if inner.is_empty() {
        return Ok(Value::List(ListValue { items: Vec::new(), token_slice: None }));
    }

    let looks_like_inline_map = first_item_has_top_level_assign(inner);
    if looks_like_inline_map {
        let pairs = split_top_level(inner, TokenKind::Comma)
            .into_iter()
            .map(|item| parse_inline_map_pair(item, parser, line))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect();
        return Ok(Value::InlineMap(InlineMap { pairs }));
    }

    let items = split_top_level(inner, TokenKind::Comma)
        .into_iter()
        .map(|item| parse_value(item, parser, line))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::List(ListValue { items, token_slice: None }))
}

fn first_item_has_top_level_assign(inner: &[Token]) -> bool {
    let mut depth = 0i32;
    for t in inner {
        match t.kind {
            TokenKind::ListStart => depth += 1,
            TokenKind::ListEnd => depth -= 1,
            TokenKind::Comma if depth == 0 => return false,
            TokenKind::Assign if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

fn split_top_level(tokens: &[Token], on: TokenKind) -> Vec<&[Token]> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, t) in tokens.iter().enumerate() {
        match t.kind {
            TokenKind::ListStart => depth += 1,
            TokenKind::ListEnd => depth -= 1,
            k if k == on && depth == 0 => {
                if i > start {
                    out.push(&tokens[start..i]);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        out.push(&tokens[start..]);
    }
    out
}

fn parse_inline_map_pair(item: &[Token], parser: &mut Parser, line: usize) -> Result<Option<(String, Value)>, ParserError> {
    let Some(assign_pos) = item.iter().position(|t| t.kind == TokenKind::Assign) else {
        return Ok(None);
    };
    let Some(key_tok) = item.first() else {
        return Ok(None);
    };
    let key = key_tok.value.clone();
    let value_tokens = &item[assign_pos + 1..];

    let is_nested_map = value_tokens.first().map(|t| t.kind) == Some(TokenKind::ListStart)
        && first_item_has_top_level_assign(&value_tokens[1..value_tokens.len().saturating_sub(1)]);

    if is_nested_map {
        if parser.is_strict() {
            return Err(ParserError::new(
                "inline map value must be an atom, not a nested inline map".to_string(),
                line,
                key_tok.column,
                "E_NESTED_INLINE_MAP",
            ));
        } else {
            parser.push_warning(Warning::new("W_NESTED_INLINE_MAP", "inline map value must be an atom".to_string(), line, key_tok.column));
        }
    }

    let value = parse_value(value_tokens, parser, line)?;
    Ok(Some((key, value)))
}
