//! Table reference extraction from mapper statement text.
//!
//! Token based, not a SQL parser: placeholders and dynamic tags are
//! neutralized, then the identifier run after each table anchor is read.
//! A subquery directly after FROM/JOIN yields nothing for that anchor; its
//! own inner anchors are still found.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Words that can follow an anchor but never name a table
const SQL_KEYWORDS: &[&str] = &[
    "DUAL", "SELECT", "FROM", "WHERE", "AND", "OR", "ON", "AS", "SET", "JOIN", "LEFT", "RIGHT",
    "INNER", "OUTER", "CROSS", "VALUES", "UPDATE", "INSERT", "DELETE", "MERGE", "INTO", "USING",
    "GROUP", "ORDER", "BY", "HAVING", "DISTINCT", "LIMIT", "OFFSET", "CASE", "WHEN", "THEN",
    "ELSE", "END", "IN", "EXISTS", "NOT", "NULL", "IS", "LIKE", "BETWEEN", "ASC", "DESC", "WITH",
    "PARTITION", "FULL", "NATURAL", "UNION", "ALL", "MATCHED", "LATERAL",
];

static CURLY_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[#$]\{[^}]*\}").expect("valid placeholder regex"));

static IBATIS_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#[A-Za-z0-9_.\[\]:]+#|\$[A-Za-z0-9_.\[\]:]+\$").expect("valid iBatis regex")
});

static NAMED_PARAMETER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":[A-Za-z0-9_]+").expect("valid named parameter regex"));

static DYNAMIC_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</?(?:if|where|set|choose|when|otherwise|trim|foreach|bind|include|selectKey|dynamic|iterate|isNull|isNotNull|isEmpty|isNotEmpty|isEqual|isNotEqual|isGreaterThan|isGreaterEqual|isLessThan|isLessEqual|isPropertyAvailable|isNotPropertyAvailable|isParameterPresent|isNotParameterPresent)\b[^>]*>",
    )
    .expect("valid dynamic tag regex")
});

static CDATA_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!\[CDATA\[|\]\]>").expect("valid CDATA regex"));

static LINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"--[^\n]*").expect("valid line comment regex"));

static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static TABLE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:DELETE\s+FROM|INSERT\s+INTO|MERGE\s+INTO|FROM|JOIN|UPDATE|USING)\s+")
        .expect("valid anchor regex")
});

/// All normalized table names referenced by `sql`.
///
/// Never fails; text without anchors yields an empty set.
pub fn extract_table_names(sql: &str) -> BTreeSet<String> {
    if sql.trim().is_empty() {
        return BTreeSet::new();
    }
    let cleaned = clean_statement_text(sql);

    TABLE_ANCHOR
        .find_iter(&cleaned)
        .flat_map(|anchor| table_list_after(&cleaned[anchor.end()..]))
        .map(normalize_table_name)
        .filter(|name| is_table_name(name))
        .collect()
}

/// Canonical form of a table name: schema and quoting removed, upper-cased.
///
/// Applied both to extracted names and to query input.
pub fn normalize_table_name(name: &str) -> String {
    let first = name.split_whitespace().next().unwrap_or("");
    let unqualified = first.rsplit('.').next().unwrap_or(first);
    unqualified
        .chars()
        .filter(|c| !matches!(c, '`' | '\'' | '"' | '[' | ']'))
        .collect::<String>()
        .to_uppercase()
}

/// Replace placeholders, strip dynamic wrapper tags and comments, collapse
/// whitespace.
pub fn clean_statement_text(sql: &str) -> String {
    let text = CURLY_PLACEHOLDER.replace_all(sql, "?");
    let text = IBATIS_PLACEHOLDER.replace_all(&text, "?");
    let text = NAMED_PARAMETER.replace_all(&text, "?");
    let text = text.replace(['#', '$'], "?");
    let text = DYNAMIC_TAG.replace_all(&text, " ");
    let text = CDATA_MARKER.replace_all(&text, " ");
    let text = BLOCK_COMMENT.replace_all(&text, " ");
    let text = LINE_COMMENT.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn is_table_name(name: &str) -> bool {
    !name.is_empty() && name != "?" && !SQL_KEYWORDS.contains(&name)
}

fn is_keyword(token: &str) -> bool {
    SQL_KEYWORDS.contains(&token.to_uppercase().as_str())
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ';' | '(' | ')')
}

/// Read `name [AS] [alias] (, name [AS] [alias])*` from the start of `rest`.
fn table_list_after(rest: &str) -> Vec<&str> {
    let mut tables = Vec::new();
    let mut cursor = rest;

    loop {
        let (name, after) = next_token(cursor);
        if name.is_empty() {
            break;
        }
        tables.push(name);
        cursor = after;

        let (mut token, mut after) = next_token(cursor);
        if token.eq_ignore_ascii_case("AS") {
            (token, after) = next_token(after);
        }
        if !token.is_empty() && !is_keyword(token) {
            cursor = after;
        }

        let trimmed = cursor.trim_start();
        match trimmed.strip_prefix(',') {
            Some(next) => cursor = next,
            None => break,
        }
    }

    tables
}

/// Split off the next identifier-like token after optional whitespace.
fn next_token(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    let end = text.find(is_delimiter).unwrap_or(text.len());
    (&text[..end], &text[end..])
}
