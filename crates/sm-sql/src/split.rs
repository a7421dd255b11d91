//! Batch and statement splitting.
//!
//! A migration script is a sequence of batches separated by a delimiter
//! keyword occupying a whole line. Splitting must happen on comment-free
//! text (see [`crate::strip_comments`]), otherwise a keyword inside a
//! comment would open a new batch.

use crate::error::{SqlError, SqlResult};

/// Batch delimiter used when none is configured.
pub const DEFAULT_BATCH_DELIMITER: &str = "GO";

/// Split `sql` into batches on lines consisting solely of `GO`.
///
/// # Examples
/// ```
/// use sm_sql::split_batches;
/// assert_eq!(split_batches("A;\nGO\nB;\n"), vec!["A;", "B;"]);
/// ```
pub fn split_batches(sql: &str) -> Vec<String> {
    split_batches_on(sql, DEFAULT_BATCH_DELIMITER)
}

/// Split `sql` into batches on lines consisting solely of `delimiter`.
///
/// The comparison ignores case and surrounding whitespace on the line.
/// Batches are trimmed; batches left empty are dropped.
pub fn split_batches_on(sql: &str, delimiter: &str) -> Vec<String> {
    let mut batches = Vec::new();
    let mut current = String::new();

    for line in sql.split('\n') {
        if line.trim().eq_ignore_ascii_case(delimiter) {
            push_trimmed(&mut batches, &current);
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_trimmed(&mut batches, &current);

    batches
}

fn push_trimmed(batches: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        batches.push(trimmed.to_string());
    }
}

/// Check that `delimiter` can be matched as a whole line.
pub fn validate_delimiter(delimiter: &str) -> SqlResult<()> {
    if delimiter.is_empty() || delimiter.chars().any(char::is_whitespace) {
        return Err(SqlError::InvalidDelimiter(delimiter.to_string()));
    }
    Ok(())
}

/// Regularize line endings in a batch before it is executed and logged.
///
/// `\r\n` becomes `\n` and runs of line breaks collapse to one.
pub fn normalize_batch(batch: &str) -> String {
    let unix = batch.replace("\r\n", "\n");
    let mut out = String::with_capacity(unix.len());
    let mut prev_newline = false;
    for c in unix.chars() {
        if c == '\n' {
            if prev_newline {
                continue;
            }
            prev_newline = true;
        } else {
            prev_newline = false;
        }
        out.push(c);
    }
    out.trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Quote {
    None,
    /// `'...'`; `E'...'` also honours backslash escapes
    Single { backslash_escapes: bool },
    Double,
    /// `$$...$$` or `$tag$...$tag$`, holding the opening tag
    Dollar(Vec<char>),
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Dollar-quote tag starting at `start`, if one does.
///
/// Positional parameters (`$1`) and `$` inside identifiers are not tags.
fn dollar_tag(chars: &[char], start: usize) -> Option<Vec<char>> {
    if start > 0 && is_ident_char(chars[start - 1]) {
        return None;
    }
    let mut end = start + 1;
    if let Some(&first) = chars.get(end) {
        if first.is_alphabetic() || first == '_' {
            while chars.get(end).is_some_and(|&c| is_ident_char(c)) {
                end += 1;
            }
        }
    }
    (chars.get(end) == Some(&'$')).then(|| chars[start..=end].to_vec())
}

/// `'` at `pos` opens an `E'...'` escape string.
fn opens_escape_string(chars: &[char], pos: usize) -> bool {
    pos >= 1
        && matches!(chars[pos - 1], 'E' | 'e')
        && (pos < 2 || !is_ident_char(chars[pos - 2]))
}

/// Split a comment-free batch into individual statements on `;`.
///
/// Semicolons inside single-quoted literals, double-quoted identifiers and
/// dollar-quoted bodies (`$$...$$`, `$fn$...$fn$`) do not split. Doubled
/// quotes (`'it''s'`) toggle the state twice; backslash escapes apply only
/// inside `E'...'`. Statements are trimmed and keep no trailing `;`; empty
/// statements are dropped.
///
/// # Examples
/// ```
/// use sm_sql::split_statements;
/// assert_eq!(
///     split_statements("INSERT INTO t VALUES ('a;b'); DELETE FROM t;"),
///     vec!["INSERT INTO t VALUES ('a;b')", "DELETE FROM t"]
/// );
/// ```
pub fn split_statements(batch: &str) -> Vec<String> {
    let chars: Vec<char> = batch.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote = Quote::None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match &quote {
            Quote::None => match c {
                ';' => {
                    push_trimmed(&mut statements, &current);
                    current.clear();
                    i += 1;
                    continue;
                }
                '\'' => {
                    quote = Quote::Single {
                        backslash_escapes: opens_escape_string(&chars, i),
                    }
                }
                '"' => quote = Quote::Double,
                '$' => {
                    if let Some(tag) = dollar_tag(&chars, i) {
                        i += tag.len();
                        current.extend(tag.iter());
                        quote = Quote::Dollar(tag);
                        continue;
                    }
                }
                _ => {}
            },
            Quote::Single { backslash_escapes } => match c {
                '\\' if *backslash_escapes => {
                    current.push(c);
                    i += 1;
                    if let Some(&escaped) = chars.get(i) {
                        current.push(escaped);
                        i += 1;
                    }
                    continue;
                }
                '\'' => quote = Quote::None,
                _ => {}
            },
            Quote::Double => {
                if c == '"' {
                    quote = Quote::None;
                }
            }
            Quote::Dollar(tag) => {
                if chars[i..].starts_with(tag) {
                    i += tag.len();
                    current.extend(tag.iter());
                    quote = Quote::None;
                    continue;
                }
            }
        }
        current.push(c);
        i += 1;
    }
    push_trimmed(&mut statements, &current);

    if quote != Quote::None {
        log::debug!("Unbalanced quote in batch; last statement passed through as-is");
    }

    statements
}

#[cfg(test)]
#[path = "split_test.rs"]
mod tests;
