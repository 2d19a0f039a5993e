use crate::{DaoError, Error};
use std::borrow::Cow;

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Counts the positional `?` placeholders of a statement.
///
/// Question marks inside string literals, quoted identifiers and comments are not placeholders.
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '?' => count += 1,
            '\'' | '"' | '`' => {
                // Doubled quotes are escapes and simply reopen the literal
                for v in chars.by_ref() {
                    if v == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for v in chars.by_ref() {
                    if v == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for v in chars.by_ref() {
                    if previous == '*' && v == '/' {
                        break;
                    }
                    previous = v;
                }
            }
            _ => {}
        }
    }
    count
}

/// Extracts the table written by an `INSERT INTO`, `UPDATE` or `DELETE FROM` statement.
pub fn written_table(sql: &str) -> Option<String> {
    let mut words = sql.split_whitespace();
    let first = words.next()?.to_ascii_uppercase();
    let table = match first.as_str() {
        "INSERT" | "DELETE" => {
            words.next()?;
            words.next()?
        }
        "UPDATE" => words.next()?,
        _ => return None,
    };
    let table = table
        .split('(')
        .next()
        .unwrap_or(table)
        .trim_matches(|c| c == '"' || c == '`');
    if table.is_empty() {
        return None;
    }
    Some(table.to_ascii_lowercase())
}

/// True when `sql` mentions `table` as a whole word (case insensitive).
pub fn mentions_table(sql: &str, table: &str) -> bool {
    sql.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .any(|word| word.eq_ignore_ascii_case(table))
}

/// Logs the error and wraps it, for failures detected by the layer itself.
pub(crate) fn dao_error(error: DaoError) -> Error {
    let error = Error::new(error);
    log::error!("{:#}", error);
    error
}

/// Shortens long statements for log lines and error contexts.
pub fn truncated(query: &str) -> Cow<'_, str> {
    match query.char_indices().nth(497) {
        Some((end, _)) => Cow::Owned(format!("{}...", query[..end].trim_end())),
        None => Cow::Borrowed(query.trim_end()),
    }
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        $crate::truncated(&$query)
    };
}
