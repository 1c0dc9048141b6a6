//! Parameter binding: checks a binding set against the placeholders of a
//! statement and hands it to the result handle for re-execution.

use tracing::debug;

use crate::error::{DbResultError, Result};
use crate::traits::ResultHandle;
use crate::types::BindingSet;

/// Placeholders found in a statement's text.
///
/// Recognises `?`, `$1`-style numbered, and `:name`, `$name`, `@name` named
/// placeholders. Quoted literals, quoted identifiers, `$tag$` dollar-quoted
/// bodies, comments and `::` casts are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    anonymous: usize,
    max_numbered: usize,
    names: Vec<String>,
}

impl Placeholders {
    pub fn scan(sql: &str) -> Self {
        let mut found = Self::default();
        let chars: Vec<char> = sql.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();
            if c == '$' {
                if let Some(tag_len) = dollar_tag_len(&chars, i) {
                    i = skip_dollar_quoted(&chars, i, tag_len);
                    continue;
                }
            }
            match c {
                '\'' | '"' | '`' => {
                    i += 1;
                    while i < chars.len() && chars[i] != c {
                        i += 1;
                    }
                    i += 1;
                }
                '-' if next == Some('-') => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                }
                '/' if next == Some('*') => {
                    i += 2;
                    while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                        i += 1;
                    }
                    i += 2;
                }
                ':' if next == Some(':') => i += 2,
                '?' => {
                    found.anonymous += 1;
                    i += 1;
                }
                '$' if next.is_some_and(|n| n.is_ascii_digit()) => {
                    let end = scan_while(&chars, i + 1, |ch| ch.is_ascii_digit());
                    let number: String = chars[i + 1..end].iter().collect();
                    if let Ok(n) = number.parse::<usize>() {
                        found.max_numbered = found.max_numbered.max(n);
                    }
                    i = end;
                }
                '$' | ':' | '@' if next.is_some_and(is_name_start) => {
                    let end = scan_while(&chars, i + 1, is_name_char);
                    let name: String = chars[i + 1..end].iter().collect();
                    if !found.names.contains(&name) {
                        found.names.push(name);
                    }
                    i = end;
                }
                _ => i += 1,
            }
        }

        found
    }

    /// Number of positional parameters the statement expects.
    pub fn positional(&self) -> usize {
        self.anonymous + self.max_numbered
    }

    /// Distinct named placeholders, in order of first appearance.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.positional() == 0 && self.names.is_empty()
    }

    /// Checks that a binding set has the shape these placeholders need.
    pub fn check(&self, bindings: &BindingSet) -> Result<()> {
        if (self.anonymous > 0 && self.max_numbered > 0)
            || (self.positional() > 0 && !self.names.is_empty())
        {
            return Err(malformed("statement mixes placeholder styles"));
        }
        check_shape(bindings)?;
        if self.is_empty() {
            return Err(malformed("statement has no placeholders"));
        }

        if bindings.is_named() {
            if self.positional() > 0 {
                return Err(malformed("named values bound to positional placeholders"));
            }
            let names = bindings.names();
            if let Some(missing) = self.names.iter().find(|n| !names.contains(&n.as_str())) {
                return Err(malformed(&format!("no value bound for `{}`", missing)));
            }
            if let Some(extra) = names.iter().find(|n| !self.names.iter().any(|p| p.as_str() == **n)) {
                return Err(malformed(&format!("no placeholder named `{}`", extra)));
            }
        } else {
            if !self.names.is_empty() {
                return Err(malformed("positional values bound to named placeholders"));
            }
            if bindings.len() != self.positional() {
                return Err(malformed(&format!(
                    "statement has {} placeholder(s), {} value(s) bound",
                    self.positional(),
                    bindings.len()
                )));
            }
        }
        Ok(())
    }
}

fn check_shape(bindings: &BindingSet) -> Result<()> {
    if bindings.is_empty() || bindings.batch_size() == 0 {
        return Err(malformed("binding set has no values"));
    }
    if !bindings.has_uniform_batch() {
        return Err(malformed("all parameters must have the same number of values"));
    }
    Ok(())
}

fn malformed(message: &str) -> DbResultError {
    DbResultError::MalformedBindingSet(message.to_string())
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Length of the `$tag$` opening a dollar-quoted string at `start`, if any.
fn dollar_tag_len(chars: &[char], start: usize) -> Option<usize> {
    let body = start + 1;
    let end = match chars.get(body) {
        Some('$') => body,
        Some(&c) if is_name_start(c) => scan_while(chars, body, is_name_char),
        _ => return None,
    };
    (chars.get(end) == Some(&'$')).then(|| end + 1 - start)
}

/// Position just past the tag closing the dollar-quoted string at `start`.
fn skip_dollar_quoted(chars: &[char], start: usize, tag_len: usize) -> usize {
    let tag = &chars[start..start + tag_len];
    let mut i = start + tag_len;
    while i + tag_len <= chars.len() {
        if &chars[i..i + tag_len] == tag {
            return i + tag_len;
        }
        i += 1;
    }
    chars.len()
}

fn scan_while(chars: &[char], start: usize, pred: impl Fn(char) -> bool) -> usize {
    let mut end = start;
    while end < chars.len() && pred(chars[end]) {
        end += 1;
    }
    end
}

/// Validates a binding set against a statement's text.
pub fn validate(sql: &str, bindings: &BindingSet) -> Result<()> {
    Placeholders::scan(sql).check(bindings)
}

/// Validates a positional binding set against a known parameter count,
/// for backends that learn it by preparing the statement.
pub fn validate_positional(expected: usize, bindings: &BindingSet) -> Result<()> {
    if bindings.is_named() {
        return Err(malformed("named values bound to positional parameters"));
    }
    check_shape(bindings)?;
    if expected == 0 {
        return Err(malformed("statement has no placeholders"));
    }
    if bindings.len() != expected {
        return Err(malformed(&format!(
            "statement has {} parameter(s), {} value(s) bound",
            expected,
            bindings.len()
        )));
    }
    Ok(())
}

/// Binds a new parameter set into an existing result handle.
///
/// Fails with `ResourceExpired` on an invalid handle and with
/// `MalformedBindingSet` when the set does not fit the statement; in both
/// cases the handle is left untouched. Returns the handle for chaining.
pub async fn bind<'h, H>(handle: &'h mut H, bindings: &BindingSet) -> Result<&'h mut H>
where
    H: ResultHandle + ?Sized,
{
    if !handle.is_valid() {
        return Err(DbResultError::ResourceExpired);
    }
    handle.check_bindings(bindings)?;
    debug!(
        params = bindings.len(),
        batch = bindings.batch_size(),
        "rebinding result"
    );
    handle.rebind(bindings).await?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlValue;

    #[test]
    fn test_scan_anonymous() {
        let p = Placeholders::scan("SELECT * FROM t WHERE a = ? AND b = ?");
        assert_eq!(p.positional(), 2);
        assert!(p.names().is_empty());
    }

    #[test]
    fn test_scan_numbered_uses_highest_index() {
        let p = Placeholders::scan("SELECT $1, $2, $1");
        assert_eq!(p.positional(), 2);
    }

    #[test]
    fn test_scan_named() {
        let p = Placeholders::scan("UPDATE t SET a = :a, b = @b WHERE id = $id AND a = :a");
        assert_eq!(p.positional(), 0);
        assert_eq!(p.names(), &["a".to_string(), "b".to_string(), "id".to_string()]);
    }

    #[test]
    fn test_scan_skips_literals_comments_and_casts() {
        let p = Placeholders::scan(
            "SELECT '?', \"$1\", x::int /* :name */ FROM t -- ?\nWHERE a = ?",
        );
        assert_eq!(p.positional(), 1);
        assert!(p.names().is_empty());
    }

    #[test]
    fn test_scan_skips_dollar_quoted_bodies() {
        let p = Placeholders::scan("SELECT $fn$x ? :y$fn$ || $1");
        assert_eq!(p.positional(), 1);
        assert!(p.names().is_empty());
        let set = BindingSet::single([SqlValue::Int32(1)]);
        assert!(validate("SELECT $fn$x$fn$ || $1", &set).is_ok());

        let p = Placeholders::scan("DO $$ BEGIN PERFORM @x; END $$");
        assert!(p.is_empty());

        // Unterminated body swallows the rest of the statement
        assert!(Placeholders::scan("SELECT $a$ $1").is_empty());
    }

    #[test]
    fn test_scan_dollar_name_is_still_a_placeholder() {
        let p = Placeholders::scan("SELECT * FROM t WHERE id = $id");
        assert_eq!(p.names(), &["id".to_string()]);
    }

    #[test]
    fn test_validate_positional_against_prepared_count() {
        // jsonb `?` operator: the prepared statement reports one parameter
        let one = BindingSet::single([SqlValue::Int32(1)]);
        assert!(validate_positional(1, &one).is_ok());

        let two = BindingSet::single([SqlValue::Int32(1), SqlValue::Int32(2)]);
        assert!(matches!(
            validate_positional(1, &two),
            Err(DbResultError::MalformedBindingSet(_))
        ));
        assert!(validate_positional(0, &one).is_err());

        let named = BindingSet::builder().named("a", [1]).build().unwrap();
        assert!(validate_positional(1, &named).is_err());
    }

    #[test]
    fn test_check_positional_count() {
        let p = Placeholders::scan("SELECT * FROM t WHERE a = $1");
        assert!(p.check(&BindingSet::single([SqlValue::Int32(1)])).is_ok());

        let err = p
            .check(&BindingSet::single([SqlValue::Int32(1), SqlValue::Int32(2)]))
            .unwrap_err();
        assert!(matches!(err, DbResultError::MalformedBindingSet(_)));
    }

    #[test]
    fn test_check_named() {
        let p = Placeholders::scan("SELECT * FROM t WHERE a = :a AND b = :b");
        let ok = BindingSet::builder()
            .named("b", [1])
            .named("a", [2])
            .build()
            .unwrap();
        assert!(p.check(&ok).is_ok());

        let missing = BindingSet::builder().named("a", [1]).build().unwrap();
        assert!(p.check(&missing).is_err());

        let positional = BindingSet::single([SqlValue::Int32(1), SqlValue::Int32(2)]);
        assert!(p.check(&positional).is_err());
    }

    #[test]
    fn test_check_rejects_mixed_statement() {
        let p = Placeholders::scan("SELECT * FROM t WHERE a = ? AND b = :b");
        let set = BindingSet::single([SqlValue::Int32(1)]);
        assert!(matches!(
            p.check(&set),
            Err(DbResultError::MalformedBindingSet(_))
        ));
    }

    #[test]
    fn test_check_rejects_statement_without_placeholders() {
        let set = BindingSet::single([SqlValue::Int32(1)]);
        assert!(validate("SELECT 1", &set).is_err());
    }
}
