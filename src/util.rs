//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values in a
/// single pass, so inserted values are never rescanned for placeholders.
/// Braces that do not name a provided key are left untouched.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let value = after
      .find('}')
      .and_then(|close| pairs.iter().find(|(k, _)| *k == &after[..close]).map(|(k, v)| (k.len(), *v)));
    match value {
      Some((key_len, v)) => {
        out.push_str(v);
        rest = &after[key_len + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Log-safe truncation for large strings, cut on a char boundary.
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  let count = s.chars().count();
  if count <= max_chars {
    s.to_string()
  } else {
    let head: String = s.chars().take(max_chars).collect();
    format!("{}… ({} chars total)", head, count)
  }
}
