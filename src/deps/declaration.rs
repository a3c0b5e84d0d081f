//! Fetch-and-pin declarations in CMake build files
//!
//! Recognizes statements of the form
//!
//! ```cmake
//! FetchContent_Declare(
//!   fmt
//!   GIT_REPOSITORY https://github.com/fmtlib/fmt.git
//!   GIT_TAG 0c9fce2ffefecfdce794e1859584e25877b7b592 # 11.0.2
//! )
//! ```
//!
//! and can rewrite the pinned commit of one of them in place. Pure text
//! processing; nothing here touches the network or a repository.

use crate::core::error::{RelError, RelResult};
use serde::Serialize;
use std::ops::Range;

const STATEMENT: &str = "fetchcontent_declare";
const URL_MARKER: &str = "GIT_REPOSITORY";
const COMMIT_MARKER: &str = "GIT_TAG";

/// One parsed declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchDeclarationRecord {
  pub name: String,
  pub repository_url: String,
  /// Commit hash or symbolic tag
  pub pinned_commit: String,
}

/// A declare statement joined into one line, plus the physical lines it spans
struct Statement {
  text: String,
  lines: Range<usize>,
  /// Byte column where the statement starts on its first line
  column: usize,
}

/// Extract every complete declaration in `text`, or just the one named
/// `filter`. Declarations lacking a URL or commit are skipped.
pub fn extract_declarations(text: &str, filter: Option<&str>) -> Vec<FetchDeclarationRecord> {
  statements(text)
    .iter()
    .filter_map(|statement| parse_statement(&statement.text))
    .filter(|record| filter.is_none_or(|name| record.name == name))
    .collect()
}

/// Replace the `GIT_TAG` value of the declaration named `name` with
/// `new_commit`, provided it currently reads `old_commit` exactly. Any
/// trailing comment on that line is dropped; `label` becomes the new one.
/// Every other line, including line endings, is left untouched.
pub fn rewrite_pinned_commit(
  contents: &str,
  name: &str,
  old_commit: &str,
  new_commit: &str,
  label: Option<&str>,
) -> RelResult<String> {
  let lines: Vec<&str> = contents.split_inclusive('\n').collect();
  let (index, value) = statements(contents)
    .into_iter()
    .filter(|statement| parse_statement(&statement.text).is_some_and(|record| record.name == name))
    .find_map(|statement| locate_pin(&lines, &statement, old_commit))
    .ok_or_else(|| RelError::DeclarationNotFound {
      name: name.to_string(),
      commit: old_commit.to_string(),
    })?;

  let (body, ending) = split_line_ending(lines[index]);
  let code = strip_inline_comment(body).trim_end();
  let mut line = String::with_capacity(code.len() + new_commit.len());
  line.push_str(&code[..value.start]);
  line.push_str(new_commit);
  line.push_str(&code[value.end..]);
  if let Some(label) = label {
    line.push_str(" # ");
    line.push_str(label);
  }
  line.push_str(ending);

  let mut out = String::with_capacity(contents.len() + new_commit.len());
  out.extend(lines[..index].iter().copied());
  out.push_str(&line);
  out.extend(lines[index + 1..].iter().copied());
  Ok(out)
}

/// Line index and byte range of the `GIT_TAG` value inside `statement`, if
/// that value is `commit` as a whole token
fn locate_pin(lines: &[&str], statement: &Statement, commit: &str) -> Option<(usize, Range<usize>)> {
  let mut tokens = statement.lines.clone().flat_map(|index| {
    let (body, _) = split_line_ending(lines[index]);
    let skip = if index == statement.lines.start { statement.column } else { 0 };
    let code = if is_comment_line(body) { "" } else { strip_inline_comment(body) };
    value_tokens(code, skip).into_iter().map(move |(range, token)| (index, range, token))
  });

  tokens.find(|(_, _, token)| *token == COMMIT_MARKER)?;
  let (index, range, token) = tokens.next()?;
  (token == commit).then_some((index, range))
}

/// Whitespace-separated tokens of `code` from byte `skip` on, with quotes,
/// parentheses and commas trimmed; ranges point at the trimmed text
fn value_tokens(code: &str, skip: usize) -> Vec<(Range<usize>, &str)> {
  let is_wrapper = |c: char| matches!(c, '"' | '\'' | '(' | ')' | ',');
  let mut found = Vec::new();
  let mut start = None;
  for (i, c) in code.char_indices().chain(std::iter::once((code.len(), ' '))) {
    if i < skip {
      continue;
    }
    match (c.is_whitespace(), start) {
      (false, None) => start = Some(i),
      (true, Some(from)) => {
        let raw = &code[from..i];
        let lead = raw.len() - raw.trim_start_matches(is_wrapper).len();
        let token = raw.trim_matches(is_wrapper);
        if !token.is_empty() && token != "\\" {
          found.push((from + lead..from + lead + token.len(), token));
        }
        start = None;
      }
      _ => {}
    }
  }
  found
}

/// Group physical lines into statements that start with the declare command
/// and run until parentheses balance and no continuation marker is pending.
fn statements(text: &str) -> Vec<Statement> {
  let mut found = Vec::new();
  let mut current: Option<(Statement, i32)> = None;

  for (index, line) in text.split_inclusive('\n').enumerate() {
    let (line, _) = split_line_ending(line);
    if is_comment_line(line) {
      continue;
    }
    let mut code = strip_inline_comment(line).trim_end();
    let continued = code.ends_with('\\');
    if continued {
      code = &code[..code.len() - 1];
    }

    let (mut statement, mut depth) = match current.take() {
      Some(open) => open,
      None => match find_statement_start(code) {
        Some(start) => {
          code = &code[start..];
          let statement = Statement {
            text: String::new(),
            lines: index..index,
            column: start,
          };
          (statement, 0)
        }
        None => continue,
      },
    };

    depth += paren_delta(code);
    statement.text.push_str(code);
    statement.text.push(' ');
    statement.lines.end = index + 1;

    if depth > 0 || continued {
      current = Some((statement, depth));
    } else {
      found.push(statement);
    }
  }

  // unterminated at end of file: still worth a look
  if let Some((statement, _)) = current {
    found.push(statement);
  }
  found
}

fn find_statement_start(code: &str) -> Option<usize> {
  let lowered = code.to_ascii_lowercase();
  let start = lowered.find(STATEMENT)?;
  let rest = lowered[start + STATEMENT.len()..].trim_start();
  if rest.is_empty() || rest.starts_with('(') {
    Some(start)
  } else {
    None
  }
}

fn parse_statement(statement: &str) -> Option<FetchDeclarationRecord> {
  let (_, body) = statement.split_once('(')?;
  let tokens: Vec<&str> = body
    .split_whitespace()
    .map(|t| t.trim_matches(|c| matches!(c, '"' | '\'' | '(' | ')' | ',')))
    .filter(|t| !t.is_empty())
    .collect();

  let name = tokens.first()?;
  let after = |marker: &str| {
    let at = tokens.iter().position(|t| *t == marker)?;
    tokens.get(at + 1).map(|t| t.to_string())
  };

  Some(FetchDeclarationRecord {
    name: name.to_string(),
    repository_url: after(URL_MARKER)?,
    pinned_commit: after(COMMIT_MARKER)?,
  })
}

fn is_comment_line(line: &str) -> bool {
  line.trim_start().starts_with('#')
}

/// Everything before the first `#` that is not inside double quotes
fn strip_inline_comment(line: &str) -> &str {
  let mut in_quotes = false;
  for (i, c) in line.char_indices() {
    match c {
      '"' => in_quotes = !in_quotes,
      '#' if !in_quotes => return &line[..i],
      _ => {}
    }
  }
  line
}

fn paren_delta(code: &str) -> i32 {
  let mut in_quotes = false;
  let mut delta = 0;
  for c in code.chars() {
    match c {
      '"' => in_quotes = !in_quotes,
      '(' if !in_quotes => delta += 1,
      ')' if !in_quotes => delta -= 1,
      _ => {}
    }
  }
  delta
}

fn split_line_ending(line: &str) -> (&str, &str) {
  if let Some(body) = line.strip_suffix("\r\n") {
    (body, "\r\n")
  } else if let Some(body) = line.strip_suffix('\n') {
    (body, "\n")
  } else {
    (line, "")
  }
}
