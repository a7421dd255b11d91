//! SQL comment stripping.
//!
//! Removes `-- line` and `/* block */` comments from a migration script so
//! that a delimiter keyword inside a comment can never be mistaken for a
//! batch boundary. The lexer is a six-state automaton driven by the
//! [`TRANSITIONS`] table below. String literals are not tracked: a `--`
//! inside quotes starts a comment.
//!
//! ```text
//! Normal ──'/'──▶ SlashSeen ──'*'──▶ InBlockComment ──'*'──▶ BlockStarSeen ──'/'──▶ Normal
//!    │
//!    └──'-'──▶ DashSeen ──'-'──▶ InLineComment ──'\n'──▶ Normal
//! ```

use crate::error::{SqlError, SqlResult};

/// Lexer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SlashSeen,
    InBlockComment,
    BlockStarSeen,
    DashSeen,
    InLineComment,
}

impl State {
    const fn index(self) -> usize {
        self as usize
    }
}

/// Input character class; every character not listed is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Slash,
    Dash,
    Star,
    Newline,
    Other,
}

impl Input {
    fn classify(c: char) -> Self {
        match c {
            '/' => Input::Slash,
            '-' => Input::Dash,
            '*' => Input::Star,
            '\n' => Input::Newline,
            _ => Input::Other,
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// What to write to the output when taking an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Write nothing.
    Discard,
    /// Write the current character.
    Emit,
    /// Write the `/` held back in `SlashSeen`, then the current character.
    EmitSlashThen,
    /// Write the `-` held back in `DashSeen`, then the current character.
    EmitDashThen,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    next: State,
    action: Action,
}

const fn edge(next: State, action: Action) -> Edge {
    Edge { next, action }
}

use Action::{Discard, Emit, EmitDashThen, EmitSlashThen};
use State::{BlockStarSeen, DashSeen, InBlockComment, InLineComment, Normal, SlashSeen};

/// Transition table indexed by `[state][input]`.
///
/// Columns are `/`, `-`, `*`, `\n`, other.
const TRANSITIONS: [[Edge; 5]; 6] = [
    // Normal
    [
        edge(SlashSeen, Discard),
        edge(DashSeen, Discard),
        edge(Normal, Emit),
        edge(Normal, Emit),
        edge(Normal, Emit),
    ],
    // SlashSeen
    [
        edge(Normal, EmitSlashThen),
        edge(Normal, EmitSlashThen),
        edge(InBlockComment, Discard),
        edge(Normal, EmitSlashThen),
        edge(Normal, EmitSlashThen),
    ],
    // InBlockComment
    [
        edge(InBlockComment, Discard),
        edge(InBlockComment, Discard),
        edge(BlockStarSeen, Discard),
        edge(InBlockComment, Discard),
        edge(InBlockComment, Discard),
    ],
    // BlockStarSeen
    [
        edge(Normal, Discard),
        edge(InBlockComment, Discard),
        edge(BlockStarSeen, Discard),
        edge(InBlockComment, Discard),
        edge(InBlockComment, Discard),
    ],
    // DashSeen
    [
        edge(Normal, EmitDashThen),
        edge(InLineComment, Discard),
        edge(Normal, EmitDashThen),
        edge(Normal, EmitDashThen),
        edge(Normal, EmitDashThen),
    ],
    // InLineComment
    [
        edge(InLineComment, Discard),
        edge(InLineComment, Discard),
        edge(InLineComment, Discard),
        edge(Normal, Emit),
        edge(InLineComment, Discard),
    ],
];

fn transition(state: State, c: char) -> Edge {
    TRANSITIONS[state.index()][Input::classify(c).index()]
}

/// Remove all SQL comments from `sql`.
///
/// Line comments are replaced by the newline that terminates them, so line
/// structure (and therefore delimiter detection) is preserved. Block
/// comments are removed entirely and do not nest: the first `*/` closes
/// the comment.
///
/// # Errors
/// Returns [`SqlError::MalformedComment`] when the input ends inside a
/// block comment.
///
/// # Examples
/// ```
/// use sm_sql::strip_comments;
/// assert_eq!(strip_comments("a/* gone */b -- also gone\n").unwrap(), "ab \n");
/// ```
pub fn strip_comments(sql: &str) -> SqlResult<String> {
    let mut out = String::with_capacity(sql.len());
    let mut state = Normal;
    let mut line = 1;
    let mut comment_line = 1;

    for c in sql.chars() {
        let Edge { next, action } = transition(state, c);
        match action {
            Discard => {}
            Emit => out.push(c),
            EmitSlashThen => {
                out.push('/');
                out.push(c);
            }
            EmitDashThen => {
                out.push('-');
                out.push(c);
            }
        }
        if state == SlashSeen && next == InBlockComment {
            comment_line = line;
        }
        if c == '\n' {
            line += 1;
        }
        state = next;
    }

    match state {
        InBlockComment | BlockStarSeen => {
            return Err(SqlError::MalformedComment { line: comment_line })
        }
        DashSeen => out.push('-'),
        SlashSeen => out.push('/'),
        Normal | InLineComment => {}
    }

    Ok(out)
}

#[cfg(test)]
#[path = "strip_test.rs"]
mod tests;
