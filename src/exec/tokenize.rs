// src/exec/tokenize.rs

//! Shell-style word splitting for command lines.
//!
//! Only splitting and quote removal happen here. There is no globbing,
//! variable expansion, pipes or redirection: `echo $HOME | wc` yields the four
//! literal words `echo`, `$HOME`, `|`, `wc`.

use crate::errors::ExecError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split a command line into arguments.
///
/// - Space, tab and newline separate words; other Unicode spaces are
///   ordinary characters, as in a POSIX shell.
/// - `'...'` keeps everything literally.
/// - `"..."` groups text; `\"` and `\\` are unescaped inside.
/// - Outside quotes, `\x` yields `x`.
/// - `''` or `""` on its own produces an empty argument.
pub fn tokenize(line: &str) -> Result<Vec<String>, ExecError> {
    let mut args = Vec::new();
    let mut current = String::new();
    // Distinguishes "no word yet" from "an empty quoted word".
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match quote {
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                } else {
                    current.push(c);
                }
            }
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\')) => current.push(next),
                    Some(next) => {
                        current.push('\\');
                        current.push(next);
                    }
                    None => {
                        return Err(ExecError::InvalidCommandLine(
                            "unterminated double quote".to_string(),
                        ));
                    }
                },
                other => current.push(other),
            },
            Quote::None => match c {
                '\'' => {
                    quote = Quote::Single;
                    in_word = true;
                }
                '"' => {
                    quote = Quote::Double;
                    in_word = true;
                }
                '\\' => {
                    let next = chars.next().ok_or_else(|| {
                        ExecError::InvalidCommandLine("trailing backslash".to_string())
                    })?;
                    current.push(next);
                    in_word = true;
                }
                ' ' | '\t' | '\n' => {
                    if in_word {
                        args.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                other => {
                    current.push(other);
                    in_word = true;
                }
            },
        }
    }

    match quote {
        Quote::Single => Err(ExecError::InvalidCommandLine(
            "unterminated single quote".to_string(),
        )),
        Quote::Double => Err(ExecError::InvalidCommandLine(
            "unterminated double quote".to_string(),
        )),
        Quote::None => {
            if in_word {
                args.push(current);
            }
            Ok(args)
        }
    }
}

/// Quote a word so a POSIX shell reads it back unchanged.
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r#"'\''"#))
}
