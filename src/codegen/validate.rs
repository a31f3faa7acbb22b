//! Static checks on a candidate program, run before any execution.
//!
//! Two checks, cheapest first: a lexical scan for unterminated string
//! literals (the failure class models actually produce, reported with the
//! exact line and the column of the opening quote), then a structural check
//! for the designated entry point.

use thiserror::Error;

/// Name of the entry point every candidate must define at top level
pub const ENTRY_POINT: &str = "simulate";

/// Validation failure, cheapest class first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Unparseable source; line and column are 1-based and point at the
    /// opening quote of the offending literal
    #[error("SyntaxError `{message}` at line {line}, column {col}")]
    Syntax {
        line: usize,
        col: usize,
        message: String,
    },

    /// Parseable but missing the designated entry point
    #[error("StructuralError: {message}")]
    Structural { message: String },
}

impl From<ValidationError> for crate::error::SimforgeError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::Syntax { line, col, message } => {
                crate::error::SimforgeError::Syntax { line, col, message }
            }
            ValidationError::Structural { message } => {
                crate::error::SimforgeError::Structural(message)
            }
        }
    }
}

/// Validate a candidate program without executing it.
///
/// Syntax problems are reported before structural ones.
pub fn validate_structure(source: &str) -> Result<(), ValidationError> {
    scan_string_literals(source)?;

    if !has_entry_point(source) {
        return Err(ValidationError::Structural {
            message: format!(
                "no top-level `def {ENTRY_POINT}(...)` entry point found"
            ),
        });
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Normal,
    /// Inside a single- or double-quoted literal; position is the opener
    Single {
        quote: char,
        line: usize,
        col: usize,
    },
    /// Inside a triple-quoted literal; position is the opener
    Triple {
        quote: char,
        line: usize,
        col: usize,
    },
}

/// Lexical scan for unterminated string literals.
///
/// Understands comments, escape sequences, and triple-quoted strings. A
/// single-quoted literal still open at end of line (or a triple-quoted one
/// still open at end of file) is an error located at its opening quote.
fn scan_string_literals(source: &str) -> Result<(), ValidationError> {
    let chars: Vec<char> = source.chars().collect();
    let mut mode = Mode::Normal;
    let mut line = 1usize;
    let mut col = 1usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        let tripled = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
        let mut consumed = 1usize;

        match mode {
            Mode::Normal => match c {
                '#' => {
                    while i + consumed < chars.len() && chars[i + consumed] != '\n' {
                        consumed += 1;
                    }
                }
                '"' | '\'' => {
                    if tripled {
                        mode = Mode::Triple { quote: c, line, col };
                        consumed = 3;
                    } else {
                        mode = Mode::Single { quote: c, line, col };
                    }
                }
                _ => {}
            },
            Mode::Single {
                quote,
                line: open_line,
                col: open_col,
            } => {
                if c == '\n' {
                    return Err(ValidationError::Syntax {
                        line: open_line,
                        col: open_col,
                        message: "unterminated string literal".to_string(),
                    });
                } else if c == '\\' && i + 1 < chars.len() {
                    consumed = 2;
                } else if c == quote {
                    mode = Mode::Normal;
                }
            }
            Mode::Triple { quote, .. } => {
                if c == quote && tripled {
                    mode = Mode::Normal;
                    consumed = 3;
                }
            }
        }

        for k in 0..consumed {
            if chars[i + k] == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        i += consumed;
    }

    match mode {
        Mode::Normal => Ok(()),
        Mode::Single { line, col, .. } => Err(ValidationError::Syntax {
            line,
            col,
            message: "unterminated string literal".to_string(),
        }),
        Mode::Triple { line, col, .. } => Err(ValidationError::Syntax {
            line,
            col,
            message: "unterminated triple-quoted string".to_string(),
        }),
    }
}

/// True when the source defines the entry point at top level (no indent).
fn has_entry_point(source: &str) -> bool {
    source.lines().any(|l| {
        l.strip_prefix("def ")
            .and_then(|rest| rest.strip_prefix(ENTRY_POINT))
            .map(|rest| rest.trim_start().starts_with('('))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "def simulate(L=1.0, g=9.81):\n    return {\"period\": 2.0}\n";

    #[test]
    fn test_valid_candidate_passes() {
        assert!(validate_structure(VALID).is_ok());
    }

    #[test]
    fn test_missing_entry_point_is_structural() {
        let source = "def run(L=1.0):\n    return {\"period\": 2.0}\n";
        let err = validate_structure(source).unwrap_err();
        assert!(matches!(err, ValidationError::Structural { .. }));
        assert!(err.to_string().contains("simulate"));
    }

    #[test]
    fn test_indented_entry_point_does_not_count() {
        let source = "class Sim:\n    def simulate(self):\n        return {}\n";
        let err = validate_structure(source).unwrap_err();
        assert!(matches!(err, ValidationError::Structural { .. }));
    }

    #[test]
    fn test_dangling_quote_reports_exact_line() {
        // Unbalanced string literal on line 3
        let source = "def simulate(L=1.0):\n    x = 1\n    label = \"period\n    return {}\n";
        let err = validate_structure(source).unwrap_err();
        match err {
            ValidationError::Syntax { line, col, ref message } => {
                assert_eq!(line, 3);
                assert_eq!(col, 13);
                assert!(message.contains("unterminated"));
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_escaped_quote_inside_literal_is_fine() {
        let source = "def simulate():\n    return {\"note\": \"a \\\" b\"}\n";
        assert!(validate_structure(source).is_ok());
    }

    #[test]
    fn test_quote_in_comment_ignored() {
        let source = "def simulate():\n    # don't trip on this\n    return {}\n";
        assert!(validate_structure(source).is_ok());
    }

    #[test]
    fn test_triple_quoted_docstring_spans_lines() {
        let source =
            "def simulate():\n    \"\"\"Docstring\n    with \"quotes\" inside.\n    \"\"\"\n    return {}\n";
        assert!(validate_structure(source).is_ok());
    }

    #[test]
    fn test_unterminated_triple_quote_reported_at_opener() {
        let source = "def simulate():\n    \"\"\"never closed\n    return {}\n";
        let err = validate_structure(source).unwrap_err();
        match err {
            ValidationError::Syntax { line, col, ref message } => {
                assert_eq!(line, 2);
                assert_eq!(col, 5);
                assert!(message.contains("triple"));
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_syntax_reported_before_structure() {
        // Both problems present; the cheaper syntax failure wins
        let source = "def run():\n    x = \"oops\n";
        let err = validate_structure(source).unwrap_err();
        assert!(matches!(err, ValidationError::Syntax { .. }));
    }

    #[test]
    fn test_mixed_quote_styles() {
        let source = "def simulate():\n    a = 'single'\n    b = \"double\"\n    return {}\n";
        assert!(validate_structure(source).is_ok());
    }
}
