//! Parser for the block-structured `ungzip` directive.
//!
//! ```text
//! ungzip {
//!     path /api /static
//!     content_type text/ application/json
//!     max_size 1048576
//! }
//! ```
//!
//! Sub-directives sit one per line. `path` and `content_type` accept one or
//! more arguments and accumulate across repeated lines. `#` starts a
//! comment and double quotes group a token containing whitespace.

use crate::config::UngzipConfig;
use crate::error::ConfigError;

/// Name of the top-level directive.
pub const DIRECTIVE_NAME: &str = "ungzip";

/// Parses one or more `ungzip` directives into a single configuration.
///
/// Repeated directives are merged in order. The returned configuration has
/// not been validated yet; negative sizes are rejected by
/// [`UngzipConfig::into_policy`].
pub fn parse_directive(input: &str) -> Result<UngzipConfig, ConfigError> {
    let mut config = UngzipConfig::default();
    let mut open_block: Option<usize> = None;

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let tokens = tokenize(raw, line)?;
        let Some((first, args)) = tokens.split_first() else {
            continue;
        };

        if open_block.is_none() {
            if first.as_str() != DIRECTIVE_NAME {
                return Err(ConfigError::UnexpectedDirective {
                    line,
                    name: first.clone(),
                });
            }
            match args {
                [] => {}
                [brace] if brace.as_str() == "{" => open_block = Some(line),
                [open, close] if open.as_str() == "{" && close.as_str() == "}" => {}
                [other, ..] => {
                    return Err(ConfigError::UnknownSubdirective {
                        line,
                        name: other.clone(),
                    });
                }
            }
            continue;
        }

        if first.as_str() == "}" {
            if let Some(extra) = args.first() {
                return Err(ConfigError::UnexpectedDirective {
                    line,
                    name: extra.clone(),
                });
            }
            open_block = None;
            continue;
        }

        apply_subdirective(&mut config, first, args, line)?;
    }

    if let Some(line) = open_block {
        return Err(ConfigError::UnclosedBlock { line });
    }

    Ok(config)
}

fn apply_subdirective(
    config: &mut UngzipConfig,
    name: &str,
    args: &[String],
    line: usize,
) -> Result<(), ConfigError> {
    let missing = || ConfigError::MissingArgument {
        line,
        directive: name.to_string(),
    };

    match name {
        "path" => {
            if args.is_empty() {
                return Err(missing());
            }
            config.paths.extend(args.iter().cloned());
        }
        "content_type" => {
            if args.is_empty() {
                return Err(missing());
            }
            config.content_types.extend(args.iter().cloned());
        }
        "max_size" => {
            let value = match args {
                [] => return Err(missing()),
                [value] => value,
                [_, extra, ..] => {
                    return Err(ConfigError::UnexpectedArgument {
                        line,
                        directive: name.to_string(),
                        argument: extra.clone(),
                    });
                }
            };
            config.max_size = value
                .parse::<i64>()
                .map_err(|source| ConfigError::InvalidMaxSize {
                    line,
                    value: value.clone(),
                    source,
                })?;
        }
        _ => {
            return Err(ConfigError::UnknownSubdirective {
                line,
                name: name.to_string(),
            });
        }
    }

    Ok(())
}

/// Splits a line into whitespace-separated tokens, honoring quotes and comments.
fn tokenize(line: &str, line_no: usize) -> Result<Vec<String>, ConfigError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            break;
        }

        let mut token = String::new();
        if c == '"' {
            chars.next();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                token.push(c);
            }
            if !closed {
                return Err(ConfigError::UnterminatedQuote { line: line_no });
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }

    Ok(tokens)
}
