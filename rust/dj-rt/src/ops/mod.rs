//! The built-in leaf operation catalog and its dispatch.

pub mod extract;
pub mod filter;
pub mod transform;

use crate::env::RuntimeEnv;
use crate::RuntimeError;
use dj_core::literal::Literal;
use dj_core::values::Applied;

/// Applies one element-wise leaf operation to one entry. Emitters and the
/// whole-ilist `ilist_*` leaves are handled by the evaluator and never
/// reach this dispatch.
pub fn apply_leaf(
    env: &RuntimeEnv,
    name: &str,
    args: &[Literal],
    entry: &str,
) -> Result<Applied, RuntimeError> {
    let result = match name {
        // Transformers
        "lower" => transform::lower(entry),
        "upper" => transform::upper(entry),
        "capitalize" => transform::capitalize(entry),
        "title" => transform::title(entry),
        "reverse" => transform::reverse(entry),
        "remove" => transform::remove(entry, str_arg(name, args, 0)?),
        "remove_ws" => transform::remove_ws(entry),
        "fold_ws" => transform::fold_ws(entry),
        "strip" => transform::strip(entry, opt_str_arg(args, 0)),
        "split" => transform::split(entry, str_arg(name, args, 0)?),
        "map" => transform::map(entry, str_arg(name, args, 0)?, str_arg(name, args, 1)?),
        "replace" => {
            let table = env.replace_table(str_arg(name, args, 0)?)?;
            transform::replace(entry, table)
        }
        "append" => transform::append(entry, last_str_arg(name, args)?),
        "prepend" => transform::prepend(entry, last_str_arg(name, args)?),
        "deduplicate" => transform::deduplicate(entry),
        "rotate" => transform::rotate(entry),
        // Extractors
        "find_all" => extract::find_all(entry, env.regex(str_arg(name, args, 0)?)?),
        "get_no" => extract::get_no(entry),
        "get_sc" => extract::get_sc(entry),
        "segments" => extract::segments(entry),
        // Filters
        "min" | "max" => {
            let metric = word_arg(name, args, 0)?;
            let bound = int_arg(name, args, 1)?;
            let verdict = if name == "min" {
                filter::min(entry, metric, bound)
            } else {
                filter::max(entry, metric, bound)
            };
            verdict.ok_or_else(|| RuntimeError::BadArguments {
                op: name.to_string(),
                detail: format!("unknown metric '{}'", metric),
            })?
        }
        "has" => filter::has(entry, str_arg(name, args, 0)?),
        "matches" => filter::matches(entry, env.regex(str_arg(name, args, 0)?)?),
        "is_lower" => filter::is_lower(entry),
        "is_upper" => filter::is_upper(entry),
        "is_no" => filter::is_no(entry),
        "is_sc" => filter::is_sc(entry),
        "is_pattern" => filter::is_pattern(entry, opt_str_arg(args, 0)),
        // Anything else is an external leaf.
        _ => match env.plugins.get(name) {
            Some(plugin) => plugin.apply(entry, args, &env.config),
            None => {
                return Err(RuntimeError::UnknownOperation {
                    name: name.to_string(),
                })
            }
        },
    };
    Ok(result)
}

fn str_arg<'a>(op: &str, args: &'a [Literal], idx: usize) -> Result<&'a str, RuntimeError> {
    args.get(idx)
        .and_then(|a| a.as_str())
        .ok_or_else(|| RuntimeError::BadArguments {
            op: op.to_string(),
            detail: format!("expected a string at position {}", idx + 1),
        })
}

fn opt_str_arg<'a>(args: &'a [Literal], idx: usize) -> Option<&'a str> {
    args.get(idx).and_then(|a| a.as_str())
}

/// For `append`/`prepend`, which may carry a leading `each` word.
fn last_str_arg<'a>(op: &str, args: &'a [Literal]) -> Result<&'a str, RuntimeError> {
    args.last()
        .and_then(|a| a.as_str())
        .ok_or_else(|| RuntimeError::BadArguments {
            op: op.to_string(),
            detail: "expected a quoted string".to_string(),
        })
}

fn word_arg<'a>(op: &str, args: &'a [Literal], idx: usize) -> Result<&'a str, RuntimeError> {
    args.get(idx)
        .and_then(|a| a.as_word())
        .ok_or_else(|| RuntimeError::BadArguments {
            op: op.to_string(),
            detail: format!("expected a bare word at position {}", idx + 1),
        })
}

fn int_arg(op: &str, args: &[Literal], idx: usize) -> Result<usize, RuntimeError> {
    args.get(idx)
        .and_then(|a| a.as_int())
        .filter(|n| *n >= 0)
        .map(|n| n as usize)
        .ok_or_else(|| RuntimeError::BadArguments {
            op: op.to_string(),
            detail: format!("expected a non-negative integer at position {}", idx + 1),
        })
}
