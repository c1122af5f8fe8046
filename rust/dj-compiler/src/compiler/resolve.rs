//! Resolution pass: macro expansion, modifier legality, declaration
//! checks, and configuration binding.

use crate::compiler::ast::*;
use dj_core::config::ConfigTable;
use dj_core::literal::Literal;
use dj_core::ops::{self, OpClass, PluginRegistry};
use dj_core::values::ListKind;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ResolveError {
    #[error("list '{name}' used at line {line} was never declared")]
    UndeclaredList { name: String, line: usize },
    #[error("list '{name}' declared twice (line {line})")]
    DuplicateList { name: String, line: usize },
    #[error("macro '{name}' invoked at line {line} is not defined")]
    UndefinedMacro { name: String, line: usize },
    #[error("macro '{name}' expands into itself")]
    CyclicMacro { name: String },
    #[error("unknown operation '{name}' at line {line}")]
    UnknownOperation { name: String, line: usize },
    #[error("'{op}' at line {line} takes {usage}, got {got} argument(s)")]
    BadArity {
        op: String,
        usage: String,
        got: usize,
        line: usize,
    },
    #[error("bad argument for '{op}' at line {line}: {detail}")]
    BadArgument {
        op: String,
        detail: String,
        line: usize,
    },
    #[error("modifier '{modifier}' is not legal on {op} ({class}) at line {line}")]
    IllegalModifier {
        modifier: char,
        op: String,
        class: String,
        line: usize,
    },
    #[error("sink at line {line} targets global list '{name}'; globals are immutable")]
    SinkTargetGlobal { name: String, line: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error, Clone)]
pub enum ConfigError {
    #[error("config names unknown operation '{op}'")]
    UnknownOp { op: String },
    #[error("operation '{op}' has no parameter '{param}'")]
    UnknownParam { op: String, param: String },
}

/// A script with macros expanded and configuration bound, plus the
/// runtime-relevant declarations extracted from the header.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub script: Script,
    pub config: ConfigTable,
    /// Per-entry named lists, in declaration order.
    pub lists: Vec<(String, ListKind)>,
}

pub fn resolve(script: Script, plugins: &PluginRegistry) -> Result<Resolved, ResolveError> {
    let mut script = script;

    // Header inventory
    let mut lists: Vec<(String, ListKind)> = Vec::new();
    let mut globals: HashSet<String> = HashSet::new();
    let mut macros: HashMap<String, Chain> = HashMap::new();
    let mut config = ConfigTable::new();
    for directive in &script.directives {
        match directive {
            Directive::DeclareList { name, span } => {
                if lists.iter().any(|(n, _)| n == name) || globals.contains(name) {
                    return Err(ResolveError::DuplicateList {
                        name: name.clone(),
                        line: span.line,
                    });
                }
                lists.push((name.clone(), ListKind::List));
            }
            Directive::DeclareSet { name, span } => {
                if lists.iter().any(|(n, _)| n == name) || globals.contains(name) {
                    return Err(ResolveError::DuplicateList {
                        name: name.clone(),
                        line: span.line,
                    });
                }
                lists.push((name.clone(), ListKind::Set));
            }
            Directive::GlobalList { name, span, .. } | Directive::GlobalSet { name, span, .. } => {
                if lists.iter().any(|(n, _)| n == name) || !globals.insert(name.clone()) {
                    return Err(ResolveError::DuplicateList {
                        name: name.clone(),
                        line: span.line,
                    });
                }
            }
            Directive::Config {
                op, param, value, ..
            } => {
                check_config_key(op, param, plugins)?;
                config.insert(op, param, value.clone());
            }
            Directive::Def { name, body, .. } => {
                macros.insert(name.clone(), body.clone());
            }
            Directive::Ignore { .. } | Directive::Create { .. } => {}
        }
    }

    let cx = Context {
        plugins,
        config: &config,
        lists: &lists,
        globals: &globals,
        macros: &macros,
    };

    // Expand and validate every chain: global-list filters, then the body.
    let mut directives = std::mem::take(&mut script.directives);
    for directive in &mut directives {
        if let Directive::GlobalList { filter, .. } | Directive::GlobalSet { filter, .. } =
            directive
        {
            if let Some(chain) = filter.take() {
                *filter = Some(cx.prepare_chain(chain, &mut Vec::new())?);
            }
        }
    }
    script.directives = directives;

    let mut body = std::mem::take(&mut script.body);
    for stmt in &mut body {
        for name in &stmt.uses {
            if !cx.list_known(name) {
                return Err(ResolveError::UndeclaredList {
                    name: name.clone(),
                    line: stmt.span.line,
                });
            }
        }
        let chain = std::mem::replace(&mut stmt.chain, Chain::new(Vec::new()));
        stmt.chain = cx.prepare_chain(chain, &mut Vec::new())?;
        if !chain_emits(&stmt.chain) {
            log::warn!(
                "chain at line {} neither emits nor feeds a named list; it has no effect",
                stmt.span.line
            );
        }
    }
    script.body = body;

    Ok(Resolved {
        script,
        config,
        lists,
    })
}

fn check_config_key(
    op: &str,
    param: &str,
    plugins: &PluginRegistry,
) -> Result<(), ConfigError> {
    let params: Vec<&str> = if let Some(sig) = ops::builtin(op) {
        sig.params.to_vec()
    } else if let Some(plugin) = plugins.get(op) {
        plugin.params().to_vec()
    } else {
        return Err(ConfigError::UnknownOp { op: op.to_string() });
    };
    if params.contains(&param) {
        Ok(())
    } else {
        Err(ConfigError::UnknownParam {
            op: op.to_string(),
            param: param.to_string(),
        })
    }
}

struct Context<'a> {
    plugins: &'a PluginRegistry,
    config: &'a ConfigTable,
    lists: &'a [(String, ListKind)],
    globals: &'a HashSet<String>,
    macros: &'a HashMap<String, Chain>,
}

impl Context<'_> {
    fn list_known(&self, name: &str) -> bool {
        self.lists.iter().any(|(n, _)| n == name) || self.globals.contains(name)
    }

    fn leaf_class(&self, name: &str) -> Option<OpClass> {
        ops::builtin(name)
            .map(|s| s.class)
            .or_else(|| self.plugins.get(name).map(|p| p.class()))
    }

    /// Expands macros, validates every operation, and binds configuration
    /// into leaf instances. `stack` carries macro names being expanded for
    /// cycle rejection.
    fn prepare_chain(&self, chain: Chain, stack: &mut Vec<String>) -> Result<Chain, ResolveError> {
        let mut out = Vec::with_capacity(chain.ops.len());
        for op in chain.ops {
            match op.kind {
                OpKind::MacroCall { ref name } => {
                    if stack.iter().any(|n| n == name) {
                        return Err(ResolveError::CyclicMacro { name: name.clone() });
                    }
                    let body = self.macros.get(name).ok_or(ResolveError::UndefinedMacro {
                        name: name.clone(),
                        line: op.span.line,
                    })?;
                    stack.push(name.clone());
                    let expanded = self.prepare_chain(body.clone(), stack)?;
                    stack.pop();
                    match op.modifier {
                        // A bare invocation splices the body inline.
                        None => out.extend(expanded.ops),
                        // A modified invocation wraps the body so the
                        // modifier applies to the chain as a whole.
                        Some(modifier) => {
                            let kind = OpKind::Block {
                                body: expanded,
                                sink: None,
                            };
                            self.check_modifier(modifier, &kind, op.span.line)?;
                            out.push(Op {
                                modifier: Some(modifier),
                                kind,
                                span: op.span,
                            });
                        }
                    }
                }
                kind => {
                    let kind = self.prepare_op(kind, op.span.line, stack)?;
                    if let Some(modifier) = op.modifier {
                        self.check_modifier(modifier, &kind, op.span.line)?;
                    }
                    out.push(Op {
                        modifier: op.modifier,
                        kind,
                        span: op.span,
                    });
                }
            }
        }
        Ok(Chain::new(out))
    }

    fn prepare_op(
        &self,
        kind: OpKind,
        line: usize,
        stack: &mut Vec<String>,
    ) -> Result<OpKind, ResolveError> {
        match kind {
            OpKind::Leaf { name, args, .. } => {
                self.check_leaf(&name, &args, line)?;
                let config = self
                    .config
                    .for_op(&name)
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect();
                Ok(OpKind::Leaf { name, args, config })
            }
            OpKind::Block { body, sink } => {
                if let Some(sink) = &sink {
                    if self.globals.contains(&sink.target) {
                        return Err(ResolveError::SinkTargetGlobal {
                            name: sink.target.clone(),
                            line: sink.span.line,
                        });
                    }
                    if !self.list_known(&sink.target) {
                        return Err(ResolveError::UndeclaredList {
                            name: sink.target.clone(),
                            line: sink.span.line,
                        });
                    }
                }
                Ok(OpKind::Block {
                    body: self.prepare_chain(body, stack)?,
                    sink,
                })
            }
            OpKind::Or { branches } => {
                let branches = branches
                    .into_iter()
                    .map(|c| self.prepare_chain(c, stack))
                    .collect::<Result<_, _>>()?;
                Ok(OpKind::Or { branches })
            }
            OpKind::IlistIfAll {
                chain,
                na_passes,
                empty_passes,
            } => Ok(OpKind::IlistIfAll {
                chain: self.prepare_chain(chain, stack)?,
                na_passes,
                empty_passes,
            }),
            OpKind::IlistIfAny {
                chain,
                na_passes,
                empty_passes,
            } => Ok(OpKind::IlistIfAny {
                chain: self.prepare_chain(chain, stack)?,
                na_passes,
                empty_passes,
            }),
            OpKind::IlistForeach { chain } => Ok(OpKind::IlistForeach {
                chain: self.prepare_chain(chain, stack)?,
            }),
            OpKind::IlistRatio {
                joined,
                bound,
                numerator,
                denominator,
            } => Ok(OpKind::IlistRatio {
                joined,
                bound,
                numerator: self.prepare_chain(numerator, stack)?,
                denominator: self.prepare_chain(denominator, stack)?,
            }),
            OpKind::Restart { bound, gate, body } => Ok(OpKind::Restart {
                bound,
                gate: self.prepare_chain(gate, stack)?,
                body: self.prepare_chain(body, stack)?,
            }),
            OpKind::MacroCall { .. } => unreachable!("macro calls are expanded by the caller"),
        }
    }

    fn check_leaf(&self, name: &str, args: &[Literal], line: usize) -> Result<(), ResolveError> {
        let (arity, usage) = if let Some(sig) = ops::builtin(name) {
            (sig.arity, sig.usage.to_string())
        } else if let Some(plugin) = self.plugins.get(name) {
            (plugin.arity(), name.to_string())
        } else {
            return Err(ResolveError::UnknownOperation {
                name: name.to_string(),
                line,
            });
        };
        let (min, max) = (arity.0 as usize, arity.1 as usize);
        if args.len() < min || args.len() > max {
            return Err(ResolveError::BadArity {
                op: name.to_string(),
                usage,
                got: args.len(),
                line,
            });
        }
        let bad = |detail: &str| ResolveError::BadArgument {
            op: name.to_string(),
            detail: detail.to_string(),
            line,
        };
        match name {
            "min" | "max" => {
                let metric = args[0].as_word().ok_or_else(|| bad("expected a metric word"))?;
                if !matches!(
                    metric,
                    "length" | "lower" | "upper" | "digits" | "special" | "unique"
                ) {
                    return Err(bad(&format!("unknown metric '{}'", metric)));
                }
                if args[1].as_int().map_or(true, |n| n < 0) {
                    return Err(bad("the bound must be a non-negative integer"));
                }
            }
            "ilist_max" => {
                if args[0].as_word() != Some("length") {
                    return Err(bad("the only supported measure is 'length'"));
                }
                let bound = args.last().and_then(|a| a.as_int());
                if bound.map_or(true, |n| n < 0) {
                    return Err(bad("the bound must be a non-negative integer"));
                }
            }
            "is_pattern" => {
                if let Some(arg) = args.first() {
                    let classes = arg.as_str().ok_or_else(|| bad("expected a quoted class string"))?;
                    if classes.is_empty() || !classes.chars().all(|c| "luds".contains(c)) {
                        return Err(bad("classes must be drawn from 'l', 'u', 'd', 's'"));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn check_modifier(
        &self,
        modifier: Modifier,
        kind: &OpKind,
        line: usize,
    ) -> Result<(), ResolveError> {
        let legal = match modifier {
            Modifier::Negate => self.op_is_filterlike(kind),
            Modifier::PassThrough => {
                self.op_is_filterlike(kind)
                    || matches!(
                        kind,
                        OpKind::IlistIfAll { .. }
                            | OpKind::IlistIfAny { .. }
                            | OpKind::IlistRatio { .. }
                    )
                    || matches!(kind, OpKind::Leaf { name, .. } if name == "ilist_max")
            }
            Modifier::KeepOriginal | Modifier::ReplaceOnApply => match kind {
                OpKind::Leaf { name, .. } => matches!(
                    self.leaf_class(name),
                    Some(OpClass::Transformer) | Some(OpClass::Extractor)
                ),
                OpKind::Block { sink: None, body } => !self.chain_is_filterlike(body),
                OpKind::Or { branches } => {
                    !branches.iter().all(|c| self.chain_is_filterlike(c))
                }
                OpKind::Restart { .. } => true,
                _ => false,
            },
        };
        if legal {
            Ok(())
        } else {
            Err(ResolveError::IllegalModifier {
                modifier: modifier.symbol(),
                op: kind.describe(),
                class: self.op_class_name(kind),
                line,
            })
        }
    }

    fn op_is_filterlike(&self, kind: &OpKind) -> bool {
        match kind {
            OpKind::Leaf { name, .. } => self.leaf_class(name) == Some(OpClass::Filter),
            OpKind::Block { sink: None, body } => self.chain_is_filterlike(body),
            OpKind::Or { branches } => branches.iter().all(|c| self.chain_is_filterlike(c)),
            _ => false,
        }
    }

    fn chain_is_filterlike(&self, chain: &Chain) -> bool {
        !chain.ops.is_empty() && chain.ops.iter().all(|op| self.op_is_filterlike(&op.kind))
    }

    fn op_class_name(&self, kind: &OpKind) -> String {
        match kind {
            OpKind::Leaf { name, .. } => self
                .leaf_class(name)
                .map(|c| c.describe().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            other => other.describe(),
        }
    }
}

/// Whether a chain can ever produce observable output: an emitter leaf or
/// a sink anywhere inside it.
fn chain_emits(chain: &Chain) -> bool {
    chain.ops.iter().any(|op| match &op.kind {
        OpKind::Leaf { name, .. } => {
            matches!(ops::builtin(name), Some(sig) if sig.class == OpClass::Emitter)
        }
        OpKind::Block { body, sink } => sink.is_some() || chain_emits(body),
        OpKind::Or { branches } => branches.iter().any(chain_emits),
        OpKind::IlistIfAll { chain, .. }
        | OpKind::IlistIfAny { chain, .. }
        | OpKind::IlistForeach { chain } => chain_emits(chain),
        OpKind::IlistRatio {
            numerator,
            denominator,
            ..
        } => chain_emits(numerator) || chain_emits(denominator),
        OpKind::Restart { gate, body, .. } => chain_emits(gate) || chain_emits(body),
        OpKind::MacroCall { .. } => false,
    })
}
