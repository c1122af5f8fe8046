//! Runtime environment: everything that is read-only once input
//! processing starts.

use crate::eval::EntryRun;
use crate::lists::GlobalList;
use crate::RuntimeError;
use dj_compiler::compiler::ast::{Chain, Directive, OpKind, Script};
use dj_compiler::compiler::resolve::Resolved;
use dj_core::config::ConfigTable;
use dj_core::ops::PluginRegistry;
use dj_core::values::ListKind;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};

/// The immutable evaluation environment: the resolved script, global
/// configuration, the ignore set, loaded global lists, precompiled
/// regexes, and loaded replace tables.
#[derive(Debug)]
pub struct RuntimeEnv {
    pub script: Script,
    pub config: ConfigTable,
    /// Per-entry named lists to allocate for every input entry.
    pub declared: Vec<(String, ListKind)>,
    pub plugins: PluginRegistry,
    pub globals: HashMap<String, GlobalList>,
    ignore: HashSet<String>,
    regexes: HashMap<String, Regex>,
    replace_tables: HashMap<String, Vec<(String, String)>>,
}

impl RuntimeEnv {
    /// Builds the environment: compiles every regex the script mentions,
    /// loads replace tables and ignore files, then loads global lists,
    /// streaming each through its declared filter chain.
    pub fn build(resolved: Resolved, plugins: PluginRegistry) -> Result<Self, RuntimeError> {
        let Resolved {
            script,
            config,
            lists,
        } = resolved;

        let mut regexes = HashMap::new();
        let mut replace_tables = HashMap::new();
        let mut visit = |kind: &OpKind| -> Result<(), RuntimeError> {
            if let OpKind::Leaf { name, args, .. } = kind {
                match name.as_str() {
                    "find_all" | "matches" => {
                        if let Some(pattern) = args.first().and_then(|a| a.as_str()) {
                            if !regexes.contains_key(pattern) {
                                let re = Regex::new(pattern).map_err(|e| {
                                    RuntimeError::BadRegex {
                                        pattern: pattern.to_string(),
                                        message: e.to_string(),
                                    }
                                })?;
                                regexes.insert(pattern.to_string(), re);
                            }
                        }
                    }
                    "replace" => {
                        if let Some(path) = args.first().and_then(|a| a.as_str()) {
                            if !replace_tables.contains_key(path) {
                                replace_tables.insert(path.to_string(), load_table(path)?);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(())
        };
        for stmt in &script.body {
            visit_chain(&stmt.chain, &mut visit)?;
        }
        for directive in &script.directives {
            if let Directive::GlobalList {
                filter: Some(chain),
                ..
            }
            | Directive::GlobalSet {
                filter: Some(chain),
                ..
            } = directive
            {
                visit_chain(chain, &mut visit)?;
            }
        }

        let mut ignore = HashSet::new();
        for directive in &script.directives {
            if let Directive::Ignore { path, .. } = directive {
                let reader = BufReader::new(File::open(path)?);
                for line in reader.lines() {
                    let line = line?;
                    if !line.is_empty() {
                        ignore.insert(line);
                    }
                }
            }
        }

        let globals_spec: Vec<(String, String, Option<Chain>, ListKind)> = script
            .directives
            .iter()
            .filter_map(|d| match d {
                Directive::GlobalList {
                    name, path, filter, ..
                } => Some((name.clone(), path.clone(), filter.clone(), ListKind::List)),
                Directive::GlobalSet {
                    name, path, filter, ..
                } => Some((name.clone(), path.clone(), filter.clone(), ListKind::Set)),
                _ => None,
            })
            .collect();

        let mut env = RuntimeEnv {
            script,
            config,
            declared: lists,
            plugins,
            globals: HashMap::new(),
            ignore,
            regexes,
            replace_tables,
        };

        // Globals load in directive order; a later filter chain may read
        // an earlier global through `use`.
        for (name, path, filter, kind) in globals_spec {
            let reader = BufReader::new(File::open(&path)?);
            let mut entries = Vec::new();
            {
                let mut run = EntryRun::new(&env);
                for line in reader.lines() {
                    let line = line?;
                    if line.is_empty() {
                        continue;
                    }
                    match &filter {
                        None => entries.push(line),
                        Some(chain) => {
                            run.reset();
                            let result = run.eval_chain(chain, vec![line])?;
                            entries.extend(result.into_entries());
                        }
                    }
                }
            }
            log::debug!("loaded global '{}' with {} entries", name, entries.len());
            env.globals.insert(name, GlobalList::new(kind, entries));
        }

        Ok(env)
    }

    pub fn is_ignored(&self, entry: &str) -> bool {
        self.ignore.contains(entry)
    }

    pub fn regex(&self, pattern: &str) -> Result<&Regex, RuntimeError> {
        self.regexes
            .get(pattern)
            .ok_or_else(|| RuntimeError::BadRegex {
                pattern: pattern.to_string(),
                message: "pattern was not precompiled".to_string(),
            })
    }

    pub fn replace_table(&self, path: &str) -> Result<&[(String, String)], RuntimeError> {
        self.replace_tables
            .get(path)
            .map(|t| t.as_slice())
            .ok_or_else(|| RuntimeError::BadArguments {
                op: "replace".to_string(),
                detail: format!("table '{}' was not preloaded", path),
            })
    }
}

/// Two-column whitespace-separated mapping file. Blank lines and `#`
/// comments are skipped.
fn load_table(path: &str) -> Result<Vec<(String, String)>, RuntimeError> {
    let reader = BufReader::new(File::open(path)?);
    let mut table = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut cols = trimmed.split_whitespace();
        match (cols.next(), cols.next(), cols.next()) {
            (Some(from), Some(to), None) => table.push((from.to_string(), to.to_string())),
            _ => {
                return Err(RuntimeError::BadReplaceTable {
                    path: path.to_string(),
                    line: idx + 1,
                })
            }
        }
    }
    Ok(table)
}

/// Depth-first visit of every operation in a chain, including the chains
/// nested inside blocks and combinators.
pub fn visit_chain<E>(
    chain: &Chain,
    visit: &mut impl FnMut(&OpKind) -> Result<(), E>,
) -> Result<(), E> {
    for op in &chain.ops {
        visit(&op.kind)?;
        match &op.kind {
            OpKind::Block { body, .. } => visit_chain(body, visit)?,
            OpKind::Or { branches } => {
                for branch in branches {
                    visit_chain(branch, visit)?;
                }
            }
            OpKind::IlistIfAll { chain, .. }
            | OpKind::IlistIfAny { chain, .. }
            | OpKind::IlistForeach { chain } => visit_chain(chain, visit)?,
            OpKind::IlistRatio {
                numerator,
                denominator,
                ..
            } => {
                visit_chain(numerator, visit)?;
                visit_chain(denominator, visit)?;
            }
            OpKind::Restart { gate, body, .. } => {
                visit_chain(gate, visit)?;
                visit_chain(body, visit)?;
            }
            OpKind::Leaf { .. } | OpKind::MacroCall { .. } => {}
        }
    }
    Ok(())
}
