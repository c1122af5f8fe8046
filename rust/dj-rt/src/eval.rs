//! The two-level evaluator: entries flow through operations, each
//! operation turns one entry into an intermediate list, and the next
//! operation consumes that list element-wise.

use crate::env::RuntimeEnv;
use crate::lists::NamedList;
use crate::ops;
use crate::output::Target;
use crate::RuntimeError;
use dj_compiler::compiler::ast::{Chain, Modifier, Op, OpKind, Statement};
use dj_core::values::Applied;
use std::collections::HashMap;

/// Evaluation state for one input entry: the per-entry named lists, the
/// accumulated classification tag, the restart stack, and the emission
/// buffer that is flushed atomically when the entry completes.
pub struct EntryRun<'e> {
    env: &'e RuntimeEnv,
    scope: HashMap<String, NamedList>,
    tags: String,
    restart_stack: Vec<String>,
    emissions: Vec<(Target, String)>,
}

impl<'e> EntryRun<'e> {
    pub fn new(env: &'e RuntimeEnv) -> Self {
        let scope = env
            .declared
            .iter()
            .map(|(name, kind)| (name.clone(), NamedList::new(*kind)))
            .collect();
        Self {
            env,
            scope,
            tags: String::new(),
            restart_stack: Vec::new(),
            emissions: Vec::new(),
        }
    }

    /// Clears all per-entry state so the run can serve the next entry.
    pub fn reset(&mut self) {
        for list in self.scope.values_mut() {
            list.clear();
        }
        self.tags.clear();
        self.restart_stack.clear();
        self.emissions.clear();
    }

    /// Drives one entry through the whole script. Plain statements run
    /// first in textual order; `use` statements follow, after the chains
    /// that populate their sources.
    pub fn evaluate(&mut self, entry: &str) -> Result<(), RuntimeError> {
        let env = self.env;
        for stmt in env.script.body.iter().filter(|s| s.uses.is_empty()) {
            self.eval_statement(stmt, vec![entry.to_string()])?;
        }
        for stmt in env.script.body.iter().filter(|s| !s.uses.is_empty()) {
            let mut input = Vec::new();
            for name in &stmt.uses {
                if let Some(list) = self.scope.get(name) {
                    input.extend(list.items().iter().cloned());
                } else if let Some(global) = env.globals.get(name) {
                    input.extend(global.items().iter().cloned());
                }
            }
            self.eval_statement(stmt, input)?;
        }
        Ok(())
    }

    fn eval_statement(&mut self, stmt: &Statement, input: Vec<String>) -> Result<(), RuntimeError> {
        let result = self.eval_chain(&stmt.chain, input)?;
        log::debug!(
            "chain at line {} finished {}",
            stmt.span.line,
            match &result {
                Applied::NotApplicable => "not applicable".to_string(),
                Applied::Entries(es) => format!("with {} entries", es.len()),
            }
        );
        Ok(())
    }

    /// Takes the buffered emissions for flushing.
    pub fn take_emissions(&mut self) -> Vec<(Target, String)> {
        std::mem::take(&mut self.emissions)
    }

    /// Evaluates a chain on an input ilist. The chain ends early with an
    /// empty result once the ilist drains, and with N/A once every element
    /// of some step returned N/A.
    pub fn eval_chain(&mut self, chain: &Chain, input: Vec<String>) -> Result<Applied, RuntimeError> {
        let mut current = input;
        for op in &chain.ops {
            if current.is_empty() {
                return Ok(Applied::Entries(Vec::new()));
            }
            match self.apply_op(op, current)? {
                Applied::NotApplicable => return Ok(Applied::NotApplicable),
                Applied::Entries(es) => current = es,
            }
        }
        Ok(Applied::Entries(current))
    }

    /// Applies one operation to the current ilist. The `ilist_*` family
    /// and the emitters see the whole list; everything else is applied
    /// element-wise under the modifier rules.
    fn apply_op(&mut self, op: &Op, current: Vec<String>) -> Result<Applied, RuntimeError> {
        if let OpKind::Leaf { name, args, .. } = &op.kind {
            match name.as_str() {
                "report" => {
                    for e in &current {
                        self.emissions.push((Target::Stdout, e.clone()));
                    }
                    return Ok(Applied::Entries(current));
                }
                "write" => {
                    let path = args.first().and_then(|a| a.as_str()).unwrap_or_default();
                    for e in &current {
                        self.emissions
                            .push((Target::File(path.into()), e.clone()));
                    }
                    return Ok(Applied::Entries(current));
                }
                "classify" => {
                    if let Some(tag) = args.first().and_then(|a| a.as_str()) {
                        self.tags.push_str(tag);
                    }
                    return Ok(Applied::Entries(current));
                }
                "result" => {
                    for e in &current {
                        self.emissions
                            .push((Target::Stdout, format!("{}{}", self.tags, e)));
                    }
                    return Ok(Applied::Entries(current));
                }
                "ilist_concat" => {
                    let sep = args.first().and_then(|a| a.as_str()).unwrap_or("");
                    return Ok(Applied::from_entries([current.join(sep)]));
                }
                "ilist_unique" => {
                    let mut seen = std::collections::HashSet::new();
                    let out: Vec<String> = current
                        .into_iter()
                        .filter(|e| seen.insert(e.clone()))
                        .collect();
                    return Ok(Applied::Entries(out));
                }
                "ilist_max" => {
                    let strict = args.iter().any(|a| a.as_word() == Some("<"));
                    let bound = args
                        .last()
                        .and_then(|a| a.as_int())
                        .unwrap_or_default() as usize;
                    let longest = current.iter().map(|e| e.chars().count()).max().unwrap_or(0);
                    let pass = if strict { longest < bound } else { longest <= bound };
                    let base = if pass {
                        Applied::Entries(current.clone())
                    } else {
                        Applied::NotApplicable
                    };
                    return Ok(self.soften(op.modifier, base, current));
                }
                _ => {}
            }
        }
        match &op.kind {
            OpKind::IlistIfAll {
                chain,
                na_passes,
                empty_passes,
            } => {
                let verdict = self.quantify(chain, &current, *na_passes, *empty_passes, true)?;
                let base = if verdict {
                    Applied::Entries(current.clone())
                } else {
                    Applied::NotApplicable
                };
                Ok(self.soften(op.modifier, base, current))
            }
            OpKind::IlistIfAny {
                chain,
                na_passes,
                empty_passes,
            } => {
                let verdict = self.quantify(chain, &current, *na_passes, *empty_passes, false)?;
                let base = if verdict {
                    Applied::Entries(current.clone())
                } else {
                    Applied::NotApplicable
                };
                Ok(self.soften(op.modifier, base, current))
            }
            OpKind::IlistForeach { chain } => {
                let mut out = Vec::new();
                let mut all_na = true;
                for x in &current {
                    match self.eval_chain(chain, vec![x.clone()])? {
                        Applied::NotApplicable => {}
                        Applied::Entries(es) => {
                            all_na = false;
                            out.extend(es);
                        }
                    }
                }
                if all_na {
                    Ok(Applied::NotApplicable)
                } else {
                    Ok(Applied::Entries(out))
                }
            }
            OpKind::IlistRatio {
                joined,
                bound,
                numerator,
                denominator,
            } => {
                let ra = self.eval_chain(numerator, current.clone())?;
                let rb = self.eval_chain(denominator, current.clone())?;
                let base = ratio_result(*joined, *bound, &ra, &rb);
                Ok(self.soften(op.modifier, base, current))
            }
            _ => self.apply_elementwise(op, current),
        }
    }

    /// `~` on a filter-like whole-ilist test: pass the input through when
    /// the test came up N/A or empty.
    fn soften(&self, modifier: Option<Modifier>, base: Applied, input: Vec<String>) -> Applied {
        match modifier {
            Some(Modifier::PassThrough) if base.is_na() || base.is_empty() => {
                Applied::Entries(input)
            }
            _ => base,
        }
    }

    fn quantify(
        &mut self,
        chain: &Chain,
        current: &[String],
        na_passes: bool,
        empty_passes: bool,
        require_all: bool,
    ) -> Result<bool, RuntimeError> {
        let mut all = true;
        let mut any = false;
        for x in current {
            let truth = match self.eval_chain(chain, vec![x.clone()])? {
                Applied::NotApplicable => na_passes,
                Applied::Entries(es) if es.is_empty() => empty_passes,
                Applied::Entries(_) => true,
            };
            all &= truth;
            any |= truth;
            if require_all && !all {
                return Ok(false);
            }
            if !require_all && any {
                return Ok(true);
            }
        }
        Ok(if require_all { all } else { any })
    }

    fn apply_elementwise(&mut self, op: &Op, current: Vec<String>) -> Result<Applied, RuntimeError> {
        match op.modifier {
            None => {
                let mut out = Vec::new();
                let mut all_na = true;
                for x in &current {
                    match self.apply_base(&op.kind, x)? {
                        Applied::NotApplicable => {}
                        Applied::Entries(es) => {
                            all_na = false;
                            out.extend(es);
                        }
                    }
                }
                if all_na {
                    Ok(Applied::NotApplicable)
                } else {
                    Ok(Applied::Entries(out))
                }
            }
            // `+`: all the originals first, then everything produced.
            Some(Modifier::KeepOriginal) => {
                let mut produced = Vec::new();
                for x in &current {
                    if let Applied::Entries(es) = self.apply_base(&op.kind, x)? {
                        produced.extend(es);
                    }
                }
                let mut out = current;
                out.extend(produced);
                Ok(Applied::Entries(out))
            }
            // `*`: each element replaced in place by its results; the
            // original survives only where the operation did not apply.
            Some(Modifier::ReplaceOnApply) => {
                let mut out = Vec::new();
                for x in current {
                    match self.apply_base(&op.kind, &x)? {
                        Applied::NotApplicable => out.push(x),
                        Applied::Entries(es) => out.extend(es),
                    }
                }
                Ok(Applied::Entries(out))
            }
            // `!`: keep the elements the filter rejected.
            Some(Modifier::Negate) => {
                let mut out = Vec::new();
                for x in current {
                    if self.apply_base(&op.kind, &x)?.is_na() {
                        out.push(x);
                    }
                }
                if out.is_empty() {
                    Ok(Applied::NotApplicable)
                } else {
                    Ok(Applied::Entries(out))
                }
            }
            // `~`: pass elements through where the result was N/A or empty.
            Some(Modifier::PassThrough) => {
                let mut out = Vec::new();
                for x in current {
                    match self.apply_base(&op.kind, &x)? {
                        Applied::NotApplicable => out.push(x),
                        Applied::Entries(es) if es.is_empty() => out.push(x),
                        Applied::Entries(es) => out.extend(es),
                    }
                }
                Ok(Applied::Entries(out))
            }
        }
    }

    /// Applies one element-wise operation to one entry.
    fn apply_base(&mut self, kind: &OpKind, x: &str) -> Result<Applied, RuntimeError> {
        match kind {
            OpKind::Leaf { name, args, .. } => ops::apply_leaf(self.env, name, args, x),
            OpKind::Block { body, sink } => {
                let result = self.eval_chain(body, vec![x.to_string()])?;
                let Some(sink) = sink else {
                    return Ok(result);
                };
                if sink.mode.stores_original() {
                    if result.is_productive() {
                        if let Some(list) = self.scope.get_mut(&sink.target) {
                            list.push(x.to_string());
                        }
                    }
                } else if let Applied::Entries(es) = &result {
                    if let Some(list) = self.scope.get_mut(&sink.target) {
                        list.extend(es.iter().cloned());
                    }
                }
                if sink.mode.flows_downstream() {
                    Ok(result)
                } else {
                    Ok(Applied::NotApplicable)
                }
            }
            OpKind::Or { branches } => {
                for branch in branches {
                    let result = self.eval_chain(branch, vec![x.to_string()])?;
                    if result.is_productive() {
                        return Ok(result);
                    }
                }
                Ok(Applied::NotApplicable)
            }
            OpKind::Restart { bound, gate, body } => {
                self.restart_stack.push(x.to_string());
                let result = self.run_restart(*bound, gate, body, x);
                self.restart_stack.pop();
                result
            }
            OpKind::MacroCall { name } => Err(RuntimeError::UnknownOperation {
                name: format!("do {}", name),
            }),
            // Whole-ilist operations are intercepted in apply_op; reaching
            // one here means a single-element context, which is identical.
            other => {
                let op = Op {
                    modifier: None,
                    kind: other.clone(),
                    span: dj_compiler::compiler::tokens::Span::dummy(),
                };
                self.apply_op(&op, vec![x.to_string()])
            }
        }
    }

    /// The gate filter is tested before every body run; `bound` limits the
    /// number of re-entries after the first run.
    fn run_restart(
        &mut self,
        bound: usize,
        gate: &Chain,
        body: &Chain,
        x: &str,
    ) -> Result<Applied, RuntimeError> {
        let mut current = vec![x.to_string()];
        let mut runs = 0usize;
        loop {
            let gate_result = self.eval_chain(gate, current.clone())?;
            if !gate_result.is_productive() {
                break;
            }
            if runs > bound {
                return Err(RuntimeError::RestartBoundExceeded { bound });
            }
            match self.eval_chain(body, current)? {
                Applied::Entries(es) if !es.is_empty() => {
                    current = es;
                    runs += 1;
                }
                other => return Ok(other),
            }
        }
        Ok(Applied::Entries(current))
    }
}

fn ratio_result(joined: bool, bound: f64, ra: &Applied, rb: &Applied) -> Applied {
    // N/A from either chain counts as test failure.
    let (Applied::Entries(a), Applied::Entries(b)) = (ra, rb) else {
        return Applied::NotApplicable;
    };
    let measure = |es: &[String]| -> usize {
        if joined {
            es.iter().map(|e| e.chars().count()).sum()
        } else {
            es.len()
        }
    };
    let (ma, mb) = (measure(a), measure(b));
    if mb == 0 {
        return Applied::NotApplicable;
    }
    if (ma as f64) / (mb as f64) < bound {
        Applied::Entries(b.clone())
    } else {
        Applied::NotApplicable
    }
}
