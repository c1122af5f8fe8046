//! End-to-end evaluator coverage: the two-level pipeline semantics,
//! modifiers, blocks and sinks, named lists, combinators, restart,
//! classification, and the driver boundary cases.

use dj_compiler::compile_source;
use dj_core::ops::PluginRegistry;
use dj_rt::driver::{self, DriverOptions};
use dj_rt::env::RuntimeEnv;
use dj_rt::output::{OutputHub, Target};
use dj_rt::RuntimeError;
use std::io::Cursor;
use std::io::Write;
use std::path::PathBuf;

fn build_env(script: &str) -> RuntimeEnv {
    let plugins = PluginRegistry::new();
    let resolved =
        compile_source(script, &plugins).unwrap_or_else(|e| panic!("compile failed: {}", e));
    RuntimeEnv::build(resolved, plugins).unwrap_or_else(|e| panic!("env build failed: {}", e))
}

fn run_hub(script: &str, inputs: &[&str], unique: bool) -> OutputHub {
    let env = build_env(script);
    let hub = OutputHub::in_memory(unique);
    let input = Cursor::new(inputs.join("\n"));
    driver::process(&env, &hub, input, &DriverOptions::default())
        .unwrap_or_else(|e| panic!("run failed: {}", e));
    hub
}

/// Runs the script over the inputs and returns the stdout lines.
fn run(script: &str, inputs: &[&str]) -> Vec<String> {
    run_hub(script, inputs, false).captured(&Target::Stdout)
}

// ── The concrete end-to-end scenarios ──

#[test]
fn test_split_and_report() {
    assert_eq!(run("split \" \" report", &["A Test"]), ["A", "Test"]);
}

#[test]
fn test_na_drops_the_entry() {
    // The first entry is unchanged by remove_ws, so the chain ends N/A
    // for it and only the second entry is emitted.
    assert_eq!(run("remove_ws report", &["abc", "a b c"]), ["abc"]);
}

#[test]
fn test_mangling_pipeline_order() {
    let out = run(
        "+split \" \" +remove_ws +map \" \" \"-_\" +lower report",
        &["Audi RS"],
    );
    assert_eq!(
        out,
        [
            "Audi RS", "Audi", "RS", "AudiRS", "Audi-RS", "Audi_RS", "audi rs", "audi", "rs",
            "audirs", "audi-rs", "audi_rs"
        ]
    );
}

#[test]
fn test_classify_and_result() {
    let script = "find_all \"^[0-9]+$\" classify \"number, \" result";
    assert_eq!(run(script, &["2024"]), ["number, 2024"]);
    assert_eq!(run(script, &["abc"]), Vec::<String>::new());
}

#[test]
fn test_named_list_and_use() {
    let script = "list L\n\
                  { find_all \"[A-Z][a-z]+\" }> L\n\
                  use L prepend each \"$\" report\n";
    assert_eq!(run(script, &["AudiRSModel"]), ["$Audi", "$Model"]);
}

#[test]
fn test_restart_converges() {
    let out = run(
        "restart 1 ( min length 8 , deduplicate ) report",
        &["aaabbbccc"],
    );
    assert_eq!(out, ["abc"]);
}

// ── Modifiers ──

#[test]
fn test_star_replaces_on_apply() {
    assert_eq!(
        run("*map \" \" \"-_\" report", &["Audi RS"]),
        ["Audi-RS", "Audi_RS"]
    );
    // Original survives only where the operation did not apply.
    assert_eq!(run("*lower report", &["abc"]), ["abc"]);
}

#[test]
fn test_negate_filter() {
    assert_eq!(run("!min length 5 report", &["abc", "abcdef"]), ["abc"]);
}

#[test]
fn test_passthrough_filter() {
    // `~` lets the rejected entry flow on unchanged.
    assert_eq!(
        run("~min length 5 lower report", &["ABC", "ABCDEF"]),
        ["abc", "abcdef"]
    );
}

#[test]
fn test_plus_on_filter_chain_via_macro() {
    // `+do M` applies the modifier to the whole expanded chain.
    let script = "def VARIANTS reverse\n+do VARIANTS report\n";
    assert_eq!(run(script, &["ab"]), ["ab", "ba"]);
}

#[test]
fn test_macro_is_substitutable_for_its_body() {
    let spliced = run("def M lower remove \"-\"\ndo M report\n", &["A-B"]);
    let literal = run("lower remove \"-\" report", &["A-B"]);
    assert_eq!(spliced, literal);
}

// ── Blocks and sinks ──

#[test]
fn test_sink_append_stops_flow() {
    // `> L` emits into the list instead of feeding the next operation.
    let script = "list L\n{ lower }> L report\n";
    assert_eq!(run(script, &["ABC"]), Vec::<String>::new());
}

#[test]
fn test_sink_tee_flows_downstream() {
    let script = "list L\n{ lower }/> L report\n";
    assert_eq!(run(script, &["ABC"]), ["abc"]);
}

#[test]
fn test_sink_original_collects_survivors() {
    let script = "list L\n\
                  { min length 3 }[]> L\n\
                  use L report\n";
    assert_eq!(run(script, &["ab"]), Vec::<String>::new());
    assert_eq!(run(script, &["abcd"]), ["abcd"]);
}

#[test]
fn test_sink_original_unchanged_on_na() {
    // A rejected block must not touch the list.
    let script = "list L\n\
                  { find_all \"[0-9]+\" }[]> L\n\
                  use L classify \"has digits, \" result\n";
    assert_eq!(run(script, &["abc"]), Vec::<String>::new());
    assert_eq!(run(script, &["ab1c"]), ["has digits, ab1c"]);
}

#[test]
fn test_named_lists_reset_between_entries() {
    let script = "list L\n{ lower }/> L\nuse L report\n";
    // If L leaked across entries the second entry would emit "a" again.
    assert_eq!(run(script, &["A", "B"]), ["a", "b"]);
}

#[test]
fn test_set_collapses_duplicates() {
    let script = "set S\n+lower { split \" \" }> S\nuse S report\n";
    assert_eq!(run(script, &["x y X y"]), ["x", "y", "X"]);
}

#[test]
fn test_use_concatenates_in_reference_order() {
    let script = "list A\nlist B\n\
                  { find_all \"[a-z]+\" }> A\n\
                  { find_all \"[0-9]+\" }> B\n\
                  use B A report\n";
    assert_eq!(run(script, &["ab12cd"]), ["12", "ab", "cd"]);
}

// ── Combinators ──

#[test]
fn test_or_takes_first_productive_branch() {
    let script = "or( find_all \"[0-9]+\" , lower ) report";
    assert_eq!(run(script, &["AB12"]), ["12"]);
    assert_eq!(run(script, &["AB"]), ["ab"]);
    assert_eq!(run(script, &["ab"]), Vec::<String>::new());
}

#[test]
fn test_ilist_if_all_quantifier() {
    let script = "split \" \" ilist_if_all( min length 2 ) report";
    assert_eq!(run(script, &["ab cd"]), ["ab", "cd"]);
    assert_eq!(run(script, &["ab c"]), Vec::<String>::new());
}

#[test]
fn test_ilist_if_any_quantifier() {
    let script = "split \" \" ilist_if_any( min length 3 ) report";
    assert_eq!(run(script, &["ab cde"]), ["ab", "cde"]);
    assert_eq!(run(script, &["ab cd"]), Vec::<String>::new());
}

#[test]
fn test_quantifier_na_sentinel() {
    // `lower` is N/A on already-lowercase elements; the clause makes
    // that count as success.
    let script = "split \" \" ilist_if_all( N/A = True, lower ) report";
    assert_eq!(run(script, &["ab cd"]), ["ab", "cd"]);
}

#[test]
fn test_ilist_foreach_matches_inline_splice() {
    let spliced = run("split \" \" ilist_foreach( reverse ) report", &["ab cd"]);
    let inline = run("split \" \" reverse report", &["ab cd"]);
    assert_eq!(spliced, inline);
    assert_eq!(spliced, ["ba", "dc"]);
}

#[test]
fn test_ilist_concat() {
    assert_eq!(run("split \" \" ilist_concat \"-\" report", &["a b c"]), ["a-b-c"]);
    assert_eq!(run("split \" \" ilist_concat report", &["a b"]), ["ab"]);
}

#[test]
fn test_ilist_unique() {
    let script = "split \" \" ilist_unique report";
    assert_eq!(run(script, &["a b a c b"]), ["a", "b", "c"]);
}

#[test]
fn test_ilist_max_length() {
    let script = "split \" \" ilist_max length 3 report";
    assert_eq!(run(script, &["ab cde"]), ["ab", "cde"]);
    assert_eq!(run(script, &["ab cdef"]), Vec::<String>::new());

    let strict = "split \" \" ilist_max length < 3 report";
    assert_eq!(run(strict, &["ab cde"]), Vec::<String>::new());
}

#[test]
fn test_softened_ilist_max_passes_through() {
    let script = "split \" \" ~ilist_max length 3 ilist_concat \"+\" report";
    assert_eq!(run(script, &["ab cdef"]), ["ab+cdef"]);
}

#[test]
fn test_ilist_ratio_counts() {
    // One digit run against two letter runs: 1/2 < 0.6 passes and the
    // denominator's ilist flows on.
    let script = "ilist_ratio < 0.6 ( get_no , segments ) report";
    assert_eq!(run(script, &["ab12cd"]), ["ab", "cd"]);
    // 1/1 fails the strict test.
    assert_eq!(run(script, &["abc123"]), Vec::<String>::new());
}

#[test]
fn test_ilist_ratio_joined() {
    // Joined lengths: "12" (2 chars) vs "abcdefgh" (8 chars).
    let script = "ilist_ratio joined < 0.3 ( get_no , segments ) report";
    assert_eq!(run(script, &["abcd12efgh"]), ["abcd", "efgh"]);
}

#[test]
fn test_ilist_ratio_na_is_failure() {
    let script = "ilist_ratio < 0.5 ( get_no , segments ) report";
    // No digits at all: the numerator chain is N/A, the test fails.
    assert_eq!(run(script, &["abcdef"]), Vec::<String>::new());
}

#[test]
fn test_restart_zero_reentries_errors_when_gate_keeps_passing() {
    let env = build_env("restart 0 ( min length 1 , reverse ) report");
    let hub = OutputHub::in_memory(false);
    let err = driver::process(
        &env,
        &hub,
        Cursor::new("ab"),
        &DriverOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RuntimeError::RestartBoundExceeded { bound: 0 }));
}

#[test]
fn test_restart_gate_rejecting_passes_input_through() {
    let out = run("restart 1 ( min length 8 , deduplicate ) report", &["abc"]);
    assert_eq!(out, ["abc"]);
}

// ── Emission ──

#[test]
fn test_write_targets_file() {
    let hub = run_hub("write \"out.txt\" report", &["abc"], false);
    assert_eq!(hub.captured(&Target::File(PathBuf::from("out.txt"))), ["abc"]);
    assert_eq!(hub.captured(&Target::Stdout), ["abc"]);
}

#[test]
fn test_classification_accumulates() {
    let script = "classify \"short, \" max length 3 classify \"tiny, \" result";
    assert_eq!(run(script, &["ab"]), ["short, tiny, ab"]);
    assert_eq!(run(script, &["abcdef"]), Vec::<String>::new());
}

#[test]
fn test_global_unique_emissions() {
    let hub = run_hub("+lower report", &["ABC", "abc", "ABC"], true);
    assert_eq!(hub.captured(&Target::Stdout), ["ABC", "abc"]);
}

// ── Driver boundary cases ──

#[test]
fn test_empty_input_no_output() {
    assert_eq!(run("report", &[]), Vec::<String>::new());
}

#[test]
fn test_blank_lines_skipped() {
    assert_eq!(run("report", &["a", "", "b"]), ["a", "b"]);
}

#[test]
fn test_ignored_entries_never_reach_chains() {
    let dir = tempfile::tempdir().unwrap();
    let ignore_path = dir.path().join("skip.txt");
    let mut file = std::fs::File::create(&ignore_path).unwrap();
    writeln!(file, "secret").unwrap();
    drop(file);

    let script = format!("ignore \"{}\"\nreport\n", ignore_path.display());
    assert_eq!(run(&script, &["abc", "secret", "def"]), ["abc", "def"]);
}

#[test]
fn test_global_list_loads_through_filter() {
    let dir = tempfile::tempdir().unwrap();
    let words_path = dir.path().join("words.txt");
    let mut file = std::fs::File::create(&words_path).unwrap();
    writeln!(file, "Alpha\nbeta\nGamma\nGamma").unwrap();
    drop(file);

    let script = format!(
        "global_set NAMES \"{}\" ( matches \"^[A-Z]\" lower )\n\
         use NAMES report\n",
        words_path.display()
    );
    // The global is loaded once and re-read for every input entry.
    assert_eq!(run(&script, &["x"]), ["alpha", "gamma"]);
}

#[test]
fn test_replace_table() {
    let dir = tempfile::tempdir().unwrap();
    let table_path = dir.path().join("table.txt");
    let mut file = std::fs::File::create(&table_path).unwrap();
    writeln!(file, "# substitutions\nss \u{00df}").unwrap();
    drop(file);

    let script = format!("replace \"{}\" report\n", table_path.display());
    assert_eq!(run(&script, &["strasse"]), ["stra\u{00df}e"]);
}

#[test]
fn test_parallel_driver_emits_everything() {
    let env = build_env("+lower report");
    let hub = OutputHub::in_memory(false);
    let inputs: Vec<String> = (0..200).map(|i| format!("Word{}", i)).collect();
    let stats = driver::process(
        &env,
        &hub,
        Cursor::new(inputs.join("\n")),
        &DriverOptions {
            jobs: 4,
            ..DriverOptions::default()
        },
    )
    .unwrap();
    assert_eq!(stats.entries, 200);
    let mut lines = hub.captured(&Target::Stdout);
    assert_eq!(lines.len(), 400);
    // Entry emissions stay contiguous: each original directly precedes
    // its lowercased variant.
    for pair in lines.chunks(2) {
        assert_eq!(pair[0].to_lowercase(), pair[1]);
    }
    lines.sort();
    lines.dedup();
    assert_eq!(lines.len(), 400);
}

#[test]
fn test_external_leaf_runs_through_the_pipeline() {
    use dj_core::config::ConfigTable;
    use dj_core::literal::Literal;
    use dj_core::ops::{LeafOp, OpClass};
    use dj_core::values::Applied;
    use std::sync::Arc;

    struct Deleetify;
    impl LeafOp for Deleetify {
        fn class(&self) -> OpClass {
            OpClass::Transformer
        }
        fn apply(&self, entry: &str, _args: &[Literal], _config: &ConfigTable) -> Applied {
            let out: String = entry
                .chars()
                .map(|c| match c {
                    '3' => 'e',
                    '0' => 'o',
                    '1' => 'i',
                    other => other,
                })
                .collect();
            Applied::changed(entry, out)
        }
    }

    let mut plugins = PluginRegistry::new();
    plugins.register("deleetify", Arc::new(Deleetify));
    let resolved = compile_source("+deleetify report", &plugins).unwrap();
    let env = RuntimeEnv::build(resolved, plugins).unwrap();
    let hub = OutputHub::in_memory(false);
    driver::process(
        &env,
        &hub,
        Cursor::new("l33t\nplain"),
        &DriverOptions::default(),
    )
    .unwrap();
    assert_eq!(hub.captured(&Target::Stdout), ["l33t", "leet", "plain"]);
}

#[test]
fn test_bad_regex_fails_at_env_build() {
    let plugins = PluginRegistry::new();
    let resolved = compile_source("find_all \"[\" report", &plugins).unwrap();
    let err = RuntimeEnv::build(resolved, plugins).unwrap_err();
    assert!(matches!(err, RuntimeError::BadRegex { .. }));
}
