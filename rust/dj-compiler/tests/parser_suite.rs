//! Parser coverage: the directive grammar, chains, modifiers, blocks and
//! sinks, combinators, and error locations.

use dj_compiler::compiler::ast::*;
use dj_compiler::compiler::lexer::Lexer;
use dj_compiler::compiler::parser::{ParseError, Parser};

fn parse(src: &str) -> Script {
    let tokens = Lexer::new(src).tokenize().unwrap();
    Parser::new(tokens)
        .parse_script()
        .unwrap_or_else(|e| panic!("parse failed: {}", e))
}

fn parse_err(src: &str) -> ParseError {
    let tokens = Lexer::new(src).tokenize().unwrap();
    Parser::new(tokens).parse_script().unwrap_err()
}

fn only_chain(script: &Script) -> &Chain {
    assert_eq!(script.body.len(), 1);
    &script.body[0].chain
}

#[test]
fn test_parse_leaf_chain() {
    let script = parse("split \" \" report\n");
    let chain = only_chain(&script);
    assert_eq!(chain.ops.len(), 2);
    assert!(matches!(&chain.ops[0].kind, OpKind::Leaf { name, args, .. }
        if name == "split" && args.len() == 1));
    assert!(matches!(&chain.ops[1].kind, OpKind::Leaf { name, .. } if name == "report"));
}

#[test]
fn test_parse_modifiers() {
    let script = parse("+split \" \" *map \" \" \"-_\" !min length 3 ~is_lower report");
    let chain = only_chain(&script);
    assert_eq!(chain.ops[0].modifier, Some(Modifier::KeepOriginal));
    assert_eq!(chain.ops[1].modifier, Some(Modifier::ReplaceOnApply));
    assert_eq!(chain.ops[2].modifier, Some(Modifier::Negate));
    assert_eq!(chain.ops[3].modifier, Some(Modifier::PassThrough));
    assert_eq!(chain.ops[4].modifier, None);
}

#[test]
fn test_parse_directives() {
    let script = parse(
        "ignore \"skip.txt\"\n\
         create \"out.txt\"\n\
         list L\n\
         set S\n\
         config related K 10\n\
         def CLEAN lower remove \"-\"\n\
         lower report\n",
    );
    assert_eq!(script.directives.len(), 6);
    assert!(matches!(&script.directives[0], Directive::Ignore { path, .. } if path == "skip.txt"));
    assert!(matches!(&script.directives[2], Directive::DeclareList { name, .. } if name == "L"));
    assert!(matches!(&script.directives[3], Directive::DeclareSet { name, .. } if name == "S"));
    assert!(matches!(&script.directives[5], Directive::Def { name, body, .. }
        if name == "CLEAN" && body.ops.len() == 2));
}

#[test]
fn test_parse_global_list_with_filter() {
    let script = parse("global_list NAMES \"names.txt\" ( min length 3 lower )\nreport\n");
    assert!(matches!(&script.directives[0],
        Directive::GlobalList { name, path, filter: Some(chain), .. }
        if name == "NAMES" && path == "names.txt" && chain.ops.len() == 2));
}

#[test]
fn test_parse_config_list_value() {
    let script = parse("config is_regular_word DICTIONARIES [ \"en\", \"de\" ]\nreport\n");
    assert!(matches!(&script.directives[0],
        Directive::Config { op, param, value: dj_core::literal::Literal::List(items), .. }
        if op == "is_regular_word" && param == "DICTIONARIES" && items == &["en", "de"]));
}

#[test]
fn test_parse_block_sinks() {
    let script = parse(
        "list L\n\
         { find_all \"[A-Z]\" }> L\n\
         { lower }[]> L\n\
         { upper }/> L\n\
         { upper }/[]> L\n",
    );
    let modes: Vec<SinkMode> = script
        .body
        .iter()
        .map(|stmt| match &stmt.chain.ops[0].kind {
            OpKind::Block {
                sink: Some(sink), ..
            } => sink.mode,
            other => panic!("expected a sunk block, got {}", other.describe()),
        })
        .collect();
    assert_eq!(
        modes,
        [
            SinkMode::Append,
            SinkMode::OriginalOnly,
            SinkMode::Tee,
            SinkMode::OriginalTee
        ]
    );
}

#[test]
fn test_parse_bare_block_groups() {
    let script = parse("{ lower upper } report\n");
    let chain = only_chain(&script);
    assert!(matches!(&chain.ops[0].kind, OpKind::Block { sink: None, body }
        if body.ops.len() == 2));
}

#[test]
fn test_parse_use_statement() {
    let script = parse("list L\nlist M\nuse L M prepend each \"$\" report\n");
    let stmt = &script.body[0];
    assert_eq!(stmt.uses, ["L", "M"]);
    assert!(matches!(&stmt.chain.ops[0].kind, OpKind::Leaf { name, args, .. }
        if name == "prepend" && args.len() == 2));
}

#[test]
fn test_parse_or_combinator() {
    let script = parse("or( min length 5 report , lower report )\n");
    let chain = only_chain(&script);
    assert!(matches!(&chain.ops[0].kind, OpKind::Or { branches } if branches.len() == 2));
}

#[test]
fn test_parse_quantifier_clauses() {
    let script = parse("ilist_if_all( N/A = True, [] = False, min length 2 ) report\n");
    let chain = only_chain(&script);
    assert!(matches!(&chain.ops[0].kind,
        OpKind::IlistIfAll { na_passes: true, empty_passes: false, chain }
        if chain.ops.len() == 1));
}

#[test]
fn test_parse_quantifier_defaults() {
    let script = parse("ilist_if_any( lower ) report\n");
    let chain = only_chain(&script);
    assert!(matches!(
        &chain.ops[0].kind,
        OpKind::IlistIfAny {
            na_passes: false,
            empty_passes: false,
            ..
        }
    ));
}

#[test]
fn test_parse_restart_with_and_without_bound() {
    let script = parse("restart 3 ( min length 8 , deduplicate ) report\n");
    assert!(matches!(&only_chain(&script).ops[0].kind,
        OpKind::Restart { bound: 3, .. }));

    let script = parse("restart ( min length 8 , deduplicate ) report\n");
    assert!(matches!(&only_chain(&script).ops[0].kind,
        OpKind::Restart { bound: 1, .. }));
}

#[test]
fn test_parse_ratio() {
    let script = parse("ilist_ratio joined < 0.5 ( get_no , segments ) report\n");
    assert!(matches!(&only_chain(&script).ops[0].kind,
        OpKind::IlistRatio { joined: true, bound, .. } if *bound == 0.5));
}

#[test]
fn test_parse_ilist_max_variants() {
    let script = parse("ilist_max length 10 report\n");
    assert!(matches!(&only_chain(&script).ops[0].kind, OpKind::Leaf { name, args, .. }
        if name == "ilist_max" && args.len() == 2));

    let script = parse("ilist_max length < 10 report\n");
    assert!(matches!(&only_chain(&script).ops[0].kind, OpKind::Leaf { name, args, .. }
        if name == "ilist_max" && args.len() == 3));
}

#[test]
fn test_parse_do_macro() {
    let script = parse("def M lower\n+do M report\n");
    let chain = only_chain(&script);
    assert_eq!(chain.ops[0].modifier, Some(Modifier::KeepOriginal));
    assert!(matches!(&chain.ops[0].kind, OpKind::MacroCall { name } if name == "M"));
}

#[test]
fn test_parse_multiline_group() {
    let script = parse("or( min length 5 report ,\n    lower report )\n");
    assert!(matches!(&only_chain(&script).ops[0].kind, OpKind::Or { branches }
        if branches.len() == 2));
}

#[test]
fn test_parse_line_continuation() {
    let script = parse("lower \\\n  report\n");
    assert_eq!(only_chain(&script).ops.len(), 2);
}

#[test]
fn test_parse_error_has_location() {
    let err = parse_err("lower )\n");
    match err {
        ParseError::Unexpected { line, col, .. } => {
            assert_eq!(line, 1);
            assert_eq!(col, 7);
        }
        other => panic!("expected a located error, got {}", other),
    }
}

#[test]
fn test_parse_error_on_missing_restart_comma() {
    let err = parse_err("restart ( lower upper )\n");
    assert!(err.to_string().contains("','"));
}

#[test]
fn test_parse_error_on_directive_after_body() {
    // Directives belong to the header; after the first chain they are
    // statements and `list` cannot start one.
    let err = parse_err("lower report\nlist L\n");
    assert!(matches!(err, ParseError::Unexpected { .. }));
}

#[test]
fn test_parse_error_on_empty_use() {
    let err = parse_err("use lower report\n");
    assert!(err.to_string().contains("list name"));
}
