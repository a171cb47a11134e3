//! End-to-end tests: compile textual clauses, evaluate the emitted
//! expression against runtime values, and assert on the selected actions.
//!
//! Covers the literal scenarios for every pattern family (literals, rows
//! with bindings, seqs, maps with `:only`, alternation, guards, vectors
//! with rest, typed arrays) plus the behavioral laws: first-match
//! soundness, single evaluation of lifted occurrences, binding scope,
//! or-idempotence, guard short-circuiting, and the traced failure plane.

use std::sync::atomic::{AtomicUsize, Ordering};
use trellis_compiler::{compile_match, compile_match_one, compile_matchv, MatchCompiler};
use trellis_core::{read, read_many, TrellisError, TrellisResult, Value, VectorKind};
use trellis_runtime::Env;

// ============================================================================
// Test Utilities
// ============================================================================

fn div3(args: &[Value]) -> TrellisResult<Value> {
    match args {
        [Value::Int(n)] => Ok(Value::Bool(n % 3 == 0)),
        _ => Err(TrellisError::TypeError {
            message: "div3? expects an integer".to_string(),
        }),
    }
}

static TICKS: AtomicUsize = AtomicUsize::new(0);

fn tick(args: &[Value]) -> TrellisResult<Value> {
    TICKS.fetch_add(1, Ordering::SeqCst);
    Ok(args.first().cloned().unwrap_or(Value::Nil))
}

fn env_with(bindings: &[(&str, Value)]) -> Env {
    let mut env = Env::new();
    env.register("div3?", div3);
    env.register("tick", tick);
    for (name, value) in bindings {
        env.bind(name, value.clone());
    }
    env
}

/// Compile and evaluate a match over the given variable bindings.
fn run(occurrences: &str, clauses: &str, bindings: &[(&str, Value)]) -> TrellisResult<Value> {
    let expr = compile_match(
        &read(occurrences).expect("occurrences parse"),
        &read_many(clauses).expect("clauses parse"),
    )?;
    env_with(bindings).eval(&expr)
}

fn kw(name: &str) -> Value {
    Value::kw(name)
}

fn ints(items: &[i64]) -> Vec<Value> {
    items.iter().map(|n| Value::Int(*n)).collect()
}

// ============================================================================
// Module: Literal Scenarios
// ============================================================================

#[test]
fn test_boolean_rows() {
    let result = run("[true false]", "[true false] 1 [false true] 2", &[]);
    assert_eq!(result.unwrap(), Value::Int(1));
}

#[test]
fn test_rows_with_bindings() {
    let result = run(
        "[1 2 4]",
        "[1 2 b] [:a0 b] [a 2 4] [:a1 a] :else []",
        &[],
    );
    assert_eq!(result.unwrap(), Value::Vector(vec![kw("a0"), Value::Int(4)]));
}

#[test]
fn test_seq_patterns_fall_through_on_element_mismatch() {
    let result = run(
        "[(1 2 3)]",
        "[([1 z 4] :seq)] z [([_ _ _] :seq)] :a2 :else []",
        &[],
    );
    assert_eq!(result.unwrap(), kw("a2"));
}

#[test]
fn test_map_only_rejects_extra_keys() {
    let result = run(
        "[{:a 1 :b 2 :c 3}]",
        "[({:a _ :b 2} :only [:a :b])] :a0 [{:a 1 :c _}] :a1 :else []",
        &[],
    );
    assert_eq!(result.unwrap(), kw("a1"));
}

#[test]
fn test_map_only_accepts_exact_keys() {
    let result = run(
        "[{:a 1 :b 2}]",
        "[({:a _ :b 2} :only [:a :b])] :a0 [{:a 1 :c _}] :a1 :else []",
        &[],
    );
    assert_eq!(result.unwrap(), kw("a0"));
}

#[test]
fn test_alternation_selects_second_row() {
    let result = run(
        "[4 6 9]",
        "[(1 | 2 | 3) _ _] :a0 [4 (5 | 6 | 7) _] :a1 :else []",
        &[],
    );
    assert_eq!(result.unwrap(), kw("a1"));
}

#[test]
fn test_guards_with_distinct_predicate_sets() {
    let result = run(
        "[(2 3 4 5)]",
        "[([_ (a :when even?) _ _] :seq)] :a0 [([_ (b :when [odd? div3?]) _ _] :seq)] :a1 :else []",
        &[],
    );
    assert_eq!(result.unwrap(), kw("a1"));
}

#[test]
fn test_fizzbuzz() {
    let expr = compile_match(
        &read("[(mod x 3) (mod x 5)]").unwrap(),
        &read_many(r#"[0 0] "FizzBuzz" [0 _] "Fizz" [_ 0] "Buzz" :else (str x)"#).unwrap(),
    )
    .unwrap();
    let produced: Vec<Value> = (1..=15)
        .map(|x| {
            let mut env = env_with(&[("x", Value::Int(x))]);
            env.eval(&expr).unwrap()
        })
        .collect();
    let expected: Vec<Value> = [
        "1", "2", "Fizz", "4", "Buzz", "Fizz", "7", "8", "Fizz", "Buzz", "11", "Fizz", "13",
        "14", "FizzBuzz",
    ]
    .iter()
    .map(|s| Value::str(s))
    .collect();
    assert_eq!(produced, expected);
}

// ============================================================================
// Module: Pattern Families
// ============================================================================

#[test]
fn test_vector_pattern_with_rest_binds_slice() {
    let v = Value::Vector(ints(&[1, 2, 3]));
    let result = run("[v]", "[[1 & r]] r :else :none", &[("v", v)]);
    assert_eq!(result.unwrap(), Value::Vector(ints(&[2, 3])));
}

#[test]
fn test_vector_pattern_checks_count() {
    let short = Value::Vector(ints(&[1]));
    let result = run("[v]", "[[1 2]] :pair :else :other", &[("v", short)]);
    assert_eq!(result.unwrap(), kw("other"));
}

#[test]
fn test_seq_pattern_with_rest_binds_tail() {
    let s = Value::List(ints(&[1, 2, 3]));
    let result = run("[s]", "[([1 & r] :seq)] r :else :none", &[("s", s)]);
    assert_eq!(result.unwrap(), Value::List(ints(&[2, 3])));
}

#[test]
fn test_seq_rest_accepts_empty_sequence() {
    // A wildcard head carries no test of its own; against () it binds nil
    // and the rest binds ().
    let result = run(
        "[s]",
        "[([x & r] :seq)] [x r] :else :empty",
        &[("s", Value::List(vec![]))],
    );
    assert_eq!(
        result.unwrap(),
        Value::Vector(vec![Value::Nil, Value::List(vec![])])
    );
}

#[test]
fn test_seq_element_mismatch_falls_to_default() {
    let result = run(
        "[s]",
        "[([1 2] :seq)] :pair :else :other",
        &[("s", Value::List(vec![]))],
    );
    assert_eq!(result.unwrap(), kw("other"));
}

#[test]
fn test_map_missing_key_projects_nil() {
    let m = Value::Map(vec![(kw("a"), Value::Int(1))]);
    let result = run("[m]", "[{:a 1 :b nil}] :no-b :else :other", &[("m", m)]);
    assert_eq!(result.unwrap(), kw("no-b"));
}

#[test]
fn test_quoted_symbol_matches_symbol_value() {
    let result = run(
        "[x]",
        "['red] :red ['blue] :blue :else :other",
        &[("x", Value::sym("red"))],
    );
    assert_eq!(result.unwrap(), kw("red"));
    let result = run(
        "[x]",
        "['red] :red ['blue] :blue :else :other",
        &[("x", Value::sym("green"))],
    );
    assert_eq!(result.unwrap(), kw("other"));
}

#[test]
fn test_local_symbols_compare_by_value() {
    let expr = MatchCompiler::new()
        .locals(["y"])
        .compile(
            &read("[x]").unwrap(),
            &read_many("[y] :same :else :diff").unwrap(),
        )
        .unwrap()
        .expr;
    let mut env = env_with(&[("x", Value::Int(5)), ("y", Value::Int(5))]);
    assert_eq!(env.eval(&expr).unwrap(), kw("same"));
    let mut env = env_with(&[("x", Value::Int(5)), ("y", Value::Int(6))]);
    assert_eq!(env.eval(&expr).unwrap(), kw("diff"));
}

#[test]
fn test_matchv_coerces_typed_arrays() {
    let expr = compile_matchv(
        VectorKind::Array("ints".into()),
        &read("[xs]").unwrap(),
        &read_many("[[1 b]] b :else :none").unwrap(),
    )
    .unwrap();
    let array = Value::Array {
        tag: "ints".into(),
        items: ints(&[1, 9]),
    };
    let mut env = env_with(&[("xs", array)]);
    assert_eq!(env.eval(&expr).unwrap(), Value::Int(9));

    // A plain vector is not an ints array.
    let mut env = env_with(&[("xs", Value::Vector(ints(&[1, 9])))]);
    assert_eq!(env.eval(&expr).unwrap(), kw("none"));
}

#[test]
fn test_match_one_wraps_singleton_frames() {
    let expr = compile_match_one(
        &read("x").unwrap(),
        &read_many("1 :one 2 :two :else :many").unwrap(),
    )
    .unwrap();
    let mut env = env_with(&[("x", Value::Int(2))]);
    assert_eq!(env.eval(&expr).unwrap(), kw("two"));
}

#[test]
fn test_as_captures_whole_value() {
    let v = Value::Vector(ints(&[1, 2]));
    let result = run("[v]", "[([1 b] :as whole)] [whole b] :else :none", &[("v", v.clone())]);
    assert_eq!(
        result.unwrap(),
        Value::Vector(vec![v, Value::Int(2)])
    );
}

#[test]
fn test_nested_patterns_in_maps() {
    let m = Value::Map(vec![(
        kw("point"),
        Value::Vector(ints(&[3, 4])),
    )]);
    let result = run("[m]", "[{:point [x y]}] [y x] :else :none", &[("m", m)]);
    assert_eq!(result.unwrap(), Value::Vector(ints(&[4, 3])));
}

// ============================================================================
// Module: Behavioral Laws
// ============================================================================

#[test]
fn test_first_match_wins_top_to_bottom() {
    let result = run(
        "[x y]",
        "[_ 1] :a [1 _] :b :else :c",
        &[("x", Value::Int(1)), ("y", Value::Int(1))],
    );
    assert_eq!(result.unwrap(), kw("a"));
}

#[test]
fn test_wildcard_row_reachable_under_every_constructor() {
    // Row order: the catch-all must win whenever row 1 fails late.
    let result = run(
        "[x y]",
        "[1 1] :a [_ _] :b",
        &[("x", Value::Int(1)), ("y", Value::Int(2))],
    );
    assert_eq!(result.unwrap(), kw("b"));
}

#[test]
fn test_lifted_occurrence_evaluated_once() {
    TICKS.store(0, Ordering::SeqCst);
    let result = run(
        "[(tick 5)]",
        "[1] :one [2] :two [5] :five :else :other",
        &[],
    );
    assert_eq!(result.unwrap(), kw("five"));
    assert_eq!(TICKS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_binding_scope_sees_row_captures_only() {
    let result = run(
        "[x y]",
        "[a (2 :as two)] [a two] :else []",
        &[("x", Value::Int(7)), ("y", Value::Int(2))],
    );
    assert_eq!(result.unwrap(), Value::Vector(ints(&[7, 2])));
}

#[test]
fn test_or_idempotence() {
    for (input, expected) in [(1, "one"), (2, "other")] {
        let doubled = run("[x]", "[(1 | 1)] :one :else :other", &[("x", Value::Int(input))]);
        let single = run("[x]", "[1] :one :else :other", &[("x", Value::Int(input))]);
        assert_eq!(doubled.unwrap(), kw(expected));
        assert_eq!(single.unwrap(), kw(expected));
    }
}

#[test]
fn test_guard_predicate_gated_by_inner_test() {
    // even? raises on a string; it must only run after the inner literal
    // test succeeds.
    let result = run(
        "[x]",
        "[((1 :as n) :when even?)] :impossible :else :other",
        &[("x", Value::str("s"))],
    );
    assert_eq!(result.unwrap(), kw("other"));
}

#[test]
fn test_guard_predicates_run_when_inner_matches() {
    let result = run(
        "[x]",
        "[(n :when even?)] :even :else :odd",
        &[("x", Value::Int(4))],
    );
    assert_eq!(result.unwrap(), kw("even"));
    let result = run(
        "[x]",
        "[(n :when even?)] :even :else :odd",
        &[("x", Value::Int(3))],
    );
    assert_eq!(result.unwrap(), kw("odd"));
}

#[test]
fn test_guard_over_alternation_tests_disjunction() {
    for (input, expected) in [(2, "even-small"), (1, "other"), (4, "other")] {
        let result = run(
            "[x]",
            "[((1 | 2) :when even?)] :even-small :else :other",
            &[("x", Value::Int(input))],
        );
        assert_eq!(result.unwrap(), kw(expected), "input {input}");
    }
}

#[test]
fn test_no_match_raises_runtime_failure() {
    let result = run("[x]", "[1] :one", &[("x", Value::Int(9))]);
    assert!(matches!(result, Err(TrellisError::NoMatch { .. })));
}

#[test]
fn test_traced_failure_carries_branch_detail() {
    let expr = compile_match(
        &read("[x]").unwrap(),
        &read_many("[1] :one [2] :two").unwrap(),
    )
    .unwrap();
    let mut env = env_with(&[("x", Value::Int(9))]);
    env.set_trace(true);
    match env.eval(&expr) {
        Err(TrellisError::NoMatch { detail: Some(detail) }) => {
            assert!(detail.contains("branches"), "{detail}");
        }
        other => panic!("expected traced no-match, got {other:?}"),
    }
}
