//! Property-based tests for the compiler and VM.
//!
//! Tests the following properties:
//! - Arithmetic follows standard precedence and associativity
//! - Comparison sugar agrees with its negated form
//! - Stepped and run-to-completion execution are indistinguishable
//! - Compiled jumps always land inside the chunk

mod common;

use common::{run_ok, run_stepped, run_whole};
use kotolang::bytecode::disasm::{Operand, decode};
use kotolang::compile;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum Expr {
    Num(u32),
    Neg(Box<Expr>),
    Bin(char, Box<Expr>, Box<Expr>),
}

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::Num(_) => 3,
            Expr::Neg(_) => 2,
            Expr::Bin('+' | '-', _, _) => 0,
            Expr::Bin(_, _, _) => 1,
        }
    }

    /// Source text with only the parentheses precedence requires.
    fn render(&self) -> String {
        match self {
            Expr::Num(n) => n.to_string(),
            Expr::Neg(inner) => {
                if inner.precedence() < 2 {
                    format!("-({})", inner.render())
                } else {
                    format!("-{}", inner.render())
                }
            }
            Expr::Bin(op, lhs, rhs) => {
                let p = self.precedence();
                let left = if lhs.precedence() < p {
                    format!("({})", lhs.render())
                } else {
                    lhs.render()
                };
                // left associative: an equal-precedence right operand needs parens
                let right = if rhs.precedence() <= p {
                    format!("({})", rhs.render())
                } else {
                    rhs.render()
                };
                format!("{} {} {}", left, op, right)
            }
        }
    }

    fn eval(&self) -> f64 {
        match self {
            Expr::Num(n) => *n as f64,
            Expr::Neg(inner) => -inner.eval(),
            Expr::Bin(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(), rhs.eval());
                match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    _ => a / b,
                }
            }
        }
    }
}

fn arb_expr() -> impl Strategy<Value = Expr> {
    arb_expr_sized(4, 24, vec!['+', '-', '*', '/'])
}

/// Smaller expressions keep generated programs under the constant limit.
/// No division, so no NaN ends up in compared snapshots.
fn arb_small_expr() -> impl Strategy<Value = Expr> {
    arb_expr_sized(2, 6, vec!['+', '-', '*'])
}

fn arb_expr_sized(depth: u32, size: u32, ops: Vec<char>) -> impl Strategy<Value = Expr> {
    let leaf = (0u32..100).prop_map(Expr::Num);
    leaf.prop_recursive(depth, size, 2, move |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| Expr::Neg(Box::new(e))),
            (
                prop::sample::select(ops.clone()),
                inner.clone(),
                inner
            )
                .prop_map(|(op, l, r)| Expr::Bin(op, Box::new(l), Box::new(r))),
        ]
    })
}

/// Generate a small terminating program as a list of statements
fn arb_program() -> impl Strategy<Value = String> {
    let statement = prop_oneof![
        (0usize..3, arb_small_expr()).prop_map(|(g, e)| format!("var g{} = {};", g, e.render())),
        arb_small_expr().prop_map(|e| format!("print {};", e.render())),
        (0usize..3).prop_map(|g| format!("g{0} = g{0} + 1;", g)),
        (arb_small_expr(), arb_small_expr())
            .prop_map(|(a, b)| format!("{{ var l = {}; var m = l * {}; print m; }}", a.render(), b.render())),
        (0u32..4).prop_map(|k| format!("for (var i = 0; i < {}; i = i + 1) print i;", k)),
        (arb_small_expr(), 0u32..9).prop_map(|(e, n)| format!(
            "if ({} > 0) print \"pos\"; else {{ write {}, 1, 2; wait; }}",
            e.render(),
            n
        )),
        "[a-z]{0,6}".prop_map(|s| format!("print \"{}\" + \"!\";", s)),
    ];

    prop::collection::vec(statement, 1..8).prop_map(|stmts| stmts.join("\n"))
}

// =============================================================================
// Precedence
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Minimal-parenthesis rendering evaluates like the tree it came from
    #[test]
    fn arithmetic_follows_precedence(expr in arb_expr()) {
        let source = format!("print {};", expr.render());
        let lines = run_ok(&source);
        prop_assert_eq!(lines, vec![expr.eval().to_string()], "source: {}", source);
    }

    /// a >= b behaves as !(a < b), and likewise for <= and !=
    #[test]
    fn comparison_sugar(a in -50i32..50, b in -50i32..50) {
        let sugar = run_ok(&format!("print {a} >= {b}; print {a} <= {b}; print {a} != {b};"));
        let plain = run_ok(&format!(
            "print !({a} < {b}); print !({a} > {b}); print !({a} == {b});"
        ));
        prop_assert_eq!(sugar, plain);
    }
}

// =============================================================================
// Stepped execution
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Same final stack, globals and log whichever way the chunk is driven
    #[test]
    fn stepped_matches_run(program in arb_program()) {
        prop_assert_eq!(run_stepped(&program), run_whole(&program), "program:\n{}", program);
    }

    /// Every jump in a compiled program resolves inside the chunk
    #[test]
    fn jumps_land_inside_chunk(program in arb_program()) {
        let chunk = compile(&program).expect("generated programs compile");
        for instruction in decode(&chunk).expect("compiled chunks decode") {
            if let Operand::Jump { offset, target } = instruction.operand {
                prop_assert_ne!(offset, 0xffff);
                prop_assert!(target < chunk.len());
            }
        }
    }
}
