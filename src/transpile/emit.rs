//! Weft text emission
//!
//! Renders a [`RecursionPlan`] as one `bend`/`fork` definition. The `when`
//! condition holds exactly when the plan takes its step branch: every base
//! guard preceding the step is negated and conjoined with the step's own
//! guard. The tail call becomes `fork(...)`, and the base branches become
//! the `else` chain in plan order.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::transpile::ast::{Annotation, CmpOp, Expr, Param};
use crate::transpile::shape::{BranchBody, PlanBranch, RecursionPlan};

/// An emitted definition, ready to merge into book source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranspiledSource {
    pub name: String,
    pub params: Vec<Param>,
    pub result: Annotation,
    pub source: String,
}

pub fn emit(plan: &RecursionPlan) -> TranspiledSource {
    let mut src = String::new();

    let params = plan
        .params
        .iter()
        .map(|p| format!("{}: {}", p.name, p.annotation))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(src, "def {}({}) -> {}:", plan.name, params, plan.result);

    let seeds = plan
        .params
        .iter()
        .map(|p| format!("{} = {}", p.name, p.name))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(src, "  bend {seeds}:");

    let step = plan.step();
    let _ = writeln!(src, "    when {}:", render(&when_condition(plan)));
    let BranchBody::Step(args) = &step.body else {
        unreachable!("step branch carries call arguments");
    };
    let args = args.iter().map(render).collect::<Vec<_>>().join(", ");
    let _ = writeln!(src, "      return fork({args})");
    let _ = writeln!(src, "    else:");
    render_bases(&mut src, &plan.bases().collect::<Vec<_>>());

    TranspiledSource {
        name: plan.name.clone(),
        params: plan.params.clone(),
        result: plan.result,
        source: src,
    }
}

/// The `else` chain. Guards stay in branch order; the final base needs no
/// guard because the `when` condition already excludes it.
fn render_bases(src: &mut String, bases: &[&PlanBranch]) {
    let mut indent = 6;
    for (i, base) in bases.iter().enumerate() {
        let BranchBody::Base(expr) = &base.body else {
            unreachable!("bases() yields base branches only");
        };
        let pad = " ".repeat(indent);
        match (&base.guard, i + 1 == bases.len()) {
            (Some(guard), false) => {
                let _ = writeln!(src, "{pad}if {}:", render(guard));
                let _ = writeln!(src, "{pad}  return {}", render(expr));
                let _ = writeln!(src, "{pad}else:");
                indent += 2;
            }
            _ => {
                let _ = writeln!(src, "{pad}return {}", render(expr));
                break;
            }
        }
    }
}

/// `when` condition: the step is taken exactly when no base branch before
/// it fires and its own guard (if any) holds. Branch order matters; a
/// guarded base above the step must stay reachable.
fn when_condition(plan: &RecursionPlan) -> Expr {
    let mut cond: Option<Expr> = None;
    for branch in &plan.branches {
        let clause = match (&branch.body, &branch.guard) {
            (BranchBody::Step(_), Some(guard)) => guard.clone(),
            (BranchBody::Step(_), None) => break,
            (BranchBody::Base(_), Some(guard)) => negate(guard),
            // Only the final branch is unguarded, and it follows the step.
            (BranchBody::Base(_), None) => unreachable!("unguarded base precedes the step"),
        };
        let done = matches!(branch.body, BranchBody::Step(_));
        cond = Some(match cond {
            Some(acc) => Expr::bin(crate::transpile::ast::BinOp::And, acc, clause),
            None => clause,
        });
        if done {
            break;
        }
    }
    match cond {
        Some(cond) => cond,
        None => Expr::num(1),
    }
}

fn negate(expr: &Expr) -> Expr {
    match expr {
        Expr::Cmp { op, lhs, rhs } => Expr::Cmp {
            op: op.negated(),
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        },
        other => Expr::cmp(CmpOp::Eq, other.clone(), Expr::num(0)),
    }
}

fn render(expr: &Expr) -> String {
    match expr {
        Expr::Num(n) => n.to_string(),
        Expr::Var(name) => name.clone(),
        Expr::Bin { op, lhs, rhs } => {
            format!("({} {} {})", render(lhs), op.symbol(), render(rhs))
        }
        Expr::Cmp { op, lhs, rhs } => {
            format!("({} {} {})", render(lhs), op.symbol(), render(rhs))
        }
        Expr::Call { callee, args } => {
            let args = args.iter().map(render).collect::<Vec<_>>().join(", ");
            format!("{callee}({args})")
        }
    }
}
