//! Shape checking
//!
//! Normalizes an annotated function body into a [`RecursionPlan`]: an
//! ordered list of guarded branches, each either a closed-form return or
//! the single tail self-call. Anything the plan cannot express is rejected
//! up front with the offending construct named; nothing is ever
//! mis-translated into a definition with different semantics.

use crate::transpile::ast::{BinOp, Expr, FnDef, Stmt};
use crate::transpile::TranspileError;

/// The normalized form every accepted function reduces to.
#[derive(Debug, Clone, PartialEq)]
pub struct RecursionPlan {
    pub name: String,
    pub params: Vec<crate::transpile::ast::Param>,
    pub result: crate::transpile::ast::Annotation,
    pub branches: Vec<PlanBranch>,
}

/// One branch: taken when `guard` holds (or unconditionally for the final
/// branch).
#[derive(Debug, Clone, PartialEq)]
pub struct PlanBranch {
    pub guard: Option<Expr>,
    pub body: BranchBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BranchBody {
    /// A closed-form result over parameters and constants.
    Base(Expr),
    /// The tail self-call; one expression per parameter, in order.
    Step(Vec<Expr>),
}

impl RecursionPlan {
    pub fn step(&self) -> &PlanBranch {
        match self
            .branches
            .iter()
            .find(|b| matches!(b.body, BranchBody::Step(_)))
        {
            Some(branch) => branch,
            None => unreachable!("check admits exactly one step branch"),
        }
    }

    pub fn bases(&self) -> impl Iterator<Item = &PlanBranch> {
        self.branches
            .iter()
            .filter(|b| matches!(b.body, BranchBody::Base(_)))
    }
}

fn unsupported(construct: impl Into<String>) -> TranspileError {
    TranspileError::Unsupported {
        construct: construct.into(),
    }
}

/// Check a function against the translatable shape.
pub fn check(def: &FnDef) -> Result<RecursionPlan, TranspileError> {
    let mut branches = Vec::new();
    lower_block(def, &def.body, None, &mut branches)?;

    let steps = branches
        .iter()
        .filter(|b| matches!(b.body, BranchBody::Step(_)))
        .count();
    if steps == 0 {
        return Err(unsupported("function without a tail recursive call"));
    }
    if steps > 1 {
        return Err(unsupported("multiple recursive branches"));
    }
    if branches.len() == steps {
        return Err(unsupported("recursion without a base case"));
    }

    Ok(RecursionPlan {
        name: def.name.clone(),
        params: def.params.clone(),
        result: def.result,
        branches,
    })
}

/// Lower a statement block under an accumulated guard. Exactly the forms
/// `return e`, `if c: ... [else: ...]` survive.
fn lower_block(
    def: &FnDef,
    stmts: &[Stmt],
    guard: Option<Expr>,
    out: &mut Vec<PlanBranch>,
) -> Result<(), TranspileError> {
    let Some((head, tail)) = stmts.split_first() else {
        return Err(TranspileError::MissingReturn);
    };
    match head {
        Stmt::Return(expr) => {
            if !tail.is_empty() {
                return Err(unsupported("statement after return"));
            }
            let body = classify_return(def, expr)?;
            out.push(PlanBranch { guard, body });
            Ok(())
        }
        Stmt::If { cond, then, orelse } => {
            validate_expr(def, cond)?;
            let inner = match guard.clone() {
                Some(outer) => Expr::bin(BinOp::And, outer, cond.clone()),
                None => cond.clone(),
            };
            lower_block(def, then, Some(inner), out)?;
            if orelse.is_empty() {
                lower_block(def, tail, guard, out)
            } else {
                if !tail.is_empty() {
                    return Err(unsupported("statement after if/else"));
                }
                lower_block(def, orelse, guard, out)
            }
        }
        Stmt::While { .. } => Err(unsupported("while loop")),
        Stmt::Let { .. } => Err(unsupported("local binding")),
        Stmt::Assign { .. } => Err(unsupported("assignment")),
        Stmt::Expr(_) => Err(unsupported("expression statement")),
    }
}

/// A returned expression is either the tail self-call or closed-form.
fn classify_return(def: &FnDef, expr: &Expr) -> Result<BranchBody, TranspileError> {
    if let Expr::Call { callee, args } = expr {
        if callee == &def.name {
            if args.len() != def.params.len() {
                return Err(unsupported(format!(
                    "recursive call with {} arguments (expected {})",
                    args.len(),
                    def.params.len()
                )));
            }
            for arg in args {
                validate_expr(def, arg)?;
            }
            return Ok(BranchBody::Step(args.clone()));
        }
        return Err(unsupported(format!("call to other function `{callee}`")));
    }
    validate_expr(def, expr)?;
    Ok(BranchBody::Base(expr.clone()))
}

/// Closed-form expressions: numbers, parameters, arithmetic, comparisons.
/// Any call here means the recursion is not in tail position.
fn validate_expr(def: &FnDef, expr: &Expr) -> Result<(), TranspileError> {
    let mut work = vec![expr];
    while let Some(expr) = work.pop() {
        match expr {
            Expr::Num(_) => {}
            Expr::Var(name) => {
                if !def.param_names().any(|p| p == name) {
                    return Err(unsupported(format!("unbound variable `{name}`")));
                }
            }
            Expr::Bin { lhs, rhs, .. } | Expr::Cmp { lhs, rhs, .. } => {
                work.push(lhs);
                work.push(rhs);
            }
            Expr::Call { callee, .. } => {
                if callee == &def.name {
                    return Err(unsupported("non-tail recursive call"));
                }
                return Err(unsupported(format!("call to other function `{callee}`")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpile::ast::{Annotation, CmpOp};

    /// `fib(n, a, b) = if n == 0 { a } else { fib(n - 1, b, a + b) }`
    fn fib_acc() -> FnDef {
        FnDef::new("fib")
            .param("n", Annotation::U24)
            .param("a", Annotation::U24)
            .param("b", Annotation::U24)
            .returns(Annotation::U24)
            .recursive()
            .body(vec![
                Stmt::If {
                    cond: Expr::cmp(CmpOp::Eq, Expr::var("n"), Expr::num(0)),
                    then: vec![Stmt::Return(Expr::var("a"))],
                    orelse: vec![],
                },
                Stmt::Return(Expr::call(
                    "fib",
                    vec![
                        Expr::bin(BinOp::Sub, Expr::var("n"), Expr::num(1)),
                        Expr::var("b"),
                        Expr::bin(BinOp::Add, Expr::var("a"), Expr::var("b")),
                    ],
                )),
            ])
    }

    #[test]
    fn accumulator_fib_normalizes() {
        let plan = check(&fib_acc()).expect("accepted");
        assert_eq!(plan.branches.len(), 2);
        assert!(plan.branches[0].guard.is_some());
        assert!(matches!(plan.branches[0].body, BranchBody::Base(_)));
        let step = plan.step();
        assert!(step.guard.is_none());
        let BranchBody::Step(args) = &step.body else {
            panic!("expected step");
        };
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn non_tail_recursion_is_rejected() {
        // fib(n) = fib(n - 1) + fib(n - 2)
        let def = FnDef::new("fib")
            .param("n", Annotation::U24)
            .recursive()
            .body(vec![
                Stmt::If {
                    cond: Expr::cmp(CmpOp::Lt, Expr::var("n"), Expr::num(2)),
                    then: vec![Stmt::Return(Expr::var("n"))],
                    orelse: vec![],
                },
                Stmt::Return(Expr::bin(
                    BinOp::Add,
                    Expr::call(
                        "fib",
                        vec![Expr::bin(BinOp::Sub, Expr::var("n"), Expr::num(1))],
                    ),
                    Expr::call(
                        "fib",
                        vec![Expr::bin(BinOp::Sub, Expr::var("n"), Expr::num(2))],
                    ),
                )),
            ]);
        let err = check(&def).unwrap_err();
        assert!(matches!(
            err,
            TranspileError::Unsupported { construct } if construct == "non-tail recursive call"
        ));
    }

    #[test]
    fn while_loop_is_rejected_by_name() {
        let def = FnDef::new("spin")
            .param("n", Annotation::U24)
            .recursive()
            .body(vec![
                Stmt::While {
                    cond: Expr::cmp(CmpOp::Gt, Expr::var("n"), Expr::num(0)),
                    body: vec![],
                },
                Stmt::Return(Expr::var("n")),
            ]);
        let err = check(&def).unwrap_err();
        assert!(matches!(
            err,
            TranspileError::Unsupported { construct } if construct == "while loop"
        ));
    }

    #[test]
    fn multiple_step_branches_are_rejected() {
        let def = FnDef::new("f")
            .param("n", Annotation::U24)
            .recursive()
            .body(vec![
                Stmt::If {
                    cond: Expr::cmp(CmpOp::Eq, Expr::var("n"), Expr::num(0)),
                    then: vec![Stmt::Return(Expr::call("f", vec![Expr::num(1)]))],
                    orelse: vec![],
                },
                Stmt::Return(Expr::call(
                    "f",
                    vec![Expr::bin(BinOp::Sub, Expr::var("n"), Expr::num(1))],
                )),
            ]);
        let err = check(&def).unwrap_err();
        assert!(matches!(
            err,
            TranspileError::Unsupported { construct } if construct == "multiple recursive branches"
        ));
    }

    #[test]
    fn missing_final_return_is_rejected() {
        let def = FnDef::new("f")
            .param("n", Annotation::U24)
            .recursive()
            .body(vec![Stmt::If {
                cond: Expr::cmp(CmpOp::Eq, Expr::var("n"), Expr::num(0)),
                then: vec![Stmt::Return(Expr::num(0))],
                orelse: vec![],
            }]);
        assert!(matches!(check(&def), Err(TranspileError::MissingReturn)));
    }

    #[test]
    fn unbound_variable_is_rejected() {
        let def = FnDef::new("f")
            .param("n", Annotation::U24)
            .recursive()
            .body(vec![Stmt::Return(Expr::var("m"))]);
        let err = check(&def).unwrap_err();
        assert!(matches!(
            err,
            TranspileError::Unsupported { construct } if construct.contains("unbound variable")
        ));
    }

    #[test]
    fn nested_guards_conjoin() {
        let def = FnDef::new("f")
            .param("n", Annotation::U24)
            .param("m", Annotation::U24)
            .recursive()
            .body(vec![
                Stmt::If {
                    cond: Expr::cmp(CmpOp::Gt, Expr::var("n"), Expr::num(0)),
                    then: vec![Stmt::If {
                        cond: Expr::cmp(CmpOp::Gt, Expr::var("m"), Expr::num(0)),
                        then: vec![Stmt::Return(Expr::call(
                            "f",
                            vec![
                                Expr::bin(BinOp::Sub, Expr::var("n"), Expr::num(1)),
                                Expr::var("m"),
                            ],
                        ))],
                        orelse: vec![Stmt::Return(Expr::var("n"))],
                    }],
                    orelse: vec![],
                },
                Stmt::Return(Expr::num(0)),
            ]);
        let plan = check(&def).expect("accepted");
        assert_eq!(plan.branches.len(), 3);
        let step = plan.step();
        assert!(matches!(
            step.guard,
            Some(Expr::Bin { op: BinOp::And, .. })
        ));
    }
}
