//! The rule library: combinators and the declared-order basic rule set.

mod numpy;

pub use numpy::numpy_rules;

use std::collections::{BTreeMap, BTreeSet};

use shapecheck_ast::{Ast, HasSpan, Ident, Node};
use shapecheck_types::{fresh_name, AExp, BExp, Type};

use crate::anno::{param_type, type_from_anno};
use crate::checker::{no_op, Checker, Cont, Outcomes, Rule, Value};
use crate::context::Context;
use crate::pattern::Captures;
use crate::result::{CheckResult, TypeError};
use crate::verify::verify;

/// The default rule set, tried in declared order.
pub fn basic_rules() -> Vec<Rule> {
    vec![
        module(),
        assign_anno(),
        assign(),
        skip(),
        ident(),
        attr_ident(),
        literal("None", Type::None, "lit_None"),
        literal("True", Type::Boolean(BExp::Lit(true)), "lit_True"),
        literal("False", Type::Boolean(BExp::Lit(false)), "lit_False"),
        lit_num(),
        bool_operator("or", BExp::or, "bool_or"),
        bool_operator("and", BExp::and, "bool_and"),
        bool_not(),
        arith_operator("+", AExp::add, "int_add"),
        arith_operator("*", AExp::mul, "int_mul"),
        comparison_operator("==", BExp::Eq, "int_eq"),
        comparison_operator("<", BExp::Lt, "int_lt"),
        comparison_operator(">", BExp::Gt, "int_gt"),
        comparison_operator("<=", BExp::Le, "int_le"),
        comparison_operator(">=", BExp::Ge, "int_ge"),
        cond(),
        cond_expr(),
        fun_def(),
        fun_call(),
        lambda_expr(),
        assert_stmt(),
        return_stmt(),
        print_expr(),
        print_stmt(),
    ]
}

// Combinators
//
//

/// A rule that maps a fixed surface form to a fixed type.
pub fn literal(pattern: &str, t: Type, name: &str) -> Rule {
    Rule::new(pattern, name, move |_checker, ctx, _caps, _k| Ok(vec![(ctx, Some(t.clone()))]))
}

/// A rule that analyzes each capture, unifies the inferred types with the
/// declared assumptions, and returns the declared result type. Assumption and
/// result types are instantiated per application: all their free names are
/// renamed to fresh ids with one shared renaming, then `eapp`ed.
pub fn expression(
    pattern: &str,
    assumptions: Vec<(&str, Type)>,
    result: Type,
    name: &str,
) -> Rule {
    let assumptions: Vec<(String, Type)> =
        assumptions.into_iter().map(|(capture, t)| (capture.to_owned(), t)).collect();
    let mut names: BTreeSet<Ident> = result.names();
    for (_, t) in &assumptions {
        names.extend(t.names());
    }

    Rule::new(pattern, name, move |checker, ctx, caps, _k| {
        let mut items = Vec::new();
        for (capture, _) in &assumptions {
            items.push(caps.node(capture)?.clone());
        }
        analyze_each(checker, ctx, &items, Vec::new(), &|_checker, mut ctx, inferred| {
            let mut renaming = BTreeMap::new();
            for name in &names {
                renaming.insert(name.clone(), fresh_name());
            }
            for ((_, assumed), inferred_type) in assumptions.iter().zip(&inferred) {
                let instantiated = assumed.renamed(&renaming).eapp();
                ctx.unify(inferred_type, &instantiated)?;
            }
            Ok(vec![(ctx, Some(result.renamed(&renaming).eapp()))])
        })
    })
}

/// Binary infix operator over arithmetic index variables.
pub fn arith_operator(op: &str, ctor: fn(AExp, AExp) -> AExp, name: &str) -> Rule {
    let a = AExp::Var(Ident::from("a"));
    let b = AExp::Var(Ident::from("b"));
    expression(
        &format!("_a {op} _b"),
        vec![("a", Type::Arith(a.clone())), ("b", Type::Arith(b.clone()))],
        Type::Arith(ctor(a, b)),
        name,
    )
}

/// Binary comparison over arithmetic index variables, yielding a boolean.
pub fn comparison_operator(op: &str, ctor: fn(AExp, AExp) -> BExp, name: &str) -> Rule {
    let a = AExp::Var(Ident::from("a"));
    let b = AExp::Var(Ident::from("b"));
    expression(
        &format!("_a {op} _b"),
        vec![("a", Type::Arith(a.clone())), ("b", Type::Arith(b.clone()))],
        Type::Boolean(ctor(a, b)),
        name,
    )
}

/// Binary infix operator over boolean index variables.
pub fn bool_operator(op: &str, ctor: fn(BExp, BExp) -> BExp, name: &str) -> Rule {
    let a = BExp::Var(Ident::from("a"));
    let b = BExp::Var(Ident::from("b"));
    expression(
        &format!("_a {op} _b"),
        vec![("a", Type::Boolean(a.clone())), ("b", Type::Boolean(b.clone()))],
        Type::Boolean(ctor(a, b)),
        name,
    )
}

fn bool_not() -> Rule {
    let a = BExp::Var(Ident::from("a"));
    expression(
        "not _a",
        vec![("a", Type::Boolean(a.clone()))],
        Type::Boolean(BExp::not(a)),
        "bool_not",
    )
}

// Threading helpers
//
//

/// Analyzes the statements of a body left to right, threading the context
/// through; in careful mode, verifies after every statement.
pub fn analyze_body(
    checker: &mut Checker,
    ctx: Context,
    body: &[Ast],
    k: &Cont<'_>,
) -> CheckResult<Outcomes> {
    match body.split_first() {
        None => k(checker, ctx, None),
        Some((stmt, rest)) => checker.analyze(vec![ctx], stmt, &|checker, ctx, _value| {
            if checker.careful {
                verify(std::slice::from_ref(&ctx))?;
            }
            analyze_body(checker, ctx, rest, k)
        }),
    }
}

/// Analyzes a list of expressions left to right, threading the context and
/// collecting the inferred types.
fn analyze_each(
    checker: &mut Checker,
    ctx: Context,
    items: &[Ast],
    inferred: Vec<Type>,
    finish: &dyn Fn(&mut Checker, Context, Vec<Type>) -> CheckResult<Outcomes>,
) -> CheckResult<Outcomes> {
    match items.split_first() {
        None => finish(checker, ctx, inferred),
        Some((item, rest)) => checker.analyze(vec![ctx], item, &|checker, ctx, value| {
            let t = expect_typed(value)?;
            let mut inferred = inferred.clone();
            inferred.push(t);
            analyze_each(checker, ctx, rest, inferred, finish)
        }),
    }
}

fn expect_typed(value: Value) -> CheckResult<Type> {
    value.ok_or_else(|| TypeError::impossible("expression without a type"))
}

/// The type of a branch condition, as a boolean assumption.
fn as_condition(value: &Value) -> CheckResult<BExp> {
    match value {
        Some(Type::Boolean(b)) => Ok(b.clone()),
        Some(Type::Bool) => Ok(BExp::EVar(fresh_name())),
        Some(other) => Err(TypeError::value(
            format!("Expected a boolean condition, got `{}`", other.head()),
            None,
        )),
        None => Err(TypeError::impossible("condition without a type")),
    }
}

// Statement rules
//
//

fn module() -> Rule {
    let pattern = shapecheck_parser::parse_pattern_raw("__body").expect("invalid rule pattern");
    Rule::from_pattern(pattern, "module", |checker, ctx, caps, k| {
        let body = caps.list("body")?.to_vec();
        analyze_body(checker, ctx, &body, k)
    })
}

fn skip() -> Rule {
    Rule::new("pass", "skip", |_checker, ctx, _caps, _k| Ok(vec![(ctx, None)]))
}

fn analyze_assign(
    checker: &mut Checker,
    ctx: Context,
    caps: &Captures,
) -> CheckResult<Outcomes> {
    let lhs_ast = caps.node("lhs")?;
    let Node::Name { id } = &lhs_ast.node else {
        return Err(TypeError::value(
            "Assignment target must be a name",
            Some(lhs_ast.span()),
        ));
    };
    let lhs = id.id.clone();
    let span = lhs_ast.span();
    let anno = caps.opt_node("anno").cloned();

    // Annotation without a right-hand side: `b: bool`.
    let Some(rhs) = caps.opt_node("rhs").cloned() else {
        let anno =
            anno.ok_or_else(|| TypeError::impossible("assignment without value or annotation"))?;
        let t = type_from_anno(&anno)?;
        let mut ctx = ctx;
        ctx.annotate(&lhs, t, true);
        return Ok(vec![(ctx, None)]);
    };

    checker.analyze(vec![ctx], &rhs, &|_checker, mut ctx, value| {
        let new_t = expect_typed(value)?;
        if ctx.contains(&lhs) {
            let old_t = ctx.type_of(&lhs, span)?;
            let new_t = ctx.under(&new_t);
            // Rebinding to a same-kind index expression is a refinement: the
            // variable takes a new value of the same kind, old and new are
            // deliberately not unified.
            let refines = matches!(
                (&old_t, &new_t),
                (Type::Arith(_), Type::Arith(_)) | (Type::Boolean(_), Type::Boolean(_))
            );
            if !refines {
                ctx.unify(&old_t, &new_t)?;
            }
        }
        match &anno {
            Some(anno) => {
                let t = type_from_anno(anno)?;
                ctx.unify(&new_t, &t)?;
                ctx.annotate(&lhs, t, true);
            }
            None => {
                let mut stored = ctx.under(&new_t);
                if let Type::Fun(_, _) = stored {
                    // Function bindings are stored as schemes.
                    stored = stored.flipped(&ctx.fixed);
                }
                ctx.annotate(&lhs, stored, false);
            }
        }
        Ok(vec![(ctx, None)])
    })
}

fn assign_anno() -> Rule {
    Rule::new("_lhs: _anno = _rhs", "assign_anno", |checker, ctx, caps, _k| {
        analyze_assign(checker, ctx, caps)
    })
}

fn assign() -> Rule {
    Rule::new("_lhs = _rhs", "assign", |checker, ctx, caps, _k| {
        analyze_assign(checker, ctx, caps)
    })
}

fn analyze_ident(ctx: Context, caps: &Captures) -> CheckResult<Outcomes> {
    let ast = caps.node("a")?;
    let name = ast
        .dotted_name()
        .ok_or_else(|| TypeError::value("Not an identifier", Some(ast.span())))?;
    let t = ctx.type_of(&name, ast.span())?;
    let t = if let Type::Fun(_, _) = t {
        // Function bindings instantiate immediately (prenex polymorphism).
        ctx.instantiate(&t)
    } else {
        t
    };
    Ok(vec![(ctx, Some(t))])
}

fn ident() -> Rule {
    Rule::new("a__Name", "ident", |_checker, ctx, caps, _k| analyze_ident(ctx, caps))
}

fn attr_ident() -> Rule {
    Rule::new("a__Attribute", "attr_ident", |_checker, ctx, caps, _k| analyze_ident(ctx, caps))
}

fn lit_num() -> Rule {
    Rule::new("num__Num", "lit_num", |_checker, ctx, caps, _k| {
        let ast = caps.node("num")?;
        let Node::Num { value } = &ast.node else {
            return Err(TypeError::impossible("malformed number literal"));
        };
        Ok(vec![(ctx, Some(Type::Arith(AExp::Lit(*value))))])
    })
}

fn cond() -> Rule {
    Rule::new("if _p:\n    __top\nelse:\n    __bot", "cond", |checker, ctx, caps, k| {
        let p = caps.node("p")?.clone();
        let top = caps.list("top")?.to_vec();
        let bot = caps.list("bot")?.to_vec();
        checker.analyze(vec![ctx], &p, &|checker, ctx, value| {
            let t = as_condition(&value)?;
            let mut top_ctx = ctx.clone();
            top_ctx.assume(t.clone());
            let mut bot_ctx = ctx;
            bot_ctx.assume(BExp::not(t.clone()));
            let top_results = analyze_body(checker, top_ctx, &top, &no_op)?;
            let bot_results = analyze_body(checker, bot_ctx, &bot, &no_op)?;
            let mut out = Vec::new();
            for (branch_ctx, branch_value) in top_results.into_iter().chain(bot_results) {
                out.extend(k(checker, branch_ctx, branch_value)?);
            }
            Ok(out)
        })
    })
}

fn cond_expr() -> Rule {
    Rule::new("_l if _p else _r", "cond_expr", |checker, ctx, caps, k| {
        let p = caps.node("p")?.clone();
        let l = caps.node("l")?.clone();
        let r = caps.node("r")?.clone();
        checker.analyze(vec![ctx], &p, &|checker, ctx, value| {
            let t = as_condition(&value)?;
            let mut top_ctx = ctx.clone();
            top_ctx.assume(t.clone());
            let mut bot_ctx = ctx;
            bot_ctx.assume(BExp::not(t.clone()));
            let top_results = checker.analyze(vec![top_ctx], &l, &no_op)?;
            let bot_results = checker.analyze(vec![bot_ctx], &r, &no_op)?;
            let mut out = Vec::new();
            for (branch_ctx, branch_value) in top_results.into_iter().chain(bot_results) {
                out.extend(k(checker, branch_ctx, branch_value)?);
            }
            Ok(out)
        })
    })
}

fn fun_def() -> Rule {
    Rule::new(
        "def _f(__args) -> _return_type:\n    __body",
        "fun_def",
        |checker, ctx, caps, _k| {
            let f = caps.ident("f")?.clone();
            let params = caps.list("args")?.to_vec();
            let return_anno = caps.node("return_type")?.clone();
            let body = caps.list("body")?.to_vec();

            let mut nested = ctx.clone();
            let mut arg_types = Vec::new();
            for param in &params {
                let Node::Param { name, anno } = &param.node else {
                    return Err(TypeError::impossible("malformed parameter"));
                };
                let t = param_type(name, anno.as_deref())?;
                nested.annotate(&name.id, t.clone(), true);
                arg_types.push(t);
            }
            let r = type_from_anno(&return_anno)?;
            let combined = if arg_types.len() == 1 {
                arg_types.pop().expect("length checked")
            } else {
                Type::Tuple(arg_types)
            };
            let fun_type = Type::fun(combined, r.clone());
            // The nested binding is monomorphic so recursion does not
            // over-generalize; the outer binding is generalized once.
            nested.annotate(&f.id, fun_type.clone(), true);
            let polymorphic = fun_type.fresh(&ctx.fixed);

            let results =
                checker.with_return(r, |checker| analyze_body(checker, nested, &body, &no_op))?;
            for (nested_out, _) in &results {
                verify(std::slice::from_ref(nested_out))?;
            }

            let mut ctx = ctx;
            ctx.annotate(&f.id, polymorphic, false);
            Ok(vec![(ctx, None)])
        },
    )
}

fn fun_call() -> Rule {
    Rule::new("_f(__args)", "fun_call", |checker, ctx, caps, _k| {
        let f = caps.node("f")?.clone();
        let args = caps.list("args")?.to_vec();
        analyze_each(checker, ctx, &args, Vec::new(), &|checker, ctx, arg_types| {
            checker.analyze(vec![ctx], &f, &|_checker, mut ctx, value| {
                let t = expect_typed(value)?;
                let a = fresh_name();
                let b = fresh_name();
                ctx.fix([a.clone(), b.clone()]);
                let fn_type = Type::fun(Type::EVar(a.clone()), Type::EVar(b.clone()));
                ctx.unify(&t, &fn_type)?;
                ctx.unify(&Type::Tuple(arg_types.clone()), &Type::EVar(a))?;
                Ok(vec![(ctx, Some(Type::EVar(b.clone())))])
            })
        })
    })
}

fn lambda_expr() -> Rule {
    Rule::new("lambda __args: _e", "lambda_expr", |checker, ctx, caps, _k| {
        let params = caps.list("args")?.to_vec();
        let body = caps.node("e")?.clone();

        let mut inner = ctx.clone();
        let mut arg_types = Vec::new();
        for param in &params {
            let Node::Param { name, .. } = &param.node else {
                return Err(TypeError::impossible("malformed parameter"));
            };
            let t = Type::EVar(fresh_name());
            inner.annotate(&name.id, t.clone(), true);
            arg_types.push(t);
        }
        let inner_fixed = inner.fixed.clone();

        checker.analyze(vec![inner], &body, &|_checker, post, value| {
            let t = expect_typed(value)?;
            let fn_type = post.under(&Type::fun(Type::Tuple(arg_types.clone()), t));
            let newly_fixed: BTreeSet<Ident> =
                post.fixed.difference(&inner_fixed).cloned().collect();
            // Propagate refinements of outer names picked up by the body.
            let mut outer = ctx.clone();
            for name in outer.binding_names() {
                let t_outer = outer.type_of(&name, body.span())?;
                let t_post = post.under(&t_outer);
                outer.unify(&t_outer, &t_post)?;
                let to_fix: Vec<Ident> =
                    t_post.names().intersection(&newly_fixed).cloned().collect();
                outer.fix(to_fix);
            }
            Ok(vec![(outer, Some(fn_type))])
        })
    })
}

fn assert_stmt() -> Rule {
    Rule::new("assert _a", "assert", |checker, ctx, caps, _k| {
        let a = caps.node("a")?.clone();
        checker.analyze(vec![ctx], &a, &|_checker, mut ctx, value| {
            let t = as_condition(&value)?;
            ctx.assume(t);
            Ok(vec![(ctx, None)])
        })
    })
}

fn return_stmt() -> Rule {
    Rule::new("return _a", "return", |checker, ctx, caps, _k| {
        let a = caps.node("a")?.clone();
        let expected = checker.return_type.clone();
        checker.analyze(vec![ctx], &a, &|_checker, mut ctx, value| {
            let t = expect_typed(value)?;
            ctx.unify(&expected, &t)?;
            Ok(vec![(ctx, None)])
        })
    })
}

fn print_expr() -> Rule {
    expression(
        "print(_a)",
        vec![("a", Type::UVar(Ident::from("a")))],
        Type::None,
        "print_expr",
    )
}

fn print_stmt() -> Rule {
    let pattern = stmt_pattern("print(_a)");
    Rule::from_pattern(pattern, "print_stmt", |checker, ctx, caps, _k| {
        let a = caps.node("a")?.clone();
        checker.analyze(vec![ctx], &a, &|_checker, ctx, _value| Ok(vec![(ctx, None)]))
    })
}

/// Parses a pattern and keeps the statement wrapper, for rules that match a
/// statement position rather than the expression inside it.
fn stmt_pattern(source: &str) -> Ast {
    let module = shapecheck_parser::parse_pattern_raw(source).expect("invalid rule pattern");
    let Node::Module { mut body } = module.node else {
        panic!("pattern is not a module");
    };
    body.remove(0)
}
