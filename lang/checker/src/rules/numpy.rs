//! The numpy demo bundle: shape-indexed signatures for a handful of array
//! builders, plus the `import numpy as np` prelude binding.

use shapecheck_ast::Ident;
use shapecheck_types::{AExp, Type};

use crate::checker::Rule;
use crate::rules::expression;

/// `np.zeros`, `add_row`, `smush` and the numpy import.
pub fn numpy_rules() -> Vec<Rule> {
    let a = || AExp::Var(Ident::from("a"));
    vec![
        expression(
            "np.zeros(_a)",
            vec![("a", Type::Arith(a()))],
            Type::Array(a()),
            "arr_zeros",
        ),
        expression(
            "add_row(_a)",
            vec![("a", Type::Array(a()))],
            Type::Array(AExp::add(a(), AExp::Lit(1))),
            "add_row",
        ),
        expression(
            "smush(_a, _b)",
            vec![("a", Type::Array(a())), ("b", Type::Array(a()))],
            Type::Array(a()),
            "smush",
        ),
        import_numpy(),
    ]
}

fn import_numpy() -> Rule {
    Rule::new("import numpy as np", "import_numpy", |_checker, mut ctx, _caps, _k| {
        let a = Ident::from("a");
        let ones = Type::fun(
            Type::Tuple(vec![Type::Arith(AExp::Var(a.clone()))]),
            Type::Array(AExp::Var(a)),
        );
        ctx.annotate("np.ones", ones, false);
        Ok(vec![(ctx, None)])
    })
}
