//! End-to-end acceptance scenarios, run with the numpy demo bundle installed.

use shapecheck_driver::{check_source, check_source_with, render_reports_to_string, CheckOptions};

fn accepts(source: &str) {
    if let Err(reports) = check_source(source) {
        panic!(
            "expected acceptance, got:\n{}",
            render_reports_to_string(&reports, false)
        );
    }
}

fn rejects(source: &str) -> String {
    match check_source(source) {
        Ok(()) => panic!("expected rejection of:\n{source}"),
        Err(reports) => render_reports_to_string(&reports, false),
    }
}

#[test]
fn rebinding_to_a_different_kind_is_rejected() {
    let rendered = rejects("a = True\na = None\n");
    assert!(rendered.contains("boolean expression vs None"), "got:\n{rendered}");
}

#[test]
fn boolean_and_arithmetic_literals_are_accepted() {
    accepts("a = True or False\na = not False\nb = (1 + 1) * (1 + 1 + 1)\nc = np.zeros(3)\n");
}

#[test]
fn mismatched_array_lengths_are_rejected() {
    rejects("d = add_row(np.zeros(3))\ne = add_row(d)\nf = smush(d, e)\n");
}

#[test]
fn branch_with_contradictory_shape_equation_is_rejected() {
    rejects(
        "def f(p: bool, a: int, b: array[a]) -> array[a + 1]:\n    if p:\n        return np.zeros(1 + a)\n    else:\n        return smush(add_row(b), np.zeros(a + 2))\n",
    );
}

#[test]
fn imported_builders_with_matching_shapes_are_accepted() {
    accepts("import numpy as np\na = np.ones(3)\nb = np.zeros(3)\nc = smush(a, b)\n");
}

#[test]
fn imported_builders_with_mismatched_shapes_are_rejected() {
    rejects("import numpy as np\na = np.ones(3)\nb = np.zeros(4)\nc = smush(a, b)\n");
}

#[test]
fn annotated_assignment_of_wrong_kind_is_rejected() {
    rejects("b: bool = None\n");
}

#[test]
fn annotated_assignment_of_boolean_expression_is_accepted() {
    accepts("b: bool = (True or False) and True\n");
}

#[test]
fn declared_annotation_binds_later_assignments() {
    rejects("b: bool\nb = None\n");
}

#[test]
fn higher_order_lambdas_are_accepted() {
    accepts(
        "compose = lambda f, g: lambda x: f(g(x))\nflip = lambda f: lambda a: lambda b: f(b)(a)\n",
    );
}

#[test]
fn refinement_assignment_allows_rebinding_numbers() {
    accepts(
        "n = 1\nm = 1\nif False:\n    n = n + 1\nelse:\n    m = m + 1\na = np.zeros(n + m)\nb = smush(a, np.zeros(3))\n",
    );
}

#[test]
fn function_definitions_generalize_per_call_site() {
    accepts("def succ(a: int) -> int:\n    return a + 1\nn = 3\na = np.zeros(succ(n))\n");
}

#[test]
fn unsupported_expressions_are_confusion_errors() {
    let rendered = rejects("a = np.zeros(3)\nb = a[0]\n");
    assert!(rendered.contains("No applicable rule"), "got:\n{rendered}");
}

#[test]
fn careful_mode_gives_the_same_verdicts() {
    let opts = CheckOptions { careful: true, ..CheckOptions::default() };
    assert!(check_source_with("c = np.zeros(3)\n", &opts).is_ok());
    assert!(
        check_source_with("d = add_row(np.zeros(3))\ne = add_row(d)\nf = smush(d, e)\n", &opts)
            .is_err()
    );
}

#[test]
fn prelude_can_be_disabled() {
    let opts = CheckOptions { prelude: false, ..CheckOptions::default() };
    assert!(check_source_with("c = np.zeros(3)\n", &opts).is_err());
}

#[test]
fn module_level_returns_check_against_the_expected_type() {
    use shapecheck_checker::{rules, Checker};
    use shapecheck_types::{AExp, Type};

    let mut rule_set = rules::basic_rules();
    rule_set.extend(rules::numpy_rules());
    let mut checker = Checker::new(rule_set).returning(Type::Array(AExp::Lit(3)));
    let ast = shapecheck_parser::parse(
        "a = add_row(np.zeros(2))\nreturn a\nb = np.zeros(3)\nreturn b\nc = np.zeros(1 + 1 + 1)\nreturn c\n",
    )
    .unwrap();
    checker.check(&ast).unwrap();
}

#[test]
fn memoization_is_verdict_neutral() {
    // Re-checking the same tree reuses the rule-match memo and re-derives the
    // outcome memo; the verdict and error class must not change.
    use shapecheck_checker::{rules, Checker, TypeError};

    let mut rule_set = rules::basic_rules();
    rule_set.extend(rules::numpy_rules());
    let mut checker = Checker::new(rule_set);
    let ast = shapecheck_parser::parse("a = True\na = None\n").unwrap();

    let first = checker.check(&ast).unwrap_err();
    let second = checker.check(&ast).unwrap_err();
    assert!(matches!(first, TypeError::RulesFailed { .. }));
    assert!(matches!(second, TypeError::RulesFailed { .. }));
}
