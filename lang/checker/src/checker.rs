use std::fmt;
use std::rc::Rc;

use fxhash::FxHashMap;
use log::trace;

use shapecheck_ast::{Ast, NodeId};
use shapecheck_printer::Print;
use shapecheck_types::Type;

use crate::context::Context;
use crate::pattern::{matches, Captures};
use crate::result::{CheckResult, TypeError};
use crate::verify::verify;

/// The result a rule produces for one node: a type for expressions, nothing
/// for statements.
pub type Value = Option<Type>;

/// The nondeterministic outcome list of an action or continuation.
pub type Outcomes = Vec<(Context, Value)>;

/// A continuation over one outcome. The default continuation is the identity
/// wrapped in a singleton list.
pub type Cont<'a> = dyn Fn(&mut Checker, Context, Value) -> CheckResult<Outcomes> + 'a;

pub fn no_op(_checker: &mut Checker, ctx: Context, value: Value) -> CheckResult<Outcomes> {
    Ok(vec![(ctx, value)])
}

pub type Action =
    Rc<dyn Fn(&mut Checker, Context, &Captures, &Cont<'_>) -> CheckResult<Outcomes>>;

/// A typechecking rule: a pattern, an action run on each match, and a name
/// for diagnostics.
#[derive(Clone)]
pub struct Rule {
    pub name: String,
    source: Option<String>,
    pub pattern: Ast,
    pub action: Action,
}

impl Rule {
    /// Builds a rule from a pattern surface string.
    pub fn new(
        pattern: &str,
        name: &str,
        action: impl Fn(&mut Checker, Context, &Captures, &Cont<'_>) -> CheckResult<Outcomes>
        + 'static,
    ) -> Rule {
        let parsed = shapecheck_parser::parse_pattern(pattern).expect("invalid rule pattern");
        Rule {
            name: name.to_owned(),
            source: Some(pattern.to_owned()),
            pattern: parsed,
            action: Rc::new(action),
        }
    }

    /// Builds a rule from an already-constructed pattern AST.
    pub fn from_pattern(
        pattern: Ast,
        name: &str,
        action: impl Fn(&mut Checker, Context, &Captures, &Cont<'_>) -> CheckResult<Outcomes>
        + 'static,
    ) -> Rule {
        Rule { name: name.to_owned(), source: None, pattern, action: Rc::new(action) }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).field("source", &self.source).finish()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{source} ({})", self.name),
            None => write!(f, "{} ({})", self.pattern.print_trace(), self.name),
        }
    }
}

type MemoEntry = CheckResult<Vec<(usize, Outcomes)>>;

/// The rule evaluator.
///
/// Dispatches nodes to matching rules, fans out over candidate results,
/// aggregates failures, and memoizes both the per-node rule matches (keyed by
/// the structural tree) and the evaluation outcomes (keyed by node identity
/// plus the incoming context set).
pub struct Checker {
    rules: Rc<Vec<Rule>>,
    pub return_type: Type,
    pub careful: bool,
    memo: FxHashMap<(NodeId, Vec<Context>), MemoEntry>,
    ast_memo: FxHashMap<Ast, Rc<Vec<(usize, Captures)>>>,
}

impl Checker {
    pub fn new(rules: Vec<Rule>) -> Self {
        Checker {
            rules: Rc::new(rules),
            return_type: Type::None,
            careful: false,
            memo: FxHashMap::default(),
            ast_memo: FxHashMap::default(),
        }
    }

    pub fn returning(mut self, return_type: Type) -> Self {
        self.return_type = return_type;
        self
    }

    /// Runs `f` with a different expected return type, as when descending
    /// into a function body.
    pub fn with_return<T>(&mut self, return_type: Type, f: impl FnOnce(&mut Checker) -> T) -> T {
        let saved = std::mem::replace(&mut self.return_type, return_type);
        let out = f(self);
        self.return_type = saved;
        out
    }

    /// Rules matching this node, memoized on the structural tree so that
    /// repeated shapes are matched once.
    fn matching_rules(&mut self, ast: &Ast) -> Rc<Vec<(usize, Captures)>> {
        if let Some(found) = self.ast_memo.get(ast) {
            return Rc::clone(found);
        }
        let rules = Rc::clone(&self.rules);
        let found: Vec<(usize, Captures)> = rules
            .iter()
            .enumerate()
            .filter_map(|(idx, rule)| matches(&rule.pattern, ast).map(|caps| (idx, caps)))
            .collect();
        let found = Rc::new(found);
        self.ast_memo.insert(ast.clone(), Rc::clone(&found));
        found
    }

    /// Runs every matching rule on every context, then threads the caller's
    /// continuation through each option's outcome list.
    ///
    /// Raises `NoApplicableRule` if nothing matched, `RulesFailed` if every
    /// match threw. An option only survives the continuation phase if the
    /// continuation succeeds on all of its outcomes; the first surviving
    /// option short-circuits.
    pub fn analyze(
        &mut self,
        contexts: Vec<Context>,
        ast: &Ast,
        k: &Cont<'_>,
    ) -> CheckResult<Outcomes> {
        let key = (ast.id, contexts);

        let options: Vec<(usize, Outcomes)> = match self.memo.get(&key) {
            Some(cached) => {
                trace!("memo hit at node {}", ast.id);
                cached.clone()?
            }
            None => {
                let found = self.matching_rules(ast);
                let rules = Rc::clone(&self.rules);
                let mut options: Vec<(usize, Outcomes)> = Vec::new();
                for ctx in &key.1 {
                    let mut errors: Vec<(String, TypeError)> = Vec::new();
                    for (rule_idx, captures) in found.iter() {
                        let rule = &rules[*rule_idx];
                        trace!("{} |- {}", rule.name, ast.print_trace());
                        match (rule.action)(self, ctx.clone(), captures, &no_op) {
                            Ok(outcomes) => options.push((*rule_idx, outcomes)),
                            Err(err) => errors.push((rule.name.clone(), err)),
                        }
                    }
                    // Raised as soon as one incoming context yields nothing,
                    // even though a later context might succeed.
                    if options.is_empty() {
                        let err = if errors.is_empty() {
                            TypeError::confusion(ast)
                        } else {
                            TypeError::rules_failed(ast, errors)
                        };
                        self.memo.insert(key.clone(), Err(err.clone()));
                        return Err(err);
                    }
                }
                self.memo.insert(key, Ok(options.clone()));
                options
            }
        };

        let mut errors: Vec<(String, TypeError)> = Vec::new();
        for (rule_idx, outcomes) in options {
            let rule_name = self.rules[rule_idx].name.clone();
            let mut results = Vec::new();
            let mut failure = None;
            for (ctx, value) in outcomes {
                match k(self, ctx, value) {
                    Ok(more) => results.extend(more),
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }
            match failure {
                None => return Ok(results),
                Some(err) => errors.push((rule_name, err)),
            }
        }
        if errors.is_empty() {
            Err(TypeError::confusion(ast))
        } else {
            Err(TypeError::rules_failed(ast, errors))
        }
    }

    /// Checks a whole module: analyzes it from an empty context and verifies
    /// the resulting context set as one disjunction. On an unsatisfiable
    /// constraint, retries once in careful mode, which verifies after every
    /// statement and thereby localizes the offending line.
    pub fn check(&mut self, ast: &Ast) -> CheckResult<Vec<Context>> {
        match self.run(ast) {
            Err(err) if !self.careful && err.mentions_unsat() => {
                trace!("retrying in careful mode");
                self.careful = true;
                let result = self.run(ast);
                self.careful = false;
                match result {
                    Err(careful_err) => Err(careful_err),
                    Ok(_) => Err(err),
                }
            }
            other => other,
        }
    }

    fn run(&mut self, ast: &Ast) -> CheckResult<Vec<Context>> {
        // Outcome memo entries live for one run; among other things this lets
        // the careful retry actually re-execute and localize. Rule matches are
        // context-free and stay cached.
        self.memo.clear();
        let pairs = self.analyze(vec![Context::new()], ast, &no_op)?;
        let contexts: Vec<Context> = pairs.into_iter().map(|(ctx, _)| ctx).collect();
        verify(&contexts)?;
        Ok(contexts)
    }
}

#[cfg(test)]
mod tests {
    use shapecheck_parser::parse_pattern;
    use shapecheck_types::{AExp, BExp};

    use super::*;
    use crate::rules::{basic_rules, literal, numpy_rules};

    fn full_checker() -> Checker {
        let mut rule_set = basic_rules();
        rule_set.extend(numpy_rules());
        Checker::new(rule_set)
    }

    #[test]
    fn binary_operator_rules_return_fresh_variable_shapes() {
        let mut checker = full_checker();
        let expr = parse_pattern("1 + 2").unwrap();
        let outcomes = checker.analyze(vec![Context::new()], &expr, &no_op).unwrap();
        assert_eq!(outcomes.len(), 1);
        let Some(Type::Arith(AExp::Add(lhs, rhs))) = &outcomes[0].1 else {
            panic!("expected an addition type");
        };
        let (AExp::EVar(l), AExp::EVar(r)) = (&**lhs, &**rhs) else {
            panic!("expected unification variables");
        };
        assert_ne!(l, r);
    }

    #[test]
    fn disjoint_rule_order_does_not_change_results() {
        let forwards = vec![
            literal("True", Type::Boolean(BExp::Lit(true)), "lit_True"),
            literal("False", Type::Boolean(BExp::Lit(false)), "lit_False"),
        ];
        let backwards = vec![
            literal("False", Type::Boolean(BExp::Lit(false)), "lit_False"),
            literal("True", Type::Boolean(BExp::Lit(true)), "lit_True"),
        ];
        let expr = parse_pattern("True").unwrap();
        let a = Checker::new(forwards).analyze(vec![Context::new()], &expr, &no_op).unwrap();
        let b = Checker::new(backwards).analyze(vec![Context::new()], &expr, &no_op).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unmatched_nodes_are_confusion_errors() {
        let mut checker = Checker::new(Vec::new());
        let expr = parse_pattern("True").unwrap();
        let err = checker.analyze(vec![Context::new()], &expr, &no_op).unwrap_err();
        assert!(matches!(err, TypeError::NoApplicableRule { .. }));
    }

    #[test]
    fn failing_rules_aggregate_their_errors() {
        let mut checker = full_checker();
        let expr = parse_pattern("missing_name").unwrap();
        let err = checker.analyze(vec![Context::new()], &expr, &no_op).unwrap_err();
        let TypeError::RulesFailed { errors, .. } = err else {
            panic!("expected an aggregate error");
        };
        assert!(errors.iter().any(|(rule, err)| {
            rule == "ident" && matches!(err, TypeError::UnboundIdentifier { .. })
        }));
    }

    #[test]
    fn errors_are_memoized_per_context_set() {
        let mut checker = full_checker();
        let expr = parse_pattern("missing_name").unwrap();
        let first = checker.analyze(vec![Context::new()], &expr, &no_op).unwrap_err();
        let second = checker.analyze(vec![Context::new()], &expr, &no_op).unwrap_err();
        assert!(matches!(first, TypeError::RulesFailed { .. }));
        assert!(matches!(second, TypeError::RulesFailed { .. }));
    }
}
