use std::collections::BTreeMap;

use miette::{LabeledSpan, MietteDiagnostic, SourceSpan};

use shapecheck_checker::TypeError;

/// Converts an error tree into a renderable report against the source text.
///
/// A single failure path points at the innermost site with the underlying
/// error; a multi-path aggregate is summarized as a histogram (value errors,
/// unbound identifiers, unification failures grouped by reason, confusion
/// errors), with the value-error details spelled out when there are any.
pub fn to_report(source: &str, err: &TypeError) -> miette::Report {
    miette::Report::new(build_diagnostic(err)).with_source_code(source.to_owned())
}

fn build_diagnostic(err: &TypeError) -> MietteDiagnostic {
    let paths = error_paths(err);
    if paths.len() == 1 { single_path(&paths[0]) } else { multi_path(&paths) }
}

/// All root-to-leaf failure paths through the aggregation nodes.
fn error_paths(err: &TypeError) -> Vec<Vec<&TypeError>> {
    match err {
        TypeError::RulesFailed { errors, .. } => {
            let mut paths = Vec::new();
            for (_, sub) in errors {
                for mut tail in error_paths(sub) {
                    let mut path = vec![err];
                    path.append(&mut tail);
                    paths.push(path);
                }
            }
            paths
        }
        _ => vec![vec![err]],
    }
}

fn span_of(err: &TypeError) -> Option<SourceSpan> {
    match err {
        TypeError::UnboundIdentifier { span, .. }
        | TypeError::Value { span, .. }
        | TypeError::NoApplicableRule { span }
        | TypeError::RulesFailed { span, .. }
        | TypeError::UnsatisfiableConstraint { span } => *span,
        TypeError::Unification(_) | TypeError::Impossible { .. } => None,
    }
}

/// The source position a failure path points at: the leaf's own span if it
/// has one, otherwise the innermost aggregation site above it.
fn site_of(path: &[&TypeError]) -> Option<SourceSpan> {
    let leaf = path.last()?;
    span_of(leaf).or_else(|| {
        path.iter().rev().skip(1).find_map(|err| span_of(err))
    })
}

fn single_path(path: &[&TypeError]) -> MietteDiagnostic {
    let leaf = path.last().expect("paths are never empty");
    let mut diag = MietteDiagnostic::new(leaf.to_string());
    if let Some(span) = site_of(path) {
        diag = diag.with_label(LabeledSpan::new_with_span(Some("here".to_owned()), span));
    }
    diag
}

fn multi_path(paths: &[Vec<&TypeError>]) -> MietteDiagnostic {
    let mut value_paths = Vec::new();
    let mut unbound = 0usize;
    let mut unification: BTreeMap<String, usize> = BTreeMap::new();
    let mut confusion_paths = Vec::new();

    for path in paths {
        match path.last().expect("paths are never empty") {
            TypeError::UnboundIdentifier { .. } => unbound += 1,
            TypeError::Unification(err) => {
                *unification.entry(err.reason.clone()).or_insert(0) += 1;
            }
            TypeError::NoApplicableRule { .. } => confusion_paths.push(path),
            _ => value_paths.push(path),
        }
    }

    let mut summary: Vec<String> = Vec::new();
    if !value_paths.is_empty() {
        summary.push(format!("{} value errors", value_paths.len()));
    }
    if unbound > 0 {
        summary.push(format!("{unbound} unbound identifier errors"));
    }
    let mut grouped: Vec<(&String, &usize)> = unification.iter().collect();
    grouped.sort_by_key(|(_, count)| std::cmp::Reverse(**count));
    for (reason, count) in grouped {
        summary.push(format!("{count} unification errors ({reason})"));
    }
    if !confusion_paths.is_empty() {
        summary.push(format!("{} confusion errors", confusion_paths.len()));
    }

    let message = format!("Among\n  {}", summary.join("\n  "));

    // Detail the value errors when there are any, otherwise the confusions,
    // otherwise point at every distinct failing site.
    let detailed: Vec<&Vec<&TypeError>> = if !value_paths.is_empty() {
        value_paths
    } else if !confusion_paths.is_empty() {
        confusion_paths
    } else {
        paths.iter().collect()
    };

    let mut labels = Vec::new();
    let mut seen: Vec<(Option<SourceSpan>, String)> = Vec::new();
    for path in detailed {
        let leaf = path.last().expect("paths are never empty");
        let entry = (site_of(path), leaf.to_string());
        if seen.contains(&entry) {
            continue;
        }
        if let (Some(span), text) = (&entry.0, &entry.1) {
            labels.push(LabeledSpan::new_with_span(Some(text.clone()), *span));
        }
        seen.push(entry);
    }

    MietteDiagnostic::new(message).with_labels(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapecheck_ast::{Ast, Node, NodeId, Span};
    use shapecheck_types::UnificationError;

    fn node(start: u32, end: u32) -> Ast {
        Ast::new(NodeId::fresh(), Span::new(start, end), Node::Pass)
    }

    fn unif(reason: &str) -> TypeError {
        TypeError::Unification(UnificationError {
            lhs: "a".to_owned(),
            rhs: "b".to_owned(),
            reason: reason.to_owned(),
        })
    }

    #[test]
    fn single_path_reports_the_underlying_error() {
        let err = TypeError::rules_failed(&node(0, 5), vec![("assign".to_owned(), unif("x"))]);
        let diag = build_diagnostic(&err);
        assert!(diag.message.contains("Cannot unify"));
    }

    #[test]
    fn multi_path_reports_a_histogram() {
        let err = TypeError::rules_failed(
            &node(0, 5),
            vec![
                ("assign".to_owned(), unif("bool vs None")),
                ("ident".to_owned(), unif("bool vs None")),
                ("other".to_owned(), TypeError::unbound("x", Span::new(1, 2))),
            ],
        );
        let diag = build_diagnostic(&err);
        assert!(diag.message.starts_with("Among"));
        assert!(diag.message.contains("2 unification errors (bool vs None)"));
        assert!(diag.message.contains("1 unbound identifier errors"));
    }

    #[test]
    fn confusion_renders_the_phrase_no_applicable_rule() {
        let err = TypeError::confusion(&node(0, 3));
        let diag = build_diagnostic(&err);
        assert!(diag.message.contains("No applicable rule"));
    }
}
