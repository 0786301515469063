mod render_reports;
mod report;

pub use render_reports::*;
pub use report::*;

use log::debug;

use shapecheck_checker::{rules, Checker};

#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Verify after every statement from the start instead of only on retry.
    pub careful: bool,
    /// Install the numpy demo bundle next to the basic rules.
    pub prelude: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions { careful: false, prelude: true }
    }
}

/// Builds a checker with the configured rule set.
pub fn make_checker(opts: &CheckOptions) -> Checker {
    let mut rule_set = rules::basic_rules();
    if opts.prelude {
        rule_set.extend(rules::numpy_rules());
    }
    let mut checker = Checker::new(rule_set);
    checker.careful = opts.careful;
    checker
}

/// Parses and checks a source text; on failure, returns renderable reports.
pub fn check_source_with(source: &str, opts: &CheckOptions) -> Result<(), Vec<miette::Report>> {
    let ast = shapecheck_parser::parse(source)
        .map_err(|err| vec![miette::Report::new(err).with_source_code(source.to_owned())])?;
    let mut checker = make_checker(opts);
    match checker.check(&ast) {
        Ok(contexts) => {
            debug!("accepted with {} candidate context(s)", contexts.len());
            Ok(())
        }
        Err(err) => Err(vec![to_report(source, &err)]),
    }
}

pub fn check_source(source: &str) -> Result<(), Vec<miette::Report>> {
    check_source_with(source, &CheckOptions::default())
}
