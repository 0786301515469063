use std::path::PathBuf;

use log::info;

use shapecheck_driver::CheckOptions;

#[derive(clap::Args)]
pub struct Args {
    /// The source file to check
    #[clap(value_parser, value_name = "FILE")]
    file: PathBuf,
    /// Verify after every statement instead of only at the end
    #[clap(long)]
    careful: bool,
    /// Do not install the numpy demo rules
    #[clap(long)]
    no_prelude: bool,
}

pub fn exec(args: Args) -> Result<(), Vec<miette::Report>> {
    let source = std::fs::read_to_string(&args.file).map_err(|err| {
        vec![miette::Report::msg(format!(
            "Cannot read {}: {err}",
            args.file.display()
        ))]
    })?;
    let opts = CheckOptions { careful: args.careful, prelude: !args.no_prelude };
    shapecheck_driver::check_source_with(&source, &opts)?;
    info!("{}: OK", args.file.display());
    println!("OK");
    Ok(())
}
