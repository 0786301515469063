mod cli;

fn main() {
    miette::set_panic_hook();
    env_logger::init();

    if let Err(errors) = cli::exec() {
        let mut stderr = std::io::stderr().lock();
        shapecheck_driver::render_reports_io(&mut stderr, &errors, use_color());
        std::process::exit(1);
    }
}

fn use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}
