use pretty::DocAllocator;
use pretty::termcolor::ColorSpec;

pub type Alloc<'a> = pretty::Arena<'a, ColorSpec>;
pub type Builder<'a> = pretty::DocBuilder<'a, Alloc<'a>, ColorSpec>;

#[derive(Debug, Clone)]
pub struct PrintCfg {
    pub width: usize,
    pub indent: isize,
}

impl Default for PrintCfg {
    fn default() -> Self {
        Self { width: crate::DEFAULT_WIDTH, indent: 4 }
    }
}

pub trait Print {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a>;

    fn print_to_string(&self, cfg: Option<&PrintCfg>) -> String {
        let alloc = Alloc::new();
        let default_cfg = PrintCfg::default();
        let cfg = cfg.unwrap_or(&default_cfg);
        let mut buf = Vec::new();
        {
            let doc_builder = self.print(cfg, &alloc);
            doc_builder.1.render(cfg.width, &mut buf).expect("Failed to print to string");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// One-line rendering for trace logs.
    fn print_trace(&self) -> String {
        let cfg = PrintCfg { width: 4096, ..PrintCfg::default() };
        self.print_to_string(Some(&cfg))
    }
}

impl<T: Print> Print for Box<T> {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        (**self).print(cfg, alloc)
    }
}

impl<T: Print> Print for Option<T> {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        match self {
            Some(inner) => inner.print(cfg, alloc),
            None => alloc.nil(),
        }
    }
}

impl<T: Print> Print for &T {
    fn print<'a>(&'a self, cfg: &PrintCfg, alloc: &'a Alloc<'a>) -> Builder<'a> {
        (**self).print(cfg, alloc)
    }
}
