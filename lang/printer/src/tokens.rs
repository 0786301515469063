pub const ARROW: &str = "->";
pub const ASSERT: &str = "assert";
pub const COLON: &str = ":";
pub const COMMA: &str = ",";
pub const DEF: &str = "def";
pub const DOT: &str = ".";
pub const ELSE: &str = "else";
pub const EQUALS: &str = "=";
pub const IF: &str = "if";
pub const IMPORT: &str = "import";
pub const LAMBDA: &str = "lambda";
pub const PASS: &str = "pass";
pub const RETURN: &str = "return";
pub const TILDE: &str = "~";
