//! Common source texts for tests.

// Assignment grammar
pub const SINGLE_ASSIGNMENT: &str = "x = 5;";
pub const THREE_ASSIGNMENTS: &str = "a = 1;\nb = 2;\nc = 3;\n";
pub const COMMENTED_ASSIGNMENTS: &str = "# settings\nwidth = 80; # columns\nheight = 24;\n";
pub const PADDED_ASSIGNMENT: &str = "  \n x   =\t7 ;  \n";

// Recoverable errors
pub const MISSING_SEMICOLON: &str = "x = 5";
pub const DOUBLED_EQUALS: &str = "x = = 5;";
pub const EXTRA_NUMBERS: &str = "x = 5 6 7; y = 1;";
pub const MISSING_VALUE: &str = "x = ; y = 2;";
pub const GARBAGE: &str = "@@@ $$$";

// Expression grammar
pub const ARITHMETIC: &str = "1 + 2 * 3";
pub const PARENTHESIZED: &str = "(1 + 2) * 3";
