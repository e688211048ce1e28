use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "restruct")]
#[command(author, version)]
#[command(about = "A reStructuredText parser and document-transformation engine")]
#[command(
    long_about = "restruct parses reStructuredText into a Docutils-style document tree, runs \
    the standard transforms (title promotion, bibliographic fields, hyperlink and footnote \
    resolution, substitutions) and writes the tree as pseudo-XML or Docutils XML."
)]
#[command(after_help = "\
EXAMPLES:

    # Show the document tree of a file
    restruct parse document.rst

    # Read from stdin
    cat document.rst | restruct parse

    # Docutils XML instead of pseudo-XML
    restruct parse --format xml document.rst

    # Report everything, halt on errors
    restruct parse --report 1 --halt 3 document.rst

CONFIGURATION:

restruct looks for configuration files in this order:
  1. Explicit --config path
  2. restruct.toml or .restruct.toml in current/parent directories
  3. ~/.config/restruct/config.toml (XDG)
  4. Built-in defaults

Example .restruct.toml:

    report_level = 2
    halt_level = 4
    doctitle_xform = true
    tab_width = 8

    [categories.reference]
    report_level = 3")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, global = true)]
    #[arg(help = "Path to configuration file")]
    #[arg(
        long_help = "Path to a custom configuration file. If not specified, restruct will \
        search for .restruct.toml or restruct.toml in the current directory and its parents, \
        then fall back to ~/.config/restruct/config.toml."
    )]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented tree dump
    Pseudoxml,
    /// Docutils generic XML
    Xml,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a reStructuredText document and print its document tree
    #[command(
        long_about = "Parse a reStructuredText document, apply the standard transforms and \
        print the resulting document tree. System messages at or above the report level are \
        written to stderr; a message at or above the halt level aborts processing with exit \
        code 1."
    )]
    #[command(after_help = "\
EXAMPLES:

    # Parse a file
    restruct parse document.rst

    # Parse from stdin
    echo 'Some *text*.' | restruct parse

    # Keep section titles where they are
    restruct parse --no-doctitle document.rst

MESSAGE LEVELS:

  1 info, 2 warning, 3 error, 4 severe, 5 none")]
    Parse {
        /// Input file (stdin if not provided)
        #[arg(help = "Input file path")]
        #[arg(
            long_help = "Path to the input file to parse. If not provided, reads from stdin. \
            Relative paths in include directives resolve against the file's directory."
        )]
        file: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pseudoxml)]
        format: OutputFormat,

        /// Minimum level of system messages to report
        #[arg(long, value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(1..=5))]
        report: Option<u8>,

        /// Level of system message that aborts processing
        #[arg(long, value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(1..=5))]
        halt: Option<u8>,

        /// Do not promote a lone top-level section title to document title
        #[arg(long)]
        no_doctitle: bool,

        /// Do not turn a leading field list into bibliographic docinfo
        #[arg(long)]
        no_docinfo: bool,
    },
}
