use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;

use restruct::{Format, Settings, publish};

mod cli;
use cli::{Cli, Commands, OutputFormat};

fn read_all(path: Option<&PathBuf>) -> io::Result<String> {
    match path {
        Some(p) => fs::read_to_string(p),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn start_dir_for(input_path: &Option<PathBuf>) -> io::Result<PathBuf> {
    if let Some(p) = input_path {
        Ok(p.parent().unwrap_or(Path::new(".")).to_path_buf())
    } else {
        std::env::current_dir()
    }
}

fn load_settings(config: Option<&Path>, start_dir: &Path) -> Settings {
    match restruct::config::load(config, start_dir) {
        Ok((settings, path)) => {
            if let Some(path) = &path {
                log::debug!("Using config from: {}", path.display());
            } else {
                log::debug!("Using default config");
            }
            settings
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            file,
            format,
            report,
            halt,
            no_doctitle,
            no_docinfo,
        } => {
            let start_dir = start_dir_for(&file)?;
            let mut settings = load_settings(cli.config.as_deref(), &start_dir);
            if let Some(level) = report {
                settings.report_level = level;
            }
            if let Some(level) = halt {
                settings.halt_level = level;
            }
            if no_doctitle {
                settings.doctitle_xform = false;
            }
            if no_docinfo {
                settings.docinfo_xform = false;
            }
            if let Some(path) = &file {
                settings.source = Some(path.display().to_string());
                if settings.input_dir.is_none() {
                    settings.input_dir = Some(start_dir.clone());
                }
            }

            let input = read_all(file.as_ref())?;
            let format = match format {
                OutputFormat::Pseudoxml => Format::PseudoXml,
                OutputFormat::Xml => Format::Xml,
            };
            match publish(&input, &settings, format) {
                Ok(output) => {
                    print!("{output}");
                    Ok(())
                }
                Err(restruct::Error::Halt { level, .. }) => {
                    eprintln!("Exiting due to level-{level} system message.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
