use clap::Parser;
use dirs::home_dir;
use log::{debug, info};
use nu_ansi_term::{Color, Style};
use reedline::{DefaultHinter, FileBackedHistory, Reedline, Signal};
use slate::{
    cli::{Args, Commands},
    error::{Error, Result},
    extensions::ResultExtensions,
    parser::parse,
    repl::{REPLPrompt, REPLValidator, SyntaxHighlighter},
    runtime::{run, Evaluation},
    stdlib::create_standard_env,
    tokenizer::tokenize,
};
use std::{fs, path::PathBuf, process::ExitCode};

const HISTORY_SIZE: usize = 100;

// sysexits.h
const EX_DATAERR: u8 = 65;
const EX_IOERR: u8 = 74;

fn report(err: &Error, source: &str) {
    eprintln!("{}", err.render(source).trim_end());
}

fn exit_code(err: &Error) -> ExitCode {
    match err {
        Error::IO(_) => ExitCode::from(EX_IOERR),
        _ => ExitCode::from(EX_DATAERR),
    }
}

/// Reads `file` and hands the source to `action`, reporting any error
/// against that source.
fn with_source(file: PathBuf, action: impl FnOnce(&str) -> Result<()>) -> ExitCode {
    let source = match fs::read_to_string(&file) {
        Ok(source) => source,
        Err(err) => {
            let err = Error::from(err);
            eprintln!("{}: {}", file.display(), err);
            return exit_code(&err);
        }
    };

    match action(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err, &source);
            exit_code(&err)
        }
    }
}

fn run_file(source: &str) -> Result<()> {
    let program = parse(source)?;
    let env = create_standard_env();

    let evaluation = run(&program, &env)?;
    if let Some(value) = evaluation.value {
        println!("{}", value);
    }

    Ok(())
}

fn check_file(source: &str) -> Result<()> {
    let program = parse(source)?;
    println!("ok: {} top-level statements", program.statements.len());
    Ok(())
}

fn dump_tokens(source: &str) -> Result<()> {
    for token in tokenize(source)? {
        println!(
            "| {} | {:>30} | {:>10}",
            token.location,
            token.kind.value().unwrap_or_default(),
            token.kind.name()
        );
    }
    Ok(())
}

fn dump_ast(source: &str) -> Result<()> {
    let program = parse(source)?;
    println!("{:#?}", program);
    Ok(())
}

fn print_evaluation(evaluation: &Evaluation) {
    if let Some(value) = &evaluation.value {
        println!("{}", Style::new().fg(Color::Yellow).paint(value.to_string()));
    } else if !evaluation.declared.is_empty() {
        println!(
            "{}",
            Style::new()
                .dimmed()
                .paint(format!("declared: {}", evaluation.declared.join(", ")))
        );
    }
}

fn run_repl() -> Result<()> {
    let mut line_editor = Reedline::create()
        .with_hinter(Box::new(
            DefaultHinter::default().with_style(Style::new().italic().fg(Color::LightGray)),
        ))
        .with_highlighter(Box::new(SyntaxHighlighter))
        .with_validator(Box::new(REPLValidator));

    // Add file-backed history if possible
    if let Some(history) = home_dir()
        .map(|home| home.join(".slate_history"))
        .and_then(|path| FileBackedHistory::with_file(HISTORY_SIZE, path).ok())
        .map(Box::new)
    {
        line_editor = line_editor.with_history(history);
    } else {
        eprintln!("NOTE: Failed to load history. Persistence is now disabled.")
    }

    let prompt = REPLPrompt;
    let env = create_standard_env();

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(buffer) => {
                Result::pure(())
                    .and_then(|_| parse(&buffer))
                    .inspect(|program| debug!("parsed {} statements", program.statements.len()))
                    .and_then(|program| run(&program, &env))
                    .inspect(print_evaluation)
                    .inspect_err(|err| report(err, &buffer))
                    .ok();
            }
            Signal::CtrlD | Signal::CtrlC => {
                break Ok(());
            }
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Run { file } => {
            info!("FILE MODE");
            debug!("file: {:?}", file);

            with_source(file, run_file)
        }
        Commands::Check { file } => {
            info!("CHECK MODE");
            debug!("file: {:?}", file);

            with_source(file, check_file)
        }
        Commands::Tokens { file } => {
            info!("TOKENS MODE");
            debug!("file: {:?}", file);

            with_source(file, dump_tokens)
        }
        Commands::Ast { file } => {
            info!("AST MODE");
            debug!("file: {:?}", file);

            with_source(file, dump_ast)
        }
        Commands::Repl => {
            info!("REPL MODE");

            match run_repl() {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("{}", err);
                    exit_code(&err)
                }
            }
        }
    }
}
