//! Command-line front end for the HTML+ERB parser.

use erb_lexer::Lexer;
use erb_parser::{Parser, ParserOptions};
use std::process::ExitCode;
use std::time::Instant;

fn print_usage() {
    println!("erb-parse [command] [options]\n");
    println!("HTML-aware ERB parsing and semantic analysis.\n");
    println!("erb-parse lex [file]       -  Lex a file");
    println!("erb-parse parse [file]     -  Parse and analyze a file (--silent, --json, --strict)");
    println!("erb-parse ruby [file]      -  Extract the embedded Ruby from a file");
    println!("erb-parse html [file]      -  Extract the HTML from a file");
    println!("erb-parse ruby-ast [file]  -  Parse the extracted Ruby and report diagnostics");
}

fn print_time_diff(start: Instant, verb: &str) {
    let elapsed = start.elapsed();
    let nanos = elapsed.as_nanos() as f64;

    println!("Finished {verb} in:\n");
    println!("  {:8.0} µs", nanos / 1e3);
    println!("  {:8.3} ms", nanos / 1e6);
    println!("  {:8.6}  s\n", nanos / 1e9);
}

fn read_source(path: &str) -> Result<String, ExitCode> {
    match std::fs::read_to_string(path) {
        Ok(source) => Ok(source),
        Err(error) => {
            eprintln!("Unable to read {path}: {error}");
            Err(ExitCode::FAILURE)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let command = match args.get(1) {
        Some(command) => command.as_str(),
        None => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let path = match args.get(2) {
        Some(path) => path.as_str(),
        None => {
            println!("Please specify input file.");
            return ExitCode::FAILURE;
        }
    };

    let source = match read_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let flags: Vec<&str> = args.iter().skip(3).map(String::as_str).collect();
    let start = Instant::now();

    match command {
        "lex" => {
            let (tokens, errors) = Lexer::new(&source).tokenize();

            for token in &tokens {
                println!("{token}");
            }
            for error in &errors {
                eprintln!("{error}");
            }

            print_time_diff(start, "lexing");
            ExitCode::SUCCESS
        }
        "parse" => {
            let options = ParserOptions { strict: flags.contains(&"--strict") };
            let document = Parser::with_options(&source, options).parse();

            if !flags.contains(&"--silent") {
                if flags.contains(&"--json") {
                    let errors: Vec<_> = document.all_errors();
                    match serde_json::to_string_pretty(&errors) {
                        Ok(rendered) => println!("{rendered}"),
                        Err(error) => eprintln!("Unable to render diagnostics: {error}"),
                    }
                } else {
                    println!("{}", document.to_sexp());

                    for error in document.all_errors() {
                        println!("{}: {}", error.kind(), error);
                    }
                }

                print_time_diff(start, "parsing");
            }

            ExitCode::SUCCESS
        }
        "ruby" => {
            println!("{}", erb_parser::extract_ruby(&source));
            print_time_diff(start, "extracting Ruby");
            ExitCode::SUCCESS
        }
        "html" => {
            println!("{}", erb_parser::extract_html(&source));
            print_time_diff(start, "extracting HTML");
            ExitCode::SUCCESS
        }
        "ruby-ast" => {
            println!("HTML+ERB File:\n{source}\n");

            let ruby_source = erb_parser::extract_ruby(&source);
            println!("Extracted Ruby:\n{ruby_source}\n");

            let result = erb_ruby::parse_partial(&ruby_source);

            if result.diagnostics.is_empty() {
                println!("No diagnostics.");
            } else {
                for diagnostic in &result.diagnostics {
                    println!("{} at {}", diagnostic.message, diagnostic.span);
                }
            }

            print_time_diff(start, "parsing Ruby");
            ExitCode::SUCCESS
        }
        other => {
            println!("Unknown Command: {other}");
            ExitCode::FAILURE
        }
    }
}
