use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use sexpr_plus::json::{to_json_string, to_json_string_pretty};
use sexpr_plus::{Node, ParseConfig, parse_with_config};
use std::panic;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The reader demo encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

/// How each successfully read top-level node is echoed back
#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputMode {
    /// Re-escaped source form
    Source,
    /// One JSON line per input
    Json,
    /// Indented JSON including every span
    PrettyJson,
}

fn run_repl() {
    println!("sexpr-plus reader");
    println!("Enter expressions like: (define x '(1 \"two\" ,@three))");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let Ok(mut rl) = DefaultEditor::new() else {
        eprintln!("Could not initialize line editor");
        return;
    };
    let mut mode = OutputMode::Source;
    let mut config = ParseConfig::default();

    loop {
        match rl.readline("read> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":json" => {
                        mode = if mode == OutputMode::Json {
                            OutputMode::Source
                        } else {
                            OutputMode::Json
                        };
                        println!("Output mode: {mode:?}");
                        continue;
                    }
                    ":pretty" => {
                        mode = if mode == OutputMode::PrettyJson {
                            OutputMode::Source
                        } else {
                            OutputMode::PrettyJson
                        };
                        println!("Output mode: {mode:?}");
                        continue;
                    }
                    ":shebang" => {
                        config.allow_shebang = !config.allow_shebang;
                        println!("Shebang lines skipped: {}", config.allow_shebang);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                match parse_with_config(line, config) {
                    Ok(nodes) => print_nodes(&nodes, mode),
                    Err(e) => {
                        println!("Error: {e}");
                        if let Some(context) = &e.context {
                            println!("Context: {context}");
                        }
                    }
                }
            }

            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_nodes(nodes: &[Node], mode: OutputMode) {
    match mode {
        OutputMode::Source => {
            if nodes.is_empty() {
                println!("(nothing read)");
            }
            for node in nodes {
                let span = node.span;
                println!("{node}    ; {}..{}", span.start, span.end);
            }
        }
        OutputMode::Json => println!("{}", to_json_string(nodes)),
        OutputMode::PrettyJson => match to_json_string_pretty(nodes) {
            Ok(text) => println!("{text}"),
            Err(e) => println!("Error: {e}"),
        },
    }
}

fn print_help() {
    println!("Reader commands:");
    println!("  :help    - Show this help message");
    println!("  :json    - Toggle compact JSON output");
    println!("  :pretty  - Toggle indented JSON output");
    println!("  :shebang - Toggle skipping of a leading #! line");
    println!("  :quit    - Exit");
    println!("  :exit    - Exit");
    println!("  Ctrl+C   - Exit");
    println!();
    println!("Syntax:");
    println!("  Atoms:    foo, 42, -1.5e3, weird\\ atom");
    println!("  Strings:  \"text with \\n escapes\"");
    println!("  Lists:    (a b (c))");
    println!("  Sugar:    'x `(a ,b ,@c)");
    println!("  Comments: ; to end of line");
    println!();
    println!("Set RUST_LOG=sexpr_plus=debug to see reader logging.");
}
