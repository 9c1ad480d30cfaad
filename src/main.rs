use std::io::{self, BufRead, Write};
use std::time::Duration;
use std::{env, fs, path::Path};

use kotolang::bytecode::{compile, disasm::print_chunk};
use kotolang::frontend::{lexer::Lexer, token_dumper::TokenDumper};
use kotolang::runtime::{ConsoleDevice, InterpretResult, PacedDriver, StdoutSink, Vm, VmConfig};
use log::{LevelFilter, Log, Metadata, Record};

/// Minimal stderr logger for `--debug` and `--trace`.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

struct Options {
    tokens_only: bool,
    no_color: bool,
    bytecode: bool,
    step_ms: Option<u64>,
    trace: bool,
    debug: bool,
    max_steps: Option<usize>,
    repl: bool,
    filename: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        tokens_only: false,
        no_color: false,
        bytecode: false,
        step_ms: None,
        trace: false,
        debug: false,
        max_steps: None,
        repl: false,
        filename: None,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--tokens" => options.tokens_only = true,
            "--no-color" => options.no_color = true,
            "--bc" | "--bytecode" => options.bytecode = true,
            "--trace" => options.trace = true,
            "--debug" => options.debug = true,
            "--repl" | "-i" => options.repl = true,
            "--step" => {
                let value = iter.next().ok_or("--step needs a value in milliseconds")?;
                let ms = value
                    .parse()
                    .map_err(|_| format!("invalid --step value '{}'", value))?;
                options.step_ms = Some(ms);
            }
            "--max-steps" => {
                let value = iter.next().ok_or("--max-steps needs a value")?;
                let n = value
                    .parse()
                    .map_err(|_| format!("invalid --max-steps value '{}'", value))?;
                options.max_steps = Some(n);
            }
            "--help" | "-h" => return Err(String::new()),
            flag if flag.starts_with('-') => return Err(format!("unknown flag '{}'", flag)),
            // first non-flag argument is the filename
            file => {
                if options.filename.is_none() {
                    options.filename = Some(file.to_string());
                }
            }
        }
    }

    Ok(options)
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("Error: {}", message);
            }
            print_usage();
            std::process::exit(64);
        }
    };

    install_logger(&options);

    match &options.filename {
        Some(filename) => {
            ensure_extension(filename);
            match fs::read_to_string(filename) {
                Ok(source) => {
                    if options.tokens_only {
                        dump_tokens(&source, options.no_color);
                    } else {
                        run_file(&source, &options);
                    }
                }
                Err(e) => {
                    eprintln!("Failed to read '{}': {}", filename, e);
                    std::process::exit(74);
                }
            }
        }
        None => {
            if options.repl || args.len() == 1 {
                repl(&options);
            } else {
                print_usage();
            }
        }
    }
}

fn install_logger(options: &Options) {
    let level = if options.trace {
        LevelFilter::Trace
    } else if options.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn ensure_extension(filename: &str) {
    let path = Path::new(filename);
    if path.extension().and_then(|e| e.to_str()) != Some("koto") {
        eprintln!("Error: expected a .koto file, got {}", filename);
        std::process::exit(64);
    }
}

fn print_usage() {
    println!("KOTO - scripting for host devices");
    println!();
    println!("Usage:");
    println!("  koto                        Start interactive REPL");
    println!("  koto <file.koto>            Run a program");
    println!("  koto --repl, -i             Start interactive REPL");
    println!("  koto --tokens <file>        Show tokens only (--no-color for plain)");
    println!("  koto --bc <file.koto>       Print bytecode before running");
    println!("  koto --step <ms> <file>     Run one instruction every <ms> milliseconds");
    println!("  koto --max-steps <n> <file> Stop with an error after <n> instructions");
    println!("  koto --debug, --trace       Log compiler and VM diagnostics to stderr");
    println!("  koto --help, -h             Show this help");
}

fn dump_tokens(source: &str, no_color: bool) {
    let tokens = Lexer::new(source).tokenize();

    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }

    dumper.dump(&tokens);
}

fn vm_config(options: &Options) -> VmConfig {
    VmConfig {
        max_steps: options.max_steps,
        trace_execution: options.trace,
        ..VmConfig::default()
    }
}

fn run_file(source: &str, options: &Options) {
    let mut vm = Vm::with_config(vm_config(options), StdoutSink, ConsoleDevice);

    if options.bytecode {
        // diagnostics are reported by the VM below
        if let Ok(chunk) = compile(source) {
            print_chunk(&chunk, "script");
        }
    }

    let result = match vm.load(source) {
        InterpretResult::Stepping => match options.step_ms {
            Some(ms) => PacedDriver::new(Duration::from_millis(ms)).drive(&mut vm),
            None => vm.run(),
        },
        other => other,
    };

    match result {
        InterpretResult::CompileError => std::process::exit(65),
        InterpretResult::RuntimeError => std::process::exit(70),
        InterpretResult::Ok | InterpretResult::Stepping => {}
    }
}

fn repl(options: &Options) {
    let mut vm = Vm::with_config(vm_config(options), StdoutSink, ConsoleDevice);
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                vm.interpret(&line);
            }
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                break;
            }
        }
    }
}
