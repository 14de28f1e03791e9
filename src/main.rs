use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use brief::debugger::{Debugger, Stop};
use brief::diagnostic::{Diagnostic, ansi::AnsiRenderer, json, registry};
use brief::interpreter::{self, Halt};
use brief::machine::{Item, Machine};
use brief::{Registry, image, parser};

#[derive(Parser, Debug)]
#[command(name = "brief", version)]
#[command(about = "Run, debug and resume Brief programs one step at a time")]
struct Cli {
    /// Print results and diagnostics as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Never colour diagnostics
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a source file
    Run {
        file: PathBuf,

        /// Stop after this many steps; the machine stays resumable
        #[arg(long)]
        max_steps: Option<u64>,

        /// One JSON line per step on stderr
        #[arg(long)]
        trace: bool,

        /// Save the final (or faulting) machine to this image file
        #[arg(long, value_name = "OUT")]
        save_image: Option<PathBuf>,
    },
    /// Continue a saved image from where it stopped
    Resume {
        image: PathBuf,

        #[arg(long)]
        max_steps: Option<u64>,

        #[arg(long, value_name = "OUT")]
        save_image: Option<PathBuf>,
    },
    /// Step through a source file, reading commands from stdin
    Debug { file: PathBuf },
    /// Print an image as JSON
    Dump { image: PathBuf },
    /// Explain a diagnostic code, e.g. BRF-R001
    Explain { code: String },
}

struct Reporter {
    json: bool,
    color: bool,
}

impl Reporter {
    fn report(&self, d: &Diagnostic) {
        if self.json {
            eprintln!("{}", json::render(d));
        } else {
            eprint!("{}", AnsiRenderer { use_color: self.color }.render(d));
        }
    }
}

type CmdResult = Result<(), Diagnostic>;

fn main() {
    let cli = Cli::parse();
    let reporter = Reporter {
        json: cli.json,
        color: !cli.no_color && std::io::stderr().is_terminal(),
    };

    let result = match cli.command {
        Command::Run { file, max_steps, trace, save_image } => {
            cmd_run(&file, max_steps, trace, save_image.as_deref(), &reporter)
        }
        Command::Resume { image, max_steps, save_image } => {
            cmd_resume(&image, max_steps, save_image.as_deref(), &reporter)
        }
        Command::Debug { file } => cmd_debug(&file, &reporter),
        Command::Dump { image } => cmd_dump(&image),
        Command::Explain { code } => cmd_explain(&code),
    };

    if let Err(d) = result {
        reporter.report(&d);
        process::exit(1);
    }
}

fn read_program(path: &Path) -> Result<Vec<brief::Value>, Diagnostic> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| Diagnostic::error(format!("cannot read {}: {e}", path.display())))?;
    parser::read(&source).map_err(|e| Diagnostic::from(&e).with_source(source))
}

fn save(machine: &Machine, path: Option<&Path>) -> CmdResult {
    match path {
        Some(path) => image::save_file(machine, path).map_err(|e| Diagnostic::from(&e)),
        None => Ok(()),
    }
}

fn cmd_run(
    path: &Path,
    max_steps: Option<u64>,
    trace: bool,
    save_image: Option<&Path>,
    reporter: &Reporter,
) -> CmdResult {
    let program = read_program(path)?;
    let mut machine = Registry::with_builtins().boot();
    machine.splice(program);
    let outcome = if trace {
        interpreter::drive(machine, max_steps, |n, m| eprintln!("{}", trace_line(n, m)))
    } else {
        interpreter::run_with_limit(machine, Vec::new(), max_steps)
    };
    finish(outcome, save_image, reporter)
}

fn cmd_resume(
    path: &Path,
    max_steps: Option<u64>,
    save_image: Option<&Path>,
    reporter: &Reporter,
) -> CmdResult {
    let registry = Registry::with_builtins();
    let machine = image::load_file(path, &registry).map_err(|e| Diagnostic::from(&e))?;
    finish(interpreter::run_with_limit(machine, Vec::new(), max_steps), save_image, reporter)
}

/// Prints the stack, explains an early stop, and saves the image if asked.
/// A fault saves the machine it started from, so the failing unit is kept.
fn finish(
    outcome: Result<(Machine, Halt), interpreter::Fault>,
    save_image: Option<&Path>,
    reporter: &Reporter,
) -> CmdResult {
    let (machine, halt) = match outcome {
        Ok(done) => done,
        Err(fault) => {
            save(&fault.machine, save_image)?;
            return Err(Diagnostic::from(&fault));
        }
    };
    save(&machine, save_image)?;
    print_stack(&machine, halt, reporter.json);
    let pending = machine.continuation().len();
    let stopped = match halt {
        Halt::Settled => None,
        Halt::Breakpoint => Some("stopped at a breakpoint"),
        Halt::Exhausted => Some("step budget exhausted"),
    };
    if let Some(why) = stopped {
        let mut d = Diagnostic::warning(why).with_note(format!("{pending} unit(s) pending"));
        if let Some(path) = save_image {
            d = d.with_suggestion(format!("continue with `brief resume {}`", path.display()));
        }
        reporter.report(&d);
    }
    Ok(())
}

/// Bottom of the stack first.
fn bottom_up(machine: &Machine) -> Vec<brief::Value> {
    let mut values = machine.stack().to_vec();
    values.reverse();
    values
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum HaltKind {
    Settled,
    Breakpoint,
    Exhausted,
}

impl From<Halt> for HaltKind {
    fn from(halt: Halt) -> Self {
        match halt {
            Halt::Settled => HaltKind::Settled,
            Halt::Breakpoint => HaltKind::Breakpoint,
            Halt::Exhausted => HaltKind::Exhausted,
        }
    }
}

#[derive(Serialize)]
struct RunReport {
    halt: HaltKind,
    stack: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct TraceLine {
    step: u64,
    head: Option<String>,
    depth: usize,
    scope: usize,
}

/// Stack bottom first, continuation head first, dictionary frames outermost first.
#[derive(Serialize)]
struct ImageDump {
    stack: Vec<serde_json::Value>,
    continuation: Vec<serde_json::Value>,
    dictionary: Vec<serde_json::Value>,
}

fn to_json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
}

fn print_stack(machine: &Machine, halt: Halt, as_json: bool) {
    let values = bottom_up(machine);
    if as_json {
        let report = RunReport {
            halt: halt.into(),
            stack: values.iter().map(brief::Value::to_json).collect(),
        };
        println!("{}", to_json_line(&report));
    } else if !values.is_empty() {
        let line: Vec<String> = values.iter().map(ToString::to_string).collect();
        println!("{}", line.join(" "));
    }
}

fn trace_line(step: u64, machine: &Machine) -> String {
    to_json_line(&TraceLine {
        step,
        head: machine.head().map(ToString::to_string),
        depth: machine.stack().len(),
        scope: machine.scope().depth(),
    })
}

fn item_json(item: &Item) -> serde_json::Value {
    match item {
        Item::Value(v) => v.to_json(),
        Item::Marker(_) => serde_json::json!({ "marker": item.to_string() }),
    }
}

fn cmd_dump(path: &Path) -> CmdResult {
    let registry = Registry::with_builtins();
    let machine = image::load_file(path, &registry).map_err(|e| Diagnostic::from(&e))?;
    let dump = ImageDump {
        stack: bottom_up(&machine).iter().map(brief::Value::to_json).collect(),
        continuation: machine.continuation().iter().map(item_json).collect(),
        dictionary: machine
            .scope()
            .frames()
            .into_iter()
            .map(|frame| brief::Value::map(frame).to_json())
            .collect(),
    };
    let text = serde_json::to_string_pretty(&dump)
        .map_err(|e| Diagnostic::error(format!("cannot render image: {e}")))?;
    println!("{text}");
    Ok(())
}

fn cmd_explain(code: &str) -> CmdResult {
    match registry::lookup(code) {
        Some(entry) => {
            print!("{}", entry.long);
            Ok(())
        }
        None => Err(Diagnostic::error(format!("unknown error code '{code}'"))
            .with_suggestion("codes look like BRF-R001")),
    }
}

const DEBUG_HELP: &str = "i step in | o step over | u step out | s step | c continue | b back | p print | q quit";

fn describe(machine: &Machine) -> String {
    let stack: Vec<String> = bottom_up(machine).iter().map(ToString::to_string).collect();
    let next = machine.head().map_or_else(|| "(end)".to_string(), ToString::to_string);
    format!("stack: [{}]  next: {next}  scope: {}", stack.join(" "), machine.scope().depth())
}

fn cmd_debug(path: &Path, reporter: &Reporter) -> CmdResult {
    let program = read_program(path)?;
    let mut session = Debugger::new(Registry::with_builtins().boot());
    session.load(program);

    let stdin = std::io::stdin();
    let mut out = std::io::stdout();
    println!("{DEBUG_HELP}");
    println!("{}", describe(session.machine()));
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| Diagnostic::error(format!("cannot read stdin: {e}")))?;
        let outcome = match line.trim() {
            "i" => session.step_in(),
            "o" => session.step_over(),
            "u" => session.step_out(),
            "s" => session.step(),
            "c" => session.resume(),
            "b" => {
                if !session.back() {
                    println!("(no earlier state)");
                }
                Ok(Stop::Stepped)
            }
            "p" => Ok(Stop::Stepped),
            "q" => break,
            "" => continue,
            other => {
                println!("unknown command '{other}': {DEBUG_HELP}");
                continue;
            }
        };
        match outcome {
            Ok(Stop::Paused) => println!("(returned)"),
            Ok(Stop::Breakpoint) => println!("(breakpoint)"),
            Ok(Stop::Settled) => println!("(settled)"),
            Ok(Stop::Stepped) => {}
            Err(fault) => reporter.report(&Diagnostic::from(&fault)),
        }
        println!("{}", describe(session.machine()));
        out.flush().map_err(|e| Diagnostic::error(format!("cannot write stdout: {e}")))?;
    }
    Ok(())
}
