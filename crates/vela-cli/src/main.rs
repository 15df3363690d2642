//! Vela backend CLI
//!
//! Consumes resolved units (JSON written by the front end) and drives
//! type elaboration, lowering and C generation.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use vela_codegen::{CBackend, CFunction, CodeGen, FlowGraph};
use vela_error::{Diagnostic, DiagnosticRenderer, SourceMap};
use vela_front::Unit;
use vela_lower::{lower_unit, LoweredUnit};

#[derive(Parser)]
#[command(name = "velac")]
#[command(version = "0.1.0")]
#[command(about = "Vela backend: resolved units to C", long_about = None)]
struct Cli {
    /// Trace backend phases to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compiles a unit to a native executable
    Build {
        /// Resolved unit (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Original source text, for diagnostic snippets
        #[arg(long, value_name = "FILE")]
        source: Option<PathBuf>,
    },

    /// Checks a unit for errors without generating code
    Check {
        /// Resolved unit (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Original source text, for diagnostic snippets
        #[arg(long, value_name = "FILE")]
        source: Option<PathBuf>,
    },

    /// Shows the lowered IR (debug)
    Ir {
        /// Resolved unit (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Generates C code from a unit
    Emit {
        /// Resolved unit (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Original source text, for diagnostic snippets
        #[arg(long, value_name = "FILE")]
        source: Option<PathBuf>,
    },

    /// Shows the reconstructed control flow of one function (debug)
    Flow {
        /// Resolved unit (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Function to dump
        #[arg(short, long, value_name = "NAME")]
        function: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Build { input, output, source } => {
            println!("Compiling: {}", input.display());

            let unit = load_unit(&input);
            let map = source_map_for(&unit, source.as_deref());
            println!("  [ok] Unit: {} types, {} functions", unit.types.len(), unit.functions.len());

            let lowered = lower_or_exit(&unit, &map);
            println!(
                "  [ok] Lower: {} functions, {} structs",
                lowered.module.functions.len(),
                lowered.module.structs.len()
            );

            let c_code = generate_or_exit(&lowered.module, &map);
            println!("  [ok] Codegen: C code generated");

            let output_name = output
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|| {
                    input
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_else(|| "output".to_string())
                });

            build_with_cc(&c_code, &output_name);
        }

        Commands::Check { input, source } => {
            println!("Checking: {}\n", input.display());

            let unit = load_unit(&input);
            let map = source_map_for(&unit, source.as_deref());
            let renderer = DiagnosticRenderer::new(&map);
            println!("  [ok] Unit: {} types, {} functions", unit.types.len(), unit.functions.len());

            match lower_unit(&unit) {
                Ok(lowered) => {
                    if lowered.diagnostics.has_errors() {
                        eprintln!("\nLowering errors:\n");
                        for diag in lowered.diagnostics.iter() {
                            eprintln!("{}", renderer.render(diag));
                        }
                        std::process::exit(1);
                    }

                    let warning_count = lowered.diagnostics.len();
                    if warning_count > 0 {
                        println!("  [warn] Lower: {} warning(s)", warning_count);
                        for diag in lowered.diagnostics.iter() {
                            eprintln!("{}", renderer.render(diag));
                        }
                    } else {
                        println!("  [ok] Lower: {} functions", lowered.module.functions.len());
                    }

                    println!("\nNo errors found!");
                }
                Err(err) => {
                    eprintln!("{}", renderer.render(&Diagnostic::internal(err)));
                    std::process::exit(1);
                }
            }
        }

        Commands::Ir { input } => {
            println!("Lowering: {}\n", input.display());

            let unit = load_unit(&input);
            let map = source_map_for(&unit, None);
            let lowered = lower_or_exit(&unit, &map);

            println!("{}", lowered.module);

            println!("Statistics:");
            println!("   Functions: {}", lowered.module.functions.len());
            println!("   Structs: {}", lowered.module.structs.len());
        }

        Commands::Emit { input, output, source } => {
            let unit = load_unit(&input);
            let map = source_map_for(&unit, source.as_deref());
            let lowered = lower_or_exit(&unit, &map);
            let c_code = generate_or_exit(&lowered.module, &map);

            if let Some(output_path) = output {
                match fs::write(&output_path, &c_code) {
                    Ok(_) => {
                        println!("C code generated at: {}", output_path.display());
                        println!("\nTo compile:");
                        println!("  cc -o program {}", output_path.display());
                    }
                    Err(e) => {
                        eprintln!("Error writing file: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                println!("{}", c_code);
            }
        }

        Commands::Flow { input, function } => {
            println!("Flow of `{}`: {}\n", function, input.display());

            let unit = load_unit(&input);
            let map = source_map_for(&unit, None);
            let lowered = lower_or_exit(&unit, &map);

            let Some(func) = lowered.module.get_function(&function) else {
                eprintln!("Function `{}` not found in unit `{}`", function, unit.name);
                std::process::exit(1);
            };

            let mut renderer = CFunction::new(&lowered.module, func);
            let mut graph = FlowGraph::new(func.blocks.len());
            match graph.reconstruct(func, &mut renderer) {
                Ok(entry) => {
                    print!("{}", graph.dump(entry, true));
                    println!("\n{} flow nodes", graph.len());
                }
                Err(err) => {
                    let renderer = DiagnosticRenderer::new(&map);
                    eprintln!("{}", renderer.render(&Diagnostic::internal(err)));
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Reads and deserializes a resolved unit
fn load_unit(input: &Path) -> Unit {
    let text = match fs::read_to_string(input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    };
    match serde_json::from_str(&text) {
        Ok(unit) => unit,
        Err(e) => {
            eprintln!("Error parsing unit: {}", e);
            std::process::exit(1);
        }
    }
}

/// Builds the source map the renderer resolves locations against.
/// The lowerer stamps every location as file 0, the unit's own source.
fn source_map_for(unit: &Unit, source: Option<&Path>) -> SourceMap {
    let mut map = SourceMap::new();
    match source {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => {
                map.add_with_source(path.display().to_string(), text);
            }
            Err(e) => {
                eprintln!("Error reading source file: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            map.add(format!("{}.vl", unit.name));
        }
    }
    map
}

fn lower_or_exit(unit: &Unit, map: &SourceMap) -> LoweredUnit {
    let renderer = DiagnosticRenderer::new(map);
    match lower_unit(unit) {
        Ok(lowered) => {
            if lowered.diagnostics.has_errors() {
                eprintln!("Lowering errors:\n");
                for diag in lowered.diagnostics.iter() {
                    eprintln!("{}", renderer.render(diag));
                }
                std::process::exit(1);
            }
            for diag in lowered.diagnostics.iter() {
                eprintln!("{}", renderer.render(diag));
            }
            lowered
        }
        Err(err) => {
            eprintln!("{}", renderer.render(&Diagnostic::internal(err)));
            std::process::exit(1);
        }
    }
}

fn generate_or_exit(module: &vela_ir::Module, map: &SourceMap) -> String {
    match CBackend::new().generate(module) {
        Ok(code) => code,
        Err(err) => {
            let renderer = DiagnosticRenderer::new(map);
            eprintln!("{}", renderer.render(&Diagnostic::internal(err)));
            std::process::exit(1);
        }
    }
}

/// Writes the generated C next to the system temp dir and hands it to
/// the system C compiler
fn build_with_cc(c_code: &str, output_name: &str) {
    let temp_dir = std::env::temp_dir();
    let c_file = temp_dir.join(format!("{}.c", output_name));

    if let Err(e) = fs::write(&c_file, c_code) {
        eprintln!("Error creating C file: {}", e);
        std::process::exit(1);
    }

    let exe_name = if cfg!(windows) {
        format!("{}.exe", output_name)
    } else {
        output_name.to_string()
    };
    let exe_path = std::env::current_dir().unwrap_or_default().join(&exe_name);

    println!("\nCompiling with cc...\n");
    let compiler = if cfg!(windows) { "gcc" } else { "cc" };

    let output = Command::new(compiler)
        .arg("-o")
        .arg(&exe_path)
        .arg(&c_file)
        .arg("-lm")
        .output();

    match output {
        Ok(output) => {
            if !output.stderr.is_empty() {
                eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            }

            if output.status.success() {
                println!("Compilation completed!");
                println!("   Executable: {}", exe_path.display());
            } else {
                eprintln!("C compilation failed");
                eprintln!("   C code available at: {}", c_file.display());
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error executing {}: {}", compiler, e);
            eprintln!("   C code available at: {}", c_file.display());
            eprintln!("   Compile manually:");
            eprintln!("   {} -o {} {}", compiler, exe_name, c_file.display());
            std::process::exit(1);
        }
    }
}
