//! CLI definition and dispatch (TRD Section 13).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_store::JsonStoreAdapter;
use crate::domain::config_validation::validate_strategy_config;
use crate::domain::error::CanvasError;
use crate::domain::expr_parser;
use crate::domain::node::CanvasNode;
use crate::domain::strategy::Strategy;
use crate::domain::types::{CanvasType, NativeType};
use crate::ports::store_port::{NodeRecord, StorePort};

#[derive(Parser, Debug)]
#[command(name = "canvastrader", about = "Typed strategy canvas assembler")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a strategy configuration
    Check {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Parse an expression and show the resolved tree
    Show {
        expr: String,
    },
    /// Parse an expression and convert it to a target type
    Convert {
        expr: String,
        #[arg(short, long)]
        target: String,
    },
    /// Parse a strategy and save its canvases to a store
    Export {
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(long, default_value = "canvases")]
        store: PathBuf,
    },
    /// List canvases in a store
    List {
        #[arg(long, default_value = "canvases")]
        store: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Check { strategy } => run_check(&strategy),
        Command::Show { expr } => run_show(&expr),
        Command::Convert { expr, target } => run_convert(&expr, &target),
        Command::Export { strategy, store } => run_export(&strategy, &store),
        Command::List { store } => run_list(&store),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = CanvasError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_check(strategy_path: &PathBuf) -> ExitCode {
    eprintln!("Loading strategy from {}", strategy_path.display());
    let adapter = match load_config(strategy_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_strategy_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let strategy = match Strategy::from_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    println!("strategy '{}' is valid", strategy.name);
    println!("  entry: {}", strategy.entry);
    println!("  exit:  {}", strategy.exit);
    if let Some(risk) = &strategy.risk {
        println!("  risk:  {}", risk);
    }
    ExitCode::SUCCESS
}

fn run_show(expr: &str) -> ExitCode {
    match parse_expr(expr) {
        Ok(node) => {
            println!("{node}");
            println!("type: {}", node.ty());
            ExitCode::SUCCESS
        }
        Err(code) => code,
    }
}

fn run_convert(expr: &str, target: &str) -> ExitCode {
    let node = match parse_expr(expr) {
        Ok(node) => node,
        Err(code) => return code,
    };
    let target_ty = match parse_type(target) {
        Some(ty) => ty,
        None => {
            eprintln!("error: unknown type '{target}'");
            return ExitCode::from(2);
        }
    };
    match node.convert(&target_ty) {
        Ok(converted) => {
            println!("{converted}");
            println!("type: {}", converted.ty());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_export(strategy_path: &PathBuf, store_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(strategy_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let strategy = match Strategy::from_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let store = JsonStoreAdapter::new(store_path);
    let mut canvases = vec![
        (format!("{}.entry", strategy.name), &strategy.entry),
        (format!("{}.exit", strategy.name), &strategy.exit),
    ];
    if let Some(risk) = &strategy.risk {
        canvases.push((format!("{}.risk", strategy.name), risk));
    }

    for (name, tree) in canvases {
        if let Err(e) = store.save(&name, &NodeRecord::from_node(tree)) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        println!("saved {name}");
    }
    ExitCode::SUCCESS
}

fn run_list(store_path: &PathBuf) -> ExitCode {
    let store = JsonStoreAdapter::new(store_path);
    match store.list() {
        Ok(names) => {
            for name in names {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn parse_expr(expr: &str) -> Result<CanvasNode, ExitCode> {
    expr_parser::parse(expr).map_err(|e| {
        match &e {
            CanvasError::ExprParse(parse_err) => {
                eprintln!("error:\n{}", parse_err.display_with_context(expr));
            }
            other => eprintln!("error: {other}"),
        }
        ExitCode::from(&e)
    })
}

/// `Money`, `Any`, or a `|`-joined union of native type names.
fn parse_type(name: &str) -> Option<CanvasType> {
    let name = name.trim().trim_start_matches('(').trim_end_matches(')');
    if name.eq_ignore_ascii_case("any") {
        return Some(CanvasType::any());
    }
    if name.contains('|') {
        let members: Option<Vec<NativeType>> =
            name.split('|').map(|m| NativeType::parse(m.trim())).collect();
        return members.map(CanvasType::union_of);
    }
    NativeType::parse(name).map(CanvasType::native)
}
