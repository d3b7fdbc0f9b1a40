#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::panic
)]

mod args;
mod classes;
mod config;
mod dataset;
mod dump;
mod fixture;
mod hex_conv;
mod parse_radix;
mod prim;
mod reader;
mod stream;
mod util;
mod writer;

use {
    anyhow::bail,
    args::{Args, Command, ConfigArgs, DumpArgs, GenerateArgs, SelectionArgs, VerifyArgs},
    clap::Parser,
    config::{Config, LoadedConfig},
    fixture::Selection,
    gamedebug_core::{PERSISTENT, per},
    std::path::PathBuf,
};

fn print_version_info() {
    eprintln!(
        "jso-fixtures {} ({} {}), built on {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown revision"),
        option_env!("VERGEN_GIT_COMMIT_TIMESTAMP").unwrap_or("unknown date"),
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown date")
    );
}

fn try_main(args: Args) -> anyhow::Result<()> {
    if args.version {
        print_version_info();
        return Ok(());
    }
    let cfg = match Config::load_or_default() {
        Ok(LoadedConfig {
            config,
            old_config_err,
        }) => {
            if let Some(e) = old_config_err {
                eprintln!("Warning: Failed to load config ({e:#}), using defaults");
            }
            config
        }
        Err(e) => {
            per!("Not using a config file: {e:#}");
            Config::default()
        }
    };
    match args.cmd {
        None => generate(GenerateArgs::default(), &cfg),
        Some(Command::Generate(gen_args)) => generate(gen_args, &cfg),
        Some(Command::Verify(verify_args)) => verify(verify_args, &cfg),
        Some(Command::Dump(dump_args)) => dump(dump_args, &cfg),
        Some(Command::List) => {
            list();
            Ok(())
        }
        Some(Command::Config(cfg_args)) => update_config(cfg_args, cfg),
    }
}

fn selection(args: SelectionArgs, cfg: &Config) -> Selection {
    Selection {
        include_inert: args.include_inert || cfg.include_inert,
        only: args.only,
    }
}

fn target_dir(arg: Option<PathBuf>, cfg: &Config) -> PathBuf {
    arg.or_else(|| cfg.out_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn generate(args: GenerateArgs, cfg: &Config) -> anyhow::Result<()> {
    let dir = target_dir(args.out_dir, cfg);
    let emitted = fixture::generate(&dir, &selection(args.selection, cfg))?;
    let total: u64 = emitted.iter().map(|em| em.size).sum();
    println!(
        "Wrote {} fixtures ({}) to {}",
        emitted.len(),
        util::human_size(total),
        dir.display()
    );
    Ok(())
}

fn verify(args: VerifyArgs, cfg: &Config) -> anyhow::Result<()> {
    let dir = target_dir(args.dir, cfg);
    let report = fixture::verify(&dir, &selection(args.selection, cfg))?;
    for entry in &report {
        println!("{entry}");
    }
    let failed = report.iter().filter(|entry| !entry.is_ok()).count();
    if failed > 0 {
        bail!(
            "{failed} of {} fixtures in {} failed verification",
            report.len(),
            dir.display()
        );
    }
    Ok(())
}

fn dump(args: DumpArgs, cfg: &Config) -> anyhow::Result<()> {
    let opts = dump::DumpOptions {
        hex: args.hex,
        seek: args.seek,
        max_elements: args.max_elements.unwrap_or(cfg.dump_max_elements),
    };
    dump::run(&args.file, &opts, &mut std::io::stdout().lock())
}

fn list() {
    for ds in dataset::table() {
        println!(
            "{:<24} {:<18} {:>6} {}",
            ds.label,
            ds.type_name(),
            ds.len(),
            if ds.persist { "persisted" } else { "inert" }
        );
    }
}

fn update_config(args: ConfigArgs, mut cfg: Config) -> anyhow::Result<()> {
    let old = cfg.clone();
    if args.clear_out_dir {
        cfg.out_dir = None;
    }
    if let Some(dir) = args.out_dir {
        cfg.out_dir = Some(dir);
    }
    if let Some(include_inert) = args.include_inert {
        cfg.include_inert = include_inert;
    }
    if let Some(max) = args.max_elements {
        cfg.dump_max_elements = max;
    }
    if cfg != old {
        let path = cfg.save()?;
        per!("Saved config to {}", path.display());
    }
    println!(
        "out-dir: {}",
        cfg.out_dir
            .as_deref()
            .map_or_else(|| "(working directory)".into(), |dir| dir.display().to_string())
    );
    println!("include-inert: {}", cfg.include_inert);
    println!("max-elements: {}", cfg.dump_max_elements);
    Ok(())
}

fn main() {
    let args = Args::parse();
    if args.debug {
        PERSISTENT.set_enabled(true);
    }
    let result = try_main(args);
    PERSISTENT.for_each(|msg| match &msg.src_loc {
        Some(loc) => eprintln!("[{}:{}] {}", loc.file, loc.line, msg.info),
        None => eprintln!("{}", msg.info),
    });
    if let Err(e) = result {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}
