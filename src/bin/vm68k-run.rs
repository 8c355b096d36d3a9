use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vm68k::{AddressSpace, Context, ExecUnit, Fault, FunctionCode, VmConfig, WordSize};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a raw MC68000 image on the vm68k core")]
struct Opts {
    /// JSON file with the memory layout
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address the image is loaded at
    #[arg(short, long, default_value_t = 0x1000, value_parser = parse_number)]
    load: u32,
    /// Entry point; defaults to the load address
    #[arg(short, long, value_parser = parse_number)]
    entry: Option<u32>,
    /// Main RAM size in bytes, overriding the config file
    #[arg(short, long, value_parser = parse_number)]
    memory: Option<u32>,
    /// Start the guest in user state
    #[arg(short, long)]
    user: bool,
    /// Stop after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,
    /// Print the register file as JSON on exit
    #[arg(long)]
    dump_regs: bool,
    #[arg(value_name = "IMAGE")]
    input: PathBuf,
}

fn parse_number(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| e.to_string())
}

/// Human68k `_EXIT`: terminate with status 0.
fn dos_exit(ctx: &mut Context<'_>, _: u16, _: u32) -> Result<(), Fault> {
    ctx.regs.advance_pc(2);
    ctx.request_exit(0);
    Ok(())
}

/// Human68k `_EXIT2`: terminate with the word status on the stack.
fn dos_exit2(ctx: &mut Context<'_>, _: u16, _: u32) -> Result<(), Fault> {
    let sp = ctx.regs.a[7];
    let status = ctx.read::<WordSize>(sp)? as u16 as i16;
    ctx.regs.advance_pc(2);
    ctx.request_exit(status as i32);
    Ok(())
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let mut cfg = match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<VmConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => VmConfig::default(),
    };
    if let Some(size) = opts.memory {
        cfg.memory_size = size;
    }

    let image = std::fs::read(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let mut mem = cfg.memory_map();
    mem.write(FunctionCode::SupervisorData, opts.load, &image)
        .with_context(|| format!("loading image at {:#08x}", opts.load))?;

    let mut unit = ExecUnit::mc68000();
    unit.set_instruction(0xFF00, 0, dos_exit, 0);
    unit.set_instruction(0xFF4C, 0, dos_exit2, 0);

    let mut ctx = Context::new(&mut mem);
    ctx.regs.pc = opts.entry.unwrap_or(opts.load);
    ctx.regs.a[7] = cfg.stack_top();
    if opts.user {
        ctx.regs.set_usp(cfg.stack_top().wrapping_sub(0x1000));
        ctx.set_supervisor_state(false);
    }
    info!(
        "running {} ({} bytes) at {:#08x}",
        opts.input.display(),
        image.len(),
        ctx.regs.pc
    );

    let status = match opts.max_steps {
        None => unit.start(&mut ctx),
        Some(limit) => {
            let mut status = None;
            for _ in 0..limit {
                match unit.step(&mut ctx) {
                    Ok(ControlFlow::Continue(())) => {}
                    Ok(ControlFlow::Break(s)) => {
                        status = Some(s);
                        break;
                    }
                    Err(fault) => {
                        status = Some(ExecUnit::report(&ctx, &fault));
                        break;
                    }
                }
            }
            status.unwrap_or_else(|| {
                warn!("step limit {} reached at {:#08x}", limit, ctx.regs.pc);
                1
            })
        }
    };

    if opts.dump_regs {
        println!("{}", serde_json::to_string_pretty(&ctx.regs)?);
    }
    Ok(ExitCode::from(status as u8))
}
