//! rvlite 命令行入口
//!
//! 加载一个程序映像，运行到停机地址或出错为止。
//! 设备输出写到标准输出，诊断信息写到标准错误。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use rvlite::sim_env::{ImageFormat, SimConfig, SimEnv};

#[derive(Parser, Debug)]
#[command(author, version, about = "RV32I subset interpreter", long_about = None)]
struct Args {
    /// Program image (raw binary or RV32 ELF)
    image: PathBuf,

    /// Image format; auto detects ELF by its magic bytes
    #[arg(long, value_enum, default_value_t = FormatArg::Auto)]
    format: FormatArg,

    /// Address a raw image is loaded at (also its entry point)
    #[arg(long, value_parser = parse_u32, default_value = "0x1000")]
    load_addr: u32,

    /// Memory size in bytes
    #[arg(long, value_parser = parse_usize, default_value = "0x10000000")]
    mem_size: usize,

    /// Halt after retiring the instruction at this address
    #[arg(long, value_parser = parse_u32, default_value = "0x1048")]
    halt_addr: u32,

    /// Address of the byte-output device
    #[arg(long, value_parser = parse_u32, default_value = "0x200")]
    uart_addr: u32,

    /// Override the entry point
    #[arg(long, value_parser = parse_u32)]
    entry: Option<u32>,

    /// Print the register file to stderr on exit
    #[arg(long)]
    dump_regs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Auto,
    Raw,
    Elf,
}

impl From<FormatArg> for ImageFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => ImageFormat::Auto,
            FormatArg::Raw => ImageFormat::Raw,
            FormatArg::Elf => ImageFormat::Elf,
        }
    }
}

/// 十进制或 0x 前缀的十六进制
fn parse_u64(s: &str) -> Result<u64, String> {
    let s = s.trim().replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let value = parse_u64(s)?;
    u32::try_from(value).map_err(|_| format!("0x{:x} does not fit in 32 bits", value))
}

fn parse_usize(s: &str) -> Result<usize, String> {
    let value = parse_u64(s)?;
    usize::try_from(value).map_err(|_| format!("0x{:x} is too large", value))
}

impl Args {
    fn to_config(&self) -> SimConfig {
        let mut config = SimConfig::new()
            .with_image_path(&self.image)
            .with_format(self.format.into())
            .with_load_addr(self.load_addr)
            .with_mem_size(self.mem_size)
            .with_halt_addr(Some(self.halt_addr))
            .with_uart_addr(self.uart_addr);
        if let Some(entry) = self.entry {
            config = config.with_entry_pc(entry);
        }
        config
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut env = match SimEnv::from_config(args.to_config()) {
        Ok(env) => env,
        Err(e) => {
            eprintln!("rvlite: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let result = env.run_to_completion();

    if args.dump_regs {
        eprintln!("{}", env.cpu);
        eprintln!("Instructions retired: {}", env.instructions_executed);
    }

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rvlite: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
