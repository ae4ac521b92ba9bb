mod game;
mod idle;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use emu::backup::{BackupSelection, BackupType};
use emu::emu_thread;
use emu::gba::{Gba, GbaConfig};
use emu::message::DeviceState;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::game::{Game, Settings};
use crate::idle::Idle;

/// How often the save file is brought up to date while the game runs.
const BACKUP_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackupArg {
    Auto,
    None,
    Eeprom4k,
    Eeprom64k,
    Sram,
    Flash64,
    Flash128,
}

impl From<BackupArg> for BackupSelection {
    fn from(arg: BackupArg) -> Self {
        match arg {
            BackupArg::Auto => Self::AutoDetect,
            BackupArg::None => Self::Manual(BackupType::None),
            BackupArg::Eeprom4k => Self::Manual(BackupType::Eeprom4k),
            BackupArg::Eeprom64k => Self::Manual(BackupType::Eeprom64k),
            BackupArg::Sram => Self::Manual(BackupType::Sram),
            BackupArg::Flash64 => Self::Manual(BackupType::Flash64),
            BackupArg::Flash128 => Self::Manual(BackupType::Flash128),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RtcArg {
    Auto,
    Enabled,
    Disabled,
}

impl From<RtcArg> for DeviceState {
    fn from(arg: RtcArg) -> Self {
        match arg {
            RtcArg::Auto => Self::AutoDetect,
            RtcArg::Enabled => Self::Enabled,
            RtcArg::Disabled => Self::Disabled,
        }
    }
}

#[derive(Parser)]
#[command(version, about = "Headless Gameboy Advance emulator core")]
struct Args {
    /// Path to the ROM file
    rom: PathBuf,

    /// Path to the 16 KiB BIOS image
    #[arg(long, default_value = "bios.bin")]
    bios: PathBuf,

    /// Emulation speed as a multiple of the real frame rate
    #[arg(long, default_value_t = 1)]
    speed: u32,

    /// Run as fast as possible
    #[arg(long)]
    unbounded: bool,

    /// How long to run before exiting
    #[arg(long, default_value_t = 10)]
    seconds: u64,

    /// Backup storage type
    #[arg(long, value_enum, default_value = "auto")]
    backup_type: BackupArg,

    /// Real time clock presence
    #[arg(long, value_enum, default_value = "auto")]
    rtc: RtcArg,

    #[arg(long)]
    color_correction: bool,

    /// Audio resample frequency, in Hz
    #[arg(long)]
    resample_frequency: Option<u64>,

    /// Restore the quicksave next to the ROM after booting
    #[arg(long)]
    quickload: bool,

    /// Quicksave next to the ROM before exiting
    #[arg(long)]
    quicksave: bool,

    /// Size of the flat address space handed to the CPU core
    #[arg(long, default_value_t = emu::gba::DEFAULT_MEMORY_SIZE)]
    memory_size: usize,

    #[arg(long)]
    big_endian: bool,

    /// Also write logs to `kumquat.log` in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

/// Logs go to stdout, filtered by `RUST_LOG` (default `info`).
///
/// The returned guard flushes the log file when dropped.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    if let Some(dir) = log_dir {
        let appender = tracing_appender::rolling::never(dir, "kumquat.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer),
            )
            .init();
        Some(guard)
    } else {
        registry.init();
        None
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = init_tracing(args.log_dir.as_deref());

    tracing::info!("kumquat v{}", env!("CARGO_PKG_VERSION"));

    let gba = Gba::new(GbaConfig {
        memory_size: args.memory_size,
        big_endian: args.big_endian,
    });
    let emu = emu_thread::spawn(gba, Idle::default());

    let mut game = Game::new(
        args.rom.clone(),
        Settings {
            bios_path: args.bios.clone(),
            speed: args.speed,
            unbounded: args.unbounded,
            backup_type: args.backup_type.into(),
            rtc: args.rtc.into(),
            color_correction: args.color_correction,
            resample_frequency: args.resample_frequency,
        },
    );

    tracing::info!(
        "save file: {}, quicksave: {}",
        game.backup_path().display(),
        game.quicksave_path().display()
    );
    if let Err(e) = game.start(&emu) {
        tracing::error!("{e}");
        return ExitCode::FAILURE;
    }
    if args.quickload {
        game.quickload(&emu);
    }

    let backup_mailbox = emu.backup_mailbox();
    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        thread::sleep(BACKUP_FLUSH_INTERVAL.min(remaining));
        if let Err(e) = game.write_backup(&backup_mailbox) {
            tracing::error!("{e}");
        }
    }

    if args.quicksave {
        game.quicksave(&emu);
    }

    let _ = emu.shutdown();
    if let Err(e) = game.write_backup(&backup_mailbox) {
        tracing::error!("{e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
