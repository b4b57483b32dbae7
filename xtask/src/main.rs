//! The pico-plasma firmware builder

use std::{
    io::Write,
    path::{Path, PathBuf},
    process::Command,
};

/// Where Core1 starts.
///
/// Core 1 starts 256K in. Must match core0/memory.x and core1/memory.x
const CORE1_START_OFFSET: usize = 256 * 1024;

/// The target both cores are built for
const FIRMWARE_TARGET: &str = "thumbv6m-none-eabi";

/// The firmware crates, which build on their own with their own target
const FIRMWARE_CRATES: [&str; 2] = ["core0", "core1"];

/// Where picotool releases come from
const PICOTOOL_RELEASES: &str =
    "https://github.com/raspberrypi/pico-sdk-tools/releases/download/v2.1.0-0";

static HELP_TEXT: &str = r#"
The pico-plasma firmware builder version $CARGO_PKG_VERSION.

$CARGO_PKG_LICENSE

Options:

  * "help" - print this help text
  * "build" - compile the firmware into a UF2 file
  * "test" - run the plasma engine tests on this machine
  * "fmt" - format the code
  * "fmt-check" - check the code is formatted
  * "clippy" - run clippy on the engine and the firmware
"#;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Entry point to the program
///
/// We don't use anyhow or eyre here to keep the dependencies to a minimum
fn main() -> Result<()> {
    // we need this to exist
    let target_dir = Path::new("target");
    std::fs::create_dir_all(target_dir)?;

    let command = std::env::args().nth(1).unwrap_or("help".to_string());
    match command.as_str() {
        "build" => {
            println!("Building...");
            build(target_dir)?;
        }
        "test" => {
            println!("Testing...");
            test()?;
        }
        "fmt" => {
            println!("Running fmt...");
            run_all(&["fmt"])?;
        }
        "fmt-check" => {
            println!("Running fmt --check...");
            run_all(&["fmt", "--check"])?;
        }
        "clippy" => {
            println!("Running clippy...");
            get_target(FIRMWARE_TARGET)?;
            run_all(&["clippy"])?;
        }
        _ => {
            let help = HELP_TEXT.to_string();
            let help = help.replace("$CARGO_PKG_VERSION", env!("CARGO_PKG_VERSION"));
            let help = help.replace("$CARGO_PKG_LICENSE", env!("CARGO_PKG_LICENSE"));
            println!("{help}");
        }
    }
    Ok(())
}

/// Build the firmware
fn build(target_dir: &Path) -> Result<()> {
    get_package("flip-link")?;
    get_target(FIRMWARE_TARGET)?;
    let picotool = get_picotool(target_dir)?;
    let mut elfs = Vec::new();
    for core in FIRMWARE_CRATES {
        let elf = target_dir.join(format!("pico-plasma-{core}.elf"));
        build_core(core, &elf)?;
        elfs.push(elf);
    }
    let target_bin = target_dir.join("pico-plasma.bin");
    let target_uf2 = target_dir.join("pico-plasma.uf2");
    merge_firmware(&elfs[0], &elfs[1], &target_bin)?;
    make_uf2(&target_bin, &target_uf2, &picotool)?;
    println!(
        "** Complete! You now have {uf2} **",
        uf2 = target_uf2.display()
    );
    Ok(())
}

/// Run the host tests.
///
/// Only the engine has any; the firmware crates can't run here.
fn test() -> Result<()> {
    let mut command = Command::new("cargo");
    command.args(["test", "--package", "plasma-engine"]);
    run_command(command)
}

/// Install a package
fn get_package(package: &str) -> Result<()> {
    let mut command = Command::new("cargo");
    command.args(["install", "--locked", package]);
    run_command(command)
}

/// Add our target to rustup
fn get_target(target: &str) -> Result<()> {
    let mut command = Command::new("rustup");
    command.args(["target", "add", target]);
    run_command(command)?;
    let mut command = Command::new("rustup");
    command.args(["component", "add", "llvm-tools"]);
    run_command(command)
}

/// Build the firmware for one core
fn build_core(core: &str, output_path: &Path) -> Result<()> {
    println!("Building {core}");
    let mut command = Command::new("cargo");
    command.args(["build", "--release"]);
    command.current_dir(core);
    run_command(command)?;
    let generated_elf: PathBuf = [core, "target", FIRMWARE_TARGET, "release", core]
        .iter()
        .collect();
    std::fs::copy(&generated_elf, output_path)?;
    Ok(())
}

/// Combine the two firmwares
///
/// We convert them into .bin files, and then merge those bin files, with
/// Core 1's image starting at [`CORE1_START_OFFSET`].
fn merge_firmware(core0_elf: &Path, core1_elf: &Path, output_bin: &Path) -> Result<()> {
    println!(
        "Merging {elf0} and {elf1} into {bin}",
        elf0 = core0_elf.display(),
        elf1 = core1_elf.display(),
        bin = output_bin.display()
    );
    let core0_bin = elf_to_bin(core0_elf)?;
    let core1_bin = elf_to_bin(core1_elf)?;
    let bin0 = std::fs::read(core0_bin)?;
    let bin1 = std::fs::read(core1_bin)?;
    let Some(padding) = CORE1_START_OFFSET.checked_sub(bin0.len()) else {
        return Err(format!(
            "Core 0 image is {len} bytes, which runs into Core 1 at {CORE1_START_OFFSET}",
            len = bin0.len()
        )
        .into());
    };
    println!("Creating {bin_out}", bin_out = output_bin.display());
    let mut output = std::io::BufWriter::new(std::fs::File::create(output_bin)?);
    output.write_all(&bin0)?;
    output.write_all(&vec![0u8; padding])?;
    output.write_all(&bin1)?;
    output.flush()?;
    Ok(())
}

/// Convert an ELF file into a flat binary next to it
fn elf_to_bin(elf: &Path) -> Result<PathBuf> {
    let bin = elf.with_extension("bin");
    println!(
        "Converting {elf} to {bin}",
        elf = elf.display(),
        bin = bin.display()
    );
    let mut command = Command::new(llvm_tool("llvm-objcopy")?);
    command.args(["-O", "binary"]);
    command.arg(elf);
    command.arg(&bin);
    run_command(command)?;
    Ok(bin)
}

/// Turn a bin file into a UF2
fn make_uf2(input_bin: &Path, output_uf2: &Path, picotool: &Path) -> Result<()> {
    println!(
        "Converting {inp} to {out}",
        inp = input_bin.display(),
        out = output_uf2.display()
    );
    let mut command = Command::new(picotool);
    command.args(["uf2", "convert"]);
    command.arg(input_bin);
    command.arg(output_uf2);
    run_command(command)
}

/// Run a cargo command against the workspace and each firmware crate
fn run_all(args: &[&str]) -> Result<()> {
    for x in ["."].into_iter().chain(FIRMWARE_CRATES) {
        let mut command = Command::new("cargo");
        command.args(args);
        command.current_dir(x);
        run_command(command)?;
    }
    Ok(())
}

/// Run a command to completion and check it worked OK
fn run_command(mut command: Command) -> Result<()> {
    if let Some(cwd) = command.get_current_dir() {
        println!("Running {command:?} in {cwd}", cwd = cwd.display());
    } else {
        println!("Running {command:?}");
    }
    let status = command.spawn()?.wait()?;
    if !status.success() {
        return Err(format!("Command failed: {status}").into());
    }
    Ok(())
}

/// Get the path to an llvm-tools tool
fn llvm_tool(name: &str) -> Result<PathBuf> {
    let output = Command::new("rustc")
        .args(["--print", "target-libdir"])
        .output()?;
    let libdir = String::from_utf8(output.stdout)?;
    let mut path = PathBuf::from(libdir.trim());
    path.pop();
    path.push("bin");
    path.push(name);
    Ok(path)
}

/// How to unpack a picotool download
enum Archive {
    Zip,
    TarGz,
}

/// Which picotool release suits this machine, and how it is packed
fn picotool_release() -> Result<(&'static str, Archive)> {
    if cfg!(target_os = "windows") {
        Ok(("picotool-2.1.0-x64-win.zip", Archive::Zip))
    } else if cfg!(target_os = "macos") {
        // a universal binary, so Aarch64 and x86-64 both work
        Ok(("picotool-2.1.0-mac.zip", Archive::Zip))
    } else if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
        Ok(("picotool-2.1.0-x86_64-lin.tar.gz", Archive::TarGz))
    } else if cfg!(all(target_os = "linux", target_arch = "aarch64")) {
        Ok(("picotool-2.1.0-aarch64-lin.tar.gz", Archive::TarGz))
    } else {
        Err(format!("picotool isn't available from {PICOTOOL_RELEASES} for your machine").into())
    }
}

/// Download and unpack picotool, unless we already have it
fn get_picotool(target_dir: &Path) -> Result<PathBuf> {
    let exe = if cfg!(target_os = "windows") {
        "picotool.exe"
    } else {
        "picotool"
    };
    let picotool_path = target_dir.join("picotool").join(exe);
    if std::fs::exists(&picotool_path)? {
        return Ok(picotool_path);
    }

    let (release, archive) = picotool_release()?;
    let download = target_dir.join(release);
    println!("Downloading {release}...");
    // Every modern Windows has curl and tar too
    let mut command = Command::new("curl");
    command.arg(format!("{PICOTOOL_RELEASES}/{release}"));
    command.arg("-L");
    command.arg("-o");
    command.arg(&download);
    run_command(command)?;

    let mut command = match archive {
        Archive::TarGz => {
            let mut command = Command::new("tar");
            command.arg("xvzf");
            command.arg(&download);
            command.arg("-C");
            command
        }
        Archive::Zip if cfg!(target_os = "windows") => {
            let mut command = Command::new("tar");
            command.arg("xvf");
            command.arg(&download);
            command.arg("-C");
            command
        }
        Archive::Zip => {
            let mut command = Command::new("unzip");
            command.arg(&download);
            command.arg("-d");
            command
        }
    };
    command.arg(target_dir);
    run_command(command)?;

    Ok(picotool_path)
}

// End of file
