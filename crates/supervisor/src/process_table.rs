//! Blocking queries against the OS process table.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};

const HOME_FLAG: &str = "--home";

/// Pid of the live process running `binary_name` with `--home home_dir`.
///
/// `home_dir` must be absolute. A relative `--home` is resolved against the
/// candidate's working directory; candidates whose working directory cannot be
/// read never match. When several match, the lowest pid wins.
pub fn find_by_home(binary_name: &str, home_dir: &Path) -> Option<u32> {
    let system = snapshot(true);

    system
        .processes()
        .values()
        .filter(|process| is_live(process))
        .filter(|process| runs_binary(process, binary_name))
        .filter(|process| managed_home(process).is_some_and(|home| home == home_dir))
        .map(|process| process.pid().as_u32())
        .min()
}

/// All transitive children of `pid`.
pub fn descendants(pid: u32) -> Vec<u32> {
    let system = snapshot(false);

    let mut found = Vec::new();
    let mut frontier = vec![Pid::from_u32(pid)];
    let mut seen = HashSet::from([Pid::from_u32(pid)]);

    while let Some(parent) = frontier.pop() {
        for process in system.processes().values() {
            if process.parent() == Some(parent) && seen.insert(process.pid()) {
                frontier.push(process.pid());
                found.push(process.pid().as_u32());
            }
        }
    }

    found
}

/// Whether `pid` is present in the process table and not a zombie.
pub fn is_running(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing(),
    );

    system.process(pid).is_some_and(is_live)
}

/// Value of the last `--home` argument in a command line.
pub fn home_arg(cmd: &[OsString]) -> Option<PathBuf> {
    let mut home = None;
    let mut args = cmd.iter();

    while let Some(arg) = args.next() {
        let arg = arg.to_string_lossy();

        if arg.eq_ignore_ascii_case(HOME_FLAG) {
            home = args.next().map(PathBuf::from);
        } else if let Some(value) = arg.strip_prefix("--home=") {
            home = Some(PathBuf::from(value));
        }
    }

    home
}

/// Absolute home directory a process was started with.
fn managed_home(process: &Process) -> Option<PathBuf> {
    let home = home_arg(process.cmd())?;

    if home.is_absolute() {
        Some(home)
    } else {
        process.cwd().map(|cwd| cwd.join(home))
    }
}

fn snapshot(with_cmd: bool) -> System {
    let mut kind = ProcessRefreshKind::nothing();
    if with_cmd {
        kind = kind
            .with_cmd(UpdateKind::Always)
            .with_cwd(UpdateKind::Always);
    }

    let mut system = System::new();
    system.refresh_processes_specifics(ProcessesToUpdate::All, true, kind);
    system
}

fn is_live(process: &Process) -> bool {
    !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
}

fn runs_binary(process: &Process, binary_name: &str) -> bool {
    process.name() == OsStr::new(binary_name)
        || process
            .cmd()
            .first()
            .and_then(|arg0| Path::new(arg0).file_name())
            .is_some_and(|name| name == OsStr::new(binary_name))
}
