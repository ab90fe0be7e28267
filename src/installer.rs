//! Copies the running binary onto the user's PATH.

use anyhow::{anyhow, Context, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub target: PathBuf,
    /// Whether the install directory is listed in `PATH`.
    pub on_path: bool,
}

/// `~/.local/bin`
pub fn default_install_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
    Ok(home.join(".local").join("bin"))
}

/// Whether `dir` is one of the entries of a `PATH`-style value.
pub fn dir_on_path(dir: &Path, path_var: Option<&OsStr>) -> bool {
    let Some(path_var) = path_var else {
        return false;
    };
    std::env::split_paths(path_var).any(|entry| entry == dir)
}

/// Installs the running executable into `dir` (default `~/.local/bin`).
pub fn install(dir: Option<&Path>) -> Result<InstallReport> {
    let source = std::env::current_exe().context("Failed to determine current executable")?;
    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => default_install_dir()?,
    };
    let path_var = std::env::var_os("PATH");
    install_from(&source, &dir, path_var.as_deref())
}

/// Copies `source` into `dir` under its own file name.
///
/// The copy is written next to the target first and renamed into place, so
/// replacing a binary that is currently running works.
pub fn install_from(source: &Path, dir: &Path, path_var: Option<&OsStr>) -> Result<InstallReport> {
    let file_name = source
        .file_name()
        .ok_or_else(|| anyhow!("Invalid executable path: {}", source.display()))?;

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let target = dir.join(file_name);

    if fs::canonicalize(source).ok() == fs::canonicalize(&target).ok() && target.exists() {
        info!("{} is already installed", target.display());
        return Ok(InstallReport {
            on_path: dir_on_path(dir, path_var),
            target,
        });
    }

    let staging = target.with_extension("new");
    fs::copy(source, &staging)
        .with_context(|| format!("Failed to copy {} to {}", source.display(), staging.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&staging, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to set permissions on {}", staging.display()))?;
    }

    fs::rename(&staging, &target)
        .with_context(|| format!("Failed to move binary into {}", target.display()))?;
    info!("Installed {}", target.display());

    Ok(InstallReport {
        on_path: dir_on_path(dir, path_var),
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn fake_binary(dir: &Path) -> PathBuf {
        let source = dir.join("how");
        fs::write(&source, b"#!/bin/sh\necho how\n").unwrap();
        source
    }

    #[test]
    fn test_install_copies_binary() {
        let src_dir = tempfile::tempdir().unwrap();
        let bin_dir = tempfile::tempdir().unwrap();
        let target_dir = bin_dir.path().join("nested").join("bin");
        let source = fake_binary(src_dir.path());

        let report = install_from(&source, &target_dir, None).unwrap();

        assert_eq!(report.target, target_dir.join("how"));
        assert_eq!(fs::read(&report.target).unwrap(), fs::read(&source).unwrap());
        assert!(!report.on_path);
        assert!(!target_dir.join("how.new").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_installed_binary_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let src_dir = tempfile::tempdir().unwrap();
        let bin_dir = tempfile::tempdir().unwrap();
        let source = fake_binary(src_dir.path());

        let report = install_from(&source, bin_dir.path(), None).unwrap();
        let mode = fs::metadata(&report.target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_reinstall_overwrites() {
        let src_dir = tempfile::tempdir().unwrap();
        let bin_dir = tempfile::tempdir().unwrap();
        let source = fake_binary(src_dir.path());
        fs::write(bin_dir.path().join("how"), b"old").unwrap();

        let report = install_from(&source, bin_dir.path(), None).unwrap();
        assert_eq!(fs::read(&report.target).unwrap(), fs::read(&source).unwrap());
    }

    #[test]
    fn test_path_detection() {
        let dir = tempfile::tempdir().unwrap();
        let joined: OsString =
            std::env::join_paths([PathBuf::from("/usr/bin"), dir.path().to_path_buf()]).unwrap();

        assert!(dir_on_path(dir.path(), Some(joined.as_os_str())));
        assert!(!dir_on_path(Path::new("/opt/elsewhere"), Some(joined.as_os_str())));
        assert!(!dir_on_path(dir.path(), None));
    }

    #[test]
    fn test_install_reports_path_membership() {
        let src_dir = tempfile::tempdir().unwrap();
        let bin_dir = tempfile::tempdir().unwrap();
        let source = fake_binary(src_dir.path());
        let path_var = OsString::from(bin_dir.path());

        let report = install_from(&source, bin_dir.path(), Some(path_var.as_os_str())).unwrap();
        assert!(report.on_path);
    }
}
