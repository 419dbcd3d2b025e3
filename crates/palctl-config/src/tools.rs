// PuTTY tool discovery: configured path, then PATH, then the standard
// Windows install locations. Falls back to the bare name so a missing
// tool surfaces as `ToolNotFound` when it is first spawned.

use std::path::{Path, PathBuf};

use palctl_core::ToolPaths;

use crate::Profile;

pub const WINDOWS_PUTTY_DIRS: &[&str] = &[
    r"C:\Program Files\PuTTY",
    r"C:\Program Files (x86)\PuTTY",
];

/// `plink` and `pscp` locations for a profile.
pub fn resolve_tools(profile: &Profile) -> ToolPaths {
    ToolPaths {
        plink: locate_tool(profile.plink.as_deref(), "plink"),
        pscp: locate_tool(profile.pscp.as_deref(), "pscp"),
    }
}

pub fn locate_tool(configured: Option<&Path>, name: &str) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }

    let mut dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default();
    dirs.extend(WINDOWS_PUTTY_DIRS.iter().map(PathBuf::from));

    locate_in(name, &dirs).unwrap_or_else(|| {
        tracing::debug!(tool = name, "not found on PATH or in PuTTY install dirs");
        PathBuf::from(name)
    })
}

/// First `name` or `name.exe` that exists in `dirs`.
pub fn locate_in(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| [dir.join(name), dir.join(format!("{name}.exe"))])
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_path_is_used_verbatim() {
        let path = Path::new(r"D:\tools\plink.exe");
        assert_eq!(locate_tool(Some(path), "plink"), path);
    }

    #[test]
    fn finds_exe_suffix_in_later_dir() {
        let empty = tempfile::tempdir().unwrap();
        let putty = tempfile::tempdir().unwrap();
        std::fs::write(putty.path().join("pscp.exe"), b"").unwrap();

        let dirs = vec![empty.path().to_path_buf(), putty.path().to_path_buf()];

        assert_eq!(
            locate_in("pscp", &dirs),
            Some(putty.path().join("pscp.exe"))
        );
        assert_eq!(locate_in("plink", &dirs), None);
    }

    #[test]
    fn directories_do_not_count_as_tools() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("plink")).unwrap();
        assert_eq!(locate_in("plink", &[dir.path().to_path_buf()]), None);
    }
}
