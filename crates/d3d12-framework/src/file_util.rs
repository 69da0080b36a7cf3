//! Locates assets and shader binaries relative to the working directory and the
//! executable.

use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

/// Directories searched for `filename`, highest priority first:
///
/// ```text
/// .\  ..\  ..\..\  .\res\
/// %EXE_DIR%\  %EXE_DIR%\..\  %EXE_DIR%\..\..\  %EXE_DIR%\res\
/// ```
///
/// followed by the crate's own `res` and `shaders` directories so `cargo run`
/// works from anywhere in the workspace.
pub fn search_roots(current_dir: &Path, exe_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut roots = vec![
        current_dir.to_path_buf(),
        current_dir.join(".."),
        current_dir.join("..").join(".."),
        current_dir.join("res"),
    ];
    if let Some(exe_dir) = exe_dir {
        roots.push(exe_dir.to_path_buf());
        roots.push(exe_dir.join(".."));
        roots.push(exe_dir.join("..").join(".."));
        roots.push(exe_dir.join("res"));
    }
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    roots.push(manifest_dir.to_path_buf());
    roots.push(manifest_dir.join("res"));
    roots.push(manifest_dir.join("shaders"));
    roots
}

/// Returns the first `root/filename` that exists as a file.
pub fn search_file_path_in(filename: impl AsRef<Path>, roots: &[PathBuf]) -> Option<PathBuf> {
    let filename = filename.as_ref();
    if filename.as_os_str().is_empty() {
        return None;
    }
    if filename.is_absolute() {
        return filename.is_file().then(|| filename.to_path_buf());
    }
    roots
        .iter()
        .map(|root| root.join(filename))
        .find(|candidate| candidate.is_file())
}

/// Searches the default roots for `filename`.
pub fn search_file_path(filename: impl AsRef<Path>) -> Option<PathBuf> {
    let filename = filename.as_ref();
    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let found = search_file_path_in(filename, &search_roots(&current_dir, exe_dir.as_deref()));
    debug!(?filename, ?found, "searched for file");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn roots_are_in_priority_order() {
        let roots = search_roots(Path::new("/work/a/b"), Some(Path::new("/bin/x")));
        assert_eq!(roots[0], PathBuf::from("/work/a/b"));
        assert_eq!(roots[1], Path::new("/work/a/b").join(".."));
        assert_eq!(roots[3], Path::new("/work/a/b").join("res"));
        assert_eq!(roots[4], PathBuf::from("/bin/x"));
        assert_eq!(roots[7], Path::new("/bin/x").join("res"));
    }

    #[test]
    fn current_dir_wins_over_parent_and_exe_dir() {
        let temp = tempfile::tempdir().unwrap();
        let cwd = temp.path().join("a").join("b");
        let exe = temp.path().join("exe");
        touch(&cwd.join("SimpleTexVS.cso"));
        touch(&cwd.join("..").join("SimpleTexVS.cso"));
        touch(&exe.join("SimpleTexVS.cso"));

        let found = search_file_path_in("SimpleTexVS.cso", &search_roots(&cwd, Some(&exe)));
        assert_eq!(found, Some(cwd.join("SimpleTexVS.cso")));
    }

    #[test]
    fn res_dir_and_exe_dir_are_searched() {
        let temp = tempfile::tempdir().unwrap();
        let cwd = temp.path().join("a").join("b");
        let exe = temp.path().join("exe");
        fs::create_dir_all(&cwd).unwrap();
        touch(&cwd.join("res").join("cube.obj"));
        touch(&exe.join("res").join("only_next_to_exe.png"));

        let roots = search_roots(&cwd, Some(&exe));
        assert_eq!(
            search_file_path_in("cube.obj", &roots),
            Some(cwd.join("res").join("cube.obj"))
        );
        assert_eq!(
            search_file_path_in("only_next_to_exe.png", &roots),
            Some(exe.join("res").join("only_next_to_exe.png"))
        );
    }

    #[test]
    fn missing_file_and_directories_are_not_found() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("res")).unwrap();
        let roots = search_roots(temp.path(), None);
        assert_eq!(search_file_path_in("does_not_exist.dds", &roots), None);
        assert_eq!(search_file_path_in("res", &[temp.path().to_path_buf()]), None);
        assert_eq!(search_file_path_in("", &roots), None);
    }

    #[test]
    fn bundled_shaders_are_found_from_anywhere() {
        assert!(search_file_path("SimpleTexVS.hlsl").is_some());
    }
}
