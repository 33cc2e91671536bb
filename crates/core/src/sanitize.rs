//! Post-parse sanitizer (C7) — always runs last. Strips Apache sort
//! queries, enforces parent-scope containment, cleans up HTTP(S)
//! fragments, prunes dynamic pseudo-filesystem noise, and breaks
//! symlink/mirror loops by structural comparison with ancestors.

use crate::config::ParserConfig;
use crate::types::{ParsedDirectory, ParsedFile};
use crate::url_utils::strip_url;
use std::sync::{Arc, RwLock};
use url::Url;

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok().and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

fn is_http_scheme(url: &str) -> bool {
    Url::parse(url).map(|u| matches!(u.scheme(), "http" | "https")).unwrap_or(false)
}

fn allowed_scheme(url: &str) -> bool {
    Url::parse(url).map(|u| matches!(u.scheme(), "http" | "https" | "ftp" | "ftps")).unwrap_or(false)
}

fn same_host(a: &str, b: &str) -> bool {
    match (host_of(a), host_of(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn local_path(url: &str, default_filenames: &[String]) -> Option<String> {
    Url::parse(url).ok().map(|u| crate::url_utils::replace_common_default_filenames(u.path(), default_filenames))
}

/// `SameHostAndDirectoryDirectory` (spec §4.8 step 2): equal URLs, or same
/// host with the check URL's local path (after default-filename erasure,
/// per `ParserConfig::default_filenames`) starting with the base's.
pub fn same_host_and_directory_directory(base: &str, check: &str, default_filenames: &[String]) -> bool {
    if base == check {
        return true;
    }
    if !same_host(base, check) {
        return false;
    }
    let (Some(base_path), Some(check_path)) = (local_path(base, default_filenames), local_path(check, default_filenames)) else {
        return false;
    };
    check_path.starts_with(&base_path)
}

/// File variant: additionally tolerates the base itself containing a
/// trailing filename (compares against the base's own directory prefix).
pub fn same_host_and_directory_file(base: &str, check: &str, default_filenames: &[String]) -> bool {
    if same_host_and_directory_directory(base, check, default_filenames) {
        return true;
    }
    if !same_host(base, check) {
        return false;
    }
    let Some(base_path) = local_path(base, default_filenames) else { return false };
    let base_dir = match base_path.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/"),
        None => base_path,
    };
    let Some(check_path) = local_path(check, default_filenames) else { return false };
    check_path.starts_with(&base_dir)
}

fn allowed_directory(base_url: &str, entry_url: &str, cfg: &ParserConfig) -> bool {
    if let Some(host) = host_of(entry_url) {
        if cfg.is_whitelisted_host(&host) {
            return true;
        }
    }
    allowed_scheme(entry_url) && same_host_and_directory_directory(base_url, entry_url, &cfg.default_filenames)
}

fn allowed_file(base_url: &str, entry_url: &str, cfg: &ParserConfig) -> bool {
    if let Some(host) = host_of(entry_url) {
        if cfg.is_whitelisted_host(&host) {
            return true;
        }
    }
    allowed_scheme(entry_url) && same_host_and_directory_file(base_url, entry_url, &cfg.default_filenames)
}

fn strip_fragment(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else { return url.to_string() };
    if parsed.fragment().is_some() {
        parsed.set_fragment(None);
    }
    parsed.to_string()
}

fn dedupe_by_url(subdirs: &mut Vec<Arc<RwLock<ParsedDirectory>>>) {
    let mut seen = std::collections::HashSet::new();
    subdirs.retain(|d| seen.insert(d.read().unwrap().url.clone()));
}

fn dedupe_files(files: &mut Vec<ParsedFile>) {
    let mut seen = std::collections::HashSet::new();
    files.retain(|f| seen.insert(f.url.clone()));
}

const DEV_MARKERS: &[&str] = &["bus", "cpu", "disk"];
const LIB_MARKERS: &[&str] = &["firmware", "modules"];
const RUN_MARKERS: &[&str] = &["sudo", "user"];
const SYS_MARKERS: &[&str] = &["dev", "kernel"];
const VAR_MARKERS: &[&str] = &["lib", "run"];
const USR_DROP: &[&str] = &["bin", "include", "lib", "lib32", "share", "src"];

fn has_subdir_named(dir: &ParsedDirectory, names: &[&str]) -> bool {
    dir.subdirectories
        .iter()
        .any(|s| names.iter().any(|n| s.read().unwrap().name.eq_ignore_ascii_case(n)))
}

fn clear(dir: &mut ParsedDirectory) {
    dir.subdirectories.clear();
    dir.files.clear();
}

/// Clear dynamically-generated pseudo-filesystem directories outright, or
/// prune just their noisy members (`usr`), per spec §4.8 step 4.
fn prune_pseudo_filesystem(dir: &mut ParsedDirectory) {
    match dir.name.to_lowercase().as_str() {
        "dev" if has_subdir_named(dir, DEV_MARKERS) => clear(dir),
        "lib" if has_subdir_named(dir, LIB_MARKERS) => clear(dir),
        "proc"
            if dir.subdirectories.iter().any(|s| {
                let n = s.read().unwrap().name.clone();
                !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())
            }) =>
        {
            clear(dir)
        }
        "run" if has_subdir_named(dir, RUN_MARKERS) => clear(dir),
        "snap" if has_subdir_named(dir, &["bin"]) => clear(dir),
        "sys" if has_subdir_named(dir, SYS_MARKERS) => clear(dir),
        "var" if has_subdir_named(dir, VAR_MARKERS) => clear(dir),
        "usr" => {
            dir.subdirectories.retain(|s| !USR_DROP.iter().any(|n| s.read().unwrap().name.eq_ignore_ascii_case(n)));
        }
        _ => {}
    }
}

fn files_signature(files: &[ParsedFile]) -> Vec<(String, i64)> {
    files.iter().map(|f| (f.file_name.clone(), f.file_size)).collect()
}

fn subdir_name_signature(subs: &[Arc<RwLock<ParsedDirectory>>]) -> Vec<String> {
    subs.iter().map(|s| s.read().unwrap().name.clone()).collect()
}

/// Walk up to `max_depth` ancestor levels; if this directory's contents
/// are structurally identical to an ancestor's, it's a symlink loop or
/// mirrored copy — mark it an error and discard its entries.
fn check_symlink_loop(dir: &mut ParsedDirectory, max_depth: usize) {
    let my_files = files_signature(&dir.files);
    let my_subs = subdir_name_signature(&dir.subdirectories);
    if my_files.is_empty() && my_subs.is_empty() {
        return;
    }

    let mut current = dir.parent.clone();
    let mut depth = 0;
    while let Some(weak) = current {
        if depth >= max_depth {
            break;
        }
        let Some(arc) = weak.upgrade() else { break };
        let ancestor = arc.read().unwrap();
        if files_signature(&ancestor.files) == my_files && subdir_name_signature(&ancestor.subdirectories) == my_subs {
            dir.error = true;
            dir.parsed_successfully = false;
            dir.subdirectories.clear();
            dir.files.clear();
            return;
        }
        current = ancestor.parent.clone();
        depth += 1;
    }
}

/// Run the full sanitizer pass on a freshly-extracted directory.
/// `check_parents` mirrors `ParseHtml`'s `checkParents` flag (spec §6).
pub fn sanitize(dir: &mut ParsedDirectory, cfg: &ParserConfig, check_parents: bool) {
    for sub in &dir.subdirectories {
        let mut s = sub.write().unwrap();
        let stripped = strip_url(&s.url);
        s.url = stripped;
    }

    if check_parents {
        let base = dir.url.clone();
        dir.subdirectories.retain(|s| allowed_directory(&base, &s.read().unwrap().url, cfg));
        dir.files.retain(|f| allowed_file(&base, &f.url, cfg));
    }

    if is_http_scheme(&dir.url) {
        for sub in &dir.subdirectories {
            let mut s = sub.write().unwrap();
            let stripped = strip_fragment(&s.url);
            s.url = stripped;
        }
        for f in &mut dir.files {
            f.url = strip_fragment(&f.url);
        }
        dedupe_by_url(&mut dir.subdirectories);
        dedupe_files(&mut dir.files);
    }

    dir.files.retain(|f| f.file_name != "core");
    prune_pseudo_filesystem(dir);
    check_symlink_loop(dir, cfg.symlink_ancestor_depth);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParsedDirectory;
    use std::sync::Weak;

    fn shell_with(url: &str, parent: Option<Weak<RwLock<ParsedDirectory>>>) -> ParsedDirectory {
        ParsedDirectory::shell(url, parent)
    }

    #[test]
    fn drops_cross_host_subdirectory() {
        let mut dir = shell_with("http://h/p/", None);
        let foreign = Arc::new(RwLock::new(shell_with("http://other/x/", None)));
        dir.subdirectories.push(foreign);
        let cfg = ParserConfig::default();
        sanitize(&mut dir, &cfg, true);
        assert!(dir.subdirectories.is_empty());
    }

    #[test]
    fn keeps_whitelisted_remote_backend_host() {
        let mut dir = shell_with("http://h/p/", None);
        let drive = Arc::new(RwLock::new(shell_with("https://drive.google.com/x", None)));
        dir.subdirectories.push(drive);
        let cfg = ParserConfig::default();
        sanitize(&mut dir, &cfg, true);
        assert_eq!(dir.subdirectories.len(), 1);
    }

    #[test]
    fn strips_fragment_on_http_entries() {
        let mut dir = shell_with("http://h/p/", None);
        dir.files.push(ParsedFile { url: "http://h/p/a.txt#frag".into(), file_name: "a.txt".into(), file_size: 10, description: None });
        let cfg = ParserConfig::default();
        sanitize(&mut dir, &cfg, false);
        assert_eq!(dir.files[0].url, "http://h/p/a.txt");
    }

    #[test]
    fn prunes_core_file() {
        let mut dir = shell_with("http://h/p/", None);
        dir.files.push(ParsedFile { url: "http://h/p/core".into(), file_name: "core".into(), file_size: 10, description: None });
        let cfg = ParserConfig::default();
        sanitize(&mut dir, &cfg, false);
        assert!(dir.files.is_empty());
    }

    #[test]
    fn prunes_proc_directory_with_numeric_subdirs() {
        let mut dir = shell_with("http://h/proc/", None);
        dir.subdirectories.push(Arc::new(RwLock::new(shell_with("http://h/proc/1/", None))));
        let cfg = ParserConfig::default();
        sanitize(&mut dir, &cfg, false);
        assert!(dir.subdirectories.is_empty());
    }

    #[test]
    fn usr_keeps_non_standard_subdirs_drops_standard_ones() {
        let mut dir = shell_with("http://h/usr/", None);
        dir.subdirectories.push(Arc::new(RwLock::new(shell_with("http://h/usr/bin/", None))));
        dir.subdirectories.push(Arc::new(RwLock::new(shell_with("http://h/usr/mystuff/", None))));
        let cfg = ParserConfig::default();
        sanitize(&mut dir, &cfg, false);
        assert_eq!(dir.subdirectories.len(), 1);
        assert_eq!(dir.subdirectories[0].read().unwrap().name, "mystuff");
    }

    #[test]
    fn detects_symlink_loop_against_parent() {
        let root = Arc::new(RwLock::new(shell_with("http://h/a/", None)));
        root.write().unwrap().files.push(ParsedFile { url: "http://h/a/x".into(), file_name: "x".into(), file_size: 1, description: None });

        let mut child = shell_with("http://h/a/b/", Some(Arc::downgrade(&root)));
        child.files.push(ParsedFile { url: "http://h/a/b/x".into(), file_name: "x".into(), file_size: 1, description: None });

        let cfg = ParserConfig::default();
        sanitize(&mut child, &cfg, false);
        assert!(child.error);
        assert!(child.files.is_empty());
    }

    #[test]
    fn same_host_and_directory_file_tolerates_base_trailing_filename() {
        let names = ParserConfig::default().default_filenames;
        assert!(same_host_and_directory_file("http://h/p/index.php", "http://h/p/a.txt", &names));
    }
}
